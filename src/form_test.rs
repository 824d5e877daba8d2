use std::time::Duration;

use chrono::NaiveDate;

use super::*;
use crate::model::Reservation;
use crate::testutil::{ScriptState, ScriptedPage};

fn reservation() -> Reservation {
    Reservation {
        id: "r-1".into(),
        location: "San Francisco Airport".into(),
        pickup_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        dropoff_date: NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
        pickup_time: "10:00 AM".into(),
        dropoff_time: "10:00 AM".into(),
    }
}

fn timeouts() -> FormTimeouts {
    FormTimeouts {
        step: Duration::from_secs(5),
        suggestion: Duration::from_secs(2),
    }
}

fn search_page() -> ScriptedPage {
    ScriptedPage::new(ScriptState {
        url: site::SEARCH_URL.to_owned(),
        suggestions: vec![
            "San Francisco Downtown".to_owned(),
            "San Francisco Airport".to_owned(),
        ],
        time_options: vec![
            "Midnight".to_owned(),
            "06:00 AM".to_owned(),
            "10:00 AM".to_owned(),
            "Noon".to_owned(),
        ],
        ..Default::default()
    })
}

#[tokio::test(start_paused = true)]
async fn fills_the_form_in_order() {
    let page = search_page();
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&reservation()).await.unwrap();

    assert_eq!(form.state(), FormState::SearchSubmitted);
    page.with(|s| {
        assert_eq!(
            s.typed,
            vec![(
                site::PICKUP_LOCATION_INPUT.to_owned(),
                "San Francisco Airport".to_owned()
            )]
        );
        assert_eq!(
            s.values,
            vec![
                (site::PICKUP_DATE_INPUT.to_owned(), "06/01/2024".to_owned()),
                (site::DROPOFF_DATE_INPUT.to_owned(), "06/05/2024".to_owned()),
            ]
        );
        assert_eq!(
            s.selections,
            vec![
                (site::PICKUP_TIME_SELECT.to_owned(), "10:00 AM".to_owned()),
                (site::DROPOFF_TIME_SELECT.to_owned(), "10:00 AM".to_owned()),
            ]
        );
        assert_eq!(s.clicks.last().map(String::as_str), Some(site::SEARCH_BUTTON));
    });
}

#[tokio::test(start_paused = true)]
async fn exact_suggestion_wins_over_substring() {
    // Index 0 contains the wanted text as a substring, index 1 is the exact
    // match. The exact match must win even though the substring candidate
    // appears first.
    let page = search_page();
    page.with(|s| {
        s.suggestions = vec![
            "San Francisco Airport (SFO), California".to_owned(),
            "San Francisco Airport".to_owned(),
        ]
    });
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&reservation()).await.unwrap();

    page.with(|s| {
        assert_eq!(s.nth_clicks, vec![(site::LOCATION_SUGGESTION.to_owned(), 1)]);
    });
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_substring_match_after_exact_times_out() {
    let page = search_page();
    page.with(|s| {
        s.suggestions = vec!["Airports: San Francisco Airport (SFO)".to_owned()];
    });
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&reservation()).await.unwrap();

    page.with(|s| {
        assert_eq!(s.nth_clicks, vec![(site::LOCATION_SUGGESTION.to_owned(), 0)]);
    });
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_first_suggestion_when_nothing_matches() {
    let page = search_page();
    page.with(|s| {
        s.suggestions = vec!["Oakland Airport".to_owned(), "San Jose Airport".to_owned()];
    });
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&reservation()).await.unwrap();

    page.with(|s| {
        assert_eq!(s.nth_clicks, vec![(site::LOCATION_SUGGESTION.to_owned(), 0)]);
    });
}

#[tokio::test(start_paused = true)]
async fn fails_when_no_suggestions_ever_appear() {
    let page = search_page();
    page.with(|s| s.suggestions.clear());
    let mut form = SearchForm::new(&page, timeouts());
    let err = form.fill(&reservation()).await.unwrap_err();

    match err {
        Error::FormStep { step, last_url, .. } => {
            assert_eq!(step, "confirm-location");
            assert_eq!(last_url, site::SEARCH_URL);
        }
        other => panic!("expected FormStep, got {other:?}"),
    }
    assert_eq!(form.state(), FormState::LocationEntered);
}

#[tokio::test(start_paused = true)]
async fn unmapped_time_is_a_hard_failure() {
    let page = search_page();
    let mut wanted = reservation();
    wanted.pickup_time = "07:13 AM".into();
    let mut form = SearchForm::new(&page, timeouts());
    let err = form.fill(&wanted).await.unwrap_err();

    match err {
        Error::FormStep { step, .. } => assert_eq!(step, "set-times"),
        other => panic!("expected FormStep, got {other:?}"),
    }
    page.with(|s| assert!(s.selections.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn noon_and_midnight_select_site_labels() {
    let page = search_page();
    let mut wanted = reservation();
    wanted.pickup_time = "12:00 PM".into();
    wanted.dropoff_time = "12:00 AM".into();
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&wanted).await.unwrap();

    page.with(|s| {
        assert_eq!(
            s.selections,
            vec![
                (site::PICKUP_TIME_SELECT.to_owned(), "Noon".to_owned()),
                (site::DROPOFF_TIME_SELECT.to_owned(), "Midnight".to_owned()),
            ]
        );
    });
}

#[tokio::test(start_paused = true)]
async fn age_checkbox_is_clicked_when_unchecked() {
    let page = search_page();
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&reservation()).await.unwrap();

    page.with(|s| {
        assert!(s.age_checked);
        let toggles = s
            .clicks
            .iter()
            .filter(|c| c.as_str() == site::DRIVER_AGE_CHECKBOX)
            .count();
        assert_eq!(toggles, 1);
    });
}

#[tokio::test(start_paused = true)]
async fn age_checkbox_is_left_alone_when_already_checked() {
    let page = search_page();
    page.with(|s| s.age_checked = true);
    let mut form = SearchForm::new(&page, timeouts());
    form.fill(&reservation()).await.unwrap();

    page.with(|s| {
        assert!(s.age_checked);
        assert!(!s.clicks.iter().any(|c| c.as_str() == site::DRIVER_AGE_CHECKBOX));
    });
}

#[test]
fn match_tiers_are_pure() {
    let texts = vec![
        "Hub: San Francisco Airport".to_owned(),
        "San Francisco Airport".to_owned(),
    ];
    assert_eq!(exact_match(&texts, "San Francisco Airport"), Some(1));
    assert_eq!(contains_match(&texts, "San Francisco Airport"), Some(0));
    assert_eq!(exact_match(&texts, "Oakland Airport"), None);
    assert_eq!(contains_match(&texts, "Oakland Airport"), None);
}
