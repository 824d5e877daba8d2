//! Target-site specifics: the search page URL, the selectors the form and
//! results views render, and the site's own text conventions for times and
//! dates. Everything here describes the site, not our policy.

use chrono::NaiveDate;

use crate::driver::RowSpec;

pub const SEARCH_URL: &str = "https://www.costcotravel.com/Rental-Cars";

pub const PICKUP_LOCATION_INPUT: &str = "#pickupLocationTextWidget";
/// Autocomplete suggestions render as plain list items below the input.
pub const LOCATION_SUGGESTION: &str = "li";
pub const PICKUP_DATE_INPUT: &str = "#pickUpDateWidget";
pub const DROPOFF_DATE_INPUT: &str = "#dropOffDateWidget";
pub const PICKUP_TIME_SELECT: &str = "#pickupTimeWidget";
pub const PICKUP_TIME_OPTIONS: &str = "#pickupTimeWidget option";
pub const DROPOFF_TIME_SELECT: &str = "#dropoffTimeWidget";
pub const DROPOFF_TIME_OPTIONS: &str = "#dropoffTimeWidget option";
pub const DRIVER_AGE_CHECKBOX: &str = "#driversAgeWidget";
pub const SEARCH_BUTTON: &str = "#findMyCarButton";

pub const RESULT_ROW: &str = r#"div[role="row"]"#;
const RESULT_CATEGORY_LABEL: &str = "div.inner.text-center.h3-tag-style";
const RESULT_LOWEST_PRICE_CARD: &str = "a.card.car-result-card.lowest-price";
const RESULT_PRICE_ATTR: &str = "data-price";

/// Row-scraping spec for the results grid: one row per vehicle category,
/// price read off the row's lowest-price card.
pub fn result_rows() -> RowSpec {
    RowSpec {
        row: RESULT_ROW,
        label: RESULT_CATEGORY_LABEL,
        price: RESULT_LOWEST_PRICE_CARD,
        price_attr: RESULT_PRICE_ATTR,
    }
}

/// The site labels noon and midnight with words instead of clock times.
/// Every other time string passes through unchanged; one-directional.
pub fn time_label(time: &str) -> &str {
    match time {
        "12:00 PM" => "Noon",
        "12:00 AM" => "Midnight",
        other => other,
    }
}

/// The date format the search form expects in its text inputs.
pub fn form_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}
