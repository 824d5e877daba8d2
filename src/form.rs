//! Form Interaction Engine: drives the search form from a reservation's
//! fields as a strictly sequential state machine. Every wait is bounded;
//! a step that exceeds its bound fails the whole check with the step name
//! and the last observed page URL attached.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::driver::{await_present, PageDriver};
use crate::error::{Error, Result};
use crate::model::Reservation;
use crate::site;

/// Wait bounds for the form: `step` for element presence, `suggestion` for
/// each tier of the autocomplete match.
#[derive(Debug, Clone, Copy)]
pub struct FormTimeouts {
    pub step: Duration,
    pub suggestion: Duration,
}

/// States of the form, in the only order they may be traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    PageLoaded,
    LocationEntered,
    LocationConfirmed,
    DatesSet,
    TimesSet,
    AgeConfirmed,
    SearchSubmitted,
}

impl FormState {
    pub fn as_str(self) -> &'static str {
        match self {
            FormState::PageLoaded => "page-loaded",
            FormState::LocationEntered => "enter-location",
            FormState::LocationConfirmed => "confirm-location",
            FormState::DatesSet => "set-dates",
            FormState::TimesSet => "set-times",
            FormState::AgeConfirmed => "confirm-age",
            FormState::SearchSubmitted => "submit-search",
        }
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pass over the search form for one reservation.
pub struct SearchForm<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    timeouts: FormTimeouts,
    state: FormState,
}

impl<'a, D: PageDriver + ?Sized> SearchForm<'a, D> {
    pub fn new(driver: &'a D, timeouts: FormTimeouts) -> Self {
        Self {
            driver,
            timeouts,
            state: FormState::PageLoaded,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Run every step in order. The search is only submitted once all prior
    /// fields are confirmed set.
    pub async fn fill(&mut self, reservation: &Reservation) -> Result<()> {
        self.enter_location(&reservation.location).await?;
        self.confirm_location(&reservation.location).await?;
        self.set_dates(reservation).await?;
        self.set_times(reservation).await?;
        self.confirm_age().await?;
        self.submit().await
    }

    async fn enter_location(&mut self, location: &str) -> Result<()> {
        let outcome = async {
            await_present(self.driver, site::PICKUP_LOCATION_INPUT, self.timeouts.step).await?;
            self.driver
                .type_text(site::PICKUP_LOCATION_INPUT, location)
                .await
        }
        .await;
        self.advance(FormState::LocationEntered, outcome).await
    }

    /// Resolve the typed location through the autocomplete list with a
    /// three-tier degrading match: exact visible text, then substring, then
    /// the first rendered suggestion. Each fallback is attempted only after
    /// the previous tier timed out.
    async fn confirm_location(&mut self, location: &str) -> Result<()> {
        let outcome = self.pick_suggestion(location).await;
        let outcome = match outcome {
            Ok(tier) => {
                debug!(%location, tier, "autocomplete suggestion selected");
                Ok(())
            }
            Err(err) => Err(err),
        };
        self.advance(FormState::LocationConfirmed, outcome).await
    }

    async fn pick_suggestion(&self, location: &str) -> Result<&'static str> {
        if let Some(index) = self
            .poll_suggestions(|texts| exact_match(texts, location))
            .await
        {
            self.driver.click_nth(site::LOCATION_SUGGESTION, index).await?;
            return Ok("exact");
        }
        if let Some(index) = self
            .poll_suggestions(|texts| contains_match(texts, location))
            .await
        {
            self.driver.click_nth(site::LOCATION_SUGGESTION, index).await?;
            return Ok("contains");
        }
        // Last resort: whatever the widget offers first, right now.
        let texts = self.driver.texts(site::LOCATION_SUGGESTION).await?;
        if texts.is_empty() {
            return Err(Error::Timeout(format!(
                "no autocomplete suggestions appeared for '{location}'"
            )));
        }
        self.driver.click_nth(site::LOCATION_SUGGESTION, 0).await?;
        Ok("first")
    }

    /// Poll the suggestion list until `pick` finds a candidate or the tier's
    /// bound elapses. Returns the candidate index, or None on timeout so the
    /// caller can degrade to the next tier.
    async fn poll_suggestions<F>(&self, pick: F) -> Option<usize>
    where
        F: Fn(&[String]) -> Option<usize>,
    {
        let interval = Duration::from_millis(250);
        let start = tokio::time::Instant::now();
        loop {
            let texts = self
                .driver
                .texts(site::LOCATION_SUGGESTION)
                .await
                .unwrap_or_default();
            if let Some(index) = pick(&texts) {
                return Some(index);
            }
            if start.elapsed() >= self.timeouts.suggestion {
                return None;
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Write both dates in the site's text format. The form does not react
    /// to presence-of-value alone, so the scripted write dispatches an
    /// explicit change event (see `PageDriver::set_value`).
    async fn set_dates(&mut self, reservation: &Reservation) -> Result<()> {
        let outcome = async {
            await_present(self.driver, site::PICKUP_DATE_INPUT, self.timeouts.step).await?;
            self.driver
                .set_value(
                    site::PICKUP_DATE_INPUT,
                    &site::form_date(reservation.pickup_date),
                )
                .await?;
            self.driver
                .set_value(
                    site::DROPOFF_DATE_INPUT,
                    &site::form_date(reservation.dropoff_date),
                )
                .await
        }
        .await;
        self.advance(FormState::DatesSet, outcome).await
    }

    /// Select both times from the site's own option lists by exact visible
    /// text. An unmapped or misspelled time is a hard failure for the check.
    async fn set_times(&mut self, reservation: &Reservation) -> Result<()> {
        let pickup = site::time_label(&reservation.pickup_time);
        let dropoff = site::time_label(&reservation.dropoff_time);
        let outcome = async {
            await_present(self.driver, site::PICKUP_TIME_SELECT, self.timeouts.step).await?;

            let options = self.driver.texts(site::PICKUP_TIME_OPTIONS).await?;
            debug!(?options, "available pickup times");
            require_option(&options, pickup, "pickup")?;
            self.driver
                .select_by_text(site::PICKUP_TIME_SELECT, pickup)
                .await?;

            let options = self.driver.texts(site::DROPOFF_TIME_OPTIONS).await?;
            require_option(&options, dropoff, "dropoff")?;
            self.driver
                .select_by_text(site::DROPOFF_TIME_SELECT, dropoff)
                .await
        }
        .await;
        self.advance(FormState::TimesSet, outcome).await
    }

    /// The age checkbox must end up checked; it is only toggled when it is
    /// not already.
    async fn confirm_age(&mut self) -> Result<()> {
        let outcome = async {
            await_present(self.driver, site::DRIVER_AGE_CHECKBOX, self.timeouts.step).await?;
            if !self.driver.is_checked(site::DRIVER_AGE_CHECKBOX).await? {
                self.driver.click(site::DRIVER_AGE_CHECKBOX).await?;
            }
            Ok(())
        }
        .await;
        self.advance(FormState::AgeConfirmed, outcome).await
    }

    async fn submit(&mut self) -> Result<()> {
        debug_assert_eq!(
            self.state,
            FormState::AgeConfirmed,
            "search must not be submitted before the form is complete"
        );
        let outcome = async {
            await_present(self.driver, site::SEARCH_BUTTON, self.timeouts.step).await?;
            self.driver.click(site::SEARCH_BUTTON).await
        }
        .await;
        self.advance(FormState::SearchSubmitted, outcome).await
    }

    /// On success move to `next`; on failure wrap the error with the step
    /// name and the last observed page URL.
    async fn advance(&mut self, next: FormState, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => {
                debug!(state = %next, "form step complete");
                self.state = next;
                Ok(())
            }
            Err(err) => {
                let last_url = self
                    .driver
                    .current_url()
                    .await
                    .unwrap_or_else(|_| "<unknown>".to_owned());
                Err(Error::FormStep {
                    step: next.as_str(),
                    reason: err.to_string(),
                    last_url,
                })
            }
        }
    }
}

fn exact_match(texts: &[String], wanted: &str) -> Option<usize> {
    let wanted = wanted.trim();
    texts.iter().position(|t| t.trim() == wanted)
}

fn contains_match(texts: &[String], wanted: &str) -> Option<usize> {
    let wanted = wanted.trim();
    texts.iter().position(|t| t.contains(wanted))
}

fn require_option(options: &[String], label: &str, which: &str) -> Result<()> {
    if options.iter().any(|o| o.trim() == label) {
        Ok(())
    } else {
        Err(Error::ElementNotFound(format!(
            "{which} time '{label}' is not offered by the site"
        )))
    }
}

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;
