//! Scripted [`PageDriver`] fake for unit tests. Selector handling mirrors
//! the pieces of the search and results pages the workflow touches.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::driver::{PageDriver, RawRow, RowSpec};
use crate::error::{Error, Result};
use crate::site;

#[derive(Debug, Default)]
pub struct ScriptState {
    pub url: String,
    /// Successive values for `current_url`, consumed front-first; each
    /// observation becomes the sticky `url`. When drained, `url` repeats.
    pub url_sequence: Vec<String>,
    pub suggestions: Vec<String>,
    pub time_options: Vec<String>,
    pub age_checked: bool,
    pub result_rows: Vec<RawRow>,
    pub results_visible: bool,

    // Recorded interactions, in call order.
    pub navigations: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub values: Vec<(String, String)>,
    pub selections: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub nth_clicks: Vec<(String, usize)>,
}

pub struct ScriptedPage {
    state: Mutex<ScriptState>,
}

impl ScriptedPage {
    pub fn new(state: ScriptState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ScriptState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.with(|s| {
            s.navigations.push(url.to_owned());
            s.url = url.to_owned();
        });
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.with(|s| {
            if !s.url_sequence.is_empty() {
                s.url = s.url_sequence.remove(0);
            }
            s.url.clone()
        }))
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.with(|s| match selector {
            site::LOCATION_SUGGESTION => s.suggestions.len(),
            site::RESULT_ROW => {
                if s.results_visible {
                    s.result_rows.len()
                } else {
                    0
                }
            }
            site::PICKUP_LOCATION_INPUT
            | site::PICKUP_DATE_INPUT
            | site::DROPOFF_DATE_INPUT
            | site::PICKUP_TIME_SELECT
            | site::DROPOFF_TIME_SELECT
            | site::DRIVER_AGE_CHECKBOX
            | site::SEARCH_BUTTON => 1,
            _ => 0,
        }))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.with(|s| {
            s.clicks.push(selector.to_owned());
            if selector == site::DRIVER_AGE_CHECKBOX {
                s.age_checked = !s.age_checked;
            }
        });
        Ok(())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        self.with(|s| s.nth_clicks.push((selector.to_owned(), index)));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.with(|s| s.typed.push((selector.to_owned(), text.to_owned())));
        Ok(())
    }

    async fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        self.with(|s| s.values.push((selector.to_owned(), value.to_owned())));
        Ok(())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self.with(|s| match selector {
            site::LOCATION_SUGGESTION => s.suggestions.clone(),
            site::PICKUP_TIME_OPTIONS | site::DROPOFF_TIME_OPTIONS => s.time_options.clone(),
            _ => Vec::new(),
        }))
    }

    async fn select_by_text(&self, selector: &str, text: &str) -> Result<()> {
        self.with(|s| {
            if s.time_options.iter().any(|o| o.trim() == text) {
                s.selections.push((selector.to_owned(), text.to_owned()));
                Ok(())
            } else {
                Err(Error::Js(format!("no option with text {text}")))
            }
        })
    }

    async fn is_checked(&self, _selector: &str) -> Result<bool> {
        Ok(self.with(|s| s.age_checked))
    }

    async fn scrape_rows(&self, _spec: &RowSpec) -> Result<Vec<RawRow>> {
        Ok(self.with(|s| s.result_rows.clone()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn page_source(&self) -> Result<String> {
        Ok(String::from("<html></html>"))
    }
}
