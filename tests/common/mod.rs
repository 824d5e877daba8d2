//! Scripted session, provider and capturing diagnostic sink for driving the
//! whole checker pipeline without a browser.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pricewatch::{
    site, DiagnosticSink, Error, FailureReport, PageDriver, RawRow, Result, RowSpec, Session,
    SessionProvider,
};

/// How one fake search page behaves for a whole check.
#[derive(Debug, Clone)]
pub struct PageScript {
    pub suggestions: Vec<String>,
    pub time_options: Vec<String>,
    pub rows: Vec<(&'static str, &'static str)>,
    /// URL the page moves to after the search is submitted. `None` means the
    /// search never leaves the form and never renders rows.
    pub results_url: Option<String>,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            suggestions: vec![
                "San Francisco Downtown".to_owned(),
                "San Francisco Airport".to_owned(),
            ],
            time_options: vec![
                "Midnight".to_owned(),
                "10:00 AM".to_owned(),
                "Noon".to_owned(),
            ],
            rows: vec![("Economy", "45.00"), ("SUV", "120.00")],
            results_url: Some("https://www.costcotravel.com/rental-car-results".to_owned()),
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    age_checked: bool,
    results_visible: bool,
}

pub struct FakePage {
    script: PageScript,
    state: Mutex<PageState>,
    releases: Arc<AtomicUsize>,
}

impl FakePage {
    pub fn new(script: PageScript) -> (Self, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        let page = Self {
            script,
            state: Mutex::new(PageState::default()),
            releases: Arc::clone(&releases),
        };
        (page, releases)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.state.lock().unwrap().url = url.to_owned();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let state = self.state.lock().unwrap();
        Ok(match selector {
            site::LOCATION_SUGGESTION => self.script.suggestions.len(),
            site::RESULT_ROW => {
                if state.results_visible {
                    self.script.rows.len()
                } else {
                    0
                }
            }
            _ => 1,
        })
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if selector == site::DRIVER_AGE_CHECKBOX {
            state.age_checked = !state.age_checked;
        }
        if selector == site::SEARCH_BUTTON {
            if let Some(url) = &self.script.results_url {
                state.url = url.clone();
                state.results_visible = true;
            }
        }
        Ok(())
    }

    async fn click_nth(&self, _selector: &str, index: usize) -> Result<()> {
        if index < self.script.suggestions.len() {
            Ok(())
        } else {
            Err(Error::ElementNotFound(format!("no suggestion {index}")))
        }
    }

    async fn type_text(&self, _selector: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn set_value(&self, _selector: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        Ok(match selector {
            site::LOCATION_SUGGESTION => self.script.suggestions.clone(),
            site::PICKUP_TIME_OPTIONS | site::DROPOFF_TIME_OPTIONS => {
                self.script.time_options.clone()
            }
            _ => Vec::new(),
        })
    }

    async fn select_by_text(&self, _selector: &str, text: &str) -> Result<()> {
        if self.script.time_options.iter().any(|o| o == text) {
            Ok(())
        } else {
            Err(Error::Js(format!("no option with text {text}")))
        }
    }

    async fn is_checked(&self, _selector: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().age_checked)
    }

    async fn scrape_rows(&self, _spec: &RowSpec) -> Result<Vec<RawRow>> {
        Ok(self
            .script
            .rows
            .iter()
            .map(|(label, price)| RawRow {
                label: Some((*label).to_owned()),
                price: Some((*price).to_owned()),
            })
            .collect())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn page_source(&self) -> Result<String> {
        Ok(String::from("<html></html>"))
    }
}

#[async_trait]
impl Session for FakePage {
    async fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out pre-scripted sessions in order, one per check.
pub struct FakeProvider {
    sessions: Mutex<VecDeque<FakePage>>,
}

impl FakeProvider {
    pub fn new(sessions: Vec<FakePage>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
        }
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    type Session = FakePage;

    async fn acquire(&self) -> Result<FakePage> {
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Launch("no scripted session left".to_owned()))
    }
}

/// Records every failure report for assertions.
#[derive(Clone, Default)]
pub struct CapturingSink {
    pub reports: Arc<Mutex<Vec<CapturedReport>>>,
}

#[derive(Debug, Clone)]
pub struct CapturedReport {
    pub reservation_id: String,
    pub step: &'static str,
    pub last_url: Option<String>,
    pub had_screenshot: bool,
    pub quote_json: Option<String>,
}

impl DiagnosticSink for CapturingSink {
    fn report(&self, report: &FailureReport<'_>) {
        self.reports.lock().unwrap().push(CapturedReport {
            reservation_id: report.reservation_id.to_owned(),
            step: report.step,
            last_url: report.last_url.clone(),
            had_screenshot: report.screenshot.is_some(),
            quote_json: report
                .quote
                .map(|q| serde_json::to_string(q).unwrap_or_default()),
        });
    }
}
