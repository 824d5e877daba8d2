//! The browser capability surface the workflow runs against.
//!
//! The form engine, results detector and price extractor depend only on
//! [`PageDriver`], not on any concrete automation product, so they can be
//! exercised against a scripted fake in tests. The Chrome-backed
//! implementation lives in [`crate::browser`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Describes how to read one labelled price row out of a results grid:
/// `row` matches each row, `label`/`price` are resolved within it, and the
/// price is read from `price_attr` on the matched price element.
#[derive(Debug, Clone)]
pub struct RowSpec {
    pub row: &'static str,
    pub label: &'static str,
    pub price: &'static str,
    pub price_attr: &'static str,
}

/// One scraped row. Either field may be unreadable; the extractor decides
/// what to do about that.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawRow {
    pub label: Option<String>,
    pub price: Option<String>,
}

/// Capability set consumed by the check workflow.
///
/// Selectors are CSS. Implementations must dispatch a change event after
/// scripted writes (`set_value`, `select_by_text`); the target form does not
/// react to presence-of-value alone.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the n-th element matching `selector`.
    async fn click_nth(&self, selector: &str, index: usize) -> Result<()>;

    /// Focus the first match and type `text` as keystrokes.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Scripted value write followed by input+change events.
    async fn set_value(&self, selector: &str, value: &str) -> Result<()>;

    /// Trimmed visible text of every element matching `selector`.
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Select the `<select>` option whose visible text equals `text`.
    async fn select_by_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn is_checked(&self, selector: &str) -> Result<bool>;

    /// Read every row the spec matches in one pass.
    async fn scrape_rows(&self, spec: &RowSpec) -> Result<Vec<RawRow>>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Full HTML source of the current page.
    async fn page_source(&self) -> Result<String>;
}

/// Poll until at least one element matches `selector`, or fail with a
/// timeout. Every element wait in the workflow goes through here, so there is
/// no unbounded wait anywhere.
pub async fn await_present<D: PageDriver + ?Sized>(
    driver: &D,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    let interval = Duration::from_millis(100);
    let start = tokio::time::Instant::now();
    loop {
        if driver.count(selector).await.unwrap_or(0) > 0 {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(Error::Timeout(format!(
                "element {selector} did not appear within {timeout:?}"
            )));
        }
        tokio::time::sleep(interval).await;
    }
}
