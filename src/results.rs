//! Results Detector: decides when the page has left the search view and
//! rendered a priced result set. The rendering delay is variable, so the
//! detector polls instead of relying on a single fixed delay.

use std::time::Duration;

use tracing::debug;

use crate::driver::PageDriver;
use crate::error::{Error, Result};
use crate::site;

#[derive(Debug, Clone, Copy)]
pub struct DetectionPolicy {
    /// Overall ceiling for detection.
    pub timeout: Duration,
    /// Fixed polling interval.
    pub poll: Duration,
    /// Additional settle delay after detection, so late-arriving price
    /// values finish rendering. Detection alone does not guarantee a
    /// complete render.
    pub settle: Duration,
}

/// Poll until the page URL no longer equals the search page's address, or
/// result rows are present with a non-zero count. On exceeding the ceiling,
/// fail with the last observed URL attached for diagnosis.
pub async fn await_results<D: PageDriver + ?Sized>(
    driver: &D,
    search_url: &str,
    policy: &DetectionPolicy,
) -> Result<()> {
    let start = tokio::time::Instant::now();
    let mut last_url = search_url.to_owned();
    loop {
        if let Ok(url) = driver.current_url().await {
            last_url = url;
        }
        if last_url != search_url {
            debug!(url = %last_url, "page left the search view");
            break;
        }
        let rows = driver.count(site::RESULT_ROW).await.unwrap_or(0);
        if rows > 0 {
            debug!(rows, "result rows rendered");
            break;
        }
        if start.elapsed() >= policy.timeout {
            return Err(Error::ResultsTimeout {
                last_url,
                waited_secs: policy.timeout.as_secs(),
            });
        }
        tokio::time::sleep(policy.poll).await;
    }

    tokio::time::sleep(policy.settle).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::{ScriptState, ScriptedPage};

    fn policy() -> DetectionPolicy {
        DetectionPolicy {
            timeout: Duration::from_secs(5),
            poll: Duration::from_millis(100),
            settle: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn detects_url_change() {
        let page = ScriptedPage::new(ScriptState {
            url: site::SEARCH_URL.to_owned(),
            ..Default::default()
        });
        // URL changes on the third observation.
        page.with(|s| {
            s.url_sequence = vec![
                site::SEARCH_URL.to_owned(),
                site::SEARCH_URL.to_owned(),
                "https://www.costcotravel.com/rental-car-results".to_owned(),
            ]
        });

        await_results(&page, site::SEARCH_URL, &policy())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn detects_rendered_rows_without_url_change() {
        let page = ScriptedPage::new(ScriptState {
            url: site::SEARCH_URL.to_owned(),
            results_visible: true,
            result_rows: vec![crate::driver::RawRow {
                label: Some("Economy".into()),
                price: Some("45.00".into()),
            }],
            ..Default::default()
        });

        await_results(&page, site::SEARCH_URL, &policy())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_last_observed_url() {
        let page = ScriptedPage::new(ScriptState {
            url: site::SEARCH_URL.to_owned(),
            ..Default::default()
        });

        let err = await_results(&page, site::SEARCH_URL, &policy())
            .await
            .unwrap_err();
        match err {
            Error::ResultsTimeout { last_url, waited_secs } => {
                assert_eq!(last_url, site::SEARCH_URL);
                assert_eq!(waited_secs, 5);
            }
            other => panic!("expected ResultsTimeout, got {other:?}"),
        }
    }
}
