use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page as CrPage, ScreenshotParams};
use futures::StreamExt;
use tracing::debug;

use crate::config::BrowserConfig;
use crate::driver::{PageDriver, RawRow, RowSpec};
use crate::error::{Error, Result};
use crate::stealth;

/// Chrome flags that reduce startup and load time without affecting the
/// search workflow.
const BASE_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "disable-popup-blocking",
];

/// An exclusively-owned browser session, bound to a single check attempt.
///
/// One session means one Chrome process and one page. Sessions are never
/// shared between checks and must be released on every exit path;
/// [`Session::release`] is idempotent.
#[async_trait]
pub trait Session: PageDriver {
    /// Tear down the underlying browser process. Safe to call on a session
    /// that is in an error state or already released; failures are logged
    /// and swallowed.
    async fn release(&mut self);
}

/// Hands out sessions to the orchestrator. Abstracted so that the whole
/// pipeline can run against a scripted session in tests.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: Session + Send + Sync;

    async fn acquire(&self) -> Result<Self::Session>;
}

/// A headless-Chrome session speaking CDP through chromiumoxide.
pub struct ChromeSession {
    browser: Option<CrBrowser>,
    page: CrPage,
    handler_task: Option<tokio::task::JoinHandle<()>>,
}

impl ChromeSession {
    /// Launch an isolated Chrome instance and open its single working page.
    pub async fn acquire(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        for arg in BASE_ARGS {
            builder = builder.arg(*arg);
        }

        // chromiumoxide adds the `--` prefix itself; keys must not include it
        if config.stealth {
            for arg in stealth::launch_args() {
                builder = builder.arg(arg);
            }
            for arg in stealth::launch_kv_args() {
                builder = builder.arg(arg);
            }
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::Launch(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Launch(e.to_string()))?;

        if config.stealth {
            stealth::apply(&page).await?;
        }

        Ok(Self {
            browser: Some(browser),
            page,
            handler_task: Some(handler_task),
        })
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn release(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                debug!(error = %err, "browser close reported an error");
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| Error::Navigation(e.to_string()))?
            .ok_or_else(|| Error::Navigation("no URL found".into()))
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let selector_js = js_string(selector)?;
        let js = format!("document.querySelectorAll({selector_js}).length");
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| Error::Js(e.to_string()))?;
        result.into_value().map_err(|e| Error::Js(e.to_string()))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let el = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        el.click().await?;
        Ok(())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        let els = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        let el = els.get(index).ok_or_else(|| {
            Error::ElementNotFound(format!("{selector} has no element at index {index}"))
        })?;
        el.click().await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let el = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        el.click().await?;
        el.type_str(text).await?;
        Ok(())
    }

    async fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        let selector_js = js_string(selector)?;
        let value_js = js_string(value)?;
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector_js});
                if (!el) throw new Error('element not found: ' + {selector_js});
                el.value = {value_js};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }})()
            "#,
        );
        self.page
            .evaluate(js)
            .await
            .map_err(|e| Error::Js(e.to_string()))?;
        Ok(())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let selector_js = js_string(selector)?;
        let js = format!(
            "Array.from(document.querySelectorAll({selector_js}))\
             .map(el => (el.innerText || el.textContent || '').trim())"
        );
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| Error::Js(e.to_string()))?;
        result.into_value().map_err(|e| Error::Js(e.to_string()))
    }

    async fn select_by_text(&self, selector: &str, text: &str) -> Result<()> {
        let selector_js = js_string(selector)?;
        let text_js = js_string(text)?;
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector_js});
                if (!el) throw new Error('element not found: ' + {selector_js});
                const option = Array.from(el.options)
                    .find(o => (o.text || '').trim() === {text_js});
                if (!option) throw new Error('no option with text ' + {text_js});
                el.value = option.value;
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }})()
            "#,
        );
        self.page
            .evaluate(js)
            .await
            .map_err(|e| Error::Js(e.to_string()))?;
        Ok(())
    }

    async fn is_checked(&self, selector: &str) -> Result<bool> {
        let selector_js = js_string(selector)?;
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector_js});
                if (!el) throw new Error('element not found: ' + {selector_js});
                return !!el.checked;
            }})()
            "#,
        );
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| Error::Js(e.to_string()))?;
        result.into_value().map_err(|e| Error::Js(e.to_string()))
    }

    async fn scrape_rows(&self, spec: &RowSpec) -> Result<Vec<RawRow>> {
        let row_js = js_string(spec.row)?;
        let label_js = js_string(spec.label)?;
        let price_js = js_string(spec.price)?;
        let attr_js = js_string(spec.price_attr)?;
        let js = format!(
            r#"
            Array.from(document.querySelectorAll({row_js})).map(row => {{
                const label = row.querySelector({label_js});
                const card = row.querySelector({price_js});
                return {{
                    label: label ? (label.innerText || '').trim() : null,
                    price: card ? card.getAttribute({attr_js}) : null,
                }};
            }})
            "#,
        );
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| Error::Js(e.to_string()))?;
        result.into_value().map_err(|e| Error::Js(e.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| Error::Screenshot(e.to_string()))
    }

    async fn page_source(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| Error::Js(e.to_string()))
    }
}

/// Hands out one fresh Chrome session per check.
pub struct ChromeSessionProvider {
    config: BrowserConfig,
}

impl ChromeSessionProvider {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionProvider for ChromeSessionProvider {
    type Session = ChromeSession;

    async fn acquire(&self) -> Result<ChromeSession> {
        ChromeSession::acquire(&self.config).await
    }
}

/// Escape an arbitrary string as a JS string literal.
fn js_string(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Js(e.to_string()))
}
