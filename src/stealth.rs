use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page as CrPage;

use crate::error::{Error, Result};

/// Plausible desktop user-agent presented to the target site.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Chrome launch flags that mask the usual automation giveaways.
/// Note: chromiumoxide adds the `--` prefix itself, so keys must not include it.
pub fn launch_args() -> Vec<&'static str> {
    vec![
        "disable-infobars",
        "disable-default-apps",
        "no-first-run",
        "no-default-browser-check",
        "disable-dev-shm-usage",
    ]
}

/// Key-value launch flags, tuple form `("key", "value")` -> `--key=value`.
pub fn launch_kv_args() -> Vec<(&'static str, &'static str)> {
    vec![
        ("disable-blink-features", "AutomationControlled"),
        ("user-agent", USER_AGENT),
    ]
}

/// Register the masking script to run on every new document, before any of
/// the site's own JS.
pub async fn apply(page: &CrPage) -> Result<()> {
    let params = AddScriptToEvaluateOnNewDocumentParams::new(INIT_JS);
    page.execute(params)
        .await
        .map_err(|e| Error::Js(format!("failed to inject init script: {e}")))?;
    Ok(())
}

/// Conservative countermeasures only: hide the webdriver flag and fill in
/// the properties headless Chrome leaves empty.
static INIT_JS: &str = r#"
Object.defineProperty(Navigator.prototype, 'webdriver', {
    get: () => false,
    configurable: true,
    enumerable: true,
});

if (!window.chrome) {
    window.chrome = { runtime: {} };
}

Object.defineProperty(navigator, 'languages', {
    get: () => ['en-US', 'en'],
    configurable: true,
});

if (navigator.platform === '') {
    Object.defineProperty(navigator, 'platform', {
        get: () => 'MacIntel',
        configurable: true,
    });
}
"#;
