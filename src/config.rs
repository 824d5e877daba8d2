use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::extract::PriceBounds;
use crate::form::FormTimeouts;
use crate::results::DetectionPolicy;
use crate::site;

/// Launch configuration for one browser session.
pub struct BrowserConfig {
    pub headless: bool,
    pub stealth: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            stealth: true,
            viewport_width: 1440,
            viewport_height: 900,
            chrome_path: None,
        }
    }
}

impl BrowserConfig {
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn stealth(mut self, stealth: bool) -> Self {
        self.config.stealth = stealth;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime configuration for the checker: store credentials, wait bounds,
/// validation bounds, pacing. Loaded once at startup; a missing required
/// key is fatal for the process, not per reservation.
pub struct CheckerConfig {
    pub store_url: String,
    pub store_key: String,
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub search_url: String,
    pub bounds: PriceBounds,
    /// Bound for each element-presence wait in the form.
    pub step_timeout: Duration,
    /// Bound for each tier of the autocomplete match.
    pub suggestion_timeout: Duration,
    /// Ceiling for results detection after submission.
    pub results_timeout: Duration,
    pub results_poll: Duration,
    /// Fixed settle delay after detection, for late-arriving prices.
    pub settle_delay: Duration,
    /// Delay between reservations in a batch.
    pub pacing_delay: Duration,
    pub screenshot_dir: PathBuf,
}

impl CheckerConfig {
    pub fn new(store_url: impl Into<String>, store_key: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            store_key: store_key.into(),
            chrome_path: None,
            headless: true,
            search_url: site::SEARCH_URL.to_owned(),
            bounds: PriceBounds::default(),
            step_timeout: Duration::from_secs(20),
            suggestion_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(60),
            results_poll: Duration::from_millis(500),
            settle_delay: Duration::from_secs(5),
            pacing_delay: Duration::from_secs(5),
            screenshot_dir: PathBuf::from("logs"),
        }
    }

    /// Read configuration from the environment (after `dotenvy` has loaded
    /// any `.env` file). `SUPABASE_URL` and `SUPABASE_SERVICE_KEY` are
    /// required; the rest have defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(require("SUPABASE_URL")?, require("SUPABASE_SERVICE_KEY")?);
        config.chrome_path = env::var("CHROME_BINARY_PATH").ok().filter(|v| !v.is_empty());
        if let Ok(headless) = env::var("HEADLESS") {
            config.headless = !matches!(headless.to_ascii_lowercase().as_str(), "0" | "false" | "no");
        }
        if let Ok(dir) = env::var("SCREENSHOT_DIR") {
            if !dir.is_empty() {
                config.screenshot_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn browser(&self) -> BrowserConfig {
        let mut builder = BrowserConfig::builder().headless(self.headless);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_path(path);
        }
        builder.build()
    }

    pub fn form_timeouts(&self) -> FormTimeouts {
        FormTimeouts {
            step: self.step_timeout,
            suggestion: self.suggestion_timeout,
        }
    }

    pub fn detection_policy(&self) -> DetectionPolicy {
        DetectionPolicy {
            timeout: self.results_timeout,
            poll: self.results_poll,
            settle: self.settle_delay,
        }
    }
}

fn require(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(key.to_owned())),
    }
}
