//! Browser capability seams.
//!
//! The crawl only ever talks to these traits. Production wires them to
//! Chromium through [`crate::chromium`]; tests substitute scripted fakes.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// Options for starting one browser process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub window: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window: (1920, 1080),
        }
    }
}

/// Identity a session presents to the origin.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub extra_headers: Vec<(String, String)>,
    /// Script installed to run before any page script in every document.
    pub init_script: String,
}

/// Patches the properties automation frameworks leak to page scripts.
pub const STEALTH_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
";

impl Fingerprint {
    /// Desktop fingerprint with the default header set and stealth script.
    #[must_use]
    pub fn desktop(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            viewport: (1920, 1080),
            extra_headers: vec![
                ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
                (
                    "Accept".to_string(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                        .to_string(),
                ),
                ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
            ],
            init_script: STEALTH_SCRIPT.to_string(),
        }
    }
}

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens an isolated page session.
    async fn open_session(&self) -> Result<Box<dyn Session>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait Session: Send + Sync {
    async fn set_fingerprint(&self, fingerprint: &Fingerprint) -> Result<(), BrowserError>;

    async fn navigate(&self, url: &str, options: NavigateOptions) -> Result<(), BrowserError>;

    /// Current document title; empty when the document has none.
    async fn title(&self) -> Result<String, BrowserError>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> Result<String, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}
