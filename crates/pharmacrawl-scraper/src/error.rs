use serde::Serialize;
use thiserror::Error;

/// Why a single target did not produce records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Navigation did not complete within the configured timeout.
    NavigationTimeout,
    /// The interstitial never cleared. Recorded as a warning; the fetch goes on.
    ChallengeTimeout,
    /// The origin served an explicit block page.
    BlockedByOrigin,
    /// The document parsed but held no usable product.
    ExtractionEmpty,
    /// Connection-level failure reported by the browser.
    Network,
    /// Any other browser or protocol failure.
    Browser,
    /// The run was cancelled while this target was in flight.
    Cancelled,
}

impl FetchErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FetchErrorKind::NavigationTimeout => "navigation_timeout",
            FetchErrorKind::ChallengeTimeout => "challenge_timeout",
            FetchErrorKind::BlockedByOrigin => "blocked_by_origin",
            FetchErrorKind::ExtractionEmpty => "extraction_empty",
            FetchErrorKind::Network => "network",
            FetchErrorKind::Browser => "browser",
            FetchErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-target failure. Caught at the target boundary and turned into a
/// manifest entry; never aborts a run.
#[derive(Debug, Clone, Error)]
#[error("{kind} on {target}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    /// `Target::describe()` of the failing target.
    pub target: String,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(target: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Cancelled, target, "run cancelled")
    }
}

/// Run-level failure: the only errors that escape `Crawler::run`.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("browser setup failed: {0}")]
    SetupFailure(String),
}
