//! Detection of, and bounded waiting on, anti-bot interstitials.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::browser::Session;
use crate::rate_limit::sleep_or_cancel;

/// Title fragments of the verification interstitial.
pub const CHALLENGE_MARKERS: [&str; 3] =
    ["Just a moment", "Verify you are human", "Checking your browser"];

/// Body fragments of the interstitial, checked when the title is generic.
const CHALLENGE_BODY_MARKERS: [&str; 2] = ["Verify you are human", "Checking your browser"];

/// Fragments of a hard block page. Such a document is never content.
pub const BLOCK_MARKERS: [&str; 2] = [
    "Please unblock challenges.cloudflare.com",
    "Sorry, you have been blocked",
];

#[must_use]
pub fn is_challenge(title: &str, html: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|m| title.contains(m))
        || CHALLENGE_BODY_MARKERS.iter().any(|m| html.contains(m))
}

#[must_use]
pub fn is_blocked(html: &str) -> bool {
    BLOCK_MARKERS.iter().any(|m| html.contains(m))
}

#[derive(Debug, Clone, Copy)]
pub struct ChallengePolicy {
    pub timeout: Duration,
    pub settle: Duration,
    pub poll_interval: Duration,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            settle: Duration::from_millis(3_000),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChallengeOutcome {
    /// An interstitial was seen and then cleared.
    pub bypassed: bool,
    /// An interstitial was seen and was still up when the timeout elapsed.
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChallengeGate {
    policy: ChallengePolicy,
}

impl ChallengeGate {
    #[must_use]
    pub fn new(policy: ChallengePolicy) -> Self {
        Self { policy }
    }

    /// Waits, bounded by the policy timeout, for an interstitial to clear.
    ///
    /// Returns immediately when no interstitial is showing. Never fails: a
    /// timeout is logged and reported through `timed_out`, and cancellation
    /// simply ends the wait early.
    pub async fn await_ready(
        &self,
        session: &dyn Session,
        cancel: &CancellationToken,
    ) -> ChallengeOutcome {
        if !challenged(session).await {
            return ChallengeOutcome::default();
        }

        tracing::warn!(
            timeout_ms = self.policy.timeout.as_millis(),
            "bot challenge detected, waiting for it to clear"
        );

        let deadline = Instant::now() + self.policy.timeout;
        let mut outcome = ChallengeOutcome::default();
        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("bot challenge still present after timeout, continuing anyway");
                outcome.timed_out = true;
                break;
            }
            let pause = self.policy.poll_interval.min(deadline - now);
            if !sleep_or_cancel(pause, cancel).await {
                return outcome;
            }
            if !challenged(session).await {
                tracing::info!("bot challenge cleared");
                outcome.bypassed = true;
                break;
            }
        }

        sleep_or_cancel(self.policy.settle, cancel).await;
        outcome
    }
}

/// A session whose title or content cannot be read is treated as still
/// behind the interstitial.
async fn challenged(session: &dyn Session) -> bool {
    let title = match session.title().await {
        Ok(title) => title,
        Err(e) => {
            tracing::debug!(error = %e, "could not read title while checking for challenge");
            return true;
        }
    };
    if CHALLENGE_MARKERS.iter().any(|m| title.contains(m)) {
        return true;
    }
    match session.content().await {
        Ok(html) => is_challenge(&title, &html),
        Err(e) => {
            tracing::debug!(error = %e, "could not read content while checking for challenge");
            true
        }
    }
}
