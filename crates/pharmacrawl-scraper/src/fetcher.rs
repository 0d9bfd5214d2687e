//! Rendered-document acquisition for one target at a time.
//!
//! [`Fetcher`] is the cheap, cloneable recipe (launcher, scratch store,
//! policy). [`Fetcher::launch`] starts the browser for one run and returns a
//! [`LiveFetcher`] that owns it until [`LiveFetcher::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pharmacrawl_core::config::DEFAULT_USER_AGENT;
use pharmacrawl_core::{AppConfig, Origins, SiteVariant};
use tokio_util::sync::CancellationToken;

use crate::browser::{
    Browser, BrowserError, BrowserLauncher, Fingerprint, LaunchOptions, NavigateOptions, Session,
    WaitUntil,
};
use crate::challenge::{is_blocked, ChallengeGate, ChallengeOutcome, ChallengePolicy};
use crate::error::{FetchError, FetchErrorKind, ScraperError};
use crate::rate_limit::{retry_with_backoff, sleep_or_cancel};
use crate::scratch::ScratchStore;
use crate::types::{RawDocument, Target};

#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub navigation_timeout: Duration,
    pub challenge: ChallengePolicy,
    pub legacy_post_load_delay: Duration,
    pub current_post_load_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff_base: Duration,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(60_000),
            challenge: ChallengePolicy::default(),
            legacy_post_load_delay: Duration::from_millis(2_000),
            current_post_load_delay: Duration::from_millis(3_000),
            max_retries: 0,
            retry_backoff_base: Duration::from_millis(5_000),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            challenge: ChallengePolicy {
                timeout: Duration::from_millis(config.challenge_timeout_ms),
                settle: Duration::from_millis(config.challenge_settle_ms),
                ..ChallengePolicy::default()
            },
            legacy_post_load_delay: Duration::from_millis(config.legacy_post_load_delay_ms),
            current_post_load_delay: Duration::from_millis(config.current_post_load_delay_ms),
            max_retries: config.max_retries,
            retry_backoff_base: Duration::from_millis(config.retry_backoff_base_ms),
            user_agent: config.user_agent.clone(),
        }
    }

    fn post_load_delay(&self, site: SiteVariant) -> Duration {
        match site {
            SiteVariant::Legacy => self.legacy_post_load_delay,
            SiteVariant::Current => self.current_post_load_delay,
        }
    }
}

/// The legacy site never reaches network idle; its product markup is in
/// place once the DOM is parsed.
fn wait_condition(site: SiteVariant) -> WaitUntil {
    match site {
        SiteVariant::Legacy => WaitUntil::DomContentLoaded,
        SiteVariant::Current => WaitUntil::NetworkIdle,
    }
}

#[must_use]
pub fn launch_options_from_config(config: &AppConfig) -> LaunchOptions {
    LaunchOptions {
        headless: config.headless,
        executable: config.chrome_path.clone(),
        ..LaunchOptions::default()
    }
}

#[derive(Clone)]
pub struct Fetcher {
    launcher: Arc<dyn BrowserLauncher>,
    scratch: Arc<dyn ScratchStore>,
    launch_options: LaunchOptions,
    policy: FetchPolicy,
    origins: Origins,
}

impl Fetcher {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        scratch: Arc<dyn ScratchStore>,
        launch_options: LaunchOptions,
        policy: FetchPolicy,
        origins: Origins,
    ) -> Self {
        Self {
            launcher,
            scratch,
            launch_options,
            policy,
            origins,
        }
    }

    #[must_use]
    pub fn origins(&self) -> &Origins {
        &self.origins
    }

    /// Starts the browser process for one run.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::SetupFailure`] if the browser cannot be launched.
    pub async fn launch(&self) -> Result<LiveFetcher, ScraperError> {
        let browser = self
            .launcher
            .launch(&self.launch_options)
            .await
            .map_err(|e| ScraperError::SetupFailure(e.to_string()))?;

        Ok(LiveFetcher {
            browser,
            scratch: Arc::clone(&self.scratch),
            gate: ChallengeGate::new(self.policy.challenge),
            fingerprint: Fingerprint::desktop(self.policy.user_agent.clone()),
            policy: self.policy.clone(),
            origins: self.origins.clone(),
        })
    }
}

/// A fetcher bound to one running browser.
pub struct LiveFetcher {
    browser: Box<dyn Browser>,
    scratch: Arc<dyn ScratchStore>,
    gate: ChallengeGate,
    fingerprint: Fingerprint,
    policy: FetchPolicy,
    origins: Origins,
}

impl LiveFetcher {
    /// Fetches the rendered document for `target` and keeps a scratch copy
    /// under `target.scratch_key()`.
    ///
    /// Transient failures are retried per the policy's `max_retries`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] classified by [`FetchErrorKind`].
    pub async fn fetch(
        &self,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<RawDocument, FetchError> {
        let url = target.url(&self.origins);
        let describe = target.describe();
        let site = target.site();

        let (html, challenge) = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base,
            cancel,
            || self.load(&url, &describe, site, cancel),
        )
        .await?;

        let scratch_key = target.scratch_key();
        if let Err(e) = self.scratch.write(&scratch_key, html.as_bytes()).await {
            tracing::warn!(target = %describe, error = %e, "could not persist document to scratch");
        }

        Ok(RawDocument {
            html,
            target: target.clone(),
            fetched_at: Utc::now(),
            scratch_key,
            challenge,
        })
    }

    /// Fetches an arbitrary storefront page, used for category discovery.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] classified by [`FetchErrorKind`].
    pub async fn fetch_index(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let describe = format!("index {url}");
        let (html, _) = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base,
            cancel,
            || self.load(url, &describe, SiteVariant::Current, cancel),
        )
        .await?;
        Ok(html)
    }

    /// Drops the scratch copy of a resolved target. Best-effort.
    pub async fn release(&self, scratch_key: &str) {
        if let Err(e) = self.scratch.delete(scratch_key).await {
            tracing::warn!(scratch_key, error = %e, "could not delete scratch document");
        }
    }

    /// Closes the browser process.
    pub async fn shutdown(self) {
        match self.browser.close().await {
            Ok(()) => tracing::info!("browser closed"),
            Err(e) => tracing::warn!(error = %e, "browser close error"),
        }
    }

    /// One attempt: fresh session, always closed afterwards.
    async fn load(
        &self,
        url: &str,
        describe: &str,
        site: SiteVariant,
        cancel: &CancellationToken,
    ) -> Result<(String, ChallengeOutcome), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::cancelled(describe));
        }

        let session = self
            .browser
            .open_session()
            .await
            .map_err(|e| browser_failure(&e, describe))?;

        let result = self.drive(session.as_ref(), url, describe, site, cancel).await;

        if let Err(e) = session.close().await {
            tracing::debug!(target = %describe, error = %e, "session close error");
        }
        result
    }

    async fn drive(
        &self,
        session: &dyn Session,
        url: &str,
        describe: &str,
        site: SiteVariant,
        cancel: &CancellationToken,
    ) -> Result<(String, ChallengeOutcome), FetchError> {
        session
            .set_fingerprint(&self.fingerprint)
            .await
            .map_err(|e| browser_failure(&e, describe))?;

        tracing::debug!(target = %describe, url, "navigating");
        let options = NavigateOptions {
            wait_until: wait_condition(site),
            timeout: self.policy.navigation_timeout,
        };
        tokio::select! {
            () = cancel.cancelled() => return Err(FetchError::cancelled(describe)),
            navigated = session.navigate(url, options) => {
                navigated.map_err(|e| browser_failure(&e, describe))?;
            }
        }

        let challenge = self.gate.await_ready(session, cancel).await;
        if !sleep_or_cancel(self.policy.post_load_delay(site), cancel).await {
            return Err(FetchError::cancelled(describe));
        }

        let html = session
            .content()
            .await
            .map_err(|e| browser_failure(&e, describe))?;

        if is_blocked(&html) {
            return Err(FetchError::new(
                FetchErrorKind::BlockedByOrigin,
                describe,
                "origin served a block page",
            ));
        }

        Ok((html, challenge))
    }
}

fn browser_failure(err: &BrowserError, describe: &str) -> FetchError {
    let kind = match err {
        BrowserError::Timeout(_) => FetchErrorKind::NavigationTimeout,
        BrowserError::Network(_) => FetchErrorKind::Network,
        BrowserError::Launch(_) | BrowserError::Protocol(_) => FetchErrorKind::Browser,
    };
    FetchError::new(kind, describe, err.to_string())
}
