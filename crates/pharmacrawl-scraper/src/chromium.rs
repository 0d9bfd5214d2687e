//! Chromium-backed implementation of the browser seams over `chromiumoxide`.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventLifecycleEvent, NavigateParams,
    SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::browser::{
    Browser, BrowserError, BrowserLauncher, Fingerprint, LaunchOptions, NavigateOptions, Session,
    WaitUntil,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError> {
        let (width, height) = options.window;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        tracing::info!(headless = options.headless, "browser launched");
        Ok(Box::new(ChromiumBrowser {
            browser,
            handler_task,
        }))
    }
}

struct ChromiumBrowser {
    browser: CdpBrowser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_session(&self) -> Result<Box<dyn Session>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(map_cdp_error)?;
        Ok(Box::new(ChromiumSession { page }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let ChromiumBrowser {
            mut browser,
            handler_task,
        } = *self;
        let closed = browser.close().await.map(|_| ()).map_err(map_cdp_error);
        if closed.is_ok() {
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "browser process did not exit cleanly");
            }
        }
        handler_task.abort();
        closed
    }
}

struct ChromiumSession {
    page: Page,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn set_fingerprint(&self, fingerprint: &Fingerprint) -> Result<(), BrowserError> {
        let (width, height) = fingerprint.viewport;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            ))
            .await
            .map_err(map_cdp_error)?;

        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(
                fingerprint.user_agent.clone(),
            ))
            .await
            .map_err(map_cdp_error)?;

        let headers: serde_json::Map<String, serde_json::Value> = fingerprint
            .extra_headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(
                serde_json::Value::Object(headers),
            )))
            .await
            .map_err(map_cdp_error)?;

        self.page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                fingerprint.init_script.clone(),
            ))
            .await
            .map_err(map_cdp_error)?;
        Ok(())
    }

    async fn navigate(&self, url: &str, options: NavigateOptions) -> Result<(), BrowserError> {
        let expected = lifecycle_event(options.wait_until);
        match tokio::time::timeout(options.timeout, navigate_until(&self.page, url, expected)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(BrowserError::Timeout(options.timeout)),
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        let title = self.page.get_title().await.map_err(map_cdp_error)?;
        Ok(title.unwrap_or_default())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page.content().await.map_err(map_cdp_error)
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.page.close().await.map_err(map_cdp_error)
    }
}

/// Navigates and waits for the `expected` lifecycle event of the new document.
async fn navigate_until(page: &Page, url: &str, expected: &str) -> Result<(), BrowserError> {
    page.execute(SetLifecycleEventsEnabledParams::new(true))
        .await
        .map_err(map_cdp_error)?;
    // Subscribe before navigating so early lifecycle events are not lost.
    let mut events = page
        .event_listener::<EventLifecycleEvent>()
        .await
        .map_err(map_cdp_error)?;
    let response = page
        .execute(NavigateParams::new(url))
        .await
        .map_err(map_cdp_error)?;
    if let Some(error_text) = &response.result.error_text {
        return Err(BrowserError::Network(error_text.clone()));
    }
    let frame = response.result.frame_id.inner();
    let loader = response.result.loader_id.as_ref().map(|id| id.inner().as_str());

    while let Some(event) = events.next().await {
        if completes_navigation(
            &event.name,
            event.frame_id.inner(),
            event.loader_id.inner(),
            expected,
            frame,
            loader,
        ) {
            return Ok(());
        }
    }
    Err(BrowserError::Protocol(
        "lifecycle event stream closed before navigation finished".to_string(),
    ))
}

/// Name of the page lifecycle event that marks `wait_until` as reached.
fn lifecycle_event(wait_until: WaitUntil) -> &'static str {
    match wait_until {
        WaitUntil::DomContentLoaded => "DOMContentLoaded",
        WaitUntil::NetworkIdle => "networkIdle",
    }
}

/// Whether a lifecycle event finishes the navigation started on `frame`.
/// Same-document navigations report no loader, so the frame decides.
fn completes_navigation(
    name: &str,
    event_frame: &str,
    event_loader: &str,
    expected: &str,
    frame: &str,
    loader: Option<&str>,
) -> bool {
    if name != expected {
        return false;
    }
    match loader {
        Some(loader) => event_loader == loader,
        None => event_frame == frame,
    }
}

fn map_cdp_error(err: CdpError) -> BrowserError {
    match err {
        CdpError::Timeout => BrowserError::Timeout(Duration::ZERO),
        other => {
            let message = other.to_string();
            if message.contains("net::ERR_") {
                BrowserError::Network(message)
            } else {
                BrowserError::Protocol(message)
            }
        }
    }
}
