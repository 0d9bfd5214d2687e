//! In-memory stand-ins for the browser and scratch seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pharmacrawl_core::{Origins, SiteVariant};
use pharmacrawl_scraper::browser::{Fingerprint, NavigateOptions};
use pharmacrawl_scraper::challenge::ChallengePolicy;
use pharmacrawl_scraper::pagination::listing_page_url;
use pharmacrawl_scraper::{
    Browser, BrowserError, BrowserLauncher, CrawlPolicy, Crawler, FetchPolicy, Fetcher,
    LaunchOptions, ScratchStore, Session, Target,
};

pub const LEGACY_ORIGIN: &str = "https://www.aversi.ge";
pub const CURRENT_ORIGIN: &str = "https://shop.aversi.ge";

#[derive(Clone)]
pub enum Reply {
    Html(String),
    Error(BrowserError),
}

/// Scripted origin: URL to reply, plus a log of every navigation.
#[derive(Default)]
pub struct FakeSite {
    replies: Mutex<HashMap<String, Reply>>,
    visited: Mutex<Vec<String>>,
    sessions_open: Mutex<usize>,
}

impl FakeSite {
    pub fn serve(&self, url: impl Into<String>, html: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.into(), Reply::Html(html.into()));
    }

    pub fn fail(&self, url: impl Into<String>, err: BrowserError) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.into(), Reply::Error(err));
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn sessions_open(&self) -> usize {
        *self.sessions_open.lock().unwrap()
    }
}

pub struct FakeLauncher {
    pub site: Arc<FakeSite>,
    pub fail_launch: bool,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError> {
        if self.fail_launch {
            return Err(BrowserError::Launch("no chrome binary".to_string()));
        }
        Ok(Box::new(FakeBrowser {
            site: Arc::clone(&self.site),
        }))
    }
}

struct FakeBrowser {
    site: Arc<FakeSite>,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn open_session(&self) -> Result<Box<dyn Session>, BrowserError> {
        *self.site.sessions_open.lock().unwrap() += 1;
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            html: Mutex::new(String::new()),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        Ok(())
    }
}

struct FakeSession {
    site: Arc<FakeSite>,
    html: Mutex<String>,
}

#[async_trait]
impl Session for FakeSession {
    async fn set_fingerprint(&self, _: &Fingerprint) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn navigate(&self, url: &str, _: NavigateOptions) -> Result<(), BrowserError> {
        self.site.visited.lock().unwrap().push(url.to_string());
        let reply = self.site.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Html(html)) => {
                *self.html.lock().unwrap() = html;
                Ok(())
            }
            Some(Reply::Error(err)) => Err(err),
            None => Err(BrowserError::Network(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            ))),
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        let html = self.html.lock().unwrap().clone();
        let title = html
            .split_once("<title>")
            .and_then(|(_, rest)| rest.split_once("</title>"))
            .map(|(title, _)| title.to_string())
            .unwrap_or_default();
        Ok(title)
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.html.lock().unwrap().clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        *self.site.sessions_open.lock().unwrap() -= 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryScratch {
    files: Mutex<HashMap<String, Vec<u8>>>,
    writes: Mutex<usize>,
}

impl MemoryScratch {
    pub fn keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ScratchStore for MemoryScratch {
    async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        *self.writes.lock().unwrap() += 1;
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    async fn delete(&self, key: &str) -> io::Result<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }
}

pub fn origins() -> Origins {
    Origins {
        legacy: LEGACY_ORIGIN.to_string(),
        current: CURRENT_ORIGIN.to_string(),
    }
}

/// Policy with every wait collapsed so tests run instantly.
pub fn instant_policy() -> FetchPolicy {
    FetchPolicy {
        navigation_timeout: Duration::from_secs(5),
        challenge: ChallengePolicy {
            timeout: Duration::from_millis(20),
            settle: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
        },
        legacy_post_load_delay: Duration::ZERO,
        current_post_load_delay: Duration::ZERO,
        max_retries: 0,
        retry_backoff_base: Duration::ZERO,
        user_agent: "test-agent".to_string(),
    }
}

pub fn fetcher(site: &Arc<FakeSite>, scratch: &Arc<MemoryScratch>) -> Fetcher {
    Fetcher::new(
        Arc::new(FakeLauncher {
            site: Arc::clone(site),
            fail_launch: false,
        }),
        Arc::clone(scratch) as Arc<dyn ScratchStore>,
        LaunchOptions::default(),
        instant_policy(),
        origins(),
    )
}

pub fn crawler(
    site: &Arc<FakeSite>,
    scratch: &Arc<MemoryScratch>,
    debug_dir: Option<std::path::PathBuf>,
) -> Crawler {
    paced_crawler(site, scratch, Duration::ZERO, debug_dir)
}

pub fn paced_crawler(
    site: &Arc<FakeSite>,
    scratch: &Arc<MemoryScratch>,
    inter_request_delay: Duration,
    debug_dir: Option<std::path::PathBuf>,
) -> Crawler {
    Crawler::new(
        fetcher(site, scratch),
        CrawlPolicy {
            inter_request_delay,
            debug_dir,
        },
    )
}

pub fn listing(base_url: &str, page_size: u32, last_page: u32) -> Target {
    Target::ListingPage {
        base_url: base_url.to_string(),
        page_number: 1,
        page_size,
        site: SiteVariant::Current,
        last_page,
        category: base_url.to_string(),
    }
}

pub fn page_url(base_url: &str, page: u32, page_size: u32) -> String {
    listing_page_url(base_url, page, page_size)
}

/// A listing page of `count` titled tiles with codes `{prefix}{n}`.
pub fn tiles_page(prefix: &str, count: usize) -> String {
    let tiles: String = (0..count)
        .map(|n| {
            format!(
                r#"<div class="col-tile"><a class="product-title">{prefix} item {n}</a><span class="ty-price-num">{n},50</span><input type="hidden" name="product_data[{n}][product_code]" value="{prefix}{n}"></div>"#
            )
        })
        .collect();
    format!("<html><head><title>Listing</title></head><body>{tiles}</body></html>")
}
