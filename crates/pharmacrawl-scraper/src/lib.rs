pub mod browser;
pub mod challenge;
pub mod chromium;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod normalize;
pub mod pagination;
mod rate_limit;
pub mod result;
pub mod scratch;
pub mod status;
pub mod targets;
pub mod types;

pub use browser::{Browser, BrowserError, BrowserLauncher, LaunchOptions, Session};
pub use chromium::ChromiumLauncher;
pub use crawl::{CrawlPolicy, Crawler};
pub use error::{FetchError, FetchErrorKind, ScraperError};
pub use fetcher::{launch_options_from_config, FetchPolicy, Fetcher, LiveFetcher};
pub use normalize::{normalize_price, normalize_record, normalize_text};
pub use rate_limit::sleep_or_cancel;
pub use result::{CategoryCounts, CrawlResult, CrawlStatistics, FailedTarget};
pub use scratch::{wipe_scratch_dir, FsScratchStore, ScratchStore};
pub use status::{AlreadyRunning, CrawlStatus, RunGuard, StatusHandle};
pub use targets::{enumerate, static_targets};
pub use types::{RawDocument, RawRecord, Target};
