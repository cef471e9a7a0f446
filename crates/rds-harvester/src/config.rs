//! Run configuration and registry constants.
//!
//! Every setting has a default matching the registry's public deployment;
//! the CLI overrides individual fields.

use std::path::PathBuf;
use std::time::Duration;

use crate::acquisition::retry::RetryPolicy;

/// Registry origin, used for cookies and the `Origin` header.
pub const REGISTRY_ORIGIN: &str = "https://pub.fsa.gov.ru";

/// Declaration search endpoint.
pub const SEARCH_ENDPOINT: &str = "https://pub.fsa.gov.ru/api/v1/rds/common/declarations/get";

/// Declaration list page; the SPA stores its token in local storage here.
pub const DECLARATION_PAGE: &str = "https://pub.fsa.gov.ru/rds/declaration";

/// Detail pages live at `<base>/<id>/common`.
pub const DETAIL_URL_BASE: &str = "https://pub.fsa.gov.ru/rds/declaration/view";

/// Local-storage key holding the bearer token.
pub const TOKEN_STORAGE_KEY: &str = "fgis_token";

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_RETRIEVAL_WORKERS: usize = 10;
pub const DEFAULT_ENRICH_WORKERS: usize = 3;

/// Search API and URL settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub origin: String,
    pub endpoint: String,
    pub declaration_page: String,
    pub detail_base: String,
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: REGISTRY_ORIGIN.to_string(),
            endpoint: SEARCH_ENDPOINT.to_string(),
            declaration_page: DECLARATION_PAGE.to_string(),
            detail_base: DETAIL_URL_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP session settings shared by every retrieval task.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Cookies seeded into the jar for the registry origin.
    pub cookies: Vec<(String, String)>,
    /// Proxy URL applied to API traffic and browser instances.
    pub proxy: Option<String>,
}

/// Resolved filter codes for the search payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCodes {
    pub status: Vec<i64>,
    pub decl_types: Vec<i64>,
    pub applicant_types: Vec<i64>,
}

/// Browser settings used by both token extraction and enrichment.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Explicit Chromium binary; otherwise looked up on the system.
    pub chrome_path: Option<PathBuf>,
    pub proxy: Option<String>,
    /// Show the browser window.
    pub headed: bool,
}

/// Token extraction settings.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub page_url: String,
    pub storage_key: String,
    /// Fixed wait after navigation before reading local storage.
    pub settle: Duration,
    pub navigation_timeout: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            page_url: DECLARATION_PAGE.to_string(),
            storage_key: TOKEN_STORAGE_KEY.to_string(),
            settle: Duration::from_secs(5),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// Contact enrichment settings.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Text that must appear in the rendered DOM before parsing.
    pub marker: String,
    /// How long to wait for the marker per attempt.
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    pub attempts: u32,
    /// Pause before each reload.
    pub retry_pause: Duration,
    pub navigation_timeout: Duration,
    pub workers: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            marker: "Сведения о заявителе".to_string(),
            wait_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            attempts: 3,
            retry_pause: Duration::from_secs(2),
            navigation_timeout: Duration::from_secs(30),
            workers: DEFAULT_ENRICH_WORKERS,
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub workbook: PathBuf,
    pub contacts: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("declarations.xlsx"),
            contacts: PathBuf::from("contacts.txt"),
        }
    }
}

/// Everything one harvesting run needs.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub filter: FilterCodes,
    pub retry: RetryPolicy,
    pub retrieval_workers: usize,
    pub browser: BrowserOptions,
    pub token: TokenConfig,
    pub enrich: EnrichConfig,
    pub output: OutputConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            filter: FilterCodes::default(),
            retry: RetryPolicy::default(),
            retrieval_workers: DEFAULT_RETRIEVAL_WORKERS,
            browser: BrowserOptions::default(),
            token: TokenConfig::default(),
            enrich: EnrichConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
