use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// Strava rejects anything above this.
const MAX_PAGE_SIZE: u32 = 200;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("max_pages must be at least 1")]
    InvalidMaxPages,

    #[error("page_size must be between 1 and 200, got {0}")]
    InvalidPageSize(u32),

    #[error("page_timeout_secs cannot be 0")]
    InvalidPageTimeout,

    #[error("filter keyword cannot be empty")]
    EmptyKeyword,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

fn default_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8080,
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8081,
    }
}

/// OAuth application credentials and the upstream base URLs.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: Url,
}

impl StravaConfig {
    pub fn activities_url(&self) -> Result<Url, url::ParseError> {
        endpoint(&self.api_base_url, "athlete/activities")
    }

    pub fn authorize_url(&self) -> Result<Url, url::ParseError> {
        endpoint(&self.oauth_base_url, "authorize")
    }

    pub fn token_url(&self) -> Result<Url, url::ParseError> {
        endpoint(&self.oauth_base_url, "token")
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    // `Url::join` replaces the last path segment unless the base ends in a slash
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
}

fn default_api_base_url() -> Url {
    Url::parse("https://www.strava.com/api/v3/").expect("static URL is valid")
}

fn default_oauth_base_url() -> Url {
    Url::parse("https://www.strava.com/oauth/").expect("static URL is valid")
}

/// Bounds of the parallel page fan-out.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Number of pages requested concurrently on a cache miss.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Records per page (`per_page` query parameter).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Earliest activity date of interest, sent as the `after` parameter.
    #[serde(default = "default_activities_after")]
    pub activities_after: NaiveDate,
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
}

impl FetchConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// `activities_after` as seconds since the epoch, at midnight UTC.
    pub fn after_timestamp(&self) -> i64 {
        self.activities_after
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_pages: default_max_pages(),
            page_size: default_page_size(),
            activities_after: default_activities_after(),
            page_timeout_secs: default_page_timeout_secs(),
        }
    }
}

fn default_max_pages() -> u32 {
    10
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_activities_after() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 22).expect("static date is valid")
}

fn default_page_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

impl CacheConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            freshness_secs: default_freshness_secs(),
        }
    }
}

fn default_freshness_secs() -> u64 {
    10 * 60
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FilterConfig {
    #[serde(default = "default_keyword")]
    pub keyword: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            keyword: default_keyword(),
        }
    }
}

fn default_keyword() -> String {
    "terminus".into()
}

fn default_static_dir() -> Option<PathBuf> {
    Some(PathBuf::from("static"))
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    pub strava: StravaConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    /// Directory holding `index.html` and the `/static` assets. `null`
    /// disables static file serving.
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.fetch.max_pages == 0 {
            return Err(ValidationError::InvalidMaxPages);
        }
        if self.fetch.page_size == 0 || self.fetch.page_size > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidPageSize(self.fetch.page_size));
        }
        if self.fetch.page_timeout_secs == 0 {
            return Err(ValidationError::InvalidPageTimeout);
        }
        if self.filter.keyword.trim().is_empty() {
            return Err(ValidationError::EmptyKeyword);
        }

        Ok(())
    }
}
