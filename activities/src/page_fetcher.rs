use crate::config::FetchConfig;
use crate::metrics_defs::{PAGE_FETCH_DURATION, PAGE_FETCH_ERRORS};
use crate::types::{AccessToken, ActivityRecord};
use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use shared::{counter, histogram};
use std::io::Read;
use std::time::Instant;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("activities request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("activities API returned {0}")]
    Status(StatusCode),
    #[error("could not inflate response body: {0}")]
    Decompress(#[from] std::io::Error),
    #[error("could not decode activities: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("page {page} timed out")]
    Timeout { page: u32 },
    #[error("page fetch task failed: {0}")]
    TaskFailed(String),
}

/// Fetches a single page of a user's activities.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        token: &AccessToken,
        page: u32,
    ) -> Result<Vec<ActivityRecord>, FetchError>;
}

#[derive(Serialize, Debug)]
struct PageQuery {
    page: u32,
    per_page: u32,
    after: i64,
    before: i64,
}

/// Reads pages from `GET {api_base_url}/athlete/activities`.
pub struct PageFetcher {
    client: reqwest::Client,
    activities_url: Url,
    page_size: u32,
    after: i64,
}

impl PageFetcher {
    pub fn new(activities_url: Url, fetch: &FetchConfig) -> Self {
        PageFetcher {
            client: reqwest::Client::new(),
            activities_url,
            page_size: fetch.page_size,
            after: fetch.after_timestamp(),
        }
    }

    async fn request_page(
        &self,
        token: &AccessToken,
        page: u32,
    ) -> Result<Vec<ActivityRecord>, FetchError> {
        // `before` is always the current time, never cached
        let query = PageQuery {
            page,
            per_page: self.page_size,
            after: self.after,
            before: Utc::now().timestamp(),
        };

        let response = self
            .client
            .get(self.activities_url.clone())
            .bearer_auth(token.as_str())
            .header(ACCEPT_ENCODING, "gzip")
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"gzip"));
        let body = response.bytes().await?;

        decode_page(&body, gzipped)
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(
        &self,
        token: &AccessToken,
        page: u32,
    ) -> Result<Vec<ActivityRecord>, FetchError> {
        let started = Instant::now();
        let result = self.request_page(token, page).await;
        histogram!(PAGE_FETCH_DURATION).record(started.elapsed().as_secs_f64());

        match &result {
            Ok(records) => tracing::debug!(page, records = records.len(), "fetched page"),
            Err(e) => {
                counter!(PAGE_FETCH_ERRORS).increment(1);
                tracing::warn!(page, error = %e, "page fetch failed");
            }
        }
        result
    }
}

fn decode_page(body: &[u8], gzipped: bool) -> Result<Vec<ActivityRecord>, FetchError> {
    if gzipped {
        let mut inflated = Vec::new();
        GzDecoder::new(body).read_to_end(&mut inflated)?;
        Ok(serde_json::from_slice(&inflated)?)
    } else {
        Ok(serde_json::from_slice(body)?)
    }
}
