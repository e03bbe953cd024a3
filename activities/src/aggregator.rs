use crate::config::FetchConfig;
use crate::metrics_defs::{FETCH_RECORDS, FETCH_TRUNCATED};
use crate::page_fetcher::{FetchError, PageSource};
use crate::types::{AccessToken, FetchedActivities};
use async_trait::async_trait;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Produces every activity of a user that the upstream is willing to return.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch_all(&self, token: &AccessToken) -> Result<FetchedActivities, FetchError>;
}

/// Fans out a fixed number of page requests and merges the results.
///
/// Pages `1..=max_pages` are always requested, whatever the size of the
/// user's history. Empty pages contribute nothing. The first failing page
/// aborts the pages still in flight and the whole fetch fails with that error,
/// so partial results are never returned.
pub struct ParallelAggregator {
    pages: Arc<dyn PageSource>,
    max_pages: u32,
    page_size: u32,
    page_timeout: Duration,
}

impl ParallelAggregator {
    pub fn new(pages: Arc<dyn PageSource>, fetch: &FetchConfig) -> Self {
        ParallelAggregator {
            pages,
            max_pages: fetch.max_pages,
            page_size: fetch.page_size,
            page_timeout: fetch.page_timeout(),
        }
    }
}

#[async_trait]
impl ActivitySource for ParallelAggregator {
    async fn fetch_all(&self, token: &AccessToken) -> Result<FetchedActivities, FetchError> {
        let mut join_set = JoinSet::new();

        for page in 1..=self.max_pages {
            let pages = self.pages.clone();
            let token = token.clone();
            let page_timeout = self.page_timeout;

            join_set.spawn(async move {
                let result = match timeout(page_timeout, pages.fetch_page(&token, page)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout { page }),
                };
                (page, result)
            });
        }

        let mut fetched = Vec::with_capacity(self.max_pages as usize);

        while let Some(join_result) = join_set.join_next().await {
            let error = match join_result {
                Ok((page, Ok(records))) => {
                    fetched.push((page, records));
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(e) => FetchError::TaskFailed(e.to_string()),
            };

            tracing::warn!(
                error = %error,
                in_flight = join_set.len(),
                "page fetch failed, aborting remaining pages"
            );
            join_set.abort_all();
            return Err(error);
        }

        // Completion order is arbitrary; merge in page order
        fetched.sort_unstable_by_key(|(page, _)| *page);

        let truncated = fetched.iter().any(|(page, records)| {
            *page == self.max_pages && records.len() >= self.page_size as usize
        });
        let records: Vec<_> = fetched.into_iter().flat_map(|(_, records)| records).collect();

        histogram!(FETCH_RECORDS).record(records.len() as f64);
        if truncated {
            counter!(FETCH_TRUNCATED).increment(1);
            tracing::warn!(
                max_pages = self.max_pages,
                page_size = self.page_size,
                "last page was full, older activities may be missing"
            );
        }

        Ok(FetchedActivities { records, truncated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityRecord;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct MockPages {
        sizes: HashMap<u32, usize>,
        failing: HashSet<u32>,
        slow: HashSet<u32>,
        requested: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl PageSource for MockPages {
        async fn fetch_page(
            &self,
            token: &AccessToken,
            page: u32,
        ) -> Result<Vec<ActivityRecord>, FetchError> {
            assert_eq!(token.as_str(), "token");
            self.requested.lock().push(page);

            if self.slow.contains(&page) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.contains(&page) {
                return Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR));
            }

            let size = self.sizes.get(&page).copied().unwrap_or(0);
            Ok((0..size)
                .map(|i| {
                    let record = serde_json::json!({ "id": page * 1000 + i as u32 });
                    record.as_object().unwrap().clone()
                })
                .collect())
        }
    }

    fn aggregator(pages: MockPages, fetch: FetchConfig) -> (Arc<MockPages>, ParallelAggregator) {
        let pages = Arc::new(pages);
        let aggregator = ParallelAggregator::new(pages.clone(), &fetch);
        (pages, aggregator)
    }

    #[tokio::test]
    async fn test_fetch_all_merges_every_page() {
        let sizes = HashMap::from([(1, 200), (2, 200), (3, 57), (5, 4)]);
        let (pages, aggregator) = aggregator(
            MockPages {
                sizes,
                ..Default::default()
            },
            FetchConfig::default(),
        );

        let fetched = aggregator
            .fetch_all(&AccessToken::new("token"))
            .await
            .unwrap();

        assert_eq!(fetched.records.len(), 461);
        assert!(!fetched.truncated);

        // No duplicates
        let ids: HashSet<_> = fetched.records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert_eq!(ids.len(), 461);

        // Exactly one request per page, empty pages included
        let mut requested = pages.requested.lock().clone();
        requested.sort();
        assert_eq!(requested, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fetch_all_empty() {
        let (_, aggregator) = aggregator(MockPages::default(), FetchConfig::default());
        let fetched = aggregator
            .fetch_all(&AccessToken::new("token"))
            .await
            .unwrap();
        assert_eq!(fetched, FetchedActivities::default());
    }

    #[tokio::test]
    async fn test_any_failed_page_fails_the_fetch() {
        let (_, aggregator) = aggregator(
            MockPages {
                sizes: HashMap::from([(1, 10), (2, 10)]),
                failing: HashSet::from([4]),
                ..Default::default()
            },
            FetchConfig::default(),
        );

        let result = aggregator.fetch_all(&AccessToken::new("token")).await;
        assert!(matches!(
            result,
            Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_wait_for_slow_pages() {
        let (_, aggregator) = aggregator(
            MockPages {
                failing: HashSet::from([1]),
                slow: (2..=10).collect(),
                ..Default::default()
            },
            FetchConfig::default(),
        );

        let started = tokio::time::Instant::now();
        let result = aggregator.fetch_all(&AccessToken::new("token")).await;

        assert!(matches!(result, Err(FetchError::Status(_))));
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_page_times_out() {
        let (_, aggregator) = aggregator(
            MockPages {
                sizes: HashMap::from([(1, 10)]),
                slow: HashSet::from([7]),
                ..Default::default()
            },
            FetchConfig::default(),
        );

        let result = aggregator.fetch_all(&AccessToken::new("token")).await;
        assert!(matches!(result, Err(FetchError::Timeout { page: 7 })));
    }

    #[tokio::test]
    async fn test_full_last_page_is_truncated() {
        let fetch = FetchConfig {
            max_pages: 2,
            page_size: 3,
            ..Default::default()
        };

        let (_, full) = aggregator(
            MockPages {
                sizes: HashMap::from([(1, 3), (2, 3)]),
                ..Default::default()
            },
            fetch.clone(),
        );
        let fetched = full.fetch_all(&AccessToken::new("token")).await.unwrap();
        assert_eq!(fetched.records.len(), 6);
        assert!(fetched.truncated);

        let (_, partial) = aggregator(
            MockPages {
                sizes: HashMap::from([(1, 3), (2, 2)]),
                ..Default::default()
            },
            fetch,
        );
        let fetched = partial.fetch_all(&AccessToken::new("token")).await.unwrap();
        assert_eq!(fetched.records.len(), 5);
        assert!(!fetched.truncated);
    }
}
