use crate::aggregator::ActivitySource;
use crate::page_fetcher::FetchError;
use crate::types::{AccessToken, ActivityRecord, FetchedActivities};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Outcome = Box<dyn Fn() -> Result<FetchedActivities, FetchError> + Send + Sync>;

/// Stands in for the page fan-out and records how it was called.
pub struct MockSource {
    outcome: Outcome,
    calls: AtomicUsize,
    last_token: Mutex<Option<AccessToken>>,
}

impl MockSource {
    fn new(outcome: Outcome) -> Self {
        MockSource {
            outcome,
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        }
    }

    /// Always returns `records`, which must be a JSON array of objects.
    pub fn returning(records: serde_json::Value) -> Self {
        let records: Vec<ActivityRecord> = serde_json::from_value(records).unwrap();
        Self::new(Box::new(move || {
            Ok(FetchedActivities {
                records: records.clone(),
                truncated: false,
            })
        }))
    }

    pub fn failing<F>(error: F) -> Self
    where
        F: Fn() -> FetchError + Send + Sync + 'static,
    {
        Self::new(Box::new(move || Err(error())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<AccessToken> {
        self.last_token.lock().clone()
    }
}

#[async_trait]
impl ActivitySource for MockSource {
    async fn fetch_all(&self, token: &AccessToken) -> Result<FetchedActivities, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock() = Some(token.clone());
        (self.outcome)()
    }
}
