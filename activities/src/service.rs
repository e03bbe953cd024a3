use crate::aggregator::ActivitySource;
use crate::cache::UserCache;
use crate::errors::ActivitiesError;
use crate::filter::ActivityFilter;
use crate::metrics_defs::ACTIVITIES_REQUEST_DURATION;
use crate::sessions::SessionStore;
use crate::types::ActivityRecord;
use shared::histogram;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Answers "which activities does this user see", from the cache when it is
/// fresh and from the upstream otherwise.
pub struct ActivityService {
    sessions: SessionStore,
    cache: UserCache,
    source: Arc<dyn ActivitySource>,
    filter: ActivityFilter,
}

impl ActivityService {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        filter: ActivityFilter,
        freshness: Duration,
    ) -> Self {
        ActivityService {
            sessions: SessionStore::new(),
            cache: UserCache::new(freshness),
            source,
            filter,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// `user_id` is the session identifier from the request, if any.
    ///
    /// Nothing is cached when the upstream fetch fails, so the next request
    /// retries the whole fetch.
    pub async fn activities(
        &self,
        user_id: Option<&str>,
    ) -> Result<Arc<[ActivityRecord]>, ActivitiesError> {
        let started = Instant::now();

        let user_id = user_id
            .filter(|id| !id.is_empty())
            .ok_or(ActivitiesError::Unauthenticated)?;
        let token = self
            .sessions
            .token(user_id)
            .ok_or(ActivitiesError::TokenMissing)?;

        if let Some(cached) = self.cache.read(user_id) {
            tracing::info!(
                user_id,
                records = cached.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "served activities from cache"
            );
            histogram!(ACTIVITIES_REQUEST_DURATION).record(started.elapsed().as_secs_f64());
            return Ok(cached);
        }

        let fetched = self.source.fetch_all(&token).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "failed to fetch activities");
            ActivitiesError::Upstream(e)
        })?;

        let total = fetched.records.len();
        let activities: Arc<[ActivityRecord]> = self.filter.apply(fetched.records).into();
        self.cache.write(user_id, activities.clone());

        tracing::info!(
            user_id,
            fetched = total,
            records = activities.len(),
            truncated = fetched.truncated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "served activities from upstream"
        );
        histogram!(ACTIVITIES_REQUEST_DURATION).record(started.elapsed().as_secs_f64());

        Ok(activities)
    }
}
