use crate::aggregator::ActivitySource;
use crate::errors::RunError;
use crate::filter::ActivityFilter;
use crate::oauth::OAuthClient;
use crate::types::ActivityRecord;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// One-shot fetch for a single athlete, outside any session: refresh the
/// access token, fetch every page, filter, and return what the `/activities`
/// route would have served.
pub async fn fetch_filtered(
    oauth: &OAuthClient,
    source: &dyn ActivitySource,
    filter: &ActivityFilter,
    refresh_token: &str,
) -> Result<Vec<ActivityRecord>, RunError> {
    let token = oauth.refresh_access_token(refresh_token).await?;

    tracing::info!("fetching activities");
    let fetched = source.fetch_all(&token).await?;
    tracing::info!(
        records = fetched.records.len(),
        truncated = fetched.truncated,
        "fetched activities"
    );

    let activities = filter.apply(fetched.records);
    tracing::info!(records = activities.len(), "filtered activities");
    Ok(activities)
}

/// Writes `activities` as an indented JSON array, replacing `path`.
///
/// The array goes to a temporary file next to `path` that is renamed over it
/// once complete, so a failed write leaves any previous file untouched.
pub fn write_json(path: &Path, activities: &[ActivityRecord]) -> Result<(), RunError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, activities)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!(path = %path.display(), "activities saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StravaConfig;
    use crate::page_fetcher::FetchError;
    use crate::testutils::MockSource;
    use crate::types::AccessToken;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn oauth_server() -> (MockServer, OAuthClient) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("refresh_token=long-lived"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "short-lived" })),
            )
            .mount(&mock_server)
            .await;

        let strava: StravaConfig = serde_json::from_value(serde_json::json!({
            "client_id": "1234",
            "client_secret": "shh",
            "redirect_uri": "http://localhost:8080/oauth/callback",
            "oauth_base_url": mock_server.uri(),
        }))
        .unwrap();
        let client = OAuthClient::new(&strava).unwrap();
        (mock_server, client)
    }

    #[tokio::test]
    async fn test_fetch_filtered() {
        let (_server, oauth) = oauth_server().await;
        let source = MockSource::returning(serde_json::json!([
            { "name": "Commute", "start_date": "2025-06-12T08:00:00Z" },
            { "name": "Terminus loop", "start_date": "2025-06-14T10:00:00Z" },
            {
                "name": "Hills",
                "description": "back via TERMINUS",
                "start_date": "2025-06-15T10:00:00Z"
            },
        ]));

        let activities = fetch_filtered(
            &oauth,
            &source,
            &ActivityFilter::new("terminus"),
            "long-lived",
        )
        .await
        .unwrap();

        assert_eq!(source.last_token(), Some(AccessToken::new("short-lived")));
        let names: Vec<&str> = activities
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Hills", "Terminus loop"]);
    }

    #[tokio::test]
    async fn test_fetch_filtered_errors() {
        let (_server, oauth) = oauth_server().await;
        let filter = ActivityFilter::new("terminus");

        // Unknown refresh token: the token endpoint has no matching mock
        let source = MockSource::returning(serde_json::json!([]));
        let result = fetch_filtered(&oauth, &source, &filter, "revoked").await;
        assert!(matches!(result, Err(RunError::OAuth(_))));
        assert_eq!(source.calls(), 0);

        let source = MockSource::failing(|| FetchError::Timeout { page: 2 });
        let result = fetch_filtered(&oauth, &source, &filter, "long-lived").await;
        assert!(matches!(
            result,
            Err(RunError::Fetch(FetchError::Timeout { page: 2 }))
        ));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activities.json");
        std::fs::write(&path, "stale").unwrap();

        let record = serde_json::json!({ "name": "Terminus loop", "id": 7 });
        write_json(&path, &[record.as_object().unwrap().clone()]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!([{ "name": "Terminus loop", "id": 7 }]));

        // Only the target is left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("activities.json")]);
    }

    #[test]
    fn test_write_json_failure_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();

        // A non-empty directory at the target path makes the final rename fail
        let target = dir.path().join("activities.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let record = serde_json::json!({ "name": "Terminus loop" });
        let result = write_json(&target, &[record.as_object().unwrap().clone()]);
        assert!(matches!(result, Err(RunError::Io(_))));

        // The target is untouched and the temporary file is gone
        assert_eq!(std::fs::read_to_string(target.join("keep")).unwrap(), "x");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("activities.json")]);

        let missing = dir.path().join("no-such-dir").join("activities.json");
        let result = write_json(&missing, &[]);
        assert!(matches!(result, Err(RunError::Io(_))));
        assert!(!missing.exists());
    }
}
