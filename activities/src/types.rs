use std::fmt;

/// One activity as returned by the upstream API. No schema is enforced; the
/// fields this service reads are `name`, `description` and `start_date`, and
/// everything else is passed through untouched.
pub type ActivityRecord = serde_json::Map<String, serde_json::Value>;

pub type UserId = String;

/// Bearer credential for the upstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new<T: Into<String>>(token: T) -> Self {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Merged output of one fan-out over the upstream pages.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchedActivities {
    pub records: Vec<ActivityRecord>,
    // The last page of the fan-out came back full, so more records may exist
    // past the configured page bound.
    pub truncated: bool,
}
