use crate::types::ActivityRecord;

fn str_field<'a>(record: &'a ActivityRecord, field: &str) -> &'a str {
    record.get(field).and_then(|v| v.as_str()).unwrap_or_default()
}

/// Keeps the activities mentioning a keyword and orders them newest first.
#[derive(Clone, Debug)]
pub struct ActivityFilter {
    keyword: String,
}

impl ActivityFilter {
    /// Surrounding whitespace in `keyword` is ignored.
    pub fn new(keyword: &str) -> Self {
        ActivityFilter {
            keyword: keyword.trim().to_lowercase(),
        }
    }

    /// Case-insensitive match on `name` or `description`. Fields that are
    /// missing or not strings never match.
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        ["name", "description"]
            .iter()
            .any(|field| str_field(record, field).to_lowercase().contains(&self.keyword))
    }

    pub fn apply(&self, records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
        let mut kept: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        // Plain string order on `start_date`, newest first. A missing date is
        // the empty string and sorts last. `sort_by` is stable.
        kept.sort_by(|a, b| str_field(b, "start_date").cmp(str_field(a, "start_date")));
        kept
    }
}
