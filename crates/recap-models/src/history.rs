//! Rolling per-subject history.
//!
//! History is persisted as a JSON array of strings, each formatted as
//! `"<summary> <DD.MM.YYYY>"`, most recent last.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maximum number of dated entries kept per subject.
pub const MAX_HISTORY_ENTRIES: usize = 7;

/// Date suffix format used in history entries.
pub const HISTORY_DATE_FORMAT: &str = "%d.%m.%Y";

/// Length of a formatted date suffix (`DD.MM.YYYY`).
const DATE_SUFFIX_LEN: usize = 10;

/// Last week of folded summaries for one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SubjectHistory {
    entries: Vec<String>,
}

impl SubjectHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a persisted history value.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut history: Self = serde_json::from_str(raw)?;
        history.truncate();
        Ok(history)
    }

    /// Encode for persistence.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry already carries the given date.
    pub fn has_entry_for(&self, date: NaiveDate) -> bool {
        let stamp = date.format(HISTORY_DATE_FORMAT).to_string();
        self.entries
            .iter()
            .any(|entry| entry.len() > DATE_SUFFIX_LEN && entry.ends_with(&stamp))
    }

    /// Append a dated summary unless that date is already recorded.
    ///
    /// Returns `true` when the history changed.
    pub fn record(&mut self, summary: &str, date: NaiveDate) -> bool {
        if self.has_entry_for(date) {
            return false;
        }
        let stamp = date.format(HISTORY_DATE_FORMAT);
        self.entries.push(format!("{} {}", summary.trim(), stamp));
        self.truncate();
        true
    }

    fn truncate(&mut self) {
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_record_formats_entry() {
        let mut history = SubjectHistory::new();
        assert!(history.record("Went hiking", day(3)));
        assert_eq!(history.entries(), &["Went hiking 03.06.2024".to_string()]);
    }

    #[test]
    fn test_record_same_day_is_idempotent() {
        let mut history = SubjectHistory::new();
        assert!(history.record("First", day(3)));
        assert!(!history.record("Second", day(3)));
        assert_eq!(history.len(), 1);
        assert!(history.has_entry_for(day(3)));
        assert!(!history.has_entry_for(day(4)));
    }

    #[test]
    fn test_history_never_exceeds_limit() {
        let mut history = SubjectHistory::new();
        for d in 1..=8 {
            history.record(&format!("Day {}", d), day(d));
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0], "Day 2 02.06.2024");
        assert_eq!(history.entries()[6], "Day 8 08.06.2024");
    }

    #[test]
    fn test_json_layout() {
        let mut history = SubjectHistory::new();
        history.record("New job", day(10));
        let json = history.to_json().unwrap();
        assert_eq!(json, r#"["New job 10.06.2024"]"#);

        let decoded = SubjectHistory::from_json(&json).unwrap();
        assert_eq!(decoded, history);
    }

    #[test]
    fn test_from_json_truncates_oversized_value() {
        let raw: Vec<String> = (1..=9).map(|d| format!("e {:02}.06.2024", d)).collect();
        let history = SubjectHistory::from_json(&serde_json::to_string(&raw).unwrap()).unwrap();
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0], "e 03.06.2024");
    }

    #[test]
    fn test_bare_date_does_not_count_as_entry() {
        let history = SubjectHistory::from_json(r#"["03.06.2024"]"#).unwrap();
        assert!(!history.has_entry_for(day(3)));
    }
}
