//! Batch job definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::SummarizeRequest;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a batch job.
///
/// `Failed` is only reachable from `Authenticating`; every other failure is
/// absorbed and the job keeps moving forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the ledger for its turn
    #[default]
    Queued,
    /// At the head of the ledger, pipeline about to start
    Admitted,
    /// Resolving the content source session
    Authenticating,
    /// Walking the subject list
    ProcessingSubjects,
    /// Waiting on the video composition backend
    Composing,
    /// Terminal result delivered
    Completed,
    /// Session could not be established
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Admitted => "admitted",
            JobState::Authenticating => "authenticating",
            JobState::ProcessingSubjects => "processing_subjects",
            JobState::Composing => "composing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was turned away before queuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    MissingPreferences,
    BudgetExhausted,
    NoSubjects,
}

impl RejectionReason {
    /// User-facing message for the rejection.
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::MissingPreferences => "Please provide your preferences",
            RejectionReason::BudgetExhausted => "You have reached your usage limit",
            RejectionReason::NoSubjects => "No usernames have been provided",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MissingPreferences => "missing_preferences",
            RejectionReason::BudgetExhausted => "budget_exhausted",
            RejectionReason::NoSubjects => "no_subjects",
        }
    }
}

/// A validated batch summarization job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchJob {
    /// Unique job ID
    pub id: JobId,
    /// Subjects in processing order
    pub subjects: Vec<String>,
    /// Maximum number of paid backend calls
    pub budget: f64,
    /// Whether a highlight video should be composed
    pub produce_video: bool,
    /// Free-form caller preferences forwarded to the fold step
    pub preferences: String,
}

impl BatchJob {
    /// Validate a request and turn it into a job.
    ///
    /// Checks run in a fixed order: preferences, budget, subjects.
    pub fn from_request(request: SummarizeRequest) -> Result<Self, RejectionReason> {
        if request.preferences.trim().is_empty() {
            return Err(RejectionReason::MissingPreferences);
        }
        if !(request.remaining_budget > 0.0) {
            return Err(RejectionReason::BudgetExhausted);
        }

        let subjects: Vec<String> = request
            .subjects
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if subjects.is_empty() {
            return Err(RejectionReason::NoSubjects);
        }

        Ok(Self {
            id: JobId::new(),
            subjects,
            budget: request.remaining_budget,
            produce_video: request.is_daily,
            preferences: request.preferences,
        })
    }

    /// Work size accounted in the ledger (one unit per subject).
    pub fn size(&self) -> u64 {
        self.subjects.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(subjects: &[&str], budget: f64, preferences: &str) -> SummarizeRequest {
        SummarizeRequest {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            is_daily: false,
            preferences: preferences.to_string(),
            remaining_budget: budget,
        }
    }

    #[test]
    fn test_job_id_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_from_request_valid() {
        let job = BatchJob::from_request(request(&["alice", "bob"], 10.0, "tech")).unwrap();
        assert_eq!(job.subjects, vec!["alice", "bob"]);
        assert_eq!(job.size(), 2);
        assert!(!job.produce_video);
    }

    #[test]
    fn test_from_request_rejections() {
        assert_eq!(
            BatchJob::from_request(request(&["a"], 10.0, "")).unwrap_err(),
            RejectionReason::MissingPreferences
        );
        assert_eq!(
            BatchJob::from_request(request(&["a"], 0.0, "x")).unwrap_err(),
            RejectionReason::BudgetExhausted
        );
        assert_eq!(
            BatchJob::from_request(request(&["a"], f64::NAN, "x")).unwrap_err(),
            RejectionReason::BudgetExhausted
        );
        assert_eq!(
            BatchJob::from_request(request(&[], 5.0, "x")).unwrap_err(),
            RejectionReason::NoSubjects
        );
        assert_eq!(
            BatchJob::from_request(request(&["  "], 5.0, "x")).unwrap_err(),
            RejectionReason::NoSubjects
        );
    }

    #[test]
    fn test_rejection_messages_distinct() {
        let messages = [
            RejectionReason::MissingPreferences.message(),
            RejectionReason::BudgetExhausted.message(),
            RejectionReason::NoSubjects.message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Composing.is_terminal());
        assert_eq!(JobState::ProcessingSubjects.to_string(), "processing_subjects");
    }
}
