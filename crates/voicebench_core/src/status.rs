use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// How a terminal status ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// A closed set of job states for one entity kind.
///
/// Each kind is its own state machine; `outcome` is the terminal-state
/// predicate for that machine.
pub trait JobStatus:
    fmt::Debug
    + Clone
    + Copy
    + PartialEq
    + Eq
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// `Some` once the job can no longer change without an external trigger.
    fn outcome(&self) -> Option<Outcome>;

    /// Terminal failure reported when polling gives up.
    fn timed_out() -> Self;

    /// Status a job re-enters when the user re-runs it.
    fn restarted() -> Self;

    /// Wire representation.
    fn as_str(&self) -> &'static str;

    fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }
}

/// Test-suite scenario generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Generating,
    Ready,
    GenerationFailed,
}

impl JobStatus for GenerationStatus {
    fn outcome(&self) -> Option<Outcome> {
        match self {
            GenerationStatus::Pending | GenerationStatus::Generating => None,
            GenerationStatus::Ready => Some(Outcome::Success),
            GenerationStatus::GenerationFailed => Some(Outcome::Failure),
        }
    }

    fn timed_out() -> Self {
        GenerationStatus::GenerationFailed
    }

    fn restarted() -> Self {
        GenerationStatus::Generating
    }

    fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Ready => "ready",
            GenerationStatus::GenerationFailed => "generation_failed",
        }
    }
}

/// Agent connectivity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Connecting,
    Verified,
    Failed,
}

impl JobStatus for VerificationStatus {
    fn outcome(&self) -> Option<Outcome> {
        match self {
            VerificationStatus::Pending | VerificationStatus::Connecting => None,
            VerificationStatus::Verified => Some(Outcome::Success),
            VerificationStatus::Failed => Some(Outcome::Failure),
        }
    }

    fn timed_out() -> Self {
        VerificationStatus::Failed
    }

    fn restarted() -> Self {
        VerificationStatus::Connecting
    }

    fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Connecting => "connecting",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Failed => "failed",
        }
    }
}

/// Persona preview-audio synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioPreviewStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Failed,
}

impl JobStatus for AudioPreviewStatus {
    fn outcome(&self) -> Option<Outcome> {
        match self {
            AudioPreviewStatus::Pending | AudioPreviewStatus::Generating => None,
            AudioPreviewStatus::Completed => Some(Outcome::Success),
            AudioPreviewStatus::Failed => Some(Outcome::Failure),
        }
    }

    fn timed_out() -> Self {
        AudioPreviewStatus::Failed
    }

    fn restarted() -> Self {
        AudioPreviewStatus::Generating
    }

    fn as_str(&self) -> &'static str {
        match self {
            AudioPreviewStatus::Pending => "pending",
            AudioPreviewStatus::Generating => "generating",
            AudioPreviewStatus::Completed => "completed",
            AudioPreviewStatus::Failed => "failed",
        }
    }
}

/// Payload returned by a status endpoint.
///
/// Two reports are "the same payload" when every field matches, so a change
/// in `scenario_count` alone still counts as an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport<S> {
    pub status: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_audio_url: Option<String>,
}

impl<S: JobStatus> StatusReport<S> {
    pub fn new(status: S) -> Self {
        Self {
            status,
            error: None,
            scenario_count: None,
            preview_audio_url: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_scenario_count(mut self, count: u32) -> Self {
        self.scenario_count = Some(count);
        self
    }

    pub fn with_preview_audio_url(mut self, url: impl Into<String>) -> Self {
        self.preview_audio_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_predicates_follow_each_state_machine() {
        assert!(!GenerationStatus::Generating.is_terminal());
        assert_eq!(GenerationStatus::Ready.outcome(), Some(Outcome::Success));
        assert_eq!(
            VerificationStatus::Failed.outcome(),
            Some(Outcome::Failure)
        );
        assert!(!VerificationStatus::Connecting.is_terminal());
        assert_eq!(
            AudioPreviewStatus::Completed.outcome(),
            Some(Outcome::Success)
        );
        assert!(AudioPreviewStatus::timed_out().is_terminal());
        assert!(!AudioPreviewStatus::restarted().is_terminal());
    }

    #[test]
    fn statuses_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&GenerationStatus::GenerationFailed).unwrap();
        assert_eq!(json, "\"generation_failed\"");
        assert_eq!(GenerationStatus::GenerationFailed.as_str(), "generation_failed");

        let report: StatusReport<GenerationStatus> =
            serde_json::from_str(r#"{"status":"ready","scenario_count":12}"#).unwrap();
        assert_eq!(
            report,
            StatusReport::new(GenerationStatus::Ready).with_scenario_count(12)
        );
    }
}
