use std::fmt;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{AudioPreviewStatus, GenerationStatus, JobStatus, StatusReport, VerificationStatus};

/// Server-assigned identifier of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
pub const AUDIO_PREVIEW_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Polling cadence for one kind of job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until a terminal status arrives.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    TestSuite,
    Agent,
    Persona,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::TestSuite,
        EntityKind::Agent,
        EntityKind::Persona,
    ];

    /// REST collection path segment.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "test-suites",
            EntityKind::Agent => "agents",
            EntityKind::Persona => "personas",
        }
    }

    pub fn status_segment(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "generation-status",
            EntityKind::Agent => "verification-status",
            EntityKind::Persona => "preview-audio-status",
        }
    }

    /// Endpoint that (re)starts the kind's background job.
    pub fn trigger_segment(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "generate",
            EntityKind::Agent => "verify",
            EntityKind::Persona => "preview-audio",
        }
    }

    pub fn trigger_verb(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "regenerate",
            EntityKind::Agent => "verify",
            EntityKind::Persona => "preview",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "Test suite",
            EntityKind::Agent => "Agent",
            EntityKind::Persona => "Persona",
        }
    }

    pub fn success_title(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "Generation Complete",
            EntityKind::Agent => "Agent Verified",
            EntityKind::Persona => "Preview Ready",
        }
    }

    pub fn failure_title(self) -> &'static str {
        match self {
            EntityKind::TestSuite => "Generation Failed",
            EntityKind::Agent => "Verification Failed",
            EntityKind::Persona => "Preview Failed",
        }
    }

    pub fn poll_policy(self) -> PollPolicy {
        match self {
            EntityKind::TestSuite | EntityKind::Agent => PollPolicy {
                interval: DEFAULT_POLL_INTERVAL,
                timeout: None,
            },
            EntityKind::Persona => PollPolicy {
                interval: DEFAULT_POLL_INTERVAL,
                timeout: Some(AUDIO_PREVIEW_TIMEOUT),
            },
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// A record whose background job the dashboard tracks.
pub trait TrackedEntity:
    fmt::Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Status: JobStatus;
    /// Partial edit; `None` fields are left untouched.
    type Patch: fmt::Debug + Clone + PartialEq + Serialize + Send + Sync + 'static;
    type Draft: fmt::Debug + Clone + PartialEq + Serialize + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &EntityId;
    fn label(&self) -> &str;
    fn status(&self) -> Self::Status;
    fn is_active(&self) -> bool;
    fn apply_patch(&mut self, patch: &Self::Patch);
    /// Merges only the fields carried by `report`.
    fn merge_status(&mut self, report: &StatusReport<Self::Status>);
    /// Puts the job back into its running state after a user re-run.
    fn restart(&mut self);
    fn toggle_patch(active: bool) -> Self::Patch;
    fn validate_draft(draft: &Self::Draft) -> Result<(), ValidationError>;
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub agent_id: EntityId,
    #[serde(default)]
    pub status: GenerationStatus,
    #[serde(default)]
    pub scenario_count: u32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TestSuitePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TestSuiteDraft {
    pub name: String,
    pub description: Option<String>,
    pub agent_id: String,
    pub persona_ids: Vec<String>,
}

impl TrackedEntity for TestSuite {
    type Status = GenerationStatus;
    type Patch = TestSuitePatch;
    type Draft = TestSuiteDraft;

    const KIND: EntityKind = EntityKind::TestSuite;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn status(&self) -> GenerationStatus {
        self.status
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn apply_patch(&mut self, patch: &TestSuitePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
    }

    fn merge_status(&mut self, report: &StatusReport<GenerationStatus>) {
        self.status = report.status;
        if let Some(count) = report.scenario_count {
            self.scenario_count = count;
        }
        if let Some(error) = &report.error {
            self.error = Some(error.clone());
        }
    }

    fn restart(&mut self) {
        self.status = GenerationStatus::restarted();
        self.error = None;
    }

    fn toggle_patch(active: bool) -> TestSuitePatch {
        TestSuitePatch {
            is_active: Some(active),
            ..TestSuitePatch::default()
        }
    }

    fn validate_draft(draft: &TestSuiteDraft) -> Result<(), ValidationError> {
        require(&draft.name, "name")?;
        require(&draft.agent_id, "agent")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub verification_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AgentDraft {
    pub name: String,
    pub phone_number: String,
    pub provider: Option<String>,
}

impl TrackedEntity for Agent {
    type Status = VerificationStatus;
    type Patch = AgentPatch;
    type Draft = AgentDraft;

    const KIND: EntityKind = EntityKind::Agent;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn status(&self) -> VerificationStatus {
        self.verification_status
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn apply_patch(&mut self, patch: &AgentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(phone) = &patch.phone_number {
            self.phone_number = Some(phone.clone());
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
    }

    fn merge_status(&mut self, report: &StatusReport<VerificationStatus>) {
        self.verification_status = report.status;
        if let Some(error) = &report.error {
            self.verification_error = Some(error.clone());
        }
    }

    fn restart(&mut self) {
        self.verification_status = VerificationStatus::restarted();
        self.verification_error = None;
    }

    fn toggle_patch(active: bool) -> AgentPatch {
        AgentPatch {
            is_active: Some(active),
            ..AgentPatch::default()
        }
    }

    fn validate_draft(draft: &AgentDraft) -> Result<(), ValidationError> {
        require(&draft.name, "name")?;
        require(&draft.phone_number, "phone number")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub accent: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub preview_audio_status: AudioPreviewStatus,
    #[serde(default)]
    pub preview_audio_url: Option<String>,
    #[serde(default)]
    pub preview_audio_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PersonaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PersonaDraft {
    pub name: String,
    pub description: Option<String>,
    pub voice: String,
    pub accent: Option<String>,
}

impl TrackedEntity for Persona {
    type Status = AudioPreviewStatus;
    type Patch = PersonaPatch;
    type Draft = PersonaDraft;

    const KIND: EntityKind = EntityKind::Persona;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn status(&self) -> AudioPreviewStatus {
        self.preview_audio_status
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn apply_patch(&mut self, patch: &PersonaPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(voice) = &patch.voice {
            self.voice = Some(voice.clone());
        }
        if let Some(accent) = &patch.accent {
            self.accent = Some(accent.clone());
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
    }

    fn merge_status(&mut self, report: &StatusReport<AudioPreviewStatus>) {
        self.preview_audio_status = report.status;
        if let Some(url) = &report.preview_audio_url {
            self.preview_audio_url = Some(url.clone());
        }
        if let Some(error) = &report.error {
            self.preview_audio_error = Some(error.clone());
        }
    }

    fn restart(&mut self) {
        self.preview_audio_status = AudioPreviewStatus::restarted();
        self.preview_audio_error = None;
    }

    fn toggle_patch(active: bool) -> PersonaPatch {
        PersonaPatch {
            is_active: Some(active),
            ..PersonaPatch::default()
        }
    }

    fn validate_draft(draft: &PersonaDraft) -> Result<(), ValidationError> {
        require(&draft.name, "name")?;
        require(&draft.voice, "voice")
    }
}

fn active_by_default() -> bool {
    true
}
