//! Voicebench core: job-status polling, optimistic list state and the
//! notifications derived from status transitions. Pure and synchronous;
//! all IO happens in `voicebench_engine`.
mod effect;
mod entity;
mod msg;
pub mod notify;
mod poller;
mod state;
mod status;
mod store;
mod update;
mod view_model;

pub use effect::Effect;
pub use entity::{
    Agent, AgentDraft, AgentPatch, EntityId, EntityKind, Persona, PersonaDraft, PersonaPatch,
    PollPolicy, TestSuite, TestSuiteDraft, TestSuitePatch, TrackedEntity, ValidationError,
    AUDIO_PREVIEW_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
pub use msg::Msg;
pub use notify::{notify_transition, Notification, Variant};
pub use poller::{JobStatusPoller, PollRegistration, PollUpdate, TIMEOUT_MESSAGE};
pub use state::{ListState, LoadState, MutationAction};
pub use status::{
    AudioPreviewStatus, GenerationStatus, JobStatus, Outcome, StatusReport, VerificationStatus,
};
pub use store::{OptimisticListStore, StoreError, Transition};
pub use update::update;
pub use view_model::{ListViewModel, RowView};
