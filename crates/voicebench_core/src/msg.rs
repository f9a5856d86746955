use std::time::Duration;

use crate::{EntityId, StatusReport, TrackedEntity};

/// Inputs to a list view. `now` values come from the runtime's clock.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg<E: TrackedEntity> {
    /// The view became visible; starts the initial list fetch.
    Mounted,
    /// Initial list fetch finished.
    Loaded {
        result: Result<Vec<E>, String>,
        now: Duration,
    },
    /// Poll timer fired.
    Tick { now: Duration },
    /// One status fetch finished.
    StatusFetched {
        id: EntityId,
        result: Result<StatusReport<E::Status>, String>,
    },
    /// User flipped the active switch on a row.
    ToggleActive { id: EntityId },
    /// User saved the edit dialog.
    EditSubmitted { id: EntityId, patch: E::Patch },
    /// Server answered a toggle or edit.
    MutationFinished {
        id: EntityId,
        result: Result<E, String>,
        now: Duration,
    },
    /// User submitted the create dialog.
    CreateSubmitted { draft: E::Draft },
    Created {
        result: Result<E, String>,
        now: Duration,
    },
    /// User confirmed deletion of a row.
    DeleteClicked { id: EntityId },
    DeleteFinished {
        id: EntityId,
        result: Result<(), String>,
    },
    /// User re-ran the row's background job (generate, verify, preview).
    ActionTriggered { id: EntityId },
    TriggerFinished {
        id: EntityId,
        result: Result<(), String>,
        now: Duration,
    },
    /// The view went away; nothing is processed afterwards.
    Unmounted,
}
