use std::time::Duration;

use crate::{EntityId, Notification, TrackedEntity};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect<E: TrackedEntity> {
    FetchList,
    FetchStatus { ids: Vec<EntityId> },
    Create { draft: E::Draft },
    Update { id: EntityId, patch: E::Patch },
    Delete { id: EntityId },
    Trigger { id: EntityId },
    Notify(Notification),
    /// The first ID was registered; the poll timer should run.
    StartPolling { interval: Duration },
    /// Nothing left to poll; the timer should stop.
    StopPolling,
}
