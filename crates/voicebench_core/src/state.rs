use std::collections::BTreeMap;

use crate::view_model::{ListViewModel, RowView};
use crate::{
    EntityId, JobStatus, JobStatusPoller, OptimisticListStore, PollPolicy, StatusReport,
    TrackedEntity, ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Toggle,
    Update,
}

impl MutationAction {
    pub fn verb(self) -> &'static str {
        match self {
            MutationAction::Toggle => "toggle",
            MutationAction::Update => "update",
        }
    }
}

/// What is needed to undo an optimistic edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingRollback<E: TrackedEntity> {
    pub(crate) previous: E,
    pub(crate) action: MutationAction,
    /// Last status merged while the edit was in flight; re-applied after
    /// rollback or confirm so neither path regresses the job status.
    pub(crate) merged: Option<StatusReport<E::Status>>,
}

/// State of one mounted list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState<E: TrackedEntity> {
    pub(crate) mounted: bool,
    pub(crate) load: LoadState,
    pub(crate) store: OptimisticListStore<E>,
    pub(crate) poller: JobStatusPoller<E::Status>,
    pub(crate) polling: bool,
    pub(crate) pending: BTreeMap<EntityId, PendingRollback<E>>,
    pub(crate) validation_error: Option<ValidationError>,
    pub(crate) creating: bool,
    dirty: bool,
}

impl<E: TrackedEntity> Default for ListState<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TrackedEntity> ListState<E> {
    pub fn new() -> Self {
        Self::with_policy(E::KIND.poll_policy())
    }

    pub fn with_policy(policy: PollPolicy) -> Self {
        Self {
            mounted: false,
            load: LoadState::Idle,
            store: OptimisticListStore::new(),
            poller: JobStatusPoller::new(policy),
            polling: false,
            pending: BTreeMap::new(),
            validation_error: None,
            creating: false,
            dirty: false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn load(&self) -> &LoadState {
        &self.load
    }

    pub fn store(&self) -> &OptimisticListStore<E> {
        &self.store
    }

    pub fn poller(&self) -> &JobStatusPoller<E::Status> {
        &self.poller
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn view(&self) -> ListViewModel {
        let rows = self
            .store
            .entities()
            .iter()
            .map(|entity| RowView {
                id: entity.id().clone(),
                label: entity.label().to_string(),
                status: entity.status().as_str(),
                is_active: entity.is_active(),
                busy: self.store.is_busy(entity.id()),
                deleting: self.store.is_deleting(entity.id()),
                polling: self.poller.is_registered(entity.id()),
            })
            .collect();
        ListViewModel {
            kind: E::KIND,
            load: self.load.clone(),
            rows,
            validation_error: self.validation_error.clone(),
            creating: self.creating,
            polling: self.poller.registered_ids().len(),
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call, and resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
