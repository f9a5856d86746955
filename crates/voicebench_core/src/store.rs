use std::collections::BTreeSet;

use thiserror::Error;

use crate::{EntityId, JobStatus, StatusReport, TrackedEntity};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),
    #[error("a change to {0} is still in flight")]
    MutationInFlight(EntityId),
}

/// Status before and after a merged poll result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub previous: S,
    pub current: S,
}

/// In-memory collection owned by one list view.
///
/// Edits are applied optimistically and either confirmed with the server's
/// value or rolled back to the value `apply_optimistic` returned. Deletes are
/// never optimistic: the row is only marked busy until the server confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticListStore<E> {
    entities: Vec<E>,
    in_flight: BTreeSet<EntityId>,
    deleting: BTreeSet<EntityId>,
}

impl<E> Default for OptimisticListStore<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            in_flight: BTreeSet::new(),
            deleting: BTreeSet::new(),
        }
    }
}

impl<E: TrackedEntity> OptimisticListStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole snapshot, e.g. after the initial list fetch.
    pub fn replace_all(&mut self, entities: Vec<E>) {
        self.entities = entities;
        self.in_flight.clear();
        self.deleting.clear();
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    fn get_mut(&mut self, id: &EntityId) -> Option<&mut E> {
        self.entities.iter_mut().find(|entity| entity.id() == id)
    }

    /// True while an edit or delete for `id` awaits the server.
    pub fn is_busy(&self, id: &EntityId) -> bool {
        self.in_flight.contains(id) || self.deleting.contains(id)
    }

    pub fn is_deleting(&self, id: &EntityId) -> bool {
        self.deleting.contains(id)
    }

    /// IDs whose background job has not reached a terminal status.
    pub fn pending_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| !entity.status().is_terminal())
            .map(|entity| entity.id().clone())
            .collect()
    }

    /// Applies `patch` immediately and returns the pre-patch value.
    pub fn apply_optimistic(&mut self, id: &EntityId, patch: &E::Patch) -> Result<E, StoreError> {
        if self.is_busy(id) {
            return Err(StoreError::MutationInFlight(id.clone()));
        }
        let entity = self
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
        let previous = entity.clone();
        entity.apply_patch(patch);
        self.in_flight.insert(id.clone());
        Ok(previous)
    }

    /// Replaces the entity with the server's canonical value.
    pub fn confirm(&mut self, id: &EntityId, server_value: E) -> Result<(), StoreError> {
        self.in_flight.remove(id);
        let entity = self
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
        *entity = server_value;
        Ok(())
    }

    /// Restores the value captured by `apply_optimistic`.
    pub fn rollback(&mut self, id: &EntityId, previous: E) -> Result<(), StoreError> {
        self.in_flight.remove(id);
        let entity = self
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
        *entity = previous;
        Ok(())
    }

    /// Field-level merge of a poll result. Fields touched by an in-flight
    /// edit are not part of the report, so they survive.
    pub fn merge_status_delta(
        &mut self,
        id: &EntityId,
        report: &StatusReport<E::Status>,
    ) -> Option<Transition<E::Status>> {
        let entity = self.get_mut(id)?;
        let previous = entity.status();
        entity.merge_status(report);
        Some(Transition {
            previous,
            current: entity.status(),
        })
    }

    /// Disables the row while a re-run request is sent.
    pub fn begin_action(&mut self, id: &EntityId) -> Result<(), StoreError> {
        if self.is_busy(id) {
            return Err(StoreError::MutationInFlight(id.clone()));
        }
        if self.get(id).is_none() {
            return Err(StoreError::UnknownEntity(id.clone()));
        }
        self.in_flight.insert(id.clone());
        Ok(())
    }

    pub fn finish_action(&mut self, id: &EntityId) {
        self.in_flight.remove(id);
    }

    /// Marks the job as running again after the server accepted a re-run.
    pub fn restart(&mut self, id: &EntityId) -> Result<E::Status, StoreError> {
        self.in_flight.remove(id);
        let entity = self
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
        entity.restart();
        Ok(entity.status())
    }

    /// Adds a record the server has already created.
    pub fn insert_confirmed(&mut self, entity: E) {
        match self.get_mut(entity.id()) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
    }

    /// Disables the row until the server confirms the delete.
    pub fn begin_remove(&mut self, id: &EntityId) -> Result<(), StoreError> {
        if self.is_busy(id) {
            return Err(StoreError::MutationInFlight(id.clone()));
        }
        if self.get(id).is_none() {
            return Err(StoreError::UnknownEntity(id.clone()));
        }
        self.deleting.insert(id.clone());
        Ok(())
    }

    pub fn cancel_remove(&mut self, id: &EntityId) {
        self.deleting.remove(id);
    }

    /// Drops the entity once the server confirmed the delete.
    pub fn remove(&mut self, id: &EntityId) -> Option<E> {
        self.deleting.remove(id);
        self.in_flight.remove(id);
        let index = self.entities.iter().position(|entity| entity.id() == id)?;
        Some(self.entities.remove(index))
    }
}
