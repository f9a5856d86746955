use std::time::Duration;

use voicebench_logging::{vb_debug, vb_info, vb_warn};

use crate::notify::{self, notify_transition};
use crate::state::PendingRollback;
use crate::{
    Effect, EntityId, JobStatus, ListState, LoadState, Msg, MutationAction, PollUpdate,
    StoreError, TrackedEntity,
};

/// Pure update function: applies a message to a list view and returns any effects.
///
/// Once the view is unmounted every message is dropped, so no effect (and
/// hence no notification) can follow an unmount.
pub fn update<E: TrackedEntity>(
    mut state: ListState<E>,
    msg: Msg<E>,
) -> (ListState<E>, Vec<Effect<E>>) {
    if !state.mounted && !matches!(msg, Msg::Mounted) {
        return (state, Vec::new());
    }

    let mut effects = Vec::new();
    match msg {
        Msg::Mounted => {
            if state.mounted {
                return (state, effects);
            }
            state.mounted = true;
            state.load = LoadState::Loading;
            state.mark_dirty();
            effects.push(Effect::FetchList);
        }
        Msg::Loaded { result, now } => match result {
            Ok(entities) => {
                vb_info!("{} loaded count={}", E::KIND, entities.len());
                state.store.replace_all(entities);
                state.pending.clear();
                state.poller.clear();
                state.load = LoadState::Ready;
                for id in state.store.pending_ids() {
                    state.poller.register(id, now);
                }
                state.mark_dirty();
            }
            Err(reason) => {
                vb_warn!("{} load failed: {}", E::KIND, reason);
                state.load = LoadState::Failed(reason.clone());
                state.mark_dirty();
                effects.push(Effect::Notify(notify::load_failed(E::KIND, &reason)));
            }
        },
        Msg::Tick { now } => {
            for poll_update in state.poller.expire(now) {
                apply_poll_update(&mut state, poll_update, &mut effects);
            }
            let ids = state.poller.due(now);
            if !ids.is_empty() {
                vb_debug!("{} tick fetch count={}", E::KIND, ids.len());
                effects.push(Effect::FetchStatus { ids });
            }
        }
        Msg::StatusFetched { id, result } => {
            if let Some(poll_update) = state.poller.record(&id, result) {
                apply_poll_update(&mut state, poll_update, &mut effects);
            }
        }
        Msg::ToggleActive { id } => {
            let Some(entity) = state.store.get(&id) else {
                let err = StoreError::UnknownEntity(id.clone());
                reject::<E>(&id, MutationAction::Toggle.verb(), err, &mut effects);
                return (state, effects);
            };
            let patch = E::toggle_patch(!entity.is_active());
            begin_mutation(&mut state, id, patch, MutationAction::Toggle, &mut effects);
        }
        Msg::EditSubmitted { id, patch } => {
            begin_mutation(&mut state, id, patch, MutationAction::Update, &mut effects);
        }
        Msg::MutationFinished { id, result, now } => {
            let Some(pending) = state.pending.remove(&id) else {
                vb_warn!("{} mutation result without pending edit id={}", E::KIND, id);
                return (state, effects);
            };
            let before = state.store.get(&id).map(|entity| entity.status());
            match result {
                Ok(server_value) => match state.store.confirm(&id, server_value) {
                    Ok(()) => {
                        // A terminal poll result can be newer than the PATCH response.
                        let terminal = pending.merged.filter(|report| report.status.is_terminal());
                        if let Some(report) = terminal {
                            let settled = state
                                .store
                                .get(&id)
                                .is_some_and(|entity| entity.status().is_terminal());
                            if !settled {
                                state.store.merge_status_delta(&id, &report);
                            }
                        }
                    }
                    Err(err) => vb_warn!("{} confirm dropped: {}", E::KIND, err),
                },
                Err(reason) => {
                    vb_warn!("{} {} failed id={}: {}", E::KIND, pending.action.verb(), id, reason);
                    match state.store.rollback(&id, pending.previous) {
                        Ok(()) => {
                            if let Some(report) = pending.merged {
                                state.store.merge_status_delta(&id, &report);
                            }
                        }
                        Err(err) => vb_warn!("{} rollback dropped: {}", E::KIND, err),
                    }
                    effects.push(Effect::Notify(notify::mutation_failed(
                        E::KIND,
                        Some(&id),
                        pending.action.verb(),
                        &reason,
                    )));
                }
            }
            if let Some(previous) = before {
                settle_confirmed(&mut state, &id, previous, &mut effects);
            }
            register_if_running(&mut state, &id, now);
            state.mark_dirty();
        }
        Msg::CreateSubmitted { draft } => {
            if state.creating {
                return (state, effects);
            }
            match E::validate_draft(&draft) {
                Ok(()) => {
                    state.validation_error = None;
                    state.creating = true;
                    effects.push(Effect::Create { draft });
                }
                Err(err) => {
                    state.validation_error = Some(err);
                }
            }
            state.mark_dirty();
        }
        Msg::Created { result, now } => {
            state.creating = false;
            match result {
                Ok(entity) => {
                    let id = entity.id().clone();
                    vb_info!("{} created id={}", E::KIND, id);
                    state.store.insert_confirmed(entity);
                    register_if_running(&mut state, &id, now);
                }
                Err(reason) => {
                    effects.push(Effect::Notify(notify::mutation_failed(
                        E::KIND, None, "create", &reason,
                    )));
                }
            }
            state.mark_dirty();
        }
        Msg::DeleteClicked { id } => match state.store.begin_remove(&id) {
            Ok(()) => {
                state.mark_dirty();
                effects.push(Effect::Delete { id });
            }
            Err(err) => reject::<E>(&id, "delete", err, &mut effects),
        },
        Msg::DeleteFinished { id, result } => {
            match result {
                Ok(()) => {
                    state.poller.unregister(&id);
                    state.pending.remove(&id);
                    if let Some(removed) = state.store.remove(&id) {
                        effects.push(Effect::Notify(notify::deleted(
                            E::KIND,
                            &id,
                            removed.label(),
                        )));
                    }
                }
                Err(reason) => {
                    state.store.cancel_remove(&id);
                    effects.push(Effect::Notify(notify::mutation_failed(
                        E::KIND,
                        Some(&id),
                        "delete",
                        &reason,
                    )));
                }
            }
            state.mark_dirty();
        }
        Msg::ActionTriggered { id } => match state.store.begin_action(&id) {
            Ok(()) => {
                state.mark_dirty();
                effects.push(Effect::Trigger { id });
            }
            Err(err) => reject::<E>(&id, E::KIND.trigger_verb(), err, &mut effects),
        },
        Msg::TriggerFinished { id, result, now } => {
            match result {
                Ok(()) => {
                    if state.store.restart(&id).is_ok() {
                        // A fresh run gets a fresh timeout window.
                        state.poller.unregister(&id);
                        state.poller.register(id, now);
                    }
                }
                Err(reason) => {
                    state.store.finish_action(&id);
                    effects.push(Effect::Notify(notify::mutation_failed(
                        E::KIND,
                        Some(&id),
                        E::KIND.trigger_verb(),
                        &reason,
                    )));
                }
            }
            state.mark_dirty();
        }
        Msg::Unmounted => {
            state.mounted = false;
            state.poller.clear();
            state.pending.clear();
            if state.polling {
                state.polling = false;
                effects.push(Effect::StopPolling);
            }
            return (state, effects);
        }
    }

    sync_polling(&mut state, &mut effects);
    (state, effects)
}

fn begin_mutation<E: TrackedEntity>(
    state: &mut ListState<E>,
    id: EntityId,
    patch: E::Patch,
    action: MutationAction,
    effects: &mut Vec<Effect<E>>,
) {
    match state.store.apply_optimistic(&id, &patch) {
        Ok(previous) => {
            state.pending.insert(
                id.clone(),
                PendingRollback {
                    previous,
                    action,
                    merged: None,
                },
            );
            state.mark_dirty();
            effects.push(Effect::Update { id, patch });
        }
        Err(err) => reject::<E>(&id, action.verb(), err, effects),
    }
}

/// A busy row ignores further actions; an unknown one is reported.
fn reject<E: TrackedEntity>(
    id: &EntityId,
    action: &str,
    err: StoreError,
    effects: &mut Vec<Effect<E>>,
) {
    match err {
        StoreError::MutationInFlight(_) => vb_debug!("{} {} ignored: {}", E::KIND, action, err),
        StoreError::UnknownEntity(_) => {
            vb_warn!("{} {} rejected: {}", E::KIND, action, err);
            effects.push(Effect::Notify(notify::mutation_failed(
                E::KIND,
                Some(id),
                action,
                &err.to_string(),
            )));
        }
    }
}

/// Announces a job the server finished while an edit was in flight, and
/// stops polling it.
fn settle_confirmed<E: TrackedEntity>(
    state: &mut ListState<E>,
    id: &EntityId,
    previous: E::Status,
    effects: &mut Vec<Effect<E>>,
) {
    let Some(entity) = state.store.get(id) else {
        return;
    };
    let current = entity.status();
    let label = entity.label().to_string();
    if !current.is_terminal() {
        return;
    }
    state.poller.unregister(id);
    if let Some(notification) = notify_transition(E::KIND, id, &label, previous, current, None) {
        effects.push(Effect::Notify(notification));
    }
}

fn apply_poll_update<E: TrackedEntity>(
    state: &mut ListState<E>,
    poll_update: PollUpdate<E::Status>,
    effects: &mut Vec<Effect<E>>,
) {
    let PollUpdate {
        id,
        report,
        synthesized,
    } = poll_update;
    let Some(transition) = state.store.merge_status_delta(&id, &report) else {
        return;
    };
    if let Some(pending) = state.pending.get_mut(&id) {
        pending.merged = Some(report.clone());
    }
    state.mark_dirty();
    if synthesized {
        vb_info!("{} {} gave up waiting", E::KIND, id);
    }

    let label = state
        .store
        .get(&id)
        .map(|entity| entity.label().to_string())
        .unwrap_or_default();
    if let Some(notification) = notify_transition(
        E::KIND,
        &id,
        &label,
        transition.previous,
        transition.current,
        report.error.as_deref(),
    ) {
        effects.push(Effect::Notify(notification));
    }
}

fn register_if_running<E: TrackedEntity>(state: &mut ListState<E>, id: &EntityId, now: Duration) {
    let running = state
        .store
        .get(id)
        .is_some_and(|entity| !entity.status().is_terminal());
    if running {
        state.poller.register(id.clone(), now);
    }
}

fn sync_polling<E: TrackedEntity>(state: &mut ListState<E>, effects: &mut Vec<Effect<E>>) {
    let active = !state.poller.is_idle();
    if active && !state.polling {
        state.polling = true;
        effects.push(Effect::StartPolling {
            interval: state.poller.policy().interval,
        });
    } else if !active && state.polling {
        state.polling = false;
        effects.push(Effect::StopPolling);
    }
}
