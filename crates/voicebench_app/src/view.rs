//! Mounts one list view and drives it from the terminal.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Local;
use tokio::sync::mpsc;
use voicebench_core::{EntityId, ListViewModel, LoadState, Notification, TrackedEntity};
use voicebench_engine::{
    ChannelSurface, DashboardContext, ListViewRuntime, LogSurface, NotificationSurface,
    ViewCommand,
};
use voicebench_logging::{vb_info, vb_warn};

use crate::config::DashboardConfig;
use crate::render;

/// What to do once the list has loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    /// Keep the view mounted until interrupted.
    Watch,
    Toggle(EntityId),
    Delete(EntityId),
    Trigger(EntityId),
}

impl Request {
    fn target(&self) -> Option<&EntityId> {
        match self {
            Request::Watch => None,
            Request::Toggle(id) | Request::Delete(id) | Request::Trigger(id) => Some(id),
        }
    }
}

/// The row's active flag, or `None` when the list has no such row.
fn row_active(view: &ListViewModel, id: &EntityId) -> Option<bool> {
    view.rows
        .iter()
        .find(|row| &row.id == id)
        .map(|row| row.is_active)
}

/// When a one-shot request is finished.
enum Goal {
    Never,
    /// The row settled with the new value, or a failure was reported.
    Toggled { id: EntityId, from: bool },
    /// Any notification about the row.
    Notified(EntityId),
}

impl Goal {
    fn reached_by_view(&self, view: &ListViewModel) -> bool {
        match self {
            Goal::Toggled { id, from } => view
                .rows
                .iter()
                .any(|row| &row.id == id && !row.busy && row.is_active != *from),
            Goal::Never | Goal::Notified(_) => false,
        }
    }

    fn reached_by(&self, notification: &Notification) -> bool {
        match self {
            Goal::Never => false,
            Goal::Toggled { id, .. } | Goal::Notified(id) => {
                notification.entity_id.as_ref() == Some(id)
            }
        }
    }
}

pub(crate) async fn run<E: TrackedEntity>(
    context: &DashboardContext,
    config: &DashboardConfig,
    request: Request,
) -> anyhow::Result<()> {
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let api = Arc::new(context.api::<E>());
    let handle = ListViewRuntime::<E, _>::new(api, Arc::new(ChannelSurface::new(notify_tx)))
        .with_policy(config.poll_policy(E::KIND))
        .spawn();
    let mut views = handle.views();
    let mut auth = context.auth_changes();
    let watching = request == Request::Watch;

    // Wait for the first load to finish.
    loop {
        let load = views.borrow_and_update().load.clone();
        match load {
            LoadState::Ready => break,
            LoadState::Failed(reason) => {
                handle.unmount().await.context("view task failed")?;
                drain(&mut notify_rx);
                bail!("could not load {}: {}", E::KIND, reason);
            }
            LoadState::Idle | LoadState::Loading => {}
        }
        if views.changed().await.is_err() {
            bail!("{} view stopped before loading", E::KIND);
        }
    }
    print!("{}", render::table(&views.borrow()));

    let missing = request
        .target()
        .filter(|id| row_active(&views.borrow(), id).is_none())
        .cloned();
    if let Some(id) = missing {
        handle.unmount().await.context("view task failed")?;
        bail!("no {} with id {}", E::KIND.noun().to_lowercase(), id);
    }

    let goal = match request {
        Request::Watch => Goal::Never,
        Request::Toggle(id) => {
            let from = row_active(&views.borrow(), &id).unwrap_or_default();
            handle.send(ViewCommand::Toggle(id.clone())).await;
            Goal::Toggled { id, from }
        }
        Request::Delete(id) => {
            handle.send(ViewCommand::Delete(id.clone())).await;
            Goal::Notified(id)
        }
        Request::Trigger(id) => {
            handle.send(ViewCommand::Trigger(id.clone())).await;
            Goal::Notified(id)
        }
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                vb_info!("Interrupted, unmounting {} view", E::KIND);
                break;
            }
            changed = auth.changed() => {
                if changed.is_err() || !auth.borrow().is_authenticated() {
                    vb_warn!("Session ended, unmounting {} view", E::KIND);
                    break;
                }
            }
            Some(notification) = notify_rx.recv() => {
                show(&notification);
                if goal.reached_by(&notification) {
                    break;
                }
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if watching {
                    print!("{}", render::table(&view));
                }
                if goal.reached_by_view(&view) {
                    break;
                }
            }
        }
    }

    let state = handle.unmount().await.context("view task failed")?;
    drain(&mut notify_rx);
    if !watching {
        print!("{}", render::table(&state.view()));
    }
    Ok(())
}

fn show(notification: &Notification) {
    LogSurface.notify(notification);
    println!("{}", render::notification_line(notification, Local::now()));
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        show(&notification);
    }
}
