//! Async driver for one list view.
//!
//! The runtime owns the view's [`ListState`], feeds it messages and carries
//! out the effects it returns. Network calls for mutations run as separate
//! tasks and report back through a channel. Status fetches for one tick run
//! concurrently but the tick is awaited as a whole, so results for an ID
//! are always applied in tick order.
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use voicebench_core::{
    update, Effect, EntityId, ListState, ListViewModel, Msg, PollPolicy, TrackedEntity,
};
use voicebench_logging::{poll_tick, set_poll_tick, vb_debug, vb_info};

use crate::{Clock, NotificationSurface, ResourceApi, TokioClock};

const COMMAND_BUFFER: usize = 32;

/// User actions on a mounted view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand<E: TrackedEntity> {
    Toggle(EntityId),
    Edit { id: EntityId, patch: E::Patch },
    Create(E::Draft),
    Delete(EntityId),
    Trigger(EntityId),
}

impl<E: TrackedEntity> ViewCommand<E> {
    fn into_msg(self) -> Msg<E> {
        match self {
            ViewCommand::Toggle(id) => Msg::ToggleActive { id },
            ViewCommand::Edit { id, patch } => Msg::EditSubmitted { id, patch },
            ViewCommand::Create(draft) => Msg::CreateSubmitted { draft },
            ViewCommand::Delete(id) => Msg::DeleteClicked { id },
            ViewCommand::Trigger(id) => Msg::ActionTriggered { id },
        }
    }
}

pub struct ListViewRuntime<E: TrackedEntity, A> {
    api: Arc<A>,
    surface: Arc<dyn NotificationSurface>,
    clock: Arc<dyn Clock>,
    state: ListState<E>,
}

impl<E, A> ListViewRuntime<E, A>
where
    E: TrackedEntity,
    A: ResourceApi<E> + 'static,
{
    pub fn new(api: Arc<A>, surface: Arc<dyn NotificationSurface>) -> Self {
        Self {
            api,
            surface,
            clock: Arc::new(TokioClock::new()),
            state: ListState::new(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.state = ListState::with_policy(policy);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mounts the view on a background task.
    pub fn spawn(self) -> ViewHandle<E> {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(self.state.view());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(command_rx, view_tx, cancel.clone()));
        ViewHandle {
            commands: command_tx,
            views: view_rx,
            cancel,
            task,
        }
    }

    /// Runs the view until `cancel` fires, then unmounts it and returns the
    /// final state.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<ViewCommand<E>>,
        views: watch::Sender<ListViewModel>,
        cancel: CancellationToken,
    ) -> ListState<E> {
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
        let mut pump = Pump {
            api: self.api,
            surface: self.surface,
            clock: self.clock,
            state: self.state,
            ticker: None,
            ticks: 0,
            msg_tx,
            cancel: cancel.clone(),
        };
        vb_info!("{} view mounted", E::KIND);
        pump.dispatch(Msg::Mounted).await;
        pump.publish(&views);

        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(msg) = msg_rx.recv() => pump.dispatch(msg).await,
                command = commands.recv(), if commands_open => match command {
                    Some(command) => pump.dispatch(command.into_msg()).await,
                    None => commands_open = false,
                },
                _ = next_tick(&mut pump.ticker) => pump.on_tick().await,
            }
            pump.publish(&views);
        }

        pump.dispatch(Msg::Unmounted).await;
        pump.ticker = None;
        pump.publish(&views);
        vb_info!("{} view unmounted after {} ticks", E::KIND, pump.ticks);
        pump.state
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

struct Pump<E: TrackedEntity, A> {
    api: Arc<A>,
    surface: Arc<dyn NotificationSurface>,
    clock: Arc<dyn Clock>,
    state: ListState<E>,
    ticker: Option<Interval>,
    ticks: u64,
    msg_tx: mpsc::UnboundedSender<Msg<E>>,
    cancel: CancellationToken,
}

impl<E, A> Pump<E, A>
where
    E: TrackedEntity,
    A: ResourceApi<E> + 'static,
{
    async fn on_tick(&mut self) {
        self.ticks += 1;
        set_poll_tick(self.ticks);
        let now = self.clock.now();
        vb_debug!("{} poll tick={} now={:?}", E::KIND, poll_tick(), now);
        self.dispatch(Msg::Tick { now }).await;
    }

    async fn dispatch(&mut self, msg: Msg<E>) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                queue.extend(self.run_effect(effect).await);
            }
        }
    }

    fn publish(&mut self, views: &watch::Sender<ListViewModel>) {
        let view = self.state.view();
        if self.state.consume_dirty() {
            views.send_replace(view);
        }
    }

    /// Executes one effect; returns messages that must be applied right away.
    async fn run_effect(&mut self, effect: Effect<E>) -> Vec<Msg<E>> {
        match effect {
            Effect::FetchList => {
                let api = self.api.clone();
                let clock = self.clock.clone();
                self.spawn_call(async move {
                    let result = api.list().await.map_err(|err| err.to_string());
                    Msg::Loaded {
                        result,
                        now: clock.now(),
                    }
                });
            }
            Effect::FetchStatus { ids } => {
                let api = &self.api;
                let fetches = ids.into_iter().map(|id| async move {
                    let result = api.status(&id).await.map_err(|err| err.to_string());
                    Msg::StatusFetched { id, result }
                });
                return tokio::select! {
                    _ = self.cancel.cancelled() => Vec::new(),
                    fetched = join_all(fetches) => fetched,
                };
            }
            Effect::Create { draft } => {
                let api = self.api.clone();
                let clock = self.clock.clone();
                self.spawn_call(async move {
                    let result = api.create(&draft).await.map_err(|err| err.to_string());
                    Msg::Created {
                        result,
                        now: clock.now(),
                    }
                });
            }
            Effect::Update { id, patch } => {
                let api = self.api.clone();
                let clock = self.clock.clone();
                self.spawn_call(async move {
                    let result = api.update(&id, &patch).await.map_err(|err| err.to_string());
                    Msg::MutationFinished {
                        id,
                        result,
                        now: clock.now(),
                    }
                });
            }
            Effect::Delete { id } => {
                let api = self.api.clone();
                self.spawn_call(async move {
                    let result = api.delete(&id).await.map_err(|err| err.to_string());
                    Msg::DeleteFinished { id, result }
                });
            }
            Effect::Trigger { id } => {
                let api = self.api.clone();
                let clock = self.clock.clone();
                self.spawn_call(async move {
                    let result = api.trigger(&id).await.map_err(|err| err.to_string());
                    Msg::TriggerFinished {
                        id,
                        result,
                        now: clock.now(),
                    }
                });
            }
            Effect::Notify(notification) => self.surface.notify(&notification),
            Effect::StartPolling { interval } => {
                vb_debug!("{} polling every {:?}", E::KIND, interval);
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.ticker = Some(ticker);
            }
            Effect::StopPolling => {
                vb_debug!("{} polling stopped", E::KIND);
                self.ticker = None;
            }
        }
        Vec::new()
    }

    /// Runs a network call off the loop; the result comes back as a message
    /// unless the view is unmounted first.
    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = Msg<E>> + Send + 'static,
    {
        let tx = self.msg_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                msg = call => {
                    let _ = tx.send(msg);
                }
            }
        });
    }
}

/// Handle to a view mounted with [`ListViewRuntime::spawn`].
pub struct ViewHandle<E: TrackedEntity> {
    commands: mpsc::Sender<ViewCommand<E>>,
    views: watch::Receiver<ListViewModel>,
    cancel: CancellationToken,
    task: JoinHandle<ListState<E>>,
}

impl<E: TrackedEntity> ViewHandle<E> {
    /// Returns `false` once the view has stopped.
    pub async fn send(&self, command: ViewCommand<E>) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub fn views(&self) -> watch::Receiver<ListViewModel> {
        self.views.clone()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops polling, drops late results and returns the final state.
    pub async fn unmount(self) -> Result<ListState<E>, JoinError> {
        self.cancel.cancel();
        self.task.await
    }
}
