use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use voicebench_core::{
    AudioPreviewStatus, EntityId, GenerationStatus, Notification, Persona, PersonaDraft,
    PersonaPatch, StatusReport, TestSuite, TestSuiteDraft, TestSuitePatch, TrackedEntity,
    Variant, TIMEOUT_MESSAGE,
};
use voicebench_engine::{
    ApiError, FailureKind, ListViewRuntime, NotificationSurface, ResourceApi, ViewCommand,
};

type Report = StatusReport<GenerationStatus>;

#[derive(Default)]
struct RecordingSurface {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingSurface {
    fn take(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().drain(..).collect()
    }
}

impl NotificationSurface for RecordingSurface {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

/// In-memory backend. Each ID replays its scripted status results; the last
/// one repeats forever.
#[derive(Default)]
struct FakeSuites {
    suites: Mutex<Vec<TestSuite>>,
    statuses: Mutex<HashMap<EntityId, VecDeque<Result<Report, ApiError>>>>,
    status_calls: Mutex<HashMap<EntityId, usize>>,
    reject_updates: bool,
}

impl FakeSuites {
    fn with_suites(suites: Vec<TestSuite>) -> Self {
        Self {
            suites: Mutex::new(suites),
            ..Self::default()
        }
    }

    fn script(self, id: &str, results: Vec<Result<Report, ApiError>>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(EntityId::new(id), results.into());
        self
    }

    fn calls(&self, id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .get(&EntityId::new(id))
            .copied()
            .unwrap_or(0)
    }
}

fn network_error() -> ApiError {
    ApiError {
        kind: FailureKind::Network,
        message: "connection reset".into(),
    }
}

#[async_trait::async_trait]
impl ResourceApi<TestSuite> for FakeSuites {
    async fn list(&self) -> Result<Vec<TestSuite>, ApiError> {
        Ok(self.suites.lock().unwrap().clone())
    }

    async fn get(&self, id: &EntityId) -> Result<TestSuite, ApiError> {
        self.suites
            .lock()
            .unwrap()
            .iter()
            .find(|suite| suite.id() == id)
            .cloned()
            .ok_or_else(|| ApiError {
                kind: FailureKind::HttpStatus(404),
                message: "not found".into(),
            })
    }

    async fn create(&self, _draft: &TestSuiteDraft) -> Result<TestSuite, ApiError> {
        Err(network_error())
    }

    async fn update(&self, id: &EntityId, patch: &TestSuitePatch) -> Result<TestSuite, ApiError> {
        if self.reject_updates {
            return Err(network_error());
        }
        let mut suites = self.suites.lock().unwrap();
        let suite = suites
            .iter_mut()
            .find(|suite| suite.id() == id)
            .ok_or_else(network_error)?;
        suite.apply_patch(patch);
        Ok(suite.clone())
    }

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        self.suites.lock().unwrap().retain(|suite| suite.id() != id);
        Ok(())
    }

    async fn status(&self, id: &EntityId) -> Result<Report, ApiError> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        let Some(queue) = statuses.get_mut(id) else {
            return Ok(StatusReport::new(GenerationStatus::Generating));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Err(network_error()))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(network_error()))
        }
    }

    async fn trigger(&self, _id: &EntityId) -> Result<(), ApiError> {
        Ok(())
    }
}

/// A voice service that never finishes rendering a preview.
#[derive(Default)]
struct StuckPreviews {
    personas: Vec<Persona>,
    status_calls: AtomicUsize,
}

impl StuckPreviews {
    fn calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ResourceApi<Persona> for StuckPreviews {
    async fn list(&self) -> Result<Vec<Persona>, ApiError> {
        Ok(self.personas.clone())
    }

    async fn get(&self, _id: &EntityId) -> Result<Persona, ApiError> {
        Err(network_error())
    }

    async fn create(&self, _draft: &PersonaDraft) -> Result<Persona, ApiError> {
        Err(network_error())
    }

    async fn update(&self, _id: &EntityId, _patch: &PersonaPatch) -> Result<Persona, ApiError> {
        Err(network_error())
    }

    async fn delete(&self, _id: &EntityId) -> Result<(), ApiError> {
        Err(network_error())
    }

    async fn status(&self, _id: &EntityId) -> Result<StatusReport<AudioPreviewStatus>, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(StatusReport::new(AudioPreviewStatus::Generating))
    }

    async fn trigger(&self, _id: &EntityId) -> Result<(), ApiError> {
        Ok(())
    }
}

fn suite(id: &str, name: &str, status: GenerationStatus) -> TestSuite {
    TestSuite {
        id: EntityId::new(id),
        name: name.to_string(),
        description: None,
        agent_id: EntityId::new("agent-1"),
        status,
        scenario_count: 0,
        error: None,
        is_active: true,
    }
}

fn three_suites() -> Vec<TestSuite> {
    vec![
        suite("a", "Billing", GenerationStatus::Generating),
        suite("b", "Refunds", GenerationStatus::Ready),
        suite("c", "Onboarding", GenerationStatus::Ready),
    ]
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[tokio::test(start_paused = true)]
async fn generation_completes_after_one_tick() {
    let api = Arc::new(
        FakeSuites::with_suites(three_suites()).script(
            "a",
            vec![Ok(StatusReport::new(GenerationStatus::Ready).with_scenario_count(12))],
        ),
    );
    let surface = Arc::new(RecordingSurface::default());
    let handle = ListViewRuntime::<TestSuite, _>::new(api.clone(), surface.clone()).spawn();

    tokio::time::sleep(ms(2_100)).await;
    let state = handle.unmount().await.expect("view task");

    let a = state.store().get(&EntityId::new("a")).unwrap();
    assert_eq!(a.status, GenerationStatus::Ready);
    assert_eq!(a.scenario_count, 12);
    assert_eq!(api.calls("a"), 1);
    assert_eq!(api.calls("b"), 0);

    let sent = surface.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Generation Complete");
    assert!(sent[0].message.contains("Billing"));
}

#[tokio::test(start_paused = true)]
async fn unchanged_status_polls_quietly_until_unmount() {
    let api = Arc::new(FakeSuites::with_suites(three_suites()));
    let surface = Arc::new(RecordingSurface::default());
    let handle = ListViewRuntime::<TestSuite, _>::new(api.clone(), surface.clone()).spawn();

    tokio::time::sleep(ms(6_100)).await;
    assert_eq!(api.calls("a"), 3);

    let state = handle.unmount().await.expect("view task");
    assert!(state.poller().is_idle());
    assert!(!state.is_mounted());

    tokio::time::sleep(ms(10_000)).await;
    assert_eq!(api.calls("a"), 3);
    assert!(surface.take().is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_failing_fetch_does_not_block_others() {
    let suites = vec![
        suite("a", "Billing", GenerationStatus::Generating),
        suite("b", "Refunds", GenerationStatus::Pending),
    ];
    let api = Arc::new(
        FakeSuites::with_suites(suites)
            .script(
                "a",
                vec![
                    Err(network_error()),
                    Ok(StatusReport::new(GenerationStatus::Ready)),
                ],
            )
            .script("b", vec![Ok(StatusReport::new(GenerationStatus::Ready))]),
    );
    let surface = Arc::new(RecordingSurface::default());
    let handle = ListViewRuntime::<TestSuite, _>::new(api.clone(), surface.clone()).spawn();

    tokio::time::sleep(ms(2_100)).await;
    let first = surface.take();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].entity_id, Some(EntityId::new("b")));

    tokio::time::sleep(ms(2_000)).await;
    let second = surface.take();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].entity_id, Some(EntityId::new("a")));

    let state = handle.unmount().await.expect("view task");
    assert!(!state.is_polling());
    assert_eq!(api.calls("a"), 2);
    assert_eq!(api.calls("b"), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_toggle_restores_previous_value() {
    let api = Arc::new(FakeSuites {
        reject_updates: true,
        ..FakeSuites::with_suites(three_suites())
    });
    let surface = Arc::new(RecordingSurface::default());
    let handle = ListViewRuntime::<TestSuite, _>::new(api.clone(), surface.clone()).spawn();
    let views = handle.views();

    tokio::time::sleep(ms(10)).await;
    assert_eq!(views.borrow().rows.len(), 3);

    assert!(handle.send(ViewCommand::Toggle(EntityId::new("b"))).await);
    tokio::time::sleep(ms(10)).await;
    let state = handle.unmount().await.expect("view task");

    let b = state.store().get(&EntityId::new("b")).unwrap();
    assert!(b.is_active);
    assert!(!state.store().is_busy(&EntityId::new("b")));

    let sent = surface.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].variant, Variant::Error);
    assert_eq!(sent[0].title, "Failed to toggle test suite");
}

#[tokio::test(start_paused = true)]
async fn confirmed_delete_removes_row() {
    let api = Arc::new(FakeSuites::with_suites(three_suites()));
    let surface = Arc::new(RecordingSurface::default());
    let handle = ListViewRuntime::<TestSuite, _>::new(api.clone(), surface.clone()).spawn();

    tokio::time::sleep(ms(10)).await;
    assert!(handle.send(ViewCommand::Delete(EntityId::new("a"))).await);
    tokio::time::sleep(ms(10)).await;

    let state = handle.unmount().await.expect("view task");
    assert_eq!(state.store().len(), 2);
    assert!(state.poller().is_idle());
    assert!(api.get(&EntityId::new("a")).await.is_err());
    assert_eq!(surface.take()[0].variant, Variant::Info);
}

#[tokio::test(start_paused = true)]
async fn stuck_preview_fails_once_at_the_deadline() {
    let persona = Persona {
        id: EntityId::new("p1"),
        name: "Grumpy caller".to_string(),
        description: None,
        voice: Some("alloy".to_string()),
        accent: None,
        is_active: true,
        preview_audio_status: AudioPreviewStatus::Generating,
        preview_audio_url: None,
        preview_audio_error: None,
    };
    let api = Arc::new(StuckPreviews {
        personas: vec![persona],
        ..StuckPreviews::default()
    });
    let surface = Arc::new(RecordingSurface::default());
    let handle = ListViewRuntime::<Persona, _>::new(api.clone(), surface.clone()).spawn();
    let views = handle.views();

    tokio::time::sleep(ms(59_000)).await;
    assert!(surface.take().is_empty());
    assert_eq!(views.borrow().rows[0].status, "generating");

    tokio::time::sleep(ms(2_000)).await;
    let sent = surface.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].variant, Variant::Error);
    assert_eq!(sent[0].title, "Preview Failed");
    assert!(sent[0].message.contains(TIMEOUT_MESSAGE));
    let calls = api.calls();

    tokio::time::sleep(ms(10_000)).await;
    assert!(surface.take().is_empty());
    assert_eq!(api.calls(), calls);

    let state = handle.unmount().await.expect("view task");
    assert!(!state.is_polling());
    let p1 = state.store().get(&EntityId::new("p1")).unwrap();
    assert_eq!(p1.preview_audio_status, AudioPreviewStatus::Failed);
    assert_eq!(p1.preview_audio_error.as_deref(), Some(TIMEOUT_MESSAGE));
}
