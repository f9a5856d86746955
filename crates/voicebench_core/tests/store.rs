use pretty_assertions::assert_eq;
use voicebench_core::{
    EntityId, GenerationStatus, OptimisticListStore, StatusReport, TestSuite, TestSuitePatch,
    TrackedEntity, Transition,
};

fn suite(id: &str, status: GenerationStatus) -> TestSuite {
    TestSuite {
        id: EntityId::new(id),
        name: format!("Suite {id}"),
        description: None,
        agent_id: EntityId::new("agent-1"),
        status,
        scenario_count: 0,
        error: None,
        is_active: true,
    }
}

fn store() -> OptimisticListStore<TestSuite> {
    let mut store = OptimisticListStore::new();
    store.replace_all(vec![
        suite("a", GenerationStatus::Generating),
        suite("b", GenerationStatus::Ready),
    ]);
    store
}

#[test]
fn rollback_restores_the_exact_snapshot() {
    let mut store = store();
    let before = store.clone();
    let id = EntityId::new("b");
    let patch = TestSuitePatch {
        name: Some("Renamed".into()),
        description: Some("new".into()),
        is_active: Some(false),
    };

    let previous = store.apply_optimistic(&id, &patch).unwrap();
    assert_eq!(store.get(&id).unwrap().name, "Renamed");
    store.rollback(&id, previous).unwrap();

    assert_eq!(store, before);
}

#[test]
fn status_delta_does_not_clobber_in_flight_edit() {
    let mut store = store();
    let id = EntityId::new("a");
    store
        .apply_optimistic(&id, &TestSuite::toggle_patch(false))
        .unwrap();

    let transition = store.merge_status_delta(
        &id,
        &StatusReport::new(GenerationStatus::Ready).with_scenario_count(9),
    );

    assert_eq!(
        transition,
        Some(Transition {
            previous: GenerationStatus::Generating,
            current: GenerationStatus::Ready,
        })
    );
    let entity = store.get(&id).unwrap();
    assert!(!entity.is_active);
    assert_eq!(entity.scenario_count, 9);
    assert!(store.is_busy(&id));
}

#[test]
fn pending_ids_lists_running_jobs_only() {
    let store = store();
    assert_eq!(store.pending_ids(), vec![EntityId::new("a")]);
}

#[test]
fn insert_confirmed_replaces_existing_record() {
    let mut store = store();
    let mut updated = suite("a", GenerationStatus::Ready);
    updated.scenario_count = 4;
    store.insert_confirmed(updated.clone());
    store.insert_confirmed(suite("c", GenerationStatus::Pending));

    assert_eq!(store.len(), 3);
    assert_eq!(store.get(&EntityId::new("a")), Some(&updated));
}
