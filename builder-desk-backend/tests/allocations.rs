mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use builder_desk_backend::allocations::{AllocationInput, Toggled};
use builder_desk_backend::{Desk, DeskError, DeskSettings, ErrorKind};
use builder_desk_database::models::AllocationRow;
use builder_desk_scheduler::{Section, Slot, Tier};
use chrono::Duration;
use common::{at, event, member, memory_desk, FaultyStore};
use uuid::Uuid;

fn input(builder_id: Uuid, start: &str, end: &str) -> AllocationInput {
    AllocationInput {
        builder_id: Some(builder_id),
        time_slot_start: Some(format!("2024-05-01T{start}Z")),
        time_slot_end: Some(format!("2024-05-01T{end}Z")),
        section: None,
    }
}

#[tokio::test]
async fn toggling_twice_restores_the_original_state() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let builder = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(1);

    let first = desk
        .toggle_allocation(open_day.id, builder.id, &slot)
        .await
        .unwrap();
    assert!(matches!(first, Toggled::Added(ref allocation) if allocation.section == Some(Section::Desk(1))));
    assert_eq!(desk.list_allocations(open_day.id).await.unwrap().len(), 1);

    let second = desk
        .toggle_allocation(open_day.id, builder.id, &slot)
        .await
        .unwrap();
    assert!(matches!(second, Toggled::Removed(_)));
    assert!(desk.list_allocations(open_day.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn toggle_matches_slot_starts_within_a_second() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let builder = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(1);

    desk.toggle_allocation(open_day.id, builder.id, &slot)
        .await
        .unwrap();
    let jittered = Slot::new(
        slot.start + Duration::milliseconds(400),
        slot.end,
        slot.section.clone(),
    );
    let toggled = desk
        .toggle_allocation(open_day.id, builder.id, &jittered)
        .await
        .unwrap();
    assert!(matches!(toggled, Toggled::Removed(_)));
    assert!(desk.list_allocations(open_day.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn toggle_rejects_unknown_events_and_builders() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let builder = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(0);

    let error = desk
        .toggle_allocation(Uuid::new_v4(), builder.id, &slot)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);

    let error = desk
        .toggle_allocation(open_day.id, Uuid::new_v4(), &slot)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn group_toggle_fills_up_then_clears_only_the_group() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let grace = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let outsider = member(&desk, "Linus", Tier::Core, Some("Events")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(2);

    desk.toggle_allocation(open_day.id, ada.id, &slot)
        .await
        .unwrap();
    desk.toggle_allocation(open_day.id, outsider.id, &slot)
        .await
        .unwrap();

    // Ada already holds the slot, so only Grace is added.
    let changes = desk
        .toggle_group_allocation(open_day.id, &[ada.id, grace.id], &slot)
        .await
        .unwrap();
    assert_eq!(changes.added.len(), 1);
    assert_eq!(changes.added[0].builder_id, grace.id);
    assert!(changes.removed.is_empty());

    let changes = desk
        .toggle_group_allocation(open_day.id, &[ada.id, grace.id], &slot)
        .await
        .unwrap();
    assert!(changes.added.is_empty());
    assert_eq!(changes.removed.len(), 2);

    let left = desk.list_allocations(open_day.id).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].builder_id, outsider.id);
}

#[tokio::test]
async fn department_toggle_uses_executive_and_core_members_only() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let executive = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let core = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let junior = member(&desk, "Tim", Tier::Junior, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(1);

    let changes = desk
        .toggle_department_allocation(open_day.id, "Tech", &slot)
        .await
        .unwrap();
    let mut added: Vec<Uuid> = changes
        .added
        .iter()
        .map(|allocation| allocation.builder_id)
        .collect();
    added.sort();
    let mut expected = vec![executive.id, core.id];
    expected.sort();
    assert_eq!(added, expected);
    assert!(!added.contains(&junior.id));

    let error = desk
        .toggle_department_allocation(open_day.id, "Nowhere", &slot)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn saving_replaces_everything_and_drops_duplicates() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let grace = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let slots = desk.event_slots(open_day.id).await.unwrap();
    desk.toggle_allocation(open_day.id, ada.id, &slots[0])
        .await
        .unwrap();

    let saved = desk
        .save_allocations(
            open_day.id,
            vec![
                input(ada.id, "09:30:00", "10:00:00"),
                input(ada.id, "09:30:00.000", "10:00:00"),
                input(grace.id, "09:30:00", "10:00:00"),
                input(grace.id, "10:00:00", "10:30:00"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(saved.len(), 3);

    let stored = desk.list_allocations(open_day.id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .all(|allocation| allocation.time_slot_start != at("09:00:00")));

    assert!(desk
        .save_allocations(open_day.id, Vec::new())
        .await
        .unwrap()
        .is_empty());
    assert!(desk.list_allocations(open_day.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_input_leaves_existing_allocations_alone() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(1);
    desk.toggle_allocation(open_day.id, ada.id, &slot)
        .await
        .unwrap();

    let error = desk
        .save_allocations(
            open_day.id,
            vec![
                input(ada.id, "10:00:00", "10:30:00"),
                input(ada.id, "10:30:00", "10:00:00"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(error, DeskError::Validation(ref message) if message.starts_with("allocation 1")));

    let error = desk
        .save_allocations(
            open_day.id,
            vec![input(Uuid::new_v4(), "10:00:00", "10:30:00")],
        )
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);

    assert_eq!(desk.list_allocations(open_day.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn saving_inserts_in_batches() {
    let desk = Desk::new(
        Arc::new(builder_desk_database::MemoryStore::new()),
        DeskSettings {
            batch_size: 2,
            ..DeskSettings::default()
        },
    );
    let open_day = event(&desk, "09:00:00", "12:00:00").await;
    let mut inputs = Vec::new();
    for name in ["Ada", "Grace", "Linus", "Barbara", "Ken"] {
        let builder = member(&desk, name, Tier::General, None).await;
        inputs.push(input(builder.id, "09:30:00", "10:00:00"));
    }

    let saved = desk.save_allocations(open_day.id, inputs).await.unwrap();
    assert_eq!(saved.len(), 5);
    assert_eq!(desk.list_allocations(open_day.id).await.unwrap().len(), 5);
}

#[tokio::test]
async fn a_delete_that_leaves_rows_behind_is_retried_once() {
    let store = Arc::new(FaultyStore::ignoring_deletes(1));
    let desk = Desk::new(store.clone(), DeskSettings::default());
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let slots = desk.event_slots(open_day.id).await.unwrap();
    desk.toggle_allocation(open_day.id, ada.id, &slots[0])
        .await
        .unwrap();

    let saved = desk
        .save_allocations(open_day.id, vec![input(ada.id, "10:00:00", "10:30:00")])
        .await
        .unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 2);
    let stored = desk.list_allocations(open_day.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].time_slot_start, at("10:00:00"));
}

#[tokio::test]
async fn a_delete_that_keeps_failing_is_a_persistence_error() {
    let store = Arc::new(FaultyStore::ignoring_deletes(2));
    let desk = Desk::new(store.clone(), DeskSettings::default());
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let slots = desk.event_slots(open_day.id).await.unwrap();
    desk.toggle_allocation(open_day.id, ada.id, &slots[0])
        .await
        .unwrap();

    let error = desk
        .save_allocations(open_day.id, vec![input(ada.id, "10:00:00", "10:30:00")])
        .await
        .unwrap_err();
    assert!(matches!(error, DeskError::Residue { remaining: 1, .. }));
    assert_eq!(error.kind(), ErrorKind::Persistence);
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn a_concurrent_insert_surfaces_as_a_conflict_naming_the_row() {
    let store = Arc::new(FaultyStore::default());
    let desk = Desk::new(store.clone(), DeskSettings::default());
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let grace = member(&desk, "Grace", Tier::Core, Some("Tech")).await;

    store.sneak_in(AllocationRow {
        id: Uuid::new_v4(),
        event_id: open_day.id,
        builder_id: grace.id,
        time_slot_start: at("10:00:00").into(),
        time_slot_end: at("10:30:00").into(),
        section: Some("desk_2".to_owned()),
        created_at: at("08:00:00").into(),
    });

    let error = desk
        .save_allocations(
            open_day.id,
            vec![
                input(ada.id, "10:00:00", "10:30:00"),
                input(grace.id, "10:00:00", "10:30:00"),
            ],
        )
        .await
        .unwrap_err();
    match error {
        DeskError::Conflict { member, slot_start } => {
            assert_eq!(member, grace.id);
            assert_eq!(slot_start, "2024-05-01T10:00:00.000Z");
        }
        other => panic!("expected a conflict, got {other:?}"),
    }

    // The failed batch wrote nothing, only the concurrent row is there.
    let stored = desk.list_allocations(open_day.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].builder_id, grace.id);
}

#[tokio::test]
async fn toggles_reject_slots_that_end_before_they_start() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let grace = member(&desk, "Grace", Tier::Core, Some("Tech")).await;

    let inverted = Slot::new(at("10:00:00"), at("09:30:00"), Section::Desk(1));
    let error = desk
        .toggle_allocation(open_day.id, ada.id, &inverted)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);

    let empty = Slot::new(at("10:30:00"), at("10:30:00"), Section::Desk(9));
    let error = desk
        .toggle_group_allocation(open_day.id, &[ada.id, grace.id], &empty)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);

    let error = desk
        .toggle_department_allocation(open_day.id, "Tech", &empty)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);

    assert!(desk.list_allocations(open_day.id).await.unwrap().is_empty());
}

fn at_most_one_per_key(allocations: &[builder_desk_backend::allocations::Allocation]) {
    let mut keys: Vec<(Uuid, String)> = allocations
        .iter()
        .map(|allocation| (allocation.builder_id, allocation.time_slot_start.normalize()))
        .collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total, "duplicate allocation in {allocations:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_toggles_never_duplicate_an_allocation() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(1);

    for _ in 0..20 {
        let (first, second) = tokio::join!(
            desk.toggle_allocation(open_day.id, ada.id, &slot),
            desk.toggle_allocation(open_day.id, ada.id, &slot),
        );
        for outcome in [first, second] {
            if let Err(error) = outcome {
                assert_eq!(error.kind(), ErrorKind::Conflict, "{error}");
            }
        }
        let stored = desk.list_allocations(open_day.id).await.unwrap();
        assert!(stored.len() <= 1);
        at_most_one_per_key(&stored);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_toggle_racing_a_full_save_leaves_one_allocation_at_most() {
    let desk = memory_desk();
    let open_day = event(&desk, "09:00:00", "11:00:00").await;
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let slot = desk.event_slots(open_day.id).await.unwrap().remove(1);

    for _ in 0..20 {
        desk.save_allocations(open_day.id, Vec::new()).await.unwrap();
        let (toggled, saved) = tokio::join!(
            desk.toggle_allocation(open_day.id, ada.id, &slot),
            desk.save_allocations(open_day.id, vec![input(ada.id, "09:30:00", "10:00:00")]),
        );
        if let Err(error) = toggled {
            assert_eq!(error.kind(), ErrorKind::Conflict, "{error}");
        }
        if let Err(error) = saved {
            assert_eq!(error.kind(), ErrorKind::Conflict, "{error}");
        }
        let stored = desk.list_allocations(open_day.id).await.unwrap();
        assert!(stored.len() <= 1);
        at_most_one_per_key(&stored);
    }
}
