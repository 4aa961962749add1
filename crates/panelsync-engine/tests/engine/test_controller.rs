//! Controller and sequencer behavior over scripted panel data
//!
//! Covers the engine's core guarantees: exact pagination, idempotence,
//! local-field preservation, partial-failure isolation, cooperative
//! cancellation convergence, the single-flight claim, and full-sync
//! phase ordering with per-phase outcomes.

use chrono::Utc;

use panelsync_core::domain::errors::{PanelError, SyncLogError};
use panelsync_core::domain::merge;
use panelsync_core::domain::run::{
    PhaseOutcome, RunStatus, SyncTarget, FULL_SYNC_ORDER,
};
use panelsync_core::ports::mirror_repository::IMirrorRepository;
use panelsync_core::ports::sync_log::ISyncLogStore;

use crate::common::{self, StubPanel};

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_pagination_boundary_exactly_three_fetches_in_order() {
    let stub = StubPanel {
        users: vec![
            vec![common::user(1, "a@x.com"), common::user(2, "b@x.com")],
            vec![common::user(3, "c@x.com")],
            vec![common::user(4, "d@x.com")],
        ],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let run = h.controller.run(SyncTarget::Users).await.unwrap();

    assert_eq!(*run.status(), RunStatus::Completed);
    // total_pages = 3: exactly three fetches, strictly in order, no 4th
    assert_eq!(h.panel.fetches_for(SyncTarget::Users), vec![1, 2, 3]);

    let summary = run.metadata().summary.as_ref().unwrap();
    assert_eq!(summary.counts["users"].created, 4);
    assert_eq!(summary.counts["users"].skipped, 0);
}

#[tokio::test]
async fn test_empty_source_completes_with_zero_counts() {
    let h = common::harness(StubPanel::default()).await;

    let run = h.controller.run(SyncTarget::Locations).await.unwrap();

    assert_eq!(*run.status(), RunStatus::Completed);
    assert_eq!(h.panel.fetches_for(SyncTarget::Locations), vec![1]);
    let summary = run.metadata().summary.as_ref().unwrap();
    assert_eq!(summary.counts["locations"].total(), 0);
}

// ============================================================================
// Idempotence and merge policy
// ============================================================================

#[tokio::test]
async fn test_second_sync_of_unchanged_source_creates_nothing() {
    let stub = StubPanel {
        users: vec![vec![
            common::user(1, "a@x.com"),
            common::user(2, "b@x.com"),
            common::user(3, "c@x.com"),
        ]],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let first = h.controller.run(SyncTarget::Users).await.unwrap();
    let second = h.controller.run(SyncTarget::Users).await.unwrap();
    let third = h.controller.run(SyncTarget::Users).await.unwrap();

    let counts = |run: &panelsync_core::domain::run::SyncRun| {
        run.metadata().summary.as_ref().unwrap().counts["users"].clone()
    };

    assert_eq!(counts(&first).created, 3);
    assert_eq!(counts(&second).created, 0);
    assert_eq!(counts(&second).updated, 3);
    // Re-applying identical data keeps yielding the same counts
    assert_eq!(counts(&third).created, 0);
    assert_eq!(counts(&third).updated, 3);
}

#[tokio::test]
async fn test_fresh_user_created_without_password_and_unmigrated() {
    let stub = StubPanel {
        users: vec![vec![common::user(501, "a@x.com")]],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    h.controller.run(SyncTarget::Users).await.unwrap();

    let user = h.mirror.find_user_by_panel_id(501).await.unwrap().unwrap();
    assert_eq!(user.email.as_str(), "a@x.com");
    assert!(user.password_hash.is_none());
    assert!(!user.is_migrated);
    assert!(user.last_synced_at.is_some());
}

#[tokio::test]
async fn test_existing_user_adopted_by_email_with_password_untouched() {
    let stub = StubPanel {
        users: vec![vec![common::user(501, "a@x.com")]],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    // A locally-registered account: known email, no panel id, migrated,
    // with a password hash that must survive the sync byte-for-byte.
    let mut local = common::user(0, "a@x.com");
    local.username = "local-a".to_string();
    let mut seeded = merge::new_user(&local, Utc::now()).unwrap();
    seeded.panel_id = None;
    seeded.password_hash = Some("$argon2id$v=19$m=65536$seeded".to_string());
    seeded.is_migrated = true;
    h.mirror.upsert_user(&seeded).await.unwrap();

    let run = h.controller.run(SyncTarget::Users).await.unwrap();

    let summary = run.metadata().summary.as_ref().unwrap();
    assert_eq!(summary.counts["users"].created, 0);
    assert_eq!(summary.counts["users"].updated, 1);

    let user = h.mirror.find_user_by_panel_id(501).await.unwrap().unwrap();
    assert_eq!(user.id, seeded.id);
    assert_eq!(
        user.password_hash.as_deref(),
        Some("$argon2id$v=19$m=65536$seeded")
    );
    assert!(user.is_migrated);
}

#[tokio::test]
async fn test_local_fields_survive_repeated_syncs() {
    let stub = StubPanel {
        users: vec![vec![common::user(501, "a@x.com")]],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    h.controller.run(SyncTarget::Users).await.unwrap();

    // Simulate the registration flow completing the account locally
    let mut user = h.mirror.find_user_by_panel_id(501).await.unwrap().unwrap();
    user.password_hash = Some("$argon2id$completed".to_string());
    user.is_migrated = true;
    h.mirror.upsert_user(&user).await.unwrap();

    for _ in 0..3 {
        h.controller.run(SyncTarget::Users).await.unwrap();
    }

    let after = h.mirror.find_user_by_panel_id(501).await.unwrap().unwrap();
    assert_eq!(after.password_hash.as_deref(), Some("$argon2id$completed"));
    assert!(after.is_migrated);
}

// ============================================================================
// Partial-failure isolation
// ============================================================================

#[tokio::test]
async fn test_one_malformed_record_does_not_abort_the_run() {
    let stub = StubPanel {
        users: vec![vec![
            common::user(501, "a@x.com"),
            common::user(502, "not-an-email"),
            common::user(503, "c@x.com"),
        ]],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let run = h.controller.run(SyncTarget::Users).await.unwrap();

    assert_eq!(*run.status(), RunStatus::Completed);
    let counts = &run.metadata().summary.as_ref().unwrap().counts["users"];
    assert_eq!(counts.created, 2);
    assert_eq!(counts.skipped, 1);
    assert_eq!(counts.errors.len(), 1);
    assert_eq!(counts.errors[0].panel_id, 502);

    // The good records made it into the mirror
    assert!(h.mirror.find_user_by_panel_id(501).await.unwrap().is_some());
    assert!(h.mirror.find_user_by_panel_id(502).await.unwrap().is_none());
    assert!(h.mirror.find_user_by_panel_id(503).await.unwrap().is_some());
}

// ============================================================================
// Fatal panel errors
// ============================================================================

#[tokio::test]
async fn test_panel_unavailable_fails_the_run() {
    let stub = StubPanel {
        users: vec![vec![common::user(1, "a@x.com")]],
        fail: Some((
            SyncTarget::Users,
            PanelError::Unavailable {
                entity: SyncTarget::Users,
                reason: "HTTP 503".to_string(),
            },
        )),
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let run = h.controller.run(SyncTarget::Users).await.unwrap();

    assert!(matches!(run.status(), RunStatus::Failed(msg) if msg.contains("HTTP 503")));
    assert!(run.finished_at().is_some());
}

#[tokio::test]
async fn test_panel_rejected_surfaces_status_code() {
    let stub = StubPanel {
        fail: Some((
            SyncTarget::Nodes,
            PanelError::Rejected {
                entity: SyncTarget::Nodes,
                status: 403,
            },
        )),
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let run = h.controller.run(SyncTarget::Nodes).await.unwrap();

    assert!(matches!(run.status(), RunStatus::Failed(msg) if msg.contains("403")));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_converges_after_in_flight_page() {
    let stub = StubPanel {
        users: vec![
            vec![common::user(1, "a@x.com"), common::user(2, "b@x.com")],
            vec![common::user(3, "c@x.com")],
            vec![common::user(4, "d@x.com")],
        ],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let run = h.controller.start(SyncTarget::Users).await.unwrap();
    // Flag the run during the first page fetch; the controller must
    // finish that page, observe the flag, and stop.
    h.panel.cancel_during_fetch(h.log.clone(), *run.id());

    let finished = h.controller.execute(&run).await.unwrap();

    assert_eq!(*finished.status(), RunStatus::Cancelled);
    assert_eq!(h.panel.fetches_for(SyncTarget::Users), vec![1]);

    // Partial counts from the in-flight page are preserved
    let counts = &finished.metadata().summary.as_ref().unwrap().counts["users"];
    assert_eq!(counts.created, 2);
    assert!(h.mirror.find_user_by_panel_id(1).await.unwrap().is_some());
    assert!(h.mirror.find_user_by_panel_id(3).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_during_final_page_still_cancels() {
    // A cancel raced against the last page must never finish as Completed
    let stub = StubPanel {
        users: vec![vec![common::user(1, "a@x.com")]],
        ..Default::default()
    };
    let h = common::harness(stub).await;

    let run = h.controller.start(SyncTarget::Users).await.unwrap();
    h.panel.cancel_during_fetch(h.log.clone(), *run.id());

    let finished = h.controller.execute(&run).await.unwrap();
    assert_eq!(*finished.status(), RunStatus::Cancelled);
}

// ============================================================================
// Single-flight invariant
// ============================================================================

#[tokio::test]
async fn test_concurrent_starts_exactly_one_wins() {
    let h = common::harness(StubPanel::default()).await;

    let (a, b) = tokio::join!(
        h.controller.start(SyncTarget::Users),
        h.controller.start(SyncTarget::All),
    );

    let oks = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(oks, 1, "exactly one concurrent start must win");
    for result in [a, b] {
        if let Err(e) = result {
            assert_eq!(e, SyncLogError::SyncAlreadyInProgress);
        }
    }

    // The loser created no log row
    let page = h.log.list_recent(10, None).await.unwrap();
    assert_eq!(page.runs.len(), 1);
}

#[tokio::test]
async fn test_start_rejected_while_run_in_progress() {
    let h = common::harness(StubPanel::default()).await;

    let run = h.controller.start(SyncTarget::Users).await.unwrap();
    let err = h.controller.start(SyncTarget::Users).await.unwrap_err();
    assert_eq!(err, SyncLogError::SyncAlreadyInProgress);

    // After the run finishes, the slot frees up
    h.controller.execute(&run).await.unwrap();
    assert!(h.controller.start(SyncTarget::Users).await.is_ok());
}

// ============================================================================
// Full sync
// ============================================================================

fn full_stub() -> StubPanel {
    StubPanel {
        locations: vec![vec![common::location(7, "us-east")]],
        nodes: vec![vec![common::node(2, 7)]],
        allocations: [(2, vec![vec![common::allocation(14, 25565)]])]
            .into_iter()
            .collect(),
        nests: vec![vec![common::nest(4, "Minecraft")]],
        eggs: [(4, vec![vec![common::egg(9, "Paper")]])].into_iter().collect(),
        servers: vec![vec![common::server(3, 501, 2, 9, 14)]],
        databases: [(3, vec![vec![common::database(11, "s3_minecraft")]])]
            .into_iter()
            .collect(),
        users: vec![vec![common::user(501, "a@x.com")]],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_sync_runs_phases_in_dependency_order() {
    let h = common::harness(full_stub()).await;

    let run = h.controller.run(SyncTarget::All).await.unwrap();

    assert_eq!(*run.status(), RunStatus::Completed);

    let summary = run.metadata().summary.as_ref().unwrap();
    let phase_order: Vec<_> = summary.phases.iter().map(|p| p.target).collect();
    assert_eq!(phase_order, FULL_SYNC_ORDER.to_vec());
    assert!(summary
        .phases
        .iter()
        .all(|p| p.outcome == PhaseOutcome::Completed));

    // Child listings happen after their parents were mirrored
    let fetches = h.panel.fetches();
    let first = |t: SyncTarget| fetches.iter().position(|(ft, _)| *ft == t).unwrap();
    assert!(first(SyncTarget::Nodes) < first(SyncTarget::Allocations));
    assert!(first(SyncTarget::Servers) < first(SyncTarget::ServerDatabases));

    // Everything landed in the mirror
    let counts = h.mirror.count_entities().await.unwrap();
    assert_eq!(counts.locations, 1);
    assert_eq!(counts.nodes, 1);
    assert_eq!(counts.allocations, 1);
    assert_eq!(counts.nests, 1);
    assert_eq!(counts.eggs, 1);
    assert_eq!(counts.servers, 1);
    assert_eq!(counts.server_databases, 1);
    assert_eq!(counts.users, 1);
}

#[tokio::test]
async fn test_full_sync_phase_failure_does_not_block_later_phases() {
    let mut stub = full_stub();
    stub.fail = Some((
        SyncTarget::Nodes,
        PanelError::Unavailable {
            entity: SyncTarget::Nodes,
            reason: "HTTP 502".to_string(),
        },
    ));
    let h = common::harness(stub).await;

    let run = h.controller.run(SyncTarget::All).await.unwrap();

    // The run as a whole is failed, carrying the first phase failure
    assert!(matches!(run.status(), RunStatus::Failed(msg) if msg.contains("HTTP 502")));

    let summary = run.metadata().summary.as_ref().unwrap();
    let outcome = |t: SyncTarget| {
        summary
            .phases
            .iter()
            .find(|p| p.target == t)
            .map(|p| p.outcome.clone())
            .unwrap()
    };

    assert_eq!(outcome(SyncTarget::Locations), PhaseOutcome::Completed);
    assert!(matches!(outcome(SyncTarget::Nodes), PhaseOutcome::Failed(_)));
    // Independent later phases still ran
    assert_eq!(outcome(SyncTarget::Servers), PhaseOutcome::Completed);
    assert_eq!(outcome(SyncTarget::Users), PhaseOutcome::Completed);

    // User sync was not blocked by the infrastructure failure
    assert!(h.mirror.find_user_by_panel_id(501).await.unwrap().is_some());
    // No nodes were mirrored, so no allocations could be listed
    assert!(h.panel.fetches_for(SyncTarget::Allocations).is_empty());
}

#[tokio::test]
async fn test_full_sync_cancel_skips_remaining_phases() {
    let h = common::harness(full_stub()).await;

    let run = h.controller.start(SyncTarget::All).await.unwrap();
    h.panel.cancel_during_fetch(h.log.clone(), *run.id());

    let finished = h.controller.execute(&run).await.unwrap();

    assert_eq!(*finished.status(), RunStatus::Cancelled);

    let summary = finished.metadata().summary.as_ref().unwrap();
    // The first phase observed the cancel; everything after is Skipped
    assert_eq!(summary.phases[0].outcome, PhaseOutcome::Cancelled);
    assert!(summary.phases[1..]
        .iter()
        .all(|p| p.outcome == PhaseOutcome::Skipped));
    // Only the first phase ever touched the panel
    assert_eq!(h.panel.fetches().len(), 1);
}
