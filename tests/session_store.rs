// tests/session_store.rs

use std::sync::{Arc, Mutex};

use princess::config::SchedulePolicy;
use princess::engine::{ProposalOutcome, SchedulingSession, SuggestionKind};
use princess::errors::PrincessError;
use princess::store::{MemoryStageStore, StageUpdate};
use princess::types::StageStatus;
use princess_test_utils::builders::{chain, day, StageBuilder};
use princess_test_utils::init_tracing;
use princess_test_utils::recording_store::RecordingStore;
use princess_test_utils::with_timeout;

#[tokio::test]
async fn commit_sends_one_update_per_touched_stage() {
    init_tracing();

    let batches = Arc::new(Mutex::new(Vec::new()));
    let store = RecordingStore::new(chain(&[3, 2, 4]), Arc::clone(&batches));
    let mut session = SchedulingSession::open(store, "p", SchedulePolicy::default())
        .await
        .unwrap();

    let preview = session.propose("s1", day(5), day(8)).unwrap();
    with_timeout(session.commit(&preview.report)).await.unwrap();

    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0],
        vec![
            StageUpdate {
                stage_id: "s1".into(),
                start_date: day(5),
                end_date: day(8),
            },
            StageUpdate {
                stage_id: "s2".into(),
                start_date: day(8),
                end_date: day(10),
            },
            StageUpdate {
                stage_id: "s3".into(),
                start_date: day(10),
                end_date: day(14),
            },
        ]
    );
    assert_eq!(session.stage("s3").unwrap().start_date, day(10));
}

#[tokio::test]
async fn failed_store_write_keeps_previous_graph() {
    init_tracing();

    let batches = Arc::new(Mutex::new(Vec::new()));
    let store = RecordingStore::new(chain(&[3, 2]), Arc::clone(&batches)).failing();
    let mut session = SchedulingSession::open(store, "p", SchedulePolicy::default())
        .await
        .unwrap();

    let preview = session.propose("s1", day(1), day(4)).unwrap();
    assert!(session.commit(&preview.report).await.is_err());

    assert_eq!(session.stage("s1").unwrap().start_date, day(0));
    assert_eq!(session.stage("s2").unwrap().start_date, day(3));
    assert!(batches.lock().unwrap().is_empty());

    // Nothing was adopted.
    assert_eq!(session.graph().to_stages(), chain(&[3, 2]));
}

#[tokio::test]
async fn memory_store_sessions_see_committed_dates() {
    init_tracing();

    let store = MemoryStageStore::new().with_project("alpha", chain(&[3, 2]));
    let mut session = SchedulingSession::open(store.clone(), "alpha", SchedulePolicy::default())
        .await
        .unwrap();

    let preview = session.propose("s2", day(4), day(6)).unwrap();
    assert_eq!(preview.report.outcome, ProposalOutcome::Clean);
    session.commit(&preview.report).await.unwrap();

    let stored = store.stages("alpha").unwrap();
    let s2 = stored.iter().find(|s| s.id == "s2").unwrap();
    assert_eq!(s2.start_date, day(4));

    let other = SchedulingSession::open(store, "alpha", SchedulePolicy::default())
        .await
        .unwrap();
    assert_eq!(other.stage("s2").unwrap().end_date, day(6));
}

#[tokio::test]
async fn projects_do_not_share_graphs() {
    let store = MemoryStageStore::new()
        .with_project("alpha", chain(&[3, 2]))
        .with_project("beta", chain(&[3, 2]));

    let mut alpha = SchedulingSession::open(store.clone(), "alpha", SchedulePolicy::default())
        .await
        .unwrap();
    let beta = SchedulingSession::open(store.clone(), "beta", SchedulePolicy::default())
        .await
        .unwrap();

    let preview = alpha.propose("s1", day(2), day(5)).unwrap();
    alpha.commit(&preview.report).await.unwrap();

    assert_eq!(beta.stage("s1").unwrap().start_date, day(0));
    assert_eq!(store.stages("beta").unwrap()[0].start_date, day(0));
}

#[tokio::test]
async fn unknown_project_fails_to_open() {
    let err = SchedulingSession::open(MemoryStageStore::new(), "nope", SchedulePolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PrincessError::ConfigError(_)));
}

#[tokio::test]
async fn completion_during_review_makes_commit_stale() {
    init_tracing();

    let store = MemoryStageStore::new().with_project("p", chain(&[3, 2, 4]));
    let mut session = SchedulingSession::open(store, "p", SchedulePolicy::default())
        .await
        .unwrap();

    let preview = session.propose("s1", day(2), day(5)).unwrap();
    session.set_status("s2", StageStatus::Completed).unwrap();

    let err = session.commit(&preview.report).await.unwrap_err();
    assert!(matches!(err, PrincessError::StaleGraph(_)));

    // Re-proposing against the new state is rejected outright.
    let again = session.propose("s1", day(2), day(5)).unwrap();
    assert_eq!(again.report.outcome, ProposalOutcome::Rejected);
}

#[tokio::test]
async fn accepting_a_suggestion_resolves_the_violation() {
    init_tracing();

    let store = MemoryStageStore::new().with_project(
        "p",
        vec![
            StageBuilder::new("research", 1).days(0, 5).build(),
            StageBuilder::new("strategy", 2).days(5, 3).after("research").build(),
        ],
    );
    let mut session = SchedulingSession::open(store, "p", SchedulePolicy::default())
        .await
        .unwrap();

    // Starts 2 days before research ends.
    let preview = session.propose("strategy", day(3), day(6)).unwrap();
    assert_eq!(preview.report.outcome, ProposalOutcome::Rejected);
    let suggestion = preview.suggestion.clone().unwrap();
    assert_eq!(suggestion.kind, SuggestionKind::RespectDependencies);
    assert_eq!(suggestion.days, 2);

    let fixed = session.propose_suggestion(&preview).unwrap().unwrap();
    assert_eq!(fixed.report.proposed_window.start, day(5));
    assert!(fixed.report.is_applicable());
    session.commit(&fixed.report).await.unwrap();
}

#[tokio::test]
async fn refresh_picks_up_other_writers_and_rejects_old_reports() {
    init_tracing();

    let store = MemoryStageStore::new().with_project(
        "p",
        vec![
            StageBuilder::new("a", 1).days(0, 2).build(),
            StageBuilder::new("b", 2).days(2, 2).after("a").build(),
        ],
    );
    let mut session = SchedulingSession::open(store.clone(), "p", SchedulePolicy::default())
        .await
        .unwrap();

    let preview = session.propose("a", day(1), day(3)).unwrap();
    assert_eq!(preview.report.affected.len(), 1);

    // Someone else pushes b far out, then the session reloads.
    let _ = store.clone().with_project(
        "p",
        vec![
            StageBuilder::new("a", 1).days(0, 2).build(),
            StageBuilder::new("b", 2).days(20, 10).after("a").build(),
        ],
    );
    session.refresh().await.unwrap();

    let err = session.commit(&preview.report).await.unwrap_err();
    assert!(matches!(err, PrincessError::StaleGraph(_)));

    let stored = store.stages("p").unwrap();
    let b = stored.iter().find(|s| s.id == "b").unwrap();
    assert_eq!(b.window(), StageBuilder::new("b", 2).days(20, 10).build().window());
}

