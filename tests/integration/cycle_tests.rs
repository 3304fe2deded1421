//! Full cycles through `BridgeService` against mock ports.
//!
//! Covers the four end states (Success, NoAction, TimedOut, Aborted), the
//! one-publish-per-cycle rule and release of every cycle-scoped resource.

use std::sync::Arc;
use std::time::Instant;

use crate::mock_ports::{AutoReplyBroker, FixedConfig, MockStore, RecordingSink, Reply, test_config};

use uaaction::app::events::{BridgeEvent, CycleOutcome};
use uaaction::app::ports::{ConfigError, QueryError};
use uaaction::app::service::BridgeService;
use uaaction::fsm::CyclePhase;
use uaaction::status::StatusBoard;
use uaaction::telemetry::{RawCell, RawRow};

fn service() -> (BridgeService, Arc<StatusBoard>) {
    let status = Arc::new(StatusBoard::new());
    let mut svc = BridgeService::new(Arc::clone(&status));
    svc.start();
    (svc, status)
}

fn all_reachable(status: &StatusBoard) {
    status.mark_query_store_reachable();
    status.mark_broker_reachable();
    status.mark_commander_reachable();
}

// ── Success ───────────────────────────────────────────────────

#[test]
fn high_pressure_with_matching_ack_succeeds() {
    let (mut svc, status) = service();
    let cfg = test_config();
    let mut store = MockStore::high_pressure();
    let mut broker = AutoReplyBroker::new(Reply::success());
    let mut sink = RecordingSink::new();

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut sink);

    assert_eq!(outcome, CycleOutcome::Success { status: "Good".into() });
    let snap = status.snapshot();
    assert!(snap.running);
    assert!(snap.query_store_reachable);
    assert!(snap.broker_reachable);
    assert!(snap.commander_reachable);

    let sent = broker.sent_ids(&cfg.broker.topic);
    assert_eq!(sent.len(), 1);
    assert_eq!(svc.last_correlation_id(), Some(sent[0]));
    assert_eq!(svc.phase(), CyclePhase::Idle);
}

#[test]
fn success_releases_every_handle() {
    let (mut svc, _status) = service();
    let cfg = test_config();
    let mut store = MockStore::high_pressure();
    let mut broker = AutoReplyBroker::new(Reply::success());

    svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());

    assert_eq!(store.live_clients(), 0);
    assert_eq!(broker.inner.open_handles(), 0);
    assert!(broker.inner.groups(&cfg.broker.response_topic).is_empty());
}

#[test]
fn failed_method_is_a_failure_outcome() {
    let (mut svc, status) = service();
    let mut broker = AutoReplyBroker::new(Reply::Answer {
        success: false,
        status: "BadNodeIdUnknown".into(),
    });

    let outcome = svc.run_cycle(
        &FixedConfig::valid(),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );

    assert_eq!(
        outcome,
        CycleOutcome::Failure {
            status: "BadNodeIdUnknown".into()
        }
    );
    assert!(status.snapshot().commander_reachable);
}

#[test]
fn noise_on_response_topic_is_skipped() {
    let (mut svc, _status) = service();
    let mut broker = AutoReplyBroker::new(Reply::NoiseThenAnswer {
        success: true,
        status: "Good".into(),
    });
    let mut sink = RecordingSink::new();

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut MockStore::high_pressure(), &mut broker, &mut sink);

    assert_eq!(outcome, CycleOutcome::Success { status: "Good".into() });
    assert_eq!(
        sink.count(|e| matches!(e, BridgeEvent::ResponseDiscarded { .. })),
        2
    );
}

#[test]
fn event_sequence_for_dispatching_cycle() {
    let (mut svc, _status) = service();
    let mut sink = RecordingSink::new();

    svc.run_cycle(
        &FixedConfig::valid(),
        &mut MockStore::high_pressure(),
        &mut AutoReplyBroker::new(Reply::success()),
        &mut sink,
    );

    let phases: Vec<CyclePhase> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            BridgeEvent::PhaseChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        [
            CyclePhase::Querying,
            CyclePhase::Dispatching,
            CyclePhase::Correlating,
            CyclePhase::Idle
        ]
    );
    assert!(matches!(sink.events.first(), Some(BridgeEvent::CycleStarted { cycle: 1 })));
    assert!(matches!(sink.events.last(), Some(BridgeEvent::CycleFinished { cycle: 1, .. })));
    assert_eq!(sink.count(|e| matches!(e, BridgeEvent::CommandSent { .. })), 1);
}

// ── NoAction ──────────────────────────────────────────────────

#[test]
fn empty_result_takes_no_action() {
    let (mut svc, status) = service();
    all_reachable(&status);
    let cfg = test_config();
    let mut store = MockStore::empty();
    let mut broker = AutoReplyBroker::new(Reply::success());

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());

    assert_eq!(outcome, CycleOutcome::NoAction);
    let snap = status.snapshot();
    assert!(snap.query_store_reachable);
    assert!(snap.broker_reachable);
    assert!(snap.commander_reachable);
    assert_eq!(broker.inner.published(&cfg.broker.topic), 0);
    assert!(broker.inner.groups(&cfg.broker.response_topic).is_empty());
    assert_eq!(store.query_count(), 1);
    assert_eq!(store.live_clients(), 0);
}

#[test]
fn query_error_is_treated_as_no_condition() {
    let (mut svc, status) = service();
    let mut store = MockStore::failing_query(QueryError::Rejected {
        status: 400,
        body: "Syntax error".into(),
    });
    let mut broker = AutoReplyBroker::new(Reply::success());

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());

    assert_eq!(outcome, CycleOutcome::NoAction);
    assert!(status.snapshot().query_store_reachable);
    assert_eq!(broker.inner.published(&test_config().broker.topic), 0);
}

#[test]
fn single_field_row_takes_no_action() {
    let (mut svc, _status) = service();
    let mut store = MockStore::with_rows(vec![
        RawRow::new()
            .with("Timestamp", RawCell::Null)
            .with_value("NodeValue", 4200),
    ]);
    let mut broker = AutoReplyBroker::new(Reply::success());

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());

    assert_eq!(outcome, CycleOutcome::NoAction);
    assert_eq!(broker.inner.open_handles(), 0);
}

// ── TimedOut ──────────────────────────────────────────────────

#[test]
fn silent_commander_times_out() {
    let (mut svc, status) = service();
    let cfg = test_config();
    let mut broker = AutoReplyBroker::new(Reply::Silent);

    let start = Instant::now();
    let outcome = svc.run_cycle(
        &FixedConfig::valid(),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );
    let elapsed = start.elapsed();

    assert_eq!(outcome, CycleOutcome::TimedOut);
    assert!(elapsed >= cfg.timing.response_timeout());
    assert!(elapsed < cfg.timing.cycle_budget());
    let snap = status.snapshot();
    assert!(snap.broker_reachable);
    assert!(!snap.commander_reachable);
    assert_eq!(broker.inner.open_handles(), 0);
}

// ── Aborted ───────────────────────────────────────────────────

#[test]
fn auth_failure_aborts_and_degrades() {
    let (mut svc, status) = service();
    all_reachable(&status);
    let cfg = test_config();
    let mut store = MockStore::failing_open(QueryError::Auth("invalid_client".into()));
    let mut broker = AutoReplyBroker::new(Reply::success());

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());

    assert!(outcome.is_aborted());
    let snap = status.snapshot();
    assert!(snap.running);
    assert!(!snap.query_store_reachable);
    assert!(!snap.broker_reachable);
    assert!(!snap.commander_reachable);
    assert_eq!(broker.inner.published(&cfg.broker.topic), 0);
    assert_eq!(store.query_count(), 0);
}

#[test]
fn missing_setting_aborts_before_opening_anything() {
    let (mut svc, status) = service();
    all_reachable(&status);
    let mut store = MockStore::high_pressure();
    let mut broker = AutoReplyBroker::new(Reply::success());

    let outcome = svc.run_cycle(
        &FixedConfig(Err(ConfigError::Missing("APPLICATION_KEY"))),
        &mut store,
        &mut broker,
        &mut RecordingSink::new(),
    );

    match outcome {
        CycleOutcome::Aborted { reason } => assert!(reason.contains("APPLICATION_KEY")),
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(store.opens, 0);
    assert!(!status.snapshot().broker_reachable);
}

#[test]
fn invalid_config_aborts() {
    let (mut svc, _status) = service();
    let mut cfg = test_config();
    cfg.broker.response_topic = cfg.broker.topic.clone();

    let outcome = svc.run_cycle(
        &FixedConfig(Ok(cfg)),
        &mut MockStore::high_pressure(),
        &mut AutoReplyBroker::new(Reply::success()),
        &mut RecordingSink::new(),
    );

    assert!(outcome.is_aborted());
}

#[test]
fn unacknowledged_publish_aborts_and_releases() {
    let (mut svc, status) = service();
    let cfg = test_config();
    let mut store = MockStore::high_pressure();
    let mut broker = AutoReplyBroker::new(Reply::success());
    broker.inner.set_acknowledging(false);

    let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());

    match outcome {
        CycleOutcome::Aborted { reason } => assert!(reason.starts_with("dispatch failed")),
        other => panic!("expected abort, got {:?}", other),
    }
    assert!(!status.snapshot().query_store_reachable);
    assert_eq!(broker.inner.published(&cfg.broker.topic), 0);
    assert_eq!(broker.inner.open_handles(), 0);
    assert_eq!(store.live_clients(), 0);
}

#[test]
fn unreachable_broker_aborts() {
    let (mut svc, status) = service();
    let mut broker = AutoReplyBroker::new(Reply::success());
    broker.inner.set_reachable(false);

    let outcome = svc.run_cycle(
        &FixedConfig::valid(),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );

    assert!(outcome.is_aborted());
    assert!(!status.snapshot().broker_reachable);
    assert_eq!(svc.phase(), CyclePhase::Idle);
}

// ── Across cycles ─────────────────────────────────────────────

#[test]
fn every_dispatch_uses_a_fresh_correlation_id() {
    let (mut svc, status) = service();
    let cfg = test_config();
    let mut store = MockStore::high_pressure();
    let mut broker = AutoReplyBroker::new(Reply::success());

    for _ in 0..3 {
        let outcome = svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());
        assert!(matches!(outcome, CycleOutcome::Success { .. }));
    }

    let mut ids = broker.sent_ids(&cfg.broker.topic);
    assert_eq!(ids.len(), 3);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(broker.inner.groups(&cfg.broker.response_topic).is_empty());
    assert_eq!(status.stats().succeeded, 3);
}

#[test]
fn abort_is_followed_by_a_normal_cycle() {
    let (mut svc, status) = service();
    let mut broker = AutoReplyBroker::new(Reply::success());

    let first = svc.run_cycle(
        &FixedConfig(Err(ConfigError::Missing("TOPIC"))),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );
    let second = svc.run_cycle(
        &FixedConfig::valid(),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );

    assert!(first.is_aborted());
    assert!(matches!(second, CycleOutcome::Success { .. }));
    assert!(status.snapshot().commander_reachable);
    let stats = status.stats();
    assert_eq!((stats.total, stats.aborted, stats.succeeded), (2, 1, 1));
    assert_eq!(stats.last_outcome, Some("success"));
}

#[test]
fn earlier_responses_do_not_mark_a_silent_commander_reachable() {
    let (mut svc, status) = service();
    let mut broker = AutoReplyBroker::new(Reply::success());

    let first = svc.run_cycle(
        &FixedConfig::valid(),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );
    assert!(matches!(first, CycleOutcome::Success { .. }));

    let second = svc.run_cycle(
        &FixedConfig(Err(ConfigError::Missing("TOPIC"))),
        &mut MockStore::high_pressure(),
        &mut broker,
        &mut RecordingSink::new(),
    );
    assert!(second.is_aborted());
    assert!(!status.snapshot().commander_reachable);

    let mut silent = broker.with_reply(Reply::Silent);
    let mut sink = RecordingSink::new();
    let third = svc.run_cycle(&FixedConfig::valid(), &mut MockStore::high_pressure(), &mut silent, &mut sink);

    assert_eq!(third, CycleOutcome::TimedOut);
    assert!(!status.snapshot().commander_reachable);
    assert_eq!(sink.count(|e| matches!(e, BridgeEvent::ResponseDiscarded { .. })), 0);
    assert!(broker.inner.groups(&test_config().broker.response_topic).is_empty());
}

#[test]
fn long_runs_leave_no_consumer_groups_behind() {
    let (mut svc, _status) = service();
    let cfg = test_config();
    let mut store = MockStore::high_pressure();
    let mut broker = AutoReplyBroker::new(Reply::success());

    for _ in 0..50 {
        svc.run_cycle(&FixedConfig::valid(), &mut store, &mut broker, &mut RecordingSink::new());
    }

    assert_eq!(broker.inner.open_handles(), 0);
    assert!(broker.inner.groups(&cfg.broker.response_topic).is_empty());
    assert_eq!(broker.inner.published(&cfg.broker.response_topic), 50);
}
