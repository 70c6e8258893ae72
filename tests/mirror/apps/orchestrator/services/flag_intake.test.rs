// [tests/mirror/apps/orchestrator/services/flag_intake.test.rs]
/**
 * =================================================================
 * APARATO: FLAG INTAKE INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-PIPELINE)
 * OBJETIVO: Certificar deduplicación, publicación con TTL y deltas.
 * =================================================================
 */

use avala_domain_models::{FlagEnqueueRequest, RealTimeEvent};
use avala_infra_db::LedgerClient;
use avala_infra_mq::{BrokerConnection, DurableQueue, SUBMISSION_QUEUE};
use avala_orchestrator::handlers::flags::perform_intake;
use avala_orchestrator::prelude::*;
use std::sync::Arc;

const TEST_CONFIG: &str = r#"
game:
  tick_duration: 60
  flag_format: "FLG[0-9A-Z]+"
  team_ip: ["10.0.0.9"]
  nop_team_ip: ["10.0.0.10"]
  flag_ttl: 5
  game_starts_at: "2026-07-18T10:00:00Z"
  networks_open_after:
    minutes: 5
  game_ends_after:
    hours: 8
server:
  password: "hunter2"
submitter:
  per_tick: 3
  max_batch_size: 50
attack_data:
  url: "http://127.0.0.1:1/teams.json"
  max_attempts: 3
  retry_interval: 0.0
database:
  path: ":memory:"
broker:
  path: ":memory:"
"#;

async fn forge_state() -> AppState {
    let config = AvalaConfig::from_yaml(TEST_CONFIG).expect("config drift");
    let ledger = LedgerClient::connect(":memory:").await.expect("ledger void");
    let broker = BrokerConnection::connect(":memory:").await.expect("broker void");
    AppState::new(Arc::new(config), ledger, broker)
}

fn request(values: &[&str]) -> FlagEnqueueRequest {
    FlagEnqueueRequest {
        values: values.iter().map(|v| v.to_string()).collect(),
        exploit: "e1".to_string(),
        target: "10.0.0.1".to_string(),
    }
}

#[tokio::test]
async fn certify_duplicate_suppression_across_calls() {
    let state = forge_state().await;

    let first = perform_intake(&state, &request(&["X", "X", "Y"]), "anon").await.unwrap();
    assert_eq!(first.enqueued, 2);
    assert_eq!(first.discarded, 1);

    let second = perform_intake(&state, &request(&["X", "X", "Y"]), "anon").await.unwrap();
    assert_eq!(second.enqueued, 0);
    assert_eq!(second.discarded, 3);
}

#[tokio::test]
async fn certify_new_flags_reach_the_submission_queue() {
    let state = forge_state().await;

    perform_intake(&state, &request(&["FLG1AAAAAAAA", "FLG1BBBBBBBB"]), "anon")
        .await
        .unwrap();

    let queue = DurableQueue::declare(state.broker.open_channel().unwrap(), SUBMISSION_QUEUE)
        .await
        .unwrap();

    // Solo las banderas nuevas se publican; la re-entrega no duplica.
    assert_eq!(queue.size().await.unwrap(), 2);

    perform_intake(&state, &request(&["FLG1AAAAAAAA"]), "anon").await.unwrap();
    assert_eq!(queue.size().await.unwrap(), 2);
}

#[tokio::test]
async fn certify_counter_deltas_are_emitted() {
    let state = forge_state().await;
    let mut bus_receiver = state.event_bus.subscribe();

    perform_intake(&state, &request(&["X", "X", "Y"]), "player7").await.unwrap();

    let counters_event = bus_receiver.recv().await.expect("counters event void");
    match counters_event {
        RealTimeEvent::FlagCounters(delta) => {
            assert_eq!(delta.queued, 2);
            assert_eq!(delta.discarded, 1);
            assert_eq!(delta.accepted, 0);
            assert_eq!(delta.rejected, 0);
        }
        other => panic!("unexpected first event: {:?}", other),
    }

    let incoming_event = bus_receiver.recv().await.expect("incoming event void");
    match incoming_event {
        RealTimeEvent::IncomingFlags(event) => {
            assert_eq!(event.player, "player7");
            assert_eq!(event.enqueued, 2);
            assert_eq!(event.duplicates, 1);
        }
        other => panic!("unexpected second event: {:?}", other),
    }
}
