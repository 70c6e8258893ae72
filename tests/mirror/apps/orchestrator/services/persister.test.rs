// [tests/mirror/apps/orchestrator/services/persister.test.rs]
/**
 * =================================================================
 * APARATO: PERSISTER INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-PIPELINE)
 * OBJETIVO: Certificar el volcado por lotes, el salto de valores
 *           desconocidos y la idempotencia del replay.
 * =================================================================
 */

use avala_domain_models::{
    FlagEnqueueRequest, FlagStatus, FlagSubmissionResponse, SubmissionStatus,
};
use avala_infra_db::LedgerClient;
use avala_infra_mq::{BrokerConnection, DurableQueue, PERSISTING_QUEUE};
use avala_orchestrator::handlers::flags::perform_intake;
use avala_orchestrator::prelude::*;
use avala_orchestrator::services::PersisterService;
use std::sync::Arc;

const TEST_CONFIG: &str = r#"
game:
  tick_duration: 60
  flag_format: "FLG[0-9A-Z]+"
  team_ip: ["10.0.0.9"]
  flag_ttl: 5
  game_starts_at: "2026-07-18T10:00:00Z"
  networks_open_after:
    minutes: 5
  game_ends_after:
    hours: 8
server: {}
submitter:
  interval: 10
  max_batch_size: 100
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

async fn publish_verdict(queue: &DurableQueue, value: &str, status: SubmissionStatus, response: &str) {
    let verdict = FlagSubmissionResponse::new(value, status, response);
    queue
        .put(&serde_json::to_string(&verdict).unwrap(), None)
        .await
        .expect("publish collapsed");
}

#[tokio::test]
async fn certify_bulk_persistence_and_stray_skip() {
    let state = forge_state().await;

    let request = FlagEnqueueRequest {
        values: vec!["FLGP00000001".to_string(), "FLGP00000002".to_string()],
        exploit: "e1".to_string(),
        target: "10.0.0.1".to_string(),
    };
    perform_intake(&state, &request, "anon").await.unwrap();

    let persisting_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), PERSISTING_QUEUE).await.unwrap();

    publish_verdict(&persisting_queue, "FLGP00000001", SubmissionStatus::Accepted, "ok").await;
    publish_verdict(&persisting_queue, "FLGP00000002", SubmissionStatus::Rejected, "old").await;
    // Veredicto huérfano: su bandera expiró por TTL y jamás tocó el Ledger.
    publish_verdict(&persisting_queue, "FLGGHOST0001", SubmissionStatus::Accepted, "ok").await;

    PersisterService::new(state.clone()).persist_cycle().await.unwrap();

    let repository = state.flag_repository();

    let first = repository.fetch_by_value("FLGP00000001").await.unwrap().expect("row void");
    assert_eq!(first.status, FlagStatus::Accepted);
    assert_eq!(first.response.as_deref(), Some("ok"));

    let second = repository.fetch_by_value("FLGP00000002").await.unwrap().expect("row void");
    assert_eq!(second.status, FlagStatus::Rejected);

    // El huérfano no crea filas, pero su ack limpia la cola igual.
    assert!(repository.fetch_by_value("FLGGHOST0001").await.unwrap().is_none());
    assert_eq!(persisting_queue.size().await.unwrap(), 0);
    assert!(persisting_queue.get().await.unwrap().is_none());
}

#[tokio::test]
async fn certify_replay_on_settled_row_is_noop() {
    let state = forge_state().await;

    let request = FlagEnqueueRequest {
        values: vec!["FLGREPLAY001".to_string()],
        exploit: "e1".to_string(),
        target: "10.0.0.1".to_string(),
    };
    perform_intake(&state, &request, "anon").await.unwrap();

    let persisting_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), PERSISTING_QUEUE).await.unwrap();

    publish_verdict(&persisting_queue, "FLGREPLAY001", SubmissionStatus::Accepted, "ok").await;
    PersisterService::new(state.clone()).persist_cycle().await.unwrap();

    // Replay con veredicto contradictorio: la fila certificada no muta.
    publish_verdict(&persisting_queue, "FLGREPLAY001", SubmissionStatus::Rejected, "late").await;
    PersisterService::new(state.clone()).persist_cycle().await.unwrap();

    let record = state
        .flag_repository()
        .fetch_by_value("FLGREPLAY001")
        .await
        .unwrap()
        .expect("row void");

    assert_eq!(record.status, FlagStatus::Accepted);
    assert_eq!(record.response.as_deref(), Some("ok"));
    assert_eq!(persisting_queue.size().await.unwrap(), 0);
}
