// [tests/mirror/apps/orchestrator/services/submission_pipeline.test.rs]
/**
 * =================================================================
 * APARATO: SUBMISSION PIPELINE INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-PIPELINE)
 * OBJETIVO: Certificar el conducto completo intake -> submitter ->
 *           persister con un verificador guionizado, incluyendo
 *           requeue y descartes silenciosos del verificador.
 * =================================================================
 */

use async_trait::async_trait;
use avala_domain_models::{
    FlagEnqueueRequest, FlagStatus, FlagSubmissionResponse, RealTimeEvent, SubmissionStatus,
};
use avala_infra_db::LedgerClient;
use avala_infra_mq::{BrokerConnection, DurableQueue, PERSISTING_QUEUE, SUBMISSION_QUEUE};
use avala_orchestrator::adapters::BatchCheckerAdapter;
use avala_orchestrator::handlers::flags::perform_intake;
use avala_orchestrator::prelude::*;
use avala_orchestrator::services::submitter::submit_flags_from_buffer;
use avala_orchestrator::services::PersisterService;
use std::collections::HashMap;
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
  batch_size: 3
attack_data:
  url: "http://127.0.0.1:1/teams.json"
  max_attempts: 3
  retry_interval: 0.0
database:
  path: ":memory:"
broker:
  path: ":memory:"
"#;

/// Verificador guionizado: veredicto fijo por valor; los valores sin
/// guion se omiten de la respuesta (descarte silencioso).
struct ScriptedChecker {
    verdicts: HashMap<String, (SubmissionStatus, &'static str)>,
}

#[async_trait]
impl BatchCheckerAdapter for ScriptedChecker {
    async fn submit_batch(&self, flags: &[String]) -> anyhow::Result<Vec<FlagSubmissionResponse>> {
        Ok(flags
            .iter()
            .filter_map(|flag| {
                self.verdicts
                    .get(flag)
                    .map(|(status, response)| FlagSubmissionResponse::new(flag.clone(), *status, *response))
            })
            .collect())
    }
}

async fn forge_state() -> AppState {
    let config = AvalaConfig::from_yaml(TEST_CONFIG).expect("config drift");
    let ledger = LedgerClient::connect(":memory:").await.expect("ledger void");
    let broker = BrokerConnection::connect(":memory:").await.expect("broker void");
    AppState::new(Arc::new(config), ledger, broker)
}

async fn intake(state: &AppState, values: &[&str]) {
    let request = FlagEnqueueRequest {
        values: values.iter().map(|v| v.to_string()).collect(),
        exploit: "e1".to_string(),
        target: "10.0.0.1".to_string(),
    };
    perform_intake(state, &request, "anon").await.expect("intake collapsed");
}

/// Drena la cola de envío al estilo del submitter programado.
async fn drain_buffer(queue: &DurableQueue) -> (Vec<String>, HashMap<String, i64>) {
    let mut buffer = Vec::new();
    let mut tag_map = HashMap::new();

    while let Some(delivery) = queue.get().await.expect("claim collapsed") {
        let flag = delivery.body.trim().to_string();
        tag_map.insert(flag.clone(), delivery.delivery_tag);
        buffer.push(flag);
    }

    (buffer, tag_map)
}

#[tokio::test]
async fn certify_happy_path_batch_end_to_end() {
    let state = forge_state().await;

    // Dos ráfagas de intake: 2 + 1 banderas.
    intake(&state, &["FLGAAAAAAAA", "FLGBBBBBBBB"]).await;
    intake(&state, &["FLGCCCCCCCC"]).await;

    let submission_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), SUBMISSION_QUEUE).await.unwrap();
    let persisting_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), PERSISTING_QUEUE).await.unwrap();

    let (buffer, tag_map) = drain_buffer(&submission_queue).await;
    assert_eq!(buffer.len(), 3);

    let checker = Arc::new(ScriptedChecker {
        verdicts: HashMap::from([
            ("FLGAAAAAAAA".to_string(), (SubmissionStatus::Accepted, "ok")),
            ("FLGBBBBBBBB".to_string(), (SubmissionStatus::Rejected, "old")),
            ("FLGCCCCCCCC".to_string(), (SubmissionStatus::Accepted, "ok")),
        ]),
    }) as Arc<dyn BatchCheckerAdapter>;

    let mut bus_receiver = state.event_bus.subscribe();

    submit_flags_from_buffer(
        &checker,
        buffer,
        &tag_map,
        &submission_queue,
        &persisting_queue,
        &state.event_bus,
    )
    .await
    .unwrap();

    // Cola de envío vacía; tres veredictos esperando persistencia.
    assert_eq!(submission_queue.size().await.unwrap(), 0);
    assert_eq!(persisting_queue.size().await.unwrap(), 3);

    match bus_receiver.recv().await.expect("delta void") {
        RealTimeEvent::FlagCounters(delta) => {
            assert_eq!(delta.queued, -3);
            assert_eq!(delta.accepted, 2);
            assert_eq!(delta.rejected, 1);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // Ciclo del persister: veredictos -> Ledger, multi-ack de la cola.
    PersisterService::new(state.clone()).persist_cycle().await.unwrap();

    let repository = state.flag_repository();
    assert_eq!(repository.count_with_status(FlagStatus::Accepted).await.unwrap(), 2);
    assert_eq!(repository.count_with_status(FlagStatus::Rejected).await.unwrap(), 1);
    assert_eq!(repository.count_with_status(FlagStatus::Queued).await.unwrap(), 0);

    assert_eq!(persisting_queue.size().await.unwrap(), 0);
    assert!(persisting_queue.get().await.unwrap().is_none());

    let record = repository.fetch_by_value("FLGBBBBBBBB").await.unwrap().expect("row void");
    assert_eq!(record.status, FlagStatus::Rejected);
    assert_eq!(record.response.as_deref(), Some("old"));
}

#[tokio::test]
async fn certify_requeued_flag_returns_to_the_queue() {
    let state = forge_state().await;

    intake(&state, &["FLGRQ0000001"]).await;

    let submission_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), SUBMISSION_QUEUE).await.unwrap();
    let persisting_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), PERSISTING_QUEUE).await.unwrap();

    let (buffer, tag_map) = drain_buffer(&submission_queue).await;

    let checker = Arc::new(ScriptedChecker {
        verdicts: HashMap::from([("FLGRQ0000001".to_string(), (SubmissionStatus::Requeued, "try later"))]),
    }) as Arc<dyn BatchCheckerAdapter>;

    submit_flags_from_buffer(
        &checker,
        buffer,
        &tag_map,
        &submission_queue,
        &persisting_queue,
        &state.event_bus,
    )
    .await
    .unwrap();

    // Sin transición de fila, sin veredicto persistible, re-entrega lista.
    assert_eq!(persisting_queue.size().await.unwrap(), 0);

    let redelivery = submission_queue.get().await.unwrap().expect("redelivery void");
    assert_eq!(redelivery.body, "FLGRQ0000001");

    let record = state
        .flag_repository()
        .fetch_by_value("FLGRQ0000001")
        .await
        .unwrap()
        .expect("row void");
    assert_eq!(record.status, FlagStatus::Queued);
}

#[tokio::test]
async fn certify_silently_dropped_flags_are_requeued() {
    let state = forge_state().await;

    intake(&state, &["FLGDROPPED01", "FLGANSWERED1"]).await;

    let submission_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), SUBMISSION_QUEUE).await.unwrap();
    let persisting_queue =
        DurableQueue::declare(state.broker.open_channel().unwrap(), PERSISTING_QUEUE).await.unwrap();

    let (buffer, tag_map) = drain_buffer(&submission_queue).await;

    // El verificador solo responde por una de las dos banderas.
    let checker = Arc::new(ScriptedChecker {
        verdicts: HashMap::from([("FLGANSWERED1".to_string(), (SubmissionStatus::Accepted, "ok"))]),
    }) as Arc<dyn BatchCheckerAdapter>;

    submit_flags_from_buffer(
        &checker,
        buffer,
        &tag_map,
        &submission_queue,
        &persisting_queue,
        &state.event_bus,
    )
    .await
    .unwrap();

    assert_eq!(persisting_queue.size().await.unwrap(), 1);

    let redelivery = submission_queue.get().await.unwrap().expect("redelivery void");
    assert_eq!(redelivery.body, "FLGDROPPED01");
}
