// [tests/mirror/libs/infra/db/flag_repository.test.rs]
/**
 * =================================================================
 * APARATO: FLAG REPOSITORY INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-DB)
 * OBJETIVO: Certificar deduplicación de intake e inmutabilidad de
 *           las transiciones de estado del Ledger.
 * =================================================================
 */

use avala_domain_models::{FlagStatus, FlagSubmissionResponse, SubmissionStatus};
use avala_infra_db::{FlagRepository, LedgerClient};
use chrono::Utc;

async fn forge_repository() -> FlagRepository {
    let client = LedgerClient::connect(":memory:").await.expect("ledger ignition collapsed");
    FlagRepository::new(client)
}

fn values(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn certify_intake_deduplication() {
    let repository = forge_repository().await;

    // Ráfaga con duplicado interno: X, X, Y.
    let (enqueued, discarded) = repository
        .intake_batch(&values(&["X", "X", "Y"]), "e1", "T", 3, "anon", Utc::now())
        .await
        .unwrap();

    assert_eq!(enqueued, values(&["X", "Y"]));
    assert_eq!(discarded, 1);

    // Re-entrega completa: todo es duplicado.
    let (enqueued, discarded) = repository
        .intake_batch(&values(&["X", "X", "Y"]), "e1", "T", 4, "anon", Utc::now())
        .await
        .unwrap();

    assert!(enqueued.is_empty());
    assert_eq!(discarded, 3);

    // La fila conserva los atributos de su primera intake.
    let record = repository.fetch_by_value("X").await.unwrap().expect("row void");
    assert_eq!(record.tick, 3);
    assert_eq!(record.status, FlagStatus::Queued);
    assert_eq!(record.player, "anon");
    assert!(record.response.is_none());
}

#[tokio::test]
async fn certify_status_transitions_exactly_once() {
    let repository = forge_repository().await;

    repository
        .intake_batch(&values(&["FLG{AAAAAAAA}"]), "e1", "10.0.0.1", 1, "anon", Utc::now())
        .await
        .unwrap();

    let accept = FlagSubmissionResponse::new("FLG{AAAAAAAA}", SubmissionStatus::Accepted, "ok");
    assert_eq!(repository.apply_responses(&[accept]).await.unwrap(), 1);

    // Una fila certificada es inmutable: re-aplicar es un no-op.
    let late_reject = FlagSubmissionResponse::new("FLG{AAAAAAAA}", SubmissionStatus::Rejected, "old");
    assert_eq!(repository.apply_responses(&[late_reject]).await.unwrap(), 0);

    let record = repository.fetch_by_value("FLG{AAAAAAAA}").await.unwrap().expect("row void");
    assert_eq!(record.status, FlagStatus::Accepted);
    assert_eq!(record.response.as_deref(), Some("ok"));
}

#[tokio::test]
async fn certify_requeued_and_unknown_responses_are_skipped() {
    let repository = forge_repository().await;

    repository
        .intake_batch(&values(&["F"]), "e1", "T", 1, "anon", Utc::now())
        .await
        .unwrap();

    let responses = [
        // 'requeued' no tiene proyección terminal.
        FlagSubmissionResponse::new("F", SubmissionStatus::Requeued, "try later"),
        // Valor jamás intakeado (bandera expirada por TTL).
        FlagSubmissionResponse::new("GHOST", SubmissionStatus::Accepted, "ok"),
    ];

    assert_eq!(repository.apply_responses(&responses).await.unwrap(), 0);

    let record = repository.fetch_by_value("F").await.unwrap().expect("row void");
    assert_eq!(record.status, FlagStatus::Queued);
}

#[tokio::test]
async fn certify_dashboard_aggregates() {
    let repository = forge_repository().await;

    repository
        .intake_batch(&values(&["A1", "A2"]), "e1", "T", 1, "anon", Utc::now())
        .await
        .unwrap();
    repository
        .intake_batch(&values(&["B1"]), "e2", "T", 2, "anon", Utc::now())
        .await
        .unwrap();

    repository
        .apply_responses(&[
            FlagSubmissionResponse::new("A1", SubmissionStatus::Accepted, "ok"),
            FlagSubmissionResponse::new("B1", SubmissionStatus::Accepted, "ok"),
            FlagSubmissionResponse::new("A2", SubmissionStatus::Rejected, "old"),
        ])
        .await
        .unwrap();

    assert_eq!(repository.count_total().await.unwrap(), 3);
    assert_eq!(repository.count_with_status(FlagStatus::Accepted).await.unwrap(), 2);
    assert_eq!(repository.count_with_status(FlagStatus::Rejected).await.unwrap(), 1);
    assert_eq!(repository.count_with_status(FlagStatus::Queued).await.unwrap(), 0);
    assert_eq!(repository.count_for_tick(1).await.unwrap(), 2);

    assert_eq!(repository.accepted_history().await.unwrap(), vec![(1, 1), (2, 1)]);
}
