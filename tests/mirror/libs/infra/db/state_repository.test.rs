// [tests/mirror/libs/infra/db/state_repository.test.rs]
/**
 * =================================================================
 * APARATO: STATE REPOSITORY INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-DB)
 * OBJETIVO: Certificar el upsert clave-valor y el swap atómico del
 *           par (attack_data, attack_data_hash).
 * =================================================================
 */

use avala_infra_db::repositories::state::{ATTACK_DATA_HASH_KEY, ATTACK_DATA_KEY};
use avala_infra_db::{LedgerClient, StateRepository};

async fn forge_repository() -> StateRepository {
    let client = LedgerClient::connect(":memory:").await.expect("ledger ignition collapsed");
    StateRepository::new(client)
}

#[tokio::test]
async fn certify_upsert_overwrites_value() {
    let repository = forge_repository().await;

    assert!(repository.get("missing_key").await.unwrap().is_none());

    repository.put("probe", "first").await.unwrap();
    assert_eq!(repository.get("probe").await.unwrap().as_deref(), Some("first"));

    repository.put("probe", "second").await.unwrap();
    assert_eq!(repository.get("probe").await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn certify_attack_data_swap_is_paired() {
    let repository = forge_repository().await;

    repository
        .swap_attack_data("d41d8cd98f00b204", r#"{"Auth":{}}"#)
        .await
        .unwrap();

    // Huella y payload siempre viajan juntos.
    assert_eq!(
        repository.get(ATTACK_DATA_HASH_KEY).await.unwrap().as_deref(),
        Some("d41d8cd98f00b204")
    );
    assert_eq!(
        repository.get(ATTACK_DATA_KEY).await.unwrap().as_deref(),
        Some(r#"{"Auth":{}}"#)
    );

    repository
        .swap_attack_data("900150983cd24fb0", r#"{"Bank":{}}"#)
        .await
        .unwrap();

    assert_eq!(
        repository.get(ATTACK_DATA_HASH_KEY).await.unwrap().as_deref(),
        Some("900150983cd24fb0")
    );
    assert_eq!(
        repository.get(ATTACK_DATA_KEY).await.unwrap().as_deref(),
        Some(r#"{"Bank":{}}"#)
    );
}
