// [tests/mirror/apps/orchestrator/services/attack_data_refresher.test.rs]
/**
 * =================================================================
 * APARATO: ATTACK DATA REFRESHER INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-PIPELINE)
 * OBJETIVO: Certificar el swap por contenido, el sondeo acotado ante
 *           payloads repetidos y la resiliencia ante procesadores rotos.
 * =================================================================
 */

use async_trait::async_trait;
use avala_infra_db::repositories::state::{ATTACK_DATA_HASH_KEY, ATTACK_DATA_KEY};
use avala_infra_db::LedgerClient;
use avala_infra_mq::BrokerConnection;
use avala_orchestrator::adapters::AttackDataProvider;
use avala_orchestrator::prelude::*;
use avala_orchestrator::services::AttackDataRefresherService;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

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
  streams: 2
attack_data:
  max_attempts: 3
  retry_interval: 0.0
database:
  path: ":memory:"
broker:
  path: ":memory:"
"#;

/// Proveedor guionizado con conteo de adquisiciones.
struct ScriptedProvider {
    payload: Mutex<Value>,
    fetch_count: AtomicUsize,
    fail_process: AtomicBool,
}

impl ScriptedProvider {
    fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(payload),
            fetch_count: AtomicUsize::new(0),
            fail_process: AtomicBool::new(false),
        })
    }

    fn swap_payload(&self, payload: Value) {
        *self.payload.lock().unwrap() = payload;
    }
}

#[async_trait]
impl AttackDataProvider for ScriptedProvider {
    async fn fetch(&self) -> anyhow::Result<Value> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.lock().unwrap().clone())
    }

    async fn process(&self, raw: Value) -> anyhow::Result<Value> {
        if self.fail_process.load(Ordering::SeqCst) {
            anyhow::bail!("processor sabotage");
        }
        Ok(raw)
    }
}

async fn forge_state() -> AppState {
    let config = AvalaConfig::from_yaml(TEST_CONFIG).expect("config drift");
    let ledger = LedgerClient::connect(":memory:").await.expect("ledger void");
    let broker = BrokerConnection::connect(":memory:").await.expect("broker void");
    AppState::new(Arc::new(config), ledger, broker)
}

#[tokio::test]
async fn certify_fresh_payload_is_sealed_with_its_hash() {
    let state = forge_state().await;
    let provider = ScriptedProvider::new(json!({"Auth": {"10.0.0.1": [["id-1"]]}}));

    let refresher = AttackDataRefresherService::new(state.clone(), provider.clone());
    refresher.reload_attack_data().await.unwrap();

    let state_repository = state.state_repository();

    let sealed_hash = state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap().expect("hash void");
    let sealed_payload = state_repository.get(ATTACK_DATA_KEY).await.unwrap().expect("payload void");

    // El payload visible es exactamente el que corresponde a la huella.
    let parsed: Value = serde_json::from_str(&sealed_payload).unwrap();
    assert_eq!(
        avala_domain_models::attack_data::content_hash(&parsed),
        sealed_hash
    );
    assert_eq!(provider.fetch_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn certify_repeated_payload_probes_then_reuses_old() {
    let state = forge_state().await;
    let provider = ScriptedProvider::new(json!({"Auth": {"10.0.0.1": [["id-1"]]}}));

    let refresher = AttackDataRefresherService::new(state.clone(), provider.clone());

    refresher.reload_attack_data().await.unwrap();
    let fetches_after_first = provider.fetch_count.load(Ordering::SeqCst);

    let state_repository = state.state_repository();
    let original_hash = state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap();

    // Mismo payload upstream: sondeo acotado (max_attempts + 1 adquisiciones).
    refresher.reload_attack_data().await.unwrap();

    assert_eq!(provider.fetch_count.load(Ordering::SeqCst) - fetches_after_first, 4);
    assert_eq!(state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap(), original_hash);
}

#[tokio::test]
async fn certify_changed_payload_swaps_the_pair() {
    let state = forge_state().await;
    let provider = ScriptedProvider::new(json!({"Auth": {"10.0.0.1": [["id-1"]]}}));

    let refresher = AttackDataRefresherService::new(state.clone(), provider.clone());
    refresher.reload_attack_data().await.unwrap();

    let state_repository = state.state_repository();
    let first_hash = state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap();

    provider.swap_payload(json!({"Auth": {"10.0.0.1": [["id-2"], ["id-1"]]}}));
    refresher.reload_attack_data().await.unwrap();

    let second_hash = state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap();
    assert_ne!(first_hash, second_hash);

    let payload = state_repository.get(ATTACK_DATA_KEY).await.unwrap().expect("payload void");
    assert!(payload.contains("id-2"));
}

#[tokio::test]
async fn certify_broken_processor_keeps_previous_payload() {
    let state = forge_state().await;
    let provider = ScriptedProvider::new(json!({"Auth": {"10.0.0.1": [["id-1"]]}}));

    let refresher = AttackDataRefresherService::new(state.clone(), provider.clone());
    refresher.reload_attack_data().await.unwrap();

    let state_repository = state.state_repository();
    let original_hash = state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap();
    let original_payload = state_repository.get(ATTACK_DATA_KEY).await.unwrap();

    // Upstream nuevo pero procesador saboteado: el par anterior queda visible.
    provider.swap_payload(json!({"Auth": {"10.0.0.1": [["id-99"]]}}));
    provider.fail_process.store(true, Ordering::SeqCst);

    refresher.reload_attack_data().await.unwrap();

    assert_eq!(state_repository.get(ATTACK_DATA_HASH_KEY).await.unwrap(), original_hash);
    assert_eq!(state_repository.get(ATTACK_DATA_KEY).await.unwrap(), original_payload);
}

#[tokio::test]
async fn certify_signal_wakes_long_poll_subscribers() {
    let state = forge_state().await;

    let mut signal_receiver = state.subscribe_attack_data_signal();
    state.announce_attack_data_decision();

    signal_receiver.changed().await.expect("signal channel collapsed");
}
