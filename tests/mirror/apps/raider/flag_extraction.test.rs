// [tests/mirror/apps/raider/flag_extraction.test.rs]
/**
 * =================================================================
 * APARATO: EXECUTOR HARVEST INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-WORKER)
 * OBJETIVO: Certificar la cosecha regex, la caída al outbox con el
 *           servidor muerto, la supresión por huella y el timeout.
 * =================================================================
 */

use avala_domain_models::ServiceAttackData;
use avala_infra_uplink::{ConnectionDirectives, ServerClient};
use avala_raider::executor::run_exploit_batch;
use avala_raider::{Exploit, ExploitConfig, ExploitRunner, RaiderStore, TickScope};
use regex::Regex;
use serde_json::json;
use std::sync::Arc;

/// Uplink hacia un puerto muerto: toda entrega cae al outbox local.
fn forge_dead_uplink(dot_directory: &std::path::Path) -> Arc<ServerClient> {
    let directives = ConnectionDirectives {
        protocol: "http".to_string(),
        host: "127.0.0.1".to_string(),
        port: 1,
        username: "anon".to_string(),
        password: None,
    };

    Arc::new(ServerClient::new(directives, dot_directory.to_path_buf()).expect("uplink void"))
}

fn forge_exploit(command: &str) -> Exploit {
    let mut config = ExploitConfig::new("auth", "auth-echo");
    config.timeout = 5;
    config.workers = 4;
    Exploit::new(config, ExploitRunner::Command(command.to_string()))
}

#[tokio::test]
async fn certify_harvest_falls_back_to_outbox_when_server_is_dead() {
    let workspace = tempfile::tempdir().unwrap();
    let store = RaiderStore::connect(":memory:").await.unwrap();
    let uplink = forge_dead_uplink(workspace.path());
    let pattern = Arc::new(Regex::new("FLG[0-9A-Z]+").unwrap());

    // El comando emite dos banderas válidas y ruido.
    let exploit = forge_exploit("echo 'noise FLGAAAA111 mid FLGBBBB222 tail'");
    let targets = vec!["10.0.0.5".to_string()];

    let report = run_exploit_batch(&exploit, &targets, None, uplink, store.clone(), pattern, &[]).await;

    assert_eq!(report.attacks_launched, 1);
    assert_eq!(report.flags_enqueued, 0);
    assert_eq!(report.flags_stored_locally, 2);

    let groups = store.pending_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, "auth-echo");
    assert_eq!(groups[0].2, vec!["FLGAAAA111".to_string(), "FLGBBBB222".to_string()]);
}

#[tokio::test]
async fn certify_fingerprint_suppression_skips_second_run() {
    let workspace = tempfile::tempdir().unwrap();
    let store = RaiderStore::connect(":memory:").await.unwrap();
    let uplink = forge_dead_uplink(workspace.path());
    let pattern = Arc::new(Regex::new("FLG[0-9A-Z]+").unwrap());

    let mut exploit = forge_exploit("echo FLGCCCC333");
    exploit.config.tick_scope = TickScope::Single;

    let service_view = ServiceAttackData::from_value(&json!({
        "10.0.0.5": [["note-41"]],
    }))
    .unwrap();

    let targets = vec!["10.0.0.5".to_string()];

    let first_report = run_exploit_batch(
        &exploit,
        &targets,
        Some(&service_view),
        uplink.clone(),
        store.clone(),
        pattern.clone(),
        &[],
    )
    .await;
    assert_eq!(first_report.attacks_launched, 1);

    // Misma (alias, objetivo, flag ids): la huella suprime el re-ataque.
    let second_report = run_exploit_batch(
        &exploit,
        &targets,
        Some(&service_view),
        uplink.clone(),
        store.clone(),
        pattern.clone(),
        &[],
    )
    .await;
    assert_eq!(second_report.attacks_launched, 0);

    // En borrador la supresión se desactiva.
    exploit.config.draft = true;
    let draft_report = run_exploit_batch(
        &exploit,
        &targets,
        Some(&service_view),
        uplink,
        store,
        pattern,
        &[],
    )
    .await;
    assert_eq!(draft_report.attacks_launched, 1);
}

#[tokio::test]
async fn certify_protected_hosts_are_never_attacked() {
    let workspace = tempfile::tempdir().unwrap();
    let store = RaiderStore::connect(":memory:").await.unwrap();
    let uplink = forge_dead_uplink(workspace.path());
    let pattern = Arc::new(Regex::new("FLG[0-9A-Z]+").unwrap());

    let exploit = forge_exploit("echo FLGDDDD444");
    let targets = vec!["10.0.0.9".to_string(), "10.0.0.5".to_string()];
    let protected = vec!["10.0.0.9".to_string()];

    let report = run_exploit_batch(&exploit, &targets, None, uplink, store, pattern, &protected).await;

    // Solo el host no protegido recibe el ataque.
    assert_eq!(report.attacks_launched, 1);
}

#[tokio::test]
async fn certify_attack_timeout_is_reported() {
    let workspace = tempfile::tempdir().unwrap();
    let store = RaiderStore::connect(":memory:").await.unwrap();
    let uplink = forge_dead_uplink(workspace.path());
    let pattern = Arc::new(Regex::new("FLG[0-9A-Z]+").unwrap());

    let mut exploit = forge_exploit("sleep 30");
    exploit.config.timeout = 1;

    let targets = vec!["10.0.0.5".to_string()];
    let report = run_exploit_batch(&exploit, &targets, None, uplink, store, pattern, &[]).await;

    assert_eq!(report.timeouts, 1);
    assert_eq!(report.flags_enqueued, 0);
}
