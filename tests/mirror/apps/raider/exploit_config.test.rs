// [tests/mirror/apps/raider/exploit_config.test.rs]
/**
 * =================================================================
 * APARATO: EXPLOIT CONFIG INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-WORKER)
 * OBJETIVO: Certificar el batching, los manifiestos TOML y el modo
 *           borrador.
 * =================================================================
 */

use avala_raider::exploit::{load_manifest, reload_exploits};
use avala_raider::{Batching, ExploitRunner, TargetingStrategy, TickScope};
use std::io::Write;
use std::time::Duration;

fn forge_targets(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("10.0.0.{}", index + 1)).collect()
}

#[test]
fn certify_batching_split_geometry() {
    let targets = forge_targets(28);

    // count=5 sobre 28 objetivos -> [6, 6, 6, 6, 4]
    let by_count = Batching::new(None, Some(5), 2.0).unwrap();
    let chunks = by_count.split(&targets);
    assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![6, 6, 6, 6, 4]);

    // size=5 sobre 28 objetivos -> [5, 5, 5, 5, 5, 3]
    let by_size = Batching::new(Some(5), None, 2.0).unwrap();
    let chunks = by_size.split(&targets);
    assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![5, 5, 5, 5, 5, 3]);

    assert!(by_size.split(&[]).is_empty());
}

#[test]
fn certify_batching_validation_rules() {
    assert!(Batching::new(None, None, 1.0).is_err());
    assert!(Batching::new(Some(5), Some(5), 1.0).is_err());
    assert!(Batching::new(Some(0), None, 1.0).is_err());
    assert!(Batching::new(None, Some(0), 1.0).is_err());
    assert!(Batching::new(Some(5), None, 0.0).is_err());
}

#[test]
fn certify_manifest_round_trip() {
    let manifest_content = r#"
service = "auth"
alias = "auth-sqli"
command = "python3 sqli.py {target} {flag_ids_path}"
strategy = "auto"
tick_scope = "last_n"
skip = ["10.0.0.77"]
delay = 3
workers = 64
timeout = 20

[batching]
count = 4
gap = 2.5

[env]
HTTP_PROXY = "http://127.0.0.1:8080"
"#;

    let mut manifest_file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
    manifest_file.write_all(manifest_content.as_bytes()).unwrap();

    let exploit = load_manifest(manifest_file.path()).unwrap();
    let config = &exploit.config;

    assert_eq!(config.service, "auth");
    assert_eq!(config.alias, "auth-sqli");
    assert_eq!(config.target_strategy, TargetingStrategy::Auto);
    assert_eq!(config.tick_scope, TickScope::LastN);
    assert_eq!(config.skip, vec!["10.0.0.77"]);
    assert_eq!(config.delay, Duration::from_secs(3));
    assert_eq!(config.workers, 64);
    assert_eq!(config.timeout, 20);
    assert_eq!(config.env.get("HTTP_PROXY").map(String::as_str), Some("http://127.0.0.1:8080"));

    let batching = config.batching.expect("batching void");
    assert_eq!(batching.count, Some(4));
    assert_eq!(batching.gap, Duration::from_secs_f64(2.5));

    assert!(matches!(&exploit.runner, ExploitRunner::Command(command) if command.contains("{target}")));
    assert!(exploit.requires_flag_ids());
}

#[test]
fn certify_alias_falls_back_to_file_stem() {
    let directory = tempfile::tempdir().unwrap();
    let manifest_path = directory.path().join("wallet-heist.toml");

    std::fs::write(
        &manifest_path,
        "service = \"wallet\"\ncommand = \"./heist.sh {target}\"\ntargets = [\"10.9.9.1\"]\n",
    )
    .unwrap();

    let exploit = load_manifest(&manifest_path).unwrap();
    assert_eq!(exploit.config.alias, "wallet-heist");
    // Objetivos explícitos: no espera flag ids.
    assert!(!exploit.requires_flag_ids());
}

#[test]
fn certify_draft_mode_disables_delay_and_batching() {
    let directory = tempfile::tempdir().unwrap();
    let manifest_path = directory.path().join("draft-probe.toml");

    std::fs::write(
        &manifest_path,
        r#"
service = "auth"
command = "./probe.sh {target}"
draft = true
delay = 10

[batching]
size = 2
"#,
    )
    .unwrap();

    let exploit = load_manifest(&manifest_path).unwrap();
    assert!(exploit.config.draft);
    assert_eq!(exploit.config.effective_delay(), Duration::ZERO);
    assert!(exploit.config.effective_batching().is_none());
}

#[test]
fn certify_corrupt_manifests_are_skipped_on_reload() {
    let directory = tempfile::tempdir().unwrap();

    std::fs::write(
        directory.path().join("healthy.toml"),
        "service = \"auth\"\ncommand = \"./x.sh {target}\"\n",
    )
    .unwrap();
    std::fs::write(directory.path().join("broken.toml"), "service = [not toml").unwrap();
    std::fs::write(directory.path().join("notes.txt"), "ignored entirely").unwrap();

    let exploits = reload_exploits(&[directory.path().to_path_buf()]);
    assert_eq!(exploits.len(), 1);
    assert_eq!(exploits[0].config.alias, "healthy");
}
