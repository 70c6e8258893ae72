// [tests/mirror/apps/orchestrator/config_strategy.test.rs]
/**
 * =================================================================
 * APARATO: CONFIGURATION STRATEGY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-CONFIG)
 * OBJETIVO: Certificar la exclusión mutua de estrategias y la
 *           fatalidad de las configuraciones contradictorias.
 * =================================================================
 */

use avala_orchestrator::prelude::*;

fn config_with_submitter(submitter_block: &str) -> Result<AvalaConfig, ConfigError> {
    let yaml = format!(
        r#"
game:
  tick_duration: 120
  flag_format: "FLG[0-9A-Z]+"
  team_ip: ["10.0.0.9"]
  nop_team_ip: ["10.0.0.10"]
  flag_ttl: 5
  game_starts_at: "2026-07-18T10:00:00Z"
  networks_open_after:
    minutes: 10
  game_ends_after:
    hours: 8
server:
  port: 2024
submitter:
{submitter_block}
attack_data:
  url: "http://127.0.0.1:1/teams.json"
database:
  path: ":memory:"
broker:
  path: ":memory:"
"#
    );

    AvalaConfig::from_yaml(&yaml)
}

#[test]
fn certify_each_strategy_resolves_alone() {
    let per_tick = config_with_submitter("  per_tick: 4\n  max_batch_size: 50").unwrap();
    assert_eq!(per_tick.submitter.strategy().unwrap(), SubmitterStrategy::PerTick(4));

    let interval = config_with_submitter("  interval: 15\n  max_batch_size: 50").unwrap();
    assert_eq!(interval.submitter.strategy().unwrap(), SubmitterStrategy::Interval(15));

    let batch = config_with_submitter("  batch_size: 25").unwrap();
    assert_eq!(batch.submitter.strategy().unwrap(), SubmitterStrategy::BatchSize(25));

    let streams = config_with_submitter("  module: tcp_checker\n  streams: 3").unwrap();
    assert_eq!(streams.submitter.strategy().unwrap(), SubmitterStrategy::Streams(3));
}

#[test]
fn certify_zero_strategies_is_fatal() {
    let outcome = config_with_submitter("  max_batch_size: 50");
    assert!(matches!(outcome, Err(ConfigError::Contradiction(_))));
}

#[test]
fn certify_multiple_strategies_are_fatal() {
    let outcome = config_with_submitter("  per_tick: 4\n  interval: 10\n  max_batch_size: 50");
    assert!(matches!(outcome, Err(ConfigError::Contradiction(_))));
}

#[test]
fn certify_scheduled_strategies_require_max_batch_size() {
    let outcome = config_with_submitter("  per_tick: 4");
    assert!(matches!(outcome, Err(ConfigError::Contradiction(_))));

    let outcome = config_with_submitter("  interval: 10");
    assert!(matches!(outcome, Err(ConfigError::Contradiction(_))));
}

#[test]
fn certify_game_calendar_is_validated() {
    let yaml = r#"
game:
  tick_duration: 0
  flag_format: "FLG[0-9A-Z]+"
  team_ip: ["10.0.0.9"]
  flag_ttl: 5
  game_starts_at: "2026-07-18T10:00:00Z"
  networks_open_after:
    minutes: 10
  game_ends_after:
    hours: 8
server: {}
submitter:
  batch_size: 25
attack_data: {}
database:
  path: ":memory:"
broker:
  path: ":memory:"
"#;

    assert!(matches!(AvalaConfig::from_yaml(yaml), Err(ConfigError::Contradiction(_))));
}

#[test]
fn certify_flag_ttl_projects_to_milliseconds() {
    let config = config_with_submitter("  batch_size: 25").unwrap();

    // 5 ticks x 120 s = 600 000 ms de vida útil en la cola de envío.
    assert_eq!(config.game.flag_ttl_milliseconds(), 600_000);
}

#[test]
fn certify_unknown_fields_are_rejected() {
    let outcome = config_with_submitter("  batch_size: 25\n  turbo_mode: true");
    assert!(matches!(outcome, Err(ConfigError::SchemaDrift(_))));
}
