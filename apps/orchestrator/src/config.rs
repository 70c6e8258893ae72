// [apps/orchestrator/src/config.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN CONFIGURATION MATRIX (V4.2 - YAML MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: CARGA, VALIDACIÓN Y PROYECCIÓN DEL CALENDARIO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRATEGY EXCLUSION: Exactamente una estrategia de envío puede
 *    estar activa (per_tick | interval | batch_size | streams); las
 *    programadas exigen 'max_batch_size'. Toda violación es fatal en
 *    la ignición (exit 1).
 * 2. CLOCK PROJECTION: El calendario del juego se proyecta a un
 *    'TickClock' puro consumido por todos los daemons.
 * 3. TTL SEMANTICS: 'flag_ttl' se expresa en ticks; la política de
 *    expiración del broker se deriva multiplicando por la duración
 *    del tick, en milisegundos.
 * =================================================================
 */

use avala_domain_models::TickClock;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("[L3_CONFIG_FAULT]: FILE_UNREACHABLE -> {0}")]
    FileUnreachable(String),

    #[error("[L3_CONFIG_FAULT]: SCHEMA_DRIFT -> {0}")]
    SchemaDrift(String),

    #[error("[L3_CONFIG_FAULT]: CONTRADICTION -> {0}")]
    Contradiction(String),
}

/// Delta temporal declarativo (horas + minutos + segundos).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeDeltaConfig {
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl TimeDeltaConfig {
    pub fn to_duration(self) -> Duration {
        Duration::seconds((self.hours * 3600 + self.minutes * 60 + self.seconds) as i64)
    }

    fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    /// Duración del tick en segundos.
    pub tick_duration: u64,
    /// Expresión regular que reconoce banderas.
    pub flag_format: String,
    pub team_ip: Vec<String>,
    #[serde(default)]
    pub nop_team_ip: Vec<String>,
    /// Vida útil de una bandera en la cola de envío, expresada en ticks.
    pub flag_ttl: i64,
    pub game_starts_at: DateTime<Utc>,
    pub networks_open_after: TimeDeltaConfig,
    pub game_ends_after: TimeDeltaConfig,
}

impl GameConfig {
    pub fn tick_duration_chrono(&self) -> Duration {
        Duration::seconds(self.tick_duration as i64)
    }

    /// Política de expiración de mensajes en la cola de envío (ms).
    pub fn flag_ttl_milliseconds(&self) -> i64 {
        self.flag_ttl * self.tick_duration as i64 * 1000
    }

    pub fn clock(&self) -> TickClock {
        TickClock::new(
            self.game_starts_at,
            self.tick_duration_chrono(),
            self.networks_open_after.to_duration(),
            self.game_ends_after.to_duration(),
        )
    }
}

/// Estrategia de envío resuelta tras la validación de exclusión mutua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitterStrategy {
    /// N disparos por tick, equiespaciados, drenando la cola por lotes.
    PerTick(u32),
    /// Un disparo cada S segundos, drenando la cola por lotes.
    Interval(u64),
    /// Consumidor streaming que libera lotes de exactamente B mensajes.
    BatchSize(usize),
    /// K trabajadores de consumo continuo, una bandera por llamada.
    Streams(usize),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitterConfig {
    /// Adaptador de verificador incorporado a instanciar.
    #[serde(default = "default_submitter_module")]
    pub module: String,
    pub interval: Option<u64>,
    pub per_tick: Option<u32>,
    pub batch_size: Option<usize>,
    pub streams: Option<usize>,
    pub max_batch_size: Option<usize>,
    /// Endpoint del verificador para los adaptadores incorporados.
    pub url: Option<String>,
    /// Token de equipo para los adaptadores incorporados.
    pub token: Option<String>,
}

fn default_submitter_module() -> String {
    "http_checker".to_string()
}

impl SubmitterConfig {
    /**
     * Resuelve la estrategia activa exigiendo exclusión mutua.
     *
     * # Errors:
     * - Cero o más de una estrategia seleccionada.
     * - Estrategia programada sin 'max_batch_size'.
     */
    pub fn strategy(&self) -> Result<SubmitterStrategy, ConfigError> {
        let selected = [
            self.per_tick.map(|n| SubmitterStrategy::PerTick(n)),
            self.interval.map(SubmitterStrategy::Interval),
            self.batch_size.map(SubmitterStrategy::BatchSize),
            self.streams.map(SubmitterStrategy::Streams),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        match selected.as_slice() {
            [] => Err(ConfigError::Contradiction(
                "no submitter strategy selected (one of per_tick, interval, batch_size, streams)".into(),
            )),
            [strategy] => {
                let needs_max_batch = matches!(
                    strategy,
                    SubmitterStrategy::PerTick(_) | SubmitterStrategy::Interval(_)
                );
                if needs_max_batch && self.max_batch_size.is_none() {
                    return Err(ConfigError::Contradiction(
                        "per_tick / interval strategies require max_batch_size".into(),
                    ));
                }

                match strategy {
                    SubmitterStrategy::PerTick(0) => Err(ConfigError::Contradiction(
                        "per_tick must be a positive integer".into(),
                    )),
                    SubmitterStrategy::Interval(0) => Err(ConfigError::Contradiction(
                        "interval must be a positive number of seconds".into(),
                    )),
                    SubmitterStrategy::BatchSize(0) => Err(ConfigError::Contradiction(
                        "batch_size must be a positive integer".into(),
                    )),
                    SubmitterStrategy::Streams(0) => Err(ConfigError::Contradiction(
                        "streams must be a positive worker count".into(),
                    )),
                    other => Ok(*other),
                }
            }
            _ => Err(ConfigError::Contradiction(
                "submitter strategies are mutually exclusive".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackDataConfig {
    #[serde(default = "default_attack_data_module")]
    pub module: String,
    /// Endpoint upstream del juego para el adaptador incorporado.
    pub url: Option<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pausa entre reintentos, en segundos.
    #[serde(default = "default_retry_interval")]
    pub retry_interval: f64,
}

fn default_attack_data_module() -> String {
    "http_fetcher".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_interval() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub password: Option<String>,
    #[serde(default)]
    pub cors: Vec<String>,
    #[serde(default = "default_frontend")]
    pub frontend: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    2024
}

fn default_frontend() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Ruta del Ledger Táctico (archivo libSQL o ':memory:').
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Ruta del motor de colas (archivo libSQL o ':memory:').
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvalaConfig {
    pub game: GameConfig,
    pub server: ServerConfig,
    pub submitter: SubmitterConfig,
    pub attack_data: AttackDataConfig,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
}

impl AvalaConfig {
    /**
     * Carga y valida la configuración desde YAML.
     *
     * La ruta se resuelve desde 'AVALA_CONFIG' o cae a 'server.yaml' /
     * 'server.yml' en el directorio de trabajo.
     */
    pub fn load() -> Result<Self, ConfigError> {
        let candidate_paths = match std::env::var("AVALA_CONFIG") {
            Ok(explicit_path) => vec![explicit_path],
            Err(_) => vec!["server.yaml".to_string(), "server.yml".to_string()],
        };

        let config_path = candidate_paths
            .iter()
            .find(|p| Path::new(p).exists())
            .ok_or_else(|| ConfigError::FileUnreachable(candidate_paths.join(", ")))?;

        let raw_content = std::fs::read_to_string(config_path)
            .map_err(|e| ConfigError::FileUnreachable(format!("{}: {}", config_path, e)))?;

        Self::from_yaml(&raw_content)
    }

    pub fn from_yaml(raw_content: &str) -> Result<Self, ConfigError> {
        let config: AvalaConfig =
            serde_yaml::from_str(raw_content).map_err(|e| ConfigError::SchemaDrift(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.game.tick_duration == 0 {
            return Err(ConfigError::Contradiction("tick_duration must be positive".into()));
        }
        if self.game.flag_ttl <= 0 {
            return Err(ConfigError::Contradiction("flag_ttl must be a positive tick count".into()));
        }
        if self.game.team_ip.is_empty() {
            return Err(ConfigError::Contradiction("team_ip must name at least one host".into()));
        }
        if self.game.game_ends_after.is_zero() {
            return Err(ConfigError::Contradiction("game_ends_after must be non-zero".into()));
        }

        // La validación de estrategia es fatal aquí, no en el daemon.
        self.submitter.strategy()?;

        Ok(())
    }
}
