// [apps/raider/src/exploit.rs]
/*!
 * =================================================================
 * APARATO: EXPLOIT DOMAIN (V4.2 - PLUGIN CONSTRUCTOR MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2-WORKER)
 * RESPONSABILIDAD: CONFIGURACIÓN, BATCHING Y CARGA DE MANIFIESTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT CONSTRUCTOR: Un exploit es un valor — configuración más
 *    ejecutor (clausura Rust o comando de shell). El registro ocurre
 *    por constructor explícito o por manifiesto TOML en disco.
 * 2. LIVE EDIT: Los manifiestos se re-leen en cada tick; editar el
 *    TOML o el programa externo que invoca surte efecto en el
 *    siguiente tick sin reiniciar el agente.
 * 3. BATCHING: Divide la lista de objetivos en lotes equiespaciados en
 *    el tiempo para mitigar picos de CPU, memoria y red.
 * =================================================================
 */

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ExploitError {
    #[error("[L2_EXPLOIT_FAULT]: INVALID_BATCHING -> {0}")]
    InvalidBatching(String),

    #[error("[L2_EXPLOIT_FAULT]: MANIFEST_REJECTED -> {0}")]
    ManifestRejected(String),
}

/// Estrategia de selección de objetivos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingStrategy {
    /// Objetivos derivados del attack data del servidor del juego.
    /// Exige que el servicio exista en el payload de flag ids.
    #[default]
    Auto,
    /// Ataca únicamente al equipo NOP (pruebas inofensivas).
    NopTeam,
    /// Ataca al propio equipo (verificación local del exploit).
    OwnTeam,
}

/// Alcance de los flag ids entregados al exploit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickScope {
    /// Un registro de flag ids por (objetivo, tick); los registros ya
    /// atacados con éxito se suprimen vía el ledger de huellas.
    #[default]
    Single,
    /// La ventana completa de los últimos N ticks en una sola llamada.
    LastN,
}

/// División de objetivos en lotes equiespaciados.
#[derive(Debug, Clone, Copy)]
pub struct Batching {
    pub size: Option<usize>,
    pub count: Option<usize>,
    pub gap: Duration,
}

impl Batching {
    /**
     * # Errors:
     * - Ni 'size' ni 'count', o ambos a la vez.
     * - 'size' / 'count' cero, o 'gap' no positivo.
     */
    pub fn new(size: Option<usize>, count: Option<usize>, gap_seconds: f64) -> Result<Self, ExploitError> {
        match (size, count) {
            (None, None) => {
                return Err(ExploitError::InvalidBatching("either 'size' or 'count' must be set".into()))
            }
            (Some(_), Some(_)) => {
                return Err(ExploitError::InvalidBatching("only one of 'size' or 'count' can be set".into()))
            }
            (Some(0), _) => {
                return Err(ExploitError::InvalidBatching("'size' must be a positive integer".into()))
            }
            (_, Some(0)) => {
                return Err(ExploitError::InvalidBatching("'count' must be a positive integer".into()))
            }
            _ => {}
        }

        if gap_seconds <= 0.0 {
            return Err(ExploitError::InvalidBatching("'gap' must be a positive number".into()));
        }

        Ok(Self {
            size,
            count,
            gap: Duration::from_secs_f64(gap_seconds),
        })
    }

    /**
     * Divide los objetivos en lotes de tamaño homogéneo.
     *
     * Con 28 objetivos: count=5 -> [6, 6, 6, 6, 4]; size=5 -> [5, 5, 5, 5, 5, 3].
     */
    pub fn split(&self, targets: &[String]) -> Vec<Vec<String>> {
        if targets.is_empty() {
            return Vec::new();
        }

        let chunk_size = match (self.size, self.count) {
            (Some(size), _) => size,
            (_, Some(count)) => targets.len().div_ceil(count),
            _ => targets.len(),
        };

        targets.chunks(chunk_size.max(1)).map(|chunk| chunk.to_vec()).collect()
    }
}

/// Configuración completa de un exploit registrado.
#[derive(Debug, Clone)]
pub struct ExploitConfig {
    /// Servicio del juego que este exploit ataca.
    pub service: String,
    /// Nombre estable para deduplicación y analítica.
    pub alias: String,
    /// Modo borrador: sin supresión de huellas, sin delay, sin batching.
    pub draft: bool,
    /// Objetivos explícitos; alternativa a la estrategia.
    pub target_hosts: Option<Vec<String>>,
    pub target_strategy: TargetingStrategy,
    pub tick_scope: TickScope,
    /// Objetivos a excluir siempre.
    pub skip: Vec<String>,
    /// Comando de shell previo al primer ataque.
    pub prepare: Option<String>,
    /// Comando de shell posterior al último ataque.
    pub cleanup: Option<String>,
    pub env: HashMap<String, String>,
    pub delay: Duration,
    pub batching: Option<Batching>,
    /// Tope de ataques concurrentes.
    pub workers: usize,
    /// Tope de duración de un ataque individual, en segundos.
    pub timeout: u64,
}

impl ExploitConfig {
    pub fn new(service: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            alias: alias.into(),
            draft: false,
            target_hosts: None,
            target_strategy: TargetingStrategy::Auto,
            tick_scope: TickScope::Single,
            skip: Vec::new(),
            prepare: None,
            cleanup: None,
            env: HashMap::new(),
            delay: Duration::ZERO,
            batching: None,
            workers: 128,
            timeout: 15,
        }
    }

    /// Delay y batching se anulan en modo borrador.
    pub fn effective_delay(&self) -> Duration {
        if self.draft {
            Duration::ZERO
        } else {
            self.delay
        }
    }

    pub fn effective_batching(&self) -> Option<Batching> {
        if self.draft {
            None
        } else {
            self.batching
        }
    }
}

/// Clausura de ataque: (objetivo, flag ids) -> salida cruda.
pub type ExploitFn = Arc<dyn Fn(&str, Option<&Value>) -> anyhow::Result<String> + Send + Sync>;

/// Cuerpo ejecutable del exploit.
#[derive(Clone)]
pub enum ExploitRunner {
    /// Comando de shell con placeholders '{target}' y '{flag_ids_path}'.
    Command(String),
    /// Clausura Rust registrada en código.
    Function(ExploitFn),
}

/// Un exploit es configuración más cuerpo ejecutable.
#[derive(Clone)]
pub struct Exploit {
    pub config: ExploitConfig,
    pub runner: ExploitRunner,
}

impl Exploit {
    pub fn new(config: ExploitConfig, runner: ExploitRunner) -> Self {
        Self { config, runner }
    }

    /// Exploits dirigidos por flag ids esperan el attack data del tick.
    pub fn requires_flag_ids(&self) -> bool {
        self.config.target_hosts.is_none() && self.config.target_strategy == TargetingStrategy::Auto
    }
}

/// Forma en disco de un manifiesto de exploit.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExploitManifest {
    service: String,
    alias: Option<String>,
    #[serde(default)]
    draft: bool,
    targets: Option<Vec<String>>,
    #[serde(default)]
    strategy: TargetingStrategy,
    #[serde(default)]
    tick_scope: TickScope,
    #[serde(default)]
    skip: Vec<String>,
    prepare: Option<String>,
    cleanup: Option<String>,
    command: String,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    delay: u64,
    batching: Option<BatchingManifest>,
    workers: Option<usize>,
    timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchingManifest {
    size: Option<usize>,
    count: Option<usize>,
    #[serde(default = "default_gap_seconds")]
    gap: f64,
}

fn default_gap_seconds() -> f64 {
    1.0
}

/**
 * Carga un manifiesto TOML. El alias cae al nombre del archivo.
 */
pub fn load_manifest(manifest_path: &Path) -> Result<Exploit, ExploitError> {
    let raw_content = std::fs::read_to_string(manifest_path)
        .map_err(|io_fault| ExploitError::ManifestRejected(format!("{}: {}", manifest_path.display(), io_fault)))?;

    let manifest: ExploitManifest = toml::from_str(&raw_content)
        .map_err(|parse_fault| ExploitError::ManifestRejected(format!("{}: {}", manifest_path.display(), parse_fault)))?;

    let fallback_alias = manifest_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "unnamed".to_string());

    let batching = match manifest.batching {
        Some(declared) => Some(Batching::new(declared.size, declared.count, declared.gap)?),
        None => None,
    };

    let mut config = ExploitConfig::new(manifest.service, manifest.alias.unwrap_or(fallback_alias));
    config.draft = manifest.draft;
    config.target_hosts = manifest.targets;
    config.target_strategy = manifest.strategy;
    config.tick_scope = manifest.tick_scope;
    config.skip = manifest.skip;
    config.prepare = manifest.prepare;
    config.cleanup = manifest.cleanup;
    config.env = manifest.env;
    config.delay = Duration::from_secs(manifest.delay);
    config.batching = batching;
    config.workers = manifest.workers.unwrap_or(128);
    config.timeout = manifest.timeout.unwrap_or(15);

    Ok(Exploit::new(config, ExploitRunner::Command(manifest.command)))
}

/**
 * Re-lee todos los manifiestos '*.toml' de los directorios registrados.
 * Un manifiesto corrupto se registra y se salta; jamás detiene el tick.
 */
pub fn reload_exploits(directories: &[PathBuf]) -> Vec<Exploit> {
    let mut exploits = Vec::new();

    for directory in directories {
        let Ok(entries) = std::fs::read_dir(directory) else {
            error!("❌ [EXPLOITS]: Directory vanished: {}", directory.display());
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
                match load_manifest(&path) {
                    Ok(exploit) => exploits.push(exploit),
                    Err(manifest_fault) => {
                        error!("❌ [EXPLOITS]: Failed to load exploit: {}", manifest_fault);
                    }
                }
            }
        }
    }

    debug!("🧨 [EXPLOITS]: Loaded {} exploits from disk.", exploits.len());
    exploits
}
