// [apps/raider/src/executor.rs]
/*!
 * =================================================================
 * APARATO: EXPLOIT EXECUTOR (V4.2 - WORKER POOL MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4-WORKER)
 * RESPONSABILIDAD: EJECUCIÓN CONCURRENTE, EXTRACCIÓN Y ENTREGA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WORKER POOL: Semáforo de 'workers' permisos (128 nominal); cada
 *    ataque (objetivo, flag ids) es una tarea independiente.
 * 2. DUAL RUNNER: Clausura Rust en el pool bloqueante, o comando de
 *    shell con placeholders '{target}' / '{flag_ids_path}' bajo
 *    timeout duro con kill del proceso hijo.
 * 3. REGEX HARVEST: La salida cruda se cosecha con el flag_format del
 *    servidor; sin coincidencias no hay huella (el ataque reintenta
 *    el próximo tick).
 * 4. OUTBOX FALLBACK: Banderas que el servidor no reconoce caen al
 *    outbox local; el drenador las entrega cuando vuelva la vida.
 * =================================================================
 */

use crate::exploit::{Exploit, ExploitRunner, TickScope};
use crate::storage::RaiderStore;
use avala_domain_models::attack_data::flag_ids_fingerprint;
use avala_domain_models::ServiceAttackData;
use avala_infra_uplink::ServerClient;
use regex::Regex;
use serde_json::Value;
use std::io::Write;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Resultado agregado de la ejecución de un lote.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionReport {
    pub attacks_launched: usize,
    pub flags_enqueued: usize,
    pub flags_stored_locally: usize,
    pub timeouts: usize,
}

impl ExecutionReport {
    fn absorb(&mut self, other: ExecutionReport) {
        self.attacks_launched += other.attacks_launched;
        self.flags_enqueued += other.flags_enqueued;
        self.flags_stored_locally += other.flags_stored_locally;
        self.timeouts += other.timeouts;
    }
}

enum AttackFault {
    Timeout,
    Failed(String),
}

/// Unidad atómica de ataque: un objetivo con sus flag ids del tick.
struct AttackUnit {
    target: String,
    flag_ids: Option<Value>,
    /// Huella a sellar tras una cosecha exitosa (solo tick_scope single).
    fingerprint: Option<String>,
}

/**
 * Ejecuta un lote de objetivos de un exploit.
 *
 * El ciclo completo: prepare -> pool de ataques -> cosecha regex ->
 * entrega (o outbox) -> sellado de huellas -> cleanup.
 */
pub async fn run_exploit_batch(
    exploit: &Exploit,
    batch_targets: &[String],
    service_attack_data: Option<&ServiceAttackData>,
    uplink: Arc<ServerClient>,
    store: RaiderStore,
    flag_pattern: Arc<Regex>,
    protected_hosts: &[String],
) -> ExecutionReport {
    let alias = exploit.config.alias.clone();

    if let Some(prepare_command) = &exploit.config.prepare {
        run_shell_hook(prepare_command, &exploit.config.env).await;
    }

    let attack_units =
        build_attack_units(exploit, batch_targets, service_attack_data, &store, protected_hosts).await;

    let worker_pool = Arc::new(Semaphore::new(exploit.config.workers.max(1)));
    let mut unit_handles = Vec::with_capacity(attack_units.len());

    for unit in attack_units {
        let pool = worker_pool.clone();
        let runner = exploit.runner.clone();
        let config_alias = alias.clone();
        let config_env = exploit.config.env.clone();
        let attack_timeout = exploit.config.timeout;
        let unit_uplink = uplink.clone();
        let unit_store = store.clone();
        let unit_pattern = flag_pattern.clone();

        unit_handles.push(tokio::spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return ExecutionReport::default();
            };

            let mut report = ExecutionReport {
                attacks_launched: 1,
                ..Default::default()
            };

            let attack_outcome = execute_attack(&runner, &config_env, attack_timeout, &unit).await;

            let raw_output = match attack_outcome {
                Ok(output) => output,
                Err(AttackFault::Timeout) => {
                    error!(
                        "⏰ [EXECUTOR]: Attack on {} via {} exceeded its timeout.",
                        unit.target, config_alias
                    );
                    report.timeouts = 1;
                    return report;
                }
                Err(AttackFault::Failed(detail)) => {
                    error!(
                        "❌ [EXECUTOR]: An error occurred while attacking {} via {}: {}",
                        unit.target, config_alias, detail
                    );
                    return report;
                }
            };

            let harvested_flags: Vec<String> = unit_pattern
                .find_iter(&raw_output)
                .map(|m| m.as_str().to_string())
                .collect();

            if harvested_flags.is_empty() {
                warn!(
                    "🕳️  [EXECUTOR]: No flags retrieved from attacking {} via {}.",
                    unit.target, config_alias
                );
                return report;
            }

            match unit_uplink.enqueue(&harvested_flags, &config_alias, &unit.target).await {
                Ok(_) => {
                    report.flags_enqueued = harvested_flags.len();
                }
                Err(enqueue_fault) => {
                    warn!(
                        "📦 [EXECUTOR]: Failed to enqueue flags from {} via {}: {}. Storing locally.",
                        unit.target, config_alias, enqueue_fault
                    );

                    if let Err(store_fault) = unit_store
                        .store_pending_flags(&harvested_flags, &unit.target, &config_alias)
                        .await
                    {
                        error!("❌ [EXECUTOR]: Local flag store collapsed: {}", store_fault);
                    } else {
                        report.flags_stored_locally = harvested_flags.len();
                    }
                }
            }

            // La huella se sella solo tras cosechar banderas; los ataques
            // secos reintentan el próximo tick.
            if let Some(fingerprint) = &unit.fingerprint {
                if let Err(seal_fault) = unit_store.record_fingerprints(&[fingerprint.clone()]).await {
                    error!("❌ [EXECUTOR]: Fingerprint seal failed: {}", seal_fault);
                }
            }

            report
        }));
    }

    let mut batch_report = ExecutionReport::default();
    for handle in unit_handles {
        if let Ok(unit_report) = handle.await {
            batch_report.absorb(unit_report);
        }
    }

    if let Some(cleanup_command) = &exploit.config.cleanup {
        run_shell_hook(cleanup_command, &exploit.config.env).await;
    }

    info!(
        "🏹 [EXECUTOR]: {} finished: {} attacks, {} flags enqueued, {} stored locally.",
        alias, batch_report.attacks_launched, batch_report.flags_enqueued, batch_report.flags_stored_locally
    );

    batch_report
}

/**
 * Proyecta el lote de objetivos a unidades de ataque según la
 * estrategia, el alcance de tick y el ledger de huellas.
 */
async fn build_attack_units(
    exploit: &Exploit,
    batch_targets: &[String],
    service_attack_data: Option<&ServiceAttackData>,
    store: &RaiderStore,
    protected_hosts: &[String],
) -> Vec<AttackUnit> {
    let config = &exploit.config;
    let mut units = Vec::new();

    for target in batch_targets {
        // El equipo propio y el NOP jamás se atacan.
        if config.skip.contains(target) || protected_hosts.contains(target) {
            continue;
        }

        let Some(service_data) = service_attack_data else {
            units.push(AttackUnit {
                target: target.clone(),
                flag_ids: None,
                fingerprint: None,
            });
            continue;
        };

        let tick_window = match service_data.ticks(target) {
            Ok(window) => window,
            Err(lookup_fault) => {
                warn!(
                    "🕳️  [EXECUTOR]: Target {} not found for exploit {}: {}",
                    target, config.alias, lookup_fault
                );
                continue;
            }
        };

        match config.tick_scope {
            TickScope::Single => {
                for flag_ids in tick_window {
                    let fingerprint = flag_ids_fingerprint(&config.alias, target, &flag_ids);

                    if !config.draft {
                        match store.fingerprint_seen(&fingerprint).await {
                            Ok(true) => {
                                debug!(
                                    "👻 [EXECUTOR]: Skipping already-attacked flag ids on {} via {}.",
                                    target, config.alias
                                );
                                continue;
                            }
                            Ok(false) => {}
                            // Ledger inaccesible: atacar de más es mejor que de menos.
                            Err(_) => {}
                        }
                    }

                    units.push(AttackUnit {
                        target: target.clone(),
                        flag_ids: Some(flag_ids),
                        fingerprint: Some(fingerprint),
                    });
                }
            }
            TickScope::LastN => {
                units.push(AttackUnit {
                    target: target.clone(),
                    flag_ids: Some(Value::Array(tick_window)),
                    fingerprint: None,
                });
            }
        }
    }

    units
}

/**
 * Un ataque individual: clausura en el pool bloqueante, o comando de
 * shell con placeholders bajo timeout con kill.
 */
async fn execute_attack(
    runner: &ExploitRunner,
    environment: &std::collections::HashMap<String, String>,
    attack_timeout_seconds: u64,
    unit: &AttackUnit,
) -> Result<String, AttackFault> {
    match runner {
        ExploitRunner::Function(attack_function) => {
            let function = attack_function.clone();
            let target = unit.target.clone();
            let flag_ids = unit.flag_ids.clone();

            let execution = tokio::task::spawn_blocking(move || function(&target, flag_ids.as_ref()));

            match timeout(Duration::from_secs(attack_timeout_seconds), execution).await {
                Err(_) => Err(AttackFault::Timeout),
                Ok(Err(join_fault)) => Err(AttackFault::Failed(join_fault.to_string())),
                Ok(Ok(Err(attack_fault))) => Err(AttackFault::Failed(attack_fault.to_string())),
                Ok(Ok(Ok(output))) => Ok(output),
            }
        }
        ExploitRunner::Command(command_template) => {
            let mut command_line = command_template.replace("{target}", &unit.target);

            // El archivo temporal vive hasta el final del ataque.
            let mut flag_ids_file = None;
            if let Some(flag_ids) = &unit.flag_ids {
                let mut temp_file = tempfile::NamedTempFile::new()
                    .map_err(|io_fault| AttackFault::Failed(io_fault.to_string()))?;
                temp_file
                    .write_all(flag_ids.to_string().as_bytes())
                    .map_err(|io_fault| AttackFault::Failed(io_fault.to_string()))?;

                command_line =
                    command_line.replace("{flag_ids_path}", &temp_file.path().to_string_lossy());
                flag_ids_file = Some(temp_file);
            }

            let mut child = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&command_line)
                .envs(environment)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|spawn_fault| AttackFault::Failed(spawn_fault.to_string()))?;

            let execution = async {
                let output = child
                    .wait_with_output()
                    .await
                    .map_err(|wait_fault| AttackFault::Failed(wait_fault.to_string()))?;
                Ok::<String, AttackFault>(String::from_utf8_lossy(&output.stdout).to_string())
            };

            let outcome = match timeout(Duration::from_secs(attack_timeout_seconds), execution).await {
                Err(_) => Err(AttackFault::Timeout),
                Ok(result) => result,
            };

            drop(flag_ids_file);
            outcome
        }
    }
}

/// Hooks prepare/cleanup: comandos de shell con rastro, jamás fatales.
async fn run_shell_hook(hook_command: &str, environment: &std::collections::HashMap<String, String>) {
    let execution_outcome = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(hook_command)
        .envs(environment)
        .status()
        .await;

    if let Err(hook_fault) = execution_outcome {
        error!("❌ [EXECUTOR]: Shell hook '{}' collapsed: {}", hook_command, hook_fault);
    }
}
