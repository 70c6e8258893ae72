// [apps/raider/src/engine.rs]
/*!
 * =================================================================
 * APARATO: RAIDER SOVEREIGN ENGINE (V4.2 - TICK ALIGNED)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-WORKER)
 * RESPONSABILIDAD: PLANIFICACIÓN DE EXPLOITS ALINEADA A TICKS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TICK GRID: El calendario llega del servidor en el handshake; el
 *    motor coloca cada tick en la retícula exacta del juego.
 * 2. TWO-PHASE DISPATCH: Exploits de objetivos manuales disparan de
 *    inmediato; los dirigidos por flag ids esperan la resolución del
 *    long-poll de attack data (con caída al payload cacheado).
 * 3. LIVE RELOAD: Los manifiestos de exploits se re-leen cada tick;
 *    editar en disco surte efecto en el tick siguiente.
 * 4. AFTER-ALL: El hook de cierre corre cuando todos los trabajos del
 *    tick han concluido, jamás antes.
 * =================================================================
 */

use crate::executor::{run_exploit_batch, ExecutionReport};
use crate::exploit::{reload_exploits, Exploit, TargetingStrategy};
use crate::outbox::OutboxRelayService;
use crate::storage::RaiderStore;
use avala_domain_models::{GameInfo, TickClock};
use avala_infra_uplink::{ConnectionDirectives, ServerClient};
use chrono::{Duration as ChronoDuration, Utc};
use futures::future::{FutureExt, Shared};
use futures::future::BoxFuture;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{error, info, warn};

pub type HookFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

type SharedAttackData = Shared<BoxFuture<'static, Option<avala_domain_models::AttackData>>>;

/// Veredicto de una corrida one-shot (workshop).
#[derive(Debug, Clone, Copy)]
pub struct WorkshopOutcome {
    pub report: ExecutionReport,
}

impl WorkshopOutcome {
    /// Un timeout de ataque en workshop se proyecta al exit code 2.
    pub fn timeout_expired(&self) -> bool {
        self.report.timeouts > 0
    }
}

/// Fachada del agente: registro de exploits, hooks y ciclo de vida.
pub struct Raider {
    directives: ConnectionDirectives,
    exploit_directories: Vec<PathBuf>,
    registered_exploits: Vec<Exploit>,
    before_all_hook: Option<HookFn>,
    after_all_hook: Option<HookFn>,
    dot_directory: PathBuf,
}

impl Raider {
    pub fn new(directives: ConnectionDirectives) -> Self {
        Self {
            directives,
            exploit_directories: Vec::new(),
            registered_exploits: Vec::new(),
            before_all_hook: None,
            after_all_hook: None,
            dot_directory: PathBuf::from(".avala"),
        }
    }

    pub fn register_directory(&mut self, directory_path: impl Into<PathBuf>) {
        let resolved = directory_path.into();
        if !self.exploit_directories.contains(&resolved) {
            self.exploit_directories.push(resolved);
        }
    }

    pub fn register_exploit(&mut self, exploit: Exploit) {
        self.registered_exploits.push(exploit);
    }

    pub fn before_all(&mut self, hook: HookFn) {
        self.before_all_hook = Some(hook);
    }

    pub fn after_all(&mut self, hook: HookFn) {
        self.after_all_hook = Some(hook);
    }

    /**
     * Ciclo de vida completo: handshake, daemons y bucle de ticks.
     * Bloquea hasta la señal de terminación (exit 0) o un fallo fatal
     * de conexión sin parámetros cacheados (exit 1 en el binario).
     */
    pub async fn run(mut self) -> anyhow::Result<()> {
        show_banner();

        let store_path = self.dot_directory.join("database.db");
        std::fs::create_dir_all(&self.dot_directory)?;
        let store = RaiderStore::connect(&store_path.to_string_lossy()).await?;

        self.validate_directories();

        // --- HANDSHAKE CON EL CENTRO DE COORDINACIÓN ---
        let mut client = ServerClient::new(self.directives.clone(), self.dot_directory.clone())?;

        match client.connect().await {
            Ok(()) => {
                if let Err(export_fault) = client.export_settings() {
                    warn!("⚠️ [ENGINE]: Settings export failed: {}", export_fault);
                }
            }
            Err(connect_fault) => {
                warn!(
                    "⚠️ [ENGINE]: Handshake failed ({}). Falling back to exported settings.",
                    connect_fault
                );
                client.import_settings().map_err(|import_fault| {
                    anyhow::anyhow!(
                        "no live server and no exported settings ({}); cannot start",
                        import_fault
                    )
                })?;
            }
        }

        let client = Arc::new(client);

        let game = client.game.clone().ok_or_else(|| anyhow::anyhow!("game info void"))?;
        let schedule = client
            .schedule
            .clone()
            .ok_or_else(|| anyhow::anyhow!("schedule info void"))?;

        let flag_pattern = Arc::new(Regex::new(&game.flag_format)?);

        let tick_duration = ChronoDuration::seconds(schedule.tick_duration as i64);
        let clock = TickClock::new(
            schedule.first_tick_start,
            tick_duration,
            tick_duration * schedule.network_open_tick as i32,
            tick_duration * schedule.total_ticks as i32,
        );

        // Calienta la caché local de attack data antes del primer tick.
        let _ = client.get_attack_data().await;

        // --- DAEMON DE DRENAJE DEL OUTBOX ---
        let outbox_relay = OutboxRelayService::new(client.clone(), store.clone());
        tokio::spawn(async move {
            outbox_relay.spawn_outbox_daemon().await;
        });

        // --- BUCLE DE TICKS ---
        let now = Utc::now();
        let delay_to_next_tick = (clock.next_tick_start(now) - now).to_std().unwrap_or_default();
        let tick_period = tick_duration.to_std().expect("FATAL: negative tick duration");

        let mut tick_ticker = interval_at(Instant::now() + delay_to_next_tick, tick_period);

        info!(
            "🗓️  [ENGINE]: First tick at {}. Tick duration {}s.",
            clock.next_tick_start(now).format("%H:%M:%S"),
            schedule.tick_duration
        );

        loop {
            tokio::select! {
                _ = tick_ticker.tick() => {
                    let tick_number = clock.tick_number(Utc::now());
                    info!("⚔️  [ENGINE]: Scheduling exploits for tick {}.", tick_number);
                    self.schedule_tick(client.clone(), store.clone(), flag_pattern.clone(), &game);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("👋 [ENGINE]: Thanks for using Avala!");
                    break;
                }
            }
        }

        Ok(())
    }

    /**
     * Planifica todos los trabajos de un tick y retorna de inmediato.
     * Los trabajos corren en segundo plano; un supervisor ejecuta el
     * hook 'after_all' cuando el último concluye.
     */
    fn schedule_tick(
        &self,
        client: Arc<ServerClient>,
        store: RaiderStore,
        flag_pattern: Arc<Regex>,
        game: &GameInfo,
    ) {
        if let Some(hook) = &self.before_all_hook {
            if let Err(hook_fault) = hook() {
                error!("❌ [ENGINE]: before_all hook collapsed: {}", hook_fault);
            }
        }

        // Long-poll compartido: todos los exploits AUTO del tick esperan
        // la misma resolución.
        let attack_data_future: SharedAttackData = {
            let poll_client = client.clone();
            async move { poll_client.wait_for_attack_data().await.ok() }
                .boxed()
                .shared()
        };

        let mut exploits = self.registered_exploits.clone();
        exploits.extend(reload_exploits(&self.exploit_directories));

        // En el bucle de ticks solo corren los exploits de combate.
        exploits.retain(|exploit| !exploit.config.draft);

        let (automatic_exploits, manual_exploits): (Vec<Exploit>, Vec<Exploit>) =
            exploits.into_iter().partition(|e| e.requires_flag_ids());

        let mut tick_job_handles: Vec<JoinHandle<()>> = Vec::new();

        // Los manuales primero: pueden disparar sin esperar flag ids.
        for exploit in manual_exploits {
            let targets = resolve_manual_targets(&exploit, game);
            if targets.is_empty() {
                warn!("🕳️  [ENGINE]: Exploit {} has no targets this tick.", exploit.config.alias);
                continue;
            }

            let protected_hosts = protected_hosts_for(&exploit.config.target_strategy, client.as_ref());

            tick_job_handles.push(spawn_manual_job(
                exploit,
                targets,
                client.clone(),
                store.clone(),
                flag_pattern.clone(),
                protected_hosts,
            ));
        }

        for exploit in automatic_exploits {
            tick_job_handles.push(spawn_automatic_job(
                exploit,
                attack_data_future.clone(),
                client.clone(),
                store.clone(),
                flag_pattern.clone(),
            ));
        }

        // Supervisor del tick: after_all tras el último trabajo.
        let after_all_hook = self.after_all_hook.clone();
        tokio::spawn(async move {
            for handle in tick_job_handles {
                let _ = handle.await;
            }

            if let Some(hook) = after_all_hook {
                if let Err(hook_fault) = hook() {
                    error!("❌ [ENGINE]: after_all hook collapsed: {}", hook_fault);
                }
            }
        });
    }

    /**
     * Corrida one-shot de los exploits en borrador (workshop): sin
     * retícula de ticks, sin supresión de huellas, reporte agregado.
     */
    pub async fn workshop(mut self) -> anyhow::Result<WorkshopOutcome> {
        let store_path = self.dot_directory.join("database.db");
        std::fs::create_dir_all(&self.dot_directory)?;
        let store = RaiderStore::connect(&store_path.to_string_lossy()).await?;

        self.validate_directories();

        let mut client = ServerClient::new(self.directives.clone(), self.dot_directory.clone())?;

        // El workshop prefiere los parámetros exportados para arrancar
        // sin tocar la red; sin ellos, handshake completo.
        if client.import_settings().is_err() {
            client.connect().await?;
            client.export_settings()?;
        }

        let client = Arc::new(client);
        let game = client.game.clone().ok_or_else(|| anyhow::anyhow!("game info void"))?;
        let flag_pattern = Arc::new(Regex::new(&game.flag_format)?);

        let attack_data = client.get_attack_data().await.ok();

        if let Some(hook) = &self.before_all_hook {
            if let Err(hook_fault) = hook() {
                error!("❌ [ENGINE]: before_all hook collapsed: {}", hook_fault);
            }
        }

        let mut exploits = self.registered_exploits.clone();
        exploits.extend(reload_exploits(&self.exploit_directories));
        exploits.retain(|exploit| exploit.config.draft);

        info!("🧪 [ENGINE]: Workshop run with {} draft exploits.", exploits.len());

        let mut aggregate_report = ExecutionReport::default();

        for exploit in exploits {
            let service_view = attack_data
                .as_ref()
                .and_then(|data| data.service(&exploit.config.service).ok());

            let targets = if exploit.requires_flag_ids() {
                service_view.as_ref().map(|view| view.targets()).unwrap_or_default()
            } else {
                resolve_manual_targets(&exploit, &game)
            };

            if targets.is_empty() {
                warn!("🕳️  [ENGINE]: Exploit {} has no targets.", exploit.config.alias);
                continue;
            }

            let report = run_exploit_batch(
                &exploit,
                &targets,
                service_view.as_ref().filter(|_| exploit.requires_flag_ids()),
                client.clone(),
                store.clone(),
                flag_pattern.clone(),
                &protected_hosts_for(&exploit.config.target_strategy, client.as_ref()),
            )
            .await;

            aggregate_report = {
                let mut merged = aggregate_report;
                merged.attacks_launched += report.attacks_launched;
                merged.flags_enqueued += report.flags_enqueued;
                merged.flags_stored_locally += report.flags_stored_locally;
                merged.timeouts += report.timeouts;
                merged
            };
        }

        if let Some(hook) = &self.after_all_hook {
            if let Err(hook_fault) = hook() {
                error!("❌ [ENGINE]: after_all hook collapsed: {}", hook_fault);
            }
        }

        Ok(WorkshopOutcome {
            report: aggregate_report,
        })
    }

    fn validate_directories(&mut self) {
        let mut valid_directories = Vec::new();

        for directory in &self.exploit_directories {
            if directory.is_dir() {
                valid_directories.push(directory.clone());
            } else {
                error!("❌ [ENGINE]: Directory not found: {}", directory.display());
            }
        }

        if !valid_directories.is_empty() {
            info!(
                "📂 [ENGINE]: Registered exploit directories: {}.",
                valid_directories
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        self.exploit_directories = valid_directories;
    }
}

/// Objetivos de un exploit que no depende de flag ids.
fn resolve_manual_targets(exploit: &Exploit, game: &GameInfo) -> Vec<String> {
    if let Some(hosts) = &exploit.config.target_hosts {
        return hosts.clone();
    }

    match exploit.config.target_strategy {
        TargetingStrategy::NopTeam => game.nop_team_ip.clone(),
        TargetingStrategy::OwnTeam => game.team_ip.clone(),
        TargetingStrategy::Auto => Vec::new(),
    }
}

/// Hosts vedados según la estrategia: los modos NOP/propio atacan
/// deliberadamente hosts que de otro modo estarían protegidos.
fn protected_hosts_for(strategy: &TargetingStrategy, client: &ServerClient) -> Vec<String> {
    match strategy {
        TargetingStrategy::NopTeam | TargetingStrategy::OwnTeam => Vec::new(),
        TargetingStrategy::Auto => client.protected_hosts(),
    }
}

/// Trabajo de un exploit con objetivos conocidos: delay + lotes datados.
fn spawn_manual_job(
    exploit: Exploit,
    targets: Vec<String>,
    client: Arc<ServerClient>,
    store: RaiderStore,
    flag_pattern: Arc<Regex>,
    protected_hosts: Vec<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let batches = match exploit.config.effective_batching() {
            Some(batching) => batching.split(&targets),
            None => vec![targets],
        };

        let gap = exploit
            .config
            .effective_batching()
            .map(|b| b.gap)
            .unwrap_or_default();

        let mut batch_handles = Vec::new();

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let batch_exploit = exploit.clone();
            let batch_client = client.clone();
            let batch_store = store.clone();
            let batch_pattern = flag_pattern.clone();
            let batch_protected = protected_hosts.clone();
            let batch_offset = exploit.config.effective_delay() + gap * batch_index as u32;

            batch_handles.push(tokio::spawn(async move {
                sleep(batch_offset).await;

                run_exploit_batch(
                    &batch_exploit,
                    &batch,
                    None,
                    batch_client,
                    batch_store,
                    batch_pattern,
                    &batch_protected,
                )
                .await;
            }));
        }

        for handle in batch_handles {
            let _ = handle.await;
        }
    })
}

/// Trabajo de un exploit dirigido por flag ids: espera el attack data.
fn spawn_automatic_job(
    exploit: Exploit,
    attack_data_future: SharedAttackData,
    client: Arc<ServerClient>,
    store: RaiderStore,
    flag_pattern: Arc<Regex>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(attack_data) = attack_data_future.await else {
            warn!(
                "🕳️  [ENGINE]: No attack data available; exploit {} skipped this tick.",
                exploit.config.alias
            );
            return;
        };

        let service_view = match attack_data.service(&exploit.config.service) {
            Ok(view) => view,
            Err(lookup_fault) => {
                warn!(
                    "🕳️  [ENGINE]: Service '{}' absent from attack data: {}",
                    exploit.config.service, lookup_fault
                );
                return;
            }
        };

        let targets = service_view.targets();
        if targets.is_empty() {
            warn!("🕳️  [ENGINE]: Exploit {} has no targets this tick.", exploit.config.alias);
            return;
        }

        let batches = match exploit.config.effective_batching() {
            Some(batching) => batching.split(&targets),
            None => vec![targets],
        };

        let gap = exploit
            .config
            .effective_batching()
            .map(|b| b.gap)
            .unwrap_or_default();

        let protected_hosts = protected_hosts_for(&exploit.config.target_strategy, client.as_ref());

        let mut batch_handles = Vec::new();

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let batch_exploit = exploit.clone();
            let batch_view = service_view.clone();
            let batch_client = client.clone();
            let batch_store = store.clone();
            let batch_pattern = flag_pattern.clone();
            let batch_protected = protected_hosts.clone();
            let batch_offset = exploit.config.effective_delay() + gap * batch_index as u32;

            batch_handles.push(tokio::spawn(async move {
                sleep(batch_offset).await;

                run_exploit_batch(
                    &batch_exploit,
                    &batch,
                    Some(&batch_view),
                    batch_client,
                    batch_store,
                    batch_pattern,
                    &batch_protected,
                )
                .await;
            }));
        }

        for handle in batch_handles {
            let _ = handle.await;
        }
    })
}

fn show_banner() {
    println!(
        "\x1b[34;1m
      ▄▀█ █ █ ▄▀█ █   ▄▀█
      █▀█ ▀▄▀ █▀█ █▄▄ █▀█
    \x1b[0m  tick-aligned attack agent
"
    );
}
