// [apps/orchestrator/src/kernel.rs]
/**
 * =================================================================
 * APARATO: ORCHESTRATOR SOVEREIGN KERNEL (V4.2 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * Ledger, broker (con recuperación de huérfanos), bus de eventos,
 * daemons del conducto y el transporte HTTP. Los adaptadores del
 * verificador y del fetcher son colaboradores explícitos inyectados
 * en la ignición; no existen singletons globales.
 * =================================================================
 */

use crate::adapters::{AttackDataProvider, CheckerBinding};
use crate::config::AvalaConfig;
use crate::routes::create_sovereign_router;
use crate::services::{
    AttackDataRefresherService, PersisterService, RatesMonitorService, SubmitterService,
    TickAnnouncerService,
};
use crate::state::AppState;
use avala_infra_db::LedgerClient;
use avala_infra_mq::{BrokerConnection, DurableQueue, PERSISTING_QUEUE, SUBMISSION_QUEUE};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct OrchestratorKernel {
    pub application_shared_state: AppState,
}

impl OrchestratorKernel {
    /**
     * Realiza la ignición del Ledger, el broker y el estado neural.
     *
     * # Errors:
     * Cualquier fallo aquí es fatal de configuración/conexión; el
     * binario lo proyecta a exit 1.
     */
    pub async fn ignite(config: AvalaConfig) -> anyhow::Result<Self> {
        let shared_config = Arc::new(config);

        let ledger_client = LedgerClient::connect(&shared_config.database.path).await?;
        let broker = BrokerConnection::connect(&shared_config.broker.path).await?;

        // Declaración temprana de colas + recuperación de entregas
        // huérfanas de un proceso difunto (redelivery tras reinicio).
        for routing_key in [SUBMISSION_QUEUE, PERSISTING_QUEUE] {
            let queue = DurableQueue::declare(broker.open_channel()?, routing_key).await?;
            queue.recover_orphans().await?;
        }

        Ok(Self {
            application_shared_state: AppState::new(shared_config, ledger_client, broker),
        })
    }

    /**
     * Lanza los daemons del conducto y el servidor HTTP principal.
     * Bloquea hasta la señal de terminación del host (exit 0).
     */
    pub async fn launch_sovereign_operations(
        self,
        checker_binding: Option<CheckerBinding>,
        attack_data_provider: Option<Arc<dyn AttackDataProvider>>,
    ) -> anyhow::Result<()> {
        let shared_application_state = self.application_shared_state;

        // --- 1. ANUNCIADOR DE TICKS (Pulso del Juego) ---
        let state_ref = shared_application_state.clone();
        tokio::spawn(async move {
            TickAnnouncerService::new(state_ref).spawn_announcer_daemon().await;
        });

        // --- 2. REFRESHER DE ATTACK DATA (Por Tick) ---
        match attack_data_provider {
            Some(provider) => {
                let state_ref = shared_application_state.clone();
                tokio::spawn(async move {
                    AttackDataRefresherService::new(state_ref, provider)
                        .spawn_refresher_daemon()
                        .await;
                });
            }
            None => {
                warn!("⚠️ [KERNEL]: No attack data provider bound. Refresher not started.");
            }
        }

        // --- 3. SUBMITTER (Estrategia Configurada) ---
        let submitter = SubmitterService::new(shared_application_state.clone(), checker_binding);
        if submitter.ready {
            tokio::spawn(async move {
                submitter.start().await;
            });
        } else {
            // El proceso sigue vivo para que el operador corrija en caliente.
            error!("🛑 [KERNEL]: Submitter not ready; flags will accumulate in the submission queue.");
        }

        // --- 4. PERSISTER (Veredictos -> Ledger) ---
        let state_ref = shared_application_state.clone();
        tokio::spawn(async move {
            PersisterService::new(state_ref).spawn_persister_daemon().await;
        });

        // --- 5. MONITOR DE TASAS (Dashboard) ---
        let state_ref = shared_application_state.clone();
        tokio::spawn(async move {
            RatesMonitorService::new(state_ref).spawn_rates_daemon().await;
        });

        // --- 6. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let server_config = &shared_application_state.config.server;
        let bind_address = SocketAddr::new(
            server_config.host.parse::<IpAddr>()?,
            server_config.port,
        );

        let sovereign_router = create_sovereign_router(shared_application_state.clone());

        info!("🚀 [ORCHESTRATOR_ONLINE]: System fully operational on {}.", bind_address);

        let listener = tokio::net::TcpListener::bind(bind_address).await?;

        axum::serve(
            listener,
            sovereign_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("🏁 [KERNEL]: Termination requested. Sealing current strata...");
        })
        .await?;

        info!("🏁 [KERNEL]: Shutdown sequence concluded. Orchestrator offline.");
        Ok(())
    }
}
