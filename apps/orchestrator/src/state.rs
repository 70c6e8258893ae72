// [apps/orchestrator/src/state.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V4.2)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ESTRATOS, REPOSITORIOS Y SEÑALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza el rastro del Ledger, el broker, el
 *    bus de eventos y el reloj de ticks para todos los daemons y
 *    handlers HTTP.
 * 2. ONE-SHOT SIGNAL: La señal de attack data es un canal 'watch'; los
 *    handlers de long-poll despiertan con cada decisión del refresher,
 *    haya o no payload nuevo.
 *
 * # Mathematical Proof (Deterministic State Hub):
 * Todo estado mutable durable vive en el Ledger o en el broker; este
 * contenedor solo transporta clientes clonables y señales. Clonar el
 * AppState es O(1) y no duplica estado.
 * =================================================================
 */

use crate::config::AvalaConfig;
use crate::services::event_bus::EventBus;
use avala_domain_models::TickClock;
use avala_infra_db::{FlagRepository, LedgerClient, StateRepository};
use avala_infra_mq::BrokerConnection;
use std::sync::Arc;
use tokio::sync::watch;

/// Contenedor de estado compartido (Thread-Safe) para el Orchestrator.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AvalaConfig>,
    /// Oráculo puro del calendario del juego.
    pub clock: TickClock,
    /// Cliente táctico del Ledger de banderas.
    pub ledger_client: LedgerClient,
    /// Motor de colas durables del conducto.
    pub broker: BrokerConnection,
    /// Bus de difusión de señales en tiempo real al Dashboard.
    pub event_bus: Arc<EventBus>,
    /// Señal one-shot de "attack data decidido" para los long-polls.
    attack_data_signal: Arc<watch::Sender<u64>>,
}

impl AppState {
    pub fn new(config: Arc<AvalaConfig>, ledger_client: LedgerClient, broker: BrokerConnection) -> Self {
        let clock = config.game.clock();
        let (signal_sender, _) = watch::channel(0u64);

        Self {
            config,
            clock,
            ledger_client,
            broker,
            event_bus: Arc::new(EventBus::new()),
            attack_data_signal: Arc::new(signal_sender),
        }
    }

    pub fn flag_repository(&self) -> FlagRepository {
        FlagRepository::new(self.ledger_client.clone())
    }

    pub fn state_repository(&self) -> StateRepository {
        StateRepository::new(self.ledger_client.clone())
    }

    /// Receptor fresco de la señal de attack data para un long-poll.
    pub fn subscribe_attack_data_signal(&self) -> watch::Receiver<u64> {
        self.attack_data_signal.subscribe()
    }

    /// Despierta a todos los suscriptores tras la decisión del refresher.
    pub fn announce_attack_data_decision(&self) {
        self.attack_data_signal.send_modify(|generation| *generation += 1);
    }
}
