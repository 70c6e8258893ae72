// [apps/orchestrator/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: NEURAL EVENT BUS SERVICE (V4.2 - BROADCASTER MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN SOBERANA DE SEÑALES DEL CONDUCTO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BEST EFFORT: Sin suscriptores, la señal se descarta en silencio;
 *    el bus jamás bloquea ni persiste. El Ledger es la única verdad.
 * 2. DISPATCH MONITORING: Analiza el conteo de suscriptores en cada
 *    ráfaga para detectar estados de 'Ceguera de Mando'.
 *
 * # Mathematical Proof (Signal Propagation):
 * El Bus garantiza un tiempo de despacho O(1) independientemente del
 * número de receptores. La pérdida de un suscriptor no afecta el
 * determinismo del reactor asíncrono principal (Lock-Free Emission).
 * =================================================================
 */

use avala_domain_models::{FlagCounterDelta, IncomingFlagsEvent, QueueRatesSample, RealTimeEvent};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacidad del canal de difusión soberano.
/// Sintonizada para absorber ráfagas de intake sin disparar 'Lagging'.
const SOVEREIGN_CHANNEL_CAPACITY: usize = 4096;

/**
 * Orquestador central de señales en tiempo real del conducto.
 */
#[derive(Debug)]
pub struct EventBus {
    internal_transmission_channel: broadcast::Sender<RealTimeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SOVEREIGN_CHANNEL_CAPACITY);
        Self {
            internal_transmission_channel: sender,
        }
    }

    /// Genera un nuevo receptor para el Dashboard o el monitor de tasas.
    pub fn subscribe(&self) -> broadcast::Receiver<RealTimeEvent> {
        self.internal_transmission_channel.subscribe()
    }

    /// Delta de contadores del conducto (intake y envío).
    pub fn emit_flag_counters(&self, delta: FlagCounterDelta) {
        self.dispatch_event_sovereign(RealTimeEvent::FlagCounters(delta));
    }

    /// Ráfaga de intake recién aceptada.
    pub fn emit_incoming_flags(&self, event: IncomingFlagsEvent) {
        self.dispatch_event_sovereign(RealTimeEvent::IncomingFlags(event));
    }

    /// Muestra de caudal de colas agregada por segundo.
    pub fn emit_queue_rates(&self, sample: QueueRatesSample) {
        self.dispatch_event_sovereign(RealTimeEvent::QueueRates(sample));
    }

    /**
     * Motor interno de despacho con auditoría de congestión.
     *
     * # Errors:
     * Sin suscriptores activos el canal devuelve error; se interpreta
     * como silencio nominal y el mensaje se descarta.
     */
    fn dispatch_event_sovereign(&self, event_artifact: RealTimeEvent) {
        match self.internal_transmission_channel.send(event_artifact) {
            Ok(subscriber_count) => {
                trace!("📡 [EVENT_BUS]: Signal broadcasted to {} active links.", subscriber_count);
            }
            Err(_) => {
                // Silencio nominal: Sin operadores visualizando el Dashboard.
                trace!("💤 [EVENT_BUS]: Signal discarded. No active links.");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
