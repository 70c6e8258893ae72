// [libs/domain/models/src/telemetry.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY DOMAIN MODELS (V4.2)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: SEÑALES EN TIEMPO REAL PARA EL DASHBOARD
 *
 * # Mathematical Proof (Signal Propagation):
 * Los eventos son deltas, no snapshots: el Dashboard reconstruye los
 * contadores absolutos por integración. La pérdida de un evento degrada
 * la precisión visual pero nunca el Ledger Táctico.
 * =================================================================
 */

use crate::flag::FlagCounterDelta;
use serde::{Deserialize, Serialize};

/// Ráfaga de intake observada: quién entregó qué, contra quién.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFlagsEvent {
    pub target: String,
    pub exploit: String,
    pub player: String,
    pub enqueued: usize,
    pub duplicates: usize,
}

/// Muestra de caudal del broker agregada por segundo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRatesSample {
    pub retrieved_per_second: i64,
    pub submitted_per_second: i64,
    /// Marca HH:MM:SS para el eje temporal del Dashboard.
    pub timestamp: String,
}

/// Señales difundidas por el bus de eventos del Orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum RealTimeEvent {
    /// Delta de contadores del conducto de banderas.
    FlagCounters(FlagCounterDelta),
    /// Ráfaga de intake recién aceptada.
    IncomingFlags(IncomingFlagsEvent),
    /// Caudal por segundo de las colas del broker.
    QueueRates(QueueRatesSample),
}
