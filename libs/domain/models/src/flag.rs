// [libs/domain/models/src/flag.rs]
/*!
 * =================================================================
 * APARATO: FLAG DOMAIN MODELS (V4.2 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE CONTRATOS SOBERANOS DE BANDERAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATE MACHINE PURITY: El ciclo de vida de una bandera es un enum
 *    cerrado (queued -> accepted | rejected). Ningún estrato puede
 *    fabricar estados intermedios.
 * 2. WIRE PARITY: 'FlagSubmissionResponse' viaja como JSON plano entre
 *    el Submitter y el Persister a través de la cola de persistencia.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta en todos los campos.
 *
 * # Mathematical Proof (Lifecycle Immutability):
 * 'FlagRecord.value' es la clave primaria lógica del juego completo. La
 * unicidad del valor lineariza la deduplicación de intake; la transición
 * de estado ocurre exactamente una vez porque el Persister solo muta
 * filas cuyo estado actual es 'queued'.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estados del ciclo de vida de una bandera en el Ledger Táctico.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlagStatus {
    /// Capturada y en tránsito por el conducto de envío.
    Queued,
    /// Certificada como válida por el verificador del juego.
    Accepted,
    /// Denegada por el verificador del juego (vieja, propia, inválida).
    Rejected,
}

impl FlagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagStatus::Queued => "queued",
            FlagStatus::Accepted => "accepted",
            FlagStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(FlagStatus::Queued),
            "accepted" => Some(FlagStatus::Accepted),
            "rejected" => Some(FlagStatus::Rejected),
            _ => None,
        }
    }
}

/// Veredicto del verificador sobre una bandera individual.
///
/// A diferencia de `FlagStatus`, este contrato admite `Requeued`: el
/// verificador no pudo decidir y la bandera debe regresar a la cola.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Accepted,
    Rejected,
    Requeued,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Requeued => "requeued",
        }
    }
}

/// Tripleta de respuesta del verificador: (valor, estado, respuesta cruda).
/// Es el mensaje que viaja por la cola de persistencia.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagSubmissionResponse {
    pub value: String,
    pub status: SubmissionStatus,
    pub response: String,
}

impl FlagSubmissionResponse {
    pub fn new(value: impl Into<String>, status: SubmissionStatus, response: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status,
            response: response.into(),
        }
    }

    /// Estado final persistible. `Requeued` no tiene proyección en el Ledger.
    pub fn terminal_status(&self) -> Option<FlagStatus> {
        match self.status {
            SubmissionStatus::Accepted => Some(FlagStatus::Accepted),
            SubmissionStatus::Rejected => Some(FlagStatus::Rejected),
            SubmissionStatus::Requeued => None,
        }
    }
}

/// Fila soberana de la tabla `flags` del Ledger Táctico.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRecord {
    /// Identificador interno de la fila (UUID v4).
    pub id: String,
    /// Valor de la bandera. Único durante la vida completa del juego.
    pub value: String,
    /// Alias del exploit que la capturó.
    pub exploit: String,
    /// Principal autenticado que la entregó.
    pub player: String,
    /// Tick de captura.
    pub tick: i64,
    /// IP u hostname del equipo atacado.
    pub target: String,
    /// Instante de intake.
    pub timestamp: DateTime<Utc>,
    pub status: FlagStatus,
    /// Respuesta cruda del verificador. Nula mientras la fila está en `queued`.
    pub response: Option<String>,
}

/// Delta de contadores emitido por el bus de eventos tras cada operación
/// del conducto (intake, envío). Consumido por el monitor de tasas.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagCounterDelta {
    pub queued: i64,
    pub discarded: i64,
    pub accepted: i64,
    pub rejected: i64,
}
