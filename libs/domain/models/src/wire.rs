// [libs/domain/models/src/wire.rs]
/*!
 * =================================================================
 * APARATO: WIRE PROTOCOL CONTRACTS (V4.2)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DTOs DEL TÚNEL HTTP RAIDER <-> ORCHESTRATOR
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cuerpo de `POST /flags/queue`: lote de banderas capturadas por un exploit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagEnqueueRequest {
    pub values: Vec<String>,
    pub exploit: String,
    pub target: String,
}

/// Respuesta de intake: cuántas banderas entraron al conducto y cuántas
/// eran duplicados ya conocidos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagEnqueueResponse {
    pub enqueued: usize,
    pub discarded: usize,
}

/// Parámetros del juego publicados en `GET /connect/game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    /// Expresión regular que reconoce banderas en la salida de un exploit.
    pub flag_format: String,
    pub team_ip: Vec<String>,
    pub nop_team_ip: Vec<String>,
}

/// Calendario del juego publicado en `GET /connect/schedule`.
/// Suficiente para que el Raider alinee su propio reloj de ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub first_tick_start: DateTime<Utc>,
    /// Duración del tick en segundos.
    pub tick_duration: u64,
    pub network_open_tick: i64,
    pub total_ticks: i64,
    /// Zona horaria IANA del servidor.
    pub tz: String,
}
