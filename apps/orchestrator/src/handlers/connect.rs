// [apps/orchestrator/src/handlers/connect.rs]
/*!
 * =================================================================
 * APARATO: CONNECT HANDLERS (V4.2)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: HANDSHAKE DEL RAIDER (SALUD, JUEGO, CALENDARIO)
 * =================================================================
 */

use crate::state::AppState;
use avala_domain_models::{GameInfo, ScheduleInfo};
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Ping de vida. La autenticación ocurre en el guardia perimetral.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn game(State(application_state): State<AppState>) -> Json<GameInfo> {
    let game_config = &application_state.config.game;

    Json(GameInfo {
        flag_format: game_config.flag_format.clone(),
        team_ip: game_config.team_ip.clone(),
        nop_team_ip: game_config.nop_team_ip.clone(),
    })
}

pub async fn schedule(State(application_state): State<AppState>) -> Json<ScheduleInfo> {
    let clock = &application_state.clock;

    Json(ScheduleInfo {
        first_tick_start: clock.first_tick_start(),
        tick_duration: application_state.config.game.tick_duration,
        network_open_tick: clock.network_open_tick(),
        total_ticks: clock.game_ends_at_tick(),
        // Todo el calendario se expresa en UTC.
        tz: "UTC".to_string(),
    })
}
