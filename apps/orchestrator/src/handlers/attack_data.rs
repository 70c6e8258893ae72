// [apps/orchestrator/src/handlers/attack_data.rs]
/*!
 * =================================================================
 * APARATO: ATTACK DATA HANDLERS (V4.2 - LONG POLL)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DEL PAYLOAD VIGENTE Y SUSCRIPCIÓN
 *
 * 'subscribe' suspende al llamador hasta la próxima decisión del
 * refresher (payload nuevo o reutilizado) y entonces responde igual
 * que 'current'. Sin payload adquirido jamás: HTTP 202.
 * =================================================================
 */

use crate::state::AppState;
use avala_infra_db::repositories::state::ATTACK_DATA_KEY;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

async fn read_current_payload(application_state: &AppState) -> Result<Option<Value>, (StatusCode, String)> {
    let stored_payload = application_state
        .state_repository()
        .get(ATTACK_DATA_KEY)
        .await
        .map_err(|db_fault| {
            error!("❌ [ATTACK_DATA]: State read collapsed: {}", db_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, db_fault.to_string())
        })?;

    match stored_payload {
        Some(raw_payload) => {
            let parsed: Value = serde_json::from_str(&raw_payload)
                .map_err(|decode_fault| (StatusCode::INTERNAL_SERVER_ERROR, decode_fault.to_string()))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn respond(payload: Option<Value>) -> (StatusCode, Json<Value>) {
    match payload {
        Some(attack_data) => (StatusCode::OK, Json(attack_data)),
        None => (
            StatusCode::ACCEPTED,
            Json(json!({ "detail": "Attack data not fetched yet." })),
        ),
    }
}

/**
 * GET /attack-data/current — el payload vigente o 202.
 */
pub async fn current(
    State(application_state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    let payload = read_current_payload(&application_state).await?;
    Ok(respond(payload))
}

/**
 * GET /attack-data/subscribe — long-poll hasta la próxima decisión.
 */
pub async fn subscribe(
    State(application_state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    let mut signal_receiver = application_state.subscribe_attack_data_signal();

    // Suspensión hasta que el refresher tome su próxima decisión.
    if signal_receiver.changed().await.is_err() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "attack data signal channel closed".to_string(),
        ));
    }

    let payload = read_current_payload(&application_state).await?;
    Ok(respond(payload))
}
