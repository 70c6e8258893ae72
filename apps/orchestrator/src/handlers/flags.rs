// [apps/orchestrator/src/handlers/flags.rs]
/*!
 * =================================================================
 * APARATO: FLAG INTAKE HANDLERS (V4.2 - DEDUP MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: INTAKE DEDUPLICADO Y AGREGADOS DEL DASHBOARD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DEDUP LINEARIZED: La unicidad de 'value' en el Ledger decide qué
 *    banderas entran al conducto; los duplicados se cuentan y se
 *    descartan sin error.
 * 2. BEST-EFFORT PUBLISH: Un fallo de publicación en el broker deja la
 *    fila en 'queued' con rastro de error; la petición no se revierte
 *    (el Raider no re-enviará un valor ya reconocido).
 * 3. TTL POLICY: Cada mensaje publica con expiración
 *    flag_ttl (ticks) x tick_duration, en milisegundos.
 * =================================================================
 */

use crate::middleware::Principal;
use crate::state::AppState;
use avala_domain_models::{FlagCounterDelta, FlagEnqueueRequest, FlagEnqueueResponse, IncomingFlagsEvent};
use avala_infra_mq::{DurableQueue, SUBMISSION_QUEUE};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};

/**
 * POST /flags/queue — intake de una ráfaga de banderas capturadas.
 */
pub async fn enqueue(
    State(application_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request_body): Json<FlagEnqueueRequest>,
) -> Result<Json<FlagEnqueueResponse>, (StatusCode, String)> {
    perform_intake(&application_state, &request_body, &principal.username)
        .await
        .map(Json)
        .map_err(|intake_fault| {
            error!("❌ [INTAKE]: Ledger transaction collapsed: {}", intake_fault);
            (StatusCode::INTERNAL_SERVER_ERROR, intake_fault.to_string())
        })
}

/**
 * Núcleo del intake, independiente del transporte HTTP.
 *
 * Deduplica contra el Ledger, publica con TTL en la cola de envío
 * (best effort) y emite los deltas de contadores.
 */
pub async fn perform_intake(
    application_state: &AppState,
    request_body: &FlagEnqueueRequest,
    principal_name: &str,
) -> anyhow::Result<FlagEnqueueResponse> {
    let now = Utc::now();
    let current_tick = application_state.clock.tick_number(now);

    // 1. DEDUPLICACIÓN + INSERCIÓN TRANSACCIONAL EN EL LEDGER
    let (enqueued_values, discarded_count) = application_state
        .flag_repository()
        .intake_batch(
            &request_body.values,
            &request_body.exploit,
            &request_body.target,
            current_tick,
            principal_name,
            now,
        )
        .await?;

    // 2. PUBLICACIÓN EN LA COLA DE ENVÍO (BEST EFFORT)
    let message_ttl_milliseconds = application_state.config.game.flag_ttl_milliseconds();

    match open_submission_queue(application_state).await {
        Ok(submission_queue) => {
            for value in &enqueued_values {
                if let Err(publish_fault) = submission_queue.put(value, Some(message_ttl_milliseconds)).await {
                    // La fila permanece 'queued' en el Ledger; solo rastro.
                    error!("❌ [INTAKE]: Broker publish failed for {}: {}", value, publish_fault);
                }
            }
        }
        Err(broker_fault) => {
            error!(
                "❌ [INTAKE]: Broker unreachable, {} flags remain queued in the ledger only: {}",
                enqueued_values.len(),
                broker_fault
            );
        }
    }

    // 3. SEÑALES PARA EL DASHBOARD
    application_state.event_bus.emit_flag_counters(FlagCounterDelta {
        queued: enqueued_values.len() as i64,
        discarded: discarded_count as i64,
        accepted: 0,
        rejected: 0,
    });

    application_state.event_bus.emit_incoming_flags(IncomingFlagsEvent {
        target: request_body.target.clone(),
        exploit: request_body.exploit.clone(),
        player: principal_name.to_string(),
        enqueued: enqueued_values.len(),
        duplicates: discarded_count,
    });

    info!(
        "📥 [INTAKE]: {} flags from {} via {} by {} ({} new, {} duplicates).",
        request_body.values.len(),
        request_body.target,
        request_body.exploit,
        principal_name,
        enqueued_values.len(),
        discarded_count
    );

    Ok(FlagEnqueueResponse {
        enqueued: enqueued_values.len(),
        discarded: discarded_count,
    })
}

async fn open_submission_queue(application_state: &AppState) -> anyhow::Result<DurableQueue> {
    let channel = application_state.broker.open_channel()?;
    Ok(DurableQueue::declare(channel, SUBMISSION_QUEUE).await?)
}

/**
 * GET /flags/db-stats — volúmenes globales para el Dashboard.
 */
pub async fn db_stats(
    State(application_state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let repository = application_state.flag_repository();
    let current_tick = application_state.clock.tick_number(Utc::now());

    let current_tick_flags = repository.count_for_tick(current_tick).await;
    let last_tick_flags = repository.count_for_tick(current_tick - 1).await;
    let manually_submitted = repository.count_manual().await;
    let total_flags = repository.count_total().await;

    match (current_tick_flags, last_tick_flags, manually_submitted, total_flags) {
        (Ok(current), Ok(last), Ok(manual), Ok(total)) => Ok(Json(json!({
            "current_tick": current,
            "last_tick": last,
            "manual": manual,
            "total": total,
        }))),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "ledger aggregate failed".to_string())),
    }
}

/**
 * GET /flags/tick-stats — serie (tick, aceptadas) desde el tick 1.
 */
pub async fn tick_stats(
    State(application_state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let repository = application_state.flag_repository();
    let current_tick = application_state.clock.tick_number(Utc::now());

    let history = repository
        .accepted_history()
        .await
        .map_err(|db_fault| (StatusCode::INTERNAL_SERVER_ERROR, db_fault.to_string()))?;

    let history_index: std::collections::HashMap<i64, i64> = history.into_iter().collect();

    let series: Vec<Value> = (1..=current_tick)
        .map(|tick| {
            json!({
                "tick": tick,
                "accepted": history_index.get(&tick).copied().unwrap_or(0),
            })
        })
        .collect();

    Ok(Json(json!(series)))
}
