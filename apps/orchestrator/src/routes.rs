// [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V4.2)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA HTTP DEL CENTRO DE COORDINACIÓN
 *
 * Topología:
 * 1. /connect/ (wildcard)      — handshake del Raider (salud, juego, calendario).
 * 2. /flags/ (wildcard)        — intake deduplicado + agregados del Dashboard.
 * 3. /attack-data/ (wildcard) — payload vigente y suscripción long-poll.
 * Todo pasa por el guardia Basic; el frontend estático es opcional.
 * =================================================================
 */

use crate::handlers::{attack_data, connect, flags};
use crate::middleware::auth_guard;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

pub fn create_sovereign_router(application_state: AppState) -> Router {
    // Escudo de Red: CORS para el Dashboard y herramientas de Ops.
    let cors_origins = &application_state.config.server.cors;

    let network_security_shield = if cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(Duration::from_secs(3600))
    } else {
        let parsed_origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| origin.parse::<HeaderValue>().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(parsed_origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(Duration::from_secs(3600))
    };

    // ESTRATO DE HANDSHAKE (Raider bootstrap)
    let connect_stratum = Router::new()
        .route("/health", get(connect::health))
        .route("/game", get(connect::game))
        .route("/schedule", get(connect::schedule));

    // ESTRATO TÁCTICO (Conducto de banderas)
    let flags_stratum = Router::new()
        .route("/queue", post(flags::enqueue))
        .route("/db-stats", get(flags::db_stats))
        .route("/tick-stats", get(flags::tick_stats));

    // ESTRATO DE ATTACK DATA (Long-Poll)
    let attack_data_stratum = Router::new()
        .route("/current", get(attack_data::current))
        .route("/subscribe", get(attack_data::subscribe));

    let mut sovereign_router = Router::new()
        .nest("/connect", connect_stratum)
        .nest("/flags", flags_stratum)
        .nest("/attack-data", attack_data_stratum)
        .layer(middleware::from_fn_with_state(application_state.clone(), auth_guard));

    // Gateway de archivos estáticos del Dashboard (opcional).
    if application_state.config.server.frontend {
        info!("🖥️  [ROUTER]: Serving frontend from static/dist.");
        sovereign_router = sovereign_router.fallback_service(ServeDir::new("static/dist"));
    }

    sovereign_router
        .layer(network_security_shield)
        .with_state(application_state)
}
