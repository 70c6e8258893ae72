// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: GALVANIC AUTHENTICATION GUARD (V4.2)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN HTTP BASIC E INYECCIÓN DE IDENTIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. OPEN MODE: Sin contraseña configurada, todo llamador es admitido
 *    con un principal sintetizado desde su dirección de red.
 * 2. EXTENSION INJECTION: Inyecta 'Principal' en el flujo asíncrono de
 *    la petición; el intake lo usa como atributo 'player' de la bandera.
 * =================================================================
 */

use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use std::net::SocketAddr;
use tracing::{debug, warn};

/// Identidad soberana extraída del túnel de seguridad.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Nombre del jugador; atributo 'player' de toda bandera entregada.
    pub username: String,
}

/// Credenciales decodificadas de una cabecera 'Authorization: Basic'.
fn decode_basic_credentials(request: &Request) -> Option<(String, String)> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let encoded_material = header_value.strip_prefix("Basic ")?;
    let decoded_bytes = BASE64_STANDARD.decode(encoded_material).ok()?;
    let decoded_pair = String::from_utf8(decoded_bytes).ok()?;

    let (username, password) = decoded_pair.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn peer_address_label(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/**
 * Guardia de Autenticación: el portero soberano del conducto.
 *
 * # Logic:
 * 1. Contraseña sin configurar -> principal sintetizado 'someone_at_<ip>'.
 * 2. Contraseña correcta -> el username Basic es el principal.
 * 3. En otro caso -> 401 Unauthorized con rastro forense.
 */
pub async fn auth_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_password) = application_state.config.server.password.clone() else {
        let synthesized_principal = format!("someone_at_{}", peer_address_label(&request));
        debug!("🔓 [AUTH]: Open mode. Admitting {}.", synthesized_principal);

        request.extensions_mut().insert(Principal {
            username: synthesized_principal,
        });
        return Ok(next.run(request).await);
    };

    let Some((username, password)) = decode_basic_credentials(&request) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if password != expected_password {
        warn!(
            "❌ [AUTH_REJECTION]: Invalid password attempt from {}. Username: {}. Path: {}.",
            peer_address_label(&request),
            username,
            request.uri().path()
        );
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(Principal { username });
    Ok(next.run(request).await)
}
