// [libs/infra/uplink/src/errors.rs]
/*!
 * =================================================================
 * APARATO: UPLINK ERROR CATALOG (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL TÚNEL HTTP
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UplinkError {
    /// Fallo físico de red o de protocolo en el enlace.
    #[error("[L3_UPLINK_NET_FAULT]: LINK_SEVERED -> {0}")]
    NetworkFault(#[from] reqwest::Error),

    /// El Orchestrator rechazó la petición (credenciales, mantenimiento).
    #[error("[L3_UPLINK_FAULT]: SERVER_REJECTION -> {0}")]
    ServerRejection(String),

    /// El servidor aún no dispone de attack data (HTTP 202).
    #[error("[L3_UPLINK_FAULT]: ATTACK_DATA_NOT_FETCHED")]
    AttackDataNotFetched,

    /// Fallo de E/S sobre el directorio de trabajo local.
    #[error("[L3_UPLINK_IO_FAULT]: {0}")]
    IoFault(#[from] std::io::Error),

    /// El payload recibido o cacheado no respeta el contrato de dominio.
    #[error("[L3_UPLINK_FAULT]: PAYLOAD_DRIFT -> {0}")]
    PayloadDrift(String),

    /// Operación solicitada sin handshake previo con el servidor.
    #[error("[L3_UPLINK_FAULT]: NOT_CONNECTED")]
    NotConnected,
}
