// [libs/infra/mq/src/errors.rs]
/*!
 * =================================================================
 * APARATO: BROKER ERROR CATALOG (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL BROKER
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MqError {
    /// Error de enlace físico con el motor del broker o ruta inválida.
    #[error("[L3_MQ_NET_FAULT]: BROKER_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// La clave de ruteo contiene caracteres fuera del alfabeto permitido.
    #[error("[L3_MQ_FAULT]: ROUTING_KEY_REJECTED -> {0}")]
    InvalidRoutingKey(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_MQ_QUERY_FAULT]: QUEUE_OPERATION_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),
}
