// [libs/infra/mq/src/connection.rs]
/*!
 * =================================================================
 * APARATO: BROKER CONNECTION (V4.2 - MEMORY ANCHORED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DE ENLACES Y CANALES DEL BROKER
 *
 * Cada consumidor del conducto abre su propio canal (una conexión
 * libSQL independiente); el estado de entrega vive en las tablas de
 * cola, por lo que un canal caído jamás pierde mensajes confirmables.
 * =================================================================
 */

use crate::errors::MqError;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct BrokerConnection {
    internal_broker_driver: Arc<Database>,
    /// Mantiene el broker vivo en memoria evitando que SQLite lo purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl BrokerConnection {
    #[instrument]
    pub async fn connect(broker_path: &str) -> Result<Self, MqError> {
        if broker_path.is_empty() {
            return Err(MqError::ConnectionError("CRITICAL_FAULT: BROKER_PATH_UNDEFINED".into()));
        }

        info!("🐇 [BROKER]: Initiating queue engine link to [{}]", broker_path);

        let is_memory = broker_path.contains(":memory:") || broker_path.contains("mode=memory");

        let broker_driver = Builder::new_local(broker_path)
            .build()
            .await
            .map_err(|e| MqError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {}", e)))?;

        let shared_driver = Arc::new(broker_driver);
        let mut anchor = None;

        if is_memory {
            let anchor_connection = shared_driver
                .connect()
                .map_err(|e| MqError::ConnectionError(format!("ANCHOR_FAULT: {}", e)))?;
            anchor = Some(Arc::new(anchor_connection));
            info!("⚓ [BROKER]: Memory strata solidified and anchored.");
        }

        Ok(Self {
            internal_broker_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    /// Abre un canal independiente. Cada consumidor posee el suyo.
    pub fn open_channel(&self) -> Result<Connection, MqError> {
        self.internal_broker_driver.connect().map_err(|e| {
            error!("⚠️ [BROKER_FAULT]: Channel allocation failed: {}", e);
            MqError::ConnectionError(e.to_string())
        })
    }
}
