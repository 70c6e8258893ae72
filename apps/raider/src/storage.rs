// [apps/raider/src/storage.rs]
/*!
 * =================================================================
 * APARATO: RAIDER LOCAL STORE (V4.2 - OUTBOX & LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3-WORKER)
 * RESPONSABILIDAD: PERSISTENCIA LOCAL DEL AGENTE (libSQL)
 *
 * Tres estratos:
 * 1. 'hashes'        — ledger de huellas (alias || target || flag_ids)
 *    de ataques ya ejecutados con éxito.
 * 2. 'objects'       — almacén clave-blob para estado de usuario entre
 *    ticks (valores JSON serializados).
 * 3. 'pending_flags' — outbox de banderas capturadas durante caídas
 *    del servidor; 'submitted' sella el drenaje exitoso.
 * =================================================================
 */

use libsql::{params, Builder, Connection, Database};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("[L3_STORE_NET_FAULT]: LOCAL_STORE_SEVERED -> {0}")]
    ConnectionError(String),

    #[error("[L3_STORE_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    #[error("[L3_STORE_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),
}

const LOCAL_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS hashes (
        value TEXT PRIMARY KEY
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS objects (
        key TEXT PRIMARY KEY,
        value BLOB
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pending_flags (
        value TEXT PRIMARY KEY,
        target TEXT NOT NULL,
        alias TEXT NOT NULL,
        submitted INTEGER NOT NULL DEFAULT 0
    );
    "#,
];

#[derive(Clone)]
pub struct RaiderStore {
    internal_database_driver: Arc<Database>,
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl RaiderStore {
    pub async fn connect(store_path: &str) -> Result<Self, StoreError> {
        let is_memory = store_path.contains(":memory:");

        let database_driver = Builder::new_local(store_path)
            .build()
            .await
            .map_err(|e| StoreError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {}", e)))?;

        let shared_driver = Arc::new(database_driver);

        let bootstrap_connection = shared_driver
            .connect()
            .map_err(|e| StoreError::ConnectionError(format!("BOOTSTRAP_LINK_FAULT: {}", e)))?;

        for table_statement in LOCAL_TABLES {
            bootstrap_connection.execute(table_statement, ()).await?;
        }

        let anchor = if is_memory {
            Some(Arc::new(bootstrap_connection))
        } else {
            None
        };

        info!("💽 [STORE]: Local strata ready at [{}].", store_path);

        Ok(Self {
            internal_database_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    fn get_connection(&self) -> Result<Connection, StoreError> {
        self.internal_database_driver.connect().map_err(|e| {
            error!("⚠️ [STORE_FAULT]: Connection allocation failed: {}", e);
            StoreError::ConnectionError(e.to_string())
        })
    }

    // --- ESTRATO 1: LEDGER DE HUELLAS (DEDUP DE ATAQUES) ---

    /// Presencia de la huella significa "ataque ya ejecutado con éxito".
    pub async fn fingerprint_seen(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let connection = self.get_connection()?;
        let mut rows = connection
            .query("SELECT 1 FROM hashes WHERE value = ?1", params![fingerprint])
            .await?;

        Ok(rows.next().await?.is_some())
    }

    pub async fn record_fingerprints(&self, fingerprints: &[String]) -> Result<(), StoreError> {
        if fingerprints.is_empty() {
            return Ok(());
        }

        let connection = self.get_connection()?;
        let transaction = connection.transaction().await?;

        for fingerprint in fingerprints {
            transaction
                .execute(
                    "INSERT INTO hashes (value) VALUES (?1) ON CONFLICT(value) DO NOTHING",
                    params![fingerprint.clone()],
                )
                .await?;
        }

        transaction.commit().await?;
        Ok(())
    }

    // --- ESTRATO 2: ALMACÉN CLAVE-BLOB (ESTADO DE USUARIO) ---

    pub async fn put_object(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec(value).map_err(|e| StoreError::MappingError(e.to_string()))?;

        let connection = self.get_connection()?;
        connection
            .execute(
                r#"
                INSERT INTO objects (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
                params![key, serialized],
            )
            .await?;

        Ok(())
    }

    pub async fn get_object(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let connection = self.get_connection()?;
        let mut rows = connection
            .query("SELECT value FROM objects WHERE key = ?1", params![key])
            .await?;

        match rows.next().await? {
            Some(row) => {
                let blob = row.get::<Vec<u8>>(0)?;
                let value = serde_json::from_slice(&blob).map_err(|e| StoreError::MappingError(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn delete_object(&self, key: &str) -> Result<bool, StoreError> {
        let connection = self.get_connection()?;
        let deleted = connection
            .execute("DELETE FROM objects WHERE key = ?1", params![key])
            .await?;
        Ok(deleted > 0)
    }

    // --- ESTRATO 3: OUTBOX DE BANDERAS PENDIENTES ---

    /// Captura banderas que el servidor no reconoció (caída o rechazo).
    pub async fn store_pending_flags(
        &self,
        values: &[String],
        target: &str,
        alias: &str,
    ) -> Result<(), StoreError> {
        if values.is_empty() {
            return Ok(());
        }

        let connection = self.get_connection()?;
        let transaction = connection.transaction().await?;

        for value in values {
            transaction
                .execute(
                    r#"
                    INSERT INTO pending_flags (value, target, alias, submitted)
                    VALUES (?1, ?2, ?3, 0)
                    ON CONFLICT(value) DO NOTHING
                    "#,
                    params![value.clone(), target, alias],
                )
                .await?;
        }

        transaction.commit().await?;
        Ok(())
    }

    /// Banderas sin entregar, agrupadas por (alias, objetivo).
    pub async fn pending_groups(&self) -> Result<Vec<(String, String, Vec<String>)>, StoreError> {
        let connection = self.get_connection()?;
        let mut rows = connection
            .query(
                r#"
                SELECT alias, target, value FROM pending_flags
                WHERE submitted = 0
                ORDER BY alias, target
                "#,
                (),
            )
            .await?;

        let mut groups: Vec<(String, String, Vec<String>)> = Vec::new();

        while let Some(row) = rows.next().await? {
            let alias = row.get::<String>(0)?;
            let target = row.get::<String>(1)?;
            let value = row.get::<String>(2)?;

            match groups.last_mut() {
                Some((last_alias, last_target, values))
                    if *last_alias == alias && *last_target == target =>
                {
                    values.push(value);
                }
                _ => groups.push((alias, target, vec![value])),
            }
        }

        Ok(groups)
    }

    pub async fn count_pending(&self) -> Result<i64, StoreError> {
        let connection = self.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM pending_flags WHERE submitted = 0", ())
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Sella un grupo drenado con éxito.
    pub async fn mark_group_submitted(&self, alias: &str, target: &str) -> Result<(), StoreError> {
        let connection = self.get_connection()?;
        connection
            .execute(
                "UPDATE pending_flags SET submitted = 1 WHERE alias = ?1 AND target = ?2",
                params![alias, target],
            )
            .await?;
        Ok(())
    }
}
