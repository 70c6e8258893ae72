// [libs/infra/db/src/repositories/state.rs]
/*!
 * =================================================================
 * APARATO: STATE REPOSITORY (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SINGLETONS CLAVE-VALOR ENTRE PROCESOS
 *
 * Claves conocidas: 'attack_data_hash' y 'attack_data'. Solo el
 * Attack Data Refresher escribe; la escritura de ambas claves es
 * una única transacción para que los lectores jamás observen una
 * huella desacoplada de su payload.
 * =================================================================
 */

use crate::errors::DbError;
use crate::LedgerClient;
use libsql::params;
use tracing::instrument;

pub const ATTACK_DATA_KEY: &str = "attack_data";
pub const ATTACK_DATA_HASH_KEY: &str = "attack_data_hash";

pub struct StateRepository {
    ledger_client: LedgerClient,
}

impl StateRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { ledger_client: client }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let connection = self.ledger_client.get_connection()?;
        let mut rows = connection
            .query("SELECT value FROM states WHERE key = ?1", params![key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<(), DbError> {
        let connection = self.ledger_client.get_connection()?;
        connection
            .execute(
                r#"
                INSERT INTO states (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
                params![key, value],
            )
            .await?;
        Ok(())
    }

    /**
     * Intercambio atómico del payload de attack data y su huella.
     *
     * # Mathematical Proof (Atomic Swap):
     * Ambas claves mutan en la misma transacción; cualquier lector
     * concurrente observa o bien el par viejo o bien el par nuevo,
     * nunca una mezcla.
     */
    #[instrument(skip(self, payload_json))]
    pub async fn swap_attack_data(&self, content_hash: &str, payload_json: &str) -> Result<(), DbError> {
        let connection = self.ledger_client.get_connection()?;
        let transaction = connection.transaction().await?;

        let upsert = r#"
            INSERT INTO states (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#;

        transaction
            .execute(upsert, params![ATTACK_DATA_HASH_KEY, content_hash])
            .await?;
        transaction
            .execute(upsert, params![ATTACK_DATA_KEY, payload_json])
            .await?;

        transaction.commit().await?;
        Ok(())
    }
}
