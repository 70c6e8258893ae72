// [libs/infra/db/src/repositories/flag.rs]
/*!
 * =================================================================
 * APARATO: FLAG REPOSITORY (V4.2 - ACID MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA Y CICLO DE VIDA DE BANDERAS
 *
 * MEJORAS:
 * - Deduplicación de intake linearizada por la unicidad de 'value':
 *   'ON CONFLICT DO NOTHING' convierte la carrera entre dos ráfagas
 *   concurrentes en un conteo determinista de duplicados.
 * - Transición de estado blindada: el Persister solo muta filas cuyo
 *   estado vigente es 'queued'. Una fila certificada es inmutable.
 * - Instrumentación selectiva para observabilidad.
 * =================================================================
 */

use crate::errors::DbError;
use crate::LedgerClient;
use avala_domain_models::{FlagRecord, FlagStatus, FlagSubmissionResponse};
use chrono::{DateTime, Utc};
use libsql::params;
use tracing::{debug, instrument};

pub struct FlagRepository {
    ledger_client: LedgerClient,
}

impl FlagRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self { ledger_client: client }
    }

    /**
     * Registra una ráfaga de banderas entrantes en una sola transacción.
     *
     * Retorna las banderas realmente insertadas (nuevas) y el conteo de
     * duplicados descartados. Un mismo valor repetido dentro de la ráfaga
     * cuenta como duplicado a partir de su segunda aparición.
     */
    #[instrument(skip(self, values))]
    pub async fn intake_batch(
        &self,
        values: &[String],
        exploit: &str,
        target: &str,
        tick: i64,
        player: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(Vec<String>, usize), DbError> {
        let connection = self.ledger_client.get_connection()?;
        let transaction = connection.transaction().await?;

        let sql = r#"
            INSERT INTO flags (id, value, exploit, player, tick, target, timestamp, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'queued')
            ON CONFLICT(value) DO NOTHING
        "#;

        let mut enqueued_values = Vec::new();
        let mut discarded_count = 0usize;

        for value in values {
            let row_identifier = uuid::Uuid::new_v4().to_string();

            let affected = transaction
                .execute(sql, params![
                    row_identifier,
                    value.clone(),
                    exploit,
                    player,
                    tick,
                    target,
                    timestamp.to_rfc3339()
                ])
                .await?;

            if affected == 1 {
                enqueued_values.push(value.clone());
            } else {
                discarded_count += 1;
            }
        }

        transaction.commit().await?;

        debug!(
            "💾 [FLAG_REPO]: Intake sealed. {} new, {} duplicates.",
            enqueued_values.len(),
            discarded_count
        );

        Ok((enqueued_values, discarded_count))
    }

    /**
     * Aplica en bloque los veredictos del verificador sobre el Ledger.
     *
     * Las respuestas 'requeued' no tienen proyección terminal y se ignoran.
     * Las filas ya certificadas (no 'queued') y los valores desconocidos
     * (banderas expiradas por TTL) se saltan en silencio.
     */
    #[instrument(skip(self, responses))]
    pub async fn apply_responses(&self, responses: &[FlagSubmissionResponse]) -> Result<usize, DbError> {
        if responses.is_empty() {
            return Ok(0);
        }

        let connection = self.ledger_client.get_connection()?;
        let transaction = connection.transaction().await?;

        let sql = r#"
            UPDATE flags SET status = ?1, response = ?2
            WHERE value = ?3 AND status = 'queued'
        "#;

        let mut updated_count = 0usize;

        for response in responses {
            let Some(terminal_status) = response.terminal_status() else {
                continue;
            };

            let affected = transaction
                .execute(sql, params![
                    terminal_status.as_str(),
                    response.response.clone(),
                    response.value.clone()
                ])
                .await?;

            updated_count += affected as usize;
        }

        transaction.commit().await?;

        debug!("💾 [FLAG_REPO]: Updated {} records.", updated_count);
        Ok(updated_count)
    }

    pub async fn fetch_by_value(&self, value: &str) -> Result<Option<FlagRecord>, DbError> {
        let connection = self.ledger_client.get_connection()?;

        // COALESCE: una respuesta vacía en columna equivale a 'sin respuesta'.
        let query = r#"
            SELECT id, value, exploit, player, tick, target, timestamp, status, COALESCE(response, '')
            FROM flags WHERE value = ?1
        "#;

        let mut rows = connection.query(query, params![value]).await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let raw_timestamp = row.get::<String>(6)?;
        let parsed_timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
            .map_err(|e| DbError::MappingError(format!("timestamp drift: {}", e)))?
            .with_timezone(&Utc);

        let raw_status = row.get::<String>(7)?;
        let status = FlagStatus::parse(&raw_status)
            .ok_or_else(|| DbError::MappingError(format!("unknown status '{}'", raw_status)))?;

        let raw_response = row.get::<String>(8)?;

        Ok(Some(FlagRecord {
            id: row.get::<String>(0)?,
            value: row.get::<String>(1)?,
            exploit: row.get::<String>(2)?,
            player: row.get::<String>(3)?,
            tick: row.get::<i64>(4)?,
            target: row.get::<String>(5)?,
            timestamp: parsed_timestamp,
            status,
            response: if raw_response.is_empty() { None } else { Some(raw_response) },
        }))
    }

    pub async fn count_with_status(&self, status: FlagStatus) -> Result<i64, DbError> {
        let connection = self.ledger_client.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM flags WHERE status = ?1", params![status.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    pub async fn count_total(&self) -> Result<i64, DbError> {
        let connection = self.ledger_client.get_connection()?;
        let mut rows = connection.query("SELECT COUNT(*) FROM flags", ()).await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    pub async fn count_for_tick(&self, tick: i64) -> Result<i64, DbError> {
        let connection = self.ledger_client.get_connection()?;
        let mut rows = connection
            .query("SELECT COUNT(*) FROM flags WHERE tick = ?1", params![tick])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Banderas entregadas a mano por operadores (sin exploit real).
    pub async fn count_manual(&self) -> Result<i64, DbError> {
        let connection = self.ledger_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM flags WHERE target = 'unknown' AND exploit = 'manual'",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Serie (tick, aceptadas) para el gráfico histórico del Dashboard.
    pub async fn accepted_history(&self) -> Result<Vec<(i64, i64)>, DbError> {
        let connection = self.ledger_client.get_connection()?;
        let mut rows = connection
            .query(
                r#"
                SELECT tick, COUNT(*) FROM flags
                WHERE status = 'accepted'
                GROUP BY tick ORDER BY tick
                "#,
                (),
            )
            .await?;

        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            history.push((row.get::<i64>(0)?, row.get::<i64>(1)?));
        }

        Ok(history)
    }
}
