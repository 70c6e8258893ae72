// [libs/infra/mq/src/queue.rs]
/*!
 * =================================================================
 * APARATO: DURABLE QUEUE ENGINE (V4.2 - AT-LEAST-ONCE MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SEMÁNTICA DE BROKER SOBRE TABLAS DURABLES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DELIVERY TAGS: El rowid autoincremental es la etiqueta de entrega;
 *    el multi-ack confirma todo tag menor o igual al máximo observado.
 * 2. TTL EXPIRY: Los mensajes caducados se purgan en el momento del
 *    claim; una bandera expirada jamás llega al verificador.
 * 3. REQUEUE: 'reject(requeue=true)' devuelve el mensaje al estado
 *    'ready' conservando su tag, listo para la siguiente entrega.
 * 4. CRASH RECOVERY: Los mensajes 'unacked' de un proceso difunto se
 *    recuperan a 'ready' en la ignición del kernel.
 *
 * # Mathematical Proof (At-Least-Once):
 * Un mensaje abandona la tabla únicamente por ack explícito o por
 * expiración de TTL en estado 'ready'. Todo fallo entre claim y ack
 * termina en redelivery, nunca en pérdida.
 * =================================================================
 */

use crate::errors::MqError;
use chrono::Utc;
use libsql::{params, Connection};
use tracing::{debug, info, instrument};

/// Mensaje reclamado de la cola, pendiente de ack o reject.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: i64,
    pub body: String,
}

/// Cola durable con semántica de broker. Una instancia por canal.
pub struct DurableQueue {
    channel: Connection,
    routing_key: String,
    table_name: String,
}

impl DurableQueue {
    /**
     * Declara la cola (idempotente) sobre el canal entregado.
     *
     * # Errors:
     * Rechaza claves de ruteo fuera de [a-z0-9_] para impedir que un
     * nombre hostil se interpole en el identificador de tabla.
     */
    #[instrument(skip(channel))]
    pub async fn declare(channel: Connection, routing_key: &str) -> Result<Self, MqError> {
        if routing_key.is_empty()
            || !routing_key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(MqError::InvalidRoutingKey(routing_key.to_string()));
        }

        let table_name = format!("mq_{}", routing_key);

        channel
            .execute(
                &format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        body TEXT NOT NULL,
                        state TEXT NOT NULL DEFAULT 'ready',
                        expires_at INTEGER,
                        published_at INTEGER NOT NULL
                    );
                    "#,
                    table_name
                ),
                (),
            )
            .await?;

        channel
            .execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_state ON {}(state);",
                    routing_key, table_name
                ),
                (),
            )
            .await?;

        info!("📮 [BROKER]: Declared queue {}.", routing_key);

        Ok(Self {
            channel,
            routing_key: routing_key.to_string(),
            table_name,
        })
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /**
     * Publica un mensaje. 'ttl_ms' es la política de expiración relativa
     * en milisegundos; vencida, el mensaje se purga sin entregarse.
     */
    pub async fn put(&self, body: &str, ttl_ms: Option<i64>) -> Result<(), MqError> {
        let now_ms = Utc::now().timestamp_millis();

        match ttl_ms {
            Some(ttl) => {
                self.channel
                    .execute(
                        &format!(
                            "INSERT INTO {} (body, state, expires_at, published_at) VALUES (?1, 'ready', ?2, ?3)",
                            self.table_name
                        ),
                        params![body, now_ms + ttl, now_ms],
                    )
                    .await?;
            }
            None => {
                self.channel
                    .execute(
                        &format!(
                            "INSERT INTO {} (body, state, published_at) VALUES (?1, 'ready', ?2)",
                            self.table_name
                        ),
                        params![body, now_ms],
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /**
     * Reclama el mensaje vivo más antiguo (ready -> unacked).
     *
     * La purga de expirados y el claim ocurren contra la misma tabla;
     * el UPDATE con subconsulta es atómico a nivel de motor, por lo que
     * dos canales concurrentes jamás reclaman el mismo tag.
     */
    pub async fn get(&self) -> Result<Option<Delivery>, MqError> {
        let now_ms = Utc::now().timestamp_millis();

        // 1. PURGA DE CADUCOS (TTL Enforcement)
        self.channel
            .execute(
                &format!(
                    "DELETE FROM {} WHERE state = 'ready' AND expires_at IS NOT NULL AND expires_at <= ?1",
                    self.table_name
                ),
                params![now_ms],
            )
            .await?;

        // 2. CLAIM ATÓMICO DEL MÁS ANTIGUO
        let claim_statement = format!(
            r#"
            UPDATE {table} SET state = 'unacked'
            WHERE id = (
                SELECT id FROM {table}
                WHERE state = 'ready' AND (expires_at IS NULL OR expires_at > ?1)
                ORDER BY id LIMIT 1
            )
            RETURNING id, body
            "#,
            table = self.table_name
        );

        let mut rows = self.channel.query(&claim_statement, params![now_ms]).await?;

        match rows.next().await? {
            Some(row) => {
                let delivery = Delivery {
                    delivery_tag: row.get::<i64>(0)?,
                    body: row.get::<String>(1)?,
                };
                debug!(
                    "📤 [BROKER]: Claimed tag {} from {}.",
                    delivery.delivery_tag, self.routing_key
                );
                Ok(Some(delivery))
            }
            None => Ok(None),
        }
    }

    /// Confirma un mensaje individual. El mensaje abandona la cola.
    pub async fn ack(&self, delivery_tag: i64) -> Result<(), MqError> {
        self.channel
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1 AND state = 'unacked'", self.table_name),
                params![delivery_tag],
            )
            .await?;
        Ok(())
    }

    /// Multi-ack: confirma todos los tags no confirmados hasta el máximo observado.
    pub async fn ack_multiple(&self, up_to_delivery_tag: i64) -> Result<(), MqError> {
        self.channel
            .execute(
                &format!("DELETE FROM {} WHERE id <= ?1 AND state = 'unacked'", self.table_name),
                params![up_to_delivery_tag],
            )
            .await?;
        Ok(())
    }

    /**
     * Rechaza un mensaje reclamado. Con 'requeue' regresa a 'ready'
     * conservando su tag; sin 'requeue' se descarta definitivamente.
     */
    pub async fn reject(&self, delivery_tag: i64, requeue: bool) -> Result<(), MqError> {
        if requeue {
            self.channel
                .execute(
                    &format!(
                        "UPDATE {} SET state = 'ready' WHERE id = ?1 AND state = 'unacked'",
                        self.table_name
                    ),
                    params![delivery_tag],
                )
                .await?;
        } else {
            self.channel
                .execute(
                    &format!("DELETE FROM {} WHERE id = ?1 AND state = 'unacked'", self.table_name),
                    params![delivery_tag],
                )
                .await?;
        }
        Ok(())
    }

    /// Volumen de mensajes vivos listos para entrega.
    pub async fn size(&self) -> Result<i64, MqError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut rows = self
            .channel
            .query(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE state = 'ready' AND (expires_at IS NULL OR expires_at > ?1)",
                    self.table_name
                ),
                params![now_ms],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /**
     * Recupera a 'ready' los mensajes 'unacked' de un proceso difunto.
     * Ejecutar únicamente durante la ignición del kernel, antes de
     * levantar consumidores.
     */
    pub async fn recover_orphans(&self) -> Result<u64, MqError> {
        let recovered = self
            .channel
            .execute(
                &format!("UPDATE {} SET state = 'ready' WHERE state = 'unacked'", self.table_name),
                (),
            )
            .await?;

        if recovered > 0 {
            info!(
                "♻️  [BROKER]: Recovered {} orphaned deliveries on {}.",
                recovered, self.routing_key
            );
        }

        Ok(recovered)
    }
}
