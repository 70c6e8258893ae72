// [apps/orchestrator/src/services/persister.rs]
/*!
 * =================================================================
 * APARATO: PERSISTER SERVICE (V4.2 - BULK MASTER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: VOLCADO DE VEREDICTOS AL LEDGER TÁCTICO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BULK UPDATE: Drena hasta 1000 veredictos por ciclo y los aplica
 *    en una sola transacción sobre el Ledger.
 * 2. MULTI-ACK: Confirma con un único multi-ack hasta el tag máximo
 *    observado; los veredictos sin fila (banderas expiradas por TTL que
 *    el broker re-entregó) se saltan pero quedan confirmados igual.
 * 3. IDEMPOTENCE: La actualización exige 'status = queued'; re-aplicar
 *    un veredicto sobre una fila ya certificada es un no-op.
 * =================================================================
 */

use crate::state::AppState;
use avala_domain_models::FlagSubmissionResponse;
use avala_infra_mq::{DurableQueue, PERSISTING_QUEUE};
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

/// Volumen máximo de veredictos drenados por ciclo.
const BATCH_SIZE: usize = 1000;
/// Cadencia del daemon en segundos.
const INTERVAL_SECONDS: u64 = 5;

pub struct PersisterService {
    application_state: AppState,
}

impl PersisterService {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    pub async fn spawn_persister_daemon(self) {
        let mut cycle_ticker = interval(Duration::from_secs(INTERVAL_SECONDS));
        info!("💾 [PERSISTER]: Archival heart active. Every {}s.", INTERVAL_SECONDS);

        loop {
            cycle_ticker.tick().await;

            if let Err(cycle_fault) = self.persist_cycle().await {
                error!("❌ [PERSISTER]: Persistence cycle collapsed: {}", cycle_fault);
            }
        }
    }

    /**
     * Un ciclo completo: drena la cola de persistencia en lotes y los
     * aplica al Ledger hasta vaciarla.
     */
    #[instrument(skip(self))]
    pub async fn persist_cycle(&self) -> anyhow::Result<()> {
        let persisting_queue =
            DurableQueue::declare(self.application_state.broker.open_channel()?, PERSISTING_QUEUE).await?;

        // Único consumidor de la cola de persistencia: las entregas de
        // un ciclo colapsado regresan a 'ready' antes del drenaje.
        persisting_queue.recover_orphans().await?;

        loop {
            let mut persisting_buffer: Vec<FlagSubmissionResponse> = Vec::new();
            let mut max_delivery_tag: i64 = 0;

            while persisting_buffer.len() < BATCH_SIZE {
                match persisting_queue.get().await? {
                    None => {
                        if !persisting_buffer.is_empty() {
                            info!(
                                "📥 [PERSISTER]: Pulled all remaining {} responses from the persisting queue.",
                                persisting_buffer.len()
                            );
                        } else {
                            info!("📭 [PERSISTER]: No responses remaining in the persisting queue. Persistence skipped.");
                        }
                        break;
                    }
                    Some(delivery) => {
                        max_delivery_tag = max_delivery_tag.max(delivery.delivery_tag);

                        match serde_json::from_str::<FlagSubmissionResponse>(delivery.body.trim()) {
                            Ok(response) => persisting_buffer.push(response),
                            Err(decode_fault) => {
                                // Mensaje corrupto: se descarta sin requeue.
                                error!("🗑️  [PERSISTER]: Corrupt response discarded: {}", decode_fault);
                                persisting_queue.reject(delivery.delivery_tag, false).await?;
                                continue;
                            }
                        }

                        if persisting_buffer.len() == BATCH_SIZE {
                            info!(
                                "📥 [PERSISTER]: Batch size reached. Pulled {} responses from the persisting queue.",
                                persisting_buffer.len()
                            );
                            break;
                        }
                    }
                }
            }

            if persisting_buffer.is_empty() {
                break;
            }

            info!("💾 [PERSISTER]: Persisting {} flag responses...", persisting_buffer.len());

            let updated_count = self
                .application_state
                .flag_repository()
                .apply_responses(&persisting_buffer)
                .await?;

            info!("💾 [PERSISTER]: Updated {} records.", updated_count);

            persisting_queue.ack_multiple(max_delivery_tag).await?;
        }

        Ok(())
    }
}
