// [apps/orchestrator/src/services/submitter/batch.rs]
/*!
 * =================================================================
 * APARATO: BATCH-SIZE SUBMITTER STRATEGY (V4.2)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: CONSUMIDOR STREAMING CON LIBERACIÓN POR VOLUMEN
 *
 * Acumula entregas en un buffer privado del consumidor y libera el
 * lote al verificador exactamente cuando alcanza 'batch_size'
 * mensajes. Pensado para verificadores con endpoint HTTP masivo.
 * =================================================================
 */

use crate::adapters::BatchCheckerAdapter;
use crate::services::submitter::submit_flags_from_buffer;
use crate::state::AppState;
use avala_infra_mq::{DurableQueue, PERSISTING_QUEUE, SUBMISSION_QUEUE};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Pausa del consumidor ante cola vacía.
const CONSUME_POLL_INTERVAL_MILLISECONDS: u64 = 200;
/// Enfriamiento ante colapso del enlace con el broker.
const BROKER_BACKOFF_SECONDS: u64 = 5;

pub async fn run_streaming_consumer(
    application_state: AppState,
    adapter: Arc<dyn BatchCheckerAdapter>,
    batch_size: usize,
) {
    info!("🌊 [SUBMITTER]: Streaming consumer armed. Releasing batches of {}.", batch_size);

    loop {
        if let Err(consume_fault) = consume_stream(&application_state, &adapter, batch_size).await {
            error!(
                "❌ [SUBMITTER]: Broker link severed: {}. Reconnecting in {}s.",
                consume_fault, BROKER_BACKOFF_SECONDS
            );
            sleep(Duration::from_secs(BROKER_BACKOFF_SECONDS)).await;
        }
    }
}

async fn consume_stream(
    application_state: &AppState,
    adapter: &Arc<dyn BatchCheckerAdapter>,
    batch_size: usize,
) -> anyhow::Result<()> {
    let submission_queue =
        DurableQueue::declare(application_state.broker.open_channel()?, SUBMISSION_QUEUE).await?;
    let persisting_queue =
        DurableQueue::declare(application_state.broker.open_channel()?, PERSISTING_QUEUE).await?;

    // Único consumidor de la cola de envío: tras un colapso del enlace,
    // el buffer en RAM se pierde y sus entregas regresan a 'ready'.
    submission_queue.recover_orphans().await?;

    // El buffer es propiedad exclusiva de este consumidor.
    let mut submission_buffer: Vec<String> = Vec::new();
    let mut delivery_tag_map: HashMap<String, i64> = HashMap::new();

    loop {
        match submission_queue.get().await? {
            Some(delivery) => {
                let flag = delivery.body.trim().to_string();
                delivery_tag_map.insert(flag.clone(), delivery.delivery_tag);
                submission_buffer.push(flag);

                debug!(
                    "📩 [SUBMITTER]: Received flag ({} flags in buffer).",
                    submission_buffer.len()
                );

                if submission_buffer.len() < batch_size {
                    continue;
                }

                submit_flags_from_buffer(
                    adapter,
                    std::mem::take(&mut submission_buffer),
                    &delivery_tag_map,
                    &submission_queue,
                    &persisting_queue,
                    &application_state.event_bus,
                )
                .await?;

                delivery_tag_map.clear();
            }
            None => {
                sleep(Duration::from_millis(CONSUME_POLL_INTERVAL_MILLISECONDS)).await;
            }
        }
    }
}
