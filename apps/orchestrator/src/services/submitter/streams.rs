// [apps/orchestrator/src/services/submitter/streams.rs]
/*!
 * =================================================================
 * APARATO: STREAMS SUBMITTER STRATEGY (V4.2 - K-PARALLEL)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: K WORKERS DE CONSUMO CONTINUO, UNA BANDERA POR LLAMADA
 *
 * Cada worker construye su propio adaptador (sesión del verificador
 * local al worker) y posee sus propios canales del broker. Ante fallo
 * de 'submit' ejecuta el ciclo cleanup -> prepare -> retry acotado a
 * 10 intentos; el agotamiento es fatal para ese worker y la bandera
 * reclamada regresa a la cola para sus pares.
 * =================================================================
 */

use crate::adapters::{StreamAdapterFactory, StreamCheckerAdapter};
use crate::state::AppState;
use avala_domain_models::{FlagCounterDelta, FlagSubmissionResponse, SubmissionStatus};
use avala_infra_mq::{DurableQueue, PERSISTING_QUEUE, SUBMISSION_QUEUE};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Intentos de (cleanup -> prepare -> submit) por bandera.
const STREAM_RETRY_ATTEMPTS: u32 = 10;
const CONSUME_POLL_INTERVAL_MILLISECONDS: u64 = 200;
const BROKER_BACKOFF_SECONDS: u64 = 5;

pub async fn run_stream_workers(
    application_state: AppState,
    adapter_factory: StreamAdapterFactory,
    worker_count: usize,
) {
    info!("🧵 [SUBMITTER]: Igniting {} stream workers.", worker_count);

    let mut worker_handles = Vec::with_capacity(worker_count);

    for worker_index in 0..worker_count {
        let worker_state = application_state.clone();
        let worker_adapter = adapter_factory();

        worker_handles.push(tokio::spawn(async move {
            stream_worker(worker_state, worker_adapter, worker_index).await;
        }));
    }

    for handle in worker_handles {
        let _ = handle.await;
    }

    error!("🛑 [SUBMITTER]: All stream workers have terminated.");
}

async fn stream_worker(
    application_state: AppState,
    adapter: Arc<dyn StreamCheckerAdapter>,
    worker_index: usize,
) {
    let (submission_queue, persisting_queue) = loop {
        match open_worker_queues(&application_state).await {
            Ok(queues) => break queues,
            Err(broker_fault) => {
                error!(
                    "❌ [STREAM_{}]: Broker link failed: {}. Retrying in {}s.",
                    worker_index, broker_fault, BROKER_BACKOFF_SECONDS
                );
                sleep(Duration::from_secs(BROKER_BACKOFF_SECONDS)).await;
            }
        }
    };

    if let Err(prepare_fault) = adapter.prepare().await {
        error!(
            "🛑 [STREAM_{}]: prepare() collapsed before consuming: {}. Worker aborted.",
            worker_index, prepare_fault
        );
        return;
    }

    info!("🧵 [STREAM_{}]: Consuming the submission queue.", worker_index);

    loop {
        let delivery = match submission_queue.get().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                sleep(Duration::from_millis(CONSUME_POLL_INTERVAL_MILLISECONDS)).await;
                continue;
            }
            Err(broker_fault) => {
                error!("❌ [STREAM_{}]: Queue claim failed: {}.", worker_index, broker_fault);
                sleep(Duration::from_secs(BROKER_BACKOFF_SECONDS)).await;
                continue;
            }
        };

        let flag = delivery.body.trim().to_string();
        debug!("📩 [STREAM_{}]: Received flag {}.", worker_index, flag);

        match submit_flag_bounded(&adapter, &flag, worker_index).await {
            Some(response) => {
                if let Err(routing_fault) = route_stream_response(
                    &application_state,
                    &submission_queue,
                    &persisting_queue,
                    delivery.delivery_tag,
                    response,
                )
                .await
                {
                    error!("❌ [STREAM_{}]: Response routing failed: {}.", worker_index, routing_fault);
                }
            }
            None => {
                error!(
                    "🛑 [STREAM_{}]: Failed to submit flag {}. Check your connection and rerun.",
                    worker_index, flag
                );

                // La bandera regresa a la cola para los workers restantes.
                let _ = submission_queue.reject(delivery.delivery_tag, true).await;
                adapter.cleanup().await;
                return;
            }
        }
    }
}

async fn open_worker_queues(application_state: &AppState) -> anyhow::Result<(DurableQueue, DurableQueue)> {
    let submission_queue =
        DurableQueue::declare(application_state.broker.open_channel()?, SUBMISSION_QUEUE).await?;
    let persisting_queue =
        DurableQueue::declare(application_state.broker.open_channel()?, PERSISTING_QUEUE).await?;
    Ok((submission_queue, persisting_queue))
}

/**
 * Envío con ciclo de reconstrucción de sesión acotado.
 * 'None' significa agotamiento: fatal para el worker invocante.
 */
async fn submit_flag_bounded(
    adapter: &Arc<dyn StreamCheckerAdapter>,
    flag: &str,
    worker_index: usize,
) -> Option<FlagSubmissionResponse> {
    let mut attempts_left = STREAM_RETRY_ATTEMPTS;

    while attempts_left > 0 {
        match adapter.submit(flag).await {
            Ok(response) => return Some(response),
            Err(submit_fault) => {
                attempts_left -= 1;
                warn!(
                    "⚠️ [STREAM_{}]: submit() faulted ({}). Rebuilding session, {} attempts left.",
                    worker_index, submit_fault, attempts_left
                );

                adapter.cleanup().await;
                if let Err(prepare_fault) = adapter.prepare().await {
                    warn!(
                        "⚠️ [STREAM_{}]: Session rebuild failed: {}.",
                        worker_index, prepare_fault
                    );
                }
            }
        }
    }

    None
}

async fn route_stream_response(
    application_state: &AppState,
    submission_queue: &DurableQueue,
    persisting_queue: &DurableQueue,
    delivery_tag: i64,
    response: FlagSubmissionResponse,
) -> anyhow::Result<()> {
    match response.status {
        SubmissionStatus::Requeued => {
            debug!("🔁 [SUBMITTER]: Requeued {}.", response.response);
            submission_queue.reject(delivery_tag, true).await?;
        }
        SubmissionStatus::Accepted | SubmissionStatus::Rejected => {
            let accepted = response.status == SubmissionStatus::Accepted;

            submission_queue.ack(delivery_tag).await?;
            persisting_queue
                .put(&serde_json::to_string(&response)?, None)
                .await?;

            if accepted {
                debug!("✅ [SUBMITTER]: Accepted {}.", response.response);
            } else {
                debug!("❌ [SUBMITTER]: Rejected {}.", response.response);
            }

            application_state.event_bus.emit_flag_counters(FlagCounterDelta {
                queued: -1,
                discarded: 0,
                accepted: if accepted { 1 } else { 0 },
                rejected: if accepted { 0 } else { 1 },
            });
        }
    }

    Ok(())
}
