// [apps/orchestrator/src/services/submitter/mod.rs]
/*!
 * =================================================================
 * APARATO: SUBMITTER SERVICE (V4.2 - STRATEGY MASTER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: CONSUMO DE LA COLA DE ENVÍO BAJO CUATRO ESTRATEGIAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRATEGY DISPATCH: per_tick / interval (trabajos programados),
 *    batch_size (consumidor streaming) y streams (K workers paralelos)
 *    comparten el mismo ruteo de respuestas.
 * 2. AT-LEAST-ONCE ROUTING: ack + publicación en la cola de
 *    persistencia solo para veredictos terminales; 'requeued' y las
 *    banderas que el verificador descartó en silencio regresan a la
 *    cola con requeue.
 * 3. READY GATE: Sin adaptador compatible el servicio queda en
 *    'ready = false', registra el fallo y deja el proceso vivo para
 *    que el operador corrija en caliente.
 *
 * # Mathematical Proof (No Silent Loss):
 * Toda bandera reclamada termina en exactamente uno de tres destinos:
 * ack + cola de persistencia (veredicto terminal), requeue (veredicto
 * 'requeued', descarte del verificador o colapso del adaptador) o
 * expiración por TTL. No existe rama que la descarte sin rastro.
 * =================================================================
 */

pub mod batch;
pub mod scheduled;
pub mod streams;

use crate::adapters::{BatchCheckerAdapter, CheckerBinding};
use crate::config::SubmitterStrategy;
use crate::services::event_bus::EventBus;
use crate::state::AppState;
use avala_domain_models::{FlagCounterDelta, SubmissionStatus};
use avala_infra_mq::DurableQueue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info};

pub struct SubmitterService {
    application_state: AppState,
    checker_binding: Option<CheckerBinding>,
    pub ready: bool,
}

impl SubmitterService {
    /**
     * Liga el adaptador a la estrategia configurada.
     *
     * La mezcla incompatible (streams sin adaptador de flujo, lotes sin
     * adaptador batch) degrada a 'ready = false' con rastro de error.
     */
    pub fn new(application_state: AppState, checker_binding: Option<CheckerBinding>) -> Self {
        let ready = match (application_state.config.submitter.strategy(), &checker_binding) {
            (Ok(SubmitterStrategy::Streams(_)), Some(CheckerBinding::Stream(_))) => true,
            (Ok(SubmitterStrategy::Streams(_)), _) => {
                error!("🛑 [SUBMITTER]: Streams strategy requires a stream checker adapter. ready = false.");
                false
            }
            (Ok(_), Some(CheckerBinding::Batch(_))) => true,
            (Ok(_), _) => {
                error!("🛑 [SUBMITTER]: Batched strategies require a batch checker adapter. ready = false.");
                false
            }
            (Err(strategy_fault), _) => {
                error!("🛑 [SUBMITTER]: Strategy resolution collapsed: {}. ready = false.", strategy_fault);
                false
            }
        };

        Self {
            application_state,
            checker_binding,
            ready,
        }
    }

    /**
     * Arranca la estrategia activa. Bloquea la tarea invocante.
     */
    pub async fn start(self) {
        if !self.ready {
            error!("🛑 [SUBMITTER]: Not ready. Fix the submitter module configuration and restart.");
            return;
        }

        let strategy = match self.application_state.config.submitter.strategy() {
            Ok(strategy) => strategy,
            Err(_) => return,
        };

        match (strategy, self.checker_binding) {
            (SubmitterStrategy::PerTick(_), Some(CheckerBinding::Batch(adapter)))
            | (SubmitterStrategy::Interval(_), Some(CheckerBinding::Batch(adapter))) => {
                scheduled::run_scheduled(self.application_state, adapter, strategy).await;
            }
            (SubmitterStrategy::BatchSize(batch_size), Some(CheckerBinding::Batch(adapter))) => {
                batch::run_streaming_consumer(self.application_state, adapter, batch_size).await;
            }
            (SubmitterStrategy::Streams(worker_count), Some(CheckerBinding::Stream(factory))) => {
                streams::run_stream_workers(self.application_state, factory, worker_count).await;
            }
            _ => {
                // Blindado por el gate de 'ready'; rama inalcanzable en operación.
                error!("🛑 [SUBMITTER]: Strategy/adapter pairing collapsed after readiness gate.");
            }
        }
    }
}

/**
 * Ruteo compartido de un lote ya entregado al verificador.
 *
 * # Logic:
 * 1. Veredicto terminal: ack del tag + publicación en persistencia.
 * 2. Veredicto 'requeued' o bandera ausente de la respuesta: reject
 *    con requeue (el broker la re-entrega).
 * 3. Colapso del adaptador: el lote completo regresa a la cola.
 */
pub async fn submit_flags_from_buffer(
    adapter: &Arc<dyn BatchCheckerAdapter>,
    submission_buffer: Vec<String>,
    delivery_tag_map: &HashMap<String, i64>,
    submission_queue: &DurableQueue,
    persisting_queue: &DurableQueue,
    event_bus: &EventBus,
) -> anyhow::Result<()> {
    if submission_buffer.is_empty() {
        info!("📭 [SUBMITTER]: No flags in buffer. Submission skipped.");
        return Ok(());
    }

    info!("📤 [SUBMITTER]: Submitting {} flags...", submission_buffer.len());

    let responses = match adapter.submit_batch(&submission_buffer).await {
        Ok(responses) => responses,
        Err(submit_fault) => {
            error!(
                "❌ [SUBMITTER]: Checker adapter collapsed: {}. Requeuing the whole batch.",
                submit_fault
            );
            for flag in &submission_buffer {
                if let Some(delivery_tag) = delivery_tag_map.get(flag) {
                    submission_queue.reject(*delivery_tag, true).await?;
                }
            }
            return Ok(());
        }
    };

    let mut dropped_flags: HashSet<String> = submission_buffer.iter().cloned().collect();

    let mut accepted_count: i64 = 0;
    let mut rejected_count: i64 = 0;
    let mut requeued_count: i64 = 0;

    for response in responses {
        // Veredictos sobre valores fuera del lote se ignoran por identidad.
        let Some(delivery_tag) = delivery_tag_map.get(&response.value) else {
            continue;
        };

        match response.status {
            SubmissionStatus::Requeued => {
                requeued_count += 1;
            }
            SubmissionStatus::Accepted | SubmissionStatus::Rejected => {
                if response.status == SubmissionStatus::Accepted {
                    accepted_count += 1;
                } else {
                    rejected_count += 1;
                }

                submission_queue.ack(*delivery_tag).await?;
                persisting_queue
                    .put(&serde_json::to_string(&response)?, None)
                    .await?;
                dropped_flags.remove(&response.value);
            }
        }
    }

    // Banderas que el verificador descartó en silencio + 'requeued'.
    for flag in &dropped_flags {
        if let Some(delivery_tag) = delivery_tag_map.get(flag) {
            submission_queue.reject(*delivery_tag, true).await?;
        }
    }

    info!(
        "🏁 [SUBMITTER]: {} accepted, {} rejected, {} requeued.",
        accepted_count, rejected_count, requeued_count
    );

    event_bus.emit_flag_counters(FlagCounterDelta {
        queued: -(accepted_count + rejected_count),
        discarded: 0,
        accepted: accepted_count,
        rejected: rejected_count,
    });

    Ok(())
}
