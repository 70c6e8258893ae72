// [apps/orchestrator/src/services/submitter/scheduled.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULED SUBMITTER STRATEGIES (V4.2)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: ESTRATEGIAS PER_TICK E INTERVAL
 *
 * per_tick = N dispara N veces por tick, equiespaciado sobre la
 * retícula de fase del tick vigente; interval = S dispara cada S
 * segundos. Cada disparo drena la cola completa en lotes de hasta
 * 'max_batch_size' banderas.
 * =================================================================
 */

use crate::adapters::BatchCheckerAdapter;
use crate::config::SubmitterStrategy;
use crate::services::submitter::submit_flags_from_buffer;
use crate::state::AppState;
use avala_domain_models::TickClock;
use avala_infra_mq::{DurableQueue, PERSISTING_QUEUE, SUBMISSION_QUEUE};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{interval_at, Instant};
use tracing::{error, info};

/**
 * Intervalo de disparo y primer instante de ejecución alineado a la
 * retícula de fase del tick vigente.
 *
 * Con el juego aún no iniciado, el primer disparo ocurre un intervalo
 * después del arranque del juego.
 */
pub fn calculate_next_run_time(
    clock: &TickClock,
    strategy: SubmitterStrategy,
    now: DateTime<Utc>,
) -> (Duration, DateTime<Utc>) {
    let tick_milliseconds = clock.tick_duration().num_milliseconds();

    let interval_milliseconds = match strategy {
        SubmitterStrategy::PerTick(per_tick) => tick_milliseconds / (per_tick.max(2) as i64 - 1),
        SubmitterStrategy::Interval(seconds) => seconds as i64 * 1000,
        // Las estrategias de consumo continuo no usan retícula temporal.
        _ => tick_milliseconds,
    };

    let firing_interval = Duration::milliseconds(interval_milliseconds);

    let next_run_time = if clock.has_started(now) {
        let elapsed_milliseconds = clock.tick_elapsed(now).num_milliseconds();
        let completed_slots = elapsed_milliseconds / interval_milliseconds + 1;

        clock.next_tick_start(now) - clock.tick_duration()
            + Duration::milliseconds(completed_slots * interval_milliseconds)
    } else {
        clock.first_tick_start() + firing_interval
    };

    (firing_interval, next_run_time)
}

pub async fn run_scheduled(
    application_state: AppState,
    adapter: Arc<dyn BatchCheckerAdapter>,
    strategy: SubmitterStrategy,
) {
    let (firing_interval, next_run_time) =
        calculate_next_run_time(&application_state.clock, strategy, Utc::now());

    info!(
        "🗓️  [SUBMITTER]: Scheduled strategy armed ({:?}). First run at {}.",
        strategy,
        next_run_time.format("%H:%M:%S")
    );

    let initial_delay = (next_run_time - Utc::now()).to_std().unwrap_or_default();
    let firing_period = firing_interval.to_std().expect("FATAL: negative firing interval");

    let mut firing_ticker = interval_at(Instant::now() + initial_delay, firing_period);

    loop {
        firing_ticker.tick().await;

        if let Err(drain_fault) = drain_submission_queue(&application_state, &adapter).await {
            error!("❌ [SUBMITTER]: Failed to reach the broker: {}", drain_fault);
        }
    }
}

/**
 * Drena la cola de envío completa en lotes de hasta 'max_batch_size'.
 * Abre canales frescos por disparo; el estado de entrega vive en el broker.
 */
async fn drain_submission_queue(
    application_state: &AppState,
    adapter: &Arc<dyn BatchCheckerAdapter>,
) -> anyhow::Result<()> {
    let max_batch_size = application_state
        .config
        .submitter
        .max_batch_size
        .unwrap_or(usize::MAX);

    let submission_queue =
        DurableQueue::declare(application_state.broker.open_channel()?, SUBMISSION_QUEUE).await?;
    let persisting_queue =
        DurableQueue::declare(application_state.broker.open_channel()?, PERSISTING_QUEUE).await?;

    // Único consumidor de la cola de envío: las entregas que un disparo
    // anterior dejó sin confirmar regresan a 'ready' aquí.
    submission_queue.recover_orphans().await?;

    loop {
        let mut submission_buffer: Vec<String> = Vec::new();
        let mut delivery_tag_map: HashMap<String, i64> = HashMap::new();

        while submission_buffer.len() < max_batch_size {
            match submission_queue.get().await? {
                None => {
                    if !submission_buffer.is_empty() {
                        info!(
                            "📥 [SUBMITTER]: Pulled all remaining {} flags from the submission queue.",
                            submission_buffer.len()
                        );
                    } else {
                        info!("📭 [SUBMITTER]: No flags remaining in the submission queue. Submission skipped.");
                    }
                    break;
                }
                Some(delivery) => {
                    let flag = delivery.body.trim().to_string();
                    delivery_tag_map.insert(flag.clone(), delivery.delivery_tag);
                    submission_buffer.push(flag);

                    if submission_buffer.len() == max_batch_size {
                        info!(
                            "📥 [SUBMITTER]: Batch size reached. Pulled {} flags from the submission queue.",
                            submission_buffer.len()
                        );
                        break;
                    }
                }
            }
        }

        if submission_buffer.is_empty() {
            break;
        }

        submit_flags_from_buffer(
            adapter,
            submission_buffer,
            &delivery_tag_map,
            &submission_queue,
            &persisting_queue,
            &application_state.event_bus,
        )
        .await?;
    }

    Ok(())
}
