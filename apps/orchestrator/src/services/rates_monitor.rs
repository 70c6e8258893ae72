// [apps/orchestrator/src/services/rates_monitor.rs]
/*!
 * =================================================================
 * APARATO: QUEUE RATES MONITOR (V4.2)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: AGREGACIÓN POR SEGUNDO DEL CAUDAL DEL CONDUCTO
 *
 * Integra los deltas de contadores en dos series por segundo: banderas
 * recuperadas (intake) y banderas enviadas (submitter). La muestra se
 * difunde por el mismo bus para el eje temporal del Dashboard.
 * =================================================================
 */

use crate::state::AppState;
use avala_domain_models::{QueueRatesSample, RealTimeEvent};
use chrono::Local;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;
use tracing::{debug, info};

const SAMPLE_WINDOW_SECONDS: u64 = 1;

pub struct RatesMonitorService {
    application_state: AppState,
}

impl RatesMonitorService {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    pub async fn spawn_rates_daemon(self) {
        let mut delta_receiver = self.application_state.event_bus.subscribe();
        let mut sample_ticker = interval(Duration::from_secs(SAMPLE_WINDOW_SECONDS));

        let mut retrieved_count: i64 = 0;
        let mut submitted_count: i64 = 0;

        info!("📈 [RATES]: Throughput sampler active. Window {}s.", SAMPLE_WINDOW_SECONDS);

        loop {
            tokio::select! {
                _ = sample_ticker.tick() => {
                    let sample = QueueRatesSample {
                        retrieved_per_second: retrieved_count,
                        submitted_per_second: submitted_count,
                        timestamp: Local::now().format("%H:%M:%S").to_string(),
                    };

                    self.application_state.event_bus.emit_queue_rates(sample);

                    retrieved_count = 0;
                    submitted_count = 0;
                }
                incoming = delta_receiver.recv() => {
                    match incoming {
                        Ok(RealTimeEvent::FlagCounters(delta)) => {
                            // queued > 0: intake; queued < 0: drenaje por envío.
                            if delta.queued > 0 {
                                retrieved_count += delta.queued;
                            } else {
                                submitted_count += delta.queued.abs();
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            debug!("📉 [RATES]: Sampler lagged, {} events skipped.", missed);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}
