// [apps/orchestrator/src/services/tick_announcer.rs]
/*!
 * =================================================================
 * APARATO: TICK ANNOUNCER SERVICE (V4.2)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: RASTRO DEL PULSO DEL JUEGO EN EL LOG
 * =================================================================
 */

use crate::state::AppState;
use chrono::Utc;
use tokio::time::{interval_at, Instant};
use tracing::info;

pub struct TickAnnouncerService {
    application_state: AppState,
}

impl TickAnnouncerService {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /**
     * Inicia el anunciador alineado al arranque del siguiente tick.
     */
    pub async fn spawn_announcer_daemon(self) {
        let clock = self.application_state.clock;
        let now = Utc::now();

        if !clock.has_started(now) {
            info!(
                "⏳ [TICK]: Game has not started yet. First tick scheduled for {}.",
                clock.first_tick_start().format("%H:%M:%S")
            );
        } else {
            info!(
                "⏱️  [TICK]: Current tick is {}. Next tick scheduled for {}.",
                clock.tick_number(now),
                clock.next_tick_start(now).format("%H:%M:%S")
            );
        }

        let delay_to_next_tick = (clock.next_tick_start(now) - now)
            .to_std()
            .unwrap_or_default();
        let tick_period = clock
            .tick_duration()
            .to_std()
            .expect("FATAL: negative tick duration");

        let mut ticker = interval_at(Instant::now() + delay_to_next_tick, tick_period);

        loop {
            ticker.tick().await;

            let now = Utc::now();
            info!(
                "⏱️  [TICK]: Started tick {}. Next tick scheduled for {}.",
                clock.tick_number(now),
                clock.next_tick_start(now).format("%H:%M:%S")
            );
        }
    }
}
