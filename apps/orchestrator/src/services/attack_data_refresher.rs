// [apps/orchestrator/src/services/attack_data_refresher.rs]
/*!
 * =================================================================
 * APARATO: ATTACK DATA REFRESHER (V4.2 - CONTENT ADDRESSED)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: RE-ADQUISICIÓN POR TICK DE FLAG IDS DEL JUEGO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BOUNDED RETRY: Fallos del fetcher y payloads repetidos reintentan
 *    hasta 'max_attempts' con 'retry_interval' de pausa; el agotamiento
 *    reutiliza el payload viejo sin desperdiciar el tick.
 * 2. ATOMIC SWAP: Payload y huella md5 mutan en una transacción; los
 *    lectores jamás observan una huella desacoplada.
 * 3. ONE-SHOT WAKE: Tras cada decisión (nueva o reutilizada) se emite
 *    la señal que despierta a los long-polls suscritos.
 *
 * Fallos del fetcher y del procesador se registran y jamás derriban el
 * daemon; el payload anterior permanece visible.
 * =================================================================
 */

use crate::adapters::AttackDataProvider;
use crate::state::AppState;
use avala_domain_models::attack_data::content_hash;
use avala_infra_db::repositories::state::ATTACK_DATA_HASH_KEY;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{error, info, instrument, warn};

pub struct AttackDataRefresherService {
    application_state: AppState,
    provider: Arc<dyn AttackDataProvider>,
}

impl AttackDataRefresherService {
    pub fn new(application_state: AppState, provider: Arc<dyn AttackDataProvider>) -> Self {
        Self {
            application_state,
            provider,
        }
    }

    /**
     * Inicia el daemon alineado al arranque del siguiente tick.
     */
    pub async fn spawn_refresher_daemon(self) {
        let clock = self.application_state.clock;
        let now = Utc::now();

        let delay_to_next_tick = (clock.next_tick_start(now) - now).to_std().unwrap_or_default();
        let tick_period = clock.tick_duration().to_std().expect("FATAL: negative tick duration");

        let mut ticker = interval_at(Instant::now() + delay_to_next_tick, tick_period);

        info!("🛰️  [ATTACK_DATA]: Refresher armed. First probe at next tick start.");

        loop {
            ticker.tick().await;

            if let Err(refresh_fault) = self.reload_attack_data().await {
                error!("❌ [ATTACK_DATA]: Refresh cycle collapsed: {}", refresh_fault);
            }

            // La decisión está tomada (payload nuevo o reutilizado):
            // despertamos a los suscriptores del long-poll.
            self.application_state.announce_attack_data_decision();
        }
    }

    /**
     * Un ciclo completo de re-adquisición.
     *
     * # Logic:
     * 1. Lee la huella vigente del estrato de estado.
     * 2. Adquiere JSON del proveedor con reintento acotado.
     * 3. Compara huellas md5 del payload normalizado.
     * 4. Con payload nuevo: procesa y sella (payload, huella) atómicamente.
     * 5. Con payload repetido agotado: reutiliza el viejo y lo registra.
     */
    #[instrument(skip(self))]
    pub async fn reload_attack_data(&self) -> anyhow::Result<()> {
        let state_repository = self.application_state.state_repository();
        let old_content_hash = state_repository.get(ATTACK_DATA_HASH_KEY).await?;

        let retry_pause =
            Duration::from_secs_f64(self.application_state.config.attack_data.retry_interval.max(0.0));
        let mut attempts_left = self.application_state.config.attack_data.max_attempts;

        let mut fresh_payload: Option<(Value, String)> = None;

        loop {
            let raw_payload = match self.provider.fetch().await {
                Ok(payload) => payload,
                Err(fetch_fault) => {
                    attempts_left = attempts_left.saturating_sub(1);
                    error!("❌ [ATTACK_DATA]: An error occurred while fetching attack data: {}", fetch_fault);

                    if attempts_left == 0 {
                        warn!(
                            "⚠️ [ATTACK_DATA]: Module '{}' seems broken. Check its configuration.",
                            self.application_state.config.attack_data.module
                        );
                        break;
                    }

                    info!(
                        "🔁 [ATTACK_DATA]: Retrying in {:.1}s, {} attempts left.",
                        retry_pause.as_secs_f64(),
                        attempts_left
                    );
                    sleep(retry_pause).await;
                    continue;
                }
            };

            let new_content_hash = content_hash(&raw_payload);
            let payload_updated = old_content_hash.as_deref() != Some(new_content_hash.as_str());

            if payload_updated {
                fresh_payload = Some((raw_payload, new_content_hash));
                break;
            }

            if attempts_left > 0 {
                attempts_left -= 1;
                info!(
                    "🔁 [ATTACK_DATA]: Fetched old attack data ({}). Retrying in {:.1}s, {} attempts left.",
                    &new_content_hash[..8],
                    retry_pause.as_secs_f64(),
                    attempts_left
                );
                sleep(retry_pause).await;
            } else {
                break;
            }
        }

        match fresh_payload {
            Some((raw_payload, new_content_hash)) => {
                info!(
                    "🆕 [ATTACK_DATA]: Fetched new attack data ({} -> {}).",
                    old_content_hash
                        .as_deref()
                        .map(|h| &h[..8])
                        .unwrap_or("none"),
                    &new_content_hash[..8]
                );

                // Un procesador colapsado conserva el payload anterior.
                match self.provider.process(raw_payload).await {
                    Ok(processed_payload) => {
                        state_repository
                            .swap_attack_data(&new_content_hash, &processed_payload.to_string())
                            .await?;
                    }
                    Err(process_fault) => {
                        error!(
                            "❌ [ATTACK_DATA]: Processor collapsed, keeping previous payload: {}",
                            process_fault
                        );
                    }
                }
            }
            None => {
                if let Some(stale_hash) = old_content_hash {
                    info!(
                        "♻️  [ATTACK_DATA]: Reusing old attack data ({}) to avoid wasting tick time.",
                        &stale_hash[..8]
                    );
                } else {
                    error!(
                        "❌ [ATTACK_DATA]: Failed to fetch attack data. Fix module '{}'.",
                        self.application_state.config.attack_data.module
                    );
                }
            }
        }

        Ok(())
    }
}
