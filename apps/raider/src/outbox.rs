// [apps/raider/src/outbox.rs]
/*!
 * =================================================================
 * APARATO: OUTBOX RELAY SERVICE (V4.2 - RESILIENCE MASTER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4-WORKER)
 * RESPONSABILIDAD: DRENAJE DEL OUTBOX LOCAL HACIA EL ORCHESTRATOR
 *
 * # Mathematical Proof (Idempotent Drain):
 * El servidor deduplica por valor de bandera; re-entregar un grupo ya
 * parcialmente reconocido solo incrementa 'discarded'. El drenaje es
 * seguro ante cualquier interleaving de caídas.
 * =================================================================
 */

use crate::storage::RaiderStore;
use avala_infra_uplink::ServerClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

/// Cadencia del latido y drenaje, en segundos.
const DRAIN_INTERVAL_SECONDS: u64 = 15;

pub struct OutboxRelayService {
    uplink: Arc<ServerClient>,
    store: RaiderStore,
}

impl OutboxRelayService {
    pub fn new(uplink: Arc<ServerClient>, store: RaiderStore) -> Self {
        Self { uplink, store }
    }

    pub async fn spawn_outbox_daemon(self) {
        let mut drain_ticker = interval(Duration::from_secs(DRAIN_INTERVAL_SECONDS));

        info!("📬 [OUTBOX]: Relay armed. Heartbeat every {}s.", DRAIN_INTERVAL_SECONDS);

        loop {
            drain_ticker.tick().await;

            if let Err(relay_fault) = self.drain_cycle().await {
                error!("❌ [OUTBOX]: Drain cycle collapsed: {}", relay_fault);
            }
        }
    }

    async fn drain_cycle(&self) -> anyhow::Result<()> {
        if self.uplink.heartbeat().await.is_err() {
            let waiting_count = self.store.count_pending().await.unwrap_or(0);
            if waiting_count > 0 {
                warn!(
                    "⚠️ [OUTBOX]: Cannot establish connection with the server. {} flags are waiting to be submitted.",
                    waiting_count
                );
            }
            return Ok(());
        }

        let pending_groups = self.store.pending_groups().await?;
        if pending_groups.is_empty() {
            return Ok(());
        }

        info!("🟢 [OUTBOX]: Server is back online! Submitting pending flags...");

        for (alias, target, values) in pending_groups {
            match self.uplink.enqueue(&values, &alias, &target).await {
                Ok(_) => {
                    self.store.mark_group_submitted(&alias, &target).await?;
                }
                Err(enqueue_fault) => {
                    warn!(
                        "⚠️ [OUTBOX]: Group ({}, {}) still undeliverable: {}",
                        alias, target, enqueue_fault
                    );
                }
            }
        }

        Ok(())
    }
}
