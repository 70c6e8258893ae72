// [apps/orchestrator/src/adapters/http_fetcher.rs]
/*!
 * =================================================================
 * APARATO: HTTP ATTACK DATA FETCHER (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: ADQUISICIÓN DE FLAG IDS DEL SERVIDOR DEL JUEGO
 *
 * El fetch adquiere el JSON crudo (attack.json / teams.json); el
 * procesado verifica que respete la forma servicio -> objetivo -> ticks
 * antes de publicarlo. Upstreams con formatos propietarios requieren
 * un 'AttackDataProvider' a medida inyectado en el kernel.
 * =================================================================
 */

use crate::adapters::AttackDataProvider;
use async_trait::async_trait;
use avala_domain_models::AttackData;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

pub struct HttpAttackDataFetcher {
    network_client: Client,
    upstream_endpoint: String,
}

impl HttpAttackDataFetcher {
    pub fn new(upstream_endpoint: String) -> Self {
        // Timeout corto: un upstream colgado no debe consumir el tick.
        let network_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("Avala-AttackData/V4.2")
            .build()
            .expect("FATAL: Attack data network client initialization failed.");

        Self {
            network_client,
            upstream_endpoint,
        }
    }
}

#[async_trait]
impl AttackDataProvider for HttpAttackDataFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self) -> anyhow::Result<Value> {
        let payload = self
            .network_client
            .get(&self.upstream_endpoint)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(payload)
    }

    async fn process(&self, raw: Value) -> anyhow::Result<Value> {
        // Certifica la travesía servicio -> objetivo -> ticks.
        let attack_data = AttackData::from_value(raw)?;

        for service in attack_data.services() {
            for target in attack_data.targets(&service)? {
                attack_data.ticks(&service, &target)?;
            }
        }

        Ok(attack_data.serialize())
    }
}
