// [apps/orchestrator/src/adapters/mod.rs]
/*!
 * =================================================================
 * APARATO: CHECKER ADAPTER SEAM (V4.2 - EXPLICIT COLLABORATORS)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CONTRATOS PLUGGABLES DEL VERIFICADOR Y DEL FETCHER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL CITIZENSHIP: Dos interfaces disjuntas según la estrategia —
 *    'BatchCheckerAdapter' (lotes, HTTP bulk) y 'StreamCheckerAdapter'
 *    (una bandera por llamada, sesión TCP de larga vida con ciclo
 *    prepare/cleanup). La selección ocurre en la ignición.
 * 2. EXPLICIT BINDING: Los adaptadores son colaboradores inyectados en
 *    los constructores de servicio; no existen singletons globales.
 * 3. LINGER ON VOID: Un módulo desconocido o mal configurado deja al
 *    Submitter en 'ready = false' con rastro de error; el resto del
 *    proceso sigue operando para que el operador corrija en caliente.
 * =================================================================
 */

pub mod http_checker;
pub mod http_fetcher;
pub mod tcp_checker;

use crate::config::{AvalaConfig, SubmitterStrategy};
use async_trait::async_trait;
use avala_domain_models::FlagSubmissionResponse;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

/// Verificador por lotes: recibe el buffer completo y devuelve una
/// tripleta por bandera decidida. Las banderas ausentes de la lista se
/// consideran descartadas por el verificador y regresan a la cola.
#[async_trait]
pub trait BatchCheckerAdapter: Send + Sync {
    async fn submit_batch(&self, flags: &[String]) -> anyhow::Result<Vec<FlagSubmissionResponse>>;
}

/// Verificador de flujo: sesión de larga vida, una bandera por llamada.
#[async_trait]
pub trait StreamCheckerAdapter: Send + Sync {
    /// Establece la sesión antes de consumir. Reinvocado tras cada fallo.
    async fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn submit(&self, flag: &str) -> anyhow::Result<FlagSubmissionResponse>;

    /// Desmonta la sesión. Invocado antes de cada reintento y al salir.
    async fn cleanup(&self) {}
}

/// Proveedor de attack data: fetch crudo + proyección al formato
/// servicio -> objetivo -> ticks.
#[async_trait]
pub trait AttackDataProvider: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Value>;
    async fn process(&self, raw: Value) -> anyhow::Result<Value>;
}

/// Fábrica de adaptadores de flujo: cada worker de la estrategia
/// streams construye su propia instancia, manteniendo la sesión del
/// verificador local al worker.
pub type StreamAdapterFactory = Arc<dyn Fn() -> Arc<dyn StreamCheckerAdapter> + Send + Sync>;

/// Adaptador de verificador ya ligado a su familia de estrategia.
#[derive(Clone)]
pub enum CheckerBinding {
    Batch(Arc<dyn BatchCheckerAdapter>),
    Stream(StreamAdapterFactory),
}

/**
 * Instancia el adaptador incorporado declarado en la configuración y
 * verifica su compatibilidad con la estrategia activa.
 *
 * Retorna 'None' (con rastro de error) ante módulo desconocido, falta
 * de endpoint o mezcla estrategia/familia incompatible.
 */
pub fn build_checker_binding(config: &AvalaConfig) -> Option<CheckerBinding> {
    let strategy = match config.submitter.strategy() {
        Ok(strategy) => strategy,
        Err(fault) => {
            error!("❌ [ADAPTERS]: Strategy resolution collapsed: {}", fault);
            return None;
        }
    };

    let wants_stream = matches!(strategy, SubmitterStrategy::Streams(_));

    match config.submitter.module.as_str() {
        "http_checker" => {
            if wants_stream {
                error!(
                    "❌ [ADAPTERS]: Module 'http_checker' is a batch adapter; incompatible with the streams strategy."
                );
                return None;
            }

            let Some(endpoint) = config.submitter.url.clone() else {
                error!("❌ [ADAPTERS]: Module 'http_checker' requires submitter.url.");
                return None;
            };

            Some(CheckerBinding::Batch(Arc::new(http_checker::HttpCheckerAdapter::new(
                endpoint,
                config.submitter.token.clone(),
            ))))
        }
        "tcp_checker" => {
            if !wants_stream {
                error!(
                    "❌ [ADAPTERS]: Module 'tcp_checker' is a stream adapter; it requires the streams strategy."
                );
                return None;
            }

            let Some(endpoint) = config.submitter.url.clone() else {
                error!("❌ [ADAPTERS]: Module 'tcp_checker' requires submitter.url.");
                return None;
            };

            Some(CheckerBinding::Stream(Arc::new(move || {
                let adapter: Arc<dyn StreamCheckerAdapter> =
                    Arc::new(tcp_checker::TcpCheckerAdapter::new(endpoint.clone()));
                adapter
            })))
        }
        unknown => {
            error!(
                "❌ [ADAPTERS]: Unknown submitter module '{}'. Submitter refuses to start.",
                unknown
            );
            None
        }
    }
}

/// Instancia el proveedor de attack data incorporado.
pub fn build_attack_data_provider(config: &AvalaConfig) -> Option<Arc<dyn AttackDataProvider>> {
    match config.attack_data.module.as_str() {
        "http_fetcher" => {
            let Some(endpoint) = config.attack_data.url.clone() else {
                error!("❌ [ADAPTERS]: Module 'http_fetcher' requires attack_data.url.");
                return None;
            };

            Some(Arc::new(http_fetcher::HttpAttackDataFetcher::new(endpoint)))
        }
        unknown => {
            error!(
                "❌ [ADAPTERS]: Unknown attack data module '{}'. Refresher will not start.",
                unknown
            );
            None
        }
    }
}
