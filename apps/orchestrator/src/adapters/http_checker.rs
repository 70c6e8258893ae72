// [apps/orchestrator/src/adapters/http_checker.rs]
/*!
 * =================================================================
 * APARATO: HTTP BULK CHECKER ADAPTER (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: ENVÍO DE LOTES AL VERIFICADOR HTTP DEL JUEGO
 *
 * Habla el dialecto bulk común de los verificadores A/D: PUT del
 * arreglo de banderas, cabecera X-Team-Token, y un arreglo de
 * {flag, status, msg} como respuesta. 'RESUBMIT' y 'ERROR' regresan
 * la bandera a la cola.
 * =================================================================
 */

use crate::adapters::BatchCheckerAdapter;
use async_trait::async_trait;
use avala_domain_models::{FlagSubmissionResponse, SubmissionStatus};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct CheckerVerdict {
    flag: String,
    status: String,
    #[serde(default)]
    msg: String,
}

pub struct HttpCheckerAdapter {
    network_client: Client,
    checker_endpoint: String,
    team_token: Option<String>,
}

impl HttpCheckerAdapter {
    pub fn new(checker_endpoint: String, team_token: Option<String>) -> Self {
        let network_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Avala-Submitter/V4.2")
            .build()
            .expect("FATAL: Checker network client initialization failed.");

        Self {
            network_client,
            checker_endpoint,
            team_token,
        }
    }

    fn classify(raw_status: &str) -> SubmissionStatus {
        match raw_status {
            "ACCEPTED" => SubmissionStatus::Accepted,
            "DENIED" => SubmissionStatus::Rejected,
            // El verificador no decidió: la bandera debe reintentar.
            "RESUBMIT" | "ERROR" => SubmissionStatus::Requeued,
            _ => SubmissionStatus::Requeued,
        }
    }
}

#[async_trait]
impl BatchCheckerAdapter for HttpCheckerAdapter {
    #[instrument(skip(self, flags))]
    async fn submit_batch(&self, flags: &[String]) -> anyhow::Result<Vec<FlagSubmissionResponse>> {
        let mut request = self.network_client.put(&self.checker_endpoint).json(&flags);

        if let Some(token) = &self.team_token {
            request = request.header("X-Team-Token", token);
        }

        let verdicts = request.send().await?.json::<Vec<CheckerVerdict>>().await?;

        Ok(verdicts
            .into_iter()
            .map(|verdict| {
                let status = Self::classify(&verdict.status);
                FlagSubmissionResponse::new(verdict.flag, status, verdict.msg)
            })
            .collect())
    }
}
