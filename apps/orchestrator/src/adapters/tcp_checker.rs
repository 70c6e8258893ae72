// [apps/orchestrator/src/adapters/tcp_checker.rs]
/*!
 * =================================================================
 * APARATO: TCP STREAM CHECKER ADAPTER (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: SESIÓN TCP DE LARGA VIDA CONTRA EL VERIFICADOR
 *
 * Protocolo de línea clásico de los verificadores A/D: una bandera por
 * línea, una línea de veredicto por bandera. El sufijo clasifica:
 * 'OK' acepta, 'ERR' regresa a la cola, cualquier otro rechaza.
 * El ciclo prepare/cleanup reconstruye la sesión ante fallos.
 * =================================================================
 */

use crate::adapters::StreamCheckerAdapter;
use async_trait::async_trait;
use avala_domain_models::{FlagSubmissionResponse, SubmissionStatus};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

pub struct TcpCheckerAdapter {
    checker_endpoint: String,
    /// Sesión viva del trabajador. Thread-local por diseño: cada worker
    /// de la estrategia streams posee su propia instancia del adaptador.
    session: Mutex<Option<BufReader<TcpStream>>>,
}

impl TcpCheckerAdapter {
    pub fn new(checker_endpoint: String) -> Self {
        Self {
            checker_endpoint,
            session: Mutex::new(None),
        }
    }

    fn classify(verdict_line: &str) -> SubmissionStatus {
        if verdict_line.ends_with("OK") {
            SubmissionStatus::Accepted
        } else if verdict_line.ends_with("ERR") {
            SubmissionStatus::Requeued
        } else {
            SubmissionStatus::Rejected
        }
    }
}

#[async_trait]
impl StreamCheckerAdapter for TcpCheckerAdapter {
    #[instrument(skip(self))]
    async fn prepare(&self) -> anyhow::Result<()> {
        let stream = TcpStream::connect(&self.checker_endpoint).await?;
        let mut session_guard = self.session.lock().await;
        *session_guard = Some(BufReader::new(stream));

        debug!("🔗 [TCP_CHECKER]: Session established with {}.", self.checker_endpoint);
        Ok(())
    }

    async fn submit(&self, flag: &str) -> anyhow::Result<FlagSubmissionResponse> {
        let mut session_guard = self.session.lock().await;
        let session = session_guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("TCP_SESSION_VOID: prepare() has not been run"))?;

        session.get_mut().write_all(flag.as_bytes()).await?;
        session.get_mut().write_all(b"\n").await?;

        let mut verdict_line = String::new();
        let bytes_read = session.read_line(&mut verdict_line).await?;
        if bytes_read == 0 {
            return Err(anyhow::anyhow!("TCP_SESSION_SEVERED: checker closed the stream"));
        }

        let verdict_line = verdict_line.trim().to_string();
        let status = Self::classify(&verdict_line);

        // El verificador antepone la bandera al veredicto; si no lo hace,
        // la identidad del mensaje enviado es la autoridad.
        let echoed_value = verdict_line.split(' ').next().unwrap_or(flag).to_string();
        let value = if echoed_value.is_empty() { flag.to_string() } else { echoed_value };

        Ok(FlagSubmissionResponse::new(value, status, verdict_line))
    }

    async fn cleanup(&self) {
        let mut session_guard = self.session.lock().await;
        *session_guard = None;
        debug!("🔌 [TCP_CHECKER]: Session dismantled.");
    }
}
