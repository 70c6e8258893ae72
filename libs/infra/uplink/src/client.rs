// [libs/infra/uplink/src/client.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN RAIDER UPLINK (V4.2 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: HANDSHAKE, INTAKE Y SUSCRIPCIÓN DE ATTACK DATA
 *
 * VISION HIPER-HOLÍSTICA:
 * Implementa el túnel de comunicación asíncrono entre el agente Raider
 * y el centro de coordinación. El attack data se cachea en disco tras
 * cada adquisición exitosa para sobrevivir caídas del servidor; los
 * parámetros del handshake se exportan para que las corridas one-shot
 * (workshop) arranquen sin tocar la red.
 * =================================================================
 */

use crate::errors::UplinkError;
use avala_domain_models::{AttackData, FlagEnqueueRequest, FlagEnqueueResponse, GameInfo, ScheduleInfo};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Ventana máxima de espera del long-poll de attack data.
const SUBSCRIBE_POLL_WINDOW_SECONDS: u64 = 3600;

/// Directivas de conexión del agente hacia el centro de coordinación.
#[derive(Debug, Clone)]
pub struct ConnectionDirectives {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
}

impl ConnectionDirectives {
    pub fn base_endpoint(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Representación del enlace con la contraseña enmascarada.
    pub fn redacted_endpoint(&self) -> String {
        match &self.password {
            Some(_) => format!(
                "{}://{}:*****@{}:{}",
                self.protocol, self.username, self.host, self.port
            ),
            None => self.base_endpoint(),
        }
    }
}

/// Parámetros del handshake exportables a disco.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExportedSettings {
    base_endpoint: String,
    game: GameInfo,
    schedule: ScheduleInfo,
}

pub struct ServerClient {
    network_session_client: Client,
    directives: ConnectionDirectives,
    dot_directory: PathBuf,
    pub game: Option<GameInfo>,
    pub schedule: Option<ScheduleInfo>,
}

impl ServerClient {
    pub fn new(directives: ConnectionDirectives, dot_directory: PathBuf) -> Result<Self, UplinkError> {
        let network_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("Avala-Raider-Uplink/V4.2")
            .build()?;

        Ok(Self {
            network_session_client: network_client,
            directives,
            dot_directory,
            game: None,
            schedule: None,
        })
    }

    fn authenticated_get(&self, path: &str) -> reqwest::RequestBuilder {
        self.network_session_client
            .get(format!("{}{}", self.directives.base_endpoint(), path))
            .basic_auth(&self.directives.username, self.directives.password.as_deref())
    }

    /**
     * Handshake completo: salud, parámetros del juego y calendario.
     *
     * # Errors:
     * Cualquier fallo aquí es fatal para la ignición del agente; el
     * llamador decide entre abortar o importar parámetros cacheados.
     */
    #[instrument(skip(self))]
    pub async fn connect(&mut self) -> Result<(), UplinkError> {
        info!("🔌 [UPLINK]: Connecting to {}", self.directives.redacted_endpoint());

        let health_response = self.authenticated_get("/connect/health").send().await?;
        if health_response.status() == StatusCode::UNAUTHORIZED {
            return Err(UplinkError::ServerRejection(
                "HTTP_401: invalid credentials, check the password with your teammates".into(),
            ));
        }
        if !health_response.status().is_success() {
            return Err(UplinkError::ServerRejection(format!("HTTP_{}", health_response.status())));
        }

        info!("📡 [UPLINK]: Fetching game information...");
        let game = self
            .authenticated_get("/connect/game")
            .send()
            .await?
            .json::<GameInfo>()
            .await?;

        let schedule = self
            .authenticated_get("/connect/schedule")
            .send()
            .await?
            .json::<ScheduleInfo>()
            .await?;

        self.game = Some(game);
        self.schedule = Some(schedule);

        info!("✅ [UPLINK]: Connected successfully.");
        Ok(())
    }

    /// Ping de vida mínimo. Usado por el drenador del outbox local.
    pub async fn heartbeat(&self) -> Result<(), UplinkError> {
        let response = self.authenticated_get("/connect/health").send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(UplinkError::ServerRejection(format!("HTTP_{}", response.status())))
        }
    }

    /**
     * Entrega una ráfaga de banderas capturadas al intake del servidor.
     */
    #[instrument(skip(self, flags))]
    pub async fn enqueue(
        &self,
        flags: &[String],
        exploit_alias: &str,
        target: &str,
    ) -> Result<FlagEnqueueResponse, UplinkError> {
        let request_body = FlagEnqueueRequest {
            values: flags.to_vec(),
            exploit: exploit_alias.to_string(),
            target: target.to_string(),
        };

        let response = self
            .network_session_client
            .post(format!("{}/flags/queue", self.directives.base_endpoint()))
            .basic_auth(&self.directives.username, self.directives.password.as_deref())
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UplinkError::ServerRejection(format!("HTTP_{}", response.status())));
        }

        let outcome = response.json::<FlagEnqueueResponse>().await?;

        info!(
            "✅ [UPLINK]: Enqueued {}/{} flags from {} via {}.",
            outcome.enqueued,
            flags.len(),
            target,
            exploit_alias
        );

        Ok(outcome)
    }

    /// Attack data vigente; ante fallo o 202, cae al payload cacheado.
    pub async fn get_attack_data(&self) -> Result<AttackData, UplinkError> {
        match self.fetch_attack_data("/attack-data/current", None).await {
            Ok(attack_data) => Ok(attack_data),
            Err(fault) => {
                warn!("⚠️ [UPLINK]: Failed to fetch attack data ({}). Using cached payload.", fault);
                self.cached_attack_data()
            }
        }
    }

    /// Long-poll hasta la próxima decisión del refresher del servidor.
    pub async fn wait_for_attack_data(&self) -> Result<AttackData, UplinkError> {
        let poll_window = Duration::from_secs(SUBSCRIBE_POLL_WINDOW_SECONDS);
        match self.fetch_attack_data("/attack-data/subscribe", Some(poll_window)).await {
            Ok(attack_data) => Ok(attack_data),
            Err(fault) => {
                warn!("⚠️ [UPLINK]: Subscribe failed ({}). Using cached payload.", fault);
                self.cached_attack_data()
            }
        }
    }

    async fn fetch_attack_data(
        &self,
        path: &str,
        timeout_override: Option<Duration>,
    ) -> Result<AttackData, UplinkError> {
        let mut request = self.authenticated_get(path);
        if let Some(window) = timeout_override {
            request = request.timeout(window);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::ACCEPTED {
            return Err(UplinkError::AttackDataNotFetched);
        }
        if !response.status().is_success() {
            return Err(UplinkError::ServerRejection(format!("HTTP_{}", response.status())));
        }

        let payload = response.json::<Value>().await?;
        self.cache_attack_data(&payload)?;

        AttackData::from_value(payload).map_err(|e| UplinkError::PayloadDrift(e.to_string()))
    }

    fn cache_attack_data(&self, payload: &Value) -> Result<(), UplinkError> {
        std::fs::create_dir_all(&self.dot_directory)?;
        let cache_path = self.dot_directory.join("cached_attack_data.json");
        std::fs::write(cache_path, serde_json::to_vec(payload).unwrap_or_default())?;
        Ok(())
    }

    fn cached_attack_data(&self) -> Result<AttackData, UplinkError> {
        let cache_path = self.dot_directory.join("cached_attack_data.json");
        let raw = std::fs::read_to_string(cache_path)?;
        let payload: Value =
            serde_json::from_str(&raw).map_err(|e| UplinkError::PayloadDrift(e.to_string()))?;
        AttackData::from_value(payload).map_err(|e| UplinkError::PayloadDrift(e.to_string()))
    }

    /**
     * Exporta los parámetros del handshake para corridas one-shot.
     */
    pub fn export_settings(&self) -> Result<(), UplinkError> {
        let (Some(game), Some(schedule)) = (&self.game, &self.schedule) else {
            return Err(UplinkError::NotConnected);
        };

        std::fs::create_dir_all(&self.dot_directory)?;

        let settings = ExportedSettings {
            base_endpoint: self.directives.base_endpoint(),
            game: game.clone(),
            schedule: schedule.clone(),
        };

        let settings_path = self.dot_directory.join("api_client.json");
        std::fs::write(
            settings_path,
            serde_json::to_vec(&settings).map_err(|e| UplinkError::PayloadDrift(e.to_string()))?,
        )?;

        Ok(())
    }

    /// Importa parámetros exportados en lugar de ejecutar el handshake.
    pub fn import_settings(&mut self) -> Result<(), UplinkError> {
        let settings_path = self.dot_directory.join("api_client.json");
        let raw = std::fs::read_to_string(settings_path)?;
        let settings: ExportedSettings =
            serde_json::from_str(&raw).map_err(|e| UplinkError::PayloadDrift(e.to_string()))?;

        self.game = Some(settings.game);
        self.schedule = Some(settings.schedule);

        Ok(())
    }

    /// Hosts que un exploit jamás debe atacar (equipo propio + NOP).
    pub fn protected_hosts(&self) -> Vec<String> {
        let mut hosts = Vec::new();
        if let Some(game) = &self.game {
            hosts.extend(game.team_ip.iter().cloned());
            hosts.extend(game.nop_team_ip.iter().cloned());
        }
        hosts
    }
}
