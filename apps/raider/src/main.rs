// [apps/raider/src/main.rs]
/*!
 * =================================================================
 * APARATO: RAIDER SHELL (V4.2 - ZENITH SHELL)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL MOTOR
 *
 * # Exit codes:
 * 0 — apagado limpio solicitado por el host.
 * 1 — fallo fatal de configuración o de conexión sin parámetros cacheados.
 * 2 — timeout de exploit expirado en una corrida workshop.
 * =================================================================
 */

use avala_raider::Raider;
use avala_infra_uplink::ConnectionDirectives;
use avala_shared_vigil::init_tracing;
use clap::Parser;
use tracing::{error, info};

/**
 * Directivas de mando para el agente soberano.
 * Configuración inyectada vía CLI o variables de entorno.
 */
#[derive(Parser, Debug)]
#[command(
    author = "Raz Podesta <metaShark Tech>",
    version = "4.2",
    about = "Avala Raider // Tick-Aligned Sovereign Attack Agent"
)]
struct RaiderDirectives {
    /// Protocolo del enlace con el Orchestrator.
    #[arg(long, env = "AVALA_PROTOCOL", default_value = "http")]
    protocol: String,

    /// Host del Orchestrator.
    #[arg(long, env = "AVALA_HOST", default_value = "localhost")]
    host: String,

    /// Puerto del Orchestrator.
    #[arg(long, env = "AVALA_PORT", default_value_t = 2024)]
    port: u16,

    /// Nombre del jugador (atributo 'player' de cada bandera).
    #[arg(long, env = "AVALA_USERNAME", default_value = "anon")]
    username: String,

    /// Contraseña compartida del equipo.
    #[arg(long, env = "AVALA_PASSWORD")]
    password: Option<String>,

    /// Directorios de manifiestos de exploits (re-leídos cada tick).
    #[arg(long = "exploits", env = "AVALA_EXPLOIT_DIRS", value_delimiter = ',')]
    exploit_directories: Vec<String>,

    /// Corrida one-shot de los exploits en borrador.
    #[arg(long, default_value_t = false)]
    workshop: bool,
}

#[tokio::main]
async fn main() {
    init_tracing("avala_raider");

    let directives = RaiderDirectives::parse();

    let mut raider = Raider::new(ConnectionDirectives {
        protocol: directives.protocol,
        host: directives.host,
        port: directives.port,
        username: directives.username,
        password: directives.password,
    });

    for directory in &directives.exploit_directories {
        raider.register_directory(directory);
    }

    if directives.workshop {
        match raider.workshop().await {
            Ok(outcome) => {
                info!(
                    "🏁 [SHELL]: Workshop concluded: {} attacks, {} flags enqueued.",
                    outcome.report.attacks_launched, outcome.report.flags_enqueued
                );
                if outcome.timeout_expired() {
                    std::process::exit(2);
                }
            }
            Err(workshop_fault) => {
                error!("❌ [SHELL]: Workshop ignition collapsed: {}", workshop_fault);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(engine_fault) = raider.run().await {
        error!("❌ [SHELL]: Engine ignition collapsed: {}", engine_fault);
        std::process::exit(1);
    }
}
