// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V4.2 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La configuración se valida y las colas se declaran (con recuperación
 * de huérfanos) antes de abrir el socket TCP, previniendo estados de
 * carrera donde un Raider entregue banderas a un conducto a medio
 * construir.
 * =================================================================
 */

use avala_orchestrator::adapters::{build_attack_data_provider, build_checker_binding};
use avala_orchestrator::prelude::*;

use avala_shared_vigil::init_tracing;
use dotenvy::dotenv;
use tracing::{error, info};

/**
 * Punto de ignición supremo del binario del Orchestrator.
 * Exit codes: 0 apagado limpio, 1 fallo fatal de configuración o conexión.
 */
fn main() {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (VIGIL)
    init_tracing("avala_orchestrator");

    // 3. ADQUISICIÓN Y VALIDACIÓN DE LA CONFIGURACIÓN
    let config = match AvalaConfig::load() {
        Ok(config) => config,
        Err(config_fault) => {
            error!("❌ [CONFIG_FATAL]: Configuration validation failed: {}", config_fault);
            std::process::exit(1);
        }
    };

    // 4. CONSTRUCCIÓN DE COLABORADORES EXPLÍCITOS
    // Adaptador del verificador y proveedor de attack data, ligados una
    // sola vez en la ignición. Un módulo roto degrada (linger), no mata.
    let checker_binding = build_checker_binding(&config);
    let attack_data_provider = build_attack_data_provider(&config);

    // 5. CONFIGURACIÓN DEL RUNTIME SOBERANO
    let runtime_orchestrator = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(runtime_fault) => {
            error!("❌ [RUNTIME_FATAL]: Tokio ignition collapsed: {}", runtime_fault);
            std::process::exit(1);
        }
    };

    let ignition_outcome = runtime_orchestrator.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Global ignition sequence starting...");

        // 6. CONSTRUCCIÓN DEL KERNEL SOBERANO (Ledger + Broker + Estado)
        let kernel_instance = OrchestratorKernel::ignite(config).await?;

        // 7. IGNICIÓN DE OPERACIONES (Daemons + HTTP)
        kernel_instance
            .launch_sovereign_operations(checker_binding, attack_data_provider)
            .await
    });

    if let Err(ignition_fault) = ignition_outcome {
        error!("❌ [IGNITION_FATAL]: {}", ignition_fault);
        std::process::exit(1);
    }
}
