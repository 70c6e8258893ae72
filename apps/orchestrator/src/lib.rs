// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR SOVEREIGN LIBRARY (V4.2)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE ESTRATOS INTERNOS
 * =================================================================
 */

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod kernel;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::adapters::{
        AttackDataProvider, BatchCheckerAdapter, CheckerBinding, StreamCheckerAdapter,
    };
    pub use crate::config::{AvalaConfig, ConfigError, SubmitterStrategy};
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::AppState;
}
