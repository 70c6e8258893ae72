// [apps/raider/src/lib.rs]
/*!
 * =================================================================
 * APARATO: RAIDER SOVEREIGN LIBRARY (V4.2)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-WORKER)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE ESTRATOS DEL AGENTE
 * =================================================================
 */

pub mod engine;
pub mod executor;
pub mod exploit;
pub mod outbox;
pub mod storage;

pub use engine::{Raider, WorkshopOutcome};
pub use exploit::{Batching, Exploit, ExploitConfig, ExploitRunner, TargetingStrategy, TickScope};
pub use storage::RaiderStore;
