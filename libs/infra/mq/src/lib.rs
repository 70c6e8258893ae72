pub mod connection;
pub mod errors;
pub mod queue;

pub use connection::BrokerConnection;
pub use errors::MqError;
pub use queue::{Delivery, DurableQueue};

/// Cola de banderas pendientes de envío al verificador.
pub const SUBMISSION_QUEUE: &str = "submission_queue";
/// Cola de veredictos pendientes de persistencia en el Ledger.
pub const PERSISTING_QUEUE: &str = "persisting_queue";
