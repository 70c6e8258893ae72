pub mod client;
pub mod errors;

pub use client::{ConnectionDirectives, ServerClient};
pub use errors::UplinkError;
