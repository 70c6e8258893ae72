pub mod flag;
pub mod state;

pub use flag::FlagRepository;
pub use state::StateRepository;
