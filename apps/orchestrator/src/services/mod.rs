pub mod attack_data_refresher;
pub mod event_bus;
pub mod persister;
pub mod rates_monitor;
pub mod submitter;
pub mod tick_announcer;

pub use attack_data_refresher::AttackDataRefresherService;
pub use event_bus::EventBus;
pub use persister::PersisterService;
pub use rates_monitor::RatesMonitorService;
pub use submitter::SubmitterService;
pub use tick_announcer::TickAnnouncerService;
