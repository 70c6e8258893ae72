pub mod attack_data;
pub mod clock;
pub mod flag;
pub mod telemetry;
pub mod wire;

pub use attack_data::{normalize_json, AttackData, ServiceAttackData};
pub use clock::TickClock;
pub use flag::{FlagCounterDelta, FlagRecord, FlagStatus, FlagSubmissionResponse, SubmissionStatus};
pub use telemetry::{IncomingFlagsEvent, QueueRatesSample, RealTimeEvent};
pub use wire::{FlagEnqueueRequest, FlagEnqueueResponse, GameInfo, ScheduleInfo};
