//! Traits at the seams between the scheduler and the outside world.

pub mod capability;
pub mod clock;
pub mod metrics;
pub mod sink;

pub use capability::Capability;
pub use clock::{Clock, ManualClock, SystemClock};
pub use metrics::MetricSource;
pub use sink::LogSink;
