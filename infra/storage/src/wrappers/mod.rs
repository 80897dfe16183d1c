//! Pass-through decorators.
//!
//! Each wrapper owns one inner [`crate::DynStorage`] and implements every
//! operation by delegating to it, adding a single concern on the way.

mod log;
mod prefix;
mod slow;
mod stats;
mod timeout;
mod trace;

pub use log::LogWrapper;
pub use prefix::PrefixWrapper;
pub use slow::SlowWrapper;
pub use stats::{MetricSink, Observation, Op, OpStats, StatsInner, StatsWrapper};
pub use timeout::{TimeoutWrapper, Timeouts};
pub use trace::TraceWrapper;
