//! Scheduler registry: the set of live timers and their lifecycle.

mod registry;

pub use registry::{SchedulerError, SchedulerRegistry};
