//! Core job model: identifiers, status lifecycle, job records, and schedules.

pub mod job;
pub mod schedule;
pub mod status;
pub mod types;
