//! Job execution: the command boundary and the per-occurrence runner.

mod command;
mod runner;

pub use command::{ActionError, CommandExecutor, ShellExecutor};
pub use runner::{ExecutionRunner, RunOutcome};
