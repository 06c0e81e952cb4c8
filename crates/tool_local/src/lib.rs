//! Local tool adapters
//!
//! Runs scanning tools installed on this host as child processes:
//! - `TokioCommandRunner`: bounded-time, bounded-output process execution
//! - `LocalCommandAdapter`: renders a catalog entry against a target and
//!   applies the tool's empty-output policy
//! - `catalog`: command lines for every local tool

mod adapter;
pub mod catalog;
mod runner;

pub use adapter::{EmptyPolicy, LocalCommandAdapter, LocalToolSpec, TargetForm};
pub use runner::TokioCommandRunner;
