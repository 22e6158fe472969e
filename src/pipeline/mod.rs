//! Batch orchestration: resolution, persistence, progress events and the paging runner.
pub mod events;
mod logic;
mod runner;
pub mod sink;
pub mod structs;

pub use logic::Pipeline;
pub use runner::{RunSummary, Runner};
