//! Parallel section
//!
//! Admits keyed work items, runs at most `concurrency_limit` of them at once
//! and optionally dispatches across groups so one group cannot starve the
//! others.

mod config;
mod core;
mod error;
pub mod fairness;
mod item;
mod stats;

pub use config::SectionConfig;
pub use core::ParallelSection;
pub use error::SectionError;
pub use item::{ItemAction, ItemFailure, ItemHook, ItemOutcome, RunnableItem};
pub use stats::{DrainReport, SectionState, SectionStats};
