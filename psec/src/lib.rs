//! Parallel Section - bounded-concurrency work admission
//!
//! A parallel section accepts keyed work items, never runs the same key twice
//! at once, caps how many items execute concurrently and, when asked, picks
//! the next item so that execution is spread across groups rather than
//! draining one group first.
//!
//! # Example
//!
//! ```ignore
//! use parallel_section::{ParallelSection, RunnableItem};
//!
//! let section = ParallelSection::new(4, true)?;
//! section.open().await;
//! section
//!     .admit(vec![RunnableItem::new("fetch-1", "github", "fetch-1", async { Ok(()) })])
//!     .await;
//! let report = section.drain().await?;
//! ```
//!
//! # Modules
//!
//! - [`section`] - the scheduler and its fairness policy
//! - [`parallel`] - map/for-each over a list with a concurrency limit
//! - [`named_locks`] - per-name async mutexes
//! - [`jobs`] - shell job files run through a section
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod jobs;
pub mod named_locks;
pub mod parallel;
pub mod section;

pub use config::Config;
pub use named_locks::NamedLocks;
pub use parallel::{for_each_with_limit, map_with_limit};
pub use section::{
    DrainReport, ItemFailure, ParallelSection, RunnableItem, SectionConfig, SectionError, SectionState, SectionStats,
};
