//! Concurrent state containers shared by every connection task.
//!
//! - [`ConcurrentMap`]: keyed mapping with zero-value reads, snapshot
//!   iteration, and whole-container transactions.
//! - [`ConcurrentCounter`]: atomic numeric counter.

pub mod counter;
pub mod map;

pub use counter::ConcurrentCounter;
pub use map::{ConcurrentMap, MapTransaction};
