//! Bulk retrieval from the declaration search API.
//!
//! A date range is split into single-day partitions, each partition is
//! paged through under a retry policy, and partitions run concurrently in a
//! bounded task group.

pub mod fetcher;
pub mod orchestrator;
pub mod partition;
pub mod retry;
