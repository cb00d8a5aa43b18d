//! Core domain types for the runner.
//!
//! Jobs come in from the queue, results go out to the controlling API; everything in
//! between is keyed by [`JobId`].

pub mod ids;
pub mod job;
pub mod result;

pub use ids::{JobId, RepoId, Sha};
pub use job::{DEFAULT_BASE_BRANCH, Job};
pub use result::{JobResult, JobStatus};
