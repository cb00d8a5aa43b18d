//! CodeVox runner - pulls voice-originated coding tasks from a queue, turns each into a
//! commit on a feature branch (optionally with a pull request), and reports the outcome
//! to the controlling API.
//!
//! Jobs are handled strictly one at a time. A job is acknowledged on the queue only
//! after its result has been accepted by the callback endpoint, so delivery is
//! at-least-once and redelivered jobs are reprocessed from scratch.

pub mod callback;
pub mod config;
pub mod generation;
pub mod git;
pub mod github;
pub mod processor;
pub mod queue;
pub mod runner;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
