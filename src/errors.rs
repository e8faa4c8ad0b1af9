// src/errors.rs

//! Crate-wide error aliases and structured error types.
//!
//! Ordinary misuse of a queue never produces an error value at all: it is
//! logged and neutralized (see [`ConfigError`] for the cases that exist).
//! The `anyhow` aliases are re-exported for embedding applications that want
//! a single `Result` type across their glue code.

pub use anyhow::{Error, Result};

/// Construction-time configuration problems.
///
/// None of these abort anything bigger than the operation they describe:
/// `RequeueWithoutRefire` is logged and the `requeue` flag is disabled;
/// `EmptyBarrier` is logged and barrier construction is skipped (no listeners
/// are attached to any queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `requeue = true` requires `refire = true`; there is no automatic stop
    /// to restore the snapshot after.
    #[error("requeue requires refire; requeue disabled")]
    RequeueWithoutRefire,

    /// A barrier over zero queues has nothing to wait for.
    #[error("barrier requires at least one queue to track")]
    EmptyBarrier,
}
