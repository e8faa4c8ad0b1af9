// src/queue/mod.rs

//! The edge-triggered callback queue.
//!
//! This module ties together:
//! - the invocable item type ([`Callback`]): clonable handle, pointer
//!   identity, repeating or at-most-once
//! - the queue itself ([`CallbackQueue`]): Waiting/Triggered state machine,
//!   the reentrancy-safe drain loop, refire/requeue cycling, and edge
//!   notification via nested queue instances

pub mod callback;
pub mod core;

pub use callback::Callback;
pub use core::{CallbackQueue, QueueOptions, QueueState};
