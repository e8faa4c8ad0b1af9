// src/lib.rs

//! `edgeq`: an edge-triggered callback queue and a barrier combinator.
//!
//! Two primitives, one built from the other:
//!
//! - [`CallbackQueue`]: a reentrant FIFO queue of callbacks with two states
//!   (`Waiting`, `Triggered`). While `Waiting`, pushed callbacks are queued;
//!   `trigger()` drains the queue in push order; while `Triggered`, pushes are
//!   invoked synchronously. Optional `refire` (auto-return to `Waiting` after
//!   each drain) and `requeue` (restore the pre-drain items afterwards) make a
//!   queue cycle indefinitely. State *transitions* (edges) can be observed via
//!   [`CallbackQueue::on_trigger`] / [`CallbackQueue::on_stop`]; listeners
//!   fire exactly once per transition, implemented internally as nested
//!   refire+requeue instances of the queue itself.
//! - [`Barrier`]: a one-shot AND-combinator over several queues. Its final
//!   callback fires exactly once, the first time every tracked queue is
//!   simultaneously `Triggered`.
//!
//! Everything is single-threaded and synchronous: `push`, `trigger`, `stop`,
//! drains, edge propagation and the barrier check all run to completion in
//! the calling context. The types are deliberately `!Send` (`Rc`/`RefCell`).
//!
//! Misuse never panics: configuration problems are logged via `tracing` and
//! neutralized, and odd-but-harmless situations (a spent one-shot callback
//! reaching its turn, a callback touching its own queue mid-drain) degrade to
//! logged diagnostics.

pub mod barrier;
pub mod errors;
pub mod logging;
pub mod queue;

pub use crate::barrier::{Barrier, QueueHandle};
pub use crate::errors::ConfigError;
pub use crate::queue::{Callback, CallbackQueue, QueueOptions, QueueState};
