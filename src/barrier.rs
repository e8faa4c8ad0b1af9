// src/barrier.rs

//! One-shot AND-combinator over several callback queues.
//!
//! A [`Barrier`] tracks N queues and runs a final callback exactly once, the
//! first time all N are simultaneously `Triggered`. Tracking is per-edge: a
//! queue that stops clears its mark, so the conjunction must hold at one
//! moment, not merely have held entry-by-entry at different times.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error};

use crate::errors::ConfigError;
use crate::queue::{Callback, CallbackQueue};

/// Object-safe view of a [`CallbackQueue`], erasing the context type.
///
/// This is what lets one [`Barrier`] track queues of mixed context types;
/// it is also the crate's answer to "is this value a queue handle" at a
/// component boundary: anything implementing this trait can be tracked.
pub trait QueueHandle {
    /// Register an edge listener for `Waiting` → `Triggered`.
    fn watch_trigger(&self, f: Box<dyn FnMut()>);

    /// Register an edge listener for `Triggered` → `Waiting`.
    fn watch_stop(&self, f: Box<dyn FnMut()>);

    /// Push a context-free, at-most-once marker into the queue's own item
    /// sequence. On a queue that is already `Triggered` the marker runs
    /// synchronously before this returns.
    fn push_marker(&self, f: Box<dyn FnMut()>);
}

impl<C: 'static> QueueHandle for CallbackQueue<C> {
    fn watch_trigger(&self, mut f: Box<dyn FnMut()>) {
        self.on_trigger(move || f());
    }

    fn watch_stop(&self, mut f: Box<dyn FnMut()>) {
        self.on_stop(move || f());
    }

    fn push_marker(&self, mut f: Box<dyn FnMut()>) {
        self.push(Callback::once(move |_ctx: &mut C| f()));
    }
}

/// Fires a final callback exactly once, the first time every tracked queue
/// is simultaneously `Triggered`.
///
/// The set of tracked queues is fixed at construction. Dropping the
/// `Barrier` handle does not detach anything: the wiring lives inside the
/// queues themselves, and the at-most-once guarantee is carried by the
/// shared state, not by this handle.
pub struct Barrier {
    state: Rc<RefCell<BarrierState>>,
}

struct BarrierState {
    /// One flag per tracked queue; cleared again when that queue stops.
    satisfied: Vec<bool>,
    /// Taken on first completion; `None` means the barrier has fired.
    on_ready: Option<Box<dyn FnOnce()>>,
}

impl Barrier {
    /// Build a barrier over `queues` and wire it up.
    ///
    /// Construction is two-phase: the shared state is completed first, then
    /// each queue gets (a) an at-most-once marker pushed into its item
    /// sequence, which catches a queue that is *already* `Triggered` and may
    /// therefore complete the barrier before `new` returns, (b) a
    /// trigger-edge listener with the same effect for future transitions,
    /// and (c) a stop-edge listener clearing that queue's mark.
    ///
    /// An empty `queues` slice is a configuration error: it is logged and
    /// `Err(ConfigError::EmptyBarrier)` is returned with nothing attached to
    /// any queue.
    pub fn new(
        queues: &[&dyn QueueHandle],
        on_ready: impl FnOnce() + 'static,
    ) -> Result<Self, ConfigError> {
        if queues.is_empty() {
            error!(error = %ConfigError::EmptyBarrier, "barrier construction aborted");
            return Err(ConfigError::EmptyBarrier);
        }

        let state = Rc::new(RefCell::new(BarrierState {
            satisfied: vec![false; queues.len()],
            on_ready: Some(Box::new(on_ready)),
        }));

        for (idx, queue) in queues.iter().enumerate() {
            let s = Rc::clone(&state);
            queue.push_marker(Box::new(move || mark(&s, idx)));
            let s = Rc::clone(&state);
            queue.watch_trigger(Box::new(move || mark(&s, idx)));
            let s = Rc::clone(&state);
            queue.watch_stop(Box::new(move || unmark(&s, idx)));
        }

        Ok(Self { state })
    }

    /// True once the final callback has run.
    pub fn fired(&self) -> bool {
        self.state.borrow().on_ready.is_none()
    }
}

/// Mark one entry satisfied and run the final callback if the conjunction
/// now holds. Marking is idempotent, and both the pushed marker and the
/// trigger-edge listener route here, so a double notification for the same
/// transition is harmless.
fn mark(state: &Rc<RefCell<BarrierState>>, idx: usize) {
    let ready = {
        let mut s = state.borrow_mut();
        s.satisfied[idx] = true;
        s.satisfied.iter().all(|&b| b)
    };
    if ready {
        // Take before calling: the callback may touch the queues and re-enter
        // `mark`, and must find the barrier already fired.
        let cb = state.borrow_mut().on_ready.take();
        if let Some(cb) = cb {
            debug!("all tracked queues triggered; running final callback");
            cb();
        }
    }
}

fn unmark(state: &Rc<RefCell<BarrierState>>, idx: usize) {
    state.borrow_mut().satisfied[idx] = false;
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Barrier")
            .field("satisfied", &state.satisfied)
            .field("fired", &state.on_ready.is_none())
            .finish()
    }
}
