// src/queue/core.rs

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::queue::callback::{Callback, Invoked};

/// Current state of a [`CallbackQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Pushes queue; nothing is invoked.
    Waiting,
    /// The queue has been triggered; pushes are invoked synchronously.
    Triggered,
}

/// Construction-time behaviour of a [`CallbackQueue`].
///
/// - `refire`: after every full drain the queue automatically returns to
///   `Waiting`, so the next `trigger()` fires again.
/// - `requeue`: the items present when a drain starts are restored (queued,
///   unexecuted) after the automatic stop. Only meaningful together with
///   `refire`; `requeue` without `refire` is logged and disabled at
///   construction.
///
/// Derives `serde` so embedding applications can carry queue behaviour in
/// their config files; normalization happens at queue construction, not at
/// deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    pub refire: bool,
    pub requeue: bool,
}

impl QueueOptions {
    fn normalized(self) -> Self {
        if self.requeue && !self.refire {
            warn!(
                error = %crate::errors::ConfigError::RequeueWithoutRefire,
                "invalid queue options"
            );
            Self {
                requeue: false,
                ..self
            }
        } else {
            self
        }
    }
}

/// An edge-triggered, reentrant FIFO callback queue.
///
/// `C` is the *bind context*: a single owned value passed `&mut` to every
/// invoked callback. Handles are cheap clones sharing one queue
/// (`Rc`-backed, single-threaded, `!Send`).
///
/// State machine:
///
/// ```text
/// Waiting --trigger()--> Triggered --(drain; if refire) stop()--> Waiting
/// Waiting  --push()--> Waiting    (pure append)
/// Triggered --push()--> Triggered (synchronous invoke)
/// ```
///
/// There is no terminal state; a `refire` queue cycles indefinitely.
pub struct CallbackQueue<C = ()> {
    shared: Rc<Shared<C>>,
}

struct Shared<C> {
    /// Bind context. Kept outside `inner` so a callback holding `&mut C` can
    /// still push into (or query) the queue reentrantly.
    ctx: RefCell<C>,
    inner: RefCell<Inner<C>>,
}

struct Inner<C> {
    items: VecDeque<Callback<C>>,
    state: QueueState,
    refire: bool,
    requeue: bool,
    /// True while a drain loop is running, so a push from inside a callback
    /// appends and lets the active loop pick the item up instead of starting
    /// a nested drain (which would alias the context borrow).
    draining: bool,
    /// Lazily created edge children, `{refire: true, requeue: true}` so each
    /// listener fires once per edge and survives for the next one.
    trigger_edge: Option<CallbackQueue<()>>,
    stop_edge: Option<CallbackQueue<()>>,
}

impl<C> CallbackQueue<C> {
    /// Create a queue in `Waiting` state with default options.
    pub fn new(ctx: C) -> Self {
        Self::with_options(ctx, QueueOptions::default())
    }

    /// Create a queue with explicit [`QueueOptions`].
    ///
    /// Invalid combinations are not an error: `requeue` without `refire` is
    /// logged and neutralized.
    pub fn with_options(ctx: C, options: QueueOptions) -> Self {
        let options = options.normalized();
        Self {
            shared: Rc::new(Shared {
                ctx: RefCell::new(ctx),
                inner: RefCell::new(Inner {
                    items: VecDeque::new(),
                    state: QueueState::Waiting,
                    refire: options.refire,
                    requeue: options.requeue,
                    draining: false,
                    trigger_edge: None,
                    stop_edge: None,
                }),
            }),
        }
    }

    /// Create a queue prepopulated with `items` (queued, not invoked; the
    /// queue starts `Waiting`).
    pub fn with_items(
        ctx: C,
        options: QueueOptions,
        items: impl IntoIterator<Item = Callback<C>>,
    ) -> Self {
        let queue = Self::with_options(ctx, options);
        queue.shared.inner.borrow_mut().items.extend(items);
        queue
    }

    /// Append `item`.
    ///
    /// While `Waiting` this is a pure append. While `Triggered` the newly
    /// appended item is invoked synchronously before `push` returns, unless
    /// the call comes from inside a callback of this same queue, in which
    /// case the item is appended and the running drain invokes it before
    /// that drain finishes.
    pub fn push(&self, item: Callback<C>) -> &Self {
        let run_now = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.items.push_back(item);
            inner.state == QueueState::Triggered && !inner.draining
        };
        if run_now {
            self.drain();
        }
        self
    }

    /// Wrap `f` in a repeating [`Callback`], push it, and return the handle
    /// (useful for a later [`remove`](Self::remove)).
    pub fn push_fn(&self, f: impl FnMut(&mut C) + 'static) -> Callback<C> {
        let cb = Callback::new(f);
        self.push(cb.clone());
        cb
    }

    /// Push several items, preserving their order.
    pub fn extend(&self, items: impl IntoIterator<Item = Callback<C>>) -> &Self {
        for item in items {
            self.push(item);
        }
        self
    }

    /// Transition `Waiting` → `Triggered` and drain the queue.
    ///
    /// Returns `false` (and does nothing) if the queue is already
    /// `Triggered`. Otherwise every queued item is invoked in FIFO order,
    /// including items pushed by callbacks during the drain. Afterwards, on a
    /// `refire` queue, [`stop`](Self::stop) runs internally (firing the stop
    /// edge) and a `requeue` queue restores its pre-drain items. The trigger
    /// edge fires last: strictly after the drain, and after the automatic
    /// stop on a `refire` queue.
    pub fn trigger(&self) -> bool {
        {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.state == QueueState::Triggered {
                debug!("trigger on an already-triggered queue; ignoring");
                return false;
            }
            inner.state = QueueState::Triggered;
        }
        debug!(pending = self.len(), "queue triggered; draining");
        self.drain();

        let edge = self.shared.inner.borrow().trigger_edge.clone();
        if let Some(edge) = edge {
            edge.trigger();
        }
        true
    }

    /// Transition `Triggered` → `Waiting`.
    ///
    /// Returns `false` (and does nothing) if the queue is already `Waiting`.
    /// Subsequent pushes queue again until the next [`trigger`](Self::trigger).
    /// Never interrupts a drain already in progress: a running drain always
    /// runs to exhaustion.
    pub fn stop(&self) -> bool {
        {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.state == QueueState::Waiting {
                debug!("stop on an already-waiting queue; ignoring");
                return false;
            }
            inner.state = QueueState::Waiting;
        }
        let edge = self.shared.inner.borrow().stop_edge.clone();
        if let Some(edge) = edge {
            edge.trigger();
        }
        true
    }

    /// Remove the first queued entry that is the same handle as `item`
    /// (pointer identity). Returns whether anything was removed.
    pub fn remove(&self, item: &Callback<C>) -> bool {
        let mut inner = self.shared.inner.borrow_mut();
        match inner.items.iter().position(|c| c.ptr_eq(item)) {
            Some(idx) => {
                inner.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop all queued items. The state is unchanged.
    pub fn clear(&self) {
        self.shared.inner.borrow_mut().items.clear();
    }

    pub fn state(&self) -> QueueState {
        self.shared.inner.borrow().state
    }

    pub fn is_triggered(&self) -> bool {
        self.state() == QueueState::Triggered
    }

    /// Number of queued (not yet invoked) items.
    pub fn len(&self) -> usize {
        self.shared.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The options this queue was built with, after normalization.
    pub fn options(&self) -> QueueOptions {
        let inner = self.shared.inner.borrow();
        QueueOptions {
            refire: inner.refire,
            requeue: inner.requeue,
        }
    }

    /// Replace the bind context; typically done just before `trigger()` to
    /// pass data into the callbacks. Skipped with a warning if called from
    /// inside a callback (the context is borrowed during invocation).
    pub fn set_context(&self, ctx: C) {
        match self.shared.ctx.try_borrow_mut() {
            Ok(mut slot) => *slot = ctx,
            Err(_) => warn!("set_context called from inside a callback; ignoring"),
        }
    }

    /// Run `f` against the bind context. Returns `None` if called from
    /// inside a callback of this queue.
    pub fn with_context<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let mut ctx = self.shared.ctx.try_borrow_mut().ok()?;
        Some(f(&mut ctx))
    }

    /// Register `f` to run exactly once per `Waiting` → `Triggered`
    /// transition: once per `trigger()` that actually transitions, never per
    /// individual push, never on a repeated `trigger()` while already
    /// `Triggered`.
    ///
    /// Listeners are held in a nested `{refire, requeue}` queue created
    /// lazily on first registration, which is what makes them fire per edge
    /// and remain registered for the next edge.
    pub fn on_trigger(&self, mut f: impl FnMut() + 'static) {
        self.trigger_edge_child()
            .push(Callback::new(move |_: &mut ()| f()));
    }

    /// Register `f` to run exactly once per `Triggered` → `Waiting`
    /// transition, including the automatic stop of a `refire` queue.
    pub fn on_stop(&self, mut f: impl FnMut() + 'static) {
        self.stop_edge_child()
            .push(Callback::new(move |_: &mut ()| f()));
    }

    fn trigger_edge_child(&self) -> CallbackQueue<()> {
        self.shared
            .inner
            .borrow_mut()
            .trigger_edge
            .get_or_insert_with(edge_child)
            .clone()
    }

    fn stop_edge_child(&self) -> CallbackQueue<()> {
        self.shared
            .inner
            .borrow_mut()
            .stop_edge
            .get_or_insert_with(edge_child)
            .clone()
    }

    /// Drain loop shared by `trigger()` and push-while-`Triggered`.
    ///
    /// Pops and invokes items one at a time until the queue is *observed
    /// empty*, not up to a precomputed count, so items appended by
    /// callbacks during the drain are drained too. No borrow of `inner` is
    /// held across an invocation, which is what makes reentrant `push`,
    /// `remove` and state queries from inside callbacks safe.
    fn drain(&self) {
        let snapshot: Vec<Callback<C>> = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.draining {
                return;
            }
            inner.draining = true;
            if inner.requeue {
                inner.items.iter().cloned().collect()
            } else {
                Vec::new()
            }
        };

        loop {
            let Some(cb) = self.shared.inner.borrow_mut().items.pop_front() else {
                break;
            };
            let outcome = match self.shared.ctx.try_borrow_mut() {
                Ok(mut ctx) => cb.invoke(&mut ctx),
                // Only reachable if a drain of this queue is somehow reached
                // from inside one of its own invocations despite the
                // `draining` guard; skip rather than panic.
                Err(_) => {
                    warn!("bind context unavailable during drain; skipping item");
                    continue;
                }
            };
            match outcome {
                Invoked::Ran => {}
                Invoked::Spent => debug!("skipping spent once-callback"),
                Invoked::Busy => {
                    debug!("skipping callback already running further up the stack")
                }
            }
        }

        let (refire, requeue, leftover) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.draining = false;
            (inner.refire, inner.requeue, inner.items.len())
        };

        if refire {
            if leftover > 0 {
                // The loop above exits only on an observed-empty queue, so
                // anything here arrived between that observation and now.
                // Policy: leftovers survive the stop, queued for the next
                // cycle.
                warn!(
                    leftover,
                    "items remained after a drain that should have emptied the queue; \
                     keeping them queued for the next cycle"
                );
            }
            self.stop();
            if requeue {
                self.shared.inner.borrow_mut().items.extend(snapshot);
            }
        }
    }
}

fn edge_child() -> CallbackQueue<()> {
    CallbackQueue::with_options(
        (),
        QueueOptions {
            refire: true,
            requeue: true,
        },
    )
}

impl<C: Default> Default for CallbackQueue<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> Clone for CallbackQueue<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<C> fmt::Debug for CallbackQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.borrow();
        f.debug_struct("CallbackQueue")
            .field("state", &inner.state)
            .field("len", &inner.items.len())
            .field("refire", &inner.refire)
            .field("requeue", &inner.requeue)
            .finish()
    }
}
