// src/queue/callback.rs

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A unit of work held by a [`CallbackQueue`](crate::CallbackQueue).
///
/// A `Callback` is a cheap-to-clone handle with *pointer identity*: two
/// clones of the same handle compare equal under [`Callback::ptr_eq`], which
/// is what `CallbackQueue::remove` matches on.
///
/// Two flavours exist:
/// - [`Callback::new`] wraps an `FnMut` and can be invoked any number of
///   times (a queue with `requeue` will invoke the same handle once per
///   cycle).
/// - [`Callback::once`] wraps an `FnOnce` that is consumed on first
///   invocation. A spent once-callback still sitting in a queue is not an
///   error: when its turn comes it is skipped with a debug diagnostic.
pub struct Callback<C> {
    slot: Rc<RefCell<Slot<C>>>,
}

enum Slot<C> {
    Repeat(Box<dyn FnMut(&mut C)>),
    Once(Option<Box<dyn FnOnce(&mut C)>>),
}

/// Outcome of attempting to invoke a callback during a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Invoked {
    /// The callback ran.
    Ran,
    /// A once-callback had already been consumed.
    Spent,
    /// The callback is currently executing further up the stack (it was
    /// reached again, reentrantly, through another queue).
    Busy,
}

impl<C> Callback<C> {
    /// Wrap a repeating callback.
    pub fn new(f: impl FnMut(&mut C) + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Repeat(Box::new(f)))),
        }
    }

    /// Wrap a callback that runs at most once, no matter how many queues or
    /// cycles it is pushed through.
    pub fn once(f: impl FnOnce(&mut C) + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Once(Some(Box::new(f))))),
        }
    }

    /// True if `self` and `other` are handles to the same underlying
    /// callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// True for a once-callback that has already run.
    pub fn is_spent(&self) -> bool {
        match self.slot.try_borrow() {
            Ok(slot) => matches!(&*slot, Slot::Once(None)),
            Err(_) => false,
        }
    }

    pub(crate) fn invoke(&self, ctx: &mut C) -> Invoked {
        // try_borrow_mut: the same handle can sit in two queues, and one of
        // its invocations can reach the other queue's drain.
        let Ok(mut slot) = self.slot.try_borrow_mut() else {
            return Invoked::Busy;
        };
        match &mut *slot {
            Slot::Repeat(f) => {
                f(ctx);
                Invoked::Ran
            }
            Slot::Once(f) => match f.take() {
                Some(f) => {
                    f(ctx);
                    Invoked::Ran
                }
                None => Invoked::Spent,
            },
        }
    }
}

impl<C> Clone for Callback<C> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<C> fmt::Debug for Callback<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.slot.try_borrow() {
            Ok(slot) => match &*slot {
                Slot::Repeat(_) => "repeat",
                Slot::Once(Some(_)) => "once",
                Slot::Once(None) => "once(spent)",
            },
            Err(_) => "running",
        };
        f.debug_struct("Callback")
            .field("kind", &kind)
            .field("ptr", &Rc::as_ptr(&self.slot))
            .finish()
    }
}
