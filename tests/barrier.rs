use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;

use edgeq::{Barrier, CallbackQueue, ConfigError, QueueHandle};

type TestResult = Result<(), Box<dyn Error>>;

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

fn bump(count: &Rc<Cell<u32>>) -> impl FnOnce() + 'static {
    let count = Rc::clone(count);
    move || count.set(count.get() + 1)
}

#[test]
fn fires_exactly_once_when_the_last_queue_triggers() -> TestResult {
    let a: CallbackQueue = CallbackQueue::new(());
    let b: CallbackQueue = CallbackQueue::new(());
    let c: CallbackQueue = CallbackQueue::new(());
    let fired = counter();

    let barrier = Barrier::new(&[&a, &b, &c], bump(&fired))?;

    c.trigger();
    assert_eq!(fired.get(), 0);
    a.trigger();
    assert_eq!(fired.get(), 0);
    assert!(!barrier.fired());

    b.trigger();
    assert_eq!(fired.get(), 1);
    assert!(barrier.fired());

    // Later cycles never refire a completed barrier.
    a.stop();
    a.trigger();
    assert_eq!(fired.get(), 1);

    b.stop();
    c.stop();
    a.stop();
    a.trigger();
    b.trigger();
    c.trigger();
    assert_eq!(fired.get(), 1);
    Ok(())
}

#[test]
fn queues_already_triggered_at_construction_are_counted() -> TestResult {
    let a: CallbackQueue = CallbackQueue::new(());
    let b: CallbackQueue = CallbackQueue::new(());
    let c: CallbackQueue = CallbackQueue::new(());
    a.trigger();
    b.trigger();

    let fired = counter();
    let barrier = Barrier::new(&[&a, &b, &c], bump(&fired))?;
    assert_eq!(fired.get(), 0);
    assert!(!barrier.fired());

    c.trigger();
    assert_eq!(fired.get(), 1);
    Ok(())
}

#[test]
fn fires_during_construction_if_everything_is_already_satisfied() -> TestResult {
    let a: CallbackQueue = CallbackQueue::new(());
    let b: CallbackQueue = CallbackQueue::new(());
    a.trigger();
    b.trigger();

    let fired = counter();
    let barrier = Barrier::new(&[&a, &b], bump(&fired))?;
    assert_eq!(fired.get(), 1);
    assert!(barrier.fired());
    Ok(())
}

#[test]
fn a_stopped_queue_clears_its_mark() -> TestResult {
    let a: CallbackQueue = CallbackQueue::new(());
    let b: CallbackQueue = CallbackQueue::new(());
    let c: CallbackQueue = CallbackQueue::new(());
    let fired = counter();
    Barrier::new(&[&a, &b, &c], bump(&fired))?;

    a.trigger();
    a.stop();
    b.trigger();
    c.trigger();
    // The conjunction must hold simultaneously, not one queue at a time.
    assert_eq!(fired.get(), 0);

    a.trigger();
    assert_eq!(fired.get(), 1);
    Ok(())
}

#[test]
fn an_empty_barrier_is_a_configuration_error() -> TestResult {
    let fired = counter();
    let result = Barrier::new(&[], bump(&fired));
    assert_eq!(result.unwrap_err(), ConfigError::EmptyBarrier);
    assert_eq!(fired.get(), 0);
    Ok(())
}

#[test]
fn tracks_queues_of_mixed_context_types() -> TestResult {
    let words = CallbackQueue::new(String::new());
    let totals = CallbackQueue::new(0u32);
    let plain: CallbackQueue = CallbackQueue::new(());

    let fired = counter();
    let handles: [&dyn QueueHandle; 3] = [&words, &totals, &plain];
    Barrier::new(&handles, bump(&fired))?;

    words.trigger();
    totals.trigger();
    assert_eq!(fired.get(), 0);
    plain.trigger();
    assert_eq!(fired.get(), 1);
    Ok(())
}
