use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;

use edgeq::{Callback, CallbackQueue, QueueOptions, QueueState};

type TestResult = Result<(), Box<dyn Error>>;

fn refire() -> QueueOptions {
    QueueOptions {
        refire: true,
        requeue: false,
    }
}

fn refire_requeue() -> QueueOptions {
    QueueOptions {
        refire: true,
        requeue: true,
    }
}

fn counting(counter: &Rc<Cell<u32>>) -> Callback<()> {
    let counter = Rc::clone(counter);
    Callback::new(move |_: &mut ()| counter.set(counter.get() + 1))
}

#[test]
fn refire_returns_to_waiting_without_external_stop() -> TestResult {
    let queue = CallbackQueue::with_options((), refire());
    let count = Rc::new(Cell::new(0));

    queue.push(counting(&count));
    assert!(queue.trigger());
    assert_eq!(count.get(), 1);
    assert_eq!(queue.state(), QueueState::Waiting);

    // The queue cycles: pushes queue again, the next trigger fires again.
    queue.push(counting(&count));
    assert_eq!(count.get(), 1);
    assert!(queue.trigger());
    assert_eq!(count.get(), 2);
    assert_eq!(queue.state(), QueueState::Waiting);
    Ok(())
}

#[test]
fn automatic_stop_fires_the_stop_edge_once_per_cycle() -> TestResult {
    let queue = CallbackQueue::with_options((), refire());
    let stops = Rc::new(Cell::new(0));
    {
        let stops = Rc::clone(&stops);
        queue.on_stop(move || stops.set(stops.get() + 1));
    }

    queue.trigger();
    assert_eq!(stops.get(), 1);
    queue.trigger();
    assert_eq!(stops.get(), 2);
    Ok(())
}

#[test]
fn requeue_restores_the_pre_drain_snapshot_unexecuted() -> TestResult {
    let queue = CallbackQueue::with_options((), refire_requeue());
    let count = Rc::new(Cell::new(0));

    queue.push(counting(&count));
    queue.trigger();

    assert_eq!(count.get(), 1);
    assert_eq!(queue.state(), QueueState::Waiting);
    // The snapshot is back, queued and unexecuted.
    assert_eq!(queue.len(), 1);

    queue.trigger();
    assert_eq!(count.get(), 2);
    assert_eq!(queue.len(), 1);
    Ok(())
}

#[test]
fn items_pushed_mid_drain_run_once_and_are_not_requeued() -> TestResult {
    let queue = CallbackQueue::with_options((), refire_requeue());
    let snapshot_runs = Rc::new(Cell::new(0));
    let late_runs = Rc::new(Cell::new(0));

    let late = counting(&late_runs);
    let outer = {
        let handle = queue.clone();
        let snapshot_runs = Rc::clone(&snapshot_runs);
        let late = late.clone();
        Callback::new(move |_: &mut ()| {
            snapshot_runs.set(snapshot_runs.get() + 1);
            handle.push(late.clone());
        })
    };
    queue.push(outer.clone());

    queue.trigger();
    assert_eq!(snapshot_runs.get(), 1);
    assert_eq!(late_runs.get(), 1);

    // Exactly one item survives into the next cycle, and it is the snapshot
    // item, not the mid-drain push.
    assert_eq!(queue.len(), 1);
    assert!(!queue.remove(&late));
    assert!(queue.remove(&outer));
    assert!(queue.is_empty());
    Ok(())
}

#[test]
fn requeue_without_refire_is_neutralized() -> TestResult {
    let queue = CallbackQueue::with_options(
        (),
        QueueOptions {
            refire: false,
            requeue: true,
        },
    );
    // The invalid flag is disabled at construction, observably.
    assert!(!queue.options().requeue);
    assert!(!queue.options().refire);

    let count = Rc::new(Cell::new(0));
    queue.push(counting(&count));
    queue.trigger();

    // Plain queue behaviour: stays Triggered, nothing requeued.
    assert_eq!(count.get(), 1);
    assert_eq!(queue.state(), QueueState::Triggered);
    assert!(queue.is_empty());
    Ok(())
}
