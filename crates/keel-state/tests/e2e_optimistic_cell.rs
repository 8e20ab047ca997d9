#![forbid(unsafe_code)]

//! E2E tests for the optimistic cell's confirmation flows.
//!
//! Covers:
//! 1. Success path: optimistic value becomes the baseline
//! 2. Rollback: failing confirmation restores the pre-apply value and
//!    propagates the confirmation's own error
//! 3. Stale-generation suppression: a slow failing confirmation must
//!    not stomp on a newer successful optimistic value
//! 4. Rollback target is the working value at apply time, not the
//!    long-term baseline
//! 5. Authoritative values arriving while pending are buffered, not
//!    dropped
//!
//! Run:
//!   cargo test -p keel-state --test e2e_optimistic_cell

use std::cell::RefCell;
use std::rc::Rc;
use std::task::Poll;

use keel_harness::{Gate, block_on, poll_once};
use keel_state::{OptimisticCell, Update};

#[test]
fn successful_confirmation_commits_baseline() {
    let cell = OptimisticCell::new(10);

    let result: Result<(), String> = block_on(cell.apply(15, |v| {
        assert_eq!(v, 15, "confirmation receives the optimistic value");
        async { Ok(()) }
    }));

    assert_eq!(result, Ok(()));
    assert_eq!(cell.get(), 15);
    assert_eq!(cell.baseline(), 15);
    assert!(!cell.is_pending());
}

#[test]
fn apply_mutates_working_value_before_first_poll() {
    let cell = OptimisticCell::new(10);
    let gate = Gate::new();

    let fut = cell.apply(15, |_| gate.confirm_ok::<String>());

    // The optimistic edit is visible before the future runs at all.
    assert_eq!(cell.get(), 15);
    assert_eq!(cell.baseline(), 10);
    assert!(cell.is_pending());

    gate.open();
    assert_eq!(block_on(fut), Ok(()));
    assert_eq!(cell.baseline(), 15);
    assert!(!cell.is_pending());
}

#[test]
fn failed_confirmation_rolls_back_and_propagates_error() {
    let cell = OptimisticCell::new(10);
    let gate = Gate::new();

    let mut fut = Box::pin(cell.apply(15, |_| gate.confirm_err("rejected".to_string())));
    assert!(poll_once(&mut fut).is_pending());
    assert_eq!(cell.get(), 15);

    gate.open();
    assert_eq!(
        poll_once(&mut fut),
        Poll::Ready(Err("rejected".to_string())),
        "the confirmation's own error reaches the caller"
    );

    assert_eq!(cell.get(), 10);
    assert_eq!(cell.baseline(), 10);
    assert!(!cell.is_pending());
}

#[test]
fn stale_failing_confirmation_does_not_clobber_newer_value() {
    let cell = OptimisticCell::new(1);
    let slow = Gate::new();

    // First apply: its confirmation will fail, slowly.
    let mut f1 = Box::pin(cell.apply(5, |_| slow.confirm_err("slow failure".to_string())));
    assert!(poll_once(&mut f1).is_pending());
    assert_eq!(cell.get(), 5);

    // Second apply supersedes the first and succeeds immediately.
    let f2 = cell.apply(7, |_| async { Ok::<(), String>(()) });
    assert_eq!(block_on(f2), Ok(()));
    assert_eq!(cell.get(), 7);
    assert_eq!(cell.baseline(), 7);
    assert!(!cell.is_pending());

    // The slow failure now settles: the error still propagates to its
    // caller, but the rollback is suppressed.
    slow.open();
    assert_eq!(poll_once(&mut f1), Poll::Ready(Err("slow failure".to_string())));
    assert_eq!(cell.get(), 7, "newer value survives the stale rollback");
    assert_eq!(cell.baseline(), 7);
}

#[test]
fn stale_successful_confirmation_does_not_move_baseline() {
    let cell = OptimisticCell::new(1);
    let slow = Gate::new();

    let mut f1 = Box::pin(cell.apply(5, |_| slow.confirm_ok::<String>()));
    assert!(poll_once(&mut f1).is_pending());

    let gate2 = Gate::new();
    let mut f2 = Box::pin(cell.apply(7, |_| gate2.confirm_ok::<String>()));
    assert!(poll_once(&mut f2).is_pending());

    // The superseded success settles first; generation 2 is still in
    // flight, so the baseline must not move and pending must hold.
    slow.open();
    assert_eq!(poll_once(&mut f1), Poll::Ready(Ok(())));
    assert_eq!(cell.baseline(), 1);
    assert!(cell.is_pending());

    gate2.open();
    assert_eq!(poll_once(&mut f2), Poll::Ready(Ok(())));
    assert_eq!(cell.baseline(), 7);
    assert!(!cell.is_pending());
}

#[test]
fn rollback_target_is_working_value_at_apply_time() {
    let cell = OptimisticCell::new(10);
    let g1 = Gate::new();
    let g2 = Gate::new();

    let mut f1 = Box::pin(cell.apply(15, |_| g1.confirm_err("first".to_string())));
    assert!(poll_once(&mut f1).is_pending());

    // Second apply starts while the first is in flight: its rollback
    // target is 15 (the working value now), not the baseline 10.
    let mut f2 = Box::pin(cell.apply(20, |_| g2.confirm_err("second".to_string())));
    assert!(poll_once(&mut f2).is_pending());
    assert_eq!(cell.get(), 20);

    g2.open();
    assert_eq!(poll_once(&mut f2), Poll::Ready(Err("second".to_string())));
    assert_eq!(cell.get(), 15);
    assert_eq!(cell.baseline(), 15);
    assert!(!cell.is_pending());

    // The first failure is stale by now; nothing moves.
    g1.open();
    assert_eq!(poll_once(&mut f1), Poll::Ready(Err("first".to_string())));
    assert_eq!(cell.get(), 15);
}

#[test]
fn rebaseline_while_pending_is_buffered_until_settle() {
    let cell = OptimisticCell::new(1);
    let gate = Gate::new();

    let mut fut = Box::pin(cell.apply(2, |_| gate.confirm_ok::<String>()));
    assert!(poll_once(&mut fut).is_pending());

    // Authoritative refresh arrives mid-flight: the optimistic edit
    // stays visible, the refresh waits.
    cell.rebaseline(9);
    assert_eq!(cell.get(), 2);
    assert_eq!(cell.baseline(), 1);

    gate.open();
    assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(())));

    // On settle the buffered authoritative value wins.
    assert_eq!(cell.get(), 9);
    assert_eq!(cell.baseline(), 9);
    assert!(!cell.is_pending());
}

#[test]
fn last_buffered_authoritative_value_wins() {
    let cell = OptimisticCell::new(1);
    let gate = Gate::new();

    let mut fut = Box::pin(cell.apply(2, |_| gate.confirm_err("no".to_string())));
    assert!(poll_once(&mut fut).is_pending());

    cell.rebaseline(5);
    cell.rebaseline(6);

    gate.open();
    assert_eq!(poll_once(&mut fut), Poll::Ready(Err("no".to_string())));

    // Rollback happened, then the freshest buffered value replaced it.
    assert_eq!(cell.get(), 6);
    assert_eq!(cell.baseline(), 6);
}

#[test]
fn transform_updates_resolve_against_current_working_value() {
    let cell = OptimisticCell::new(10);

    let result: Result<(), String> = block_on(cell.apply(
        Update::transform(|n: &i32| n + 5),
        |v| async move {
            assert_eq!(v, 15);
            Ok(())
        },
    ));

    assert_eq!(result, Ok(()));
    assert_eq!(cell.get(), 15);
}

#[test]
fn watchers_observe_optimistic_apply_and_rollback() {
    let cell = OptimisticCell::new(10);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _guard = cell.watch(move |v| sink.borrow_mut().push(*v));

    let gate = Gate::new();
    let mut fut = Box::pin(cell.apply(15, |_| gate.confirm_err("rejected".to_string())));
    assert!(poll_once(&mut fut).is_pending());

    gate.open();
    let _ = poll_once(&mut fut);

    assert_eq!(*seen.borrow(), vec![15, 10], "apply then rollback");
}

#[test]
fn generation_counts_every_apply() {
    let cell = OptimisticCell::new(0);
    assert_eq!(cell.generation(), 0);

    let _: Result<(), String> = block_on(cell.apply(1, |_| async { Ok(()) }));
    assert_eq!(cell.generation(), 1);

    let _: Result<(), String> = block_on(cell.apply(2, |_| async { Ok(()) }));
    assert_eq!(cell.generation(), 2);
}
