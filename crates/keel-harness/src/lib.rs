#![forbid(unsafe_code)]

//! Deterministic async test support for keel.
//!
//! The core library is sans-io: the only suspension point it exposes is
//! the confirmation future awaited inside `OptimisticCell::apply`. Tests
//! therefore do not need an executor — they need *control*. This crate
//! provides exactly that:
//!
//! - [`block_on`] drives a future that is already able to complete
//!   (e.g. an `apply` whose confirmation is immediately ready) and
//!   panics if the future stalls, so a test that accidentally awaits an
//!   unfired gate fails loudly instead of hanging.
//! - [`poll_once`] advances a pinned future by a single poll, letting a
//!   test interleave two in-flight confirmations and settle them out of
//!   order.
//! - [`Gate`] is a manually-fired one-shot future. A scripted
//!   confirmation awaits a gate and then resolves to a preset outcome,
//!   so the test decides exactly when (and in what order) confirmations
//!   settle.
//!
//! # Determinism
//!
//! Nothing here spawns threads or sleeps. Every interleaving a test
//! exercises is written out explicitly as a sequence of `poll_once` and
//! `Gate::open` calls, so failures reproduce exactly.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Drive a future to completion without an executor.
///
/// # Panics
///
/// Panics if the future returns `Poll::Pending`. This is deliberate:
/// with no real waker there is nothing to wait for, so a pending future
/// here means the test forgot to open a [`Gate`] first. Use
/// [`poll_once`] for futures that are expected to suspend.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = Box::pin(fut);
    match poll_once(&mut fut) {
        Poll::Ready(output) => output,
        Poll::Pending => panic!(
            "block_on: future stalled; open its Gate before driving it, or use poll_once"
        ),
    }
}

/// Poll a pinned future exactly once with a no-op waker.
pub fn poll_once<F: Future>(fut: &mut Pin<Box<F>>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    fut.as_mut().poll(&mut cx)
}

/// Shared state between a [`Gate`] and its outstanding [`GateWait`]s.
#[derive(Default)]
struct GateState {
    open: bool,
    waker: Option<Waker>,
}

/// A manually-fired one-shot future.
///
/// Cloning a `Gate` shares the same state: any clone may open it, and
/// every [`GateWait`] created from any clone observes the same firing.
/// Once open, a gate stays open.
#[derive(Clone, Default)]
pub struct Gate {
    state: Rc<RefCell<GateState>>,
}

impl Gate {
    /// Create a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. All current and future [`GateWait`]s complete.
    pub fn open(&self) {
        let waker = {
            let mut state = self.state.borrow_mut();
            state.open = true;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Whether the gate has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// A future that completes when the gate opens.
    #[must_use]
    pub fn wait(&self) -> GateWait {
        GateWait {
            state: Rc::clone(&self.state),
        }
    }

    /// A scripted confirmation that succeeds once the gate opens.
    pub fn confirm_ok<E>(&self) -> impl Future<Output = Result<(), E>> + use<E> {
        let wait = self.wait();
        async move {
            wait.await;
            Ok(())
        }
    }

    /// A scripted confirmation that fails with `err` once the gate opens.
    pub fn confirm_err<E>(&self, err: E) -> impl Future<Output = Result<(), E>> + use<E> {
        let wait = self.wait();
        async move {
            wait.await;
            Err(err)
        }
    }
}

/// Future side of a [`Gate`]. Completes when the gate opens.
pub struct GateWait {
    state: Rc<RefCell<GateState>>,
}

impl Future for GateWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.borrow_mut();
        if state.open {
            Poll::Ready(())
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}
