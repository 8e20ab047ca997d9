#![forbid(unsafe_code)]

//! Optimistic-apply/rollback cell with change notification.
//!
//! # Design
//!
//! [`OptimisticCell<T>`] wraps a value in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). [`apply`](OptimisticCell::apply)
//! mutates the working value **eagerly** — before the returned future
//! is first polled — so the caller's UI reflects the edit immediately,
//! then awaits a caller-supplied asynchronous confirmation. On failure
//! the cell rolls back to the value it held when that `apply` started;
//! on success the optimistic value becomes the new baseline.
//!
//! # Generations
//!
//! Every `apply` increments a generation counter and captures it.
//! When a confirmation settles, its outcome may only mutate the cell if
//! its generation is still the latest: a slow, failing confirmation
//! must not stomp on a newer optimistic value that has already
//! succeeded. Superseded outcomes are suppressed locally — their
//! remote side effects have already happened, which is a documented
//! concurrency boundary, not cancellation.
//!
//! ```text
//! Idle ──apply──► Pending ──confirm ok──► Idle   (baseline = optimistic)
//!                    │     ──confirm err─► Idle  (working = rollback target)
//!                    └─apply (overlap)──► Pending, new generation;
//!                      only the latest generation's outcome mutates state
//! ```
//!
//! # Invariants
//!
//! 1. While not pending, `working == baseline`.
//! 2. `version` increments by exactly 1 on each observable change of
//!    the working value.
//! 3. An authoritative value supplied while pending is buffered and
//!    applied when the latest in-flight confirmation settles; it is
//!    never silently dropped and never clobbers the optimistic value
//!    mid-flight.
//! 4. Watchers are notified in registration order; dead watchers are
//!    pruned lazily during notification.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::update::Update;

type WatcherRc<T> = Rc<dyn Fn(&T)>;
type WatcherWeak<T> = Weak<dyn Fn(&T)>;

/// Shared interior for [`OptimisticCell<T>`].
struct CellInner<T> {
    /// Value shown to the caller; may be ahead of `baseline` while
    /// a confirmation is in flight.
    working: T,
    /// Last value known-confirmed or known-authoritative.
    baseline: T,
    /// Generation of the most recent `apply`.
    latest: u64,
    /// Whether the most recent `apply`'s confirmation has settled.
    latest_settled: bool,
    /// Authoritative value received while pending, awaiting settle.
    buffered: Option<T>,
    /// Monotonic counter of observable working-value changes.
    version: u64,
    /// Watchers stored as weak references. Dead entries are pruned on notify.
    watchers: Vec<WatcherWeak<T>>,
}

/// A shared cell that applies edits immediately and reconciles them
/// with an asynchronous confirmation.
///
/// Cloning an `OptimisticCell` creates a new handle to the **same**
/// inner state — both handles see the same value and share watchers.
pub struct OptimisticCell<T> {
    inner: Rc<RefCell<CellInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for OptimisticCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for OptimisticCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("OptimisticCell")
            .field("working", &inner.working)
            .field("baseline", &inner.baseline)
            .field("generation", &inner.latest)
            .field("pending", &!inner.latest_settled)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> OptimisticCell<T> {
    /// Create a cell holding an authoritative initial value.
    #[must_use]
    pub fn new(authoritative: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellInner {
                working: authoritative.clone(),
                baseline: authoritative,
                latest: 0,
                latest_settled: true,
                buffered: None,
                version: 0,
                watchers: Vec::new(),
            })),
        }
    }

    // ====================================================================
    // Apply / settle
    // ====================================================================

    /// Apply an optimistic edit.
    ///
    /// The local mutation happens in this call: the working value is
    /// replaced with the resolved update and watchers fire before the
    /// returned future is polled. The future awaits
    /// `confirm(optimistic_value)` and settles the cell:
    ///
    /// - **Success**: if this `apply` is still the latest, the
    ///   optimistic value becomes the baseline. The working value is
    ///   never reverted on success.
    /// - **Failure**: if still the latest, working and baseline roll
    ///   back to the value held when this `apply` started, and the
    ///   confirmation's error is returned. If superseded by a newer
    ///   `apply`, the rollback is suppressed; the error still
    ///   propagates to this caller.
    ///
    /// The confirmation must settle exactly once; it is not retried.
    pub fn apply<U, F, Fut, E>(
        &self,
        update: U,
        confirm: F,
    ) -> impl Future<Output = Result<(), E>> + use<T, U, F, Fut, E>
    where
        U: Into<Update<T>>,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let (optimistic, rollback, generation, changed) = {
            let mut inner = self.inner.borrow_mut();
            let rollback = inner.working.clone();
            let optimistic = update.into().resolve(&inner.working);
            inner.latest += 1;
            inner.latest_settled = false;
            let generation = inner.latest;
            let changed = optimistic != inner.working;
            if changed {
                inner.working = optimistic.clone();
                inner.version += 1;
            }
            (optimistic, rollback, generation, changed)
        };
        debug!(target: "keel.cell", generation, "optimistic apply");
        if changed {
            self.notify();
        }

        let fut = confirm(optimistic.clone());
        let cell = self.clone();
        async move {
            let result = fut.await;
            cell.settle(generation, optimistic, rollback, result)
        }
    }

    /// Settle the outcome of the confirmation for `generation`.
    fn settle<E>(
        &self,
        generation: u64,
        optimistic: T,
        rollback: T,
        result: Result<(), E>,
    ) -> Result<(), E> {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let latest = generation == inner.latest;
            let mut changed = false;

            match &result {
                Ok(()) => {
                    if latest {
                        debug!(target: "keel.cell", generation, "confirmed");
                        inner.baseline = optimistic;
                    } else {
                        trace!(
                            target: "keel.cell",
                            generation,
                            latest = inner.latest,
                            "stale confirmation ignored"
                        );
                    }
                }
                Err(_) => {
                    if latest {
                        debug!(target: "keel.cell", generation, "confirmation failed; rolling back");
                        inner.baseline = rollback.clone();
                        if inner.working != rollback {
                            inner.working = rollback;
                            inner.version += 1;
                            changed = true;
                        }
                    } else {
                        debug!(
                            target: "keel.cell",
                            generation,
                            latest = inner.latest,
                            "stale failure; rollback suppressed"
                        );
                    }
                }
            }

            if latest {
                inner.latest_settled = true;
                if let Some(authoritative) = inner.buffered.take() {
                    debug!(target: "keel.cell", "buffered authoritative value applied");
                    if inner.working != authoritative {
                        inner.working = authoritative.clone();
                        inner.version += 1;
                        changed = true;
                    }
                    inner.baseline = authoritative;
                }
            }
            changed
        };
        if changed {
            self.notify();
        }
        result
    }

    // ====================================================================
    // Re-baseline
    // ====================================================================

    /// Supply a new authoritative value (server-driven refresh).
    ///
    /// Applied to both working and baseline immediately when idle.
    /// While a confirmation is pending the value is buffered instead,
    /// so the user's optimistic edit is not visibly discarded
    /// mid-flight; the buffer drains when the latest confirmation
    /// settles. A later `rebaseline` while still pending replaces the
    /// buffer (last authoritative value wins).
    pub fn rebaseline(&self, value: T) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if !inner.latest_settled {
                trace!(target: "keel.cell", "authoritative value buffered while pending");
                inner.buffered = Some(value);
                return;
            }
            inner.baseline = value.clone();
            if inner.working != value {
                inner.working = value;
                inner.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
    }

    // ====================================================================
    // Watchers
    // ====================================================================

    /// Watch the working value. The callback fires with a reference to
    /// the new value on every observable change: optimistic apply,
    /// rollback, buffered drain, and rebaseline.
    ///
    /// Returns a [`WatchGuard`]; dropping it unsubscribes the callback.
    pub fn watch(&self, callback: impl Fn(&T) + 'static) -> WatchGuard {
        let strong: WatcherRc<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().watchers.push(weak);
        // Type-erase the strong Rc as `dyn Any`, since `Rc<dyn Fn(&T)>`
        // cannot coerce to `Rc<dyn Any>` directly.
        WatchGuard {
            _guard: Box::new(strong),
        }
    }

    /// Notify live watchers and prune dead ones.
    fn notify(&self) {
        // Collect live callbacks first, so the borrow is not held
        // across the calls.
        let callbacks: Vec<WatcherRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.watchers.retain(|w| w.strong_count() > 0);
            inner.watchers.iter().filter_map(|w| w.upgrade()).collect()
        };
        if callbacks.is_empty() {
            return;
        }

        let value = self.inner.borrow().working.clone();
        for cb in &callbacks {
            cb(&value);
        }
    }

    // ====================================================================
    // Info
    // ====================================================================

    /// Get a clone of the working value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().working.clone()
    }

    /// Access the working value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().working)
    }

    /// Get a clone of the baseline (last confirmed/authoritative) value.
    #[must_use]
    pub fn baseline(&self) -> T {
        self.inner.borrow().baseline.clone()
    }

    /// Whether the most recent `apply`'s confirmation has yet to settle.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.inner.borrow().latest_settled
    }

    /// Generation of the most recent `apply` (0 before any apply).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.borrow().latest
    }

    /// Current version number. Increments by 1 on each observable
    /// change of the working value. Useful for dirty-checking.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of currently registered watchers (including dead ones
    /// not yet pruned).
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.borrow().watchers.len()
    }
}

/// RAII guard for a watcher callback.
///
/// Dropping the guard drops the strong reference to the callback, so
/// the weak reference in the cell's watcher list fails to upgrade on
/// the next notification cycle.
pub struct WatchGuard {
    _guard: Box<dyn std::any::Any>,
}

// ============================================================================
// Tests (synchronous surface; confirmation flows live in tests/)
// ============================================================================
