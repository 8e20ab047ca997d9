#![forbid(unsafe_code)]

//! keel-state: local-first client state core.
//!
//! This crate lets an interactive application accumulate edits locally,
//! navigate them, and eventually reconcile them with an authoritative
//! remote store, tolerating the remote call's latency and failure
//! without corrupting the locally displayed value.
//!
//! # Key Components
//!
//! - [`HistoryLog`] - Bounded, branch-truncating undo/redo log
//! - [`OptimisticCell`] - Apply-immediately cell with asynchronous
//!   confirmation, rollback, and stale-outcome suppression
//! - [`Scratchpad`] - Local numeric accumulator flushed to a ledger
//!   function by explicit commit
//! - [`Update`] - Tagged update request (value or transform)
//! - [`ChordDispatcher`] - Injected key-chord source for the optional
//!   undo/redo binding
//!
//! # How the pieces fit
//!
//! The three state components share one design problem — keeping a
//! locally-mutated value consistent with an eventually-confirmed
//! authoritative value — but do not call into each other. The caller
//! composes them: a UI event mutates a [`Scratchpad`] or calls
//! [`OptimisticCell::apply`]; a [`HistoryLog`] wired to the same value
//! (for example through [`OptimisticCell::watch`]) records every
//! settled value so the user can step backward and forward regardless
//! of how each value was produced.
//!
//! # Concurrency model
//!
//! Single-threaded cooperative execution. The only suspension point is
//! the confirmation future awaited inside [`OptimisticCell::apply`];
//! everything else is synchronous. Shared pieces use `Rc<RefCell<..>>`
//! handles; there is no locking because there is no parallel mutation,
//! only interleaved asynchronous completions ordered by generation.

pub mod chord;
pub mod history;
pub mod optimistic;
pub mod scratchpad;
pub mod update;

pub use chord::{Binding, Chord, ChordDispatcher, Modifiers, bind_history};
pub use history::{HistoryConfig, HistoryLog, HistorySnapshot, RestoreError};
pub use optimistic::{OptimisticCell, WatchGuard};
pub use scratchpad::{PercentMode, Scratchpad, ScratchpadConfig};
pub use update::Update;
