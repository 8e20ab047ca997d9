#![forbid(unsafe_code)]

//! Bounded, branch-truncating undo/redo history log.
//!
//! [`HistoryLog`] keeps an ordered sequence of snapshots plus a cursor
//! addressing the currently active one. Pushing while the cursor sits
//! in the middle of the log discards the redo branch, so the log always
//! reads as one linear timeline; capacity is enforced by evicting from
//! the front, so the oldest retained history is always dropped first,
//! never the newest.
//!
//! # Invariants
//!
//! 1. `entries` is never empty (seeded with the initial value).
//! 2. `cursor < entries.len()` (the cursor always addresses a snapshot).
//! 3. `entries.len() <= config.capacity` (after any operation).
//! 4. A push of the value already at the cursor is a no-op.
//!
//! # Memory Model
//!
//! Snapshots are stored in a `VecDeque` for O(1) eviction from the
//! front. The log stores whatever `T` the caller hands it; callers with
//! large states should push cheaply-cloneable snapshots (`Arc<State>`,
//! persistent collections) rather than deep copies.
//!
//! ```text
//! push(s3)
//! ┌─────────────────────────────────────────────┐
//! │ entries: [s0, s1, s2, s3]     cursor: 3     │
//! └─────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌─────────────────────────────────────────────┐
//! │ entries: [s0, s1, s2, s3]     cursor: 1     │
//! └─────────────────────────────────────────────┘
//!
//! push(s4) — new branch, truncates the redo branch
//! ┌─────────────────────────────────────────────┐
//! │ entries: [s0, s1, s4]         cursor: 2     │
//! └─────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace};

use crate::update::Update;

/// Configuration for the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HistoryConfig {
    /// Maximum number of snapshots retained, including the active one.
    /// Values below 1 are treated as 1.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl HistoryConfig {
    /// Create a configuration with the given capacity (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Create an unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            capacity: usize::MAX,
        }
    }
}

/// A bounded undo/redo log of snapshots with a cursor.
///
/// Created with a seed value and never empty thereafter. `T` must be
/// equality-comparable so consecutive identical snapshots can be
/// suppressed, and cloneable so [`clear`](HistoryLog::clear) can retain
/// the active value.
#[derive(PartialEq)]
pub struct HistoryLog<T> {
    /// Snapshots in chronological order (front = oldest).
    entries: VecDeque<T>,
    /// Index of the currently active snapshot.
    cursor: usize,
    /// Capacity limit.
    config: HistoryConfig,
}

impl<T: fmt::Debug> fmt::Debug for HistoryLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryLog")
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .finish()
    }
}

impl<T: Clone + PartialEq> HistoryLog<T> {
    /// Create a new log seeded with `initial`.
    #[must_use]
    pub fn new(initial: T, config: HistoryConfig) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(initial);
        Self {
            entries,
            cursor: 0,
            config,
        }
    }

    /// Create a new log seeded with `initial` and default configuration.
    #[must_use]
    pub fn with_default_config(initial: T) -> Self {
        Self::new(initial, HistoryConfig::default())
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Record a new snapshot.
    ///
    /// If `value` equals the snapshot at the cursor this is a no-op.
    /// Otherwise the redo branch is discarded, the value appended, and
    /// the cursor advanced; if capacity is exceeded the oldest snapshot
    /// is evicted and the cursor adjusted to keep addressing the same
    /// logical entry.
    ///
    /// Returns `true` if the log changed.
    pub fn push(&mut self, value: T) -> bool {
        if self.entries[self.cursor] == value {
            trace!(target: "keel.history", cursor = self.cursor, "unchanged push ignored");
            return false;
        }

        // Discard the redo branch, if any.
        let truncated = self.entries.len() - (self.cursor + 1);
        self.entries.truncate(self.cursor + 1);

        self.entries.push_back(value);
        self.cursor += 1;

        // The field is public; honor the documented minimum of 1.
        let capacity = self.config.capacity.max(1);
        let mut evicted = 0usize;
        while self.entries.len() > capacity {
            self.entries.pop_front();
            self.cursor -= 1;
            evicted += 1;
        }

        debug!(
            target: "keel.history",
            len = self.entries.len(),
            cursor = self.cursor,
            truncated,
            evicted,
            "push"
        );
        true
    }

    /// Resolve an [`Update`] against the active snapshot and push the
    /// result. Returns `true` if the log changed.
    pub fn push_update(&mut self, update: impl Into<Update<T>>) -> bool {
        let next = update.into().resolve(self.value());
        self.push(next)
    }

    /// Step the cursor back one snapshot. No-op at the start of history.
    ///
    /// Returns `true` if the cursor moved.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            trace!(target: "keel.history", "undo at start of history ignored");
            return false;
        }
        self.cursor -= 1;
        debug!(target: "keel.history", cursor = self.cursor, "undo");
        true
    }

    /// Step the cursor forward one snapshot. No-op at the head.
    ///
    /// Returns `true` if the cursor moved.
    pub fn redo(&mut self) -> bool {
        if self.cursor + 1 == self.entries.len() {
            trace!(target: "keel.history", "redo at head of history ignored");
            return false;
        }
        self.cursor += 1;
        debug!(target: "keel.history", cursor = self.cursor, "redo");
        true
    }

    /// Collapse the log to a single entry holding the active value.
    pub fn clear(&mut self) {
        let current = self.entries[self.cursor].clone();
        self.entries.clear();
        self.entries.push_back(current);
        self.cursor = 0;
        debug!(target: "keel.history", "history cleared");
    }

    // ====================================================================
    // Info
    // ====================================================================

    /// Whether a snapshot exists before the cursor.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a snapshot exists after the cursor.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// The currently active snapshot.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.entries[self.cursor]
    }

    /// Number of snapshots retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; the log is seeded and never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Current cursor position.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Snapshots available to undo through.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    /// Snapshots available to redo through.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.entries.len() - 1 - self.cursor
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ====================================================================
    // Persistence hooks
    // ====================================================================

    /// Export the log's contents for external persistence.
    #[must_use]
    pub fn export(&self) -> HistorySnapshot<T> {
        HistorySnapshot {
            entries: self.entries.iter().cloned().collect(),
            cursor: self.cursor,
        }
    }

    /// Rebuild a log from a previously exported snapshot.
    ///
    /// The snapshot is validated against the log invariants; a snapshot
    /// larger than `config.capacity` is rejected rather than silently
    /// truncated, since eviction choices belong to the live log.
    pub fn restore(snapshot: HistorySnapshot<T>, config: HistoryConfig) -> Result<Self, RestoreError> {
        if snapshot.entries.is_empty() {
            return Err(RestoreError::Empty);
        }
        if snapshot.cursor >= snapshot.entries.len() {
            return Err(RestoreError::CursorOutOfBounds {
                cursor: snapshot.cursor,
                len: snapshot.entries.len(),
            });
        }
        let capacity = config.capacity.max(1);
        if snapshot.entries.len() > capacity {
            return Err(RestoreError::OverCapacity {
                len: snapshot.entries.len(),
                capacity,
            });
        }
        Ok(Self {
            entries: snapshot.entries.into(),
            cursor: snapshot.cursor,
            config,
        })
    }
}

/// Exported contents of a [`HistoryLog`], suitable for handing to an
/// external persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HistorySnapshot<T> {
    /// Snapshots in chronological order.
    pub entries: Vec<T>,
    /// Index of the active snapshot.
    pub cursor: usize,
}

/// Errors from [`HistoryLog::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    /// The snapshot held no entries; a log is never empty.
    Empty,
    /// The snapshot's cursor did not address an entry.
    CursorOutOfBounds { cursor: usize, len: usize },
    /// The snapshot held more entries than the configured capacity.
    OverCapacity { len: usize, capacity: usize },
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "history snapshot is empty"),
            Self::CursorOutOfBounds { cursor, len } => {
                write!(f, "cursor {} out of bounds (length {})", cursor, len)
            }
            Self::OverCapacity { len, capacity } => {
                write!(f, "snapshot length {} exceeds capacity {}", len, capacity)
            }
        }
    }
}

impl std::error::Error for RestoreError {}

// ============================================================================
// Tests
// ============================================================================
