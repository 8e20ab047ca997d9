#![forbid(unsafe_code)]

//! Locally accumulated numeric value with explicit commit.
//!
//! [`Scratchpad`] batches arithmetic mutations against bounds and
//! precision entirely locally; only [`commit`](Scratchpad::commit)
//! touches the authoritative ledger, through a caller-supplied
//! function. Remote calls are therefore an explicit, user-intentional
//! action rather than a side effect of every keystroke.
//!
//! # Invariants
//!
//! 1. `current` is always clamped to `[min, max]` and rounded to
//!    `precision` decimal places (when set).
//! 2. `current` is never NaN or infinite: any operation that would
//!    produce a non-finite value is rejected as a no-op.
//! 3. `commit` never mutates or resets `current`; clearing requires an
//!    explicit [`reset`](Scratchpad::reset).

use std::fmt;

use tracing::{debug, trace};

use crate::update::Update;

/// Bounds and precision for a [`Scratchpad`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ScratchpadConfig {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
    /// Decimal places to round to; `None` means no rounding.
    pub precision: Option<u32>,
}

impl Default for ScratchpadConfig {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            precision: None,
        }
    }
}

impl ScratchpadConfig {
    /// Create a configuration with the given bounds and no rounding.
    /// `min` must be less than or equal to `max`, and neither may be NaN.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        debug_assert!(min <= max, "scratchpad bounds inverted: {min} > {max}");
        Self {
            min,
            max,
            precision: None,
        }
    }

    /// Set the number of decimal places to round to.
    #[must_use]
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }
}

/// Direction of a percentage mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum PercentMode {
    /// Increase by the computed percentage of the current value.
    Add,
    /// Decrease by the computed percentage of the current value.
    Subtract,
}

/// A locally accumulated numeric value.
///
/// Mutators return the post-operation value for convenient chaining in
/// event handlers.
#[derive(Clone, PartialEq)]
pub struct Scratchpad {
    current: f64,
    initial: f64,
    config: ScratchpadConfig,
}

impl fmt::Debug for Scratchpad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratchpad")
            .field("current", &self.current)
            .field("initial", &self.initial)
            .field("config", &self.config)
            .finish()
    }
}

impl Scratchpad {
    /// Create a scratchpad seeded with `initial`, normalized against
    /// `config`. A non-finite `initial` falls back to `0.0` clamped
    /// into bounds.
    #[must_use]
    pub fn new(initial: f64, config: ScratchpadConfig) -> Self {
        let seed = Self::normalized(&config, initial)
            .or_else(|| Self::normalized(&config, 0.0))
            .unwrap_or(0.0);
        Self {
            current: seed,
            initial: seed,
            config,
        }
    }

    /// Create an unbounded, unrounded scratchpad seeded with `initial`.
    #[must_use]
    pub fn with_default_config(initial: f64) -> Self {
        Self::new(initial, ScratchpadConfig::default())
    }

    /// Clamp to bounds, then round to the configured precision.
    /// Returns `None` for non-finite candidates.
    fn normalized(config: &ScratchpadConfig, candidate: f64) -> Option<f64> {
        if !candidate.is_finite() {
            return None;
        }
        let clamped = candidate.clamp(config.min, config.max);
        let value = match config.precision {
            Some(p) => {
                let scale = 10f64.powi(p as i32);
                (clamped * scale).round() / scale
            }
            None => clamped,
        };
        value.is_finite().then_some(value)
    }

    /// Install `candidate` as the current value if it normalizes;
    /// otherwise reject the mutation as a guarded no-op.
    fn try_set(&mut self, candidate: f64) -> f64 {
        match Self::normalized(&self.config, candidate) {
            Some(value) => {
                self.current = value;
            }
            None => {
                debug!(
                    target: "keel.pad",
                    candidate,
                    current = self.current,
                    "non-finite result rejected"
                );
            }
        }
        self.current
    }

    // ====================================================================
    // Mutations
    // ====================================================================

    /// Add `n` to the current value.
    pub fn add(&mut self, n: f64) -> f64 {
        self.try_set(self.current + n)
    }

    /// Subtract `n` from the current value.
    pub fn subtract(&mut self, n: f64) -> f64 {
        self.try_set(self.current - n)
    }

    /// Increment by one.
    pub fn increment(&mut self) -> f64 {
        self.add(1.0)
    }

    /// Decrement by one.
    pub fn decrement(&mut self) -> f64 {
        self.subtract(1.0)
    }

    /// Multiply the current value by `n`.
    pub fn multiply(&mut self, n: f64) -> f64 {
        self.try_set(self.current * n)
    }

    /// Divide the current value by `n`. Division by zero is a guarded
    /// no-op, never an error.
    pub fn divide(&mut self, n: f64) -> f64 {
        if n == 0.0 {
            trace!(target: "keel.pad", "division by zero ignored");
            return self.current;
        }
        self.try_set(self.current / n)
    }

    /// Adjust the current value by `p` percent of itself.
    pub fn percentage(&mut self, p: f64, mode: PercentMode) -> f64 {
        let delta = self.current * p / 100.0;
        let candidate = match mode {
            PercentMode::Add => self.current + delta,
            PercentMode::Subtract => self.current - delta,
        };
        self.try_set(candidate)
    }

    /// Replace the current value with `n` (normalized).
    pub fn set(&mut self, n: f64) -> f64 {
        self.try_set(n)
    }

    /// Resolve an [`Update`] against the current value and install the
    /// result (normalized).
    pub fn apply_update(&mut self, update: impl Into<Update<f64>>) -> f64 {
        let candidate = update.into().resolve(&self.current);
        self.try_set(candidate)
    }

    /// Restore the initial value.
    pub fn reset(&mut self) -> f64 {
        debug!(target: "keel.pad", initial = self.initial, "reset");
        self.try_set(self.initial)
    }

    // ====================================================================
    // Commit
    // ====================================================================

    /// Forward the current value to the ledger function and return its
    /// result verbatim. Does not mutate or reset the scratchpad.
    pub fn commit<R>(&self, ledger: impl FnOnce(f64) -> R) -> R {
        debug!(target: "keel.pad", value = self.current, "commit");
        ledger(self.current)
    }

    // ====================================================================
    // Info
    // ====================================================================

    /// The current accumulated value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.current
    }

    /// The reset target.
    #[must_use]
    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// The bounds and precision configuration.
    #[must_use]
    pub fn config(&self) -> &ScratchpadConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================
