#![forbid(unsafe_code)]

//! Tagged update requests.
//!
//! Setters in interactive state code often accept either a replacement
//! value or a function deriving the next value from the current one.
//! [`Update`] makes that choice explicit: `Set` carries the value,
//! `Transform` carries the derivation, and both are resolved against
//! the current value at mutation time by the component that owns it.
//!
//! `Update<T>` implements `From<T>`, so APIs taking
//! `impl Into<Update<T>>` accept plain values without ceremony.

use std::fmt;

/// An update request: either a replacement value or a derivation from
/// the current value.
pub enum Update<T> {
    /// Replace the current value outright.
    Set(T),
    /// Derive the next value from the current one. The closure runs
    /// exactly once, at resolution time, against the value the owning
    /// component holds at that moment.
    Transform(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Update<T> {
    /// An update that replaces the current value with `value`.
    #[must_use]
    pub fn set(value: T) -> Self {
        Self::Set(value)
    }

    /// An update that derives the next value from the current one.
    #[must_use]
    pub fn transform(f: impl FnOnce(&T) -> T + 'static) -> Self {
        Self::Transform(Box::new(f))
    }

    /// Resolve this request against `current`, producing the next value.
    pub fn resolve(self, current: &T) -> T {
        match self {
            Self::Set(value) => value,
            Self::Transform(f) => f(current),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Self::Set(value)
    }
}

// Manual Debug: the Transform closure has nothing useful to print.
impl<T: fmt::Debug> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}
