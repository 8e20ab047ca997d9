#![forbid(unsafe_code)]

//! Injected key-chord dispatch.
//!
//! The undo/redo chord binding is an external collaborator of the
//! history log, not part of its contract. Rather than ambient global
//! listeners, the binding is expressed as an injected event source:
//! a [`ChordDispatcher`] that the application feeds chords into, and
//! RAII [`Binding`] guards that scope a handler's lifetime — drop the
//! guard and the chord is ignored again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::history::HistoryLog;

/// Modifier keys held with a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Command on macOS, Windows key elsewhere.
    pub superkey: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        superkey: false,
    };

    /// The platform's primary shortcut modifier: Command on macOS,
    /// Ctrl everywhere else.
    #[must_use]
    pub fn primary() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                superkey: true,
                ..Self::NONE
            }
        } else {
            Self {
                ctrl: true,
                ..Self::NONE
            }
        }
    }

    /// This set of modifiers with shift added.
    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// A key pressed together with a set of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    pub key: char,
    pub modifiers: Modifiers,
}

impl Chord {
    #[must_use]
    pub fn new(key: char, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Case-insensitive key comparison with exact modifier match.
    #[must_use]
    pub fn matches(&self, key: char, modifiers: Modifiers) -> bool {
        self.key.eq_ignore_ascii_case(&key) && self.modifiers == modifiers
    }
}

type HandlerRc = Rc<dyn Fn(&Chord)>;
type HandlerWeak = Weak<dyn Fn(&Chord)>;

/// Fan-out of chord events to weak-referenced handlers.
///
/// Cloning a dispatcher creates a new handle to the **same** handler
/// list. Dead handlers (dropped [`Binding`] guards) are pruned lazily
/// during dispatch.
#[derive(Default)]
pub struct ChordDispatcher {
    handlers: Rc<RefCell<Vec<HandlerWeak>>>,
}

// Manual Clone: shares the same Rc.
impl Clone for ChordDispatcher {
    fn clone(&self) -> Self {
        Self {
            handlers: Rc::clone(&self.handlers),
        }
    }
}

impl ChordDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every dispatched chord.
    ///
    /// Returns a [`Binding`] guard; dropping it unregisters the handler.
    pub fn bind(&self, handler: impl Fn(&Chord) + 'static) -> Binding {
        let strong: HandlerRc = Rc::new(handler);
        let weak = Rc::downgrade(&strong);
        self.handlers.borrow_mut().push(weak);
        Binding {
            _guard: Box::new(strong),
        }
    }

    /// Deliver a chord to all live handlers, pruning dead ones.
    pub fn dispatch(&self, chord: &Chord) {
        let handlers: Vec<HandlerRc> = {
            let mut list = self.handlers.borrow_mut();
            list.retain(|w| w.strong_count() > 0);
            list.iter().filter_map(|w| w.upgrade()).collect()
        };
        trace!(
            target: "keel.chord",
            key = %chord.key,
            handlers = handlers.len(),
            "dispatch"
        );
        for handler in &handlers {
            handler(chord);
        }
    }

    /// Number of registered handlers (including dead ones not yet pruned).
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

/// RAII guard for a chord handler. Dropping it unregisters the handler.
pub struct Binding {
    _guard: Box<dyn std::any::Any>,
}

/// Wire the conventional undo/redo chords to a shared history log.
///
/// Primary+Z undoes; Primary+Shift+Z and Primary+Y redo, where the
/// primary modifier is platform-dependent ([`Modifiers::primary`]).
/// The binding holds the log's handle for its lifetime; drop the
/// returned guard to release it.
pub fn bind_history<T: Clone + PartialEq + 'static>(
    dispatcher: &ChordDispatcher,
    history: Rc<RefCell<HistoryLog<T>>>,
) -> Binding {
    let primary = Modifiers::primary();
    dispatcher.bind(move |chord| {
        if chord.matches('z', primary) {
            history.borrow_mut().undo();
        } else if chord.matches('z', primary.with_shift()) || chord.matches('y', primary) {
            history.borrow_mut().redo();
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
