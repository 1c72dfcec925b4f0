//! Shared focus context.
//!
//! A [`FocusContext`] tracks which control currently holds keyboard focus.
//! It is the one ambient, mutable resource every party touches: the surface
//! moves focus on Tab, widgets steal it after re-renders, and the guard
//! nudges it back. Nobody owns it exclusively, so it is shared via `Arc`
//! and injected wherever it is needed rather than kept in a global.
//!
//! # Example
//!
//! ```
//! use refocus::control::ControlId;
//! use refocus::focus::FocusContext;
//!
//! let focus = FocusContext::new();
//! let button = ControlId::new();
//!
//! focus.focus(button);
//! assert!(focus.is_focused(button));
//!
//! focus.blur();
//! assert_eq!(focus.focused(), None);
//! ```

use crate::control::ControlId;
use parking_lot::RwLock;

/// Tracks the single control holding keyboard focus.
#[derive(Debug, Default)]
pub struct FocusContext {
    current: RwLock<Option<ControlId>>,
}

impl FocusContext {
    /// Create a context with nothing focused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move focus to a control. Returns the previously focused control.
    pub fn focus(&self, id: ControlId) -> Option<ControlId> {
        self.current.write().replace(id)
    }

    /// Clear focus. Returns the previously focused control.
    pub fn blur(&self) -> Option<ControlId> {
        self.current.write().take()
    }

    /// The control currently holding focus, if any.
    pub fn focused(&self) -> Option<ControlId> {
        *self.current.read()
    }

    /// Whether a specific control holds focus.
    pub fn is_focused(&self, id: ControlId) -> bool {
        *self.current.read() == Some(id)
    }
}
