//! Interactive controls and the live control registry.
//!
//! A [`Control`] is the guard's view of an interactive element: a role, an
//! accessible label, optional class markers, and an activation handler.
//! Widgets register their controls in a [`ControlRegistry`] while mounted
//! and replace them when a re-render re-creates the underlying element.
//! The registry is re-queried on every recovery round precisely because
//! those re-creations invalidate previously resolved controls.
//!
//! # Example
//!
//! ```
//! use refocus::control::{Control, ControlRegistry, Role};
//!
//! let registry = ControlRegistry::new();
//! let next = Control::new(Role::Button)
//!     .label("Next Month (forward)")
//!     .class("nav-button")
//!     .on_activate(|| { /* advance the month */ });
//!
//! let id = next.id();
//! registry.register(next);
//! assert!(registry.get(id).is_some());
//! ```

use smallvec::SmallVec;
use smartstring::alias::String as SmartString;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub u64);

impl ControlId {
    /// Generate a new unique control ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ControlId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ControlId {
    fn default() -> Self {
        Self::new()
    }
}

/// ARIA-like roles for interactive elements.
///
/// These roles describe the semantic purpose of a control. Only the
/// interactive subset matters here; generic content takes [`Role::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Generic element with no specific semantics.
    #[default]
    None,
    /// Interactive button.
    Button,
    /// Checkbox (can be checked/unchecked).
    Checkbox,
    /// Text input field.
    TextInput,
    /// Tab in a tablist.
    Tab,
    /// Cell in a grid (e.g. a day in a calendar).
    Cell,
}

impl Role {
    /// Returns true if this role is interactive.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            Self::Button | Self::Checkbox | Self::TextInput | Self::Tab
        )
    }
}

/// Activation handler callback type.
pub type ActivationHandler = Arc<dyn Fn() + Send + Sync>;

/// An interactive control the guard can observe, activate, and focus.
#[derive(Clone, Default)]
pub struct Control {
    id: ControlId,
    role: Role,
    label: Option<SmartString>,
    classes: SmallVec<[SmartString; 4]>,
    action: Option<ActivationHandler>,
}

impl Control {
    /// Create a control with a role.
    pub fn new(role: Role) -> Self {
        Self {
            id: ControlId::new(),
            role,
            ..Default::default()
        }
    }

    /// This control's id.
    pub fn id(&self) -> ControlId {
        self.id
    }

    /// This control's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Set the accessible label.
    pub fn label(mut self, label: impl Into<SmartString>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The accessible label, if any.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Add a class marker.
    pub fn class(mut self, class: impl Into<SmartString>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Whether the control carries a class marker.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c.as_str() == class)
    }

    /// Set the activation handler.
    ///
    /// This is what a synthetic activation invokes when the surface's
    /// default activation has been suppressed.
    pub fn on_activate<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(handler));
        self
    }

    /// Invoke the activation handler, if one is set.
    pub fn activate(&self) {
        if let Some(ref action) = self.action {
            action();
        }
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("label", &self.label)
            .field("classes", &self.classes)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Live set of mounted controls.
///
/// Insertion-ordered (IndexMap) so locator scans are deterministic, with
/// O(1) id lookup. Shared between the widget that owns the controls and
/// the guard that queries them.
#[derive(Default)]
pub struct ControlRegistry {
    controls: parking_lot::RwLock<indexmap::IndexMap<ControlId, Control, rustc_hash::FxBuildHasher>>,
}

impl ControlRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a control. Returns its id.
    pub fn register(&self, control: Control) -> ControlId {
        let id = control.id;
        self.controls.write().insert(id, control);
        id
    }

    /// Remove a control. Returns true if it was present.
    pub fn remove(&self, id: ControlId) -> bool {
        self.controls.write().shift_remove(&id).is_some()
    }

    /// Swap a control for its re-rendered successor in one step.
    ///
    /// Removes `old` (if still mounted) and registers `control`, returning
    /// the new id. The new control lands at the end of the registration
    /// order, like any fresh registration.
    pub fn replace(&self, old: ControlId, control: Control) -> ControlId {
        let id = control.id();
        let mut controls = self.controls.write();
        controls.shift_remove(&old);
        controls.insert(id, control);
        id
    }

    /// Remove every control.
    pub fn clear(&self) {
        self.controls.write().clear();
    }

    /// Look up a control by id.
    pub fn get(&self, id: ControlId) -> Option<Control> {
        self.controls.read().get(&id).cloned()
    }

    /// Whether a control is currently mounted.
    pub fn contains(&self, id: ControlId) -> bool {
        self.controls.read().contains_key(&id)
    }

    /// First control matching the predicate, in registration order.
    pub fn find<F>(&self, predicate: F) -> Option<Control>
    where
        F: Fn(&Control) -> bool,
    {
        self.controls
            .read()
            .values()
            .find(|c| predicate(c))
            .cloned()
    }

    /// Number of mounted controls.
    pub fn len(&self) -> usize {
        self.controls.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.controls.read().is_empty()
    }
}
