//! Focus-retention guard for terminal UI controls.
//!
//! Some widgets move keyboard focus as a side effect of re-rendering:
//! activate a calendar's "next month" button and the refreshed month grid
//! grabs focus, stranding keyboard users who wanted to keep paging. On top
//! of that, the activation key itself (Space) carries a default action --
//! scrolling the viewport -- that fires alongside the activation.
//!
//! refocus compensates for both. A [`FocusGuard`] watches an event source
//! in the capture phase, and when an activation lands on a guarded
//! navigation control it:
//!
//! 1. suppresses the surface's default action,
//! 2. synthesizes the control's own activation (which the suppression
//!    would otherwise have swallowed), and
//! 3. opens a bounded *recovery session* that re-applies focus to the
//!    control currently representing the interaction's direction, waiting
//!    out the widget's asynchronous focus steal between rounds, until
//!    focus sticks or the retry budget runs out.
//!
//! # Core Concepts
//!
//! ## Controls and the registry
//!
//! A [`Control`](control::Control) is the guard's view of an interactive
//! element: role, accessible label, class markers, activation handler.
//! Widgets keep mounted controls in a [`ControlRegistry`](control::ControlRegistry)
//! and replace them on re-render; the guard re-queries the registry every
//! round because the element backing "next month" may be brand new each
//! time.
//!
//! ## Direction, not identity
//!
//! Recovery targets a [`NavDirection`](classify::NavDirection), resolved
//! to a concrete control lazily via a replacement locator. The default
//! classification matches accessible labels containing "forward" or
//! "backward" (see [`classify`]).
//!
//! ## Events
//!
//! [`EventBus`](events::EventBus) dispatches key and click events through
//! capture and bubble phases; capture listeners run before any widget
//! handler, which is what lets the guard suppress the default action in
//! time. The guard itself only needs the [`EventSource`](events::EventSource)
//! trait, so tests drive it with a bus that has no terminal attached.
//!
//! ## Outcomes
//!
//! Sessions never raise errors -- the guard is best-effort by design --
//! but every session end is observable: a
//! [`RecoveryOutcome`](guard::RecoveryOutcome) callback and
//! [`GuardMetrics`](guard::GuardMetrics) counters distinguish "recovered"
//! from "gave up".
//!
//! # Example
//!
//! ```
//! use refocus::prelude::*;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(EventBus::new());
//! let controls = Arc::new(ControlRegistry::new());
//! let focus = Arc::new(FocusContext::new());
//!
//! // The widget mounts its navigation buttons
//! let next = Control::new(Role::Button)
//!     .label("Next Month (forward)")
//!     .on_activate(|| { /* advance the month */ });
//! let next_id = controls.register(next);
//!
//! let guard = FocusGuard::builder()
//!     .events(bus.clone())
//!     .controls(controls.clone())
//!     .focus(focus.clone())
//!     .attach()?;
//!
//! // Space on the focused button: default suppressed, activation
//! // synthesized, recovery session opened
//! focus.focus(next_id);
//! let outcome = bus.dispatch_key(&KeyInput::new(
//!     KeyEvent::plain(KeyCode::Char(' ')),
//!     Some(next_id),
//! ));
//! assert!(outcome.default_prevented);
//!
//! guard.detach();
//! # Ok::<(), refocus::guard::GuardError>(())
//! ```

pub mod classify;
pub mod control;
pub mod events;
pub mod focus;
pub mod guard;
pub mod schedule;

pub use classify::NavDirection;
pub use control::{Control, ControlId, ControlRegistry, Role};
pub use events::{EventBus, EventSource, KeyCode, KeyEvent, KeyInput};
pub use focus::FocusContext;
pub use guard::{FocusGuard, GuardError, GuardMetrics, RecoveryOutcome};

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::classify::{
        classify_by_label, default_classifier, default_predicate, NavDirection,
    };
    pub use crate::control::{Control, ControlId, ControlRegistry, Role};
    pub use crate::events::{
        ClickInput, DispatchOutcome, EventBus, EventResult, EventSource, KeyCode, KeyEvent,
        KeyInput, KeyModifiers, MouseButton, Phase,
    };
    pub use crate::focus::FocusContext;
    pub use crate::guard::{FocusGuard, GuardError, GuardMetrics, RecoveryOutcome};
    pub use crate::schedule::{schedule, TimerHandle};
}
