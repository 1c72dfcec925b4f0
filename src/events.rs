//! Event model and DOM-style dispatch.
//!
//! Events are dispatched in two phases: capture listeners run first, in
//! registration order, then bubble listeners. A listener can stop the
//! remaining propagation or mark the event's default action as prevented;
//! the default action itself (e.g. scrolling the viewport on Space) is the
//! dispatching surface's responsibility and is performed only when the
//! [`DispatchOutcome`] comes back with `default_prevented == false`.
//!
//! [`EventBus`] is the concrete dispatcher. Components that only need to
//! install and remove listeners (like the focus guard) depend on the
//! [`EventSource`] trait instead, so tests can drive them with a bus that
//! has no terminal attached.
//!
//! # Example
//!
//! ```
//! use refocus::events::{EventBus, EventResult, EventSource, KeyCode, KeyEvent, KeyInput, Phase};
//!
//! let bus = EventBus::new();
//! bus.add_key_listener(Phase::Capture, std::sync::Arc::new(|input, state| {
//!     if input.key.code == KeyCode::Char(' ') {
//!         state.prevent_default();
//!         return EventResult::Consumed;
//!     }
//!     EventResult::Ignored
//! }));
//!
//! let outcome = bus.dispatch_key(&KeyInput::new(KeyEvent::plain(KeyCode::Char(' ')), None));
//! assert!(outcome.default_prevented);
//! ```

use crate::control::ControlId;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    /// Control key.
    pub ctrl: bool,
    /// Shift key.
    pub shift: bool,
    /// Alt key.
    pub alt: bool,
    /// Super/Command key.
    pub super_key: bool,
}

impl KeyModifiers {
    /// No modifiers held.
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        super_key: false,
    };

    /// Control held.
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
        alt: false,
        super_key: false,
    };

    /// Shift held.
    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
        alt: false,
        super_key: false,
    };

    /// Alt held.
    pub const ALT: Self = Self {
        ctrl: false,
        shift: false,
        alt: true,
        super_key: false,
    };
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character (Space is `Char(' ')`).
    Char(char),
    /// Enter / Return.
    Enter,
    /// Tab.
    Tab,
    /// Shift+Tab.
    BackTab,
    /// Escape.
    Esc,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Function key.
    F(u8),
    /// A key this event model does not represent.
    Null,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifiers held at the time.
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    /// Create a key event with no modifiers.
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }
}

impl From<crossterm::event::KeyEvent> for KeyEvent {
    fn from(event: crossterm::event::KeyEvent) -> Self {
        use crossterm::event::KeyCode as CtKeyCode;
        use crossterm::event::KeyModifiers as CtModifiers;

        let code = match event.code {
            CtKeyCode::Char(c) => KeyCode::Char(c),
            CtKeyCode::Enter => KeyCode::Enter,
            CtKeyCode::Tab => KeyCode::Tab,
            CtKeyCode::BackTab => KeyCode::BackTab,
            CtKeyCode::Esc => KeyCode::Esc,
            CtKeyCode::Backspace => KeyCode::Backspace,
            CtKeyCode::Delete => KeyCode::Delete,
            CtKeyCode::Up => KeyCode::Up,
            CtKeyCode::Down => KeyCode::Down,
            CtKeyCode::Left => KeyCode::Left,
            CtKeyCode::Right => KeyCode::Right,
            CtKeyCode::Home => KeyCode::Home,
            CtKeyCode::End => KeyCode::End,
            CtKeyCode::PageUp => KeyCode::PageUp,
            CtKeyCode::PageDown => KeyCode::PageDown,
            CtKeyCode::F(n) => KeyCode::F(n),
            _ => KeyCode::Null,
        };

        Self {
            code,
            modifiers: KeyModifiers {
                ctrl: event.modifiers.contains(CtModifiers::CONTROL),
                shift: event.modifiers.contains(CtModifiers::SHIFT),
                alt: event.modifiers.contains(CtModifiers::ALT),
                super_key: event.modifiers.contains(CtModifiers::SUPER),
            },
        }
    }
}

/// Mouse buttons for click events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    /// Left button.
    #[default]
    Left,
    /// Right button.
    Right,
    /// Middle button.
    Middle,
}

impl From<crossterm::event::MouseButton> for MouseButton {
    fn from(button: crossterm::event::MouseButton) -> Self {
        match button {
            crossterm::event::MouseButton::Left => Self::Left,
            crossterm::event::MouseButton::Right => Self::Right,
            crossterm::event::MouseButton::Middle => Self::Middle,
        }
    }
}

/// Dispatch phase for event listeners.
///
/// Capture listeners observe events before bubble listeners, which is how
/// a guard gets to run ahead of a widget's own handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs first, before any bubble listener.
    Capture,
    /// Runs after all capture listeners.
    Bubble,
}

/// Result returned by event listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// The listener acted on the event.
    Consumed,
    /// The listener did not act on the event.
    Ignored,
}

/// A keyboard event paired with its target control.
///
/// Keyboard input targets whichever control holds focus; the dispatching
/// surface resolves that before calling [`EventBus::dispatch_key`].
#[derive(Debug, Clone, Copy)]
pub struct KeyInput {
    /// The key event.
    pub key: KeyEvent,
    /// The control that held focus when the key was pressed, if any.
    pub target: Option<ControlId>,
}

impl KeyInput {
    /// Create a key input.
    pub fn new(key: KeyEvent, target: Option<ControlId>) -> Self {
        Self { key, target }
    }
}

/// A pointer click paired with the control it landed on.
#[derive(Debug, Clone, Copy)]
pub struct ClickInput {
    /// The control that was clicked.
    pub target: ControlId,
    /// Which button was pressed.
    pub button: MouseButton,
}

impl ClickInput {
    /// Create a left-button click on a control.
    pub fn left(target: ControlId) -> Self {
        Self {
            target,
            button: MouseButton::Left,
        }
    }
}

/// Mutable per-dispatch flags shared with listeners.
///
/// Listeners receive a reference to this alongside the event and may mark
/// the default action prevented or stop further propagation.
#[derive(Debug, Default)]
pub struct EventState {
    default_prevented: AtomicBool,
    propagation_stopped: AtomicBool,
}

impl EventState {
    /// Create a fresh state for one dispatch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the surface's default action for this event.
    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    /// Stop the remaining listeners from seeing this event.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::SeqCst);
    }

    /// Whether the default action has been prevented.
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }

    /// Whether propagation has been stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::SeqCst)
    }
}

/// Aggregate result of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Whether any listener consumed the event.
    pub consumed: bool,
    /// Whether the default action was prevented.
    pub default_prevented: bool,
}

/// Key listener callback type.
pub type KeyListener = Arc<dyn Fn(&KeyInput, &EventState) -> EventResult + Send + Sync>;

/// Click listener callback type.
pub type ClickListener = Arc<dyn Fn(&ClickInput, &EventState) -> EventResult + Send + Sync>;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ListenerId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Listener management surface.
///
/// The focus guard attaches through this trait rather than a concrete bus,
/// so any event producer with capture/bubble semantics can host it.
pub trait EventSource: Send + Sync {
    /// Register a key listener for a phase. Returns an id usable with
    /// [`EventSource::remove_listener`].
    fn add_key_listener(&self, phase: Phase, listener: KeyListener) -> ListenerId;

    /// Register a click listener for a phase.
    fn add_click_listener(&self, phase: Phase, listener: ClickListener) -> ListenerId;

    /// Remove a previously registered listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

/// Two-phase event dispatcher.
///
/// Uses parking_lot::RwLock for faster uncontended reads (no poisoning
/// overhead). Listener lists are snapshotted before running so a listener
/// may add or remove listeners without deadlocking; changes take effect on
/// the next dispatch.
#[derive(Default)]
pub struct EventBus {
    key_listeners: RwLock<Vec<(ListenerId, Phase, KeyListener)>>,
    click_listeners: RwLock<Vec<(ListenerId, Phase, ClickListener)>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch a key event through both phases.
    pub fn dispatch_key(&self, input: &KeyInput) -> DispatchOutcome {
        let snapshot: Vec<(Phase, KeyListener)> = {
            let listeners = self.key_listeners.read();
            listeners
                .iter()
                .map(|(_, phase, listener)| (*phase, listener.clone()))
                .collect()
        };

        let state = EventState::new();
        let mut consumed = false;

        for wanted in [Phase::Capture, Phase::Bubble] {
            for (phase, listener) in &snapshot {
                if *phase != wanted {
                    continue;
                }
                if state.is_propagation_stopped() {
                    break;
                }
                if listener(input, &state) == EventResult::Consumed {
                    consumed = true;
                }
            }
            if state.is_propagation_stopped() {
                break;
            }
        }

        DispatchOutcome {
            consumed,
            default_prevented: state.is_default_prevented(),
        }
    }

    /// Dispatch a click event through both phases.
    pub fn dispatch_click(&self, input: &ClickInput) -> DispatchOutcome {
        let snapshot: Vec<(Phase, ClickListener)> = {
            let listeners = self.click_listeners.read();
            listeners
                .iter()
                .map(|(_, phase, listener)| (*phase, listener.clone()))
                .collect()
        };

        let state = EventState::new();
        let mut consumed = false;

        for wanted in [Phase::Capture, Phase::Bubble] {
            for (phase, listener) in &snapshot {
                if *phase != wanted {
                    continue;
                }
                if state.is_propagation_stopped() {
                    break;
                }
                if listener(input, &state) == EventResult::Consumed {
                    consumed = true;
                }
            }
            if state.is_propagation_stopped() {
                break;
            }
        }

        DispatchOutcome {
            consumed,
            default_prevented: state.is_default_prevented(),
        }
    }
}

impl EventSource for EventBus {
    fn add_key_listener(&self, phase: Phase, listener: KeyListener) -> ListenerId {
        let id = ListenerId::next();
        self.key_listeners.write().push((id, phase, listener));
        id
    }

    fn add_click_listener(&self, phase: Phase, listener: ClickListener) -> ListenerId {
        let id = ListenerId::next();
        self.click_listeners.write().push((id, phase, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.key_listeners.write().retain(|(lid, _, _)| *lid != id);
        self.click_listeners.write().retain(|(lid, _, _)| *lid != id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn space() -> KeyInput {
        KeyInput::new(KeyEvent::plain(KeyCode::Char(' ')), None)
    }

    #[test]
    fn test_capture_runs_before_bubble() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        bus.add_key_listener(
            Phase::Bubble,
            Arc::new(move |_, _| {
                o.lock().unwrap().push("bubble");
                EventResult::Ignored
            }),
        );
        let o = order.clone();
        bus.add_key_listener(
            Phase::Capture,
            Arc::new(move |_, _| {
                o.lock().unwrap().push("capture");
                EventResult::Ignored
            }),
        );

        bus.dispatch_key(&space());
        assert_eq!(&*order.lock().unwrap(), &["capture", "bubble"]);
    }

    #[test]
    fn test_registration_order_within_phase() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let o = order.clone();
            bus.add_key_listener(
                Phase::Capture,
                Arc::new(move |_, _| {
                    o.lock().unwrap().push(name);
                    EventResult::Ignored
                }),
            );
        }

        bus.dispatch_key(&space());
        assert_eq!(&*order.lock().unwrap(), &["first", "second", "third"]);
    }

    #[test]
    fn test_stop_propagation_skips_bubble() {
        let bus = EventBus::new();
        let bubble_ran = Arc::new(AtomicBool::new(false));

        bus.add_key_listener(
            Phase::Capture,
            Arc::new(|_, state| {
                state.stop_propagation();
                EventResult::Consumed
            }),
        );
        let ran = bubble_ran.clone();
        bus.add_key_listener(
            Phase::Bubble,
            Arc::new(move |_, _| {
                ran.store(true, Ordering::SeqCst);
                EventResult::Consumed
            }),
        );

        let outcome = bus.dispatch_key(&space());
        assert!(outcome.consumed);
        assert!(!bubble_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_prevent_default_sets_outcome_flag() {
        let bus = EventBus::new();
        bus.add_key_listener(
            Phase::Capture,
            Arc::new(|_, state| {
                state.prevent_default();
                EventResult::Consumed
            }),
        );

        let outcome = bus.dispatch_key(&space());
        assert!(outcome.default_prevented);

        // Propagation continues after prevent_default
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.add_key_listener(
            Phase::Bubble,
            Arc::new(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                EventResult::Ignored
            }),
        );
        bus.dispatch_key(&space());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let id = bus.add_key_listener(
            Phase::Capture,
            Arc::new(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                EventResult::Ignored
            }),
        );

        bus.dispatch_key(&space());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bus.remove_listener(id);
        bus.dispatch_key(&space());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Removing again is a no-op
        bus.remove_listener(id);
    }

    #[test]
    fn test_listener_may_remove_itself_mid_dispatch() {
        let bus = Arc::new(EventBus::new());
        let id_slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let bus2 = bus.clone();
        let slot = id_slot.clone();
        let id = bus.add_key_listener(
            Phase::Capture,
            Arc::new(move |_, _| {
                if let Some(id) = *slot.lock().unwrap() {
                    bus2.remove_listener(id);
                }
                EventResult::Consumed
            }),
        );
        *id_slot.lock().unwrap() = Some(id);

        // Must not deadlock; second dispatch sees the listener gone
        assert!(bus.dispatch_key(&space()).consumed);
        assert!(!bus.dispatch_key(&space()).consumed);
    }

    #[test]
    fn test_click_dispatch_phases() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        bus.add_click_listener(
            Phase::Bubble,
            Arc::new(move |_, _| {
                o.lock().unwrap().push("widget");
                EventResult::Consumed
            }),
        );
        let o = order.clone();
        bus.add_click_listener(
            Phase::Capture,
            Arc::new(move |_, _| {
                o.lock().unwrap().push("guard");
                EventResult::Ignored
            }),
        );

        let outcome = bus.dispatch_click(&ClickInput::left(ControlId(7)));
        assert!(outcome.consumed);
        assert!(!outcome.default_prevented);
        assert_eq!(&*order.lock().unwrap(), &["guard", "widget"]);
    }

    #[test]
    fn test_crossterm_key_conversion() {
        use crossterm::event::{
            KeyCode as CtKeyCode, KeyEvent as CtKeyEvent, KeyModifiers as CtModifiers,
        };

        let event: KeyEvent = CtKeyEvent::new(CtKeyCode::Char(' '), CtModifiers::NONE).into();
        assert_eq!(event.code, KeyCode::Char(' '));
        assert_eq!(event.modifiers, KeyModifiers::NONE);

        let event: KeyEvent = CtKeyEvent::new(CtKeyCode::Enter, CtModifiers::CONTROL).into();
        assert_eq!(event.code, KeyCode::Enter);
        assert!(event.modifiers.ctrl);
        assert!(!event.modifiers.shift);
    }
}
