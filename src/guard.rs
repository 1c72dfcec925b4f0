//! The focus-retention guard.
//!
//! [`FocusGuard`] keeps keyboard focus on a navigation control across an
//! asynchronous, externally-triggered re-render that would otherwise move
//! focus away, and suppresses the surface's default action (viewport
//! scroll) triggered by the same activation key.
//!
//! The guard installs capture-phase key and click listeners on an
//! [`EventSource`]. When an activation key lands on a
//! guarded control it prevents the default action, synthesizes the
//! control's activation, and opens a recovery session: re-apply focus to
//! the control currently representing the interaction's direction, wait
//! out the widget's own focus steal, and re-check, up to a bounded number
//! of rounds. Every failure mode degrades silently to "stop trying" -- the
//! guard is a best-effort compensator, not a correctness-critical path --
//! but each session's end is observable through [`RecoveryOutcome`]
//! callbacks and [`GuardMetrics`] counters.
//!
//! # Example
//!
//! ```
//! use refocus::control::ControlRegistry;
//! use refocus::events::EventBus;
//! use refocus::focus::FocusContext;
//! use refocus::guard::FocusGuard;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(EventBus::new());
//! let controls = Arc::new(ControlRegistry::new());
//! let focus = Arc::new(FocusContext::new());
//!
//! let guard = FocusGuard::builder()
//!     .events(bus.clone())
//!     .controls(controls.clone())
//!     .focus(focus.clone())
//!     .attach()
//!     .expect("collaborators are set");
//!
//! // ... dispatch key/click events through the bus ...
//!
//! guard.detach();
//! ```

use crate::classify::{
    default_classifier, default_predicate, locate_by_direction, DirectionClassifier,
    GuardPredicate, NavDirection, ReplacementLocator,
};
use crate::control::{ControlId, ControlRegistry};
use crate::events::{
    ClickInput, EventResult, EventSource, EventState, KeyCode, KeyInput, ListenerId, MouseButton,
    Phase,
};
use crate::focus::FocusContext;
use crate::schedule::{schedule, TimerHandle};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delay before the first recovery round, leaving the widget time to
/// finish its own re-render.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(10);

/// Delay between applying focus and re-checking that it stuck.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Default bound on focus-reapplication rounds per session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Guard attachment errors.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// No event source was provided.
    #[error("No event source set. Call .events() before .attach()")]
    MissingEventSource,
    /// No control registry was provided.
    #[error("No control registry set. Call .controls() before .attach()")]
    MissingControls,
    /// No focus context was provided.
    #[error("No focus context set. Call .focus() before .attach()")]
    MissingFocus,
    /// A tuning knob was out of range.
    #[error("Invalid option: {0}")]
    InvalidOptions(&'static str),
}

/// How a recovery session ended.
///
/// Sessions never raise errors; these outcomes exist so callers and test
/// suites can tell "recovered" apart from "gave up" instead of having the
/// distinction swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Focus was confirmed on the target control.
    Recovered {
        /// Rounds it took, counting the confirming round.
        attempts: u32,
    },
    /// The retry budget ran out before focus stuck.
    Exhausted {
        /// Rounds attempted (the configured maximum).
        attempts: u32,
    },
    /// No control currently represents the session's direction.
    TargetMissing,
    /// A newer qualifying interaction replaced this session.
    Superseded,
}

/// Outcome callback type.
pub type OutcomeHandler = Arc<dyn Fn(&RecoveryOutcome) + Send + Sync>;

/// Snapshot of a guard's session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardMetrics {
    /// Sessions opened.
    pub sessions_started: u64,
    /// Sessions that confirmed focus on their target.
    pub recovered: u64,
    /// Sessions that ran out of retry budget.
    pub exhausted: u64,
    /// Sessions whose target could not be located.
    pub target_missing: u64,
    /// Sessions displaced by a newer interaction.
    pub superseded: u64,
}

#[derive(Default)]
struct Counters {
    sessions_started: AtomicU64,
    recovered: AtomicU64,
    exhausted: AtomicU64,
    target_missing: AtomicU64,
    superseded: AtomicU64,
}

/// Where a session is in its round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// About to locate the target and apply focus.
    Probing,
    /// Focus applied; waiting out the retry delay before re-checking.
    AwaitingConfirmation,
}

/// One bounded focus-recovery attempt sequence.
struct Session {
    direction: NavDirection,
    attempts: u32,
    seq: u64,
    state: SessionState,
}

/// The active-session slot. At most one session per guard; `seq` rises
/// with every session so stale scheduled continuations can recognize
/// themselves and do nothing.
#[derive(Default)]
struct SessionSlot {
    seq: u64,
    active: Option<Session>,
    pending: Option<TimerHandle>,
}

struct GuardInner {
    events: Arc<dyn EventSource>,
    controls: Arc<ControlRegistry>,
    focus: Arc<FocusContext>,
    predicate: GuardPredicate,
    classifier: DirectionClassifier,
    locator: ReplacementLocator,
    initial_delay: Duration,
    retry_delay: Duration,
    max_attempts: u32,
    activation_keys: SmallVec<[KeyCode; 2]>,
    on_outcome: Option<OutcomeHandler>,
    session: Mutex<SessionSlot>,
    listeners: Mutex<SmallVec<[ListenerId; 2]>>,
    detached: AtomicBool,
    counters: Counters,
}

impl GuardInner {
    fn emit(&self, outcome: &RecoveryOutcome) {
        match outcome {
            RecoveryOutcome::Recovered { .. } => {
                self.counters.recovered.fetch_add(1, Ordering::Relaxed);
            }
            RecoveryOutcome::Exhausted { .. } => {
                self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
            }
            RecoveryOutcome::TargetMissing => {
                self.counters.target_missing.fetch_add(1, Ordering::Relaxed);
            }
            RecoveryOutcome::Superseded => {
                self.counters.superseded.fetch_add(1, Ordering::Relaxed);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(?outcome, "recovery session ended");

        if let Some(ref handler) = self.on_outcome {
            handler(outcome);
        }
    }

    /// Intercept activation keys on guarded controls.
    fn on_key(inner: &Arc<Self>, input: &KeyInput, state: &EventState) -> EventResult {
        if inner.detached.load(Ordering::SeqCst) {
            return EventResult::Ignored;
        }
        let modifiers = input.key.modifiers;
        if modifiers.ctrl || modifiers.alt || modifiers.super_key {
            return EventResult::Ignored;
        }
        if !inner.activation_keys.contains(&input.key.code) {
            return EventResult::Ignored;
        }
        let target = match input.target.and_then(|id| inner.controls.get(id)) {
            Some(control) => control,
            None => return EventResult::Ignored,
        };
        if !(inner.predicate)(&target) {
            return EventResult::Ignored;
        }

        // Stop the surface from scrolling on Space. That also swallows the
        // surface's own activation of the control, so synthesize it here.
        state.prevent_default();
        target.activate();

        if let Some(direction) = (inner.classifier)(&target) {
            Self::start_session(inner, direction);
        }

        EventResult::Consumed
    }

    /// Observe pointer activation of guarded controls. The surface already
    /// performed the activation; only recovery is needed.
    fn on_click(inner: &Arc<Self>, input: &ClickInput, _state: &EventState) -> EventResult {
        if inner.detached.load(Ordering::SeqCst) {
            return EventResult::Ignored;
        }
        if input.button != MouseButton::Left {
            return EventResult::Ignored;
        }
        let target = match inner.controls.get(input.target) {
            Some(control) => control,
            None => return EventResult::Ignored,
        };
        if !(inner.predicate)(&target) {
            return EventResult::Ignored;
        }

        if let Some(direction) = (inner.classifier)(&target) {
            Self::start_session(inner, direction);
            return EventResult::Consumed;
        }

        EventResult::Ignored
    }

    /// Open a session for a direction, displacing any in-flight one.
    fn start_session(inner: &Arc<Self>, direction: NavDirection) {
        let superseded = {
            let mut slot = inner.session.lock();

            let superseded = slot.active.take().is_some();
            if let Some(pending) = slot.pending.take() {
                pending.cancel();
            }

            slot.seq += 1;
            let seq = slot.seq;
            slot.active = Some(Session {
                direction,
                attempts: 0,
                seq,
                state: SessionState::Probing,
            });

            let weak = Arc::downgrade(inner);
            slot.pending = Some(schedule(inner.initial_delay, move || {
                if let Some(inner) = weak.upgrade() {
                    Self::round(&inner, seq);
                }
            }));

            superseded
        };

        inner.counters.sessions_started.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::trace!(?direction, "recovery session started");

        if superseded {
            inner.emit(&RecoveryOutcome::Superseded);
        }
    }

    /// One recovery round: locate the direction's current control and
    /// apply focus to it, then wait for confirmation.
    fn round(inner: &Arc<Self>, seq: u64) {
        if inner.detached.load(Ordering::SeqCst) {
            return;
        }

        let outcome = {
            let mut slot = inner.session.lock();
            let session = match slot.active.as_mut() {
                Some(session) if session.seq == seq => session,
                // Stale continuation of a displaced session
                _ => return,
            };
            if session.state != SessionState::Probing {
                return;
            }

            if session.attempts >= inner.max_attempts {
                let attempts = session.attempts;
                slot.active = None;
                slot.pending = None;
                Some(RecoveryOutcome::Exhausted { attempts })
            } else {
                session.attempts += 1;
                let attempts = session.attempts;
                let direction = session.direction;

                match (inner.locator)(&inner.controls, direction) {
                    None => {
                        slot.active = None;
                        slot.pending = None;
                        Some(RecoveryOutcome::TargetMissing)
                    }
                    Some(target) if inner.focus.is_focused(target.id()) => {
                        slot.active = None;
                        slot.pending = None;
                        Some(RecoveryOutcome::Recovered { attempts })
                    }
                    Some(target) => {
                        let id = target.id();
                        inner.focus.focus(id);
                        session.state = SessionState::AwaitingConfirmation;

                        let weak = Arc::downgrade(inner);
                        slot.pending = Some(schedule(inner.retry_delay, move || {
                            if let Some(inner) = weak.upgrade() {
                                Self::confirm(&inner, seq, id);
                            }
                        }));
                        None
                    }
                }
            }
        };

        if let Some(outcome) = outcome {
            inner.emit(&outcome);
        }
    }

    /// Re-check focus ownership after the retry delay. Focus held: the
    /// session succeeded. Stolen again: go another round.
    fn confirm(inner: &Arc<Self>, seq: u64, expected: ControlId) {
        if inner.detached.load(Ordering::SeqCst) {
            return;
        }

        enum Next {
            Done(RecoveryOutcome),
            Retry,
        }

        let next = {
            let mut slot = inner.session.lock();
            let session = match slot.active.as_mut() {
                Some(session) if session.seq == seq => session,
                _ => return,
            };
            if session.state != SessionState::AwaitingConfirmation {
                return;
            }

            if inner.focus.is_focused(expected) {
                let attempts = session.attempts;
                slot.active = None;
                slot.pending = None;
                Next::Done(RecoveryOutcome::Recovered { attempts })
            } else {
                session.state = SessionState::Probing;
                Next::Retry
            }
        };

        match next {
            Next::Done(outcome) => inner.emit(&outcome),
            Next::Retry => Self::round(inner, seq),
        }
    }

    fn detach(inner: &Arc<Self>) {
        if inner.detached.swap(true, Ordering::SeqCst) {
            return;
        }

        let ids = std::mem::take(&mut *inner.listeners.lock());
        for id in ids {
            inner.events.remove_listener(id);
        }

        let mut slot = inner.session.lock();
        slot.active = None;
        if let Some(pending) = slot.pending.take() {
            pending.cancel();
        }
    }
}

/// Disposable handle to an attached focus-retention guard.
///
/// Dropping the handle detaches it: listeners are removed and any pending
/// retry is cancelled.
pub struct FocusGuard {
    inner: Arc<GuardInner>,
}

impl FocusGuard {
    /// Start building a guard.
    pub fn builder() -> FocusGuardBuilder {
        FocusGuardBuilder::default()
    }

    /// Remove the guard's listeners and cancel any in-flight recovery.
    ///
    /// Idempotent; the guard issues no further focus calls afterwards.
    pub fn detach(&self) {
        GuardInner::detach(&self.inner);
    }

    /// Whether the guard is still attached.
    pub fn is_attached(&self) -> bool {
        !self.inner.detached.load(Ordering::SeqCst)
    }

    /// Snapshot the session counters.
    pub fn metrics(&self) -> GuardMetrics {
        let c = &self.inner.counters;
        GuardMetrics {
            sessions_started: c.sessions_started.load(Ordering::Relaxed),
            recovered: c.recovered.load(Ordering::Relaxed),
            exhausted: c.exhausted.load(Ordering::Relaxed),
            target_missing: c.target_missing.load(Ordering::Relaxed),
            superseded: c.superseded.load(Ordering::Relaxed),
        }
    }
}

impl Drop for FocusGuard {
    fn drop(&mut self) {
        GuardInner::detach(&self.inner);
    }
}

/// Builder for [`FocusGuard`].
#[derive(Default)]
pub struct FocusGuardBuilder {
    events: Option<Arc<dyn EventSource>>,
    controls: Option<Arc<ControlRegistry>>,
    focus: Option<Arc<FocusContext>>,
    predicate: Option<GuardPredicate>,
    classifier: Option<DirectionClassifier>,
    locator: Option<ReplacementLocator>,
    initial_delay: Option<Duration>,
    retry_delay: Option<Duration>,
    max_attempts: Option<u32>,
    activation_keys: Option<SmallVec<[KeyCode; 2]>>,
    on_outcome: Option<OutcomeHandler>,
}

impl FocusGuardBuilder {
    /// The event source to listen on (required).
    pub fn events(mut self, events: Arc<dyn EventSource>) -> Self {
        self.events = Some(events);
        self
    }

    /// The live control registry to query (required).
    pub fn controls(mut self, controls: Arc<ControlRegistry>) -> Self {
        self.controls = Some(controls);
        self
    }

    /// The focus context to observe and nudge (required).
    pub fn focus(mut self, focus: Arc<FocusContext>) -> Self {
        self.focus = Some(focus);
        self
    }

    /// Predicate selecting which controls the guard protects.
    pub fn guarded_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&crate::control::Control) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Direction classifier for guarded controls.
    pub fn classify_with<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&crate::control::Control) -> Option<NavDirection> + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Replacement locator, re-queried each recovery round.
    pub fn locate_with<F>(mut self, locator: F) -> Self
    where
        F: Fn(&ControlRegistry, NavDirection) -> Option<crate::control::Control>
            + Send
            + Sync
            + 'static,
    {
        self.locator = Some(Arc::new(locator));
        self
    }

    /// Delay before the first recovery round (default 10ms).
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Delay between focus application and confirmation (default 20ms).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Bound on focus-reapplication rounds per session (default 10).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Keys that activate a focused control (default Space and Enter).
    pub fn activation_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = KeyCode>,
    {
        self.activation_keys = Some(keys.into_iter().collect());
        self
    }

    /// Observe how each recovery session ends.
    pub fn on_outcome<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RecoveryOutcome) + Send + Sync + 'static,
    {
        self.on_outcome = Some(Arc::new(handler));
        self
    }

    /// Install the listeners and return the guard handle.
    pub fn attach(self) -> Result<FocusGuard, GuardError> {
        let events = self.events.ok_or(GuardError::MissingEventSource)?;
        let controls = self.controls.ok_or(GuardError::MissingControls)?;
        let focus = self.focus.ok_or(GuardError::MissingFocus)?;

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(GuardError::InvalidOptions("max_attempts must be at least 1"));
        }
        let retry_delay = self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY);
        if retry_delay.is_zero() {
            return Err(GuardError::InvalidOptions("retry_delay must be non-zero"));
        }
        let activation_keys = self
            .activation_keys
            .unwrap_or_else(|| SmallVec::from_slice(&[KeyCode::Char(' '), KeyCode::Enter]));
        if activation_keys.is_empty() {
            return Err(GuardError::InvalidOptions(
                "activation_keys must not be empty",
            ));
        }

        let classifier = self.classifier.unwrap_or_else(default_classifier);
        let predicate = self.predicate.unwrap_or_else(default_predicate);
        let locator = self
            .locator
            .unwrap_or_else(|| locate_by_direction(classifier.clone()));

        let inner = Arc::new(GuardInner {
            events: events.clone(),
            controls,
            focus,
            predicate,
            classifier,
            locator,
            initial_delay: self.initial_delay.unwrap_or(DEFAULT_INITIAL_DELAY),
            retry_delay,
            max_attempts,
            activation_keys,
            on_outcome: self.on_outcome,
            session: Mutex::new(SessionSlot::default()),
            listeners: Mutex::new(SmallVec::new()),
            detached: AtomicBool::new(false),
            counters: Counters::default(),
        });

        // Listeners hold the inner weakly so a dropped guard goes inert
        // even before the bus forgets it.
        let weak = Arc::downgrade(&inner);
        let key_id = events.add_key_listener(
            Phase::Capture,
            Arc::new(move |input, state| match weak.upgrade() {
                Some(inner) => GuardInner::on_key(&inner, input, state),
                None => EventResult::Ignored,
            }),
        );

        // Capture phase for clicks as well: the widget's own handler
        // replaces the clicked control in the registry, so classification
        // has to read it before that handler runs.
        let weak = Arc::downgrade(&inner);
        let click_id = events.add_click_listener(
            Phase::Capture,
            Arc::new(move |input, state| match weak.upgrade() {
                Some(inner) => GuardInner::on_click(&inner, input, state),
                None => EventResult::Ignored,
            }),
        );

        inner.listeners.lock().extend([key_id, click_id]);

        Ok(FocusGuard { inner })
    }
}
