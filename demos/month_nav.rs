//! Month-navigation demo for the focus-retention guard.
//!
//! Simulates the misbehaving calendar this crate exists for: a month pane
//! whose navigation buttons are re-created on every page turn, after
//! which the widget asynchronously steals focus to its day grid. With the
//! guard attached, focus snaps back to the navigation button you used.
//!
//! Controls:
//! - Tab / Shift+Tab: move focus between prev / next / day grid
//! - Space or Enter: activate the focused control (guard intercepts)
//! - c: simulate a pointer click on the focused control
//! - q / Escape: quit

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use refocus::prelude::*;
use refocus::schedule::schedule;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Raw-mode friendly line printer.
fn say(line: &str) {
    print!("{line}\r\n");
}

struct Pane {
    controls: Arc<ControlRegistry>,
    focus: Arc<FocusContext>,
    month: AtomicI32,
    grid_id: ControlId,
    nav_ids: Mutex<(ControlId, ControlId)>,
}

impl Pane {
    fn mount(controls: &Arc<ControlRegistry>, focus: &Arc<FocusContext>) -> Arc<Self> {
        let grid_id = controls.register(Control::new(Role::Cell).label("day grid"));
        let pane = Arc::new(Self {
            controls: controls.clone(),
            focus: focus.clone(),
            month: AtomicI32::new(0),
            grid_id,
            nav_ids: Mutex::new((ControlId::new(), ControlId::new())),
        });
        let ids = Self::mount_nav(&pane);
        *pane.nav_ids.lock().expect("nav id lock") = ids;
        pane
    }

    fn mount_nav(pane: &Arc<Self>) -> (ControlId, ControlId) {
        let weak = Arc::downgrade(pane);
        let prev = Control::new(Role::Button)
            .label("Previous Month (backward)")
            .class("nav-button")
            .on_activate(move || {
                if let Some(pane) = weak.upgrade() {
                    Self::turn(&pane, -1);
                }
            });
        let weak = Arc::downgrade(pane);
        let next = Control::new(Role::Button)
            .label("Next Month (forward)")
            .class("nav-button")
            .on_activate(move || {
                if let Some(pane) = weak.upgrade() {
                    Self::turn(&pane, 1);
                }
            });
        (pane.controls.register(prev), pane.controls.register(next))
    }

    fn month_name(&self) -> String {
        let m = self.month.load(Ordering::SeqCst);
        let year = 2026 + m.div_euclid(12);
        let month = MONTHS[m.rem_euclid(12) as usize];
        format!("{month} {year}")
    }

    /// Page turn: re-create both nav buttons, then steal focus to the day
    /// grid a moment later, like the real widget does.
    fn turn(pane: &Arc<Self>, delta: i32) {
        pane.month.fetch_add(delta, Ordering::SeqCst);

        let (old_prev, old_next) = *pane.nav_ids.lock().expect("nav id lock");
        pane.controls.remove(old_prev);
        pane.controls.remove(old_next);
        let ids = Self::mount_nav(pane);
        *pane.nav_ids.lock().expect("nav id lock") = ids;

        say(&format!("[widget] month changed -> {}", pane.month_name()));

        let weak = Arc::downgrade(pane);
        schedule(Duration::from_millis(30), move || {
            if let Some(pane) = weak.upgrade() {
                pane.focus.focus(pane.grid_id);
                say("[widget] focus stolen -> day grid");
            }
        });
    }

    fn describe(&self, id: ControlId) -> String {
        self.controls
            .get(id)
            .and_then(|c| c.label_text().map(str::to_owned))
            .unwrap_or_else(|| "(unmounted)".to_owned())
    }

    /// Current focus ring, in tab order.
    fn ring(&self) -> [ControlId; 3] {
        let (prev, next) = *self.nav_ids.lock().expect("nav id lock");
        [prev, next, self.grid_id]
    }
}

fn cycle_focus(pane: &Pane, focus: &FocusContext, backwards: bool) {
    let ring = pane.ring();
    let position = focus.focused().and_then(|id| ring.iter().position(|r| *r == id));
    let index = match position {
        Some(i) if backwards => (i + ring.len() - 1) % ring.len(),
        Some(i) => (i + 1) % ring.len(),
        None => 0,
    };
    focus.focus(ring[index]);
    say(&format!("[you] focus -> {}", pane.describe(ring[index])));
}

fn main() -> Result<()> {
    let bus = Arc::new(EventBus::new());
    let controls = Arc::new(ControlRegistry::new());
    let focus = Arc::new(FocusContext::new());
    let pane = Pane::mount(&controls, &focus);

    // The surface's own click handling: activate whatever was clicked
    let surface_controls = controls.clone();
    bus.add_click_listener(
        Phase::Bubble,
        Arc::new(move |input, _state| {
            if let Some(control) = surface_controls.get(input.target) {
                control.activate();
                return EventResult::Consumed;
            }
            EventResult::Ignored
        }),
    );

    let guard = FocusGuard::builder()
        .events(bus.clone())
        .controls(controls.clone())
        .focus(focus.clone())
        .on_outcome(|outcome| match outcome {
            RecoveryOutcome::Recovered { attempts } => {
                say(&format!("[guard] focus recovered after {attempts} round(s)"));
            }
            RecoveryOutcome::Exhausted { attempts } => {
                say(&format!("[guard] gave up after {attempts} round(s)"));
            }
            RecoveryOutcome::TargetMissing => say("[guard] no replacement control found"),
            RecoveryOutcome::Superseded => say("[guard] session superseded"),
        })
        .attach()?;

    say(&format!("Month pane: {}", pane.month_name()));
    say("Tab to reach the nav buttons, Space/Enter to page, c to click, q to quit.");
    say("");

    terminal::enable_raw_mode()?;
    let result = run(&bus, &pane, &focus);
    terminal::disable_raw_mode()?;
    guard.detach();
    result
}

fn run(bus: &EventBus, pane: &Arc<Pane>, focus: &Arc<FocusContext>) -> Result<()> {
    loop {
        let Event::Key(raw) = event::read()? else {
            continue;
        };
        if raw.kind != KeyEventKind::Press {
            continue;
        }

        let key: KeyEvent = raw.into();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Tab => cycle_focus(pane, focus, false),
            KeyCode::BackTab => cycle_focus(pane, focus, true),
            KeyCode::Char('c') => {
                if let Some(target) = focus.focused() {
                    say(&format!("[you] click -> {}", pane.describe(target)));
                    bus.dispatch_click(&ClickInput::left(target));
                }
            }
            _ => {
                let target = focus.focused();
                let outcome = bus.dispatch_key(&KeyInput::new(key, target));
                if key.code == KeyCode::Char(' ') && !outcome.default_prevented {
                    say("[surface] viewport scrolled (default action)");
                }
            }
        }
    }
    Ok(())
}
