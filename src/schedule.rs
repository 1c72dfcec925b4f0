//! One-shot deferred tasks.
//!
//! The recovery loop waits out the widget's own re-render/focus-steal
//! before re-checking focus ownership, so it needs a delayed-callback
//! primitive. This module provides [`schedule`]: run a closure once after
//! a delay, with cancellation.
//!
//! # Performance
//!
//! Uses a single shared timer thread to manage all pending tasks, avoiding
//! the overhead of spawning one OS thread per delay. Tasks are kept in a
//! min-heap keyed by fire time; cancelled entries are skipped when they
//! come due.
//!
//! # Example
//!
//! ```ignore
//! use refocus::schedule::schedule;
//! use std::time::Duration;
//!
//! let handle = schedule(Duration::from_millis(20), || {
//!     // runs once, ~20ms from now, on the timer thread
//! });
//!
//! // Or cancel before it fires:
//! handle.cancel();
//! ```

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// Global timer state
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Boxed one-shot task.
type Task = Box<dyn FnOnce() + Send + 'static>;

/// Shared timer manager that handles all pending tasks with a single thread.
struct TimerManager {
    /// Priority queue of pending tasks (earliest first)
    tasks: Mutex<BinaryHeap<TaskEntry>>,
    /// Condition variable to wake timer thread when new task added
    condvar: Condvar,
    /// Whether the timer thread is running
    running: AtomicBool,
}

struct TaskEntry {
    id: u64,
    fire_at: Instant,
    task: Option<Task>,
    cancelled: Arc<AtomicBool>,
}

// BinaryHeap is a max-heap, we want min-heap behavior (earliest first)
impl Ord for TaskEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering for min-heap behavior
        other.fire_at.cmp(&self.fire_at)
    }
}

impl PartialOrd for TaskEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TaskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TaskEntry {}

impl TimerManager {
    fn new() -> Self {
        Self {
            tasks: Mutex::new(BinaryHeap::new()),
            condvar: Condvar::new(),
            running: AtomicBool::new(true),
        }
    }

    fn add_task(&self, entry: TaskEntry) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| {
            // Recover from poisoned mutex - the data is still accessible
            poisoned.into_inner()
        });
        tasks.push(entry);
        self.condvar.notify_one();
    }

    fn run(&self) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| {
                // Recover from poisoned mutex - the data is still accessible
                poisoned.into_inner()
            });

            // Wait for tasks or new task registration
            if tasks.is_empty() {
                // No tasks - wait for one to be added
                // Drop the guard explicitly before continue to avoid holding lock
                drop(self.condvar.wait(tasks).unwrap_or_else(|poisoned| {
                    // Recover from poisoned wait - returns the guard
                    poisoned.into_inner()
                }));
                continue;
            }

            let fire_at = match tasks.peek() {
                Some(entry) => entry.fire_at,
                None => continue,
            };
            let now = Instant::now();

            if fire_at > now {
                // Wait until fire time (or interrupted by new task)
                let wait_duration = fire_at - now;
                // Drop the guard explicitly before continue
                drop(
                    self.condvar
                        .wait_timeout(tasks, wait_duration)
                        .unwrap_or_else(|poisoned| {
                            // Recover from poisoned wait_timeout - returns (guard, result)
                            poisoned.into_inner()
                        })
                        .0,
                );
                continue;
            }

            // Collect tasks that are due, then run them outside the lock so
            // a task may schedule or cancel without deadlocking
            let mut due = Vec::new();
            while let Some(entry) = tasks.peek() {
                if entry.fire_at > now {
                    break;
                }

                let mut entry = match tasks.pop() {
                    Some(entry) => entry,
                    None => break,
                };

                // Skip cancelled tasks
                if entry.cancelled.load(Ordering::SeqCst) {
                    continue;
                }
                // Mark consumed so is_pending() flips before the task runs
                entry.cancelled.store(true, Ordering::SeqCst);

                if let Some(task) = entry.task.take() {
                    due.push(task);
                }
            }

            drop(tasks);
            for task in due {
                task();
            }
        }
    }
}

// Lazy initialization of global timer manager
static TIMER_MANAGER: std::sync::OnceLock<Arc<TimerManager>> = std::sync::OnceLock::new();

/// Get or initialize the shared timer manager.
fn get_timer_manager() -> &'static Arc<TimerManager> {
    TIMER_MANAGER.get_or_init(|| {
        let manager = Arc::new(TimerManager::new());
        let manager_clone = manager.clone();

        // Spawn with explicit name for debugging.
        let spawn_result = thread::Builder::new()
            .name("refocus-timer".into())
            .spawn(move || {
                manager_clone.run();
            });
        if spawn_result.is_err() {
            manager.running.store(false, Ordering::SeqCst);
            #[cfg(debug_assertions)]
            if let Err(e) = spawn_result {
                eprintln!("Warning: failed to spawn refocus timer thread: {}", e);
            }
        }

        manager
    })
}

/// Handle to a scheduled task.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Cancel the task if it has not fired yet.
    ///
    /// Safe to call after the task has run; it does nothing then.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the task is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }
}

/// Run a closure once after a delay.
///
/// The closure runs on the shared timer thread; keep it short or hand off.
/// Returns a [`TimerHandle`] for cancellation. If the timer thread could
/// not be spawned the task is dropped and the handle reports not pending.
pub fn schedule<F>(delay: Duration, task: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));

    let entry = TaskEntry {
        id: TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        fire_at: Instant::now() + delay,
        task: Some(Box::new(task)),
        cancelled: cancelled.clone(),
    };

    let manager = get_timer_manager();
    if !manager.running.load(Ordering::SeqCst) {
        cancelled.store(true, Ordering::SeqCst);
        return TimerHandle { cancelled };
    }

    manager.add_task(entry);

    TimerHandle { cancelled }
}
