//! Write Scheduler
//!
//! Coalesces bursts of mutations into a single deferred write. The scheduler
//! is a two-state machine (`Idle`, `Pending`) driven by an injectable
//! [`Timer`], so tests can advance a virtual clock instead of sleeping.
//!
//! Every scheduled write carries a generation number. A task that fires after
//! it has been cancelled or superseded finds a different generation (or no
//! pending write at all) and does nothing.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// Deferred callback run by a [`Timer`].
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one scheduled task so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Cancelable one-shot deferred execution.
pub trait Timer: Send + Sync {
    /// Run `task` once `delay` has elapsed, unless cancelled first.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Cancel a scheduled task. Returns false if it already ran or was cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// What a second `save()` does while a write is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoalescePolicy {
    /// Cancel the pending write and restart the window; the write lands one
    /// quiet period after the last mutation.
    #[default]
    ResetOnSave,
    /// Leave the pending write alone; it fires one period after the first
    /// mutation of the burst.
    KeepFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Pending { handle: TimerHandle, generation: u64 },
}

/// Outcome of [`WriteScheduler::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// Debouncing is disabled; the caller must write synchronously.
    WriteNow,
    /// A deferred write is pending.
    Scheduled,
}

pub struct WriteScheduler {
    debounce: Duration,
    policy: CoalescePolicy,
    timer: Option<Arc<dyn Timer>>,
    state: SchedulerState,
    generation: u64,
}

impl WriteScheduler {
    /// A zero `debounce` (or no timer) disables coalescing.
    pub fn new(debounce: Duration, policy: CoalescePolicy, timer: Option<Arc<dyn Timer>>) -> Self {
        Self {
            debounce,
            policy,
            timer,
            state: SchedulerState::Idle,
            generation: 0,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SchedulerState::Pending { .. })
    }

    /// Request a write.
    ///
    /// `make_task` builds the deferred callback for the given generation; it is
    /// only invoked when a new timer is actually scheduled.
    pub fn save<F>(&mut self, make_task: F) -> SaveAction
    where
        F: FnOnce(u64) -> TimerTask,
    {
        let timer = match &self.timer {
            Some(timer) if !self.debounce.is_zero() => Arc::clone(timer),
            _ => {
                self.cancel();
                return SaveAction::WriteNow;
            }
        };

        if self.is_pending() && self.policy == CoalescePolicy::KeepFirst {
            trace!("Write already pending, keeping original window");
            return SaveAction::Scheduled;
        }

        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let handle = timer.schedule(self.debounce, make_task(generation));
        self.state = SchedulerState::Pending { handle, generation };
        debug!(
            generation,
            debounce_ms = self.debounce.as_millis() as u64,
            "Scheduled deferred write"
        );
        SaveAction::Scheduled
    }

    /// Cancel the pending write, if any, and return to `Idle`.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SchedulerState::Idle) {
            SchedulerState::Pending { handle, generation } => {
                if let Some(timer) = &self.timer {
                    timer.cancel(handle);
                }
                trace!(generation, "Cancelled pending write");
                true
            }
            SchedulerState::Idle => false,
        }
    }

    /// Claim the pending write for a firing task.
    ///
    /// Returns true (and moves to `Idle`) only if `generation` is still the
    /// pending one; stale tasks get false and must not write.
    pub fn complete(&mut self, generation: u64) -> bool {
        match self.state {
            SchedulerState::Pending {
                generation: pending,
                ..
            } if pending == generation => {
                self.state = SchedulerState::Idle;
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for WriteScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteScheduler")
            .field("debounce", &self.debounce)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

struct TimerQueue {
    next_id: u64,
    entries: BTreeMap<(Instant, u64), TimerTask>,
    shutdown: bool,
}

struct TimerShared {
    queue: Mutex<TimerQueue>,
    wakeup: Condvar,
}

/// [`Timer`] backed by one worker thread that sleeps until the earliest deadline.
///
/// Tasks run on the worker thread, outside the queue lock. Tasks still queued
/// when the timer is dropped are discarded.
pub struct ThreadTimer {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        let shared = Arc::new(TimerShared {
            queue: Mutex::new(TimerQueue {
                next_id: 0,
                entries: BTreeMap::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("dotstore-timer".to_string())
            .spawn(move || run_timer_worker(&worker_shared))
            .map_err(|e| error!(error = %e, "Failed to spawn timer thread; deferred writes will not fire"))
            .ok();
        Self { shared, worker }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

fn run_timer_worker(shared: &TimerShared) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            break;
        }
        let next = queue.entries.keys().next().map(|(deadline, _)| *deadline);
        match next {
            Some(deadline) if deadline <= Instant::now() => {
                if let Some((_, task)) = queue.entries.pop_first() {
                    MutexGuard::unlocked(&mut queue, task);
                }
            }
            Some(deadline) => {
                shared.wakeup.wait_until(&mut queue, deadline);
            }
            None => shared.wakeup.wait(&mut queue),
        }
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let mut queue = self.shared.queue.lock();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.entries.insert((Instant::now() + delay, id), task);
        self.shared.wakeup.notify_one();
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut queue = self.shared.queue.lock();
        let before = queue.entries.len();
        queue.entries.retain(|(_, id), _| *id != handle.0);
        before != queue.entries.len()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.wakeup.notify_all();
        if let Some(worker) = self.worker.take() {
            // The last owner may be a task running on the worker itself.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

struct ManualState {
    now: Duration,
    next_id: u64,
    entries: BTreeMap<(Duration, u64), TimerTask>,
}

/// [`Timer`] driven by a virtual clock.
///
/// Nothing fires until [`ManualTimer::advance`] is called; due tasks then run
/// on the calling thread in deadline order.
pub struct ManualTimer {
    state: Mutex<ManualState>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                next_id: 0,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of tasks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Move the clock forward by `by`, running every task that becomes due.
    /// Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut fired = 0;
        loop {
            let task = {
                let mut state = self.state.lock();
                let due = state
                    .entries
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                match due {
                    Some(key) => {
                        state.now = key.0;
                        state.entries.remove(&key)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };
            match task {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }
        fired
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let deadline = state.now + delay;
        state.entries.insert((deadline, id), task);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|(_, id), _| *id != handle.0);
        before != state.entries.len()
    }
}
