//! Precisely-timed click emission.
//!
//! Tick n is nominally due at `epoch + n * interval` on the monotonic clock,
//! so dispatch latency never accumulates into drift. A late wakeup skips the
//! missed boundaries instead of burst-firing them, bounding the rate at the
//! configured value. The worker re-reads its config snapshot and the stop
//! flag at every boundary, so a stop or a live rate change takes effect
//! within one interval.

use crate::dispatcher::Dispatch;
use crate::types::{Action, ClickConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Next boundary index strictly after `now`, never replaying missed ones.
///
/// `last_fired` is the boundary that just fired. Returns the index and
/// deadline of the boundary to fire next; the deadline is always within one
/// interval of `now`.
pub(crate) fn next_boundary(
    epoch: Instant,
    interval: Duration,
    last_fired: u64,
    now: Instant,
) -> (u64, Instant) {
    let interval_ns = interval.as_nanos().max(1) as u64;
    let elapsed_ns = now.saturating_duration_since(epoch).as_nanos() as u64;
    // Boundaries 0..=due have already passed.
    let due = elapsed_ns / interval_ns;
    let next = (last_fired + 1).max(due + 1);
    let deadline = epoch + Duration::from_nanos(interval_ns.saturating_mul(next));
    (next, deadline)
}

/// Ticks a drift-free run produces over `elapsed`: one at the epoch, then one
/// per full interval.
pub fn expected_ticks(elapsed: Duration, interval: Duration) -> u64 {
    let interval_ns = interval.as_nanos().max(1) as u64;
    elapsed.as_nanos() as u64 / interval_ns + 1
}

/// Handle to a running per-action worker. Dropping without `stop()` detaches
/// the thread; `stop()` is cooperative and joins.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("scheduler worker panicked");
            }
        }
    }
}

/// Spawn the timer loop for one action. The first tick fires immediately.
pub fn spawn_worker(
    action: Action,
    config: Arc<Mutex<ClickConfig>>,
    dispatcher: Arc<dyn Dispatch>,
) -> SchedulerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name(format!("clickforge-sched-{}", action.index()))
        .spawn(move || run_loop(action, config, dispatcher, stop_flag))
        .expect("spawn scheduler worker");

    SchedulerHandle {
        stop,
        thread: Some(thread),
    }
}

fn run_loop(
    action: Action,
    config: Arc<Mutex<ClickConfig>>,
    dispatcher: Arc<dyn Dispatch>,
    stop: Arc<AtomicBool>,
) {
    let mut epoch = Instant::now();
    let mut interval = { config.lock().interval };
    // Index of the tick fired by the current iteration; tick 0 is immediate.
    let mut fired: u64 = 0;

    debug!(%action, ?interval, "scheduler worker started");

    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }

        // Snapshot at the boundary; a torn mid-tick read is impossible.
        let snapshot = { config.lock().clone() };
        if snapshot.interval != interval {
            debug!(%action, old = ?interval, new = ?snapshot.interval, "interval changed, re-basing");
            interval = snapshot.interval;
            epoch = Instant::now();
            fired = 0;
        }

        if let Err(e) = dispatcher.click(snapshot.button, None) {
            // A rejected injection skips one tick, never the whole run.
            warn!(%action, error = %e, "dispatch failed, continuing");
        }

        let now = Instant::now();
        let (next, deadline) = next_boundary(epoch, interval, fired, now);
        fired = next;
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
    }

    debug!(%action, "scheduler worker stopped");
}
