//! One-shot delivery registry keyed by task id, driven by a background thread.

use crate::clock::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration as StdDuration;
use time::OffsetDateTime;

/// Longest the worker sleeps before re-reading the clock.
const MAX_NAP: StdDuration = StdDuration::from_secs(30);

/// Invoked on the scheduler thread with the task id and the instant it was
/// registered for.
pub type FireCallback = Box<dyn Fn(u64, OffsetDateTime) + Send + Sync>;

pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

struct Shared {
    registry: Mutex<Registry>,
    wakeup: Condvar,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct Registry {
    deliveries: HashMap<u64, OffsetDateTime>,
    shutdown: bool,
}

struct Worker {
    handle: JoinHandle<()>,
    thread_id: ThreadId,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                wakeup: Condvar::new(),
                clock,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Spawns the timer thread. Calling it again is a no-op.
    pub fn start(&self, on_fire: FireCallback) -> std::io::Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("remind-scheduler".to_string())
            .spawn(move || run(&shared, on_fire.as_ref()))?;
        let thread_id = handle.thread().id();
        *worker = Some(Worker { handle, thread_id });
        log::debug!("scheduler thread started");
        Ok(())
    }

    /// Creates or replaces the delivery for `id`. Instants that are not
    /// strictly after `now` are skipped and `false` is returned.
    pub fn register(&self, id: u64, at: OffsetDateTime, now: OffsetDateTime) -> bool {
        if at <= now {
            log::debug!("skipping registration for task {id}: {at} is not in the future");
            return false;
        }

        let replaced = self.lock().deliveries.insert(id, at);
        match replaced {
            Some(previous) => log::debug!("task {id}: delivery moved from {previous} to {at}"),
            None => log::debug!("task {id}: delivery registered for {at}"),
        }
        self.shared.wakeup.notify_all();
        true
    }

    /// Removing an id that has nothing pending is fine.
    pub fn cancel(&self, id: u64) {
        if self.lock().deliveries.remove(&id).is_some() {
            log::debug!("task {id}: delivery cancelled");
            self.shared.wakeup.notify_all();
        }
    }

    pub fn cancel_all(&self) {
        let mut registry = self.lock();
        let dropped = registry.deliveries.len();
        registry.deliveries.clear();
        drop(registry);
        log::debug!("cancelled {dropped} deliveries");
        self.shared.wakeup.notify_all();
    }

    pub fn deadline(&self, id: u64) -> Option<OffsetDateTime> {
        self.lock().deliveries.get(&id).copied()
    }

    /// Pending deliveries ordered by fire time.
    pub fn pending(&self) -> Vec<(u64, OffsetDateTime)> {
        let mut pending: Vec<_> = self
            .lock()
            .deliveries
            .iter()
            .map(|(id, at)| (*id, *at))
            .collect();
        pending.sort_by_key(|(id, at)| (*at, *id));
        pending
    }

    pub fn len(&self) -> usize {
        self.lock().deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.shared.wakeup.notify_all();

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            // The last owner may be dropped from inside a fire callback.
            if worker.thread_id != thread::current().id() && worker.handle.join().is_err() {
                log::warn!("scheduler thread panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.shared
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared, on_fire: &(dyn Fn(u64, OffsetDateTime) + Send + Sync)) {
    let mut registry = shared
        .registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    loop {
        if registry.shutdown {
            log::debug!("scheduler thread stopping");
            return;
        }

        let now = shared.clock.now();
        let due = take_due(&mut registry.deliveries, now);
        if !due.is_empty() {
            drop(registry);
            for (id, at) in due {
                on_fire(id, at);
            }
            registry = shared
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        }

        let earliest = registry.deliveries.values().min().copied();
        registry = match earliest {
            Some(at) => {
                let nap = StdDuration::try_from(at - now)
                    .unwrap_or(StdDuration::ZERO)
                    .min(MAX_NAP);
                shared
                    .wakeup
                    .wait_timeout(registry, nap)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => shared
                .wakeup
                .wait(registry)
                .unwrap_or_else(PoisonError::into_inner),
        };
    }
}

/// Removes and returns every delivery due at `now`, earliest first.
fn take_due(
    deliveries: &mut HashMap<u64, OffsetDateTime>,
    now: OffsetDateTime,
) -> Vec<(u64, OffsetDateTime)> {
    let mut due: Vec<_> = deliveries
        .iter()
        .filter(|(_, at)| **at <= now)
        .map(|(id, at)| (*id, *at))
        .collect();
    due.sort_by_key(|(id, at)| (*at, *id));
    for (id, _) in &due {
        deliveries.remove(id);
    }
    due
}
