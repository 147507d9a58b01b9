use crate::clock::Clock;
use crate::error::AppError;
use crate::model::{Task, TaskStatus};
use crate::normalize::normalize;
use crate::notify::{Notifier, reminder_message};
use crate::resolve::{DateParser, PhraseParser, initial_schedule, next_future_occurrence, resolve};
use crate::scheduler::Scheduler;
use crate::storage::TaskStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use time::OffsetDateTime;

/// Owner of the task store and the reminder scheduler.
///
/// Every operation, including deliveries fired from the scheduler thread,
/// holds the store lock for its whole read-modify-write. Scheduler
/// registrations happen under that lock, after the store has been saved.
#[derive(Clone)]
pub struct TaskApi {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<TaskStore>,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
    parser: Box<dyn DateParser>,
    notifiers: Vec<Box<dyn Notifier>>,
}

pub struct TaskApiBuilder {
    store: TaskStore,
    clock: Arc<dyn Clock>,
    parser: Box<dyn DateParser>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl TaskApiBuilder {
    pub fn with_parser(mut self, parser: Box<dyn DateParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn build(self) -> TaskApi {
        TaskApi {
            inner: Arc::new(Inner {
                store: Mutex::new(self.store),
                scheduler: Scheduler::new(Arc::clone(&self.clock)),
                clock: self.clock,
                parser: self.parser,
                notifiers: self.notifiers,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub task: Task,
    /// False when the task has no time or its time has already passed.
    pub registered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneOutcome {
    Completed(Task),
    Advanced(Task),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub pending: Vec<Task>,
    pub done: Vec<Task>,
}

impl TaskApi {
    pub fn builder(store: TaskStore, clock: Arc<dyn Clock>) -> TaskApiBuilder {
        TaskApiBuilder {
            store,
            clock,
            parser: Box::new(PhraseParser),
            notifiers: Vec::new(),
        }
    }

    /// Starts the delivery thread. Without it registrations are tracked but
    /// never fire.
    pub fn start(&self) -> Result<(), AppError> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .start(Box::new(move |id, at| {
                if let Some(inner) = weak.upgrade() {
                    inner.deliver(id, at);
                }
            }))
            .map_err(AppError::from)
    }

    pub fn now(&self) -> OffsetDateTime {
        self.inner.clock.now()
    }

    /// Registers every pending future delivery and returns the missed batch:
    /// one-shot tasks whose time passed while nothing was running. Stale
    /// recurring tasks are moved to their next future occurrence first.
    pub fn reconcile(&self) -> Result<Vec<Task>, AppError> {
        let inner = &self.inner;
        let mut store = inner.lock_store();
        let now = inner.clock.now();

        let stale: Vec<u64> = store
            .pending()
            .filter(|task| task.is_recurring() && task.scheduled_at.is_some_and(|at| at <= now))
            .map(|task| task.id)
            .collect();
        if !stale.is_empty() {
            store.mutate(|state| {
                for id in &stale {
                    if let Some(task) = state.get_mut(*id)
                        && let Some(at) = task.scheduled_at
                    {
                        task.scheduled_at = next_future_occurrence(at, task.repeat.as_ref(), now);
                    }
                }
                Ok(())
            })?;
            log::info!("advanced {} recurring task(s) past downtime", stale.len());
        }

        for (id, _) in inner.scheduler.pending() {
            let wanted = store
                .get(id)
                .is_some_and(|task| task.is_pending() && task.scheduled_at.is_some_and(|at| at > now));
            if !wanted {
                inner.scheduler.cancel(id);
            }
        }

        let mut missed = Vec::new();
        for task in store.pending() {
            match task.scheduled_at {
                Some(at) if at > now => {
                    inner.scheduler.register(task.id, at, now);
                }
                Some(_) if !task.is_recurring() => missed.push(task.clone()),
                _ => {}
            }
        }

        log::info!(
            "reconciled store: {} delivery(ies) registered, {} missed",
            inner.scheduler.len(),
            missed.len()
        );
        Ok(missed)
    }

    pub fn add(&self, raw: &str) -> Result<Added, AppError> {
        let inner = &self.inner;
        let input = normalize(raw)?;
        let now = inner.clock.now();
        let resolution = resolve(inner.parser.as_ref(), &input.remaining_text, now)?;
        let scheduled_at = resolution
            .scheduled_at
            .map(|at| initial_schedule(at, input.repeat.as_ref(), now))
            .transpose()?;

        let mut store = inner.lock_store();
        let task = store.mutate(|state| {
            let task = Task {
                id: state.allocate_id(),
                list_name: input.list_name,
                description: resolution.description,
                scheduled_at,
                repeat: input.repeat,
                priority: input.priority,
                status: TaskStatus::Pending,
                created_at: now,
                completed_at: None,
                reminded_at: None,
            };
            state.tasks.push(task.clone());
            Ok(task)
        })?;

        let registered = inner.arm(&task, now);
        log::debug!("added task {} (registered: {registered})", task.id);
        Ok(Added { task, registered })
    }

    pub fn list(&self) -> Listing {
        let store = self.inner.lock_store();
        Listing {
            pending: store.pending().cloned().collect(),
            done: store.done().cloned().collect(),
        }
    }

    pub fn history(&self) -> Vec<Task> {
        self.inner.lock_store().done().cloned().collect()
    }

    /// Pending tasks scheduled for the current date, earliest first.
    pub fn summary(&self) -> Vec<Task> {
        let store = self.inner.lock_store();
        let now = self.inner.clock.now();
        let today = now.date();

        let mut tasks: Vec<Task> = store
            .pending()
            .filter(|task| {
                task.scheduled_at
                    .is_some_and(|at| at.to_offset(now.offset()).date() == today)
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.scheduled_at, task.id));
        tasks
    }

    /// The pending task with the nearest future time.
    pub fn next(&self) -> Option<Task> {
        let store = self.inner.lock_store();
        let now = self.inner.clock.now();

        store
            .pending()
            .filter_map(|task| task.scheduled_at.filter(|at| *at > now).map(|at| (at, task)))
            .min_by_key(|(at, task)| (*at, task.id))
            .map(|(_, task)| task.clone())
    }

    pub fn done(&self, target: &str) -> Result<DoneOutcome, AppError> {
        let inner = &self.inner;
        let mut store = inner.lock_store();
        let now = inner.clock.now();
        let id = find_pending(&store, target)?;

        let outcome = store.mutate(|state| {
            let task = state
                .get_mut(id)
                .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;

            let scheduled_at = task.scheduled_at;
            match scheduled_at {
                Some(at) if task.is_recurring() => {
                    let already_advanced = task.reminded_at.take().is_some() && at > now;
                    let next = if already_advanced {
                        at
                    } else {
                        next_future_occurrence(at, task.repeat.as_ref(), now).unwrap_or(at)
                    };
                    task.scheduled_at = Some(next);
                    Ok(DoneOutcome::Advanced(task.clone()))
                }
                _ => {
                    task.status = TaskStatus::Done;
                    task.completed_at = Some(now);
                    task.reminded_at = None;
                    Ok(DoneOutcome::Completed(task.clone()))
                }
            }
        })?;

        match &outcome {
            DoneOutcome::Advanced(task) => {
                inner.arm(task, now);
            }
            DoneOutcome::Completed(task) => inner.scheduler.cancel(task.id),
        }
        Ok(outcome)
    }

    /// Deletes every task, pending or done, matching the id or name.
    pub fn remove(&self, target: &str) -> Result<Vec<Task>, AppError> {
        let inner = &self.inner;
        let mut store = inner.lock_store();
        let target = require_target(target)?;

        let by_id = parse_id(target).filter(|id| store.get(*id).is_some());
        let ids: Vec<u64> = match by_id {
            Some(id) => vec![id],
            None => store
                .tasks()
                .iter()
                .filter(|task| task.matches_name(target))
                .map(|task| task.id)
                .collect(),
        };
        if ids.is_empty() {
            return Err(AppError::not_found(format!("no task matches '{target}'")));
        }

        let removed = store.mutate(|state| {
            let (removed, kept): (Vec<Task>, Vec<Task>) = std::mem::take(&mut state.tasks)
                .into_iter()
                .partition(|task| ids.contains(&task.id));
            state.tasks = kept;
            Ok(removed)
        })?;

        for id in &ids {
            inner.scheduler.cancel(*id);
        }
        Ok(removed)
    }

    /// Wipes the store and every delivery; returns how many tasks went.
    pub fn clear(&self) -> Result<usize, AppError> {
        let inner = &self.inner;
        let mut store = inner.lock_store();
        let cleared = store.mutate(|state| {
            let count = state.tasks.len();
            state.tasks.clear();
            Ok(count)
        })?;
        inner.scheduler.cancel_all();
        Ok(cleared)
    }

    /// Outstanding deliveries, earliest first.
    pub fn deliveries(&self) -> Vec<(u64, OffsetDateTime)> {
        self.inner.scheduler.pending()
    }

    /// Runs the delivery for `id` as the scheduler thread would. Returns the
    /// reminder text, or `None` when the delivery was suppressed.
    pub fn deliver(&self, id: u64, at: OffsetDateTime) -> Option<String> {
        self.inner.deliver(id, at)
    }

    pub fn shutdown(&self) {
        self.inner.scheduler.shutdown();
    }
}

impl Inner {
    fn lock_store(&self) -> MutexGuard<'_, TaskStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, task: &Task, now: OffsetDateTime) -> bool {
        match task.scheduled_at {
            Some(at) if task.is_pending() => self.scheduler.register(task.id, at, now),
            _ => false,
        }
    }

    fn deliver(&self, id: u64, at: OffsetDateTime) -> Option<String> {
        let mut store = self.lock_store();

        let task = match store.get(id) {
            Some(task) if task.is_pending() && task.scheduled_at == Some(at) => task.clone(),
            Some(_) => {
                log::debug!("task {id}: stale delivery for {at} suppressed");
                return None;
            }
            None => {
                log::debug!("task {id}: removed before delivery");
                return None;
            }
        };

        let message = reminder_message(&task);
        for notifier in &self.notifiers {
            if let Err(err) = notifier.notify(&task, &message) {
                log::warn!("task {id}: notifier failed: {err}");
            }
        }

        if task.is_recurring() {
            let now = self.clock.now();
            if let Some(next) = next_future_occurrence(at, task.repeat.as_ref(), now) {
                let advanced = store.mutate(|state| {
                    let task = state
                        .get_mut(id)
                        .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;
                    task.scheduled_at = Some(next);
                    task.reminded_at = Some(at);
                    Ok(task.clone())
                });
                match advanced {
                    Ok(task) => {
                        self.arm(&task, now);
                    }
                    Err(err) => log::warn!("task {id}: could not store next occurrence: {err}"),
                }
            }
        }

        Some(message)
    }
}

fn require_target(target: &str) -> Result<&str, AppError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("please give a task id or name"));
    }
    Ok(trimmed)
}

fn parse_id(target: &str) -> Option<u64> {
    target.strip_prefix('#').unwrap_or(target).parse().ok()
}

fn find_pending(store: &TaskStore, target: &str) -> Result<u64, AppError> {
    let target = require_target(target)?;

    if let Some(id) = parse_id(target)
        && store.get(id).is_some_and(Task::is_pending)
    {
        return Ok(id);
    }

    store
        .pending()
        .find(|task| task.matches_name(target))
        .map(|task| task.id)
        .ok_or_else(|| AppError::not_found(format!("no pending task matches '{target}'")))
}
