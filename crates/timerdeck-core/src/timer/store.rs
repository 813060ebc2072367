//! Timer store: the grouped live view and every mutation of it.
//!
//! ## State Transitions
//!
//! ```text
//! Paused <-> Running -> Completed (removed from the view)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = TimerStore::new(PersistenceGateway::new(Database::open_path(path)?));
//! store.load();
//! store.start(&id)?;
//! // In the hosting task:
//! while let Some(event) = store.next_event().await { /* render */ }
//! ```

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::countdown::{CountdownDriver, DEFAULT_TICK_PERIOD};
use super::grouped::GroupedTimers;
use super::model::{NewTimer, Timer, TimerStatus, TimerWithStatus};
use crate::error::{CoreError, Result, StorageError};
use crate::events::Event;
use crate::history::HistoryLog;
use crate::storage::{KeyValueStore, PersistenceGateway, HISTORY_KEY, TIMERS_KEY};

const EVENT_CAPACITY: usize = 256;

/// Category-wide operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    StartAll,
    PauseAll,
    ResetAll,
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Start,
    Pause,
    Reset,
}

/// Owns the grouped view, the countdown registry and the history log.
///
/// All mutation goes through `&mut self`, so it happens on whichever task
/// owns the store. Countdown tasks only produce signals that
/// [`TimerStore::next_event`] turns into ticks.
pub struct TimerStore<S> {
    gateway: PersistenceGateway<S>,
    history: HistoryLog<S>,
    view: GroupedTimers,
    expanded: HashSet<String>,
    driver: CountdownDriver,
    events: broadcast::Sender<Event>,
}

impl<S: KeyValueStore> TimerStore<S> {
    pub fn new(gateway: PersistenceGateway<S>) -> Self {
        Self::with_tick_period(gateway, DEFAULT_TICK_PERIOD)
    }

    pub fn with_tick_period(gateway: PersistenceGateway<S>, period: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            history: HistoryLog::new(gateway.clone()),
            gateway,
            view: GroupedTimers::new(),
            expanded: HashSet::new(),
            driver: CountdownDriver::new(period),
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn grouped(&self) -> &GroupedTimers {
        &self.view
    }

    pub fn get(&self, timer_id: &str) -> Option<&TimerWithStatus> {
        self.view.get(timer_id)
    }

    pub fn history(&self) -> &HistoryLog<S> {
        &self.history
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn is_expanded(&self, category: &str) -> bool {
        self.expanded.contains(category)
    }

    pub fn is_counting_down(&self, timer_id: &str) -> bool {
        self.driver.is_active(timer_id)
    }

    pub fn active_countdowns(&self) -> usize {
        self.driver.active_count()
    }

    pub fn tick_period(&self) -> Duration {
        self.driver.period()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the live view with the persisted timers, all paused at full
    /// duration. An unreadable payload leaves the view empty.
    pub fn load(&mut self) -> &GroupedTimers {
        self.driver.cancel_all();
        let timers = match self.gateway.read_timers() {
            Ok(timers) => timers,
            Err(e) => {
                warn!(error = %e, "failed to load timers, starting empty");
                Vec::new()
            }
        };
        self.view = GroupedTimers::from_timers(timers.into_iter().map(TimerWithStatus::paused));
        self.expanded = self.view.categories().map(str::to_string).collect();
        debug!(
            timers = self.view.len(),
            categories = self.view.category_count(),
            "timers loaded"
        );
        self.publish_view();
        &self.view
    }

    /// Validate and persist a new timer. The live view picks it up on the
    /// next [`TimerStore::load`].
    pub fn create(&self, draft: NewTimer) -> Result<Timer> {
        let timer = Timer::from_draft(draft)?;
        let mut timers = self.gateway.read_timers()?;
        timers.push(timer.clone());
        self.gateway.write_timers(&timers)?;
        info!(timer_id = %timer.id, name = %timer.name, category = %timer.category, "timer created");
        Ok(timer)
    }

    /// No-op when already running or exhausted.
    pub fn start(&mut self, timer_id: &str) -> Result<Option<Event>> {
        self.single(timer_id, Command::Start)
    }

    /// No-op unless running; remaining time is frozen.
    pub fn pause(&mut self, timer_id: &str) -> Result<Option<Event>> {
        self.single(timer_id, Command::Pause)
    }

    /// Back to paused at full duration, from any state.
    pub fn reset(&mut self, timer_id: &str) -> Result<Option<Event>> {
        self.single(timer_id, Command::Reset)
    }

    pub fn start_all(&mut self, category: &str) -> Result<Vec<Event>> {
        self.bulk(category, Command::Start)
    }

    pub fn pause_all(&mut self, category: &str) -> Result<Vec<Event>> {
        self.bulk(category, Command::Pause)
    }

    pub fn reset_all(&mut self, category: &str) -> Result<Vec<Event>> {
        self.bulk(category, Command::Reset)
    }

    pub fn bulk_action(&mut self, category: &str, action: BulkAction) -> Result<Vec<Event>> {
        match action {
            BulkAction::StartAll => self.start_all(category),
            BulkAction::PauseAll => self.pause_all(category),
            BulkAction::ResetAll => self.reset_all(category),
        }
    }

    /// Flip a category between expanded and collapsed; returns the new state.
    pub fn toggle_category(&mut self, category: &str) -> bool {
        if self.expanded.remove(category) {
            false
        } else {
            self.expanded.insert(category.to_string());
            true
        }
    }

    /// Apply one countdown signal to `timer_id`.
    ///
    /// Ignored unless the timer is in the view and running.
    pub fn tick(&mut self, timer_id: &str) -> Option<Event> {
        let timer = self.view.get_mut(timer_id)?;
        if !timer.is_running() {
            return None;
        }
        if timer.remaining_time <= 1 {
            return self.complete(timer_id);
        }

        timer.remaining_time -= 1;
        let event = Event::TimerTicked {
            timer_id: timer_id.to_string(),
            remaining_time: timer.remaining_time,
            at: Utc::now(),
        };
        self.emit(event.clone());
        self.publish_view();
        Some(event)
    }

    /// Wait for the next countdown signal and apply it.
    ///
    /// Returns `None` once no countdown is running.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            let timer_id = self.driver.next_tick().await?;
            match self.tick(&timer_id) {
                Some(event) => return Some(event),
                None => {
                    self.driver.cancel(&timer_id);
                }
            }
        }
    }

    /// Cancel every countdown; the view is left as is.
    pub fn shutdown(&mut self) {
        self.driver.cancel_all();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn single(&mut self, timer_id: &str, command: Command) -> Result<Option<Event>> {
        let event = self.apply(timer_id, command)?;
        if let Some(event) = &event {
            self.emit(event.clone());
            self.publish_view();
        }
        Ok(event)
    }

    fn bulk(&mut self, category: &str, command: Command) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for timer_id in self.view.ids_in(category) {
            if let Some(event) = self.apply(&timer_id, command)? {
                self.emit(event.clone());
                events.push(event);
            }
        }
        if !events.is_empty() {
            self.publish_view();
        }
        Ok(events)
    }

    fn apply(&mut self, timer_id: &str, command: Command) -> Result<Option<Event>> {
        let timer = self
            .view
            .get_mut(timer_id)
            .ok_or_else(|| CoreError::TimerNotFound(timer_id.to_string()))?;

        let event = match command {
            Command::Start => {
                if timer.is_running() || timer.remaining_time == 0 {
                    return Ok(None);
                }
                self.driver.register(timer_id)?;
                timer.status = TimerStatus::Running;
                Event::TimerStarted {
                    timer_id: timer_id.to_string(),
                    remaining_time: timer.remaining_time,
                    at: Utc::now(),
                }
            }
            Command::Pause => {
                if !timer.is_running() {
                    return Ok(None);
                }
                self.driver.cancel(timer_id);
                timer.status = TimerStatus::Paused;
                Event::TimerPaused {
                    timer_id: timer_id.to_string(),
                    remaining_time: timer.remaining_time,
                    at: Utc::now(),
                }
            }
            Command::Reset => {
                self.driver.cancel(timer_id);
                timer.status = TimerStatus::Paused;
                timer.remaining_time = timer.timer.duration;
                Event::TimerReset {
                    timer_id: timer_id.to_string(),
                    duration: timer.timer.duration,
                    at: Utc::now(),
                }
            }
        };
        debug!(timer_id, ?command, "timer command applied");
        Ok(Some(event))
    }

    fn complete(&mut self, timer_id: &str) -> Option<Event> {
        self.driver.cancel(timer_id);
        let mut timer = self.view.remove(timer_id)?;
        timer.status = TimerStatus::Completed;
        timer.remaining_time = 0;
        if !self.view.contains_category(&timer.timer.category) {
            self.expanded.remove(&timer.timer.category);
        }
        info!(timer_id, name = %timer.timer.name, "timer completed");

        if let Err(e) = self.history.record_completion(&timer) {
            self.report_storage_failure(HISTORY_KEY, &e);
        }
        if let Err(e) = self.gateway.write_timers(&self.view.to_timers()) {
            self.report_storage_failure(TIMERS_KEY, &e);
        }

        let event = Event::TimerCompleted {
            timer,
            at: Utc::now(),
        };
        self.emit(event.clone());
        self.publish_view();
        Some(event)
    }

    fn report_storage_failure(&self, key: &str, err: &StorageError) {
        error!(key, error = %err, "failed to persist");
        self.emit(Event::StorageFailed {
            key: key.to_string(),
            message: err.to_string(),
            at: Utc::now(),
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_view(&self) {
        if self.events.receiver_count() > 0 {
            self.emit(Event::ViewChanged {
                view: self.view.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::storage::MemoryStore;

    /// Memory store whose writes start failing once armed.
    #[derive(Default)]
    struct FailingWrites {
        inner: MemoryStore,
        armed: AtomicBool,
    }

    impl KeyValueStore for FailingWrites {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.armed.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("disk full".into()));
            }
            self.inner.set(key, value)
        }
    }

    fn store_with(timers: &[(&str, u64, &str)]) -> TimerStore<MemoryStore> {
        let store = TimerStore::new(PersistenceGateway::new(MemoryStore::new()));
        for (name, duration, category) in timers {
            store
                .create(NewTimer::new(*name, *duration, *category))
                .unwrap();
        }
        let mut store = store;
        store.load();
        store
    }

    fn first_id<S: KeyValueStore>(store: &TimerStore<S>, category: &str) -> String {
        store.grouped().ids_in(category).remove(0)
    }

    #[test]
    fn create_rejects_invalid_input_without_writing() {
        let store = TimerStore::new(PersistenceGateway::new(MemoryStore::new()));
        let err = store.create(NewTimer::new("", 5, "Kitchen")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.gateway().store().get(TIMERS_KEY).unwrap().is_none());
    }

    #[test]
    fn create_does_not_touch_live_view() {
        let store = store_with(&[]);
        store.create(NewTimer::new("Tea", 3, "Kitchen")).unwrap();
        assert!(store.grouped().is_empty());
        assert_eq!(store.gateway().read_timers().unwrap().len(), 1);
    }

    #[test]
    fn create_surfaces_malformed_storage() {
        let store = TimerStore::new(PersistenceGateway::new(MemoryStore::new()));
        store.gateway().store().set(TIMERS_KEY, "[{").unwrap();
        let err = store.create(NewTimer::new("Tea", 3, "Kitchen")).unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::Malformed { .. })));
    }

    #[test]
    fn load_projects_paused_full_duration() {
        let store = store_with(&[("Tea", 3, "Kitchen"), ("Run", 60, "Gym")]);
        for timer in store.grouped().timers() {
            assert_eq!(timer.status, TimerStatus::Paused);
            assert_eq!(timer.remaining_time, timer.timer.duration);
        }
        assert!(store.is_expanded("Kitchen"));
        assert!(store.is_expanded("Gym"));
    }

    #[test]
    fn load_of_malformed_payload_leaves_store_empty() {
        let mut store = TimerStore::new(PersistenceGateway::new(MemoryStore::new()));
        store.gateway().store().set(TIMERS_KEY, "nope").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn unknown_timer_is_reported() {
        let mut store = store_with(&[]);
        assert!(matches!(
            store.pause("missing"),
            Err(CoreError::TimerNotFound(_))
        ));
    }

    #[test]
    fn start_outside_runtime_leaves_timer_paused() {
        let mut store = store_with(&[("Tea", 3, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        assert!(matches!(store.start(&id), Err(CoreError::Countdown(_))));
        assert_eq!(store.get(&id).unwrap().status, TimerStatus::Paused);
    }

    #[test]
    fn tick_ignores_paused_timers() {
        let mut store = store_with(&[("Tea", 3, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        assert!(store.tick(&id).is_none());
        assert_eq!(store.get(&id).unwrap().remaining_time, 3);
    }

    #[test]
    fn toggle_category_flips_expansion() {
        let mut store = store_with(&[("Tea", 3, "Kitchen")]);
        assert!(!store.toggle_category("Kitchen"));
        assert!(!store.is_expanded("Kitchen"));
        assert!(store.toggle_category("Kitchen"));
        assert!(store.is_expanded("Kitchen"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let mut store = store_with(&[("Tea", 3, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        assert!(store.start(&id).unwrap().is_some());
        assert!(store.start(&id).unwrap().is_none());
        assert_eq!(store.active_countdowns(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_pause_keeps_remaining_time() {
        let mut store = store_with(&[("Tea", 30, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        store.start(&id).unwrap();
        store.pause(&id).unwrap();
        let timer = store.get(&id).unwrap();
        assert_eq!(timer.status, TimerStatus::Paused);
        assert_eq!(timer.remaining_time, 30);
        assert!(!store.is_counting_down(&id));
        assert!(store.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_mid_countdown() {
        let mut store = store_with(&[("Tea", 10, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        store.start(&id).unwrap();
        store.next_event().await.unwrap();
        store.next_event().await.unwrap();
        store.pause(&id).unwrap();
        assert_eq!(store.get(&id).unwrap().remaining_time, 8);

        store.reset(&id).unwrap();
        assert_eq!(store.get(&id).unwrap().remaining_time, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn final_tick_completes_and_records_history() {
        let mut store = store_with(&[("Tea", 1, "Kitchen"), ("Toast", 5, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        let mut rx = store.subscribe();
        store.start(&id).unwrap();

        match store.next_event().await {
            Some(Event::TimerCompleted { timer, .. }) => {
                assert_eq!(timer.status, TimerStatus::Completed);
                assert_eq!(timer.remaining_time, 0);
                assert_eq!(timer.timer.name, "Tea");
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(store.get(&id).is_none());
        assert_eq!(store.grouped().ids_in("Kitchen").len(), 1);
        assert_eq!(store.active_countdowns(), 0);

        let history = store.history().load_all();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].duration, 1);

        // The completed timer no longer persists.
        let persisted = store.gateway().read_timers().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].name, "Toast");

        let mut saw_completion = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, Event::TimerCompleted { .. }) {
                saw_completion = true;
            }
        }
        assert!(saw_completion);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_all_pauses_every_timer_in_category() {
        let mut store = store_with(&[
            ("Tea", 30, "Kitchen"),
            ("Toast", 40, "Kitchen"),
            ("Eggs", 50, "Kitchen"),
            ("Run", 60, "Gym"),
        ]);
        let ids = store.grouped().ids_in("Kitchen");
        store.start(&ids[0]).unwrap();
        store.start(&ids[2]).unwrap();
        let gym = first_id(&store, "Gym");
        store.start(&gym).unwrap();
        store.next_event().await.unwrap();

        let events = store.bulk_action("Kitchen", BulkAction::ResetAll).unwrap();
        assert_eq!(events.len(), 3);
        for timer in store.grouped().category("Kitchen").unwrap() {
            assert_eq!(timer.status, TimerStatus::Paused);
            assert_eq!(timer.remaining_time, timer.timer.duration);
            assert!(!store.is_counting_down(timer.id()));
        }
        assert!(store.is_counting_down(&gym));
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_start_and_pause_skip_ineligible_timers() {
        let mut store = store_with(&[("Tea", 30, "Kitchen"), ("Toast", 40, "Kitchen")]);
        let ids = store.grouped().ids_in("Kitchen");
        store.start(&ids[0]).unwrap();

        let started = store.start_all("Kitchen").unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].timer_id(), Some(ids[1].as_str()));

        store.pause(&ids[1]).unwrap();
        let paused = store.pause_all("Kitchen").unwrap();
        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].timer_id(), Some(ids[0].as_str()));

        assert!(store.start_all("Nowhere").unwrap().is_empty());
    }

    #[test]
    fn tick_period_comes_from_constructor() {
        let store = TimerStore::with_tick_period(
            PersistenceGateway::new(MemoryStore::new()),
            Duration::from_millis(250),
        );
        assert_eq!(store.tick_period(), Duration::from_millis(250));
        let store = TimerStore::new(PersistenceGateway::new(MemoryStore::new()));
        assert_eq!(store.tick_period(), DEFAULT_TICK_PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_writes_on_completion_keep_memory_authoritative() {
        let mut store = TimerStore::new(PersistenceGateway::new(FailingWrites::default()));
        store.create(NewTimer::new("Tea", 1, "Kitchen")).unwrap();
        store.create(NewTimer::new("Soup", 9, "Kitchen")).unwrap();
        store.load();
        let tea = first_id(&store, "Kitchen");
        let mut rx = store.subscribe();
        store.start(&tea).unwrap();

        store.gateway().store().armed.store(true, Ordering::SeqCst);
        match store.next_event().await {
            Some(Event::TimerCompleted { timer, .. }) => assert_eq!(timer.timer.name, "Tea"),
            other => panic!("expected completion, got {other:?}"),
        }

        let mut failed_keys = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::StorageFailed { key, message, .. } = event {
                assert!(message.contains("disk full"));
                failed_keys.push(key);
            }
        }
        assert_eq!(failed_keys, vec![HISTORY_KEY.to_string(), TIMERS_KEY.to_string()]);

        assert!(store.get(&tea).is_none());
        assert_eq!(store.grouped().len(), 1);
        assert_eq!(store.active_countdowns(), 0);

        // Storage still holds what was there before the failed writes.
        assert_eq!(store.gateway().read_timers().unwrap().len(), 2);
        assert!(store.history().load_all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn load_discards_running_countdowns() {
        let mut store = store_with(&[("Tea", 30, "Kitchen")]);
        let id = first_id(&store, "Kitchen");
        store.start(&id).unwrap();
        store.load();
        assert_eq!(store.active_countdowns(), 0);
        assert_eq!(store.get(&id).unwrap().status, TimerStatus::Paused);
    }
}
