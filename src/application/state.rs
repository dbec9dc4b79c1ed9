use crate::domain::event_store::{EventCollection, StoreError};
use crate::domain::models::{Event, EventDraft, EventId};
use crate::domain::recorder::{Recorder, RecorderError, RecorderSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub pending: usize,
    pub loaded: bool,
    pub last_error: Option<String>,
}

/// Shared client state: the confirmed event collection, the recorder, and
/// the progress of remote operations.
///
/// The collection's order and mapping are only ever mutated together under
/// a single lock.
pub struct AppStore {
    events: Mutex<EventCollection>,
    recorder: Mutex<Recorder>,
    sync_status: Mutex<SyncStatus>,
    now_provider: NowProvider,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(EventCollection::new()),
            recorder: Mutex::new(Recorder::default()),
            sync_status: Mutex::new(SyncStatus::default()),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn events_snapshot(&self) -> Vec<Event> {
        self.lock_events().events()
    }

    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.lock_events().get(event_id).cloned()
    }

    pub fn event_count(&self) -> usize {
        self.lock_events().len()
    }

    pub fn events_version(&self) -> u64 {
        self.lock_events().version()
    }

    pub fn recorder_snapshot(&self) -> RecorderSnapshot {
        self.lock_recorder().snapshot()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        let now = self.now();
        self.lock_recorder().elapsed_seconds(now)
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.lock_sync_status().clone()
    }

    pub fn start_recording(&self) -> Result<DateTime<Utc>, RecorderError> {
        let now = self.now();
        self.lock_recorder().start(now)
    }

    /// Moves the recorder to idle and returns the draft for the finished
    /// interval, both under the recorder lock.
    pub fn stop_recording(&self) -> Result<EventDraft, RecorderError> {
        let mut recorder = self.lock_recorder();
        let date_start = recorder.stop()?;
        Ok(EventDraft::from_recording(date_start, self.now()))
    }

    pub(crate) fn replace_all_events(&self, events: Vec<Event>) {
        self.lock_events().replace_all(events);
    }

    pub(crate) fn insert_event(&self, event: Event) {
        self.lock_events().insert(event);
    }

    pub(crate) fn replace_event(&self, event: Event) -> Result<(), StoreError> {
        self.lock_events().replace(event)
    }

    pub(crate) fn remove_event(&self, event_id: EventId) -> bool {
        self.lock_events().remove(event_id)
    }

    pub(crate) fn begin_request(&self) {
        self.lock_sync_status().pending += 1;
    }

    pub(crate) fn finish_request(&self, error: Option<&str>, loaded: bool) {
        let mut status = self.lock_sync_status();
        status.pending = status.pending.saturating_sub(1);
        if loaded {
            status.loaded = true;
        }
        status.last_error = error.map(ToOwned::to_owned);
    }

    // Mutations never leave a collection half-updated, so a poisoned guard
    // still holds consistent data.
    fn lock_events(&self) -> MutexGuard<'_, EventCollection> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_recorder(&self) -> MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_sync_status(&self) -> MutexGuard<'_, SyncStatus> {
        self.sync_status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
