use crate::application::state::AppStore;
use crate::domain::event_store::StoreError;
use crate::domain::models::{Event, EventDraft, EventId};
use crate::domain::recorder::RecorderError;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::events_client::EventsApiClient;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SIGNAL_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Load,
    Create,
    Update,
    Delete,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Load => "Failed to load events!",
            Self::Create => "Failed to create event!",
            Self::Update => "Failed to update event!",
            Self::Delete => "Failed to delete event!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncSignal {
    Started(IntentKind),
    Succeeded(IntentKind),
    Failed {
        intent: IntentKind,
        message: &'static str,
    },
}

/// Network, status and payload failures all collapse into one variant.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{}", .intent.failure_message())]
    RemoteOperationFailed {
        intent: IntentKind,
        #[source]
        source: InfraError,
    },
}

#[derive(Debug, Error)]
pub enum StopError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("no async runtime available to persist the recording")]
    NoRuntime,
}

impl SyncError {
    pub fn intent(&self) -> IntentKind {
        match self {
            Self::RemoteOperationFailed { intent, .. } => *intent,
        }
    }

    pub fn message(&self) -> &'static str {
        self.intent().failure_message()
    }
}

/// Runs remote round-trips and projects confirmed results into the store.
///
/// Nothing is applied optimistically: the store changes only after the
/// corresponding request succeeded, and a failed request leaves it as is.
pub struct SyncCoordinator<C>
where
    C: EventsApiClient,
{
    client: Arc<C>,
    store: Arc<AppStore>,
    signals: broadcast::Sender<SyncSignal>,
}

impl<C> SyncCoordinator<C>
where
    C: EventsApiClient,
{
    pub fn new(client: Arc<C>, store: Arc<AppStore>) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            client,
            store,
            signals,
        }
    }

    pub fn store(&self) -> &Arc<AppStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncSignal> {
        self.signals.subscribe()
    }

    pub async fn load_events(&self) -> Result<Vec<Event>, SyncError> {
        let intent = IntentKind::Load;
        self.issue(intent);
        match self.client.list_events().await {
            Ok(events) => {
                self.store.replace_all_events(events.clone());
                info!(count = events.len(), "loaded events");
                self.resolve(intent);
                Ok(events)
            }
            Err(source) => Err(self.reject(intent, source)),
        }
    }

    /// Finishes the running recording and returns the draft to persist.
    pub fn stop_recording(&self) -> Result<EventDraft, RecorderError> {
        self.store.stop_recording()
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, SyncError> {
        let intent = IntentKind::Create;
        self.issue(intent);
        match self.client.create_event(&draft).await {
            Ok(created) => {
                self.store.insert_event(created.clone());
                info!(event_id = created.id, "created event");
                self.resolve(intent);
                Ok(created)
            }
            Err(source) => Err(self.reject(intent, source)),
        }
    }

    pub async fn update_event(&self, event: &Event) -> Result<Event, SyncError> {
        let intent = IntentKind::Update;
        self.issue(intent);
        match self.client.update_event(event.id, &event.to_draft()).await {
            Ok(updated) => {
                match self.store.replace_event(updated.clone()) {
                    Ok(()) => info!(event_id = updated.id, "updated event"),
                    Err(StoreError::UnknownEvent(event_id)) => {
                        warn!(event_id, "dropping update for event no longer in store")
                    }
                }
                self.resolve(intent);
                Ok(updated)
            }
            Err(source) => Err(self.reject(intent, source)),
        }
    }

    pub async fn delete_event(&self, event_id: EventId) -> Result<(), SyncError> {
        let intent = IntentKind::Delete;
        self.issue(intent);
        match self.client.delete_event(event_id).await {
            Ok(()) => {
                let removed = self.store.remove_event(event_id);
                info!(event_id, removed, "deleted event");
                self.resolve(intent);
                Ok(())
            }
            Err(source) => Err(self.reject(intent, source)),
        }
    }

    fn issue(&self, intent: IntentKind) {
        debug!(intent = intent.as_str(), "issuing request");
        self.store.begin_request();
        self.emit(SyncSignal::Started(intent));
    }

    fn resolve(&self, intent: IntentKind) {
        self.store.finish_request(None, intent == IntentKind::Load);
        self.emit(SyncSignal::Succeeded(intent));
    }

    fn reject(&self, intent: IntentKind, source: InfraError) -> SyncError {
        let message = intent.failure_message();
        error!(intent = intent.as_str(), error = %source, "{message}");
        self.store.finish_request(Some(message), false);
        self.emit(SyncSignal::Failed { intent, message });
        SyncError::RemoteOperationFailed { intent, source }
    }

    fn emit(&self, signal: SyncSignal) {
        // No subscribers is fine; nobody is waiting on this result.
        let _ = self.signals.send(signal);
    }
}

impl<C> SyncCoordinator<C>
where
    C: EventsApiClient + 'static,
{
    /// Stops the recorder immediately and persists the interval in the
    /// background. The recorder is idle by the time this returns.
    ///
    /// Without a Tokio runtime on the calling thread the recorder is left
    /// running and `StopError::NoRuntime` is returned.
    pub fn stop_and_persist(
        self: &Arc<Self>,
    ) -> Result<JoinHandle<Result<Event, SyncError>>, StopError> {
        let runtime = Handle::try_current().map_err(|_| StopError::NoRuntime)?;
        let draft = self.stop_recording()?;
        let coordinator = Arc::clone(self);
        Ok(runtime.spawn(async move { coordinator.create_event(draft).await }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::NowProvider;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Debug, Default)]
    struct UpdateGate {
        reached: Notify,
        release: Notify,
    }

    #[derive(Debug, Default)]
    struct FakeEventsApiClient {
        remote: Mutex<Vec<Event>>,
        next_id: AtomicI64,
        failing: Mutex<HashSet<IntentKind>>,
        created_drafts: Mutex<Vec<EventDraft>>,
        patches: Mutex<Vec<(EventId, EventDraft)>>,
        calls: AtomicUsize,
        update_gate: Option<Arc<UpdateGate>>,
    }

    impl FakeEventsApiClient {
        fn with_remote(events: Vec<Event>) -> Self {
            let next_id = events.iter().map(|event| event.id).max().unwrap_or(0) + 1;
            Self {
                remote: Mutex::new(events),
                next_id: AtomicI64::new(next_id),
                ..Self::default()
            }
        }

        fn failing(self, intent: IntentKind) -> Self {
            self.failing.lock().expect("failing lock").insert(intent);
            self
        }

        fn with_update_gate(mut self, gate: Arc<UpdateGate>) -> Self {
            self.update_gate = Some(gate);
            self
        }

        fn check(&self, intent: IntentKind) -> Result<(), InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().expect("failing lock").contains(&intent) {
                return Err(InfraError::HttpStatus {
                    status: 500,
                    body: "internal error".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl EventsApiClient for FakeEventsApiClient {
        async fn list_events(&self) -> Result<Vec<Event>, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().expect("failing lock").contains(&IntentKind::Load) {
                let malformed = serde_json::from_str::<Vec<Event>>("<html>502</html>");
                return malformed.map_err(InfraError::from);
            }
            Ok(self.remote.lock().expect("remote lock").clone())
        }

        async fn create_event(&self, draft: &EventDraft) -> Result<Event, InfraError> {
            self.check(IntentKind::Create)?;
            self.created_drafts.lock().expect("drafts lock").push(draft.clone());
            let created = Event {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                title: draft.title.clone(),
                date_start: draft.date_start,
                date_end: draft.date_end,
            };
            self.remote.lock().expect("remote lock").push(created.clone());
            Ok(created)
        }

        async fn update_event(&self, event_id: EventId, draft: &EventDraft) -> Result<Event, InfraError> {
            self.check(IntentKind::Update)?;
            self.patches
                .lock()
                .expect("patches lock")
                .push((event_id, draft.clone()));
            let updated = {
                let mut remote = self.remote.lock().expect("remote lock");
                let Some(existing) = remote.iter_mut().find(|event| event.id == event_id) else {
                    return Err(InfraError::HttpStatus {
                        status: 404,
                        body: "{}".to_string(),
                    });
                };
                existing.title = draft.title.clone();
                existing.clone()
            };
            if let Some(gate) = &self.update_gate {
                gate.reached.notify_one();
                gate.release.notified().await;
            }
            Ok(updated)
        }

        async fn delete_event(&self, event_id: EventId) -> Result<(), InfraError> {
            self.check(IntentKind::Delete)?;
            self.remote
                .lock()
                .expect("remote lock")
                .retain(|event| event.id != event_id);
            Ok(())
        }
    }

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn stepping_clock(start: DateTime<Utc>, step_seconds: i64) -> NowProvider {
        let ticks = Arc::new(AtomicI64::new(0));
        Arc::new(move || {
            let tick = ticks.fetch_add(1, Ordering::SeqCst);
            start + Duration::seconds(tick * step_seconds)
        })
    }

    fn sample_event(id: EventId, title: &str) -> Event {
        let start = fixed_time("2024-01-01T09:00:00Z") + Duration::hours(id);
        Event {
            id,
            title: title.to_string(),
            date_start: start,
            date_end: start + Duration::minutes(45),
        }
    }

    fn coordinator(client: FakeEventsApiClient) -> (Arc<FakeEventsApiClient>, SyncCoordinator<FakeEventsApiClient>) {
        let client = Arc::new(client);
        let store = Arc::new(AppStore::new());
        (Arc::clone(&client), SyncCoordinator::new(client, store))
    }

    fn drain(receiver: &mut broadcast::Receiver<SyncSignal>) -> Vec<SyncSignal> {
        let mut signals = Vec::new();
        while let Ok(signal) = receiver.try_recv() {
            signals.push(signal);
        }
        signals
    }

    #[tokio::test]
    async fn load_replaces_store_and_signals_success() {
        let remote = vec![sample_event(2, "b"), sample_event(1, "a")];
        let (_, coordinator) = coordinator(FakeEventsApiClient::with_remote(remote.clone()));
        let mut signals = coordinator.subscribe();

        let loaded = coordinator.load_events().await.expect("load events");

        assert_eq!(loaded, remote);
        assert_eq!(coordinator.store().events_snapshot(), remote);
        assert_eq!(
            drain(&mut signals),
            vec![
                SyncSignal::Started(IntentKind::Load),
                SyncSignal::Succeeded(IntentKind::Load)
            ]
        );
        let status = coordinator.store().sync_status();
        assert!(status.loaded);
        assert_eq!(status.pending, 0);
    }

    #[tokio::test]
    async fn failed_load_leaves_store_untouched_and_signals_failure() {
        let (client, coordinator) =
            coordinator(FakeEventsApiClient::with_remote(vec![sample_event(1, "a")]).failing(IntentKind::Load));
        let mut signals = coordinator.subscribe();

        let error = coordinator.load_events().await.expect_err("load must fail");

        assert_eq!(error.intent(), IntentKind::Load);
        assert_eq!(error.to_string(), "Failed to load events!");
        assert!(matches!(
            error,
            SyncError::RemoteOperationFailed { source: InfraError::Json(_), .. }
        ));
        assert!(coordinator.store().events_snapshot().is_empty());
        assert_eq!(
            drain(&mut signals),
            vec![
                SyncSignal::Started(IntentKind::Load),
                SyncSignal::Failed {
                    intent: IntentKind::Load,
                    message: "Failed to load events!"
                }
            ]
        );
        let status = coordinator.store().sync_status();
        assert!(!status.loaded);
        assert_eq!(status.last_error.as_deref(), Some("Failed to load events!"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_keeps_previously_loaded_events() {
        let (client, coordinator) =
            coordinator(FakeEventsApiClient::with_remote(vec![sample_event(1, "a")]));
        coordinator.load_events().await.expect("first load");
        client
            .failing
            .lock()
            .expect("failing lock")
            .insert(IntentKind::Load);

        assert!(coordinator.load_events().await.is_err());

        assert_eq!(coordinator.store().events_snapshot(), vec![sample_event(1, "a")]);
    }

    #[tokio::test]
    async fn stopping_recording_persists_interval_after_existing_events() {
        let start = fixed_time("2024-01-01T09:00:00Z");
        let client = Arc::new(FakeEventsApiClient::with_remote(vec![
            sample_event(1, "a"),
            sample_event(2, "b"),
        ]));
        let store = Arc::new(AppStore::new().with_now_provider(stepping_clock(start, 1_500)));
        let coordinator = Arc::new(SyncCoordinator::new(Arc::clone(&client), Arc::clone(&store)));
        coordinator.load_events().await.expect("load events");

        let started = store.start_recording().expect("start recording");
        let pending = coordinator.stop_and_persist().expect("stop recording");
        assert!(!store.recorder_snapshot().recording);

        let created = pending.await.expect("join create").expect("create event");

        assert_eq!(created.id, 3);
        assert_eq!(created.title, "No name");
        assert_eq!(created.date_start, started);
        assert_eq!(created.date_end, started + Duration::seconds(1_500));
        assert_eq!(
            store.events_snapshot().iter().map(|event| event.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let drafts = client.created_drafts.lock().expect("drafts lock").clone();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].date_start, started);
    }

    #[tokio::test]
    async fn stop_from_idle_issues_no_request() {
        let (client, coordinator) = coordinator(FakeEventsApiClient::default());
        let coordinator = Arc::new(coordinator);

        let result = coordinator.stop_and_persist();

        assert!(matches!(result, Err(StopError::Recorder(RecorderError::NotRecording))));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_without_runtime_keeps_recording() {
        let (client, coordinator) = coordinator(FakeEventsApiClient::default());
        let coordinator = Arc::new(coordinator);
        coordinator.store().start_recording().expect("start recording");

        let result = coordinator.stop_and_persist();

        assert!(matches!(result, Err(StopError::NoRuntime)));
        assert!(coordinator.store().recorder_snapshot().recording);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_create_loses_interval_but_keeps_recorder_idle() {
        let (_, coordinator) =
            coordinator(FakeEventsApiClient::with_remote(vec![sample_event(1, "a")]).failing(IntentKind::Create));
        let coordinator = Arc::new(coordinator);
        coordinator.load_events().await.expect("load events");
        let mut signals = coordinator.subscribe();
        coordinator.store().start_recording().expect("start recording");

        let error = coordinator
            .stop_and_persist()
            .expect("stop recording")
            .await
            .expect("join create")
            .expect_err("create must fail");

        assert_eq!(error.message(), "Failed to create event!");
        assert!(!coordinator.store().recorder_snapshot().recording);
        assert_eq!(coordinator.store().events_snapshot(), vec![sample_event(1, "a")]);
        assert_eq!(
            drain(&mut signals).last(),
            Some(&SyncSignal::Failed {
                intent: IntentKind::Create,
                message: "Failed to create event!"
            })
        );
    }

    #[tokio::test]
    async fn update_changes_only_title_and_keeps_order() {
        let remote = vec![sample_event(4, "Work"), sample_event(5, "No name"), sample_event(6, "Read")];
        let (client, coordinator) = coordinator(FakeEventsApiClient::with_remote(remote));
        coordinator.load_events().await.expect("load events");
        let original = coordinator.store().event(5).expect("event 5");

        coordinator
            .update_event(&original.with_title("Gym"))
            .await
            .expect("update event");

        let stored = coordinator.store().event(5).expect("event 5 after update");
        assert_eq!(stored.title, "Gym");
        assert_eq!(stored.date_start, original.date_start);
        assert_eq!(stored.date_end, original.date_end);
        assert_eq!(
            coordinator.store().events_snapshot().iter().map(|event| event.id).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
        let patches = client.patches.lock().expect("patches lock").clone();
        assert_eq!(patches, vec![(5, original.with_title("Gym").to_draft())]);
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_title() {
        let (_, coordinator) =
            coordinator(FakeEventsApiClient::with_remote(vec![sample_event(5, "No name")]).failing(IntentKind::Update));
        coordinator.load_events().await.expect("load events");

        let error = coordinator
            .update_event(&sample_event(5, "Gym"))
            .await
            .expect_err("update must fail");

        assert_eq!(error.to_string(), "Failed to update event!");
        assert_eq!(coordinator.store().event(5).map(|event| event.title), Some("No name".to_string()));
    }

    #[tokio::test]
    async fn stale_update_after_delete_does_not_resurrect_event() {
        let gate = Arc::new(UpdateGate::default());
        let (_, coordinator) = coordinator(
            FakeEventsApiClient::with_remote(vec![sample_event(5, "No name")])
                .with_update_gate(Arc::clone(&gate)),
        );
        coordinator.load_events().await.expect("load events");

        let renamed = sample_event(5, "Gym");
        let update = coordinator.update_event(&renamed);
        let delete_then_release = async {
            gate.reached.notified().await;
            let deleted = coordinator.delete_event(5).await;
            gate.release.notify_one();
            deleted
        };
        let (updated, deleted) = tokio::join!(update, delete_then_release);

        assert!(deleted.is_ok());
        assert_eq!(updated.expect("update resolves").title, "Gym");
        assert!(coordinator.store().event(5).is_none());
        assert_eq!(coordinator.store().event_count(), 0);
    }

    #[tokio::test]
    async fn delete_removes_by_caller_id_and_is_idempotent() {
        let (_, coordinator) = coordinator(FakeEventsApiClient::with_remote(vec![
            sample_event(1, "a"),
            sample_event(2, "b"),
        ]));
        coordinator.load_events().await.expect("load events");

        coordinator.delete_event(1).await.expect("delete event");
        coordinator.delete_event(1).await.expect("delete again");

        assert_eq!(coordinator.store().events_snapshot(), vec![sample_event(2, "b")]);
    }

    #[tokio::test]
    async fn failed_delete_keeps_event() {
        let (_, coordinator) =
            coordinator(FakeEventsApiClient::with_remote(vec![sample_event(1, "a")]).failing(IntentKind::Delete));
        coordinator.load_events().await.expect("load events");

        let error = coordinator.delete_event(1).await.expect_err("delete must fail");

        assert_eq!(error.message(), "Failed to delete event!");
        assert_eq!(coordinator.store().event_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_intents_leave_store_consistent() {
        let start = fixed_time("2024-01-01T09:00:00Z");
        let client = Arc::new(FakeEventsApiClient::with_remote(vec![
            sample_event(4, "Work"),
            sample_event(5, "No name"),
        ]));
        let store = Arc::new(AppStore::new().with_now_provider(stepping_clock(start, 60)));
        let coordinator = SyncCoordinator::new(client, Arc::clone(&store));
        coordinator.load_events().await.expect("load events");
        store.start_recording().expect("start recording");
        let draft = coordinator.stop_recording().expect("stop recording");

        let renamed = sample_event(4, "Deep work");
        let (updated, deleted, created) = tokio::join!(
            coordinator.update_event(&renamed),
            coordinator.delete_event(5),
            coordinator.create_event(draft),
        );

        assert!(updated.is_ok() && deleted.is_ok() && created.is_ok());
        let events = store.events_snapshot();
        assert_eq!(events.iter().map(|event| event.id).collect::<Vec<_>>(), vec![4, 6]);
        assert_eq!(events[0].title, "Deep work");
        assert_eq!(store.sync_status().pending, 0);
    }
}
