use crate::application::bootstrap::bootstrap_workspace;
use crate::application::state::{AppStore, SyncStatus};
use crate::application::sync_coordinator::{StopError, SyncCoordinator, SyncError};
use crate::domain::day_grouping::{group_events_by_day, sorted_day_keys_desc};
use crate::domain::models::{iso8601, Event, EventId};
use crate::domain::recorder::RecorderError;
use crate::domain::time_format::{format_day_label, format_elapsed};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::events_client::{EventsApiClient, ReqwestEventsApiClient};
use crate::infrastructure::logging::init_tracing;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error(transparent)]
    Stop(#[from] StopError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("event not found: {0}")]
    EventNotFound(EventId),
}

pub struct AppState<C = ReqwestEventsApiClient>
where
    C: EventsApiClient,
{
    config: AppConfig,
    coordinator: Arc<SyncCoordinator<C>>,
}

impl AppState<ReqwestEventsApiClient> {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = bootstrap.config;
        init_tracing(&config.log_level);

        let client = ReqwestEventsApiClient::new(&config.api_base_url, config.request_timeout())?;
        info!(
            workspace_root = %bootstrap.workspace_root.display(),
            api_base_url = %client.base_url(),
            "initialized app state"
        );
        Ok(Self::with_client(config, Arc::new(client), Arc::new(AppStore::new())))
    }
}

impl<C> AppState<C>
where
    C: EventsApiClient,
{
    pub fn with_client(config: AppConfig, client: Arc<C>, store: Arc<AppStore>) -> Self {
        Self {
            config,
            coordinator: Arc::new(SyncCoordinator::new(client, store)),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator<C>> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<AppStore> {
        self.coordinator.store()
    }

    pub fn command_error(&self, command: &str, error: &CommandError) -> String {
        error!(command, %error, "command failed");
        error.to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStateResponse {
    pub recording: bool,
    pub date_start: Option<String>,
    pub elapsed_seconds: u64,
    pub elapsed: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDayResponse {
    pub day_key: String,
    pub label: String,
    pub events: Vec<Event>,
}

pub async fn load_events_impl<C: EventsApiClient>(
    state: &AppState<C>,
) -> Result<Vec<Event>, CommandError> {
    Ok(state.coordinator.load_events().await?)
}

pub fn list_events_impl<C: EventsApiClient>(state: &AppState<C>) -> Vec<Event> {
    state.store().events_snapshot()
}

pub fn list_calendar_days_impl<C: EventsApiClient>(state: &AppState<C>) -> Vec<CalendarDayResponse> {
    let mut groups = group_events_by_day(&state.store().events_snapshot());
    sorted_day_keys_desc(&groups)
        .into_iter()
        .filter_map(|day_key| {
            let events = groups.remove(&day_key)?;
            let label = format_day_label(&day_key).unwrap_or_else(|| day_key.clone());
            Some(CalendarDayResponse {
                day_key,
                label,
                events,
            })
        })
        .collect()
}

pub fn get_recorder_state_impl<C: EventsApiClient>(state: &AppState<C>) -> RecorderStateResponse {
    let store = state.store();
    let snapshot = store.recorder_snapshot();
    let elapsed_seconds = store.elapsed_seconds();
    RecorderStateResponse {
        recording: snapshot.recording,
        date_start: snapshot.date_start.as_ref().map(iso8601::format),
        elapsed_seconds,
        elapsed: format_elapsed(elapsed_seconds),
    }
}

pub fn start_recording_impl<C: EventsApiClient>(
    state: &AppState<C>,
) -> Result<RecorderStateResponse, CommandError> {
    let date_start = state.store().start_recording()?;
    info!(command = "start_recording", date_start = %iso8601::format(&date_start), "started recording");
    Ok(get_recorder_state_impl(state))
}

/// Stops the recorder right away; the event is created in the background
/// and shows up in the store once the service confirms it.
pub fn stop_recording_impl<C: EventsApiClient + 'static>(
    state: &AppState<C>,
) -> Result<RecorderStateResponse, CommandError> {
    // Detached: the Create reports back through sync signals and the store.
    drop(state.coordinator.stop_and_persist()?);
    info!(command = "stop_recording", "stopped recording");
    Ok(get_recorder_state_impl(state))
}

pub fn toggle_recording_impl<C: EventsApiClient + 'static>(
    state: &AppState<C>,
) -> Result<RecorderStateResponse, CommandError> {
    if state.store().recorder_snapshot().recording {
        stop_recording_impl(state)
    } else {
        start_recording_impl(state)
    }
}

/// Returns `Ok(None)` without contacting the service when the title is unchanged.
pub async fn update_event_title_impl<C: EventsApiClient>(
    state: &AppState<C>,
    event_id: EventId,
    title: String,
) -> Result<Option<Event>, CommandError> {
    let current = state
        .store()
        .event(event_id)
        .ok_or(CommandError::EventNotFound(event_id))?;
    if current.title == title {
        return Ok(None);
    }
    let updated = state
        .coordinator
        .update_event(&current.with_title(title))
        .await?;
    Ok(Some(updated))
}

pub async fn delete_event_impl<C: EventsApiClient>(
    state: &AppState<C>,
    event_id: EventId,
) -> Result<(), CommandError> {
    Ok(state.coordinator.delete_event(event_id).await?)
}

pub fn get_sync_status_impl<C: EventsApiClient>(state: &AppState<C>) -> SyncStatus {
    state.store().sync_status()
}
