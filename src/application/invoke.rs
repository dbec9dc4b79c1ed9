//! Commands as a UI shell binds them. Failures are logged with the command
//! name and come back as the message the UI displays.

use crate::application::commands::{
    delete_event_impl, get_recorder_state_impl, get_sync_status_impl, list_calendar_days_impl,
    list_events_impl, load_events_impl, start_recording_impl, stop_recording_impl,
    toggle_recording_impl, update_event_title_impl, AppState, CalendarDayResponse,
    RecorderStateResponse,
};
use crate::application::state::SyncStatus;
use crate::domain::models::{Event, EventId};
use crate::infrastructure::events_client::EventsApiClient;

pub async fn load_events<C: EventsApiClient>(state: &AppState<C>) -> Result<Vec<Event>, String> {
    load_events_impl(state)
        .await
        .map_err(|error| state.command_error("load_events", &error))
}

pub fn list_events<C: EventsApiClient>(state: &AppState<C>) -> Vec<Event> {
    list_events_impl(state)
}

pub fn list_calendar_days<C: EventsApiClient>(state: &AppState<C>) -> Vec<CalendarDayResponse> {
    list_calendar_days_impl(state)
}

pub fn get_recorder_state<C: EventsApiClient>(state: &AppState<C>) -> RecorderStateResponse {
    get_recorder_state_impl(state)
}

pub fn start_recording<C: EventsApiClient>(
    state: &AppState<C>,
) -> Result<RecorderStateResponse, String> {
    start_recording_impl(state).map_err(|error| state.command_error("start_recording", &error))
}

pub fn stop_recording<C: EventsApiClient + 'static>(
    state: &AppState<C>,
) -> Result<RecorderStateResponse, String> {
    stop_recording_impl(state).map_err(|error| state.command_error("stop_recording", &error))
}

pub fn toggle_recording<C: EventsApiClient + 'static>(
    state: &AppState<C>,
) -> Result<RecorderStateResponse, String> {
    toggle_recording_impl(state).map_err(|error| state.command_error("toggle_recording", &error))
}

pub async fn update_event_title<C: EventsApiClient>(
    state: &AppState<C>,
    event_id: EventId,
    title: String,
) -> Result<Option<Event>, String> {
    update_event_title_impl(state, event_id, title)
        .await
        .map_err(|error| state.command_error("update_event_title", &error))
}

pub async fn delete_event<C: EventsApiClient>(
    state: &AppState<C>,
    event_id: EventId,
) -> Result<(), String> {
    delete_event_impl(state, event_id)
        .await
        .map_err(|error| state.command_error("delete_event", &error))
}

pub fn get_sync_status<C: EventsApiClient>(state: &AppState<C>) -> SyncStatus {
    get_sync_status_impl(state)
}
