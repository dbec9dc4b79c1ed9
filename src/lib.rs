//! Client-side core of a time-tracking calendar: a start/stop recorder,
//! a local collection of confirmed events, and a coordinator that keeps
//! the collection in step with a remote events service.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{AppState, CalendarDayResponse, CommandError, RecorderStateResponse};
pub use application::state::{AppStore, NowProvider, SyncStatus};
pub use application::sync_coordinator::{IntentKind, StopError, SyncCoordinator, SyncError, SyncSignal};
pub use domain::models::{Event, EventDraft, EventId, DEFAULT_EVENT_TITLE};
pub use infrastructure::config::AppConfig;
pub use infrastructure::error::InfraError;
pub use infrastructure::events_client::{
    EventsApiClient, InMemoryEventsApiClient, ReqwestEventsApiClient,
};
