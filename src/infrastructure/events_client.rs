use crate::domain::models::{Event, EventDraft, EventId};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
const EVENTS_SEGMENT: &str = "events";

#[async_trait]
pub trait EventsApiClient: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>, InfraError>;

    async fn create_event(&self, draft: &EventDraft) -> Result<Event, InfraError>;

    async fn update_event(&self, event_id: EventId, draft: &EventDraft) -> Result<Event, InfraError>;

    async fn delete_event(&self, event_id: EventId) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestEventsApiClient {
    client: Client,
    base_url: Url,
}

impl ReqwestEventsApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InfraError> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "events api base URL cannot be a base: {base_url}"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn events_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("events api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push(EVENTS_SEGMENT);
        }
        Ok(url)
    }

    pub fn event_endpoint(&self, event_id: EventId) -> Result<Url, InfraError> {
        let mut url = self.events_endpoint()?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("events URL cannot be a base".to_string())
            })?;
            segments.push(&event_id.to_string());
        }
        Ok(url)
    }

    async fn read_body(response: reqwest::Response) -> Result<String, InfraError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::http_error(status, body));
        }
        Ok(body)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, InfraError> {
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn http_error(status: StatusCode, body: String) -> InfraError {
        InfraError::HttpStatus {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl EventsApiClient for ReqwestEventsApiClient {
    async fn list_events(&self) -> Result<Vec<Event>, InfraError> {
        let response = self.client.get(self.events_endpoint()?).send().await?;
        Self::read_json(response).await
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event, InfraError> {
        let response = self
            .client
            .post(self.events_endpoint()?)
            .json(draft)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn update_event(&self, event_id: EventId, draft: &EventDraft) -> Result<Event, InfraError> {
        let response = self
            .client
            .patch(self.event_endpoint(event_id)?)
            .json(draft)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn delete_event(&self, event_id: EventId) -> Result<(), InfraError> {
        let response = self
            .client
            .delete(self.event_endpoint(event_id)?)
            .send()
            .await?;
        Self::read_body(response).await.map(|_| ())
    }
}

/// Events service kept in process memory. Identities are assigned in
/// increasing order like the HTTP service does.
#[derive(Debug)]
pub struct InMemoryEventsApiClient {
    events: Mutex<Vec<Event>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
}

impl Default for InMemoryEventsApiClient {
    fn default() -> Self {
        Self::with_events(Vec::new())
    }
}

impl InMemoryEventsApiClient {
    pub fn with_events(events: Vec<Event>) -> Self {
        let next_id = events.iter().map(|event| event.id).max().unwrap_or(0) + 1;
        Self {
            events: Mutex::new(events),
            next_id: AtomicI64::new(next_id),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While unavailable every call fails with HTTP 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn remote_events(&self) -> Vec<Event> {
        self.lock_events().clone()
    }

    fn ensure_available(&self) -> Result<(), InfraError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Self::http_error(StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }

    fn http_error(status: StatusCode) -> InfraError {
        InfraError::HttpStatus {
            status: status.as_u16(),
            body: String::new(),
        }
    }

    fn lock_events(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventsApiClient for InMemoryEventsApiClient {
    async fn list_events(&self) -> Result<Vec<Event>, InfraError> {
        self.ensure_available()?;
        Ok(self.remote_events())
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event, InfraError> {
        self.ensure_available()?;
        let created = Event {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: draft.title.clone(),
            date_start: draft.date_start,
            date_end: draft.date_end,
        };
        self.lock_events().push(created.clone());
        Ok(created)
    }

    async fn update_event(&self, event_id: EventId, draft: &EventDraft) -> Result<Event, InfraError> {
        self.ensure_available()?;
        let mut events = self.lock_events();
        let existing = events
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or_else(|| Self::http_error(StatusCode::NOT_FOUND))?;
        existing.title = draft.title.clone();
        existing.date_start = draft.date_start;
        existing.date_end = draft.date_end;
        Ok(existing.clone())
    }

    async fn delete_event(&self, event_id: EventId) -> Result<(), InfraError> {
        self.ensure_available()?;
        let mut events = self.lock_events();
        let before = events.len();
        events.retain(|event| event.id != event_id);
        if events.len() == before {
            return Err(Self::http_error(StatusCode::NOT_FOUND));
        }
        Ok(())
    }
}
