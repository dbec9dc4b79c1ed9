use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("recorder must be idle before start")]
    AlreadyRecording,
    #[error("recorder is not recording")]
    NotRecording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderPhase {
    #[default]
    Idle,
    Recording { date_start: DateTime<Utc> },
}

impl RecorderPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
        }
    }
}

/// Timer that tracks the start of an interval not yet persisted as an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Recorder {
    phase: RecorderPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSnapshot {
    pub recording: bool,
    pub date_start: Option<DateTime<Utc>>,
}

impl Recorder {
    pub fn phase(&self) -> RecorderPhase {
        self.phase
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, RecorderPhase::Recording { .. })
    }

    pub fn date_start(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            RecorderPhase::Idle => None,
            RecorderPhase::Recording { date_start } => Some(date_start),
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RecorderError> {
        if self.is_recording() {
            return Err(RecorderError::AlreadyRecording);
        }
        self.phase = RecorderPhase::Recording { date_start: now };
        Ok(now)
    }

    /// Returns the start timestamp captured in the same transition that clears it.
    pub fn stop(&mut self) -> Result<DateTime<Utc>, RecorderError> {
        let date_start = self.date_start().ok_or(RecorderError::NotRecording)?;
        self.phase = RecorderPhase::Idle;
        Ok(date_start)
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.date_start()
            .map(|date_start| (now - date_start).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            recording: self.is_recording(),
            date_start: self.date_start(),
        }
    }
}
