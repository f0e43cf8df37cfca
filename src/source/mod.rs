pub mod memory;
pub mod rest;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Event, EventDetail, SettingsRow};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result of a zero-or-one query. Absence is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::Absent,
        }
    }
}

/// Read-only capability over the hosted store. Implementations never write.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// All event rows, ordered by date ascending where the store supports it.
    async fn list_events(&self) -> Result<Vec<Event>, SourceError>;

    async fn club_settings(&self) -> Result<Lookup<SettingsRow>, SourceError>;

    async fn event_by_id(&self, id: &str) -> Result<Lookup<EventDetail>, SourceError>;
}
