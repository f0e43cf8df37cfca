use serde::Serialize;

use crate::models::{ClubSettings, Event};
use crate::source::{DataSource, Lookup, SourceError};
use crate::views;

/// What a page sees of a fetch cycle.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for LoadState<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => LoadState::Ready(value),
            Err(err) => LoadState::Failed(err.to_string()),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SiteData {
    pub events: Vec<Event>,
    pub club_settings: ClubSettings,
}

/// Both query outcomes, kept apart so one failing does not hide the other.
#[derive(Debug)]
pub struct LoadParts {
    pub events: Result<Vec<Event>, SourceError>,
    pub club_settings: Result<ClubSettings, SourceError>,
}

impl LoadParts {
    /// Events error wins when both queries failed.
    pub fn merge(self) -> Result<SiteData, SourceError> {
        let events = self.events?;
        let club_settings = self.club_settings?;
        Ok(SiteData {
            events,
            club_settings,
        })
    }
}

pub struct Aggregator<S> {
    source: S,
}

impl<S: DataSource> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs the events and settings reads concurrently. One attempt, no retry.
    pub async fn load_parts(&self) -> LoadParts {
        let (events, club_settings) = tokio::join!(self.load_events(), self.load_settings());
        LoadParts {
            events,
            club_settings,
        }
    }

    pub async fn load(&self) -> Result<SiteData, SourceError> {
        self.load_parts().await.merge()
    }

    async fn load_events(&self) -> Result<Vec<Event>, SourceError> {
        match self.source.list_events().await {
            Ok(events) => {
                tracing::debug!(source = self.source.name(), count = events.len(), "events loaded");
                Ok(views::sort_by_date(&events))
            }
            Err(err) => {
                tracing::error!(source = self.source.name(), error = %err, "error fetching events");
                Err(err)
            }
        }
    }

    async fn load_settings(&self) -> Result<ClubSettings, SourceError> {
        match self.source.club_settings().await {
            Ok(Lookup::Found(row)) => Ok(ClubSettings::from(row)),
            Ok(Lookup::Absent) => {
                tracing::info!(source = self.source.name(), "no club settings row, using defaults");
                Ok(ClubSettings::default())
            }
            Err(err) => {
                tracing::error!(source = self.source.name(), error = %err, "error fetching club settings");
                Err(err)
            }
        }
    }
}
