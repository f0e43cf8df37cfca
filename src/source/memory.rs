use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use super::{DataSource, Lookup, SourceError};
use crate::models::{Event, EventDetail, SettingsRow};

/// In-process store holding fixed rows. Counts every query it serves.
#[derive(Debug, Default)]
pub struct MemorySource {
    events: Vec<Event>,
    settings_rows: Vec<SettingsRow>,
    events_failure: Option<String>,
    settings_failure: Option<String>,
    queries: AtomicUsize,
}

/// Offline snapshot of both tables, as `{"events": [...], "club_settings": [...]}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fixture {
    events: Vec<Event>,
    club_settings: Vec<SettingsRow>,
}

impl MemorySource {
    pub fn from_json(body: &str) -> Result<Self, SourceError> {
        let fixture: Fixture =
            serde_json::from_str(body).map_err(|err| SourceError::Decode(err.to_string()))?;
        Ok(Self {
            events: fixture.events,
            settings_rows: fixture.club_settings,
            ..Self::default()
        })
    }

    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn with_settings(mut self, row: SettingsRow) -> Self {
        self.settings_rows.push(row);
        self
    }

    pub fn failing_events(mut self, message: &str) -> Self {
        self.events_failure = Some(message.to_string());
        self
    }

    pub fn failing_settings(mut self, message: &str) -> Self {
        self.settings_failure = Some(message.to_string());
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    // Rows are handed back in insertion order; ordering is the caller's job.
    async fn list_events(&self) -> Result<Vec<Event>, SourceError> {
        self.record_query();
        if let Some(message) = &self.events_failure {
            return Err(SourceError::Api {
                status: 500,
                message: message.clone(),
            });
        }
        Ok(self.events.clone())
    }

    async fn club_settings(&self) -> Result<Lookup<SettingsRow>, SourceError> {
        self.record_query();
        if let Some(message) = &self.settings_failure {
            return Err(SourceError::Api {
                status: 500,
                message: message.clone(),
            });
        }
        match self.settings_rows.as_slice() {
            [row] => Ok(Lookup::Found(row.clone())),
            _ => Ok(Lookup::Absent),
        }
    }

    async fn event_by_id(&self, id: &str) -> Result<Lookup<EventDetail>, SourceError> {
        self.record_query();
        if let Some(message) = &self.events_failure {
            return Err(SourceError::Api {
                status: 500,
                message: message.clone(),
            });
        }
        Ok(self
            .events
            .iter()
            .find(|event| event.id == id)
            .map(detail_from_event)
            .into())
    }
}

fn detail_from_event(event: &Event) -> EventDetail {
    EventDetail {
        id: event.id.clone(),
        title: Some(event.title.clone()),
        description: Some(event.description.clone()),
        date: Some(event.date.clone()),
        venue: Some(event.venue.clone()),
        venue_location: event.venue_location.clone(),
        iframe: event.iframe.clone(),
        details: event.details.clone(),
    }
}
