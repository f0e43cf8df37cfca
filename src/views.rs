//! Derived, per-render projections of the event list.
//!
//! Everything here is a pure function of its inputs. Nothing is cached.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::{ClubSettings, Event, EventStatus};

/// How many upcoming events the home page highlights.
pub const HIGHLIGHT_COUNT: usize = 3;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    #[default]
    Upcoming,
    Past,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Upcoming => "upcoming",
            StatusFilter::Past => "past",
        }
    }

    pub fn matches(self, event: &Event) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Upcoming => event.status == EventStatus::Upcoming,
            StatusFilter::Past => event.status == EventStatus::Past,
        }
    }

    pub fn apply(self, events: &[Event]) -> Vec<Event> {
        events
            .iter()
            .filter(|event| self.matches(event))
            .cloned()
            .collect()
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "upcoming" => Ok(StatusFilter::Upcoming),
            "past" => Ok(StatusFilter::Past),
            other => Err(format!("unknown event filter: {other}")),
        }
    }
}

/// Orders by parsed date; unparseable dates go last. Ties keep input order.
pub fn compare_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_by_date(events: &[Event]) -> Vec<Event> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &Event)> =
        events.iter().map(|event| (event.starts_at(), event)).collect();
    // `sort_by` is stable, which is what keeps equal dates in source order.
    keyed.sort_by(|a, b| compare_dates(a.0, b.0));
    keyed.into_iter().map(|(_, event)| event.clone()).collect()
}

/// First `limit` events of the date-sorted upcoming subset.
pub fn top_upcoming(events: &[Event], limit: usize) -> Vec<Event> {
    let upcoming = StatusFilter::Upcoming.apply(events);
    let mut sorted = sort_by_date(&upcoming);
    sorted.truncate(limit);
    sorted
}

/// "March 1, 2025" in `tz`; the raw text when the date does not parse.
pub fn display_date(raw: &str, tz: Tz) -> String {
    match crate::models::parse_event_date(raw) {
        Some(dt) => dt.with_timezone(&tz).format("%B %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EventCard {
    #[serde(flatten)]
    pub event: Event,
    pub display_date: String,
}

impl EventCard {
    fn new(event: Event, tz: Tz) -> Self {
        let display_date = display_date(&event.date, tz);
        Self {
            event,
            display_date,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EventsView {
    pub filter: StatusFilter,
    pub events: Vec<EventCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
}

impl EventsView {
    pub fn build(events: &[Event], filter: StatusFilter, tz: Tz) -> Self {
        let cards: Vec<EventCard> = filter
            .apply(&sort_by_date(events))
            .into_iter()
            .map(|event| EventCard::new(event, tz))
            .collect();
        let empty_message = cards.is_empty().then(|| {
            format!("No {filter} events found at the moment. Check back soon!")
        });
        Self {
            filter,
            events: cards,
            empty_message,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HomeView {
    pub highlights: Vec<EventCard>,
    pub club_settings: ClubSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
}

impl HomeView {
    pub fn build(events: &[Event], club_settings: ClubSettings, tz: Tz) -> Self {
        let highlights: Vec<EventCard> = top_upcoming(events, HIGHLIGHT_COUNT)
            .into_iter()
            .map(|event| EventCard::new(event, tz))
            .collect();
        let empty_message = highlights
            .is_empty()
            .then(|| "No upcoming events scheduled at the moment. Stay tuned!".to_string());
        Self {
            highlights,
            club_settings,
            empty_message,
        }
    }
}
