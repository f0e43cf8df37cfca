use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Past,
}

/// A row of the `events` table as the listing pages see it.
///
/// `status` is whatever the store says; it is never reconciled against `date`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String, // raw timestamp text as stored
    #[serde(default, deserialize_with = "null_as_empty")]
    pub venue: String,
    #[serde(default)]
    pub venue_location: Option<String>,
    #[serde(default)]
    pub form_link: Option<String>,
    #[serde(default)]
    pub iframe: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    pub status: EventStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
}

// Nullable text columns come back as `null`; the listing treats that as "".
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Event {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_event_date(&self.date)
    }
}

/// Projection fetched by the registration page for a single event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct EventDetail {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub venue_location: Option<String>,
    pub iframe: Option<String>,
    pub details: Option<String>,
}

pub const DETAIL_COLUMNS: &str = "id,title,description,date,venue,venue_location,iframe,details";

const FALLBACK_HEADING: &str = "Event Registration";

impl EventDetail {
    pub fn heading(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.is_empty())
            .unwrap_or(FALLBACK_HEADING)
    }

    /// Embeddable registration form markup, passed through untouched.
    pub fn registration_form(&self) -> Option<&str> {
        non_empty(self.iframe.as_deref())
    }

    /// Rich-text details block, passed through untouched.
    pub fn details_markup(&self) -> Option<&str> {
        non_empty(self.details.as_deref())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct SocialMedia {
    pub facebook: String,
    pub instagram: String,
    pub linkedin: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ClubSettings {
    pub join_form_link: String,
    pub contact_email: String,
    pub phone_number: String,
    pub social_media: SocialMedia,
}

/// The `club_settings` row as stored: flat and every column nullable.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct SettingsRow {
    pub join_form_link: Option<String>,
    pub contact_email: Option<String>,
    pub phone_number: Option<String>,
    pub social_media_facebook: Option<String>,
    pub social_media_instagram: Option<String>,
    pub social_media_linkedin: Option<String>,
}

impl From<SettingsRow> for ClubSettings {
    fn from(row: SettingsRow) -> Self {
        ClubSettings {
            join_form_link: row.join_form_link.unwrap_or_default(),
            contact_email: row.contact_email.unwrap_or_default(),
            phone_number: row.phone_number.unwrap_or_default(),
            social_media: SocialMedia {
                facebook: row.social_media_facebook.unwrap_or_default(),
                instagram: row.social_media_instagram.unwrap_or_default(),
                linkedin: row.social_media_linkedin.unwrap_or_default(),
            },
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Accepts RFC 3339, a zone-less timestamp (taken as UTC) or a bare date.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const EVENT_JSON: &str = r#"{
        "id": "7f1c",
        "title": "Rust Workshop",
        "description": "Intro to ownership",
        "date": "2025-03-01T17:30:00+00:00",
        "venue": "Lab 3",
        "form_link": "https://forms.example.com/rust",
        "status": "upcoming",
        "image": "https://cdn.example.com/rust.png",
        "created_at": "2025-01-10T09:00:00+00:00"
    }"#;

    #[test]
    fn decodes_event_rows_and_ignores_unknown_columns() {
        let event: Event = serde_json::from_str(EVENT_JSON).expect("decode event");
        assert_eq!(event.status, EventStatus::Upcoming);
        assert_eq!(event.form_link.as_deref(), Some("https://forms.example.com/rust"));
        assert!(event.iframe.is_none());
        let start = event.starts_at().expect("start time");
        assert_eq!((start.month(), start.day(), start.hour()), (3, 1, 17));
    }

    #[test]
    fn null_text_columns_decode_as_empty() {
        let json = r#"{"id":"n1","title":null,"description":null,"date":null,"venue":null,"status":"past","image":null}"#;
        let event: Event = serde_json::from_str(json).expect("decode null columns");
        assert_eq!(event.title, "");
        assert_eq!(event.image, "");
        assert_eq!(event.date, "");
        assert!(event.starts_at().is_none());

        let event: Event =
            serde_json::from_str(r#"{"id":"n2","status":"upcoming"}"#).expect("decode sparse row");
        assert_eq!(event.date, "");
        assert_eq!(event.venue, "");
    }

    #[test]
    fn rejects_unknown_status() {
        let json = EVENT_JSON.replace("\"upcoming\"", "\"cancelled\"");
        assert!(serde_json::from_str::<Event>(&json).is_err());
    }

    #[test]
    fn parses_store_date_shapes() {
        assert!(parse_event_date("2025-06-01").is_some());
        assert!(parse_event_date("2025-06-01T10:00:00").is_some());
        assert!(parse_event_date("2025-06-01 10:00:00.123").is_some());
        assert!(parse_event_date("2025-06-01T10:00:00Z").is_some());
        assert!(parse_event_date("next tuesday").is_none());
        assert!(parse_event_date("").is_none());
    }

    #[test]
    fn settings_fields_default_independently() {
        let row: SettingsRow = serde_json::from_str(
            r#"{"contact_email":"csi@example.edu","social_media_instagram":"https://instagram.com/csi","phone_number":null}"#,
        )
        .expect("decode settings");
        let settings = ClubSettings::from(row);
        assert_eq!(settings.contact_email, "csi@example.edu");
        assert_eq!(settings.phone_number, "");
        assert_eq!(settings.join_form_link, "");
        assert_eq!(settings.social_media.instagram, "https://instagram.com/csi");
        assert_eq!(settings.social_media.facebook, "");
        assert_eq!(settings.social_media.linkedin, "");
    }

    #[test]
    fn detail_falls_back_to_generic_heading() {
        let detail = EventDetail {
            id: "x".to_string(),
            iframe: Some("  ".to_string()),
            details: Some("<b>Bring a laptop</b>".to_string()),
            ..EventDetail::default()
        };
        assert_eq!(detail.heading(), "Event Registration");
        assert!(detail.registration_form().is_none());
        assert_eq!(detail.details_markup(), Some("<b>Bring a laptop</b>"));
    }
}
