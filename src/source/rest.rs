use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{DataSource, Lookup, SourceError};
use crate::models::{Event, EventDetail, SettingsRow, DETAIL_COLUMNS};

const EVENTS_TABLE: &str = "events";
const SETTINGS_TABLE: &str = "club_settings";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
// Raised by single-object mode when the result has zero or several rows.
const NOT_SINGULAR_CODE: &str = "PGRST116";

/// Hosted PostgREST store (`<project>/rest/v1/<table>`).
pub struct RestSource {
    client: Client,
    rest_root: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct StoreError {
    code: Option<String>,
    message: Option<String>,
}

impl RestSource {
    pub fn new(
        project_url: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, SourceError> {
        let base = project_url.trim().trim_end_matches('/');
        let rest_root = Url::parse(&format!("{base}/rest/v1/"))
            .map_err(|err| SourceError::Http(format!("invalid project url {base}: {err}")))?;

        let mut builder = Client::builder().user_agent("club-site/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| SourceError::Http(err.to_string()))?;

        Ok(Self {
            client,
            rest_root,
            api_key: api_key.trim().to_string(),
        })
    }

    fn table_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url, SourceError> {
        let mut url = self
            .rest_root
            .join(table)
            .map_err(|err| SourceError::Http(err.to_string()))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn fetch(&self, url: Url, single: bool) -> Result<(StatusCode, String), SourceError> {
        let mut request = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if single {
            request = request.header(header::ACCEPT, SINGLE_OBJECT);
        }

        let response = request
            .send()
            .await
            .map_err(|err| SourceError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SourceError::Http(err.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl DataSource for RestSource {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn list_events(&self) -> Result<Vec<Event>, SourceError> {
        let url = self.table_url(EVENTS_TABLE, &[("select", "*"), ("order", "date.asc")])?;
        let (status, body) = self.fetch(url, false).await?;
        decode_events(status, &body)
    }

    async fn club_settings(&self) -> Result<Lookup<SettingsRow>, SourceError> {
        let url = self.table_url(SETTINGS_TABLE, &[("select", "*")])?;
        let (status, body) = self.fetch(url, true).await?;
        decode_single(status, &body)
    }

    async fn event_by_id(&self, id: &str) -> Result<Lookup<EventDetail>, SourceError> {
        let filter = format!("eq.{id}");
        let url = self.table_url(
            EVENTS_TABLE,
            &[("select", DETAIL_COLUMNS), ("id", filter.as_str())],
        )?;
        let (status, body) = self.fetch(url, true).await?;
        decode_single(status, &body)
    }
}

fn decode_rows<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Vec<T>, SourceError> {
    if !status.is_success() {
        return Err(api_error(status, body));
    }
    // An empty table can come back as `null` from some proxies.
    let rows: Option<Vec<T>> =
        serde_json::from_str(body).map_err(|err| SourceError::Decode(err.to_string()))?;
    Ok(rows.unwrap_or_default())
}

/// Rows that do not fit [`Event`] (an unknown status, say) are dropped with a
/// warning; one bad row does not take the listing down.
fn decode_events(status: StatusCode, body: &str) -> Result<Vec<Event>, SourceError> {
    let rows: Vec<serde_json::Value> = decode_rows(status, body)?;
    let total = rows.len();
    let events: Vec<Event> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id").map(|id| id.to_string()).unwrap_or_default();
            serde_json::from_value(row)
                .map_err(|err| tracing::warn!(event_id = %id, error = %err, "skipping event row"))
                .ok()
        })
        .collect();
    if events.len() < total {
        tracing::warn!(kept = events.len(), total, "some event rows were skipped");
    }
    Ok(events)
}

fn decode_single<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<Lookup<T>, SourceError> {
    if status.is_success() {
        return serde_json::from_str(body)
            .map(Lookup::Found)
            .map_err(|err| SourceError::Decode(err.to_string()));
    }
    match serde_json::from_str::<StoreError>(body) {
        Ok(StoreError { code: Some(code), .. }) if code == NOT_SINGULAR_CODE => Ok(Lookup::Absent),
        _ => Err(api_error(status, body)),
    }
}

fn api_error(status: StatusCode, body: &str) -> SourceError {
    let message = serde_json::from_str::<StoreError>(body)
        .ok()
        .and_then(|err| err.message)
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("request failed with status {status}")
            } else {
                body.trim().to_string()
            }
        });
    SourceError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ROWS: &str = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;

    const SETTINGS_ROW: &str = r#"{
        "id": 1,
        "join_form_link": "https://forms.example.com/join",
        "contact_email": "csi@example.edu",
        "phone_number": "+1 555 0100",
        "social_media_facebook": null,
        "social_media_instagram": "https://instagram.com/csi",
        "social_media_linkedin": "https://linkedin.com/company/csi"
    }"#;

    const EVENT_ROWS: &str = r#"[
        {"id":"a","title":"Hack Night","description":"","date":"2025-01-01","venue":"Hall A","form_link":null,"status":"upcoming","image":""},
        {"id":"b","title":"Retro","description":"","date":"2025-03-01","venue":"Hall B","form_link":null,"status":"past","image":""}
    ]"#;

    #[test]
    fn single_object_miss_is_absent() {
        let result: Lookup<SettingsRow> =
            decode_single(StatusCode::NOT_ACCEPTABLE, NO_ROWS).expect("absent");
        assert_eq!(result, Lookup::Absent);
    }

    #[test]
    fn single_object_hit_decodes_row() {
        let result: Lookup<SettingsRow> =
            decode_single(StatusCode::OK, SETTINGS_ROW).expect("found");
        let row = result.into_option().expect("row");
        assert_eq!(row.contact_email.as_deref(), Some("csi@example.edu"));
        assert!(row.social_media_facebook.is_none());
    }

    #[test]
    fn other_store_errors_surface_message() {
        let body = r#"{"code":"42P01","details":null,"hint":null,"message":"relation \"public.club_settings\" does not exist"}"#;
        let err = decode_single::<SettingsRow>(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "relation \"public.club_settings\" does not exist"
        );
        match err {
            SourceError::Api { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_json_failures_keep_raw_body() {
        let err = decode_rows::<Event>(StatusCode::BAD_GATEWAY, "upstream timed out").unwrap_err();
        assert_eq!(err.to_string(), "upstream timed out");

        let err = decode_rows::<Event>(StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn decodes_event_listing() {
        let events: Vec<Event> = decode_rows(StatusCode::OK, EVENT_ROWS).expect("rows");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].id, "b");

        let empty: Vec<Event> = decode_rows(StatusCode::OK, "null").expect("null body");
        assert!(empty.is_empty());
    }

    #[test]
    fn null_columns_do_not_fail_listing() {
        let body = r#"[
            {"id":"a","title":"Hack Night","description":null,"date":null,"venue":"Hall A","form_link":null,"status":"upcoming","image":null},
            {"id":"b","title":"Retro","description":"","date":"2025-03-01","venue":null,"form_link":null,"status":"upcoming","image":""}
        ]"#;
        let events = decode_events(StatusCode::OK, body).expect("listing with nulls");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].description, "");
        assert_eq!(events[0].image, "");

        let sorted = crate::views::sort_by_date(&events);
        let ids: Vec<&str> = sorted.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn unknown_status_row_is_skipped() {
        let body = r#"[
            {"id":"a","title":"Hack Night","date":"2025-01-01","status":"cancelled"},
            {"id":"b","title":"Retro","date":"2025-03-01","status":"past"}
        ]"#;
        let events = decode_events(StatusCode::OK, body).expect("listing");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "b");
    }

    #[test]
    fn malformed_listing_is_decode_error() {
        let err = decode_rows::<Event>(StatusCode::OK, "{\"oops\":").unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn builds_table_urls_under_rest_root() {
        let source =
            RestSource::new("https://abc.supabase.co/", "anon", None).expect("rest source");
        let url = source
            .table_url(EVENTS_TABLE, &[("select", DETAIL_COLUMNS), ("id", "eq.42")])
            .expect("url");
        assert_eq!(url.path(), "/rest/v1/events");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("id".to_string(), "eq.42".to_string())));
    }
}
