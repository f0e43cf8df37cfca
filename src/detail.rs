use thiserror::Error;

use crate::models::EventDetail;
use crate::source::{DataSource, Lookup, SourceError};

#[derive(Debug, Error)]
pub enum DetailError {
    #[error("Event ID not provided.")]
    NotProvided,
    #[error("Event not found.")]
    NotFound,
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Normalizes the identifier supplied by the caller. Blank counts as absent.
pub fn requested_id(raw: Option<&str>) -> Result<&str, DetailError> {
    raw.map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(DetailError::NotProvided)
}

/// Fetches a single event. Without an identifier no query is issued.
///
/// Markup fields come back exactly as stored; rendering them is the caller's
/// trust decision.
pub async fn fetch_detail<S: DataSource + ?Sized>(
    source: &S,
    id: Option<&str>,
) -> Result<EventDetail, DetailError> {
    let id = requested_id(id)?;
    match source.event_by_id(id).await {
        Ok(Lookup::Found(detail)) => Ok(detail),
        Ok(Lookup::Absent) => {
            tracing::info!(source = source.name(), event_id = id, "event not found");
            Err(DetailError::NotFound)
        }
        Err(err) => {
            tracing::error!(source = source.name(), event_id = id, error = %err, "error fetching event details");
            Err(DetailError::Source(err))
        }
    }
}
