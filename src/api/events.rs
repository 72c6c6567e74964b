//! Event ingestion endpoint
//!
//! `POST /v1/events` accepts a single event object or an array of them. A
//! single event that cannot be processed fails the request; in a batch each
//! event succeeds or fails on its own and failures are reported by index.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::api::AppState;
use crate::error::{error_type, Error, Result};
use crate::models::Event;

/// Outcome of an ingestion request
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub processed: usize,
    pub failed: usize,
    /// Events as delivered to the tracking sinks
    pub events: Vec<Event>,
    pub errors: Vec<IngestError>,
}

/// One rejected event of a batch
#[derive(Debug, Serialize)]
pub struct IngestError {
    pub index: usize,
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub message: String,
}

pub async fn ingest_events(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    match body {
        Value::Array(items) => ingest_batch(&state, items),
        single => {
            let event = Event::try_from(single)?;
            let event = state.emitter.emit(event)?;
            Ok((
                StatusCode::OK,
                Json(IngestResponse {
                    processed: 1,
                    failed: 0,
                    events: vec![event],
                    errors: Vec::new(),
                }),
            ))
        },
    }
}

fn ingest_batch(state: &AppState, items: Vec<Value>) -> Result<(StatusCode, Json<IngestResponse>)> {
    let max_batch_size = state.config.processing.max_batch_size;
    if items.len() > max_batch_size {
        return Err(Error::validation(format!(
            "Batch of {} events exceeds the limit of {}",
            items.len(),
            max_batch_size
        )));
    }

    let mut events = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let result = Event::try_from(item)
            .map_err(Error::from)
            .and_then(|event| state.emitter.emit(event));
        match result {
            Ok(event) => events.push(event),
            Err(err) => errors.push(IngestError {
                index,
                error_type: error_type(&err),
                message: err.to_string(),
            }),
        }
    }

    tracing::info!(
        processed = events.len(),
        failed = errors.len(),
        "Batch ingested"
    );

    Ok((
        StatusCode::OK,
        Json(IngestResponse {
            processed: events.len(),
            failed: errors.len(),
            events,
            errors,
        }),
    ))
}
