use crate::error::HttpAppError;
use crate::services::IngestionPipeline;
use crate::state::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use courier_core::models::{IncomingEvent, MediaMessage};
use courier_core::AppError;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Receive a batch of platform events and ingest every eligible media message.
///
/// The delivery is acknowledged with `200 OK` whatever happens to individual messages.
/// Only a body that is not JSON at all is rejected.
#[tracing::instrument(skip(state, body), fields(body_bytes = body.len()))]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        tracing::debug!("Empty webhook body acknowledged");
        return Ok((StatusCode::OK, "OK"));
    }

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        AppError::BadRequest(format!("Webhook body is not valid JSON: {}", e))
    })?;

    let events = IncomingEvent::parse_batch(&payload);
    let received = events.len();

    let messages: Vec<MediaMessage> = events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| match event.media_message() {
            Ok(message) => Some(message),
            Err(reason) => {
                tracing::debug!(event_index = index, reason = %reason, "Event skipped");
                None
            }
        })
        .collect();
    let eligible = messages.len();

    // The batch runs in its own task: a caller hanging up must not cancel ingestion.
    let batch = tokio::spawn(ingest_batch(
        state.pipeline.clone(),
        messages,
        state.ingest_concurrency,
    ));

    let recorded = match batch.await {
        Ok(recorded) => recorded,
        Err(e) => {
            tracing::error!(error = %e, "Webhook batch task failed");
            0
        }
    };

    tracing::info!(
        events = received,
        eligible,
        recorded,
        abandoned = eligible.saturating_sub(recorded),
        "Webhook delivery processed"
    );

    Ok((StatusCode::OK, "OK"))
}

/// Ingest `messages` with at most `concurrency` pipelines running at once.
///
/// Each message gets its own task, so a panic in one pipeline only loses that message.
/// Returns the number of messages that were recorded.
pub async fn ingest_batch(
    pipeline: Arc<IngestionPipeline>,
    messages: Vec<MediaMessage>,
    concurrency: usize,
) -> usize {
    let outcomes: Vec<_> = stream::iter(messages)
        .map(|message| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.ingest(&message).await })
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    outcomes
        .into_iter()
        .filter(|joined| match joined {
            Ok(outcome) => outcome.is_recorded(),
            Err(e) => {
                tracing::error!(error = %e, "Ingestion task failed");
                false
            }
        })
        .count()
}
