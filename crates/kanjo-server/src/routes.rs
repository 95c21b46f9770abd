//! HTTP routes and handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kanjo_core::SentimentLabel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict));

    if state.metrics_handle.is_some() {
        router = router.route("/metrics", get(metrics));
    }

    // Browser front ends call the API directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness probe; never touches the model
pub async fn health() -> impl IntoResponse {
    metrics::counter!("kanjo_requests_total", "endpoint" => "health").increment(1);
    Json(json!({ "status": "ok" }))
}

/// Successful prediction
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    /// Input text with surrounding whitespace removed
    pub text: String,
    pub label: SentimentLabel,
}

/// Classify `{"text": ...}` as positive or negative.
///
/// The body is parsed leniently: anything that is not a JSON object counts
/// as an empty object and ends up as a missing-text `400`.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    metrics::counter!("kanjo_requests_total", "endpoint" => "predict").increment(1);

    let payload = parse_lenient(&body);
    let text = extract_text(&payload);

    if text.is_empty() {
        info!("Rejected prediction request without text");
        return Err(AppError::MissingText);
    }

    let label = classify(&state, &text).await.map_err(|e| {
        error!(error = ?e, "Error while classifying sentiment: {}", e);
        AppError::Model(e)
    })?;

    Ok(Json(PredictResponse { text, label }))
}

/// Run the model on `text` and collapse its top label
async fn classify(state: &AppState, text: &str) -> kanjo_core::Result<SentimentLabel> {
    let classifier = state.accessor.get().await?;

    let start = Instant::now();
    let results = classifier.classify(text).await?;
    metrics::histogram!("kanjo_inference_latency_us").record(start.elapsed().as_micros() as f64);

    let top = results
        .first()
        .ok_or_else(|| kanjo_core::Error::inference("classifier returned no results"))?;
    debug!("Raw model output: label={:?} score={}", top.label, top.score);

    if !SentimentLabel::is_recognized(&top.label) {
        // Still negative; surfaced so new model labels do not go unnoticed
        warn!("Unrecognized model label {:?}, treating as negative", top.label);
        metrics::counter!("kanjo_unrecognized_labels_total").increment(1);
    }

    let label = SentimentLabel::normalize(&top.label);
    metrics::counter!("kanjo_predictions_total", "label" => label.as_str()).increment(1);
    Ok(label)
}

fn parse_lenient(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!("Ignoring unparsable request body: {}", e);
        Value::Object(Default::default())
    })
}

/// Coerce the `text` field to a trimmed string.
///
/// Missing, `null`, `false`, `0` and empty strings, arrays or objects all
/// become empty. Other non-string values use their compact JSON rendering,
/// so `true` becomes `"true"` and `["a"]` becomes `"[\"a\"]"`.
fn extract_text(payload: &Value) -> String {
    let text = match payload.get("text") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(Value::Array(items)) if items.is_empty() => String::new(),
        Some(Value::Object(fields)) if fields.is_empty() => String::new(),
        Some(other) => other.to_string(),
    };

    text.trim().to_string()
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => AppError::NotFound.into_response(),
    }
}

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Error handling
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("text is required")]
    MissingText,

    /// Any failure loading or running the model. Details stay in the logs.
    #[error("internal model error")]
    Model(#[source] kanjo_core::Error),

    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingText => StatusCode::BAD_REQUEST,
            AppError::Model(e) => {
                metrics::counter!("kanjo_errors_total", "kind" => e.kind()).increment(1);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_trims_outer_whitespace_only() {
        let payload = json!({ "text": "  今日は  いい天気\n" });
        assert_eq!(extract_text(&payload), "今日は  いい天気");
    }

    #[test]
    fn test_extract_text_trims_ideographic_space() {
        let payload = json!({ "text": "\u{3000}最高\u{3000}" });
        assert_eq!(extract_text(&payload), "最高");
    }

    #[test]
    fn test_extract_text_falsy_values_are_empty() {
        for payload in [
            json!({}),
            json!({ "text": null }),
            json!({ "text": false }),
            json!({ "text": 0 }),
            json!({ "text": "" }),
            json!({ "text": "   " }),
            json!({ "text": [] }),
            json!({ "text": {} }),
            json!(["text"]),
            json!("text"),
        ] {
            assert_eq!(extract_text(&payload), "", "payload {payload}");
        }
    }

    #[test]
    fn test_extract_text_coerces_other_values() {
        assert_eq!(extract_text(&json!({ "text": 42 })), "42");
        assert_eq!(extract_text(&json!({ "text": true })), "true");
        assert_eq!(extract_text(&json!({ "text": ["a"] })), "[\"a\"]");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient(b"not json"), json!({}));
        assert_eq!(parse_lenient(b""), json!({}));
        assert_eq!(parse_lenient(br#"{"text":"x"}"#), json!({ "text": "x" }));
    }

    #[test]
    fn test_model_error_does_not_leak_detail() {
        let err = AppError::Model(kanjo_core::Error::inference("CUDA out of memory"));
        assert_eq!(err.to_string(), "internal model error");
    }
}
