//! Invocation endpoint.
//!
//! `POST /v1/invoke` takes the trigger event as the body and answers with
//! the bare JSON result: a slot number or one of the failure literals.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use slotpool::InvocationResult;
use tracing::error;

use crate::api::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/invoke", post(invoke))
}

/// Parse a request body into an event. Non-JSON bodies become a string
/// event, which has no endpoint field and so reads as a malformed event.
pub fn parse_event(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InvocationResult>, ApiError> {
    let event = parse_event(&body);

    match state.finder().handle_event(&event).await {
        Ok(outcome) => Ok(Json(outcome.result())),
        Err(e) => {
            error!(error = %e, "Assignment table failure");
            Err(ApiError::from(e).with_request_id(request_id(&headers)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_event_json() {
        assert_eq!(
            parse_event(br#"{"public_ip":"10.0.0.5"}"#),
            json!({ "public_ip": "10.0.0.5" })
        );
    }

    #[test]
    fn test_parse_event_garbage_becomes_string() {
        assert_eq!(parse_event(b"not json"), json!("not json"));
        assert_eq!(parse_event(b""), json!(""));
    }
}
