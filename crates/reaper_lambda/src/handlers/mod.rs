//! Lambda entry-point handlers.
//!
//! Handlers are synchronous over the collaborator traits in
//! [crate::adapters]; the binaries wire in AWS-backed implementations and the
//! tests wire in recording fakes.

pub mod enforce;
pub mod scan;

use reaper_core::contract::LifecycleRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Response envelope shared by both entry points, shaped so the same handler
/// serves direct invocations, scheduled events, and API Gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

/// Normalizes the accepted event shapes into one request object: a bare
/// object (direct or scheduled invocation), or an API Gateway envelope whose
/// `body` is JSON text or an already-parsed object. A null payload selects
/// sweep mode.
fn normalize_lambda_event(event: Value) -> Result<Value, String> {
    let object = match event {
        Value::Null => return Ok(json!({})),
        Value::Object(object) => object,
        _ => return Err("Request payload must be a JSON object".to_string()),
    };

    let Some(body) = object.get("body") else {
        return Ok(Value::Object(object));
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

fn parse_lifecycle_request(event: Value) -> Result<LifecycleRequest, String> {
    let payload = normalize_lambda_event(event)?;
    serde_json::from_value(payload).map_err(|error| format!("Malformed request: {error}"))
}

fn validation_error_response(message: &str) -> ApiGatewayResponse {
    error_response(
        400,
        json!({
            "error": "validation_error",
            "message": message,
        }),
    )
}

fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: serde_json::to_string(&payload).expect("response payload should serialize"),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: payload.to_string(),
    }
}
