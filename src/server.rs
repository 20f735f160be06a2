use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::message::{WireMessage, WireToolCall};
use crate::relay::ProviderClient;
use crate::scenario;

/// Router state. The provider client is built once at startup and
/// shared; handlers never construct their own.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ProviderClient>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "scenarioId")]
    pub scenario_id: String,
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: AssistantMessage,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{port}");
    info!("relay server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// The chat relay: scenario lookup happens before any provider work, so
/// an unknown id can never cost an upstream call.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let scenario = scenario::get(&request.scenario_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Scenario not found"))?;

    let reply = state
        .relay
        .complete(scenario.system_prompt, &request.messages)
        .await
        .map_err(|e| {
            error!(scenario = %request.scenario_id, "chat relay failed: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;

    let tool_calls = if reply.tool_calls.is_empty() {
        None
    } else {
        Some(reply.tool_calls.iter().map(WireToolCall::from).collect())
    };

    Ok(Json(ChatResponse {
        message: AssistantMessage {
            role: "assistant",
            content: reply.content,
            tool_calls,
        },
        finished: reply.finished,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    /// A relay pointed at a closed local port: any attempt to reach the
    /// provider fails fast instead of leaving the test hanging.
    fn unreachable_state() -> AppState {
        AppState {
            relay: Arc::new(ProviderClient::new(
                "http://127.0.0.1:1/v1",
                "test-key",
                "test-model",
            )),
        }
    }

    fn chat_request(scenario_id: &str) -> Request<Body> {
        let body = serde_json::json!({
            "scenarioId": scenario_id,
            "messages": [{ "role": "user", "content": "hello" }]
        });
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_scenario_is_404_without_provider_call() {
        let app = router(unreachable_state());
        let response = app.oneshot(chat_request("no-such-scenario")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Scenario not found");
    }

    #[tokio::test]
    async fn provider_failure_is_generic_500() {
        let app = router(unreachable_state());
        let response = app.oneshot(chat_request("decision-making")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = router(unreachable_state());
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
