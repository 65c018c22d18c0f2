//! HTTP surface
//!
//! `POST /sms` is the nucleus: an inbound SMS webhook is validated, the
//! message persisted, a reply generated and sent, and the reply persisted.
//! Collaborator failures are absorbed so the provider never retries an
//! event we already recorded; only a malformed payload (or an enforced bad
//! signature) is rejected.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::leads::resolve_lead;
use crate::notify::notify_agent;
use crate::signature::verify_signature;
use crate::storage::Direction;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sms", post(sms_reply))
        .route("/webhook/health", get(health))
        .route("/chat-history/:phone", get(chat_history))
        .route("/send", post(send_manual))
}

/// Inbound webhook body, JSON or form-encoded, tolerating the field name
/// variants different providers use.
#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(
        default,
        rename = "fromNumber",
        alias = "From",
        alias = "from"
    )]
    from_number: Option<String>,
    #[serde(default, alias = "Body", alias = "body")]
    text: Option<String>,
    #[serde(default, rename = "messageId")]
    message_id: Option<String>,
}

impl WebhookPayload {
    fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body)
            .ok()
            .or_else(|| serde_urlencoded::from_bytes(body).ok())
    }
}

async fn sms_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    match handle_inbound(&state, &headers, &body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "webhook handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
        }
    }
}

async fn handle_inbound(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> anyhow::Result<(StatusCode, Json<Value>)> {
    // 1. Signature check against the raw body.
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let valid = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|signature| verify_signature(secret, body, signature));

        if !valid {
            if state.config.enforce_signature {
                return Ok((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "Invalid signature"})),
                ));
            }
            tracing::warn!("webhook signature invalid or missing, processing anyway");
        }
    }

    // 2. Accept JSON or form-encoded payloads.
    let payload = WebhookPayload::parse(body).unwrap_or_default();
    let (Some(from_number), Some(text)) = (payload.from_number, payload.text) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        ));
    };
    if from_number.is_empty() || text.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        ));
    }

    tracing::info!(from = %from_number, text = %text, "inbound SMS");

    // 3. Persist the inbound message before anything can fail.
    state
        .store
        .append(
            &from_number,
            &text,
            Direction::Incoming,
            payload.message_id.as_deref(),
        )
        .await;

    // 4. Side channel, no effect on the reply flow.
    notify_agent(&from_number, &text);

    // 5. Known lead or a placeholder profile.
    let lead = resolve_lead(&state.config.leads_csv, &from_number);

    // 6. Generate the reply with the inbound text as situational context.
    let tone = format!(
        "{}\n\nThe client just wrote: \"{}\"",
        state.config.tone_sample, text
    );
    let reply = state.writer.generate(&lead, &tone).await;

    // 7–8. Send, and persist the outbound message only on success. A failed
    // send is logged but the provider still gets a success acknowledgment.
    match state.sender.send(&from_number, &reply).await {
        Ok(message_id) => {
            state
                .store
                .append(&from_number, &reply, Direction::Outgoing, Some(&message_id))
                .await;
        }
        Err(e) => {
            tracing::error!(from = %from_number, error = %e, "auto-reply send failed");
        }
    }

    Ok((
        StatusCode::OK,
        Json(json!({"success": true, "message": "Reply processed"})),
    ))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "leadline",
        "mode": state.config.mode(),
    }))
}

async fn chat_history(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Json<Value> {
    // Path segments usually arrive without the leading plus.
    let phone = if phone.starts_with('+') {
        phone
    } else {
        format!("+{phone}")
    };

    let messages = state.store.load(&phone).await;
    Json(json!({
        "phone_number": phone,
        "messages": messages,
    }))
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn send_manual(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> (StatusCode, Json<Value>) {
    let (Some(phone), Some(message)) = (request.phone, request.message) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        );
    };

    match state.sender.send(&phone, &message).await {
        Ok(message_id) => {
            state
                .store
                .append(&phone, &message, Direction::Outgoing, Some(&message_id))
                .await;
            (
                StatusCode::OK,
                Json(json!({"success": true, "message_id": message_id})),
            )
        }
        Err(e) => {
            tracing::error!(phone = %phone, error = %e, "manual send failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}
