use crate::ports::SubscriptionStore;
use crate::push as push_service;
use crate::state;
use crate::templates;
use crate::types::push::{NotificationMessage, Subscription};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

fn push_not_configured() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Push notifications are not configured.",
        }),
    )
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let sender = state.sender.as_ref().ok_or_else(push_not_configured)?;

    Ok(Json(PublicKeyResponse {
        public_key: sender.public_key_base64().to_string(),
    }))
}

/// Wire shape of `PushSubscription.toJSON()` as browsers post it back.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionPayload {
    pub(crate) endpoint: String,
    #[allow(unused)] // Browsers include it; we key records by endpoint only.
    #[serde(rename = "expirationTime")]
    pub(crate) expiration_time: Option<f64>,
    #[serde(default)]
    pub(crate) keys: SubscriptionKeys,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubscriptionKeys {
    #[serde(default)]
    pub(crate) p256dh: String,
    #[serde(default)]
    pub(crate) auth: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionUpdateRequest {
    pub(crate) subscription: SubscriptionPayload,
    pub(crate) action: SubscriptionAction,
}

#[derive(Serialize)]
pub(crate) struct SubscriptionUpdateResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn push_subscription_update(
    State(state): State<state::AppState>,
    Json(request): Json<SubscriptionUpdateRequest>,
) -> Result<Json<SubscriptionUpdateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let endpoint = request.subscription.endpoint.trim();
    if endpoint.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "subscription endpoint is required.",
            }),
        ));
    }

    match request.action {
        SubscriptionAction::Subscribe => {
            let p256dh = request.subscription.keys.p256dh.trim();
            let auth = request.subscription.keys.auth.trim();
            if p256dh.is_empty() || auth.is_empty() {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "subscription keys (p256dh, auth) are required.",
                    }),
                ));
            }

            let subscription = Subscription {
                endpoint: endpoint.to_string(),
                p256dh: p256dh.to_string(),
                auth: auth.to_string(),
            };
            state.store.upsert(&subscription).await.map_err(|err| {
                eprintln!("push subscribe error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to save subscription.",
                    }),
                )
            })?;

            Ok(Json(SubscriptionUpdateResponse {
                status: "subscribed",
            }))
        }
        SubscriptionAction::Unsubscribe => {
            state.store.delete(endpoint).await.map_err(|err| {
                eprintln!("push unsubscribe error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to remove subscription.",
                    }),
                )
            })?;

            Ok(Json(SubscriptionUpdateResponse {
                status: "unsubscribed",
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PushSendRequest {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) icon: Option<String>,
    pub(crate) url: Option<String>,
    // When set, only the matching subscription is targeted.
    pub(crate) endpoint: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct PushSendResponse {
    pub(crate) success: bool,
    pub(crate) sent: usize,
    pub(crate) failed: usize,
    pub(crate) total: usize,
    pub(crate) message: NotificationMessage,
}

fn field_or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

pub(crate) async fn push_send(
    State(state): State<state::AppState>,
    Json(request): Json<PushSendRequest>,
) -> Result<Json<PushSendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let sender = state.sender.as_ref().ok_or_else(push_not_configured)?;

    let title = request.title.trim();
    let body = request.body.trim();
    if title.is_empty() || body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "title and body are required.",
            }),
        ));
    }

    let defaults = &state.config.default_notification;
    let message = NotificationMessage {
        title: title.to_string(),
        body: body.to_string(),
        icon: field_or_default(request.icon.as_deref(), &defaults.icon),
        url: field_or_default(request.url.as_deref(), &defaults.url),
    };
    let target_endpoint = request
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty());

    // Recorded before the fan-out: a payload-less push delivered mid-batch
    // makes the worker fetch this, and it must already see this message.
    {
        let mut latest = state.latest.lock().expect("latest notification lock");
        latest.message = message.clone();
        latest.updated_at = Some(OffsetDateTime::now_utc());
    }

    let outcome = push_service::dispatch(&state.store, sender, &message, target_endpoint)
        .await
        .map_err(|err| {
            eprintln!("push dispatch error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load subscriptions.",
                }),
            )
        })?;

    println!(
        "push dispatch: {} sent, {} failed of {}",
        outcome.sent, outcome.failed, outcome.total
    );

    Ok(Json(PushSendResponse {
        success: true,
        sent: outcome.sent,
        failed: outcome.failed,
        total: outcome.total,
        message,
    }))
}

/// Read by service workers after a payload-less push event. Workers are
/// registered under their own scope, so the response allows any origin.
pub(crate) async fn latest_notification(State(state): State<state::AppState>) -> Response {
    let message = state
        .latest
        .lock()
        .expect("latest notification lock")
        .message
        .clone();
    let body = match serde_json::to_string(&message) {
        Ok(body) => body,
        Err(err) => {
            eprintln!("latest notification encode error: {err}");
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body("".into())
                .unwrap();
        }
    };
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .header("access-control-allow-origin", "*")
        .header("cache-control", "no-cache")
        .body(body.into())
        .unwrap()
}

#[derive(Serialize, Deserialize)]
pub(crate) struct PushSubscriptionsDebugResponse {
    pub(crate) server_time: OffsetDateTime,
    pub(crate) total: usize,
    pub(crate) endpoints: Vec<String>,
    pub(crate) last_dispatch_at: Option<OffsetDateTime>,
}

pub(crate) async fn push_subscriptions_debug(
    State(state): State<state::AppState>,
) -> Result<Json<PushSubscriptionsDebugResponse>, (StatusCode, Json<ErrorResponse>)> {
    let subscriptions = state.store.list(None).await.map_err(|err| {
        eprintln!("push debug error: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to load subscriptions.",
            }),
        )
    })?;
    let last_dispatch_at = state
        .latest
        .lock()
        .expect("latest notification lock")
        .updated_at;

    Ok(Json(PushSubscriptionsDebugResponse {
        server_time: OffsetDateTime::now_utc(),
        total: subscriptions.len(),
        endpoints: subscriptions.into_iter().map(|s| s.endpoint).collect(),
        last_dispatch_at,
    }))
}

pub(crate) async fn push_subscribe_page(
    State(state): State<state::AppState>,
) -> templates::SubscribeTemplate {
    templates::SubscribeTemplate {
        app_name: state.config.app_name,
        push_configured: state.sender.is_some(),
    }
}
