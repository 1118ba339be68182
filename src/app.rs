use crate::adapters::{JsonFileStore, WebPushSender};
use crate::assets;
use crate::config;
use crate::push as push_service;
use crate::state;

use axum::Router;
use axum::routing::get;
use axum::routing::post;

mod push;

pub fn app(config: config::AppConfig) -> Router {
    let store = JsonFileStore::open(&config.store_path)
        .unwrap_or_else(|err| panic!("failed to open subscription store: {err}"));
    let sender = config.vapid.as_ref().map(|vapid| {
        let keys = push_service::VapidKeys::from_config(vapid)
            .unwrap_or_else(|err| panic!("invalid VAPID configuration: {err}"));
        WebPushSender::new(keys)
            .unwrap_or_else(|err| panic!("failed to initialize web-push client: {err}"))
    });
    if sender.is_none() {
        eprintln!("push notifications disabled: no VAPID configuration");
    }
    let latest = std::sync::Arc::new(std::sync::Mutex::new(state::LatestNotification {
        message: config.default_notification.clone(),
        updated_at: None,
    }));
    let state = state::AppState {
        config,
        store,
        sender,
        latest,
    };
    Router::new()
        .route("/push/subscribe", get(push::push_subscribe_page))
        .route("/push/sw.js", get(assets::service_worker))
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/push/subscribe", post(push::push_subscription_update))
        .route("/api/push/send", post(push::push_send))
        .route("/api/latest-notification", get(push::latest_notification))
        .route(
            "/api/debug/push/subscriptions",
            get(push::push_subscriptions_debug),
        )
        .route("/static/push.js", get(assets::push_client_script))
        .route("/static/style.css", get(assets::stylesheet))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
