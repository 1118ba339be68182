use crate::state::AppState;
use crate::templates;

use askama::Template as _;
use axum::extract::State;

pub(crate) async fn stylesheet() -> axum::response::Response {
    const CSS_CONTENT: &str = include_str!("../static/style.css");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "text/css")
        .header("cache-control", "public, max-age=3600")
        .body(CSS_CONTENT.into())
        .unwrap()
}

pub(crate) async fn push_client_script() -> axum::response::Response {
    const PUSH_JS_CONTENT: &str = include_str!("../static/push.js");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "public, max-age=3600")
        .body(PUSH_JS_CONTENT.into())
        .unwrap()
}

/// The worker must never be cached: a stale worker keeps handling push
/// events long after the page code moved on.
pub(crate) async fn service_worker(State(state): State<AppState>) -> axum::response::Response {
    let template = templates::ServiceWorkerTemplate {
        app_name: &state.config.app_name,
        fallback_icon: &state.config.default_notification.icon,
    };
    let body = match template.render() {
        Ok(body) => body,
        Err(err) => {
            eprintln!("failed to render service worker: {err}");
            return axum::response::Response::builder()
                .status(500)
                .body("".into())
                .unwrap();
        }
    };
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "no-cache")
        .body(body.into())
        .unwrap()
}
