use crate::adapters::{JsonFileStore, WebPushSender};
use crate::config::AppConfig;
use crate::types::push::NotificationMessage;

use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: JsonFileStore,
    pub sender: Option<WebPushSender>,
    pub latest: Arc<Mutex<LatestNotification>>,
}

#[derive(Clone)]
pub struct LatestNotification {
    pub message: NotificationMessage,
    pub updated_at: Option<OffsetDateTime>,
}
