use std::path::PathBuf;

use crate::types::push::{NotificationMessage, VapidConfig};

#[derive(Clone)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub app_name: String,
    pub vapid: Option<VapidConfig>,
    pub default_notification: NotificationMessage,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        Self {
            store_path: std::env::temp_dir().join(format!("lectern-subscriptions-{nanos}.json")),
            app_name: "Lectern".to_string(),
            vapid: None,
            default_notification: NotificationMessage {
                title: "New lecture available".to_string(),
                body: "Fresh content was just published.".to_string(),
                icon: "/favicon.png".to_string(),
                url: "/".to_string(),
            },
        }
    }
}
