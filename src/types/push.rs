use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Field names match what the service worker reads out of push event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub url: String,
}

/// `Gone` means the push service no longer knows the endpoint (404/410) and
/// the subscription should be pruned; `Retryable` failures keep the record.
#[derive(Debug)]
pub enum DeliveryError {
    Gone,
    Retryable(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Gone => f.write_str("subscription is no longer valid"),
            DeliveryError::Retryable(reason) => write!(f, "{reason}"),
        }
    }
}
