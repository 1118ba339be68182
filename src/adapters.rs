use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::ports;
use crate::push::VapidKeys;
use crate::types::push::{DeliveryError, NotificationMessage, Subscription};

/// RFC 8030 TTL: long enough to ride out a short offline window, short
/// enough that stale lecture alerts die at the push service.
const DISPATCH_TTL_SECONDS: u32 = 60;

#[derive(Clone)]
pub struct WebPushSender {
    keys: Arc<VapidKeys>,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(keys: VapidKeys) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            keys: Arc::new(keys),
            client: Arc::new(client),
        })
    }

    pub(crate) fn public_key_base64(&self) -> &str {
        self.keys.public_key_base64()
    }
}

impl ports::PushSender for WebPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        message: &'a NotificationMessage,
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.p256dh.clone(),
                subscription.auth.clone(),
            );
            let payload = serde_json::to_vec(message)
                .map_err(|err| DeliveryError::Retryable(format!("encode payload: {err}")))?;
            let assertion = self
                .keys
                .forge(&subscription.endpoint)
                .map_err(|err| DeliveryError::Retryable(format!("vapid assertion: {err}")))?;

            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)
                .map_err(classify_web_push_error)?;
            builder.set_ttl(DISPATCH_TTL_SECONDS);
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, &payload);
            builder.set_vapid_signature(web_push::VapidSignature {
                auth_t: assertion,
                auth_k: self.keys.public_key_bytes().to_vec(),
            });
            let push_message = builder.build().map_err(classify_web_push_error)?;
            self.client
                .send(push_message)
                .await
                .map_err(classify_web_push_error)
        })
    }
}

fn classify_web_push_error(err: web_push::WebPushError) -> DeliveryError {
    match err {
        web_push::WebPushError::EndpointNotFound | web_push::WebPushError::EndpointNotValid => {
            DeliveryError::Gone
        }
        other => DeliveryError::Retryable(other.to_string()),
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Encoding(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "subscription store I/O error: {err}"),
            StoreError::Encoding(err) => write!(f, "subscription store encoding error: {err}"),
        }
    }
}

/// Subscription store backed by a single JSON file. Every rewrite goes
/// through a fresh temp file and a rename, so the store on disk is always
/// a complete document no matter where a write was interrupted.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let subscriptions = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(StoreError::Encoding)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(Self {
            path,
            subscriptions: Arc::new(Mutex::new(subscriptions)),
        })
    }

    fn persist(&self, subscriptions: &[Subscription]) -> Result<(), StoreError> {
        let contents =
            serde_json::to_string_pretty(subscriptions).map_err(StoreError::Encoding)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }
        replace_file(&self.path, &contents).map_err(StoreError::Io)
    }

    fn list_sync(&self, endpoint: Option<&str>) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.lock().expect("subscriptions lock");
        Ok(match endpoint {
            Some(endpoint) => subscriptions
                .iter()
                .filter(|s| s.endpoint == endpoint)
                .cloned()
                .collect(),
            None => subscriptions.clone(),
        })
    }

    fn upsert_sync(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let mut subscriptions = self.subscriptions.lock().expect("subscriptions lock");
        match subscriptions
            .iter_mut()
            .find(|s| s.endpoint == subscription.endpoint)
        {
            Some(existing) => *existing = subscription.clone(),
            None => subscriptions.push(subscription.clone()),
        }
        self.persist(&subscriptions)
    }

    fn delete_sync(&self, endpoint: &str) -> Result<(), StoreError> {
        let mut subscriptions = self.subscriptions.lock().expect("subscriptions lock");
        let before = subscriptions.len();
        subscriptions.retain(|s| s.endpoint != endpoint);
        if subscriptions.len() == before {
            // Nothing removed, nothing to rewrite.
            return Ok(());
        }
        self.persist(&subscriptions)
    }
}

fn replace_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let directory = path.parent().unwrap_or(Path::new(""));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("subscriptions.json");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for attempt in 0..10u32 {
        let temp_path = directory.join(format!(".{file_name}.tmp-{pid}-{nanos}-{attempt}"));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                file.flush()?;
                std::fs::rename(&temp_path, path)?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to create temp store file",
    ))
}

impl ports::SubscriptionStore for JsonFileStore {
    type Error = StoreError;
    type ListFut<'a>
        = std::future::Ready<Result<Vec<Subscription>, StoreError>>
    where
        Self: 'a;
    type UpsertFut<'a>
        = std::future::Ready<Result<(), StoreError>>
    where
        Self: 'a;
    type DeleteFut<'a>
        = std::future::Ready<Result<(), StoreError>>
    where
        Self: 'a;

    fn list<'a>(&'a self, endpoint: Option<&'a str>) -> Self::ListFut<'a> {
        std::future::ready(self.list_sync(endpoint))
    }

    fn upsert<'a>(&'a self, subscription: &'a Subscription) -> Self::UpsertFut<'a> {
        std::future::ready(self.upsert_sync(subscription))
    }

    fn delete<'a>(&'a self, endpoint: &'a str) -> Self::DeleteFut<'a> {
        std::future::ready(self.delete_sync(endpoint))
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::SubscriptionStore;

    fn create_temp_store(test_name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        path.push(format!("lectern-store-{test_name}-{nanos}"));
        std::fs::create_dir_all(&path).expect("create temp dir");
        path.push("subscriptions.json");
        path
    }

    fn remove_temp_store(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    fn subscription(endpoint: &str, p256dh: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            p256dh: p256dh.to_string(),
            auth: "auth".to_string(),
        }
    }

    #[tokio::test]
    async fn open__should_start_empty_when_file_is_missing() {
        // Given
        let path = create_temp_store("open-missing");

        // When
        let store = JsonFileStore::open(&path).expect("store should open");
        let listed = store.list(None).await.expect("list should succeed");

        // Then
        assert!(listed.is_empty());
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn open__should_reject_corrupted_file() {
        // Given
        let path = create_temp_store("open-corrupted");
        std::fs::write(&path, "not json at all").expect("write corrupted file");

        // When
        let result = JsonFileStore::open(&path);

        // Then
        assert!(matches!(result, Err(StoreError::Encoding(_))));
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn upsert__should_replace_record_with_same_endpoint() {
        // Given
        let path = create_temp_store("upsert-replace");
        let store = JsonFileStore::open(&path).expect("store should open");
        store
            .upsert(&subscription("https://push.example/a", "old-key"))
            .await
            .expect("first upsert should succeed");

        // When: the browser re-subscribed and handed out fresh keys.
        store
            .upsert(&subscription("https://push.example/a", "new-key"))
            .await
            .expect("second upsert should succeed");

        // Then
        let listed = store.list(None).await.expect("list should succeed");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].p256dh, "new-key");
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn list__should_filter_by_endpoint() {
        // Given
        let path = create_temp_store("list-filter");
        let store = JsonFileStore::open(&path).expect("store should open");
        store
            .upsert(&subscription("https://push.example/a", "p256"))
            .await
            .expect("upsert should succeed");
        store
            .upsert(&subscription("https://push.example/b", "p256"))
            .await
            .expect("upsert should succeed");

        // When
        let listed = store
            .list(Some("https://push.example/b"))
            .await
            .expect("list should succeed");

        // Then
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].endpoint, "https://push.example/b");
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn delete__should_remove_record_and_stay_idempotent() {
        // Given
        let path = create_temp_store("delete-idempotent");
        let store = JsonFileStore::open(&path).expect("store should open");
        store
            .upsert(&subscription("https://push.example/a", "p256"))
            .await
            .expect("upsert should succeed");

        // When
        store
            .delete("https://push.example/a")
            .await
            .expect("delete should succeed");
        store
            .delete("https://push.example/a")
            .await
            .expect("repeat delete should succeed");

        // Then
        let listed = store.list(None).await.expect("list should succeed");
        assert!(listed.is_empty());
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn open__should_survive_an_interrupted_rewrite() {
        // Given: a persisted store plus the residue an interrupted rewrite
        // leaves behind, a half-written temp file next to the real one.
        let path = create_temp_store("open-interrupted");
        let store = JsonFileStore::open(&path).expect("store should open");
        store
            .upsert(&subscription("https://push.example/a", "p256"))
            .await
            .expect("upsert should succeed");
        let contents = std::fs::read_to_string(&path).expect("read store file");
        let stale_temp = path.with_file_name(".subscriptions.json.tmp-0-0-0");
        std::fs::write(&stale_temp, &contents[..contents.len() / 2])
            .expect("write stale temp file");

        // When
        let reopened = JsonFileStore::open(&path).expect("store should reopen");
        let listed = reopened.list(None).await.expect("list should succeed");

        // Then
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].endpoint, "https://push.example/a");
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn persist__should_leave_only_the_store_file_behind() {
        // Given
        let path = create_temp_store("persist-clean");
        let store = JsonFileStore::open(&path).expect("store should open");

        // When
        for i in 0..3 {
            store
                .upsert(&subscription(&format!("https://push.example/{i}"), "p256"))
                .await
                .expect("upsert should succeed");
        }

        // Then: no temp files linger and the store is a complete document.
        let parent = path.parent().expect("store parent dir");
        let names: Vec<_> = std::fs::read_dir(parent)
            .expect("read store dir")
            .map(|entry| entry.expect("dir entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("subscriptions.json")]);
        let contents = std::fs::read_to_string(&path).expect("read store file");
        let records: Vec<Subscription> =
            serde_json::from_str(&contents).expect("store file should parse");
        assert_eq!(records.len(), 3);
        remove_temp_store(&path);
    }

    #[tokio::test]
    async fn open__should_load_previously_persisted_subscriptions() {
        // Given
        let path = create_temp_store("reopen");
        {
            let store = JsonFileStore::open(&path).expect("store should open");
            store
                .upsert(&subscription("https://push.example/a", "p256"))
                .await
                .expect("upsert should succeed");
        }

        // When
        let reopened = JsonFileStore::open(&path).expect("store should reopen");
        let listed = reopened.list(None).await.expect("list should succeed");

        // Then
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].endpoint, "https://push.example/a");
        remove_temp_store(&path);
    }

    #[test]
    fn classify_web_push_error__should_mark_missing_endpoints_gone() {
        assert!(matches!(
            classify_web_push_error(web_push::WebPushError::EndpointNotFound),
            DeliveryError::Gone
        ));
        assert!(matches!(
            classify_web_push_error(web_push::WebPushError::EndpointNotValid),
            DeliveryError::Gone
        ));
    }

    #[test]
    fn classify_web_push_error__should_keep_server_errors_retryable() {
        assert!(matches!(
            classify_web_push_error(web_push::WebPushError::ServerError(None)),
            DeliveryError::Retryable(_)
        ));
        assert!(matches!(
            classify_web_push_error(web_push::WebPushError::Unauthorized),
            DeliveryError::Retryable(_)
        ));
    }
}
