use crate::ports::{PushSender, SubscriptionStore};
use crate::types::push::{DeliveryError, NotificationMessage};

pub(crate) mod vapid;

pub use vapid::{VapidCredentials, VapidKeyError, VapidKeys, generate_vapid_credentials};

/// Per-dispatch delivery counts; `sent + failed == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug)]
pub enum DispatchError {
    Store(String),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Store(reason) => write!(f, "subscription store error: {reason}"),
        }
    }
}

/// A failed listing aborts the whole dispatch; individual delivery failures
/// only bump `failed`. Subscriptions the push service reports gone are
/// pruned from the store as a side effect.
pub(crate) async fn dispatch<S, P>(
    store: &S,
    sender: &P,
    message: &NotificationMessage,
    target_endpoint: Option<&str>,
) -> Result<DispatchOutcome, DispatchError>
where
    S: SubscriptionStore,
    P: PushSender,
{
    let subscriptions = store
        .list(target_endpoint)
        .await
        .map_err(|err| DispatchError::Store(err.to_string()))?;

    let mut outcome = DispatchOutcome {
        total: subscriptions.len(),
        ..DispatchOutcome::default()
    };

    for subscription in &subscriptions {
        match sender.send(subscription, message).await {
            Ok(()) => outcome.sent += 1,
            Err(DeliveryError::Gone) => {
                outcome.failed += 1;
                eprintln!(
                    "push delivery: pruning expired subscription {}",
                    subscription.endpoint
                );
                if let Err(err) = store.delete(&subscription.endpoint).await {
                    eprintln!(
                        "push delivery warning: failed to prune {}: {}",
                        subscription.endpoint, err
                    );
                }
            }
            Err(DeliveryError::Retryable(reason)) => {
                outcome.failed += 1;
                eprintln!(
                    "push delivery error: {} ({})",
                    reason, subscription.endpoint
                );
            }
        }
    }

    Ok(outcome)
}
