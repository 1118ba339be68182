use crate::types::push::{DeliveryError, NotificationMessage, Subscription};

pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), DeliveryError>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        message: &'a NotificationMessage,
    ) -> Self::Fut<'a>;
}
