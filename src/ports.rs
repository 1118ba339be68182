pub mod push;
pub mod store;

pub use push::PushSender;
pub use store::SubscriptionStore;
