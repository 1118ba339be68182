use crate::types::push::Subscription;

pub trait SubscriptionStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type ListFut<'a>: Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type UpsertFut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;
    type DeleteFut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn list<'a>(&'a self, endpoint: Option<&'a str>) -> Self::ListFut<'a>;

    fn upsert<'a>(&'a self, subscription: &'a Subscription) -> Self::UpsertFut<'a>;

    fn delete<'a>(&'a self, endpoint: &'a str) -> Self::DeleteFut<'a>;
}
