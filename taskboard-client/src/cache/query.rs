/// Query keys, states and subscriptions

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;

use super::QueryCache;
use crate::error::{ClientError, ClientResult};

/// Type-erased cached value
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// Identity of a cached read: endpoint name plus serialized arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: &'static str,
    args: String,
}

impl QueryKey {
    pub fn new(endpoint: &'static str, args: impl ToString) -> Self {
        QueryKey {
            endpoint,
            args: args.to_string(),
        }
    }

    /// Key for an endpoint without arguments
    pub fn bare(endpoint: &'static str) -> Self {
        QueryKey {
            endpoint,
            args: String::new(),
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(self.endpoint)
        } else {
            write!(f, "{}({})", self.endpoint, self.args)
        }
    }
}

/// Observable state of a query
#[derive(Debug)]
pub enum QueryState<T: ?Sized> {
    /// No data yet, first fetch in progress
    Loading,
    /// Last successful response
    Ready(Arc<T>),
    /// Last fetch failed
    Failed(ClientError),
}

impl<T: ?Sized> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::Ready(data) => QueryState::Ready(Arc::clone(data)),
            QueryState::Failed(err) => QueryState::Failed(err.clone()),
        }
    }
}

impl<T: ?Sized> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }
}

/// Live view on one cached query
///
/// While at least one subscription is alive, invalidating a tag the query
/// provides triggers a background refetch and the new state is pushed here.
/// Dropping the subscription releases the entry.
pub struct Subscription<T> {
    key: QueryKey,
    rx: watch::Receiver<QueryState<dyn Any + Send + Sync>>,
    cache: QueryCache,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(
        key: QueryKey,
        rx: watch::Receiver<QueryState<dyn Any + Send + Sync>>,
        cache: QueryCache,
    ) -> Self {
        Subscription {
            key,
            rx,
            cache,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state without waiting
    pub fn current(&self) -> QueryState<T> {
        let state = self.rx.borrow().clone();
        downcast_state(state)
    }

    /// Waits for the next state change and returns it
    pub async fn next_update(&mut self) -> QueryState<T> {
        if self.rx.changed().await.is_err() {
            return QueryState::Failed(ClientError::InvalidRequest(format!(
                "Query {} was evicted",
                self.key
            )));
        }
        let state = self.rx.borrow_and_update().clone();
        downcast_state(state)
    }

    /// Waits until the query has data or has failed
    pub async fn ready(&mut self) -> ClientResult<Arc<T>> {
        loop {
            let state = {
                let state = self.rx.borrow_and_update().clone();
                downcast_state::<T>(state)
            };
            match state {
                QueryState::Ready(data) => return Ok(data),
                QueryState::Failed(err) => return Err(err),
                QueryState::Loading => {}
            }
            if self.rx.changed().await.is_err() {
                return Err(ClientError::InvalidRequest(format!(
                    "Query {} was evicted",
                    self.key
                )));
            }
        }
    }

    /// Forces a refetch regardless of freshness
    pub fn refetch(&self) {
        self.cache.refetch(&self.key);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(data: Erased) -> ClientResult<Arc<T>> {
    data.downcast::<T>().map_err(|_| {
        ClientError::InvalidRequest(format!(
            "Cached value is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

fn downcast_state<T: Send + Sync + 'static>(
    state: QueryState<dyn Any + Send + Sync>,
) -> QueryState<T> {
    match state {
        QueryState::Loading => QueryState::Loading,
        QueryState::Ready(data) => match downcast::<T>(data) {
            Ok(data) => QueryState::Ready(data),
            Err(err) => QueryState::Failed(err),
        },
        QueryState::Failed(err) => QueryState::Failed(err),
    }
}
