/// Tag-based query cache
///
/// Every read goes through [`QueryCache::query`] or [`QueryCache::subscribe`]
/// under a [`QueryKey`]. The response is cached together with the [`Tag`]s it
/// provides. Writes go through [`QueryCache::mutate`]; once the write
/// succeeds, the tags it names are invalidated and every cached query whose
/// tags intersect them is marked stale.
///
/// # Behavior
///
/// - Concurrent reads of one key share a single in-flight request
/// - A fresh cached value is returned without a request
/// - Invalidated queries with live subscribers are refetched in the
///   background; unsubscribed ones drop their data and refetch on next read
/// - Each fetch carries the entry's generation; a response whose generation
///   is no longer current is discarded, so the last issued fetch wins
/// - Entries without subscribers are evicted `keep_unused` after last use
///
/// # Example
///
/// ```no_run
/// use taskboard_client::cache::{QueryCache, QueryKey, Tag};
/// use std::time::Duration;
///
/// # async fn example() -> taskboard_client::error::ClientResult<()> {
/// let cache = QueryCache::new(Duration::from_secs(60));
///
/// let names = cache
///     .query(
///         QueryKey::bare("list_projects"),
///         || async { Ok(vec!["Apollo".to_string()]) },
///         |_| vec![Tag::projects()],
///     )
///     .await?;
///
/// cache
///     .mutate(async { Ok(()) }, |_| vec![Tag::projects()])
///     .await?;
/// # Ok(())
/// # }
/// ```

pub mod query;
pub mod tag;

use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ClientResult;
use query::{downcast, Erased};

pub use query::{QueryKey, QueryState, Subscription};
pub use tag::{task_list_tags, Tag, TagKind};

type FetchFuture = BoxFuture<'static, ClientResult<Erased>>;
type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;
type TagFn = Arc<dyn Fn(&Erased) -> Vec<Tag> + Send + Sync>;
type InFlight = Shared<FetchFuture>;

/// Default lifetime of an entry nobody subscribes to
pub const DEFAULT_KEEP_UNUSED: Duration = Duration::from_secs(60);

struct Entry {
    data: Option<Erased>,
    tags: Vec<Tag>,
    stale: bool,
    generation: u64,
    in_flight: Option<InFlight>,
    subscribers: usize,
    last_used: Instant,
    fetcher: Fetcher,
    tag_fn: TagFn,
    state: watch::Sender<QueryState<dyn Any + Send + Sync>>,
}

impl Entry {
    fn new(fetcher: Fetcher, tag_fn: TagFn) -> Self {
        let (state, _) = watch::channel(QueryState::Loading);
        Entry {
            data: None,
            tags: Vec::new(),
            stale: false,
            generation: 0,
            in_flight: None,
            subscribers: 0,
            last_used: Instant::now(),
            fetcher,
            tag_fn,
            state,
        }
    }

    fn is_fresh(&self) -> bool {
        self.data.is_some() && !self.stale
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    index: HashMap<Tag, HashSet<QueryKey>>,
}

impl Inner {
    fn sweep(&mut self, keep_unused: Duration) {
        let now = Instant::now();
        let expired: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.subscribers == 0
                    && entry.in_flight.is_none()
                    && now.duration_since(entry.last_used) >= keep_unused
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            if let Some(entry) = self.entries.remove(&key) {
                reindex(&mut self.index, &key, &entry.tags, &[]);
                tracing::debug!(query = %key, "Evicted unused query");
            }
        }
    }
}

/// Shared query cache
///
/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
    keep_unused: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_UNUSED)
    }
}

impl QueryCache {
    pub fn new(keep_unused: Duration) -> Self {
        QueryCache {
            inner: Arc::new(Mutex::new(Inner::default())),
            keep_unused,
        }
    }

    /// Reads through the cache
    ///
    /// Returns the cached value when fresh, joins an in-flight fetch of the
    /// same key, or starts a new one. `provides` computes the tags of a
    /// successful response.
    pub async fn query<T, F, Fut, G>(
        &self,
        key: QueryKey,
        fetch: F,
        provides: G,
    ) -> ClientResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
        G: Fn(&T) -> Vec<Tag> + Send + Sync + 'static,
    {
        let pending = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            inner.sweep(self.keep_unused);

            let entry = inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(erase_fetch(fetch), erase_tags(provides)));
            entry.last_used = Instant::now();

            if entry.is_fresh() {
                if let Some(data) = &entry.data {
                    return downcast(Arc::clone(data));
                }
            }

            match &entry.in_flight {
                Some(in_flight) => {
                    tracing::debug!(query = %key, "Joining in-flight request");
                    in_flight.clone()
                }
                None => self.start_fetch(&key, entry),
            }
        };

        downcast(pending.await?)
    }

    /// Subscribes to a query, fetching it if needed
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<T, F, Fut, G>(&self, key: QueryKey, fetch: F, provides: G) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
        G: Fn(&T) -> Vec<Tag> + Send + Sync + 'static,
    {
        let rx = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            inner.sweep(self.keep_unused);

            let entry = inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(erase_fetch(fetch), erase_tags(provides)));
            entry.subscribers += 1;
            entry.last_used = Instant::now();

            if !entry.is_fresh() && entry.in_flight.is_none() {
                self.spawn_fetch(&key, entry);
            }
            entry.state.subscribe()
        };

        Subscription::new(key, rx, self.clone())
    }

    /// Runs a write and, once it succeeded, invalidates the tags it names
    ///
    /// A failed write invalidates nothing.
    pub async fn mutate<T, Fut, G>(&self, request: Fut, invalidates: G) -> ClientResult<T>
    where
        Fut: Future<Output = ClientResult<T>>,
        G: FnOnce(&T) -> Vec<Tag>,
    {
        let response = request.await?;
        let tags = invalidates(&response);
        if !tags.is_empty() {
            self.invalidate(&tags);
        }
        Ok(response)
    }

    /// Marks every query whose tags intersect `tags` as stale
    ///
    /// Returns the affected keys. Subscribed queries are refetched in the
    /// background.
    pub fn invalidate(&self, tags: &[Tag]) -> Vec<QueryKey> {
        let mut guard = self.lock();
        let Inner { entries, index } = &mut *guard;

        let mut matched: BTreeSet<QueryKey> = index
            .iter()
            .filter(|(provided, _)| tags.iter().any(|tag| provided.matches(tag)))
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect();

        // First loads have no tags yet and may carry pre-write data
        matched.extend(
            entries
                .iter()
                .filter(|(_, entry)| entry.data.is_none() && entry.in_flight.is_some())
                .map(|(key, _)| key.clone()),
        );

        let names: Vec<String> = tags.iter().map(Tag::to_string).collect();
        tracing::debug!(tags = ?names, matched = matched.len(), "Invalidating tags");

        for key in &matched {
            let Some(entry) = entries.get_mut(key) else {
                continue;
            };

            entry.generation += 1;
            entry.in_flight = None;
            entry.stale = true;

            if entry.subscribers > 0 {
                tracing::debug!(query = %key, "Refetching invalidated query");
                self.spawn_fetch(key, entry);
            } else {
                entry.data = None;
                let old = std::mem::take(&mut entry.tags);
                reindex(index, key, &old, &[]);
            }
        }

        matched.into_iter().collect()
    }

    /// Cached value of a key, fresh or not
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let guard = self.lock();
        let data = guard.entries.get(key)?.data.clone()?;
        downcast(data).ok()
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn refetch(&self, key: &QueryKey) {
        let mut guard = self.lock();
        if let Some(entry) = guard.entries.get_mut(key) {
            entry.stale = true;
            self.spawn_fetch(key, entry);
        }
    }

    pub(crate) fn release(&self, key: &QueryKey) {
        let mut guard = self.lock();
        if let Some(entry) = guard.entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            entry.last_used = Instant::now();
        }
    }

    /// Starts a fetch that only the spawned task drives
    fn spawn_fetch(&self, key: &QueryKey, entry: &mut Entry) {
        let _in_flight = self.start_fetch(key, entry);
    }

    /// Starts a fetch under a new generation, superseding any in flight
    ///
    /// An entry without data goes back to `Loading` so that no subscriber
    /// reads the previous failure while the retry runs.
    fn start_fetch(&self, key: &QueryKey, entry: &mut Entry) -> InFlight {
        entry.generation += 1;
        let generation = entry.generation;

        if entry.data.is_none() {
            entry.state.send_replace(QueryState::Loading);
        }

        let request = (entry.fetcher)();
        let inner = Arc::downgrade(&self.inner);
        let commit_key = key.clone();

        let fetch: FetchFuture = async move {
            let result = request.await;
            commit(&inner, &commit_key, generation, &result);
            result
        }
        .boxed();

        let shared = fetch.shared();
        entry.in_flight = Some(shared.clone());

        // Drive the fetch even if every caller goes away
        tokio::spawn(shared.clone());

        shared
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("keep_unused", &self.keep_unused)
            .finish()
    }
}

fn commit(inner: &Weak<Mutex<Inner>>, key: &QueryKey, generation: u64, result: &ClientResult<Erased>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
    let Inner { entries, index } = &mut *guard;

    let Some(entry) = entries.get_mut(key) else {
        return;
    };

    if entry.generation != generation {
        tracing::debug!(query = %key, generation, "Discarding superseded response");
        return;
    }

    entry.in_flight = None;

    match result {
        Ok(data) => {
            let tags = (entry.tag_fn)(data);
            reindex(index, key, &entry.tags, &tags);
            entry.tags = tags;
            entry.data = Some(Arc::clone(data));
            entry.stale = false;
            entry.last_used = Instant::now();
            entry.state.send_replace(QueryState::Ready(Arc::clone(data)));
        }
        Err(err) => {
            tracing::debug!(query = %key, error = %err, "Query failed");
            entry.state.send_replace(QueryState::Failed(err.clone()));
        }
    }
}

fn reindex(index: &mut HashMap<Tag, HashSet<QueryKey>>, key: &QueryKey, old: &[Tag], new: &[Tag]) {
    for tag in old {
        if let Some(keys) = index.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(tag);
            }
        }
    }
    for tag in new {
        index.entry(*tag).or_default().insert(key.clone());
    }
}

fn erase_fetch<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ClientResult<T>> + Send + 'static,
{
    Arc::new(move || {
        let request = fetch();
        async move { request.await.map(|value| Arc::new(value) as Erased) }.boxed()
    })
}

fn erase_tags<T, G>(provides: G) -> TagFn
where
    T: Send + Sync + 'static,
    G: Fn(&T) -> Vec<Tag> + Send + Sync + 'static,
{
    Arc::new(move |data: &Erased| {
        data.downcast_ref::<T>()
            .map(|value| provides(value))
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl Fn() -> BoxFuture<'static, ClientResult<Vec<i64>>> + Send + Sync + 'static {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
            async move {
                tokio::time::sleep(delay).await;
                Ok(vec![n])
            }
            .boxed()
        }
    }

    fn task_tags(ids: &Vec<i64>) -> Vec<Tag> {
        task_list_tags(ids.iter().copied().map(|n| n + 100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_queries_share_one_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        let (a, b) = tokio::join!(
            cache.query(
                key.clone(),
                counting_fetch(calls.clone(), Duration::from_millis(20)),
                task_tags
            ),
            cache.query(
                key.clone(),
                counting_fetch(calls.clone(), Duration::from_millis(20)),
                task_tags
            ),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*a.unwrap(), vec![0]);
        assert_eq!(*b.unwrap(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_served_from_cache() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        for _ in 0..3 {
            let value = cache
                .query(key.clone(), counting_fetch(calls.clone(), Duration::ZERO), task_tags)
                .await
                .unwrap();
            assert_eq!(*value, vec![0]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_refetches_on_next_read() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        cache
            .query(key.clone(), counting_fetch(calls.clone(), Duration::ZERO), task_tags)
            .await
            .unwrap();

        let affected = cache.invalidate(&[Tag::tasks()]);
        assert_eq!(affected, vec![key.clone()]);
        assert!(cache.peek::<Vec<i64>>(&key).is_none());

        let value = cache
            .query(key.clone(), counting_fetch(calls.clone(), Duration::ZERO), task_tags)
            .await
            .unwrap();
        assert_eq!(*value, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_receive_refetched_data() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        let mut sub: Subscription<Vec<i64>> =
            cache.subscribe(key.clone(), counting_fetch(calls.clone(), Duration::ZERO), task_tags);
        assert_eq!(*sub.ready().await.unwrap(), vec![0]);

        // Provided tag is Tasks(100)
        cache.invalidate(&[Tag::task(100)]);

        match sub.next_update().await {
            QueryState::Ready(value) => assert_eq!(*value, vec![1]),
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    fn failing_once_fetch(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> BoxFuture<'static, ClientResult<Vec<i64>>> + Send + Sync + 'static {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
            async move {
                if n == 0 {
                    Err(ClientError::Transport("down".to_string()))
                } else {
                    Ok(vec![n])
                }
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_after_failure_waits_for_retry() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        let mut first: Subscription<Vec<i64>> =
            cache.subscribe(key.clone(), failing_once_fetch(calls.clone()), task_tags);
        assert!(first.ready().await.is_err());
        drop(first);

        let mut second: Subscription<Vec<i64>> =
            cache.subscribe(key.clone(), failing_once_fetch(calls.clone()), task_tags);
        assert!(second.current().is_loading());
        assert_eq!(*second.ready().await.unwrap(), vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_failure_waits_for_retry() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        let mut sub: Subscription<Vec<i64>> =
            cache.subscribe(key.clone(), failing_once_fetch(calls.clone()), task_tags);
        assert!(sub.ready().await.is_err());

        sub.refetch();
        assert_eq!(*sub.ready().await.unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_during_first_load_refetches() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        let mut sub: Subscription<Vec<i64>> = cache.subscribe(
            key.clone(),
            counting_fetch(calls.clone(), Duration::from_millis(50)),
            task_tags,
        );

        // The first response has no tags yet
        let affected = cache.invalidate(&[Tag::tasks()]);
        assert_eq!(affected, vec![key.clone()]);

        assert_eq!(*sub.ready().await.unwrap(), vec![1]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*cache.peek::<Vec<i64>>(&key).unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disjoint_tags_are_left_alone() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        let mut sub: Subscription<Vec<i64>> =
            cache.subscribe(key.clone(), counting_fetch(calls.clone(), Duration::ZERO), task_tags);
        sub.ready().await.unwrap();

        assert!(cache.invalidate(&[Tag::task(999)]).is_empty());
        assert!(cache.invalidate(&[Tag::projects()]).is_empty());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*cache.peek::<Vec<i64>>(&key).unwrap(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_is_discarded() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        // First call is slow, second is fast
        let fetch = {
            let calls = calls.clone();
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
                async move {
                    let delay = if n == 0 { 50 } else { 10 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(vec![n])
                }
                .boxed()
            }
        };

        let mut sub: Subscription<Vec<i64>> = cache.subscribe(key.clone(), fetch, task_tags);
        sub.refetch();

        assert_eq!(*sub.ready().await.unwrap(), vec![1]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*cache.peek::<Vec<i64>>(&key).unwrap(), vec![1]);
        assert_eq!(sub.current().data().map(|v| v[0]), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mutation_invalidates_nothing() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("list_tasks", 1);

        cache
            .query(key.clone(), counting_fetch(calls.clone(), Duration::ZERO), task_tags)
            .await
            .unwrap();

        let result: ClientResult<()> = cache
            .mutate(
                async {
                    Err(ClientError::Status {
                        status: 500,
                        message: "boom".to_string(),
                    })
                },
                |_| vec![Tag::tasks()],
            )
            .await;
        assert!(result.is_err());
        assert!(cache.peek::<Vec<i64>>(&key).is_some());

        cache.mutate(async { Ok(()) }, |_| vec![Tag::tasks()]).await.unwrap();
        assert!(cache.peek::<Vec<i64>>(&key).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unused_entries_are_evicted() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .query(
                QueryKey::new("list_tasks", 1),
                counting_fetch(calls.clone(), Duration::ZERO),
                task_tags,
            )
            .await
            .unwrap();

        let sub: Subscription<Vec<i64>> = cache.subscribe(
            QueryKey::new("list_tasks", 2),
            counting_fetch(calls.clone(), Duration::ZERO),
            task_tags,
        );
        assert_eq!(cache.subscriber_count(sub.key()), 1);

        tokio::time::advance(Duration::from_secs(61)).await;

        cache
            .query(
                QueryKey::new("list_tasks", 3),
                counting_fetch(calls.clone(), Duration::ZERO),
                task_tags,
            )
            .await
            .unwrap();

        // Key 1 expired, key 2 is still subscribed
        assert_eq!(cache.len(), 2);
        assert!(cache.peek::<Vec<i64>>(&QueryKey::new("list_tasks", 1)).is_none());

        let key = sub.key().clone();
        drop(sub);
        assert_eq!(cache.subscriber_count(&key), 0);
    }
}
