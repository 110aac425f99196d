//! Live (observable) query results.
//!
//! # Responsibility
//! - Re-evaluate a read query after every committed store write and publish
//!   the new result to all subscribers.
//! - Keep the evaluation alive for a grace period after the last subscriber
//!   leaves, so brief observer churn does not restart it.
//!
//! # Invariants
//! - At most one driver task runs per `LiveQuery`.
//! - Subscribers only observe a new value when the result actually changed
//!   or a refresh failed.
//! - A torn-down query restarts with a fresh evaluation on the next
//!   `subscribe`.

use crate::db::Store;
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, error};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Value published to subscribers: the latest result, or the error of the
/// latest failed refresh.
pub type LiveValue<T> = Result<T, Arc<RepoError>>;

type QueryFn<T> = dyn Fn(&Connection) -> RepoResult<T> + Send + Sync;

/// Shared, re-evaluating read result.
///
/// Cloning is cheap; all clones share one evaluation and one driver.
pub struct LiveQuery<T> {
    inner: Arc<LiveInner<T>>,
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct LiveInner<T> {
    label: &'static str,
    store: Store,
    query: Box<QueryFn<T>>,
    keep_alive: Duration,
    tx: watch::Sender<LiveValue<T>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<T> LiveQuery<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Evaluates `query` once and wraps it as a live result.
    ///
    /// Storage errors from the first evaluation are returned directly.
    pub(crate) fn new<F>(store: &Store, label: &'static str, query: F) -> RepoResult<Self>
    where
        F: Fn(&Connection) -> RepoResult<T> + Send + Sync + 'static,
    {
        let initial = store.read(|conn| query(conn))?;
        let (tx, _) = watch::channel(Ok(initial));
        Ok(Self {
            inner: Arc::new(LiveInner {
                label,
                store: store.clone(),
                query: Box::new(query),
                keep_alive: store.config().live_keep_alive(),
                tx,
                driver: Mutex::new(None),
            }),
        })
    }

    /// Latest value.
    ///
    /// While no driver is running the query is re-evaluated on the calling
    /// thread first, so an unobserved query never serves stale data.
    pub fn current(&self) -> LiveValue<T> {
        if !self.is_active() {
            let result = self.inner.store.read(|conn| (self.inner.query)(conn));
            publish(&self.inner, result);
        }
        self.inner.tx.borrow().clone()
    }

    /// Latest value, assuming the last refresh succeeded.
    ///
    /// Convenience for one-shot reads; refresh failures surface as the
    /// shared error's message.
    pub fn snapshot(&self) -> RepoResult<T> {
        self.current()
            .map_err(|err| RepoError::InvalidData(format!("live refresh failed: {err}")))
    }

    /// Starts observing. Requires a Tokio runtime.
    pub fn subscribe(&self) -> RepoResult<Subscription<T>> {
        let handle = Handle::try_current().map_err(|_| RepoError::NoRuntime)?;
        let mut driver = self.inner.driver.lock();
        let rx = self.inner.tx.subscribe();
        if driver.is_none() {
            debug!(
                "event=live_query_start module=live status=ok query={}",
                self.inner.label
            );
            *driver = Some(handle.spawn(drive(Arc::clone(&self.inner))));
        }
        Ok(Subscription { rx })
    }

    /// Whether a driver task is currently keeping this query fresh.
    pub fn is_active(&self) -> bool {
        self.inner.driver.lock().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

/// One consumer's view of a `LiveQuery`. Dropping it unsubscribes.
pub struct Subscription<T> {
    rx: watch::Receiver<LiveValue<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Latest value without waiting.
    pub fn current(&self) -> LiveValue<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next published value.
    ///
    /// Returns `None` once the query can no longer publish.
    pub async fn next(&mut self) -> Option<LiveValue<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

async fn drive<T>(inner: Arc<LiveInner<T>>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let mut changes = inner.store.changes();
    // Data may have moved while no driver was running.
    refresh(&inner).await;

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                refresh(&inner).await;
            }
            () = inner.tx.closed() => {
                tokio::time::sleep(inner.keep_alive).await;
                let mut driver = inner.driver.lock();
                if inner.tx.receiver_count() == 0 {
                    *driver = None;
                    debug!(
                        "event=live_query_stop module=live status=ok query={} reason=idle",
                        inner.label
                    );
                    return;
                }
            }
        }
    }

    *inner.driver.lock() = None;
}

async fn refresh<T>(inner: &Arc<LiveInner<T>>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let worker = Arc::clone(inner);
    let result = tokio::task::spawn_blocking(move || worker.store.read(|conn| (worker.query)(conn)))
        .await
        .unwrap_or_else(|join_err| {
            Err(RepoError::InvalidData(format!(
                "live query worker failed: {join_err}"
            )))
        });

    publish(inner, result);
}

fn publish<T>(inner: &LiveInner<T>, result: RepoResult<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    match result {
        Ok(value) => {
            inner.tx.send_if_modified(|current| {
                if matches!(current, Ok(existing) if *existing == value) {
                    return false;
                }
                *current = Ok(value);
                true
            });
        }
        Err(err) => {
            error!(
                "event=live_query_refresh module=live status=error query={} error={}",
                inner.label, err
            );
            let err = Arc::new(err);
            inner.tx.send_modify(|current| *current = Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LiveQuery;
    use crate::db::Store;
    use crate::repo::error::{RepoError, RepoResult};

    fn author_count(store: &Store) -> LiveQuery<i64> {
        LiveQuery::new(store, "author_count", |conn| -> RepoResult<i64> {
            Ok(conn.query_row("SELECT COUNT(*) FROM authors;", [], |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn subscribe_outside_runtime_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let live = author_count(&store);
        assert!(matches!(live.subscribe(), Err(RepoError::NoRuntime)));
        assert!(!live.is_active());
    }

    #[test]
    fn unobserved_query_re_evaluates_on_read() {
        let store = Store::open_in_memory().unwrap();
        let live = author_count(&store);
        assert_eq!(live.current().unwrap(), 0);

        store
            .write(|tx| {
                tx.execute(
                    "INSERT INTO authors (id, name) VALUES ('a-1', 'Ursula');",
                    [],
                )
            })
            .unwrap();
        assert_eq!(live.current().unwrap(), 1);
    }

    #[test]
    fn failed_refresh_replaces_value_until_next_success() {
        let store = Store::open_in_memory().unwrap();
        let live = LiveQuery::new(&store, "author_guard", |conn| -> RepoResult<i64> {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM authors;", [], |row| row.get(0))?;
            if count > 0 {
                return Err(RepoError::InvalidData("unexpected author".to_string()));
            }
            Ok(count)
        })
        .unwrap();

        store
            .write(|tx| {
                tx.execute(
                    "INSERT INTO authors (id, name) VALUES ('a-1', 'Ursula');",
                    [],
                )
            })
            .unwrap();
        let err = live.current().unwrap_err();
        assert!(matches!(*err, RepoError::InvalidData(_)));
        assert!(live.snapshot().is_err());

        store
            .write(|tx| tx.execute("DELETE FROM authors;", []))
            .unwrap();
        assert_eq!(live.current().unwrap(), 0);
    }
}
