//! Connection cache with single-flight construction
//!
//! Each connection identity is built at most once. Concurrent requests for an
//! identity that is still being built wait on the same construction and share
//! its outcome. Failed constructions are dropped so a later request retries.

use super::connector::{ConnectionParams, ConnectorClass};
use super::{ConnectionError, ConnectionResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connection identity: name, connector type and ordered parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    name: String,
    type_path: String,
    type_id: TypeId,
    params: Vec<(String, String)>,
}

impl ConnectionKey {
    /// Build the identity for a connection request
    pub fn new(name: &str, class: &ConnectorClass, params: &ConnectionParams) -> Self {
        Self {
            name: name.to_string(),
            type_path: class.type_path().to_string(),
            type_id: class.type_id(),
            params: params
                .iter()
                .map(|(key, value)| (key.clone(), value.to_string()))
                .collect(),
        }
    }

    /// Connection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connector type path
    pub fn type_path(&self) -> &str {
        &self.type_path
    }
}

type Pending<V> = Shared<BoxFuture<'static, ConnectionResult<V>>>;

enum Slot<V> {
    Ready(V),
    Building(Pending<V>),
}

/// Get-or-create cache keyed by [`ConnectionKey`]
pub struct ConnectionCache<V> {
    slots: Arc<RwLock<HashMap<ConnectionKey, Slot<V>>>>,
}

impl<V> Default for ConnectionCache<V> {
    fn default() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<V> ConnectionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, building it with `create` if absent
    ///
    /// `create` runs at most once per key while a previous build is in flight
    /// or has succeeded. Its future keeps running if the caller that started it
    /// is dropped, as long as another caller is waiting on it.
    pub async fn get_or_create<F, Fut>(&self, key: ConnectionKey, create: F) -> ConnectionResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConnectionResult<V>> + Send + 'static,
    {
        {
            let slots = self.slots.read().await;
            if let Some(Slot::Ready(value)) = slots.get(&key) {
                tracing::debug!("Connection cache hit: {}", key.name());
                return Ok(value.clone());
            }
        }

        let pending = {
            let mut slots = self.slots.write().await;
            match slots.get(&key) {
                Some(Slot::Ready(value)) => return Ok(value.clone()),
                Some(Slot::Building(pending)) => {
                    tracing::debug!("Waiting for in-flight connection: {}", key.name());
                    pending.clone()
                }
                None => {
                    tracing::debug!("Building connection: {}", key.name());
                    let name = key.name().to_string();
                    let pending = AssertUnwindSafe(create())
                        .catch_unwind()
                        .map(move |outcome| {
                            outcome.unwrap_or_else(|panic| {
                                Err(ConnectionError::Construction {
                                    name,
                                    message: format!(
                                        "constructor panicked: {}",
                                        panic_message(panic.as_ref())
                                    ),
                                })
                            })
                        })
                        .boxed()
                        .shared();
                    slots.insert(key.clone(), Slot::Building(pending.clone()));
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut slots = self.slots.write().await;
        let still_building = matches!(
            slots.get(&key),
            Some(Slot::Building(current)) if current.ptr_eq(&pending)
        );
        if still_building {
            match &result {
                Ok(value) => {
                    slots.insert(key, Slot::Ready(value.clone()));
                }
                Err(e) => {
                    tracing::debug!("Dropping failed connection '{}': {}", key.name(), e);
                    slots.remove(&key);
                }
            }
        }

        result
    }

    /// Drop the entry for `key`, returning whether one existed
    pub async fn invalidate(&self, key: &ConnectionKey) -> bool {
        self.slots.write().await.remove(key).is_some()
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    /// Number of built connections
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// Check if no connection has been built
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{ConnectionError, SqlConnection};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(name: &str, params: ConnectionParams) -> ConnectionKey {
        ConnectionKey::new(name, &ConnectorClass::of::<SqlConnection>(), &params)
    }

    fn failure() -> ConnectionError {
        ConnectionError::Construction {
            name: "db".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_key_identity() {
        let a = ConnectionParams::from([("x".to_string(), json!(1))]);
        let b = ConnectionParams::from([("x".to_string(), json!(2))]);

        assert_eq!(key("db", a.clone()), key("db", a.clone()));
        assert_ne!(key("db", a.clone()), key("db", b));
        assert_ne!(key("db", a.clone()), key("other", a));
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let cache = ConnectionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let value = cache
                .get_or_create(key("db", ConnectionParams::new()), || async move {
                    Ok(Arc::new(calls.fetch_add(1, Ordering::SeqCst)))
                })
                .await
                .unwrap();
            assert_eq!(*value, 0);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_build_once() {
        let cache = Arc::new(ConnectionCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_create(key("db", ConnectionParams::new()), || async move {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(Arc::new(calls.fetch_add(1, Ordering::SeqCst)))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            let value = task.await.unwrap().unwrap();
            assert_eq!(*value, 0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waiters_share_failure_then_retry() {
        let cache: Arc<ConnectionCache<Arc<usize>>> = Arc::new(ConnectionCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_create(key("db", ConnectionParams::new()), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Err(failure())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty().await);

        let value = cache
            .get_or_create(key("db", ConnectionParams::new()), || async {
                Ok(Arc::new(7))
            })
            .await
            .unwrap();
        assert_eq!(*value, 7);
    }

    #[tokio::test]
    async fn test_panicking_build_is_retried() {
        let cache: ConnectionCache<u8> = ConnectionCache::new();
        let k = key("db", ConnectionParams::new());

        let err = cache
            .get_or_create(k.clone(), || async { panic!("driver blew up") })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Construction { ref message, .. } if message.contains("driver blew up")
        ));
        assert!(cache.is_empty().await);

        let value = cache
            .get_or_create(k, || async { Ok(7u8) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = ConnectionCache::new();
        let k = key("db", ConnectionParams::new());

        cache
            .get_or_create(k.clone(), || async { Ok(1u8) })
            .await
            .unwrap();
        assert!(cache.invalidate(&k).await);
        assert!(!cache.invalidate(&k).await);

        let value = cache
            .get_or_create(k.clone(), || async { Ok(2u8) })
            .await
            .unwrap();
        assert_eq!(value, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
