//! Connection Pool Manager.
//!
//! One [`EnginePool`] per data-source identity, created lazily and probed on every reuse.
//! Lookup-and-create for an identity runs under that identity's async lock, so concurrent
//! first use never opens two pools. Identities do not contend with each other.
//!
//! A pool whose connections are all checked out is busy, not dead: it is returned as is.
//! A pool that fails its probe is unregistered under the lock and closed after it is released.

use crate::pool::EnginePool;
use parking_lot::{Mutex, RwLock};
use sluice_common::config::PoolSettings;
use sluice_common::scrubber::redact_connection_string;
use sluice_common::{DataSourceDescriptor, SourceId};
use sluice_error::{ErrorCode, Result, SluiceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PoolManager {
    settings: PoolSettings,
    pools: RwLock<HashMap<SourceId, EnginePool>>,
    // per-identity creation locks
    creation: Mutex<HashMap<SourceId, Arc<tokio::sync::Mutex<()>>>>,
    pools_created: AtomicU64,
    shut_down: AtomicBool,
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new(PoolSettings::default())
    }
}

impl PoolManager {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            pools: RwLock::new(HashMap::new()),
            creation: Mutex::new(HashMap::new()),
            pools_created: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    fn creation_lock(&self, id: SourceId) -> Arc<tokio::sync::Mutex<()>> {
        self.creation.lock().entry(id).or_default().clone()
    }

    /// Drop the creation lock for `id` unless another caller is waiting on it.
    /// `held` is the caller's own handle; the map holds the other reference.
    fn forget_creation_lock(&self, id: SourceId, held: &Arc<tokio::sync::Mutex<()>>) {
        let mut creation = self.creation.lock();
        if Arc::strong_count(held) == 2 {
            creation.remove(&id);
        }
    }

    /// Live pool for `descriptor`, reusing the registered one if it passes a liveness
    /// probe and opening a fresh one otherwise.
    pub async fn acquire(&self, descriptor: &DataSourceDescriptor) -> Result<EnginePool> {
        let lock = self.creation_lock(descriptor.id);
        let guard = lock.lock().await;

        if self.shut_down.load(Ordering::Acquire) {
            return Err(SluiceError::new(
                ErrorCode::ConnectionFailed,
                "Pool manager has been shut down",
            )
            .with_context(descriptor.connection_context()));
        }

        let existing = self.pools.read().get(&descriptor.id).cloned();
        let mut stale = None;
        if let Some(pool) = existing {
            match pool.ping().await {
                Ok(()) => return Ok(pool),
                Err(e) => {
                    warn!(
                        target: "pools",
                        source_id = %descriptor.id,
                        error = %e,
                        "Liveness probe failed, recreating pool"
                    );
                    self.pools.write().remove(&descriptor.id);
                    stale = Some(pool);
                }
            }
        }

        let opened = EnginePool::connect(descriptor, &self.settings).await;
        if let Ok(pool) = &opened {
            self.pools_created.fetch_add(1, Ordering::Relaxed);
            self.pools.write().insert(descriptor.id, pool.clone());
        }
        drop(guard);

        if let Some(pool) = stale {
            tokio::spawn(async move { pool.close().await });
        }
        let pool = opened?;

        let url = descriptor
            .engine
            .dialect()
            .connection_string(descriptor)
            .map(|u| redact_connection_string(&u))
            .unwrap_or_default();
        info!(
            target: "pools",
            source_id = %descriptor.id,
            engine = %descriptor.engine,
            url = %url,
            max_open = self.settings.max_open,
            "Opened connection pool"
        );
        Ok(pool)
    }

    /// Close and forget the pool for `id`. Returns whether one was registered.
    pub async fn evict(&self, id: SourceId) -> bool {
        let lock = self.creation_lock(id);
        let guard = lock.lock().await;
        let removed = self.pools.write().remove(&id);
        drop(guard);
        self.forget_creation_lock(id, &lock);

        match removed {
            Some(pool) => {
                pool.close().await;
                debug!(target: "pools", source_id = %id, "Evicted connection pool");
                true
            }
            None => false,
        }
    }

    /// Close every pool and clear the registry. Meant for process shutdown: later calls
    /// to [`acquire`](Self::acquire) fail instead of opening new pools.
    pub async fn release_all(&self) {
        self.shut_down.store(true, Ordering::Release);

        let ids: Vec<SourceId> = self.creation.lock().keys().copied().collect();
        let mut drained = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = self.creation_lock(id);
            let _guard = lock.lock().await;
            if let Some(pool) = self.pools.write().remove(&id) {
                drained.push(pool);
            }
        }

        let count = drained.len();
        for pool in drained {
            pool.close().await;
        }
        self.creation.lock().clear();
        info!(target: "pools", count, "Released all connection pools");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Pools currently registered.
    pub fn pool_count(&self) -> usize {
        self.pools.read().len()
    }

    /// Pools opened since construction, including replacements.
    pub fn pools_created(&self) -> u64 {
        self.pools_created.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_evict_drops_creation_lock() {
        let manager = PoolManager::default();
        for id in 0..5 {
            assert!(!manager.evict(SourceId(id)).await);
        }
        assert!(manager.creation.lock().is_empty());
    }

    #[tokio::test]
    async fn test_creation_lock_kept_while_contended() {
        let manager = PoolManager::default();
        let id = SourceId(7);
        let waiter = manager.creation_lock(id);
        let own = manager.creation_lock(id);
        manager.forget_creation_lock(id, &own);
        assert_eq!(manager.creation.lock().len(), 1);
        drop(waiter);
        manager.forget_creation_lock(id, &own);
        assert!(manager.creation.lock().is_empty());
    }
}
