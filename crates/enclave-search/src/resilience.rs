//! Resilience primitives for backend requests.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use backon::{ExponentialBuilder, Retryable};
use enclave_core::TenantId;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::Duration;

use crate::error::{EmbedError, IndexError};

/// Errors that know whether a retry could help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for IndexError {
    fn is_transient(&self) -> bool {
        IndexError::is_transient(self)
    }
}

impl Transient for EmbedError {
    fn is_transient(&self) -> bool {
        EmbedError::is_transient(self)
    }
}

/// Bounded exponential backoff for transient failures.
///
/// Only errors reporting [`Transient::is_transient`] are retried; anything
/// else is returned on the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: usize,
    min_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Run `op`, retrying transient failures according to this policy.
    pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        op.retry(self.backoff())
            .when(|e: &E| e.is_transient())
            .notify(|e: &E, delay: Duration| {
                log::warn!("{} failed, retrying in {:?}: {}", what, delay, e);
            })
            .await
    }
}

/// Per-tenant read/write guard shared by all clones of a client.
///
/// Index lifecycle operations take the write side so that ingestion and
/// queries for the same tenant never observe the gap between deleting and
/// recreating its index.
///
/// A tenant's entry lives only while a guard for it is held or awaited,
/// so the map stays as small as the number of tenants in flight.
#[derive(Debug, Clone, Default)]
pub struct TenantLocks {
    locks: Arc<Mutex<HashMap<TenantId, Arc<RwLock<()>>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, tenant: &TenantId) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Entries nobody holds or waits on can go; guards own a clone.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(tenant.clone()).or_default())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Exclusive access for create/delete.
    pub async fn lifecycle(&self, tenant: &TenantId) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(tenant).write_owned().await
    }

    /// Shared access for ingestion and queries.
    pub async fn shared(&self, tenant: &TenantId) -> OwnedRwLockReadGuard<()> {
        self.lock_for(tenant).read_owned().await
    }
}
