use std::sync::{Condvar, Mutex};
use std::time::Duration;

use dbkit_core::config::ConnectionDescriptor;
use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::{ConnectionError, Error, Result};

/// A free list of already-open connections to one [`ConnectionDescriptor`],
/// sized up front per spec.md §6's pool bounds. `checkout`/`checkin`
/// give the exclusive-checkout semantics `PooledGuard` relies on
/// (spec.md §5): a connection is either in the free list or held by
/// exactly one guard, never both.
pub(crate) struct Bucket<D> {
    pub(crate) descriptor: ConnectionDescriptor,
    free: Mutex<Vec<D>>,
    available: Condvar,
}

impl<D: ConnectionDriver> Bucket<D> {
    pub(crate) fn open(
        descriptor: ConnectionDescriptor,
        count: usize,
        factory: &(dyn Fn(&ConnectionDescriptor) -> Result<D> + Send + Sync),
    ) -> Result<Self> {
        let mut connections = Vec::with_capacity(count);
        for _ in 0..count.max(1) {
            connections.push(factory(&descriptor)?);
        }
        Ok(Self { descriptor, free: Mutex::new(connections), available: Condvar::new() })
    }

    pub(crate) fn checkout(&self, timeout: Duration) -> Result<D> {
        let mut free = self.free.lock().expect("pool mutex poisoned");
        loop {
            if let Some(connection) = free.pop() {
                return Ok(connection);
            }
            let (guard, result) =
                self.available.wait_timeout(free, timeout).expect("pool mutex poisoned");
            free = guard;
            if result.timed_out() {
                return Err(Error::Connection(ConnectionError {
                    message: "timed out waiting for a pooled connection".to_string(),
                    transient: true,
                    source: None,
                }));
            }
        }
    }

    pub(crate) fn checkin(&self, connection: D) {
        self.free.lock().expect("pool mutex poisoned").push(connection);
        self.available.notify_one();
    }

    /// Runs the pool's health check against every connection currently
    /// idle in the free list (spec.md §4.C4); a connection out on loan
    /// is re-checked the next time it is returned and re-acquired.
    pub(crate) fn recycle_unhealthy(
        &self,
        factory: &(dyn Fn(&ConnectionDescriptor) -> Result<D> + Send + Sync),
    ) {
        let mut free = self.free.lock().expect("pool mutex poisoned");
        for slot in free.iter_mut() {
            if slot.health_check().is_err() {
                log::warn!("replacing unhealthy pooled connection to {}", self.descriptor.host);
                match factory(&self.descriptor) {
                    Ok(fresh) => *slot = fresh,
                    Err(error) => log::warn!("failed to reopen pooled connection: {error}"),
                }
            }
        }
    }
}
