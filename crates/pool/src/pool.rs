use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dbkit_core::config::{ConnectionDescriptor, PoolDescriptor};
use dbkit_core::dialect::Dialect;
use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::Result;

use crate::bucket::Bucket;
use crate::guard::{PooledGuard, TransactionGuard};
use crate::role::{route, Role};

/// A factory that opens a fresh driver connection for a descriptor; used
/// both at pool construction and to replace connections the health
/// checker finds unhealthy.
pub type DriverFactory<D> = Box<dyn Fn(&ConnectionDescriptor) -> Result<D> + Send + Sync>;

/// Read/write connection pool (spec.md §4.C4/§5). Opens every configured
/// connection up front, routes statements by their leading SQL verb,
/// round-robins across read replicas, and exclusively checks out a
/// connection for the life of whichever guard holds it.
pub struct ConnectionPool<D: ConnectionDriver> {
    dialect: Arc<dyn Dialect>,
    write: Bucket<D>,
    reads: Vec<Bucket<D>>,
    read_cursor: AtomicUsize,
    descriptor: PoolDescriptor,
    factory: DriverFactory<D>,
}

impl<D: ConnectionDriver> ConnectionPool<D> {
    /// Opens `descriptor.bounds.max_connections` connections to the
    /// write target and the same count to each read replica, per
    /// spec.md §6.
    pub fn new(
        descriptor: PoolDescriptor,
        dialect: Arc<dyn Dialect>,
        factory: DriverFactory<D>,
    ) -> Result<Self> {
        let write = Bucket::open(descriptor.write.clone(), descriptor.bounds.max_connections, &*factory)?;
        let mut reads = Vec::with_capacity(descriptor.read.len());
        for replica in &descriptor.read {
            reads.push(Bucket::open(replica.clone(), descriptor.bounds.max_connections, &*factory)?);
        }
        Ok(Self { dialect, write, reads, read_cursor: AtomicUsize::new(0), descriptor, factory })
    }

    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    /// Classifies `sql` and checks out a matching connection. Equivalent
    /// to `acquire(route(sql))`.
    pub fn acquire_for(&self, sql: &str) -> Result<PooledGuard<'_, D>> {
        self.acquire(route(sql))
    }

    pub fn acquire(&self, role: Role) -> Result<PooledGuard<'_, D>> {
        let timeout = self.descriptor.connection_timeout;
        match role {
            Role::Write => {
                let driver = self.write.checkout(timeout)?;
                Ok(PooledGuard { pool: self, role: Role::Write, replica: None, driver: Some(driver) })
            }
            Role::Read => {
                if self.reads.is_empty() {
                    let driver = self.write.checkout(timeout)?;
                    return Ok(PooledGuard { pool: self, role: Role::Write, replica: None, driver: Some(driver) });
                }
                let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.reads.len();
                let driver = self.reads[index].checkout(timeout)?;
                Ok(PooledGuard { pool: self, role: Role::Read, replica: Some(index), driver: Some(driver) })
            }
        }
    }

    /// Pins a write connection for a transaction's lifetime (spec.md
    /// §5): every statement issued through the returned guard runs on
    /// this connection regardless of its verb.
    pub fn begin_transaction(&self) -> Result<TransactionGuard<'_, D>> {
        let mut driver = self.write.checkout(self.descriptor.connection_timeout)?;
        driver.begin_transaction()?;
        Ok(TransactionGuard::new(self, driver))
    }

    /// Runs `SELECT 1 AS health_check` against every idle pooled
    /// connection, replacing any that fail (spec.md §4.C4).
    pub fn health_check_tick(&self) {
        if !self.descriptor.health_checks {
            return;
        }
        self.write.recycle_unhealthy(&*self.factory);
        for bucket in &self.reads {
            bucket.recycle_unhealthy(&*self.factory);
        }
    }

    pub(crate) fn checkin(&self, role: Role, replica: Option<usize>, connection: D) {
        match (role, replica) {
            (Role::Read, Some(index)) => self.reads[index].checkin(connection),
            _ => self.write.checkin(connection),
        }
    }
}
