use std::ops::{Deref, DerefMut};

use dbkit_core::driver::ConnectionDriver;

use crate::pool::ConnectionPool;
use crate::role::Role;

/// An exclusively checked-out connection (spec.md §5). Released back to
/// its bucket on drop; never shared across threads while held.
pub struct PooledGuard<'a, D: ConnectionDriver> {
    pub(crate) pool: &'a ConnectionPool<D>,
    pub(crate) role: Role,
    pub(crate) replica: Option<usize>,
    pub(crate) driver: Option<D>,
}

impl<D: ConnectionDriver> Deref for PooledGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.driver.as_ref().expect("connection taken before drop")
    }
}

impl<D: ConnectionDriver> DerefMut for PooledGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.driver.as_mut().expect("connection taken before drop")
    }
}

impl<D: ConnectionDriver> Drop for PooledGuard<'_, D> {
    fn drop(&mut self) {
        if let Some(connection) = self.driver.take() {
            self.pool.checkin(self.role, self.replica, connection);
        }
    }
}

/// A write connection pinned for the life of a transaction (spec.md
/// §5): every statement issued through it bypasses `route()` and runs
/// on this connection regardless of verb.
pub struct TransactionGuard<'a, D: ConnectionDriver> {
    pool: &'a ConnectionPool<D>,
    driver: Option<D>,
    finished: bool,
}

impl<'a, D: ConnectionDriver> TransactionGuard<'a, D> {
    pub(crate) fn new(pool: &'a ConnectionPool<D>, driver: D) -> Self {
        Self { pool, driver: Some(driver), finished: false }
    }

    fn driver_mut(&mut self) -> &mut D {
        self.driver.as_mut().expect("transaction connection taken before drop")
    }

    pub fn connection(&mut self) -> &mut D {
        self.driver_mut()
    }

    pub fn commit(mut self) -> dbkit_core::error::Result<()> {
        self.driver_mut().commit()?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> dbkit_core::error::Result<()> {
        self.driver_mut().rollback()?;
        self.finished = true;
        Ok(())
    }
}

impl<D: ConnectionDriver> Drop for TransactionGuard<'_, D> {
    fn drop(&mut self) {
        if !self.finished {
            if let Some(driver) = self.driver.as_mut() {
                if let Err(error) = driver.rollback() {
                    log::warn!("rollback on drop failed: {error}");
                }
            }
        }
        if let Some(connection) = self.driver.take() {
            self.pool.checkin(Role::Write, None, connection);
        }
    }
}
