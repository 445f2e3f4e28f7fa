use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dbkit_core::config::{ConnectionDescriptor, DriverTag, PoolBounds, PoolDescriptor};
use dbkit_core::driver::{ConnectionDriver, ExecResult, PreparedStatement};
use dbkit_core::error::Result;
use dbkit_core::row::Value;
use dbkit_core::test_support::PlainDialect;
use dbkit_pool::{route, ConnectionPool, Role};

/// A connection double that never touches the network: it just counts
/// how many times it has been health-checked and records which host it
/// was "opened" against.
struct FakeDriver {
    host: String,
    healthy: bool,
    checks: Arc<AtomicUsize>,
}

impl ConnectionDriver for FakeDriver {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(sql))
    }

    fn execute(&mut self, _stmt: &PreparedStatement, _params: &[Value]) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    fn begin_transaction(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn chunked_query(&mut self, _sql: &str, _params: &[Value], _chunk_size: usize) -> Result<Vec<Vec<dbkit_core::row::Row>>> {
        Ok(Vec::new())
    }

    fn health_check(&mut self) -> Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(())
        } else {
            Err(dbkit_core::error::Error::Connection(dbkit_core::error::ConnectionError {
                message: "unhealthy".to_string(),
                transient: true,
                source: None,
            }))
        }
    }
}

fn descriptor(host: &str) -> ConnectionDescriptor {
    ConnectionDescriptor::new(DriverTag::Mysql, host, "widgets")
}

fn pool(reads: Vec<&str>) -> ConnectionPool<FakeDriver> {
    let checks = Arc::new(AtomicUsize::new(0));
    let descriptor = PoolDescriptor {
        write: descriptor("write-host"),
        read: reads.into_iter().map(descriptor).collect(),
        bounds: PoolBounds { min_connections: 1, max_connections: 2 },
        connection_timeout: Duration::from_millis(200),
        health_checks: true,
        health_check_interval: Duration::from_secs(30),
    };
    ConnectionPool::new(
        descriptor,
        Arc::new(PlainDialect),
        Box::new(move |d| {
            Ok(FakeDriver { host: d.host.clone(), healthy: true, checks: checks.clone() })
        }),
    )
    .expect("pool opens")
}

#[test]
fn write_statements_route_to_the_write_connection() {
    let pool = pool(vec!["replica-a", "replica-b"]);
    let guard = pool.acquire_for("INSERT INTO widgets (id) VALUES (1)").unwrap();
    assert_eq!(guard.host, "write-host");
}

#[test]
fn reads_round_robin_across_replicas() {
    let pool = pool(vec!["replica-a", "replica-b"]);
    let first = pool.acquire(route("SELECT * FROM widgets")).unwrap().host.clone();
    drop(pool.acquire(route("SELECT * FROM widgets")).unwrap());
    let mut hosts = vec![first];
    for _ in 0..3 {
        let guard = pool.acquire(Role::Read).unwrap();
        hosts.push(guard.host.clone());
    }
    assert!(hosts.contains(&"replica-a".to_string()));
    assert!(hosts.contains(&"replica-b".to_string()));
}

#[test]
fn reads_fall_back_to_write_when_no_replicas_configured() {
    let pool = pool(vec![]);
    let guard = pool.acquire(Role::Read).unwrap();
    assert_eq!(guard.host, "write-host");
}

#[test]
fn guard_release_makes_the_connection_available_again() {
    let pool = pool(vec![]);
    {
        let _guard = pool.acquire(Role::Write).unwrap();
    }
    // bounds.max_connections == 2, so two more checkouts must still
    // succeed without blocking past the connection timeout.
    let _a = pool.acquire(Role::Write).unwrap();
    let _b = pool.acquire(Role::Write).unwrap();
}

#[test]
fn transaction_guard_commits_and_returns_the_connection() {
    let pool = pool(vec![]);
    let mut tx = pool.begin_transaction().unwrap();
    tx.connection().prepare("UPDATE widgets SET name = 'x'").unwrap();
    tx.commit().unwrap();
    let _a = pool.acquire(Role::Write).unwrap();
    let _b = pool.acquire(Role::Write).unwrap();
}
