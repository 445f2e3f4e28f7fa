use crate::error::Result;
use crate::fetch::FetchMode;
use crate::fetch_shape::Fetched;
use crate::row::{Row, Value};

/// A prepared statement handle. Concrete drivers may store more (a
/// server-side statement id); the SQL text is always preserved so a
/// driver that has no native prepare step (e.g. a fresh connection) can
/// still render the placeholders correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub sql: String,
}

impl PreparedStatement {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

/// Outcome of executing a prepared statement: the rows it produced (for
/// a SELECT) plus affected-row/last-insert-id bookkeeping (for a
/// mutating statement). `fetch_one`/`fetch_all` reshape `rows`
/// according to the requested `FetchMode` (spec.md §4.C2); the reshape
/// itself is a pure function (`fetch_shape::apply_mode`) shared by
/// every dialect so the grouping/keying rules never drift between
/// drivers.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
}

impl ExecResult {
    #[must_use]
    pub fn fetch_one(&self, mode: FetchMode) -> Option<Fetched> {
        crate::fetch_shape::apply_mode(&self.rows, mode).into_iter().next()
    }

    #[must_use]
    pub fn fetch_all(&self, mode: FetchMode) -> Vec<Fetched> {
        crate::fetch_shape::apply_mode(&self.rows, mode)
    }
}

/// Opens/closes a single connection, executes a prepared statement, and
/// exposes fetch modes (spec.md §4.C2). No string interpolation of
/// user data is ever permitted: `execute` always binds `params`
/// positionally against `stmt.sql`'s placeholders.
pub trait ConnectionDriver: Send {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement>;

    fn execute(&mut self, stmt: &PreparedStatement, params: &[Value]) -> Result<ExecResult>;

    fn begin_transaction(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Reads `sql` in chunks of at most `chunk_size` rows without
    /// materializing the full result set; used by the Backup
    /// Orchestrator's streaming strategy (spec.md §4.C10).
    fn chunked_query(
        &mut self,
        sql: &str,
        params: &[Value],
        chunk_size: usize,
    ) -> Result<Vec<Vec<Row>>>;

    /// `SELECT 1 AS health_check` as issued by the pool's health
    /// checker (spec.md §4.C4). Default implementation delegates to
    /// `execute`; drivers rarely need to override it.
    fn health_check(&mut self) -> Result<()> {
        let stmt = self.prepare("SELECT 1 AS health_check")?;
        self.execute(&stmt, &[]).map(|_| ())
    }
}
