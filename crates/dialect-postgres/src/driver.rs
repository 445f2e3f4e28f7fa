use std::sync::Mutex;

use dbkit_core::config::ConnectionDescriptor;
use dbkit_core::driver::{ConnectionDriver, ExecResult, PreparedStatement};
use dbkit_core::error::{ConnectionError, Error, QueryError, Result};
use dbkit_core::row::{Row, Value};
use bytes::BytesMut;
use fallible_iterator::FallibleIterator;
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};

/// A single PostgreSQL connection (spec.md §4.C2), guarded the same way
/// as [`dbkit_dialect_mysql::MysqlDriver`] so both drivers present an
/// identical concurrency contract to the Connection Pool (C4).
pub struct PostgresDriver {
    client: Mutex<Client>,
}

impl PostgresDriver {
    pub fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let conninfo = format!(
            "host={} port={} user={} password={} dbname={}",
            descriptor.host, descriptor.port, descriptor.username, descriptor.password, descriptor.database
        );
        let client = Client::connect(&conninfo, NoTls).map_err(|source| connection_error(source, true))?;
        Ok(Self { client: Mutex::new(client) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Client>> {
        self.client
            .lock()
            .map_err(|_| connection_error_message("postgres connection state was poisoned", false))
    }
}

fn connection_error(source: postgres::Error, transient: bool) -> Error {
    ConnectionError { message: source.to_string(), transient, source: Some(Box::new(source)) }.into()
}

fn connection_error_message(message: &str, transient: bool) -> Error {
    ConnectionError { message: message.to_string(), transient, source: None }.into()
}

fn query_error(sql: &str, source: postgres::Error) -> Error {
    let code = source.code().map(|code| i64::from(code.code().bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)))));
    QueryError { sql: sql.to_string(), code, message: source.to_string() }.into()
}

/// A dynamically typed parameter adapter: `postgres` requires each bound
/// value to implement `ToSql` at a known Rust type, so `Value` is
/// wrapped rather than matched ad hoc at every call site.
#[derive(Debug)]
struct DynValue<'a>(&'a Value);

impl ToSql for DynValue<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres::types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(postgres::types::IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => v.to_sql(ty, out),
            Value::Float(v) => v.to_sql(ty, out),
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    postgres::types::to_sql_checked!();
}

/// Whether `sql` is expected to return rows via `Client::query` rather
/// than `Client::execute`: a leading `SELECT`, or a `WITH` CTE that
/// `crates/core/src/query/select.rs`'s `SelectPlan` renders ahead of one.
fn is_result_returning(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    starts_with_word(trimmed, "select") || starts_with_word(trimmed, "with")
}

fn starts_with_word(sql: &str, word: &str) -> bool {
    sql.len() >= word.len() && sql[..word.len()].eq_ignore_ascii_case(word)
}

fn to_row(pg_row: postgres::Row) -> Row {
    let columns = pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| (column.name().to_string(), from_column(&pg_row, index, column.type_())))
        .collect();
    Row::new(columns)
}

fn from_column(row: &postgres::Row, index: usize, ty: &Type) -> Value {
    match *ty {
        Type::BOOL => row.get::<_, Option<bool>>(index).map_or(Value::Null, Value::Bool),
        Type::INT2 => row.get::<_, Option<i16>>(index).map_or(Value::Null, |v| Value::Int(i64::from(v))),
        Type::INT4 => row.get::<_, Option<i32>>(index).map_or(Value::Null, |v| Value::Int(i64::from(v))),
        Type::INT8 => row.get::<_, Option<i64>>(index).map_or(Value::Null, Value::Int),
        Type::FLOAT4 => row.get::<_, Option<f32>>(index).map_or(Value::Null, |v| Value::Float(f64::from(v))),
        Type::FLOAT8 | Type::NUMERIC => row.get::<_, Option<f64>>(index).map_or(Value::Null, Value::Float),
        Type::BYTEA => row.get::<_, Option<Vec<u8>>>(index).map_or(Value::Null, Value::Bytes),
        _ => row.get::<_, Option<String>>(index).map_or(Value::Null, Value::Text),
    }
}

impl ConnectionDriver for PostgresDriver {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(sql))
    }

    fn execute(&mut self, stmt: &PreparedStatement, params: &[Value]) -> Result<ExecResult> {
        let mut client = self.lock()?;
        let bound = params.iter().map(DynValue).collect::<Vec<_>>();
        let refs = bound.iter().map(|v| v as &(dyn ToSql + Sync)).collect::<Vec<_>>();
        let is_select = is_result_returning(&stmt.sql);
        if is_select {
            let rows = client.query(&stmt.sql, &refs).map_err(|source| query_error(&stmt.sql, source))?;
            let rows = rows.into_iter().map(to_row).collect();
            Ok(ExecResult { rows, affected_rows: 0, last_insert_id: None })
        } else {
            let affected_rows = client.execute(&stmt.sql, &refs).map_err(|source| query_error(&stmt.sql, source))?;
            Ok(ExecResult { rows: Vec::new(), affected_rows, last_insert_id: None })
        }
    }

    fn begin_transaction(&mut self) -> Result<()> {
        let mut client = self.lock()?;
        client.simple_query("BEGIN").map_err(|source| query_error("BEGIN", source))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut client = self.lock()?;
        client.simple_query("COMMIT").map_err(|source| query_error("COMMIT", source))?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let mut client = self.lock()?;
        client.simple_query("ROLLBACK").map_err(|source| query_error("ROLLBACK", source))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn chunked_query(&mut self, sql: &str, params: &[Value], chunk_size: usize) -> Result<Vec<Vec<Row>>> {
        let mut client = self.lock()?;
        let bound = params.iter().map(DynValue).collect::<Vec<_>>();
        let refs = bound.iter().map(|v| v as &(dyn ToSql + Sync)).collect::<Vec<_>>();
        let row_iter = client.query_raw(sql, refs).map_err(|source| query_error(sql, source))?;
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut current = Vec::with_capacity(chunk_size);
        let mut row_iter = row_iter;
        while let Some(row) = row_iter.next().map_err(|source| query_error(sql, source))? {
            current.push(to_row(row));
            if current.len() == chunk_size {
                chunks.push(std::mem::replace(&mut current, Vec::with_capacity(chunk_size)));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        Ok(chunks)
    }
}
