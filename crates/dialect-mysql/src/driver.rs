use std::io;
use std::sync::Mutex;

use dbkit_core::config::ConnectionDescriptor;
use dbkit_core::driver::{ConnectionDriver, ExecResult, PreparedStatement};
use dbkit_core::error::{ConnectionError, Error, QueryError, Result};
use dbkit_core::row::{Row, Value};
use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Params, Pool, PooledConn};

const POISONED_CONNECTION_MESSAGE: &str = "mysql connection state was poisoned";

/// A single MySQL connection (spec.md §4.C2). Guarded by a mutex so the
/// same driver instance can be shared behind an `Arc` by the Connection
/// Pool (C4) without the pool needing its own synchronization.
pub struct MysqlDriver {
    connection: Mutex<PooledConn>,
}

impl MysqlDriver {
    pub fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let builder = OptsBuilder::new()
            .ip_or_hostname(Some(descriptor.host.clone()))
            .tcp_port(descriptor.port)
            .user(Some(descriptor.username.clone()))
            .pass(Some(descriptor.password.clone()))
            .db_name(Some(descriptor.database.clone()));
        let pool = Pool::new(builder).map_err(|source| connection_error(source, true))?;
        let connection = pool.get_conn().map_err(|source| connection_error(source, true))?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PooledConn>> {
        self.connection
            .lock()
            .map_err(|_| connection_error(io::Error::other(POISONED_CONNECTION_MESSAGE), false))
    }
}

fn connection_error<E: std::error::Error + Send + Sync + 'static>(source: E, transient: bool) -> Error {
    ConnectionError { message: source.to_string(), transient, source: Some(Box::new(source)) }.into()
}

fn query_error(sql: &str, source: mysql::Error) -> Error {
    let code = mysql_error_code(&source);
    QueryError { sql: sql.to_string(), code, message: source.to_string() }.into()
}

fn mysql_error_code(error: &mysql::Error) -> Option<i64> {
    match error {
        mysql::Error::MySqlError(inner) => Some(i64::from(inner.code)),
        _ => None,
    }
}

fn to_mysql_params(params: &[Value]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(params.iter().map(to_mysql_value).collect())
}

fn to_mysql_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Bool(v) => mysql::Value::Int(i64::from(*v)),
        Value::Int(v) => mysql::Value::Int(*v),
        Value::Float(v) => mysql::Value::Double(*v),
        Value::Text(v) => mysql::Value::Bytes(v.clone().into_bytes()),
        Value::Bytes(v) => mysql::Value::Bytes(v.clone()),
    }
}

fn from_mysql_row(row: mysql::Row) -> Row {
    let columns = row.columns_ref().iter().map(|c| c.name_str().into_owned()).collect::<Vec<_>>();
    let values = row.unwrap();
    Row::new(columns.into_iter().zip(values.into_iter().map(from_mysql_value)).collect())
}

fn from_mysql_value(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
        mysql::Value::Int(v) => Value::Int(v),
        mysql::Value::UInt(v) => Value::Int(v as i64),
        mysql::Value::Float(v) => Value::Float(f64::from(v)),
        mysql::Value::Double(v) => Value::Float(v),
        mysql::Value::Date(year, month, day, hour, minute, second, micros) => Value::Text(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        )),
        mysql::Value::Time(neg, days, hours, minutes, seconds, micros) => {
            let sign = if neg { "-" } else { "" };
            Value::Text(format!("{sign}{days}d {hours:02}:{minutes:02}:{seconds:02}.{micros:06}"))
        }
    }
}

impl ConnectionDriver for MysqlDriver {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(sql))
    }

    fn execute(&mut self, stmt: &PreparedStatement, params: &[Value]) -> Result<ExecResult> {
        let mut connection = self.lock()?;
        let result = connection
            .exec_iter(&stmt.sql, to_mysql_params(params))
            .map_err(|source| query_error(&stmt.sql, source))?;
        let affected_rows = result.affected_rows();
        let last_insert_id = result.last_insert_id();
        let rows = result
            .collect::<std::result::Result<Vec<mysql::Row>, _>>()
            .map_err(|source| query_error(&stmt.sql, source))?
            .into_iter()
            .map(from_mysql_row)
            .collect();
        Ok(ExecResult { rows, affected_rows, last_insert_id })
    }

    fn begin_transaction(&mut self) -> Result<()> {
        let mut connection = self.lock()?;
        connection.query_drop("START TRANSACTION").map_err(|source| query_error("START TRANSACTION", source))
    }

    fn commit(&mut self) -> Result<()> {
        let mut connection = self.lock()?;
        connection.query_drop("COMMIT").map_err(|source| query_error("COMMIT", source))
    }

    fn rollback(&mut self) -> Result<()> {
        let mut connection = self.lock()?;
        connection.query_drop("ROLLBACK").map_err(|source| query_error("ROLLBACK", source))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn chunked_query(&mut self, sql: &str, params: &[Value], chunk_size: usize) -> Result<Vec<Vec<Row>>> {
        let mut connection = self.lock()?;
        let result = connection
            .exec_iter(sql, to_mysql_params(params))
            .map_err(|source| query_error(sql, source))?;
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut current = Vec::with_capacity(chunk_size);
        for row in result {
            let row = row.map_err(|source| query_error(sql, source))?;
            current.push(from_mysql_row(row));
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
