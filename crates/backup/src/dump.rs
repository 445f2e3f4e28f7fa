use dbkit_core::dialect::Dialect;
use dbkit_core::driver::ConnectionDriver;
use dbkit_core::error::{Result, StorageError};
use dbkit_core::row::{Row, Value};
use dbkit_core::schema_builder::SchemaBuilder;
use dbkit_schema::AnalyzedTable;

use crate::types::{BackupConfig, BackupType};

/// A single table's captured rows, column names preserved alongside the
/// values so restore can rebuild parameterized `INSERT`s without
/// re-deriving the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDump {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// The artifact a backup produces before compression/encryption: DDL
/// statements plus per-table row data, kept structured rather than
/// rendered SQL text so restore can select, rename, and filter tables
/// without parsing its own output back out of a string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dump {
    pub ddl: Vec<String>,
    pub tables: Vec<TableDump>,
}

/// Builds a [`Dump`] for `tables`, honoring `config.backup_type`
/// (schema/data/both) and `config.uses_streaming()` (chunked reads via
/// [`ConnectionDriver::chunked_query`] instead of a single buffered
/// `SELECT *`, for incremental/differential backups).
pub(crate) fn build<D: ConnectionDriver>(
    driver: &mut D,
    dialect: &dyn Dialect,
    tables: &[AnalyzedTable],
    config: &BackupConfig,
) -> Result<Dump> {
    let mut ddl = Vec::new();
    if !matches!(config.backup_type, BackupType::DataOnly) {
        let builder = SchemaBuilder::new(dialect);
        for table in tables {
            let mut spec = table.to_table_spec();
            spec.if_not_exists = true;
            spec.foreign_keys.clear();
            ddl.push(builder.create_table_sql(&spec));
        }
        for table in tables {
            for fk in &table.foreign_keys {
                ddl.push(builder.add_foreign_key_sql(&table.name, fk));
            }
        }
    }

    let mut table_dumps = Vec::with_capacity(tables.len());
    if !matches!(config.backup_type, BackupType::SchemaOnly) {
        for table in tables {
            table_dumps.push(dump_table(driver, dialect, table, config)?);
        }
    }

    Ok(Dump { ddl, tables: table_dumps })
}

fn dump_table<D: ConnectionDriver>(
    driver: &mut D,
    dialect: &dyn Dialect,
    table: &AnalyzedTable,
    config: &BackupConfig,
) -> Result<TableDump> {
    let select_sql = format!("SELECT * FROM {}", dialect.quote_ident(&table.name));
    let rows: Vec<Row> = if config.uses_streaming() {
        driver.chunked_query(&select_sql, &[], config.chunk_size.max(1))?.into_iter().flatten().collect()
    } else {
        let stmt = driver.prepare(&select_sql)?;
        driver.execute(&stmt, &[])?.rows
    };

    let columns: Vec<String> = if let Some(first) = rows.first() {
        first.columns.iter().map(|(name, _)| name.clone()).collect()
    } else {
        table.columns.iter().map(|c| c.name.clone()).collect()
    };
    let values = rows.into_iter().map(|row| row.columns.into_iter().map(|(_, value)| value).collect()).collect();
    Ok(TableDump { name: table.name.clone(), columns, rows: values })
}

// --- Binary (de)serialization -------------------------------------------
//
// Tagged, length-prefixed encoding in the style of
// `dbkit_core::cache`'s `FileCache` entries: every string is a u32
// length followed by its UTF-8 bytes, every `Value` is a one-byte tag
// followed by its payload.

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_TEXT: u8 = 4;
const TAG_BYTES: u8 = 5;

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    write_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        Value::Int(i) => {
            out.push(TAG_INT);
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float(f) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::Text(s) => {
            out.push(TAG_TEXT);
            write_string(out, s);
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            write_u32(out, b.len() as u32);
            out.extend_from_slice(b);
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| StorageError {
            operation: "dump_decode".to_string(),
            message: "unexpected end of dump bytes".to_string(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        String::from_utf8(self.take(len)?.to_vec())
            .map_err(|e| StorageError { operation: "dump_decode".to_string(), message: e.to_string() }.into())
    }

    fn read_value(&mut self) -> Result<Value> {
        match self.read_u8()? {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOL => Ok(Value::Bool(self.read_u8()? != 0)),
            TAG_INT => Ok(Value::Int(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))),
            TAG_FLOAT => Ok(Value::Float(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))),
            TAG_TEXT => Ok(Value::Text(self.read_string()?)),
            TAG_BYTES => {
                let len = self.read_u32()? as usize;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            other => Err(StorageError { operation: "dump_decode".to_string(), message: format!("unknown value tag {other}") }.into()),
        }
    }
}

impl Dump {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u32(&mut out, self.ddl.len() as u32);
        for statement in &self.ddl {
            write_string(&mut out, statement);
        }
        write_u32(&mut out, self.tables.len() as u32);
        for table in &self.tables {
            write_string(&mut out, &table.name);
            write_u32(&mut out, table.columns.len() as u32);
            for column in &table.columns {
                write_string(&mut out, column);
            }
            write_u32(&mut out, table.rows.len() as u32);
            for row in &table.rows {
                write_u32(&mut out, row.len() as u32);
                for value in row {
                    write_value(&mut out, value);
                }
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let ddl_count = reader.read_u32()?;
        let mut ddl = Vec::with_capacity(ddl_count as usize);
        for _ in 0..ddl_count {
            ddl.push(reader.read_string()?);
        }

        let table_count = reader.read_u32()?;
        let mut tables = Vec::with_capacity(table_count as usize);
        for _ in 0..table_count {
            let name = reader.read_string()?;
            let column_count = reader.read_u32()?;
            let mut columns = Vec::with_capacity(column_count as usize);
            for _ in 0..column_count {
                columns.push(reader.read_string()?);
            }
            let row_count = reader.read_u32()?;
            let mut rows = Vec::with_capacity(row_count as usize);
            for _ in 0..row_count {
                let value_count = reader.read_u32()?;
                let mut row = Vec::with_capacity(value_count as usize);
                for _ in 0..value_count {
                    row.push(reader.read_value()?);
                }
                rows.push(row);
            }
            tables.push(TableDump { name, columns, rows });
        }
        Ok(Self { ddl, tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_round_trips_through_bytes() {
        let dump = Dump {
            ddl: vec!["CREATE TABLE widgets (id INT)".to_string()],
            tables: vec![TableDump {
                name: "widgets".to_string(),
                columns: vec!["id".to_string(), "label".to_string()],
                rows: vec![
                    vec![Value::Int(1), Value::Text("alpha".to_string())],
                    vec![Value::Int(2), Value::Null],
                ],
            }],
        };
        let bytes = dump.to_bytes();
        let decoded = Dump::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, dump);
    }
}
