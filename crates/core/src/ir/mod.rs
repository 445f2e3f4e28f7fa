mod column;
mod table;

pub use column::{ColumnDefault, ColumnPosition, ColumnSpec, ColumnType, IntegerWidth, TextSize};
pub use table::{ForeignKeyAction, ForeignKeySpec, IndexColumn, IndexKind, IndexSpec, SortDirection, TableSpec};
