/// Closed set of logical column types (spec.md §3 ColumnSpec). Dialects
/// translate these into concrete DDL fragments via `Dialect::map_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Integer { bits: IntegerWidth, unsigned: bool },
    Varchar { length: u32 },
    Char { length: u32 },
    Text { size: TextSize },
    Decimal { precision: u8, scale: u8 },
    Float,
    Double,
    Boolean,
    Date,
    Time { precision: Option<u8> },
    Timestamp { precision: Option<u8> },
    Json,
    Jsonb,
    Uuid,
    Ip,
    Mac,
    Binary { length: Option<u32> },
    Enum { values: Vec<String> },
    Set { values: Vec<String> },
    Array { element: Box<ColumnType> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerWidth {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Tiny,
    Regular,
    Medium,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDefault {
    Literal(String),
    /// A function reference such as `CURRENT_TIMESTAMP`, rendered verbatim
    /// rather than quoted as a string literal.
    Function(String),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(String),
}

/// Column shape accepted by the Schema Builder (spec.md §3). Invariants
/// enforced by the builder, not by this struct: precision/scale dialect
/// bounds, auto-increment only on integer widths, charset/collation only
/// on character types, positional hints only at ALTER time.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
    pub auto_increment: bool,
    pub comment: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub position: Option<ColumnPosition>,
    pub invisible: bool,
    pub unique: bool,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            auto_increment: false,
            comment: None,
            charset: None,
            collation: None,
            position: None,
            invisible: false,
            unique: false,
        }
    }

    #[must_use]
    pub fn is_character_type(&self) -> bool {
        matches!(
            self.column_type,
            ColumnType::Varchar { .. } | ColumnType::Char { .. } | ColumnType::Text { .. }
        )
    }

    #[must_use]
    pub fn is_integer_type(&self) -> bool {
        matches!(self.column_type, ColumnType::Integer { .. })
    }
}
