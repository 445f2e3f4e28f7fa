use crate::dialect::Dialect;
use crate::error::{BuilderValidation, Result};
use crate::ir::{
    ColumnDefault, ColumnPosition, ColumnSpec, ColumnType, ForeignKeyAction, ForeignKeySpec,
    IndexColumn, IndexKind, IndexSpec, IntegerWidth, SortDirection, TableSpec, TextSize,
};

/// Lifecycle of a [`TableBuilder`] (spec.md §9 redesign note): columns
/// must be added before indexes/foreign keys, which must be added
/// before the table is emitted. `reset()` returns to `Empty` without
/// losing the table name or dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    HasColumns,
    HasConstraints,
    Emitted,
}

macro_rules! common_column_methods {
    ($ty:ident) => {
        impl $ty {
            #[must_use]
            pub fn nullable(mut self) -> Self {
                self.spec.nullable = true;
                self
            }

            #[must_use]
            pub fn not_null(mut self) -> Self {
                self.spec.nullable = false;
                self
            }

            #[must_use]
            pub fn default_literal(mut self, value: impl Into<String>) -> Self {
                self.spec.default = Some(ColumnDefault::Literal(value.into()));
                self
            }

            #[must_use]
            pub fn default_function(mut self, expr: impl Into<String>) -> Self {
                self.spec.default = Some(ColumnDefault::Function(expr.into()));
                self
            }

            #[must_use]
            pub fn default_null(mut self) -> Self {
                self.spec.default = Some(ColumnDefault::Null);
                self
            }

            #[must_use]
            pub fn comment(mut self, text: impl Into<String>) -> Self {
                self.spec.comment = Some(text.into());
                self
            }

            #[must_use]
            pub fn unique(mut self) -> Self {
                self.spec.unique = true;
                self
            }

            #[must_use]
            pub fn invisible(mut self) -> Self {
                self.spec.invisible = true;
                self
            }

            #[must_use]
            pub fn position_first(mut self) -> Self {
                self.spec.position = Some(ColumnPosition::First);
                self
            }

            #[must_use]
            pub fn position_after(mut self, column: impl Into<String>) -> Self {
                self.spec.position = Some(ColumnPosition::After(column.into()));
                self
            }

            #[must_use]
            pub fn finish(self) -> ColumnSpec {
                self.spec
            }
        }
    };
}

/// Typed column builder for integer widths: exposes `unsigned`/
/// `auto_increment`, modifiers that make no sense on a character or
/// temporal column. Spec.md §9: replaces a single mutable
/// "last-defined-column" cursor with runtime-checked modifiers.
#[derive(Debug, Clone)]
pub struct IntegerColumnDef {
    spec: ColumnSpec,
}

impl IntegerColumnDef {
    fn new(name: impl Into<String>, bits: IntegerWidth) -> Self {
        Self { spec: ColumnSpec::new(name, ColumnType::Integer { bits, unsigned: false }) }
    }

    #[must_use]
    pub fn unsigned(mut self) -> Self {
        if let ColumnType::Integer { unsigned, .. } = &mut self.spec.column_type {
            *unsigned = true;
        }
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.spec.auto_increment = true;
        self
    }
}
common_column_methods!(IntegerColumnDef);

/// Typed builder for `VARCHAR`/`CHAR`/`TEXT` columns: exposes
/// `charset`/`collation`, which only character types accept.
#[derive(Debug, Clone)]
pub struct CharacterColumnDef {
    spec: ColumnSpec,
}

impl CharacterColumnDef {
    fn new(spec: ColumnSpec) -> Self {
        Self { spec }
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.spec.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.spec.collation = Some(collation.into());
        self
    }
}
common_column_methods!(CharacterColumnDef);

/// Typed builder for every other column kind (decimal, float/double,
/// boolean, temporal, JSON, UUID, network, binary, enum/set/array):
/// none of these accept modifiers beyond the common set.
#[derive(Debug, Clone)]
pub struct SimpleColumnDef {
    spec: ColumnSpec,
}

impl SimpleColumnDef {
    fn new(spec: ColumnSpec) -> Self {
        Self { spec }
    }
}
common_column_methods!(SimpleColumnDef);

/// Assembles one table's column/index/foreign-key set with explicit
/// bounds and reserved-word validation (spec.md §4.C7), then hands the
/// finished [`TableSpec`] to [`SchemaBuilder`] for DDL emission.
pub struct TableBuilder<'a> {
    dialect: &'a dyn Dialect,
    spec: TableSpec,
    state: BuilderState,
}

impl<'a> TableBuilder<'a> {
    #[must_use]
    pub fn new(name: impl Into<String>, dialect: &'a dyn Dialect) -> Self {
        Self { dialect, spec: TableSpec::new(name), state: BuilderState::Empty }
    }

    #[must_use]
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Returns to `Empty`, discarding every column/index/foreign key
    /// added so far but keeping the table name and dialect.
    pub fn reset(&mut self) {
        let name = self.spec.name.clone();
        self.spec = TableSpec::new(name);
        self.state = BuilderState::Empty;
    }

    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.spec.if_not_exists = true;
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.spec.engine = Some(engine.into());
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.spec.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.spec.collation = Some(collation.into());
        self
    }

    #[must_use]
    pub fn integer(&self, name: impl Into<String>, bits: IntegerWidth) -> IntegerColumnDef {
        IntegerColumnDef::new(name, bits)
    }

    #[must_use]
    pub fn varchar(&self, name: impl Into<String>, length: u32) -> CharacterColumnDef {
        CharacterColumnDef::new(ColumnSpec::new(name, ColumnType::Varchar { length }))
    }

    #[must_use]
    pub fn char_column(&self, name: impl Into<String>, length: u32) -> CharacterColumnDef {
        CharacterColumnDef::new(ColumnSpec::new(name, ColumnType::Char { length }))
    }

    #[must_use]
    pub fn text(&self, name: impl Into<String>, size: TextSize) -> CharacterColumnDef {
        CharacterColumnDef::new(ColumnSpec::new(name, ColumnType::Text { size }))
    }

    #[must_use]
    pub fn decimal(&self, name: impl Into<String>, precision: u8, scale: u8) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Decimal { precision, scale }))
    }

    #[must_use]
    pub fn boolean(&self, name: impl Into<String>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Boolean))
    }

    #[must_use]
    pub fn date(&self, name: impl Into<String>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Date))
    }

    #[must_use]
    pub fn time(&self, name: impl Into<String>, precision: Option<u8>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Time { precision }))
    }

    #[must_use]
    pub fn timestamp(&self, name: impl Into<String>, precision: Option<u8>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Timestamp { precision }))
    }

    #[must_use]
    pub fn json(&self, name: impl Into<String>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Json))
    }

    #[must_use]
    pub fn uuid(&self, name: impl Into<String>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Uuid))
    }

    #[must_use]
    pub fn binary(&self, name: impl Into<String>, length: Option<u32>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Binary { length }))
    }

    #[must_use]
    pub fn enum_column(&self, name: impl Into<String>, values: Vec<String>) -> SimpleColumnDef {
        SimpleColumnDef::new(ColumnSpec::new(name, ColumnType::Enum { values }))
    }

    /// Validates and appends `column`: rejects an empty/overlong/
    /// reserved-word identifier, a duplicate column name, and an
    /// out-of-bounds precision/length for its type (spec.md §4.C7).
    pub fn add_column(&mut self, column: ColumnSpec) -> std::result::Result<&mut Self, BuilderValidation> {
        self.validate_identifier(&column.name)?;
        validate_bounds(&column)?;
        self.spec.columns.push(column);
        self.state = BuilderState::HasColumns;
        Ok(self)
    }

    pub fn add_index(&mut self, index: IndexSpec) -> std::result::Result<&mut Self, BuilderValidation> {
        self.validate_identifier(&index.name)?;
        for column in &index.columns {
            if !self.spec.has_column(&column.name) {
                return Err(BuilderValidation::UnknownColumn {
                    table: self.spec.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        self.spec.indexes.push(index);
        self.state = BuilderState::HasConstraints;
        Ok(self)
    }

    pub fn add_foreign_key(&mut self, fk: ForeignKeySpec) -> std::result::Result<&mut Self, BuilderValidation> {
        self.validate_identifier(&fk.name)?;
        for column in &fk.columns {
            if !self.spec.has_column(column) {
                return Err(BuilderValidation::UnknownColumn {
                    table: self.spec.name.clone(),
                    column: column.clone(),
                });
            }
        }
        self.spec.foreign_keys.push(fk);
        self.state = BuilderState::HasConstraints;
        Ok(self)
    }

    #[must_use]
    pub fn primary_key(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.spec.primary_key = columns.into_iter().map(Into::into).collect();
        let primary_key = self.spec.primary_key.clone();
        for column in &mut self.spec.columns {
            if primary_key.iter().any(|name| name == &column.name) {
                column.nullable = false;
            }
        }
        self
    }

    pub fn finish(mut self) -> std::result::Result<TableSpec, BuilderValidation> {
        if self.spec.columns.is_empty() {
            return Err(BuilderValidation::Other(format!(
                "table `{}` must have at least one column",
                self.spec.name
            )));
        }
        self.state = BuilderState::Emitted;
        Ok(self.spec)
    }

    fn validate_identifier(&self, name: &str) -> std::result::Result<(), BuilderValidation> {
        if name.trim().is_empty() {
            return Err(BuilderValidation::IdentifierEmpty);
        }
        if name.len() > self.dialect.max_identifier_len() {
            return Err(BuilderValidation::IdentifierTooLong {
                identifier: name.to_string(),
                limit: self.dialect.max_identifier_len(),
                dialect: self.dialect.name().to_string(),
            });
        }
        if self.dialect.is_reserved_word(name) {
            return Err(BuilderValidation::ReservedWord {
                dialect: self.dialect.name().to_string(),
                identifier: name.to_string(),
            });
        }
        if self.spec.has_column(name) {
            return Err(BuilderValidation::DuplicateColumn { table: self.spec.name.clone(), column: name.to_string() });
        }
        Ok(())
    }
}

fn validate_bounds(column: &ColumnSpec) -> std::result::Result<(), BuilderValidation> {
    match &column.column_type {
        ColumnType::Varchar { length } => check_range("VARCHAR length", *length, 1, 65_535),
        ColumnType::Char { length } => check_range("CHAR length", *length, 1, 255),
        ColumnType::Decimal { precision, scale } => {
            check_range("DECIMAL precision", u32::from(*precision), 1, 65)?;
            if *scale > *precision {
                return Err(BuilderValidation::OutOfRange {
                    field: "DECIMAL scale".to_string(),
                    value: scale.to_string(),
                    min: "0".to_string(),
                    max: precision.to_string(),
                });
            }
            Ok(())
        }
        ColumnType::Time { precision: Some(p) } | ColumnType::Timestamp { precision: Some(p) } => {
            check_range("fractional-second precision", u32::from(*p), 0, 6)
        }
        _ => Ok(()),
    }?;
    if column.auto_increment && !column.is_integer_type() {
        return Err(BuilderValidation::IncompatibleModifier {
            modifier: "AUTO_INCREMENT".to_string(),
            column_type: format!("{:?}", column.column_type),
        });
    }
    if (column.charset.is_some() || column.collation.is_some()) && !column.is_character_type() {
        return Err(BuilderValidation::IncompatibleModifier {
            modifier: "charset/collation".to_string(),
            column_type: format!("{:?}", column.column_type),
        });
    }
    Ok(())
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> std::result::Result<(), BuilderValidation> {
    if value < min || value > max {
        Err(BuilderValidation::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Reflects the presence of schema objects so idempotent alterations
/// can skip work that has already happened (spec.md §4.C7). The Schema
/// Analyzer (C8) is the production implementation; tests supply a
/// fixed in-memory one.
pub trait CatalogReader {
    fn table_exists(&self, table: &str) -> Result<bool>;
    fn column_exists(&self, table: &str, column: &str) -> Result<bool>;
    fn index_exists(&self, table: &str, index: &str) -> Result<bool>;
    fn foreign_key_exists(&self, table: &str, name: &str) -> Result<bool>;
}

/// Renders validated [`TableSpec`]/[`ColumnSpec`]/[`IndexSpec`]/
/// [`ForeignKeySpec`] values into dialect-correct DDL (spec.md §4.C7).
/// Stateless beyond the dialect reference; the idempotent
/// `*_if_not_exists` methods are the only ones that take a
/// [`CatalogReader`].
pub struct SchemaBuilder<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> SchemaBuilder<'a> {
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    #[must_use]
    pub fn table(&self, name: impl Into<String>) -> TableBuilder<'a> {
        TableBuilder::new(name, self.dialect)
    }

    #[must_use]
    pub fn create_table_sql(&self, table: &TableSpec) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if table.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.dialect.quote_ident(&table.name));
        sql.push_str(" (\n");

        let mut lines = Vec::new();
        for column in &table.columns {
            let is_primary_key = table.primary_key.iter().any(|name| name == &column.name);
            lines.push(format!("  {}", self.render_column(column, is_primary_key)));
        }
        if !table.primary_key.is_empty() {
            let columns = table
                .primary_key
                .iter()
                .map(|c| self.dialect.quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("  PRIMARY KEY ({columns})"));
        }
        for index in &table.indexes {
            lines.push(format!("  {}", self.render_index(index)));
        }
        for fk in &table.foreign_keys {
            lines.push(format!("  {}", self.render_foreign_key(fk)));
        }
        sql.push_str(&lines.join(",\n"));
        sql.push_str("\n)");

        let mut options = Vec::new();
        if let Some(engine) = &table.engine {
            options.push(format!("ENGINE={engine}"));
        }
        if let Some(charset) = &table.charset {
            options.push(format!("DEFAULT CHARSET={charset}"));
        }
        if let Some(collation) = &table.collation {
            options.push(format!("COLLATE={collation}"));
        }
        if !options.is_empty() {
            sql.push(' ');
            sql.push_str(&options.join(" "));
        }
        sql
    }

    #[must_use]
    pub fn add_column_sql(&self, table: &str, column: &ColumnSpec) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.dialect.quote_ident(table),
            self.render_column(column, false)
        )
    }

    #[must_use]
    pub fn add_index_sql(&self, table: &str, index: &IndexSpec) -> String {
        format!("ALTER TABLE {} ADD {}", self.dialect.quote_ident(table), self.render_index(index))
    }

    #[must_use]
    pub fn add_foreign_key_sql(&self, table: &str, fk: &ForeignKeySpec) -> String {
        format!("ALTER TABLE {} ADD {}", self.dialect.quote_ident(table), self.render_foreign_key(fk))
    }

    #[must_use]
    pub fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.dialect.quote_ident(table))
    }

    pub fn create_table_if_not_exists(
        &self,
        table: &TableSpec,
        catalog: &dyn CatalogReader,
    ) -> Result<Option<String>> {
        if catalog.table_exists(&table.name)? {
            return Ok(None);
        }
        Ok(Some(self.create_table_sql(table)))
    }

    pub fn add_column_if_not_exists(
        &self,
        table: &str,
        column: &ColumnSpec,
        catalog: &dyn CatalogReader,
    ) -> Result<Option<String>> {
        if catalog.column_exists(table, &column.name)? {
            return Ok(None);
        }
        Ok(Some(self.add_column_sql(table, column)))
    }

    pub fn add_index_if_not_exists(
        &self,
        table: &str,
        index: &IndexSpec,
        catalog: &dyn CatalogReader,
    ) -> Result<Option<String>> {
        if catalog.index_exists(table, &index.name)? {
            return Ok(None);
        }
        Ok(Some(self.add_index_sql(table, index)))
    }

    pub fn add_unique_index_if_not_exists(
        &self,
        table: &str,
        index: &IndexSpec,
        catalog: &dyn CatalogReader,
    ) -> Result<Option<String>> {
        self.add_index_if_not_exists(table, index, catalog)
    }

    pub fn add_foreign_key_if_not_exists(
        &self,
        table: &str,
        fk: &ForeignKeySpec,
        catalog: &dyn CatalogReader,
    ) -> Result<Option<String>> {
        if catalog.foreign_key_exists(table, &fk.name)? {
            return Ok(None);
        }
        Ok(Some(self.add_foreign_key_sql(table, fk)))
    }

    fn render_column(&self, column: &ColumnSpec, is_primary_key: bool) -> String {
        let rendering = self.dialect.map_type(&column.column_type);
        let serial_override = if column.auto_increment {
            match &column.column_type {
                ColumnType::Integer { bits, .. } => self.dialect.auto_increment_type_override(bits),
                _ => None,
            }
        } else {
            None
        };
        let type_sql = serial_override.map(str::to_string).unwrap_or(rendering.sql);
        let mut parts = vec![self.dialect.quote_ident(&column.name), type_sql];
        if let Some(charset) = &column.charset {
            parts.push(format!("CHARACTER SET {charset}"));
        }
        if let Some(collation) = &column.collation {
            parts.push(format!("COLLATE {collation}"));
        }
        parts.push(if column.nullable && !is_primary_key { "NULL".to_string() } else { "NOT NULL".to_string() });
        if let Some(default) = &column.default {
            parts.push(match default {
                ColumnDefault::Literal(value) => format!("DEFAULT {}", self.dialect.string_literal(value)),
                ColumnDefault::Function(expr) => format!("DEFAULT {expr}"),
                ColumnDefault::Null => "DEFAULT NULL".to_string(),
            });
        }
        if column.auto_increment && serial_override.is_none() {
            if let Some(clause) = self.dialect.auto_increment_clause() {
                parts.push(clause.to_string());
            }
        }
        if column.unique {
            parts.push("UNIQUE".to_string());
        }
        if column.invisible {
            parts.push("INVISIBLE".to_string());
        }
        if let Some(comment) = &column.comment {
            parts.push(format!("COMMENT {}", self.dialect.string_literal(comment)));
        }
        match &column.position {
            Some(ColumnPosition::First) => parts.push("FIRST".to_string()),
            Some(ColumnPosition::After(after)) => {
                parts.push(format!("AFTER {}", self.dialect.quote_ident(after)));
            }
            None => {}
        }
        if let Some(check) = &rendering.trailing_check {
            parts.push(check.replace("__COLUMN__", &self.dialect.quote_ident(&column.name)));
        }
        parts.join(" ")
    }

    fn render_index(&self, index: &IndexSpec) -> String {
        let keyword = match index.kind {
            IndexKind::Index => "INDEX",
            IndexKind::Unique => "UNIQUE INDEX",
            IndexKind::Fulltext => "FULLTEXT INDEX",
            IndexKind::Primary => "PRIMARY KEY",
        };
        let columns = index.columns.iter().map(|c| self.render_index_column(c)).collect::<Vec<_>>().join(", ");
        if matches!(index.kind, IndexKind::Primary) {
            format!("{keyword} ({columns})")
        } else {
            format!("{keyword} {} ({columns})", self.dialect.quote_ident(&index.name))
        }
    }

    fn render_index_column(&self, column: &IndexColumn) -> String {
        let mut rendered = self.dialect.quote_ident(&column.name);
        if let Some(length) = column.length {
            rendered.push_str(&format!("({length})"));
        }
        if matches!(column.direction, SortDirection::Desc) {
            rendered.push_str(" DESC");
        }
        rendered
    }

    fn render_foreign_key(&self, fk: &ForeignKeySpec) -> String {
        let columns = fk.columns.iter().map(|c| self.dialect.quote_ident(c)).collect::<Vec<_>>().join(", ");
        let referenced = fk.referenced_columns.iter().map(|c| self.dialect.quote_ident(c)).collect::<Vec<_>>().join(", ");
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({columns}) REFERENCES {} ({referenced})",
            self.dialect.quote_ident(&fk.name),
            self.dialect.quote_ident(&fk.referenced_table),
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(&format!(" ON DELETE {}", render_fk_action(action)));
        }
        if let Some(action) = fk.on_update {
            sql.push_str(&format!(" ON UPDATE {}", render_fk_action(action)));
        }
        sql
    }
}

fn render_fk_action(action: ForeignKeyAction) -> &'static str {
    match action {
        ForeignKeyAction::NoAction => "NO ACTION",
        ForeignKeyAction::Restrict => "RESTRICT",
        ForeignKeyAction::Cascade => "CASCADE",
        ForeignKeyAction::SetNull => "SET NULL",
        ForeignKeyAction::SetDefault => "SET DEFAULT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PlainDialect;

    #[test]
    fn varchar_out_of_range_is_rejected() {
        let dialect = PlainDialect;
        let mut builder = TableBuilder::new("users", &dialect);
        let column = builder.varchar("name", 0).finish();
        assert!(matches!(builder.add_column(column), Err(BuilderValidation::OutOfRange { .. })));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let dialect = PlainDialect;
        let mut builder = TableBuilder::new("users", &dialect);
        builder.add_column(builder.integer("id", IntegerWidth::Int).finish()).unwrap();
        let dup = builder.integer("id", IntegerWidth::BigInt).finish();
        assert!(matches!(builder.add_column(dup), Err(BuilderValidation::DuplicateColumn { .. })));
    }

    #[test]
    fn auto_increment_on_character_column_is_rejected() {
        let dialect = PlainDialect;
        let mut builder = TableBuilder::new("users", &dialect);
        let mut column = builder.varchar("name", 10).finish();
        column.auto_increment = true;
        assert!(matches!(builder.add_column(column), Err(BuilderValidation::IncompatibleModifier { .. })));
    }

    #[test]
    fn create_table_sql_renders_columns_and_primary_key() {
        let dialect = PlainDialect;
        let schema = SchemaBuilder::new(&dialect);
        let mut table = schema.table("users").if_not_exists();
        table
            .add_column(table.integer("id", IntegerWidth::Int).auto_increment().not_null().finish())
            .unwrap();
        table.add_column(table.varchar("email", 255).not_null().unique().finish()).unwrap();
        let spec = table.primary_key(["id"]).finish().unwrap();
        let sql = schema.create_table_sql(&spec);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS users ("));
        assert!(sql.contains("PRIMARY KEY (id)"));
        assert!(sql.contains("email"));
    }

    struct FakeCatalog {
        tables: Vec<&'static str>,
    }

    impl CatalogReader for FakeCatalog {
        fn table_exists(&self, table: &str) -> Result<bool> {
            Ok(self.tables.contains(&table))
        }

        fn column_exists(&self, _table: &str, _column: &str) -> Result<bool> {
            Ok(false)
        }

        fn index_exists(&self, _table: &str, _index: &str) -> Result<bool> {
            Ok(false)
        }

        fn foreign_key_exists(&self, _table: &str, _name: &str) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn create_table_if_not_exists_skips_known_tables() {
        let dialect = PlainDialect;
        let schema = SchemaBuilder::new(&dialect);
        let mut table = schema.table("users");
        table.add_column(table.integer("id", IntegerWidth::Int).finish()).unwrap();
        let spec = table.finish().unwrap();
        let catalog = FakeCatalog { tables: vec!["users"] };
        assert_eq!(schema.create_table_if_not_exists(&spec, &catalog).unwrap(), None);
    }
}
