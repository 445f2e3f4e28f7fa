use dbkit_core::dialect::Dialect;
use dbkit_core::ir::TableSpec;
use dbkit_core::schema_builder::SchemaBuilder;

use crate::analyzed::{topological_order, AnalyzedTable};

/// Controls how `generate` splits and annotates its output (spec.md
/// §4.C9).
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Emit one [`MigrationArtifact`] per `tables_per_file` tables
    /// instead of a single artifact covering every table.
    pub split: bool,
    pub tables_per_file: usize,
    /// Prefixed as a SQL comment at the top of every artifact's `up`.
    pub comment: Option<String>,
    /// Use the input order verbatim instead of the dependency-sorted one.
    pub preserve_order: bool,
    pub generate_indexes: bool,
    pub generate_foreign_keys: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            split: false,
            tables_per_file: 1,
            comment: None,
            preserve_order: false,
            generate_indexes: true,
            generate_foreign_keys: true,
        }
    }
}

/// One migration file's worth of DDL (spec.md §4.C9). `second_offset`
/// increases monotonically across the artifacts `generate` returns so a
/// caller building timestamp-prefixed filenames (`{base + offset}_{name}.sql`)
/// never collides even when every artifact is generated in the same second.
#[derive(Debug, Clone)]
pub struct MigrationArtifact {
    pub name: String,
    pub second_offset: u64,
    pub up: Vec<String>,
    pub down: Vec<String>,
}

/// Produces dependency-ordered `CREATE TABLE` migrations for `tables`,
/// with a second pass emitting `ALTER TABLE ... ADD CONSTRAINT`
/// foreign keys once every table exists, so forward references between
/// tables never block a single artifact from applying cleanly (spec.md
/// §4.C9).
#[must_use]
pub fn generate(tables: &[AnalyzedTable], dialect: &dyn Dialect, options: &GeneratorOptions) -> Vec<MigrationArtifact> {
    let ordered: Vec<&AnalyzedTable> =
        if options.preserve_order { tables.iter().collect() } else { topological_order(tables) };

    let builder = SchemaBuilder::new(dialect);
    let chunk_size = options.tables_per_file.max(1);
    let chunks: Vec<&[&AnalyzedTable]> =
        if options.split { ordered.chunks(chunk_size).collect() } else { vec![ordered.as_slice()] };

    let mut artifacts = Vec::with_capacity(chunks.len());
    for (offset, chunk) in chunks.into_iter().enumerate() {
        let mut up = Vec::new();
        let mut down = Vec::new();
        if let Some(comment) = &options.comment {
            up.push(format!("-- {comment}"));
        }

        for table in chunk {
            let mut spec = bare_table_spec(table, options.generate_indexes);
            spec.if_not_exists = true;
            up.push(builder.create_table_sql(&spec));
        }

        if options.generate_foreign_keys {
            for table in chunk {
                for fk in &table.foreign_keys {
                    up.push(builder.add_foreign_key_sql(&table.name, fk));
                }
            }
        }

        for table in chunk.iter().rev() {
            down.push(builder.drop_table_sql(&table.name));
        }

        let name = chunk.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join("_");
        artifacts.push(MigrationArtifact {
            name: format!("create_{name}"),
            second_offset: offset as u64,
            up,
            down,
        });
    }
    artifacts
}

fn bare_table_spec(table: &AnalyzedTable, generate_indexes: bool) -> TableSpec {
    let mut spec = table.to_table_spec();
    spec.foreign_keys.clear();
    if !generate_indexes {
        spec.indexes.clear();
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbkit_core::ir::{ColumnSpec, ColumnType, ForeignKeySpec, IntegerWidth};
    use dbkit_core::test_support::PlainDialect;

    fn table(name: &str, references: Option<&str>) -> AnalyzedTable {
        AnalyzedTable {
            name: name.to_string(),
            columns: vec![ColumnSpec::new("id", ColumnType::Integer { bits: IntegerWidth::Int, unsigned: false })],
            indexes: Vec::new(),
            foreign_keys: references
                .map(|referenced| {
                    vec![ForeignKeySpec {
                        name: format!("fk_{name}"),
                        columns: vec!["id".to_string()],
                        referenced_table: referenced.to_string(),
                        referenced_columns: vec!["id".to_string()],
                        on_delete: None,
                        on_update: None,
                    }]
                })
                .unwrap_or_default(),
            primary_key: vec!["id".to_string()],
            engine: None,
            charset: None,
            collation: None,
        }
    }

    #[test]
    fn single_artifact_creates_in_dependency_order_then_adds_foreign_keys() {
        let dialect = PlainDialect;
        let tables = vec![table("orders", Some("users")), table("users", None)];
        let artifacts = generate(&tables, &dialect, &GeneratorOptions::default());
        assert_eq!(artifacts.len(), 1);
        let up = &artifacts[0].up;
        let users_pos = up.iter().position(|s| s.contains("users")).unwrap();
        let orders_pos = up.iter().position(|s| s.contains("CREATE TABLE") && s.contains("orders")).unwrap();
        assert!(users_pos < orders_pos);
        assert!(up.iter().any(|s| s.starts_with("ALTER TABLE") && s.contains("FOREIGN KEY")));
    }

    #[test]
    fn split_option_produces_one_artifact_per_chunk_with_increasing_offsets() {
        let dialect = PlainDialect;
        let tables = vec![table("a", None), table("b", None), table("c", None)];
        let options = GeneratorOptions { split: true, tables_per_file: 1, ..GeneratorOptions::default() };
        let artifacts = generate(&tables, &dialect, &options);
        assert_eq!(artifacts.len(), 3);
        assert_eq!(artifacts.iter().map(|a| a.second_offset).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn down_steps_drop_in_reverse_order() {
        let dialect = PlainDialect;
        let tables = vec![table("orders", Some("users")), table("users", None)];
        let artifacts = generate(&tables, &dialect, &GeneratorOptions::default());
        assert_eq!(artifacts[0].down, vec!["DROP TABLE orders", "DROP TABLE users"]);
    }
}
