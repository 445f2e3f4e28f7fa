use dbkit_core::ir::{ColumnSpec, ForeignKeySpec, IndexSpec, TableSpec};

/// A table as reflected from a live database (spec.md §4.C8): the same
/// shape the Schema Builder emits DDL from, minus the builder-only
/// `if_not_exists` flag.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedTable {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub indexes: Vec<IndexSpec>,
    pub foreign_keys: Vec<ForeignKeySpec>,
    pub primary_key: Vec<String>,
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

impl AnalyzedTable {
    #[must_use]
    pub fn to_table_spec(&self) -> TableSpec {
        TableSpec {
            name: self.name.clone(),
            columns: self.columns.clone(),
            indexes: self.indexes.clone(),
            foreign_keys: self.foreign_keys.clone(),
            primary_key: self.primary_key.clone(),
            engine: self.engine.clone(),
            charset: self.charset.clone(),
            collation: self.collation.clone(),
            if_not_exists: false,
        }
    }

    fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys.iter().map(|fk| fk.referenced_table.as_str()).filter(move |referenced| *referenced != self.name)
    }
}

/// Orders `tables` so every table's foreign-key dependencies come before
/// it (spec.md §4.C8, testable property #5). Cycles are tolerated: a
/// table already on the current DFS stack is treated as satisfied, a
/// warning is logged, and ordering falls back to input order within the
/// cycle rather than looping forever.
#[must_use]
pub fn topological_order(tables: &[AnalyzedTable]) -> Vec<&AnalyzedTable> {
    let mut by_name = std::collections::HashMap::new();
    for (index, table) in tables.iter().enumerate() {
        by_name.insert(table.name.as_str(), index);
    }

    let mut visited = vec![false; tables.len()];
    let mut on_stack = vec![false; tables.len()];
    let mut order = Vec::with_capacity(tables.len());

    fn visit<'a>(
        index: usize,
        tables: &'a [AnalyzedTable],
        by_name: &std::collections::HashMap<&str, usize>,
        visited: &mut [bool],
        on_stack: &mut [bool],
        order: &mut Vec<&'a AnalyzedTable>,
    ) {
        if visited[index] {
            return;
        }
        visited[index] = true;
        on_stack[index] = true;
        for dependency in tables[index].dependencies() {
            if let Some(&dep_index) = by_name.get(dependency) {
                if on_stack[dep_index] {
                    log::warn!(
                        "foreign key cycle detected between `{}` and `{}`; emitting in input order",
                        tables[index].name,
                        tables[dep_index].name
                    );
                    continue;
                }
                visit(dep_index, tables, by_name, visited, on_stack, order);
            }
        }
        on_stack[index] = false;
        order.push(&tables[index]);
    }

    for index in 0..tables.len() {
        visit(index, tables, &by_name, &mut visited, &mut on_stack, &mut order);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbkit_core::ir::{ColumnSpec, ColumnType, ForeignKeySpec, IntegerWidth};

    fn table(name: &str, references: &[&str]) -> AnalyzedTable {
        AnalyzedTable {
            name: name.to_string(),
            columns: vec![ColumnSpec::new("id", ColumnType::Integer { bits: IntegerWidth::Int, unsigned: false })],
            indexes: Vec::new(),
            foreign_keys: references
                .iter()
                .enumerate()
                .map(|(i, referenced)| ForeignKeySpec {
                    name: format!("fk_{name}_{i}"),
                    columns: vec!["id".to_string()],
                    referenced_table: (*referenced).to_string(),
                    referenced_columns: vec!["id".to_string()],
                    on_delete: None,
                    on_update: None,
                })
                .collect(),
            primary_key: vec!["id".to_string()],
            engine: None,
            charset: None,
            collation: None,
        }
    }

    #[test]
    fn dependencies_come_before_dependents() {
        let tables = vec![table("orders", &["users"]), table("users", &[])];
        let order = topological_order(&tables);
        let names: Vec<_> = order.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "orders"]);
    }

    #[test]
    fn cycles_do_not_infinite_loop() {
        let tables = vec![table("a", &["b"]), table("b", &["a"])];
        let order = topological_order(&tables);
        assert_eq!(order.len(), 2);
    }
}
