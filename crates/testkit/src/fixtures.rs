//! Small, composable `TableSpec`/`ColumnSpec` fixtures for dialect and
//! schema tests, standing in for the hand-written tables those tests
//! would otherwise repeat verbatim.

use dbkit_core::ir::{
    ColumnDefault, ColumnSpec, ColumnType, ForeignKeyAction, ForeignKeySpec, IntegerWidth, TableSpec,
};

/// An auto-incrementing `BIGINT` primary key column named `id`.
#[must_use]
pub fn id_column() -> ColumnSpec {
    let mut column = ColumnSpec::new("id", ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: true });
    column.nullable = false;
    column.auto_increment = true;
    column
}

/// `created_at`/`updated_at` timestamp columns defaulting to `CURRENT_TIMESTAMP`.
#[must_use]
pub fn timestamps() -> Vec<ColumnSpec> {
    vec![
        {
            let mut column = ColumnSpec::new("created_at", ColumnType::Timestamp { precision: None });
            column.nullable = false;
            column.default = Some(ColumnDefault::Function("CURRENT_TIMESTAMP".to_string()));
            column
        },
        {
            let mut column = ColumnSpec::new("updated_at", ColumnType::Timestamp { precision: None });
            column.nullable = true;
            column
        },
    ]
}

/// A nullable `BIGINT` foreign key column plus the matching
/// `ForeignKeySpec` referencing `referenced_table.id`, named
/// `<referenced_table singular>_id` by convention (caller passes the
/// exact column name since pluralization rules vary by fixture).
#[must_use]
pub fn belongs_to(column_name: &str, referenced_table: &str) -> (ColumnSpec, ForeignKeySpec) {
    let column = ColumnSpec::new(column_name, ColumnType::Integer { bits: IntegerWidth::BigInt, unsigned: true });
    let foreign_key = ForeignKeySpec {
        name: format!("fk_{column_name}"),
        columns: vec![column_name.to_string()],
        referenced_table: referenced_table.to_string(),
        referenced_columns: vec!["id".to_string()],
        on_delete: Some(ForeignKeyAction::Cascade),
        on_update: Some(ForeignKeyAction::NoAction),
    };
    (column, foreign_key)
}

/// A representative `users` table: an id primary key, a unique email,
/// and the standard timestamp pair. Used across dialect conformance
/// tests and backup/restore fixtures that just need "some table".
#[must_use]
pub fn users_table() -> TableSpec {
    let mut email = ColumnSpec::new("email", ColumnType::Varchar { length: 255 });
    email.nullable = false;
    email.unique = true;

    let mut table = TableSpec::new("users");
    table.columns.push(id_column());
    table.columns.push(email);
    table.columns.extend(timestamps());
    table.primary_key = vec!["id".to_string()];
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_table_has_an_id_primary_key_and_a_unique_email() {
        let table = users_table();
        assert_eq!(table.primary_key, vec!["id".to_string()]);
        assert!(table.column("email").unwrap().unique);
        assert!(table.has_column("created_at"));
    }

    #[test]
    fn belongs_to_names_the_foreign_key_after_the_column() {
        let (column, fk) = belongs_to("author_id", "users");
        assert_eq!(column.name, "author_id");
        assert_eq!(fk.name, "fk_author_id");
        assert_eq!(fk.referenced_table, "users");
        assert_eq!(fk.referenced_columns, vec!["id".to_string()]);
    }
}
