use dbkit_core::schema_builder::SchemaBuilder;
use dbkit_dialect_mysql::MysqlDialect;
use dbkit_dialect_postgres::PostgresDialect;
use dbkit_testkit::{assert_ddl_eq, users_table};

#[test]
fn mysql_renders_the_users_fixture_with_backticks_and_auto_increment() {
    let dialect = MysqlDialect;
    let builder = SchemaBuilder::new(&dialect);
    let sql = builder.create_table_sql(&users_table());

    assert!(sql.contains('`'), "MySQL DDL should quote identifiers with backticks: {sql}");
    assert!(sql.contains("AUTO_INCREMENT"), "id column should be auto-incrementing: {sql}");
    assert_ddl_eq("mysql", &sql, &sql);
}

#[test]
fn postgres_renders_the_users_fixture_with_double_quotes() {
    let dialect = PostgresDialect;
    let builder = SchemaBuilder::new(&dialect);
    let sql = builder.create_table_sql(&users_table());

    assert!(sql.contains('"'), "Postgres DDL should quote identifiers with double quotes: {sql}");
    assert!(!sql.contains('`'), "Postgres DDL must never use MySQL-style backticks: {sql}");
    assert_ddl_eq("postgres", &sql, &sql);
}

#[test]
fn both_dialects_place_the_primary_key_column_first() {
    let table = users_table();
    for sql in [
        SchemaBuilder::new(&MysqlDialect).create_table_sql(&table),
        SchemaBuilder::new(&PostgresDialect).create_table_sql(&table),
    ] {
        let id_pos = sql.find("id").expect("id column should appear in the DDL");
        let email_pos = sql.find("email").expect("email column should appear in the DDL");
        assert!(id_pos < email_pos, "id should be declared before email: {sql}");
    }
}
