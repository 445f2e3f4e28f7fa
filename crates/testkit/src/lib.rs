//! Fixture builders and a golden-DDL assertion harness shared by the
//! dialect and schema crates' test suites.

mod fixtures;
mod golden;

pub use fixtures::{belongs_to, id_column, timestamps, users_table};
pub use golden::{assert_ddl_eq, normalize_sql};
