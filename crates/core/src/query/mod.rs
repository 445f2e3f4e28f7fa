pub mod case;
pub mod delete;
pub mod fragment;
pub mod insert;
pub mod plan;
pub mod select;
pub mod update;
pub mod window;

pub use case::{CaseExpression, CaseResult};
pub use delete::{DeleteBuilder, DeletePlan};
pub use fragment::{FragmentWriter, RenderContext, SqlFragment};
pub use insert::{InsertBuilder, InsertPlan};
pub use plan::QueryPlan;
pub use select::{
    FromSource, Join, JoinKind, NamedWindow, ProjectionItem, SelectBuilder, SelectPlan,
};
pub use update::{UpdateBuilder, UpdatePlan};
pub use window::{OverClause, SortDirection, WindowFunction, WindowSpec};
