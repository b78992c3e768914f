//! Relational model of the warehouse objects a pipeline touches, and the
//! SQL generated from it.

mod column;
mod database;
pub mod error;
mod history;
mod relation;
mod select;
mod table;
mod view;

pub use column::Column;
pub use database::{Database, DbRelation};
pub use error::CatalogError;
pub use history::{HistoryTable, EFFECTIVE_COLUMN, EXPIRATION_COLUMN, MAX_TIMESTAMP};
pub use relation::{grant_script, Projection, Relation, RelationKind};
pub use select::SelectStatement;
pub use table::{ForeignKey, Table};
pub use view::View;
