pub mod error;
pub mod parser;
pub mod sanitize;
mod script;
mod statement;

pub use error::SqlError;
pub use script::SqlScript;
pub use statement::SqlStatement;
