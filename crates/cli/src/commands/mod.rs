pub mod pipeline;
pub mod sql;

pub use pipeline::{handle_pipeline, PipelineSubcommand};
pub use sql::{handle_sql, SqlSubcommand};
