use crate::error::CatalogError;
use crate::relation::Projection;
use sql::parser::{parse_column_name, parse_select_columns, parse_select_dependencies};
use sql::SqlStatement;

/// A parsed SELECT: its text, the relations it reads and the expressions it
/// projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    statement: SqlStatement,
    dependencies: Vec<String>,
    columns: Vec<String>,
}

impl SelectStatement {
    pub fn new(sql: &str) -> Result<Self, CatalogError> {
        let statement = SqlStatement::new(sql)?;
        let dependencies = parse_select_dependencies(statement.sql())?;
        let columns = parse_select_columns(statement.sql())?;
        Ok(Self {
            statement,
            dependencies,
            columns,
        })
    }

    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Projected expressions as written.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Projection for SelectStatement {
    fn from_expression(&self) -> String {
        format!("({}) AS source", self.sql())
    }

    fn qualifier(&self) -> String {
        "source".to_string()
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Result<Vec<String>, CatalogError> {
        self.columns
            .iter()
            .map(|c| parse_column_name(c).map_err(CatalogError::from))
            .collect()
    }
}
