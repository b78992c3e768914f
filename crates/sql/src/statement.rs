use crate::error::SqlError;
use crate::parser::{parse_create_table, parse_create_view};
use crate::sanitize::sanitize_sql;
use std::fmt;

/// One sanitized SQL statement, stored without its trailing `;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlStatement {
    sql: String,
}

impl SqlStatement {
    /// Sanitize `sql` and require that exactly one statement remains.
    pub fn new(sql: &str) -> Result<Self, SqlError> {
        let mut statements = sanitize_sql(sql, true);
        match statements.len() {
            1 => Ok(Self {
                sql: statements.remove(0),
            }),
            0 => Err(SqlError::structure("empty SQL statement")),
            n => Err(SqlError::structure(format!(
                "expected a single statement, found {n} in '{sql}'"
            ))),
        }
    }

    /// Wrap text that is already sanitized.
    pub(crate) fn from_sanitized(sql: String) -> Self {
        Self { sql }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn creates_table(&self) -> bool {
        parse_create_table(&self.sql).is_ok()
    }

    pub fn creates_view(&self) -> bool {
        parse_create_view(&self.sql).is_ok()
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_statement_is_accepted() {
        let stmt = SqlStatement::new("-- header\nSELECT 1;\n").unwrap();
        assert_eq!(stmt.sql(), "SELECT 1");
        assert_eq!(stmt.to_string(), "SELECT 1;");
    }

    #[test]
    fn multiple_statements_are_rejected() {
        assert!(matches!(
            SqlStatement::new("SELECT 1; SELECT 2;"),
            Err(SqlError::Structure { .. })
        ));
        assert!(SqlStatement::new("-- only a comment").is_err());
    }

    #[test]
    fn recognises_ddl_kind() {
        let table = SqlStatement::new("CREATE TABLE a (id INTEGER)").unwrap();
        assert!(table.creates_table());
        assert!(!table.creates_view());

        let view = SqlStatement::new("CREATE VIEW v AS (SELECT id FROM a)").unwrap();
        assert!(view.creates_view());
        assert!(!view.creates_table());
    }
}
