use crate::error::SqlError;
use crate::parser::{parse_create_table, parse_create_view, CreateTableDef, CreateViewDef};
use crate::sanitize::sanitize_sql;
use crate::statement::SqlStatement;
use log::debug;
use std::fmt;
use std::fs;
use std::path::Path;

/// Ordered list of sanitized statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlScript {
    statements: Vec<SqlStatement>,
}

impl SqlScript {
    pub fn new(sql: &str) -> Self {
        Self {
            statements: sanitize_sql(sql, true)
                .into_iter()
                .map(SqlStatement::from_sanitized)
                .collect(),
        }
    }

    pub fn from_statements(statements: impl IntoIterator<Item = SqlStatement>) -> Self {
        Self {
            statements: statements.into_iter().collect(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SqlError> {
        let path = path.as_ref();
        debug!("reading SQL script {}", path.display());
        let raw = fs::read_to_string(path)
            .map_err(|e| SqlError::io(format!("reading {}", path.display()), e))?;
        Ok(Self::new(&raw))
    }

    pub fn statements(&self) -> &[SqlStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn push(&mut self, statement: SqlStatement) {
        self.statements.push(statement);
    }

    pub fn append(&mut self, other: SqlScript) {
        self.statements.extend(other.statements);
    }

    /// Append raw SQL text, sanitizing it first.
    pub fn append_sql(&mut self, sql: &str) {
        self.append(SqlScript::new(sql));
    }

    /// Same statements between `BEGIN;` and `COMMIT;`. A script that already
    /// carries the wrapper is returned unchanged.
    pub fn wrap_transaction(&self) -> SqlScript {
        if self.is_transaction() {
            return self.clone();
        }
        let mut statements = Vec::with_capacity(self.statements.len() + 2);
        statements.push(SqlStatement::from_sanitized("BEGIN".to_string()));
        statements.extend(self.statements.iter().cloned());
        statements.push(SqlStatement::from_sanitized("COMMIT".to_string()));
        SqlScript { statements }
    }

    fn is_transaction(&self) -> bool {
        matches!(
            (self.statements.first(), self.statements.last()),
            (Some(first), Some(last))
                if self.statements.len() >= 2
                    && first.sql().eq_ignore_ascii_case("BEGIN")
                    && last.sql().eq_ignore_ascii_case("COMMIT")
        )
    }

    /// The script's single statement parsed as a CREATE TABLE.
    pub fn create_table(&self) -> Result<CreateTableDef, SqlError> {
        parse_create_table(self.single_statement()?.sql())
    }

    /// The script's single statement parsed as a CREATE VIEW.
    pub fn create_view(&self) -> Result<CreateViewDef, SqlError> {
        parse_create_view(self.single_statement()?.sql())
    }

    pub fn creates_table(&self) -> bool {
        self.create_table().is_ok()
    }

    pub fn creates_view(&self) -> bool {
        self.create_view().is_ok()
    }

    fn single_statement(&self) -> Result<&SqlStatement, SqlError> {
        match self.statements.as_slice() {
            [only] => Ok(only),
            other => Err(SqlError::structure(format!(
                "expected a single statement, script has {}",
                other.len()
            ))),
        }
    }

    /// Script text, one statement per line.
    pub fn sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SqlScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

impl From<SqlStatement> for SqlScript {
    fn from(statement: SqlStatement) -> Self {
        SqlScript {
            statements: vec![statement],
        }
    }
}
