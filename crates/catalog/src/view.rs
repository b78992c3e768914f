use crate::error::CatalogError;
use crate::relation::{Projection, Relation, RelationKind};
use crate::select::SelectStatement;
use sql::parser::parse_create_view;
use sql::{SqlScript, SqlStatement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    statement: SqlStatement,
    full_name: String,
    or_replace: bool,
    select: SelectStatement,
}

impl View {
    pub fn new(sql: &str) -> Result<Self, CatalogError> {
        Self::from_statement(SqlStatement::new(sql)?)
    }

    pub fn from_script(script: &SqlScript) -> Result<Self, CatalogError> {
        match script.statements() {
            [statement] => Self::from_statement(statement.clone()),
            other => Err(CatalogError::unsupported(format!(
                "a view script must hold one CREATE VIEW, found {} statements",
                other.len()
            ))),
        }
    }

    pub fn from_statement(statement: SqlStatement) -> Result<Self, CatalogError> {
        let def = parse_create_view(statement.sql())?;
        let select = SelectStatement::new(&def.select_statement)?;
        Ok(Self {
            statement,
            full_name: def.view_name,
            or_replace: def.or_replace,
            select,
        })
    }

    pub fn or_replace(&self) -> bool {
        self.or_replace
    }

    pub fn select(&self) -> &SelectStatement {
        &self.select
    }
}

impl Relation for View {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn kind(&self) -> RelationKind {
        RelationKind::View
    }

    fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    fn dependencies(&self) -> Vec<String> {
        self.select.dependencies().to_vec()
    }
}

impl Projection for View {
    fn from_expression(&self) -> String {
        self.full_name.clone()
    }

    fn qualifier(&self) -> String {
        self.full_name.clone()
    }

    fn column_count(&self) -> usize {
        self.select.column_count()
    }

    fn column_names(&self) -> Result<Vec<String>, CatalogError> {
        self.select.column_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_dependencies_come_from_its_select() {
        let view = View::new(
            "CREATE OR REPLACE VIEW reporting.active AS (SELECT c.id, c.name AS customer FROM customers c LEFT JOIN churn ch ON ch.id = c.id WHERE ch.id IS NULL)",
        )
        .unwrap();
        assert!(view.or_replace());
        assert_eq!(view.full_name(), "reporting.active");
        assert_eq!(view.dependencies(), vec!["customers", "churn"]);
        assert_eq!(view.column_names().unwrap(), vec!["id", "customer"]);
        assert_eq!(
            view.drop_script().sql(),
            "DROP VIEW IF EXISTS reporting.active CASCADE;"
        );
    }

    #[test]
    fn tables_are_not_views() {
        assert!(View::new("CREATE TABLE t (a INT)").is_err());
    }
}
