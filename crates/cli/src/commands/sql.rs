use catalog::{Database, DbRelation, Relation};
use clap::{Args, Subcommand};
use common::error::DuctError;
use log::debug;
use sql::SqlScript;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum SqlSubcommand {
    /// Sanitize and parse SQL files, listing the relations they create
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
    /// Also print the CREATE statements in dependency order
    #[arg(long)]
    pub order: bool,
}

pub fn handle_sql(cmd: &SqlSubcommand) -> Result<(), DuctError> {
    match cmd {
        SqlSubcommand::Parse(args) => {
            let (lines, relations) = describe(&args.files)?;
            println!("{}", lines.join("\n"));
            if args.order {
                let database = Database::from_relations(relations).map_err(DuctError::compile)?;
                for relation in database.sorted_relations().map_err(DuctError::compile)? {
                    println!("{}", relation.statement());
                }
            }
            Ok(())
        }
    }
}

/// One line per statement; CREATE statements are parsed into relations.
pub fn describe(files: &[PathBuf]) -> Result<(Vec<String>, Vec<DbRelation>), DuctError> {
    let mut lines = vec![];
    let mut relations = vec![];
    for file in files {
        debug!("parsing {}", file.display());
        let script = SqlScript::from_file(file).map_err(DuctError::compile)?;
        for statement in script.statements() {
            if !(statement.creates_table() || statement.creates_view()) {
                lines.push(format!("STATEMENT {}", statement.sql()));
                continue;
            }
            let relation = DbRelation::from_statement(statement).map_err(DuctError::compile)?;
            let mut line = format!("{} {}", relation.kind(), relation.full_name());
            if let DbRelation::Table(table) = &relation {
                line.push_str(&format!(
                    " columns [{}] primary key [{}]",
                    table.column_names().join(", "),
                    table.primary_keys().join(", ")
                ));
            }
            line.push_str(&format!(" depends on [{}]", relation.dependencies().join(", ")));
            lines.push(line);
            relations.push(relation);
        }
    }
    Ok((lines, relations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixture_dir;

    #[test]
    fn describes_tables_views_and_other_statements() {
        let dir = fixture_dir(&[(
            "schema.sql",
            "-- reporting
CREATE VIEW reporting.big_orders AS SELECT id FROM sales.orders WHERE total > 100;
CREATE TABLE sales.orders (id INTEGER PRIMARY KEY, total INTEGER);
GRANT SELECT ON sales.orders TO GROUP analysts;",
        )]);
        let (lines, relations) = describe(&[dir.path().join("schema.sql")]).unwrap();
        assert_eq!(
            lines,
            vec![
                "VIEW reporting.big_orders depends on [sales.orders]",
                "TABLE sales.orders columns [id, total] primary key [id] depends on []",
                "STATEMENT GRANT SELECT ON sales.orders TO GROUP analysts",
            ]
        );

        let database = Database::from_relations(relations).unwrap();
        let order: Vec<&str> = database
            .sorted_relations()
            .unwrap()
            .into_iter()
            .map(|r| r.full_name())
            .collect();
        assert_eq!(order, vec!["sales.orders", "reporting.big_orders"]);
    }
}
