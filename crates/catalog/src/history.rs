use crate::column::Column;
use crate::error::CatalogError;
use crate::relation::{Relation, RelationKind};
use crate::table::{clone_sql, Table};
use sql::{SqlScript, SqlStatement};

/// Sentinel expiration of rows that are currently effective.
pub const MAX_TIMESTAMP: &str = "9999-12-31 23:59:59.999999";
pub const EFFECTIVE_COLUMN: &str = "effective_ts";
pub const EXPIRATION_COLUMN: &str = "expiration_ts";

const NOW: &str = "SYSDATE";
const JUST_BEFORE_NOW: &str = "SYSDATE - INTERVAL '0.000001 seconds'";

/// Slowly-changing-dimension table. Its first two columns are
/// `effective_ts` and `expiration_ts`, both timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTable {
    table: Table,
}

fn is_timestamp_column(column: Option<&Column>, name: &str) -> bool {
    column.is_some_and(|c| {
        c.name().eq_ignore_ascii_case(name)
            && c.column_type().to_ascii_uppercase().starts_with("TIMESTAMP")
    })
}

impl HistoryTable {
    pub fn new(sql: &str) -> Result<Self, CatalogError> {
        Self::from_table(Table::new(sql)?)
    }

    pub fn from_table(table: Table) -> Result<Self, CatalogError> {
        let columns = table.columns();
        if !is_timestamp_column(columns.first(), EFFECTIVE_COLUMN)
            || !is_timestamp_column(columns.get(1), EXPIRATION_COLUMN)
        {
            return Err(CatalogError::structure(format!(
                "history table '{}' must start with {EFFECTIVE_COLUMN} TIMESTAMP, {EXPIRATION_COLUMN} TIMESTAMP",
                table.full_name()
            )));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Fold the current snapshot `source` into the history:
    /// changed and vanished rows are expired, new versions inserted.
    pub fn update_history_script(&self, source: &Table) -> Result<SqlScript, CatalogError> {
        let history = self.table.full_name();
        let snapshot = source.full_name();

        let keys: Vec<&str> = source.primary_keys().iter().map(String::as_str).collect();
        if keys.is_empty() {
            return Err(CatalogError::structure(format!(
                "history source '{snapshot}' has no primary key"
            )));
        }
        let values: Vec<&str> = source
            .non_primary_key_columns()
            .into_iter()
            .map(Column::name)
            .collect();
        if values.is_empty() {
            return Err(CatalogError::structure(format!(
                "history source '{snapshot}' has no non-key columns to track"
            )));
        }
        for name in source.column_names() {
            if self.table.column(name).is_none() {
                return Err(CatalogError::structure(format!(
                    "history table '{history}' has no column '{name}' from '{snapshot}'"
                )));
            }
        }

        let temp = source.temporary_name();
        let current = format!("{history}.{EXPIRATION_COLUMN} = '{MAX_TIMESTAMP}'");
        let key_match = |left: &str, right: &str| {
            keys.iter()
                .map(|k| format!("{left}.{k} = {right}.{k}"))
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        let changed = values
            .iter()
            .map(|c| {
                format!(
                    "{history}.{c} <> {snapshot}.{c} \
                     OR ({history}.{c} IS NULL AND {snapshot}.{c} IS NOT NULL) \
                     OR ({history}.{c} IS NOT NULL AND {snapshot}.{c} IS NULL)"
                )
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let key_list = keys.join(", ");
        let source_columns = source.column_names().join(", ");

        let mut script = SqlScript::new(&clone_sql(&temp, source.columns()));
        script.append_sql(&format!("INSERT INTO {temp} (SELECT * FROM {snapshot});"));
        script.append_sql(&format!(
            "UPDATE {history} SET {EXPIRATION_COLUMN} = {JUST_BEFORE_NOW} FROM {snapshot} \
             WHERE {} AND ({changed}) AND {current};",
            key_match(history, snapshot)
        ));
        script.append_sql(&format!(
            "UPDATE {history} SET {EXPIRATION_COLUMN} = {JUST_BEFORE_NOW} \
             WHERE ({key_list}) NOT IN (SELECT {key_list} FROM {snapshot}) AND {current};"
        ));
        script.append_sql(&format!(
            "DELETE FROM {temp} USING {history} WHERE {} AND {current};",
            key_match(temp.as_str(), history)
        ));
        script.append_sql(&format!(
            "INSERT INTO {history} ({EFFECTIVE_COLUMN}, {EXPIRATION_COLUMN}, {source_columns}) \
             SELECT {NOW}, '{MAX_TIMESTAMP}', {source_columns} FROM {temp};"
        ));
        script.append_sql(&format!("DROP TABLE {temp};"));
        Ok(script)
    }
}

impl Relation for HistoryTable {
    fn full_name(&self) -> &str {
        self.table.full_name()
    }

    fn kind(&self) -> RelationKind {
        RelationKind::Table
    }

    fn statement(&self) -> &SqlStatement {
        self.table.statement()
    }

    fn dependencies(&self) -> Vec<String> {
        self.table.dependencies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_timestamp_prefix_columns() {
        assert!(HistoryTable::new("CREATE TABLE h (id INT, effective_ts TIMESTAMP)").is_err());
        assert!(HistoryTable::new(
            "CREATE TABLE h (effective_ts TIMESTAMP, expiration_ts DATE, id INT)"
        )
        .is_err());
        assert!(HistoryTable::new(
            "CREATE TABLE h (effective_ts TIMESTAMP, expiration_ts TIMESTAMP, id INT)"
        )
        .is_ok());
    }

    #[test]
    fn source_without_tracked_columns_is_rejected() {
        let history = HistoryTable::new(
            "CREATE TABLE h (effective_ts TIMESTAMP, expiration_ts TIMESTAMP, id INT)",
        )
        .unwrap();
        let keys_only = Table::new("CREATE TABLE s (id INT PRIMARY KEY)").unwrap();
        assert!(history.update_history_script(&keys_only).is_err());
        let no_key = Table::new("CREATE TABLE s (id INT)").unwrap();
        assert!(history.update_history_script(&no_key).is_err());
    }
}
