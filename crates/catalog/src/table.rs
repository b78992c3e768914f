use crate::column::Column;
use crate::error::CatalogError;
use crate::relation::{Projection, Relation, RelationKind};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use sql::parser::{parse_create_table, DistStyle, ForeignKeyRef, TableConstraint};
use sql::{SqlScript, SqlStatement};

static CREATE_TABLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*CREATE\s+((?:TEMP|TEMPORARY)\s+)?TABLE\s+(IF\s+NOT\s+EXISTS\s+)?")
        .expect("create table prefix regex")
});

static CREATE_TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(\s*CREATE\s+(?:(?:TEMP|TEMPORARY)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?)([^\s(]+)",
    )
    .expect("create table name regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub reference: ForeignKeyRef,
}

/// A table parsed from its CREATE TABLE statement.
///
/// Column-level and table-level keys are unioned at construction: every
/// primary-key column is flagged (and so `NOT NULL`), and `dist_keys` /
/// `sort_keys` hold each key once, table-level order first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    statement: SqlStatement,
    full_name: String,
    temporary: bool,
    if_not_exists: bool,
    columns: Vec<Column>,
    primary_keys: Vec<String>,
    foreign_keys: Vec<ForeignKey>,
    dist_keys: Vec<String>,
    sort_keys: Vec<String>,
    diststyle: Option<DistStyle>,
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

impl Table {
    pub fn new(sql: &str) -> Result<Self, CatalogError> {
        Self::from_statement(SqlStatement::new(sql)?)
    }

    pub fn from_script(script: &SqlScript) -> Result<Self, CatalogError> {
        match script.statements() {
            [statement] => Self::from_statement(statement.clone()),
            other => Err(CatalogError::unsupported(format!(
                "a table script must hold one CREATE TABLE, found {} statements",
                other.len()
            ))),
        }
    }

    pub fn from_statement(statement: SqlStatement) -> Result<Self, CatalogError> {
        let def = parse_create_table(statement.sql())?;
        let columns = def
            .columns
            .iter()
            .map(Column::from_def)
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = Table {
            statement,
            full_name: def.full_name,
            temporary: def.temporary,
            if_not_exists: def.if_not_exists,
            columns,
            primary_keys: vec![],
            foreign_keys: vec![],
            dist_keys: vec![],
            sort_keys: vec![],
            diststyle: def.diststyle,
        };

        for column in &table.columns {
            if let Some(reference) = column.fk_reference() {
                table.foreign_keys.push(ForeignKey {
                    columns: vec![column.name().to_string()],
                    reference: reference.clone(),
                });
            }
        }

        let column_level_pks: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.is_primary())
            .map(|c| c.name().to_string())
            .collect();
        for name in &column_level_pks {
            push_unique(&mut table.primary_keys, name);
        }

        for constraint in def.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns } => {
                    for name in &columns {
                        table.column_mut(name)?.set_primary();
                        push_unique(&mut table.primary_keys, name);
                    }
                }
                TableConstraint::ForeignKey { columns, reference } => {
                    for name in &columns {
                        table.column_mut(name)?;
                    }
                    table.foreign_keys.push(ForeignKey { columns, reference });
                }
            }
        }

        let column_distkeys = names_where(&table.columns, Column::is_distkey);
        for name in def.distkey.iter().chain(&column_distkeys) {
            table.column_mut(name)?.mark_distkey();
            push_unique(&mut table.dist_keys, name);
        }
        let column_sortkeys = names_where(&table.columns, Column::is_sortkey);
        for name in def.sortkey.iter().chain(&column_sortkeys) {
            table.column_mut(name)?.mark_sortkey();
            push_unique(&mut table.sort_keys, name);
        }

        debug!(
            "parsed table {} with {} columns, primary keys {:?}",
            table.full_name,
            table.columns.len(),
            table.primary_keys
        );
        Ok(table)
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column, CatalogError> {
        let table = self.full_name.clone();
        self.columns
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| {
                CatalogError::structure(format!("table '{table}' has no column named '{name}'"))
            })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_keys
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    pub fn non_primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| !c.is_primary()).collect()
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn dist_keys(&self) -> &[String] {
        &self.dist_keys
    }

    pub fn sort_keys(&self) -> &[String] {
        &self.sort_keys
    }

    pub fn diststyle(&self) -> Option<DistStyle> {
        self.diststyle
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }

    /// Name of the schema-only temporary clone. Temporary tables cannot live
    /// in a schema, so the schema is folded into the name.
    pub fn temporary_name(&self) -> String {
        format!("{}_temp", self.full_name.replace('.', "_"))
    }

    fn require_primary_keys(&self, purpose: &str) -> Result<(), CatalogError> {
        if self.primary_keys.is_empty() {
            return Err(CatalogError::structure(format!(
                "{purpose} needs a primary key but table '{}' has none",
                self.full_name
            )));
        }
        Ok(())
    }

    /// The original CREATE with `IF NOT EXISTS` added when missing.
    pub fn create_if_not_exists_script(&self) -> SqlScript {
        let sql = CREATE_TABLE_PREFIX.replace(self.statement.sql(), |caps: &regex::Captures| {
            let temporary = caps.get(1).map_or("", |m| m.as_str());
            format!("CREATE {temporary}TABLE IF NOT EXISTS ")
        });
        SqlScript::new(&sql)
    }

    /// Same definition under another name, e.g. a staging copy.
    pub fn renamed(&self, name: &str) -> Result<Table, CatalogError> {
        let sql = CREATE_TABLE_NAME.replace(self.statement.sql(), |caps: &regex::Captures| {
            format!("{}{}", &caps[1], name)
        });
        Table::new(&sql)
    }

    /// `CREATE TEMPORARY TABLE <name>_temp (cols)`: schema only, no keys.
    pub fn temporary_clone_script(&self) -> SqlScript {
        SqlScript::new(&clone_sql(&self.temporary_name(), &self.columns))
    }

    /// `INSERT INTO self (SELECT * FROM source)`.
    pub fn insert_script(&self, source: &dyn Projection) -> Result<SqlScript, CatalogError> {
        Ok(SqlScript::new(&insert_sql(
            &self.full_name,
            self.columns.len(),
            source,
        )?))
    }

    /// Delete the rows of `self` whose primary key appears in `source`. The
    /// i-th projected column of `source` is matched against the i-th key.
    pub fn delete_matching_rows_script(
        &self,
        source: &dyn Projection,
    ) -> Result<SqlScript, CatalogError> {
        self.require_primary_keys("deleting matching rows")?;
        let source_names = source.column_names()?;
        Ok(SqlScript::new(&delete_matching_sql(
            &self.full_name,
            &self.primary_keys,
            source,
            &source_names,
        )?))
    }

    /// Keep one row per primary key.
    pub fn de_duplication_script(&self) -> Result<SqlScript, CatalogError> {
        self.require_primary_keys("de-duplication")?;
        let scratch = format!("{}_dedupe", self.full_name.replace('.', "_"));
        Ok(dedupe_script(
            &self.full_name,
            &scratch,
            &self.columns,
            &self.primary_keys,
        ))
    }

    /// Merge `source` into `self` through a temporary clone.
    ///
    /// With `delete_existing` every destination row is replaced, otherwise
    /// only the rows whose key is present in the source. `enforce_pk` drops
    /// duplicate keys from the staged rows first.
    pub fn upsert_script(
        &self,
        source: &dyn Projection,
        enforce_pk: bool,
        delete_existing: bool,
    ) -> Result<SqlScript, CatalogError> {
        if enforce_pk || !delete_existing {
            self.require_primary_keys("upsert")?;
        }
        let temp = self.temporary_name();
        let staged = StagedClone {
            name: &temp,
            columns: &self.columns,
        };

        let mut script = self.create_if_not_exists_script();
        script.append(self.temporary_clone_script());
        script.append_sql(&insert_sql(&temp, self.columns.len(), source)?);
        if enforce_pk {
            script.append(dedupe_script(
                &temp,
                &format!("{temp}_dedupe"),
                &self.columns,
                &self.primary_keys,
            ));
        }
        if delete_existing {
            script.append_sql(&format!("DELETE FROM {};", self.full_name));
        } else {
            // the staged clone shares the destination's column names
            script.append_sql(&delete_matching_sql(
                &self.full_name,
                &self.primary_keys,
                &staged,
                &self.primary_keys,
            )?);
        }
        script.append_sql(&insert_sql(&self.full_name, self.columns.len(), &staged)?);
        script.append_sql(&format!("DROP TABLE {temp};"));
        Ok(script)
    }

    /// Replace the contents of `self` with `source`, keeping one row per key.
    pub fn reload_script(&self, source: &dyn Projection) -> Result<SqlScript, CatalogError> {
        self.upsert_script(source, true, true)
    }

    /// `ALTER TABLE ... ADD FOREIGN KEY` for every declared reference.
    pub fn foreign_key_script(&self) -> SqlScript {
        let mut script = SqlScript::default();
        for fk in &self.foreign_keys {
            let target = if fk.reference.columns.is_empty() {
                fk.reference.table.clone()
            } else {
                format!("{} ({})", fk.reference.table, fk.reference.columns.join(", "))
            };
            script.append_sql(&format!(
                "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {target};",
                self.full_name,
                fk.columns.join(", ")
            ));
        }
        script
    }
}

impl Relation for Table {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn kind(&self) -> RelationKind {
        RelationKind::Table
    }

    fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    fn dependencies(&self) -> Vec<String> {
        let mut deps = vec![];
        for fk in &self.foreign_keys {
            push_unique(&mut deps, &fk.reference.table);
        }
        deps
    }
}

impl Projection for Table {
    fn from_expression(&self) -> String {
        self.full_name.clone()
    }

    fn qualifier(&self) -> String {
        self.full_name.clone()
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.columns.iter().map(|c| c.name().to_string()).collect())
    }
}

/// The temporary copy an upsert stages rows in.
struct StagedClone<'a> {
    name: &'a str,
    columns: &'a [Column],
}

impl Projection for StagedClone<'_> {
    fn from_expression(&self) -> String {
        self.name.to_string()
    }

    fn qualifier(&self) -> String {
        self.name.to_string()
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.columns.iter().map(|c| c.name().to_string()).collect())
    }
}

fn names_where(columns: &[Column], pred: fn(&Column) -> bool) -> Vec<String> {
    columns
        .iter()
        .filter(|c| pred(c))
        .map(|c| c.name().to_string())
        .collect()
}

pub(crate) fn clone_sql(name: &str, columns: &[Column]) -> String {
    let definitions: Vec<String> = columns.iter().map(Column::to_string).collect();
    format!("CREATE TEMPORARY TABLE {name} ({});", definitions.join(", "))
}

pub(crate) fn insert_sql(
    dest: &str,
    dest_columns: usize,
    source: &dyn Projection,
) -> Result<String, CatalogError> {
    if source.column_count() > dest_columns {
        return Err(CatalogError::structure(format!(
            "source {} projects {} columns but '{dest}' declares {dest_columns}",
            source.from_expression(),
            source.column_count()
        )));
    }
    Ok(format!(
        "INSERT INTO {dest} (SELECT * FROM {});",
        source.from_expression()
    ))
}

fn delete_matching_sql(
    dest: &str,
    keys: &[String],
    source: &dyn Projection,
    source_keys: &[String],
) -> Result<String, CatalogError> {
    if source_keys.len() < keys.len() {
        return Err(CatalogError::structure(format!(
            "source {} projects {} columns but '{dest}' has {} primary keys",
            source.from_expression(),
            source_keys.len(),
            keys.len()
        )));
    }
    let qualifier = source.qualifier();
    let conditions: Vec<String> = keys
        .iter()
        .zip(source_keys)
        .map(|(key, matching)| format!("{dest}.{key} = {qualifier}.{matching}"))
        .collect();
    Ok(format!(
        "DELETE FROM {dest} USING {} WHERE {};",
        source.from_expression(),
        conditions.join(" AND ")
    ))
}

fn dedupe_script(name: &str, scratch: &str, columns: &[Column], keys: &[String]) -> SqlScript {
    let names: Vec<&str> = columns.iter().map(Column::name).collect();
    let keys = keys.join(", ");
    let mut script = SqlScript::new(&clone_sql(scratch, columns));
    script.append_sql(&format!("INSERT INTO {scratch} (SELECT * FROM {name});"));
    script.append_sql(&format!("DELETE FROM {name};"));
    script.append_sql(&format!(
        "INSERT INTO {name} (SELECT {cols} FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY {keys} ORDER BY {keys}) AS row_rank FROM {scratch}) AS ranked WHERE row_rank = 1);",
        cols = names.join(", ")
    ));
    script.append_sql(&format!("DROP TABLE {scratch};"));
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDERS: &str = "CREATE TABLE analytics.orders (\
        order_id INTEGER PRIMARY KEY SORTKEY, \
        customer_id INTEGER REFERENCES analytics.customers(customer_id) DISTKEY, \
        total DECIMAL(12,2), \
        note VARCHAR(256) NULL\
    ) SORTKEY (order_id, customer_id)";

    #[test]
    fn keys_are_unioned() {
        let table = Table::new(ORDERS).unwrap();
        assert_eq!(table.primary_keys(), ["order_id"]);
        assert_eq!(table.dist_keys(), ["customer_id"]);
        assert_eq!(table.sort_keys(), ["order_id", "customer_id"]);
        assert!(table.column("customer_id").unwrap().is_sortkey());
        assert_eq!(table.dependencies(), vec!["analytics.customers"]);
        assert_eq!(table.schema(), Some("analytics"));
        assert_eq!(table.local_name(), "orders");
    }

    #[test]
    fn renamed_keeps_the_definition() {
        let staging = Table::new(ORDERS).unwrap().renamed("analytics.orders_staging").unwrap();
        assert_eq!(staging.full_name(), "analytics.orders_staging");
        assert_eq!(staging.primary_keys(), ["order_id"]);
        assert_eq!(staging.sort_keys(), ["order_id", "customer_id"]);
    }

    #[test]
    fn table_level_primary_key_marks_columns() {
        let table =
            Table::new("CREATE TABLE t (a INT, b INT, c TEXT, PRIMARY KEY (a, b))").unwrap();
        assert_eq!(table.primary_keys(), ["a", "b"]);
        assert!(table.column("b").unwrap().is_not_null());
        assert_eq!(table.non_primary_key_columns().len(), 1);
    }

    #[test]
    fn nullable_columns_named_by_a_key_become_not_null() {
        let table =
            Table::new("CREATE TABLE t (id INT NULL, v TEXT NULL, PRIMARY KEY (id))").unwrap();
        let id = table.column("id").unwrap();
        assert!(id.is_primary() && id.is_not_null() && !id.is_null());
        assert!(table.column("v").unwrap().is_null());
    }

    #[test]
    fn unknown_key_column_is_structure_error() {
        let err = Table::new("CREATE TABLE t (a INT) DISTKEY (b)").unwrap_err();
        assert!(matches!(err, CatalogError::Structure { .. }));
    }

    #[test]
    fn simple_scripts() {
        let table = Table::new(ORDERS).unwrap();
        assert_eq!(
            table.drop_script().sql(),
            "DROP TABLE IF EXISTS analytics.orders CASCADE;"
        );
        assert_eq!(
            table.temporary_clone_script().sql(),
            "CREATE TEMPORARY TABLE analytics_orders_temp (order_id INTEGER, customer_id INTEGER, total DECIMAL(12,2), note VARCHAR(256));"
        );
        assert!(table
            .create_if_not_exists_script()
            .sql()
            .starts_with("CREATE TABLE IF NOT EXISTS analytics.orders ("));
        assert_eq!(
            table.foreign_key_script().sql(),
            "ALTER TABLE analytics.orders ADD FOREIGN KEY (customer_id) REFERENCES analytics.customers (customer_id);"
        );
    }

    #[test]
    fn insert_rejects_wider_source() {
        let narrow = Table::new("CREATE TABLE narrow (a INT)").unwrap();
        let wide = Table::new("CREATE TABLE wide (a INT, b INT)").unwrap();
        assert_eq!(
            wide.insert_script(&narrow).unwrap().sql(),
            "INSERT INTO wide (SELECT * FROM narrow);"
        );
        assert!(narrow.insert_script(&wide).is_err());
    }

    #[test]
    fn delete_matching_aligns_by_position() {
        let dest = Table::new("CREATE TABLE dest (id INT, tenant INT, v TEXT, PRIMARY KEY (id, tenant))")
            .unwrap();
        let source = Table::new("CREATE TABLE src (src_id INT, src_tenant INT, v TEXT)").unwrap();
        assert_eq!(
            dest.delete_matching_rows_script(&source).unwrap().sql(),
            "DELETE FROM dest USING src WHERE dest.id = src.src_id AND dest.tenant = src.src_tenant;"
        );
        assert!(source.delete_matching_rows_script(&dest).is_err());
    }

    #[test]
    fn delete_matching_pairs_keys_with_leading_source_columns() {
        let dest = Table::new("CREATE TABLE dest (v TEXT, id INT PRIMARY KEY)").unwrap();
        let source = Table::new("CREATE TABLE src (key_id INT, note TEXT)").unwrap();
        assert_eq!(
            dest.delete_matching_rows_script(&source).unwrap().sql(),
            "DELETE FROM dest USING src WHERE dest.id = src.key_id;"
        );

        let narrow = Table::new("CREATE TABLE k (a INT, b INT, PRIMARY KEY (a, b))").unwrap();
        let one = Table::new("CREATE TABLE one (x INT)").unwrap();
        assert!(narrow.delete_matching_rows_script(&one).is_err());
    }

    #[test]
    fn upsert_matches_staged_rows_by_key_name() {
        let dest = Table::new("CREATE TABLE dest (v TEXT, id INT PRIMARY KEY)").unwrap();
        let script = dest.upsert_script(&dest, false, false).unwrap();
        let statements: Vec<_> = script.statements().iter().map(|s| s.sql()).collect();
        assert!(statements.contains(&"DELETE FROM dest USING dest_temp WHERE dest.id = dest_temp.id"));
    }

    #[test]
    fn dedupe_keeps_first_ranked_row() {
        let table = Table::new("CREATE TABLE t (id INT PRIMARY KEY, v TEXT)").unwrap();
        let script = table.de_duplication_script().unwrap();
        let statements: Vec<_> = script.statements().iter().map(|s| s.sql()).collect();
        assert_eq!(
            statements,
            vec![
                "CREATE TEMPORARY TABLE t_dedupe (id INT, v TEXT)",
                "INSERT INTO t_dedupe (SELECT * FROM t)",
                "DELETE FROM t",
                "INSERT INTO t (SELECT id, v FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY id ORDER BY id) AS row_rank FROM t_dedupe) AS ranked WHERE row_rank = 1)",
                "DROP TABLE t_dedupe",
            ]
        );
    }

    #[test]
    fn reload_truncates_instead_of_matching() {
        let table = Table::new("CREATE TABLE t (id INT PRIMARY KEY, v TEXT)").unwrap();
        let source = Table::new("CREATE TABLE s (id INT PRIMARY KEY, v TEXT)").unwrap();
        let script = table.reload_script(&source).unwrap();
        let statements: Vec<_> = script.statements().iter().map(|s| s.sql()).collect();
        assert!(statements.contains(&"DELETE FROM t"));
        assert!(!statements.iter().any(|s| s.starts_with("DELETE FROM t USING")));
    }

    #[test]
    fn upsert_without_key_fails() {
        let table = Table::new("CREATE TABLE t (id INT, v TEXT)").unwrap();
        assert!(table.upsert_script(&table, false, false).is_err());
        assert!(table.upsert_script(&table, false, true).is_ok());
    }
}
