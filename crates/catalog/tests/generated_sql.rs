use catalog::{Database, HistoryTable, Relation, SelectStatement, Table, MAX_TIMESTAMP};
use common::config::components::global::DuctConfig;
use pretty_assertions::assert_eq;
use test_utils::{fixture_dir, SAMPLE_CONFIG};

fn statements(script: &sql::SqlScript) -> Vec<String> {
    script.statements().iter().map(|s| s.sql().to_string()).collect()
}

#[test]
fn upsert_statement_sequence() {
    let dest = Table::new("CREATE TABLE orders (id INTEGER PRIMARY KEY, status VARCHAR(20))").unwrap();
    let source =
        Table::new("CREATE TABLE staging_orders (id INTEGER PRIMARY KEY, status VARCHAR(20))").unwrap();

    let script = dest.upsert_script(&source, true, false).unwrap();
    let sql = statements(&script);

    assert_eq!(
        sql[0],
        "CREATE TABLE IF NOT EXISTS orders (id INTEGER PRIMARY KEY, status VARCHAR(20))"
    );
    assert_eq!(sql[1], "CREATE TEMPORARY TABLE orders_temp (id INTEGER, status VARCHAR(20))");
    assert_eq!(sql[2], "INSERT INTO orders_temp (SELECT * FROM staging_orders)");
    // de-duplication of the staged rows
    assert_eq!(
        &sql[3..8],
        &[
            "CREATE TEMPORARY TABLE orders_temp_dedupe (id INTEGER, status VARCHAR(20))",
            "INSERT INTO orders_temp_dedupe (SELECT * FROM orders_temp)",
            "DELETE FROM orders_temp",
            "INSERT INTO orders_temp (SELECT id, status FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY id ORDER BY id) AS row_rank FROM orders_temp_dedupe) AS ranked WHERE row_rank = 1)",
            "DROP TABLE orders_temp_dedupe",
        ]
    );
    assert_eq!(
        &sql[8..],
        &[
            "DELETE FROM orders USING orders_temp WHERE orders.id = orders_temp.id",
            "INSERT INTO orders (SELECT * FROM orders_temp)",
            "DROP TABLE orders_temp",
        ]
    );
}

#[test]
fn upsert_from_select() {
    let dest = Table::new("CREATE TABLE daily (day DATE PRIMARY KEY, total BIGINT)").unwrap();
    let select =
        SelectStatement::new("SELECT created::date AS day, COUNT(1) AS total FROM events GROUP BY 1")
            .unwrap();
    let sql = statements(&dest.upsert_script(&select, false, false).unwrap());
    assert_eq!(
        sql[2],
        "INSERT INTO daily_temp (SELECT * FROM (SELECT created::date AS day, COUNT(1) AS total FROM events GROUP BY 1) AS source)"
    );
    assert_eq!(sql.len(), 6);
}

#[test]
fn history_update_has_seven_statements() {
    let history = HistoryTable::new(
        "CREATE TABLE dim_customer (effective_ts TIMESTAMP, expiration_ts TIMESTAMP, id INTEGER, name VARCHAR(100))",
    )
    .unwrap();
    let source =
        Table::new("CREATE TABLE customers (id INTEGER PRIMARY KEY, name VARCHAR(100))").unwrap();

    let sql = statements(&history.update_history_script(&source).unwrap());
    assert_eq!(sql.len(), 7);
    assert_eq!(sql[0], "CREATE TEMPORARY TABLE customers_temp (id INTEGER, name VARCHAR(100))");
    assert_eq!(sql[1], "INSERT INTO customers_temp (SELECT * FROM customers)");
    assert_eq!(
        sql[2],
        format!(
            "UPDATE dim_customer SET expiration_ts = SYSDATE - INTERVAL '0.000001 seconds' FROM customers \
             WHERE dim_customer.id = customers.id AND (dim_customer.name <> customers.name \
             OR (dim_customer.name IS NULL AND customers.name IS NOT NULL) \
             OR (dim_customer.name IS NOT NULL AND customers.name IS NULL)) \
             AND dim_customer.expiration_ts = '{MAX_TIMESTAMP}'"
        )
    );
    assert_eq!(
        sql[3],
        format!(
            "UPDATE dim_customer SET expiration_ts = SYSDATE - INTERVAL '0.000001 seconds' \
             WHERE (id) NOT IN (SELECT id FROM customers) AND dim_customer.expiration_ts = '{MAX_TIMESTAMP}'"
        )
    );
    assert_eq!(
        sql[4],
        format!(
            "DELETE FROM customers_temp USING dim_customer WHERE customers_temp.id = dim_customer.id \
             AND dim_customer.expiration_ts = '{MAX_TIMESTAMP}'"
        )
    );
    assert_eq!(
        sql[5],
        format!(
            "INSERT INTO dim_customer (effective_ts, expiration_ts, id, name) \
             SELECT SYSDATE, '{MAX_TIMESTAMP}', id, name FROM customers_temp"
        )
    );
    assert_eq!(sql[6], "DROP TABLE customers_temp");
}

#[test]
fn create_script_appends_configured_grants() {
    let config = DuctConfig::from_yaml_str(SAMPLE_CONFIG).unwrap();
    let table = Table::new("CREATE TABLE analytics.orders (id INTEGER)").unwrap();
    assert_eq!(
        statements(&table.create_script(&config.database.permissions)),
        vec![
            "CREATE TABLE analytics.orders (id INTEGER)",
            "GRANT select ON analytics.orders TO GROUP analysts",
            "GRANT all ON analytics.orders TO etl_admin WITH GRANT OPTION",
        ]
    );
}

#[test]
fn database_loads_directory_in_dependency_order() {
    let dir = fixture_dir(&[
        (
            "tables/orders.sql",
            "-- orders fact\nCREATE TABLE orders (id INT PRIMARY KEY, customer_id INT REFERENCES customers(id));",
        ),
        ("tables/customers.sql", "CREATE TABLE customers (id INT PRIMARY KEY);"),
        (
            "views/order_counts.sql",
            "CREATE VIEW order_counts AS (SELECT customer_id, COUNT(1) AS n FROM orders GROUP BY 1);",
        ),
        ("README.md", "not sql"),
    ]);
    let db = Database::from_directory(dir.path()).unwrap();
    assert_eq!(db.len(), 3);

    let drops = statements(&db.drop_relations_script().unwrap());
    assert_eq!(
        drops,
        vec![
            "DROP VIEW IF EXISTS order_counts CASCADE",
            "DROP TABLE IF EXISTS orders CASCADE",
            "DROP TABLE IF EXISTS customers CASCADE",
        ]
    );
    let creates = statements(&db.create_relations_script(&[]).unwrap());
    assert_eq!(creates[0], "CREATE TABLE customers (id INT PRIMARY KEY)");
}
