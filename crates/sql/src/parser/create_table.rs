use super::DdlParse;
use crate::error::SqlError;
use serde::Serialize;
use sqlparser::dialect::RedshiftSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;
use std::fmt::{Display, Formatter};

const KNOWN_TYPES: &[&str] = &[
    "SMALLINT", "INT2", "INT", "INTEGER", "INT4", "BIGINT", "INT8", "DECIMAL", "NUMERIC", "REAL",
    "FLOAT4", "DOUBLE", "FLOAT8", "FLOAT", "BOOLEAN", "BOOL", "CHAR", "CHARACTER", "NCHAR",
    "BPCHAR", "VARCHAR", "TEXT", "NVARCHAR", "DATE", "TIMESTAMP", "TIMESTAMPTZ", "TIME",
    "TIMETZ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nullability {
    #[default]
    Unspecified,
    Null,
    NotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistStyle {
    Even,
    All,
    Key,
}

impl Display for DistStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DistStyle::Even => "EVEN",
            DistStyle::All => "ALL",
            DistStyle::Key => "KEY",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableConstraint {
    PrimaryKey {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        reference: ForeignKeyRef,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    /// Declared type in its original spelling, arguments included.
    #[serde(rename = "type")]
    pub column_type: String,
    pub encoding: Option<String>,
    pub fk_reference: Option<ForeignKeyRef>,
    pub default: Option<String>,
    pub identity: Option<String>,
    pub is_distkey: bool,
    pub is_sortkey: bool,
    pub is_primary: bool,
    pub nullability: Nullability,
    pub position: usize,
}

impl ColumnDef {
    pub fn is_not_null(&self) -> bool {
        self.nullability == Nullability::NotNull
    }

    pub fn is_null(&self) -> bool {
        self.nullability == Nullability::Null
    }

    fn set_nullability(&mut self, value: Nullability) -> Result<(), SqlError> {
        if self.nullability != Nullability::Unspecified && self.nullability != value {
            return Err(SqlError::structure(format!(
                "column '{}' is declared both NULL and NOT NULL",
                self.name
            )));
        }
        self.nullability = value;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTableDef {
    pub full_name: String,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub distkey: Vec<String>,
    pub sortkey: Vec<String>,
    pub diststyle: Option<DistStyle>,
}

pub fn parse_create_table(sql: &str) -> Result<CreateTableDef, SqlError> {
    let dialect = RedshiftSqlDialect {};
    let mut parser = Parser::new(&dialect).try_with_sql(sql)?;
    parser.parse_table_def()
}

trait TableParse {
    fn parse_table_def(&mut self) -> Result<CreateTableDef, SqlError>;
    fn at_table_constraint(&self) -> bool;
    fn parse_table_constraint(&mut self) -> Result<TableConstraint, SqlError>;
    fn parse_table_column(&mut self, position: usize) -> Result<ColumnDef, SqlError>;
    fn parse_type_name(&mut self, column: &str) -> Result<String, SqlError>;
    fn parse_type_args(&mut self) -> Result<String, SqlError>;
    fn parse_default_value(&mut self) -> Result<String, SqlError>;
    fn parse_table_attributes(&mut self, def: &mut CreateTableDef) -> Result<(), SqlError>;
    fn parse_fk_target(&mut self) -> Result<ForeignKeyRef, SqlError>;
}

impl TableParse for Parser<'_> {
    fn parse_table_def(&mut self) -> Result<CreateTableDef, SqlError> {
        self.expect_keyword(Keyword::CREATE)?;
        let temporary = self.parse_keyword(Keyword::TEMPORARY) || self.parse_keyword(Keyword::TEMP);
        self.expect_keyword(Keyword::TABLE)?;
        let if_not_exists = self.parse_keywords(&[Keyword::IF, Keyword::NOT, Keyword::EXISTS]);
        let full_name = self.parse_relation_name()?;

        let mut def = CreateTableDef {
            full_name,
            temporary,
            if_not_exists,
            columns: vec![],
            constraints: vec![],
            distkey: vec![],
            sortkey: vec![],
            diststyle: None,
        };

        self.expect_token(&Token::LParen)?;
        loop {
            if self.at_table_constraint() {
                def.constraints.push(self.parse_table_constraint()?);
            } else {
                let position = def.columns.len();
                def.columns.push(self.parse_table_column(position)?);
            }
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        self.expect_token(&Token::RParen)?;

        if def.columns.is_empty() {
            return Err(SqlError::structure(format!(
                "table '{}' declares no columns",
                def.full_name
            )));
        }

        self.parse_table_attributes(&mut def)?;
        self.expect_end()?;
        Ok(def)
    }

    fn at_table_constraint(&self) -> bool {
        self.peek_words(&["CONSTRAINT"])
            || self.peek_words(&["PRIMARY", "KEY"])
            || self.peek_words(&["FOREIGN", "KEY"])
            || (self.peek_words(&["UNIQUE"]) && self.peek_nth_token(1).token == Token::LParen)
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint, SqlError> {
        if self.parse_keyword(Keyword::CONSTRAINT) {
            // constraint names are not kept
            self.parse_name_part()?;
        }
        if self.parse_keywords(&[Keyword::PRIMARY, Keyword::KEY]) || self.parse_keyword(Keyword::UNIQUE) {
            let columns = self.parse_name_list()?;
            Ok(TableConstraint::PrimaryKey { columns })
        } else if self.parse_keywords(&[Keyword::FOREIGN, Keyword::KEY]) {
            let columns = self.parse_name_list()?;
            self.expect_keyword(Keyword::REFERENCES)?;
            let reference = self.parse_fk_target()?;
            Ok(TableConstraint::ForeignKey { columns, reference })
        } else {
            Err(SqlError::structure(format!(
                "unsupported table constraint near '{}'",
                self.peek_token().token
            )))
        }
    }

    fn parse_table_column(&mut self, position: usize) -> Result<ColumnDef, SqlError> {
        let name = self.parse_name_part()?;
        let column_type = self.parse_type_name(&name)?;
        let mut column = ColumnDef {
            name,
            column_type,
            encoding: None,
            fk_reference: None,
            default: None,
            identity: None,
            is_distkey: false,
            is_sortkey: false,
            is_primary: false,
            nullability: Nullability::Unspecified,
            position,
        };

        loop {
            match self.peek_token().token {
                Token::Comma | Token::RParen => break,
                _ => {}
            }
            if self.parse_keywords(&[Keyword::NOT, Keyword::NULL]) {
                column.set_nullability(Nullability::NotNull)?;
            } else if self.parse_keyword(Keyword::NULL) {
                column.set_nullability(Nullability::Null)?;
            } else if self.parse_keywords(&[Keyword::PRIMARY, Keyword::KEY])
                || self.parse_keyword(Keyword::UNIQUE)
            {
                column.is_primary = true;
            } else if self.parse_word("DISTKEY") {
                column.is_distkey = true;
            } else if self.parse_word("SORTKEY") {
                column.is_sortkey = true;
            } else if self.parse_word("ENCODE") {
                column.encoding = Some(self.parse_name_part()?);
            } else if self.parse_keyword(Keyword::REFERENCES) {
                column.fk_reference = Some(self.parse_fk_target()?);
            } else if self.parse_keyword(Keyword::DEFAULT) {
                column.default = Some(self.parse_default_value()?);
            } else if self.parse_word("IDENTITY") {
                column.identity = Some(self.parse_type_args()?);
            } else {
                return Err(SqlError::structure(format!(
                    "unexpected '{}' in definition of column '{}'",
                    self.peek_token().token,
                    column.name
                )));
            }
        }

        // primary key membership wins over an explicit NULL
        if column.is_primary {
            column.nullability = Nullability::NotNull;
        }
        Ok(column)
    }

    fn parse_type_name(&mut self, column: &str) -> Result<String, SqlError> {
        let base = match self.next_token().token {
            Token::Word(w) if KNOWN_TYPES.contains(&w.value.to_ascii_uppercase().as_str()) => w,
            other => {
                return Err(SqlError::structure(format!(
                    "unknown type '{other}' for column '{column}'"
                )))
            }
        };

        let follow: &[&[&str]] = match base.value.to_ascii_uppercase().as_str() {
            "DOUBLE" => &[&["PRECISION"]],
            "CHARACTER" => &[&["VARYING"]],
            "TIMESTAMP" | "TIME" => &[&["WITH", "TIME", "ZONE"], &["WITHOUT", "TIME", "ZONE"]],
            _ => &[],
        };

        let mut parts = vec![base.value];
        if let Some(words) = follow.iter().find(|words| self.peek_words(words)) {
            for _ in words.iter() {
                if let Token::Word(w) = self.next_token().token {
                    parts.push(w.value);
                }
            }
        }

        let mut type_name = parts.join(" ");
        if self.peek_token().token == Token::LParen {
            type_name.push_str(&self.parse_type_args()?);
        }
        Ok(type_name)
    }

    /// `( a, b )` rendered compactly as `(a,b)`.
    fn parse_type_args(&mut self) -> Result<String, SqlError> {
        self.expect_token(&Token::LParen)?;
        let mut args = vec![];
        loop {
            match self.next_token().token {
                Token::Number(n, _) => args.push(n),
                Token::Word(w) => args.push(w.value),
                Token::Comma => continue,
                Token::RParen => break,
                other => {
                    return Err(SqlError::structure(format!(
                        "unexpected '{other}' in type arguments"
                    )))
                }
            }
        }
        Ok(format!("({})", args.join(",")))
    }

    fn parse_default_value(&mut self) -> Result<String, SqlError> {
        let mut value = match self.next_token().token {
            Token::EOF | Token::Comma | Token::RParen => {
                return Err(SqlError::structure("DEFAULT without a value"))
            }
            other => other.to_string(),
        };
        if self.peek_token().token == Token::LParen {
            let mut depth = 0usize;
            loop {
                let token = self.next_token().token;
                match token {
                    Token::LParen => depth += 1,
                    Token::RParen => depth -= 1,
                    Token::EOF => return Err(SqlError::structure("unbalanced DEFAULT expression")),
                    _ => {}
                }
                value.push_str(&token.to_string());
                if depth == 0 {
                    break;
                }
            }
        }
        Ok(value)
    }

    fn parse_table_attributes(&mut self, def: &mut CreateTableDef) -> Result<(), SqlError> {
        loop {
            if self.parse_word("DISTSTYLE") {
                let style = self.parse_name_part()?;
                def.diststyle = Some(match style.to_ascii_uppercase().as_str() {
                    "EVEN" => DistStyle::Even,
                    "ALL" => DistStyle::All,
                    "KEY" => DistStyle::Key,
                    _ => {
                        return Err(SqlError::structure(format!(
                            "unknown DISTSTYLE '{style}'"
                        )))
                    }
                });
            } else if self.parse_word("DISTKEY") {
                def.distkey.extend(self.parse_name_list()?);
            } else if self.parse_words(&["COMPOUND", "SORTKEY"])
                || self.parse_words(&["INTERLEAVED", "SORTKEY"])
                || self.parse_word("SORTKEY")
            {
                def.sortkey.extend(self.parse_name_list()?);
            } else {
                return Ok(());
            }
        }
    }

    fn parse_fk_target(&mut self) -> Result<ForeignKeyRef, SqlError> {
        let table = self.parse_relation_name()?;
        let columns = if self.peek_token().token == Token::LParen {
            self.parse_name_list()?
        } else {
            vec![]
        };
        Ok(ForeignKeyRef { table, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_create_table() {
        let def = parse_create_table(
            "CREATE TABLE orders (customer_id INTEGER DISTKEY PRIMARY KEY, customer_name VARCHAR(200))",
        )
        .unwrap();

        assert_eq!(def.full_name, "orders");
        assert!(!def.temporary);
        assert!(!def.if_not_exists);
        assert!(def.constraints.is_empty());
        assert_eq!(def.columns.len(), 2);

        let id = &def.columns[0];
        assert_eq!(id.name, "customer_id");
        assert_eq!(id.column_type, "INTEGER");
        assert!(id.is_distkey && id.is_primary && id.is_not_null());
        assert_eq!(id.position, 0);

        let name = &def.columns[1];
        assert_eq!(name.name, "customer_name");
        assert_eq!(name.column_type, "VARCHAR(200)");
        assert!(!name.is_primary);
        assert_eq!(name.nullability, Nullability::Unspecified);
        assert_eq!(name.position, 1);
    }

    #[test]
    fn redshift_attributes_and_constraints() {
        let sql = r#"
            CREATE TEMP TABLE IF NOT EXISTS sales.line_items (
                order_id BIGINT NOT NULL REFERENCES sales.orders(order_id),
                line_no int2 NOT NULL,
                amount decimal(10, 2) ENCODE zstd,
                ratio double precision NULL,
                created_at timestamp without time zone DEFAULT getdate() SORTKEY,
                PRIMARY KEY (order_id, line_no),
                CONSTRAINT fk_product FOREIGN KEY (product_id) REFERENCES products (id)
            ) DISTSTYLE KEY DISTKEY (order_id) COMPOUND SORTKEY (created_at, order_id);
        "#;
        let def = parse_create_table(sql).unwrap();

        assert!(def.temporary);
        assert!(def.if_not_exists);
        assert_eq!(def.full_name, "sales.line_items");
        assert_eq!(def.diststyle, Some(DistStyle::Key));
        assert_eq!(def.distkey, vec!["order_id"]);
        assert_eq!(def.sortkey, vec!["created_at", "order_id"]);

        let types: Vec<_> = def.columns.iter().map(|c| c.column_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "BIGINT",
                "int2",
                "decimal(10,2)",
                "double precision",
                "timestamp without time zone"
            ]
        );
        assert_eq!(
            def.columns[0].fk_reference,
            Some(ForeignKeyRef {
                table: "sales.orders".into(),
                columns: vec!["order_id".into()],
            })
        );
        assert_eq!(def.columns[2].encoding.as_deref(), Some("zstd"));
        assert!(def.columns[3].is_null());
        assert_eq!(def.columns[4].default.as_deref(), Some("getdate()"));
        assert!(def.columns[4].is_sortkey);

        assert_eq!(
            def.constraints,
            vec![
                TableConstraint::PrimaryKey {
                    columns: vec!["order_id".into(), "line_no".into()],
                },
                TableConstraint::ForeignKey {
                    columns: vec!["product_id".into()],
                    reference: ForeignKeyRef {
                        table: "products".into(),
                        columns: vec!["id".into()],
                    },
                },
            ]
        );
    }

    #[test]
    fn null_and_not_null_conflict() {
        let err = parse_create_table("CREATE TABLE t (a INTEGER NULL NOT NULL)").unwrap_err();
        assert!(err.to_string().contains("column 'a'"));
    }

    #[test]
    fn primary_key_forces_not_null() {
        let def = parse_create_table("CREATE TABLE t (id INTEGER NULL PRIMARY KEY, v TEXT)").unwrap();
        let id = &def.columns[0];
        assert!(id.is_primary);
        assert!(id.is_not_null() && !id.is_null());
        assert_eq!(def.columns[1].nullability, Nullability::Unspecified);
    }

    #[test]
    fn unknown_type_names_the_column() {
        let err = parse_create_table("CREATE TABLE t (a WIDGET)").unwrap_err();
        assert!(matches!(err, SqlError::Structure { .. }));
        assert!(err.to_string().contains("column 'a'"));
    }

    #[test]
    fn non_table_statements_fail() {
        assert!(parse_create_table("CREATE VIEW v AS (SELECT 1)").is_err());
        assert!(parse_create_table("SELECT * FROM t").is_err());
        assert!(parse_create_table("CREATE TABLE t (a INT) trailing").is_err());
    }
}
