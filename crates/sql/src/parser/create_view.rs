use super::select::parse_select_dependencies;
use super::DdlParse;
use crate::error::SqlError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlparser::dialect::RedshiftSqlDialect;
use sqlparser::parser::Parser;

static VIEW_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+(OR\s+REPLACE\s+)?VIEW\s+(.+?)\s+AS\s+(.*?)\s*;?\s*$")
        .expect("view header regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateViewDef {
    pub view_name: String,
    pub or_replace: bool,
    /// Body of the view, verbatim, with one pair of enclosing parentheses
    /// removed when present.
    pub select_statement: String,
}

impl CreateViewDef {
    pub fn dependencies(&self) -> Result<Vec<String>, SqlError> {
        parse_select_dependencies(&self.select_statement)
    }
}

pub fn parse_create_view(sql: &str) -> Result<CreateViewDef, SqlError> {
    let caps = VIEW_HEADER
        .captures(sql)
        .ok_or_else(|| SqlError::parse(format!("not a CREATE VIEW statement: '{sql}'")))?;

    let or_replace = caps.get(1).is_some();
    let view_name = normalise_name(&caps[2])?;
    let body = strip_outer_parens(caps[3].trim());

    if body.is_empty() {
        return Err(SqlError::structure(format!("view '{view_name}' has an empty body")));
    }
    let first_word = body
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if first_word != "SELECT" && first_word != "WITH" {
        return Err(SqlError::structure(format!(
            "view '{view_name}' body is not a SELECT: '{body}'"
        )));
    }

    Ok(CreateViewDef {
        view_name,
        or_replace,
        select_statement: body.to_string(),
    })
}

fn normalise_name(raw: &str) -> Result<String, SqlError> {
    let dialect = RedshiftSqlDialect {};
    let mut parser = Parser::new(&dialect).try_with_sql(raw)?;
    let name = parser.parse_relation_name()?;
    parser.expect_end()?;
    Ok(name)
}

/// Drop one pair of parentheses when the opening one at the start closes at
/// the very end.
fn strip_outer_parens(body: &str) -> &str {
    if !body.starts_with('(') {
        return body;
    }
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, ch) in body.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return if i == body.len() - 1 {
                            body[1..i].trim()
                        } else {
                            body
                        };
                    }
                }
                _ => {}
            },
        }
    }
    body
}
