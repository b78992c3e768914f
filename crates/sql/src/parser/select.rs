use super::word_text;
use crate::error::SqlError;
use sqlparser::dialect::RedshiftSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};

fn significant_tokens(sql: &str) -> Result<Vec<Token>, SqlError> {
    let dialect = RedshiftSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize()?;
    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect())
}

fn is_keyword(token: Option<&Token>, keyword: Keyword) -> bool {
    matches!(token, Some(Token::Word(w)) if w.keyword == keyword)
}

fn is_plain_name(token: Option<&Token>) -> bool {
    matches!(token, Some(Token::Word(w)) if w.keyword == Keyword::NoKeyword || w.quote_style.is_some())
}

/// Relations named after `FROM` / `JOIN`, deduplicated case-insensitively,
/// in order of first appearance. Names bound by `WITH name AS (...)` are
/// not reported.
pub fn parse_select_dependencies(sql: &str) -> Result<Vec<String>, SqlError> {
    let tokens = significant_tokens(sql)?;
    let mut found: Vec<String> = vec![];
    let mut ctes: Vec<String> = vec![];
    // one entry per open parenthesis: does it start a subquery?
    let mut parens: Vec<bool> = vec![];

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::LParen => {
                let subquery = is_keyword(tokens.get(i + 1), Keyword::SELECT)
                    || is_keyword(tokens.get(i + 1), Keyword::WITH);
                parens.push(subquery);
            }
            Token::RParen => {
                parens.pop();
            }
            Token::Word(w)
                if is_keyword(tokens.get(i + 1), Keyword::AS)
                    && tokens.get(i + 2) == Some(&Token::LParen)
                    && is_keyword(tokens.get(i + 3), Keyword::SELECT) =>
            {
                ctes.push(word_text(w));
            }
            Token::Word(w)
                if (w.keyword == Keyword::FROM || w.keyword == Keyword::JOIN)
                    && parens.last().copied().unwrap_or(true) =>
            {
                i = collect_relations(&tokens, i + 1, &mut found);
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    found.retain(|name| !ctes.iter().any(|cte| cte.eq_ignore_ascii_case(name)));
    Ok(found)
}

/// Read `name [AS alias] [, name [AS alias] ...]` starting at `i`; returns the
/// index of the first token not consumed.
fn collect_relations(tokens: &[Token], mut i: usize, found: &mut Vec<String>) -> usize {
    loop {
        let mut name = match tokens.get(i) {
            Some(Token::Word(w)) if w.keyword != Keyword::SELECT && w.keyword != Keyword::LATERAL => {
                word_text(w)
            }
            _ => return i,
        };
        i += 1;
        while tokens.get(i) == Some(&Token::Period) {
            match tokens.get(i + 1) {
                Some(Token::Word(w)) => {
                    name.push('.');
                    name.push_str(&word_text(w));
                    i += 2;
                }
                _ => break,
            }
        }
        if !found.iter().any(|seen| seen.eq_ignore_ascii_case(&name)) {
            found.push(name);
        }

        if is_keyword(tokens.get(i), Keyword::AS) {
            i += 2;
        } else if is_plain_name(tokens.get(i)) {
            i += 1;
        }

        if tokens.get(i) == Some(&Token::Comma) {
            i += 1;
        } else {
            return i;
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn keyword_at(bytes: &[u8], i: usize, keyword: &str) -> bool {
    let end = i + keyword.len();
    end <= bytes.len()
        && bytes[i..end].eq_ignore_ascii_case(keyword.as_bytes())
        && (i == 0 || !is_ident_byte(bytes[i - 1]))
        && (end == bytes.len() || !is_ident_byte(bytes[end]))
}

/// Byte offsets (outside quotes, at parenthesis depth 0) where `pred` holds.
fn top_level_positions(
    sql: &str,
    start: usize,
    pred: impl Fn(&[u8], usize) -> bool,
) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut positions = vec![];
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for i in start..bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if depth == 0 && pred(bytes, i) => positions.push(i),
                _ => {}
            },
        }
    }
    positions
}

/// Projected expressions of the top-level SELECT, split on commas that are
/// outside parentheses and quotes.
pub fn parse_select_columns(sql: &str) -> Result<Vec<String>, SqlError> {
    let select = top_level_positions(sql, 0, |b, i| keyword_at(b, i, "SELECT"))
        .first()
        .copied()
        .ok_or_else(|| SqlError::structure(format!("no SELECT clause in '{sql}'")))?;
    let start = select + "SELECT".len();
    let end = top_level_positions(sql, start, |b, i| keyword_at(b, i, "FROM"))
        .first()
        .copied()
        .unwrap_or(sql.len());

    let mut projection = sql[start..end].trim().trim_end_matches(';').trim();
    for modifier in ["DISTINCT", "ALL"] {
        if keyword_at(projection.as_bytes(), 0, modifier) {
            projection = projection[modifier.len()..].trim_start();
        }
    }

    let mut columns = vec![];
    let mut last = 0;
    for comma in top_level_positions(projection, 0, |b, i| b[i] == b',') {
        columns.push(projection[last..comma].trim().to_string());
        last = comma + 1;
    }
    columns.push(projection[last..].trim().to_string());

    if columns.iter().any(|c| c.is_empty()) {
        return Err(SqlError::structure(format!(
            "empty column expression in '{projection}'"
        )));
    }
    Ok(columns)
}

/// Trailing identifier of a column expression, unquoted: `x AS t` gives `t`,
/// `o.customer_id` gives `customer_id`.
pub fn parse_column_name(expression: &str) -> Result<String, SqlError> {
    significant_tokens(expression)?
        .into_iter()
        .rev()
        .find_map(|t| match t {
            Token::Word(w) => Some(w.value),
            _ => None,
        })
        .ok_or_else(|| SqlError::structure(format!("no column name in '{expression}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NESTED: &str = "SELECT x, CASE WHEN y=10 THEN 5 ELSE z, CASE WHEN x THEN COUNT(MIN(x,y)) ELSE MIN(x) END, COUNT(1) AS c FROM abc";

    #[test]
    fn nested_expressions_split_on_top_level_commas() {
        let columns = parse_select_columns(NESTED).unwrap();
        assert_eq!(
            columns,
            vec![
                "x",
                "CASE WHEN y=10 THEN 5 ELSE z",
                "CASE WHEN x THEN COUNT(MIN(x,y)) ELSE MIN(x) END",
                "COUNT(1) AS c",
            ]
        );
        assert_eq!(parse_select_dependencies(NESTED).unwrap(), vec!["abc"]);
        assert_eq!(parse_column_name(columns.last().unwrap()).unwrap(), "c");
    }

    #[test]
    fn dependencies_cover_joins_lists_and_subqueries() {
        let sql = "SELECT a.id FROM staging.a AS a, b \
                   LEFT JOIN (SELECT id FROM c WHERE x IN (SELECT id FROM A)) sub ON sub.id = b.id \
                   JOIN b ON true";
        assert_eq!(
            parse_select_dependencies(sql).unwrap(),
            vec!["staging.a", "b", "c", "A"]
        );
    }

    #[test]
    fn function_from_is_not_a_dependency() {
        let sql = "SELECT EXTRACT(year FROM created_at) AS yr, TRIM(BOTH FROM name) FROM events";
        assert_eq!(parse_select_dependencies(sql).unwrap(), vec!["events"]);
    }

    #[test]
    fn cte_names_are_not_dependencies() {
        let sql = "WITH recent AS (SELECT * FROM orders) SELECT r.id FROM recent r";
        assert_eq!(parse_select_dependencies(sql).unwrap(), vec!["orders"]);
        assert_eq!(parse_select_columns(sql).unwrap(), vec!["r.id"]);
    }

    #[test]
    fn quoted_commas_and_distinct() {
        let sql = "SELECT DISTINCT 'a,b' AS label, \"Col\" FROM t;";
        assert_eq!(parse_select_columns(sql).unwrap(), vec!["'a,b' AS label", "\"Col\""]);
        assert_eq!(parse_column_name("\"Col\"").unwrap(), "Col");
        assert_eq!(parse_column_name("o.customer_id").unwrap(), "customer_id");
    }

    #[test]
    fn select_without_from() {
        assert_eq!(parse_select_columns("SELECT 1, 2").unwrap(), vec!["1", "2"]);
        assert!(parse_select_columns("DELETE FROM t").is_err());
        assert!(parse_column_name("42").is_err());
    }
}
