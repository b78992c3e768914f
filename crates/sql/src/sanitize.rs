//! Textual clean-up applied to every SQL script before it is parsed or
//! staged: comments and transaction wrappers go, newlines outside string
//! literals collapse to spaces, and the script is split into statements.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// Each pattern matches a quoted literal first so the replacement closure can
// leave string contents alone. Both comment kinds share one scan, so an
// apostrophe inside a comment never opens a literal.
static COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)'[^']*'|/\*.*?(?:\*/|$)|--[^\n]*").expect("comment regex")
});
static NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'[^']*'|\r?\n").expect("newline regex"));
static SEMICOLON_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'[^']*'|;(?:\s*;)+").expect("semicolon regex"));
static LEADING_BEGIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*BEGIN(?:\s+TRANSACTION)?\s*;").expect("begin regex")
});
static TRAILING_COMMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|;)\s*COMMIT\s*;?\s*$").expect("commit regex"));

fn replace_outside_quotes(re: &Regex, sql: &str, replacement: &str) -> String {
    re.replace_all(sql, |caps: &Captures| {
        let matched = &caps[0];
        if matched.starts_with('\'') {
            matched.to_string()
        } else {
            replacement.to_string()
        }
    })
    .into_owned()
}

/// Strip `/* */` and `--` comments.
///
/// Block comments match non-greedily, so `/* a /* b */ c */` leaves
/// ` c */` behind. An unterminated block comment runs to end of input.
pub fn remove_comments(sql: &str) -> String {
    replace_outside_quotes(&COMMENT, sql, "")
}

/// Drop a leading `BEGIN;` and a trailing `COMMIT;`.
pub fn remove_transactional(sql: &str) -> String {
    let stripped = LEADING_BEGIN.replace(sql, "");
    TRAILING_COMMIT
        .replace(&stripped, |caps: &Captures| {
            if caps[0].starts_with(';') {
                ";".to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Replace newlines outside string literals with a single space.
pub fn remove_newlines(sql: &str) -> String {
    replace_outside_quotes(&NEWLINE, sql, " ")
}

/// Collapse runs of `;` and drop a leading one.
pub fn remove_empty_statements(sql: &str) -> String {
    let collapsed = replace_outside_quotes(&SEMICOLON_RUN, sql, ";");
    collapsed.trim_start().trim_start_matches(';').to_string()
}

/// Split on `;` outside single-quoted literals. Fragments are trimmed and
/// empty ones are skipped; the terminating `;` is not kept.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            ';' if !in_quote => {
                push_fragment(&mut statements, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_fragment(&mut statements, &current);
    statements
}

fn push_fragment(statements: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Full clean-up pipeline. Transaction wrappers are removed unless
/// `keep_transaction` is set.
pub fn sanitize_sql(sql: &str, keep_transaction: bool) -> Vec<String> {
    let mut cleaned = remove_comments(sql);
    if !keep_transaction {
        cleaned = remove_transactional(&cleaned);
    }
    cleaned = remove_newlines(&cleaned);
    cleaned = remove_empty_statements(&cleaned);
    split_statements(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_comments_and_transaction() {
        let sql = "BEGIN;\n-- load orders\nINSERT INTO a /* staging */ SELECT 1;\n;;\nCOMMIT;";
        assert_eq!(sanitize_sql(sql, false), vec!["INSERT INTO a  SELECT 1"]);
    }

    #[test]
    fn keeps_transaction_when_asked() {
        let sql = "BEGIN; DELETE FROM a; COMMIT;";
        assert_eq!(
            sanitize_sql(sql, true),
            vec!["BEGIN", "DELETE FROM a", "COMMIT"]
        );
    }

    #[test]
    fn semicolons_inside_quotes_do_not_split() {
        assert_eq!(
            sanitize_sql("a; xyz='0;0'; c;", false),
            vec!["a", "xyz='0;0'", "c"]
        );
    }

    #[test]
    fn newlines_inside_quotes_survive() {
        let sql = "SELECT 'line\none'\nFROM t";
        assert_eq!(sanitize_sql(sql, false), vec!["SELECT 'line\none' FROM t"]);
    }

    #[test]
    fn comment_markers_inside_quotes_survive() {
        let sql = "SELECT '--not a comment', '/* nor this */' FROM t";
        assert_eq!(sanitize_sql(sql, false), vec![sql.to_string()]);
    }

    #[test]
    fn apostrophe_in_line_comment_does_not_open_a_literal() {
        let sql = "SELECT 1; -- don't touch\nSELECT '/* keep */' AS marker FROM t;";
        assert_eq!(
            sanitize_sql(sql, false),
            vec!["SELECT 1", "SELECT '/* keep */' AS marker FROM t"]
        );
    }

    #[test]
    fn apostrophe_in_block_comment_does_not_open_a_literal() {
        let sql = "SELECT 1 /* it's fine */ ; SELECT '-- kept' FROM t";
        assert_eq!(sanitize_sql(sql, false), vec!["SELECT 1", "SELECT '-- kept' FROM t"]);
    }

    #[test]
    fn nested_block_comment_is_best_effort() {
        assert_eq!(remove_comments("x /* a /* b */ c */ y"), "x  c */ y");
    }

    #[test]
    fn unterminated_block_comment_runs_to_end() {
        assert_eq!(remove_comments("SELECT 1 /* dangling"), "SELECT 1 ");
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(sanitize_sql("  \n ;; -- nothing\n", false).is_empty());
    }

    #[test]
    fn commit_only_stripped_at_end() {
        assert_eq!(
            remove_transactional("INSERT INTO commit_log SELECT 1; COMMIT;"),
            "INSERT INTO commit_log SELECT 1;"
        );
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let inputs = [
            "BEGIN; a; b;; COMMIT;",
            "SELECT 'x;y' -- c\n FROM t; /* z */ SELECT 2",
            "CREATE TABLE t (\n id INT\n);",
        ];
        for input in inputs {
            let once = sanitize_sql(input, false);
            let twice = sanitize_sql(&once.join(";"), false);
            assert_eq!(once, twice, "input: {input}");
        }
    }
}
