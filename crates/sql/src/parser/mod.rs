//! Parsers for the statements the relational model cares about: CREATE
//! TABLE, CREATE VIEW and the projection/FROM clauses of SELECT.

mod create_table;
mod create_view;
mod select;

pub use create_table::{
    parse_create_table, ColumnDef, CreateTableDef, DistStyle, ForeignKeyRef, Nullability,
    TableConstraint,
};
pub use create_view::{parse_create_view, CreateViewDef};
pub use select::{parse_column_name, parse_select_columns, parse_select_dependencies};

use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Word};

/// Render an identifier with its quotes so generated SQL round-trips.
pub(crate) fn word_text(word: &Word) -> String {
    match word.quote_style {
        Some(q) => format!("{q}{}{q}", word.value),
        None => word.value.clone(),
    }
}

fn word_matches(token: &Token, word: &str) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(word))
}

/// Word-level helpers for Redshift DDL extensions (`DISTKEY`, `ENCODE`, ...)
/// that the generic keyword table does not cover.
pub(crate) trait DdlParse {
    fn peek_words(&self, words: &[&str]) -> bool;
    fn parse_word(&mut self, word: &str) -> bool;
    fn parse_words(&mut self, words: &[&str]) -> bool;
    fn parse_name_part(&mut self) -> Result<String, ParserError>;
    fn parse_relation_name(&mut self) -> Result<String, ParserError>;
    fn parse_name_list(&mut self) -> Result<Vec<String>, ParserError>;
    fn expect_end(&mut self) -> Result<(), ParserError>;
}

impl DdlParse for Parser<'_> {
    fn peek_words(&self, words: &[&str]) -> bool {
        words
            .iter()
            .enumerate()
            .all(|(i, word)| word_matches(&self.peek_nth_token(i).token, word))
    }

    fn parse_word(&mut self, word: &str) -> bool {
        self.parse_words(&[word])
    }

    fn parse_words(&mut self, words: &[&str]) -> bool {
        if !self.peek_words(words) {
            return false;
        }
        for _ in words {
            self.next_token();
        }
        true
    }

    fn parse_name_part(&mut self) -> Result<String, ParserError> {
        match self.next_token().token {
            Token::Word(w) => Ok(word_text(&w)),
            other => Err(ParserError::ParserError(format!(
                "Expected identifier, found {other}"
            ))),
        }
    }

    fn parse_relation_name(&mut self) -> Result<String, ParserError> {
        let mut parts = vec![self.parse_name_part()?];
        while self.consume_token(&Token::Period) {
            parts.push(self.parse_name_part()?);
        }
        Ok(parts.join("."))
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParserError> {
        self.expect_token(&Token::LParen)?;
        let mut names = vec![self.parse_name_part()?];
        while self.consume_token(&Token::Comma) {
            names.push(self.parse_name_part()?);
        }
        self.expect_token(&Token::RParen)?;
        Ok(names)
    }

    fn expect_end(&mut self) -> Result<(), ParserError> {
        while self.consume_token(&Token::SemiColon) {}
        match self.peek_token().token {
            Token::EOF => Ok(()),
            other => Err(ParserError::ParserError(format!(
                "Unexpected trailing input starting at {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::RedshiftSqlDialect;

    #[test]
    fn words_match_case_insensitively() {
        let dialect = RedshiftSqlDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql("distkey Compound SORTKEY")
            .unwrap();
        assert!(parser.parse_word("DISTKEY"));
        assert!(!parser.parse_words(&["COMPOUND", "DISTKEY"]));
        assert!(parser.parse_words(&["COMPOUND", "SORTKEY"]));
        assert!(parser.expect_end().is_ok());
    }

    #[test]
    fn relation_names_keep_quotes() {
        let dialect = RedshiftSqlDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(r#"staging."Orders" (a, b)"#)
            .unwrap();
        assert_eq!(parser.parse_relation_name().unwrap(), r#"staging."Orders""#);
        assert_eq!(parser.parse_name_list().unwrap(), vec!["a", "b"]);
    }
}
