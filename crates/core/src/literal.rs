//! Strict codec for list-of-string literals.
//!
//! Checkpoint records store token lists as list literals in the familiar
//! `['a', "b'c"]` notation. Writing follows the usual repr rules (single
//! quotes unless the item holds a single quote and no double quote). Reading
//! is a small typed parser that accepts exactly a list of quoted strings and
//! rejects anything else.

use crate::error::{InductionError, Result};
use std::fmt::Write;

/// Quote a single string item.
pub fn quote(item: &str) -> String {
    let quote = if item.contains('\'') && !item.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(item.len() + 2);
    out.push(quote);
    for ch in item.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Format items as a list literal: `['a', 'b']`.
pub fn format_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("[");
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote(item.as_ref()));
    }
    out.push(']');
    out
}

/// Parse a list literal of quoted strings.
pub fn parse_list(input: &str) -> Result<Vec<String>> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_ws();
    parser.expect('[')?;
    parser.skip_ws();

    let mut items = Vec::new();
    if parser.eat(']') {
        return parser.finish(items);
    }

    loop {
        items.push(parser.string()?);
        parser.skip_ws();
        if parser.eat(']') {
            break;
        }
        parser.expect(',')?;
        parser.skip_ws();
        // trailing comma
        if parser.eat(']') {
            break;
        }
    }

    parser.finish(items)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> InductionError {
        InductionError::Literal {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}")))
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn finish(mut self, items: Vec<String>) -> Result<Vec<String>> {
        self.skip_ws();
        if self.pos != self.input.len() {
            return Err(self.error("trailing characters after list"));
        }
        Ok(items)
    }

    fn string(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some('\n') => return Err(self.error("newline inside string")),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        match self.bump() {
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('x') => self.hex(2),
            Some('u') => self.hex(4),
            Some('U') => self.hex(8),
            _ => Err(self.error("unknown escape sequence")),
        }
    }

    fn hex(&mut self, digits: usize) -> Result<char> {
        let end = self.pos + digits;
        let code = self
            .input
            .get(self.pos..end)
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|s| u32::from_str_radix(s, 16).ok())
            .ok_or_else(|| self.error("malformed hex escape"))?;
        let ch = char::from_u32(code).ok_or_else(|| self.error("escape is not a scalar value"))?;
        self.pos = end;
        Ok(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_plain_items() {
        assert_eq!(format_list(["t_1", "c"]), "['t_1', 'c']");
        assert_eq!(format_list(Vec::<&str>::new()), "[]");
    }

    #[test]
    fn test_quote_switches_to_double_quotes() {
        // a serialized chord as produced upstream
        assert_eq!(quote("['n_60_4']"), "\"['n_60_4']\"");
        assert_eq!(quote("it's \"x\""), "'it\\'s \"x\"'");
        assert_eq!(quote("a\\b\tc"), "'a\\\\b\\tc'");
    }

    #[test]
    fn test_parse_reads_back_formatted_lists() {
        let items = vec![
            "['n_64_4', 'n_67_4']".to_string(),
            "t_3".to_string(),
            "both ' and \"".to_string(),
            "tab\tnewline\nbell\u{7}".to_string(),
            "é♪".to_string(),
        ];
        let literal = format_list(&items);
        assert_eq!(parse_list(&literal).unwrap(), items);
    }

    #[test]
    fn test_parse_accepts_whitespace_and_trailing_comma() {
        assert_eq!(
            parse_list("  [ 'a' ,\"b\", ] ").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(parse_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_literals() {
        for bad in [
            "",
            "['a'",
            "['a' 'b']",
            "[a]",
            "['a'] + ['b']",
            "__import__('os')",
            "[1, 2]",
            "['\\q']",
            "['\\x4']",
            "[,]",
        ] {
            assert!(parse_list(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_error_reports_offset() {
        match parse_list("['a', b]") {
            Err(InductionError::Literal { offset, .. }) => assert_eq!(offset, 6),
            other => panic!("unexpected {other:?}"),
        }
    }
}
