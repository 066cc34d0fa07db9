//! Path expression parser
//!
//! Recursive descent over the token list, one function per grammar
//! rule, each taking and returning a token index:
//!
//! ```text
//! path      := step ('/' step)*
//! step      := ( '@' IDENT | '*' | '.' | IDENT ) predicate*
//! predicate := '[' ( INTEGER | '@' IDENT '=' (INTEGER|DECIMAL|DOUBLE|STRING) ) ']'
//! ```
//!
//! Paths are relative only: a leading `/` is rejected, and `//`
//! (descendant steps) is rejected wherever it appears.

use crate::dom::NodeKind;

use super::ast::{AxisStep, Filter, PathElement};
use super::lexer::{self, Token, TokenKind};
use super::PathSyntaxError;

/// Parse an expression into its evaluation pipeline.
pub fn parse(expression: &str) -> Result<PathElement, PathSyntaxError> {
    let tokens = lexer::tokenize(expression)?;
    let p = Parser {
        text: expression,
        tokens,
    };
    let (cur, path) = p.path(0)?;
    p.expect_end(cur)?;
    Ok(path)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
}

impl Parser<'_> {
    fn token(&self, at: usize) -> Token {
        // the EOF sentinel makes every index reachable by the grammar valid
        self.tokens[at.min(self.tokens.len() - 1)]
    }

    fn kind(&self, at: usize) -> TokenKind {
        self.token(at).kind
    }

    fn image(&self, at: usize) -> &str {
        let token = self.token(at);
        &self.text[token.start..token.end]
    }

    fn expected(&self, what: &str, at: usize) -> PathSyntaxError {
        PathSyntaxError::new(self.text, self.token(at).start, format!("expected {what}"))
    }

    fn consume(&self, at: usize, kind: TokenKind, what: &str) -> Result<usize, PathSyntaxError> {
        if self.kind(at) == kind {
            Ok(at + 1)
        } else {
            Err(self.expected(what, at))
        }
    }

    fn expect_end(&self, at: usize) -> Result<(), PathSyntaxError> {
        self.consume(at, TokenKind::Eof, "end of input").map(|_| ())
    }

    /// path := step ('/' step)*
    fn path(&self, start: usize) -> Result<(usize, PathElement), PathSyntaxError> {
        let mut path = PathElement::Root;
        let mut cur = self.step(start, &mut path)?;

        loop {
            match self.kind(cur) {
                TokenKind::Slash => {
                    cur = self.step(cur + 1, &mut path)?;
                }
                TokenKind::DoubleSlash => {
                    return Err(self.expected(
                        "`/` (descendant steps `//` are not supported)",
                        cur,
                    ));
                }
                _ => break,
            }
        }

        Ok((cur, path))
    }

    /// step := ( '@' IDENT | '*' | '.' | IDENT ) predicate*
    fn step(&self, start: usize, path: &mut PathElement) -> Result<usize, PathSyntaxError> {
        let mut cur = start;
        let prev = std::mem::replace(path, PathElement::Sink);

        let step = match self.kind(cur) {
            TokenKind::At => {
                cur = self.consume(cur + 1, TokenKind::Ident, "an attribute name")?;
                AxisStep::attribute(Some(self.image(cur - 1).to_string()))
            }
            TokenKind::Star => {
                cur += 1;
                AxisStep::child(Some(NodeKind::Element), None)
            }
            TokenKind::Dot => {
                cur += 1;
                AxisStep::self_step()
            }
            TokenKind::Ident => {
                cur += 1;
                AxisStep::child(Some(NodeKind::Element), Some(self.image(cur - 1).to_string()))
            }
            _ => return Err(self.expected("a step (*, ., name, or @attr)", cur)),
        };
        *path = prev.and_then(PathElement::Step(step));

        while self.kind(cur) == TokenKind::LBracket {
            cur = self.predicate(cur, path)?;
        }
        Ok(cur)
    }

    /// predicate := '[' ( INTEGER | '@' IDENT '=' literal ) ']'
    fn predicate(&self, start: usize, path: &mut PathElement) -> Result<usize, PathSyntaxError> {
        let mut cur = self.consume(start, TokenKind::LBracket, "a predicate")?;
        match self.kind(cur) {
            TokenKind::Int => {
                let index: usize = self
                    .image(cur)
                    .parse()
                    .map_err(|_| self.expected("a position index that fits in usize", cur))?;
                if index == 0 {
                    return Err(self.expected("a 1-based position index", cur));
                }
                path.accept_filter(Filter::Position(index));
                cur += 1;
            }
            TokenKind::At => {
                cur = self.consume(cur + 1, TokenKind::Ident, "an attribute name")?;
                let name = self.image(cur - 1).to_string();
                cur = self.consume(cur, TokenKind::Eq, "`=` (attribute comparison)")?;
                let value = match self.kind(cur) {
                    TokenKind::Int | TokenKind::Decimal | TokenKind::Double => {
                        self.image(cur).to_string()
                    }
                    TokenKind::Str => {
                        let image = self.image(cur);
                        image[1..image.len() - 1].to_string()
                    }
                    _ => return Err(self.expected("a string or number", cur)),
                };
                cur += 1;
                path.accept_filter(Filter::AttrEquals { name, value });
            }
            _ => return Err(self.expected("an attribute test, or a number", cur)),
        }
        self.consume(cur, TokenKind::RBracket, "`]`")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let path = parse("a/b/c").unwrap();
        assert_eq!(
            path.to_string(),
            "child::element(a)/child::element(b)/child::element(c)"
        );
    }

    #[test]
    fn test_steps_and_predicates() {
        let path = parse("a/*[@size = 1][@unit = 'em']/@id").unwrap();
        assert_eq!(
            path.to_string(),
            "child::element(a)/child::element()[@size = '1'][@unit = 'em']/attribute::attribute(id)"
        );
    }

    #[test]
    fn test_self_step_identity() {
        assert_eq!(
            parse("a/./b").unwrap(),
            parse("a/b").unwrap(),
        );
        assert_eq!(parse(".").unwrap(), PathElement::Step(AxisStep::self_step()));
    }

    #[test]
    fn test_conflicting_positions_are_statically_empty() {
        assert_eq!(parse("a[1][2]").unwrap(), PathElement::Sink);
        // anything composed after the sink stays a sink
        assert_eq!(parse("a[1][2]/b").unwrap(), PathElement::Sink);
    }

    #[test]
    fn test_relative_only() {
        assert!(parse("/a").is_err());
        assert!(parse("//a").is_err());
        let err = parse("a//b").unwrap_err();
        assert!(err.message().contains("descendant"));
        assert_eq!(err.offset(), 1);
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        let err = parse("a/b[").unwrap_err();
        assert_eq!(err.offset(), 4);
        let err = parse("a/b[@x 1]").unwrap_err();
        assert_eq!(err.offset(), 7);
        let err = parse("a/@").unwrap_err();
        assert_eq!(err.offset(), 3);
        assert!(parse("a/b]").is_err());
        assert!(parse("").is_err());
        assert!(parse("a[0]").is_err());
    }

    #[test]
    fn test_number_literals_in_attr_tests() {
        let path = parse("e[@a = 1.5]").unwrap();
        assert_eq!(path.to_string(), "child::element(e)[@a = '1.5']");
    }
}
