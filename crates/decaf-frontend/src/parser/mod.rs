//! Recursive-descent parser driving the AST contract of §6.
//!
//! One function per grammar production, split across sibling modules by
//! construct (`class`, `members`, `stmt`, `expr`) rather than a single
//! monolithic `parse` function, matching the teacher's
//! `parser/grammar/*.rs` layout.

mod class;
mod expr;
mod members;
mod stmt;

use decaf_core::{ClassHandle, Diagnostic, DiagnosticKind, IdGenerator, Span};

use crate::lexer::{tokenize, SpannedToken, Token};
use crate::scope::ScopeStack;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub Diagnostic);

/// Token cursor plus the state threaded across the whole parse: the scope
/// stack (§4.1) and the per-kind id counters fields/methods/constructors
/// are allocated from (§3's "per-kind monotonic counter", carried here
/// rather than as process-wide state per §11's open-question decision).
pub(crate) struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    pub(crate) scopes: ScopeStack,
    pub(crate) field_ids: IdGenerator,
    pub(crate) method_ids: IdGenerator,
    pub(crate) constructor_ids: IdGenerator,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser {
            tokens,
            pos: 0,
            scopes: ScopeStack::new(),
            field_ids: IdGenerator::starting_at_one(),
            method_ids: IdGenerator::starting_at_one(),
            constructor_ids: IdGenerator::starting_at_one(),
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Looks `offset` tokens past the current one, for the handful of
    /// productions (e.g. a statement starting with a user-typed
    /// declaration) that need a second token of lookahead to disambiguate.
    pub(crate) fn peek_nth(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    /// The line of the current token, or the last token's line at EOF.
    pub(crate) fn peek_line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    pub(crate) fn check(&self, tok: &Token) -> bool {
        self.peek() == Some(tok)
    }

    pub(crate) fn bump(&mut self) -> Option<SpannedToken> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat(&mut self, tok: &Token) -> bool {
        if self.check(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, tok: Token, rule: &'static str) -> Result<(), ParseError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.error(rule, format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    pub(crate) fn expect_ident(&mut self, rule: &'static str) -> Result<(String, u32), ParseError> {
        let line = self.peek_line();
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.bump();
                Ok((name, line))
            }
            other => Err(self.error(rule, format!("expected identifier, found {other:?}"))),
        }
    }

    pub(crate) fn error(&self, rule: &'static str, message: impl Into<String>) -> ParseError {
        self.error_at(self.peek_line(), rule, message)
    }

    pub(crate) fn error_at(
        &self,
        line: u32,
        rule: &'static str,
        message: impl Into<String>,
    ) -> ParseError {
        ParseError(Diagnostic::new(
            DiagnosticKind::Parse,
            rule,
            Span::single(line),
            message,
        ))
    }
}

/// Lexes and parses a whole Decaf source file into its class records,
/// resolving identifiers against the lexical scope stack as it goes (§4.1).
pub fn parse_program(source: &str) -> Result<Vec<ClassHandle>, ParseError> {
    let tokens = tokenize(source).map_err(|err| {
        ParseError(Diagnostic::new(
            DiagnosticKind::Parse,
            "lex-unrecognized-character",
            Span::single(err.line),
            "unrecognized character",
        ))
    })?;

    let mut parser = Parser::new(tokens);
    let mut classes = Vec::new();
    while !parser.at_end() {
        classes.push(class::parse_class_decl(&mut parser)?);
    }
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_a_class_with_a_field_method_and_constructor() {
        let classes = parse_program(indoc! {"
            class Point {
                int x;
                int y;

                Point(int x, int y) {
                    this.x = x;
                    this.y = y;
                }

                int getX() {
                    return this.x;
                }
            }
        "})
        .unwrap();
        assert_eq!(classes.len(), 1);
        let point = classes[0].borrow();
        assert_eq!(point.name, "Point");
        assert_eq!(point.fields.len(), 2);
        assert_eq!(point.methods.len(), 1);
        assert!(point.constructor.is_some());
    }

    #[test]
    fn rejects_class_extending_itself() {
        let err = parse_program("class A extends A { int x; }").unwrap_err();
        assert_eq!(err.0.rule, "class-extends-self");
    }

    #[test]
    fn rejects_more_than_one_constructor() {
        let err = parse_program(indoc! {"
            class A {
                A() { }
                A(int x) { }
            }
        "})
        .unwrap_err();
        assert_eq!(err.0.rule, "multiple-constructors");
    }

    #[test]
    fn rejects_bare_call_without_dotted_base() {
        let err = parse_program(indoc! {"
            class A {
                void f() { }
                void g() { f(); }
            }
        "})
        .unwrap_err();
        // `f()` without an explicit `this.`/class-literal base is not a
        // method invocation; the parser falls through to a generic syntax
        // error at the `;` that should have followed `f`.
        assert_eq!(err.0.rule, "expr-stmt");
    }

    #[test]
    fn parses_control_flow_and_loops() {
        let classes = parse_program(indoc! {"
            class A {
                void run() {
                    int i;
                    i = 0;
                    while (i < 10) {
                        if (i == 5) {
                            break;
                        } else {
                            i = i + 1;
                        }
                    }
                    for (i = 0; i < 10; i++) {
                        continue;
                    }
                }
            }
        "})
        .unwrap();
        assert_eq!(classes.len(), 1);
    }

    #[test]
    fn rejects_duplicate_local_variable() {
        let err = parse_program(indoc! {"
            class A {
                void run() {
                    int x;
                    int x;
                }
            }
        "})
        .unwrap_err();
        assert_eq!(err.0.rule, "duplicate-variable");
    }

    #[test]
    fn rejects_class_reference_on_lhs_of_assignment() {
        let err = parse_program(indoc! {"
            class A {
                void run() {
                    A = 1;
                }
            }
        "})
        .unwrap_err();
        assert_eq!(err.0.rule, "assign-to-class-reference");
    }
}
