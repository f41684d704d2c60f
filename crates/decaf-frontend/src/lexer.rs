//! Tokenizer for Decaf source (§6's "lexical analyzer" collaborator).
//!
//! Grounded on `examples/original_source/src/decaf_lexer.py` /
//! `decaf_tokens.py` for the token set (including the nested
//! `/* ... */` comment rule) and on the teacher's `plotnik-lib/src/ql/lexer.rs`
//! for the logos-based token enum shape.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("boolean")]
    Boolean,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("class")]
    Class,
    #[token("else")]
    Else,
    #[token("extends")]
    Extends,
    #[token("false")]
    False,
    #[token("float")]
    Float,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("int")]
    Int,
    #[token("new")]
    New,
    #[token("null")]
    Null,
    #[token("private")]
    Private,
    #[token("public")]
    Public,
    #[token("return")]
    Return,
    #[token("static")]
    Static,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("void")]
    Void,
    #[token("while")]
    While,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    #[token("++")]
    DoublePlus,
    #[token("--")]
    DoubleMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Times,
    #[token("/")]
    Divide,
    #[token("==")]
    DoubleEqual,
    #[token("=")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("!")]
    Not,
    #[token("<=")]
    LessEqual,
    #[token("<")]
    Less,
    #[token(">=")]
    GreaterEqual,
    #[token(">")]
    Greater,
    #[token("&&")]
    And,
    #[token("||")]
    Or,

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatConstant(f64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntegerConstant(i64),
    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); s[1..s.len()-1].to_string() })]
    StringConstant(String),

    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// A [`Token`] paired with the 1-based source line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unrecognized character at line {line}")]
pub struct LexError {
    pub line: u32,
}

/// Replaces `/* ... */` block comments with whitespace of the same shape
/// (blanks in place of content, newlines preserved), so a later line-number
/// lookup by byte offset against the *original* source stays accurate
/// without the lexer needing to track comment-nesting state itself.
fn strip_block_comments(source: &str) -> Result<String, LexError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut line = 1u32;

    loop {
        match rest.find("/*") {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                line += rest[..start].matches('\n').count() as u32;
                out.push_str(&rest[..start]);
                let after = &rest[start + 2..];
                let close = after.find("*/").ok_or(LexError { line })?;
                for ch in after[..close].chars() {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
                line += after[..close].matches('\n').count() as u32;
                rest = &after[close + 2..];
            }
        }
    }

    Ok(out)
}

fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

fn line_for_offset(line_starts: &[usize], offset: usize) -> u32 {
    match line_starts.binary_search(&offset) {
        Ok(i) => (i + 1) as u32,
        Err(i) => i as u32,
    }
}

/// Runs the tokenizer to completion, producing every non-comment,
/// non-whitespace token paired with its 1-based source line.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
    let cleaned = strip_block_comments(source)?;
    let starts = line_starts(&cleaned);

    let mut out = Vec::new();
    let mut lexer = Token::lexer(&cleaned);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => out.push(SpannedToken {
                token,
                line: line_for_offset(&starts, span.start),
            }),
            Err(()) => {
                return Err(LexError {
                    line: line_for_offset(&starts, span.start),
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_class_skeleton() {
        let toks = tokenize("class A {\n  public int f() { return 1; }\n}").unwrap();
        assert!(matches!(toks[0].token, Token::Class));
        assert!(matches!(&toks[1].token, Token::Ident(s) if s == "A"));
    }

    #[test]
    fn skips_block_comments_and_tracks_lines() {
        let toks = tokenize("class /* a\nb */ A {}").unwrap();
        assert!(matches!(&toks[1].token, Token::Ident(s) if s == "A"));
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn skips_line_comments() {
        let toks = tokenize("class A // trailing\n{}").unwrap();
        assert!(matches!(toks[2].token, Token::LBrace));
    }

    #[test]
    fn distinguishes_double_and_single_char_operators() {
        let toks = tokenize("a++ + ++b").unwrap();
        assert!(matches!(toks[1].token, Token::DoublePlus));
        assert!(matches!(toks[2].token, Token::Plus));
        assert!(matches!(toks[3].token, Token::DoublePlus));
    }

    #[test]
    fn rejects_unterminated_block_comment() {
        let err = tokenize("class A /* oops").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
