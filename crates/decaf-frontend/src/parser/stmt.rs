//! `block`/`stmt`/`stmt_expr`/`var_decl`-as-statement (`rules/statements.py`).

use decaf_core::{Span, Stmt, StmtKind};

use super::expr::parse_expr;
use super::members::parse_var_decl;
use super::{ParseError, Parser};
use crate::lexer::Token;
use crate::scope::EnterOptions;

/// `block : enter_normal_scope stmt_list RBRACE`.
pub(crate) fn parse_block(p: &mut Parser) -> Result<Stmt, ParseError> {
    let line = p.peek_line();
    p.expect(Token::LBrace, "block")?;
    p.scopes.enter(EnterOptions::PLAIN, None);

    let mut stmts = Vec::new();
    while !p.check(&Token::RBrace) {
        stmts.push(parse_stmt(p)?);
    }
    let end_line = p.peek_line();
    p.expect(Token::RBrace, "block")?;
    p.scopes.exit();

    Ok(Stmt::new(Span::new(line, end_line), StmtKind::Block(stmts)))
}

pub(crate) fn parse_stmt(p: &mut Parser) -> Result<Stmt, ParseError> {
    let line = p.peek_line();

    if p.check(&Token::LBrace) {
        return parse_block(p);
    }
    if p.eat(&Token::Semicolon) {
        return Ok(Stmt::new(Span::single(line), StmtKind::Skip));
    }
    if p.eat(&Token::Break) {
        p.expect(Token::Semicolon, "break-stmt")?;
        return Ok(Stmt::new(Span::single(line), StmtKind::Break));
    }
    if p.eat(&Token::Continue) {
        p.expect(Token::Semicolon, "continue-stmt")?;
        return Ok(Stmt::new(Span::single(line), StmtKind::Continue));
    }
    if p.eat(&Token::Return) {
        let value = if p.check(&Token::Semicolon) {
            None
        } else {
            Some(parse_expr(p)?)
        };
        let end_line = p.peek_line();
        p.expect(Token::Semicolon, "return-stmt")?;
        return Ok(Stmt::new(
            Span::new(line, end_line),
            StmtKind::Return(value),
        ));
    }
    if p.eat(&Token::If) {
        return parse_if_stmt(p, line);
    }
    if p.eat(&Token::While) {
        return parse_while_stmt(p, line);
    }
    if p.eat(&Token::For) {
        return parse_for_stmt(p, line);
    }
    if matches!(
        p.peek(),
        Some(Token::Int | Token::Float | Token::Boolean | Token::Void)
    ) {
        return parse_var_decl_stmt(p, line);
    }
    // A bare identifier could start either a `var_decl` (user type name) or
    // a `stmt_expr` (a variable/field-access expression). One token of
    // lookahead past the identifier disambiguates them: `type` follows with
    // another identifier, `expr` does not.
    if matches!(p.peek(), Some(Token::Ident(_))) {
        let is_var_decl = matches!(p.peek_nth(1), Some(Token::Ident(_)));
        if is_var_decl {
            return parse_var_decl_stmt(p, line);
        }
    }

    let expr = parse_expr(p)?;
    let end_line = p.peek_line();
    p.expect(Token::Semicolon, "expr-stmt")?;
    Ok(Stmt::new(Span::new(line, end_line), StmtKind::Expr(expr)))
}

fn parse_var_decl_stmt(p: &mut Parser, line: u32) -> Result<Stmt, ParseError> {
    let variables = parse_var_decl(p)?;
    for var in &variables {
        if !p.scopes.add_symbol(var.clone()) {
            let name = var.borrow().name.clone();
            return Err(p.error_at(
                line,
                "duplicate-variable",
                format!("duplicate variable name in scope: {name}"),
            ));
        }
    }
    Ok(Stmt::new(
        Span::single(line),
        StmtKind::VariableDeclaration(variables),
    ))
}

fn parse_if_stmt(p: &mut Parser, line: u32) -> Result<Stmt, ParseError> {
    p.expect(Token::LParen, "if-stmt")?;
    let condition = parse_expr(p)?;
    p.expect(Token::RParen, "if-stmt")?;
    let then_branch = Box::new(parse_stmt(p)?);
    let else_branch = if p.eat(&Token::Else) {
        Some(Box::new(parse_stmt(p)?))
    } else {
        None
    };
    let end_line = p.peek_line();
    Ok(Stmt::new(
        Span::new(line, end_line.max(line)),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        },
    ))
}

fn parse_while_stmt(p: &mut Parser, line: u32) -> Result<Stmt, ParseError> {
    p.expect(Token::LParen, "while-stmt")?;
    let condition = parse_expr(p)?;
    p.expect(Token::RParen, "while-stmt")?;
    let body = Box::new(parse_stmt(p)?);
    Ok(Stmt::new(
        Span::new(line, p.peek_line().max(line)),
        StmtKind::While { condition, body },
    ))
}

/// `FOR LPAREN optional_stmt_expr SEMICOLON optional_expr SEMICOLON
/// optional_stmt_expr RPAREN stmt`. All three clauses are required here:
/// the original's `None` clauses are never exercised by its own
/// `generate_code`/`compute_type_correct` (which call straight through to
/// `init_expr.generate_code()` etc. with no `None` guard), so an omitted
/// clause there is a latent crash rather than a supported feature.
fn parse_for_stmt(p: &mut Parser, line: u32) -> Result<Stmt, ParseError> {
    p.expect(Token::LParen, "for-stmt")?;
    let init = parse_expr(p)?;
    p.expect(Token::Semicolon, "for-stmt")?;
    let condition = parse_expr(p)?;
    p.expect(Token::Semicolon, "for-stmt")?;
    let update = parse_expr(p)?;
    p.expect(Token::RParen, "for-stmt")?;
    let body = Box::new(parse_stmt(p)?);
    Ok(Stmt::new(
        Span::new(line, p.peek_line().max(line)),
        StmtKind::For {
            init,
            condition,
            update,
            body,
        },
    ))
}
