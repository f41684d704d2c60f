//! Class-body productions: modifiers, field/method/constructor
//! declarations, and formal parameter lists (`rules/fields.py`,
//! `rules/methods_and_constructor.py`).

use std::cell::RefCell;
use std::rc::Rc;

use decaf_core::{
    Applicability, ConstructorHandle, ConstructorRecord, FieldHandle, FieldRecord, MethodHandle,
    MethodRecord, Type, VariableHandle, VariableKind, VariableRecord, Visibility,
};

use super::{ParseError, Parser};
use crate::lexer::Token;
use crate::scope::EnterOptions;

pub(crate) enum BodyDecl {
    Field(Vec<FieldHandle>),
    Method(MethodHandle),
    Constructor(ConstructorHandle),
}

struct Modifier {
    visibility: Visibility,
    is_static: bool,
}

/// `modifier : optional_public_or_private optional_static`. Both halves
/// default when absent: visibility to `private`, staticness to instance
/// (§6's modifier-dictionary responsibility).
fn parse_modifier(p: &mut Parser) -> Modifier {
    let visibility = if p.eat(&Token::Public) {
        Visibility::Public
    } else {
        p.eat(&Token::Private);
        Visibility::Private
    };
    let is_static = p.eat(&Token::Static);
    Modifier {
        visibility,
        is_static,
    }
}

fn parse_type(p: &mut Parser) -> Result<Type, ParseError> {
    if p.eat(&Token::Int) {
        Ok(Type::Int)
    } else if p.eat(&Token::Float) {
        Ok(Type::Float)
    } else if p.eat(&Token::Boolean) {
        Ok(Type::Boolean)
    } else if p.eat(&Token::Void) {
        Ok(Type::Void)
    } else {
        let (name, _) = p.expect_ident("type")?;
        Ok(Type::User(name))
    }
}

/// One `class_body_decl`: dispatches between field/method/constructor by
/// looking at what follows the modifier, since the grammar needs a
/// couple of tokens of lookahead to tell them apart (a builtin-type
/// keyword can only start a field or method; a bare identifier could be
/// the constructor's own name, a user-typed field, or a user-typed
/// method, resolved by what comes after the *next* identifier).
pub(crate) fn parse_class_body_decl(p: &mut Parser) -> Result<BodyDecl, ParseError> {
    let modifier = parse_modifier(p);

    if matches!(
        p.peek(),
        Some(Token::Int | Token::Float | Token::Boolean | Token::Void)
    ) {
        let ty = parse_type(p)?;
        let (name, _) = p.expect_ident("class-body-decl")?;
        return finish_field_or_method(p, modifier, ty, name);
    }

    let (id, line) = p.expect_ident("class-body-decl")?;
    if p.check(&Token::LParen) {
        return Ok(BodyDecl::Constructor(parse_constructor_rest(
            p, modifier, id, line,
        )?));
    }

    let ty = Type::User(id);
    let (name, _) = p.expect_ident("class-body-decl")?;
    finish_field_or_method(p, modifier, ty, name)
}

fn finish_field_or_method(
    p: &mut Parser,
    modifier: Modifier,
    ty: Type,
    name: String,
) -> Result<BodyDecl, ParseError> {
    if p.check(&Token::LParen) {
        Ok(BodyDecl::Method(parse_method_rest(p, modifier, ty, name)?))
    } else {
        Ok(BodyDecl::Field(parse_field_rest(p, modifier, ty, name)?))
    }
}

/// `field_decl`'s tail: `variables SEMICOLON`, with `name` already the
/// first variable. Fields are never registered as scope symbols — a
/// duplicate field name is instead caught when the class's `field_map`
/// is built (§3's invariant, `decaf_ast.py`'s `ClassRecord.__init__`).
fn parse_field_rest(
    p: &mut Parser,
    modifier: Modifier,
    ty: Type,
    name: String,
) -> Result<Vec<FieldHandle>, ParseError> {
    let containing_class = p
        .scopes
        .current_class_name()
        .expect("field decl inside a class scope");
    let mut names = vec![name];
    while p.eat(&Token::Comma) {
        names.push(p.expect_ident("field-decl")?.0);
    }
    p.expect(Token::Semicolon, "field-decl")?;

    let applicability = if modifier.is_static {
        Applicability::Static
    } else {
        Applicability::Instance
    };

    Ok(names
        .into_iter()
        .map(|name| {
            Rc::new(RefCell::new(FieldRecord {
                id: p.field_ids.next(),
                name,
                visibility: modifier.visibility,
                applicability,
                ty: ty.clone(),
                containing_class: containing_class.clone(),
                offset: None,
            }))
        })
        .collect())
}

/// `method_decl`'s tail, from the open paren onward. Opens the method's
/// scope with `share_table_with_child` so the body block (which opens its
/// own plain scope) reuses the formal parameters' symbol table — a local
/// re-declaring a formal is then a same-table collision.
fn parse_method_rest(
    p: &mut Parser,
    modifier: Modifier,
    return_type: Type,
    name: String,
) -> Result<MethodHandle, ParseError> {
    p.expect(Token::LParen, "method-decl")?;
    p.scopes.enter(EnterOptions::shared(), None);
    let parameters = parse_optional_formals(p)?;
    p.expect(Token::RParen, "method-decl")?;
    let body = super::stmt::parse_block(p)?;

    let containing_class = p
        .scopes
        .current_class_name()
        .expect("method decl inside a class scope");
    let variable_table = p.scopes.current_variable_table();
    p.scopes.exit();

    let applicability = if modifier.is_static {
        Applicability::Static
    } else {
        Applicability::Instance
    };

    Ok(Rc::new(RefCell::new(MethodRecord {
        id: p.method_ids.next(),
        name,
        visibility: modifier.visibility,
        applicability,
        parameters,
        return_type,
        body,
        variable_table,
        containing_class,
    })))
}

/// `constructor_decl`'s tail, from the open paren onward. `name`/`line`
/// are the identifier already consumed by the caller while disambiguating
/// it from a field/method declarator.
fn parse_constructor_rest(
    p: &mut Parser,
    modifier: Modifier,
    name: String,
    line: u32,
) -> Result<ConstructorHandle, ParseError> {
    let scope_class_name = p
        .scopes
        .current_class_name()
        .expect("constructor decl inside a class scope");
    if name != scope_class_name {
        return Err(p.error_at(
            line,
            "constructor-name-mismatch",
            format!("expected only constructor for {scope_class_name}, but got {name}"),
        ));
    }

    p.expect(Token::LParen, "constructor-decl")?;
    p.scopes.enter(EnterOptions::shared(), None);
    let parameters = parse_optional_formals(p)?;
    p.expect(Token::RParen, "constructor-decl")?;
    let body = super::stmt::parse_block(p)?;

    let variable_table = p.scopes.current_variable_table();
    p.scopes.exit();

    Ok(Rc::new(RefCell::new(ConstructorRecord {
        id: p.constructor_ids.next(),
        visibility: modifier.visibility,
        parameters,
        body,
        variable_table,
        containing_class: scope_class_name,
    })))
}

fn parse_optional_formals(p: &mut Parser) -> Result<Vec<VariableHandle>, ParseError> {
    if p.check(&Token::RParen) {
        return Ok(Vec::new());
    }
    let mut formals = vec![parse_formal_param(p)?];
    while p.eat(&Token::Comma) {
        formals.push(parse_formal_param(p)?);
    }
    Ok(formals)
}

fn parse_formal_param(p: &mut Parser) -> Result<VariableHandle, ParseError> {
    let ty = parse_type(p)?;
    let (name, line) = p.expect_ident("formal-param")?;
    let rec = VariableRecord::new_handle(name.clone(), VariableKind::Formal, ty);
    if !p.scopes.add_symbol(rec.clone()) {
        return Err(p.error_at(
            line,
            "duplicate-formal",
            format!("duplicate formal variable name: {name}"),
        ));
    }
    Ok(rec)
}

/// `var_decl : type variables SEMICOLON`, used both for a field
/// declaration's variable list and (via `stmt.rs`) a local declaration
/// statement.
pub(crate) fn parse_var_decl(p: &mut Parser) -> Result<Vec<VariableHandle>, ParseError> {
    let ty = parse_type(p)?;
    let mut names = vec![p.expect_ident("var-decl")?.0];
    while p.eat(&Token::Comma) {
        names.push(p.expect_ident("var-decl")?.0);
    }
    p.expect(Token::Semicolon, "var-decl")?;
    Ok(names
        .into_iter()
        .map(|name| VariableRecord::new_handle(name, VariableKind::Local, ty.clone()))
        .collect())
}
