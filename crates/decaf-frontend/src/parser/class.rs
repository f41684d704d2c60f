//! `class_decl` (`rules/class_declarations.py`).

use std::cell::RefCell;
use std::rc::Rc;

use decaf_core::{ClassHandle, ClassRecord};

use super::members::{parse_class_body_decl, BodyDecl};
use super::{ParseError, Parser};
use crate::lexer::Token;
use crate::scope::EnterOptions;

/// `class_decl : CLASS ID optional_extends LBRACE at_least_one_class_body_decl RBRACE`.
///
/// The class's own scope is entered right after its name is read (matching
/// `enter_class`'s placement ahead of `optional_extends`), so `extends`
/// itself is parsed outside of, but every body declaration inside, the
/// class's blocking scope.
pub(crate) fn parse_class_decl(p: &mut Parser) -> Result<ClassHandle, ParseError> {
    p.expect(Token::Class, "class-decl")?;
    let (name, line) = p.expect_ident("class-decl")?;
    p.scopes.enter(EnterOptions::blocking(), Some(name.clone()));

    let super_class_name = if p.eat(&Token::Extends) {
        Some(p.expect_ident("class-decl")?.0)
    } else {
        None
    };

    if super_class_name.as_deref() == Some(name.as_str()) {
        return Err(p.error_at(
            line,
            "class-extends-self",
            format!("class {name} cannot extend itself"),
        ));
    }

    p.expect(Token::LBrace, "class-decl")?;

    let mut fields = Vec::new();
    let mut methods = Vec::new();
    let mut constructors = Vec::new();
    loop {
        match parse_class_body_decl(p)? {
            BodyDecl::Field(fs) => fields.extend(fs),
            BodyDecl::Method(m) => methods.push(m),
            BodyDecl::Constructor(c) => constructors.push(c),
        }
        if p.check(&Token::RBrace) {
            break;
        }
    }
    p.expect(Token::RBrace, "class-decl")?;

    if constructors.len() > 1 {
        return Err(p.error_at(
            line,
            "multiple-constructors",
            format!("class {name} declares more than one constructor"),
        ));
    }

    p.scopes.exit();

    let record = ClassRecord::try_new(
        name,
        super_class_name,
        constructors.pop(),
        methods,
        fields,
    )
    .map_err(|err| p.error_at(line, "duplicate-member", err.to_string()))?;
    Ok(Rc::new(RefCell::new(record)))
}
