use std::cell::Cell;

use super::expr::Expr;
use crate::record::VariableHandle;
use crate::span::Span;

/// One statement node (§2). `type_correct` is a one-shot memoized latch
/// (§4.3's `resolve_type_correct`): once a statement has been checked, a
/// later pass that walks the tree again (code generation) does not pay
/// for re-checking it.
#[derive(Debug)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
    type_correct: Cell<Option<bool>>,
}

impl Stmt {
    pub fn new(span: Span, kind: StmtKind) -> Self {
        Stmt {
            span,
            kind,
            type_correct: Cell::new(None),
        }
    }

    pub fn cached_type_correct(&self) -> Option<bool> {
        self.type_correct.get()
    }

    pub fn set_type_correct(&self, value: bool) {
        self.type_correct.set(Some(value));
    }
}

#[derive(Debug)]
pub enum StmtKind {
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Expr,
        condition: Expr,
        update: Expr,
        body: Box<Stmt>,
    },
    /// `None` is a bare `return;`.
    Return(Option<Expr>),
    Expr(Expr),
    Block(Vec<Stmt>),
    Break,
    Continue,
    Skip,
    /// Declares locals within the enclosing block; carries no code of its
    /// own, but code generation still walks it to give each variable a
    /// value register before any use (§4.5).
    VariableDeclaration(Vec<VariableHandle>),
}
