use std::cell::RefCell;

use crate::record::{ConstructorHandle, FieldHandle, MethodHandle, VariableHandle};
use crate::registers::ValueReg;
use crate::span::Span;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation, `-e`.
    Neg,
    /// Boolean negation, `!e`.
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPosition {
    Pre,
    Post,
}

/// One expression node (§2). The `kind` carries the shape; `ty` and
/// `value_reg` are write-once-per-pass caches filled in by type-checking
/// and code generation respectively, so a node can be walked more than
/// once (e.g. re-read by a later member) without redoing either pass.
#[derive(Debug)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
    ty: RefCell<Option<Type>>,
    value_reg: RefCell<Option<ValueReg>>,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Expr {
            span,
            kind,
            ty: RefCell::new(None),
            value_reg: RefCell::new(None),
        }
    }

    /// A node whose type is known at construction time (constants, `this`).
    pub fn with_type(span: Span, kind: ExprKind, ty: Type) -> Self {
        Expr {
            span,
            kind,
            ty: RefCell::new(Some(ty)),
            value_reg: RefCell::new(None),
        }
    }

    pub fn cached_type(&self) -> Option<Type> {
        self.ty.borrow().clone()
    }

    /// Set by a type-checking pass exactly once per node (§4.2's memoized
    /// `resolve_type`).
    pub fn set_type(&self, ty: Type) {
        *self.ty.borrow_mut() = Some(ty);
    }

    pub fn value_reg(&self) -> Option<ValueReg> {
        *self.value_reg.borrow()
    }

    /// Set by code generation exactly once per node (§4.5's `value_reg`).
    pub fn set_value_reg(&self, reg: ValueReg) {
        *self.value_reg.borrow_mut() = Some(reg);
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Constant(Constant),
    Var(VariableHandle),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Auto {
        expr: Box<Expr>,
        op: AutoOp,
        position: AutoPosition,
    },
    FieldAccess {
        base: Box<Expr>,
        name: String,
        containing_class: String,
        /// Resolved by type-checking (§4.2).
        field: RefCell<Option<FieldHandle>>,
    },
    MethodCall {
        base: Box<Expr>,
        name: String,
        arguments: Vec<Expr>,
        containing_class: String,
        /// Resolved by type-checking (§4.2).
        method: RefCell<Option<MethodHandle>>,
    },
    NewObject {
        class_name: String,
        arguments: Vec<Expr>,
        containing_class: String,
        /// Resolved by type-checking (§4.2).
        constructor: RefCell<Option<ConstructorHandle>>,
    },
    This {
        containing_class: String,
    },
    Super {
        containing_class: String,
    },
    ClassReference {
        class_name: String,
    },
}
