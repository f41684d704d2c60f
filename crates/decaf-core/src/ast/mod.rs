//! The tagged-variant expression/statement AST (§2, §9's design note).
//!
//! The front-end's grammar productions build one of these trees per
//! class member body. Using a handful of closed enums instead of a class
//! per node (the shape this is ported from) is what lets type-checking
//! and code generation be written as a single exhaustive `match` per
//! pass, rather than a virtual method per node kind: the compiler, not a
//! reviewer, notices when a new operator or statement form is missing a
//! case.

mod expr;
mod stmt;

pub use expr::{AutoOp, AutoPosition, BinaryOp, Constant, Expr, ExprKind, UnaryOp};
pub use stmt::{Stmt, StmtKind};
