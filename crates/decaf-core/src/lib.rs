//! Core data model for the Decaf compiler.
//!
//! This crate owns the types shared between the parser front-end
//! (`decaf-frontend`) and the compiler passes (`decaf-compiler`): the type
//! lattice, the class/member/variable records, the tagged expression and
//! statement AST, the dependency tree, and the id/register counters used
//! during code generation.

mod dependency_tree;
mod diagnostic;
mod ids;
mod record;
mod registers;
mod span;
mod types;

pub mod ast;

pub use ast::{AutoOp, AutoPosition, BinaryOp, Constant, Expr, ExprKind, Stmt, StmtKind, UnaryOp};
pub use dependency_tree::{DependencyError, DependencyTree};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use ids::IdGenerator;
pub use record::{
    Applicability, ClassHandle, ClassRecord, ConstructorHandle, ConstructorRecord,
    DuplicateMemberError, FieldHandle, FieldRecord, MethodHandle, MethodRecord, VariableHandle,
    VariableKind, VariableRecord, Visibility,
};
pub use registers::{
    ArgRegister, ArgRegisterGenerator, LabelGenerator, LabelId, TempRegister,
    TempRegisterGenerator, ValueReg,
};
pub use span::Span;
pub use types::Type;
