//! vela-front - Resolved source model of the Vela language
//!
//! The front end (parser, name resolution, type checker) produces the
//! structures in this crate; the back end consumes them read-only.
//! Units serialize to JSON so the two halves can run as separate
//! processes.

pub mod ast;
pub mod types;

pub use ast::{
    BinOp, CmpOp, Expr, ExprKind, FunctionDecl, LocalDecl, Param, Stmt, Unit,
};
pub use types::{Field, RepClause, TypeDecl, TypeId, TypeKind, TypeTable};
