//! Typed AST - the resolved tree the Vela front end hands to the back end
//!
//! Name resolution and type checking already happened; every expression
//! carries the `TypeId` the checker gave it, plus the source line and
//! column for diagnostics and debug locations.

use crate::types::{TypeId, TypeTable};
use serde::{Deserialize, Serialize};

/// A compilation unit (one Vela package body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub types: TypeTable,
    pub functions: Vec<FunctionDecl>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: TypeTable::new(),
            functions: Vec::new(),
        }
    }
}

/// Function (or procedure, when `ret` is `None`) declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeId>,
    pub locals: Vec<LocalDecl>,
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, ret: Option<TypeId>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret,
            locals: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.params.push(Param { name: name.into(), ty });
        self
    }

    pub fn with_local(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.locals.push(LocalDecl { name: name.into(), ty, init: None });
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }
}

/// Function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
}

/// Local object declaration, optionally initialized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: String,
    pub ty: TypeId,
    pub init: Option<Expr>,
}

/// Statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// `target := value;`
    Assign { target: Expr, value: Expr },

    /// `if c1 then ... elsif c2 then ... else ... end if;`
    /// One arm per condition, in source order.
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
    },

    /// `case selector is when 1 | 2 => ... when others => ... end case;`
    Case {
        selector: Expr,
        alts: Vec<(Vec<i64>, Vec<Stmt>)>,
        default: Option<Vec<Stmt>>,
    },

    /// `while cond loop ... end loop;`
    While { cond: Expr, body: Vec<Stmt> },

    /// `return;` or `return expr;`
    Return(Option<Expr>),

    /// Procedure call as a statement
    Call(Expr),

    /// `null;`
    Null,
}

/// Binary arithmetic and logic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A typed expression with its source position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    /// Type the checker resolved for this node
    pub ty: TypeId,
    pub line: u32,
    pub column: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeId) -> Self {
        Self { kind, ty, line: 0, column: 0 }
    }

    /// Attaches a source position (builder style, for tests)
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn int(value: i64, ty: TypeId) -> Self {
        Self::new(ExprKind::IntLit(value), ty)
    }

    pub fn float(value: f64, ty: TypeId) -> Self {
        Self::new(ExprKind::FloatLit(value), ty)
    }

    pub fn boolean(value: bool, ty: TypeId) -> Self {
        Self::new(ExprKind::BoolLit(value), ty)
    }

    pub fn name(name: impl Into<String>, ty: TypeId) -> Self {
        Self::new(ExprKind::Name(name.into()), ty)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr, ty: TypeId) -> Self {
        Self::new(
            ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            ty,
        )
    }

    pub fn compare(op: CmpOp, lhs: Expr, rhs: Expr, ty: TypeId) -> Self {
        Self::new(
            ExprKind::Compare { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            ty,
        )
    }

    pub fn convert(to: TypeId, operand: Expr) -> Self {
        Self::new(
            ExprKind::Convert {
                to,
                operand: Box::new(operand),
                unchecked: false,
                overflow_check: false,
            },
            to,
        )
    }

    /// Conversion with a runtime range check requested
    pub fn convert_checked(to: TypeId, operand: Expr) -> Self {
        Self::new(
            ExprKind::Convert {
                to,
                operand: Box::new(operand),
                unchecked: false,
                overflow_check: true,
            },
            to,
        )
    }

    pub fn field(base: Expr, field: impl Into<String>, ty: TypeId) -> Self {
        Self::new(
            ExprKind::FieldSelect { base: Box::new(base), field: field.into() },
            ty,
        )
    }

    pub fn index(base: Expr, index: Expr, ty: TypeId) -> Self {
        Self::new(
            ExprKind::Index { base: Box::new(base), index: Box::new(index) },
            ty,
        )
    }
}

/// Expression kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    IntLit(i64),
    /// Float literal
    FloatLit(f64),
    /// `True` / `False`
    BoolLit(bool),
    /// Enumeration literal, stored as its 0-based ordinal
    EnumLit(u32),
    /// `null` of an access type
    NullLit,
    /// Reference to a parameter or local
    Name(String),
    /// `lhs op rhs`
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `lhs op rhs` yielding Boolean
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `not e`
    Not(Box<Expr>),
    /// `-e`
    Neg(Box<Expr>),
    /// `base.field`
    FieldSelect { base: Box<Expr>, field: String },
    /// `base(index)`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `Target(operand)` type conversion. `unchecked` suppresses all
    /// checks; `overflow_check` requests a range check. The front end
    /// never sets both.
    Convert {
        to: TypeId,
        operand: Box<Expr>,
        unchecked: bool,
        overflow_check: bool,
    },
    /// `callee(args)`
    Call { callee: String, args: Vec<Expr> },
}
