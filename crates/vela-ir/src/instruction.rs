//! IR Instructions
//!
//! Low-level instructions over basic blocks. Branch targets are
//! `BlockId` indexes, not labels; labels exist only for display.

use crate::module::BlockId;
use crate::types::IrType;
use std::fmt;

/// Value identifier
///
/// Derives `Hash`/`Eq` (floats by bit pattern) so values can key maps,
/// which the reconstruction of shared returns depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer constant
    ConstInt(i64),
    /// Float constant, stored as f64 bits
    ConstFloat(u64),
    /// Boolean constant
    ConstBool(bool),
    /// Null of an access type
    ConstNull,
    /// Local variable slot (by name)
    Local(String),
    /// Function parameter
    Param(usize),
    /// Result of a previous instruction
    Temp(u32),
}

impl Value {
    pub fn const_int(v: i64) -> Self {
        Value::ConstInt(v)
    }

    pub fn const_float(v: f64) -> Self {
        Value::ConstFloat(v.to_bits())
    }

    pub fn const_bool(v: bool) -> Self {
        Value::ConstBool(v)
    }

    pub fn local(name: impl Into<String>) -> Self {
        Value::Local(name.into())
    }

    pub fn temp(id: u32) -> Self {
        Value::Temp(id)
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match self {
            Value::ConstInt(v) => Some(*v),
            Value::ConstBool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::ConstInt(v) => write!(f, "{}", v),
            Value::ConstFloat(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Value::ConstBool(v) => write!(f, "{}", v),
            Value::ConstNull => write!(f, "null"),
            Value::Local(name) => write!(f, "%{}", name),
            Value::Param(idx) => write!(f, "%arg{}", idx),
            Value::Temp(id) => write!(f, "%t{}", id),
        }
    }
}

/// Binary operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // Bitwise / logic
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "add"),
            BinaryOp::Sub => write!(f, "sub"),
            BinaryOp::Mul => write!(f, "mul"),
            BinaryOp::Div => write!(f, "div"),
            BinaryOp::Rem => write!(f, "rem"),
            BinaryOp::And => write!(f, "and"),
            BinaryOp::Or => write!(f, "or"),
            BinaryOp::Xor => write!(f, "xor"),
            BinaryOp::Shl => write!(f, "shl"),
            BinaryOp::Shr => write!(f, "shr"),
        }
    }
}

/// Comparison operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "eq"),
            CompareOp::Ne => write!(f, "ne"),
            CompareOp::Lt => write!(f, "lt"),
            CompareOp::Le => write!(f, "le"),
            CompareOp::Gt => write!(f, "gt"),
            CompareOp::Ge => write!(f, "ge"),
        }
    }
}

/// How a cast reinterprets its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Integer truncate
    Trunc,
    /// Sign extend
    Sext,
    /// Zero extend
    Zext,
    /// Float to signed integer, truncating toward zero
    FpToSi,
    /// Signed integer to float
    SiToFp,
    /// Float widen
    FpExt,
    /// Float narrow, round to nearest
    FpTrunc,
    /// Float narrow, round toward zero
    FpTruncChop,
    /// Pointer reinterpret
    PtrCast,
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastKind::Trunc => write!(f, "trunc"),
            CastKind::Sext => write!(f, "sext"),
            CastKind::Zext => write!(f, "zext"),
            CastKind::FpToSi => write!(f, "fptosi"),
            CastKind::SiToFp => write!(f, "sitofp"),
            CastKind::FpExt => write!(f, "fpext"),
            CastKind::FpTrunc => write!(f, "fptrunc"),
            CastKind::FpTruncChop => write!(f, "fptrunc.chop"),
            CastKind::PtrCast => write!(f, "ptrcast"),
        }
    }
}

/// IR Instruction
///
/// The last four variants are the only legal block terminators; a
/// finished function has exactly one of them at the end of every block
/// and nowhere else.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Allocates a stack slot for a local variable
    /// %name = alloca type
    Alloca {
        dest: String,
        ty: IrType,
    },

    /// Stores value through a pointer
    /// store value, ptr
    Store {
        value: Value,
        ptr: Value,
    },

    /// Loads a value through a pointer
    /// %dest = load ptr
    Load {
        dest: u32,
        ptr: Value,
        ty: IrType,
    },

    /// Binary operation
    /// %dest = op left, right
    Binary {
        dest: u32,
        op: BinaryOp,
        left: Value,
        right: Value,
    },

    /// Comparison
    /// %dest = cmp op left, right
    Compare {
        dest: u32,
        op: CompareOp,
        left: Value,
        right: Value,
    },

    /// Logical negation
    /// %dest = not value
    Not {
        dest: u32,
        value: Value,
    },

    /// Arithmetic negation
    /// %dest = neg value
    Neg {
        dest: u32,
        value: Value,
    },

    /// Function call
    /// %dest = call @func(args...)
    Call {
        dest: Option<u32>,
        func: String,
        args: Vec<Value>,
    },

    /// Representation change
    /// %dest = kind value to type
    Cast {
        dest: u32,
        kind: CastKind,
        value: Value,
        to_type: IrType,
    },

    /// Record component read
    /// %dest = getfield base, field_index
    GetField {
        dest: u32,
        base: Value,
        struct_name: String,
        field_index: usize,
        field_name: String,
    },

    /// Record component write
    /// setfield base, field_index, value
    SetField {
        base: Value,
        struct_name: String,
        field_index: usize,
        field_name: String,
        value: Value,
    },

    /// Array element read
    /// %dest = getelem base, index
    GetElement {
        dest: u32,
        base: Value,
        index: Value,
    },

    /// Array element write
    /// setelem base, index, value
    SetElement {
        base: Value,
        index: Value,
        value: Value,
    },

    /// Comment / debug info
    Comment(String),

    /// Return, with or without a value
    /// ret value
    Return(Option<Value>),

    /// Unconditional branch
    /// br target
    Branch {
        target: BlockId,
    },

    /// Conditional branch
    /// br cond, then_dest, else_dest
    CondBranch {
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    },

    /// Multi-way branch on a discrete value
    /// switch disc, default [v1 -> b1, v2 -> b2, ...]
    Switch {
        disc: Value,
        default: BlockId,
        cases: Vec<(Value, BlockId)>,
    },
}

impl Instruction {
    /// Returns the instruction's destination temporary (if any)
    pub fn dest(&self) -> Option<u32> {
        match self {
            Instruction::Load { dest, .. } => Some(*dest),
            Instruction::Binary { dest, .. } => Some(*dest),
            Instruction::Compare { dest, .. } => Some(*dest),
            Instruction::Not { dest, .. } => Some(*dest),
            Instruction::Neg { dest, .. } => Some(*dest),
            Instruction::Call { dest, .. } => *dest,
            Instruction::Cast { dest, .. } => Some(*dest),
            Instruction::GetField { dest, .. } => Some(*dest),
            Instruction::GetElement { dest, .. } => Some(*dest),
            _ => None,
        }
    }

    /// Checks if it is a block terminator instruction
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_)
                | Instruction::Branch { .. }
                | Instruction::CondBranch { .. }
                | Instruction::Switch { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty } => {
                write!(f, "%{} = alloca {}", dest, ty)
            }
            Instruction::Store { value, ptr } => {
                write!(f, "store {}, {}", value, ptr)
            }
            Instruction::Load { dest, ptr, ty } => {
                write!(f, "%t{} = load {} {}", dest, ty, ptr)
            }
            Instruction::Binary { dest, op, left, right } => {
                write!(f, "%t{} = {} {}, {}", dest, op, left, right)
            }
            Instruction::Compare { dest, op, left, right } => {
                write!(f, "%t{} = cmp {} {}, {}", dest, op, left, right)
            }
            Instruction::Not { dest, value } => {
                write!(f, "%t{} = not {}", dest, value)
            }
            Instruction::Neg { dest, value } => {
                write!(f, "%t{} = neg {}", dest, value)
            }
            Instruction::Call { dest, func, args } => {
                if let Some(d) = dest {
                    write!(f, "%t{} = ", d)?;
                }
                write!(f, "call @{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Instruction::Cast { dest, kind, value, to_type } => {
                write!(f, "%t{} = {} {} to {}", dest, kind, value, to_type)
            }
            Instruction::GetField { dest, base, struct_name, field_index, field_name } => {
                write!(f, "%t{} = getfield {} %{}.{} ({})", dest, base, struct_name, field_index, field_name)
            }
            Instruction::SetField { base, struct_name, field_index, field_name, value } => {
                write!(f, "setfield {} %{}.{} ({}), {}", base, struct_name, field_index, field_name, value)
            }
            Instruction::GetElement { dest, base, index } => {
                write!(f, "%t{} = getelem {}, {}", dest, base, index)
            }
            Instruction::SetElement { base, index, value } => {
                write!(f, "setelem {}, {}, {}", base, index, value)
            }
            Instruction::Comment(text) => {
                write!(f, "; {}", text)
            }
            Instruction::Return(value) => match value {
                Some(v) => write!(f, "ret {}", v),
                None => write!(f, "ret void"),
            },
            Instruction::Branch { target } => {
                write!(f, "br {}", target)
            }
            Instruction::CondBranch { cond, then_dest, else_dest } => {
                write!(f, "br {}, {}, {}", cond, then_dest, else_dest)
            }
            Instruction::Switch { disc, default, cases } => {
                write!(f, "switch {}, {} [", disc, default)?;
                for (i, (value, target)) in cases.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{} -> {}", value, target)?;
                }
                write!(f, "]")
            }
        }
    }
}
