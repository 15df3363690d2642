//! vela-ir - Intermediate Representation of the Vela compiler
//!
//! A low-level basic-block representation that:
//! - Keeps one terminator per block (`Return`, `Branch`, `CondBranch`,
//!   `Switch`)
//! - Addresses blocks by `BlockId` index, not label
//! - Records a debug location per emitted instruction
//!
//! # Architecture
//!
//! ```text
//! Typed AST (vela-front)
//!         ↓
//!    [Lowering] (vela-lower)
//!         ↓
//!   IR Module
//!   ├── Structs
//!   └── Functions
//!       ├── Basic Blocks
//!       │   └── Instructions
//!       └── Local Variables
//!         ↓
//!    [Codegen] (vela-codegen)
//!         ↓
//!   C source
//! ```

pub mod instruction;
pub mod module;
pub mod types;

pub use instruction::{BinaryOp, CastKind, CompareOp, Instruction, Value};
pub use module::{BasicBlock, BlockId, Function, Module};
pub use types::{IrType, StructDef, StructField};
