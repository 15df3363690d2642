//! vela-codegen - C output for the Vela compiler
//!
//! The backend works in two stages:
//! - [`flow`] rebuilds structured control flow from the basic blocks
//!   of a function, sharing join points, loop headers and identical
//!   returns
//! - [`c_backend`] walks the flow graph and prints one C translation
//!   unit, with type spelling in [`c_types`] and per-instruction
//!   statement rendering in [`c_exprs`]
//!
//! # Example
//!
//! ```rust,ignore
//! use vela_codegen::{CBackend, CodeGen};
//! use vela_ir::Module;
//!
//! let module: Module = /* ... */;
//! let c_code = CBackend::new().generate(&module)?;
//! ```

pub mod c_backend;
pub mod c_exprs;
pub mod c_types;
pub mod flow;

pub use c_backend::CBackend;
pub use c_exprs::CFunction;
pub use c_types::{c_decl, c_param, c_struct_def, c_type};
pub use flow::{CaseEntry, FlowGraph, FlowId, FlowNode, IfEntry, Span, StmtRenderer};

/// Trait for code generation backends
pub trait CodeGen {
    /// Backend output type
    type Output;

    /// Generates code from the IR module
    fn generate(&self, module: &vela_ir::Module) -> Self::Output;
}
