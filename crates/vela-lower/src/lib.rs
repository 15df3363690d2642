//! vela-lower - type elaboration and AST lowering for the Vela backend
//!
//! This crate turns the front end's type model and typed AST into the
//! IR of `vela-ir`:
//! - Elaborates every declared type into a chain of lowered views
//! - Applies representation clauses (sizes, alignment, biasing)
//! - Computes record layout, including packed bit fields
//! - Lowers statements and expressions into basic blocks
//! - Inserts representation conversions and range checks
//!
//! # Architecture
//!
//! ```text
//! Unit (vela-front)
//!         |
//!   [TypeLayer]          one view chain per declared type,
//!   |- LTypeTable        plus registry, layout and TBAA info
//!   |- TypeRegistry
//!   '- TbaaTable
//!         |
//!   [lower_unit]         statements and expressions into blocks
//!         |
//!   Module (vela-ir)
//! ```

pub mod convert;
pub mod layout;
pub mod lower;
pub mod ltype;
pub mod registry;
pub mod tbaa;

pub use convert::{ConvertOptions, CHECK_RANGE, RAISE_RANGE};
pub use layout::{natural_align, range_bits, record_layout, signed_bits, storage_bits, unsigned_bits};
pub use lower::{lower_unit, LoweredUnit};
pub use ltype::{ChainInfo, LType, LTypeData, LTypeTable, TypeLayer, ViewRequest};
pub use registry::{ArrayInfo, FieldLayout, RecordInfo, RegEntry, TypeRegistry};
pub use tbaa::{TbaaField, TbaaId, TbaaNode, TbaaTable};
