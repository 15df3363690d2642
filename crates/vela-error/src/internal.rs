//! Internal-consistency failures of the backend itself
//!
//! These are not user errors. They mean a pass received IR or type
//! information that violates an invariant an earlier pass was supposed
//! to establish. The driver reports them as a single `EX001` diagnostic
//! and abandons the unit.

use thiserror::Error;

/// Result type for passes that can only fail on internal inconsistencies
pub type IResult<T> = std::result::Result<T, InternalError>;

/// An invariant violation detected inside the backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// A terminator showed up in the middle of a block, or a
    /// non-terminator was found where a terminator was required
    #[error("unexpected terminator `{instr}` in block {block}")]
    UnexpectedTerminator { block: u32, instr: String },

    /// A block ended without any terminator at all
    #[error("block {block} of `{function}` is unterminated")]
    Unterminated { function: String, block: u32 },

    /// Elementary conversion requested between non-elementary types
    #[error("conversion between non-elementary types `{from}` and `{to}`")]
    NonElementaryConvert { from: String, to: String },

    /// An attempt to change the default view of a type after layout froze
    #[error("cannot retype `{type_name}`: representation already finalized")]
    RetypeFinalized { type_name: String },

    /// Mutually exclusive conversion options were both requested
    #[error("conversion of `{type_name}` requested both unchecked and overflow-checked")]
    ExclusiveConvOptions { type_name: String },

    /// A static size was demanded of a type without one
    #[error("size of dynamic type `{type_name}` is not a compile-time constant")]
    SizeOfDynamic { type_name: String },

    /// Two sources disagreed about the same type's lowered information
    #[error("conflicting lowered info recorded for `{type_name}`")]
    DuplicateTypeInfo { type_name: String },

    /// A type reached the renderer without ever being lowered
    #[error("no lowered type recorded for `{type_name}`")]
    MissingIrType { type_name: String },

    /// A field selection named a component the record does not have
    #[error("record `{record}` has no field `{field}`")]
    NoSuchField { record: String, field: String },

    /// An assignment target the lowerer cannot address
    #[error("unsupported assignment target in `{function}`")]
    UnsupportedTarget { function: String },

    /// A branch target names a block the function does not contain
    #[error("branch to nonexistent block {block} in `{function}`")]
    NoSuchBlock { function: String, block: u32 },
}

impl InternalError {
    pub fn unterminated(function: impl Into<String>, block: u32) -> Self {
        InternalError::Unterminated { function: function.into(), block }
    }

    pub fn no_such_block(function: impl Into<String>, block: u32) -> Self {
        InternalError::NoSuchBlock { function: function.into(), block }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let e = InternalError::unterminated("main", 4);
        assert_eq!(e.to_string(), "block 4 of `main` is unterminated");

        let e = InternalError::MissingIrType { type_name: "Rec".into() };
        assert!(e.to_string().contains("Rec"));
    }
}
