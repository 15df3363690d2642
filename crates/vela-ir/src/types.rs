//! IR Type System
//!
//! Low-level types for IR representation. Integer widths are explicit
//! (`Int(1)` plays the role of a boolean) so the type layer above can
//! pick exactly the width a representation clause demands.

use std::fmt;

/// IR Types (lower level than source types)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// Void / no value
    Void,
    /// Signed integer of N bits (iN)
    Int(u16),
    /// Unsigned integer of N bits (uN); extension and narrowing
    /// casts pick zero-extension for this variant
    UInt(u16),
    /// Floating point of N bits
    Float(u16),
    /// Pointer to type
    Ptr(Box<IrType>),
    /// Fixed-size array
    Array(Box<IrType>, u64),
    /// Struct by name (definition lives in the module's struct table)
    Struct(String),
}

impl IrType {
    pub const BOOL: IrType = IrType::Int(1);

    pub fn ptr_to(inner: IrType) -> Self {
        IrType::Ptr(Box::new(inner))
    }

    pub fn array_of(elem: IrType, len: u64) -> Self {
        IrType::Array(Box::new(elem), len)
    }

    /// Size in bits, without consulting the struct table. Structs
    /// report 0 here; their layout is recorded when they are defined.
    pub fn size_bits(&self) -> u64 {
        match self {
            IrType::Void => 0,
            IrType::Int(bits) | IrType::UInt(bits) => u64::from(*bits),
            IrType::Float(bits) => u64::from(*bits),
            IrType::Ptr(_) => 64,
            IrType::Array(elem, count) => elem.size_bits() * count,
            IrType::Struct(_) => 0,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, IrType::Int(_) | IrType::UInt(_))
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, IrType::UInt(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::Float(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, IrType::Array(..) | IrType::Struct(_))
    }

    /// Integer width, if this is an integer type
    pub fn int_bits(&self) -> Option<u16> {
        match self {
            IrType::Int(bits) | IrType::UInt(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::UInt(bits) => write!(f, "u{}", bits),
            IrType::Float(bits) => write!(f, "f{}", bits),
            IrType::Ptr(inner) => write!(f, "*{}", inner),
            IrType::Array(elem, size) => write!(f, "[{} x {}]", size, elem),
            IrType::Struct(name) => write!(f, "%{}", name),
        }
    }
}

/// A struct component. `bit_width` is set when the component occupies
/// a sub-word slice of its storage unit (packed records, biased
/// fields); backends render those as bit-fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: IrType,
    pub bit_width: Option<u32>,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self { name: name.into(), ty, bit_width: None }
    }

    pub fn bits(name: impl Into<String>, ty: IrType, width: u32) -> Self {
        Self { name: name.into(), ty, bit_width: Some(width) }
    }
}

/// Struct definition in IR
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<StructField>,
    pub packed: bool,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new(), packed: false }
    }

    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    pub fn add_field(&mut self, field: StructField) {
        self.fields.push(field);
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_type(&self, name: &str) -> Option<&IrType> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ir_type_display() {
        assert_eq!(IrType::Int(32).to_string(), "i32");
        assert_eq!(IrType::UInt(8).to_string(), "u8");
        assert_eq!(IrType::BOOL.to_string(), "i1");
        assert_eq!(IrType::ptr_to(IrType::Int(8)).to_string(), "*i8");
        assert_eq!(IrType::array_of(IrType::Int(64), 10).to_string(), "[10 x i64]");
        assert_eq!(IrType::Struct("Rec".to_string()).to_string(), "%Rec");
    }

    #[test]
    fn test_size_bits() {
        assert_eq!(IrType::Int(24).size_bits(), 24);
        assert_eq!(IrType::array_of(IrType::Int(16), 4).size_bits(), 64);
        assert_eq!(IrType::ptr_to(IrType::Void).size_bits(), 64);
    }

    #[test]
    fn test_struct_def() {
        let mut s = StructDef::new("Pair");
        s.add_field(StructField::new("first", IrType::Int(32)));
        s.add_field(StructField::bits("flag", IrType::Int(8), 1));

        assert_eq!(s.field_index("first"), Some(0));
        assert_eq!(s.field_index("flag"), Some(1));
        assert_eq!(s.field_type("first"), Some(&IrType::Int(32)));
        assert_eq!(s.fields[1].bit_width, Some(1));
    }
}
