//! C type rendering
//!
//! Maps IR types onto `<stdint.h>` names. Arrays and pointers need
//! the C declarator form where the name nests inside the type, so
//! declarations go through [`c_decl`] instead of pasting
//! `"{type} {name}"`.
//!
//! A float width the output language cannot express degrades to a
//! commented `double` rather than failing the whole unit.

use std::fmt::Write;
use vela_ir::{IrType, StructDef};

/// C spelling of `ty` in non-declarator positions (casts, returns)
pub fn c_type(ty: &IrType) -> String {
    match ty {
        IrType::Void => "void".to_string(),
        // single bits are compare results; they live in a byte
        IrType::Int(1) => "uint8_t".to_string(),
        IrType::Int(bits) => match bits {
            0..=8 => "int8_t".to_string(),
            9..=16 => "int16_t".to_string(),
            17..=32 => "int32_t".to_string(),
            _ => "int64_t".to_string(),
        },
        IrType::UInt(bits) => match bits {
            0..=8 => "uint8_t".to_string(),
            9..=16 => "uint16_t".to_string(),
            17..=32 => "uint32_t".to_string(),
            _ => "uint64_t".to_string(),
        },
        IrType::Float(32) => "float".to_string(),
        IrType::Float(64) => "double".to_string(),
        IrType::Float(bits) => format!("double /* unsupported {}-bit float */", bits),
        IrType::Ptr(inner) => match inner.as_ref() {
            IrType::Array(..) => c_decl(inner, "(*)"),
            _ => format!("{} *", c_type(inner)),
        },
        IrType::Array(elem, len) => format!("{}[{}]", c_type(elem), len),
        IrType::Struct(name) => name.clone(),
    }
}

/// C declaration of an object `name` of type `ty`, without the
/// trailing semicolon
pub fn c_decl(ty: &IrType, name: &str) -> String {
    match ty {
        IrType::Array(elem, len) => c_decl(elem, &format!("{}[{}]", name, len)),
        IrType::Ptr(inner) => match inner.as_ref() {
            IrType::Array(..) => c_decl(inner, &format!("(*{})", name)),
            _ => format!("{} *{}", c_type(inner), name),
        },
        _ => format!("{} {}", c_type(ty), name),
    }
}

/// C parameter declaration. Pointer-to-array parameters decay to the
/// plain array form so element access reads naturally.
pub fn c_param(ty: &IrType, name: &str) -> String {
    match ty {
        IrType::Ptr(inner) if matches!(inner.as_ref(), IrType::Array(..)) => c_decl(inner, name),
        _ => c_decl(ty, name),
    }
}

/// Full `typedef struct` definition, bit fields included
pub fn c_struct_def(def: &StructDef) -> String {
    let mut out = String::new();
    let attr = if def.packed { " __attribute__((packed))" } else { "" };
    writeln!(out, "typedef struct{} {} {{", attr, def.name).unwrap();
    for field in &def.fields {
        match field.bit_width {
            Some(bits) => writeln!(out, "    unsigned {} : {};", field.name, bits).unwrap(),
            None => writeln!(out, "    {};", c_decl(&field.ty, &field.name)).unwrap(),
        }
    }
    writeln!(out, "}} {};", def.name).unwrap();
    out
}
