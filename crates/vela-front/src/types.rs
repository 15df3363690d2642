//! Type model of the Vela language
//!
//! Types arrive here already resolved by the front end. The back end
//! only reads this table; it never adds or rewrites declarations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique ID of a source type, stable for the table's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A record component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

/// Representation clause attached to a type declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepClause {
    /// `for T'Size use N` equivalent, in bits
    pub size_bits: Option<u32>,
    /// Requested alignment, in bits
    pub align_bits: Option<u32>,
    /// Store `value - lower_bound` instead of the value itself
    pub biased: bool,
}

impl RepClause {
    pub fn sized(size_bits: u32) -> Self {
        Self { size_bits: Some(size_bits), ..Self::default() }
    }

    pub fn biased(size_bits: u32) -> Self {
        Self { size_bits: Some(size_bits), align_bits: None, biased: true }
    }
}

/// The shape of a Vela type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Boolean (two literals)
    Boolean,
    /// Signed integer with an inclusive range
    Integer { lo: i64, hi: i64 },
    /// Enumeration; literal ordinals are 0-based positions
    Enum { literals: Vec<String> },
    /// Floating point, 32 or 64 bits
    Float { bits: u16 },
    /// Record with ordered components
    Record { fields: Vec<Field>, packed: bool },
    /// Array; `bounds: None` means unconstrained
    Array {
        index: TypeId,
        elem: TypeId,
        bounds: Option<(i64, i64)>,
    },
    /// Access (pointer) to a designated type
    Access { designated: TypeId },
    /// Constrained view of a base type
    Subtype {
        base: TypeId,
        lo: Option<i64>,
        hi: Option<i64>,
    },
}

/// A type declaration as the front end resolved it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub rep: RepClause,
}

/// Arena of all type declarations in a unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTable {
    decls: Vec<TypeDecl>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, decl: TypeDecl) -> TypeId {
        let id = TypeId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeDecl {
        &self.decls[id.0 as usize]
    }

    pub fn name_of(&self, id: TypeId) -> &str {
        &self.get(id).name
    }

    pub fn rep_of(&self, id: TypeId) -> &RepClause {
        &self.get(id).rep
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.decls.len() as u32).map(TypeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDecl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (TypeId(i as u32), d))
    }

    /// Looks up a type by its declared name
    pub fn by_name(&self, name: &str) -> Option<TypeId> {
        self.iter().find(|(_, d)| d.name == name).map(|(id, _)| id)
    }

    // ==================== Classification ====================
    //
    // All queries resolve subtypes first; a subtype classifies like
    // the type it constrains.

    /// Strips one level of subtype
    pub fn base_type(&self, id: TypeId) -> TypeId {
        match self.get(id).kind {
            TypeKind::Subtype { base, .. } => base,
            _ => id,
        }
    }

    /// Strips the entire subtype chain
    pub fn root_type(&self, id: TypeId) -> TypeId {
        let mut current = id;
        while let TypeKind::Subtype { base, .. } = self.get(current).kind {
            current = base;
        }
        current
    }

    pub fn is_discrete(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.root_type(id)).kind,
            TypeKind::Boolean | TypeKind::Integer { .. } | TypeKind::Enum { .. }
        )
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(self.get(self.root_type(id)).kind, TypeKind::Float { .. })
    }

    pub fn is_access(&self, id: TypeId) -> bool {
        matches!(self.get(self.root_type(id)).kind, TypeKind::Access { .. })
    }

    /// Discrete, float or access: single-value types with no components
    pub fn is_elementary(&self, id: TypeId) -> bool {
        self.is_discrete(id) || self.is_float(id) || self.is_access(id)
    }

    pub fn is_record(&self, id: TypeId) -> bool {
        matches!(self.get(self.root_type(id)).kind, TypeKind::Record { .. })
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.get(self.root_type(id)).kind, TypeKind::Array { .. })
    }

    pub fn is_composite(&self, id: TypeId) -> bool {
        self.is_record(id) || self.is_array(id)
    }

    pub fn is_unconstrained_array(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.root_type(id)).kind,
            TypeKind::Array { bounds: None, .. }
        )
    }

    /// Component type of an array
    pub fn elem_type(&self, id: TypeId) -> Option<TypeId> {
        match self.get(self.root_type(id)).kind {
            TypeKind::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Designated type of an access type
    pub fn designated_type(&self, id: TypeId) -> Option<TypeId> {
        match self.get(self.root_type(id)).kind {
            TypeKind::Access { designated } => Some(designated),
            _ => None,
        }
    }

    /// Static bounds of a constrained array
    pub fn array_bounds(&self, id: TypeId) -> Option<(i64, i64)> {
        match self.get(self.root_type(id)).kind {
            TypeKind::Array { bounds, .. } => bounds,
            _ => None,
        }
    }

    /// Fields of a record, in declaration order
    pub fn record_fields(&self, id: TypeId) -> Option<&[Field]> {
        match &self.get(self.root_type(id)).kind {
            TypeKind::Record { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn is_packed_record(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.root_type(id)).kind,
            TypeKind::Record { packed: true, .. }
        )
    }

    /// Inclusive value range of a discrete type, after subtype
    /// constraints. The innermost constraint wins for each bound.
    pub fn range_of(&self, id: TypeId) -> Option<(i64, i64)> {
        match &self.get(id).kind {
            TypeKind::Boolean => Some((0, 1)),
            TypeKind::Integer { lo, hi } => Some((*lo, *hi)),
            TypeKind::Enum { literals } => Some((0, literals.len() as i64 - 1)),
            TypeKind::Subtype { base, lo, hi } => {
                let (base_lo, base_hi) = self.range_of(*base)?;
                Some((lo.unwrap_or(base_lo), hi.unwrap_or(base_hi)))
            }
            _ => None,
        }
    }

    /// Float width in bits, resolving subtypes
    pub fn float_bits(&self, id: TypeId) -> Option<u16> {
        match self.get(self.root_type(id)).kind {
            TypeKind::Float { bits } => Some(bits),
            _ => None,
        }
    }

    // ==================== Builder helpers ====================

    pub fn add_boolean(&mut self, name: &str) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Boolean,
            rep: RepClause::default(),
        })
    }

    pub fn add_integer(&mut self, name: &str, lo: i64, hi: i64) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Integer { lo, hi },
            rep: RepClause::default(),
        })
    }

    pub fn add_float(&mut self, name: &str, bits: u16) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Float { bits },
            rep: RepClause::default(),
        })
    }

    pub fn add_enum(&mut self, name: &str, literals: &[&str]) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Enum {
                literals: literals.iter().map(|s| s.to_string()).collect(),
            },
            rep: RepClause::default(),
        })
    }

    pub fn add_record(&mut self, name: &str, fields: Vec<Field>, packed: bool) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Record { fields, packed },
            rep: RepClause::default(),
        })
    }

    pub fn add_array(
        &mut self,
        name: &str,
        index: TypeId,
        elem: TypeId,
        bounds: Option<(i64, i64)>,
    ) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Array { index, elem, bounds },
            rep: RepClause::default(),
        })
    }

    pub fn add_access(&mut self, name: &str, designated: TypeId) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Access { designated },
            rep: RepClause::default(),
        })
    }

    pub fn add_subtype(
        &mut self,
        name: &str,
        base: TypeId,
        lo: Option<i64>,
        hi: Option<i64>,
    ) -> TypeId {
        self.add(TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Subtype { base, lo, hi },
            rep: RepClause::default(),
        })
    }

    /// Replaces the representation clause of a declared type
    pub fn set_rep(&mut self, id: TypeId, rep: RepClause) {
        self.decls[id.0 as usize].rep = rep;
    }
}
