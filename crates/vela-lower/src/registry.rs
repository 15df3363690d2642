//! Type Registry - per-source-type side table
//!
//! Maps a source `TypeId` to its lowered facts: chosen IR type,
//! dynamic-size flag, TBAA node and layout info. Entries are created
//! on first touch and never removed; fields fill in lazily as the
//! type layer elaborates each type.

use crate::tbaa::TbaaId;
use rustc_hash::FxHashMap;
use vela_front::TypeId;
use vela_ir::IrType;

/// Array facts cached for a source array type
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInfo {
    pub elem: TypeId,
    /// `None` for unconstrained arrays
    pub bounds: Option<(i64, i64)>,
}

/// Placement of one record component
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub ty: TypeId,
    pub bit_offset: u64,
    pub bit_size: u64,
}

/// Computed layout of a record type
#[derive(Debug, Clone, PartialEq)]
pub struct RecordInfo {
    pub fields: Vec<FieldLayout>,
    pub size_bits: u64,
    pub align_bits: u32,
    pub packed: bool,
}

impl RecordInfo {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// One registry row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegEntry {
    pub ir_type: Option<IrType>,
    pub dynamic_size: Option<bool>,
    pub tbaa: Option<TbaaId>,
    pub array_info: Option<ArrayInfo>,
    pub record_info: Option<RecordInfo>,
}

impl RegEntry {
    fn is_vacant(&self) -> bool {
        *self == RegEntry::default()
    }
}

/// The side table itself. Append-only for the life of a unit.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: FxHashMap<TypeId, RegEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TypeId) -> Option<&RegEntry> {
        self.entries.get(&id)
    }

    /// Idempotent: repeated calls return the same row until a setter
    /// changes it.
    pub fn get_or_create(&mut self, id: TypeId) -> &mut RegEntry {
        self.entries.entry(id).or_default()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ir_type(&self, id: TypeId) -> Option<&IrType> {
        self.get(id).and_then(|e| e.ir_type.as_ref())
    }

    pub fn set_ir_type(&mut self, id: TypeId, ty: IrType) {
        self.get_or_create(id).ir_type = Some(ty);
    }

    pub fn set_dynamic_size(&mut self, id: TypeId, dynamic: bool) {
        self.get_or_create(id).dynamic_size = Some(dynamic);
    }

    pub fn set_tbaa(&mut self, id: TypeId, node: TbaaId) {
        self.get_or_create(id).tbaa = Some(node);
    }

    pub fn set_array_info(&mut self, id: TypeId, info: ArrayInfo) {
        self.get_or_create(id).array_info = Some(info);
    }

    pub fn set_record_info(&mut self, id: TypeId, info: RecordInfo) {
        self.get_or_create(id).record_info = Some(info);
    }

    /// Aliases `new` onto `old`'s facts, for subtypes that share their
    /// base's representation. Fails if `new` already accumulated
    /// different facts of its own.
    pub fn copy_type_info(
        &mut self,
        old: TypeId,
        new: TypeId,
        name_of_new: &str,
    ) -> Result<(), vela_error::InternalError> {
        let source = self.entries.get(&old).cloned().unwrap_or_default();
        match self.entries.get(&new) {
            Some(existing) if !existing.is_vacant() && *existing != source => {
                Err(vela_error::InternalError::DuplicateTypeInfo {
                    type_name: name_of_new.to_string(),
                })
            }
            _ => {
                self.entries.insert(new, source);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut reg = TypeRegistry::new();
        let id = TypeId(4);

        reg.get_or_create(id).dynamic_size = Some(true);
        assert_eq!(reg.get_or_create(id).dynamic_size, Some(true));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_setters_auto_create() {
        let mut reg = TypeRegistry::new();
        let id = TypeId(9);
        assert!(!reg.contains(id));

        reg.set_ir_type(id, IrType::Int(16));
        assert!(reg.contains(id));
        assert_eq!(reg.ir_type(id), Some(&IrType::Int(16)));
    }

    #[test]
    fn test_copy_type_info_aliases() {
        let mut reg = TypeRegistry::new();
        let base = TypeId(0);
        let sub = TypeId(1);

        reg.set_ir_type(base, IrType::Int(32));
        reg.copy_type_info(base, sub, "Sub").unwrap();
        assert_eq!(reg.ir_type(sub), Some(&IrType::Int(32)));
    }

    #[test]
    fn test_copy_type_info_rejects_conflict() {
        let mut reg = TypeRegistry::new();
        let base = TypeId(0);
        let sub = TypeId(1);

        reg.set_ir_type(base, IrType::Int(32));
        reg.set_ir_type(sub, IrType::Int(64));
        assert!(reg.copy_type_info(base, sub, "Sub").is_err());
    }

    #[test]
    fn test_copy_onto_identical_entry_is_ok() {
        let mut reg = TypeRegistry::new();
        let base = TypeId(0);
        let sub = TypeId(1);

        reg.set_ir_type(base, IrType::Int(32));
        reg.set_ir_type(sub, IrType::Int(32));
        assert!(reg.copy_type_info(base, sub, "Sub").is_ok());
    }
}
