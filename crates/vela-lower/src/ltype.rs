//! LType layer - lowered representations of source types
//!
//! One source type can need several IR representations: its natural
//! computational form, the form plain objects use, clause-sized views,
//! biased views, dummies that break recursive definitions. Each view
//! is an `LType`; views of one source type form a chain with two
//! distinguished entries, the primitive and the default.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use vela_error::{Diagnostic, Diagnostics, ErrorCode, IResult, InternalError};
use vela_front::{Field, TypeId, TypeKind, TypeTable};
use vela_ir::{IrType, StructDef, StructField};

use crate::layout;
use crate::registry::{ArrayInfo, RecordInfo, TypeRegistry};
use crate::tbaa::{TbaaField, TbaaId, TbaaTable};

/// Handle into the lowered-type table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LType(pub u32);

impl fmt::Display for LType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lt{}", self.0)
    }
}

/// One lowered view of a source type
#[derive(Debug, Clone)]
pub struct LTypeData {
    pub source: TypeId,
    /// `None` while the view is an unfinished placeholder
    pub ir_type: Option<IrType>,
    /// `None` for dynamically sized views
    pub size_bits: Option<u64>,
    pub align_bits: Option<u32>,
    pub is_dummy: bool,
    pub is_biased: bool,
    pub is_max_size: bool,
    pub for_type_rounding: bool,
    /// Chain link to the next view of the same source type
    pub next: Option<LType>,
}

/// Distinguished entries of one source type's chain
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainInfo {
    pub head: Option<LType>,
    pub primitive: Option<LType>,
    pub default: Option<LType>,
}

/// Arena of lowered views, chained per source type
#[derive(Debug, Default)]
pub struct LTypeTable {
    data: Vec<LTypeData>,
    chains: FxHashMap<TypeId, ChainInfo>,
}

impl LTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lt: LType) -> &LTypeData {
        &self.data[lt.0 as usize]
    }

    pub fn get_mut(&mut self, lt: LType) -> &mut LTypeData {
        &mut self.data[lt.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_chain(&self, id: TypeId) -> bool {
        self.chains.contains_key(&id)
    }

    pub fn chain(&self, id: TypeId) -> Option<&ChainInfo> {
        self.chains.get(&id)
    }

    /// Shares an existing chain with a second source type.
    pub fn set_chain(&mut self, id: TypeId, chain: ChainInfo) {
        self.chains.insert(id, chain);
    }

    /// All views of `id`, head first.
    pub fn chain_views(&self, id: TypeId) -> impl Iterator<Item = LType> + '_ {
        let head = self.chains.get(&id).and_then(|c| c.head);
        std::iter::successors(head, move |lt| self.get(*lt).next)
    }

    pub fn primitive_of(&self, id: TypeId) -> Option<LType> {
        self.chains.get(&id).and_then(|c| c.primitive)
    }

    pub fn default_of(&self, id: TypeId) -> Option<LType> {
        self.chains.get(&id).and_then(|c| c.default)
    }

    pub fn set_primitive(&mut self, id: TypeId, lt: LType) {
        self.chains.entry(id).or_default().primitive = Some(lt);
    }

    pub fn set_default(&mut self, id: TypeId, lt: LType) {
        self.chains.entry(id).or_default().default = Some(lt);
    }

    /// Appends a view and links it at the head of its source chain.
    fn push(&mut self, mut data: LTypeData) -> LType {
        let id = data.source;
        let lt = LType(self.data.len() as u32);
        let chain = self.chains.entry(id).or_default();
        data.next = chain.head;
        chain.head = Some(lt);
        self.data.push(data);
        lt
    }
}

/// Parameters selecting one view of a source type. Unset size and
/// alignment inherit the default view's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewRequest {
    pub size_bits: Option<u64>,
    pub align_bits: Option<u32>,
    /// Round the size up to the alignment (the view describes the
    /// type itself rather than an object of it)
    pub for_type_rounding: bool,
    pub is_max_size: bool,
    pub is_biased: bool,
}

impl ViewRequest {
    pub fn sized(size_bits: u64) -> Self {
        Self {
            size_bits: Some(size_bits),
            ..Self::default()
        }
    }

    pub fn biased(size_bits: u64) -> Self {
        Self {
            size_bits: Some(size_bits),
            is_biased: true,
            ..Self::default()
        }
    }
}

/// The type layer: owns every per-type side table and elaborates
/// source types into lowered views on first demand.
pub struct TypeLayer<'m> {
    model: &'m TypeTable,
    pub registry: TypeRegistry,
    pub ltypes: LTypeTable,
    pub tbaa: TbaaTable,
    structs: Vec<StructDef>,
    in_progress: FxHashSet<TypeId>,
    pending_access: Vec<(TypeId, TypeId)>,
    pub diags: Diagnostics,
}

impl<'m> TypeLayer<'m> {
    pub fn new(model: &'m TypeTable) -> Self {
        Self {
            model,
            registry: TypeRegistry::new(),
            ltypes: LTypeTable::new(),
            tbaa: TbaaTable::new(),
            structs: Vec::new(),
            in_progress: FxHashSet::default(),
            pending_access: Vec::new(),
            diags: Diagnostics::new(),
        }
    }

    pub fn model(&self) -> &'m TypeTable {
        self.model
    }

    /// Struct definitions produced so far, in elaboration order.
    pub fn struct_defs(&self) -> &[StructDef] {
        &self.structs
    }

    pub fn take_struct_defs(&mut self) -> Vec<StructDef> {
        std::mem::take(&mut self.structs)
    }

    pub fn take_diags(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diags)
    }

    // ---- elaboration ----

    /// Builds the chain for `id` if it does not exist yet. Re-entrant
    /// calls for a type already mid-elaboration return immediately;
    /// cyclic definitions resolve through placeholder views.
    pub fn ensure_elaborated(&mut self, id: TypeId) -> IResult<()> {
        if self.ltypes.has_chain(id) || self.in_progress.contains(&id) {
            return Ok(());
        }
        self.in_progress.insert(id);
        let result = self.elaborate(id);
        self.in_progress.remove(&id);
        result?;
        if self.in_progress.is_empty() {
            self.flush_pending_access()?;
        }
        Ok(())
    }

    fn elaborate(&mut self, id: TypeId) -> IResult<()> {
        let model = self.model;
        let decl = model.get(id);
        tracing::trace!(name = %decl.name, "elaborating type");
        match &decl.kind {
            TypeKind::Boolean => self.elaborate_boolean(id),
            TypeKind::Integer { lo, hi } => self.elaborate_discrete(id, *lo, *hi),
            TypeKind::Enum { literals } => {
                let hi = literals.len().saturating_sub(1) as i64;
                self.elaborate_discrete(id, 0, hi)
            }
            TypeKind::Float { bits } => self.elaborate_float(id, *bits),
            TypeKind::Record { fields, packed } => self.elaborate_record(id, fields, *packed),
            TypeKind::Array { elem, bounds, .. } => self.elaborate_array(id, *elem, *bounds),
            TypeKind::Access { designated } => self.elaborate_access(id, *designated),
            TypeKind::Subtype { base, .. } => self.elaborate_subtype(id, *base),
        }
    }

    fn elaborate_boolean(&mut self, id: TypeId) -> IResult<()> {
        // comparisons compute in i1, objects live in a byte
        let prim = self.ltypes.push(LTypeData {
            source: id,
            ir_type: Some(IrType::BOOL),
            size_bits: Some(1),
            align_bits: Some(8),
            is_dummy: false,
            is_biased: false,
            is_max_size: false,
            for_type_rounding: false,
            next: None,
        });
        self.ltypes.set_primitive(id, prim);
        let def = self.ltypes.push(LTypeData {
            source: id,
            ir_type: Some(IrType::UInt(8)),
            size_bits: Some(8),
            align_bits: Some(8),
            is_dummy: false,
            is_biased: false,
            is_max_size: false,
            for_type_rounding: false,
            next: None,
        });
        self.ltypes.set_default(id, def);
        self.apply_rep(id)?;
        self.finish_elementary(id)
    }

    fn elaborate_discrete(&mut self, id: TypeId, lo: i64, hi: i64) -> IResult<()> {
        let bits = layout::storage_bits(lo, hi);
        let ir = if lo >= 0 {
            IrType::UInt(bits)
        } else {
            IrType::Int(bits)
        };
        let lt = self.ltypes.push(LTypeData {
            source: id,
            ir_type: Some(ir),
            size_bits: Some(u64::from(bits)),
            align_bits: Some(layout::natural_align(u64::from(bits))),
            is_dummy: false,
            is_biased: false,
            is_max_size: false,
            for_type_rounding: false,
            next: None,
        });
        self.ltypes.set_primitive(id, lt);
        self.ltypes.set_default(id, lt);
        self.apply_rep(id)?;
        self.finish_elementary(id)
    }

    fn elaborate_float(&mut self, id: TypeId, bits: u16) -> IResult<()> {
        self.reject_unsupported_rep(id);
        let lt = self.ltypes.push(LTypeData {
            source: id,
            ir_type: Some(IrType::Float(bits)),
            size_bits: Some(u64::from(bits)),
            align_bits: Some(layout::natural_align(u64::from(bits))),
            is_dummy: false,
            is_biased: false,
            is_max_size: false,
            for_type_rounding: false,
            next: None,
        });
        self.ltypes.set_primitive(id, lt);
        self.ltypes.set_default(id, lt);
        self.finish_elementary(id)
    }

    fn elaborate_record(&mut self, id: TypeId, fields: &[Field], packed: bool) -> IResult<()> {
        let name = self.model.name_of(id).to_string();
        let placeholder = self.new_placeholder(id);
        self.registry.get_or_create(id);

        for field in fields {
            self.ensure_elaborated(field.ty)?;
        }
        let mut info = layout::record_layout(self, fields, packed)?;

        // a declared size can pad the record, never shrink it
        if let Some(declared) = self.model.rep_of(id).size_bits {
            if u64::from(declared) < info.size_bits {
                self.diags.push(
                    Diagnostic::error(format!(
                        "size for `{}` too small, minimum allowed is {}",
                        name, info.size_bits
                    ))
                    .with_code(ErrorCode::SIZE_TOO_SMALL),
                );
            } else {
                info.size_bits = u64::from(declared);
            }
        }
        if self.model.rep_of(id).biased {
            self.diags.push(
                Diagnostic::error(format!("representation clause not supported for `{}`", name))
                    .with_code(ErrorCode::UNSUPPORTED_REP)
                    .with_note("a record cannot be biased"),
            );
        }

        let mut def = StructDef::new(name.clone());
        if packed {
            def = def.packed();
        }
        for fl in &info.fields {
            let fty = self.default_ir(fl.ty)?;
            if packed && layout::bit_packable(self, fl.ty).is_some() {
                def.add_field(StructField::bits(fl.name.clone(), fty, fl.bit_size as u32));
            } else {
                def.add_field(StructField::new(fl.name.clone(), fty));
            }
        }
        self.structs.push(def);

        self.update(placeholder, IrType::Struct(name.clone()), false)?;
        let data = self.ltypes.get_mut(placeholder);
        data.size_bits = Some(info.size_bits);
        data.align_bits = Some(info.align_bits);
        self.ltypes.set_primitive(id, placeholder);

        self.registry.set_ir_type(id, IrType::Struct(name.clone()));
        self.registry.set_dynamic_size(id, false);
        let node = self.record_tbaa(&name, &info);
        self.registry.set_tbaa(id, node);
        self.registry.set_record_info(id, info);
        Ok(())
    }

    fn elaborate_array(&mut self, id: TypeId, elem: TypeId, bounds: Option<(i64, i64)>) -> IResult<()> {
        self.reject_unsupported_rep(id);
        self.ensure_elaborated(elem)?;
        let elem_ir = self.default_ir(elem)?;
        match bounds {
            Some((lo, hi)) => {
                let len = if hi < lo { 0 } else { hi.wrapping_sub(lo) as u64 + 1 };
                let ir = IrType::array_of(elem_ir, len);
                let size = ir.size_bits();
                let align = self.type_align_bits(elem);
                let lt = self.ltypes.push(LTypeData {
                    source: id,
                    ir_type: Some(ir.clone()),
                    size_bits: Some(size),
                    align_bits: Some(align),
                    is_dummy: false,
                    is_biased: false,
                    is_max_size: false,
                    for_type_rounding: false,
                    next: None,
                });
                self.ltypes.set_primitive(id, lt);
                self.ltypes.set_default(id, lt);
                self.registry.set_ir_type(id, ir);
                self.registry.set_dynamic_size(id, false);
            }
            None => {
                // bounds travel with the value: the default view is a
                // fat descriptor, the primitive a thin element pointer
                let fat_name = format!("{}_fat", self.model.name_of(id));
                let mut def = StructDef::new(fat_name.clone());
                def.add_field(StructField::new("data", IrType::ptr_to(elem_ir.clone())));
                def.add_field(StructField::new("first", IrType::Int(64)));
                def.add_field(StructField::new("last", IrType::Int(64)));
                self.structs.push(def);

                let thin = self.ltypes.push(LTypeData {
                    source: id,
                    ir_type: Some(IrType::ptr_to(elem_ir)),
                    size_bits: Some(64),
                    align_bits: Some(64),
                    is_dummy: false,
                    is_biased: false,
                    is_max_size: false,
                    for_type_rounding: false,
                    next: None,
                });
                self.ltypes.set_primitive(id, thin);
                let fat = self.ltypes.push(LTypeData {
                    source: id,
                    ir_type: Some(IrType::Struct(fat_name.clone())),
                    size_bits: None,
                    align_bits: Some(64),
                    is_dummy: false,
                    is_biased: false,
                    is_max_size: false,
                    for_type_rounding: false,
                    next: None,
                });
                self.ltypes.set_default(id, fat);
                self.registry.set_ir_type(id, IrType::Struct(fat_name));
                self.registry.set_dynamic_size(id, true);
            }
        }
        self.registry.set_array_info(id, ArrayInfo { elem, bounds });
        Ok(())
    }

    fn elaborate_access(&mut self, id: TypeId, designated: TypeId) -> IResult<()> {
        self.reject_unsupported_rep(id);
        let root = self.model.root_type(designated);
        let mid = self.in_progress.contains(&designated) || self.in_progress.contains(&root);
        if mid && self.model.is_record(root) {
            // the designated record is mid-elaboration; its struct can
            // be named before its definition exists, so leave a dummy
            // and finalize once the record completes
            let lt = self.new_placeholder(id);
            let ir = IrType::ptr_to(IrType::Struct(self.model.name_of(root).to_string()));
            self.update(lt, ir, true)?;
            let data = self.ltypes.get_mut(lt);
            data.size_bits = Some(64);
            data.align_bits = Some(64);
            self.ltypes.set_primitive(id, lt);
            self.pending_access.push((id, designated));
            return Ok(());
        }
        self.ensure_elaborated(designated)?;
        let ir = IrType::ptr_to(self.default_ir(designated)?);
        self.finish_access(id, ir)
    }

    /// Finalizes access views deferred inside a cyclic elaboration.
    fn flush_pending_access(&mut self) -> IResult<()> {
        while let Some((id, designated)) = self.pending_access.pop() {
            self.ensure_elaborated(designated)?;
            let ir = IrType::ptr_to(self.default_ir(designated)?);
            let lt = self.ltypes.default_of(id).ok_or_else(|| InternalError::MissingIrType {
                type_name: self.model.name_of(id).to_string(),
            })?;
            self.update(lt, ir.clone(), false)?;
            self.registry.set_ir_type(id, ir);
            self.registry.set_dynamic_size(id, false);
            let node = self.tbaa.scalar(self.model.name_of(id).to_string(), 64, self.tbaa.root());
            self.registry.set_tbaa(id, node);
        }
        Ok(())
    }

    fn finish_access(&mut self, id: TypeId, ir: IrType) -> IResult<()> {
        let lt = self.ltypes.push(LTypeData {
            source: id,
            ir_type: Some(ir.clone()),
            size_bits: Some(64),
            align_bits: Some(64),
            is_dummy: false,
            is_biased: false,
            is_max_size: false,
            for_type_rounding: false,
            next: None,
        });
        self.ltypes.set_primitive(id, lt);
        self.ltypes.set_default(id, lt);
        self.registry.set_ir_type(id, ir);
        self.registry.set_dynamic_size(id, false);
        let node = self.tbaa.scalar(self.model.name_of(id).to_string(), 64, self.tbaa.root());
        self.registry.set_tbaa(id, node);
        Ok(())
    }

    fn elaborate_subtype(&mut self, id: TypeId, base: TypeId) -> IResult<()> {
        self.ensure_elaborated(base)?;
        let rep = self.model.rep_of(id);
        let has_rep = rep.size_bits.is_some() || rep.align_bits.is_some() || rep.biased;
        if !has_rep || !self.model.is_discrete(id) {
            if has_rep {
                self.reject_unsupported_rep(id);
            }
            // representationally identical to the base: share its chain
            let chain = self.ltypes.chain(base).copied().unwrap_or_default();
            self.ltypes.set_chain(id, chain);
            let model = self.model;
            self.registry.copy_type_info(base, id, model.name_of(id))?;
            return Ok(());
        }
        let (lo, hi) = self.model.range_of(id).unwrap_or((0, 0));
        self.elaborate_discrete(id, lo, hi)
    }

    /// Applies a representation clause to a discrete type's chain:
    /// creates the clause-shaped view and makes it the default.
    fn apply_rep(&mut self, id: TypeId) -> IResult<()> {
        let rep = self.model.rep_of(id).clone();
        if rep.size_bits.is_none() && rep.align_bits.is_none() && !rep.biased {
            return Ok(());
        }
        let (lo, hi) = self.model.range_of(id).unwrap_or((0, 0));
        let required = if rep.biased {
            layout::unsigned_bits(hi.wrapping_sub(lo))
        } else {
            layout::range_bits(lo, hi)
        };
        if let Some(declared) = rep.size_bits {
            if declared < required {
                self.diags.push(
                    Diagnostic::error(format!(
                        "size for `{}` too small, minimum allowed is {}",
                        self.model.name_of(id),
                        required
                    ))
                    .with_code(ErrorCode::SIZE_TOO_SMALL),
                );
                // the clause is unusable; keep the natural views
                return Ok(());
            }
        }
        let req = ViewRequest {
            size_bits: Some(rep.size_bits.map_or(u64::from(required), u64::from)),
            align_bits: rep.align_bits,
            for_type_rounding: false,
            is_max_size: false,
            is_biased: rep.biased,
        };
        let lt = self.create(id, req)?;
        self.mark_default(lt);
        Ok(())
    }

    /// Reports a representation clause on a type the layer cannot
    /// reshape. The natural views stay in effect.
    fn reject_unsupported_rep(&mut self, id: TypeId) {
        let rep = self.model.rep_of(id);
        if rep.size_bits.is_none() && rep.align_bits.is_none() && !rep.biased {
            return;
        }
        self.diags.push(
            Diagnostic::error(format!(
                "representation clause not supported for `{}`",
                self.model.name_of(id)
            ))
            .with_code(ErrorCode::UNSUPPORTED_REP)
            .with_note("size clauses apply to discrete types and records, bias to discrete types"),
        );
    }

    /// Registry facts shared by every elementary elaboration.
    fn finish_elementary(&mut self, id: TypeId) -> IResult<()> {
        let lt = self.ltypes.default_of(id).ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })?;
        let data = self.ltypes.get(lt);
        let ir = data.ir_type.clone().ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })?;
        let size = data.size_bits.unwrap_or(0);
        self.registry.set_ir_type(id, ir);
        self.registry.set_dynamic_size(id, false);
        let root = self.tbaa.root();
        let node = self.tbaa.scalar(self.model.name_of(id).to_string(), size, root);
        self.registry.set_tbaa(id, node);
        Ok(())
    }

    fn record_tbaa(&mut self, name: &str, info: &RecordInfo) -> TbaaId {
        let mut fields = Vec::new();
        for fl in &info.fields {
            if let Some(node) = self.registry.get(fl.ty).and_then(|e| e.tbaa) {
                fields.push(TbaaField {
                    offset_bits: fl.bit_offset,
                    size_bits: fl.bit_size,
                    node,
                });
            }
        }
        self.tbaa.struct_node(name, info.size_bits, fields)
    }

    // ---- chain operations ----

    /// Allocates an empty view and makes it the source type's default,
    /// so recursive definitions can refer to themselves before they
    /// are complete.
    pub fn new_placeholder(&mut self, id: TypeId) -> LType {
        let lt = self.ltypes.push(LTypeData {
            source: id,
            ir_type: None,
            size_bits: None,
            align_bits: None,
            is_dummy: true,
            is_biased: false,
            is_max_size: false,
            for_type_rounding: false,
            next: None,
        });
        self.ltypes.set_default(id, lt);
        lt
    }

    /// Returns the chain view matching the request, creating it if no
    /// view with the same effective shape exists yet.
    pub fn create(&mut self, id: TypeId, req: ViewRequest) -> IResult<LType> {
        self.ensure_elaborated(id)?;
        let base = self
            .ltypes
            .default_of(id)
            .or_else(|| self.ltypes.primitive_of(id))
            .ok_or_else(|| InternalError::MissingIrType {
                type_name: self.model.name_of(id).to_string(),
            })?;
        let base_data = self.ltypes.get(base).clone();

        let mut size = req.size_bits.or(base_data.size_bits);
        let align = req.align_bits.or(base_data.align_bits);
        if req.for_type_rounding {
            if let (Some(s), Some(a)) = (size, align) {
                size = Some(layout::round_up_bits(s, a));
            }
        }

        let found = self.ltypes.chain_views(id).find(|&lt| {
            let d = self.ltypes.get(lt);
            !d.is_dummy
                && d.size_bits == size
                && d.align_bits == align
                && d.is_max_size == req.is_max_size
                && d.is_biased == req.is_biased
        });
        if let Some(lt) = found {
            return Ok(lt);
        }

        let ir = self.view_ir(&base_data, size, req.is_biased)?;
        Ok(self.ltypes.push(LTypeData {
            source: id,
            ir_type: Some(ir),
            size_bits: size,
            align_bits: align,
            is_dummy: false,
            is_biased: req.is_biased,
            is_max_size: req.is_max_size,
            for_type_rounding: req.for_type_rounding,
            next: None,
        }))
    }

    fn view_ir(&self, base: &LTypeData, size: Option<u64>, biased: bool) -> IResult<IrType> {
        let base_ir = base.ir_type.clone().ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(base.source).to_string(),
        })?;
        let Some(size) = size else {
            return Ok(base_ir);
        };
        Ok(if biased {
            IrType::UInt(size as u16)
        } else {
            match base_ir {
                IrType::Int(_) => IrType::Int(size as u16),
                IrType::UInt(_) => IrType::UInt(size as u16),
                // floats and composites keep their shape under resizing
                other => other,
            }
        })
    }

    /// Fills in a placeholder or dummy view. A view whose concrete IR
    /// type is already bound cannot change it.
    pub fn update(&mut self, lt: LType, ir_type: IrType, is_dummy: bool) -> IResult<()> {
        let data = self.ltypes.get(lt);
        if let Some(existing) = &data.ir_type {
            if !data.is_dummy && *existing != ir_type {
                return Err(InternalError::RetypeFinalized {
                    type_name: self.model.name_of(data.source).to_string(),
                });
            }
        }
        let data = self.ltypes.get_mut(lt);
        data.ir_type = Some(ir_type);
        data.is_dummy = is_dummy;
        Ok(())
    }

    /// The natural computational view of `id`.
    pub fn primitive(&mut self, id: TypeId) -> IResult<LType> {
        self.ensure_elaborated(id)?;
        self.ltypes.primitive_of(id).ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })
    }

    /// The view plain objects and components of `id` use.
    pub fn default_of(&mut self, id: TypeId) -> IResult<LType> {
        self.ensure_elaborated(id)?;
        self.ltypes.default_of(id).ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })
    }

    /// Like `default_of` but never allocates.
    pub fn default_opt(&self, id: TypeId) -> Option<LType> {
        self.ltypes.default_of(id)
    }

    /// Re-designates the default view of its source type.
    pub fn mark_default(&mut self, lt: LType) {
        let id = self.ltypes.get(lt).source;
        self.ltypes.set_default(id, lt);
    }

    // ---- view queries ----

    pub fn source(&self, lt: LType) -> TypeId {
        self.ltypes.get(lt).source
    }

    pub fn ir_type(&self, lt: LType) -> IResult<IrType> {
        self.ltypes.get(lt).ir_type.clone().ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(self.source(lt)).to_string(),
        })
    }

    pub fn size_bits(&self, lt: LType) -> IResult<u64> {
        self.ltypes.get(lt).size_bits.ok_or_else(|| InternalError::SizeOfDynamic {
            type_name: self.model.name_of(self.source(lt)).to_string(),
        })
    }

    pub fn align_bits(&self, lt: LType) -> u32 {
        self.ltypes.get(lt).align_bits.unwrap_or(8)
    }

    pub fn is_biased(&self, lt: LType) -> bool {
        self.ltypes.get(lt).is_biased
    }

    pub fn is_dummy(&self, lt: LType) -> bool {
        self.ltypes.get(lt).is_dummy
    }

    // classification passes through to the underlying source type, so
    // callers never unwrap a view to ask

    pub fn is_discrete(&self, lt: LType) -> bool {
        self.model.is_discrete(self.source(lt))
    }

    pub fn is_elementary(&self, lt: LType) -> bool {
        self.model.is_elementary(self.source(lt))
    }

    pub fn is_float(&self, lt: LType) -> bool {
        self.model.is_float(self.source(lt))
    }

    pub fn is_record(&self, lt: LType) -> bool {
        self.model.is_record(self.source(lt))
    }

    pub fn is_array(&self, lt: LType) -> bool {
        self.model.is_array(self.source(lt))
    }

    pub fn is_access(&self, lt: LType) -> bool {
        self.model.is_access(self.source(lt))
    }

    // ---- source-type queries ----

    /// IR type of the default view. The chain must exist already.
    pub fn default_ir(&self, id: TypeId) -> IResult<IrType> {
        let lt = self.ltypes.default_of(id).ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })?;
        self.ir_type(lt)
    }

    /// IR type of the primitive view. The chain must exist already.
    pub fn primitive_ir(&self, id: TypeId) -> IResult<IrType> {
        let lt = self.ltypes.primitive_of(id).ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })?;
        self.ir_type(lt)
    }

    /// Size of the default view in bits; dynamically sized types have
    /// no compile-time size.
    pub fn type_size_bits(&self, id: TypeId) -> IResult<u64> {
        let lt = self.ltypes.default_of(id).ok_or_else(|| InternalError::MissingIrType {
            type_name: self.model.name_of(id).to_string(),
        })?;
        self.size_bits(lt)
    }

    pub fn type_align_bits(&self, id: TypeId) -> u32 {
        self.ltypes.default_of(id).map_or(8, |lt| self.align_bits(lt))
    }

    pub fn is_dynamic_size(&mut self, id: TypeId) -> IResult<bool> {
        self.ensure_elaborated(id)?;
        Ok(self.registry.get(id).and_then(|e| e.dynamic_size).unwrap_or(false))
    }

    pub fn tbaa_of(&mut self, id: TypeId) -> IResult<Option<TbaaId>> {
        self.ensure_elaborated(id)?;
        Ok(self.registry.get(id).and_then(|e| e.tbaa))
    }

    pub fn record_info(&mut self, id: TypeId) -> IResult<Option<RecordInfo>> {
        self.ensure_elaborated(id)?;
        Ok(self.registry.get(id).and_then(|e| e.record_info.clone()))
    }

    pub fn array_info(&mut self, id: TypeId) -> IResult<Option<ArrayInfo>> {
        self.ensure_elaborated(id)?;
        Ok(self.registry.get(id).and_then(|e| e.array_info.clone()))
    }
}
