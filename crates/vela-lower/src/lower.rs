//! Lowering the typed AST into IR
//!
//! Runs after every declared type has elaborated. `lower_unit` moves
//! the collected struct definitions into the module, then lowers one
//! function at a time through a [`FunctionLowerer`].
//!
//! Value discipline: an elementary expression result always travels in
//! the primitive view of its type. Loads convert from the object's
//! default view right after the access, and stores convert back to the
//! target's default view right before the write; biasing and Boolean
//! width changes happen only at those two seams. Composite values are
//! the aggregate itself for locals and temporaries, and a pointer for
//! parameters.

use rustc_hash::FxHashMap;
use vela_error::{Diagnostics, IResult, InternalError, SourceLoc};
use vela_front::{BinOp, CmpOp, Expr, ExprKind, FunctionDecl, Stmt, TypeId, Unit};
use vela_ir::{BinaryOp, CompareOp, Function, Instruction, IrType, Module, Value};

use crate::convert::{cast_scalar, emit_binary, ConvertOptions};
use crate::ltype::TypeLayer;

/// Parameter types and return type of a unit-level function
type Signature = (Vec<TypeId>, Option<TypeId>);

/// Output of [`lower_unit`]: the IR module plus every diagnostic the
/// type layer accumulated while elaborating
#[derive(Debug)]
pub struct LoweredUnit {
    pub module: Module,
    pub diagnostics: Diagnostics,
}

/// Lowers a resolved unit to an IR module.
pub fn lower_unit(unit: &Unit) -> IResult<LoweredUnit> {
    tracing::debug!(unit = %unit.name, functions = unit.functions.len(), "lowering unit");

    let mut layer = TypeLayer::new(&unit.types);
    // elaborate everything up front so struct definitions land in the
    // module in declaration order
    for id in unit.types.ids() {
        layer.ensure_elaborated(id)?;
    }

    let mut module = Module::new(unit.name.clone());
    for def in layer.take_struct_defs() {
        module.add_struct(def);
    }

    let mut signatures: FxHashMap<String, Signature> = FxHashMap::default();
    for decl in &unit.functions {
        let params = decl.params.iter().map(|p| p.ty).collect();
        signatures.insert(decl.name.clone(), (params, decl.ret));
    }

    for decl in &unit.functions {
        tracing::debug!(function = %decl.name, "lowering function");
        let func = FunctionLowerer::new(&mut layer, &signatures, decl)?.lower()?;
        module.add_function(func);
    }

    Ok(LoweredUnit { module, diagnostics: layer.take_diags() })
}

fn expr_loc(expr: &Expr) -> SourceLoc {
    // the front end numbers the unit's own file 0
    SourceLoc::new(0, expr.line, expr.column)
}

fn binary_op(op: BinOp) -> BinaryOp {
    match op {
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div => BinaryOp::Div,
        BinOp::Rem => BinaryOp::Rem,
        BinOp::And => BinaryOp::And,
        BinOp::Or => BinaryOp::Or,
    }
}

fn compare_op(op: CmpOp) -> CompareOp {
    match op {
        CmpOp::Eq => CompareOp::Eq,
        CmpOp::Ne => CompareOp::Ne,
        CmpOp::Lt => CompareOp::Lt,
        CmpOp::Le => CompareOp::Le,
        CmpOp::Gt => CompareOp::Gt,
        CmpOp::Ge => CompareOp::Ge,
    }
}

/// Per-function lowering state
struct FunctionLowerer<'a, 'm> {
    layer: &'a mut TypeLayer<'m>,
    signatures: &'a FxHashMap<String, Signature>,
    decl: &'a FunctionDecl,
    func: Function,
    label_counter: u32,
}

impl<'a, 'm> FunctionLowerer<'a, 'm> {
    fn new(
        layer: &'a mut TypeLayer<'m>,
        signatures: &'a FxHashMap<String, Signature>,
        decl: &'a FunctionDecl,
    ) -> IResult<Self> {
        let ret_ir = match decl.ret {
            Some(ty) => layer.default_ir(ty)?,
            None => IrType::Void,
        };
        let mut func = Function::new(decl.name.clone(), ret_ir);
        for param in &decl.params {
            let ir = if layer.model().is_composite(param.ty) {
                IrType::ptr_to(layer.default_ir(param.ty)?)
            } else {
                layer.default_ir(param.ty)?
            };
            func.add_param(param.name.clone(), ir);
        }
        Ok(Self { layer, signatures, decl, func, label_counter: 0 })
    }

    fn lower(mut self) -> IResult<Function> {
        let decl = self.decl;
        for local in &decl.locals {
            let ir = self.layer.default_ir(local.ty)?;
            self.func.add_local(local.name.clone(), ir);
        }
        for local in &decl.locals {
            if let Some(init) = &local.init {
                let value = self.lower_into(init, local.ty)?;
                self.func.emit(Instruction::Store {
                    value,
                    ptr: Value::local(&local.name),
                });
            }
        }

        self.lower_stmts(&decl.body)?;

        // fall off the end: procedures return, value functions are
        // expected to have returned already
        let last = self.func.insertion_block();
        if !self.func.is_terminated(last) {
            self.func.emit(Instruction::Return(None));
        }
        Ok(self.func)
    }

    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    // ---- statements ----------------------------------------------------

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> IResult<()> {
        for stmt in stmts {
            // statements after a return in the same arm are unreachable
            if self.func.is_terminated(self.func.insertion_block()) {
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Assign { target, value } => self.lower_assign(target, value),
            Stmt::If { arms, else_branch } => self.lower_if(arms, else_branch.as_deref()),
            Stmt::Case { selector, alts, default } => {
                self.lower_case(selector, alts, default.as_deref())
            }
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::Return(expr) => self.lower_return(expr.as_ref()),
            Stmt::Call(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::Null => Ok(()),
        }
    }

    fn lower_assign(&mut self, target: &Expr, value: &Expr) -> IResult<()> {
        let stored = self.lower_into(value, target.ty)?;
        self.func.set_loc(expr_loc(target));
        match &target.kind {
            ExprKind::Name(name) => {
                let slot = self.name_value(name);
                self.func.emit(Instruction::Store { value: stored, ptr: slot });
                Ok(())
            }
            ExprKind::FieldSelect { base, field } => {
                let base_v = self.lower_expr(base)?;
                let (struct_name, index, _) = self.field_slot(base.ty, field)?;
                self.func.emit(Instruction::SetField {
                    base: base_v,
                    struct_name,
                    field_index: index,
                    field_name: field.clone(),
                    value: stored,
                });
                Ok(())
            }
            ExprKind::Index { base, index } => {
                let base_v = self.lower_expr(base)?;
                let (elem_base, position, _) = self.element_slot(base_v, base.ty, index)?;
                self.func.emit(Instruction::SetElement {
                    base: elem_base,
                    index: position,
                    value: stored,
                });
                Ok(())
            }
            _ => Err(InternalError::UnsupportedTarget {
                function: self.decl.name.clone(),
            }),
        }
    }

    fn lower_if(&mut self, arms: &[(Expr, Vec<Stmt>)], else_branch: Option<&[Stmt]>) -> IResult<()> {
        let join_label = self.new_label("end_if");
        let join = self.func.new_block(join_label);
        for (cond, body) in arms {
            let then_label = self.new_label("then");
            let then_block = self.func.new_block(then_label);
            let else_label = self.new_label("else");
            let else_block = self.func.new_block(else_label);
            let test = self.lower_expr(cond)?;
            self.func.emit(Instruction::CondBranch {
                cond: test,
                then_dest: then_block,
                else_dest: else_block,
            });
            self.func.position_at_end(then_block);
            self.lower_stmts(body)?;
            self.branch_if_open(join);
            self.func.position_at_end(else_block);
        }
        if let Some(body) = else_branch {
            self.lower_stmts(body)?;
        }
        self.branch_if_open(join);
        self.func.position_at_end(join);
        Ok(())
    }

    fn lower_case(
        &mut self,
        selector: &Expr,
        alts: &[(Vec<i64>, Vec<Stmt>)],
        default: Option<&[Stmt]>,
    ) -> IResult<()> {
        let disc = self.lower_expr(selector)?;
        let join_label = self.new_label("end_case");
        let join = self.func.new_block(join_label);
        let default_label = self.new_label("case_others");
        let default_block = self.func.new_block(default_label);

        let mut targets = Vec::with_capacity(alts.len());
        for _ in alts {
            let case_label = self.new_label("case");
            targets.push(self.func.new_block(case_label));
        }
        let mut cases = Vec::new();
        for ((values, _), block) in alts.iter().zip(&targets) {
            for v in values {
                cases.push((Value::ConstInt(*v), *block));
            }
        }
        self.func.emit(Instruction::Switch { disc, default: default_block, cases });

        for ((_, body), block) in alts.iter().zip(&targets) {
            self.func.position_at_end(*block);
            self.lower_stmts(body)?;
            self.branch_if_open(join);
        }
        self.func.position_at_end(default_block);
        if let Some(body) = default {
            self.lower_stmts(body)?;
        }
        self.branch_if_open(join);
        self.func.position_at_end(join);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &[Stmt]) -> IResult<()> {
        let header_label = self.new_label("loop");
        let header = self.func.new_block(header_label);
        let body_label = self.new_label("body");
        let body_block = self.func.new_block(body_label);
        let exit_label = self.new_label("end_loop");
        let exit = self.func.new_block(exit_label);

        self.func.emit(Instruction::Branch { target: header });
        self.func.position_at_end(header);
        let test = self.lower_expr(cond)?;
        self.func.emit(Instruction::CondBranch {
            cond: test,
            then_dest: body_block,
            else_dest: exit,
        });

        self.func.position_at_end(body_block);
        self.lower_stmts(body)?;
        self.branch_if_open(header);
        self.func.position_at_end(exit);
        Ok(())
    }

    fn lower_return(&mut self, expr: Option<&Expr>) -> IResult<()> {
        let value = match (expr, self.decl.ret) {
            (Some(e), Some(ret_ty)) => Some(self.lower_into(e, ret_ty)?),
            (Some(e), None) => Some(self.lower_expr(e)?),
            (None, _) => None,
        };
        self.func.emit(Instruction::Return(value));
        Ok(())
    }

    /// Branches to `target` unless the current block already ended
    fn branch_if_open(&mut self, target: vela_ir::BlockId) {
        if !self.func.is_terminated(self.func.insertion_block()) {
            self.func.emit(Instruction::Branch { target });
        }
    }

    // ---- expressions ---------------------------------------------------

    /// Lowers `expr` and converts the result into the default view of
    /// `target_ty`, ready to be stored or passed by value.
    fn lower_into(&mut self, expr: &Expr, target_ty: TypeId) -> IResult<Value> {
        let value = self.lower_expr(expr)?;
        if self.layer.model().is_composite(target_ty) {
            return self.materialize(value, expr.ty);
        }
        let from = self.layer.primitive(expr.ty)?;
        let to = self.layer.default_of(target_ty)?;
        self.layer.convert(&mut self.func, value, from, to, false)
    }

    fn lower_expr(&mut self, expr: &Expr) -> IResult<Value> {
        self.func.set_loc(expr_loc(expr));
        match &expr.kind {
            ExprKind::IntLit(v) => Ok(Value::ConstInt(*v)),
            ExprKind::FloatLit(v) => Ok(Value::const_float(*v)),
            ExprKind::BoolLit(v) => Ok(Value::ConstBool(*v)),
            ExprKind::EnumLit(ordinal) => Ok(Value::ConstInt(i64::from(*ordinal))),
            ExprKind::NullLit => Ok(Value::ConstNull),
            ExprKind::Name(name) => self.lower_name(expr, name),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(expr, *op, lhs, rhs),
            ExprKind::Compare { op, lhs, rhs } => self.lower_compare(*op, lhs, rhs),
            ExprKind::Not(operand) => {
                let value = self.lower_expr(operand)?;
                let dest = self.func.new_temp();
                Ok(self.func.emit_with_dest(Instruction::Not { dest, value }))
            }
            ExprKind::Neg(operand) => {
                let value = self.lower_expr(operand)?;
                let dest = self.func.new_temp();
                Ok(self.func.emit_with_dest(Instruction::Neg { dest, value }))
            }
            ExprKind::FieldSelect { base, field } => self.lower_field_select(expr, base, field),
            ExprKind::Index { base, index } => self.lower_index(expr, base, index),
            ExprKind::Convert { to, operand, unchecked, overflow_check } => {
                self.lower_convert(expr, *to, operand, *unchecked, *overflow_check)
            }
            ExprKind::Call { callee, args } => self.lower_call(expr, callee, args),
        }
    }

    fn name_value(&self, name: &str) -> Value {
        match self.decl.params.iter().position(|p| p.name == name) {
            Some(i) => Value::Param(i),
            None => Value::local(name),
        }
    }

    fn lower_name(&mut self, expr: &Expr, name: &str) -> IResult<Value> {
        let slot = self.name_value(name);
        if self.layer.model().is_composite(expr.ty) {
            // aggregate locals are used in place; parameters stay
            // pointers until a value consumer materializes them
            return Ok(slot);
        }
        let value = match slot {
            Value::Param(_) => slot,
            _ => {
                let ty = self.layer.default_ir(expr.ty)?;
                let dest = self.func.new_temp();
                self.func.emit_with_dest(Instruction::Load { dest, ptr: slot, ty })
            }
        };
        self.to_primitive(value, expr.ty)
    }

    /// Default view to primitive view, the load-side half of the value
    /// discipline
    fn to_primitive(&mut self, value: Value, ty: TypeId) -> IResult<Value> {
        let from = self.layer.default_of(ty)?;
        let to = self.layer.primitive(ty)?;
        self.layer.convert(&mut self.func, value, from, to, false)
    }

    /// Converts between the primitive views of two types
    fn convert_primitive(&mut self, value: Value, from_ty: TypeId, to_ty: TypeId) -> IResult<Value> {
        let from = self.layer.primitive(from_ty)?;
        let to = self.layer.primitive(to_ty)?;
        self.layer.convert(&mut self.func, value, from, to, false)
    }

    /// Composite parameters arrive as pointers; value consumers get
    /// the designated object instead.
    fn materialize(&mut self, value: Value, ty: TypeId) -> IResult<Value> {
        if let Value::Param(_) = value {
            if self.layer.model().is_composite(ty) {
                let ir = self.layer.default_ir(ty)?;
                let dest = self.func.new_temp();
                return Ok(self.func.emit_with_dest(Instruction::Load {
                    dest,
                    ptr: value,
                    ty: ir,
                }));
            }
        }
        Ok(value)
    }

    fn lower_binary(&mut self, expr: &Expr, op: BinOp, lhs: &Expr, rhs: &Expr) -> IResult<Value> {
        let left = self.lower_expr(lhs)?;
        let left = self.convert_primitive(left, lhs.ty, expr.ty)?;
        let right = self.lower_expr(rhs)?;
        let right = self.convert_primitive(right, rhs.ty, expr.ty)?;
        Ok(emit_binary(&mut self.func, binary_op(op), left, right))
    }

    fn lower_compare(&mut self, op: CmpOp, lhs: &Expr, rhs: &Expr) -> IResult<Value> {
        let left = self.lower_expr(lhs)?;
        let right = self.lower_expr(rhs)?;
        // compare in the left operand's computational view
        let right = self.convert_primitive(right, rhs.ty, lhs.ty)?;
        let dest = self.func.new_temp();
        Ok(self.func.emit_with_dest(Instruction::Compare {
            dest,
            op: compare_op(op),
            left,
            right,
        }))
    }

    /// Struct name, field index and component type for a component
    /// of `ty`
    fn field_slot(&mut self, ty: TypeId, field: &str) -> IResult<(String, usize, TypeId)> {
        let record_name = self.layer.model().name_of(ty).to_string();
        let info = self.layer.record_info(ty)?.ok_or_else(|| InternalError::NoSuchField {
            record: record_name.clone(),
            field: field.to_string(),
        })?;
        let index = info.field_index(field).ok_or_else(|| InternalError::NoSuchField {
            record: record_name.clone(),
            field: field.to_string(),
        })?;
        let component_ty = info.fields[index].ty;
        let struct_name = match self.layer.default_ir(ty)? {
            IrType::Struct(name) => name,
            _ => return Err(InternalError::MissingIrType { type_name: record_name }),
        };
        Ok((struct_name, index, component_ty))
    }

    fn lower_field_select(&mut self, expr: &Expr, base: &Expr, field: &str) -> IResult<Value> {
        let base_v = self.lower_expr(base)?;
        let (struct_name, index, component_ty) = self.field_slot(base.ty, field)?;

        let dest = self.func.new_temp();
        let value = self.func.emit_with_dest(Instruction::GetField {
            dest,
            base: base_v,
            struct_name,
            field_index: index,
            field_name: field.to_string(),
        });
        if self.layer.model().is_composite(expr.ty) {
            return Ok(value);
        }
        // component is stored in its own default view, possibly biased
        let from = self.layer.default_of(component_ty)?;
        let to = self.layer.primitive(expr.ty)?;
        self.layer.convert(&mut self.func, value, from, to, false)
    }

    /// Element base, zero-origin position and element type for
    /// indexing into `ty`
    fn element_slot(
        &mut self,
        base: Value,
        ty: TypeId,
        index: &Expr,
    ) -> IResult<(Value, Value, TypeId)> {
        let info = self.layer.array_info(ty)?.ok_or_else(|| InternalError::MissingIrType {
            type_name: self.layer.model().name_of(ty).to_string(),
        })?;
        let position = self.lower_expr(index)?;

        match info.bounds {
            Some((lo, _)) => {
                let adjusted = self.zero_based(position, index.ty, lo)?;
                Ok((base, adjusted, info.elem))
            }
            None => {
                // bounds travel with the value in the fat struct
                let struct_name = match self.layer.default_ir(ty)? {
                    IrType::Struct(name) => name,
                    _ => {
                        return Err(InternalError::MissingIrType {
                            type_name: self.layer.model().name_of(ty).to_string(),
                        })
                    }
                };
                let data_dest = self.func.new_temp();
                let data = self.func.emit_with_dest(Instruction::GetField {
                    dest: data_dest,
                    base: base.clone(),
                    struct_name: struct_name.clone(),
                    field_index: 0,
                    field_name: "data".to_string(),
                });
                let first_dest = self.func.new_temp();
                let first = self.func.emit_with_dest(Instruction::GetField {
                    dest: first_dest,
                    base,
                    struct_name,
                    field_index: 1,
                    field_name: "first".to_string(),
                });
                let wide = match position.as_const_int() {
                    Some(c) => Value::ConstInt(c),
                    None => {
                        let from = self.layer.primitive_ir(index.ty)?;
                        cast_scalar(&mut self.func, position, &from, &IrType::Int(64), false)
                    }
                };
                let adjusted = emit_binary(&mut self.func, BinaryOp::Sub, wide, first);
                Ok((data, adjusted, info.elem))
            }
        }
    }

    /// Rebases an index value to a zero origin
    fn zero_based(&mut self, index: Value, index_ty: TypeId, lo: i64) -> IResult<Value> {
        if let Some(c) = index.as_const_int() {
            return Ok(Value::ConstInt(c - lo));
        }
        let from = self.layer.primitive_ir(index_ty)?;
        let wide = cast_scalar(&mut self.func, index, &from, &IrType::Int(64), false);
        if lo == 0 {
            return Ok(wide);
        }
        Ok(emit_binary(&mut self.func, BinaryOp::Sub, wide, Value::ConstInt(lo)))
    }

    fn lower_index(&mut self, expr: &Expr, base: &Expr, index: &Expr) -> IResult<Value> {
        let base_v = self.lower_expr(base)?;
        let (elem_base, position, elem_ty) = self.element_slot(base_v, base.ty, index)?;

        let dest = self.func.new_temp();
        let value = self.func.emit_with_dest(Instruction::GetElement {
            dest,
            base: elem_base,
            index: position,
        });
        if self.layer.model().is_composite(expr.ty) {
            return Ok(value);
        }
        let from = self.layer.default_of(elem_ty)?;
        let to = self.layer.primitive(expr.ty)?;
        self.layer.convert(&mut self.func, value, from, to, false)
    }

    fn lower_convert(
        &mut self,
        expr: &Expr,
        to: TypeId,
        operand: &Expr,
        unchecked: bool,
        overflow_check: bool,
    ) -> IResult<Value> {
        let value = self.lower_expr(operand)?;
        let from = self.layer.primitive(operand.ty)?;
        let target = self.layer.primitive(to)?;
        let opts = ConvertOptions { unchecked, overflow_check, float_truncate: false };
        self.layer
            .emit_conversion(&mut self.func, value, from, target, opts, expr_loc(expr))
    }

    fn lower_call(&mut self, expr: &Expr, callee: &str, args: &[Expr]) -> IResult<Value> {
        let signature = self.signatures.get(callee).cloned();

        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let value = self.lower_expr(arg)?;
            let param_ty = signature.as_ref().and_then(|(params, _)| params.get(i).copied());
            let value = match param_ty {
                Some(ty) if self.layer.model().is_composite(ty) => value,
                Some(ty) => {
                    let from = self.layer.primitive(arg.ty)?;
                    let to = self.layer.default_of(ty)?;
                    self.layer.convert(&mut self.func, value, from, to, false)?
                }
                // unknown callee, pass the computational value as is
                None => value,
            };
            lowered.push(value);
        }

        self.func.set_loc(expr_loc(expr));
        let returns = signature.as_ref().map_or(true, |(_, ret)| ret.is_some());
        if !returns {
            self.func.emit(Instruction::Call {
                dest: None,
                func: callee.to_string(),
                args: lowered,
            });
            // procedures only appear in statement position; the value
            // is never read
            return Ok(Value::ConstInt(0));
        }

        let dest = self.func.new_temp();
        let value = self.func.emit_with_dest(Instruction::Call {
            dest: Some(dest),
            func: callee.to_string(),
            args: lowered,
        });
        match signature {
            Some((_, Some(ret_ty))) if !self.layer.model().is_composite(ret_ty) => {
                let from = self.layer.default_of(ret_ty)?;
                let to = self.layer.primitive(expr.ty)?;
                self.layer.convert(&mut self.func, value, from, to, false)
            }
            _ => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_front::{LocalDecl, RepClause};
    use vela_ir::BlockId;

    fn lower(unit: &Unit) -> Module {
        lower_unit(unit).unwrap().module
    }

    fn all_instrs(func: &Function) -> Vec<Instruction> {
        func.blocks.iter().flat_map(|b| b.instructions.clone()).collect()
    }

    #[test]
    fn test_return_constant() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -1000, 1000);
        unit.functions.push(
            FunctionDecl::new("main", Some(int))
                .with_body(vec![Stmt::Return(Some(Expr::int(5, int)))]),
        );

        let module = lower(&unit);
        let func = module.get_function("main").unwrap();
        let entry = func.block(BlockId::ENTRY);
        assert_eq!(
            entry.terminator(),
            Some(&Instruction::Return(Some(Value::ConstInt(5))))
        );
    }

    #[test]
    fn test_procedure_gets_implicit_return() {
        let mut unit = Unit::new("t");
        unit.functions.push(FunctionDecl::new("noop", None).with_body(vec![Stmt::Null]));

        let module = lower(&unit);
        let func = module.get_function("noop").unwrap();
        assert_eq!(func.return_type, IrType::Void);
        assert_eq!(
            func.block(BlockId::ENTRY).terminator(),
            Some(&Instruction::Return(None))
        );
    }

    #[test]
    fn test_assign_stores_to_local() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -1000, 1000);
        unit.functions.push(FunctionDecl::new("f", None).with_local("x", int).with_body(vec![
            Stmt::Assign {
                target: Expr::name("x", int),
                value: Expr::int(42, int),
            },
        ]));

        let module = lower(&unit);
        let func = module.get_function("f").unwrap();
        assert_eq!(func.local_type("x"), Some(&IrType::Int(16)));
        assert!(all_instrs(func).contains(&Instruction::Store {
            value: Value::ConstInt(42),
            ptr: Value::local("x"),
        }));
    }

    #[test]
    fn test_local_initializer_stored_first() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", 0, 100);
        let mut decl = FunctionDecl::new("f", None);
        decl.locals.push(LocalDecl {
            name: "x".into(),
            ty: int,
            init: Some(Expr::int(7, int)),
        });
        unit.functions.push(decl);

        let module = lower(&unit);
        let func = module.get_function("f").unwrap();
        let entry = func.block(BlockId::ENTRY);
        assert_eq!(
            entry.instructions.first(),
            Some(&Instruction::Store {
                value: Value::ConstInt(7),
                ptr: Value::local("x"),
            })
        );
    }

    #[test]
    fn test_if_lowers_to_cond_branch() {
        let mut unit = Unit::new("t");
        let boolean = unit.types.add_boolean("Boolean");
        let int = unit.types.add_integer("Int", -100, 100);
        unit.functions.push(
            FunctionDecl::new("pick", Some(int))
                .with_param("b", boolean)
                .with_body(vec![Stmt::If {
                    arms: vec![(
                        Expr::name("b", boolean),
                        vec![Stmt::Return(Some(Expr::int(1, int)))],
                    )],
                    else_branch: Some(vec![Stmt::Return(Some(Expr::int(2, int)))]),
                }]),
        );

        let module = lower(&unit);
        let func = module.get_function("pick").unwrap();
        let entry = func.block(BlockId::ENTRY);
        let (then_dest, else_dest) = match entry.terminator() {
            Some(Instruction::CondBranch { then_dest, else_dest, .. }) => (*then_dest, *else_dest),
            other => panic!("expected CondBranch, got {:?}", other),
        };
        assert!(matches!(
            func.block(then_dest).terminator(),
            Some(Instruction::Return(Some(Value::ConstInt(1))))
        ));
        assert!(matches!(
            func.block(else_dest).terminator(),
            Some(Instruction::Return(Some(Value::ConstInt(2))))
        ));
        // the u8 parameter narrows to the compare width before branching
        assert!(entry.instructions.iter().any(|i| matches!(
            i,
            Instruction::Cast { kind: vela_ir::CastKind::Trunc, .. }
        )));
    }

    #[test]
    fn test_while_has_back_edge() {
        let mut unit = Unit::new("t");
        let boolean = unit.types.add_boolean("Boolean");
        unit.functions.push(
            FunctionDecl::new("spin", None)
                .with_param("b", boolean)
                .with_body(vec![Stmt::While {
                    cond: Expr::name("b", boolean),
                    body: vec![Stmt::Null],
                }]),
        );

        let module = lower(&unit);
        let func = module.get_function("spin").unwrap();
        let header = match func.block(BlockId::ENTRY).terminator() {
            Some(Instruction::Branch { target }) => *target,
            other => panic!("expected Branch, got {:?}", other),
        };
        let body = match func.block(header).terminator() {
            Some(Instruction::CondBranch { then_dest, .. }) => *then_dest,
            other => panic!("expected CondBranch, got {:?}", other),
        };
        assert_eq!(
            func.block(body).terminator(),
            Some(&Instruction::Branch { target: header })
        );
    }

    #[test]
    fn test_case_lowers_to_switch() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", 0, 100);
        unit.functions.push(
            FunctionDecl::new("classify", None)
                .with_param("n", int)
                .with_local("r", int)
                .with_body(vec![Stmt::Case {
                    selector: Expr::name("n", int),
                    alts: vec![
                        (
                            vec![1, 2],
                            vec![Stmt::Assign {
                                target: Expr::name("r", int),
                                value: Expr::int(10, int),
                            }],
                        ),
                        (
                            vec![3],
                            vec![Stmt::Assign {
                                target: Expr::name("r", int),
                                value: Expr::int(20, int),
                            }],
                        ),
                    ],
                    default: Some(vec![Stmt::Assign {
                        target: Expr::name("r", int),
                        value: Expr::int(0, int),
                    }]),
                }]),
        );

        let module = lower(&unit);
        let func = module.get_function("classify").unwrap();
        let instrs = all_instrs(func);
        let (cases, default) = instrs
            .iter()
            .find_map(|i| match i {
                Instruction::Switch { cases, default, .. } => Some((cases.clone(), *default)),
                _ => None,
            })
            .unwrap();
        assert_eq!(cases.len(), 3);
        // 1 | 2 share one arm
        assert_eq!(cases[0].1, cases[1].1);
        assert_ne!(cases[1].1, cases[2].1);
        assert_ne!(default, cases[0].1);
        assert_eq!(cases[0].0, Value::ConstInt(1));
    }

    #[test]
    fn test_biased_constant_folds_into_store() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -1000, 1000);
        let base = unit.types.add_integer("Level", 10, 17);
        let biased = unit.types.add_subtype("Packed_Level", base, None, None);
        unit.types.set_rep(biased, RepClause::biased(3));
        unit.functions.push(
            FunctionDecl::new("f", None)
                .with_local("v", biased)
                .with_local("x", int)
                .with_body(vec![
                    Stmt::Assign {
                        target: Expr::name("v", biased),
                        value: Expr::int(12, biased),
                    },
                    Stmt::Assign {
                        target: Expr::name("x", int),
                        value: Expr::name("v", biased),
                    },
                ]),
        );

        let module = lower(&unit);
        let func = module.get_function("f").unwrap();
        let instrs = all_instrs(func);
        // 12 stores as 12 - 10
        assert!(instrs.contains(&Instruction::Store {
            value: Value::ConstInt(2),
            ptr: Value::local("v"),
        }));
        // reading it back adds the bias
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::Binary { op: BinaryOp::Add, right: Value::ConstInt(10), .. }
        )));
    }

    #[test]
    fn test_index_rebases_to_zero_origin() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -10000, 10000);
        let idx = unit.types.add_integer("Idx", 1, 10);
        let arr = unit.types.add_array("Vec10", idx, int, Some((1, 10)));
        unit.functions.push(
            FunctionDecl::new("f", Some(int))
                .with_param("a", arr)
                .with_param("i", idx)
                .with_local("x", int)
                .with_body(vec![
                    Stmt::Assign {
                        target: Expr::name("x", int),
                        value: Expr::index(Expr::name("a", arr), Expr::name("i", idx), int),
                    },
                    Stmt::Return(Some(Expr::index(
                        Expr::name("a", arr),
                        Expr::int(3, idx),
                        int,
                    ))),
                ]),
        );

        let module = lower(&unit);
        let func = module.get_function("f").unwrap();
        let instrs = all_instrs(func);
        // runtime index subtracts the low bound
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::Binary { op: BinaryOp::Sub, right: Value::ConstInt(1), .. }
        )));
        // constant index folds: a(3) reads element 2
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::GetElement { index: Value::ConstInt(2), .. }
        )));
    }

    #[test]
    fn test_unconstrained_index_goes_through_fat_fields() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -10000, 10000);
        let idx = unit.types.add_integer("Idx", 1, 1000);
        let vec = unit.types.add_array("Vec", idx, int, None);
        unit.functions.push(
            FunctionDecl::new("first_elem", Some(int))
                .with_param("v", vec)
                .with_param("i", idx)
                .with_body(vec![Stmt::Return(Some(Expr::index(
                    Expr::name("v", vec),
                    Expr::name("i", idx),
                    int,
                )))]),
        );

        let module = lower(&unit);
        let func = module.get_function("first_elem").unwrap();
        // fat parameter comes in by pointer
        assert_eq!(
            func.param_type(0),
            Some(&IrType::ptr_to(IrType::Struct("Vec_fat".into())))
        );
        let instrs = all_instrs(func);
        let fields: Vec<&str> = instrs
            .iter()
            .filter_map(|i| match i {
                Instruction::GetField { field_name, .. } => Some(field_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec!["data", "first"]);
        assert!(instrs.iter().any(|i| matches!(i, Instruction::GetElement { .. })));
    }

    #[test]
    fn test_record_component_access() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -10000, 10000);
        let rec = unit.types.add_record(
            "Pair",
            vec![
                vela_front::Field { name: "x".into(), ty: int },
                vela_front::Field { name: "y".into(), ty: int },
            ],
            false,
        );
        unit.functions.push(
            FunctionDecl::new("swap_x", Some(int))
                .with_local("r", rec)
                .with_body(vec![
                    Stmt::Assign {
                        target: Expr::field(Expr::name("r", rec), "x", int),
                        value: Expr::int(5, int),
                    },
                    Stmt::Return(Some(Expr::field(Expr::name("r", rec), "y", int))),
                ]),
        );

        let module = lower(&unit);
        assert!(module.get_struct("Pair").is_some());
        let func = module.get_function("swap_x").unwrap();
        let instrs = all_instrs(func);
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::SetField { field_index: 0, value: Value::ConstInt(5), .. }
        )));
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::GetField { field_index: 1, field_name, .. } if field_name == "y"
        )));
    }

    #[test]
    fn test_call_converts_args_to_param_views() {
        let mut unit = Unit::new("t");
        let small = unit.types.add_integer("Small", -100, 100);
        let int = unit.types.add_integer("Int", -100000, 100000);
        unit.functions.push(
            FunctionDecl::new("callee", Some(int))
                .with_param("p", small)
                .with_body(vec![Stmt::Return(Some(Expr::name("p", small)))]),
        );
        unit.functions.push(
            FunctionDecl::new("caller", Some(int))
                .with_local("x", int)
                .with_body(vec![Stmt::Return(Some(Expr::new(
                    ExprKind::Call {
                        callee: "callee".into(),
                        args: vec![Expr::name("x", int)],
                    },
                    int,
                )))]),
        );

        let module = lower(&unit);
        let func = module.get_function("caller").unwrap();
        let instrs = all_instrs(func);
        // i32 argument narrows to the callee's i8 parameter
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::Cast { kind: vela_ir::CastKind::Trunc, to_type: IrType::Int(8), .. }
        )));
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::Call { dest: Some(_), func, args } if func == "callee" && args.len() == 1
        )));
    }

    #[test]
    fn test_procedure_call_has_no_dest() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -100, 100);
        unit.functions.push(
            FunctionDecl::new("log_it", None)
                .with_param("n", int)
                .with_body(vec![Stmt::Null]),
        );
        unit.functions.push(FunctionDecl::new("caller", None).with_body(vec![Stmt::Call(
            Expr::new(
                ExprKind::Call { callee: "log_it".into(), args: vec![Expr::int(9, int)] },
                int,
            ),
        )]));

        let module = lower(&unit);
        let func = module.get_function("caller").unwrap();
        assert!(all_instrs(func).contains(&Instruction::Call {
            dest: None,
            func: "log_it".into(),
            args: vec![Value::ConstInt(9)],
        }));
    }

    #[test]
    fn test_composite_param_materialized_for_return() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -100, 100);
        let rec = unit.types.add_record(
            "Box",
            vec![vela_front::Field { name: "v".into(), ty: int }],
            false,
        );
        unit.functions.push(
            FunctionDecl::new("id", Some(rec))
                .with_param("b", rec)
                .with_body(vec![Stmt::Return(Some(Expr::name("b", rec)))]),
        );

        let module = lower(&unit);
        let func = module.get_function("id").unwrap();
        let instrs = all_instrs(func);
        // the pointer parameter loads into a temporary before returning
        assert!(instrs.iter().any(|i| matches!(
            i,
            Instruction::Load { ptr: Value::Param(0), .. }
        )));
        assert!(matches!(
            func.block(BlockId::ENTRY).terminator(),
            Some(Instruction::Return(Some(Value::Temp(_))))
        ));
    }

    #[test]
    fn test_dead_statements_after_return_dropped() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -100, 100);
        unit.functions.push(FunctionDecl::new("f", Some(int)).with_local("x", int).with_body(
            vec![
                Stmt::Return(Some(Expr::int(1, int))),
                Stmt::Assign {
                    target: Expr::name("x", int),
                    value: Expr::int(2, int),
                },
            ],
        ));

        let module = lower(&unit);
        let func = module.get_function("f").unwrap();
        let entry = func.block(BlockId::ENTRY);
        assert_eq!(entry.instructions.len(), 1);
        assert!(!all_instrs(func)
            .iter()
            .any(|i| matches!(i, Instruction::Store { .. })));
    }

    #[test]
    fn test_enum_selector_switches_on_ordinals() {
        let mut unit = Unit::new("t");
        let color = unit.types.add_enum("Color", &["Red", "Green", "Blue"]);
        let int = unit.types.add_integer("Int", -100, 100);
        unit.functions.push(
            FunctionDecl::new("rank", Some(int))
                .with_param("c", color)
                .with_body(vec![Stmt::Case {
                    selector: Expr::name("c", color),
                    alts: vec![(vec![0], vec![Stmt::Return(Some(Expr::int(1, int)))])],
                    default: Some(vec![Stmt::Return(Some(Expr::int(0, int)))]),
                }]),
        );

        let module = lower(&unit);
        let func = module.get_function("rank").unwrap();
        // enum objects are unsigned bytes
        assert_eq!(func.param_type(0), Some(&IrType::UInt(8)));
        assert!(all_instrs(func)
            .iter()
            .any(|i| matches!(i, Instruction::Switch { .. })));
    }
}
