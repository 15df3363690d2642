//! Value conversions between lowered views
//!
//! Elementary values move between views of the same or different
//! source types: widening and narrowing, int/float crossings, bias
//! arithmetic for biased views, and address-preserving re-typing for
//! references and access values. `emit_conversion` is the entry point
//! the expression lowerer uses; it layers the optional runtime range
//! check on top of the raw conversion.

use vela_error::{Diagnostic, ErrorCode, IResult, InternalError, SourceLoc};
use vela_ir::{BinaryOp, CastKind, Function, Instruction, IrType, Value};

use crate::ltype::{LType, TypeLayer};

/// Runtime helper that checks a value against an inclusive range
pub const CHECK_RANGE: &str = "__vela_check_range";
/// Runtime helper that reports a range failure unconditionally
pub const RAISE_RANGE: &str = "__vela_raise_range";

/// Options accepted by `emit_conversion`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Suppress every check
    pub unchecked: bool,
    /// Insert a runtime range check before converting
    pub overflow_check: bool,
    /// Truncate instead of rounding when narrowing floats
    pub float_truncate: bool,
}

pub(crate) fn emit_cast(func: &mut Function, kind: CastKind, value: Value, to_type: IrType) -> Value {
    let dest = func.new_temp();
    func.emit_with_dest(Instruction::Cast { dest, kind, value, to_type })
}

pub(crate) fn emit_binary(func: &mut Function, op: BinaryOp, left: Value, right: Value) -> Value {
    let dest = func.new_temp();
    func.emit_with_dest(Instruction::Binary { dest, op, left, right })
}

/// Bridges two scalar IR types with the cast the pair calls for.
/// Returns the value unchanged when the representations already agree.
pub(crate) fn cast_scalar(
    func: &mut Function,
    value: Value,
    from_ir: &IrType,
    to_ir: &IrType,
    float_truncate: bool,
) -> Value {
    match (from_ir, to_ir) {
        (f, t) if f.is_integer() && t.is_integer() => {
            let fb = f.int_bits().unwrap_or(64);
            let tb = t.int_bits().unwrap_or(64);
            if tb > fb {
                let kind = if fb == 1 || f.is_unsigned() {
                    CastKind::Zext
                } else {
                    CastKind::Sext
                };
                emit_cast(func, kind, value, to_ir.clone())
            } else if tb < fb {
                emit_cast(func, CastKind::Trunc, value, to_ir.clone())
            } else {
                value
            }
        }
        (f, t) if f.is_integer() && t.is_float() => {
            emit_cast(func, CastKind::SiToFp, value, to_ir.clone())
        }
        (f, t) if f.is_float() && t.is_integer() => {
            emit_cast(func, CastKind::FpToSi, value, to_ir.clone())
        }
        (IrType::Float(fb), IrType::Float(tb)) => {
            if tb > fb {
                emit_cast(func, CastKind::FpExt, value, to_ir.clone())
            } else if tb < fb {
                let kind = if float_truncate {
                    CastKind::FpTruncChop
                } else {
                    CastKind::FpTrunc
                };
                emit_cast(func, kind, value, to_ir.clone())
            } else {
                value
            }
        }
        _ => value,
    }
}

impl TypeLayer<'_> {
    /// Converts an elementary value from one view to another. Value
    /// identity is preserved; only the representation changes.
    pub fn convert(
        &mut self,
        func: &mut Function,
        value: Value,
        from: LType,
        to: LType,
        float_truncate: bool,
    ) -> IResult<Value> {
        if from == to {
            return Ok(value);
        }
        if self.is_access(from) || self.is_access(to) {
            return self.convert_pointer(func, value, to);
        }
        if !self.is_elementary(from) || !self.is_elementary(to) {
            return Err(InternalError::NonElementaryConvert {
                from: self.model().name_of(self.source(from)).to_string(),
                to: self.model().name_of(self.source(to)).to_string(),
            });
        }
        if let Some(folded) = self.fold_const(&value, to) {
            return Ok(folded);
        }

        let (value, from) = self.unbias(func, value, from)?;
        let from_ir = self.ir_type(from)?;
        if self.is_biased(to) {
            return self.rebias(func, value, &from_ir, to);
        }
        let to_ir = self.ir_type(to)?;
        Ok(cast_scalar(func, value, &from_ir, &to_ir, float_truncate))
    }

    /// Re-types a reference without changing the address it denotes.
    pub fn convert_reference(&mut self, func: &mut Function, value: Value, to: LType) -> IResult<Value> {
        let to_ir = IrType::ptr_to(self.ir_type(to)?);
        Ok(emit_cast(func, CastKind::PtrCast, value, to_ir))
    }

    /// Re-types an access value. Null stays null; any other value
    /// keeps designating the same object.
    pub fn convert_pointer(&mut self, func: &mut Function, value: Value, to: LType) -> IResult<Value> {
        if matches!(value, Value::ConstNull) {
            return Ok(value);
        }
        let to_ir = self.ir_type(to)?;
        Ok(emit_cast(func, CastKind::PtrCast, value, to_ir))
    }

    /// The conversion entry point for lowered expressions: optional
    /// range checking, then the conversion itself.
    pub fn emit_conversion(
        &mut self,
        func: &mut Function,
        value: Value,
        from: LType,
        to: LType,
        opts: ConvertOptions,
        loc: SourceLoc,
    ) -> IResult<Value> {
        if opts.unchecked && opts.overflow_check {
            return Err(InternalError::ExclusiveConvOptions {
                type_name: self.model().name_of(self.source(to)).to_string(),
            });
        }
        if opts.overflow_check {
            self.emit_range_check(func, &value, from, to, loc)?;
        }
        self.convert(func, value, from, to, opts.float_truncate)
    }

    /// Checks `value` against the target's range at run time. A
    /// constant already outside the range is reported at lowering time
    /// and the check degrades to an unconditional raise.
    fn emit_range_check(
        &mut self,
        func: &mut Function,
        value: &Value,
        from: LType,
        to: LType,
        loc: SourceLoc,
    ) -> IResult<()> {
        let src = self.source(to);
        let Some((lo, hi)) = self.model().range_of(src) else {
            return Ok(());
        };
        let line = Value::ConstInt(i64::from(loc.line));
        if let Some(v) = value.as_const_int() {
            if v < lo || v > hi {
                let mut diag = Diagnostic::warning(format!(
                    "value out of range of type `{}`",
                    self.model().name_of(src)
                ))
                .with_code(ErrorCode::RANGE_CHECK_FAILS);
                if loc.is_known() {
                    diag = diag.with_label(loc, "this check will always fail");
                }
                self.diags.push(diag);
                func.emit(Instruction::Call {
                    dest: None,
                    func: RAISE_RANGE.to_string(),
                    args: vec![Value::ConstInt(lo), Value::ConstInt(hi), line],
                });
            }
            return Ok(());
        }
        let from_ir = self.ir_type(from)?;
        let v64 = cast_scalar(func, value.clone(), &from_ir, &IrType::Int(64), false);
        func.emit(Instruction::Call {
            dest: None,
            func: CHECK_RANGE.to_string(),
            args: vec![v64, Value::ConstInt(lo), Value::ConstInt(hi), line],
        });
        Ok(())
    }

    /// Discrete and float constants convert without instructions.
    fn fold_const(&mut self, value: &Value, to: LType) -> Option<Value> {
        let v = value.as_const_int()?;
        if self.is_float(to) {
            return Some(Value::const_float(v as f64));
        }
        if !self.is_discrete(to) {
            return None;
        }
        if self.is_biased(to) {
            let (lo, _) = self.model().range_of(self.source(to)).unwrap_or((0, 0));
            return Some(Value::ConstInt(v.wrapping_sub(lo)));
        }
        Some(value.clone())
    }

    /// Recovers the semantic value of a biased store format: widen the
    /// stored offset, then add the bias back.
    fn unbias(&mut self, func: &mut Function, value: Value, from: LType) -> IResult<(Value, LType)> {
        if !self.is_biased(from) {
            return Ok((value, from));
        }
        let src = self.source(from);
        let (lo, _) = self.model().range_of(src).unwrap_or((0, 0));
        let prim = self.primitive(src)?;
        let prim_ir = self.ir_type(prim)?;
        let from_ir = self.ir_type(from)?;
        let widened = cast_scalar(func, value, &from_ir, &prim_ir, false);
        let debiased = emit_binary(func, BinaryOp::Add, widened, Value::ConstInt(lo));
        Ok((debiased, prim))
    }

    /// Produces the biased store format: subtract the bias, then
    /// narrow to the view's width.
    fn rebias(&mut self, func: &mut Function, value: Value, from_ir: &IrType, to: LType) -> IResult<Value> {
        let src = self.source(to);
        let (lo, _) = self.model().range_of(src).unwrap_or((0, 0));
        let offset = emit_binary(func, BinaryOp::Sub, value, Value::ConstInt(lo));
        let to_ir = self.ir_type(to)?;
        Ok(cast_scalar(func, offset, from_ir, &to_ir, false))
    }
}
