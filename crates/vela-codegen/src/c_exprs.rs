//! IR-to-C statement rendering
//!
//! One [`CFunction`] per emitted function. The IR does not annotate
//! temporaries with types, so a prepass walks the blocks once and
//! records the C type of every destination, plus the set of call
//! results that arrive wrapped in a return struct (functions with an
//! array result). After that, [`StmtRenderer`] calls map each
//! instruction to one C statement.
//!
//! Aggregate conventions:
//! - record arguments are passed by address, record parameters arrive
//!   as pointers and are accessed with `->`
//! - array parameters are declared in decayed form, so element access
//!   and `memcpy` read the same as for array locals
//! - array assignment is `memcpy`, sized from the destination

use rustc_hash::{FxHashMap, FxHashSet};
use vela_error::IResult;
use vela_ir::{BinaryOp, CastKind, CompareOp, Function, Instruction, IrType, Module, Value};

use crate::c_types::{c_decl, c_type};
use crate::flow::StmtRenderer;

/// Renders the body of one function as C statements
pub struct CFunction<'a> {
    func: &'a Function,
    module: &'a Module,
    /// Type of each temporary, from the prepass
    temp_types: FxHashMap<u32, IrType>,
    /// Call results held in a `{name}_ret` wrapper struct
    wrapped_calls: FxHashSet<u32>,
    /// Next id for temporaries synthesized during rendering
    next_synth: u32,
}

impl<'a> CFunction<'a> {
    pub fn new(module: &'a Module, func: &'a Function) -> Self {
        let mut temp_types = FxHashMap::default();
        let mut wrapped_calls = FxHashSet::default();
        let mut next_synth = 0u32;

        for block in &func.blocks {
            for instr in &block.instructions {
                if let Some(d) = instr.dest() {
                    next_synth = next_synth.max(d + 1);
                }
                match instr {
                    Instruction::Load { dest, ty, .. } => {
                        temp_types.insert(*dest, ty.clone());
                    }
                    Instruction::Binary { dest, left, right, .. } => {
                        let ty = known_type(&temp_types, func, left)
                            .or_else(|| known_type(&temp_types, func, right))
                            .unwrap_or(IrType::Int(64));
                        temp_types.insert(*dest, ty);
                    }
                    Instruction::Compare { dest, .. } | Instruction::Not { dest, .. } => {
                        temp_types.insert(*dest, IrType::BOOL);
                    }
                    Instruction::Neg { dest, value } => {
                        let ty = known_type(&temp_types, func, value).unwrap_or(IrType::Int(64));
                        temp_types.insert(*dest, ty);
                    }
                    Instruction::Call { dest: Some(d), func: callee, .. } => {
                        let ret = module
                            .get_function(callee)
                            .map(|f| f.return_type.clone())
                            .unwrap_or(IrType::Int(64));
                        if matches!(ret, IrType::Array(..)) {
                            wrapped_calls.insert(*d);
                        }
                        temp_types.insert(*d, ret);
                    }
                    Instruction::Cast { dest, to_type, .. } => {
                        temp_types.insert(*dest, to_type.clone());
                    }
                    Instruction::GetField { dest, struct_name, field_index, .. } => {
                        let ty = module
                            .get_struct(struct_name)
                            .and_then(|def| def.fields.get(*field_index))
                            .map(|f| f.ty.clone())
                            .unwrap_or(IrType::Int(64));
                        temp_types.insert(*dest, ty);
                    }
                    Instruction::GetElement { dest, base, .. } => {
                        let ty = element_type(&temp_types, func, base);
                        temp_types.insert(*dest, ty);
                    }
                    _ => {}
                }
            }
        }

        Self { func, module, temp_types, wrapped_calls, next_synth }
    }

    /// C expression text for a value
    pub fn render_value(&self, value: &Value) -> String {
        match value {
            Value::ConstInt(v) => render_int(*v),
            Value::ConstFloat(bits) => format!("{:?}", f64::from_bits(*bits)),
            Value::ConstBool(true) => "1".to_string(),
            Value::ConstBool(false) => "0".to_string(),
            Value::ConstNull => "NULL".to_string(),
            Value::Local(name) => name.clone(),
            Value::Param(idx) => self
                .func
                .params
                .get(*idx)
                .map(|(n, _)| n.clone())
                .unwrap_or_else(|| format!("arg{}", idx)),
            Value::Temp(id) if self.wrapped_calls.contains(id) => format!("t{}.f", id),
            Value::Temp(id) => format!("t{}", id),
        }
    }

    /// Type of a value, `int64_t` when nothing better is known
    pub fn value_type(&self, value: &Value) -> IrType {
        known_type(&self.temp_types, self.func, value).unwrap_or(IrType::Int(64))
    }

    fn temp_ty(&self, id: u32) -> IrType {
        self.temp_types.get(&id).cloned().unwrap_or(IrType::Int(64))
    }

    /// The object a load/store slot designates, as (text, type).
    /// Named locals are the object itself even when their type is a
    /// pointer; a pointer-typed parameter stands for the object
    /// behind it.
    fn place(&self, ptr: &Value) -> (String, IrType) {
        if let Value::Local(name) = ptr {
            let ty = self.func.local_type(name).cloned().unwrap_or(IrType::Int(64));
            return (name.clone(), ty);
        }
        match self.value_type(ptr) {
            IrType::Ptr(inner) => {
                // decayed array parameters are already the object
                let text = if matches!(inner.as_ref(), IrType::Array(..)) {
                    self.render_value(ptr)
                } else {
                    format!("(*{})", self.render_value(ptr))
                };
                (text, *inner)
            }
            ty => (self.render_value(ptr), ty),
        }
    }

    fn field_ref(&self, base: &Value, field: &str) -> String {
        let sep = if self.value_type(base).is_pointer() { "->" } else { "." };
        format!("{}{}{}", self.render_value(base), sep, field)
    }

    /// Declares temporary `dest` initialized from `src`
    fn define_temp(&self, dest: u32, ty: &IrType, src: &str) -> String {
        let name = format!("t{}", dest);
        if matches!(ty, IrType::Array(..)) {
            format!("{}; memcpy({}, {}, sizeof({}));", c_decl(ty, &name), name, src, name)
        } else {
            format!("{} = {};", c_decl(ty, &name), src)
        }
    }

    /// Assigns `src` into an existing place
    fn store_into(&self, ty: &IrType, dest: &str, src: &str) -> String {
        if matches!(ty, IrType::Array(..)) {
            format!("memcpy({}, {}, sizeof({}));", dest, src, dest)
        } else {
            format!("{} = {};", dest, src)
        }
    }

    fn call_arg(&self, value: &Value) -> String {
        match self.value_type(value) {
            // records go by address; arrays decay on their own
            IrType::Struct(_) => format!("&{}", self.render_value(value)),
            _ => self.render_value(value),
        }
    }
}

impl StmtRenderer for CFunction<'_> {
    fn render_instr(&mut self, instr: &Instruction) -> IResult<Option<String>> {
        let text = match instr {
            Instruction::Alloca { dest, ty } => Some(format!("{};", c_decl(ty, dest))),
            Instruction::Store { value, ptr } => {
                let (dest, ty) = self.place(ptr);
                Some(self.store_into(&ty, &dest, &self.render_value(value)))
            }
            Instruction::Load { dest, ptr, ty } => {
                let (src, _) = self.place(ptr);
                Some(self.define_temp(*dest, ty, &src))
            }
            Instruction::Binary { dest, op, left, right } => {
                let src = format!(
                    "{} {} {}",
                    self.render_value(left),
                    c_bin_op(*op),
                    self.render_value(right)
                );
                Some(self.define_temp(*dest, &self.temp_ty(*dest), &src))
            }
            Instruction::Compare { dest, op, left, right } => {
                let src = format!(
                    "{} {} {}",
                    self.render_value(left),
                    c_cmp_op(*op),
                    self.render_value(right)
                );
                Some(self.define_temp(*dest, &IrType::BOOL, &src))
            }
            Instruction::Not { dest, value } => {
                let src = format!("!({})", self.render_value(value));
                Some(self.define_temp(*dest, &self.temp_ty(*dest), &src))
            }
            Instruction::Neg { dest, value } => {
                let src = format!("-({})", self.render_value(value));
                Some(self.define_temp(*dest, &self.temp_ty(*dest), &src))
            }
            Instruction::Call { dest, func, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.call_arg(a)).collect();
                let call = format!("{}({})", func, rendered.join(", "));
                match dest {
                    Some(d) if self.wrapped_calls.contains(d) => {
                        Some(format!("{}_ret t{} = {};", func, d, call))
                    }
                    Some(d) => Some(self.define_temp(*d, &self.temp_ty(*d), &call)),
                    None => Some(format!("{};", call)),
                }
            }
            Instruction::Cast { dest, kind, value, to_type } => {
                let src = match kind {
                    CastKind::FpTruncChop => {
                        format!("__vela_trunc_f32({})", self.render_value(value))
                    }
                    _ => format!("({})({})", c_type(to_type), self.render_value(value)),
                };
                Some(self.define_temp(*dest, to_type, &src))
            }
            Instruction::GetField { dest, base, field_name, .. } => {
                let src = self.field_ref(base, field_name);
                Some(self.define_temp(*dest, &self.temp_ty(*dest), &src))
            }
            Instruction::SetField { base, struct_name, field_index, field_name, value } => {
                let ty = self
                    .module
                    .get_struct(struct_name)
                    .and_then(|def| def.fields.get(*field_index))
                    .map(|f| f.ty.clone())
                    .unwrap_or(IrType::Int(64));
                let dest = self.field_ref(base, field_name);
                Some(self.store_into(&ty, &dest, &self.render_value(value)))
            }
            Instruction::GetElement { dest, base, index } => {
                let src = format!("{}[{}]", self.render_value(base), self.render_value(index));
                Some(self.define_temp(*dest, &self.temp_ty(*dest), &src))
            }
            Instruction::SetElement { base, index, value } => {
                let ty = element_type(&self.temp_types, self.func, base);
                let dest = format!("{}[{}]", self.render_value(base), self.render_value(index));
                Some(self.store_into(&ty, &dest, &self.render_value(value)))
            }
            Instruction::Comment(text) => Some(format!("/* {} */", text)),
            // terminators are the flow graph's business
            _ => None,
        };
        Ok(text)
    }

    fn switch_expr_text(&mut self, disc: &Value) -> String {
        let text = self.render_value(disc);
        match self.value_type(disc).int_bits() {
            Some(bits) if bits < 64 => format!("(int64_t){}", text),
            _ => text,
        }
    }

    fn wrap_array_return(&mut self, value: &Value) -> Option<(Vec<String>, Value)> {
        if !matches!(self.value_type(value), IrType::Array(..)) {
            return None;
        }
        let tmp = format!("t{}", self.next_synth);
        self.next_synth += 1;
        let wrap = format!("{}_ret", self.func.name);
        let stmts = vec![
            format!("{} {};", wrap, tmp),
            format!("memcpy({}.f, {}, sizeof({}.f));", tmp, self.render_value(value), tmp),
        ];
        Some((stmts, Value::local(tmp)))
    }
}

/// Type of a value when the context determines one. Integer literals
/// have no inherent width and report `None`.
fn known_type(temps: &FxHashMap<u32, IrType>, func: &Function, value: &Value) -> Option<IrType> {
    match value {
        Value::ConstInt(_) => None,
        Value::ConstFloat(_) => Some(IrType::Float(64)),
        Value::ConstBool(_) => Some(IrType::BOOL),
        Value::ConstNull => Some(IrType::ptr_to(IrType::Void)),
        Value::Local(name) => func.local_type(name).cloned(),
        Value::Param(idx) => func.param_type(*idx).cloned(),
        Value::Temp(id) => temps.get(id).cloned(),
    }
}

/// Element type behind an indexing base: arrays directly, pointers to
/// arrays (parameters) and pointers to elements (unconstrained data
/// fields) through one level of indirection.
fn element_type(temps: &FxHashMap<u32, IrType>, func: &Function, base: &Value) -> IrType {
    match known_type(temps, func, base) {
        Some(IrType::Array(elem, _)) => *elem,
        Some(IrType::Ptr(inner)) => match *inner {
            IrType::Array(elem, _) => *elem,
            other => other,
        },
        Some(other) => other,
        None => IrType::Int(64),
    }
}

fn render_int(v: i64) -> String {
    if v == i64::MIN {
        // the magnitude does not fit a long long literal
        "(-9223372036854775807LL - 1)".to_string()
    } else if v > i64::from(i32::MAX) || v < i64::from(i32::MIN) {
        format!("{}LL", v)
    } else {
        format!("{}", v)
    }
}

fn c_bin_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::And => "&",
        BinaryOp::Or => "|",
        BinaryOp::Xor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
    }
}

fn c_cmp_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}
