//! C backend
//!
//! Renders a module as one C translation unit: runtime prelude,
//! struct typedefs, return-wrapper typedefs, prototypes, then the
//! function bodies. Control flow comes back out of the flow graph as
//! `if`/`switch` where a node has a single use and as `goto L{id}`
//! where it is shared (join points, loop headers, shared returns).

use std::fmt::Write;

use rustc_hash::FxHashSet;
use vela_error::IResult;
use vela_ir::{Function, IrType, Module};

use crate::c_exprs::CFunction;
use crate::c_types::{c_decl, c_param, c_struct_def, c_type};
use crate::flow::{FlowGraph, FlowId};
use crate::CodeGen;

/// C code generator
#[derive(Debug, Default)]
pub struct CBackend;

impl CBackend {
    pub fn new() -> Self {
        Self
    }

    fn emit_prelude(&self, module: &Module, output: &mut String) {
        writeln!(output, "/* C translation of module \"{}\" */", module.name).unwrap();
        writeln!(output).unwrap();
        writeln!(output, "#include <stdint.h>").unwrap();
        writeln!(output, "#include <string.h>").unwrap();
        writeln!(output, "#include <stdio.h>").unwrap();
        writeln!(output, "#include <stdlib.h>").unwrap();
        writeln!(output, "#include <math.h>").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "static inline void __vela_raise_range(int64_t lo, int64_t hi, int64_t line) {{").unwrap();
        writeln!(output, "    fprintf(stderr, \"range check failed at line %lld (valid %lld .. %lld)\\n\",").unwrap();
        writeln!(output, "            (long long)line, (long long)lo, (long long)hi);").unwrap();
        writeln!(output, "    exit(1);").unwrap();
        writeln!(output, "}}").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "static inline void __vela_check_range(int64_t value, int64_t lo, int64_t hi, int64_t line) {{").unwrap();
        writeln!(output, "    if (value < lo || value > hi) {{").unwrap();
        writeln!(output, "        __vela_raise_range(lo, hi, line);").unwrap();
        writeln!(output, "    }}").unwrap();
        writeln!(output, "}}").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "static inline float __vela_trunc_f32(double value) {{").unwrap();
        writeln!(output, "    return (float)trunc(value);").unwrap();
        writeln!(output, "}}").unwrap();
        writeln!(output).unwrap();
    }

    fn emit_structs(&self, module: &Module, output: &mut String) {
        for def in &module.structs {
            output.push_str(&c_struct_def(def));
            writeln!(output).unwrap();
        }
    }

    /// One wrapper typedef per function returning an array; C cannot
    /// return arrays directly.
    fn emit_return_wrappers(&self, module: &Module, output: &mut String) {
        let mut any = false;
        for func in &module.functions {
            if matches!(func.return_type, IrType::Array(..)) {
                writeln!(
                    output,
                    "typedef struct {{ {}; }} {}_ret;",
                    c_decl(&func.return_type, "f"),
                    func.name
                )
                .unwrap();
                any = true;
            }
        }
        if any {
            writeln!(output).unwrap();
        }
    }

    fn emit_prototypes(&self, module: &Module, output: &mut String) {
        for func in &module.functions {
            writeln!(output, "{};", self.signature(func)).unwrap();
        }
        if !module.functions.is_empty() {
            writeln!(output).unwrap();
        }
    }

    fn signature(&self, func: &Function) -> String {
        let ret = match &func.return_type {
            IrType::Array(..) => format!("{}_ret", func.name),
            ty => c_type(ty),
        };
        let params: Vec<String> = func
            .params
            .iter()
            .map(|(name, ty)| c_param(ty, name))
            .collect();
        let params = if params.is_empty() { "void".to_string() } else { params.join(", ") };
        format!("{} {}({})", ret, func.name, params)
    }

    fn emit_function(&self, module: &Module, func: &Function, output: &mut String) -> IResult<()> {
        let mut renderer = CFunction::new(module, func);
        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(func, &mut renderer)?;
        tracing::debug!(function = %func.name, nodes = graph.len(), "emitting C body");

        writeln!(output, "{} {{", self.signature(func)).unwrap();
        for (name, ty) in &func.locals {
            writeln!(output, "    {};", c_decl(ty, name)).unwrap();
        }
        if !func.locals.is_empty() {
            writeln!(output).unwrap();
        }

        let mut emitter = FlowEmitter {
            graph: &graph,
            renderer: &renderer,
            out: output,
            emitted: FxHashSet::default(),
            pending: Vec::new(),
            depth: 1,
        };
        emitter.run(entry);

        writeln!(output, "}}").unwrap();
        Ok(())
    }
}

impl CodeGen for CBackend {
    type Output = IResult<String>;

    fn generate(&self, module: &Module) -> Self::Output {
        tracing::debug!(module = %module.name, functions = module.functions.len(), "generating C");
        let mut output = String::new();
        self.emit_prelude(module, &mut output);
        self.emit_structs(module, &mut output);
        self.emit_return_wrappers(module, &mut output);
        self.emit_prototypes(module, &mut output);
        for (i, func) in module.functions.iter().enumerate() {
            if i > 0 {
                writeln!(output).unwrap();
            }
            self.emit_function(module, func, &mut output)?;
        }
        Ok(output)
    }
}

/// Walks the flow graph and writes structured C. Single-use nodes are
/// emitted inline where they are reached; shared nodes become labels
/// collected in `pending` and drained at function depth.
struct FlowEmitter<'a, 'f> {
    graph: &'a FlowGraph,
    renderer: &'a CFunction<'f>,
    out: &'a mut String,
    emitted: FxHashSet<FlowId>,
    pending: Vec<FlowId>,
    depth: usize,
}

impl FlowEmitter<'_, '_> {
    fn run(&mut self, entry: FlowId) {
        // a loop header at the very entry gets its label directly
        if self.graph.node(entry).use_count > 1 {
            self.emit_labeled(entry);
        } else {
            self.emit_subtree(entry);
        }
        let mut i = 0;
        while i < self.pending.len() {
            let flow = self.pending[i];
            i += 1;
            if self.emitted.contains(&flow) {
                continue;
            }
            self.emit_labeled(flow);
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn emit_subtree(&mut self, flow: FlowId) {
        if self.emitted.contains(&flow) {
            self.line(&format!("goto L{};", flow.0));
            return;
        }
        if self.graph.node(flow).use_count > 1 {
            self.line(&format!("goto L{};", flow.0));
            self.pending.push(flow);
            return;
        }
        self.emit_node(flow);
    }

    fn emit_labeled(&mut self, flow: FlowId) {
        let label = format!("L{}:;", flow.0);
        let depth = self.depth;
        self.depth = 0;
        self.line(&label);
        self.depth = depth;
        self.emit_node(flow);
    }

    fn emit_node(&mut self, flow: FlowId) {
        self.emitted.insert(flow);
        let graph = self.graph;
        let node = graph.node(flow);
        for stmt in graph.stmts_of(flow) {
            self.line(stmt);
        }
        if node.is_return {
            match &node.ret_val {
                Some(v) => {
                    let text = format!("return {};", self.renderer.render_value(v));
                    self.line(&text);
                }
                None => self.line("return;"),
            }
            return;
        }
        if node.if_range.is_some() {
            self.emit_if_chain(flow);
            return;
        }
        if node.case_range.is_some() {
            self.emit_switch(flow);
            return;
        }
        if let Some(next) = node.next {
            self.emit_subtree(next);
        }
    }

    fn emit_if_chain(&mut self, flow: FlowId) {
        let graph = self.graph;
        let mut entries = graph.if_entries(flow);
        let mut prefix = "if";
        loop {
            let (test, then_t, else_t) = match entries {
                [a, b] => match (&a.test, a.target, b.target) {
                    (Some(test), Some(then_t), Some(else_t)) => (test, then_t, else_t),
                    _ => {
                        self.line("/* unresolved conditional */");
                        return;
                    }
                },
                _ => {
                    self.line("/* unresolved conditional */");
                    return;
                }
            };
            let cond = self.renderer.render_value(test);
            self.line(&format!("{} ({}) {{", prefix, cond));
            self.depth += 1;
            self.emit_subtree(then_t);
            self.depth -= 1;

            // an else branch that only tests again folds into `else if`
            let else_node = graph.node(else_t);
            let collapses = !self.emitted.contains(&else_t)
                && else_node.use_count == 1
                && !else_node.is_return
                && else_node.if_range.is_some()
                && graph.stmts_of(else_t).is_empty();
            if collapses {
                self.emitted.insert(else_t);
                entries = graph.if_entries(else_t);
                prefix = "} else if";
                continue;
            }

            self.line("} else {");
            self.depth += 1;
            self.emit_subtree(else_t);
            self.depth -= 1;
            self.line("}");
            return;
        }
    }

    fn emit_switch(&mut self, flow: FlowId) {
        let graph = self.graph;
        let node = graph.node(flow);
        let expr = node.switch_expr.clone().unwrap_or_default();
        self.line(&format!("switch ({}) {{", expr));
        let entries = graph.case_entries(flow);

        // alternatives in source order; adjacent entries sharing a
        // target stack their case labels
        let mut i = 1;
        while i < entries.len() {
            let target = entries[i].target;
            let mut j = i;
            while j < entries.len() && entries[j].target == target {
                if let Some(value) = &entries[j].value {
                    let label = format!("case {}:", self.renderer.render_value(value));
                    self.line(&label);
                }
                j += 1;
            }
            if let Some(t) = target {
                self.depth += 1;
                self.emit_subtree(t);
                self.depth -= 1;
            }
            i = j;
        }

        // the default alternative prints last even though the graph
        // stores it first
        if let Some(t) = entries[0].target {
            self.line("default:");
            self.depth += 1;
            self.emit_subtree(t);
            self.depth -= 1;
        }
        self.line("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{BlockId, CompareOp, Instruction, Value};

    fn two_way_pick() -> Module {
        let mut module = Module::new("demo");
        let mut func = Function::new("pick", IrType::Int(32));
        func.add_param("a", IrType::Int(32));
        func.add_param("b", IrType::Int(32));
        let then_b = func.new_block("then");
        let else_b = func.new_block("else");
        let t0 = func.new_temp();
        func.emit(Instruction::Compare {
            dest: t0,
            op: CompareOp::Gt,
            left: Value::Param(0),
            right: Value::Param(1),
        });
        func.emit(Instruction::CondBranch {
            cond: Value::Temp(t0),
            then_dest: then_b,
            else_dest: else_b,
        });
        func.position_at_end(then_b);
        func.emit(Instruction::Return(Some(Value::Param(0))));
        func.position_at_end(else_b);
        func.emit(Instruction::Return(Some(Value::Param(1))));
        module.add_function(func);
        module
    }

    #[test]
    fn test_two_way_function_renders_as_if_else() {
        let out = CBackend::new().generate(&two_way_pick()).unwrap();
        assert!(out.contains("int32_t pick(int32_t a, int32_t b) {"));
        assert!(out.contains("uint8_t t0 = a > b;"));
        assert!(out.contains("if (t0) {"));
        assert!(out.contains("return a;"));
        assert!(out.contains("} else {"));
        assert!(out.contains("return b;"));
    }

    #[test]
    fn test_prelude_and_prototypes_precede_bodies() {
        let out = CBackend::new().generate(&two_way_pick()).unwrap();
        assert!(out.contains("#include <stdint.h>"));
        assert!(out.contains("__vela_check_range"));
        assert!(out.contains("__vela_trunc_f32"));
        assert!(out.contains("int32_t pick(int32_t a, int32_t b);"));
        let proto = out.find("int32_t pick(int32_t a, int32_t b);").unwrap();
        let body = out.find("int32_t pick(int32_t a, int32_t b) {").unwrap();
        assert!(proto < body);
    }

    #[test]
    fn test_shared_return_goes_through_one_label() {
        let mut module = Module::new("demo");
        let mut func = Function::new("f", IrType::Int(32));
        func.add_param("c", IrType::BOOL);
        let then_b = func.new_block("then");
        let else_b = func.new_block("else");
        func.emit(Instruction::CondBranch {
            cond: Value::Param(0),
            then_dest: then_b,
            else_dest: else_b,
        });
        func.position_at_end(then_b);
        func.emit(Instruction::Return(Some(Value::ConstInt(5))));
        func.position_at_end(else_b);
        func.emit(Instruction::Return(Some(Value::ConstInt(5))));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        assert_eq!(out.matches("return 5;").count(), 1);
        assert!(out.contains("goto L"));
    }

    #[test]
    fn test_loop_header_gets_label_and_back_edge_goto() {
        let mut module = Module::new("demo");
        let mut func = Function::new("spin", IrType::Void);
        func.add_local("go", IrType::BOOL);
        let body = func.new_block("body");
        let exit = func.new_block("exit");
        let t0 = func.new_temp();
        func.emit(Instruction::Load { dest: t0, ptr: Value::local("go"), ty: IrType::BOOL });
        func.emit(Instruction::CondBranch {
            cond: Value::Temp(t0),
            then_dest: body,
            else_dest: exit,
        });
        func.position_at_end(body);
        func.emit(Instruction::Branch { target: BlockId::ENTRY });
        func.position_at_end(exit);
        func.emit(Instruction::Return(None));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        assert!(out.contains("L0:;"));
        assert!(out.contains("goto L0;"));
        assert!(out.contains("return;"));
    }

    #[test]
    fn test_switch_prints_default_last() {
        let mut module = Module::new("demo");
        let mut func = Function::new("classify", IrType::Int(32));
        func.add_param("s", IrType::Int(8));
        let c1 = func.new_block("one");
        let c2 = func.new_block("two");
        let d = func.new_block("others");
        func.emit(Instruction::Switch {
            disc: Value::Param(0),
            default: d,
            cases: vec![(Value::ConstInt(1), c1), (Value::ConstInt(2), c2)],
        });
        func.position_at_end(c1);
        func.emit(Instruction::Return(Some(Value::ConstInt(10))));
        func.position_at_end(c2);
        func.emit(Instruction::Return(Some(Value::ConstInt(20))));
        func.position_at_end(d);
        func.emit(Instruction::Return(Some(Value::ConstInt(0))));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        assert!(out.contains("switch ((int64_t)s) {"));
        assert!(out.contains("case 1:"));
        assert!(out.contains("case 2:"));
        assert!(out.find("case 2:").unwrap() < out.find("default:").unwrap());
        assert!(out.contains("return 0;"));
    }

    #[test]
    fn test_switch_stacks_labels_of_shared_alternatives() {
        let mut module = Module::new("demo");
        let mut func = Function::new("f", IrType::Int(32));
        func.add_param("s", IrType::Int(64));
        let shared = func.new_block("small");
        let d = func.new_block("others");
        func.emit(Instruction::Switch {
            disc: Value::Param(0),
            default: d,
            cases: vec![(Value::ConstInt(1), shared), (Value::ConstInt(2), shared)],
        });
        func.position_at_end(shared);
        func.emit(Instruction::Return(Some(Value::ConstInt(7))));
        func.position_at_end(d);
        func.emit(Instruction::Return(Some(Value::ConstInt(0))));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        let one = out.find("case 1:").unwrap();
        let two = out.find("case 2:").unwrap();
        assert!(one < two);
        // both labels funnel into one emission of the shared arm
        assert_eq!(out.matches("return 7;").count(), 1);
    }

    #[test]
    fn test_array_return_wrapped_in_typedef() {
        let arr = IrType::array_of(IrType::Int(32), 3);
        let mut module = Module::new("demo");
        let mut func = Function::new("fill", arr.clone());
        func.add_local("a", arr);
        func.emit(Instruction::Return(Some(Value::local("a"))));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        assert!(out.contains("typedef struct { int32_t f[3]; } fill_ret;"));
        assert!(out.contains("fill_ret fill(void) {"));
        assert!(out.contains("memcpy(t0.f, a, sizeof(t0.f));"));
        assert!(out.contains("return t0;"));
    }

    #[test]
    fn test_bare_second_test_flattens_to_else_if() {
        let mut module = Module::new("demo");
        let mut func = Function::new("order", IrType::Int(32));
        func.add_param("a", IrType::Int(32));
        func.add_param("b", IrType::Int(32));
        func.add_param("c", IrType::Int(32));
        let r1 = func.new_block("r1");
        let second = func.new_block("second");
        let r2 = func.new_block("r2");
        let r3 = func.new_block("r3");
        let t0 = func.new_temp();
        let t1 = func.new_temp();
        func.emit(Instruction::Compare {
            dest: t0,
            op: CompareOp::Lt,
            left: Value::Param(0),
            right: Value::Param(1),
        });
        func.emit(Instruction::Compare {
            dest: t1,
            op: CompareOp::Lt,
            left: Value::Param(0),
            right: Value::Param(2),
        });
        func.emit(Instruction::CondBranch {
            cond: Value::Temp(t0),
            then_dest: r1,
            else_dest: second,
        });
        func.position_at_end(second);
        func.emit(Instruction::CondBranch {
            cond: Value::Temp(t1),
            then_dest: r2,
            else_dest: r3,
        });
        func.position_at_end(r1);
        func.emit(Instruction::Return(Some(Value::ConstInt(1))));
        func.position_at_end(r2);
        func.emit(Instruction::Return(Some(Value::ConstInt(2))));
        func.position_at_end(r3);
        func.emit(Instruction::Return(Some(Value::ConstInt(3))));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        assert!(out.contains("} else if (t1) {"));
        assert!(out.contains("return 2;"));
        assert!(out.contains("return 3;"));
    }

    #[test]
    fn test_struct_typedef_and_pointer_param() {
        use vela_ir::{StructDef, StructField};

        let mut module = Module::new("demo");
        let mut def = StructDef::new("Pair");
        def.add_field(StructField::new("x", IrType::Int(32)));
        def.add_field(StructField::new("y", IrType::Int(32)));
        module.add_struct(def);

        let mut func = Function::new("first", IrType::Int(32));
        func.add_param("p", IrType::ptr_to(IrType::Struct("Pair".into())));
        let t0 = func.new_temp();
        func.emit(Instruction::GetField {
            dest: t0,
            base: Value::Param(0),
            struct_name: "Pair".into(),
            field_index: 0,
            field_name: "x".into(),
        });
        func.emit(Instruction::Return(Some(Value::Temp(t0))));
        module.add_function(func);

        let out = CBackend::new().generate(&module).unwrap();
        assert!(out.contains("typedef struct Pair {"));
        assert!(out.contains("int32_t first(Pair *p) {"));
        assert!(out.contains("int32_t t0 = p->x;"));
    }
}
