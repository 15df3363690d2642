//! Structured control-flow reconstruction
//!
//! Rebuilds if/else chains, switches and sequential runs from the
//! basic-block graph of a completed function. Each reachable block
//! maps to exactly one flow node; returns with the same operand
//! collapse into one shared terminal node. Statement text is produced
//! by a [`StmtRenderer`] as blocks are walked, so this module never
//! interprets instruction semantics itself.
//!
//! Reconstruction is memoized recursion: a block's node is registered
//! before its successors are visited, which is what lets loop
//! back-edges resolve to the existing header node instead of recursing
//! forever.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write;
use vela_error::{IResult, InternalError};
use vela_ir::{BlockId, Function, Instruction, Value};

/// Handle of one flow node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(pub u32);

impl FlowId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Contiguous range into one of the backing arenas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    fn range(self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// One arm of a reconstructed conditional. `test` is absent for the
/// final else arm.
#[derive(Debug, Clone)]
pub struct IfEntry {
    pub test: Option<Value>,
    /// Block the conditional branch came from, for diagnostics
    pub from_block: BlockId,
    pub target: Option<FlowId>,
}

/// One arm of a reconstructed switch. `value` is absent for the
/// default arm, which is always the first entry of a case range.
#[derive(Debug, Clone)]
pub struct CaseEntry {
    pub value: Option<Value>,
    pub target: Option<FlowId>,
}

/// A reconstructed control region
#[derive(Debug, Clone)]
pub struct FlowNode {
    /// Originating block; absent for synthetic return nodes
    pub block: Option<BlockId>,
    /// Rendered straight-line statements
    pub stmts: Span,
    /// Number of structural edges pointing here; the entry node
    /// carries one extra for the function entry itself
    pub use_count: u32,
    /// Unconditional successor
    pub next: Option<FlowId>,
    pub is_return: bool,
    pub ret_val: Option<Value>,
    pub if_range: Option<Span>,
    pub case_range: Option<Span>,
    /// Rendered switch discriminant, widened for the output language
    pub switch_expr: Option<String>,
}

impl FlowNode {
    fn new(block: Option<BlockId>) -> Self {
        Self {
            block,
            stmts: Span::default(),
            use_count: 0,
            next: None,
            is_return: false,
            ret_val: None,
            if_range: None,
            case_range: None,
            switch_expr: None,
        }
    }
}

/// Turns instructions into output statements while flow is rebuilt.
///
/// Implementations own all per-function naming and type information;
/// the flow graph only sequences the strings they hand back.
pub trait StmtRenderer {
    /// Renders one non-terminator instruction, or nothing if the
    /// instruction produces no statement
    fn render_instr(&mut self, instr: &Instruction) -> IResult<Option<String>>;

    /// Text of a switch discriminant, widened as the output language
    /// requires
    fn switch_expr_text(&mut self, disc: &Value) -> String;

    /// Wraps an aggregate return value in a named temporary when the
    /// output language cannot return it directly. Returns the extra
    /// statements plus the replacement operand, or `None` when the
    /// value can be returned as is.
    fn wrap_array_return(&mut self, value: &Value) -> Option<(Vec<String>, Value)>;
}

/// Flow nodes for one function, plus the if/case/statement arenas
/// they index into
#[derive(Debug, Default)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    ifs: Vec<IfEntry>,
    cases: Vec<CaseEntry>,
    stmts: Vec<String>,
    /// Memo: flow node per block
    block_flow: Vec<Option<FlowId>>,
    /// Shared terminal nodes, keyed by return operand
    return_flows: FxHashMap<Option<Value>, FlowId>,
}

impl FlowGraph {
    pub fn new(block_count: usize) -> Self {
        Self {
            block_flow: vec![None; block_count],
            ..Self::default()
        }
    }

    /// Rebuilds structured flow for `func`, returning the entry node.
    pub fn reconstruct(
        &mut self,
        func: &Function,
        renderer: &mut dyn StmtRenderer,
    ) -> IResult<FlowId> {
        let entry = self.get_or_create_flow(func, renderer, BlockId::ENTRY)?;
        // the function entry itself counts as a reference
        self.nodes[entry.index()].use_count += 1;
        tracing::trace!(function = %func.name, nodes = self.nodes.len(), "flow reconstructed");
        Ok(entry)
    }

    /// The flow node for `block`, building it (and everything it
    /// reaches) on first request.
    pub fn get_or_create_flow(
        &mut self,
        func: &Function,
        renderer: &mut dyn StmtRenderer,
        block: BlockId,
    ) -> IResult<FlowId> {
        if let Some(flow) = self.block_flow[block.index()] {
            return Ok(flow);
        }
        // register before recursing so back-edges find this node
        let flow = self.new_node(Some(block));
        self.block_flow[block.index()] = Some(flow);

        let bb = func.block(block);
        let term = bb
            .terminator()
            .ok_or_else(|| InternalError::unterminated(&func.name, block.0))?;
        let body = &bb.instructions[..bb.instructions.len() - 1];

        let stmt_start = self.stmts.len() as u32;
        for instr in body {
            if instr.is_terminator() {
                return Err(InternalError::UnexpectedTerminator {
                    block: block.0,
                    instr: instr.to_string(),
                });
            }
            if let Some(text) = renderer.render_instr(instr)? {
                self.stmts.push(text);
            }
        }

        match term {
            Instruction::Return(value) => {
                let mut operand = value.clone();
                if let Some(v) = &operand {
                    if let Some((extra, replacement)) = renderer.wrap_array_return(v) {
                        self.stmts.extend(extra);
                        operand = Some(replacement);
                    }
                }
                self.close_stmts(flow, stmt_start);
                let ret = self.return_flow(operand);
                self.set_next(flow, Some(ret));
            }
            Instruction::Branch { target } => {
                self.close_stmts(flow, stmt_start);
                let succ = self.get_or_create_flow(func, renderer, *target)?;
                self.set_next(flow, Some(succ));
            }
            Instruction::CondBranch { cond, then_dest, else_dest } => {
                self.close_stmts(flow, stmt_start);
                // both arms are reserved contiguously before either
                // target is visited
                let start = self.ifs.len() as u32;
                self.ifs.push(IfEntry {
                    test: Some(cond.clone()),
                    from_block: block,
                    target: None,
                });
                self.ifs.push(IfEntry { test: None, from_block: block, target: None });
                self.nodes[flow.index()].if_range = Some(Span { start, len: 2 });

                let then_flow = self.get_or_create_flow(func, renderer, *then_dest)?;
                self.set_if_target(start, Some(then_flow));
                let else_flow = self.get_or_create_flow(func, renderer, *else_dest)?;
                self.set_if_target(start + 1, Some(else_flow));
            }
            Instruction::Switch { disc, default, cases } => {
                self.close_stmts(flow, stmt_start);
                self.nodes[flow.index()].switch_expr = Some(renderer.switch_expr_text(disc));

                // default first, then the alternatives in operand order
                let start = self.cases.len() as u32;
                self.cases.push(CaseEntry { value: None, target: None });
                for (value, _) in cases {
                    self.cases.push(CaseEntry { value: Some(value.clone()), target: None });
                }
                self.nodes[flow.index()].case_range =
                    Some(Span { start, len: cases.len() as u32 + 1 });

                let default_flow = self.get_or_create_flow(func, renderer, *default)?;
                self.set_case_target(start, Some(default_flow));
                for (i, (_, target)) in cases.iter().enumerate() {
                    let case_flow = self.get_or_create_flow(func, renderer, *target)?;
                    self.set_case_target(start + 1 + i as u32, Some(case_flow));
                }
            }
            other => {
                return Err(InternalError::UnexpectedTerminator {
                    block: block.0,
                    instr: other.to_string(),
                });
            }
        }
        Ok(flow)
    }

    fn new_node(&mut self, block: Option<BlockId>) -> FlowId {
        let id = FlowId(self.nodes.len() as u32);
        self.nodes.push(FlowNode::new(block));
        id
    }

    fn close_stmts(&mut self, flow: FlowId, start: u32) {
        self.nodes[flow.index()].stmts = Span {
            start,
            len: self.stmts.len() as u32 - start,
        };
    }

    /// The shared terminal node for one return operand
    fn return_flow(&mut self, value: Option<Value>) -> FlowId {
        if let Some(&flow) = self.return_flows.get(&value) {
            return flow;
        }
        let flow = self.new_node(None);
        let node = &mut self.nodes[flow.index()];
        node.is_return = true;
        node.ret_val = value.clone();
        self.return_flows.insert(value, flow);
        flow
    }

    // ---- use-counted pointer updates -----------------------------------

    pub fn set_next(&mut self, from: FlowId, to: Option<FlowId>) {
        let old = self.nodes[from.index()].next;
        if old == to {
            return;
        }
        if let Some(old) = old {
            self.nodes[old.index()].use_count -= 1;
        }
        if let Some(to) = to {
            self.nodes[to.index()].use_count += 1;
        }
        self.nodes[from.index()].next = to;
    }

    pub fn set_if_target(&mut self, entry: u32, to: Option<FlowId>) {
        let old = self.ifs[entry as usize].target;
        if old == to {
            return;
        }
        if let Some(old) = old {
            self.nodes[old.index()].use_count -= 1;
        }
        if let Some(to) = to {
            self.nodes[to.index()].use_count += 1;
        }
        self.ifs[entry as usize].target = to;
    }

    pub fn set_case_target(&mut self, entry: u32, to: Option<FlowId>) {
        let old = self.cases[entry as usize].target;
        if old == to {
            return;
        }
        if let Some(old) = old {
            self.nodes[old.index()].use_count -= 1;
        }
        if let Some(to) = to {
            self.nodes[to.index()].use_count += 1;
        }
        self.cases[entry as usize].target = to;
    }

    // ---- read access ---------------------------------------------------

    pub fn node(&self, flow: FlowId) -> &FlowNode {
        &self.nodes[flow.index()]
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The flow node already built for `block`, if any
    pub fn flow_of(&self, block: BlockId) -> Option<FlowId> {
        self.block_flow.get(block.index()).copied().flatten()
    }

    pub fn if_entries(&self, flow: FlowId) -> &[IfEntry] {
        match self.nodes[flow.index()].if_range {
            Some(span) => &self.ifs[span.range()],
            None => &[],
        }
    }

    pub fn case_entries(&self, flow: FlowId) -> &[CaseEntry] {
        match self.nodes[flow.index()].case_range {
            Some(span) => &self.cases[span.range()],
            None => &[],
        }
    }

    pub fn stmts_of(&self, flow: FlowId) -> &[String] {
        &self.stmts[self.nodes[flow.index()].stmts.range()]
    }

    // ---- diagnostics ---------------------------------------------------

    /// Prints `root` and, when `transitive`, everything it reaches,
    /// each node exactly once.
    pub fn dump(&self, root: FlowId, transitive: bool) -> String {
        let mut out = String::new();
        let mut visited: FxHashSet<FlowId> = FxHashSet::default();
        let mut work = vec![root];

        while let Some(flow) = work.pop() {
            if !visited.insert(flow) {
                continue;
            }
            let node = self.node(flow);
            match (node.is_return, node.block) {
                (true, _) => match &node.ret_val {
                    Some(v) => writeln!(out, "{} [return {}, uses={}]", flow, v, node.use_count),
                    None => writeln!(out, "{} [return, uses={}]", flow, node.use_count),
                },
                (false, Some(block)) => {
                    writeln!(out, "{} [{}, uses={}]", flow, block, node.use_count)
                }
                (false, None) => writeln!(out, "{} [uses={}]", flow, node.use_count),
            }
            .unwrap();

            for stmt in self.stmts_of(flow) {
                writeln!(out, "  stmt: {}", stmt).unwrap();
            }
            if let Some(expr) = &node.switch_expr {
                writeln!(out, "  switch {}", expr).unwrap();
            }
            let mut targets = Vec::new();
            for entry in self.if_entries(flow) {
                let target = target_text(entry.target);
                match &entry.test {
                    Some(test) => writeln!(out, "  if {} -> {}", test, target),
                    None => writeln!(out, "  else -> {}", target),
                }
                .unwrap();
                targets.extend(entry.target);
            }
            for entry in self.case_entries(flow) {
                let target = target_text(entry.target);
                match &entry.value {
                    Some(value) => writeln!(out, "  case {} -> {}", value, target),
                    None => writeln!(out, "  case default -> {}", target),
                }
                .unwrap();
                targets.extend(entry.target);
            }
            if let Some(next) = node.next {
                writeln!(out, "  next -> {}", next).unwrap();
                targets.push(next);
            }
            if transitive {
                // reversed so the first target is visited first
                work.extend(targets.into_iter().rev());
            }
        }
        out
    }
}

fn target_text(target: Option<FlowId>) -> String {
    match target {
        Some(flow) => flow.to_string(),
        None => "<unset>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::IrType;

    /// Renders instruction display text; wraps returns of one named
    /// local when asked to
    struct TextRenderer {
        wrap_local: Option<&'static str>,
        synth: u32,
    }

    impl TextRenderer {
        fn new() -> Self {
            Self { wrap_local: None, synth: 0 }
        }

        fn wrapping(local: &'static str) -> Self {
            Self { wrap_local: Some(local), synth: 0 }
        }
    }

    impl StmtRenderer for TextRenderer {
        fn render_instr(&mut self, instr: &Instruction) -> IResult<Option<String>> {
            Ok(Some(format!("{};", instr)))
        }

        fn switch_expr_text(&mut self, disc: &Value) -> String {
            disc.to_string()
        }

        fn wrap_array_return(&mut self, value: &Value) -> Option<(Vec<String>, Value)> {
            let name = self.wrap_local?;
            if !matches!(value, Value::Local(n) if n == name) {
                return None;
            }
            let tmp = format!("w{}", self.synth);
            self.synth += 1;
            let stmts = vec![
                format!("ret_wrap {};", tmp),
                format!("copy {} into {}.f;", name, tmp),
            ];
            Some((stmts, Value::local(tmp)))
        }
    }

    fn two_way(ret_then: i64, ret_else: i64) -> Function {
        let mut func = Function::new("pick", IrType::Int(32));
        func.add_param("c", IrType::BOOL);
        let then_b = func.new_block("then");
        let else_b = func.new_block("else");
        func.emit(Instruction::CondBranch {
            cond: Value::Param(0),
            then_dest: then_b,
            else_dest: else_b,
        });
        func.position_at_end(then_b);
        func.emit(Instruction::Return(Some(Value::ConstInt(ret_then))));
        func.position_at_end(else_b);
        func.emit(Instruction::Return(Some(Value::ConstInt(ret_else))));
        func
    }

    #[test]
    fn test_if_produces_paired_entries() {
        let func = two_way(1, 2);
        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();

        let entries = graph.if_entries(entry);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].test, Some(Value::Param(0)));
        assert_eq!(entries[1].test, None);
        assert_eq!(entries[0].from_block, BlockId::ENTRY);

        let then_flow = entries[0].target.unwrap();
        let else_flow = entries[1].target.unwrap();
        assert_ne!(then_flow, else_flow);
        assert_eq!(graph.node(then_flow).use_count, 1);
        assert_eq!(graph.node(entry).use_count, 1);
    }

    #[test]
    fn test_get_or_create_flow_is_idempotent() {
        let func = two_way(1, 2);
        let mut renderer = TextRenderer::new();
        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut renderer).unwrap();
        let before = graph.len();

        let again = graph
            .get_or_create_flow(&func, &mut renderer, BlockId::ENTRY)
            .unwrap();
        assert_eq!(again, entry);
        assert_eq!(graph.len(), before);
    }

    #[test]
    fn test_same_value_returns_share_one_node() {
        let func = two_way(5, 5);
        let mut graph = FlowGraph::new(func.blocks.len());
        graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();

        let returns: Vec<&FlowNode> = graph.nodes().iter().filter(|n| n.is_return).collect();
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].ret_val, Some(Value::ConstInt(5)));
        assert_eq!(returns[0].use_count, 2);
    }

    #[test]
    fn test_distinct_returns_stay_separate() {
        let func = two_way(1, 2);
        let mut graph = FlowGraph::new(func.blocks.len());
        graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();

        let returns: Vec<&FlowNode> = graph.nodes().iter().filter(|n| n.is_return).collect();
        assert_eq!(returns.len(), 2);
        assert!(returns.iter().all(|n| n.use_count == 1));
    }

    #[test]
    fn test_void_returns_collapse() {
        let mut func = Function::new("noop", IrType::Void);
        func.add_param("c", IrType::BOOL);
        let then_b = func.new_block("then");
        let else_b = func.new_block("else");
        func.emit(Instruction::CondBranch {
            cond: Value::Param(0),
            then_dest: then_b,
            else_dest: else_b,
        });
        func.position_at_end(then_b);
        func.emit(Instruction::Return(None));
        func.position_at_end(else_b);
        func.emit(Instruction::Return(None));

        let mut graph = FlowGraph::new(func.blocks.len());
        graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();
        let returns: Vec<&FlowNode> = graph.nodes().iter().filter(|n| n.is_return).collect();
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].ret_val, None);
    }

    #[test]
    fn test_use_counts_follow_reassignment() {
        // entry -> b1 -> b2(return)
        let mut func = Function::new("chain", IrType::Void);
        let b1 = func.new_block("mid");
        let b2 = func.new_block("done");
        func.emit(Instruction::Branch { target: b1 });
        func.position_at_end(b1);
        func.emit(Instruction::Branch { target: b2 });
        func.position_at_end(b2);
        func.emit(Instruction::Return(None));

        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();
        let mid = graph.flow_of(b1).unwrap();
        let ret = graph.node(graph.flow_of(b2).unwrap()).next.unwrap();
        assert_eq!(graph.node(mid).use_count, 1);
        assert_eq!(graph.node(ret).use_count, 1);

        // skip the middle node entirely
        graph.set_next(entry, Some(ret));
        assert_eq!(graph.node(mid).use_count, 0);
        assert_eq!(graph.node(ret).use_count, 2);

        // and put it back
        graph.set_next(entry, Some(mid));
        assert_eq!(graph.node(mid).use_count, 1);
        assert_eq!(graph.node(ret).use_count, 1);
    }

    #[test]
    fn test_switch_default_entry_first() {
        let mut func = Function::new("classify", IrType::Void);
        func.add_param("n", IrType::Int(32));
        let one = func.new_block("one");
        let two = func.new_block("two");
        let other = func.new_block("other");
        func.emit(Instruction::Switch {
            disc: Value::Param(0),
            default: other,
            cases: vec![(Value::ConstInt(1), one), (Value::ConstInt(2), two)],
        });
        for b in [one, two, other] {
            func.position_at_end(b);
            func.emit(Instruction::Return(None));
        }

        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();

        let entries = graph.case_entries(entry);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].value, None);
        assert_eq!(entries[1].value, Some(Value::ConstInt(1)));
        assert_eq!(entries[2].value, Some(Value::ConstInt(2)));
        assert!(entries.iter().all(|e| e.target.is_some()));
        assert_eq!(graph.node(entry).switch_expr.as_deref(), Some("%arg0"));
    }

    #[test]
    fn test_loop_back_edge_resolves_to_header() {
        // entry -> header; header: if c then body else exit; body -> header
        let mut func = Function::new("spin", IrType::Void);
        func.add_param("c", IrType::BOOL);
        let header = func.new_block("loop");
        let body = func.new_block("body");
        let exit = func.new_block("end_loop");
        func.emit(Instruction::Branch { target: header });
        func.position_at_end(header);
        func.emit(Instruction::CondBranch {
            cond: Value::Param(0),
            then_dest: body,
            else_dest: exit,
        });
        func.position_at_end(body);
        func.emit(Instruction::Branch { target: header });
        func.position_at_end(exit);
        func.emit(Instruction::Return(None));

        let mut graph = FlowGraph::new(func.blocks.len());
        graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();

        let header_flow = graph.flow_of(header).unwrap();
        let body_flow = graph.flow_of(body).unwrap();
        // reached from the entry branch and the back-edge
        assert_eq!(graph.node(header_flow).use_count, 2);
        assert_eq!(graph.node(body_flow).next, Some(header_flow));
    }

    #[test]
    fn test_statements_kept_in_block_order() {
        let mut func = Function::new("seq", IrType::Void);
        func.add_local("x", IrType::Int(32));
        let a = func.new_temp();
        func.emit(Instruction::Load { dest: a, ptr: Value::local("x"), ty: IrType::Int(32) });
        let b = func.new_temp();
        func.emit(Instruction::Binary {
            dest: b,
            op: vela_ir::BinaryOp::Add,
            left: Value::Temp(a),
            right: Value::ConstInt(1),
        });
        func.emit(Instruction::Return(None));

        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();
        let stmts = graph.stmts_of(entry);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("load"));
        assert!(stmts[1].contains("add"));
    }

    #[test]
    fn test_array_return_is_wrapped() {
        let mut func = Function::new("fill", IrType::array_of(IrType::Int(32), 10));
        func.add_local("arr", IrType::array_of(IrType::Int(32), 10));
        func.emit(Instruction::Return(Some(Value::local("arr"))));

        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut TextRenderer::wrapping("arr")).unwrap();

        let stmts = graph.stmts_of(entry);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("ret_wrap"));
        let ret = graph.node(entry).next.unwrap();
        assert_eq!(graph.node(ret).ret_val, Some(Value::local("w0")));
    }

    #[test]
    fn test_dump_prints_shared_return_once() {
        let func = two_way(5, 5);
        let mut graph = FlowGraph::new(func.blocks.len());
        let entry = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap();

        let text = graph.dump(entry, true);
        assert_eq!(text.matches("return 5").count(), 1);
        assert!(text.contains("if %arg0"));
        assert!(text.contains("else ->"));
    }

    #[test]
    fn test_unterminated_block_is_an_error() {
        let func = Function::new("bad", IrType::Void);
        let mut graph = FlowGraph::new(func.blocks.len());
        let err = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap_err();
        assert!(matches!(err, InternalError::Unterminated { .. }));
    }

    #[test]
    fn test_terminator_in_block_middle_is_an_error() {
        let mut func = Function::new("bad", IrType::Void);
        func.emit(Instruction::Return(None));
        func.emit(Instruction::Branch { target: BlockId::ENTRY });

        let mut graph = FlowGraph::new(func.blocks.len());
        let err = graph.reconstruct(&func, &mut TextRenderer::new()).unwrap_err();
        assert!(matches!(err, InternalError::UnexpectedTerminator { .. }));
    }
}
