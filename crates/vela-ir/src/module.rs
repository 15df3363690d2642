//! IR Module - functions, basic blocks and struct definitions
//!
//! A `Function` is built through an insertion point (`position_at_end`)
//! like an IR builder; blocks are addressed by `BlockId` so targets
//! stay valid as blocks are appended.

use crate::instruction::{Instruction, Value};
use crate::types::{IrType, StructDef};
use std::fmt;
use vela_error::SourceLoc;

/// A basic block identifier. A u32 index into the function's block
/// vector; the printable label is kept on the block itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const ENTRY: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// IR Module - one compilation unit
#[derive(Debug, Default)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Struct definitions, in dependency order
    pub structs: Vec<StructDef>,
    /// Functions
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            structs: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Adds a struct definition unless one with the same name exists
    pub fn add_struct(&mut self, def: StructDef) {
        if self.get_struct(&def.name).is_none() {
            self.structs.push(def);
        }
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; Module: {}", self.name)?;
        writeln!(f)?;

        for def in &self.structs {
            write!(f, "%{} = type {{ ", def.name)?;
            for (i, field) in def.fields.iter().enumerate() {
                if i > 0 { write!(f, ", ")?; }
                write!(f, "{} {}", field.ty, field.name)?;
                if let Some(bits) = field.bit_width {
                    write!(f, ":{}", bits)?;
                }
            }
            writeln!(f, " }}")?;
        }
        if !self.structs.is_empty() {
            writeln!(f)?;
        }

        for func in &self.functions {
            writeln!(f, "{}", func)?;
        }

        Ok(())
    }
}

/// Function in IR
#[derive(Debug)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Parameters (name, type)
    pub params: Vec<(String, IrType)>,
    /// Return type
    pub return_type: IrType,
    /// Basic blocks, indexed by `BlockId`
    pub blocks: Vec<BasicBlock>,
    /// Local variables in declaration order
    pub locals: Vec<(String, IrType)>,
    /// Insertion point for `emit`
    cursor: BlockId,
    /// Next temporary ID
    next_temp: u32,
    /// Debug location stamped on emitted instructions
    current_loc: SourceLoc,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: IrType) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            blocks: vec![BasicBlock::new("entry")],
            locals: Vec::new(),
            cursor: BlockId::ENTRY,
            next_temp: 0,
            current_loc: SourceLoc::NONE,
        }
    }

    /// Adds a parameter
    pub fn add_param(&mut self, name: impl Into<String>, ty: IrType) {
        self.params.push((name.into(), ty));
    }

    /// Declares a local variable slot
    pub fn add_local(&mut self, name: impl Into<String>, ty: IrType) {
        self.locals.push((name.into(), ty));
    }

    pub fn local_type(&self, name: &str) -> Option<&IrType> {
        self.locals.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn param_type(&self, index: usize) -> Option<&IrType> {
        self.params.get(index).map(|(_, t)| t)
    }

    /// Creates a new temporary ID
    pub fn new_temp(&mut self) -> u32 {
        let id = self.next_temp;
        self.next_temp += 1;
        id
    }

    /// Appends a new block and returns its ID; the insertion point
    /// does not move.
    pub fn new_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(label));
        id
    }

    /// Moves the insertion point to the end of `block`
    pub fn position_at_end(&mut self, block: BlockId) {
        debug_assert!(block.index() < self.blocks.len());
        self.cursor = block;
    }

    /// The block instructions are currently appended to
    pub fn insertion_block(&self) -> BlockId {
        self.cursor
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// Sets the debug location for subsequently emitted instructions
    pub fn set_loc(&mut self, loc: SourceLoc) {
        self.current_loc = loc;
    }

    /// Debug location of instruction `idx` in `block`
    pub fn loc_of(&self, block: BlockId, idx: usize) -> SourceLoc {
        self.blocks[block.index()]
            .locations
            .get(idx)
            .copied()
            .unwrap_or(SourceLoc::NONE)
    }

    /// Appends an instruction at the insertion point
    pub fn emit(&mut self, inst: Instruction) {
        let loc = self.current_loc;
        self.blocks[self.cursor.index()].push_with_loc(inst, loc);
    }

    /// Emits an instruction and returns its destination temporary
    pub fn emit_with_dest(&mut self, inst: Instruction) -> Value {
        let dest = inst.dest().expect("instruction has no destination");
        self.emit(inst);
        Value::Temp(dest)
    }

    /// Whether `block` ends in a terminator
    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.blocks[block.index()].is_terminated()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {} @{}(", self.return_type, self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{} %{}", ty, name)?;
        }
        writeln!(f, ") {{")?;

        for (name, ty) in &self.locals {
            writeln!(f, "  %{} = alloca {}", name, ty)?;
        }
        if !self.locals.is_empty() {
            writeln!(f)?;
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if block.label.is_empty() {
                writeln!(f, "b{}:", i)?;
            } else {
                writeln!(f, "b{}:  ; {}", i, block.label)?;
            }
            for inst in &block.instructions {
                writeln!(f, "  {}", inst)?;
            }
        }

        writeln!(f, "}}")
    }
}

/// Basic Block - straight-line instruction sequence ending in a
/// terminator once the function is complete
#[derive(Debug)]
pub struct BasicBlock {
    /// Display label
    pub label: String,
    /// Instructions
    pub instructions: Vec<Instruction>,
    /// Per-instruction debug locations, parallel to `instructions`
    pub locations: Vec<SourceLoc>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            locations: Vec::new(),
        }
    }

    /// Checks if the block ends with a terminator instruction
    pub fn is_terminated(&self) -> bool {
        self.instructions.last().map(|i| i.is_terminator()).unwrap_or(false)
    }

    /// The terminator, when the block has one
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    pub fn push(&mut self, inst: Instruction) {
        self.push_with_loc(inst, SourceLoc::NONE);
    }

    pub fn push_with_loc(&mut self, inst: Instruction, loc: SourceLoc) {
        self.instructions.push(inst);
        self.locations.push(loc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::BinaryOp;

    #[test]
    fn test_function_creation() {
        let mut func = Function::new("add", IrType::Int(64));
        func.add_param("a", IrType::Int(64));
        func.add_param("b", IrType::Int(64));

        let t0 = func.new_temp();
        func.emit(Instruction::Binary {
            dest: t0,
            op: BinaryOp::Add,
            left: Value::Param(0),
            right: Value::Param(1),
        });
        func.emit(Instruction::Return(Some(Value::Temp(t0))));

        assert_eq!(func.params.len(), 2);
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(func.blocks[0].instructions.len(), 2);
        assert!(func.is_terminated(BlockId::ENTRY));
    }

    #[test]
    fn test_insertion_point_moves() {
        let mut func = Function::new("f", IrType::Void);
        let side = func.new_block("side");

        func.emit(Instruction::Branch { target: side });
        func.position_at_end(side);
        func.emit(Instruction::Return(None));

        assert_eq!(func.blocks[0].instructions.len(), 1);
        assert_eq!(func.blocks[1].instructions.len(), 1);
        assert!(func.is_terminated(side));
    }

    #[test]
    fn test_debug_locations_follow_emissions() {
        let mut func = Function::new("f", IrType::Void);
        func.set_loc(SourceLoc::line_only(0, 12));
        func.emit(Instruction::Comment("at line 12".into()));
        func.emit(Instruction::Return(None));

        assert_eq!(func.loc_of(BlockId::ENTRY, 0).line, 12);
        assert_eq!(func.loc_of(BlockId::ENTRY, 1).line, 12);
    }

    #[test]
    fn test_module_display() {
        let mut module = Module::new("demo");
        let mut func = Function::new("main", IrType::Void);
        func.emit(Instruction::Return(None));
        module.add_function(func);

        let output = module.to_string();
        assert!(output.contains("; Module: demo"));
        assert!(output.contains("define void @main"));
        assert!(output.contains("ret void"));
    }
}
