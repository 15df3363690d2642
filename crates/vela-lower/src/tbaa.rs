//! Type-based alias-analysis metadata
//!
//! A compact arena of TBAA nodes the optimizer can hang alias facts
//! on. Every scalar node chains up to the single root; record nodes
//! list their components with bit offsets.

use std::fmt;

/// Handle into the TBAA arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TbaaId(u32);

impl fmt::Display for TbaaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}", self.0)
    }
}

/// One component of a struct TBAA node
#[derive(Debug, Clone, PartialEq)]
pub struct TbaaField {
    pub offset_bits: u64,
    pub size_bits: u64,
    pub node: TbaaId,
}

/// TBAA node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TbaaNode {
    /// The unique root all scalar nodes descend from
    Root { name: String },
    /// A scalar access type
    Scalar {
        name: String,
        size_bits: u64,
        parent: TbaaId,
    },
    /// A record, with per-component nodes
    Struct {
        name: String,
        size_bits: u64,
        fields: Vec<TbaaField>,
    },
}

impl TbaaNode {
    pub fn name(&self) -> &str {
        match self {
            TbaaNode::Root { name } => name,
            TbaaNode::Scalar { name, .. } => name,
            TbaaNode::Struct { name, .. } => name,
        }
    }
}

/// Arena of TBAA nodes for one compilation unit
#[derive(Debug)]
pub struct TbaaTable {
    nodes: Vec<TbaaNode>,
}

impl TbaaTable {
    pub fn new() -> Self {
        Self {
            nodes: vec![TbaaNode::Root { name: "vela root".to_string() }],
        }
    }

    /// The unique root node
    pub fn root(&self) -> TbaaId {
        TbaaId(0)
    }

    pub fn scalar(&mut self, name: impl Into<String>, size_bits: u64, parent: TbaaId) -> TbaaId {
        self.push(TbaaNode::Scalar { name: name.into(), size_bits, parent })
    }

    pub fn struct_node(
        &mut self,
        name: impl Into<String>,
        size_bits: u64,
        fields: Vec<TbaaField>,
    ) -> TbaaId {
        self.push(TbaaNode::Struct { name: name.into(), size_bits, fields })
    }

    pub fn get(&self, id: TbaaId) -> &TbaaNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the root always exists
    }

    fn push(&mut self, node: TbaaNode) -> TbaaId {
        let id = TbaaId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

impl Default for TbaaTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_chain_to_root() {
        let mut table = TbaaTable::new();
        let root = table.root();
        let int8 = table.scalar("Small", 8, root);

        match table.get(int8) {
            TbaaNode::Scalar { name, size_bits, parent } => {
                assert_eq!(name, "Small");
                assert_eq!(*size_bits, 8);
                assert_eq!(*parent, root);
            }
            other => panic!("expected scalar node, got {:?}", other),
        }
    }

    #[test]
    fn test_struct_node_records_offsets() {
        let mut table = TbaaTable::new();
        let root = table.root();
        let a = table.scalar("A", 32, root);
        let b = table.scalar("B", 8, root);
        let rec = table.struct_node(
            "Pair",
            64,
            vec![
                TbaaField { offset_bits: 0, size_bits: 32, node: a },
                TbaaField { offset_bits: 32, size_bits: 8, node: b },
            ],
        );

        match table.get(rec) {
            TbaaNode::Struct { fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1].offset_bits, 32);
            }
            other => panic!("expected struct node, got {:?}", other),
        }
    }
}
