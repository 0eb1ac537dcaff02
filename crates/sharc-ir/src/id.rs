//! Stable ID newtypes for IR entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `NodeId` cannot be accidentally used where an `OperandId` is
//! expected. `BlockId` additionally bridges to petgraph's `NodeIndex<u32>`,
//! since basic blocks live as nodes of the control-flow graph.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable basic-block identifier. Maps to a petgraph `NodeIndex<u32>` in the
/// control-flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Stable IR node identifier. Indexes the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Stable operand identifier. Indexes the operand arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperandId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OperandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between BlockId and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for BlockId {
    fn from(idx: NodeIndex<u32>) -> Self {
        BlockId(idx.index() as u32)
    }
}

impl From<BlockId> for NodeIndex<u32> {
    fn from(id: BlockId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}
