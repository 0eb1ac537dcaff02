//! Basic blocks and control-flow edge labels.
//!
//! A block is an ordered node list: phis first, then operations, then an
//! optional terminating branch. Predecessor/successor structure lives on
//! the petgraph CFG owned by [`crate::graph::FlowGraph`]; the edge labels
//! here distinguish fallthrough order from taken branches.

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, NodeId};

/// Control-flow edge label between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgEdge {
    /// Execution continues into the successor when no branch is taken.
    Fallthrough,
    /// The successor is reached by a (conditional or unconditional) branch.
    Taken,
}

/// An ordered list of nodes with a stable identity in the CFG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub(crate) id: BlockId,
    pub(crate) nodes: Vec<NodeId>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId) -> Self {
        BasicBlock { id, nodes: Vec::new() }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    /// The nodes of this block in execution order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The last node, which is the terminator candidate.
    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Position after the trailing run of phis, i.e. where the first
    /// non-phi node sits. Used to keep phis at the block head on insert.
    pub(crate) fn phi_end(&self, is_phi: impl Fn(NodeId) -> bool) -> usize {
        self.nodes.iter().take_while(|&&id| is_phi(id)).count()
    }
}
