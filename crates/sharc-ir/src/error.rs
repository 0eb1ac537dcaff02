//! Consistency-violation errors reported by the verifier.
//!
//! Uses `thiserror` for structured, matchable variants. These are never
//! recoverable conditions: a violation means a pass or an embedder broke
//! the def/use discipline, and callers are expected to assert on them.

use thiserror::Error;

use crate::id::{BlockId, NodeId, OperandId};

/// Def/use or structural inconsistencies in a [`crate::graph::FlowGraph`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IrError {
    /// A block lists a node whose arena slot is vacant.
    #[error("block {block} lists removed node {node}")]
    NodeMissing { block: BlockId, node: NodeId },

    /// A node's block back-reference disagrees with the block listing it.
    #[error("node {node} claims block {claimed} but is listed in {actual}")]
    BlockMismatch {
        node: NodeId,
        claimed: BlockId,
        actual: BlockId,
    },

    /// A live node exists in the arena but no block lists it.
    #[error("node {node} is alive but not in any block")]
    OrphanNode { node: NodeId },

    /// A local variable is read by a live node but has no defining node.
    #[error("local operand {operand} is used but never assigned")]
    UnassignedLocal { operand: OperandId },

    /// `assigned_by` names a node that is gone or does not write the operand.
    #[error("local operand {operand} has stale definition {node}")]
    StaleDef { operand: OperandId, node: NodeId },

    /// A node reads a local operand whose `used_by` set does not list it.
    #[error("node {node} reads {operand} without a use edge")]
    MissingUseEdge { node: NodeId, operand: OperandId },

    /// `used_by` lists a node that is gone or does not read the operand.
    #[error("local operand {operand} has stale use {node}")]
    StaleUse { operand: OperandId, node: NodeId },

    /// A node's local destination points at a different definition.
    #[error("node {node} writes {operand} but assigned_by disagrees")]
    WrongAssignedBy { node: NodeId, operand: OperandId },

    /// A phi's incoming-block list and source list differ in length.
    #[error("phi {node} has {blocks} incoming blocks but {sources} sources")]
    PhiArityMismatch {
        node: NodeId,
        blocks: usize,
        sources: usize,
    },
}
