//! Structural and def/use consistency checking.
//!
//! [`check`] validates the universal invariants the optimizer relies on:
//! every local read by a live node has a live definition that lists it as a
//! destination, `used_by` sets mirror the source lists exactly, and block
//! membership agrees in both directions. The optimizer runs this under
//! `debug_assert!` after each phase; embedders can call it directly on IR
//! they construct.

use indexmap::IndexSet;

use crate::error::IrError;
use crate::graph::FlowGraph;
use crate::id::{NodeId, OperandId};
use crate::node::Node;

/// Checks all consistency invariants, returning the first violation found.
pub fn check(graph: &FlowGraph) -> Result<(), IrError> {
    let mut listed: IndexSet<NodeId> = IndexSet::new();

    // Block listings agree with node back-references.
    for block_id in graph.block_ids() {
        for &node_id in graph.block(block_id).nodes() {
            if !graph.contains_node(node_id) {
                return Err(IrError::NodeMissing {
                    block: block_id,
                    node: node_id,
                });
            }
            let claimed = graph.node(node_id).block();
            if claimed != block_id {
                return Err(IrError::BlockMismatch {
                    node: node_id,
                    claimed,
                    actual: block_id,
                });
            }
            listed.insert(node_id);
        }
    }

    // Every live arena node is listed by some block.
    for (index, slot) in graph.nodes.iter().enumerate() {
        let node_id = NodeId(index as u32);
        if slot.is_some() && !listed.contains(&node_id) {
            return Err(IrError::OrphanNode { node: node_id });
        }
    }

    // Source and destination edges mirror the operand bookkeeping.
    for &node_id in &listed {
        let node = graph.node(node_id);
        if let Node::Phi(phi) = node {
            if phi.blocks.len() != phi.sources.len() {
                return Err(IrError::PhiArityMismatch {
                    node: node_id,
                    blocks: phi.blocks.len(),
                    sources: phi.sources.len(),
                });
            }
        }
        for &source in node.sources() {
            let operand = graph.operand(source);
            if !operand.is_local() {
                continue;
            }
            if operand.assigned_by().is_none() {
                return Err(IrError::UnassignedLocal { operand: source });
            }
            if !operand.used_by().contains(&node_id) {
                return Err(IrError::MissingUseEdge {
                    node: node_id,
                    operand: source,
                });
            }
        }
        for &dest in node.destinations() {
            let operand = graph.operand(dest);
            if operand.is_local() && operand.assigned_by() != Some(node_id) {
                return Err(IrError::WrongAssignedBy {
                    node: node_id,
                    operand: dest,
                });
            }
        }
    }

    // Operand back-references point at live nodes with matching edges.
    for (index, operand) in graph.operands.iter().enumerate() {
        let operand_id = OperandId(index as u32);
        if !operand.is_local() {
            continue;
        }
        if let Some(def) = operand.assigned_by() {
            if !graph.contains_node(def) || !graph.node(def).destinations().contains(&operand_id) {
                return Err(IrError::StaleDef {
                    operand: operand_id,
                    node: def,
                });
            }
        }
        for &user in operand.used_by() {
            if !graph.contains_node(user) || !graph.node(user).sources().contains(&operand_id) {
                return Err(IrError::StaleUse {
                    operand: operand_id,
                    node: user,
                });
            }
        }
    }

    Ok(())
}
