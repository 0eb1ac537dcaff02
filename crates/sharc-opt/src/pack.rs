//! Half-float pack propagation.
//!
//! `PackHalf2x16 d <- (s0, s1)` followed by `UnpackHalf2x16` of `d` cancels:
//! the unpack's lane index selects `s0` or `s1` directly. Consumers that are
//! not unpacks keep the packed value, and the pack survives until every
//! consumer has been rewritten away.

use sharc_ir::{FlowGraph, NodeId, Op};

/// Rewrites unpack consumers of the pack's destination into copies of the
/// corresponding pack source. Removes the pack if no consumers remain.
/// Returns `true` on any rewrite or removal.
pub fn propagate(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    debug_assert_eq!(node.sources_count(), 2);
    let dest = node.destinations()[0];
    let lanes = [node.sources()[0], node.sources()[1]];

    let consumers: Vec<NodeId> = graph.operand(dest).used_by().iter().copied().collect();
    let mut modified = false;
    for consumer in consumers {
        let Some(operation) = graph.operation(consumer) else {
            continue;
        };
        if operation.inst().op() != Op::UnpackHalf2x16 {
            continue;
        }
        let lane = usize::from(operation.index());
        debug_assert!(lane < 2, "unpack lane out of range");
        if graph.node(consumer).sources()[0] != dest {
            continue;
        }
        graph.turn_into_copy(consumer, lanes[lane]);
        modified = true;
    }

    if graph.operand(dest).used_by().is_empty() {
        graph.remove_node(id);
        modified = true;
    }
    modified
}
