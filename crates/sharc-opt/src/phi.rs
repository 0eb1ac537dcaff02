//! Phi collapsing.
//!
//! A phi whose incoming values are all same-valued selects nothing: every
//! consumer can read the common source directly and the phi disappears.
//! Same-valuedness is deliberately conservative: the literal same local,
//! constants with identical bits, or the same constant-buffer slot/offset.
//! Values produced by loads, atomics, or any other opaque definition never
//! unify, even when their defining expressions look alike.

use sharc_ir::{FlowGraph, NodeId, OperandId, OperandKind};

/// Collapses the phi if all incoming values are same-valued. Returns `true`
/// if the phi was removed.
pub fn try_collapse(graph: &mut FlowGraph, id: NodeId) -> bool {
    if !graph.node(id).is_phi() {
        return false;
    }
    let sources: Vec<OperandId> = graph.node(id).sources().to_vec();
    let dest = graph.node(id).destinations()[0];

    let first = sources[0];
    if first == dest {
        return false;
    }
    if !sources.iter().all(|&s| same_value(graph, first, s)) {
        return false;
    }

    graph.replace_uses(dest, first);
    graph.remove_node(id);
    true
}

/// Conservative operand equivalence: identity, equal constant bits, or the
/// identical constant-buffer slot/offset pair.
fn same_value(graph: &FlowGraph, a: OperandId, b: OperandId) -> bool {
    if a == b {
        return true;
    }
    let (oa, ob) = (graph.operand(a), graph.operand(b));
    match (oa.kind(), ob.kind()) {
        (OperandKind::Constant, OperandKind::Constant) => oa.value() == ob.value(),
        (OperandKind::ConstantBuffer, OperandKind::ConstantBuffer) => oa.value() == ob.value(),
        _ => false,
    }
}
