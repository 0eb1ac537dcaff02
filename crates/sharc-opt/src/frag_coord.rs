//! Fragment-coordinate-W cancellation.
//!
//! Fragment shaders frequently contain `(x * fragCoord.w) * (1.0 /
//! fragCoord.w)`: the compiler injected a W multiply whose perspective
//! division immediately undoes it. The outer multiply collapses to a copy
//! of `x`; the inner multiply, the divide, and the coordinate loads lose
//! their consumers and die in later sweeps.

use sharc_ir::{FlowGraph, NodeId, Op, Operation, OperandId, OperandKind, FRAG_COORD_W};

const FP32_ONE: u32 = 0x3f80_0000;

/// Attempts the cancellation on an FP32 multiply. Returns `true` if the
/// node became a copy of the pre-projection value.
pub fn cancel(graph: &mut FlowGraph, id: NodeId) -> bool {
    let Some(operation) = graph.operation(id) else {
        return false;
    };
    if operation.inst().op() != Op::Multiply || !operation.inst().is_fp32() {
        return false;
    }
    let a = graph.node(id).sources()[0];
    let b = graph.node(id).sources()[1];

    // The multiply and the divide can appear in either order.
    for (mul, div) in [(a, b), (b, a)] {
        if let Some(x) = match_cancellation(graph, mul, div) {
            graph.turn_into_copy(id, x);
            return true;
        }
    }
    false
}

/// Matches `mul = x * fragCoord.w` against `div = 1.0 / fragCoord.w`,
/// returning `x` when both sides check out.
fn match_cancellation(graph: &FlowGraph, mul: OperandId, div: OperandId) -> Option<OperandId> {
    let mul_def = defining_operation(graph, mul)?;
    if mul_def.inst().op() != Op::Multiply || !mul_def.inst().is_fp32() {
        return None;
    }
    let (m0, m1) = two_sources(graph, mul)?;
    let x = if is_frag_coord_w(graph, m0) {
        m1
    } else if is_frag_coord_w(graph, m1) {
        m0
    } else {
        return None;
    };

    let div_def = defining_operation(graph, div)?;
    if div_def.inst().op() != Op::Divide || !div_def.inst().is_fp32() {
        return None;
    }
    let (d0, d1) = two_sources(graph, div)?;
    if !graph.operand(d0).is_constant_bits(FP32_ONE) || !is_frag_coord_w(graph, d1) {
        return None;
    }
    Some(x)
}

/// `true` when the operand is the result of a direct input-load of the
/// fragment coordinate's W component.
fn is_frag_coord_w(graph: &FlowGraph, operand: OperandId) -> bool {
    let Some(def) = graph.operand(operand).assigned_by() else {
        return false;
    };
    let Some(load) = graph.operation(def) else {
        return false;
    };
    if load.inst().op() != Op::LoadAttribute {
        return false;
    }
    let sources = graph.node(def).sources();
    if sources.len() != 1 {
        return false;
    }
    let attr = graph.operand(sources[0]);
    attr.kind() == OperandKind::Attribute && attr.value() == FRAG_COORD_W
}

fn defining_operation(graph: &FlowGraph, operand: OperandId) -> Option<&Operation> {
    let def = graph.operand(operand).assigned_by()?;
    graph.operation(def)
}

fn two_sources(graph: &FlowGraph, operand: OperandId) -> Option<(OperandId, OperandId)> {
    let def = graph.operand(operand).assigned_by()?;
    let sources = graph.node(def).sources();
    if sources.len() == 2 {
        Some((sources[0], sources[1]))
    } else {
        None
    }
}
