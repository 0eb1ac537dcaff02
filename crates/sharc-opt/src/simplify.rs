//! Algebraic simplification.
//!
//! Identity rewrites that replace an operation with a `Copy` of one of its
//! operands (or a fresh constant). Integer identities only fire on integer
//! tags; for FP32 the sole permitted identity is multiplication by literal
//! 1.0, which cannot change NaN, rounding, or signed-zero behavior. `x + 0`
//! and `x * 0` are not FP identities (`-0 + 0` and NaN propagation would
//! change observably) and stay untouched.

use sharc_ir::{FlowGraph, NodeId, Op, OperandId, FALSE_BITS, TRUE_BITS};

const FP32_ONE: u32 = 0x3f80_0000;

/// Attempts one identity rewrite. Returns `true` if the node was rewritten.
pub fn run(graph: &mut FlowGraph, id: NodeId) -> bool {
    let Some(operation) = graph.operation(id) else {
        return false;
    };
    let inst = operation.inst();
    let sources: Vec<OperandId> = graph.node(id).sources().to_vec();

    let is_const = |graph: &FlowGraph, s: OperandId, bits: u32| graph.operand(s).is_constant_bits(bits);

    let replacement: Option<OperandId> = match inst.op() {
        Op::Add if !inst.is_fp() => match_either(graph, &sources, 0, |other| other),
        Op::Subtract if !inst.is_fp() && is_const(graph, sources[1], 0) => Some(sources[0]),

        Op::Multiply if inst.is_fp32() => match_either_bits(graph, &sources, FP32_ONE),
        Op::Multiply if !inst.is_fp() => {
            if let Some(other) = match_either(graph, &sources, 1, |other| other) {
                Some(other)
            } else if is_const(graph, sources[0], 0) {
                Some(sources[0])
            } else if is_const(graph, sources[1], 0) {
                Some(sources[1])
            } else {
                None
            }
        }

        Op::BitwiseAnd => {
            if sources[0] == sources[1] {
                Some(sources[0])
            } else if is_const(graph, sources[0], 0) {
                Some(sources[0])
            } else if is_const(graph, sources[1], 0) {
                Some(sources[1])
            } else {
                match_either_bits(graph, &sources, u32::MAX)
            }
        }
        Op::BitwiseOr => {
            if sources[0] == sources[1] {
                Some(sources[0])
            } else if is_const(graph, sources[0], u32::MAX) {
                Some(sources[0])
            } else if is_const(graph, sources[1], u32::MAX) {
                Some(sources[1])
            } else {
                match_either(graph, &sources, 0, |other| other)
            }
        }
        Op::BitwiseExclusiveOr => {
            if sources[0] == sources[1] {
                let zero = graph.constant(0);
                Some(zero)
            } else {
                match_either(graph, &sources, 0, |other| other)
            }
        }

        Op::ShiftLeft | Op::ShiftRightS32 | Op::ShiftRightU32 => {
            if is_const(graph, sources[1], 0) || is_const(graph, sources[0], 0) {
                Some(sources[0])
            } else {
                None
            }
        }

        Op::ConditionalSelect => {
            let cond = graph.operand(sources[0]);
            if cond.is_constant() {
                Some(if cond.value() != 0 { sources[1] } else { sources[2] })
            } else if sources[1] == sources[2] {
                Some(sources[1])
            } else {
                None
            }
        }

        // Unsigned boundary comparisons: nothing is below zero.
        Op::CompareLessU32 if is_const(graph, sources[1], 0) => {
            Some(graph.constant(FALSE_BITS))
        }
        Op::CompareGreaterOrEqualU32 if is_const(graph, sources[1], 0) => {
            Some(graph.constant(TRUE_BITS))
        }
        Op::CompareGreaterU32 if is_const(graph, sources[0], 0) => {
            Some(graph.constant(FALSE_BITS))
        }
        Op::CompareLessOrEqualU32 if is_const(graph, sources[0], 0) => {
            Some(graph.constant(TRUE_BITS))
        }

        _ => None,
    };

    match replacement {
        Some(operand) => {
            graph.turn_into_copy(id, operand);
            true
        }
        None => false,
    }
}

/// For a commutative op, returns the non-constant side when the other side
/// is the given constant (`x op K -> f(x)`).
fn match_either(
    graph: &FlowGraph,
    sources: &[OperandId],
    bits: u32,
    pick: impl Fn(OperandId) -> OperandId,
) -> Option<OperandId> {
    if graph.operand(sources[0]).is_constant_bits(bits) {
        Some(pick(sources[1]))
    } else if graph.operand(sources[1]).is_constant_bits(bits) {
        Some(pick(sources[0]))
    } else {
        None
    }
}

fn match_either_bits(graph: &FlowGraph, sources: &[OperandId], bits: u32) -> Option<OperandId> {
    match_either(graph, sources, bits, |other| other)
}
