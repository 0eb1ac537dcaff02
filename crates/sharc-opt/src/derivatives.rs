//! Derivative recognition from subgroup shuffles.
//!
//! The source ISA computes screen-space derivatives with a quad shuffle:
//! `ShuffleXor` against lane mask 1 (horizontal) or 2 (vertical) with the
//! full-quad clamp mask, followed by a `SwizzleAdd` that subtracts the
//! original value in the appropriate lanes. The pair is recognized here and
//! rewritten to a plain `Ddx`/`Ddy` of the original value, leaving the
//! shuffle to die once its last consumer is gone.

use sharc_ir::{FlowGraph, Inst, NodeId, Op, TypeFlags};

/// Full-quad clamp mask carried by derivative shuffles.
///
/// The swizzle patterns encode the per-lane negate selection for the
/// horizontal and vertical difference. All three constants mirror the
/// shuffle idiom emitted by the source ISA; revalidate here against ISA
/// documentation if the pattern ever fails to match.
const DERIV_CLAMP_MASK: u32 = 0x1c03;
const DDX_LANE_MASK: u32 = 1;
const DDY_LANE_MASK: u32 = 2;
const DDX_SWIZZLE: u32 = 0b1001_1001;
const DDY_SWIZZLE: u32 = 0b1010_0101;

/// Rewrites matching `SwizzleAdd` consumers of the shuffle into derivatives.
/// Removes the shuffle if no consumers remain. Returns `true` on any change.
pub fn recognize(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    if node.sources_count() != 3 {
        return false;
    }
    let value = node.sources()[0];
    let lane_mask = node.sources()[1];
    let clamp_mask = node.sources()[2];
    let dest = node.destinations()[0];

    let (deriv_op, swizzle) = if graph.operand(lane_mask).is_constant_bits(DDX_LANE_MASK) {
        (Op::Ddx, DDX_SWIZZLE)
    } else if graph.operand(lane_mask).is_constant_bits(DDY_LANE_MASK) {
        (Op::Ddy, DDY_SWIZZLE)
    } else {
        return false;
    };
    if !graph.operand(clamp_mask).is_constant_bits(DERIV_CLAMP_MASK) {
        return false;
    }

    let consumers: Vec<NodeId> = graph.operand(dest).used_by().iter().copied().collect();
    let mut modified = false;
    for consumer in consumers {
        let Some(operation) = graph.operation(consumer) else {
            continue;
        };
        if operation.inst().op() != Op::SwizzleAdd {
            continue;
        }
        let sources = graph.node(consumer).sources();
        if sources.len() != 3 || sources[0] != dest || sources[1] != value {
            continue;
        }
        if !graph.operand(sources[2]).is_constant_bits(swizzle) {
            continue;
        }
        graph.turn_into(consumer, Inst::new(deriv_op, TypeFlags::FP32), &[value]);
        modified = true;
    }

    if graph.operand(dest).used_by().is_empty() {
        graph.remove_node(id);
        modified = true;
    }
    modified
}
