//! Global-memory to storage-buffer lowering.
//!
//! Generic global loads and stores address raw memory through a 32-bit
//! base held in a constant buffer. When forward-slicing the address --
//! peeling constant additions and multiplications, then looking for a
//! `LoadConstant` base the translator can attribute to a storage buffer --
//! succeeds, the access is rewritten to a typed storage-buffer access and
//! the buffer's bit is set in the storage-buffer use mask. Unknown bases
//! leave the node unchanged.
//!
//! Runs exactly once per block, between the two fixpoint sweeps. The dead
//! address arithmetic left behind is cleaned up by the second sweep.

use sharc_ir::{FlowGraph, Inst, NodeId, Op, OperandId, OperandKind};
use tracing::trace;

use crate::config::TranslatorConfig;

/// Visits one block, rewriting provable global accesses.
pub fn run_block<C: TranslatorConfig + ?Sized>(
    graph: &mut FlowGraph,
    config: &C,
    block: sharc_ir::BlockId,
    sb_mask: &mut u32,
) {
    let snapshot: Vec<NodeId> = graph.block(block).nodes().to_vec();
    for id in snapshot {
        if !graph.contains_node(id) {
            continue;
        }
        let Some(operation) = graph.operation(id) else {
            continue;
        };
        let (storage_op, is_load) = match operation.inst().op() {
            Op::LoadGlobal => (Op::LoadStorage, true),
            Op::StoreGlobal => (Op::StoreStorage, false),
            _ => continue,
        };
        let flags = operation.inst().flags();
        let address = graph.node(id).sources()[0];

        let Some((binding, offset)) = resolve_address(graph, config, address) else {
            continue;
        };
        debug_assert!(binding < 32, "storage binding exceeds mask width");
        *sb_mask |= 1 << binding;
        trace!(binding, load = is_load, "lowered global access to storage buffer");

        let binding_const = graph.constant(binding);
        let mut sources = vec![binding_const, offset];
        sources.extend_from_slice(&graph.node(id).sources()[1..]);
        graph.turn_into(id, Inst::new(storage_op, flags), &sources);
    }
}

/// Slices the address expression down to a storage-buffer base plus offset.
///
/// Peels `Add` and `Multiply` operations with one constant source,
/// maintaining `address = scale * cursor + delta` throughout the walk:
/// an addition folds its constant into `delta` (scaled), a multiplication
/// folds its constant into `scale`. The walk ends at either a
/// `LoadConstant` base (offset is the accumulated delta; a scaled pointer
/// is not a buffer base, so `scale` must have collapsed back to 1) or an
/// `Add` of a base and a dynamic index (offset is the dynamic side; only
/// valid when nothing was peeled, since the optimizer does not allocate
/// new arithmetic nodes to recombine it with a delta).
fn resolve_address<C: TranslatorConfig + ?Sized>(
    graph: &mut FlowGraph,
    config: &C,
    address: OperandId,
) -> Option<(u32, OperandId)> {
    let mut cursor = address;
    let mut delta: u32 = 0;
    let mut scale: u32 = 1;
    loop {
        if let Some((s0, s1)) = integer_binary_sources(graph, cursor, Op::Add) {
            if graph.operand(s1).is_constant() {
                delta = delta.wrapping_add(graph.operand(s1).value().wrapping_mul(scale));
                cursor = s0;
                continue;
            }
            if graph.operand(s0).is_constant() {
                delta = delta.wrapping_add(graph.operand(s0).value().wrapping_mul(scale));
                cursor = s1;
                continue;
            }
            break;
        }
        if let Some((s0, s1)) = integer_binary_sources(graph, cursor, Op::Multiply) {
            if graph.operand(s1).is_constant() {
                scale = scale.wrapping_mul(graph.operand(s1).value());
                cursor = s0;
                continue;
            }
            if graph.operand(s0).is_constant() {
                scale = scale.wrapping_mul(graph.operand(s0).value());
                cursor = s1;
                continue;
            }
            break;
        }
        break;
    }

    if scale == 1 {
        if let Some(binding) = storage_base(graph, config, cursor) {
            let offset = graph.constant(delta);
            return Some((binding, offset));
        }
    }

    if scale == 1 && delta == 0 {
        if let Some((s0, s1)) = integer_binary_sources(graph, cursor, Op::Add) {
            if let Some(binding) = storage_base(graph, config, s0) {
                return Some((binding, s1));
            }
            if let Some(binding) = storage_base(graph, config, s1) {
                return Some((binding, s0));
            }
        }
    }
    None
}

/// The sources of the integer operation with the given opcode defining
/// `operand`, if that is what defines it.
fn integer_binary_sources(
    graph: &FlowGraph,
    operand: OperandId,
    op: Op,
) -> Option<(OperandId, OperandId)> {
    let def = graph.operand(operand).assigned_by()?;
    let operation = graph.operation(def)?;
    if operation.inst().op() != op || operation.inst().is_fp() {
        return None;
    }
    let sources = graph.node(def).sources();
    Some((sources[0], sources[1]))
}

/// Resolves a `LoadConstant`-defined operand to a storage-buffer binding
/// through the translator configuration.
fn storage_base<C: TranslatorConfig + ?Sized>(
    graph: &FlowGraph,
    config: &C,
    operand: OperandId,
) -> Option<u32> {
    let def = graph.operand(operand).assigned_by()?;
    let operation = graph.operation(def)?;
    if operation.inst().op() != Op::LoadConstant {
        return None;
    }
    let source = graph.node(def).sources()[0];
    let cbuf = graph.operand(source);
    if cbuf.kind() != OperandKind::ConstantBuffer {
        return None;
    }
    config.storage_buffer_binding(cbuf.cbuf_slot(), cbuf.cbuf_offset())
}
