//! Bindless texture lowering.
//!
//! Two one-shot rewrites over texture accesses whose descriptor arrives as
//! a runtime handle:
//!
//! - **Indexed conversion**: a handle formed as `base | index` with a
//!   constant base and a uniform array index becomes an access into a fixed
//!   binding table, keeping the index as an operand.
//! - **Elimination**: a handle loaded straight out of a constant buffer is
//!   replaced by the descriptor binding the translator resolves for that
//!   slot/offset, and the binding's bit is recorded in the bindless-
//!   elimination use mask.
//!
//! Both rewrites are purely local to one operation; unknown handles leave
//! the access bindless for the backend to reject.

use sharc_ir::{FlowGraph, NodeId, Op, OperandId, OperandKind, TypeFlags};
use tracing::trace;

use crate::config::TranslatorConfig;

/// Converts uniformly indexed bindless accesses in one block.
pub fn to_indexed_block<C: TranslatorConfig + ?Sized>(
    graph: &mut FlowGraph,
    config: &C,
    block: sharc_ir::BlockId,
) {
    for id in bindless_textures(graph, block) {
        let handle = graph.node(id).sources()[0];
        let Some((base, index)) = or_with_constant(graph, handle) else {
            continue;
        };
        let Some(binding) = config.texture_array_binding(base) else {
            continue;
        };
        trace!(binding, "converted bindless texture access to indexed");

        let inst = graph
            .operation(id)
            .expect("bindless_textures yields operations")
            .inst()
            .without_flags(TypeFlags::BINDLESS)
            .with_flags(TypeFlags::INDEXED);
        let binding_const = graph.constant(binding);
        let mut sources = vec![binding_const, index];
        sources.extend_from_slice(&graph.node(id).sources()[1..]);
        graph.turn_into(id, inst, &sources);
    }
}

/// Eliminates constant-buffer-loaded bindless handles in one block.
pub fn eliminate_block<C: TranslatorConfig + ?Sized>(
    graph: &mut FlowGraph,
    config: &C,
    block: sharc_ir::BlockId,
    ube_mask: &mut u32,
) {
    for id in bindless_textures(graph, block) {
        let handle = graph.node(id).sources()[0];
        let Some((slot, offset)) = cbuf_load(graph, handle) else {
            continue;
        };
        let Some(binding) = config.bindless_texture_binding(slot, offset) else {
            continue;
        };
        debug_assert!(binding < 32, "texture binding exceeds mask width");
        *ube_mask |= 1 << binding;
        trace!(binding, "eliminated bindless texture handle");

        let inst = graph
            .operation(id)
            .expect("bindless_textures yields operations")
            .inst()
            .without_flags(TypeFlags::BINDLESS);
        let binding_const = graph.constant(binding);
        let mut sources = vec![binding_const];
        sources.extend_from_slice(&graph.node(id).sources()[1..]);
        graph.turn_into(id, inst, &sources);
    }
}

/// Live bindless texture-sample nodes of a block.
fn bindless_textures(graph: &FlowGraph, block: sharc_ir::BlockId) -> Vec<NodeId> {
    graph
        .block(block)
        .nodes()
        .iter()
        .copied()
        .filter(|&id| {
            graph.operation(id).is_some_and(|op| {
                op.inst().op() == Op::TextureSample
                    && op.inst().flags().contains(TypeFlags::BINDLESS)
            })
        })
        .collect()
}

/// Matches a handle defined as `BitwiseOr` of a constant base and a
/// dynamic index, in either operand order.
fn or_with_constant(graph: &FlowGraph, handle: OperandId) -> Option<(u32, OperandId)> {
    let def = graph.operand(handle).assigned_by()?;
    let operation = graph.operation(def)?;
    if operation.inst().op() != Op::BitwiseOr {
        return None;
    }
    let sources = graph.node(def).sources();
    let (s0, s1) = (sources[0], sources[1]);
    if graph.operand(s0).is_constant() && !graph.operand(s1).is_constant() {
        Some((graph.operand(s0).value(), s1))
    } else if graph.operand(s1).is_constant() && !graph.operand(s0).is_constant() {
        Some((graph.operand(s1).value(), s0))
    } else {
        None
    }
}

/// Matches a handle loaded from a constant buffer, returning slot/offset.
fn cbuf_load(graph: &FlowGraph, handle: OperandId) -> Option<(u32, u32)> {
    let def = graph.operand(handle).assigned_by()?;
    let operation = graph.operation(def)?;
    if operation.inst().op() != Op::LoadConstant {
        return None;
    }
    let source = graph.node(def).sources()[0];
    let cbuf = graph.operand(source);
    if cbuf.kind() != OperandKind::ConstantBuffer {
        return None;
    }
    Some((cbuf.cbuf_slot(), cbuf.cbuf_offset()))
}
