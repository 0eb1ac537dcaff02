//! The fixpoint pass manager.
//!
//! Sweeps every block, applying phi collapsing, unused-node removal, the
//! peephole kernels, and the propagation/pattern rewrites to each node in
//! order, then branch elimination to the block, until a complete sweep
//! changes nothing.
//!
//! Termination: every rewrite strictly decreases the number of live
//! local-variable definitions or the number of non-copy instructions, and
//! both are bounded below by zero; a sweep that decreases neither reports
//! no modification and ends the loop.

use sharc_ir::{FlowGraph, Op};
use tracing::debug;

use crate::config::ShaderStage;
use crate::{branch, derivatives, fold, frag_coord, pack, phi, simplify};

/// Runs local rewrites to fixpoint.
pub fn run_fixpoint(graph: &mut FlowGraph, stage: ShaderStage) {
    let mut sweeps = 0usize;
    loop {
        let mut modified = false;
        for block in graph.block_ids() {
            let snapshot: Vec<_> = graph.block(block).nodes().to_vec();
            for id in snapshot {
                // Earlier rewrites in this sweep may have removed the node.
                if !graph.contains_node(id) {
                    continue;
                }
                if graph.node(id).is_phi() {
                    if phi::try_collapse(graph, id) {
                        modified = true;
                        continue;
                    }
                    if graph.is_unused(id) {
                        graph.remove_node(id);
                        modified = true;
                    }
                    continue;
                }
                if graph.is_unused(id) {
                    graph.remove_node(id);
                    modified = true;
                    continue;
                }

                if fold::run(graph, id) {
                    modified = true;
                }
                if simplify::run(graph, id) {
                    modified = true;
                }

                let destination = graph.node(id).destinations().first().copied();
                let dest_is_local =
                    destination.is_some_and(|dest| graph.operand(dest).is_local());
                if !dest_is_local {
                    continue;
                }

                let inst = graph.operation(id).expect("phis were handled above").inst();
                match inst.op() {
                    Op::Copy => {
                        let dest = destination.expect("checked above");
                        let source = graph.node(id).sources()[0];
                        graph.replace_uses(dest, source);
                        graph.remove_node(id);
                        modified = true;
                    }
                    Op::PackHalf2x16 => {
                        if pack::propagate(graph, id) {
                            modified = true;
                        }
                    }
                    Op::ShuffleXor => {
                        if derivatives::recognize(graph, id) {
                            modified = true;
                        }
                    }
                    Op::Multiply if stage == ShaderStage::Fragment && inst.is_fp32() => {
                        if frag_coord::cancel(graph, id) {
                            modified = true;
                        }
                    }
                    _ => {}
                }
            }
            if branch::eliminate(graph, block) {
                modified = true;
            }
        }
        sweeps += 1;
        if !modified {
            break;
        }
    }
    debug!(sweeps, "optimization fixpoint reached");
    debug_assert_eq!(sharc_ir::verify::check(graph), Ok(()));
}
