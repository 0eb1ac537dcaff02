//! Optimization driver for translated shader IR.
//!
//! [`optimize`] rewrites a block graph in place: a fixpoint sweep of local
//! rewrites (dead code, copies, phis, constant folding, algebraic and
//! GPU-specific patterns), one visit of the resource lowerings that turn
//! generic global-memory and bindless texture accesses into specialized
//! ones, and a second fixpoint sweep to clear whatever the lowerings left
//! dead. The accumulated buffer-use masks are published to the translator
//! configuration exactly once, between the lowerings and the final sweep.

pub mod bindless;
pub mod branch;
pub mod config;
pub mod derivatives;
pub mod driver;
pub mod fold;
pub mod frag_coord;
pub mod global_to_storage;
pub mod pack;
pub mod phi;
pub mod simplify;

// Re-export the embedding surface
pub use config::{ShaderStage, TranslatorConfig};
pub use driver::run_fixpoint;

use sharc_ir::FlowGraph;
use tracing::debug;

/// Optimizes the block graph in place.
///
/// Preconditions: coherent def/use lists, at most one assignment per local
/// variable, one phi source per predecessor. Postconditions: def/use lists
/// coherent, no unused local definitions remain, and `config` has received
/// the storage-buffer and bindless-elimination use masks exactly once.
pub fn optimize<C: TranslatorConfig + ?Sized>(graph: &mut FlowGraph, config: &mut C) {
    let stage = config.stage();
    driver::run_fixpoint(graph, stage);

    let mut sb_mask = 0u32;
    let mut ube_mask = 0u32;
    for block in graph.block_ids() {
        global_to_storage::run_block(graph, &*config, block, &mut sb_mask);
        bindless::to_indexed_block(graph, &*config, block);
        bindless::eliminate_block(graph, &*config, block, &mut ube_mask);
    }
    debug!(sb_mask, ube_mask, "publishing accessible buffer masks");
    config.set_accessible_buffer_masks(sb_mask, ube_mask);

    driver::run_fixpoint(graph, stage);
}
