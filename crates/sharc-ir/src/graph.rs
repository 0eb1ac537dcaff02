//! FlowGraph: the block graph container and its mutation discipline.
//!
//! [`FlowGraph`] owns three stores: a petgraph `StableGraph` whose nodes are
//! basic blocks and whose edges are control-flow labels, a node arena, and
//! an operand arena. Stable indices survive removal, so `BlockId`, `NodeId`
//! and `OperandId` stay valid for the lifetime of the graph.
//!
//! All mutation goes through `FlowGraph` methods. The def/use mirrors on
//! local-variable operands (`assigned_by`/`used_by`) are maintained here and
//! nowhere else; passes rewrite nodes exclusively through [`set_source`],
//! [`replace_uses`], the two rewrite verbs [`turn_into`] /
//! [`turn_into_copy`], and [`remove_node`] with its cascade worklist.
//!
//! Malformed access (a vacant node slot, an out-of-range operand) is a
//! programmer error and panics; there are no recoverable error paths at
//! this layer.
//!
//! [`set_source`]: FlowGraph::set_source
//! [`replace_uses`]: FlowGraph::replace_uses
//! [`turn_into`]: FlowGraph::turn_into
//! [`turn_into_copy`]: FlowGraph::turn_into_copy
//! [`remove_node`]: FlowGraph::remove_node

use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::Directed;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::block::{BasicBlock, CfgEdge};
use crate::id::{BlockId, NodeId, OperandId};
use crate::inst::{Inst, Op};
use crate::node::{DestList, Node, Operation, Phi, SourceList};
use crate::operand::Operand;

/// The block graph plus node and operand arenas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    pub(crate) cfg: StableGraph<BasicBlock, CfgEdge, Directed, u32>,
    /// Node arena. Removed nodes leave a vacant slot so ids stay stable.
    pub(crate) nodes: Vec<Option<Node>>,
    /// Operand arena. Operands are never removed, only unreferenced.
    pub(crate) operands: Vec<Operand>,
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowGraph {
    pub fn new() -> Self {
        FlowGraph {
            cfg: StableGraph::new(),
            nodes: Vec::new(),
            operands: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Blocks and control-flow edges
    // -----------------------------------------------------------------------

    /// Appends an empty block and returns its id.
    pub fn add_block(&mut self) -> BlockId {
        let idx = self.cfg.add_node(BasicBlock::new(BlockId(0)));
        let id = BlockId::from(idx);
        self.cfg[idx].id = id;
        id
    }

    /// Connects two blocks with the given edge label.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: CfgEdge) {
        self.cfg.add_edge(from.into(), to.into(), kind);
    }

    /// Removes the edge between two blocks. Returns `true` if one existed.
    pub fn remove_edge(&mut self, from: BlockId, to: BlockId) -> bool {
        match self.cfg.find_edge(from.into(), to.into()) {
            Some(edge) => {
                self.cfg.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// All block ids in creation order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.cfg.node_indices().map(BlockId::from).collect()
    }

    pub fn block_count(&self) -> usize {
        self.cfg.node_count()
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.cfg
            .node_weight(id.into())
            .unwrap_or_else(|| panic!("block {id} not in graph"))
    }

    fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.cfg
            .node_weight_mut(id.into())
            .unwrap_or_else(|| panic!("block {id} not in graph"))
    }

    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        self.cfg
            .neighbors_directed(id.into(), petgraph::Direction::Outgoing)
            .map(BlockId::from)
            .collect()
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.cfg
            .neighbors_directed(id.into(), petgraph::Direction::Incoming)
            .map(BlockId::from)
            .collect()
    }

    /// The successor reached over an edge with the given label, if any.
    pub fn successor_by_kind(&self, id: BlockId, kind: CfgEdge) -> Option<BlockId> {
        let from: NodeIndex<u32> = id.into();
        self.cfg
            .edges(from)
            .find(|e| *e.weight() == kind)
            .map(|e| BlockId::from(e.target()))
    }

    /// Removes the edge with the given label between two blocks. Two blocks
    /// may be connected both by a taken branch and by fallthrough order, so
    /// pruning one of them must name the label.
    pub fn remove_edge_by_kind(&mut self, from: BlockId, to: BlockId, kind: CfgEdge) -> bool {
        let target: NodeIndex<u32> = to.into();
        let found = self
            .cfg
            .edges(from.into())
            .find(|e| e.target() == target && *e.weight() == kind)
            .map(|e| e.id());
        match found {
            Some(edge) => {
                self.cfg.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// The block's trailing branch node, if its last node is a branch.
    pub fn terminator(&self, id: BlockId) -> Option<NodeId> {
        let last = self.block(id).last_node()?;
        match self.node(last) {
            Node::Operation(op) if op.inst.is_terminator() => Some(last),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Operand builders
    // -----------------------------------------------------------------------

    fn push_operand(&mut self, operand: Operand) -> OperandId {
        let id = OperandId(self.operands.len() as u32);
        self.operands.push(operand);
        id
    }

    /// A fresh SSA-like local variable.
    pub fn local(&mut self) -> OperandId {
        let register = self.operands.len() as u32;
        self.push_operand(Operand::local(register))
    }

    /// A 32-bit constant with the given bit pattern.
    pub fn constant(&mut self, bits: u32) -> OperandId {
        self.push_operand(Operand::constant(bits))
    }

    /// An FP32 constant.
    pub fn constant_f32(&mut self, value: f32) -> OperandId {
        self.constant(value.to_bits())
    }

    /// A constant-buffer slot/offset reference.
    pub fn cbuf(&mut self, slot: u16, offset: u16) -> OperandId {
        self.push_operand(Operand::constant_buffer(slot, offset))
    }

    /// A shader input attribute at the given byte offset.
    pub fn attribute(&mut self, offset: u32) -> OperandId {
        self.push_operand(Operand::attribute(offset))
    }

    pub fn argument(&mut self, index: u32) -> OperandId {
        self.push_operand(Operand::argument(index))
    }

    /// A branch label naming a block.
    pub fn label(&mut self, target: BlockId) -> OperandId {
        self.push_operand(Operand::label(target))
    }

    pub fn undefined(&mut self) -> OperandId {
        self.push_operand(Operand::undefined())
    }

    pub fn operand(&self, id: OperandId) -> &Operand {
        &self.operands[id.0 as usize]
    }

    fn operand_mut(&mut self, id: OperandId) -> &mut Operand {
        &mut self.operands[id.0 as usize]
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    // -----------------------------------------------------------------------
    // Node builders
    // -----------------------------------------------------------------------

    /// Appends an operation to a block, wiring def/use bookkeeping.
    ///
    /// A local destination must not already be assigned (one assignment per
    /// local variable).
    pub fn add_op(
        &mut self,
        block: BlockId,
        inst: impl Into<Inst>,
        dest: Option<OperandId>,
        sources: &[OperandId],
    ) -> NodeId {
        self.add_op_indexed(block, inst, 0, dest, sources)
    }

    /// Like [`add_op`](Self::add_op) with an auxiliary lane/component index.
    pub fn add_op_indexed(
        &mut self,
        block: BlockId,
        inst: impl Into<Inst>,
        index: u8,
        dest: Option<OperandId>,
        sources: &[OperandId],
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let destinations: DestList = dest.into_iter().collect();
        let node = Node::Operation(Operation {
            inst: inst.into(),
            index,
            block,
            sources: SourceList::from_slice(sources),
            destinations,
        });
        self.nodes.push(Some(node));
        self.block_mut(block).nodes.push(id);
        self.link_node(id);
        id
    }

    /// Inserts a phi at the block head (after any existing phis).
    pub fn add_phi(
        &mut self,
        block: BlockId,
        dest: OperandId,
        incoming: &[(BlockId, OperandId)],
    ) -> NodeId {
        assert!(!incoming.is_empty(), "phi must have at least one incoming value");
        let id = NodeId(self.nodes.len() as u32);
        let node = Node::Phi(Phi {
            block,
            blocks: incoming.iter().map(|&(b, _)| b).collect(),
            sources: incoming.iter().map(|&(_, s)| s).collect(),
            destinations: std::iter::once(dest).collect(),
        });
        self.nodes.push(Some(node));
        let pos = self.block(block).phi_end(|n| self.node(n).is_phi());
        self.block_mut(block).nodes.insert(pos, id);
        self.link_node(id);
        id
    }

    /// Wires `assigned_by`/`used_by` for a freshly inserted node.
    fn link_node(&mut self, id: NodeId) {
        let (sources, destinations): (SourceList, DestList) = {
            let node = self.node(id);
            (
                node.sources().iter().copied().collect(),
                node.destinations().iter().copied().collect(),
            )
        };
        for dest in destinations {
            let operand = self.operand_mut(dest);
            if operand.is_local() {
                assert!(
                    operand.assigned_by.is_none(),
                    "local operand {dest} assigned twice"
                );
                operand.assigned_by = Some(id);
            }
        }
        for source in sources {
            self.link_use(id, source);
        }
    }

    // -----------------------------------------------------------------------
    // Node accessors
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0 as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("node {id} accessed after removal"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0 as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("node {id} accessed after removal"))
    }

    /// `true` while the node has not been removed.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0 as usize)
            .is_some_and(|slot| slot.is_some())
    }

    /// The node as an operation, or `None` for phis.
    pub fn operation(&self, id: NodeId) -> Option<&Operation> {
        self.node(id).as_operation()
    }

    /// Count of live (non-removed) nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    // -----------------------------------------------------------------------
    // Mutation helpers: the only way passes may rewrite dataflow edges
    // -----------------------------------------------------------------------

    fn link_use(&mut self, node: NodeId, operand: OperandId) {
        let op = self.operand_mut(operand);
        if op.is_local() {
            op.used_by.insert(node);
        }
    }

    /// Drops `node` from `operand.used_by` unless another source slot of the
    /// node still references it.
    fn unlink_use(&mut self, node: NodeId, operand: OperandId) {
        if !self.operand(operand).is_local() {
            return;
        }
        if self.contains_node(node) && self.node(node).sources().contains(&operand) {
            return;
        }
        self.operand_mut(operand).used_by.shift_remove(&node);
    }

    /// Replaces the `index`-th source of `node`, keeping use sets coherent.
    pub fn set_source(&mut self, node: NodeId, index: usize, new: OperandId) {
        let old = self.node(node).sources()[index];
        if old == new {
            return;
        }
        self.node_mut(node).sources_mut()[index] = new;
        self.unlink_use(node, old);
        self.link_use(node, new);
    }

    /// Rewrites every consumer of `old` to read `new` instead.
    pub fn replace_uses(&mut self, old: OperandId, new: OperandId) {
        if old == new {
            return;
        }
        let users: Vec<NodeId> = self.operand(old).used_by.iter().copied().collect();
        for user in users {
            for slot in self.node_mut(user).sources_mut().iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            self.link_use(user, new);
        }
        self.operand_mut(old).used_by.clear();
    }

    /// Rewrites an operation in place: new tag, new source list. Destinations
    /// and block position are preserved; use sets are adjusted on both the
    /// removed and the added sources.
    pub fn turn_into(&mut self, id: NodeId, inst: Inst, sources: &[OperandId]) {
        let old_sources: SourceList = {
            let node = self.node_mut(id);
            let Node::Operation(op) = node else {
                panic!("turn_into applied to a phi node")
            };
            let old = op.sources.clone();
            op.inst = inst;
            op.sources = SourceList::from_slice(sources);
            old
        };
        for old in old_sources {
            self.unlink_use(id, old);
        }
        for &source in sources {
            self.link_use(id, source);
        }
    }

    /// Rewrites an operation into `Copy` of a single source.
    pub fn turn_into_copy(&mut self, id: NodeId, source: OperandId) {
        self.turn_into(id, Inst::from(Op::Copy), &[source]);
        if let Node::Operation(op) = self.node_mut(id) {
            op.index = 0;
        }
    }

    // -----------------------------------------------------------------------
    // Removal with cascade
    // -----------------------------------------------------------------------

    /// A node is unused iff it has no side effects, has at least one
    /// destination, and every destination is a local variable nobody reads.
    /// Nodes with a missing or non-local destination are never unused.
    pub fn is_unused(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if let Node::Operation(op) = node {
            if op.inst.has_side_effects() {
                return false;
            }
        }
        let destinations = node.destinations();
        if destinations.is_empty() {
            return false;
        }
        destinations.iter().all(|&dest| {
            let operand = self.operand(dest);
            operand.is_local() && operand.used_by.is_empty()
        })
    }

    /// Removes `root` unconditionally, then walks a worklist of defining
    /// nodes whose last use disappeared, removing each that is unused. The
    /// cascade is a worklist, never recursion.
    pub fn remove_node(&mut self, root: NodeId) {
        let mut worklist: Vec<NodeId> = vec![root];
        let mut first = true;
        while let Some(id) = worklist.pop() {
            if !self.contains_node(id) {
                continue;
            }
            if !std::mem::take(&mut first) && !self.is_unused(id) {
                continue;
            }
            let node = self.nodes[id.0 as usize].take().expect("checked above");

            let block = node.block();
            let bb = self.block_mut(block);
            let pos = bb
                .nodes
                .iter()
                .position(|&n| n == id)
                .unwrap_or_else(|| panic!("node {id} not in its block {block}"));
            bb.nodes.remove(pos);

            for &dest in node.destinations() {
                let operand = self.operand_mut(dest);
                if operand.is_local() {
                    operand.assigned_by = None;
                }
            }
            for &source in node.sources() {
                let operand = self.operand_mut(source);
                if !operand.is_local() {
                    continue;
                }
                operand.used_by.shift_remove(&id);
                if operand.used_by.is_empty() {
                    if let Some(def) = operand.assigned_by {
                        worklist.push(def);
                    }
                }
            }
        }
    }
}

impl fmt::Display for FlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in self.cfg.node_indices() {
            let block = &self.cfg[idx];
            writeln!(f, "block {}:", block.id())?;
            for &id in block.nodes() {
                match self.node(id) {
                    Node::Operation(op) => {
                        write!(f, "  ")?;
                        if let Some(&dest) = op.destinations.first() {
                            write!(f, "{} = ", self.operand(dest))?;
                        }
                        write!(f, "{}", op.inst)?;
                        if op.index != 0 {
                            write!(f, "#{}", op.index)?;
                        }
                        for (i, &source) in op.sources.iter().enumerate() {
                            let sep = if i == 0 { " " } else { ", " };
                            write!(f, "{sep}{}", self.operand(source))?;
                        }
                        writeln!(f)?;
                    }
                    Node::Phi(phi) => {
                        let dest = phi.destinations[0];
                        write!(f, "  {} = Phi", self.operand(dest))?;
                        for (i, &source) in phi.sources.iter().enumerate() {
                            let sep = if i == 0 { " " } else { ", " };
                            write!(f, "{sep}[L{}: {}]", phi.blocks[i], self.operand(source))?;
                        }
                        writeln!(f)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::TypeFlags;

    #[test]
    fn add_op_wires_def_use() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let b = graph.argument(1);
        let dest = graph.local();
        let node = graph.add_op(block, Op::Add, Some(dest), &[a, b]);

        assert_eq!(graph.operand(dest).assigned_by(), Some(node));
        // Non-local sources carry no use sets.
        assert!(graph.operand(a).used_by().is_empty());
        assert_eq!(graph.block(block).nodes(), &[node]);
    }

    #[test]
    fn local_sources_record_users() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let t = graph.local();
        let u = graph.local();
        let def = graph.add_op(block, Op::Copy, Some(t), &[a]);
        let use1 = graph.add_op(block, Op::Add, Some(u), &[t, t]);

        assert_eq!(graph.operand(t).assigned_by(), Some(def));
        assert_eq!(graph.operand(t).used_by().len(), 1);
        assert!(graph.operand(t).used_by().contains(&use1));
    }

    #[test]
    #[should_panic(expected = "assigned twice")]
    fn double_assignment_fails_loudly() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let t = graph.local();
        graph.add_op(block, Op::Copy, Some(t), &[a]);
        graph.add_op(block, Op::Copy, Some(t), &[a]);
    }

    #[test]
    fn set_source_moves_use() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let t1 = graph.local();
        let t2 = graph.local();
        let out = graph.local();
        graph.add_op(block, Op::Copy, Some(t1), &[a]);
        graph.add_op(block, Op::Copy, Some(t2), &[a]);
        let user = graph.add_op(block, Op::Add, Some(out), &[t1, t2]);

        graph.set_source(user, 0, t2);
        assert!(graph.operand(t1).used_by().is_empty());
        assert!(graph.operand(t2).used_by().contains(&user));
    }

    #[test]
    fn set_source_keeps_use_when_still_referenced() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let t = graph.local();
        let out = graph.local();
        graph.add_op(block, Op::Copy, Some(t), &[a]);
        let user = graph.add_op(block, Op::Add, Some(out), &[t, t]);

        // Replacing one of two identical slots must keep the use edge.
        graph.set_source(user, 0, a);
        assert!(graph.operand(t).used_by().contains(&user));

        graph.set_source(user, 1, a);
        assert!(graph.operand(t).used_by().is_empty());
    }

    #[test]
    fn replace_uses_rewrites_all_consumers() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let t = graph.local();
        let o1 = graph.local();
        let o2 = graph.local();
        graph.add_op(block, Op::Copy, Some(t), &[a]);
        let u1 = graph.add_op(block, Op::Negate, Some(o1), &[t]);
        let u2 = graph.add_op(block, Op::Add, Some(o2), &[t, t]);

        let replacement = graph.constant(7);
        graph.replace_uses(t, replacement);

        assert!(graph.operand(t).used_by().is_empty());
        assert_eq!(graph.node(u1).sources(), &[replacement]);
        assert_eq!(graph.node(u2).sources(), &[replacement, replacement]);
    }

    #[test]
    fn turn_into_copy_adjusts_uses() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let x = graph.local();
        let y = graph.local();
        let out = graph.local();
        graph.add_op(block, Op::Copy, Some(x), &[a]);
        graph.add_op(block, Op::Copy, Some(y), &[a]);
        let node = graph.add_op(block, Op::Multiply, Some(out), &[x, y]);

        graph.turn_into_copy(node, x);

        let op = graph.operation(node).unwrap();
        assert_eq!(op.inst().op(), Op::Copy);
        assert_eq!(graph.node(node).sources(), &[x]);
        assert!(graph.operand(x).used_by().contains(&node));
        assert!(graph.operand(y).used_by().is_empty());
        // Destination is untouched.
        assert_eq!(graph.node(node).destinations(), &[out]);
        assert_eq!(graph.operand(out).assigned_by(), Some(node));
    }

    #[test]
    fn remove_node_cascades_through_dead_chain() {
        // t1 = a + b; t2 = t1 + c; t3 = t2 + d; nothing reads t3.
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let b = graph.argument(1);
        let c = graph.argument(2);
        let d = graph.argument(3);
        let t1 = graph.local();
        let t2 = graph.local();
        let t3 = graph.local();
        let n1 = graph.add_op(block, Op::Add, Some(t1), &[a, b]);
        let n2 = graph.add_op(block, Op::Add, Some(t2), &[t1, c]);
        let n3 = graph.add_op(block, Op::Add, Some(t3), &[t2, d]);

        assert!(graph.is_unused(n3));
        graph.remove_node(n3);

        assert!(!graph.contains_node(n1));
        assert!(!graph.contains_node(n2));
        assert!(!graph.contains_node(n3));
        assert!(graph.block(block).is_empty());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn cascade_stops_at_live_uses() {
        // t1 feeds both a dead chain and a store; the store keeps it alive.
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let addr = graph.argument(1);
        let t1 = graph.local();
        let t2 = graph.local();
        let n1 = graph.add_op(block, Op::Add, Some(t1), &[a, a]);
        let n2 = graph.add_op(block, Op::Add, Some(t2), &[t1, a]);
        let store = graph.add_op(block, Op::StoreGlobal, None, &[addr, t1]);

        graph.remove_node(n2);

        assert!(graph.contains_node(n1), "t1 still stored");
        assert!(graph.contains_node(store));
        assert!(!graph.contains_node(n2));
    }

    #[test]
    fn cascade_never_removes_side_effects() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let addr = graph.argument(0);
        let value = graph.argument(1);
        let old = graph.local();
        let t = graph.local();
        let atomic = graph.add_op(block, Op::AtomicAdd, Some(old), &[addr, value]);
        let user = graph.add_op(block, Op::Add, Some(t), &[old, old]);

        graph.remove_node(user);

        assert!(graph.contains_node(atomic));
        assert!(graph.operand(old).used_by().is_empty());
    }

    #[test]
    fn unusedness_requires_local_destination() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let addr = graph.argument(0);
        let value = graph.argument(1);
        let store = graph.add_op(block, Op::StoreGlobal, None, &[addr, value]);
        assert!(!graph.is_unused(store), "no destination, never unused");

        let dest = graph.local();
        let load = graph.add_op(block, Op::LoadGlobal, Some(dest), &[addr]);
        assert!(graph.is_unused(load), "unread local dest, no side effects");
    }

    #[test]
    fn phi_inserts_at_block_head() {
        let mut graph = FlowGraph::new();
        let b0 = graph.add_block();
        let b1 = graph.add_block();
        let merge = graph.add_block();
        graph.add_edge(b0, merge, CfgEdge::Taken);
        graph.add_edge(b1, merge, CfgEdge::Fallthrough);

        let a = graph.argument(0);
        let t = graph.local();
        let op = graph.add_op(merge, Op::Negate, Some(t), &[a]);

        let c = graph.constant(5);
        let dest = graph.local();
        let phi = graph.add_phi(merge, dest, &[(b0, c), (b1, c)]);

        assert_eq!(graph.block(merge).nodes(), &[phi, op]);
        assert_eq!(graph.operand(dest).assigned_by(), Some(phi));
    }

    #[test]
    fn cfg_edges_and_terminator() {
        let mut graph = FlowGraph::new();
        let b0 = graph.add_block();
        let b1 = graph.add_block();
        let b2 = graph.add_block();
        graph.add_edge(b0, b1, CfgEdge::Fallthrough);
        graph.add_edge(b0, b2, CfgEdge::Taken);

        let cond = graph.argument(0);
        let target = graph.label(b2);
        let branch = graph.add_op(b0, Op::BranchIfTrue, None, &[cond, target]);

        assert_eq!(graph.terminator(b0), Some(branch));
        assert_eq!(graph.successor_by_kind(b0, CfgEdge::Taken), Some(b2));
        assert_eq!(graph.successor_by_kind(b0, CfgEdge::Fallthrough), Some(b1));
        assert_eq!(graph.predecessors(b1), vec![b0]);

        assert!(graph.remove_edge(b0, b1));
        assert!(!graph.remove_edge(b0, b1));
        assert!(graph.successor_by_kind(b0, CfgEdge::Fallthrough).is_none());
    }

    #[test]
    fn display_dump_shape() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let one = graph.constant_f32(1.0);
        let t = graph.local();
        graph.add_op(
            block,
            Inst::new(Op::Multiply, TypeFlags::FP32),
            Some(t),
            &[a, one],
        );
        let addr = graph.argument(1);
        graph.add_op(block, Op::StoreGlobal, None, &[addr, t]);

        insta::assert_snapshot!(graph.to_string(), @r"
        block 0:
          %2 = Multiply.f32 arg0, 0x3f800000
          StoreGlobal arg1, %2
        ");
    }

    #[test]
    fn serde_roundtrip_preserves_counts() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let t = graph.local();
        graph.add_op(block, Op::Negate, Some(t), &[a]);

        let json = serde_json::to_string(&graph).unwrap();
        let back: FlowGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_count(), graph.node_count());
        assert_eq!(back.operand_count(), graph.operand_count());
        assert_eq!(back.to_string(), graph.to_string());
    }
}
