//! Branch-condition elimination.
//!
//! A conditional terminator whose condition is a literal constant has a
//! statically known direction: the dead edge is pruned from the CFG and the
//! terminator either degrades to an unconditional branch (taken side) or
//! disappears (fallthrough side). Independently, a conditional branch whose
//! taken target coincides with its fallthrough successor is stripped, since
//! both directions reach the same block.

use sharc_ir::{BlockId, CfgEdge, FlowGraph, Inst, Node, Op};

/// Examines the block's terminator. Returns `true` if it was rewritten or
/// removed.
pub fn eliminate(graph: &mut FlowGraph, block: BlockId) -> bool {
    let Some(terminator) = graph.terminator(block) else {
        return false;
    };
    let Node::Operation(operation) = graph.node(terminator) else {
        return false;
    };
    let op = operation.inst().op();
    if op == Op::Branch {
        return false;
    }

    let sources = graph.node(terminator).sources();
    let condition = sources[0];
    let label = sources[1];
    let taken_target = graph.operand(label).label_target();
    let fallthrough = graph.successor_by_kind(block, CfgEdge::Fallthrough);

    if Some(taken_target) == fallthrough {
        // Both directions reach the same block.
        graph.remove_node(terminator);
        graph.remove_edge_by_kind(block, taken_target, CfgEdge::Taken);
        return true;
    }

    let cond_operand = graph.operand(condition);
    if !cond_operand.is_constant() {
        return false;
    }
    let taken = (op == Op::BranchIfTrue) == (cond_operand.value() != 0);

    if taken {
        if let Some(next) = fallthrough {
            graph.remove_edge_by_kind(block, next, CfgEdge::Fallthrough);
        }
        graph.turn_into(terminator, Inst::from(Op::Branch), &[label]);
    } else {
        graph.remove_node(terminator);
        graph.remove_edge_by_kind(block, taken_target, CfgEdge::Taken);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharc_ir::TRUE_BITS;

    struct Cfg {
        graph: FlowGraph,
        entry: BlockId,
        fall: BlockId,
        jump: BlockId,
    }

    fn diamond_head() -> Cfg {
        let mut graph = FlowGraph::new();
        let entry = graph.add_block();
        let fall = graph.add_block();
        let jump = graph.add_block();
        graph.add_edge(entry, fall, CfgEdge::Fallthrough);
        graph.add_edge(entry, jump, CfgEdge::Taken);
        Cfg { graph, entry, fall, jump }
    }

    #[test]
    fn constant_true_takes_the_branch() {
        let Cfg { mut graph, entry, fall, jump } = diamond_head();
        let cond = graph.constant(TRUE_BITS);
        let label = graph.label(jump);
        let term = graph.add_op(entry, Op::BranchIfTrue, None, &[cond, label]);

        assert!(eliminate(&mut graph, entry));

        // Unconditional branch remains; the fallthrough successor lost us.
        let op = graph.operation(term).unwrap();
        assert_eq!(op.inst().op(), Op::Branch);
        assert_eq!(graph.node(term).sources(), &[label]);
        assert!(graph.predecessors(fall).is_empty());
        assert_eq!(graph.predecessors(jump), vec![entry]);

        // Second invocation is a no-op: unconditional branches are final.
        assert!(!eliminate(&mut graph, entry));
    }

    #[test]
    fn constant_false_strips_the_terminator() {
        let Cfg { mut graph, entry, fall, jump } = diamond_head();
        let cond = graph.constant(0);
        let label = graph.label(jump);
        let term = graph.add_op(entry, Op::BranchIfTrue, None, &[cond, label]);

        assert!(eliminate(&mut graph, entry));

        assert!(!graph.contains_node(term));
        assert!(graph.terminator(entry).is_none());
        assert!(graph.predecessors(jump).is_empty());
        assert_eq!(graph.predecessors(fall), vec![entry]);
    }

    #[test]
    fn branch_if_false_inverts_the_direction() {
        let Cfg { mut graph, entry, fall, jump } = diamond_head();
        let cond = graph.constant(0);
        let label = graph.label(jump);
        let term = graph.add_op(entry, Op::BranchIfFalse, None, &[cond, label]);

        assert!(eliminate(&mut graph, entry));
        assert_eq!(graph.operation(term).unwrap().inst().op(), Op::Branch);
        assert!(graph.predecessors(fall).is_empty());
    }

    #[test]
    fn coinciding_successors_strip_without_a_constant() {
        let mut graph = FlowGraph::new();
        let entry = graph.add_block();
        let next = graph.add_block();
        graph.add_edge(entry, next, CfgEdge::Fallthrough);
        graph.add_edge(entry, next, CfgEdge::Taken);

        let cond = graph.argument(0);
        let label = graph.label(next);
        let term = graph.add_op(entry, Op::BranchIfTrue, None, &[cond, label]);

        assert!(eliminate(&mut graph, entry));
        assert!(!graph.contains_node(term));
        assert_eq!(graph.predecessors(next), vec![entry]);
        assert_eq!(graph.successor_by_kind(entry, CfgEdge::Fallthrough), Some(next));
    }

    #[test]
    fn dynamic_condition_declines() {
        let Cfg { mut graph, entry, .. } = diamond_head();
        let jump = graph.block_ids()[2];
        let cond = graph.argument(0);
        let label = graph.label(jump);
        graph.add_op(entry, Op::BranchIfTrue, None, &[cond, label]);

        assert!(!eliminate(&mut graph, entry));
    }

    #[test]
    fn block_without_terminator_declines() {
        let Cfg { mut graph, entry, .. } = diamond_head();
        assert!(!eliminate(&mut graph, entry));
    }
}
