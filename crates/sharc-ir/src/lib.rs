pub mod block;
pub mod error;
pub mod graph;
pub mod id;
pub mod inst;
pub mod node;
pub mod operand;
pub mod verify;

// Re-export commonly used types
pub use block::{BasicBlock, CfgEdge};
pub use error::IrError;
pub use graph::FlowGraph;
pub use id::{BlockId, NodeId, OperandId};
pub use inst::{Inst, Op, TypeFlags, FALSE_BITS, TRUE_BITS};
pub use node::{Node, Operation, Phi};
pub use operand::{Operand, OperandKind, FRAG_COORD_BASE, FRAG_COORD_W};
