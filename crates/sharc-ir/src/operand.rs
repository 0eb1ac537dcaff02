//! Operands and their def/use bookkeeping fields.
//!
//! An [`Operand`] denotes a value: a literal constant, a constant-buffer
//! slot, an SSA-like local variable, a shader input attribute, an argument,
//! a branch label, or an undefined placeholder. Only `LocalVariable`
//! operands carry dataflow bookkeeping: the node that assigns them and the
//! set of nodes that read them. Those two fields are exact mirrors of the
//! structural source/destination edges and are maintained exclusively by
//! the mutation helpers in [`crate::graph`].

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::id::{BlockId, NodeId};

/// Byte offset of the fragment-coordinate input variable.
pub const FRAG_COORD_BASE: u32 = 0x70;
/// Byte offset of the fragment coordinate's W component (component 3).
pub const FRAG_COORD_W: u32 = FRAG_COORD_BASE + 3 * 4;

/// What an operand denotes. `LocalVariable` is the only SSA-like temporary;
/// every other kind is externally rooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    Argument,
    Attribute,
    Constant,
    ConstantBuffer,
    Label,
    LocalVariable,
    Undefined,
}

/// A value reference with a 32-bit payload interpreted per kind.
///
/// Payload interpretation: constant bit pattern (`Constant`), packed
/// slot/offset (`ConstantBuffer`), register number (`LocalVariable`),
/// input byte offset (`Attribute`), argument index (`Argument`), target
/// block (`Label`). `Undefined` carries no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operand {
    kind: OperandKind,
    value: u32,
    /// The unique node whose destination is this operand. `LocalVariable` only.
    pub(crate) assigned_by: Option<NodeId>,
    /// The nodes referencing this operand as a source. `LocalVariable` only.
    pub(crate) used_by: IndexSet<NodeId>,
}

impl Operand {
    fn new(kind: OperandKind, value: u32) -> Self {
        Operand {
            kind,
            value,
            assigned_by: None,
            used_by: IndexSet::new(),
        }
    }

    pub(crate) fn local(register: u32) -> Self {
        Operand::new(OperandKind::LocalVariable, register)
    }

    pub(crate) fn constant(bits: u32) -> Self {
        Operand::new(OperandKind::Constant, bits)
    }

    pub(crate) fn constant_buffer(slot: u16, offset: u16) -> Self {
        Operand::new(
            OperandKind::ConstantBuffer,
            (u32::from(slot) << 16) | u32::from(offset),
        )
    }

    pub(crate) fn attribute(offset: u32) -> Self {
        Operand::new(OperandKind::Attribute, offset)
    }

    pub(crate) fn argument(index: u32) -> Self {
        Operand::new(OperandKind::Argument, index)
    }

    pub(crate) fn label(target: BlockId) -> Self {
        Operand::new(OperandKind::Label, target.0)
    }

    pub(crate) fn undefined() -> Self {
        Operand::new(OperandKind::Undefined, 0)
    }

    pub fn kind(&self) -> OperandKind {
        self.kind
    }

    /// The raw 32-bit payload.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_local(&self) -> bool {
        self.kind == OperandKind::LocalVariable
    }

    pub fn is_constant(&self) -> bool {
        self.kind == OperandKind::Constant
    }

    /// `true` for a constant with exactly the given bit pattern.
    pub fn is_constant_bits(&self, bits: u32) -> bool {
        self.kind == OperandKind::Constant && self.value == bits
    }

    /// Constant-buffer slot (high 16 bits of the payload).
    pub fn cbuf_slot(&self) -> u32 {
        debug_assert_eq!(self.kind, OperandKind::ConstantBuffer);
        self.value >> 16
    }

    /// Constant-buffer word offset (low 16 bits of the payload).
    pub fn cbuf_offset(&self) -> u32 {
        debug_assert_eq!(self.kind, OperandKind::ConstantBuffer);
        self.value & 0xffff
    }

    /// Branch target for `Label` operands.
    pub fn label_target(&self) -> BlockId {
        debug_assert_eq!(self.kind, OperandKind::Label);
        BlockId(self.value)
    }

    /// The defining node, for `LocalVariable` operands.
    pub fn assigned_by(&self) -> Option<NodeId> {
        self.assigned_by
    }

    /// The consuming nodes, for `LocalVariable` operands.
    pub fn used_by(&self) -> &IndexSet<NodeId> {
        &self.used_by
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperandKind::Argument => write!(f, "arg{}", self.value),
            OperandKind::Attribute => write!(f, "attr[0x{:x}]", self.value),
            OperandKind::Constant => write!(f, "0x{:x}", self.value),
            OperandKind::ConstantBuffer => {
                write!(f, "cb{}[{}]", self.cbuf_slot(), self.cbuf_offset())
            }
            OperandKind::Label => write!(f, "L{}", self.value),
            OperandKind::LocalVariable => write!(f, "%{}", self.value),
            OperandKind::Undefined => write!(f, "undef"),
        }
    }
}
