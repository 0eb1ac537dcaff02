//! Packed instruction tags.
//!
//! An [`Inst`] is a single `u32`: the low 16 bits hold the base opcode
//! ([`Op`]) and the high bits hold type and modifier flags ([`TypeFlags`]).
//! Semantic classification always goes through `bits & Inst::MASK` so that
//! an `Add` compares equal to an `Add | FP32` at the opcode level while the
//! full tag preserves operand typing.

use std::fmt;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Base opcodes, stored in the low 16 bits of an [`Inst`].
///
/// Comparisons produce the canonical boolean bit patterns [`TRUE_BITS`] /
/// [`FALSE_BITS`]. Signed and unsigned variants are distinct opcodes; float
/// typing rides on [`TypeFlags`] instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum Op {
    Undefined = 0,

    // -- Arithmetic --
    Absolute,
    Add,
    Divide,
    Fma,
    Max,
    Min,
    Multiply,
    Negate,
    ReciprocalSquareRoot,
    Cosine,
    Sine,
    Subtract,

    // -- Bitwise and shifts --
    BitwiseAnd,
    BitwiseExclusiveOr,
    BitwiseNot,
    BitwiseOr,
    ShiftLeft,
    ShiftRightS32,
    ShiftRightU32,

    // -- Comparison --
    CompareEqual,
    CompareGreater,
    CompareGreaterOrEqual,
    CompareGreaterOrEqualU32,
    CompareGreaterU32,
    CompareLess,
    CompareLessOrEqual,
    CompareLessOrEqualU32,
    CompareLessU32,
    CompareNotEqual,

    // -- Conversion --
    ConvertFP32ToS32,
    ConvertFP32ToU32,
    ConvertS32ToFP32,
    ConvertU32ToFP32,

    // -- Data movement and selection --
    ConditionalSelect,
    Copy,

    // -- Control --
    Branch,
    BranchIfFalse,
    BranchIfTrue,
    Call,
    Return,

    // -- Memory --
    LoadAttribute,
    LoadConstant,
    LoadGlobal,
    LoadStorage,
    StoreGlobal,
    StoreStorage,
    AtomicAdd,
    AtomicAnd,
    AtomicCompareAndSwap,
    AtomicMaxU32,
    AtomicMinU32,
    AtomicOr,
    AtomicSwap,
    AtomicXor,
    Barrier,

    // -- Texture and image --
    ImageAtomic,
    TextureSample,

    // -- Packing, subgroup, derivatives --
    Ddx,
    Ddy,
    PackHalf2x16,
    ShuffleXor,
    SwizzleAdd,
    UnpackHalf2x16,
}

bitflags! {
    /// Type and modifier bits occupying the high half of an [`Inst`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u32 {
        const FP32 = 1 << 16;
        const FP64 = 1 << 17;
        /// Texture access whose descriptor is a runtime value.
        const BINDLESS = 1 << 20;
        /// Texture access through a dynamically indexed binding table.
        const INDEXED = 1 << 21;
    }
}

/// Canonical boolean bit patterns produced by comparisons.
pub const TRUE_BITS: u32 = u32::MAX;
pub const FALSE_BITS: u32 = 0;

/// A packed instruction tag: `opcode | type flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inst(u32);

impl Inst {
    /// Low bits forming the opcode. Classification by opcode must compare
    /// against `bits & MASK`.
    pub const MASK: u32 = 0xffff;

    /// Builds a tag from an opcode and flag set.
    pub fn new(op: Op, flags: TypeFlags) -> Self {
        Inst(u32::from(u16::from(op)) | flags.bits())
    }

    /// Reinterprets raw tag bits. The opcode bits must name a known [`Op`];
    /// malformed IR is a programmer error and fails loudly on [`Inst::op`].
    pub fn from_bits(bits: u32) -> Self {
        Inst(bits)
    }

    /// The full packed tag.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// The base opcode, ignoring type flags.
    pub fn op(self) -> Op {
        Op::try_from((self.0 & Self::MASK) as u16).expect("invalid opcode bits in instruction tag")
    }

    /// The type/modifier flag set, ignoring the opcode.
    pub fn flags(self) -> TypeFlags {
        TypeFlags::from_bits_truncate(self.0 & !Self::MASK)
    }

    /// Returns a tag with the same opcode and additional flags set.
    pub fn with_flags(self, flags: TypeFlags) -> Self {
        Inst(self.0 | flags.bits())
    }

    /// Returns a tag with the same opcode and the given flags cleared.
    pub fn without_flags(self, flags: TypeFlags) -> Self {
        Inst(self.0 & !flags.bits())
    }

    pub fn is_fp32(self) -> bool {
        self.flags().contains(TypeFlags::FP32)
    }

    pub fn is_fp(self) -> bool {
        self.flags().intersects(TypeFlags::FP32 | TypeFlags::FP64)
    }

    /// Branches terminate a basic block.
    pub fn is_terminator(self) -> bool {
        matches!(self.op(), Op::Branch | Op::BranchIfFalse | Op::BranchIfTrue)
    }

    pub fn is_atomic(self) -> bool {
        matches!(
            self.op(),
            Op::AtomicAdd
                | Op::AtomicAnd
                | Op::AtomicCompareAndSwap
                | Op::AtomicMaxU32
                | Op::AtomicMinU32
                | Op::AtomicOr
                | Op::AtomicSwap
                | Op::AtomicXor
        )
    }

    /// Instructions that must never be removed even when their destination
    /// is unused: calls and read-modify-write memory operations.
    pub fn has_side_effects(self) -> bool {
        matches!(self.op(), Op::Call | Op::ImageAtomic) || self.is_atomic()
    }
}

impl From<Op> for Inst {
    fn from(op: Op) -> Self {
        Inst::new(op, TypeFlags::empty())
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.op())?;
        let flags = self.flags();
        if flags.contains(TypeFlags::FP32) {
            write!(f, ".f32")?;
        }
        if flags.contains(TypeFlags::FP64) {
            write!(f, ".f64")?;
        }
        if flags.contains(TypeFlags::BINDLESS) {
            write!(f, ".bindless")?;
        }
        if flags.contains(TypeFlags::INDEXED) {
            write!(f, ".indexed")?;
        }
        Ok(())
    }
}
