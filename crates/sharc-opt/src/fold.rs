//! Constant folding.
//!
//! Folds operations whose sources are all literal constants, rewriting the
//! node into a `Copy` of the computed constant. Evaluation uses the exact
//! bit semantics of the instruction's type tag: wrapping two's-complement
//! integer arithmetic, IEEE-754 `f32`, saturating float-to-integer
//! conversions, and round-to-nearest-even half packing. Opcodes outside
//! the closed foldable set (transcendentals, memory, control) decline.

use sharc_ir::{FlowGraph, NodeId, Op, FALSE_BITS, TRUE_BITS};

/// Attempts to fold one operation. Returns `true` if the node was rewritten.
pub fn run(graph: &mut FlowGraph, id: NodeId) -> bool {
    let Some(operation) = graph.operation(id) else {
        return false;
    };
    let inst = operation.inst();
    let lane = operation.index();
    if inst.op() == Op::Copy {
        return false;
    }

    let sources = graph.node(id).sources();
    if sources.is_empty() || !sources.iter().all(|&s| graph.operand(s).is_constant()) {
        return false;
    }
    let values: Vec<u32> = sources.iter().map(|&s| graph.operand(s).value()).collect();

    let fp = inst.is_fp32();
    let result = match inst.op() {
        Op::Add => Some(binary(fp, &values, |a, b| a + b, i32::wrapping_add)),
        Op::Subtract => Some(binary(fp, &values, |a, b| a - b, i32::wrapping_sub)),
        Op::Multiply => Some(binary(fp, &values, |a, b| a * b, i32::wrapping_mul)),
        Op::Divide => Some(binary(fp, &values, |a, b| a / b, |a, b| {
            if b == 0 {
                0
            } else {
                a.wrapping_div(b)
            }
        })),
        Op::Negate => Some(unary(fp, &values, |a| -a, i32::wrapping_neg)),
        Op::Absolute => Some(unary(fp, &values, f32::abs, i32::wrapping_abs)),
        Op::Min => Some(binary(fp, &values, f32::min, i32::min)),
        Op::Max => Some(binary(fp, &values, f32::max, i32::max)),
        Op::Fma if fp => {
            let (a, b, c) = (f(values[0]), f(values[1]), f(values[2]));
            Some(a.mul_add(b, c).to_bits())
        }

        Op::BitwiseAnd => Some(values[0] & values[1]),
        Op::BitwiseOr => Some(values[0] | values[1]),
        Op::BitwiseExclusiveOr => Some(values[0] ^ values[1]),
        Op::BitwiseNot => Some(!values[0]),
        Op::ShiftLeft => Some(values[0] << (values[1] & 31)),
        Op::ShiftRightS32 => Some(((values[0] as i32) >> (values[1] & 31)) as u32),
        Op::ShiftRightU32 => Some(values[0] >> (values[1] & 31)),

        Op::CompareEqual => Some(compare(fp, &values, |a, b| a == b, |a, b| a == b)),
        Op::CompareNotEqual => Some(compare(fp, &values, |a, b| a != b, |a, b| a != b)),
        Op::CompareLess => Some(compare(fp, &values, |a, b| a < b, |a, b| a < b)),
        Op::CompareLessOrEqual => Some(compare(fp, &values, |a, b| a <= b, |a, b| a <= b)),
        Op::CompareGreater => Some(compare(fp, &values, |a, b| a > b, |a, b| a > b)),
        Op::CompareGreaterOrEqual => Some(compare(fp, &values, |a, b| a >= b, |a, b| a >= b)),
        Op::CompareLessU32 => Some(bool_bits(values[0] < values[1])),
        Op::CompareLessOrEqualU32 => Some(bool_bits(values[0] <= values[1])),
        Op::CompareGreaterU32 => Some(bool_bits(values[0] > values[1])),
        Op::CompareGreaterOrEqualU32 => Some(bool_bits(values[0] >= values[1])),

        Op::ConvertFP32ToS32 => Some((f(values[0]) as i32) as u32),
        Op::ConvertFP32ToU32 => Some(f(values[0]) as u32),
        Op::ConvertS32ToFP32 => Some(((values[0] as i32) as f32).to_bits()),
        Op::ConvertU32ToFP32 => Some((values[0] as f32).to_bits()),

        Op::ConditionalSelect => Some(if values[0] != 0 { values[1] } else { values[2] }),

        Op::PackHalf2x16 => {
            Some(u32::from(f32_to_f16_bits(values[0])) | (u32::from(f32_to_f16_bits(values[1])) << 16))
        }
        Op::UnpackHalf2x16 => {
            let half = ((values[0] >> (16 * u32::from(lane))) & 0xffff) as u16;
            Some(f16_to_f32_bits(half))
        }

        _ => None,
    };

    match result {
        Some(bits) => {
            let constant = graph.constant(bits);
            graph.turn_into_copy(id, constant);
            true
        }
        None => false,
    }
}

fn f(bits: u32) -> f32 {
    f32::from_bits(bits)
}

fn bool_bits(value: bool) -> u32 {
    if value {
        TRUE_BITS
    } else {
        FALSE_BITS
    }
}

fn unary(fp: bool, values: &[u32], float: impl Fn(f32) -> f32, int: impl Fn(i32) -> i32) -> u32 {
    if fp {
        float(f(values[0])).to_bits()
    } else {
        int(values[0] as i32) as u32
    }
}

fn binary(
    fp: bool,
    values: &[u32],
    float: impl Fn(f32, f32) -> f32,
    int: impl Fn(i32, i32) -> i32,
) -> u32 {
    if fp {
        float(f(values[0]), f(values[1])).to_bits()
    } else {
        int(values[0] as i32, values[1] as i32) as u32
    }
}

fn compare(
    fp: bool,
    values: &[u32],
    float: impl Fn(f32, f32) -> bool,
    int: impl Fn(i32, i32) -> bool,
) -> u32 {
    bool_bits(if fp {
        float(f(values[0]), f(values[1]))
    } else {
        int(values[0] as i32, values[1] as i32)
    })
}

/// IEEE 754 binary16 -> binary32, exact.
fn f16_to_f32_bits(half: u16) -> u32 {
    let sign = (u32::from(half) & 0x8000) << 16;
    let exponent = u32::from(half >> 10) & 0x1f;
    let mantissa = u32::from(half) & 0x3ff;
    match exponent {
        0 => {
            if mantissa == 0 {
                sign
            } else {
                // Subnormal: renormalize into the f32 exponent range.
                let mut exponent = 113u32;
                let mut mantissa = mantissa;
                while mantissa & 0x400 == 0 {
                    mantissa <<= 1;
                    exponent -= 1;
                }
                sign | (exponent << 23) | ((mantissa & 0x3ff) << 13)
            }
        }
        0x1f => sign | 0x7f80_0000 | (mantissa << 13),
        _ => sign | ((exponent + 112) << 23) | (mantissa << 13),
    }
}

/// IEEE 754 binary32 -> binary16 with round-to-nearest-even.
fn f32_to_f16_bits(bits: u32) -> u16 {
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exponent == 0xff {
        // Infinity keeps a zero mantissa; NaN becomes a quiet NaN.
        return if mantissa == 0 { sign | 0x7c00 } else { sign | 0x7e00 };
    }

    let unbiased = exponent - 127 + 15;
    if unbiased >= 0x1f {
        return sign | 0x7c00;
    }
    if unbiased <= 0 {
        if unbiased < -10 {
            return sign;
        }
        // Subnormal result: shift the implicit-one mantissa into place.
        let full = mantissa | 0x0080_0000;
        let shift = (14 - unbiased) as u32;
        let half = full >> shift;
        let remainder = full & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        let rounded = if remainder > halfway || (remainder == halfway && half & 1 != 0) {
            half + 1
        } else {
            half
        };
        return sign | rounded as u16;
    }

    let half = ((unbiased as u32) << 10) | (mantissa >> 13);
    let remainder = mantissa & 0x1fff;
    // Rounding may carry into the exponent; that lands on infinity exactly
    // when the value exceeds the largest representable half.
    let rounded = if remainder > 0x1000 || (remainder == 0x1000 && half & 1 != 0) {
        half + 1
    } else {
        half
    };
    sign | rounded as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sharc_ir::{Inst, OperandId, TypeFlags};

    /// Builds `inst(a, b)` over constants and folds it, returning the
    /// constant bits the destination was rewritten to.
    fn fold_binary(inst: impl Into<Inst>, a: u32, b: u32) -> u32 {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let ca = graph.constant(a);
        let cb = graph.constant(b);
        let dest = graph.local();
        let node = graph.add_op(block, inst, Some(dest), &[ca, cb]);
        assert!(run(&mut graph, node));
        copied_constant(&graph, node)
    }

    fn fold_unary(inst: impl Into<Inst>, a: u32) -> u32 {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let ca = graph.constant(a);
        let dest = graph.local();
        let node = graph.add_op(block, inst, Some(dest), &[ca]);
        assert!(run(&mut graph, node));
        copied_constant(&graph, node)
    }

    fn copied_constant(graph: &FlowGraph, node: NodeId) -> u32 {
        let op = graph.operation(node).unwrap();
        assert_eq!(op.inst().op(), Op::Copy);
        let source: OperandId = graph.node(node).sources()[0];
        assert!(graph.operand(source).is_constant());
        graph.operand(source).value()
    }

    fn fp(op: Op) -> Inst {
        Inst::new(op, TypeFlags::FP32)
    }

    #[test]
    fn integer_add_wraps() {
        assert_eq!(fold_binary(Op::Add, u32::MAX, 1), 0);
        assert_eq!(fold_binary(Op::Add, 2, 3), 5);
    }

    #[test]
    fn fp32_arithmetic_uses_ieee() {
        assert_eq!(
            fold_binary(fp(Op::Multiply), 3.0f32.to_bits(), 0.5f32.to_bits()),
            1.5f32.to_bits()
        );
        assert_eq!(
            fold_binary(fp(Op::Divide), 1.0f32.to_bits(), 0.0f32.to_bits()),
            f32::INFINITY.to_bits()
        );
    }

    #[test]
    fn integer_divide_by_zero_folds_to_zero() {
        assert_eq!(fold_binary(Op::Divide, 100, 0), 0);
        assert_eq!(fold_binary(Op::Divide, 100, 7), 14);
    }

    #[test]
    fn shift_amounts_mask_to_five_bits() {
        assert_eq!(fold_binary(Op::ShiftLeft, 1, 33), 2);
        assert_eq!(fold_binary(Op::ShiftRightU32, 0x8000_0000, 31), 1);
        assert_eq!(fold_binary(Op::ShiftRightS32, 0x8000_0000, 31), u32::MAX);
    }

    #[test]
    fn comparisons_produce_canonical_booleans() {
        assert_eq!(fold_binary(Op::CompareLess, 1, 2), TRUE_BITS);
        // Signed: -1 < 0.
        assert_eq!(fold_binary(Op::CompareLess, u32::MAX, 0), TRUE_BITS);
        // Unsigned: 0xffffffff is the largest value.
        assert_eq!(fold_binary(Op::CompareLessU32, u32::MAX, 0), FALSE_BITS);
        assert_eq!(fold_binary(Op::CompareGreaterOrEqualU32, 0, 0), TRUE_BITS);
    }

    #[test]
    fn fp_comparisons_are_ordered() {
        let nan = f32::NAN.to_bits();
        let one = 1.0f32.to_bits();
        assert_eq!(fold_binary(fp(Op::CompareLess), nan, one), FALSE_BITS);
        assert_eq!(fold_binary(fp(Op::CompareEqual), nan, nan), FALSE_BITS);
        assert_eq!(fold_binary(fp(Op::CompareNotEqual), nan, one), TRUE_BITS);
    }

    #[test]
    fn float_to_int_conversion_saturates() {
        assert_eq!(fold_unary(Op::ConvertFP32ToS32, 1e10f32.to_bits()), i32::MAX as u32);
        assert_eq!(fold_unary(Op::ConvertFP32ToS32, (-1e10f32).to_bits()), i32::MIN as u32);
        assert_eq!(fold_unary(Op::ConvertFP32ToU32, (-1.0f32).to_bits()), 0);
        assert_eq!(fold_unary(Op::ConvertS32ToFP32, u32::MAX), (-1.0f32).to_bits());
    }

    #[test]
    fn select_picks_by_condition() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let cond = graph.constant(TRUE_BITS);
        let a = graph.constant(10);
        let b = graph.constant(20);
        let dest = graph.local();
        let node = graph.add_op(block, Op::ConditionalSelect, Some(dest), &[cond, a, b]);
        assert!(run(&mut graph, node));
        assert_eq!(copied_constant(&graph, node), 10);
    }

    #[test]
    fn unpack_lane_selects_half() {
        let packed = 0x3c00_4000u32; // lane 0 = 2.0, lane 1 = 1.0
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let c = graph.constant(packed);
        let lo = graph.local();
        let hi = graph.local();
        let n0 = graph.add_op_indexed(block, Op::UnpackHalf2x16, 0, Some(lo), &[c]);
        let n1 = graph.add_op_indexed(block, Op::UnpackHalf2x16, 1, Some(hi), &[c]);
        assert!(run(&mut graph, n0));
        assert!(run(&mut graph, n1));
        assert_eq!(copied_constant(&graph, n0), 2.0f32.to_bits());
        assert_eq!(copied_constant(&graph, n1), 1.0f32.to_bits());
    }

    #[test]
    fn pack_then_unpack_is_identity_for_representable_values() {
        let packed = fold_binary(Op::PackHalf2x16, 1.5f32.to_bits(), (-0.25f32).to_bits());
        assert_eq!(packed & 0xffff, 0x3e00); // 1.5 as f16
        assert_eq!(f16_to_f32_bits((packed >> 16) as u16), (-0.25f32).to_bits());
    }

    #[test]
    fn declines_non_constant_sources() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let a = graph.argument(0);
        let c = graph.constant(1);
        let dest = graph.local();
        let node = graph.add_op(block, Op::Add, Some(dest), &[a, c]);
        assert!(!run(&mut graph, node));
        assert_eq!(graph.operation(node).unwrap().inst().op(), Op::Add);
    }

    #[test]
    fn declines_unfoldable_opcodes() {
        let mut graph = FlowGraph::new();
        let block = graph.add_block();
        let c = graph.constant(1);
        let dest = graph.local();
        let node = graph.add_op(block, fp(Op::Sine), Some(dest), &[c]);
        assert!(!run(&mut graph, node));
    }

    #[test]
    fn half_conversion_fixpoints() {
        assert_eq!(f16_to_f32_bits(0x3c00), 1.0f32.to_bits());
        assert_eq!(f16_to_f32_bits(0x7bff), 65504.0f32.to_bits());
        assert_eq!(f16_to_f32_bits(0x0001), 5.960_464_5e-8f32.to_bits());
        assert_eq!(f32_to_f16_bits(1.0f32.to_bits()), 0x3c00);
        assert_eq!(f32_to_f16_bits(65504.0f32.to_bits()), 0x7bff);
        assert_eq!(f32_to_f16_bits(65520.0f32.to_bits()), 0x7c00); // rounds to inf
        assert_eq!(f32_to_f16_bits(f32::NEG_INFINITY.to_bits()), 0xfc00);
        assert_ne!(f32_to_f16_bits(f32::NAN.to_bits()) & 0x3ff, 0);
    }

    proptest! {
        /// Wrapping addition is associative, so folding either association
        /// order of a three-term sum reaches the same constant.
        #[test]
        fn fold_add_is_confluent(a: u32, b: u32, c: u32) {
            let left = fold_binary(Op::Add, fold_binary(Op::Add, a, b), c);
            let right = fold_binary(Op::Add, a, fold_binary(Op::Add, b, c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn fold_add_matches_wrapping_semantics(a: u32, b: u32) {
            prop_assert_eq!(fold_binary(Op::Add, a, b), a.wrapping_add(b));
        }

        #[test]
        fn half_roundtrip_preserves_half_precision_values(h in 0u16..0x7c00) {
            // Every finite half value converts to f32 and back unchanged.
            let f32_bits = f16_to_f32_bits(h);
            prop_assert_eq!(f32_to_f16_bits(f32_bits), h);
        }

        #[test]
        fn unsigned_compare_orders_match(a: u32, b: u32) {
            prop_assert_eq!(fold_binary(Op::CompareLessU32, a, b), bool_bits(a < b));
            prop_assert_eq!(fold_binary(Op::CompareGreaterOrEqualU32, a, b), bool_bits(a >= b));
        }
    }
}
