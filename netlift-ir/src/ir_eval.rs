// SPDX-License-Identifier: Apache-2.0

//! Reference interpreter for IR functions.
//!
//! Functions are node lists in definition order, so evaluation is a single
//! forward pass. Bitwise operations, shifts, extensions and slices work at
//! any width; arithmetic and comparisons are computed through `u128` and
//! report `UnsupportedWidth` beyond that. This is a test oracle, not a
//! performance path.

use crate::bits::Bits;
use crate::ir::{Binop, Fn, NaryOp, NodePayload, ParamId, Unop};

#[derive(Debug, PartialEq, Eq)]
pub enum EvalError {
    ArgCountMismatch { expected: usize, actual: usize },
    ArgWidthMismatch {
        param: String,
        expected: usize,
        actual: usize,
    },
    UnsupportedWidth { node_index: usize, width: usize },
    PoisonValue { node_index: usize },
    UnknownParam { node_index: usize },
    MissingReturn,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::ArgCountMismatch { expected, actual } => {
                write!(f, "expected {} arguments, got {}", expected, actual)
            }
            EvalError::ArgWidthMismatch {
                param,
                expected,
                actual,
            } => write!(
                f,
                "argument for '{}' has width {}, expected {}",
                param, actual, expected
            ),
            EvalError::UnsupportedWidth { node_index, width } => write!(
                f,
                "node {} computes at width {} which exceeds the evaluator limit",
                node_index, width
            ),
            EvalError::PoisonValue { node_index } => {
                write!(f, "node {} evaluates to poison", node_index)
            }
            EvalError::UnknownParam { node_index } => {
                write!(f, "node {} references an unknown parameter", node_index)
            }
            EvalError::MissingReturn => write!(f, "function has no return node"),
        }
    }
}

impl std::error::Error for EvalError {}

fn mask(width: usize) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

fn bits_from_u128(value: u128, width: usize) -> Bits {
    let bools: Vec<bool> = (0..width).map(|i| (value >> i.min(127)) & 1 == 1).collect();
    Bits::from_lsb_bits(&bools)
}

fn to_u128(bits: &Bits, node_index: usize) -> Result<u128, EvalError> {
    bits.to_u128().map_err(|_| EvalError::UnsupportedWidth {
        node_index,
        width: bits.width(),
    })
}

fn bitwise(op: NaryOp, elems: &[Bits]) -> Bits {
    let width = elems[0].width();
    let bools: Vec<bool> = (0..width)
        .map(|i| {
            let mut acc = elems[0].get_lsb(i);
            for e in &elems[1..] {
                acc = match op {
                    NaryOp::And => acc && e.get_lsb(i),
                    NaryOp::Or => acc || e.get_lsb(i),
                    NaryOp::Xor => acc ^ e.get_lsb(i),
                };
            }
            acc
        })
        .collect();
    Bits::from_lsb_bits(&bools)
}

fn shift(op: Binop, lhs: &Bits, amount: u128) -> Bits {
    let width = lhs.width();
    let shcnt = amount.min(width as u128) as usize;
    let bools: Vec<bool> = (0..width)
        .map(|i| match op {
            Binop::Shll => i >= shcnt && lhs.get_lsb(i - shcnt),
            Binop::Shrl => {
                let src = i + shcnt;
                src < width && lhs.get_lsb(src)
            }
            Binop::Shra => {
                let src = i + shcnt;
                if src < width {
                    lhs.get_lsb(src)
                } else {
                    width > 0 && lhs.get_lsb(width - 1)
                }
            }
            _ => unreachable!("not a shift"),
        })
        .collect();
    Bits::from_lsb_bits(&bools)
}

/// Evaluates `f` on the given arguments, returning the value of its return
/// node.
pub fn eval_fn(f: &Fn, args: &[Bits]) -> Result<Bits, EvalError> {
    if args.len() != f.params.len() {
        return Err(EvalError::ArgCountMismatch {
            expected: f.params.len(),
            actual: args.len(),
        });
    }
    for (param, arg) in f.params.iter().zip(args.iter()) {
        if param.ty.bit_count() != arg.width() {
            return Err(EvalError::ArgWidthMismatch {
                param: param.name.clone(),
                expected: param.ty.bit_count(),
                actual: arg.width(),
            });
        }
    }
    let param_value = |pid: ParamId| -> Option<&Bits> {
        f.params
            .iter()
            .position(|p| p.id == pid)
            .map(|pos| &args[pos])
    };

    let mut env: Vec<Option<Bits>> = vec![None; f.nodes.len()];
    for (i, node) in f.nodes.iter().enumerate() {
        let width = node.ty.bit_count();
        let value = match &node.payload {
            NodePayload::Nil => continue,
            NodePayload::GetParam(pid) => param_value(*pid)
                .cloned()
                .ok_or(EvalError::UnknownParam { node_index: i })?,
            NodePayload::Literal(bits) => bits.clone(),
            NodePayload::Poison => return Err(EvalError::PoisonValue { node_index: i }),
            NodePayload::Unop(op, arg) => {
                let arg = env[arg.index].as_ref().expect("operand evaluated");
                match op {
                    Unop::Not => {
                        let bools: Vec<bool> =
                            (0..arg.width()).map(|b| !arg.get_lsb(b)).collect();
                        Bits::from_lsb_bits(&bools)
                    }
                    Unop::Neg => {
                        if width > 128 {
                            return Err(EvalError::UnsupportedWidth {
                                node_index: i,
                                width,
                            });
                        }
                        let v = to_u128(arg, i)?;
                        bits_from_u128(v.wrapping_neg() & mask(width), width)
                    }
                    Unop::PopCount => {
                        bits_from_u128(arg.count_ones() as u128 & mask(width), width)
                    }
                }
            }
            NodePayload::Binop(op, lhs, rhs) => {
                let lhs = env[lhs.index].as_ref().expect("operand evaluated");
                let rhs = env[rhs.index].as_ref().expect("operand evaluated");
                match op {
                    Binop::Shll | Binop::Shrl | Binop::Shra => {
                        shift(*op, lhs, to_u128(rhs, i)?)
                    }
                    Binop::Add | Binop::Sub | Binop::Umul | Binop::Udiv | Binop::Umod => {
                        if width > 128 {
                            return Err(EvalError::UnsupportedWidth {
                                node_index: i,
                                width,
                            });
                        }
                        let a = to_u128(lhs, i)?;
                        let b = to_u128(rhs, i)?;
                        let raw = match op {
                            Binop::Add => a.wrapping_add(b),
                            Binop::Sub => a.wrapping_sub(b),
                            Binop::Umul => a.wrapping_mul(b),
                            // Division by zero yields all-ones, modulus by
                            // zero yields zero.
                            Binop::Udiv => {
                                if b == 0 {
                                    u128::MAX
                                } else {
                                    a / b
                                }
                            }
                            Binop::Umod => {
                                if b == 0 {
                                    0
                                } else {
                                    a % b
                                }
                            }
                            _ => unreachable!(),
                        };
                        bits_from_u128(raw & mask(width), width)
                    }
                    Binop::Eq | Binop::Ne | Binop::Ult | Binop::Ule | Binop::Ugt | Binop::Uge => {
                        let a = to_u128(lhs, i)?;
                        let b = to_u128(rhs, i)?;
                        let r = match op {
                            Binop::Eq => a == b,
                            Binop::Ne => a != b,
                            Binop::Ult => a < b,
                            Binop::Ule => a <= b,
                            Binop::Ugt => a > b,
                            Binop::Uge => a >= b,
                            _ => unreachable!(),
                        };
                        Bits::from_lsb_bits(&[r])
                    }
                }
            }
            NodePayload::Nary(op, elems) => {
                let values: Vec<Bits> = elems
                    .iter()
                    .map(|nr| env[nr.index].clone().expect("operand evaluated"))
                    .collect();
                bitwise(*op, &values)
            }
            NodePayload::ZeroExt { arg, new_bit_count } => {
                let arg = env[arg.index].as_ref().expect("operand evaluated");
                let bools: Vec<bool> = (0..*new_bit_count)
                    .map(|b| b < arg.width() && arg.get_lsb(b))
                    .collect();
                Bits::from_lsb_bits(&bools)
            }
            NodePayload::BitSlice { arg, start, width } => {
                let arg = env[arg.index].as_ref().expect("operand evaluated");
                let bools: Vec<bool> = (0..*width).map(|b| arg.get_lsb(start + b)).collect();
                Bits::from_lsb_bits(&bools)
            }
            NodePayload::Sel { selector, cases } => {
                let sel = env[selector.index].as_ref().expect("operand evaluated");
                let chosen = if sel.get_lsb(0) { cases[1] } else { cases[0] };
                env[chosen.index].clone().expect("operand evaluated")
            }
        };
        env[i] = Some(value);
    }

    let ret = f.ret_node_ref.ok_or(EvalError::MissingReturn)?;
    env[ret.index].clone().ok_or(EvalError::MissingReturn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir_builder::FnBuilder;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn b(value: u64, width: usize) -> Bits {
        Bits::from_u64(value, width).unwrap()
    }

    #[test]
    fn test_eval_add() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut fb = FnBuilder::new("adder");
        let x = fb.param("x", 8);
        let y = fb.param("y", 8);
        let r = fb.add(x, y, None);
        let f = fb.build_with_return_value(r).unwrap();
        assert_eq!(eval_fn(&f, &[b(0x0f, 8), b(0x01, 8)]).unwrap(), b(0x10, 8));
        // Wrapping.
        assert_eq!(eval_fn(&f, &[b(0xff, 8), b(0x01, 8)]).unwrap(), b(0x00, 8));
    }

    #[test]
    fn test_eval_div_mod_by_zero() {
        let mut fb = FnBuilder::new("div");
        let x = fb.param("x", 4);
        let y = fb.param("y", 4);
        let d = fb.udiv(x, y, None);
        let f = fb.build_with_return_value(d).unwrap();
        assert_eq!(eval_fn(&f, &[b(5, 4), b(0, 4)]).unwrap(), b(0xf, 4));

        let mut fb = FnBuilder::new("mod");
        let x = fb.param("x", 4);
        let y = fb.param("y", 4);
        let m = fb.umod(x, y, None);
        let f = fb.build_with_return_value(m).unwrap();
        assert_eq!(eval_fn(&f, &[b(5, 4), b(0, 4)]).unwrap(), b(0, 4));
        assert_eq!(eval_fn(&f, &[b(7, 4), b(4, 4)]).unwrap(), b(3, 4));
    }

    #[test]
    fn test_eval_popcount_low_bit() {
        let mut fb = FnBuilder::new("parity");
        let x = fb.param("x", 5);
        let pc = fb.popcount(x, None);
        let bit = fb.bit_slice(pc, 0, 1, None);
        let f = fb.build_with_return_value(bit).unwrap();
        assert_eq!(eval_fn(&f, &[b(0b10110, 5)]).unwrap(), b(1, 1));
        assert_eq!(eval_fn(&f, &[b(0b11110, 5)]).unwrap(), b(0, 1));
    }

    #[test_case(0b1011, 1, 0b0110; "shift in zeros")]
    #[test_case(0b1011, 5, 0b0000; "overshift clears")]
    fn test_eval_shll(value: u64, amount: u64, expected: u64) {
        let mut fb = FnBuilder::new("shifter");
        let x = fb.param("x", 4);
        let amt = fb.param("amt", 4);
        let r = fb.shll(x, amt, None);
        let f = fb.build_with_return_value(r).unwrap();
        assert_eq!(
            eval_fn(&f, &[b(value, 4), b(amount, 4)]).unwrap(),
            b(expected, 4)
        );
    }

    #[test]
    fn test_eval_shra_sign_fill() {
        let mut fb = FnBuilder::new("ashr");
        let x = fb.param("x", 4);
        let amt = fb.param("amt", 4);
        let r = fb.shra(x, amt, None);
        let f = fb.build_with_return_value(r).unwrap();
        assert_eq!(eval_fn(&f, &[b(0b1000, 4), b(2, 4)]).unwrap(), b(0b1110, 4));
        assert_eq!(eval_fn(&f, &[b(0b0100, 4), b(2, 4)]).unwrap(), b(0b0001, 4));
    }

    #[test]
    fn test_eval_select() {
        let mut fb = FnBuilder::new("mux");
        let s = fb.param("s", 1);
        let a = fb.param("a", 4);
        let c = fb.param("c", 4);
        let r = fb.select(s, a, c, None);
        let f = fb.build_with_return_value(r).unwrap();
        assert_eq!(eval_fn(&f, &[b(1, 1), b(3, 4), b(12, 4)]).unwrap(), b(3, 4));
        assert_eq!(eval_fn(&f, &[b(0, 1), b(3, 4), b(12, 4)]).unwrap(), b(12, 4));
    }

    #[test]
    fn test_eval_poison_reports() {
        let mut fb = FnBuilder::new("poisoned");
        let p = fb.poison(4, None);
        let f = fb.build_with_return_value(p).unwrap();
        assert!(matches!(
            eval_fn(&f, &[]),
            Err(EvalError::PoisonValue { .. })
        ));
    }

    #[test]
    fn test_eval_arg_mismatches() {
        let mut fb = FnBuilder::new("one_param");
        let x = fb.param("x", 4);
        let f = fb.build_with_return_value(x).unwrap();
        assert!(matches!(
            eval_fn(&f, &[]),
            Err(EvalError::ArgCountMismatch { .. })
        ));
        assert!(matches!(
            eval_fn(&f, &[b(0, 5)]),
            Err(EvalError::ArgWidthMismatch { .. })
        ));
    }
}
