// SPDX-License-Identifier: Apache-2.0

//! Builder for constructing `Fn` values node by node.
//!
//! Construction-time width requirements are programmer contracts and are
//! enforced with assertions; the structural verifier in `ir_validate` is the
//! backstop for anything assembled by other means.

use crate::bits::Bits;
use crate::ir::{
    binop_is_comparison, Binop, Fn, NaryOp, Node, NodePayload, NodeRef, Param, ParamId, Type, Unop,
};

pub struct FnBuilder {
    name: String,
    params: Vec<Param>,
    nodes: Vec<Node>,
    next_text_id: usize,
}

impl FnBuilder {
    pub fn new(name: &str) -> Self {
        // Index 0 is a reserved Nil node so that a NodeRef of 0 is never a
        // real value; text ids start at 1.
        FnBuilder {
            name: name.to_string(),
            params: Vec::new(),
            nodes: vec![Node {
                text_id: 0,
                name: None,
                ty: Type::Bits(0),
                payload: NodePayload::Nil,
            }],
            next_text_id: 1,
        }
    }

    fn add_node(&mut self, name: Option<&str>, ty: Type, payload: NodePayload) -> NodeRef {
        let text_id = self.next_text_id;
        self.next_text_id += 1;
        self.nodes.push(Node {
            text_id,
            name: name.map(sanitize_name),
            ty,
            payload,
        });
        NodeRef {
            index: self.nodes.len() - 1,
        }
    }

    pub fn width(&self, node_ref: NodeRef) -> usize {
        self.nodes[node_ref.index].ty.bit_count()
    }

    pub fn get_type(&self, node_ref: NodeRef) -> Type {
        self.nodes[node_ref.index].ty.clone()
    }

    pub fn payload(&self, node_ref: NodeRef) -> &NodePayload {
        &self.nodes[node_ref.index].payload
    }

    /// Returns the literal payload of the node if it is one.
    pub fn as_literal(&self, node_ref: NodeRef) -> Option<&Bits> {
        match self.payload(node_ref) {
            NodePayload::Literal(bits) => Some(bits),
            _ => None,
        }
    }

    pub fn param(&mut self, name: &str, width: usize) -> NodeRef {
        let text_id = self.next_text_id;
        let id = ParamId::new(text_id);
        self.params.push(Param {
            name: sanitize_name(name),
            ty: Type::Bits(width),
            id,
        });
        self.add_node(Some(name), Type::Bits(width), NodePayload::GetParam(id))
    }

    pub fn literal(&mut self, value: Bits, name: Option<&str>) -> NodeRef {
        let ty = Type::Bits(value.width());
        self.add_node(name, ty, NodePayload::Literal(value))
    }

    pub fn zero(&mut self, width: usize) -> NodeRef {
        self.literal(Bits::zero(width), None)
    }

    pub fn ones(&mut self, width: usize) -> NodeRef {
        self.literal(Bits::ones(width), None)
    }

    pub fn poison(&mut self, width: usize, name: Option<&str>) -> NodeRef {
        self.add_node(name, Type::Bits(width), NodePayload::Poison)
    }

    fn unop(&mut self, op: Unop, arg: NodeRef, name: Option<&str>) -> NodeRef {
        let ty = self.get_type(arg);
        self.add_node(name, ty, NodePayload::Unop(op, arg))
    }

    pub fn not(&mut self, arg: NodeRef, name: Option<&str>) -> NodeRef {
        self.unop(Unop::Not, arg, name)
    }

    pub fn neg(&mut self, arg: NodeRef, name: Option<&str>) -> NodeRef {
        self.unop(Unop::Neg, arg, name)
    }

    /// Population count; the result keeps the operand width.
    pub fn popcount(&mut self, arg: NodeRef, name: Option<&str>) -> NodeRef {
        self.unop(Unop::PopCount, arg, name)
    }

    fn binop(&mut self, op: Binop, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        let lhs_width = self.width(lhs);
        match op {
            // Shift amounts may have any width; the result keeps the
            // left-operand width.
            Binop::Shll | Binop::Shrl | Binop::Shra => {}
            _ => {
                assert_eq!(
                    lhs_width,
                    self.width(rhs),
                    "operand width mismatch for {:?}",
                    op
                );
            }
        }
        let ty = if binop_is_comparison(op) {
            Type::Bits(1)
        } else {
            Type::Bits(lhs_width)
        };
        self.add_node(name, ty, NodePayload::Binop(op, lhs, rhs))
    }

    pub fn add(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Add, lhs, rhs, name)
    }

    pub fn sub(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Sub, lhs, rhs, name)
    }

    pub fn umul(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Umul, lhs, rhs, name)
    }

    pub fn udiv(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Udiv, lhs, rhs, name)
    }

    pub fn umod(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Umod, lhs, rhs, name)
    }

    pub fn shll(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Shll, lhs, rhs, name)
    }

    pub fn shrl(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Shrl, lhs, rhs, name)
    }

    pub fn shra(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Shra, lhs, rhs, name)
    }

    pub fn eq(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Eq, lhs, rhs, name)
    }

    pub fn ne(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Ne, lhs, rhs, name)
    }

    pub fn ult(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Ult, lhs, rhs, name)
    }

    pub fn ule(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Ule, lhs, rhs, name)
    }

    pub fn ugt(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Ugt, lhs, rhs, name)
    }

    pub fn uge(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.binop(Binop::Uge, lhs, rhs, name)
    }

    fn nary(&mut self, op: NaryOp, elems: &[NodeRef], name: Option<&str>) -> NodeRef {
        assert!(!elems.is_empty(), "n-ary {:?} requires at least one operand", op);
        let width = self.width(elems[0]);
        for e in elems.iter().skip(1) {
            assert_eq!(width, self.width(*e), "operand width mismatch for {:?}", op);
        }
        self.add_node(name, Type::Bits(width), NodePayload::Nary(op, elems.to_vec()))
    }

    pub fn and(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.nary(NaryOp::And, &[lhs, rhs], name)
    }

    pub fn or(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.nary(NaryOp::Or, &[lhs, rhs], name)
    }

    pub fn xor(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        self.nary(NaryOp::Xor, &[lhs, rhs], name)
    }

    /// `selector ? on_true : on_false`; the selector must be one bit wide.
    pub fn select(
        &mut self,
        selector: NodeRef,
        on_true: NodeRef,
        on_false: NodeRef,
        name: Option<&str>,
    ) -> NodeRef {
        assert_eq!(self.width(selector), 1, "select requires a 1-bit selector");
        assert_eq!(
            self.width(on_true),
            self.width(on_false),
            "select case width mismatch"
        );
        let ty = self.get_type(on_true);
        self.add_node(
            name,
            ty,
            NodePayload::Sel {
                selector,
                cases: [on_false, on_true],
            },
        )
    }

    pub fn zero_ext(&mut self, arg: NodeRef, new_bit_count: usize, name: Option<&str>) -> NodeRef {
        assert!(
            new_bit_count >= self.width(arg),
            "zero_ext target width {} below operand width {}",
            new_bit_count,
            self.width(arg)
        );
        self.add_node(
            name,
            Type::Bits(new_bit_count),
            NodePayload::ZeroExt {
                arg,
                new_bit_count,
            },
        )
    }

    pub fn bit_slice(
        &mut self,
        arg: NodeRef,
        start: usize,
        width: usize,
        name: Option<&str>,
    ) -> NodeRef {
        assert!(
            start + width <= self.width(arg),
            "bit_slice [{}, {}) out of range for width {}",
            start,
            start + width,
            self.width(arg)
        );
        self.add_node(
            name,
            Type::Bits(width),
            NodePayload::BitSlice { arg, start, width },
        )
    }

    /// The combined width adjuster: widens with `zero_ext`, narrows with a
    /// low `bit_slice`, and is a no-op at equal width.
    pub fn zext_or_trunc(
        &mut self,
        arg: NodeRef,
        new_bit_count: usize,
        name: Option<&str>,
    ) -> NodeRef {
        let width = self.width(arg);
        if new_bit_count == width {
            arg
        } else if new_bit_count > width {
            self.zero_ext(arg, new_bit_count, name)
        } else {
            self.bit_slice(arg, 0, new_bit_count, name)
        }
    }

    pub fn build_with_return_value(self, ret: NodeRef) -> Result<Fn, String> {
        if ret.index >= self.nodes.len() {
            return Err(format!(
                "return node index {} out of bounds ({} nodes)",
                ret.index,
                self.nodes.len()
            ));
        }
        let ret_ty = self.nodes[ret.index].ty.clone();
        Ok(Fn {
            name: self.name,
            params: self.params,
            ret_ty,
            nodes: self.nodes,
            ret_node_ref: Some(ret),
        })
    }
}

/// IR text names are identifier-shaped; anything else becomes an underscore.
fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if i == 0 && ch.is_ascii_digit() {
                out.push('_');
            }
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_and_emit_simple_and() {
        let mut fb = FnBuilder::new("do_and");
        let a = fb.param("a", 1);
        let b = fb.param("b", 1);
        let r = fb.and(a, b, None);
        let f = fb.build_with_return_value(r).unwrap();
        assert_eq!(
            f.to_string(),
            "fn do_and(a: bits[1] id=1, b: bits[1] id=2) -> bits[1] {\n  ret and.3: bits[1] = and(a, b, id=3)\n}"
        );
    }

    #[test]
    fn test_param_passthrough_emission() {
        let mut fb = FnBuilder::new("ident");
        let a = fb.param("a", 4);
        let f = fb.build_with_return_value(a).unwrap();
        assert_eq!(
            f.to_string(),
            "fn ident(a: bits[4] id=1) -> bits[4] {\n  ret a: bits[4] = param(name=a, id=1)\n}"
        );
    }

    #[test]
    fn test_zext_or_trunc() {
        let mut fb = FnBuilder::new("widths");
        let a = fb.param("a", 4);
        assert_eq!(fb.zext_or_trunc(a, 4, None), a);
        let wide = fb.zext_or_trunc(a, 8, None);
        assert_eq!(fb.width(wide), 8);
        let narrow = fb.zext_or_trunc(a, 2, None);
        assert_eq!(fb.width(narrow), 2);
    }

    #[test]
    fn test_comparison_is_one_bit() {
        let mut fb = FnBuilder::new("cmp");
        let a = fb.param("a", 8);
        let b = fb.param("b", 8);
        let r = fb.ult(a, b, None);
        assert_eq!(fb.width(r), 1);
    }

    #[test]
    #[should_panic]
    fn test_mismatched_and_panics() {
        let mut fb = FnBuilder::new("bad");
        let a = fb.param("a", 8);
        let b = fb.param("b", 4);
        fb.and(a, b, None);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("a[3:0]"), "a_3_0_");
        assert_eq!(sanitize_name("3x"), "_3x");
        assert_eq!(sanitize_name(""), "_");
    }
}
