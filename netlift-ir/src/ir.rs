// SPDX-License-Identifier: Apache-2.0

//! Core IR data model: types, nodes, functions, packages, and text emission.
//!
//! The IR is a pure dataflow form over flat bit vectors -- every value is
//! `bits[N]` for some `N`. Functions are node lists in definition order with a
//! designated return node, which makes both emission and evaluation a single
//! forward pass.

use crate::bits::Bits;

/// Strongly-typed wrapper for parameter IDs.
///
/// This is an ordinal into the dense parameter space of a function signature
/// (i.e. the Nth parameter), not a general node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(usize);

impl ParamId {
    /// Constructs a new ParamId, asserting that the id is greater than zero.
    pub fn new(id: usize) -> Self {
        assert!(id > 0, "ParamId must be greater than zero, got {}", id);
        ParamId(id)
    }

    pub fn get_wrapped_id(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Type {
    Bits(usize),
}

impl Type {
    pub fn bit_count(&self) -> usize {
        match self {
            Type::Bits(width) => *width,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bits(width) => write!(f, "bits[{}]", width),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binop {
    Add,
    Sub,

    Shll,
    Shrl,
    Shra,

    Eq,
    Ne,
    Uge,
    Ugt,
    Ult,
    Ule,

    Umul,
    Udiv,
    Umod,
}

pub fn operator_to_binop(operator: &str) -> Option<Binop> {
    match operator {
        "add" => Some(Binop::Add),
        "sub" => Some(Binop::Sub),
        "shll" => Some(Binop::Shll),
        "shrl" => Some(Binop::Shrl),
        "shra" => Some(Binop::Shra),
        "eq" => Some(Binop::Eq),
        "ne" => Some(Binop::Ne),
        "uge" => Some(Binop::Uge),
        "ugt" => Some(Binop::Ugt),
        "ult" => Some(Binop::Ult),
        "ule" => Some(Binop::Ule),
        "umul" => Some(Binop::Umul),
        "udiv" => Some(Binop::Udiv),
        "umod" => Some(Binop::Umod),
        _ => None,
    }
}

pub fn binop_to_operator(binop: Binop) -> &'static str {
    match binop {
        Binop::Add => "add",
        Binop::Sub => "sub",
        Binop::Shll => "shll",
        Binop::Shrl => "shrl",
        Binop::Shra => "shra",
        Binop::Eq => "eq",
        Binop::Ne => "ne",
        Binop::Uge => "uge",
        Binop::Ugt => "ugt",
        Binop::Ult => "ult",
        Binop::Ule => "ule",
        Binop::Umul => "umul",
        Binop::Udiv => "udiv",
        Binop::Umod => "umod",
    }
}

/// True for the comparison operators, whose result is always `bits[1]`.
pub fn binop_is_comparison(binop: Binop) -> bool {
    matches!(
        binop,
        Binop::Eq | Binop::Ne | Binop::Uge | Binop::Ugt | Binop::Ult | Binop::Ule
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unop {
    Not,
    Neg,
    PopCount,
}

pub fn operator_to_unop(operator: &str) -> Option<Unop> {
    match operator {
        "not" => Some(Unop::Not),
        "neg" => Some(Unop::Neg),
        "popcount" => Some(Unop::PopCount),
        _ => None,
    }
}

pub fn unop_to_operator(unop: Unop) -> &'static str {
    match unop {
        Unop::Not => "not",
        Unop::Neg => "neg",
        Unop::PopCount => "popcount",
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum NaryOp {
    And,
    Or,
    Xor,
}

pub fn operator_to_nary_op(operator: &str) -> Option<NaryOp> {
    match operator {
        "and" => Some(NaryOp::And),
        "or" => Some(NaryOp::Or),
        "xor" => Some(NaryOp::Xor),
        _ => None,
    }
}

pub fn nary_op_to_operator(nary_op: NaryOp) -> &'static str {
    match nary_op {
        NaryOp::And => "and",
        NaryOp::Or => "or",
        NaryOp::Xor => "xor",
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct NodeRef {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Nil,
    GetParam(ParamId),
    Literal(Bits),
    /// The IR's poison value; produced for X/Z netlist constants when the
    /// caller asks for poison instead of zero coercion.
    Poison,
    Unop(Unop, NodeRef),
    Binop(Binop, NodeRef, NodeRef),
    Nary(NaryOp, Vec<NodeRef>),
    ZeroExt {
        arg: NodeRef,
        new_bit_count: usize,
    },
    BitSlice {
        arg: NodeRef,
        start: usize,
        width: usize,
    },
    /// Two-way select; `cases[selector]` is the result, so `s ? a : b` is
    /// `Sel { selector: s, cases: [b, a] }`.
    Sel {
        selector: NodeRef,
        cases: [NodeRef; 2],
    },
}

impl NodePayload {
    pub fn get_operator(&self) -> &str {
        match self {
            NodePayload::Nil => "nil",
            NodePayload::GetParam(_) => "param",
            NodePayload::Literal(_) => "literal",
            NodePayload::Poison => "poison",
            NodePayload::Unop(op, _) => unop_to_operator(*op),
            NodePayload::Binop(op, _, _) => binop_to_operator(*op),
            NodePayload::Nary(op, _) => nary_op_to_operator(*op),
            NodePayload::ZeroExt { .. } => "zero_ext",
            NodePayload::BitSlice { .. } => "bit_slice",
            NodePayload::Sel { .. } => "sel",
        }
    }
}

/// Returns the operand node references of a payload, in order.
pub fn operands(payload: &NodePayload) -> Vec<NodeRef> {
    match payload {
        NodePayload::Nil
        | NodePayload::GetParam(_)
        | NodePayload::Literal(_)
        | NodePayload::Poison => vec![],
        NodePayload::Unop(_, arg) => vec![*arg],
        NodePayload::Binop(_, lhs, rhs) => vec![*lhs, *rhs],
        NodePayload::Nary(_, elems) => elems.clone(),
        NodePayload::ZeroExt { arg, .. } => vec![*arg],
        NodePayload::BitSlice { arg, .. } => vec![*arg],
        NodePayload::Sel { selector, cases } => vec![*selector, cases[0], cases[1]],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub text_id: usize,
    pub name: Option<String>,
    pub ty: Type,
    pub payload: NodePayload,
}

impl Node {
    /// Reference name used when this node appears as an operand of another.
    pub fn operand_name(&self) -> String {
        match &self.payload {
            NodePayload::GetParam(_) => self
                .name
                .clone()
                .expect("GetParam node should have a name"),
            _ => match &self.name {
                Some(name) => name.clone(),
                None => format!("{}.{}", self.payload.get_operator(), self.text_id),
            },
        }
    }

    /// Renders the node as an IR text line body, or None for nodes that do
    /// not get a body line of their own (params, nil).
    pub fn to_string(&self, f: &Fn) -> Option<String> {
        let get_name = |node_ref: NodeRef| -> String { f.get_node(node_ref).operand_name() };
        let id = self.text_id;
        let payload_str = match &self.payload {
            NodePayload::Nil | NodePayload::GetParam(_) => return None,
            NodePayload::Literal(value) => format!("literal(value={}, id={})", value, id),
            NodePayload::Poison => format!("poison(id={})", id),
            NodePayload::Unop(op, arg) => {
                format!("{}({}, id={})", unop_to_operator(*op), get_name(*arg), id)
            }
            NodePayload::Binop(op, lhs, rhs) => format!(
                "{}({}, {}, id={})",
                binop_to_operator(*op),
                get_name(*lhs),
                get_name(*rhs),
                id
            ),
            NodePayload::Nary(op, elems) => format!(
                "{}({}, id={})",
                nary_op_to_operator(*op),
                elems
                    .iter()
                    .map(|n| get_name(*n))
                    .collect::<Vec<String>>()
                    .join(", "),
                id
            ),
            NodePayload::ZeroExt { arg, new_bit_count } => format!(
                "zero_ext({}, new_bit_count={}, id={})",
                get_name(*arg),
                new_bit_count,
                id
            ),
            NodePayload::BitSlice { arg, start, width } => format!(
                "bit_slice({}, start={}, width={}, id={})",
                get_name(*arg),
                start,
                width,
                id
            ),
            NodePayload::Sel { selector, cases } => format!(
                "sel({}, cases=[{}, {}], id={})",
                get_name(*selector),
                get_name(cases[0]),
                get_name(cases[1]),
                id
            ),
        };
        Some(format!("{}: {} = {}", self.operand_name(), self.ty, payload_str))
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub id: ParamId,
}

#[derive(Debug, PartialEq)]
pub struct FunctionType {
    pub param_types: Vec<Type>,
    pub return_type: Type,
}

#[derive(Debug, Clone)]
pub struct Fn {
    pub name: String,
    pub params: Vec<Param>,
    pub ret_ty: Type,
    pub nodes: Vec<Node>,
    pub ret_node_ref: Option<NodeRef>,
}

impl Fn {
    pub fn get_type(&self) -> FunctionType {
        FunctionType {
            param_types: self.params.iter().map(|p| p.ty.clone()).collect(),
            return_type: self.ret_ty.clone(),
        }
    }

    pub fn node_refs(&self) -> Vec<NodeRef> {
        (0..self.nodes.len()).map(|i| NodeRef { index: i }).collect()
    }

    pub fn get_node(&self, node_ref: NodeRef) -> &Node {
        &self.nodes[node_ref.index]
    }

    pub fn get_node_ty(&self, node_ref: NodeRef) -> &Type {
        &self.get_node(node_ref).ty
    }
}

fn append_emitted_node_line(out: &mut String, func: &Fn, node_ref: NodeRef) {
    let node = func.get_node(node_ref);
    let is_ret = func.ret_node_ref == Some(node_ref);

    match &node.payload {
        NodePayload::GetParam(pid) if is_ret => {
            // A function that just returns a parameter still needs a body
            // line for the return.
            let name = node.name.as_deref().unwrap_or("<unnamed>");
            out.push_str(&format!(
                "  ret {}: {} = param(name={}, id={})\n",
                name,
                node.ty,
                name,
                pid.get_wrapped_id()
            ));
        }
        _ => {
            let Some(node_str) = node.to_string(func) else {
                return;
            };
            out.push_str("  ");
            if is_ret {
                out.push_str("ret ");
            }
            out.push_str(&node_str);
            out.push('\n');
        }
    }
}

/// Emits a function as IR text.
pub fn emit_fn(func: &Fn, is_top: bool) -> String {
    let mut out = String::new();
    let params_str = func
        .params
        .iter()
        .map(|p| format!("{}: {} id={}", p.name, p.ty, p.id.get_wrapped_id()))
        .collect::<Vec<String>>()
        .join(", ");
    if is_top {
        out.push_str("top ");
    }
    out.push_str(&format!(
        "fn {}({}) -> {} {{\n",
        func.name, params_str, func.ret_ty
    ));

    for (i, _node) in func.nodes.iter().enumerate() {
        append_emitted_node_line(&mut out, func, NodeRef { index: i });
    }

    out.push('}');
    out
}

impl std::fmt::Display for Fn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", emit_fn(self, /* is_top= */ false))
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub members: Vec<Fn>,
    pub top: Option<String>,
}

impl Package {
    pub fn get_fn(&self, name: &str) -> Option<&Fn> {
        self.members.iter().find(|f| f.name == name)
    }

    pub fn get_top(&self) -> Option<&Fn> {
        self.top.as_ref().and_then(|name| self.get_fn(name))
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "package {}\n\n", self.name)?;
        for (i, func) in self.members.iter().enumerate() {
            let is_top = self.top.as_deref() == Some(func.name.as_str());
            write!(f, "{}", emit_fn(func, is_top))?;
            if i + 1 < self.members.len() {
                write!(f, "\n\n")?;
            } else {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tables_round_trip() {
        for op in [
            Binop::Add,
            Binop::Sub,
            Binop::Shll,
            Binop::Shrl,
            Binop::Shra,
            Binop::Eq,
            Binop::Ne,
            Binop::Uge,
            Binop::Ugt,
            Binop::Ult,
            Binop::Ule,
            Binop::Umul,
            Binop::Udiv,
            Binop::Umod,
        ] {
            assert_eq!(operator_to_binop(binop_to_operator(op)), Some(op));
        }
        for op in [Unop::Not, Unop::Neg, Unop::PopCount] {
            assert_eq!(operator_to_unop(unop_to_operator(op)), Some(op));
        }
        for op in [NaryOp::And, NaryOp::Or, NaryOp::Xor] {
            assert_eq!(operator_to_nary_op(nary_op_to_operator(op)), Some(op));
        }
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Bits(8).to_string(), "bits[8]");
        assert_eq!(Type::Bits(8).bit_count(), 8);
    }
}
