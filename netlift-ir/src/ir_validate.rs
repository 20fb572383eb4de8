// SPDX-License-Identifier: Apache-2.0

//! Structural validation for IR packages and functions.

use std::collections::{HashMap, HashSet};

use crate::ir::{binop_is_comparison, operands, Fn, NodePayload, Package, Type};

/// Errors that can arise during validation of IR structures.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Two package members share the same name.
    DuplicateMemberName(String),
    /// The `top` attribute references a missing function.
    MissingTopFunction(String),
    /// A node references an undefined operand (index out of bounds).
    OperandOutOfBounds {
        func: String,
        node_index: usize,
        operand: usize,
    },
    /// A node references an operand defined after the node.
    OperandUsesUndefined {
        func: String,
        node_index: usize,
        operand: usize,
    },
    /// A function's return node is missing.
    MissingReturnNode(String),
    /// A function's declared return type doesn't match the return node type.
    ReturnTypeMismatch {
        func: String,
        expected: Type,
        actual: Type,
    },
    /// A node's text id is not unique within the function.
    DuplicateTextId { func: String, text_id: usize },
    /// A parameter node's id does not match its declared parameter id.
    ParamIdMismatch {
        func: String,
        param_name: String,
        expected: usize,
        actual: usize,
    },
    /// Two parameters share the same name within a function.
    DuplicateParamName { func: String, param_name: String },
    /// A parameter declared in the signature has no GetParam node.
    MissingParamNode {
        func: String,
        param_name: String,
        expected_id: usize,
    },
    /// A GetParam node does not correspond to any declared parameter.
    ExtraParamNode { func: String, text_id: usize },
    /// A node's declared type disagrees with what its payload produces.
    NodeTypeMismatch {
        func: String,
        node_index: usize,
        expected: Type,
        actual: Type,
    },
    /// Operands of an n-ary bitwise op or arithmetic binop differ in type.
    OperandTypeMismatch { func: String, node_index: usize },
    /// A bit slice reaches past the end of its operand.
    SliceOutOfRange { func: String, node_index: usize },
    /// A zero-extension narrows its operand.
    ExtensionNarrows { func: String, node_index: usize },
    /// A select node's selector is not one bit wide.
    SelectorNotSingleBit { func: String, node_index: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::DuplicateMemberName(name) => {
                write!(f, "duplicate member name '{}'", name)
            }
            ValidationError::MissingTopFunction(name) => {
                write!(f, "top function '{}' not found", name)
            }
            ValidationError::OperandOutOfBounds {
                func,
                node_index,
                operand,
            } => write!(
                f,
                "function '{}' node {} references operand {} out of bounds",
                func, node_index, operand
            ),
            ValidationError::OperandUsesUndefined {
                func,
                node_index,
                operand,
            } => write!(
                f,
                "function '{}' node {} uses operand {} before definition",
                func, node_index, operand
            ),
            ValidationError::MissingReturnNode(func) => {
                write!(f, "function '{}' missing return node", func)
            }
            ValidationError::ReturnTypeMismatch {
                func,
                expected,
                actual,
            } => write!(
                f,
                "function '{}' return type mismatch: expected {}, got {}",
                func, expected, actual
            ),
            ValidationError::DuplicateTextId { func, text_id } => {
                write!(f, "function '{}' has duplicate text id {}", func, text_id)
            }
            ValidationError::ParamIdMismatch {
                func,
                param_name,
                expected,
                actual,
            } => write!(
                f,
                "function '{}' param '{}' id mismatch: expected {}, got {}",
                func, param_name, expected, actual
            ),
            ValidationError::DuplicateParamName { func, param_name } => write!(
                f,
                "function '{}' has duplicate param name '{}'",
                func, param_name
            ),
            ValidationError::MissingParamNode {
                func,
                param_name,
                expected_id,
            } => write!(
                f,
                "function '{}' missing GetParam node for param '{}' (expected id={})",
                func, param_name, expected_id
            ),
            ValidationError::ExtraParamNode { func, text_id } => write!(
                f,
                "function '{}' has GetParam node with id {} not declared in signature",
                func, text_id
            ),
            ValidationError::NodeTypeMismatch {
                func,
                node_index,
                expected,
                actual,
            } => write!(
                f,
                "function '{}' node {} type mismatch: expected {}, got {}",
                func, node_index, expected, actual
            ),
            ValidationError::OperandTypeMismatch { func, node_index } => write!(
                f,
                "function '{}' node {} has mismatched operand types",
                func, node_index
            ),
            ValidationError::SliceOutOfRange { func, node_index } => write!(
                f,
                "function '{}' node {} slices past the end of its operand",
                func, node_index
            ),
            ValidationError::ExtensionNarrows { func, node_index } => write!(
                f,
                "function '{}' node {} zero-extends to a narrower width",
                func, node_index
            ),
            ValidationError::SelectorNotSingleBit { func, node_index } => write!(
                f,
                "function '{}' node {} has a selector that is not one bit wide",
                func, node_index
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates an entire package: unique member names, a resolvable top, and
/// every contained function.
pub fn validate_package(p: &Package) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for func in &p.members {
        if !names.insert(func.name.clone()) {
            return Err(ValidationError::DuplicateMemberName(func.name.clone()));
        }
    }

    if let Some(top) = &p.top {
        if !names.contains(top) {
            return Err(ValidationError::MissingTopFunction(top.clone()));
        }
    }

    for func in &p.members {
        validate_fn(func)?;
    }

    Ok(())
}

/// Returns the type a payload must produce given the function context, or
/// None for payloads whose type is free-standing (literals carry their own
/// width, params their declared type).
fn deduced_ty(f: &Fn, node_index: usize) -> Option<Type> {
    let payload = &f.nodes[node_index].payload;
    match payload {
        NodePayload::Nil
        | NodePayload::GetParam(_)
        | NodePayload::Literal(_)
        | NodePayload::Poison => None,
        NodePayload::Unop(_, arg) => Some(f.get_node(*arg).ty.clone()),
        NodePayload::Binop(op, lhs, _) => {
            if binop_is_comparison(*op) {
                Some(Type::Bits(1))
            } else {
                Some(f.get_node(*lhs).ty.clone())
            }
        }
        NodePayload::Nary(_, elems) => Some(f.get_node(elems[0]).ty.clone()),
        NodePayload::ZeroExt { new_bit_count, .. } => Some(Type::Bits(*new_bit_count)),
        NodePayload::BitSlice { width, .. } => Some(Type::Bits(*width)),
        NodePayload::Sel { cases, .. } => Some(f.get_node(cases[0]).ty.clone()),
    }
}

/// Validates a single function.
pub fn validate_fn(f: &Fn) -> Result<(), ValidationError> {
    let mut seen_nonparam_ids: HashSet<usize> = HashSet::new();
    let mut seen_param_ids: HashSet<usize> = HashSet::new();
    let mut param_name_to_id: HashMap<&str, usize> = HashMap::new();
    for p in &f.params {
        let name = p.name.as_str();
        if param_name_to_id.contains_key(name) {
            return Err(ValidationError::DuplicateParamName {
                func: f.name.clone(),
                param_name: p.name.clone(),
            });
        }
        param_name_to_id.insert(name, p.id.get_wrapped_id());
    }

    for (i, node) in f.nodes.iter().enumerate() {
        match &node.payload {
            NodePayload::Nil => continue,
            NodePayload::GetParam(pid) => {
                let actual_pid = pid.get_wrapped_id();
                let declared = node
                    .name
                    .as_ref()
                    .and_then(|n| param_name_to_id.get(n.as_str()))
                    .copied();
                match declared {
                    None => {
                        return Err(ValidationError::ExtraParamNode {
                            func: f.name.clone(),
                            text_id: node.text_id,
                        });
                    }
                    Some(declared) if actual_pid != declared || node.text_id != declared => {
                        return Err(ValidationError::ParamIdMismatch {
                            func: f.name.clone(),
                            param_name: node.name.clone().unwrap_or_default(),
                            expected: declared,
                            actual: node.text_id,
                        });
                    }
                    Some(_) => {}
                }
                if !seen_param_ids.insert(actual_pid) {
                    return Err(ValidationError::DuplicateTextId {
                        func: f.name.clone(),
                        text_id: actual_pid,
                    });
                }
            }
            _ => {
                if !seen_nonparam_ids.insert(node.text_id)
                    || seen_param_ids.contains(&node.text_id)
                {
                    return Err(ValidationError::DuplicateTextId {
                        func: f.name.clone(),
                        text_id: node.text_id,
                    });
                }
            }
        }

        // Operands must refer to already-defined nodes.
        for op in operands(&node.payload) {
            if op.index >= f.nodes.len() {
                return Err(ValidationError::OperandOutOfBounds {
                    func: f.name.clone(),
                    node_index: i,
                    operand: op.index,
                });
            }
            if op.index >= i {
                return Err(ValidationError::OperandUsesUndefined {
                    func: f.name.clone(),
                    node_index: i,
                    operand: op.index,
                });
            }
        }

        // Payload-specific shape checks.
        match &node.payload {
            NodePayload::Nary(_, elems) => {
                let first_ty = f.get_node(elems[0]).ty.clone();
                for nr in elems.iter().skip(1) {
                    if f.get_node(*nr).ty != first_ty {
                        return Err(ValidationError::OperandTypeMismatch {
                            func: f.name.clone(),
                            node_index: i,
                        });
                    }
                }
            }
            NodePayload::Binop(op, lhs, rhs) => {
                let needs_equal_widths = !matches!(op, crate::ir::Binop::Shll
                    | crate::ir::Binop::Shrl
                    | crate::ir::Binop::Shra);
                if needs_equal_widths && f.get_node(*lhs).ty != f.get_node(*rhs).ty {
                    return Err(ValidationError::OperandTypeMismatch {
                        func: f.name.clone(),
                        node_index: i,
                    });
                }
            }
            NodePayload::BitSlice { arg, start, width } => {
                if start + width > f.get_node(*arg).ty.bit_count() {
                    return Err(ValidationError::SliceOutOfRange {
                        func: f.name.clone(),
                        node_index: i,
                    });
                }
            }
            NodePayload::ZeroExt { arg, new_bit_count } => {
                if *new_bit_count < f.get_node(*arg).ty.bit_count() {
                    return Err(ValidationError::ExtensionNarrows {
                        func: f.name.clone(),
                        node_index: i,
                    });
                }
            }
            NodePayload::Sel { selector, cases } => {
                if f.get_node(*selector).ty.bit_count() != 1 {
                    return Err(ValidationError::SelectorNotSingleBit {
                        func: f.name.clone(),
                        node_index: i,
                    });
                }
                if f.get_node(cases[0]).ty != f.get_node(cases[1]).ty {
                    return Err(ValidationError::OperandTypeMismatch {
                        func: f.name.clone(),
                        node_index: i,
                    });
                }
            }
            _ => {}
        }

        if let Some(expected) = deduced_ty(f, i) {
            if expected != node.ty {
                return Err(ValidationError::NodeTypeMismatch {
                    func: f.name.clone(),
                    node_index: i,
                    expected,
                    actual: node.ty.clone(),
                });
            }
        }
    }

    // Every declared parameter needs a corresponding GetParam node.
    for p in &f.params {
        let pid = p.id.get_wrapped_id();
        if !seen_param_ids.contains(&pid) {
            return Err(ValidationError::MissingParamNode {
                func: f.name.clone(),
                param_name: p.name.clone(),
                expected_id: pid,
            });
        }
    }

    let ret_node_ref = f
        .ret_node_ref
        .ok_or_else(|| ValidationError::MissingReturnNode(f.name.clone()))?;
    let ret_node = f.get_node(ret_node_ref);
    if ret_node.ty != f.ret_ty {
        return Err(ValidationError::ReturnTypeMismatch {
            func: f.name.clone(),
            expected: f.ret_ty.clone(),
            actual: ret_node.ty.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Node, NodeRef, Package};
    use crate::ir_builder::FnBuilder;

    fn simple_fn() -> Fn {
        let mut fb = FnBuilder::new("foo");
        let x = fb.param("x", 1);
        let r = fb.add(x, x, None);
        fb.build_with_return_value(r).unwrap()
    }

    #[test]
    fn validate_package_ok() {
        let pkg = Package {
            name: "test".to_string(),
            members: vec![simple_fn()],
            top: Some("foo".to_string()),
        };
        validate_package(&pkg).unwrap();
    }

    #[test]
    fn missing_top_fails() {
        let pkg = Package {
            name: "test".to_string(),
            members: vec![simple_fn()],
            top: Some("bar".to_string()),
        };
        assert!(matches!(
            validate_package(&pkg),
            Err(ValidationError::MissingTopFunction(_))
        ));
    }

    #[test]
    fn undefined_operand_fails() {
        let mut f = simple_fn();
        // Make the add node reference itself.
        let self_ref = NodeRef {
            index: f.nodes.len() - 1,
        };
        if let NodePayload::Binop(_, ref mut a, _) = f.nodes.last_mut().unwrap().payload {
            *a = self_ref;
        }
        assert!(matches!(
            validate_fn(&f),
            Err(ValidationError::OperandUsesUndefined { .. })
        ));
    }

    #[test]
    fn return_type_mismatch_fails() {
        let mut f = simple_fn();
        f.ret_ty = Type::Bits(2);
        assert!(matches!(
            validate_fn(&f),
            Err(ValidationError::ReturnTypeMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_text_id_fails() {
        let mut f = simple_fn();
        let dup = f.nodes.last().unwrap().clone();
        f.nodes.push(dup);
        assert!(matches!(
            validate_fn(&f),
            Err(ValidationError::DuplicateTextId { .. })
        ));
    }

    #[test]
    fn extra_param_node_fails() {
        let mut f = simple_fn();
        f.nodes.push(Node {
            text_id: 9,
            name: Some("ghost".to_string()),
            ty: Type::Bits(1),
            payload: NodePayload::GetParam(crate::ir::ParamId::new(9)),
        });
        assert!(matches!(
            validate_fn(&f),
            Err(ValidationError::ExtraParamNode { .. })
        ));
    }

    #[test]
    fn missing_param_node_fails() {
        let mut f = simple_fn();
        let idx = f
            .nodes
            .iter()
            .position(|n| matches!(n.payload, NodePayload::GetParam(_)))
            .unwrap();
        f.nodes[idx].payload = NodePayload::Nil;
        let err = validate_fn(&f).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingParamNode { .. } | ValidationError::OperandUsesUndefined { .. }
        ));
    }

    #[test]
    fn node_type_mismatch_fails() {
        let mut f = simple_fn();
        f.nodes.last_mut().unwrap().ty = Type::Bits(7);
        assert!(matches!(
            validate_fn(&f),
            Err(ValidationError::NodeTypeMismatch { .. })
        ));
    }

    #[test]
    fn slice_out_of_range_fails() {
        let mut fb = FnBuilder::new("slice");
        let x = fb.param("x", 4);
        let s = fb.bit_slice(x, 0, 2, None);
        let mut f = fb.build_with_return_value(s).unwrap();
        if let NodePayload::BitSlice { ref mut start, .. } = f.nodes.last_mut().unwrap().payload {
            *start = 3;
        }
        assert!(matches!(
            validate_fn(&f),
            Err(ValidationError::SliceOutOfRange { .. })
        ));
    }
}
