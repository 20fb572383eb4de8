// SPDX-License-Identifier: Apache-2.0

//! Input-netlist error taxonomy.
//!
//! These are errors in the netlist handed to us, reported with the offending
//! wire/cell name. Programmer contract violations (width accounting,
//! invariant breaches) are assertions instead and abort.

use netlift_ir::ir_validate::ValidationError;

#[derive(Debug)]
pub enum LiftError {
    /// A cell names a kind outside the supported combinational set.
    UnsupportedCell { cell: String, kind: String },
    /// The lift target is not an output port of the module.
    TargetNotOutput { wire: String },
    /// A wire bit has more than one producer.
    MultipleDrivers { wire: String, bit: usize },
    /// A non-input wire bit has no producer.
    NoDriver { wire: String, bit: usize },
    /// A cell output or assignment left-hand side is wired to a constant.
    ConstDriven { name: String },
    /// The combinational graph (cells or assignment chains) loops.
    CombinationalCycle { name: String },
    /// A cell is missing a port connection its kind requires.
    MissingPort { cell: String, port: &'static str },
    /// A port width disagrees with the declared parameters beyond what
    /// max-normalization tolerates.
    WidthMismatch {
        cell: String,
        port: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The emitted function failed structural verification.
    Validation(ValidationError),
}

impl std::fmt::Display for LiftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiftError::UnsupportedCell { cell, kind } => {
                write!(f, "cell '{}' has unsupported type {}", cell, kind)
            }
            LiftError::TargetNotOutput { wire } => {
                write!(f, "lift target '{}' is not an output port", wire)
            }
            LiftError::MultipleDrivers { wire, bit } => {
                write!(f, "wire '{}' bit {} has multiple drivers", wire, bit)
            }
            LiftError::NoDriver { wire, bit } => {
                write!(f, "wire '{}' bit {} has no driver", wire, bit)
            }
            LiftError::ConstDriven { name } => {
                write!(f, "'{}' drives a constant bit", name)
            }
            LiftError::CombinationalCycle { name } => {
                write!(f, "combinational cycle through '{}'", name)
            }
            LiftError::MissingPort { cell, port } => {
                write!(f, "cell '{}' is missing port {}", cell, port)
            }
            LiftError::WidthMismatch {
                cell,
                port,
                expected,
                actual,
            } => write!(
                f,
                "cell '{}' port {} has width {}, expected {}",
                cell, port, actual, expected
            ),
            LiftError::Validation(err) => write!(f, "emitted function is malformed: {}", err),
        }
    }
}

impl std::error::Error for LiftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LiftError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LiftError {
    fn from(err: ValidationError) -> Self {
        LiftError::Validation(err)
    }
}
