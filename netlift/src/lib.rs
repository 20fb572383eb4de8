// SPDX-License-Identifier: Apache-2.0

//! Lifts a combinational (already-unrolled) netlist into a pure function in
//! a typed IR.
//!
//! The pipeline: a [`netlist::Module`] describes wires, cells, and
//! assignments; [`driver::DriverIndex`] answers "what produces this bit";
//! [`lift::lift_wire`] walks the fan-in cone of a target wire and emits a
//! function whose parameters are the module's input ports and whose return
//! value reproduces the combinational function of the wire.

pub mod driver;
pub mod error;
pub mod lift;
pub mod netlist;
pub mod sig;
