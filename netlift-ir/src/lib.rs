// SPDX-License-Identifier: Apache-2.0

//! Functionality that is purely related to the target IR: representing,
//! building, emitting, validating and evaluating it.

pub mod bits;
pub mod ir;
pub mod ir_builder;
pub mod ir_eval;
pub mod ir_validate;
