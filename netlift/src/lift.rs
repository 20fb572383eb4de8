// SPDX-License-Identifier: Apache-2.0

//! The value generator: walks the driver graph backwards from a target wire
//! and materializes an IR expression computing its combinational value.
//!
//! Generation is memoized on `DriverSpec` keys. Cache entries are only added
//! after their value is fully constructed; re-entering a cell that is still
//! being generated means the netlist has a combinational cycle.

use std::collections::HashSet;
use std::path::Path;

use netlift_ir::bits::Bits;
use netlift_ir::ir::{Fn, NodeRef, Package};
use netlift_ir::ir_builder::FnBuilder;
use netlift_ir::ir_validate::validate_package;

use crate::driver::{DriverChunk, DriverIndex, DriverSpec};
use crate::error::LiftError;
use crate::netlist::{CellId, CellKind, Module, PortName, WireId};
use crate::sig::{BitVal, SigSpec};

#[derive(Debug, Clone)]
pub struct LiftOptions {
    /// Annotate generated values with their driver-spec origin.
    pub verbose_value_names: bool,
    /// Derive cell-output value names from the producing cell.
    pub cell_based_value_names: bool,
    /// Apply algebraic identities like `and(x, 0) -> 0` during emission.
    pub simplify_and_or_gates: bool,
    /// Fold selects with constant selectors.
    pub simplify_muxes: bool,
    /// Emit the IR poison value for X/Z constants instead of zero.
    pub use_poison: bool,
}

impl Default for LiftOptions {
    fn default() -> Self {
        LiftOptions {
            verbose_value_names: false,
            cell_based_value_names: true,
            simplify_and_or_gates: true,
            simplify_muxes: true,
            use_poison: false,
        }
    }
}

struct ValueCache {
    map: std::collections::HashMap<DriverSpec, NodeRef>,
    hits: usize,
    misses: usize,
}

impl ValueCache {
    fn new() -> Self {
        ValueCache {
            map: std::collections::HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    fn add(&mut self, driver: DriverSpec, value: NodeRef) {
        let previous = self.map.insert(driver, value);
        assert!(previous.is_none(), "driver spec already has a cached value");
    }

    fn find(&mut self, driver: &DriverSpec) -> Option<NodeRef> {
        let result = self.map.get(driver).copied();
        if result.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        result
    }

    fn clear(&mut self) {
        self.map.clear();
        self.hits = 0;
        self.misses = 0;
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

pub struct ValueGenerator<'a> {
    module: &'a Module,
    index: &'a DriverIndex,
    opts: LiftOptions,
    fb: FnBuilder,
    cache: ValueCache,
    in_flight: HashSet<CellId>,
}

impl<'a> ValueGenerator<'a> {
    pub fn new(
        module: &'a Module,
        index: &'a DriverIndex,
        opts: LiftOptions,
        func_name: &str,
    ) -> Self {
        ValueGenerator {
            module,
            index,
            opts,
            fb: FnBuilder::new(func_name),
            cache: ValueCache::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Discards all state from a previous generation so a new target can be
    /// emitted without sharing IR nodes.
    pub fn reset(&mut self, func_name: &str) {
        self.fb = FnBuilder::new(func_name);
        self.cache.clear();
        self.in_flight.clear();
    }

    /// Adds one function parameter per module input port (in declaration
    /// order) and seeds the cache so full-wire driver specs of those ports
    /// resolve to the parameters.
    pub fn seed_input_params(&mut self) {
        for wire_id in self.module.input_ports() {
            let wire = self.module.wire(wire_id);
            let param = self.fb.param(&wire.name, wire.width);
            self.cache
                .add(DriverSpec::input_wire(wire_id, wire.width), param);
        }
    }

    /// `(entries, hits, misses)` of the memoization cache.
    pub fn cache_stats(&self) -> (usize, usize, usize) {
        (self.cache.len(), self.cache.hits, self.cache.misses)
    }

    /// Generates the IR value of an arbitrary signal spec; the result width
    /// equals the spec width.
    pub fn generate(&mut self, sig: &SigSpec) -> Result<NodeRef, LiftError> {
        let ds = self.index.drivers_of(self.module, sig)?;
        log::debug!("drivers of {}: {}", sig.describe(self.module), ds.describe(self.module));
        self.generate_value(&ds)
    }

    /// Consumes the generator, building the function with the given return
    /// value.
    pub fn finish(self, ret: NodeRef) -> Fn {
        self.fb
            .build_with_return_value(ret)
            .expect("return node ref is valid by construction")
    }

    fn spec_name(&self, ds: &DriverSpec) -> Option<String> {
        self.opts
            .verbose_value_names
            .then(|| ds.describe(self.module))
    }

    fn generate_value(&mut self, ds: &DriverSpec) -> Result<NodeRef, LiftError> {
        if let Some(value) = self.cache.find(ds) {
            log::trace!("cache hit for {}", ds.describe(self.module));
            return Ok(value);
        }

        if let Some(wire) = ds.as_input_wire(self.module) {
            // Input port values are created as function parameters and
            // seeded into the cache before generation begins.
            panic!(
                "input wire '{}' has no seeded parameter value",
                self.module.wire(wire).name
            );
        }

        if let Some((cell_id, port)) = ds.as_cell_output(self.module) {
            if !self.in_flight.insert(cell_id) {
                return Err(LiftError::CombinationalCycle {
                    name: self.module.cell(cell_id).name.clone(),
                });
            }
            let value = self.generate_cell_output_value(cell_id, port)?;
            self.in_flight.remove(&cell_id);
            self.cache.add(ds.clone(), value);
            return Ok(value);
        }

        if ds.is_fully_const() {
            // Pure constants are cheap to rebuild; they skip the cache.
            let name = self.spec_name(ds);
            return Ok(self.constant_value(&ds.const_bits(), name.as_deref()));
        }

        // A heterogeneous concatenation: generate each chunk padded and
        // shifted into position, then OR everything together.
        let total_width = ds.width();
        let mut values = Vec::new();
        let mut offset = 0;
        for chunk in ds.chunks().to_vec() {
            values.push(self.generate_chunk_value(&chunk, total_width, offset)?);
            offset += chunk.width();
        }

        let mut iter = values.into_iter();
        let first = iter.next().expect("non-empty driver spec");
        if iter.len() == 0 {
            // A single partial chunk; it was cached under its own key while
            // being materialized.
            return Ok(first);
        }
        let mut acc = first;
        for value in iter {
            acc = self.or_value(acc, value, None);
        }
        if let Some(name) = self.spec_name(ds) {
            // The fold result keeps its structural name only in verbose
            // mode; renaming nodes after the fact is not worth plumbing.
            log::trace!("complex driver spec {} -> node {:?}", name, acc);
        }
        self.cache.add(ds.clone(), acc);
        Ok(acc)
    }

    /// Materializes a literal from netlist constant bits, coercing X/Z to
    /// zero with a warning (or producing poison when configured).
    fn constant_value(&mut self, bits: &[BitVal], name: Option<&str>) -> NodeRef {
        if bits.iter().any(|b| !b.is_def()) {
            let rendered: String = bits.iter().rev().map(BitVal::to_char).collect();
            log::warn!("x-ish driver spec found: {}", rendered);
            if self.opts.use_poison {
                return self.fb.poison(bits.len(), name);
            }
        }
        let bools: Vec<bool> = bits.iter().map(|b| *b == BitVal::One).collect();
        self.fb.literal(Bits::from_lsb_bits(&bools), name)
    }

    /// Generates the value of one chunk of a wider driver spec: the chunk
    /// value zero-extended to `total_width` and shifted left to `offset`.
    fn generate_chunk_value(
        &mut self,
        chunk: &DriverChunk,
        total_width: usize,
        offset: usize,
    ) -> Result<NodeRef, LiftError> {
        assert!(total_width >= chunk.width() + offset);

        if let DriverChunk::Const(data) = chunk {
            // Build the padded literal directly rather than extending and
            // shifting at runtime.
            if !data.is_fully_def() {
                log::warn!("x-ish driver chunk found: {}", data.as_string());
            }
            let mut bools = vec![false; total_width];
            for (i, bit) in data.bits().iter().enumerate() {
                bools[offset + i] = *bit == BitVal::One;
            }
            return Ok(self.fb.literal(Bits::from_lsb_bits(&bools), None));
        }

        // A slice of a wire or cell output.
        let chunk_ds = DriverSpec::from_chunk(chunk.clone());
        let val = match self.cache.find(&chunk_ds) {
            Some(val) => val,
            None => {
                let (object_ds, inner_offset) = match *chunk {
                    DriverChunk::Input { wire, offset, .. } => {
                        let width = self.module.wire(wire).width;
                        (DriverSpec::input_wire(wire, width), offset)
                    }
                    DriverChunk::Cell {
                        cell, port, offset, ..
                    } => {
                        let width = self
                            .module
                            .cell(cell)
                            .port(port)
                            .expect("output port is connected")
                            .width();
                        (DriverSpec::cell_output(cell, port, width), offset)
                    }
                    DriverChunk::Const(_) => unreachable!(),
                };
                let object_val = self.generate_value(&object_ds)?;
                let mut val = object_val;
                if inner_offset > 0 {
                    let object_width = self.fb.width(object_val);
                    let amount = self
                        .fb
                        .literal(Bits::from_u64(inner_offset as u64, object_width).unwrap(), None);
                    val = self.fb.shrl(val, amount, None);
                }
                if self.fb.width(val) != chunk.width() {
                    let name = self.spec_name(&chunk_ds);
                    val = self.fb.zext_or_trunc(val, chunk.width(), name.as_deref());
                }
                // Only worth caching if the slicing actually built nodes.
                if val != object_val {
                    self.cache.add(chunk_ds, val);
                }
                val
            }
        };

        if offset == 0 && total_width == chunk.width() {
            return Ok(val);
        }
        let mut val = self.fb.zext_or_trunc(val, total_width, None);
        if offset > 0 {
            let amount = self
                .fb
                .literal(Bits::from_u64(offset as u64, total_width).unwrap(), None);
            val = self.fb.shll(val, amount, None);
        }
        Ok(val)
    }

    /// Finds or creates the value driving the given input port of a cell.
    fn generate_input_value(
        &mut self,
        cell_id: CellId,
        port: PortName,
    ) -> Result<NodeRef, LiftError> {
        let cell = self.module.cell(cell_id);
        let sig = cell.port(port).ok_or_else(|| LiftError::MissingPort {
            cell: cell.name.clone(),
            port: port.as_str(),
        })?;
        let ds = self.index.drivers_of(self.module, sig)?;
        self.generate_value(&ds)
    }

    fn warn_width(&self, cell_id: CellId, port: &str, declared: Option<usize>, actual: usize) {
        if let Some(declared) = declared {
            if declared != actual {
                let cell = self.module.cell(cell_id);
                log::warn!(
                    "cell '{}' ({}) port {} is {} bits wide but declares {}",
                    cell.name,
                    cell.kind,
                    port,
                    actual,
                    declared
                );
            }
        }
    }

    fn and_value(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        if self.opts.simplify_and_or_gates {
            for (a, b) in [(lhs, rhs), (rhs, lhs)] {
                if let Some(bits) = self.fb.as_literal(a) {
                    if bits.is_zero() {
                        return a;
                    }
                    if bits.is_ones() {
                        return b;
                    }
                }
            }
        }
        self.fb.and(lhs, rhs, name)
    }

    fn or_value(&mut self, lhs: NodeRef, rhs: NodeRef, name: Option<&str>) -> NodeRef {
        if self.opts.simplify_and_or_gates {
            for (a, b) in [(lhs, rhs), (rhs, lhs)] {
                if let Some(bits) = self.fb.as_literal(a) {
                    if bits.is_zero() {
                        return b;
                    }
                    if bits.is_ones() {
                        return a;
                    }
                }
            }
        }
        self.fb.or(lhs, rhs, name)
    }

    fn select_value(
        &mut self,
        selector: NodeRef,
        on_true: NodeRef,
        on_false: NodeRef,
        name: Option<&str>,
    ) -> NodeRef {
        if self.opts.simplify_muxes {
            if let Some(bits) = self.fb.as_literal(selector) {
                return if bits.is_zero() { on_false } else { on_true };
            }
        }
        self.fb.select(selector, on_true, on_false, name)
    }

    fn cell_value_name(&self, cell_id: CellId, port: PortName) -> Option<String> {
        if self.opts.verbose_value_names {
            let width = self
                .module
                .cell(cell_id)
                .port(port)
                .map(SigSpec::width)
                .unwrap_or(0);
            Some(DriverSpec::cell_output(cell_id, port, width).describe(self.module))
        } else if self.opts.cell_based_value_names {
            Some(self.module.cell(cell_id).name.clone())
        } else {
            None
        }
    }

    /// Creates the value of a cell's output port. The caller owns the cache
    /// entry for the corresponding driver spec.
    fn generate_cell_output_value(
        &mut self,
        cell_id: CellId,
        port: PortName,
    ) -> Result<NodeRef, LiftError> {
        // All supported primitives drive Y.
        assert_eq!(port, PortName::Y, "unexpected cell output port");
        let kind = self.module.cell(cell_id).kind;
        log::debug!(
            "generating output of cell '{}' ({})",
            self.module.cell(cell_id).name,
            kind
        );
        if kind.is_unary() {
            self.generate_unary_cell_value(cell_id, kind)
        } else if kind.is_pmux() {
            self.generate_pmux_cell_value(cell_id)
        } else if kind.is_mux() {
            self.generate_mux_cell_value(cell_id)
        } else {
            self.generate_binary_cell_value(cell_id, kind)
        }
    }

    fn port_width(&self, cell_id: CellId, port: PortName) -> Result<usize, LiftError> {
        let cell = self.module.cell(cell_id);
        cell.port(port)
            .map(SigSpec::width)
            .ok_or_else(|| LiftError::MissingPort {
                cell: cell.name.clone(),
                port: port.as_str(),
            })
    }

    fn generate_unary_cell_value(
        &mut self,
        cell_id: CellId,
        kind: CellKind,
    ) -> Result<NodeRef, LiftError> {
        let params = self.module.cell(cell_id).params.clone();
        let sig_width_a = self.port_width(cell_id, PortName::A)?;
        let sig_width_y = self.port_width(cell_id, PortName::Y)?;
        self.warn_width(cell_id, "A", params.a_width, sig_width_a);
        self.warn_width(cell_id, "Y", params.y_width, sig_width_y);

        let val_a = self.generate_input_value(cell_id, PortName::A)?;

        // Normalize to the largest of the declared and observed widths.
        // TODO: honor A_SIGNED here by sign-extending instead.
        let working = [
            params.a_width.unwrap_or(0),
            sig_width_a,
            self.fb.width(val_a),
        ]
        .into_iter()
        .max()
        .unwrap();
        let val_a = self.fb.zext_or_trunc(val_a, working, None);

        let name = self.cell_value_name(cell_id, PortName::Y);
        let name = name.as_deref();
        let result = match kind {
            CellKind::Not => self.fb.not(val_a, name),
            CellKind::Pos => val_a,
            CellKind::Neg => self.fb.neg(val_a, name),
            CellKind::ReduceAnd => {
                let ones = self.fb.ones(working);
                self.fb.eq(val_a, ones, name)
            }
            CellKind::ReduceOr | CellKind::ReduceBool => {
                let zero = self.fb.zero(working);
                self.fb.ne(val_a, zero, name)
            }
            CellKind::ReduceXor => {
                let popcount = self.fb.popcount(val_a, None);
                self.fb.bit_slice(popcount, 0, 1, name)
            }
            CellKind::ReduceXnor => {
                let popcount = self.fb.popcount(val_a, None);
                let low = self.fb.bit_slice(popcount, 0, 1, None);
                self.fb.not(low, name)
            }
            CellKind::LogicNot => {
                let zero = self.fb.zero(working);
                self.fb.eq(val_a, zero, name)
            }
            _ => unreachable!("{} is not a unary cell", kind),
        };

        // Reductions of declared Y_WIDTH > 1 zero-extend; only the low bit
        // varies.
        Ok(self.fb.zext_or_trunc(result, sig_width_y, None))
    }

    fn generate_binary_cell_value(
        &mut self,
        cell_id: CellId,
        kind: CellKind,
    ) -> Result<NodeRef, LiftError> {
        let params = self.module.cell(cell_id).params.clone();
        let sig_width_a = self.port_width(cell_id, PortName::A)?;
        let sig_width_b = self.port_width(cell_id, PortName::B)?;
        let sig_width_y = self.port_width(cell_id, PortName::Y)?;
        self.warn_width(cell_id, "A", params.a_width, sig_width_a);
        self.warn_width(cell_id, "B", params.b_width, sig_width_b);
        self.warn_width(cell_id, "Y", params.y_width, sig_width_y);
        if params.a_width.is_some() && params.a_width != params.b_width {
            log::warn!(
                "mismatched A/B widths for {} cell '{}'",
                kind,
                self.module.cell(cell_id).name
            );
        }

        let val_a = self.generate_input_value(cell_id, PortName::A)?;
        let val_b = self.generate_input_value(cell_id, PortName::B)?;

        // Normalize everything to one working width before combining.
        // TODO: honor A_SIGNED/B_SIGNED here by sign-extending instead.
        let working = [
            params.a_width.unwrap_or(0),
            params.b_width.unwrap_or(0),
            params.y_width.unwrap_or(0),
            sig_width_a,
            sig_width_b,
            self.fb.width(val_a),
            self.fb.width(val_b),
        ]
        .into_iter()
        .max()
        .unwrap();
        let val_a = self.fb.zext_or_trunc(val_a, working, None);
        let val_b = self.fb.zext_or_trunc(val_b, working, None);

        let name = self.cell_value_name(cell_id, PortName::Y);
        let name = name.as_deref();
        let result = match kind {
            CellKind::And => self.and_value(val_a, val_b, name),
            CellKind::Or => self.or_value(val_a, val_b, name),
            CellKind::Xor => self.fb.xor(val_a, val_b, name),
            CellKind::Xnor => {
                let x = self.fb.xor(val_a, val_b, None);
                self.fb.not(x, name)
            }
            CellKind::Shl | CellKind::Sshl => self.fb.shll(val_a, val_b, name),
            CellKind::Shr => self.fb.shrl(val_a, val_b, name),
            CellKind::Sshr => self.fb.shra(val_a, val_b, name),
            CellKind::LogicAnd => {
                let zero = self.fb.zero(working);
                let a_set = self.fb.ne(val_a, zero, None);
                let zero = self.fb.zero(working);
                let b_set = self.fb.ne(val_b, zero, None);
                self.and_value(a_set, b_set, name)
            }
            CellKind::LogicOr => {
                let zero = self.fb.zero(working);
                let a_set = self.fb.ne(val_a, zero, None);
                let zero = self.fb.zero(working);
                let b_set = self.fb.ne(val_b, zero, None);
                self.or_value(a_set, b_set, name)
            }
            CellKind::Lt => self.fb.ult(val_a, val_b, name),
            CellKind::Le => self.fb.ule(val_a, val_b, name),
            CellKind::Eq => self.fb.eq(val_a, val_b, name),
            CellKind::Ne => self.fb.ne(val_a, val_b, name),
            CellKind::Ge => self.fb.uge(val_a, val_b, name),
            CellKind::Gt => self.fb.ugt(val_a, val_b, name),
            CellKind::Add => self.fb.add(val_a, val_b, name),
            CellKind::Sub => self.fb.sub(val_a, val_b, name),
            CellKind::Mul => self.fb.umul(val_a, val_b, name),
            CellKind::Div => self.fb.udiv(val_a, val_b, name),
            CellKind::Mod => self.fb.umod(val_a, val_b, name),
            _ => unreachable!("{} is not a binary cell", kind),
        };

        Ok(self.fb.zext_or_trunc(result, sig_width_y, None))
    }

    fn generate_mux_cell_value(&mut self, cell_id: CellId) -> Result<NodeRef, LiftError> {
        let params = self.module.cell(cell_id).params.clone();
        let sig_width_a = self.port_width(cell_id, PortName::A)?;
        let sig_width_b = self.port_width(cell_id, PortName::B)?;
        let sig_width_s = self.port_width(cell_id, PortName::S)?;
        let sig_width_y = self.port_width(cell_id, PortName::Y)?;
        self.warn_width(cell_id, "A", params.width, sig_width_a);
        self.warn_width(cell_id, "B", params.width, sig_width_b);
        self.warn_width(cell_id, "Y", params.width, sig_width_y);
        if sig_width_s != 1 {
            return Err(LiftError::WidthMismatch {
                cell: self.module.cell(cell_id).name.clone(),
                port: "S",
                expected: 1,
                actual: sig_width_s,
            });
        }

        let val_a = self.generate_input_value(cell_id, PortName::A)?;
        let val_b = self.generate_input_value(cell_id, PortName::B)?;
        let val_s = self.generate_input_value(cell_id, PortName::S)?;

        let working = [
            params.width.unwrap_or(0),
            sig_width_a,
            sig_width_b,
            self.fb.width(val_a),
            self.fb.width(val_b),
        ]
        .into_iter()
        .max()
        .unwrap();
        let val_a = self.fb.zext_or_trunc(val_a, working, None);
        let val_b = self.fb.zext_or_trunc(val_b, working, None);

        let name = self.cell_value_name(cell_id, PortName::Y);
        let result = self.select_value(val_s, val_a, val_b, name.as_deref());
        Ok(self.fb.zext_or_trunc(result, sig_width_y, None))
    }

    /// `B` concatenates `S_WIDTH` candidate vectors of width `WIDTH`; `A` is
    /// the default when no select bit is set. With multiple select bits set
    /// the lowest set bit wins, built as a cascade with the low index
    /// outermost.
    fn generate_pmux_cell_value(&mut self, cell_id: CellId) -> Result<NodeRef, LiftError> {
        let params = self.module.cell(cell_id).params.clone();
        let sig_width_a = self.port_width(cell_id, PortName::A)?;
        let sig_width_b = self.port_width(cell_id, PortName::B)?;
        let sig_width_s = self.port_width(cell_id, PortName::S)?;
        let sig_width_y = self.port_width(cell_id, PortName::Y)?;

        let slice_width = params.width.unwrap_or(sig_width_a);
        let num_slices = params.s_width.unwrap_or(sig_width_s);
        self.warn_width(cell_id, "A", Some(slice_width), sig_width_a);
        self.warn_width(cell_id, "B", Some(slice_width * num_slices), sig_width_b);
        self.warn_width(cell_id, "S", Some(num_slices), sig_width_s);
        self.warn_width(cell_id, "Y", Some(slice_width), sig_width_y);

        let val_a = self.generate_input_value(cell_id, PortName::A)?;
        let val_b = self.generate_input_value(cell_id, PortName::B)?;
        let val_s = self.generate_input_value(cell_id, PortName::S)?;

        let val_a = self.fb.zext_or_trunc(val_a, slice_width, None);
        let val_b = self.fb.zext_or_trunc(val_b, slice_width * num_slices, None);
        let val_s = self.fb.zext_or_trunc(val_s, num_slices, None);

        if let Some(bits) = self.fb.as_literal(val_s) {
            if bits.count_ones() > 1 {
                log::warn!(
                    "pmux cell '{}' has a constant select with {} bits set",
                    self.module.cell(cell_id).name,
                    bits.count_ones()
                );
            }
        }

        let name = self.cell_value_name(cell_id, PortName::Y);
        let mut result = val_a;
        for k in (0..num_slices).rev() {
            let select_bit = self.fb.bit_slice(val_s, k, 1, None);
            let candidate = self.fb.bit_slice(val_b, k * slice_width, slice_width, None);
            let label = if k == 0 { name.as_deref() } else { None };
            result = self.select_value(select_bit, candidate, result, label);
        }
        Ok(self.fb.zext_or_trunc(result, sig_width_y, None))
    }
}

/// Lifts the combinational cone of `target` into a single-function package:
/// one parameter per module input port, returning the value driving the
/// target wire.
pub fn lift_wire(
    module: &Module,
    target: WireId,
    opts: &LiftOptions,
) -> Result<Package, LiftError> {
    let index = DriverIndex::build(module)?;
    log::info!("built driver index over {} bits", index.size());
    lift_wire_with(module, &index, target, opts)
}

/// Like `lift_wire`, reusing an existing driver index. Each call uses a
/// fresh generation cache, so IR nodes are never shared across targets.
pub fn lift_wire_with(
    module: &Module,
    index: &DriverIndex,
    target: WireId,
    opts: &LiftOptions,
) -> Result<Package, LiftError> {
    let target_wire = module.wire(target);
    if !target_wire.port_output {
        return Err(LiftError::TargetNotOutput {
            wire: target_wire.name.clone(),
        });
    }
    let func_name = format!("{}_{}", module.name, target_wire.name);
    log::info!(
        "lifting wire '{}' of module '{}'",
        target_wire.name,
        module.name
    );

    let mut generator = ValueGenerator::new(module, index, opts.clone(), &func_name);
    generator.seed_input_params();
    let ret = generator.generate(&module.wire_sig(target))?;
    let (entries, hits, misses) = generator.cache_stats();
    log::debug!(
        "{} values in cache ({} hits, {} misses)",
        entries,
        hits,
        misses
    );
    let func = generator.finish(ret);
    assert_eq!(
        func.ret_ty.bit_count(),
        target_wire.width,
        "generated value width does not match the target wire"
    );

    let package = Package {
        name: module.name.clone(),
        members: vec![func],
        top: Some(func_name),
    };
    validate_package(&package)?;
    Ok(package)
}

/// Serializes the package to a text file, overwriting any existing file.
pub fn write_ir_file(package: &Package, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, package.to_string())?;
    Ok(())
}
