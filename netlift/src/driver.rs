// SPDX-License-Identifier: Apache-2.0

//! The driver index: for every bit of every wire, who produces its value.
//!
//! Built in one scan over a module, then read-only. Lookups translate a
//! `SigSpec` (what a consumer is connected to) into a `DriverSpec` (which
//! cell outputs, module inputs, and constants produce those bits), which is
//! the canonical memoization key for value generation.

use std::collections::HashSet;

use crate::error::LiftError;
use crate::netlist::{CellId, Module, PortName, WireId};
use crate::sig::{BitVal, Const, SigBit, SigSpec};

/// The producer of a single bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DriverBit {
    Const(BitVal),
    /// A module input port bit drives itself.
    Input { wire: WireId, offset: usize },
    /// A bit of a cell output port.
    Cell {
        cell: CellId,
        port: PortName,
        offset: usize,
    },
}

/// One contiguous run of bits with a common producer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DriverChunk {
    Const(Const),
    Input {
        wire: WireId,
        offset: usize,
        width: usize,
    },
    Cell {
        cell: CellId,
        port: PortName,
        offset: usize,
        width: usize,
    },
}

impl DriverChunk {
    pub fn width(&self) -> usize {
        match self {
            DriverChunk::Const(c) => c.width(),
            DriverChunk::Input { width, .. } => *width,
            DriverChunk::Cell { width, .. } => *width,
        }
    }
}

impl From<DriverBit> for DriverChunk {
    fn from(bit: DriverBit) -> Self {
        match bit {
            DriverBit::Const(v) => DriverChunk::Const(Const::new(vec![v])),
            DriverBit::Input { wire, offset } => DriverChunk::Input {
                wire,
                offset,
                width: 1,
            },
            DriverBit::Cell { cell, port, offset } => DriverChunk::Cell {
                cell,
                port,
                offset,
                width: 1,
            },
        }
    }
}

/// A packed concatenation of driver chunks; always in maximal-chunk normal
/// form, which makes it directly usable as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DriverSpec {
    chunks: Vec<DriverChunk>,
    width: usize,
}

impl DriverSpec {
    pub fn empty() -> Self {
        DriverSpec::default()
    }

    /// A full input wire.
    pub fn input_wire(wire: WireId, width: usize) -> Self {
        let mut spec = DriverSpec::empty();
        spec.push_chunk(DriverChunk::Input {
            wire,
            offset: 0,
            width,
        });
        spec
    }

    /// A full cell output.
    pub fn cell_output(cell: CellId, port: PortName, width: usize) -> Self {
        let mut spec = DriverSpec::empty();
        spec.push_chunk(DriverChunk::Cell {
            cell,
            port,
            offset: 0,
            width,
        });
        spec
    }

    pub fn from_chunk(chunk: DriverChunk) -> Self {
        let mut spec = DriverSpec::empty();
        spec.push_chunk(chunk);
        spec
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn chunks(&self) -> &[DriverChunk] {
        &self.chunks
    }

    pub fn push_bit(&mut self, bit: DriverBit) {
        self.push_chunk(DriverChunk::from(bit));
    }

    pub fn push_chunk(&mut self, chunk: DriverChunk) {
        let w = chunk.width();
        if w == 0 {
            return;
        }
        self.width += w;
        if let Some(last) = self.chunks.last_mut() {
            match (last, &chunk) {
                (DriverChunk::Const(data), DriverChunk::Const(other)) => {
                    for bit in other.bits() {
                        data.push(*bit);
                    }
                    return;
                }
                (
                    DriverChunk::Input {
                        wire,
                        offset,
                        width,
                    },
                    DriverChunk::Input {
                        wire: w2,
                        offset: o2,
                        width: n2,
                    },
                ) if wire == w2 && *offset + *width == *o2 => {
                    *width += n2;
                    return;
                }
                (
                    DriverChunk::Cell {
                        cell,
                        port,
                        offset,
                        width,
                    },
                    DriverChunk::Cell {
                        cell: c2,
                        port: p2,
                        offset: o2,
                        width: n2,
                    },
                ) if cell == c2 && port == p2 && *offset + *width == *o2 => {
                    *width += n2;
                    return;
                }
                _ => {}
            }
        }
        self.chunks.push(chunk);
    }

    /// True when the spec is a single chunk covering an entire module input
    /// wire.
    pub fn is_wire(&self, module: &Module) -> bool {
        self.as_input_wire(module).is_some()
    }

    pub fn as_input_wire(&self, module: &Module) -> Option<WireId> {
        match self.chunks.as_slice() {
            [DriverChunk::Input {
                wire,
                offset: 0,
                width,
            }] if module.wire(*wire).width == *width => Some(*wire),
            _ => None,
        }
    }

    /// True when the spec is a single chunk covering an entire cell output.
    pub fn is_cell(&self, module: &Module) -> bool {
        self.as_cell_output(module).is_some()
    }

    pub fn as_cell_output(&self, module: &Module) -> Option<(CellId, PortName)> {
        match self.chunks.as_slice() {
            [DriverChunk::Cell {
                cell,
                port,
                offset: 0,
                width,
            }] => {
                let conn = module.cell(*cell).port(*port)?;
                (conn.width() == *width).then_some((*cell, *port))
            }
            _ => None,
        }
    }

    pub fn is_fully_const(&self) -> bool {
        self.chunks
            .iter()
            .all(|c| matches!(c, DriverChunk::Const(_)))
    }

    /// The constant bits of a fully-constant spec, LSB-first.
    pub fn const_bits(&self) -> Vec<BitVal> {
        assert!(self.is_fully_const(), "const_bits on non-constant spec");
        let mut bits = Vec::with_capacity(self.width);
        for chunk in &self.chunks {
            match chunk {
                DriverChunk::Const(data) => bits.extend_from_slice(data.bits()),
                _ => unreachable!(),
            }
        }
        bits
    }

    /// Diagnostic rendering with wire/cell names, MSB-first.
    pub fn describe(&self, module: &Module) -> String {
        let mut parts = Vec::with_capacity(self.chunks.len());
        for chunk in self.chunks.iter().rev() {
            match chunk {
                DriverChunk::Const(data) => {
                    parts.push(format!("{}'b{}", data.width(), data.as_string()))
                }
                DriverChunk::Input {
                    wire,
                    offset,
                    width,
                } => {
                    let w = module.wire(*wire);
                    if *offset == 0 && *width == w.width {
                        parts.push(w.name.clone());
                    } else {
                        parts.push(format!("{}[{}:{}]", w.name, offset + width - 1, offset));
                    }
                }
                DriverChunk::Cell {
                    cell,
                    port,
                    offset,
                    width,
                } => {
                    let c = module.cell(*cell);
                    parts.push(format!(
                        "{}.{}[{}:{}]",
                        c.name,
                        port,
                        offset + width - 1,
                        offset
                    ));
                }
            }
        }
        if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// What the build pass records per wire bit. Connection right-hand sides
/// land as aliases that get resolved transitively at lookup time.
#[derive(Debug, Clone, Copy)]
enum DriverEntry {
    Const(BitVal),
    Input { wire: WireId, offset: usize },
    Cell {
        cell: CellId,
        port: PortName,
        offset: usize,
    },
    Alias { wire: WireId, offset: usize },
}

pub struct DriverIndex {
    /// Outer index: wire handle; inner index: bit offset.
    entries: Vec<Vec<Option<DriverEntry>>>,
}

impl DriverIndex {
    /// Scans the module once and records the unique producer of every wire
    /// bit. Duplicate drivers are a fatal input-netlist error.
    pub fn build(module: &Module) -> Result<DriverIndex, LiftError> {
        let mut entries: Vec<Vec<Option<DriverEntry>>> = module
            .wires()
            .map(|(_, w)| vec![None; w.width])
            .collect();

        let set_entry =
            |entries: &mut Vec<Vec<Option<DriverEntry>>>,
             wire: WireId,
             offset: usize,
             entry: DriverEntry|
             -> Result<(), LiftError> {
                let slot = &mut entries[wire.0][offset];
                if slot.is_some() {
                    return Err(LiftError::MultipleDrivers {
                        wire: module.wire(wire).name.clone(),
                        bit: offset,
                    });
                }
                *slot = Some(entry);
                Ok(())
            };

        // Module input port bits drive themselves.
        for wire in module.input_ports() {
            for offset in 0..module.wire(wire).width {
                set_entry(
                    &mut entries,
                    wire,
                    offset,
                    DriverEntry::Input { wire, offset },
                )?;
            }
        }

        // Cell output connections drive the connected wire bits.
        for (cell_id, cell) in module.cells() {
            let Some(sig) = cell.output_port() else {
                continue;
            };
            for (k, bit) in sig.to_bits().into_iter().enumerate() {
                match bit {
                    SigBit::Wire { wire, offset } => {
                        set_entry(
                            &mut entries,
                            wire,
                            offset,
                            DriverEntry::Cell {
                                cell: cell_id,
                                port: PortName::Y,
                                offset: k,
                            },
                        )?;
                    }
                    SigBit::Const(_) => {
                        return Err(LiftError::ConstDriven {
                            name: cell.name.clone(),
                        });
                    }
                }
            }
        }

        // Top-level assignments: lhs bits are driven by the rhs bits.
        for (lhs, rhs) in &module.connections {
            for (lhs_bit, rhs_bit) in lhs.to_bits().into_iter().zip(rhs.to_bits()) {
                let SigBit::Wire { wire, offset } = lhs_bit else {
                    return Err(LiftError::ConstDriven {
                        name: module.name.clone(),
                    });
                };
                let entry = match rhs_bit {
                    SigBit::Const(v) => DriverEntry::Const(v),
                    SigBit::Wire {
                        wire: rhs_wire,
                        offset: rhs_offset,
                    } => DriverEntry::Alias {
                        wire: rhs_wire,
                        offset: rhs_offset,
                    },
                };
                set_entry(&mut entries, wire, offset, entry)?;
            }
        }

        Ok(DriverIndex { entries })
    }

    /// Number of indexed bits; a diagnostic.
    pub fn size(&self) -> usize {
        self.entries
            .iter()
            .map(|bits| bits.iter().filter(|e| e.is_some()).count())
            .sum()
    }

    /// Resolves one wire bit to its ultimate producer, chasing alias chains
    /// introduced by top-level assignments.
    fn resolve(
        &self,
        module: &Module,
        mut wire: WireId,
        mut offset: usize,
    ) -> Result<DriverBit, LiftError> {
        let mut seen: HashSet<(WireId, usize)> = HashSet::new();
        loop {
            if !seen.insert((wire, offset)) {
                return Err(LiftError::CombinationalCycle {
                    name: module.wire(wire).name.clone(),
                });
            }
            match self.entries[wire.0].get(offset).copied().flatten() {
                None => {
                    return Err(LiftError::NoDriver {
                        wire: module.wire(wire).name.clone(),
                        bit: offset,
                    });
                }
                Some(DriverEntry::Const(v)) => return Ok(DriverBit::Const(v)),
                Some(DriverEntry::Input { wire, offset }) => {
                    return Ok(DriverBit::Input { wire, offset });
                }
                Some(DriverEntry::Cell { cell, port, offset }) => {
                    return Ok(DriverBit::Cell { cell, port, offset });
                }
                Some(DriverEntry::Alias {
                    wire: next_wire,
                    offset: next_offset,
                }) => {
                    wire = next_wire;
                    offset = next_offset;
                }
            }
        }
    }

    /// Translates a consumer-side signal spec into the packed spec of its
    /// producers.
    pub fn drivers_of(&self, module: &Module, sig: &SigSpec) -> Result<DriverSpec, LiftError> {
        let mut spec = DriverSpec::empty();
        for bit in sig.to_bits() {
            let driver = match bit {
                SigBit::Const(v) => DriverBit::Const(v),
                SigBit::Wire { wire, offset } => self.resolve(module, wire, offset)?,
            };
            spec.push_bit(driver);
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{CellKind, CellParams};
    use pretty_assertions::assert_eq;

    fn adder_module() -> (Module, WireId, WireId, WireId, CellId) {
        let mut m = Module::new("top");
        let a = m.add_input("a", 8);
        let b = m.add_input("b", 8);
        let y = m.add_output("y", 8);
        let add = m.add_cell(
            "add0",
            CellKind::Add,
            CellParams::binary(8, 8, 8),
            vec![
                (PortName::A, m.wire_sig(a)),
                (PortName::B, m.wire_sig(b)),
                (PortName::Y, m.wire_sig(y)),
            ],
        );
        (m, a, b, y, add)
    }

    #[test]
    fn test_every_bit_has_a_producer() {
        let (m, a, _b, y, add) = adder_module();
        let index = DriverIndex::build(&m).unwrap();
        assert_eq!(index.size(), 24);
        let ds = index.drivers_of(&m, &m.wire_sig(y)).unwrap();
        assert_eq!(ds.width(), m.wire(y).width);
        assert_eq!(ds, DriverSpec::cell_output(add, PortName::Y, 8));
        assert!(ds.is_cell(&m));
        let ds = index.drivers_of(&m, &m.wire_sig(a)).unwrap();
        assert_eq!(ds.as_input_wire(&m), Some(a));
    }

    #[test]
    fn test_maximal_merge_of_adjacent_bits() {
        let (m, a, b, _y, _add) = adder_module();
        let index = DriverIndex::build(&m).unwrap();
        // A concatenation of two slices of the same input merges back into
        // one chunk; distinct producers stay separate.
        let sig = SigSpec::slice(a, 0, 4).append(&SigSpec::slice(a, 4, 4));
        let ds = index.drivers_of(&m, &sig).unwrap();
        assert_eq!(ds.chunks().len(), 1);
        let sig = SigSpec::slice(a, 0, 4).append(&SigSpec::slice(b, 0, 4));
        let ds = index.drivers_of(&m, &sig).unwrap();
        assert_eq!(ds.chunks().len(), 2);
    }

    #[test]
    fn test_alias_chain_resolution() {
        let mut m = Module::new("top");
        let a = m.add_input("a", 4);
        let t = m.add_wire("t", 4);
        let y = m.add_output("y", 4);
        m.connect(m.wire_sig(t), m.wire_sig(a));
        m.connect(m.wire_sig(y), m.wire_sig(t));
        let index = DriverIndex::build(&m).unwrap();
        let ds = index.drivers_of(&m, &m.wire_sig(y)).unwrap();
        assert_eq!(ds, DriverSpec::input_wire(a, 4));
    }

    #[test]
    fn test_constant_rhs_bits() {
        let mut m = Module::new("top");
        let a = m.add_input("a", 4);
        let y = m.add_output("y", 8);
        // y = {4'b0110, a}
        let rhs = m.wire_sig(a).append(&SigSpec::from_u64(0b0110, 4));
        m.connect(m.wire_sig(y), rhs);
        let index = DriverIndex::build(&m).unwrap();
        let ds = index.drivers_of(&m, &m.wire_sig(y)).unwrap();
        assert_eq!(ds.chunks().len(), 2);
        assert!(!ds.is_fully_const());
        let high = index.drivers_of(&m, &SigSpec::slice(y, 4, 4)).unwrap();
        assert!(high.is_fully_const());
        assert_eq!(high.const_bits(), Const::from_u64(0b0110, 4).bits());
    }

    #[test]
    fn test_duplicate_driver_is_fatal() {
        let mut m = Module::new("top");
        let a = m.add_input("a", 4);
        let y = m.add_output("y", 4);
        m.connect(m.wire_sig(y), m.wire_sig(a));
        m.connect(m.wire_sig(y), SigSpec::from_u64(0, 4));
        assert!(matches!(
            DriverIndex::build(&m),
            Err(LiftError::MultipleDrivers { .. })
        ));
    }

    #[test]
    fn test_missing_driver_is_fatal() {
        let mut m = Module::new("top");
        let _a = m.add_input("a", 4);
        let y = m.add_output("y", 4);
        let index = DriverIndex::build(&m).unwrap();
        assert!(matches!(
            index.drivers_of(&m, &m.wire_sig(y)),
            Err(LiftError::NoDriver { .. })
        ));
    }

    #[test]
    fn test_assignment_loop_is_fatal() {
        let mut m = Module::new("top");
        let u = m.add_wire("u", 1);
        let v = m.add_wire("v", 1);
        m.connect(m.wire_sig(u), m.wire_sig(v));
        m.connect(m.wire_sig(v), m.wire_sig(u));
        let index = DriverIndex::build(&m).unwrap();
        assert!(matches!(
            index.drivers_of(&m, &m.wire_sig(u)),
            Err(LiftError::CombinationalCycle { .. })
        ));
    }

    #[test]
    fn test_describe() {
        let (m, a, _b, _y, add) = adder_module();
        let mut ds = DriverSpec::input_wire(a, 8);
        assert_eq!(ds.describe(&m), "a");
        ds.push_chunk(DriverChunk::Cell {
            cell: add,
            port: PortName::Y,
            offset: 0,
            width: 4,
        });
        assert_eq!(ds.describe(&m), "{add0.Y[3:0],a}");
    }
}
