// SPDX-License-Identifier: Apache-2.0

//! The inbound netlist object model.
//!
//! Wires and cells live in arenas owned by their `Module`; everything else
//! refers to them through index handles, so identity comparison is index
//! comparison and signal specs stay free of lifetime ties to the netlist.
//!
//! Parsing is not this crate's concern: modules are built programmatically
//! through the mutators here (which is also how the tests construct their
//! fixtures).

use crate::error::LiftError;
use crate::sig::SigSpec;

/// Index into `Module::wires`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(pub usize);

/// Index into `Module::cells`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub usize);

#[derive(Debug, Clone)]
pub struct Wire {
    pub name: String,
    pub width: usize,
    pub port_input: bool,
    pub port_output: bool,
}

/// Port names of the supported combinational primitives. Outputs are always
/// `Y`; `S` only appears on the mux family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortName {
    A,
    B,
    S,
    Y,
}

impl PortName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortName::A => "A",
            PortName::B => "B",
            PortName::S => "S",
            PortName::Y => "Y",
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, PortName::Y)
    }
}

impl std::fmt::Display for PortName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Not,
    Pos,
    Neg,
    ReduceAnd,
    ReduceOr,
    ReduceXor,
    ReduceXnor,
    ReduceBool,
    LogicNot,
    And,
    Or,
    Xor,
    Xnor,
    Shl,
    Sshl,
    Shr,
    Sshr,
    LogicAnd,
    LogicOr,
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Mux,
    Pmux,
}

pub fn cell_kind_to_name(kind: CellKind) -> &'static str {
    match kind {
        CellKind::Not => "$not",
        CellKind::Pos => "$pos",
        CellKind::Neg => "$neg",
        CellKind::ReduceAnd => "$reduce_and",
        CellKind::ReduceOr => "$reduce_or",
        CellKind::ReduceXor => "$reduce_xor",
        CellKind::ReduceXnor => "$reduce_xnor",
        CellKind::ReduceBool => "$reduce_bool",
        CellKind::LogicNot => "$logic_not",
        CellKind::And => "$and",
        CellKind::Or => "$or",
        CellKind::Xor => "$xor",
        CellKind::Xnor => "$xnor",
        CellKind::Shl => "$shl",
        CellKind::Sshl => "$sshl",
        CellKind::Shr => "$shr",
        CellKind::Sshr => "$sshr",
        CellKind::LogicAnd => "$logic_and",
        CellKind::LogicOr => "$logic_or",
        CellKind::Lt => "$lt",
        CellKind::Le => "$le",
        CellKind::Eq => "$eq",
        CellKind::Ne => "$ne",
        CellKind::Ge => "$ge",
        CellKind::Gt => "$gt",
        CellKind::Add => "$add",
        CellKind::Sub => "$sub",
        CellKind::Mul => "$mul",
        CellKind::Div => "$div",
        CellKind::Mod => "$mod",
        CellKind::Mux => "$mux",
        CellKind::Pmux => "$pmux",
    }
}

pub fn cell_kind_from_name(name: &str) -> Option<CellKind> {
    match name {
        "$not" => Some(CellKind::Not),
        "$pos" => Some(CellKind::Pos),
        "$neg" => Some(CellKind::Neg),
        "$reduce_and" => Some(CellKind::ReduceAnd),
        "$reduce_or" => Some(CellKind::ReduceOr),
        "$reduce_xor" => Some(CellKind::ReduceXor),
        "$reduce_xnor" => Some(CellKind::ReduceXnor),
        "$reduce_bool" => Some(CellKind::ReduceBool),
        "$logic_not" => Some(CellKind::LogicNot),
        "$and" => Some(CellKind::And),
        "$or" => Some(CellKind::Or),
        "$xor" => Some(CellKind::Xor),
        "$xnor" => Some(CellKind::Xnor),
        "$shl" => Some(CellKind::Shl),
        "$sshl" => Some(CellKind::Sshl),
        "$shr" => Some(CellKind::Shr),
        "$sshr" => Some(CellKind::Sshr),
        "$logic_and" => Some(CellKind::LogicAnd),
        "$logic_or" => Some(CellKind::LogicOr),
        "$lt" => Some(CellKind::Lt),
        "$le" => Some(CellKind::Le),
        "$eq" => Some(CellKind::Eq),
        "$ne" => Some(CellKind::Ne),
        "$ge" => Some(CellKind::Ge),
        "$gt" => Some(CellKind::Gt),
        "$add" => Some(CellKind::Add),
        "$sub" => Some(CellKind::Sub),
        "$mul" => Some(CellKind::Mul),
        "$div" => Some(CellKind::Div),
        "$mod" => Some(CellKind::Mod),
        "$mux" => Some(CellKind::Mux),
        "$pmux" => Some(CellKind::Pmux),
        _ => None,
    }
}

impl CellKind {
    /// Single-input cells (A in, Y out).
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            CellKind::Not
                | CellKind::Pos
                | CellKind::Neg
                | CellKind::ReduceAnd
                | CellKind::ReduceOr
                | CellKind::ReduceXor
                | CellKind::ReduceXnor
                | CellKind::ReduceBool
                | CellKind::LogicNot
        )
    }

    pub fn is_binary(&self) -> bool {
        !self.is_unary() && !self.is_mux()
    }

    pub fn is_mux(&self) -> bool {
        matches!(self, CellKind::Mux | CellKind::Pmux)
    }

    pub fn is_pmux(&self) -> bool {
        matches!(self, CellKind::Pmux)
    }

    /// Reduction cells: one-bit output regardless of input width.
    pub fn is_reduction(&self) -> bool {
        matches!(
            self,
            CellKind::ReduceAnd
                | CellKind::ReduceOr
                | CellKind::ReduceXor
                | CellKind::ReduceXnor
                | CellKind::ReduceBool
        )
    }

    /// Cells whose semantic output is a single bit; a wider declared
    /// `Y_WIDTH` only zero-extends it.
    pub fn yields_single_bit(&self) -> bool {
        self.is_reduction()
            || matches!(
                self,
                CellKind::LogicNot
                    | CellKind::LogicAnd
                    | CellKind::LogicOr
                    | CellKind::Lt
                    | CellKind::Le
                    | CellKind::Eq
                    | CellKind::Ne
                    | CellKind::Ge
                    | CellKind::Gt
            )
    }
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", cell_kind_to_name(*self))
    }
}

/// Width/signedness parameters as declared on the cell. Which fields are
/// meaningful depends on the cell kind; `width` is the shared A/B/Y width of
/// the mux family.
#[derive(Debug, Clone, Default)]
pub struct CellParams {
    pub a_width: Option<usize>,
    pub b_width: Option<usize>,
    pub y_width: Option<usize>,
    pub s_width: Option<usize>,
    pub width: Option<usize>,
    pub a_signed: bool,
    pub b_signed: bool,
}

impl CellParams {
    pub fn unary(a_width: usize, y_width: usize) -> Self {
        CellParams {
            a_width: Some(a_width),
            y_width: Some(y_width),
            ..Default::default()
        }
    }

    pub fn binary(a_width: usize, b_width: usize, y_width: usize) -> Self {
        CellParams {
            a_width: Some(a_width),
            b_width: Some(b_width),
            y_width: Some(y_width),
            ..Default::default()
        }
    }

    pub fn mux(width: usize) -> Self {
        CellParams {
            width: Some(width),
            ..Default::default()
        }
    }

    pub fn pmux(width: usize, s_width: usize) -> Self {
        CellParams {
            width: Some(width),
            s_width: Some(s_width),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub kind: CellKind,
    pub params: CellParams,
    pub connections: Vec<(PortName, SigSpec)>,
}

impl Cell {
    pub fn port(&self, port: PortName) -> Option<&SigSpec> {
        self.connections
            .iter()
            .find(|(p, _)| *p == port)
            .map(|(_, sig)| sig)
    }

    pub fn has_port(&self, port: PortName) -> bool {
        self.port(port).is_some()
    }

    /// The signal connected to the cell's output port. All supported
    /// primitives drive `Y`.
    pub fn output_port(&self) -> Option<&SigSpec> {
        self.connections
            .iter()
            .find(|(p, _)| p.is_output())
            .map(|(_, sig)| sig)
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    wires: Vec<Wire>,
    cells: Vec<Cell>,
    /// Port wires in declaration order.
    pub ports: Vec<WireId>,
    /// Top-level assignments, lhs driven by rhs.
    pub connections: Vec<(SigSpec, SigSpec)>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: name.to_string(),
            wires: Vec::new(),
            cells: Vec::new(),
            ports: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn add_wire(&mut self, name: &str, width: usize) -> WireId {
        assert!(
            self.find_wire(name).is_none(),
            "wire {} already exists in module {}",
            name,
            self.name
        );
        self.wires.push(Wire {
            name: name.to_string(),
            width,
            port_input: false,
            port_output: false,
        });
        WireId(self.wires.len() - 1)
    }

    pub fn add_input(&mut self, name: &str, width: usize) -> WireId {
        let id = self.add_wire(name, width);
        self.wires[id.0].port_input = true;
        self.ports.push(id);
        id
    }

    pub fn add_output(&mut self, name: &str, width: usize) -> WireId {
        let id = self.add_wire(name, width);
        self.wires[id.0].port_output = true;
        self.ports.push(id);
        id
    }

    pub fn add_cell(
        &mut self,
        name: &str,
        kind: CellKind,
        params: CellParams,
        connections: Vec<(PortName, SigSpec)>,
    ) -> CellId {
        self.cells.push(Cell {
            name: name.to_string(),
            kind,
            params,
            connections,
        });
        CellId(self.cells.len() - 1)
    }

    /// Like `add_cell`, resolving a `$name`-style kind string; an unknown
    /// cell type is an input-netlist error.
    pub fn add_cell_by_name(
        &mut self,
        name: &str,
        kind_name: &str,
        params: CellParams,
        connections: Vec<(PortName, SigSpec)>,
    ) -> Result<CellId, LiftError> {
        let kind = cell_kind_from_name(kind_name).ok_or_else(|| LiftError::UnsupportedCell {
            cell: name.to_string(),
            kind: kind_name.to_string(),
        })?;
        Ok(self.add_cell(name, kind, params, connections))
    }

    /// Records the top-level assignment `lhs <- rhs`.
    pub fn connect(&mut self, lhs: SigSpec, rhs: SigSpec) {
        assert_eq!(
            lhs.width(),
            rhs.width(),
            "connection width mismatch in module {}",
            self.name
        );
        self.connections.push((lhs, rhs));
    }

    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.0]
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter().enumerate().map(|(i, w)| (WireId(i), w))
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().enumerate().map(|(i, c)| (CellId(i), c))
    }

    pub fn find_wire(&self, name: &str) -> Option<WireId> {
        self.wires
            .iter()
            .position(|w| w.name == name)
            .map(WireId)
    }

    /// Port wires with the input direction, in declaration order.
    pub fn input_ports(&self) -> impl Iterator<Item = WireId> + '_ {
        self.ports
            .iter()
            .copied()
            .filter(|id| self.wire(*id).port_input)
    }

    /// The full-wire signal spec for a wire.
    pub fn wire_sig(&self, id: WireId) -> SigSpec {
        SigSpec::wire(id, self.wire(id).width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_building() {
        let mut m = Module::new("top");
        let a = m.add_input("a", 4);
        let y = m.add_output("y", 4);
        assert_eq!(m.wire(a).name, "a");
        assert!(m.wire(a).port_input);
        assert!(m.wire(y).port_output);
        assert_eq!(m.ports, vec![a, y]);
        assert_eq!(m.input_ports().collect::<Vec<_>>(), vec![a]);
        assert_eq!(m.find_wire("y"), Some(y));
        assert_eq!(m.find_wire("nope"), None);
    }

    #[test]
    fn test_cell_port_lookup() {
        let mut m = Module::new("top");
        let a = m.add_input("a", 8);
        let y = m.add_output("y", 8);
        let c = m.add_cell(
            "inv",
            CellKind::Not,
            CellParams::unary(8, 8),
            vec![
                (PortName::A, m.wire_sig(a)),
                (PortName::Y, m.wire_sig(y)),
            ],
        );
        let cell = m.cell(c);
        assert!(cell.has_port(PortName::A));
        assert!(!cell.has_port(PortName::S));
        assert_eq!(cell.port(PortName::Y).unwrap().width(), 8);
        assert_eq!(cell.output_port().unwrap().width(), 8);
    }

    #[test]
    fn test_cell_kind_predicates() {
        assert!(CellKind::Not.is_unary());
        assert!(CellKind::Add.is_binary());
        assert!(CellKind::Mux.is_mux());
        assert!(CellKind::Pmux.is_mux());
        assert!(CellKind::Pmux.is_pmux());
        assert!(!CellKind::Mux.is_pmux());
        assert!(CellKind::ReduceXor.is_reduction());
        assert!(!CellKind::LogicNot.is_reduction());
        assert!(CellKind::ReduceXor.yields_single_bit());
        assert!(CellKind::Lt.yields_single_bit());
        assert!(!CellKind::Add.yields_single_bit());
    }

    #[test]
    fn test_add_cell_by_name() {
        let mut m = Module::new("top");
        let a = m.add_input("a", 4);
        let y = m.add_output("y", 4);
        let c = m
            .add_cell_by_name(
                "inv",
                "$not",
                CellParams::unary(4, 4),
                vec![
                    (PortName::A, m.wire_sig(a)),
                    (PortName::Y, m.wire_sig(y)),
                ],
            )
            .unwrap();
        assert_eq!(m.cell(c).kind, CellKind::Not);
        assert!(matches!(
            m.add_cell_by_name("ff", "$dff", CellParams::default(), vec![]),
            Err(crate::error::LiftError::UnsupportedCell { .. })
        ));
    }

    #[test]
    fn test_cell_kind_names_round_trip() {
        for kind in [
            CellKind::Not,
            CellKind::ReduceXor,
            CellKind::LogicAnd,
            CellKind::Add,
            CellKind::Mux,
            CellKind::Pmux,
        ] {
            assert_eq!(cell_kind_from_name(cell_kind_to_name(kind)), Some(kind));
        }
        assert_eq!(cell_kind_from_name("$dff"), None);
    }

    #[test]
    #[should_panic]
    fn test_duplicate_wire_panics() {
        let mut m = Module::new("top");
        m.add_wire("a", 1);
        m.add_wire("a", 2);
    }
}
