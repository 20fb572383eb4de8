// SPDX-License-Identifier: Apache-2.0

//! Bit-vector signal algebra: constants, chunks, and composite signal specs.
//!
//! A `SigSpec` is a concatenation of contiguous references -- wire slices and
//! constant runs -- kept in one of two normal forms: packed (maximal chunks,
//! the comparison/hashing form) or unpacked (one entry per bit, the editing
//! form). All public operations take immutable receivers and produce new
//! specs; a spec is never observable in an inconsistent state.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::netlist::{Module, WireId};

/// A single logic value. Only `Zero` and `One` carry semantic weight in
/// generated output; `X`/`Z` get coerced (with a warning) downstream, and
/// `Mark` exists for diagnostics passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitVal {
    Zero,
    One,
    X,
    Z,
    Mark,
}

impl BitVal {
    pub fn is_def(&self) -> bool {
        matches!(self, BitVal::Zero | BitVal::One)
    }

    pub fn to_char(&self) -> char {
        match self {
            BitVal::Zero => '0',
            BitVal::One => '1',
            BitVal::X => 'x',
            BitVal::Z => 'z',
            BitVal::Mark => 'm',
        }
    }

    pub fn from_char(ch: char) -> Option<BitVal> {
        match ch {
            '0' => Some(BitVal::Zero),
            '1' => Some(BitVal::One),
            'x' => Some(BitVal::X),
            'z' => Some(BitVal::Z),
            'm' => Some(BitVal::Mark),
            _ => None,
        }
    }
}

/// A constant bit vector; index 0 is the LSB.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Const {
    bits: Vec<BitVal>,
}

impl Const {
    pub fn new(bits: Vec<BitVal>) -> Self {
        Const { bits }
    }

    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                if i < 64 && (value >> i) & 1 == 1 {
                    BitVal::One
                } else {
                    BitVal::Zero
                }
            })
            .collect();
        Const { bits }
    }

    /// Two's-complement encoding; negative values sign-fill above bit 63.
    pub fn from_int(value: i64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                let bit = if i < 64 {
                    (value >> i) & 1 == 1
                } else {
                    value < 0
                };
                if bit { BitVal::One } else { BitVal::Zero }
            })
            .collect();
        Const { bits }
    }

    /// Parses an MSB-first string over `01xzm`.
    pub fn from_str(s: &str) -> Option<Self> {
        let mut bits = Vec::with_capacity(s.len());
        for ch in s.chars().rev() {
            bits.push(BitVal::from_char(ch)?);
        }
        Some(Const { bits })
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bits(&self) -> &[BitVal] {
        &self.bits
    }

    pub fn push(&mut self, bit: BitVal) {
        self.bits.push(bit);
    }

    /// MSB-first rendering, e.g. `0101`.
    pub fn as_string(&self) -> String {
        self.bits.iter().rev().map(BitVal::to_char).collect()
    }

    /// Interprets the defined bits as an integer; X/Z/M read as zero.
    pub fn as_int(&self, is_signed: bool) -> i64 {
        let mut value: i64 = 0;
        for (i, bit) in self.bits.iter().enumerate().take(64) {
            if *bit == BitVal::One {
                value |= 1 << i;
            }
        }
        if is_signed && !self.bits.is_empty() {
            let top = self.width().min(64) - 1;
            if self.bits[self.width() - 1] == BitVal::One && top < 63 {
                value |= !0i64 << (top + 1);
            }
        }
        value
    }

    pub fn as_bool(&self) -> bool {
        self.bits.iter().any(|b| *b == BitVal::One)
    }

    pub fn is_fully_def(&self) -> bool {
        self.bits.iter().all(BitVal::is_def)
    }

    /// Returns the position of the single set bit, if the constant is fully
    /// defined with exactly one `One`.
    pub fn is_onehot(&self) -> Option<usize> {
        let mut pos = None;
        for (i, bit) in self.bits.iter().enumerate() {
            match bit {
                BitVal::Zero => {}
                BitVal::One => {
                    if pos.is_some() {
                        return None;
                    }
                    pos = Some(i);
                }
                _ => return None,
            }
        }
        pos
    }
}

/// A single bit reference: a literal value or one bit of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigBit {
    Const(BitVal),
    Wire { wire: WireId, offset: usize },
}

impl SigBit {
    pub fn is_wire(&self) -> bool {
        matches!(self, SigBit::Wire { .. })
    }
}

/// One contiguous reference: a constant run or a wire slice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigChunk {
    Const(Const),
    Slice {
        wire: WireId,
        offset: usize,
        width: usize,
    },
}

impl SigChunk {
    pub fn width(&self) -> usize {
        match self {
            SigChunk::Const(c) => c.width(),
            SigChunk::Slice { width, .. } => *width,
        }
    }

    /// The bit at position `i` within this chunk.
    pub fn bit(&self, i: usize) -> SigBit {
        match self {
            SigChunk::Const(c) => SigBit::Const(c.bits()[i]),
            SigChunk::Slice { wire, offset, .. } => SigBit::Wire {
                wire: *wire,
                offset: offset + i,
            },
        }
    }

    pub fn extract(&self, offset: usize, length: usize) -> SigChunk {
        assert!(offset + length <= self.width());
        match self {
            SigChunk::Const(c) => {
                SigChunk::Const(Const::new(c.bits()[offset..offset + length].to_vec()))
            }
            SigChunk::Slice {
                wire,
                offset: base,
                ..
            } => SigChunk::Slice {
                wire: *wire,
                offset: base + offset,
                width: length,
            },
        }
    }
}

impl From<SigBit> for SigChunk {
    fn from(bit: SigBit) -> Self {
        match bit {
            SigBit::Const(v) => SigChunk::Const(Const::new(vec![v])),
            SigBit::Wire { wire, offset } => SigChunk::Slice {
                wire,
                offset,
                width: 1,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum SigRepr {
    Packed(Vec<SigChunk>),
    Unpacked(Vec<SigBit>),
}

/// A composite bit-vector reference.
#[derive(Debug, Clone)]
pub struct SigSpec {
    width: usize,
    repr: SigRepr,
    /// Lazily computed over the packed form; 0 means "not yet computed",
    /// and is also the fixed hash of the empty spec.
    hash: std::cell::Cell<u64>,
}

fn mix(h: u64, v: u64) -> u64 {
    ((h << 5).wrapping_add(h)) ^ v
}

/// Appends a chunk to a packed chunk list, merging with the tail when the
/// maximal-chunk invariant allows it.
fn push_chunk_merged(chunks: &mut Vec<SigChunk>, chunk: SigChunk) {
    if chunk.width() == 0 {
        return;
    }
    if let Some(last) = chunks.last_mut() {
        match (last, &chunk) {
            (SigChunk::Const(data), SigChunk::Const(other)) => {
                data.bits.extend_from_slice(other.bits());
                return;
            }
            (
                SigChunk::Slice {
                    wire,
                    offset,
                    width,
                },
                SigChunk::Slice {
                    wire: other_wire,
                    offset: other_offset,
                    width: other_width,
                },
            ) if wire == other_wire && *offset + *width == *other_offset => {
                *width += other_width;
                return;
            }
            _ => {}
        }
    }
    chunks.push(chunk);
}

fn pack_bits(bits: &[SigBit]) -> Vec<SigChunk> {
    let mut chunks: Vec<SigChunk> = Vec::new();
    for bit in bits {
        push_chunk_merged(&mut chunks, SigChunk::from(*bit));
    }
    chunks
}

fn chunks_to_bits(chunks: &[SigChunk]) -> Vec<SigBit> {
    let mut bits = Vec::new();
    for chunk in chunks {
        for i in 0..chunk.width() {
            bits.push(chunk.bit(i));
        }
    }
    bits
}

impl SigSpec {
    pub fn empty() -> Self {
        SigSpec::from_packed(Vec::new())
    }

    fn from_packed(chunks: Vec<SigChunk>) -> Self {
        let width = chunks.iter().map(SigChunk::width).sum();
        let spec = SigSpec {
            width,
            repr: SigRepr::Packed(chunks),
            hash: std::cell::Cell::new(0),
        };
        spec.check();
        spec
    }

    fn from_unpacked(bits: Vec<SigBit>) -> Self {
        SigSpec {
            width: bits.len(),
            repr: SigRepr::Unpacked(bits),
            hash: std::cell::Cell::new(0),
        }
    }

    /// A full wire of the given width.
    pub fn wire(wire: WireId, width: usize) -> Self {
        SigSpec::slice(wire, 0, width)
    }

    /// A slice of a wire.
    pub fn slice(wire: WireId, offset: usize, width: usize) -> Self {
        if width == 0 {
            return SigSpec::empty();
        }
        SigSpec::from_packed(vec![SigChunk::Slice {
            wire,
            offset,
            width,
        }])
    }

    pub fn from_const(value: Const) -> Self {
        if value.width() == 0 {
            return SigSpec::empty();
        }
        SigSpec::from_packed(vec![SigChunk::Const(value)])
    }

    pub fn from_u64(value: u64, width: usize) -> Self {
        SigSpec::from_const(Const::from_u64(value, width))
    }

    pub fn from_int(value: i64, width: usize) -> Self {
        SigSpec::from_const(Const::from_int(value, width))
    }

    /// `width` copies of a single bit value.
    pub fn repeat_bitval(value: BitVal, width: usize) -> Self {
        SigSpec::from_const(Const::new(vec![value; width]))
    }

    pub fn from_bit(bit: SigBit) -> Self {
        SigSpec::from_packed(vec![SigChunk::from(bit)])
    }

    pub fn from_bits(bits: Vec<SigBit>) -> Self {
        SigSpec::from_unpacked(bits)
    }

    pub fn from_chunk(chunk: SigChunk) -> Self {
        if chunk.width() == 0 {
            return SigSpec::empty();
        }
        SigSpec::from_packed(vec![chunk])
    }

    pub fn from_chunks(chunks: Vec<SigChunk>) -> Self {
        let mut packed = Vec::new();
        for chunk in chunks {
            push_chunk_merged(&mut packed, chunk);
        }
        SigSpec::from_packed(packed)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    pub fn is_packed(&self) -> bool {
        matches!(self.repr, SigRepr::Packed(_))
    }

    /// The packed normal form.
    pub fn pack(&self) -> SigSpec {
        match &self.repr {
            SigRepr::Packed(_) => self.clone(),
            SigRepr::Unpacked(bits) => SigSpec::from_packed(pack_bits(bits)),
        }
    }

    /// The unpacked (per-bit) normal form.
    pub fn unpack(&self) -> SigSpec {
        match &self.repr {
            SigRepr::Packed(chunks) => SigSpec::from_unpacked(chunks_to_bits(chunks)),
            SigRepr::Unpacked(_) => self.clone(),
        }
    }

    fn packed_chunks(&self) -> Cow<'_, [SigChunk]> {
        match &self.repr {
            SigRepr::Packed(chunks) => Cow::Borrowed(chunks.as_slice()),
            SigRepr::Unpacked(bits) => Cow::Owned(pack_bits(bits)),
        }
    }

    fn unpacked_bits(&self) -> Cow<'_, [SigBit]> {
        match &self.repr {
            SigRepr::Packed(chunks) => Cow::Owned(chunks_to_bits(chunks)),
            SigRepr::Unpacked(bits) => Cow::Borrowed(bits.as_slice()),
        }
    }

    /// The chunk sequence of the packed form, LSB-first.
    pub fn chunks(&self) -> Vec<SigChunk> {
        self.packed_chunks().into_owned()
    }

    /// The per-bit sequence, LSB-first.
    pub fn to_bits(&self) -> Vec<SigBit> {
        self.unpacked_bits().into_owned()
    }

    /// The bit at the given position.
    pub fn bit_at(&self, index: usize) -> SigBit {
        assert!(index < self.width, "bit index {} out of range", index);
        match &self.repr {
            SigRepr::Unpacked(bits) => bits[index],
            SigRepr::Packed(chunks) => {
                let mut pos = 0;
                for chunk in chunks {
                    if index < pos + chunk.width() {
                        return chunk.bit(index - pos);
                    }
                    pos += chunk.width();
                }
                unreachable!("width accounting broken");
            }
        }
    }

    pub fn extract(&self, offset: usize, length: usize) -> SigSpec {
        assert!(
            offset + length <= self.width,
            "extract [{}, {}) out of range for width {}",
            offset,
            offset + length,
            self.width
        );
        match &self.repr {
            SigRepr::Unpacked(bits) => {
                SigSpec::from_unpacked(bits[offset..offset + length].to_vec())
            }
            SigRepr::Packed(chunks) => {
                let mut out = Vec::new();
                let mut pos = 0;
                for chunk in chunks {
                    let lo = offset.max(pos);
                    let hi = (offset + length).min(pos + chunk.width());
                    if lo < hi {
                        out.push(chunk.extract(lo - pos, hi - lo));
                    }
                    pos += chunk.width();
                }
                SigSpec::from_packed(out)
            }
        }
    }

    pub fn append(&self, other: &SigSpec) -> SigSpec {
        if other.width == 0 {
            return self.clone();
        }
        if self.width == 0 {
            return other.clone();
        }
        if let (SigRepr::Unpacked(lhs), SigRepr::Unpacked(rhs)) = (&self.repr, &other.repr) {
            let mut bits = lhs.clone();
            bits.extend_from_slice(rhs);
            return SigSpec::from_unpacked(bits);
        }
        let mut chunks = self.packed_chunks().into_owned();
        for chunk in other.packed_chunks().iter() {
            push_chunk_merged(&mut chunks, chunk.clone());
        }
        SigSpec::from_packed(chunks)
    }

    pub fn append_bit(&self, bit: SigBit) -> SigSpec {
        self.append(&SigSpec::from_bit(bit))
    }

    pub fn append_chunk(&self, chunk: SigChunk) -> SigSpec {
        self.append(&SigSpec::from_chunk(chunk))
    }

    pub fn replicate(&self, count: usize) -> SigSpec {
        let mut out = SigSpec::empty();
        for _ in 0..count {
            out = out.append(self);
        }
        out
    }

    /// Replaces every occurrence of a wire bit of `pattern` in `self` with
    /// the bit of `with` at the pattern position. Constant bits in the
    /// pattern never match.
    pub fn replace(&self, pattern: &SigSpec, with: &SigSpec) -> SigSpec {
        self.replace_into(pattern, with, self)
    }

    /// Like `replace`, but the edits are applied to `into`, which is indexed
    /// in parallel with `self`.
    pub fn replace_into(&self, pattern: &SigSpec, with: &SigSpec, into: &SigSpec) -> SigSpec {
        assert_eq!(
            pattern.width, with.width,
            "replace pattern/with width mismatch"
        );
        assert_eq!(self.width, into.width, "replace target width mismatch");
        let bits = self.unpacked_bits();
        let pattern_bits = pattern.unpacked_bits();
        let with_bits = with.unpacked_bits();
        let mut out = into.unpacked_bits().into_owned();
        for (i, pattern_bit) in pattern_bits.iter().enumerate() {
            if !pattern_bit.is_wire() {
                continue;
            }
            for (j, bit) in bits.iter().enumerate() {
                if bit == pattern_bit {
                    out[j] = with_bits[i];
                }
            }
        }
        SigSpec::from_unpacked(out)
    }

    /// Replacement driven by an explicit bit-to-bit mapping.
    pub fn replace_map(&self, rules: &BTreeMap<SigBit, SigBit>) -> SigSpec {
        self.replace_map_into(rules, self)
    }

    pub fn replace_map_into(&self, rules: &BTreeMap<SigBit, SigBit>, into: &SigSpec) -> SigSpec {
        assert_eq!(self.width, into.width, "replace target width mismatch");
        if rules.is_empty() {
            return into.clone();
        }
        let bits = self.unpacked_bits();
        let mut out = into.unpacked_bits().into_owned();
        for (i, bit) in bits.iter().enumerate() {
            if let Some(mapped) = rules.get(bit) {
                out[i] = *mapped;
            }
        }
        SigSpec::from_unpacked(out)
    }

    fn pattern_contains(pattern_chunks: &[SigChunk], bit: &SigBit) -> bool {
        let SigBit::Wire { wire, offset } = bit else {
            return false;
        };
        pattern_chunks.iter().any(|chunk| match chunk {
            SigChunk::Slice {
                wire: cw,
                offset: co,
                width,
            } => cw == wire && *offset >= *co && *offset < *co + *width,
            SigChunk::Const(_) => false,
        })
    }

    /// Deletes the bits of `self` that appear in `pattern`.
    pub fn remove(&self, pattern: &SigSpec) -> SigSpec {
        let mut bits = self.unpacked_bits().into_owned();
        let pattern_chunks = pattern.packed_chunks();
        for i in (0..bits.len()).rev() {
            if Self::pattern_contains(&pattern_chunks, &bits[i]) {
                bits.remove(i);
            }
        }
        SigSpec::from_unpacked(bits)
    }

    /// Like `remove`, also deleting the same positions from the parallel
    /// spec `other`. Iterates from the high index down so removals keep the
    /// remaining indices stable.
    pub fn remove_with(&self, pattern: &SigSpec, other: &SigSpec) -> (SigSpec, SigSpec) {
        assert_eq!(self.width, other.width, "remove target width mismatch");
        let mut bits = self.unpacked_bits().into_owned();
        let mut other_bits = other.unpacked_bits().into_owned();
        let pattern_chunks = pattern.packed_chunks();
        for i in (0..bits.len()).rev() {
            if Self::pattern_contains(&pattern_chunks, &bits[i]) {
                bits.remove(i);
                other_bits.remove(i);
            }
        }
        (
            SigSpec::from_unpacked(bits),
            SigSpec::from_unpacked(other_bits),
        )
    }

    /// The dual of `remove`: the bits of `self` that appear in `pattern`,
    /// in pattern-chunk order.
    pub fn extract_matching(&self, pattern: &SigSpec) -> SigSpec {
        self.extract_matching_with(pattern, self)
    }

    /// Like `extract_matching`, but returning the bits of `other` at the
    /// matching positions of `self`.
    pub fn extract_matching_with(&self, pattern: &SigSpec, other: &SigSpec) -> SigSpec {
        assert_eq!(self.width, other.width, "extract target width mismatch");
        let bits = self.unpacked_bits();
        let other_bits = other.unpacked_bits();
        let mut out = Vec::new();
        for chunk in pattern.packed_chunks().iter() {
            let single = std::slice::from_ref(chunk);
            for (i, bit) in bits.iter().enumerate() {
                if Self::pattern_contains(single, bit) {
                    out.push(other_bits[i]);
                }
            }
        }
        SigSpec::from_unpacked(out)
    }

    /// Truncates or pads to exactly `width` bits. Unsigned padding is zero;
    /// signed padding repeats the top bit of the source (an undefined `X`
    /// when the source is empty).
    pub fn extend_u0(&self, width: usize, is_signed: bool) -> SigSpec {
        if self.width >= width {
            return self.extract(0, width);
        }
        let padding = if !is_signed {
            SigBit::Const(BitVal::Zero)
        } else if self.width > 0 {
            self.bit_at(self.width - 1)
        } else {
            SigBit::Const(BitVal::X)
        };
        let mut out = self.clone();
        for _ in self.width..width {
            out = out.append_bit(padding);
        }
        out
    }

    // --- predicates, all over the packed form ---

    /// True when the spec is one chunk covering an entire wire.
    pub fn is_wire(&self, module: &Module) -> bool {
        let chunks = self.packed_chunks();
        match chunks.as_ref() {
            [SigChunk::Slice {
                wire,
                offset: 0,
                width,
            }] => module.wire(*wire).width == *width,
            _ => false,
        }
    }

    pub fn is_chunk(&self) -> bool {
        self.packed_chunks().len() == 1
    }

    pub fn is_fully_const(&self) -> bool {
        self.packed_chunks()
            .iter()
            .all(|c| matches!(c, SigChunk::Const(_)))
    }

    fn const_bits_all(&self, pred: impl Fn(BitVal) -> bool) -> bool {
        self.packed_chunks().iter().all(|c| match c {
            SigChunk::Slice { .. } => false,
            SigChunk::Const(data) => data.bits().iter().all(|b| pred(*b)),
        })
    }

    pub fn is_fully_zero(&self) -> bool {
        self.const_bits_all(|b| b == BitVal::Zero)
    }

    pub fn is_fully_ones(&self) -> bool {
        self.const_bits_all(|b| b == BitVal::One)
    }

    pub fn is_fully_def(&self) -> bool {
        self.const_bits_all(|b| b.is_def())
    }

    pub fn is_fully_undef(&self) -> bool {
        self.const_bits_all(|b| matches!(b, BitVal::X | BitVal::Z))
    }

    pub fn has_const(&self) -> bool {
        self.packed_chunks()
            .iter()
            .any(|c| matches!(c, SigChunk::Const(_)))
    }

    pub fn has_marked_bits(&self) -> bool {
        self.packed_chunks().iter().any(|c| match c {
            SigChunk::Const(data) => data.bits().contains(&BitVal::Mark),
            SigChunk::Slice { .. } => false,
        })
    }

    /// Returns the position of the single set bit of a fully-constant,
    /// fully-defined one-hot spec.
    pub fn is_onehot(&self) -> Option<usize> {
        if !self.is_fully_const() {
            return None;
        }
        self.as_const().is_onehot()
    }

    // --- coercions ---

    /// The constant value of a fully-constant spec.
    pub fn as_const(&self) -> Const {
        let chunks = self.packed_chunks();
        assert!(
            self.is_fully_const() && chunks.len() <= 1,
            "as_const on a non-constant spec"
        );
        match chunks.first() {
            Some(SigChunk::Const(data)) => data.clone(),
            _ => Const::default(),
        }
    }

    pub fn as_int(&self, is_signed: bool) -> i64 {
        self.as_const().as_int(is_signed)
    }

    pub fn as_bool(&self) -> bool {
        self.as_const().as_bool()
    }

    /// MSB-first rendering; wire bits render as `?`.
    pub fn as_string(&self) -> String {
        let chunks = self.packed_chunks();
        let mut out = String::with_capacity(self.width);
        for chunk in chunks.iter().rev() {
            match chunk {
                SigChunk::Const(data) => out.push_str(&data.as_string()),
                SigChunk::Slice { width, .. } => out.extend(std::iter::repeat('?').take(*width)),
            }
        }
        out
    }

    pub fn as_wire(&self, module: &Module) -> WireId {
        assert!(self.is_wire(module), "as_wire on a non-wire spec");
        match self.packed_chunks().first() {
            Some(SigChunk::Slice { wire, .. }) => *wire,
            _ => unreachable!(),
        }
    }

    pub fn as_chunk(&self) -> SigChunk {
        let chunks = self.packed_chunks();
        assert!(chunks.len() == 1, "as_chunk on a multi-chunk spec");
        chunks[0].clone()
    }

    pub fn as_bit(&self) -> SigBit {
        assert!(self.width == 1, "as_bit on a spec of width {}", self.width);
        self.bit_at(0)
    }

    /// The positionwise bit mapping from `self` to `other`.
    pub fn bit_map(&self, other: &SigSpec) -> BTreeMap<SigBit, SigBit> {
        assert_eq!(self.width, other.width, "bit_map width mismatch");
        self.unpacked_bits()
            .iter()
            .copied()
            .zip(other.unpacked_bits().iter().copied())
            .collect()
    }

    /// Width-for-width compare against an MSB-first pattern over
    /// `{'0','1','*',' '}`; `*` accepts `X` or `Z`, space accepts anything.
    /// Any other pattern character is a fatal programmer error.
    pub fn match_str(&self, pattern: &str) -> bool {
        assert_eq!(
            pattern.chars().count(),
            self.width,
            "pattern length does not match spec width"
        );
        let bits = self.unpacked_bits();
        for (bit, ch) in bits.iter().rev().zip(pattern.chars()) {
            match ch {
                ' ' => continue,
                '*' => {
                    if !matches!(bit, SigBit::Const(BitVal::X) | SigBit::Const(BitVal::Z)) {
                        return false;
                    }
                }
                '0' => {
                    if *bit != SigBit::Const(BitVal::Zero) {
                        return false;
                    }
                }
                '1' => {
                    if *bit != SigBit::Const(BitVal::One) {
                        return false;
                    }
                }
                other => panic!("invalid pattern character {:?}", other),
            }
        }
        true
    }

    /// Diagnostic rendering with wire names, MSB-first.
    pub fn describe(&self, module: &Module) -> String {
        let chunks = self.packed_chunks();
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks.iter().rev() {
            match chunk {
                SigChunk::Const(data) => {
                    parts.push(format!("{}'b{}", data.width(), data.as_string()))
                }
                SigChunk::Slice {
                    wire,
                    offset,
                    width,
                } => {
                    let w = module.wire(*wire);
                    if *offset == 0 && *width == w.width {
                        parts.push(w.name.clone());
                    } else if *width == 1 {
                        parts.push(format!("{}[{}]", w.name, offset));
                    } else {
                        parts.push(format!("{}[{}:{}]", w.name, offset + width - 1, offset));
                    }
                }
            }
        }
        if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }

    fn cached_hash(&self) -> u64 {
        if self.width == 0 {
            return 0;
        }
        let cached = self.hash.get();
        if cached != 0 {
            return cached;
        }
        let mut h: u64 = 5381;
        for chunk in self.packed_chunks().iter() {
            match chunk {
                SigChunk::Const(data) => {
                    for bit in data.bits() {
                        h = mix(h, *bit as u64);
                    }
                }
                SigChunk::Slice {
                    wire,
                    offset,
                    width,
                } => {
                    h = mix(h, wire.0 as u64);
                    h = mix(h, *offset as u64);
                    h = mix(h, *width as u64);
                }
            }
        }
        if h == 0 {
            h = 1;
        }
        self.hash.set(h);
        h
    }

    /// Debug-build invariant validation: nonzero chunk widths, no mergeable
    /// adjacency, width accounting.
    pub fn check(&self) {
        #[cfg(debug_assertions)]
        {
            match &self.repr {
                SigRepr::Packed(chunks) => {
                    let mut total = 0;
                    for (i, chunk) in chunks.iter().enumerate() {
                        assert!(chunk.width() > 0, "empty chunk in packed spec");
                        if i > 0 {
                            let prev = &chunks[i - 1];
                            match (prev, chunk) {
                                (SigChunk::Const(_), SigChunk::Const(_)) => {
                                    panic!("adjacent constant chunks not merged")
                                }
                                (
                                    SigChunk::Slice {
                                        wire,
                                        offset,
                                        width,
                                    },
                                    SigChunk::Slice {
                                        wire: w2,
                                        offset: o2,
                                        ..
                                    },
                                ) => {
                                    assert!(
                                        wire != w2 || offset + width != *o2,
                                        "adjacent wire chunks not merged"
                                    );
                                }
                                _ => {}
                            }
                        }
                        total += chunk.width();
                    }
                    assert_eq!(total, self.width, "packed width accounting broken");
                }
                SigRepr::Unpacked(bits) => {
                    assert_eq!(bits.len(), self.width, "unpacked width accounting broken");
                }
            }
        }
    }

    /// Parses a comma-separated signal description against a module's wires;
    /// tokens concatenate MSB-first. Returns None on any malformed input.
    pub fn parse(module: &Module, text: &str) -> Option<SigSpec> {
        let mut sig = SigSpec::empty();
        for token in text.split(',').rev() {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let first = token.chars().next().unwrap();
            if first.is_ascii_digit() || first == '\'' {
                sig = sig.append(&SigSpec::from_const(parse_const_token(token)?));
                continue;
            }
            let (netname, indices) = match token.find('[') {
                Some(pos) if module.find_wire(token).is_none() && token.ends_with(']') => {
                    (&token[..pos], Some(&token[pos + 1..token.len() - 1]))
                }
                _ => (token, None),
            };
            let wire = module.find_wire(netname)?;
            let wire_width = module.wire(wire).width;
            match indices {
                None => sig = sig.append(&SigSpec::wire(wire, wire_width)),
                Some(indices) => {
                    let mut parts = indices.splitn(2, ':');
                    let a: usize = parts.next()?.trim().parse().ok()?;
                    match parts.next() {
                        None => {
                            if a >= wire_width {
                                return None;
                            }
                            sig = sig.append(&SigSpec::slice(wire, a, 1));
                        }
                        Some(b) => {
                            let b: usize = b.trim().parse().ok()?;
                            let (lo, hi) = if a > b { (b, a) } else { (a, b) };
                            if hi >= wire_width {
                                return None;
                            }
                            sig = sig.append(&SigSpec::slice(wire, lo, hi - lo + 1));
                        }
                    }
                }
            }
        }
        Some(sig)
    }

    /// Parses the right-hand side of an assignment, with the `0` / `~0`
    /// shortcuts and bare decimals sized to the left-hand spec.
    pub fn parse_rhs(lhs: &SigSpec, module: &Module, text: &str) -> Option<SigSpec> {
        if text == "0" {
            return Some(SigSpec::repeat_bitval(BitVal::Zero, lhs.width()));
        }
        if text == "~0" {
            return Some(SigSpec::repeat_bitval(BitVal::One, lhs.width()));
        }
        if lhs.is_chunk() {
            if let Ok(value) = text.parse::<i64>() {
                return Some(SigSpec::from_int(value, lhs.width()));
            }
        }
        SigSpec::parse(module, text)
    }
}

/// Parses a literal token: plain decimal (32 bits, Verilog-style), or
/// `<width>'<radix><digits>` with binary, decimal, or hex radix.
fn parse_const_token(token: &str) -> Option<Const> {
    match token.find('\'') {
        None => {
            let value: u64 = token.parse().ok()?;
            Some(Const::from_u64(value, 32))
        }
        Some(pos) => {
            let width: usize = token[..pos].parse().ok()?;
            let rest = &token[pos + 1..];
            let radix = rest.chars().next()?;
            let digits = &rest[1..];
            if digits.is_empty() {
                return None;
            }
            let mut bits: Vec<BitVal> = match radix {
                'b' => {
                    let mut bits = Vec::with_capacity(digits.len());
                    for ch in digits.chars().rev() {
                        bits.push(BitVal::from_char(ch.to_ascii_lowercase())?);
                    }
                    bits
                }
                'd' => {
                    let value: u64 = digits.parse().ok()?;
                    Const::from_u64(value, 64).bits().to_vec()
                }
                'h' => {
                    let mut bits = Vec::with_capacity(digits.len() * 4);
                    for ch in digits.chars().rev() {
                        let nibble = ch.to_digit(16)?;
                        for i in 0..4 {
                            bits.push(if (nibble >> i) & 1 == 1 {
                                BitVal::One
                            } else {
                                BitVal::Zero
                            });
                        }
                    }
                    bits
                }
                _ => return None,
            };
            bits.resize(width, BitVal::Zero);
            Some(Const::new(bits))
        }
    }
}

impl PartialEq for SigSpec {
    fn eq(&self, other: &Self) -> bool {
        if self.width != other.width {
            return false;
        }
        if self.width == 0 {
            return true;
        }
        if self.cached_hash() != other.cached_hash() {
            return false;
        }
        self.packed_chunks() == other.packed_chunks()
    }
}

impl Eq for SigSpec {}

impl std::hash::Hash for SigSpec {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash());
    }
}

impl PartialOrd for SigSpec {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SigSpec {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.width != other.width {
            return self.width.cmp(&other.width);
        }
        if self.width == 0 {
            return std::cmp::Ordering::Equal;
        }
        let lhs = self.packed_chunks();
        let rhs = other.packed_chunks();
        lhs.len()
            .cmp(&rhs.len())
            .then_with(|| self.cached_hash().cmp(&other.cached_hash()))
            .then_with(|| lhs.cmp(&rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::Module;
    use pretty_assertions::assert_eq;

    fn fixture() -> (Module, WireId, WireId) {
        let mut m = Module::new("m");
        let a = m.add_input("a", 8);
        let b = m.add_input("b", 4);
        (m, a, b)
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let (_m, a, b) = fixture();
        let sig = SigSpec::wire(a, 8)
            .append(&SigSpec::from_u64(5, 3))
            .append(&SigSpec::slice(b, 1, 2));
        let unpacked = sig.unpack();
        assert_eq!(unpacked.to_bits().len(), sig.width());
        assert_eq!(unpacked.pack(), sig);
        // Idempotence both ways.
        assert_eq!(sig.pack(), sig);
        assert_eq!(unpacked.unpack(), unpacked);
    }

    #[test]
    fn test_maximal_chunk_on_append() {
        let (_m, a, _b) = fixture();
        // Adjacent slices of the same wire merge into one chunk.
        let sig = SigSpec::slice(a, 0, 4).append(&SigSpec::slice(a, 4, 4));
        assert!(sig.is_chunk());
        assert_eq!(sig.width(), 8);
        // Adjacent constants merge as well.
        let c = SigSpec::from_u64(1, 2).append(&SigSpec::from_u64(2, 2));
        assert!(c.is_chunk());
        assert_eq!(c.as_const().as_int(false), 0b1001);
        // Non-contiguous slices stay separate.
        let gap = SigSpec::slice(a, 0, 2).append(&SigSpec::slice(a, 4, 2));
        assert_eq!(gap.chunks().len(), 2);
    }

    #[test]
    fn test_extract_composition() {
        let (_m, a, b) = fixture();
        let sig = SigSpec::wire(a, 8).append(&SigSpec::wire(b, 4));
        assert_eq!(sig.extract(0, sig.width()), sig);
        let left = sig.extract(2, 5);
        let right = sig.extract(7, 3);
        assert_eq!(left.append(&right), sig.extract(2, 8));
    }

    #[test]
    fn test_append_identity_and_associativity() {
        let (_m, a, b) = fixture();
        let x = SigSpec::slice(a, 0, 3);
        let y = SigSpec::from_u64(5, 3);
        let z = SigSpec::slice(b, 1, 2);
        let empty = SigSpec::empty();
        assert_eq!(empty.append(&x), x);
        assert_eq!(x.append(&empty), x);
        assert_eq!(x.append(&y).append(&z), x.append(&y.append(&z)));
    }

    #[test]
    fn test_replace() {
        let (_m, a, b) = fixture();
        // Replace the low nibble of a with b.
        let sig = SigSpec::wire(a, 8);
        let replaced = sig.replace(&SigSpec::slice(a, 0, 4), &SigSpec::wire(b, 4));
        assert_eq!(
            replaced,
            SigSpec::wire(b, 4).append(&SigSpec::slice(a, 4, 4))
        );
        // Constant pattern bits are ignored.
        let pattern = SigSpec::from_u64(0, 4).append(&SigSpec::slice(a, 4, 4));
        let with = SigSpec::slice(b, 0, 4).append(&SigSpec::from_u64(0xf, 4));
        let replaced = sig.replace(&pattern, &with);
        assert_eq!(
            replaced,
            SigSpec::slice(a, 0, 4).append(&SigSpec::repeat_bitval(BitVal::One, 4))
        );
    }

    #[test]
    fn test_replace_map() {
        let (_m, a, b) = fixture();
        let rules: BTreeMap<SigBit, SigBit> = SigSpec::slice(a, 0, 4)
            .bit_map(&SigSpec::wire(b, 4));
        let sig = SigSpec::slice(a, 0, 2);
        assert_eq!(sig.replace_map(&rules), SigSpec::slice(b, 0, 2));
    }

    #[test]
    fn test_remove_and_extract_matching() {
        let (_m, a, b) = fixture();
        let sig = SigSpec::slice(a, 0, 4).append(&SigSpec::wire(b, 4));
        let removed = sig.remove(&SigSpec::wire(a, 8));
        assert_eq!(removed, SigSpec::wire(b, 4));
        let matching = sig.extract_matching(&SigSpec::wire(a, 8));
        assert_eq!(matching, SigSpec::slice(a, 0, 4));
        // Parallel edits keep the indices aligned.
        let parallel = SigSpec::from_u64(0xab, 8);
        let (kept, other) = sig.remove_with(&SigSpec::wire(b, 4), &parallel);
        assert_eq!(kept, SigSpec::slice(a, 0, 4));
        assert_eq!(other, parallel.extract(0, 4));
    }

    #[test]
    fn test_extend_u0() {
        let (_m, a, _b) = fixture();
        let sig = SigSpec::slice(a, 2, 3);
        assert_eq!(sig.extend_u0(2, false), SigSpec::slice(a, 2, 2));
        assert_eq!(
            sig.extend_u0(5, false),
            SigSpec::slice(a, 2, 3).append(&SigSpec::from_u64(0, 2))
        );
        let signed = sig.extend_u0(5, true);
        assert_eq!(
            signed,
            SigSpec::slice(a, 2, 3)
                .append(&SigSpec::from_bit(SigBit::Wire { wire: a, offset: 4 }))
                .append(&SigSpec::from_bit(SigBit::Wire { wire: a, offset: 4 }))
        );
        assert_eq!(
            SigSpec::empty().extend_u0(2, true),
            SigSpec::repeat_bitval(BitVal::X, 2)
        );
    }

    #[test]
    fn test_predicates() {
        let (m, a, _b) = fixture();
        assert!(SigSpec::wire(a, 8).is_wire(&m));
        assert!(!SigSpec::slice(a, 0, 4).is_wire(&m));
        assert!(SigSpec::slice(a, 0, 4).is_chunk());
        let c = SigSpec::from_u64(0, 4);
        assert!(c.is_fully_const());
        assert!(c.is_fully_zero());
        assert!(!c.is_fully_ones());
        assert!(c.is_fully_def());
        assert!(SigSpec::repeat_bitval(BitVal::X, 3).is_fully_undef());
        assert!(SigSpec::wire(a, 8).append(&c).has_const());
        assert!(SigSpec::repeat_bitval(BitVal::Mark, 1).has_marked_bits());
        assert_eq!(SigSpec::from_u64(0b0100, 4).is_onehot(), Some(2));
        assert_eq!(SigSpec::from_u64(0b0101, 4).is_onehot(), None);
        assert_eq!(SigSpec::from_u64(0, 4).is_onehot(), None);
    }

    #[test]
    fn test_coercions() {
        let (m, a, _b) = fixture();
        let c = SigSpec::from_u64(0xa5, 8);
        assert_eq!(c.as_const().as_string(), "10100101");
        assert_eq!(c.as_int(false), 0xa5);
        assert_eq!(c.as_int(true), -91);
        assert!(c.as_bool());
        assert_eq!(c.as_string(), "10100101");
        assert_eq!(SigSpec::wire(a, 8).as_wire(&m), a);
        let mixed = SigSpec::from_u64(1, 1).append(&SigSpec::slice(a, 0, 2));
        assert_eq!(mixed.as_string(), "??1");
        let bit = SigSpec::slice(a, 3, 1).as_bit();
        assert_eq!(bit, SigBit::Wire { wire: a, offset: 3 });
    }

    #[test]
    fn test_match_str() {
        let spec = SigSpec::from_const(Const::from_str("01x1").unwrap());
        assert!(spec.match_str("01*1"));
        assert!(spec.match_str("0 *1"));
        assert!(!spec.match_str("11*1"));
        assert!(!spec.match_str("0101"));
    }

    #[test]
    #[should_panic]
    fn test_match_str_bad_char_panics() {
        SigSpec::from_u64(0, 2).match_str("0q");
    }

    #[test]
    fn test_hash_and_ordering() {
        let (_m, a, b) = fixture();
        let x = SigSpec::slice(a, 0, 4).append(&SigSpec::wire(b, 4));
        // An unpacked rendering of the same bits is equal and hashes equal.
        let y = x.unpack();
        assert_eq!(x, y);
        use std::hash::{Hash, Hasher};
        let mut hx = std::collections::hash_map::DefaultHasher::new();
        let mut hy = std::collections::hash_map::DefaultHasher::new();
        x.hash(&mut hx);
        y.hash(&mut hy);
        assert_eq!(hx.finish(), hy.finish());
        // Total order: width dominates.
        assert!(SigSpec::from_u64(0, 2) < SigSpec::from_u64(0, 3));
        assert_eq!(x.cmp(&y), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_empty_spec_boundary() {
        let empty = SigSpec::empty();
        assert_eq!(empty, SigSpec::empty());
        assert_eq!(empty.cached_hash(), 0);
        assert!(empty.is_fully_const());
        assert!(empty.is_fully_zero());
        assert_eq!(empty.as_const(), Const::default());
        assert_eq!(empty.as_string(), "");
    }

    #[test]
    fn test_const_round_trip() {
        let c = Const::from_str("1011x").unwrap();
        assert_eq!(c.as_string(), "1011x");
        assert!(!c.is_fully_def());
        assert_eq!(SigSpec::from_const(c.clone()).as_string(), "1011x");
        assert_eq!(Const::from_int(-1, 4).as_string(), "1111");
        assert_eq!(Const::from_int(-2, 4).as_int(true), -2);
    }

    #[test]
    fn test_parse() {
        let (m, a, b) = fixture();
        let sig = SigSpec::parse(&m, "a").unwrap();
        assert_eq!(sig, SigSpec::wire(a, 8));
        let sig = SigSpec::parse(&m, "a[3]").unwrap();
        assert_eq!(sig, SigSpec::slice(a, 3, 1));
        let sig = SigSpec::parse(&m, "a[5:2]").unwrap();
        assert_eq!(sig, SigSpec::slice(a, 2, 4));
        // MSB-first concatenation: first token is the high part.
        let sig = SigSpec::parse(&m, "a[7:4],b").unwrap();
        assert_eq!(sig, SigSpec::wire(b, 4).append(&SigSpec::slice(a, 4, 4)));
        let sig = SigSpec::parse(&m, "4'b1010").unwrap();
        assert_eq!(sig.as_const().as_string(), "1010");
        let sig = SigSpec::parse(&m, "8'hA5").unwrap();
        assert_eq!(sig.as_int(false), 0xa5);
        let sig = SigSpec::parse(&m, "4'd9").unwrap();
        assert_eq!(sig.as_int(false), 9);
        let sig = SigSpec::parse(&m, "7").unwrap();
        assert_eq!(sig.width(), 32);
        assert_eq!(sig.as_int(false), 7);
        // Malformed inputs are rejected without effect.
        assert!(SigSpec::parse(&m, "nope").is_none());
        assert!(SigSpec::parse(&m, "a[9]").is_none());
        assert!(SigSpec::parse(&m, "a[8:0]").is_none());
        assert!(SigSpec::parse(&m, "4'q0").is_none());
    }

    #[test]
    fn test_parse_rhs() {
        let (m, a, _b) = fixture();
        let lhs = SigSpec::wire(a, 8);
        assert!(SigSpec::parse_rhs(&lhs, &m, "0").unwrap().is_fully_zero());
        assert!(SigSpec::parse_rhs(&lhs, &m, "~0").unwrap().is_fully_ones());
        let sized = SigSpec::parse_rhs(&lhs, &m, "42").unwrap();
        assert_eq!(sized.width(), 8);
        assert_eq!(sized.as_int(false), 42);
    }

    #[test]
    fn test_describe() {
        let (m, a, b) = fixture();
        let sig = SigSpec::wire(b, 4)
            .append(&SigSpec::slice(a, 2, 3))
            .append(&SigSpec::from_u64(5, 3));
        assert_eq!(sig.describe(&m), "{3'b101,a[4:2],b}");
        assert_eq!(SigSpec::wire(a, 8).describe(&m), "a");
        assert_eq!(SigSpec::slice(a, 1, 1).describe(&m), "a[1]");
    }
}
