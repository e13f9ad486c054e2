// SPDX-License-Identifier: Apache-2.0

//! Circuit records and the catalog that owns them.
//!
//! A circuit is one connected region of a single classification on one grid
//! channel. Circuits are identified by their index in the catalog; ids are
//! allocated densely while building and renumbered (never reused) by id
//! compaction.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CircuitId(pub usize);

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetId(pub usize);

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical classification of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CircuitKind {
    Active,
    Poly,
    Metal,
    /// Buried contact: active and poly shorted together.
    Buried,
    /// Active/poly overlap forming a gate channel.
    Transistor,
    /// Capacitor plate; belongs to one net on each side of its dielectric.
    Capacitor,
    /// Spurious overlap absorbed into its neighbors; dropped by compaction.
    Disabled,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 7] = [
        CircuitKind::Active,
        CircuitKind::Poly,
        CircuitKind::Metal,
        CircuitKind::Buried,
        CircuitKind::Transistor,
        CircuitKind::Capacitor,
        CircuitKind::Disabled,
    ];

    /// Single character used by the netlist exchange format.
    pub fn code(self) -> char {
        match self {
            CircuitKind::Active => 'a',
            CircuitKind::Poly => 'p',
            CircuitKind::Metal => 'm',
            CircuitKind::Buried => 'b',
            CircuitKind::Transistor => 't',
            CircuitKind::Capacitor => 'c',
            CircuitKind::Disabled => '*',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        CircuitKind::ALL.iter().copied().find(|k| k.code() == c)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitKind::Active => "active",
            CircuitKind::Poly => "poly",
            CircuitKind::Metal => "metal",
            CircuitKind::Buried => "buried",
            CircuitKind::Transistor => "transistor",
            CircuitKind::Capacitor => "capacitor",
            CircuitKind::Disabled => "disabled",
        }
    }

    /// Whether a neighbor of this kind makes a transistor terminal group.
    pub fn is_terminal_side(self) -> bool {
        matches!(
            self,
            CircuitKind::Active | CircuitKind::Buried | CircuitKind::Capacitor
        )
    }

    /// Whether a neighbor of this kind makes a transistor gate group.
    pub fn is_gate_side(self) -> bool {
        matches!(
            self,
            CircuitKind::Poly | CircuitKind::Buried | CircuitKind::Capacitor
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Returns true for an Active/Poly pairing in either order. Every gate
/// boundary produces such adjacencies and they carry no electrical meaning.
pub fn is_active_poly_pair(a: CircuitKind, b: CircuitKind) -> bool {
    matches!(
        (a, b),
        (CircuitKind::Active, CircuitKind::Poly) | (CircuitKind::Poly, CircuitKind::Active)
    )
}

/// Which plate of a circuit a net claim refers to. Only capacitors hold a
/// distinct net on each side; every other kind has a single net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Active,
    Poly,
}

/// Inclusive pixel bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BoundingBox {
    pub fn point(x: i32, y: i32) -> Self {
        BoundingBox {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        }
    }

    pub fn include(&mut self, x: i32, y: i32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    pub fn union(&mut self, other: &BoundingBox) {
        self.include(other.x0, other.y0);
        self.include(other.x1, other.y1);
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0 + 1
    }

    /// The same box in the bottom-left-origin frame of a grid `height`
    /// pixels tall. All user-facing coordinates use that frame.
    pub fn flipped(&self, height: i32) -> BoundingBox {
        BoundingBox {
            x0: self.x0,
            y0: height - 1 - self.y1,
            x1: self.x1,
            y1: height - 1 - self.y0,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})-({}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitRecord {
    pub kind: CircuitKind,
    pub bbox: BoundingBox,
    pub pixel_count: u64,
    pub net: Option<NetId>,
    /// Only meaningful for capacitors.
    pub net_poly_side: Option<NetId>,
    pub neighbors: BTreeSet<CircuitId>,
    /// Created from a metal-link override rather than from mask pixels; it
    /// owns no grid cells.
    pub synthetic: bool,
}

impl CircuitRecord {
    /// A record seeded at one pixel, before any pixel has been counted.
    pub fn new(kind: CircuitKind, x: i32, y: i32) -> Self {
        CircuitRecord {
            kind,
            bbox: BoundingBox::point(x, y),
            pixel_count: 0,
            net: None,
            net_poly_side: None,
            neighbors: BTreeSet::new(),
            synthetic: false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.kind != CircuitKind::Disabled
    }

    pub fn net_on(&self, side: Side) -> Option<NetId> {
        if side == Side::Poly && self.kind == CircuitKind::Capacitor {
            self.net_poly_side
        } else {
            self.net
        }
    }

    pub fn set_net_on(&mut self, side: Side, net: NetId) {
        if side == Side::Poly && self.kind == CircuitKind::Capacitor {
            self.net_poly_side = Some(net);
        } else {
            self.net = Some(net);
        }
    }
}

/// Per-kind circuit counts, as logged after each building stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub active: usize,
    pub poly: usize,
    pub metal: usize,
    pub buried: usize,
    pub transistor: usize,
    pub capacitor: usize,
    pub disabled: usize,
    pub total: usize,
}

impl KindCounts {
    pub fn from_kinds(kinds: impl Iterator<Item = CircuitKind>) -> Self {
        let mut per_kind = [0usize; 7];
        for kind in kinds {
            per_kind[kind.index()] += 1;
        }
        KindCounts {
            active: per_kind[0],
            poly: per_kind[1],
            metal: per_kind[2],
            buried: per_kind[3],
            transistor: per_kind[4],
            capacitor: per_kind[5],
            disabled: per_kind[6],
            total: per_kind.iter().sum(),
        }
    }
}

impl fmt::Display for KindCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} active, {} poly, {} metal, {} buried, {} gates, {} capacitors, {} disabled, {} total",
            self.active,
            self.poly,
            self.metal,
            self.buried,
            self.transistor,
            self.capacitor,
            self.disabled,
            self.total
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CircuitCatalog {
    circuits: Vec<CircuitRecord>,
}

impl CircuitCatalog {
    pub fn new() -> Self {
        CircuitCatalog::default()
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    /// The id the next pushed record will receive.
    pub fn next_id(&self) -> CircuitId {
        CircuitId(self.circuits.len())
    }

    pub fn push(&mut self, record: CircuitRecord) -> CircuitId {
        let id = self.next_id();
        self.circuits.push(record);
        id
    }

    pub fn get(&self, id: CircuitId) -> Option<&CircuitRecord> {
        self.circuits.get(id.0)
    }

    pub fn kind(&self, id: CircuitId) -> CircuitKind {
        self.circuits[id.0].kind
    }

    pub fn ids(&self) -> impl Iterator<Item = CircuitId> {
        (0..self.circuits.len()).map(CircuitId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CircuitId, &CircuitRecord)> {
        self.circuits
            .iter()
            .enumerate()
            .map(|(i, c)| (CircuitId(i), c))
    }

    pub fn records(&self) -> &[CircuitRecord] {
        &self.circuits
    }

    pub fn counts(&self) -> KindCounts {
        KindCounts::from_kinds(self.circuits.iter().map(|c| c.kind))
    }

    /// Replaces the record list wholesale; used by id compaction.
    pub(crate) fn replace_records(&mut self, circuits: Vec<CircuitRecord>) {
        self.circuits = circuits;
    }

    /// Adds an undirected adjacency between `a` and `b`.
    pub fn link(&mut self, a: CircuitId, b: CircuitId) {
        if a == b {
            return;
        }
        self.circuits[a.0].neighbors.insert(b);
        self.circuits[b.0].neighbors.insert(a);
    }
}

impl Index<CircuitId> for CircuitCatalog {
    type Output = CircuitRecord;

    fn index(&self, id: CircuitId) -> &CircuitRecord {
        &self.circuits[id.0]
    }
}

impl IndexMut<CircuitId> for CircuitCatalog {
    fn index_mut(&mut self, id: CircuitId) -> &mut CircuitRecord {
        &mut self.circuits[id.0]
    }
}
