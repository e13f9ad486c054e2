// SPDX-License-Identifier: Apache-2.0

//! Via blobs and the metal to active/poly links they make.

use crate::circuit::{CircuitCatalog, CircuitId, CircuitKind};
use crate::circuit_grid::GridRead;
use crate::fill::{flood_fill, FillTarget};
use crate::mask::BinaryMask;
use crate::progress::ProgressMeter;
use bitvec::vec::BitVec;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViaRecord {
    pub metal: CircuitId,
    pub active_poly: CircuitId,
}

/// Bidirectional lookup of accepted vias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViaMap {
    metal_to_active_poly: BTreeMap<CircuitId, Vec<CircuitId>>,
    active_poly_to_metal: BTreeMap<CircuitId, Vec<CircuitId>>,
}

impl ViaMap {
    pub fn add(&mut self, via: ViaRecord) {
        self.metal_to_active_poly
            .entry(via.metal)
            .or_default()
            .push(via.active_poly);
        self.active_poly_to_metal
            .entry(via.active_poly)
            .or_default()
            .push(via.metal);
    }

    pub fn active_poly_of(&self, metal: CircuitId) -> &[CircuitId] {
        self.metal_to_active_poly
            .get(&metal)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn metals_of(&self, active_poly: CircuitId) -> &[CircuitId] {
        self.active_poly_to_metal
            .get(&active_poly)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// A problem found on one via blob. Coordinates are in the
/// bottom-left-origin frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViaDiagnostic {
    MultipleMetal { x: i32, y: i32 },
    SplitActivePoly { x: i32, y: i32 },
    TouchesTransistor { x: i32, y: i32 },
    TouchesCapacitor { x: i32, y: i32 },
    MultipleActivePoly { x: i32, y: i32 },
    NoMetal { x: i32, y: i32 },
    NoActivePoly { x: i32, y: i32 },
}

impl ViaDiagnostic {
    fn same_kind(&self, other: &ViaDiagnostic) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for ViaDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViaDiagnostic::MultipleMetal { x, y } => {
                write!(f, "via at ({}, {}) touches multiple metal tracks", x, y)
            }
            ViaDiagnostic::SplitActivePoly { x, y } => {
                write!(f, "via at ({}, {}) touches split active/poly", x, y)
            }
            ViaDiagnostic::TouchesTransistor { x, y } => {
                write!(f, "via at ({}, {}) touches a transistor", x, y)
            }
            ViaDiagnostic::TouchesCapacitor { x, y } => {
                write!(f, "via at ({}, {}) touches a capacitor", x, y)
            }
            ViaDiagnostic::MultipleActivePoly { x, y } => {
                write!(f, "via at ({}, {}) touches multiple poly/layer zones", x, y)
            }
            ViaDiagnostic::NoMetal { x, y } => {
                write!(f, "via at ({}, {}) does not touch the metal", x, y)
            }
            ViaDiagnostic::NoActivePoly { x, y } => {
                write!(f, "via at ({}, {}) does not touch poly or active", x, y)
            }
        }
    }
}

/// Result of via mapping: the accepted vias, their lookup map, and the
/// diagnostics of every rejected blob.
#[derive(Debug, Clone, Default)]
pub struct ViaMapping {
    pub vias: Vec<ViaRecord>,
    pub map: ViaMap,
    pub diagnostics: Vec<ViaDiagnostic>,
}

impl ViaMapping {
    pub fn accept(&mut self, via: ViaRecord) {
        self.vias.push(via);
        self.map.add(via);
    }
}

struct ViaFill<'a, G: GridRead> {
    vias: &'a BinaryMask,
    used: &'a mut BitVec,
    grid: &'a G,
    catalog: &'a CircuitCatalog,
    metal: Option<CircuitId>,
    active_poly: Option<CircuitId>,
    diagnostics: Vec<ViaDiagnostic>,
}

impl<G: GridRead> ViaFill<'_, G> {
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.vias.width() + x as usize
    }

    /// Keeps the first occurrence of each kind of problem.
    fn report(&mut self, diagnostic: ViaDiagnostic) {
        if !self.diagnostics.iter().any(|d| d.same_kind(&diagnostic)) {
            self.diagnostics.push(diagnostic);
        }
    }
}

impl<G: GridRead> FillTarget for ViaFill<'_, G> {
    type Color = bool;

    fn width(&self) -> i32 {
        self.vias.width() as i32
    }

    fn height(&self) -> i32 {
        self.vias.height() as i32
    }

    fn read(&self, x: i32, y: i32) -> bool {
        self.vias.get(x, y)
    }

    fn mark(&mut self, x: i32, y: i32) {
        let i = self.index(x, y);
        self.used.set(i, true);

        let fy = self.grid.height() as i32 - 1 - y;
        let on_active = self.grid.get(0, x, y);
        let on_poly = self.grid.poly_channel().and_then(|c| self.grid.get(c, x, y));
        let on_metal = self.grid.get(self.grid.metal_channel(), x, y);

        if let Some(m) = on_metal {
            match self.metal {
                None => self.metal = Some(m),
                Some(existing) if existing != m => {
                    self.report(ViaDiagnostic::MultipleMetal { x, y: fy })
                }
                Some(_) => {}
            }
        }

        match (on_active, on_poly) {
            (Some(a), Some(p)) if a != p => {
                self.report(ViaDiagnostic::SplitActivePoly { x, y: fy })
            }
            (Some(id), _) | (None, Some(id)) => match self.catalog.kind(id) {
                CircuitKind::Transistor => {
                    self.report(ViaDiagnostic::TouchesTransistor { x, y: fy })
                }
                CircuitKind::Capacitor => {
                    self.report(ViaDiagnostic::TouchesCapacitor { x, y: fy })
                }
                _ => match self.active_poly {
                    None => self.active_poly = Some(id),
                    Some(existing) if existing != id => {
                        self.report(ViaDiagnostic::MultipleActivePoly { x, y: fy })
                    }
                    Some(_) => {}
                },
            },
            (None, None) => {}
        }
    }

    fn is_marked(&self, x: i32, y: i32) -> bool {
        self.used[self.index(x, y)]
    }
}

/// Flood-fills every via blob and keeps those touching exactly one metal
/// circuit and exactly one active/poly circuit that is neither a transistor
/// nor a capacitor. Any problem excludes the via and is reported.
pub fn map_vias<G: GridRead>(
    vias: Option<&BinaryMask>,
    catalog: &CircuitCatalog,
    grid: &G,
) -> ViaMapping {
    let mut progress = ProgressMeter::start("mapping vias");
    let mut mapping = ViaMapping::default();
    let Some(vias) = vias else {
        return mapping;
    };
    let mut used = BitVec::repeat(false, vias.width() * vias.height());
    let height = vias.height() as i32;
    for y in 0..height {
        progress.tick(y as usize, height as usize);
        for x in 0..vias.width() as i32 {
            if !vias.get(x, y) || used[y as usize * vias.width() + x as usize] {
                continue;
            }
            let mut blob = ViaFill {
                vias,
                used: &mut used,
                grid,
                catalog,
                metal: None,
                active_poly: None,
                diagnostics: Vec::new(),
            };
            flood_fill(&mut blob, x, y, true);

            let fy = grid.height() as i32 - 1 - y;
            if blob.metal.is_none() {
                blob.report(ViaDiagnostic::NoMetal { x, y: fy });
            }
            if blob.active_poly.is_none() {
                blob.report(ViaDiagnostic::NoActivePoly { x, y: fy });
            }
            match (blob.metal, blob.active_poly, blob.diagnostics.is_empty()) {
                (Some(metal), Some(active_poly), true) => {
                    mapping.accept(ViaRecord { metal, active_poly })
                }
                _ => {
                    for d in &blob.diagnostics {
                        log::warn!("{}", d);
                    }
                    mapping.diagnostics.extend(blob.diagnostics);
                }
            }
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_grid::CircuitGrid;
    use crate::test_utils::{paint_circuit, rect_mask};
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_via_links_metal_and_active() {
        let mut grid = CircuitGrid::anonymous(3, 6, 4).unwrap();
        let mut catalog = CircuitCatalog::new();
        let a = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 0, 5, 1));
        let m = paint_circuit(&mut catalog, &mut grid, 2, CircuitKind::Metal, (1, 0, 3, 3));
        let vias = rect_mask(6, 4, &[(2, 0, 2, 1)]);

        let mapping = map_vias(Some(&vias), &catalog, &grid);
        assert!(mapping.diagnostics.is_empty());
        assert_eq!(
            mapping.vias,
            vec![ViaRecord {
                metal: m,
                active_poly: a
            }]
        );
        assert_eq!(mapping.map.metals_of(a), &[m]);
        assert_eq!(mapping.map.active_poly_of(m), &[a]);
    }

    #[test]
    fn via_over_two_metal_tracks_is_rejected() {
        let mut grid = CircuitGrid::anonymous(3, 8, 4).unwrap();
        let mut catalog = CircuitCatalog::new();
        paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 0, 7, 3));
        paint_circuit(&mut catalog, &mut grid, 2, CircuitKind::Metal, (0, 0, 3, 3));
        paint_circuit(&mut catalog, &mut grid, 2, CircuitKind::Metal, (5, 0, 7, 3));
        let vias = rect_mask(8, 4, &[(2, 1, 6, 1)]);

        let mapping = map_vias(Some(&vias), &catalog, &grid);
        assert!(mapping.vias.is_empty());
        assert_eq!(
            mapping.diagnostics,
            vec![ViaDiagnostic::MultipleMetal { x: 5, y: 2 }]
        );
        assert_eq!(
            mapping.diagnostics[0].to_string(),
            "via at (5, 2) touches multiple metal tracks"
        );
        assert!(mapping.map.metals_of(CircuitId(0)).is_empty());
    }

    #[test]
    fn via_on_transistor_or_nothing_is_rejected() {
        let mut grid = CircuitGrid::anonymous(3, 6, 2).unwrap();
        let mut catalog = CircuitCatalog::new();
        paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Transistor, (0, 0, 1, 1));
        paint_circuit(&mut catalog, &mut grid, 2, CircuitKind::Metal, (0, 0, 5, 1));
        let vias = rect_mask(6, 2, &[(0, 0, 0, 0), (4, 1, 4, 1)]);

        let mapping = map_vias(Some(&vias), &catalog, &grid);
        assert!(mapping.vias.is_empty());
        assert_eq!(
            mapping.diagnostics,
            vec![
                ViaDiagnostic::TouchesTransistor { x: 0, y: 1 },
                ViaDiagnostic::NoActivePoly { x: 0, y: 1 },
                ViaDiagnostic::NoActivePoly { x: 4, y: 0 },
            ]
        );
    }

    #[test]
    fn missing_via_layer_maps_nothing() {
        let grid = CircuitGrid::anonymous(2, 2, 2).unwrap();
        let mapping = map_vias(None, &CircuitCatalog::new(), &grid);
        assert!(mapping.vias.is_empty());
        assert!(mapping.diagnostics.is_empty());
    }
}
