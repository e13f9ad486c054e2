// SPDX-License-Identifier: Apache-2.0

//! User-declared metal links: two points on metal asserted to be the same
//! conductor, for connections that leave the die or that an artifact hides.

use crate::circuit::{BoundingBox, CircuitCatalog, CircuitId, CircuitKind, CircuitRecord};
use crate::circuit_grid::GridRead;
use crate::vias::{ViaMapping, ViaRecord};
use std::fmt;

/// A `metal-link x1 y1 x2 y2` override. Coordinates are in the
/// bottom-left-origin frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetalLink {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// The synthetic circuit standing for the link, once created.
    pub circuit: Option<CircuitId>,
}

impl MetalLink {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        MetalLink {
            x1,
            y1,
            x2,
            y2,
            circuit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetalLinkFault {
    pub link: usize,
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for MetalLinkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "metal-link #{} endpoint ({}, {}) is not on metal",
            self.link + 1,
            self.x,
            self.y
        )
    }
}

/// Appends one synthetic circuit of `kind` per link. The circuit owns no
/// grid cells; its box spans both endpoints and its area is the Manhattan
/// length of the link.
pub fn add_link_circuits(
    links: &mut [MetalLink],
    catalog: &mut CircuitCatalog,
    kind: CircuitKind,
    height: i32,
) {
    for link in links.iter_mut() {
        let (gy1, gy2) = (height - 1 - link.y1, height - 1 - link.y2);
        let mut bbox = BoundingBox::point(link.x1, gy1);
        bbox.include(link.x2, gy2);
        let mut record = CircuitRecord::new(kind, link.x1, gy1);
        record.bbox = bbox;
        record.pixel_count = ((link.x2 - link.x1).abs() + (link.y2 - link.y1).abs() + 1) as u64;
        record.synthetic = true;
        let id = catalog.push(record);
        log::debug!(
            "metal-link ({}, {})-({}, {}) as {}{}",
            link.x1,
            link.y1,
            link.x2,
            link.y2,
            kind.code(),
            id
        );
        link.circuit = Some(id);
    }
}

/// Connects each link circuit to the metal under both of its endpoints.
pub fn add_link_vias<G: GridRead>(
    links: &[MetalLink],
    grid: &G,
    mapping: &mut ViaMapping,
) -> Result<(), MetalLinkFault> {
    let height = grid.height() as i32;
    let metal_channel = grid.metal_channel();
    for (i, link) in links.iter().enumerate() {
        let Some(circuit) = link.circuit else {
            continue;
        };
        for (x, y) in [(link.x1, link.y1), (link.x2, link.y2)] {
            let metal = grid
                .get(metal_channel, x, height - 1 - y)
                .ok_or(MetalLinkFault { link: i, x, y })?;
            mapping.accept(ViaRecord {
                metal,
                active_poly: circuit,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_grid::CircuitGrid;
    use crate::test_utils::paint_circuit;

    #[test]
    fn link_circuit_spans_both_endpoints() {
        let mut catalog = CircuitCatalog::new();
        let mut links = vec![MetalLink::new(7, 1, 2, 4)];
        add_link_circuits(&mut links, &mut catalog, CircuitKind::Poly, 10);
        let id = links[0].circuit.unwrap();
        let record = &catalog[id];
        assert!(record.synthetic);
        assert_eq!(record.kind, CircuitKind::Poly);
        assert_eq!(record.pixel_count, 9);
        assert_eq!(record.bbox.to_string(), "(2, 5)-(7, 8)");
    }

    #[test]
    fn link_vias_reach_both_metal_tracks() {
        let mut grid = CircuitGrid::anonymous(2, 10, 4).unwrap();
        let mut catalog = CircuitCatalog::new();
        let m1 = paint_circuit(&mut catalog, &mut grid, 1, CircuitKind::Metal, (0, 0, 2, 3));
        let m2 = paint_circuit(&mut catalog, &mut grid, 1, CircuitKind::Metal, (7, 0, 9, 3));
        let mut links = vec![MetalLink::new(1, 0, 8, 3)];
        add_link_circuits(&mut links, &mut catalog, CircuitKind::Active, 4);
        let link = links[0].circuit.unwrap();

        let mut mapping = ViaMapping::default();
        add_link_vias(&links, &grid, &mut mapping).unwrap();
        assert_eq!(mapping.map.metals_of(link), &[m1, m2]);
        assert_eq!(mapping.map.active_poly_of(m2), &[link]);
    }

    #[test]
    fn endpoint_off_metal_is_fatal() {
        let mut grid = CircuitGrid::anonymous(2, 10, 4).unwrap();
        let mut catalog = CircuitCatalog::new();
        paint_circuit(&mut catalog, &mut grid, 1, CircuitKind::Metal, (0, 0, 2, 3));
        let mut links = vec![MetalLink::new(1, 0, 5, 3)];
        add_link_circuits(&mut links, &mut catalog, CircuitKind::Active, 4);
        let mut mapping = ViaMapping::default();
        let fault = add_link_vias(&links, &grid, &mut mapping).unwrap_err();
        assert_eq!(fault, MetalLinkFault { link: 0, x: 5, y: 3 });
        assert_eq!(fault.to_string(), "metal-link #1 endpoint (5, 3) is not on metal");
    }
}
