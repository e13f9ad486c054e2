// SPDX-License-Identifier: Apache-2.0

//! Post-extraction checks of the grid and catalog invariants.

use crate::circuit::{is_active_poly_pair, BoundingBox, CircuitId, CircuitKind};
use crate::circuit_grid::GridRead;
use crate::context::ExtractionContext;
use crate::progress::ProgressMeter;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyFinding {
    /// A grid cell holds an id that is not a live circuit.
    DanglingCell {
        channel: usize,
        x: i32,
        y: i32,
        value: i32,
    },
    /// The cells of a circuit disagree with its stored extent or area.
    /// `cells_bbox` is the box of every cell holding the id, on any channel.
    Extent {
        circuit: CircuitId,
        stored_pixels: u64,
        counted_pixels: u64,
        stored_bbox: BoundingBox,
        cells_bbox: Option<BoundingBox>,
    },
    AsymmetricNeighbor { from: CircuitId, to: CircuitId },
    MissingNet { circuit: CircuitId },
    MissingPolySideNet { circuit: CircuitId },
}

impl fmt::Display for ConsistencyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyFinding::DanglingCell {
                channel,
                x,
                y,
                value,
            } => write!(
                f,
                "cell ({}, {}) of channel {} holds {}, not a live circuit",
                x, y, channel, value
            ),
            ConsistencyFinding::Extent {
                circuit,
                stored_pixels,
                counted_pixels,
                stored_bbox,
                cells_bbox,
            } => {
                write!(
                    f,
                    "circuit {} stores {} pixels in {} but owns {} cells",
                    circuit, stored_pixels, stored_bbox, counted_pixels
                )?;
                match cells_bbox {
                    Some(b) => write!(f, " in {}", b),
                    None => write!(f, " nowhere"),
                }
            }
            ConsistencyFinding::AsymmetricNeighbor { from, to } => {
                write!(f, "circuit {} lists {} as neighbor but not the reverse", from, to)
            }
            ConsistencyFinding::MissingNet { circuit } => {
                write!(f, "circuit {} has no net", circuit)
            }
            ConsistencyFinding::MissingPolySideNet { circuit } => {
                write!(f, "capacitor {} has no poly-side net", circuit)
            }
        }
    }
}

/// Checks the extraction state and returns every violation found; an empty
/// list means the state is consistent.
///
/// Each circuit's cells are counted on its home channel: metal on the metal
/// channel, poly on the poly channel, everything else on channel 0. Its box
/// must be the tight box of every cell holding its id on any channel.
/// Metal-link circuits must own no cells.
pub fn check(ctx: &ExtractionContext) -> Vec<ConsistencyFinding> {
    let mut progress = ProgressMeter::start("consistency checks");
    let catalog = &ctx.catalog;
    let grid = &ctx.grid;
    let mut findings = Vec::new();
    let mut counted = vec![0u64; catalog.len()];
    let mut extents: Vec<Option<BoundingBox>> = vec![None; catalog.len()];
    let metal_channel = grid.metal_channel();
    let poly_channel = grid.poly_channel().unwrap_or(0);

    let height = grid.height() as i32;
    for y in 0..height {
        progress.tick(y as usize, height as usize);
        for x in 0..grid.width() as i32 {
            for channel in 0..grid.channels() {
                let value = grid.raw(channel, x, y);
                if value < 0 {
                    continue;
                }
                let id = CircuitId(value as usize);
                match catalog.get(id) {
                    Some(record) if record.is_live() => {
                        match &mut extents[id.0] {
                            Some(b) => b.include(x, y),
                            slot => *slot = Some(BoundingBox::point(x, y)),
                        }
                        let home = match record.kind {
                            CircuitKind::Metal => metal_channel,
                            CircuitKind::Poly => poly_channel,
                            _ => 0,
                        };
                        if channel == home {
                            counted[id.0] += 1;
                        }
                    }
                    _ => findings.push(ConsistencyFinding::DanglingCell {
                        channel,
                        x,
                        y,
                        value,
                    }),
                }
            }
        }
    }

    for (id, record) in catalog.iter() {
        if !record.is_live() {
            continue;
        }
        let cells_bbox = extents[id.0];
        let extent_off = if record.synthetic {
            cells_bbox.is_some()
        } else {
            counted[id.0] != record.pixel_count || cells_bbox != Some(record.bbox)
        };
        if extent_off {
            findings.push(ConsistencyFinding::Extent {
                circuit: id,
                stored_pixels: record.pixel_count,
                counted_pixels: counted[id.0],
                stored_bbox: record.bbox,
                cells_bbox,
            });
        }

        for &n in &record.neighbors {
            let reverse = catalog
                .get(n)
                .is_some_and(|other| other.neighbors.contains(&id));
            if !reverse && !is_active_poly_pair(record.kind, catalog.kind(n)) {
                findings.push(ConsistencyFinding::AsymmetricNeighbor { from: id, to: n });
            }
        }

        if record.net.is_none() && record.kind != CircuitKind::Capacitor {
            findings.push(ConsistencyFinding::MissingNet { circuit: id });
        }
        if record.kind == CircuitKind::Capacitor {
            if record.net.is_none() {
                findings.push(ConsistencyFinding::MissingNet { circuit: id });
            }
            if record.net_poly_side.is_none() {
                findings.push(ConsistencyFinding::MissingPolySideNet { circuit: id });
            }
        }
    }

    for f in &findings {
        log::warn!("{}", f);
    }
    findings
}
