// SPDX-License-Identifier: Apache-2.0

//! Gate nets of the metal-gate process, where a gate is driven by the metal
//! track lying on top of it.

use crate::circuit::{BoundingBox, CircuitCatalog, CircuitKind, Side};
use crate::circuit_grid::GridRead;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateMetalFault {
    /// A gate or capacitor pixel with no metal above it.
    NoMetal { kind: CircuitKind, x: i32, y: i32 },
    /// A gate or capacitor touching two metal nets.
    MultipleMetal { kind: CircuitKind, x: i32, y: i32 },
    /// A gate with other than two neighbors.
    NeighborCount { bbox: BoundingBox, count: usize },
}

fn device_name(kind: CircuitKind) -> &'static str {
    if kind == CircuitKind::Capacitor {
        "Capacitor"
    } else {
        "Transistor"
    }
}

impl fmt::Display for GateMetalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateMetalFault::NoMetal { kind, x, y } => {
                let what = if *kind == CircuitKind::Capacitor {
                    "Capacitor"
                } else {
                    "Gate"
                };
                write!(f, "{} does not touch metal at ({}, {})", what, x, y)
            }
            GateMetalFault::MultipleMetal { kind, x, y } => write!(
                f,
                "{} touches multiple metal at ({}, {})",
                device_name(*kind),
                x,
                y
            ),
            GateMetalFault::NeighborCount { bbox, count } => {
                write!(f, "Gate at {} has {} neighbors.", bbox, count)
            }
        }
    }
}

impl std::error::Error for GateMetalFault {}

/// Gives each transistor the net of the metal over its gate, and each
/// capacitor the net of the metal over it as its poly-side net. Runs after
/// net propagation.
pub fn lookup_gate_nets<G: GridRead>(
    catalog: &mut CircuitCatalog,
    grid: &G,
) -> Result<(), GateMetalFault> {
    let height = grid.height() as i32;
    let metal_channel = grid.metal_channel();
    for y in 0..height {
        for x in 0..grid.width() as i32 {
            let Some(id) = grid.get(0, x, y) else {
                continue;
            };
            let kind = catalog.kind(id);
            if !matches!(kind, CircuitKind::Transistor | CircuitKind::Capacitor) {
                continue;
            }
            let fy = height - 1 - y;
            let metal = grid
                .get(metal_channel, x, y)
                .ok_or(GateMetalFault::NoMetal { kind, x, y: fy })?;
            let Some(net) = catalog[metal].net else {
                continue;
            };
            match catalog[id].net_on(Side::Poly) {
                None => catalog[id].set_net_on(Side::Poly, net),
                Some(existing) if existing != net => {
                    return Err(GateMetalFault::MultipleMetal { kind, x, y: fy })
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}
