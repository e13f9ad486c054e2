// SPDX-License-Identifier: Apache-2.0

//! Resolution of degenerate active/poly overlap zones.
//!
//! Every active/poly overlap without a buried or capacitor mark is first
//! classified as a transistor. An overlap with fewer than two terminal
//! groups has no real channel: it is usually an active wire passing under an
//! unrelated poly wire. Such zones are absorbed into one active-side and one
//! poly-side neighbor and the transistor is disabled.

use crate::circuit::{
    is_active_poly_pair, BoundingBox, CircuitCatalog, CircuitId, CircuitKind,
};
use crate::circuit_grid::{CircuitGrid, GridRead};
use crate::progress::ProgressMeter;
use crate::transistor_groups::group_neighbors;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutProblem {
    /// No terminal group at all.
    NoTerminal,
    /// Terminals but no gate group.
    NoGate,
    /// Fewer than two terminals, yet no active/buried or poly/buried
    /// neighbor to absorb the zone into.
    NoAbsorber,
}

/// A neighbor of a faulty zone, in output coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneNeighbor {
    pub id: CircuitId,
    pub kind: CircuitKind,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutFault {
    pub transistor: CircuitId,
    /// Bounding box in the bottom-left-origin frame.
    pub zone: BoundingBox,
    pub problem: LayoutProblem,
    pub neighbors: Vec<ZoneNeighbor>,
}

impl fmt::Display for LayoutFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            LayoutProblem::NoTerminal => write!(
                f,
                "P/A superposition zone {} has no active terminal",
                self.zone
            )?,
            LayoutProblem::NoGate => {
                write!(f, "P/A superposition zone {} has no active gate", self.zone)?
            }
            LayoutProblem::NoAbsorber => write!(
                f,
                "P/A superposition zone {} has no active and poly neighbors to merge into",
                self.zone
            )?,
        }
        for n in &self.neighbors {
            write!(f, "\n  - {}{} {}", n.kind.code(), n.id, n.bbox)?;
        }
        Ok(())
    }
}

/// Where the pixels of one circuit go on the active and poly channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelRemap {
    active: Option<CircuitId>,
    poly: Option<CircuitId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisambiguationReport {
    /// Transistors disabled, with the active and poly circuits that absorbed
    /// them.
    pub absorbed: Vec<(CircuitId, CircuitId, CircuitId)>,
}

/// The absorbing active-side and poly-side neighbors: the last active (resp.
/// poly) neighbor in id order, else the first buried one.
fn pick_absorbers(
    catalog: &CircuitCatalog,
    transistor: CircuitId,
) -> (Option<CircuitId>, Option<CircuitId>) {
    let mut active = None;
    let mut poly = None;
    for &n in &catalog[transistor].neighbors {
        match catalog.kind(n) {
            CircuitKind::Active => active = Some(n),
            CircuitKind::Poly => poly = Some(n),
            CircuitKind::Buried => {
                active.get_or_insert(n);
                poly.get_or_insert(n);
            }
            _ => {}
        }
    }
    (active, poly)
}

fn zone_neighbors(catalog: &CircuitCatalog, id: CircuitId, height: i32) -> Vec<ZoneNeighbor> {
    catalog[id]
        .neighbors
        .iter()
        .map(|&n| ZoneNeighbor {
            id: n,
            kind: catalog.kind(n),
            bbox: catalog[n].bbox.flipped(height),
        })
        .collect()
}

/// Gives `absorber` the zone's neighbors and extent. The zone's area is
/// added only when `takes_pixels`, that is when the zone cells land on the
/// channel the absorber's pixels are counted on.
fn absorb_into(
    catalog: &mut CircuitCatalog,
    absorber: CircuitId,
    zone: CircuitId,
    takes_pixels: bool,
) {
    let zone_neighbors: Vec<CircuitId> = catalog[zone].neighbors.iter().copied().collect();
    let zone_bbox = catalog[zone].bbox;
    let zone_pixels = catalog[zone].pixel_count;
    let absorber_kind = catalog.kind(absorber);
    for n in zone_neighbors {
        if n == absorber || is_active_poly_pair(absorber_kind, catalog.kind(n)) {
            continue;
        }
        catalog[absorber].neighbors.insert(n);
    }
    let record = &mut catalog[absorber];
    record.bbox.union(&zone_bbox);
    if takes_pixels {
        record.pixel_count += zone_pixels;
    }
}

/// Splits the active/poly channel into its active and poly channels and
/// disables spurious transistors.
///
/// Every transistor is checked before anything is rewritten; if any zone
/// has no terminal or no gate group the whole set of faults is returned and
/// the grid is left untouched.
pub fn disambiguate_transistors(
    catalog: &mut CircuitCatalog,
    grid: &mut CircuitGrid,
) -> Result<DisambiguationReport, Vec<LayoutFault>> {
    let mut progress = ProgressMeter::start("clean and remap");
    let height = grid.height() as i32;
    let count = catalog.len();
    let mut remap = Vec::with_capacity(count);
    let mut faults = Vec::new();
    let mut report = DisambiguationReport::default();

    for i in 0..count {
        progress.tick(i, count);
        let id = CircuitId(i);
        let entry = match catalog.kind(id) {
            CircuitKind::Active => ChannelRemap {
                active: Some(id),
                poly: None,
            },
            CircuitKind::Poly => ChannelRemap {
                active: None,
                poly: Some(id),
            },
            CircuitKind::Metal | CircuitKind::Disabled => ChannelRemap {
                active: None,
                poly: None,
            },
            CircuitKind::Buried | CircuitKind::Capacitor => ChannelRemap {
                active: Some(id),
                poly: Some(id),
            },
            CircuitKind::Transistor => {
                let groups = group_neighbors(catalog, id);
                if groups.terminal_count() >= 2 {
                    ChannelRemap {
                        active: Some(id),
                        poly: Some(id),
                    }
                } else {
                    let problem = if groups.terminal_count() == 0 {
                        Some(LayoutProblem::NoTerminal)
                    } else if groups.gate_count() == 0 {
                        Some(LayoutProblem::NoGate)
                    } else {
                        None
                    };
                    let absorbers = match problem {
                        Some(_) => None,
                        None => match pick_absorbers(catalog, id) {
                            (Some(a), Some(p)) => Some((a, p)),
                            _ => None,
                        },
                    };
                    match absorbers {
                        Some((active, poly)) => {
                            log::debug!(
                                "absorbing spurious overlap t{} {} into {}{} and {}{}",
                                id,
                                catalog[id].bbox.flipped(height),
                                catalog.kind(active).code(),
                                active,
                                catalog.kind(poly).code(),
                                poly
                            );
                            // Buried and capacitor circuits count their pixels
                            // on channel 0, which only the active absorber
                            // receives.
                            absorb_into(catalog, active, id, true);
                            if poly != active {
                                let takes_pixels = catalog.kind(poly) == CircuitKind::Poly;
                                absorb_into(catalog, poly, id, takes_pixels);
                            }
                            let record = &mut catalog[id];
                            record.kind = CircuitKind::Disabled;
                            record.neighbors.clear();
                            report.absorbed.push((id, active, poly));
                            ChannelRemap {
                                active: Some(active),
                                poly: Some(poly),
                            }
                        }
                        None => {
                            faults.push(LayoutFault {
                                transistor: id,
                                zone: catalog[id].bbox.flipped(height),
                                problem: problem.unwrap_or(LayoutProblem::NoAbsorber),
                                neighbors: zone_neighbors(catalog, id, height),
                            });
                            ChannelRemap {
                                active: Some(id),
                                poly: Some(id),
                            }
                        }
                    }
                }
            }
        };
        remap.push(entry);
    }

    if !faults.is_empty() {
        for fault in &faults {
            log::error!("{}", fault);
        }
        return Err(faults);
    }

    let poly_channel = grid.poly_channel().unwrap_or(0);
    for y in 0..height {
        for x in 0..grid.width() as i32 {
            let Some(v) = grid.get(0, x, y) else {
                continue;
            };
            let entry = remap[v.0];
            grid.set(0, x, y, entry.active);
            grid.set(poly_channel, x, y, entry.poly);
        }
    }

    // References to disabled circuits follow the active remap from active
    // circuits, the poly remap from poly circuits, and both otherwise.
    for i in 0..count {
        let id = CircuitId(i);
        let kind = catalog.kind(id);
        let stale: Vec<CircuitId> = catalog[id]
            .neighbors
            .iter()
            .copied()
            .filter(|n| catalog.kind(*n) == CircuitKind::Disabled)
            .collect();
        for n in stale {
            let entry = remap[n.0];
            let targets = match kind {
                CircuitKind::Active => [entry.active, None],
                CircuitKind::Poly => [entry.poly, None],
                _ => [entry.active, entry.poly],
            };
            let record = &mut catalog[id];
            record.neighbors.remove(&n);
            for target in targets.into_iter().flatten() {
                if target != id {
                    record.neighbors.insert(target);
                }
            }
        }
    }

    Ok(report)
}
