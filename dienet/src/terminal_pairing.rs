// SPDX-License-Identifier: Apache-2.0

//! Transistor records: which two terminal nets each gate connects.
//!
//! The coupling between two terminal groups across a gate is estimated with
//! a chamfer distance transform over a small window around the gate: the
//! distance is seeded at the source group, propagated through gate pixels
//! only, and read back at every destination pixel. Close destination pixels
//! weigh more, so a wide short channel gives a strong pairing.

use crate::circuit::{BoundingBox, CircuitCatalog, CircuitId, CircuitKind, NetId};
use crate::circuit_grid::GridRead;
use crate::gate_nets::GateMetalFault;
use crate::progress::ProgressMeter;
use crate::transistor_groups::group_neighbors;
use std::collections::BTreeSet;

/// Window cells not reachable by the transform.
pub const UNREACHABLE: f64 = -100000.0;
/// Gate cells before relaxation.
pub const UNRELAXED: f64 = 100000.0;
/// Pixels added around the transistor box on each side.
pub const WINDOW_MARGIN: i32 = 2;

const NEIGHBOR_STEPS: [(i32, i32, f64); 8] = [
    (-1, -1, std::f64::consts::SQRT_2),
    (0, -1, 1.0),
    (1, -1, std::f64::consts::SQRT_2),
    (-1, 0, 1.0),
    (1, 0, 1.0),
    (-1, 1, std::f64::consts::SQRT_2),
    (0, 1, 1.0),
    (1, 1, std::f64::consts::SQRT_2),
];

#[derive(Debug, Clone, PartialEq)]
pub struct TransistorRecord {
    pub circuit: CircuitId,
    pub terminal_1: Option<NetId>,
    pub gate: Option<NetId>,
    pub terminal_2: Option<NetId>,
    /// Geometric middle of the channel, in grid coordinates.
    pub anchor: (i32, i32),
    pub strength: f64,
}

/// Coupling of one ordered pair of terminal groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedForce {
    pub force: f64,
    /// Distance-weighted centroid of the destination pixels; `None` when no
    /// destination pixel is reachable.
    pub midpoint: Option<(i32, i32)>,
}

/// Keeps the smaller of two distances, ignoring negative (unreached) ones.
fn dist_min(current: f64, candidate: f64) -> f64 {
    if candidate >= 0.0 && (current < 0.0 || candidate < current) {
        candidate
    } else {
        current
    }
}

struct ChamferWindow {
    x0: i32,
    y0: i32,
    sx: i32,
    sy: i32,
    cells: Vec<f64>,
}

impl ChamferWindow {
    fn at(&self, x: i32, y: i32) -> f64 {
        self.cells[(y * self.sx + x) as usize]
    }

    /// Best distance reachable from the 8 neighbors of an interior cell.
    fn neighbor_min(&self, x: i32, y: i32) -> f64 {
        NEIGHBOR_STEPS
            .iter()
            .fold(UNREACHABLE, |v, &(dx, dy, cost)| {
                dist_min(v, self.at(x + dx, y + dy) + cost)
            })
    }

    /// Relaxes gate cells until no distance improves, rescanning only the
    /// rectangle around the cells changed by the previous sweep.
    fn relax(&mut self) {
        let (mut minx, mut miny, mut maxx, mut maxy) = (1, 1, self.sx - 2, self.sy - 2);
        while minx <= maxx {
            let (x_lo, y_lo, x_hi, y_hi) = (minx, miny, maxx, maxy);
            minx = self.sx;
            miny = self.sy;
            maxx = -1;
            maxy = -1;
            for y in y_lo..=y_hi {
                for x in x_lo..=x_hi {
                    let cur = self.at(x, y);
                    if cur <= 0.0 {
                        continue;
                    }
                    let v = self.neighbor_min(x, y);
                    if v < cur {
                        self.cells[(y * self.sx + x) as usize] = v;
                        minx = minx.min((x - 1).max(1));
                        maxx = maxx.max((x + 1).min(self.sx - 2));
                        miny = miny.min((y - 1).max(1));
                        maxy = maxy.max((y + 1).min(self.sy - 2));
                    }
                }
            }
        }
        // Gate cells the source never reached.
        for cell in self.cells.iter_mut() {
            if *cell == UNRELAXED {
                *cell = UNREACHABLE;
            }
        }
    }
}

/// Coupling from the `src` circuits to the `dst` circuits through the gate
/// circuit `gate`, whose bounding box is `bbox`.
pub fn directed_force<G: GridRead>(
    grid: &G,
    gate: CircuitId,
    bbox: &BoundingBox,
    src: &BTreeSet<CircuitId>,
    dst: &BTreeSet<CircuitId>,
) -> DirectedForce {
    let sx = bbox.width() + 2 * WINDOW_MARGIN;
    let sy = bbox.height() + 2 * WINDOW_MARGIN;
    let mut window = ChamferWindow {
        x0: bbox.x0 - WINDOW_MARGIN,
        y0: bbox.y0 - WINDOW_MARGIN,
        sx,
        sy,
        cells: Vec::with_capacity((sx * sy) as usize),
    };
    let mut dests = Vec::new();
    for y in 0..sy {
        for x in 0..sx {
            let id = grid.get(0, x + window.x0, y + window.y0);
            let v = match id {
                Some(id) if id == gate => UNRELAXED,
                Some(id) if src.contains(&id) => 0.0,
                _ => UNREACHABLE,
            };
            window.cells.push(v);
            let interior = x != 0 && x != sx - 1 && y != 0 && y != sy - 1;
            if interior && id.is_some_and(|id| dst.contains(&id)) {
                dests.push((x, y));
            }
        }
    }

    window.relax();

    let (mut force, mut midx, mut midy) = (0.0, 0.0, 0.0);
    for (x, y) in dests {
        let v = window.neighbor_min(x, y);
        if v > 0.0 {
            let ff = 1.0 / v;
            force += ff;
            midx += x as f64 * ff;
            midy += y as f64 * ff;
        }
    }
    let midpoint = if force > 0.0 {
        Some((
            window.x0 + (midx / force + 0.5) as i32,
            window.y0 + (midy / force + 0.5) as i32,
        ))
    } else {
        None
    };
    DirectedForce { force, midpoint }
}

/// Symmetric coupling of two terminal groups: the mean of both directed
/// forces, anchored between both directed midpoints. Falls back to the
/// centre of the gate box when neither direction reaches anything.
pub fn pair_force<G: GridRead>(
    grid: &G,
    gate: CircuitId,
    bbox: &BoundingBox,
    t1: &BTreeSet<CircuitId>,
    t2: &BTreeSet<CircuitId>,
) -> (f64, (i32, i32)) {
    let f1 = directed_force(grid, gate, bbox, t1, t2);
    let f2 = directed_force(grid, gate, bbox, t2, t1);
    let anchor = match (f1.midpoint, f2.midpoint) {
        (Some((x1, y1)), Some((x2, y2))) => ((x1 + x2) / 2, (y1 + y2) / 2),
        (Some(m), None) | (None, Some(m)) => m,
        (None, None) => ((bbox.x0 + bbox.x1) / 2, (bbox.y0 + bbox.y1) / 2),
    };
    (0.5 * (f1.force + f2.force), anchor)
}

/// Emits the transistor records of one gate with several terminal groups.
/// Pairs are matched greedily by strength; an odd group left over is paired
/// with its strongest partner.
fn pair_terminal_groups<G: GridRead>(
    catalog: &CircuitCatalog,
    grid: &G,
    transistor: CircuitId,
    records: &mut Vec<TransistorRecord>,
) {
    let groups = group_neighbors(catalog, transistor);
    let terminals = groups.terminal_indices();
    if terminals.len() < 2 {
        log::warn!(
            "transistor {} has {} terminal group(s), no record emitted",
            transistor,
            terminals.len()
        );
        return;
    }

    let record = &catalog[transistor];
    let bbox = record.bbox;
    let group_net = |g: usize| {
        groups.groups[g]
            .representative()
            .and_then(|id| catalog[id].net)
    };

    let mut pairs = Vec::new();
    for (a, &j) in terminals.iter().enumerate() {
        for &k in &terminals[a + 1..] {
            let (strength, anchor) = pair_force(
                grid,
                transistor,
                &bbox,
                &groups.groups[j].members,
                &groups.groups[k].members,
            );
            pairs.push((j, k, strength, anchor));
        }
    }

    let emit = |records: &mut Vec<TransistorRecord>, j: usize, k: usize, strength, anchor| {
        records.push(TransistorRecord {
            circuit: transistor,
            terminal_1: group_net(j),
            gate: record.net,
            terminal_2: group_net(k),
            anchor,
            strength,
        });
    };

    let mut matched = vec![false; groups.groups.len()];
    loop {
        // Ties keep the earliest pair, which is the lowest (j, k).
        let best = pairs
            .iter()
            .filter(|(j, k, _, _)| !matched[*j] && !matched[*k])
            .fold(None, |best: Option<&(usize, usize, f64, (i32, i32))>, p| match best {
                Some(b) if b.2.total_cmp(&p.2).is_ge() => Some(b),
                _ => Some(p),
            });
        let Some(&(j, k, strength, anchor)) = best else {
            break;
        };
        matched[j] = true;
        matched[k] = true;
        emit(records, j, k, strength, anchor);
    }

    if let Some(&left) = terminals.iter().find(|&&j| !matched[j]) {
        let partner = pairs
            .iter()
            .filter(|(j, k, _, _)| *j == left || *k == left)
            .fold(None, |best: Option<&(usize, usize, f64, (i32, i32))>, p| match best {
                Some(b) if b.2.total_cmp(&p.2).is_ge() => Some(b),
                _ => Some(p),
            });
        if let Some(&(j, k, strength, anchor)) = partner {
            let other = if j == left { k } else { j };
            emit(records, left, other, strength, anchor);
        }
    }
}

/// Builds the transistor records of the poly process.
pub fn build_transistors<G: GridRead>(catalog: &CircuitCatalog, grid: &G) -> Vec<TransistorRecord> {
    let mut progress = ProgressMeter::start("building transistors");
    let mut records = Vec::new();
    let count = catalog.len();
    for (id, record) in catalog.iter() {
        progress.tick(id.0, count);
        if record.kind == CircuitKind::Transistor {
            pair_terminal_groups(catalog, grid, id, &mut records);
        }
    }
    log::info!("  -> {} transistors built", records.len());
    records
}

/// Builds the transistor records of the metal-gate process, where every gate
/// separates exactly two neighbors.
pub fn build_transistors_metal_gate<G: GridRead>(
    catalog: &CircuitCatalog,
    grid: &G,
) -> Result<Vec<TransistorRecord>, GateMetalFault> {
    let mut progress = ProgressMeter::start("building transistors");
    let height = grid.height() as i32;
    let mut records = Vec::new();
    let count = catalog.len();
    for (id, record) in catalog.iter() {
        progress.tick(id.0, count);
        if record.kind != CircuitKind::Transistor {
            continue;
        }
        let neighbors: Vec<CircuitId> = record.neighbors.iter().copied().collect();
        let &[n1, n2] = neighbors.as_slice() else {
            return Err(GateMetalFault::NeighborCount {
                bbox: record.bbox.flipped(height),
                count: neighbors.len(),
            });
        };
        let (strength, anchor) = pair_force(
            grid,
            id,
            &record.bbox,
            &BTreeSet::from([n1]),
            &BTreeSet::from([n2]),
        );
        records.push(TransistorRecord {
            circuit: id,
            terminal_1: catalog[n1].net,
            gate: record.net,
            terminal_2: catalog[n2].net,
            anchor,
            strength,
        });
    }
    log::info!("  -> {} transistors built", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_grid::CircuitGrid;
    use crate::test_utils::{init_logger, paint_circuit};
    use pretty_assertions::assert_eq;

    fn set(ids: &[CircuitId]) -> BTreeSet<CircuitId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn straight_channel_force() {
        // Terminal a | gate t (3 wide) | terminal b, all 3 rows tall.
        let mut grid = CircuitGrid::anonymous(3, 9, 3).unwrap();
        let mut catalog = CircuitCatalog::new();
        let a = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 0, 2, 2));
        let t = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Transistor, (3, 0, 5, 2));
        let b = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (6, 0, 8, 2));
        let bbox = catalog[t].bbox;

        let f = directed_force(&grid, t, &bbox, &set(&[a]), &set(&[b]));
        // Each of the three rows crosses the gate in three steps and reaches
        // b one step later.
        assert!((f.force - 0.75).abs() < 1e-9, "{}", f.force);
        assert_eq!(f.midpoint, Some((6, 1)));

        let (strength, anchor) = pair_force(&grid, t, &bbox, &set(&[a]), &set(&[b]));
        assert!((strength - 0.75).abs() < 1e-9);
        assert_eq!(anchor, (4, 1));
    }

    #[test]
    fn unreachable_destination_has_no_midpoint() {
        let mut grid = CircuitGrid::anonymous(3, 8, 3).unwrap();
        let mut catalog = CircuitCatalog::new();
        let a = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 0, 1, 2));
        let t = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Transistor, (2, 0, 3, 2));
        let b = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (6, 0, 7, 2));
        let bbox = catalog[t].bbox;

        let f = directed_force(&grid, t, &bbox, &set(&[a]), &set(&[b]));
        assert_eq!(f.force, 0.0);
        assert_eq!(f.midpoint, None);
        let (strength, anchor) = pair_force(&grid, t, &bbox, &set(&[a]), &set(&[b]));
        assert_eq!(strength, 0.0);
        assert_eq!(anchor, (2, 1));
    }

    #[test]
    fn closest_terminals_are_paired_first() {
        init_logger();
        // Gate t spans x 3..12; x touches its left end, z sits under its
        // left end and y touches its far right end.
        let mut grid = CircuitGrid::anonymous(3, 16, 7).unwrap();
        let mut catalog = CircuitCatalog::new();
        let t = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Transistor, (3, 2, 12, 4));
        let x = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 2, 2, 4));
        let z = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (3, 0, 5, 1));
        let y = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (13, 2, 15, 4));
        for (i, n) in [x, z, y].into_iter().enumerate() {
            catalog.link(t, n);
            catalog[n].net = Some(NetId(i + 1));
        }
        catalog[t].net = Some(NetId(0));

        let records = build_transistors(&catalog, &grid);
        assert_eq!(records.len(), 2);
        let nets: Vec<_> = records
            .iter()
            .map(|r| (r.terminal_1, r.gate, r.terminal_2))
            .collect();
        assert_eq!(
            nets,
            vec![
                (Some(NetId(1)), Some(NetId(0)), Some(NetId(2))),
                (Some(NetId(3)), Some(NetId(0)), Some(NetId(2))),
            ]
        );
        assert!(records[0].strength > records[1].strength);
        assert_eq!(records[0].anchor, (3, 2));
        assert_eq!(records[1].anchor, (8, 2));
    }

    #[test]
    fn single_terminal_group_emits_nothing() {
        init_logger();
        let mut grid = CircuitGrid::anonymous(3, 6, 2).unwrap();
        let mut catalog = CircuitCatalog::new();
        let t = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Transistor, (0, 0, 2, 1));
        let a = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (3, 0, 5, 1));
        catalog.link(t, a);
        assert!(build_transistors(&catalog, &grid).is_empty());
    }

    #[test]
    fn metal_gate_requires_two_neighbors() {
        let mut grid = CircuitGrid::anonymous(2, 9, 3).unwrap();
        let mut catalog = CircuitCatalog::new();
        let a = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 0, 2, 2));
        let t = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Transistor, (3, 0, 5, 2));
        catalog.link(t, a);
        let fault = build_transistors_metal_gate(&catalog, &grid).unwrap_err();
        assert_eq!(fault.to_string(), "Gate at (3, 0)-(5, 2) has 1 neighbors.");

        let b = paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (6, 0, 8, 2));
        catalog.link(t, b);
        catalog[a].net = Some(NetId(0));
        catalog[b].net = Some(NetId(1));
        catalog[t].net = Some(NetId(2));
        let records = build_transistors_metal_gate(&catalog, &grid).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].terminal_1, Some(NetId(0)));
        assert_eq!(records[0].gate, Some(NetId(2)));
        assert_eq!(records[0].terminal_2, Some(NetId(1)));
        assert_eq!(records[0].anchor, (4, 1));
    }
}
