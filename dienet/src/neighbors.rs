// SPDX-License-Identifier: Apache-2.0

//! Adjacency between circuits of the active/poly channel.

use crate::circuit::{is_active_poly_pair, CircuitCatalog};
use crate::circuit_grid::GridRead;
use crate::progress::ProgressMeter;

const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Records, for every pair of 4-adjacent channel-0 cells holding different
/// circuits, each circuit in the other's neighbor set. Active/poly pairs are
/// skipped: every gate boundary produces one.
pub fn build_neighbors<G: GridRead>(catalog: &mut CircuitCatalog, grid: &G) {
    let mut progress = ProgressMeter::start("build neighbors");
    let width = grid.width() as i32;
    let height = grid.height() as i32;
    for y in 0..height {
        progress.tick(y as usize, height as usize);
        for x in 0..width {
            let Some(here) = grid.get(0, x, y) else {
                continue;
            };
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let Some(there) = grid.get(0, x + dx, y + dy) else {
                    continue;
                };
                if there == here {
                    continue;
                }
                if is_active_poly_pair(catalog.kind(here), catalog.kind(there)) {
                    continue;
                }
                catalog[here].neighbors.insert(there);
            }
        }
    }
}
