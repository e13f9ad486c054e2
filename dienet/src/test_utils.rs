// SPDX-License-Identifier: Apache-2.0

//! Helpers shared by the unit tests of this crate.

use crate::circuit::{CircuitCatalog, CircuitId, CircuitKind, CircuitRecord};
use crate::circuit_grid::CircuitGrid;
use crate::mask::BinaryMask;

pub fn rows_to_cells(rows: &[&str]) -> Vec<Vec<char>> {
    rows.iter().map(|r| r.chars().collect()).collect()
}

/// Builds a mask from ASCII art: `#` is a feature pixel, anything else is
/// not. Row 0 is the top of the image.
pub fn mask_from_rows(rows: &[&str]) -> BinaryMask {
    let cells = rows_to_cells(rows);
    let width = cells.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut mask = BinaryMask::new(width, cells.len());
    for (y, row) in cells.iter().enumerate() {
        for (x, c) in row.iter().enumerate() {
            if *c == '#' {
                mask.set(x as i32, y as i32, true);
            }
        }
    }
    mask
}

pub fn rect_mask(width: usize, height: usize, rects: &[(i32, i32, i32, i32)]) -> BinaryMask {
    let mut mask = BinaryMask::new(width, height);
    for &(x0, y0, x1, y1) in rects {
        mask.fill_rect(x0, y0, x1, y1);
    }
    mask
}

/// Appends a circuit covering the inclusive rectangle on `channel`, writing
/// its id into the grid.
pub fn paint_circuit(
    catalog: &mut CircuitCatalog,
    grid: &mut CircuitGrid,
    channel: usize,
    kind: CircuitKind,
    rect: (i32, i32, i32, i32),
) -> CircuitId {
    let (x0, y0, x1, y1) = rect;
    let mut record = CircuitRecord::new(kind, x0, y0);
    let id = catalog.next_id();
    for y in y0..=y1 {
        for x in x0..=x1 {
            record.bbox.include(x, y);
            record.pixel_count += 1;
            grid.set(channel, x, y, Some(id));
        }
    }
    catalog.push(record)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
