// SPDX-License-Identifier: Apache-2.0

//! Scanline flood fill over an abstract pixel target.
//!
//! Regions can cover a large share of a multi-million-pixel die, so the fill
//! keeps its pending rows in an explicit queue instead of recursing.

use std::collections::VecDeque;

/// What a flood fill operates on. Implemented per call site: a grid
/// channel, the via mask, the local window around an overlap pixel.
pub trait FillTarget {
    type Color: PartialEq + Copy;

    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// The classification of `(x, y)`; only pixels whose color equals the
    /// seed color are filled.
    fn read(&self, x: i32, y: i32) -> Self::Color;

    /// Called exactly once for every pixel the fill visits.
    fn mark(&mut self, x: i32, y: i32);

    fn is_marked(&self, x: i32, y: i32) -> bool;
}

fn joins<T: FillTarget>(target: &T, x: i32, y: i32, color: T::Color) -> bool {
    !target.is_marked(x, y) && target.read(x, y) == color
}

/// Fills the 4-connected region of `color` containing `(x, y)`. The seed is
/// assumed to have `color`; a seed that is already marked is a no-op.
///
/// Returns the number of pixels marked.
pub fn flood_fill<T: FillTarget>(target: &mut T, x: i32, y: i32, color: T::Color) -> usize {
    let width = target.width();
    let height = target.height();
    let mut pending = VecDeque::new();
    pending.push_back((x, y));
    let mut marked = 0;

    while let Some((x, y)) = pending.pop_front() {
        if target.is_marked(x, y) {
            continue;
        }
        target.mark(x, y);
        marked += 1;

        let mut x0 = x - 1;
        while x0 >= 0 && joins(target, x0, y, color) {
            target.mark(x0, y);
            marked += 1;
            x0 -= 1;
        }
        x0 += 1;

        let mut x1 = x + 1;
        while x1 < width && joins(target, x1, y, color) {
            target.mark(x1, y);
            marked += 1;
            x1 += 1;
        }
        x1 -= 1;

        for xx in x0..=x1 {
            if y > 0 && joins(target, xx, y - 1, color) {
                pending.push_back((xx, y - 1));
            }
            if y < height - 1 && joins(target, xx, y + 1, color) {
                pending.push_back((xx, y + 1));
            }
        }
    }
    marked
}
