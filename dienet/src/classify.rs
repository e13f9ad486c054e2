// SPDX-License-Identifier: Apache-2.0

//! Per-pixel classification of the mask stack into circuit kinds.

use crate::circuit::CircuitKind;
use crate::fill::{flood_fill, FillTarget};
use crate::mask::BinaryMask;

/// Half-size of the square window inspected around an active/poly overlap
/// pixel when looking for buried or capacitor marks.
pub const OVERLAP_WINDOW_RADIUS: i32 = 5;

const WINDOW_SIZE: i32 = 2 * OVERLAP_WINDOW_RADIUS + 1;

pub trait LayerClassifier {
    /// The kind of circuit `(x, y)` belongs to, or `None` for no feature.
    fn classify(&self, x: i32, y: i32) -> Option<CircuitKind>;
}

pub struct MetalClassifier<'a> {
    pub metal: &'a BinaryMask,
}

impl LayerClassifier for MetalClassifier<'_> {
    fn classify(&self, x: i32, y: i32) -> Option<CircuitKind> {
        if self.metal.get(x, y) {
            Some(CircuitKind::Metal)
        } else {
            None
        }
    }
}

/// Active and poly layers of an nmos process with buried contacts and
/// optional capacitors.
pub struct ActivePolyClassifier<'a> {
    pub active: &'a BinaryMask,
    pub poly: &'a BinaryMask,
    pub buried: Option<&'a BinaryMask>,
    pub caps: Option<&'a BinaryMask>,
}

const OVERLAP: u8 = 1;
const BURIED: u8 = 2;
const CAPS: u8 = 4;
const VISITED: u8 = 8;

/// The window around one overlap pixel, holding the overlap/buried/caps bits
/// of every pixel in it.
struct OverlapWindow {
    cells: [u8; (WINDOW_SIZE * WINDOW_SIZE) as usize],
    touches_buried: bool,
    touches_caps: bool,
}

impl OverlapWindow {
    fn cell(&self, x: i32, y: i32) -> u8 {
        self.cells[(x + y * WINDOW_SIZE) as usize]
    }
}

impl FillTarget for OverlapWindow {
    type Color = bool;

    fn width(&self) -> i32 {
        WINDOW_SIZE
    }

    fn height(&self) -> i32 {
        WINDOW_SIZE
    }

    fn read(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) & OVERLAP != 0
    }

    fn mark(&mut self, x: i32, y: i32) {
        let v = self.cell(x, y);
        if v & BURIED != 0 {
            self.touches_buried = true;
        }
        if v & CAPS != 0 {
            self.touches_caps = true;
        }
        self.cells[(x + y * WINDOW_SIZE) as usize] = v | VISITED;
    }

    fn is_marked(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) & VISITED != 0
    }
}

impl ActivePolyClassifier<'_> {
    fn buried_at(&self, x: i32, y: i32) -> bool {
        self.buried.is_some_and(|m| m.get(x, y))
    }

    fn caps_at(&self, x: i32, y: i32) -> bool {
        self.caps.is_some_and(|m| m.get(x, y))
    }

    fn overlap_kind(&self, x: i32, y: i32) -> CircuitKind {
        let r = OVERLAP_WINDOW_RADIUS;
        let marked_nearby = (y - r..=y + r)
            .any(|yy| (x - r..=x + r).any(|xx| self.buried_at(xx, yy) || self.caps_at(xx, yy)));
        if !marked_nearby {
            return CircuitKind::Transistor;
        }

        let mut window = OverlapWindow {
            cells: [0; (WINDOW_SIZE * WINDOW_SIZE) as usize],
            touches_buried: false,
            touches_caps: false,
        };
        for wy in 0..WINDOW_SIZE {
            for wx in 0..WINDOW_SIZE {
                let (px, py) = (x - r + wx, y - r + wy);
                if !(self.active.get(px, py) && self.poly.get(px, py)) {
                    continue;
                }
                let v = if self.buried_at(px, py) {
                    OVERLAP | BURIED
                } else if self.caps_at(px, py) {
                    OVERLAP | CAPS
                } else {
                    OVERLAP
                };
                window.cells[(wx + wy * WINDOW_SIZE) as usize] = v;
            }
        }
        flood_fill(&mut window, r, r, true);

        if window.touches_caps {
            CircuitKind::Capacitor
        } else if window.touches_buried {
            CircuitKind::Buried
        } else {
            CircuitKind::Transistor
        }
    }
}

impl LayerClassifier for ActivePolyClassifier<'_> {
    fn classify(&self, x: i32, y: i32) -> Option<CircuitKind> {
        let active = self.active.get(x, y);
        let poly = self.poly.get(x, y);
        match (active, poly) {
            (true, true) => Some(self.overlap_kind(x, y)),
            (true, false) => Some(CircuitKind::Active),
            (false, true) => Some(CircuitKind::Poly),
            (false, false) => None,
        }
    }
}

/// Active and metal-gate layers of a metal-gate process. Capacitor pixels
/// win over active; gate and capacitor pixels never coincide once
/// [`find_gate_capacitor_overlap`] has passed.
pub struct ActiveGateClassifier<'a> {
    pub active: &'a BinaryMask,
    pub gates: &'a BinaryMask,
    pub caps: Option<&'a BinaryMask>,
}

impl LayerClassifier for ActiveGateClassifier<'_> {
    fn classify(&self, x: i32, y: i32) -> Option<CircuitKind> {
        if self.caps.is_some_and(|m| m.get(x, y)) {
            Some(CircuitKind::Capacitor)
        } else if self.active.get(x, y) {
            Some(CircuitKind::Active)
        } else if self.gates.get(x, y) {
            Some(CircuitKind::Transistor)
        } else {
            None
        }
    }
}

/// The first pixel (row-major, grid frame) that is both a gate and a
/// capacitor pixel.
pub fn find_gate_capacitor_overlap(
    gates: &BinaryMask,
    caps: Option<&BinaryMask>,
) -> Option<(i32, i32)> {
    let caps = caps?;
    for y in 0..gates.height() as i32 {
        for x in 0..gates.width() as i32 {
            if gates.get(x, y) && caps.get(x, y) {
                return Some((x, y));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mask_from_rows, rect_mask};
    use test_case::test_case;

    #[test_case(2, 2, None; "empty")]
    #[test_case(1, 1, Some(CircuitKind::Active); "active only")]
    #[test_case(8, 1, Some(CircuitKind::Poly); "poly only")]
    #[test_case(5, 1, Some(CircuitKind::Transistor); "plain overlap")]
    fn active_poly_without_marks(x: i32, y: i32, expected: Option<CircuitKind>) {
        let active = rect_mask(10, 3, &[(0, 0, 6, 1)]);
        let poly = rect_mask(10, 3, &[(4, 0, 9, 1)]);
        let classifier = ActivePolyClassifier {
            active: &active,
            poly: &poly,
            buried: None,
            caps: None,
        };
        assert_eq!(classifier.classify(x, y), expected);
    }

    #[test]
    fn buried_mark_in_the_same_blob_makes_buried() {
        let active = rect_mask(20, 5, &[(0, 0, 19, 4)]);
        let poly = rect_mask(20, 5, &[(8, 0, 14, 4)]);
        // The buried mark sits at the far edge of the overlap blob but the
        // local fill still reaches it.
        let buried = rect_mask(20, 5, &[(14, 2, 14, 2)]);
        let classifier = ActivePolyClassifier {
            active: &active,
            poly: &poly,
            buried: Some(&buried),
            caps: None,
        };
        assert_eq!(classifier.classify(10, 2), Some(CircuitKind::Buried));
    }

    #[test]
    fn nearby_mark_in_another_blob_keeps_transistor() {
        let active = rect_mask(20, 5, &[(0, 0, 19, 4)]);
        // Two separate poly strips crossing the active; the buried mark is
        // on the second strip, within the window of the first.
        let poly = rect_mask(20, 5, &[(4, 0, 5, 4), (8, 0, 9, 4)]);
        let buried = rect_mask(20, 5, &[(8, 2, 9, 2)]);
        let classifier = ActivePolyClassifier {
            active: &active,
            poly: &poly,
            buried: Some(&buried),
            caps: None,
        };
        assert_eq!(classifier.classify(4, 2), Some(CircuitKind::Transistor));
        assert_eq!(classifier.classify(9, 0), Some(CircuitKind::Buried));
    }

    #[test]
    fn capacitor_wins_over_buried() {
        let active = rect_mask(12, 3, &[(0, 0, 11, 2)]);
        let poly = rect_mask(12, 3, &[(0, 0, 11, 2)]);
        let buried = rect_mask(12, 3, &[(2, 1, 2, 1)]);
        let caps = rect_mask(12, 3, &[(9, 1, 9, 1)]);
        let classifier = ActivePolyClassifier {
            active: &active,
            poly: &poly,
            buried: Some(&buried),
            caps: Some(&caps),
        };
        assert_eq!(classifier.classify(5, 1), Some(CircuitKind::Capacitor));
    }

    #[test]
    fn active_gate_priorities() {
        let active = mask_from_rows(&["##..", "...."]);
        let gates = mask_from_rows(&["..#.", "..#."]);
        let caps = mask_from_rows(&["#...", "...#"]);
        let classifier = ActiveGateClassifier {
            active: &active,
            gates: &gates,
            caps: Some(&caps),
        };
        assert_eq!(classifier.classify(0, 0), Some(CircuitKind::Capacitor));
        assert_eq!(classifier.classify(1, 0), Some(CircuitKind::Active));
        assert_eq!(classifier.classify(2, 1), Some(CircuitKind::Transistor));
        assert_eq!(classifier.classify(3, 1), Some(CircuitKind::Capacitor));
        assert_eq!(classifier.classify(1, 1), None);
        assert_eq!(find_gate_capacitor_overlap(&gates, Some(&caps)), None);
    }

    #[test]
    fn gate_capacitor_overlap_is_found() {
        let gates = mask_from_rows(&["....", ".##."]);
        let caps = mask_from_rows(&["....", "..##"]);
        assert_eq!(find_gate_capacitor_overlap(&gates, Some(&caps)), Some((2, 1)));
        assert_eq!(find_gate_capacitor_overlap(&gates, None), None);
    }

    #[test]
    fn metal_is_metal() {
        let metal = mask_from_rows(&["#."]);
        let classifier = MetalClassifier { metal: &metal };
        assert_eq!(classifier.classify(0, 0), Some(CircuitKind::Metal));
        assert_eq!(classifier.classify(1, 0), None);
        assert_eq!(classifier.classify(-1, 0), None);
    }
}
