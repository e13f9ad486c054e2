// SPDX-License-Identifier: Apache-2.0

//! Connected-component segmentation of one grid channel.

use crate::circuit::{CircuitCatalog, CircuitId, CircuitKind, CircuitRecord};
use crate::circuit_grid::{CircuitGrid, GridRead};
use crate::classify::LayerClassifier;
use crate::fill::{flood_fill, FillTarget};
use crate::progress::ProgressMeter;

struct CircuitFill<'a, C: LayerClassifier> {
    classifier: &'a C,
    grid: &'a mut CircuitGrid,
    channel: usize,
    id: CircuitId,
    record: &'a mut CircuitRecord,
}

impl<C: LayerClassifier> FillTarget for CircuitFill<'_, C> {
    type Color = Option<CircuitKind>;

    fn width(&self) -> i32 {
        self.grid.width() as i32
    }

    fn height(&self) -> i32 {
        self.grid.height() as i32
    }

    fn read(&self, x: i32, y: i32) -> Option<CircuitKind> {
        self.classifier.classify(x, y)
    }

    fn mark(&mut self, x: i32, y: i32) {
        self.record.bbox.include(x, y);
        self.record.pixel_count += 1;
        self.grid.set(self.channel, x, y, Some(self.id));
    }

    fn is_marked(&self, x: i32, y: i32) -> bool {
        self.grid.get(self.channel, x, y) == Some(self.id)
    }
}

/// Segments `channel` into circuits, scanning row-major so that ids are
/// reproducible for identical input. Every cell still empty on the channel
/// whose classification is a feature seeds a new circuit whose id is the
/// catalog's current size.
///
/// Returns the number of circuits created.
pub fn build_circuits<C: LayerClassifier>(
    stage: &str,
    classifier: &C,
    catalog: &mut CircuitCatalog,
    grid: &mut CircuitGrid,
    channel: usize,
) -> usize {
    let mut progress = ProgressMeter::start(stage);
    let width = grid.width() as i32;
    let height = grid.height() as i32;
    let before = catalog.len();
    for y in 0..height {
        progress.tick(y as usize, height as usize);
        for x in 0..width {
            if grid.get(channel, x, y).is_some() {
                continue;
            }
            let Some(kind) = classifier.classify(x, y) else {
                continue;
            };
            let id = catalog.next_id();
            let mut record = CircuitRecord::new(kind, x, y);
            let mut target = CircuitFill {
                classifier,
                grid: &mut *grid,
                channel,
                id,
                record: &mut record,
            };
            flood_fill(&mut target, x, y, Some(kind));
            log::trace!(
                "circuit {}{} {} ({} pixels)",
                kind.code(),
                id,
                record.bbox,
                record.pixel_count
            );
            catalog.push(record);
        }
    }
    catalog.len() - before
}
