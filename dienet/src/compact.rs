// SPDX-License-Identifier: Apache-2.0

//! Removal of disabled circuits and dense renumbering of the rest.

use crate::circuit::{CircuitCatalog, CircuitId, CircuitKind};
use crate::circuit_grid::CircuitGrid;
use crate::metal_link::MetalLink;
use crate::progress::ProgressMeter;

/// Old id to new id; `None` for dropped circuits. Survivors keep their
/// relative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRemap {
    mapping: Vec<Option<CircuitId>>,
}

impl IdRemap {
    /// The remap that drops every disabled circuit of `catalog`.
    pub fn dropping_disabled(catalog: &CircuitCatalog) -> Self {
        let mut next = 0;
        let mapping = catalog
            .iter()
            .map(|(_, c)| {
                if c.kind == CircuitKind::Disabled {
                    None
                } else {
                    next += 1;
                    Some(CircuitId(next - 1))
                }
            })
            .collect();
        IdRemap { mapping }
    }

    pub fn get(&self, old: CircuitId) -> Option<CircuitId> {
        self.mapping.get(old.0).copied().flatten()
    }

    pub fn is_identity(&self) -> bool {
        self.mapping
            .iter()
            .enumerate()
            .all(|(i, m)| *m == Some(CircuitId(i)))
    }

    pub fn survivors(&self) -> usize {
        self.mapping.iter().filter(|m| m.is_some()).count()
    }
}

/// Drops disabled circuits from the catalog and rewrites the grid, every
/// neighbor set and the metal-link circuit ids to the new numbering.
/// Compacting an already compact catalog changes nothing.
pub fn compact_ids(
    catalog: &mut CircuitCatalog,
    grid: &mut CircuitGrid,
    metal_links: &mut [MetalLink],
) -> IdRemap {
    let _progress = ProgressMeter::start("compressing ids");
    let remap = IdRemap::dropping_disabled(catalog);
    if remap.is_identity() {
        log::debug!("ids already compact ({} circuits)", catalog.len());
        return remap;
    }

    let survivors: Vec<_> = catalog
        .records()
        .iter()
        .filter(|c| c.kind != CircuitKind::Disabled)
        .cloned()
        .map(|mut c| {
            c.neighbors = c.neighbors.iter().filter_map(|n| remap.get(*n)).collect();
            c
        })
        .collect();
    log::debug!(
        "compacting {} circuits into {}",
        catalog.len(),
        survivors.len()
    );
    catalog.replace_records(survivors);

    grid.remap_all(|id| remap.get(id));

    for link in metal_links.iter_mut() {
        link.circuit = link.circuit.and_then(|c| remap.get(c));
    }
    remap
}
