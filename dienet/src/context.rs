// SPDX-License-Identifier: Apache-2.0

//! The state of one extraction run, handed from stage to stage.

use crate::circuit::{CircuitCatalog, KindCounts};
use crate::circuit_grid::{CircuitGrid, GridRead};
use crate::config::Method;
use crate::disambiguate::DisambiguationReport;
use crate::metal_link::MetalLink;
use crate::netlist_writer::NetlistDump;
use crate::nets::NetRecord;
use crate::terminal_pairing::TransistorRecord;
use crate::vias::ViaMapping;
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub struct ExtractionContext {
    pub method: Method,
    pub grid: CircuitGrid,
    pub catalog: CircuitCatalog,
    pub metal_links: Vec<MetalLink>,
    pub disambiguation: DisambiguationReport,
    pub vias: ViaMapping,
    pub nets: Vec<NetRecord>,
    pub transistors: Vec<TransistorRecord>,
}

impl ExtractionContext {
    pub fn new(method: Method, grid: CircuitGrid, metal_links: Vec<MetalLink>) -> Self {
        ExtractionContext {
            method,
            grid,
            catalog: CircuitCatalog::new(),
            metal_links,
            disambiguation: DisambiguationReport::default(),
            vias: ViaMapping::default(),
            nets: Vec::new(),
            transistors: Vec::new(),
        }
    }

    pub fn height(&self) -> i32 {
        self.grid.height() as i32
    }

    pub fn dump(&self) -> NetlistDump<'_> {
        NetlistDump {
            width: self.grid.width(),
            height: self.grid.height(),
            channels: self.grid.channels(),
            catalog: &self.catalog,
            nets: &self.nets,
            transistors: &self.transistors,
        }
    }

    pub fn summary(&self) -> ExtractionSummary {
        ExtractionSummary {
            method: self.method.keyword(),
            circuits: self.catalog.counts(),
            vias: self.vias.vias.len(),
            via_diagnostics: self.vias.diagnostics.len(),
            nets: self.nets.len(),
            transistors: self.transistors.len(),
        }
    }
}

/// Final counts of a run, printed by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    pub method: &'static str,
    pub circuits: KindCounts,
    pub vias: usize,
    /// One rejected via blob can produce several.
    pub via_diagnostics: usize,
    pub nets: usize,
    pub transistors: usize,
}

impl fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} circuits, {} vias, {} nets, {} transistors",
            self.method, self.circuits.total, self.vias, self.nets, self.transistors
        )
    }
}
