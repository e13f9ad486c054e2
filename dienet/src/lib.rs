// SPDX-License-Identifier: Apache-2.0

//! Netlist extraction from segmented die layer masks.
//!
//! The pipeline segments every mask layer into circuits, links them by
//! adjacency and vias, groups them into nets and pairs the terminals of
//! every transistor. [`pipeline::run`] drives a whole extraction from an
//! [`config::ExtractionConfig`].

pub mod build_circuits;
pub mod circuit;
pub mod circuit_grid;
pub mod classify;
pub mod compact;
pub mod config;
pub mod consistency;
pub mod context;
pub mod disambiguate;
pub mod error;
pub mod fill;
pub mod gate_nets;
pub mod mask;
pub mod metal_link;
pub mod neighbors;
pub mod net_names;
pub mod netlist_reader;
pub mod netlist_writer;
pub mod nets;
pub mod pipeline;
pub mod progress;
pub mod terminal_pairing;
#[cfg(test)]
mod test_utils;
pub mod transistor_groups;
pub mod vias;

pub use circuit::{CircuitCatalog, CircuitId, CircuitKind, NetId};
pub use config::{ExtractionConfig, Method};
pub use context::{ExtractionContext, ExtractionSummary};
pub use error::ExtractError;
pub use pipeline::{extract, run};
