// SPDX-License-Identifier: Apache-2.0

//! The extraction pipelines of both processes.

use crate::build_circuits::build_circuits;
use crate::circuit::{CircuitCatalog, CircuitKind};
use crate::circuit_grid::{CircuitGrid, GridRead};
use crate::classify::{
    find_gate_capacitor_overlap, ActiveGateClassifier, ActivePolyClassifier, MetalClassifier,
};
use crate::compact::compact_ids;
use crate::config::{ConfigError, ExtractionConfig, Method};
use crate::context::ExtractionContext;
use crate::disambiguate::disambiguate_transistors;
use crate::error::ExtractError;
use crate::gate_nets::lookup_gate_nets;
use crate::mask::{BinaryMask, Layer, LayerMasks};
use crate::metal_link::{add_link_circuits, add_link_vias, MetalLink};
use crate::neighbors::build_neighbors;
use crate::netlist_writer::write_netlist_file;
use crate::nets::build_nets;
use crate::progress::ProgressMeter;
use crate::terminal_pairing::{build_transistors, build_transistors_metal_gate};
use crate::vias::map_vias;

fn log_counts(catalog: &CircuitCatalog) {
    log::info!("-> {}", catalog.counts());
}

fn required(masks: &LayerMasks, method: Method, layer: Layer) -> Result<&BinaryMask, ExtractError> {
    masks
        .get(layer)
        .ok_or(ExtractError::Config(ConfigError::MissingMask { method, layer }))
}

fn check_sizes(masks: &LayerMasks, grid: &CircuitGrid) -> Result<(), ExtractError> {
    let expected = (grid.width(), grid.height());
    for (layer, mask) in masks.iter() {
        let actual = (mask.width(), mask.height());
        if actual != expected {
            return Err(ConfigError::MaskSize {
                layer,
                expected,
                actual,
            }
            .into());
        }
    }
    Ok(())
}

fn map_all_vias(ctx: &mut ExtractionContext, masks: &LayerMasks) -> Result<(), ExtractError> {
    ctx.vias = map_vias(masks.get(Layer::Vias), &ctx.catalog, &ctx.grid);
    add_link_vias(&ctx.metal_links, &ctx.grid, &mut ctx.vias)?;
    log::info!("  -> {} vias mapped", ctx.vias.vias.len());
    Ok(())
}

fn extract_poly_single_metal(
    ctx: &mut ExtractionContext,
    masks: &LayerMasks,
) -> Result<(), ExtractError> {
    let method = ctx.method;
    let height = ctx.height();
    let active_poly = ActivePolyClassifier {
        active: required(masks, method, Layer::Active)?,
        poly: required(masks, method, Layer::Poly)?,
        buried: masks.get(Layer::Buried),
        caps: masks.get(Layer::Caps),
    };
    let metal = MetalClassifier {
        metal: required(masks, method, Layer::Metal)?,
    };
    let metal_channel = ctx.grid.metal_channel();

    build_circuits(
        "build circuits active/poly",
        &active_poly,
        &mut ctx.catalog,
        &mut ctx.grid,
        0,
    );
    add_link_circuits(&mut ctx.metal_links, &mut ctx.catalog, CircuitKind::Poly, height);
    log_counts(&ctx.catalog);
    build_circuits(
        "build circuits metal",
        &metal,
        &mut ctx.catalog,
        &mut ctx.grid,
        metal_channel,
    );
    log_counts(&ctx.catalog);
    build_neighbors(&mut ctx.catalog, &ctx.grid);

    ctx.disambiguation =
        disambiguate_transistors(&mut ctx.catalog, &mut ctx.grid).map_err(ExtractError::Layout)?;
    log_counts(&ctx.catalog);
    compact_ids(&mut ctx.catalog, &mut ctx.grid, &mut ctx.metal_links);
    log_counts(&ctx.catalog);

    map_all_vias(ctx, masks)?;
    ctx.nets = build_nets(&mut ctx.catalog, &ctx.vias.map, true, height)?;
    ctx.transistors = build_transistors(&ctx.catalog, &ctx.grid);
    Ok(())
}

fn extract_metal_gate(ctx: &mut ExtractionContext, masks: &LayerMasks) -> Result<(), ExtractError> {
    let method = ctx.method;
    let height = ctx.height();
    let gates = required(masks, method, Layer::Gates)?;
    let caps = masks.get(Layer::Caps);
    if let Some((x, y)) = find_gate_capacitor_overlap(gates, caps) {
        return Err(ExtractError::GateCapacitorOverlap {
            x,
            y: height - 1 - y,
        });
    }
    let active_gates = ActiveGateClassifier {
        active: required(masks, method, Layer::Active)?,
        gates,
        caps,
    };
    let metal = MetalClassifier {
        metal: required(masks, method, Layer::Metal)?,
    };
    let metal_channel = ctx.grid.metal_channel();

    build_circuits(
        "build circuits active/gates",
        &active_gates,
        &mut ctx.catalog,
        &mut ctx.grid,
        0,
    );
    add_link_circuits(&mut ctx.metal_links, &mut ctx.catalog, CircuitKind::Active, height);
    log_counts(&ctx.catalog);
    build_circuits(
        "build circuits metal",
        &metal,
        &mut ctx.catalog,
        &mut ctx.grid,
        metal_channel,
    );
    log_counts(&ctx.catalog);
    build_neighbors(&mut ctx.catalog, &ctx.grid);

    map_all_vias(ctx, masks)?;
    ctx.nets = build_nets(&mut ctx.catalog, &ctx.vias.map, false, height)?;
    {
        let _progress = ProgressMeter::start("lookup gates and caps");
        lookup_gate_nets(&mut ctx.catalog, &ctx.grid)?;
    }
    ctx.transistors = build_transistors_metal_gate(&ctx.catalog, &ctx.grid)?;
    Ok(())
}

/// Runs every stage of `method` over `masks`, filling `grid`. The grid must
/// be empty and have the method's channel count.
pub fn extract(
    method: Method,
    masks: &LayerMasks,
    metal_links: Vec<MetalLink>,
    grid: CircuitGrid,
) -> Result<ExtractionContext, ExtractError> {
    check_sizes(masks, &grid)?;
    let mut ctx = ExtractionContext::new(method, grid, metal_links);
    match method {
        Method::NmosPolySingleMetal => extract_poly_single_metal(&mut ctx, masks)?,
        Method::NmosMetalGate => extract_metal_gate(&mut ctx, masks)?,
    }
    Ok(ctx)
}

/// Loads the masks of `config`, extracts into a new grid file and writes
/// the netlist. Nothing is written to the netlist path unless every stage
/// succeeds.
pub fn run(config: &ExtractionConfig) -> Result<ExtractionContext, ExtractError> {
    let masks = config.load_masks()?;
    let grid = CircuitGrid::create(
        &config.grid_path,
        config.method.channels(),
        config.width,
        config.height,
    )?;
    let ctx = extract(config.method, &masks, config.metal_links.clone(), grid)?;

    log::info!("Dumping netlist to {}", config.netlist_path.display());
    write_netlist_file(&config.netlist_path, &ctx.dump()).map_err(|error| ExtractError::Io {
        path: config.netlist_path.clone(),
        error,
    })?;
    ctx.grid.flush()?;
    Ok(ctx)
}
