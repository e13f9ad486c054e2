// SPDX-License-Identifier: Apache-2.0

use crate::report_cli_error::report_cli_error_and_exit;
use anyhow::Context;
use clap::ArgMatches;
use dienet::circuit_grid::CircuitGridReader;
use dienet::net_names::NetNames;
use dienet::netlist_reader::Netlist;
use dienet::ExtractionConfig;
use std::path::Path;

/// Resolves the pin file against the outputs of a prior `extract` run.
fn load_names(config_path: &Path, pins_path: &Path) -> anyhow::Result<NetNames> {
    let config = ExtractionConfig::read(config_path)?;
    let grid = CircuitGridReader::open(
        &config.grid_path,
        config.method.channels(),
        config.width,
        config.height,
    )
    .with_context(|| format!("opening grid of {}", config_path.display()))?;
    let netlist = Netlist::read(&config.netlist_path)?;
    let pins = std::fs::read_to_string(pins_path)
        .with_context(|| format!("reading pin file {}", pins_path.display()))?;
    let names = NetNames::load(&pins, &grid, &netlist)?;
    Ok(names)
}

pub fn handle_net_names(matches: &ArgMatches) {
    let config_path = matches
        .get_one::<String>("config")
        .expect("config is required");
    let pins_path = matches.get_one::<String>("pins").expect("pins is required");

    let names = match load_names(Path::new(config_path), Path::new(pins_path)) {
        Ok(names) => names,
        Err(e) => report_cli_error_and_exit(
            &format!("{:#}", e),
            Some("net-names"),
            vec![("pins", pins_path.as_str())],
            1,
        ),
    };
    for (net, name) in names.iter() {
        println!("{} {}", net, name);
    }
}
