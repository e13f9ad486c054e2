// SPDX-License-Identifier: Apache-2.0

use crate::report_cli_error::report_cli_error_and_exit;
use clap::ArgMatches;
use dienet::netlist_reader::{Netlist, NetlistError, NetlistStats};
use std::path::Path;

fn print_text(stats: &NetlistStats) {
    println!(
        "die: {}x{}, {} channels",
        stats.width, stats.height, stats.channels
    );
    println!("circuits: {}", stats.circuits);
    println!("nets: {}", stats.nets);
    println!("transistors: {}", stats.transistors);
}

pub fn handle_netlist_stats(matches: &ArgMatches) {
    let netlist_path = matches
        .get_one::<String>("netlist")
        .expect("netlist is required");
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");

    let netlist = match Netlist::read(Path::new(netlist_path)) {
        Ok(netlist) => netlist,
        Err(e) => {
            let exit_code = match e {
                NetlistError::Io { .. } => 2,
                NetlistError::Parse { .. } => 1,
            };
            report_cli_error_and_exit(&e.to_string(), Some("netlist-stats"), vec![], exit_code)
        }
    };
    let stats = netlist.stats();
    match format {
        "json" => match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{}", json),
            Err(e) => report_cli_error_and_exit(
                &format!("Failed to serialize stats: {}", e),
                Some("netlist-stats"),
                vec![],
                1,
            ),
        },
        _ => print_text(&stats),
    }
}
