// SPDX-License-Identifier: Apache-2.0

//! This is a command line driver program for die netlist extraction.
//!
//! Commands are given like:
//!
//! ```text
//! dienet-driver <command> <command-args-and-options>
//! ```
//!
//! Commands are:
//!
//! - extract: Runs the extraction described by a configuration file, writing
//!   the circuit grid and the netlist.
//! - netlist-stats: Prints circuit, net and transistor counts of a netlist.
//! - net-names: Names nets from a pin file, using the outputs of a prior
//!   extract run.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- extract die/z80.conf --check
//! $ cargo run -- netlist-stats die/z80.net --format=json
//! $ cargo run -- net-names die/z80.conf die/z80.pins
//! ```

mod extract;
mod net_names;
mod netlist_stats;
mod report_cli_error;

use clap::{Arg, ArgAction};
use report_cli_error::report_cli_error_and_exit;

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "dienet-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("dienet-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Command line driver for die netlist extraction")
        .subcommand(clap::Command::new("version").about("Prints the version of the driver"))
        .subcommand(
            clap::Command::new("extract")
                .about("Extracts the netlist of a die from its layer masks")
                .arg(
                    Arg::new("config")
                        .help("The extraction configuration file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("check")
                        .long("check")
                        .help("Run consistency checks on the result; fail on findings")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            clap::Command::new("netlist-stats")
                .about("Prints statistics of a netlist file")
                .arg(
                    Arg::new("netlist")
                        .help("The netlist file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format")
                        .value_parser(["text", "json"])
                        .default_value("text")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            clap::Command::new("net-names")
                .about("Names nets from a pin file")
                .arg(
                    Arg::new("config")
                        .help("The extraction configuration file of a prior extract run")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("pins")
                        .help("The pin file: `<layer> <x> <y> <name>` per line")
                        .required(true)
                        .index(2),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("extract") {
        extract::handle_extract(matches);
    } else if let Some(matches) = matches.subcommand_matches("netlist-stats") {
        netlist_stats::handle_netlist_stats(matches);
    } else if let Some(matches) = matches.subcommand_matches("net-names") {
        net_names::handle_net_names(matches);
    } else if let Some(_matches) = matches.subcommand_matches("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
    } else {
        report_cli_error_and_exit("No valid subcommand provided.", None, vec![], 1);
    }
}
