// SPDX-License-Identifier: Apache-2.0

use crate::report_cli_error::report_cli_error_and_exit;
use clap::ArgMatches;
use dienet::consistency;
use dienet::ExtractionConfig;
use std::path::Path;

const SUBCOMMAND: &str = "extract";

pub fn handle_extract(matches: &ArgMatches) {
    let config_path = matches
        .get_one::<String>("config")
        .expect("config is required");
    let check = matches.get_flag("check");

    let config = match ExtractionConfig::read(Path::new(config_path)) {
        Ok(config) => config,
        Err(e) => report_cli_error_and_exit(
            &e.to_string(),
            Some(SUBCOMMAND),
            vec![("config", config_path.as_str())],
            if e.is_io() { 2 } else { 1 },
        ),
    };
    log::info!(
        "method {}, die {}x{}, {} metal links",
        config.method,
        config.width,
        config.height,
        config.metal_links.len()
    );

    let ctx = match dienet::run(&config) {
        Ok(ctx) => ctx,
        Err(e) => report_cli_error_and_exit(
            &e.to_string(),
            Some(SUBCOMMAND),
            vec![("config", config_path.as_str())],
            e.exit_code(),
        ),
    };
    for diagnostic in &ctx.vias.diagnostics {
        log::warn!("{}", diagnostic);
    }

    if check {
        let findings = consistency::check(&ctx);
        if !findings.is_empty() {
            let mut message = format!("{} consistency finding(s)", findings.len());
            for finding in &findings {
                message.push('\n');
                message.push_str(&finding.to_string());
            }
            report_cli_error_and_exit(&message, Some(SUBCOMMAND), vec![], 1);
        }
        log::info!("consistency checks passed");
    }

    println!("{}", ctx.summary());
}
