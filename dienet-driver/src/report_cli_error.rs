// SPDX-License-Identifier: Apache-2.0

use colored::Colorize;

/// Prints `message` (its first line emphasized, further lines indented) and
/// the detail pairs on stderr, then exits with `exit_code`.
pub fn report_cli_error_and_exit(
    message: &str,
    subcommand: Option<&str>,
    details: Vec<(&str, &str)>,
    exit_code: i32,
) -> ! {
    let subcommand_str = if let Some(subcommand) = subcommand {
        format!("{}: ", subcommand)
    } else {
        String::new()
    };
    let mut lines = message.lines();
    let headline = lines.next().unwrap_or("");
    eprintln!("dienet-driver: {}{}", subcommand_str, headline.red().bold());
    for line in lines {
        eprintln!("  {}", line);
    }
    for (key, value) in details {
        eprintln!("  {}: {}", key, value);
    }
    std::process::exit(exit_code);
}
