//! CLI definition and shared argument builders.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command, value_parser};
use tinder_core::Colors;

pub fn build_cli() -> Command {
    Command::new("tinder")
        .about("Compile and run Tinder scripts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("ast")
                .about("Parse a script and print its match tree")
                .arg(script_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Compile a script and report diagnostics")
                .arg(script_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("dump")
                .about("Print the resolved instruction listing and jump table")
                .arg(script_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Compile a script and drive it against a fresh environment")
                .arg(script_arg())
                .arg(color_arg()),
        )
}

/// Script file (positional).
fn script_arg() -> Arg {
    Arg::new("script")
        .value_name("SCRIPT")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Script file to process")
}

/// Color output control (--color).
fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

pub fn script_path(matches: &ArgMatches) -> &PathBuf {
    matches
        .get_one::<PathBuf>("script")
        .expect("script is a required argument")
}

pub fn colors(matches: &ArgMatches) -> Colors {
    let when = matches
        .get_one::<String>("color")
        .map(String::as_str)
        .unwrap_or("auto");
    let enabled = match when {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    };
    Colors::new(enabled)
}
