//! `tinder dump`: print the resolved instruction listing and jump table.

use clap::ArgMatches;
use tinder::Tinderstarter;

use crate::cli::{colors, script_path};
use crate::commands::{read_source, report_compile_error};

pub fn run(matches: &ArgMatches) -> i32 {
    let path = script_path(matches);
    let colors = colors(matches);
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let starter = match Tinderstarter::new() {
        Ok(starter) => starter,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };

    let script = match starter.compile(&source) {
        Ok(script) => script,
        Err(err) => {
            report_compile_error(&err, &source, path, colors);
            return 1;
        }
    };

    for (index, (line, op)) in script.instructions().iter().enumerate() {
        println!(
            "{}{index:4}{} {}L{line}{} {op:?}",
            colors.dim, colors.reset, colors.blue, colors.reset
        );
    }
    if !script.jump_table().is_empty() {
        println!();
        for (label, index) in script.jump_table() {
            println!("{}{label}{} -> {index}", colors.green, colors.reset);
        }
    }
    0
}
