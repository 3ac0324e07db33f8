//! `tinder check`: compile a script and report diagnostics.

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

    match starter.compile(&source) {
        Ok(script) => {
            println!(
                "{}: {} instructions, {} labels",
                path.display(),
                script.len(),
                script.jump_table().len()
            );
            0
        }
        Err(err) => {
            report_compile_error(&err, &source, path, colors);
            1
        }
    }
}
