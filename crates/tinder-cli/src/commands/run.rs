//! `tinder run`: the reference host loop.
//!
//! Builds a Crucible chain, writes the jump table, and drives the script:
//! `Yielded` prints `__OUTPUT__` and reads a line into `__INPUT__`,
//! `Imported` is fulfilled from the built-in registry, `Halted` ends the
//! session.

use std::io::{BufRead, Write as _};

use clap::ArgMatches;
use tinder::{LibraryRegistry, MathLib, RunSignal, Tinderstarter};
use tinder_core::{Access, Crucible, Value};

use crate::cli::{colors, script_path};
use crate::commands::{read_source, report_compile_error};

pub fn run(matches: &ArgMatches) -> i32 {
    let path = script_path(matches);
    let colors = colors(matches);
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut libraries = LibraryRegistry::new();
    libraries.register(MathLib);

    let mut starter = match Tinderstarter::new() {
        Ok(starter) => starter,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    starter.resolve_env(Crucible::new(Access::NONE).update(libraries.resolvable_exports()));

    let mut script = match starter.compile(&source) {
        Ok(script) => script,
        Err(err) => {
            report_compile_error(&err, &source, path, colors);
            return 1;
        }
    };

    let env = Crucible::new(Access::NONE);
    if script.write_jump_table(&env).is_err()
        || env.set("__OUTPUT__", Value::Str(String::new())).is_err()
        || env.set("__INPUT__", Value::Str(String::new())).is_err()
    {
        eprintln!("error: could not prepare the environment");
        return 1;
    }

    let stdin = std::io::stdin();
    loop {
        match script.run(&env) {
            Ok(RunSignal::Yielded(_payload)) => {
                flush_output(&env);
                let mut line = String::new();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => return 0,
                    Ok(_) => {}
                }
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if env.set("__INPUT__", Value::Str(trimmed.to_owned())).is_err() {
                    eprintln!("error: could not store input");
                    return 1;
                }
            }
            Ok(RunSignal::Imported {
                library,
                alias,
                request,
            }) => {
                if let Err(err) = libraries.fulfill(
                    &env,
                    &script,
                    &library,
                    alias.as_deref(),
                    request.as_deref(),
                ) {
                    eprintln!("{}error{}: {err}", colors.red, colors.reset);
                    return 1;
                }
            }
            Ok(RunSignal::Halted) => {
                flush_output(&env);
                return 0;
            }
            Err(err) => {
                flush_output(&env);
                eprintln!("{}error{}: {err}", colors.red, colors.reset);
                return 1;
            }
        }
    }
}

/// Print and clear the accumulated `__OUTPUT__` slot.
fn flush_output(env: &Crucible) {
    if let Ok(Value::Str(output)) = env.get("__OUTPUT__")
        && !output.is_empty()
    {
        print!("{output}");
        let _ = std::io::stdout().flush();
        let _ = env.set("__OUTPUT__", Value::Str(String::new()));
    }
}
