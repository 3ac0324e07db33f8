pub mod ast;
pub mod check;
pub mod dump;
pub mod run;

#[cfg(test)]
mod format_tests;

use std::path::Path;

use firestarter::{FirestarterError, GrammarError};
use tinder::CompileError;
use tinder_core::Colors;

pub fn read_source(path: &Path) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|err| {
        eprintln!("error: cannot read {}: {err}", path.display());
        1
    })
}

/// Print a compile failure; parse errors render as annotated snippets.
pub fn report_compile_error(err: &CompileError, source: &str, path: &Path, colors: Colors) {
    eprintln!("{}", format_compile_error(err, source, path, colors));
}

/// Render a compile failure: parse errors as annotated snippets over the
/// source, everything else as a plain one-liner.
pub fn format_compile_error(
    err: &CompileError,
    source: &str,
    path: &Path,
    colors: Colors,
) -> String {
    if let CompileError::Firestarter(FirestarterError::Grammar(GrammarError::Parse(parse))) = err {
        parse.render(source, path.to_str(), colors.is_enabled())
    } else {
        format!("{}error{}: {err}", colors.red, colors.reset)
    }
}
