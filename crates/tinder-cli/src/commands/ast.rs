//! `tinder ast`: parse a script and print the match tree.

use clap::ArgMatches;
use firestarter::{GrammarError, GrammarFlags, make_grammar};

use crate::cli::{colors, script_path};
use crate::commands::read_source;

pub fn run(matches: &ArgMatches) -> i32 {
    let path = script_path(matches);
    let colors = colors(matches);
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let grammar = match make_grammar(
        tinder::GRAMMAR,
        GrammarFlags::SKIP_SPACES | GrammarFlags::FLATTEN,
    ) {
        Ok(grammar) => grammar,
        Err(err) => {
            eprintln!("error: invalid embedded grammar: {err}");
            return 1;
        }
    };

    match grammar.parse(&source) {
        Ok(ast) => {
            print!("{}", ast.pretty(&grammar, colors));
            0
        }
        Err(GrammarError::Parse(parse)) => {
            eprintln!(
                "{}",
                parse.render(&source, path.to_str(), colors.is_enabled())
            );
            1
        }
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}
