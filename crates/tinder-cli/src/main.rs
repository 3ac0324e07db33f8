mod cli;
mod commands;


use cli::build_cli;

fn main() {
    let matches = build_cli().get_matches();

    let code = match matches.subcommand() {
        Some(("ast", m)) => commands::ast::run(m),
        Some(("check", m)) => commands::check::run(m),
        Some(("dump", m)) => commands::dump::run(m),
        Some(("run", m)) => commands::run::run(m),
        _ => unreachable!("clap should have caught this"),
    };
    std::process::exit(code);
}
