mod cli;
mod commands;

use clap::Parser;

use cli::Cli;

fn main() -> std::process::ExitCode {
    let args = Cli::parse();
    commands::compile::run(args)
}
