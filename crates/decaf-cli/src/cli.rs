use std::path::PathBuf;

use clap::Parser;

/// `decaf <source_file>`: compiles one Decaf source file to AMI assembly
/// (§6). `source` is optional at the type level even though the language
/// requires it, so [`crate::commands::run`] can reproduce the historical
/// "missing argument prints usage and exits 0" quirk (§6, §9) instead of
/// clap's own usage-error exit code.
#[derive(Parser)]
#[command(name = "decaf", bin_name = "decaf", about = "Batch compiler for the Decaf language")]
pub struct Cli {
    /// Path to the `.decaf` source file to compile.
    pub source: Option<PathBuf>,

    /// Keep the `#` comment lines the emitter attaches to most
    /// instructions (dropped by default, §4.5's `CODEGEN_DEBUG`).
    #[arg(long)]
    pub debug: bool,
}
