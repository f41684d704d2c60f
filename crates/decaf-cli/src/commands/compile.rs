use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::CommandFactory;

use decaf_compiler::render_error;

use crate::cli::Cli;

/// Drives one whole compilation: read the source, parse it, run it
/// through `decaf-compiler::compile`, and write the `.ami` file (§6).
///
/// Mirrors the teacher's `commands::check::run` shape — a thin function
/// that maps every failure to an `eprintln!` plus a process exit rather
/// than propagating a `Result` out of `main` — while reproducing §6's own
/// missing-argument quirk (print usage, exit *0*, not 1) ahead of it.
pub fn run(args: Cli) -> ExitCode {
    let Some(source_path) = args.source else {
        println!("{}", Cli::command().render_usage());
        return ExitCode::SUCCESS;
    };

    match compile_file(&source_path, args.debug) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn compile_file(source_path: &Path, debug: bool) -> Result<(), String> {
    let source = std::fs::read_to_string(source_path).map_err(|e| {
        format!("error: cannot read {}: {e}", source_path.display())
    })?;

    let path_display = source_path.display().to_string();

    let classes = decaf_frontend::parse_program(&source)
        .map_err(|e| render_error_message(&source, &path_display, RenderableError::Parse(&e)))?;

    let output = decaf_compiler::compile(&classes, debug)
        .map_err(|e| render_error_message(&source, &path_display, RenderableError::Compile(&e)))?;

    let out_path = ami_output_path(source_path);
    std::fs::write(&out_path, output)
        .map_err(|e| format!("error: cannot write {}: {e}", out_path.display()))?;

    Ok(())
}

/// The input's basename with its extension replaced by `.ami` (§6),
/// written to the current working directory.
fn ami_output_path(source_path: &Path) -> PathBuf {
    let stem = source_path
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("out"));
    stem.with_extension("ami")
}

enum RenderableError<'a> {
    Parse(&'a decaf_frontend::ParseError),
    Compile(&'a decaf_compiler::CompileError),
}

fn render_error_message(source: &str, path: &str, error: RenderableError<'_>) -> String {
    match error {
        RenderableError::Parse(e) => decaf_compiler::render_diagnostic(source, path, &e.0),
        RenderableError::Compile(e) => render_error(source, path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ami_output_path_replaces_extension() {
        assert_eq!(
            ami_output_path(Path::new("/tmp/prog.decaf")),
            PathBuf::from("prog.ami")
        );
    }

    #[test]
    fn ami_output_path_falls_back_for_extensionless_input() {
        assert_eq!(ami_output_path(Path::new("noext")), PathBuf::from("noext.ami"));
    }
}
