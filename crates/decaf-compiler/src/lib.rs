//! Type checker, field/class layout pass, and AMI code generator (§4.3,
//! §4.4, §4.5) — the core of the Decaf batch compiler.
//!
//! This crate's single public entry point, [`compile`], takes the classes
//! [`decaf_frontend::parse_program`] produced and runs them through the
//! three passes in order, exactly as §2's pipeline lays them out: build a
//! [`decaf_core::DependencyTree`] and type-check every member against it,
//! assign field offsets and class sizes, then walk every method and
//! constructor body to emit AMI instructions.

mod codegen;
mod layout;
mod typecheck;

use decaf_core::{ClassHandle, DependencyError, Diagnostic, DiagnosticKind, Span};

pub use codegen::Line;
pub use layout::resolve_sizes_and_offsets;
pub use typecheck::check_program;

/// A fatal error from any pass after parsing (§7's declaration/type/
/// code-gen diagnostic kinds; parse errors are [`decaf_frontend::ParseError`],
/// a separate type, since that crate is the external parser collaborator
/// §1 excludes from this crate's scope).
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// A class registration failure from [`decaf_core::DependencyTree`]:
    /// duplicate class name or unknown super class. Carries no [`Span`] —
    /// [`decaf_core::ClassRecord`] does not retain one — so it renders
    /// without a source snippet.
    #[error("{0}")]
    Dependency(#[from] DependencyError),
    #[error("{0}")]
    TypeError(Diagnostic),
    #[error("{0}")]
    CodeGen(Diagnostic),
}

impl CompileError {
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            CompileError::Dependency(_) => DiagnosticKind::Declaration,
            CompileError::TypeError(_) => DiagnosticKind::Type,
            CompileError::CodeGen(_) => DiagnosticKind::CodeGen,
        }
    }

    /// The [`Diagnostic`] backing this error, when it has one (every
    /// variant but [`CompileError::Dependency`]).
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CompileError::Dependency(_) => None,
            CompileError::TypeError(d) | CompileError::CodeGen(d) => Some(d),
        }
    }

    pub fn span(&self) -> Option<Span> {
        self.diagnostic().map(|d| d.span)
    }
}

/// Type-checks, lays out, and emits AMI for a whole program's classes
/// (§2). `debug` controls whether the emitter's per-instruction `#`
/// comments survive into the rendered output (§4.5).
pub fn compile(classes: &[ClassHandle], debug: bool) -> Result<String, CompileError> {
    let tree = check_program(classes)?;
    let static_slots = resolve_sizes_and_offsets(classes);
    let lines = codegen::generate_program(&tree, classes, static_slots)?;
    Ok(codegen::render(&lines, debug))
}

/// Renders a [`Diagnostic`] against the original source text the way the
/// teacher's `diagnostics::DiagnosticsPrinter` renders a syntax error:
/// a titled annotate-snippets report pointing at the offending lines.
/// Shared by [`CompileError`] and `decaf_frontend::ParseError`, which both
/// wrap a [`Diagnostic`].
pub fn render_diagnostic(source: &str, path: &str, diagnostic: &Diagnostic) -> String {
    use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

    let title = format!("{}: {}", diagnostic.kind, diagnostic.message);
    let range = line_byte_range(source, diagnostic.span);

    let snippet = Snippet::source(source)
        .line_start(1)
        .path(path)
        .annotation(AnnotationKind::Primary.span(range).label(diagnostic.rule));

    let group = Level::ERROR.primary_title(&title).element(snippet);
    Renderer::styled().render(&[group])
}

/// A [`CompileError`] has no snippet to render when it has no
/// [`Diagnostic`] (today, only [`CompileError::Dependency`]); this prints
/// a plain one-line message instead.
pub fn render_error(source: &str, path: &str, error: &CompileError) -> String {
    match error.diagnostic() {
        Some(diagnostic) => render_diagnostic(source, path, diagnostic),
        None => format!("{}: {error}", error.diagnostic_kind()),
    }
}

/// Converts a 1-based, inclusive `(start_line, end_line)` [`Span`] into a
/// byte range into `source`, the unit annotate-snippets' `Snippet`
/// expects. Clamps to `source`'s length so a span from a synthesized node
/// (or one past the last line) never panics the renderer.
fn line_byte_range(source: &str, span: Span) -> std::ops::Range<usize> {
    let mut line_starts = vec![0usize];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            line_starts.push(i + 1);
        }
    }
    line_starts.push(source.len());

    let start_idx = (span.start_line as usize).saturating_sub(1).min(line_starts.len() - 1);
    let end_idx = (span.end_line as usize).min(line_starts.len() - 1);

    let start = line_starts[start_idx];
    let end = line_starts[end_idx].max(start);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_byte_range_covers_a_single_line() {
        let source = "class A {\n  int x;\n}\n";
        let range = line_byte_range(source, Span::single(2));
        assert_eq!(&source[range], "  int x;\n");
    }

    #[test]
    fn line_byte_range_clamps_past_end_of_file() {
        let source = "class A {}\n";
        let range = line_byte_range(source, Span::new(1, 50));
        assert_eq!(range.end, source.len());
    }

    #[test]
    fn dependency_error_renders_without_a_snippet() {
        let err = CompileError::Dependency(DependencyError::DuplicateClass("A".to_string()));
        let rendered = render_error("class A {}\n", "a.decaf", &err);
        assert!(rendered.contains("declaration error"));
        assert!(rendered.contains("duplicate class name: A"));
    }
}
