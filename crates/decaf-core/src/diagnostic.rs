use crate::Span;
use std::fmt;

/// Which stage of the pipeline raised a [`Diagnostic`] (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    Parse,
    Declaration,
    Type,
    CodeGen,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::Declaration => "declaration error",
            DiagnosticKind::Type => "type error",
            DiagnosticKind::CodeGen => "code generation error",
        };
        write!(f, "{s}")
    }
}

/// A single fatal diagnostic: which rule it violates, where, and a
/// human-readable message. The pipeline never produces more than one of
/// these per compilation (§7) — the first raised terminates it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub rule: &'static str,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, rule: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] at line {}-{}: {}",
            self.kind, self.rule, self.span.start_line, self.span.end_line, self.message
        )
    }
}
