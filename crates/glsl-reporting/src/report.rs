//! Diagnostic report data structures, in the style of
//! `hash-reporting::report::Report`: a report carries a kind, a code, a
//! title and a list of notes, and is rendered to one line of shader-log
//! text when appended to a [`crate::log::ShaderLog`].

use std::fmt;

use crate::codes::DiagnosticCode;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReportKind {
    Error,
    Warning,
    Internal,
}

impl ReportKind {
    fn label(self) -> &'static str {
        match self {
            ReportKind::Error => "error",
            ReportKind::Warning => "warning",
            ReportKind::Internal => "internal error",
        }
    }
}

/// A single diagnostic, carrying the fixed code/message pair from
/// `spec.md` §6.4 plus whatever caller-provided context the code requires
/// (e.g. the offending symbol name for `S0055`/`S0100`, or the `#error`
/// text for `P0002`).
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub code: DiagnosticCode,
    /// Extra text appended after the fixed message, used by the small
    /// handful of codes that the spec calls out as carrying caller text.
    pub detail: Option<String>,
    pub line: u32,
}

impl Report {
    pub fn new(code: DiagnosticCode, line: u32) -> Self {
        let kind = if code.is_warning() { ReportKind::Warning } else { ReportKind::Error };
        Self { kind, code, detail: None, line }
    }

    pub fn internal(line: u32) -> Self {
        Self { kind: ReportKind::Internal, code: DiagnosticCode::I0000, detail: None, line }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ReportKind::Error | ReportKind::Internal)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.line, self.code, self.kind.label(), self.code.message())?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}
