//! # Diagnostics Module
//!
//! Structured error/warning records produced while discovering, validating and
//! registering handlers, plus the sink they are reported into.
//!
//! ## Diagnostic Classes
//!
//! 1. **Rejections** - the candidate is dropped (invalid signature, parameter type,
//!    return type, async unit, scope out of range)
//! 2. **Warnings** - advisory; the candidate is kept (missing cancellation token,
//!    extreme priority, reserved name)
//! 3. **Conflicts** - cross-candidate problems found after aggregation; every
//!    implicated declaration is flagged individually
//! 4. **Critical** - a per-candidate operation failed unexpectedly
//!
//! ## Usage
//!
//! ```rust
//! use handlergen::diagnostics::{CollectingSink, Diagnostic, DiagnosticId, DiagnosticSink};
//! use handlergen::model::SourceRef;
//!
//! let sink = CollectingSink::new();
//! sink.report(Diagnostic::new(
//!     DiagnosticId::MissingCancellationToken,
//!     "Handler 'Orders::handle' does not accept a cancellation token",
//!     SourceRef::new("src/orders.rs", 12, 5),
//! ));
//! assert_eq!(sink.len(), 1);
//! ```

use crate::model::SourceRef;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};


/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - the host build should fail
    Error,
    /// Warning - reported but does not block generation
    Warning,
    /// Info - best practice suggestion
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Stable diagnostic identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticId {
    InvalidSignature,
    InvalidParameterType,
    InvalidReturnType,
    AsyncVoidHandler,
    ScopeOutOfRange,
    InvalidAttributeValue,
    MissingCancellationToken,
    ExtremePriority,
    ReservedHandlerName,
    DuplicateHandler,
    ConfigurationConflict,
    DuplicatePipelineOrder,
    MismatchedResponseType,
    InternalFailure,
}

impl DiagnosticId {
    /// The stable code surfaced to users
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticId::InvalidSignature => "HG0001",
            DiagnosticId::InvalidParameterType => "HG0002",
            DiagnosticId::InvalidReturnType => "HG0003",
            DiagnosticId::AsyncVoidHandler => "HG0004",
            DiagnosticId::ScopeOutOfRange => "HG0005",
            DiagnosticId::InvalidAttributeValue => "HG0006",
            DiagnosticId::MissingCancellationToken => "HG0101",
            DiagnosticId::ExtremePriority => "HG0102",
            DiagnosticId::ReservedHandlerName => "HG0103",
            DiagnosticId::DuplicateHandler => "HG0201",
            DiagnosticId::ConfigurationConflict => "HG0202",
            DiagnosticId::DuplicatePipelineOrder => "HG0203",
            DiagnosticId::MismatchedResponseType => "HG0204",
            DiagnosticId::InternalFailure => "HG0900",
        }
    }

    /// Default severity for this identifier
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticId::MissingCancellationToken
            | DiagnosticId::ExtremePriority
            | DiagnosticId::ReservedHandlerName => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether this identifier drops the candidate it is reported for
    pub fn is_rejection(self) -> bool {
        matches!(
            self,
            DiagnosticId::InvalidSignature
                | DiagnosticId::InvalidParameterType
                | DiagnosticId::InvalidReturnType
                | DiagnosticId::AsyncVoidHandler
                | DiagnosticId::ScopeOutOfRange
        )
    }

    /// Whether this identifier is a catastrophic per-candidate failure
    pub fn is_critical(self) -> bool {
        matches!(self, DiagnosticId::InternalFailure)
    }
}

impl fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A diagnostic record emitted to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub message: String,
    pub location: SourceRef,
    /// Optional suggestion for how to fix it
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the identifier's default severity
    pub fn new(id: DiagnosticId, message: impl Into<String>, location: SourceRef) -> Self {
        Diagnostic {
            id,
            severity: id.severity(),
            message: message.into(),
            location,
            suggestion: None,
        }
    }

    /// Add a suggestion for fixing the issue
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]: {}",
            self.location, self.severity, self.id, self.message
        )
    }
}

/// Destination for diagnostics; must accept concurrent reports
pub trait DiagnosticSink: Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Append-only, thread-safe sink that keeps every report
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// Copy of everything reported so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Take the collected diagnostics, leaving the sink empty
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}

/// Order diagnostics for display: by file, line, column, then code
pub fn sort_for_display(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.location
            .cmp(&b.location)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.message.cmp(&b.message))
    });
}

/// `true` if any diagnostic is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Count diagnostics carrying `id`
pub fn count_of(diagnostics: &[Diagnostic], id: DiagnosticId) -> usize {
    diagnostics.iter().filter(|d| d.id == id).count()
}

/// Print diagnostics grouped by severity to stdout
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    // Console output is best effort; a closed pipe is not worth failing over
    write_diagnostics(&mut io::stdout().lock(), diagnostics).ok();
}

/// Same report as [`print_diagnostics`], on stderr
pub fn eprint_diagnostics(diagnostics: &[Diagnostic]) {
    write_diagnostics(&mut io::stderr().lock(), diagnostics).ok();
}

/// Write the grouped report to `out`.
///
/// Critical failures are listed on their own, ahead of ordinary errors.
pub fn write_diagnostics<W: Write>(out: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    if diagnostics.is_empty() {
        writeln!(out, "✅ No handler diagnostics found!")?;
        return Ok(());
    }

    let critical: Vec<_> = diagnostics.iter().filter(|d| d.id.is_critical()).collect();
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error && !d.id.is_critical())
        .collect();
    let warnings: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    let infos: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Info)
        .collect();

    writeln!(out, "\n📋 Handler Diagnostics:")?;
    writeln!(
        out,
        "   {} critical, {} error(s), {} warning(s), {} info(s)\n",
        critical.len(),
        errors.len(),
        warnings.len(),
        infos.len()
    )?;

    write_group(out, "🔥 Critical (internal failures):", &critical)?;
    write_group(out, "❌ Errors (must fix):", &errors)?;
    write_group(out, "⚠️  Warnings (should fix):", &warnings)?;
    write_group(out, "ℹ️  Info (best practices):", &infos)
}

fn write_group<W: Write>(out: &mut W, title: &str, group: &[&Diagnostic]) -> io::Result<()> {
    if group.is_empty() {
        return Ok(());
    }
    writeln!(out, "{title}")?;
    for diagnostic in group {
        writeln!(out, "   [{}] {}", diagnostic.id, diagnostic.location)?;
        writeln!(out, "      {}", diagnostic.message)?;
        if let Some(suggestion) = &diagnostic.suggestion {
            writeln!(out, "      💡 Suggestion: {suggestion}")?;
        }
    }
    writeln!(out)
}
