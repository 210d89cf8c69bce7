//! End-to-end run for one compilation unit: discovery, registry validation, generation.

use crate::config::GeneratorConfig;
use crate::diagnostics::{has_errors, sort_for_display, CollectingSink, Diagnostic, Severity};
use crate::discovery::{discover, CancelSignal};
use crate::generator::{generate, BufferPool, GeneratedSource};
use crate::model::ProgramModel;
use crate::registry::{build_and_validate, HandlerRegistry};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Result of analysing a model without generating code
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Every diagnostic from discovery and registry validation, in display order
    pub diagnostics: Vec<Diagnostic>,
    pub registry: HandlerRegistry,
    /// Discovery stopped early; the registry holds a partial result
    pub cancelled: bool,
}

impl AnalysisReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Result of a full generation run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub analysis: AnalysisReport,
    /// `None` when discovery was cancelled
    pub source: Option<GeneratedSource>,
}

impl GenerationReport {
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.analysis.diagnostics
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.analysis.has_errors()
    }
}

/// Discover, register and validate every handler in `model`
pub fn analyze(model: &ProgramModel, config: &GeneratorConfig, cancel: &CancelSignal) -> AnalysisReport {
    let sink = CollectingSink::new();
    let result = discover(
        &model.candidates,
        model,
        &sink,
        &config.discovery_options(),
        cancel,
    );
    let cancelled = result.cancelled;
    let (registry, conflicts) = build_and_validate(result);

    let mut diagnostics = sink.drain();
    diagnostics.extend(conflicts);
    sort_for_display(&mut diagnostics);

    AnalysisReport {
        diagnostics,
        registry,
        cancelled,
    }
}

/// Run the whole pipeline and render dispatch source.
///
/// Conflicts do not stop generation; the caller decides whether errors are fatal.
/// A cancelled run skips generation, since a partial registry would emit
/// incomplete dispatch code.
pub fn run_pipeline(
    model: &ProgramModel,
    config: &GeneratorConfig,
    cancel: &CancelSignal,
    pool: &mut BufferPool,
) -> anyhow::Result<GenerationReport> {
    let started = Instant::now();
    let analysis = analyze(model, config, cancel);

    if analysis.cancelled {
        warn!(unit = %model.unit_name(), "Generation skipped: discovery was cancelled");
        return Ok(GenerationReport {
            analysis,
            source: None,
        });
    }

    let options = config.generator_options(model.unit_name());
    let source = generate(&analysis.registry, &options, pool)?;
    info!(
        unit = %model.unit_name(),
        errors = analysis.count(Severity::Error),
        warnings = analysis.count(Severity::Warning),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Pipeline finished"
    );
    Ok(GenerationReport {
        analysis,
        source: Some(source),
    })
}

/// Write generated source, creating parent directories as needed
pub fn write_source(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = text.len(), "Generated source written");
    Ok(())
}
