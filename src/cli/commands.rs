use crate::config::GeneratorConfig;
use crate::diagnostics::{eprint_diagnostics, print_diagnostics, Diagnostic, Severity};
use crate::discovery::CancelSignal;
use crate::generator::{BufferPool, DispatchPlan};
use crate::model::{load_model, HandlerKind, ProgramModel};
use crate::pipeline::{analyze, run_pipeline, write_source};
use crate::registry::{ranked, HandlerRegistry};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line interface for handlergen
///
/// Discovers handler declarations in a program model and generates the
/// dispatch code that routes requests to them.
#[derive(Parser)]
#[command(name = "handlergen")]
#[command(about = "Build-time handler discovery and dispatch generation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run discovery, validation and generation
    Generate {
        /// Program model (YAML or JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// File to write the generated source to (printed to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generator configuration (TOML)
        #[arg(short, long, env = "HANDLERGEN_CONFIG")]
        config: Option<PathBuf>,

        /// Print the generated source instead of writing it
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Exit with error code and write nothing if any errors are found
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,
    },
    /// Report diagnostics without generating code
    Check {
        /// Program model (YAML or JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Generator configuration (TOML)
        #[arg(short, long, env = "HANDLERGEN_CONFIG")]
        config: Option<PathBuf>,

        /// Show only errors (hide warnings and info)
        #[arg(long, default_value_t = false)]
        errors_only: bool,

        /// Print diagnostics as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the handler registry and the dispatch shape of each request type
    Inspect {
        /// Program model (YAML or JSON)
        #[arg(short, long)]
        model: PathBuf,
    },
}

/// Parse the process arguments and run; returns the exit code
pub fn run_cli() -> anyhow::Result<i32> {
    execute(Cli::parse())
}

/// Run an already-parsed command; returns the exit code
pub fn execute(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Generate {
            model,
            output,
            config,
            dry_run,
            fail_on_error,
        } => {
            let (program, config) = load_inputs(&model, config.as_deref())?;
            let mut pool = BufferPool::new();
            let report = run_pipeline(&program, &config, &CancelSignal::new(), &mut pool)?;

            // stdout may carry the generated source
            eprint_diagnostics(report.diagnostics());
            if fail_on_error && report.has_errors() {
                eprintln!("❌ Generation failed: errors found in handler declarations");
                return Ok(1);
            }
            let Some(source) = report.source else {
                eprintln!("⚠️  Discovery was cancelled; nothing generated");
                return Ok(1);
            };
            match output {
                Some(path) if !dry_run => {
                    write_source(&path, &source.text)?;
                    println!("✅ Wrote {}", path.display());
                }
                _ => print!("{}", source.text),
            }
            Ok(0)
        }
        Commands::Check {
            model,
            config,
            errors_only,
            json,
        } => {
            let (program, config) = load_inputs(&model, config.as_deref())?;
            let report = analyze(&program, &config, &CancelSignal::new());
            let shown: Vec<Diagnostic> = report
                .diagnostics
                .iter()
                .filter(|d| !errors_only || d.severity == Severity::Error)
                .cloned()
                .collect();

            if json {
                let text = serde_json::to_string_pretty(&shown)
                    .context("Failed to serialize diagnostics")?;
                println!("{text}");
            } else {
                print_diagnostics(&shown);
            }
            Ok(if report.has_errors() { 1 } else { 0 })
        }
        Commands::Inspect { model } => {
            let (program, config) = load_inputs(&model, None)?;
            let report = analyze(&program, &config, &CancelSignal::new());
            print!("{}", render_inspection(&program, &report.registry));
            Ok(0)
        }
    }
}

fn load_inputs(model: &Path, config: Option<&Path>) -> anyhow::Result<(ProgramModel, GeneratorConfig)> {
    let program = load_model(model)?;
    let config = GeneratorConfig::load(config)?;
    Ok((program, config))
}

/// Human-readable registry listing used by `inspect`
pub fn render_inspection(model: &ProgramModel, registry: &HandlerRegistry) -> String {
    let plan = DispatchPlan::build(registry);
    let mut lines = vec![format!(
        "📦 {} ({} handler(s))",
        model.unit_name(),
        registry.len()
    )];

    for kind in [HandlerKind::Request, HandlerKind::Stream] {
        for procedure in plan.procedures.iter().filter(|p| p.kind == kind) {
            lines.push(String::new());
            lines.push(format!(
                "{kind} {} → {} [{:?}]",
                procedure.request_type, procedure.fn_name, procedure.shape
            ));
            for d in ranked(registry.handlers_for(kind, &procedure.request_type)) {
                lines.push(format!(
                    "   {:<12} priority {:>5}  {}{}",
                    d.normalized_name(),
                    d.priority,
                    d.qualified_name(),
                    if d.is_static { " (static)" } else { "" }
                ));
            }
        }
    }
    for publisher in &plan.publishers {
        lines.push(String::new());
        lines.push(format!(
            "notification {} → {}",
            publisher.notification_type, publisher.fn_name
        ));
        for call in &publisher.calls {
            lines.push(format!("   priority {:>5}  {}", call.priority, call.qualified));
        }
    }
    if !registry.pipelines().is_empty() {
        lines.push(String::new());
        lines.push("pipeline".to_string());
        for p in registry.pipelines() {
            lines.push(format!(
                "   {:<13} order {:>5}  {}",
                p.scope.variant(),
                p.order,
                p.qualified_name()
            ));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}
