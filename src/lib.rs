//! # handlergen
//!
//! **handlergen** discovers request, notification, pipeline and stream handlers in a
//! program model at build time and generates the Rust code that dispatches to them,
//! so there is no runtime reflection or lookup table in the hot path.
//!
//! ## Architecture
//!
//! The library is organized as a pipeline of small stages:
//!
//! - **[`model`]** - The host program snapshot: candidate declarations, tags and type
//!   capabilities, loadable from YAML or JSON
//! - **[`discovery`]** - Tag extraction, signature validation and the parallel scan
//! - **[`descriptor`]** - Immutable metadata of each valid handler
//! - **[`registry`]** - Indexing by `(request type, name)` and conflict detection
//! - **[`generator`]** - Dispatch planning and askama rendering
//! - **[`diagnostics`]** - Stable diagnostic identifiers and the thread-safe sink
//! - **[`pipeline`]** - The end-to-end run used by the CLI and build scripts
//! - **[`config`]** - Generator settings from TOML and `HANDLERGEN_*` variables
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - The `handlergen` command-line front end
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Build as build.rs / CLI
//!     participant Discovery as discovery::discover
//!     participant Registry as registry::build_and_validate
//!     participant Generator as generator::generate
//!     participant Sink as CollectingSink
//!
//!     Build->>Discovery: candidates, model, options, cancel
//!     Discovery->>Discovery: extract tags, validate signatures<br/>(scoped worker pool above threshold)
//!     Discovery->>Sink: rejections and warnings
//!     Discovery-->>Build: DiscoveryResult
//!     Build->>Registry: DiscoveryResult
//!     Registry-->>Build: HandlerRegistry + conflicts
//!     Build->>Generator: registry, options, buffer pool
//!     Generator-->>Build: GeneratedSource
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use handlergen::config::GeneratorConfig;
//! use handlergen::discovery::CancelSignal;
//! use handlergen::generator::BufferPool;
//! use handlergen::model::load_model;
//! use handlergen::pipeline::{run_pipeline, write_source};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let model = load_model(Path::new("handlers.yaml"))?;
//! let config = GeneratorConfig::load(None)?;
//! let report = run_pipeline(&model, &config, &CancelSignal::new(), &mut BufferPool::new())?;
//! for diagnostic in report.diagnostics() {
//!     eprintln!("{diagnostic}");
//! }
//! if let Some(source) = report.source {
//!     write_source(Path::new("src/generated/dispatch.rs"), &source.text)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod discovery;
pub mod generator;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod registry;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticId, DiagnosticSink, Severity};
pub use discovery::{discover, CancelSignal, DiscoveryOptions, DiscoveryResult};
pub use generator::{generate, BufferPool, GeneratedSource, GeneratorOptions};
pub use model::{load_model, ProgramModel};
pub use pipeline::{run_pipeline, GenerationReport};
pub use registry::{build_and_validate, HandlerRegistry};
