//! # Generator Module
//!
//! Turns a validated [`HandlerRegistry`] into Rust source that dispatches requests
//! to handlers without any runtime lookup.
//!
//! ## Overview
//!
//! For every request type the generator emits one `dispatch_<type>` procedure whose
//! shape depends on the handler set:
//!
//! - **Direct** - one handler, called with no branching on the handler name
//! - **Default chain** - several unnamed handlers, an `if` chain where the first wins
//! - **Named switch** - a `match` on the requested name with one arm per distinct name
//!   in ranking order, plus a catch-all arm
//!
//! Stream handlers get `stream_<type>` procedures with the same shapes. Notification
//! types get `publish_<type>` procedures that call every subscriber in ranking order.
//! Optional `HANDLER_REGISTRY` and `PIPELINE_BEHAVIORS` tables describe what was found.
//!
//! ## Architecture
//!
//! ```text
//! HandlerRegistry → DispatchPlan → askama templates → generated source
//! ```
//!
//! Planning is pure data ([`DispatchPlan`]) so tests can assert on the chosen shape
//! without parsing output. Each section is rendered into a buffer taken from the
//! caller's [`BufferPool`].
//!
//! ## Generated code contract
//!
//! The generated file expects the runtime module (default `crate::mediator`) to export
//! `CancellationToken`, `DispatchError` (with `NoHandler { request_type }` and
//! `NoHandlerNamed { request_type, name }`), and an `InstanceProvider` trait with
//! `fn resolve<T: Send + Sync + 'static>(&self) -> Arc<T>`. The tables additionally need
//! `HandlerEntry`, `HandlerKind`, `PipelineEntry` and `PipelineScope`.

mod naming;
mod plan;
mod pool;
mod templates;


pub use plan::{
    select_shape, DispatchPlan, DispatchShape, HandlerCall, PipelineRow, ProcedurePlan,
    PublishPlan, RegistryRow, ResolverPlan,
};
pub use pool::BufferPool;

use crate::registry::HandlerRegistry;
use anyhow::Context;
use askama::Template;
use templates::{
    ChainDispatchTemplate, DirectDispatchTemplate, DispatcherTemplateData,
    HandlerRegistryTemplate, PipelineRegistryTemplate, PublishTemplate, ResolverTemplate,
    SwitchDispatchTemplate,
};
use tracing::{debug, info};

/// Default module path of the dispatch runtime types
pub const DEFAULT_RUNTIME_MODULE: &str = "crate::mediator";

/// Which sections to emit and where the runtime lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Compilation unit name, shown in the file header
    pub unit_name: String,
    pub runtime_module: String,
    pub enable_handler_registry: bool,
    pub enable_optimized_dispatcher: bool,
    pub enable_pipeline_registry: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            unit_name: "handlers".to_string(),
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            enable_handler_registry: true,
            enable_optimized_dispatcher: true,
            enable_pipeline_registry: true,
        }
    }
}

/// Output of one generation pass
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    /// Complete Rust source text
    pub text: String,
    /// The plan the text was rendered from
    pub plan: DispatchPlan,
}

/// Generate dispatch source for `registry`.
///
/// Consumes the registry read-only. Rendering failures are template bugs, not user
/// errors, and surface as `Err`.
pub fn generate(
    registry: &HandlerRegistry,
    options: &GeneratorOptions,
    pool: &mut BufferPool,
) -> anyhow::Result<GeneratedSource> {
    let plan = DispatchPlan::build(registry);
    let mut sections: Vec<String> = Vec::new();

    if options.enable_optimized_dispatcher {
        for resolver in &plan.resolvers {
            sections.push(render(pool, &ResolverTemplate { resolver })?);
        }
        for procedure in &plan.procedures {
            debug!(
                request_type = %procedure.request_type,
                shape = ?procedure.shape,
                handlers = procedure.calls.len(),
                "Rendering dispatch procedure"
            );
            sections.push(render_procedure(pool, procedure)?);
        }
        for publisher in &plan.publishers {
            sections.push(render(pool, &PublishTemplate { publisher })?);
        }
    }
    if options.enable_handler_registry {
        sections.push(render(
            pool,
            &HandlerRegistryTemplate {
                rows: &plan.registry_rows,
            },
        )?);
    }
    if options.enable_pipeline_registry {
        sections.push(render(
            pool,
            &PipelineRegistryTemplate {
                rows: &plan.pipeline_rows,
            },
        )?);
    }

    let file = DispatcherTemplateData {
        unit_name: &options.unit_name,
        runtime_module: &options.runtime_module,
        handler_count: registry.len(),
        procedure_count: if options.enable_optimized_dispatcher {
            plan.procedures.len()
        } else {
            0
        },
        has_handler_registry: options.enable_handler_registry,
        has_pipeline_registry: options.enable_pipeline_registry,
        sections: &sections,
    };
    let mut text = String::new();
    file.render_into(&mut text)
        .context("Failed to render dispatcher file")?;
    text.push('\n');

    for buf in sections {
        pool.give_back(buf);
    }

    info!(
        unit = %options.unit_name,
        procedures = plan.procedures.len(),
        publishers = plan.publishers.len(),
        resolvers = plan.resolvers.len(),
        bytes = text.len(),
        "Dispatch source generated"
    );
    Ok(GeneratedSource { text, plan })
}

fn render_procedure(pool: &mut BufferPool, plan: &ProcedurePlan) -> anyhow::Result<String> {
    match (plan.shape, plan.calls.first()) {
        (DispatchShape::Direct, Some(call)) => render(pool, &DirectDispatchTemplate { plan, call }),
        (DispatchShape::DefaultChain, _) => render(pool, &ChainDispatchTemplate { plan }),
        _ => render(pool, &SwitchDispatchTemplate { plan }),
    }
}

fn render<T: Template>(pool: &mut BufferPool, template: &T) -> anyhow::Result<String> {
    let mut buf = pool.take();
    template
        .render_into(&mut buf)
        .context("Failed to render dispatch template")?;
    Ok(buf)
}
