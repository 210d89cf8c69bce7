use askama::Template;

use super::plan::{
    HandlerCall, PipelineRow, ProcedurePlan, PublishPlan, RegistryRow, ResolverPlan,
};

/// Template data for the generated dispatcher file
#[derive(Template)]
#[template(path = "dispatcher.rs.txt", escape = "none")]
pub struct DispatcherTemplateData<'a> {
    /// Compilation unit the handlers were discovered in
    pub unit_name: &'a str,
    /// Module path exporting the dispatch runtime types
    pub runtime_module: &'a str,
    pub handler_count: usize,
    pub procedure_count: usize,
    pub has_handler_registry: bool,
    pub has_pipeline_registry: bool,
    /// Pre-rendered item sections, emitted in order
    pub sections: &'a [String],
}

/// Single handler, no branching
#[derive(Template)]
#[template(path = "dispatch_direct.rs.txt", escape = "none")]
pub struct DirectDispatchTemplate<'a> {
    pub plan: &'a ProcedurePlan,
    pub call: &'a HandlerCall,
}

/// Several unnamed handlers
#[derive(Template)]
#[template(path = "dispatch_chain.rs.txt", escape = "none")]
pub struct ChainDispatchTemplate<'a> {
    pub plan: &'a ProcedurePlan,
}

/// Named handlers, one arm per name
#[derive(Template)]
#[template(path = "dispatch_switch.rs.txt", escape = "none")]
pub struct SwitchDispatchTemplate<'a> {
    pub plan: &'a ProcedurePlan,
}

#[derive(Template)]
#[template(path = "resolver.rs.txt", escape = "none")]
pub struct ResolverTemplate<'a> {
    pub resolver: &'a ResolverPlan,
}

#[derive(Template)]
#[template(path = "publish.rs.txt", escape = "none")]
pub struct PublishTemplate<'a> {
    pub publisher: &'a PublishPlan,
}

#[derive(Template)]
#[template(path = "handler_registry.rs.txt", escape = "none")]
pub struct HandlerRegistryTemplate<'a> {
    pub rows: &'a [RegistryRow],
}

#[derive(Template)]
#[template(path = "pipeline_registry.rs.txt", escape = "none")]
pub struct PipelineRegistryTemplate<'a> {
    pub rows: &'a [PipelineRow],
}
