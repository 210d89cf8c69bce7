//! Cross-candidate checks that only make sense once every descriptor is known.
//!
//! Every check reports and never removes: each implicated declaration gets its own
//! diagnostic so tooling can underline all of them.

use super::core::{ranked, HandlerRegistry};
use crate::descriptor::{HandlerDescriptor, PipelineInfo, PipelineScope, DEFAULT_HANDLER_NAME};
use crate::diagnostics::{Diagnostic, DiagnosticId};
use crate::model::HandlerKind;
use std::collections::{BTreeMap, BTreeSet};

/// Run every conflict check over a built registry
#[must_use]
pub fn validate_registry(registry: &HandlerRegistry) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for kind in [HandlerKind::Request, HandlerKind::Stream] {
        check_duplicate_handlers(registry, kind, &mut out);
        for request_type in registry.request_types(kind) {
            let handlers = registry.handlers_for(kind, request_type);
            check_mixed_naming(kind, request_type, &handlers, &mut out);
            check_response_types(kind, request_type, &handlers, &mut out);
        }
    }
    let pipelines: Vec<PipelineInfo> = registry
        .pipelines()
        .iter()
        .map(HandlerDescriptor::pipeline_info)
        .collect();
    out.extend(duplicate_pipeline_orders(&pipelines));
    out
}

fn check_duplicate_handlers(registry: &HandlerRegistry, kind: HandlerKind, out: &mut Vec<Diagnostic>) {
    for (key, group) in registry.entries(kind) {
        if group.len() < 2 {
            continue;
        }
        let members = group
            .iter()
            .map(HandlerDescriptor::qualified_name)
            .collect::<Vec<_>>()
            .join(", ");
        for d in group {
            out.push(
                Diagnostic::new(
                    DiagnosticId::DuplicateHandler,
                    format!(
                        "{kind} '{}' has {} handlers named '{}' ({members}); '{}' is one of them",
                        key.request_type,
                        group.len(),
                        key.name,
                        d.qualified_name()
                    ),
                    d.location.clone(),
                )
                .with_suggestion("Give each handler a distinct Name, or remove the extra one"),
            );
        }
    }
}

fn check_mixed_naming(
    kind: HandlerKind,
    request_type: &str,
    handlers: &[&HandlerDescriptor],
    out: &mut Vec<Diagnostic>,
) {
    let names: BTreeSet<&str> = handlers.iter().map(|d| d.normalized_name()).collect();
    let has_default = names.contains(DEFAULT_HANDLER_NAME);
    let explicit: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| *n != DEFAULT_HANDLER_NAME)
        .collect();
    if !has_default || explicit.is_empty() {
        return;
    }
    for d in handlers {
        out.push(
            Diagnostic::new(
                DiagnosticId::ConfigurationConflict,
                format!(
                    "{kind} '{request_type}' mixes an unnamed handler with named handlers ({}); '{}' is affected",
                    explicit.join(", "),
                    d.qualified_name()
                ),
                d.location.clone(),
            )
            .with_suggestion("Name every handler of this request type, or none of them"),
        );
    }
}

fn check_response_types(
    kind: HandlerKind,
    request_type: &str,
    handlers: &[&HandlerDescriptor],
    out: &mut Vec<Diagnostic>,
) {
    let order = ranked(handlers.iter().copied());
    let Some(top) = order.first() else {
        return;
    };
    let expected = top.returns.output_type();
    for d in order.iter().skip(1) {
        let actual = d.returns.output_type();
        if actual != expected {
            out.push(Diagnostic::new(
                DiagnosticId::MismatchedResponseType,
                format!(
                    "{kind} handler '{}' for '{request_type}' produces '{actual}', but '{}' produces '{expected}'",
                    d.qualified_name(),
                    top.qualified_name()
                ),
                d.location.clone(),
            ));
        }
    }
}

/// Duplicate pipeline order detection.
///
/// Entries are grouped by `(scope, containing_type)` and then by `order`. An
/// order-group whose distinct method names are fewer than its entries gets one
/// diagnostic per entry; an order-group of all-distinct method names is accepted.
#[must_use]
pub fn duplicate_pipeline_orders(pipelines: &[PipelineInfo]) -> Vec<Diagnostic> {
    let mut groups: BTreeMap<(PipelineScope, &str, i32), Vec<&PipelineInfo>> = BTreeMap::new();
    for info in pipelines {
        groups
            .entry((info.scope, info.containing_type.as_str(), info.order))
            .or_default()
            .push(info);
    }

    let mut out = Vec::new();
    for ((scope, containing_type, order), group) in groups {
        if group.len() < 2 {
            continue;
        }
        let distinct: BTreeSet<&str> = group.iter().map(|p| p.method_name.as_str()).collect();
        if distinct.len() == group.len() {
            continue;
        }
        for info in &group {
            out.push(
                Diagnostic::new(
                    DiagnosticId::DuplicatePipelineOrder,
                    format!(
                        "Pipeline '{containing_type}::{}' shares Order = {order} in scope {scope} with {} other declaration(s)",
                        info.method_name,
                        group.len() - 1
                    ),
                    info.location.clone(),
                )
                .with_suggestion("Give each pipeline behavior a distinct Order"),
            );
        }
    }
    out
}
