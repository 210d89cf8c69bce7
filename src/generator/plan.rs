//! Dispatch strategy selection.
//!
//! Everything here is pure data: a [`DispatchPlan`] says which procedures to emit
//! and how each one selects its handler. Rendering lives in `templates`.

use super::naming::{ident_fragment, str_literal, unique_ident};
use crate::descriptor::HandlerDescriptor;
use crate::model::{HandlerKind, ReturnType};
use crate::registry::{ranked, HandlerRegistry};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// How a dispatch procedure picks its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchShape {
    /// Exactly one handler; called with no branching on the name
    Direct,
    /// Several unnamed handlers; an if-chain on the default name, first match wins
    DefaultChain,
    /// At least one named handler; a `match` on the requested name
    NamedSwitch,
}

/// One handler invocation inside a generated procedure
#[derive(Debug, Clone, Serialize)]
pub struct HandlerCall {
    /// Normalized handler name
    pub name: String,
    /// `name` as a Rust string literal
    pub name_literal: String,
    pub qualified: String,
    pub priority: i32,
    pub is_static: bool,
    /// The awaited call produces `()`
    pub is_void: bool,
    /// Complete call expression, including `.await` where the handler returns a future
    pub invocation: String,
}

/// One generated dispatch procedure for a request or stream type
#[derive(Debug, Clone, Serialize)]
pub struct ProcedurePlan {
    pub kind: HandlerKind,
    pub request_type: String,
    pub request_type_literal: String,
    pub fn_name: String,
    pub output_type: String,
    pub shape: DispatchShape,
    /// Handlers in dispatch order; switch arms carry one call per distinct name
    pub calls: Vec<HandlerCall>,
}

/// Inline instance resolver, one per `(containing type, method)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverPlan {
    pub fn_name: String,
    pub containing_type: String,
    pub method_name: String,
}

/// Fan-out procedure for one notification type
#[derive(Debug, Clone, Serialize)]
pub struct PublishPlan {
    pub notification_type: String,
    pub fn_name: String,
    pub calls: Vec<HandlerCall>,
}

/// Row of the generated handler metadata table
#[derive(Debug, Clone, Serialize)]
pub struct RegistryRow {
    pub kind: &'static str,
    pub request_type_literal: String,
    pub name_literal: String,
    pub priority: i32,
    pub handler_literal: String,
    pub is_static: bool,
}

/// Row of the generated pipeline behavior table
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRow {
    pub scope: &'static str,
    pub order: i32,
    pub behavior_literal: String,
    pub is_static: bool,
}

/// Everything the generator will emit for one compilation unit
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchPlan {
    pub procedures: Vec<ProcedurePlan>,
    pub resolvers: Vec<ResolverPlan>,
    pub publishers: Vec<PublishPlan>,
    pub registry_rows: Vec<RegistryRow>,
    pub pipeline_rows: Vec<PipelineRow>,
}

impl DispatchPlan {
    /// Plan every section for `registry`
    #[must_use]
    pub fn build(registry: &HandlerRegistry) -> Self {
        let mut planner = Planner::default();
        let mut plan = DispatchPlan::default();

        for kind in [HandlerKind::Request, HandlerKind::Stream] {
            for request_type in registry.request_types(kind) {
                let handlers = registry.handlers_for(kind, request_type);
                plan.procedures
                    .push(planner.procedure(kind, request_type, &handlers));
            }
        }
        for (notification_type, subscribers) in registry.notifications() {
            plan.publishers
                .push(planner.publisher(notification_type, subscribers));
        }
        plan.resolvers = planner.resolvers.into_values().collect();
        plan.resolvers.sort_by(|a, b| a.fn_name.cmp(&b.fn_name));

        for d in registry.iter().filter(|d| d.kind != HandlerKind::Pipeline) {
            plan.registry_rows.push(RegistryRow {
                kind: kind_variant(d.kind),
                request_type_literal: str_literal(&d.request_type),
                name_literal: str_literal(d.normalized_name()),
                priority: d.priority,
                handler_literal: str_literal(&d.qualified_name()),
                is_static: d.is_static,
            });
        }
        plan.pipeline_rows = registry.pipelines().iter().map(pipeline_row).collect();
        plan
    }

    #[must_use]
    pub fn procedure(&self, request_type: &str) -> Option<&ProcedurePlan> {
        self.procedures.iter().find(|p| p.request_type == request_type)
    }
}

/// Select the dispatch shape from the ranked handler set
#[must_use]
pub fn select_shape(handlers: &[&HandlerDescriptor]) -> DispatchShape {
    if handlers.len() == 1 {
        DispatchShape::Direct
    } else if handlers.iter().all(|d| d.is_default()) {
        DispatchShape::DefaultChain
    } else {
        DispatchShape::NamedSwitch
    }
}

#[derive(Default)]
struct Planner {
    idents: HashSet<String>,
    resolvers: BTreeMap<(String, String), ResolverPlan>,
}

impl Planner {
    fn procedure(
        &mut self,
        kind: HandlerKind,
        request_type: &str,
        handlers: &[&HandlerDescriptor],
    ) -> ProcedurePlan {
        let order = ranked(handlers.iter().copied());
        let shape = select_shape(&order);
        let prefix = match kind {
            HandlerKind::Stream => "stream",
            _ => "dispatch",
        };
        let fn_name = unique_ident(
            &mut self.idents,
            &format!("{prefix}_{}", ident_fragment(request_type)),
        );
        // The top-ranked handler defines the procedure's result type
        let output_type = order
            .first()
            .map(|d| d.returns.output_type())
            .unwrap_or_else(|| "()".to_string());

        let selected: Vec<&HandlerDescriptor> = match shape {
            DispatchShape::NamedSwitch => {
                let mut seen = HashSet::new();
                order
                    .into_iter()
                    .filter(|d| seen.insert(d.normalized_name().to_string()))
                    .collect()
            }
            _ => order,
        };

        let calls = selected
            .into_iter()
            .map(|d| {
                let receiver = self.receiver(d, shape);
                handler_call(d, &receiver, "request", "cancel")
            })
            .collect();

        ProcedurePlan {
            kind,
            request_type: request_type.to_string(),
            request_type_literal: str_literal(request_type),
            fn_name,
            output_type,
            shape,
            calls,
        }
    }

    fn publisher(&mut self, notification_type: &str, subscribers: &[HandlerDescriptor]) -> PublishPlan {
        let fn_name = unique_ident(
            &mut self.idents,
            &format!("publish_{}", ident_fragment(notification_type)),
        );
        let calls = ranked(subscribers.iter())
            .into_iter()
            .map(|d| {
                let receiver = direct_receiver(d);
                handler_call(d, &receiver, "notification.clone()", "cancel.clone()")
            })
            .collect();
        PublishPlan {
            notification_type: notification_type.to_string(),
            fn_name,
            calls,
        }
    }

    /// Receiver expression; instance handlers behind a branch go through a resolver
    fn receiver(&mut self, d: &HandlerDescriptor, shape: DispatchShape) -> String {
        if d.is_static || shape == DispatchShape::Direct {
            return direct_receiver(d);
        }
        let key = (d.containing_type.clone(), d.method_name.clone());
        if let Some(existing) = self.resolvers.get(&key) {
            return format!("{}(provider)", existing.fn_name);
        }
        let fn_name = unique_ident(
            &mut self.idents,
            &format!(
                "resolve_{}_{}",
                ident_fragment(&d.containing_type),
                ident_fragment(&d.method_name)
            ),
        );
        let call = format!("{fn_name}(provider)");
        self.resolvers.insert(
            key,
            ResolverPlan {
                fn_name,
                containing_type: d.containing_type.clone(),
                method_name: d.method_name.clone(),
            },
        );
        call
    }
}

fn direct_receiver(d: &HandlerDescriptor) -> String {
    if d.is_static {
        d.containing_type.clone()
    } else {
        format!("provider.resolve::<{}>()", d.containing_type)
    }
}

fn handler_call(d: &HandlerDescriptor, receiver: &str, payload: &str, cancel: &str) -> HandlerCall {
    let mut args = payload.to_string();
    if d.has_cancellation {
        args.push_str(", ");
        args.push_str(cancel);
    }
    let sep = if d.is_static { "::" } else { "." };
    let call = format!("{receiver}{sep}{}({args})", d.method_name);
    let invocation = match &d.returns {
        ReturnType::Future { .. } => format!("{call}.await"),
        ReturnType::Stream { .. } => format!("Box::pin({call})"),
        ReturnType::Unit | ReturnType::Value { .. } => call,
    };
    HandlerCall {
        name: d.normalized_name().to_string(),
        name_literal: str_literal(d.normalized_name()),
        qualified: d.qualified_name(),
        priority: d.priority,
        is_static: d.is_static,
        is_void: d.returns.is_void(),
        invocation,
    }
}

fn kind_variant(kind: HandlerKind) -> &'static str {
    match kind {
        HandlerKind::Request => "Request",
        HandlerKind::Notification => "Notification",
        HandlerKind::Pipeline => "Pipeline",
        HandlerKind::Stream => "Stream",
    }
}

fn pipeline_row(d: &HandlerDescriptor) -> PipelineRow {
    PipelineRow {
        scope: d.scope.variant(),
        order: d.order,
        behavior_literal: str_literal(&d.qualified_name()),
        is_static: d.is_static,
    }
}
