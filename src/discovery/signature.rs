//! Signature validation rules.
//!
//! Rules 1-3 reject a candidate and are evaluated in order; the first failing rule
//! wins, so at most one rejection is produced per candidate:
//!
//! 1. parameter shape (`[payload]` or `[payload, cancellation token]`, no modifiers,
//!    no generic type parameters)
//! 2. payload capability for the handler kind
//! 3. return type shape for the handler kind (async + unit always rejects)
//!
//! Rules 4-6 are advisory and only run for candidates that were kept:
//!
//! 4. missing cancellation token
//! 5. priority/order magnitude above [`PRIORITY_WARNING_THRESHOLD`]
//! 6. reserved handler names ([`RESERVED_HANDLER_NAMES`])

use crate::descriptor::HandlerDescriptor;
use crate::diagnostics::{Diagnostic, DiagnosticId};
use crate::model::{
    Capability, CandidateDeclaration, HandlerKind, Parameter, ParameterModifier, ReturnType,
    TypeCapabilities,
};

/// Priorities/orders whose magnitude exceeds this are flagged
pub const PRIORITY_WARNING_THRESHOLD: i32 = 1000;

/// Explicit names that collide with conventional ones
pub const RESERVED_HANDLER_NAMES: [&str; 2] = ["default", "main"];

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub id: DiagnosticId,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Rejection {
    fn new(id: DiagnosticId, message: impl Into<String>) -> Self {
        Rejection {
            id,
            message: message.into(),
            suggestion: None,
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Diagnostic reported for this rejection
    #[must_use]
    pub fn into_diagnostic(self, candidate: &CandidateDeclaration) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.id, self.message, candidate.location.clone());
        match self.suggestion {
            Some(s) => diagnostic.with_suggestion(s),
            None => diagnostic,
        }
    }
}

/// Outcome of the rejecting rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    Reject(Rejection),
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }

    /// Rejection identifier, if rejected
    #[must_use]
    pub fn rejection_id(&self) -> Option<DiagnosticId> {
        match self {
            ValidationOutcome::Ok => None,
            ValidationOutcome::Reject(r) => Some(r.id),
        }
    }
}

/// Apply rules 1-3 to `candidate` declared as `kind`
pub fn validate(
    candidate: &CandidateDeclaration,
    kind: HandlerKind,
    model: &dyn TypeCapabilities,
) -> ValidationOutcome {
    let name = candidate.qualified_name();
    let checks = [
        check_shape(candidate, &name, model),
        check_payload(candidate, kind, &name, model),
        check_return(candidate, kind, &name),
    ];
    match checks.into_iter().flatten().next() {
        Some(rejection) => ValidationOutcome::Reject(rejection),
        None => ValidationOutcome::Ok,
    }
}

fn is_token(parameter: &Parameter, model: &dyn TypeCapabilities) -> bool {
    model.satisfies(&parameter.ty, Capability::CancellationToken)
}

fn check_shape(
    candidate: &CandidateDeclaration,
    name: &str,
    model: &dyn TypeCapabilities,
) -> Option<Rejection> {
    const SHAPE_HINT: &str = "Declare exactly (payload) or (payload, cancellation token)";
    let invalid = |reason: String| {
        Some(
            Rejection::new(
                DiagnosticId::InvalidSignature,
                format!("Handler '{name}' has an invalid signature: {reason}"),
            )
            .suggest(SHAPE_HINT),
        )
    };

    if !candidate.type_parameters.is_empty() {
        return invalid(format!(
            "generic type parameters <{}> are not supported",
            candidate.type_parameters.join(", ")
        ));
    }
    if let Some(p) = candidate
        .parameters
        .iter()
        .find(|p| p.modifier != ParameterModifier::None)
    {
        let modifier = match p.modifier {
            ParameterModifier::Ref => "ref",
            ParameterModifier::Out => "out",
            ParameterModifier::Params => "params",
            ParameterModifier::None => "none",
        };
        return invalid(format!("parameter '{}' uses the '{modifier}' modifier", p.name));
    }

    let params = &candidate.parameters;
    let Some(first) = params.first() else {
        return invalid("no payload parameter".to_string());
    };
    if is_token(first, model) {
        return invalid(format!(
            "first parameter '{}' must be the payload, not a cancellation token",
            first.name
        ));
    }

    let rest = &params[1..];
    let tokens = rest.iter().filter(|p| is_token(p, model)).count();
    if tokens > 1 {
        return invalid(format!("{tokens} cancellation token parameters declared"));
    }
    if let Some(position) = rest.iter().position(|p| is_token(p, model)) {
        if position + 1 != rest.len() {
            return invalid(format!(
                "cancellation token '{}' must be the last parameter",
                rest[position].name
            ));
        }
    }
    if let Some(extra) = rest.iter().find(|p| !is_token(p, model)) {
        return invalid(format!("unexpected parameter '{}'", extra.name));
    }
    None
}

fn check_payload(
    candidate: &CandidateDeclaration,
    kind: HandlerKind,
    name: &str,
    model: &dyn TypeCapabilities,
) -> Option<Rejection> {
    let payload = candidate.parameters.first()?;
    let capability = kind.payload_capability();
    if model.satisfies(&payload.ty, capability) {
        return None;
    }
    let required = match capability {
        Capability::Request => "a request",
        Capability::Notification => "a notification",
        Capability::PipelineContext => "a pipeline context",
        Capability::StreamRequest => "a stream request",
        Capability::CancellationToken => "a cancellation token",
    };
    Some(
        Rejection::new(
            DiagnosticId::InvalidParameterType,
            format!(
                "{kind} handler '{name}' takes '{}', which is not {required} type",
                payload.ty
            ),
        )
        .suggest(format!("Make '{}' implement {required} capability", payload.ty)),
    )
}

fn check_return(
    candidate: &CandidateDeclaration,
    kind: HandlerKind,
    name: &str,
) -> Option<Rejection> {
    if candidate.is_async && candidate.returns == ReturnType::Unit {
        return Some(
            Rejection::new(
                DiagnosticId::AsyncVoidHandler,
                format!("Async handler '{name}' must not return '()' directly"),
            )
            .suggest("Return a future, or drop `async`"),
        );
    }

    let allowed = match (kind, &candidate.returns) {
        (HandlerKind::Stream, ReturnType::Stream { .. }) => true,
        (HandlerKind::Stream, _) => false,
        (_, ReturnType::Unit) => true,
        (HandlerKind::Notification, ReturnType::Future { output }) => output.is_none(),
        (HandlerKind::Request | HandlerKind::Pipeline, ReturnType::Future { .. }) => true,
        (_, ReturnType::Stream { .. } | ReturnType::Value { .. }) => false,
    };
    if allowed {
        return None;
    }

    let expected = match kind {
        HandlerKind::Request | HandlerKind::Pipeline => "'()' or a future",
        HandlerKind::Notification => "'()' or a future of '()'",
        HandlerKind::Stream => "an async stream",
    };
    Some(
        Rejection::new(
            DiagnosticId::InvalidReturnType,
            format!(
                "{kind} handler '{name}' returns {}, expected {expected}",
                describe_return(&candidate.returns)
            ),
        )
        .suggest(format!("Change the return type to {expected}")),
    )
}

fn describe_return(returns: &ReturnType) -> String {
    match returns {
        ReturnType::Unit => "'()'".to_string(),
        ReturnType::Future { output: None } => "a future of '()'".to_string(),
        ReturnType::Future { output: Some(t) } => format!("a future of '{t}'"),
        ReturnType::Stream { item } => format!("a stream of '{item}'"),
        ReturnType::Value { ty } => format!("a bare '{ty}'"),
    }
}

/// Rules 4-6 for a kept descriptor
#[must_use]
pub fn advisories(descriptor: &HandlerDescriptor) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let name = descriptor.qualified_name();

    if !descriptor.has_cancellation {
        out.push(
            Diagnostic::new(
                DiagnosticId::MissingCancellationToken,
                format!("Handler '{name}' does not accept a cancellation token"),
                descriptor.location.clone(),
            )
            .with_suggestion("Add a trailing cancellation token parameter"),
        );
    }

    for (field, value) in [("Priority", descriptor.priority), ("Order", descriptor.order)] {
        if value.unsigned_abs() > PRIORITY_WARNING_THRESHOLD.unsigned_abs() {
            out.push(
                Diagnostic::new(
                    DiagnosticId::ExtremePriority,
                    format!(
                        "Handler '{name}' uses {field} = {value}; values beyond ±{PRIORITY_WARNING_THRESHOLD} are unusual"
                    ),
                    descriptor.location.clone(),
                )
                .with_suggestion(format!(
                    "Keep {field} within -{PRIORITY_WARNING_THRESHOLD}..={PRIORITY_WARNING_THRESHOLD}"
                )),
            );
        }
    }

    if let Some(explicit) = descriptor.name.as_deref() {
        if RESERVED_HANDLER_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(explicit.trim()))
        {
            out.push(
                Diagnostic::new(
                    DiagnosticId::ReservedHandlerName,
                    format!("Handler '{name}' uses the reserved name '{explicit}'"),
                    descriptor.location.clone(),
                )
                .with_suggestion("Pick a descriptive name or omit Name for the default handler"),
            );
        }
    }

    out
}
