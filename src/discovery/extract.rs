//! Metadata extraction: tag arguments → [`HandlerDescriptor`].
//!
//! Malformed argument values never abort extraction. A wrong-typed `Name`,
//! `Priority` or `Order` falls back to its default and is remembered as an
//! [`InvalidArgument`]; a wrong-typed `Scope` is treated as absent; an integer
//! `Scope` outside `0..=3` is remembered separately because it rejects the
//! candidate later on.

use crate::descriptor::{HandlerDescriptor, PipelineScope};
use crate::diagnostics::{Diagnostic, DiagnosticId};
use crate::model::{
    Capability, CandidateDeclaration, HandlerKind, LiteralValue, Tag, TypeCapabilities,
};

/// A named argument whose literal type did not match the field it sets
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArgument {
    pub argument: String,
    pub expected: &'static str,
    pub found: LiteralValue,
}

/// Result of extracting one tag
#[derive(Debug, Clone)]
pub struct Extraction {
    pub descriptor: HandlerDescriptor,
    /// First argument with a wrong-typed value, if any
    pub invalid_argument: Option<InvalidArgument>,
    /// Raw integer `Scope` outside `0..=3` (pipeline tags only)
    pub scope_out_of_range: Option<i64>,
}

impl Extraction {
    /// The single "invalid attribute value" diagnostic for this tag, if any
    #[must_use]
    pub fn attribute_diagnostic(&self, candidate: &CandidateDeclaration) -> Option<Diagnostic> {
        let invalid = self.invalid_argument.as_ref()?;
        Some(
            Diagnostic::new(
                DiagnosticId::InvalidAttributeValue,
                format!(
                    "Handler '{}' has an invalid value {} for '{}': expected {}, found {}; the default is used",
                    candidate.qualified_name(),
                    invalid.found,
                    invalid.argument,
                    invalid.expected,
                    invalid.found.type_name(),
                ),
                candidate.location.clone(),
            )
            .with_suggestion(format!("Use a {} literal for '{}'", invalid.expected, invalid.argument)),
        )
    }
}

/// Extract a descriptor from `candidate` as declared by `tag`
pub fn extract(
    candidate: &CandidateDeclaration,
    tag: &Tag,
    model: &dyn TypeCapabilities,
) -> Extraction {
    let mut name = None;
    let mut priority = 0;
    let mut order = 0;
    let mut scope = PipelineScope::All;
    let mut invalid_argument = None;
    let mut scope_out_of_range = None;

    let mut flag = |argument: &str, expected: &'static str, found: &LiteralValue| {
        if invalid_argument.is_none() {
            invalid_argument = Some(InvalidArgument {
                argument: argument.to_string(),
                expected,
                found: found.clone(),
            });
        }
    };

    for arg in &tag.arguments {
        match canonical_argument(&arg.name) {
            Some(ArgumentField::Name) => match &arg.value {
                LiteralValue::Str(s) if s.trim().is_empty() => name = None,
                LiteralValue::Str(s) => name = Some(s.trim().to_string()),
                other => {
                    name = None;
                    flag(&arg.name, "string", other);
                }
            },
            Some(ArgumentField::Priority) => {
                priority = int_or_default(&arg.value).unwrap_or_else(|| {
                    flag(&arg.name, "int", &arg.value);
                    0
                });
            }
            Some(ArgumentField::Order) => {
                order = int_or_default(&arg.value).unwrap_or_else(|| {
                    flag(&arg.name, "int", &arg.value);
                    0
                });
            }
            Some(ArgumentField::Scope) if tag.kind == HandlerKind::Pipeline => {
                if let LiteralValue::Int(raw) = arg.value {
                    match PipelineScope::from_raw(raw) {
                        Some(s) => scope = s,
                        None => {
                            scope = PipelineScope::All;
                            scope_out_of_range = Some(raw);
                        }
                    }
                } else {
                    scope = PipelineScope::All;
                }
            }
            Some(ArgumentField::Scope) | None => {}
        }
    }

    let has_cancellation = candidate
        .parameters
        .iter()
        .skip(1)
        .any(|p| model.satisfies(&p.ty, Capability::CancellationToken));

    let descriptor = HandlerDescriptor {
        kind: tag.kind,
        name,
        priority,
        order,
        scope,
        containing_type: candidate.containing_type.clone(),
        method_name: candidate.method_name.clone(),
        request_type: candidate
            .parameters
            .first()
            .map(|p| p.ty.trim().to_string())
            .unwrap_or_default(),
        location: candidate.location.clone(),
        is_static: candidate.is_static,
        is_async: candidate.is_async,
        has_cancellation,
        returns: candidate.returns.clone(),
    };

    Extraction {
        descriptor,
        invalid_argument,
        scope_out_of_range,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgumentField {
    Name,
    Priority,
    Order,
    Scope,
}

fn canonical_argument(name: &str) -> Option<ArgumentField> {
    const FIELDS: [(&str, ArgumentField); 4] = [
        ("Name", ArgumentField::Name),
        ("Priority", ArgumentField::Priority),
        ("Order", ArgumentField::Order),
        ("Scope", ArgumentField::Scope),
    ];
    FIELDS
        .iter()
        .find(|(field, _)| field.eq_ignore_ascii_case(name))
        .map(|(_, f)| *f)
}

/// Integer literal that fits in `i32`; anything else is a type mismatch
fn int_or_default(value: &LiteralValue) -> Option<i32> {
    match value {
        LiteralValue::Int(i) => i32::try_from(*i).ok(),
        _ => None,
    }
}
