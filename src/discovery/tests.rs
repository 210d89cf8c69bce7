#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::descriptor::PipelineScope;
use crate::diagnostics::{count_of, CollectingSink, Diagnostic, DiagnosticId};
use crate::model::{
    Capability, CandidateDeclaration, HandlerKind, LiteralValue, Parameter, ParameterModifier,
    ProgramModel, ReturnType, SourceRef, Tag, TypeCapabilities,
};

const TOKEN: &str = "CancellationToken";

fn model() -> ProgramModel {
    let mut m = ProgramModel::default();
    m.declare_type("app::GetUser", &[Capability::Request]);
    m.declare_type("app::UserCreated", &[Capability::Notification]);
    m.declare_type("app::PipelineContext", &[Capability::PipelineContext]);
    m.declare_type("app::Ticks", &[Capability::StreamRequest]);
    m.declare_type(TOKEN, &[Capability::CancellationToken]);
    m
}

fn payload_for(kind: HandlerKind) -> &'static str {
    match kind {
        HandlerKind::Request => "app::GetUser",
        HandlerKind::Notification => "app::UserCreated",
        HandlerKind::Pipeline => "app::PipelineContext",
        HandlerKind::Stream => "app::Ticks",
    }
}

fn return_for(kind: HandlerKind) -> ReturnType {
    match kind {
        HandlerKind::Request => ReturnType::Future {
            output: Some("String".into()),
        },
        HandlerKind::Notification | HandlerKind::Pipeline => ReturnType::Future { output: None },
        HandlerKind::Stream => ReturnType::Stream {
            item: "app::Tick".into(),
        },
    }
}

/// A candidate that passes every rule for `kind`
fn valid(kind: HandlerKind, ty: &str) -> CandidateDeclaration {
    CandidateDeclaration::new(ty, "handle", return_for(kind))
        .asynchronous()
        .param(Parameter::new("payload", payload_for(kind)))
        .param(Parameter::new("cancel", TOKEN))
        .tag(Tag::new(kind))
        .at(SourceRef::new("src/app.rs", 10, 5))
}

fn run(candidates: &[CandidateDeclaration]) -> (DiscoveryResult, Vec<Diagnostic>) {
    let sink = CollectingSink::new();
    let result = discover(
        candidates,
        &model(),
        &sink,
        &DiscoveryOptions::default(),
        &CancelSignal::new(),
    );
    (result, sink.drain())
}

const ALL_KINDS: [HandlerKind; 4] = [
    HandlerKind::Request,
    HandlerKind::Notification,
    HandlerKind::Pipeline,
    HandlerKind::Stream,
];

#[test]
fn test_valid_candidate_of_each_kind_is_kept_silently() {
    for kind in ALL_KINDS {
        let (result, diagnostics) = run(&[valid(kind, "app::H")]);
        assert_eq!(result.len(), 1, "{kind} should be kept");
        assert!(diagnostics.is_empty(), "{kind}: {diagnostics:?}");
    }
    let (result, _) = run(&[valid(HandlerKind::Stream, "app::S")]);
    assert_eq!(result.stream_handlers.len(), 1);
    assert_eq!(result.stream_handlers[0].request_type, "app::Ticks");
}

#[test]
fn test_extract_reads_named_arguments() {
    let candidate = valid(HandlerKind::Request, "app::Primary");
    let tag = Tag::new(HandlerKind::Request)
        .arg("Name", LiteralValue::Str("primary".into()))
        .arg("Priority", LiteralValue::Int(10));
    let extraction = extract(&candidate, &tag, &model());
    let d = extraction.descriptor;
    assert_eq!(d.name.as_deref(), Some("primary"));
    assert_eq!(d.priority, 10);
    assert_eq!(d.order, 0);
    assert_eq!(d.scope, PipelineScope::All);
    assert!(d.has_cancellation);
    assert_eq!(d.request_type, "app::GetUser");
    assert!(extraction.invalid_argument.is_none());
}

#[test]
fn test_blank_names_normalize_to_none() {
    let candidate = valid(HandlerKind::Request, "app::H");
    for blank in ["", "   ", "\t"] {
        let tag = Tag::new(HandlerKind::Request).arg("Name", LiteralValue::Str(blank.into()));
        let extraction = extract(&candidate, &tag, &model());
        assert_eq!(extraction.descriptor.name, None);
        assert_eq!(extraction.descriptor.normalized_name(), "default");
        assert!(extraction.invalid_argument.is_none());
    }
}

#[test]
fn test_explicit_names_are_trimmed() {
    let candidate = valid(HandlerKind::Request, "app::H");
    let tag = Tag::new(HandlerKind::Request).arg("Name", LiteralValue::Str("  primary \t".into()));
    let extraction = extract(&candidate, &tag, &model());
    assert_eq!(extraction.descriptor.name.as_deref(), Some("primary"));
    assert_eq!(extraction.descriptor.normalized_name(), "primary");
}

#[test]
fn test_non_numeric_priority_and_order_fall_back_with_one_diagnostic() {
    for (field, kind) in [("Priority", HandlerKind::Request), ("Order", HandlerKind::Pipeline)] {
        let mut candidate = valid(kind, "app::H");
        candidate.tags = vec![Tag::new(kind).arg(field, LiteralValue::Str("invalid".into()))];
        let (result, diagnostics) = run(&[candidate]);

        assert_eq!(result.len(), 1, "{field}: descriptor must be kept");
        let d = result.iter().next().unwrap();
        assert_eq!(d.priority, 0);
        assert_eq!(d.order, 0);
        assert_eq!(
            count_of(&diagnostics, DiagnosticId::InvalidAttributeValue),
            1,
            "{field}: {diagnostics:?}"
        );
        assert_eq!(diagnostics.len(), 1);
    }
}

#[test]
fn test_priority_outside_i32_is_invalid_value() {
    let mut candidate = valid(HandlerKind::Request, "app::H");
    candidate.tags = vec![Tag::new(HandlerKind::Request).arg("Priority", LiteralValue::Int(1 << 40))];
    let (result, diagnostics) = run(&[candidate]);
    assert_eq!(result.request_handlers[0].priority, 0);
    assert_eq!(count_of(&diagnostics, DiagnosticId::InvalidAttributeValue), 1);
}

#[test]
fn test_only_first_invalid_argument_is_reported() {
    let mut candidate = valid(HandlerKind::Request, "app::H");
    candidate.tags = vec![Tag::new(HandlerKind::Request)
        .arg("Name", LiteralValue::Int(3))
        .arg("Priority", LiteralValue::Bool(true))];
    let (result, diagnostics) = run(&[candidate]);
    assert_eq!(result.request_handlers[0].name, None);
    assert_eq!(result.request_handlers[0].priority, 0);
    assert_eq!(count_of(&diagnostics, DiagnosticId::InvalidAttributeValue), 1);
    assert!(diagnostics[0].message.contains("'Name'"));
}

#[test]
fn test_scope_out_of_range_rejects_pipeline() {
    let mut candidate = valid(HandlerKind::Pipeline, "app::Logging");
    candidate.tags = vec![Tag::new(HandlerKind::Pipeline).arg("Scope", LiteralValue::Int(5))];
    let (result, diagnostics) = run(&[candidate]);
    assert!(result.pipeline_behaviors.is_empty());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].id, DiagnosticId::ScopeOutOfRange);
    assert_ne!(diagnostics[0].id, DiagnosticId::InvalidAttributeValue);
}

#[test]
fn test_wrong_type_scope_falls_back_silently() {
    let mut candidate = valid(HandlerKind::Pipeline, "app::Logging");
    candidate.tags = vec![Tag::new(HandlerKind::Pipeline)
        .arg("Scope", LiteralValue::Str("invalid".into()))
        .arg("Order", LiteralValue::Int(2))];
    let (result, diagnostics) = run(&[candidate]);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(result.pipeline_behaviors[0].scope, PipelineScope::All);
    assert_eq!(result.pipeline_behaviors[0].order, 2);
}

#[test]
fn test_valid_scope_values_and_non_pipeline_scope_ignored() {
    let mut pipeline = valid(HandlerKind::Pipeline, "app::Logging");
    pipeline.tags = vec![Tag::new(HandlerKind::Pipeline).arg("Scope", LiteralValue::Int(3))];
    let mut request = valid(HandlerKind::Request, "app::H");
    request.tags = vec![Tag::new(HandlerKind::Request).arg("Scope", LiteralValue::Int(9))];

    let (result, diagnostics) = run(&[pipeline, request]);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(result.pipeline_behaviors[0].scope, PipelineScope::Notifications);
    assert_eq!(result.request_handlers[0].scope, PipelineScope::All);
}

#[test]
fn test_misplaced_or_repeated_tokens_reject_for_every_kind() {
    for kind in ALL_KINDS {
        let payload = payload_for(kind);
        let shapes: Vec<Vec<Parameter>> = vec![
            vec![Parameter::new("cancel", TOKEN), Parameter::new("payload", payload)],
            vec![
                Parameter::new("payload", payload),
                Parameter::new("cancel", TOKEN),
                Parameter::new("extra", "i32"),
            ],
            vec![
                Parameter::new("payload", payload),
                Parameter::new("a", TOKEN),
                Parameter::new("b", TOKEN),
            ],
        ];
        for params in shapes {
            let mut candidate = valid(kind, "app::H");
            candidate.parameters = params.into_iter().collect();
            let outcome = validate(&candidate, kind, &model());
            assert_eq!(
                outcome.rejection_id(),
                Some(DiagnosticId::InvalidSignature),
                "{kind}: {:?}",
                candidate.parameters
            );
        }
    }
}

#[test]
fn test_shape_rules_each_reject() {
    let kind = HandlerKind::Request;
    let base = valid(kind, "app::H");

    let mut no_params = base.clone();
    no_params.parameters.clear();

    let mut extra = base.clone();
    extra.parameters.insert(1, Parameter::new("extra", "i32"));

    let mut by_ref = base.clone();
    by_ref.parameters[0] = Parameter::new("payload", "app::GetUser").with_modifier(ParameterModifier::Ref);

    let mut out = base.clone();
    out.parameters[1] = Parameter::new("cancel", TOKEN).with_modifier(ParameterModifier::Out);

    let mut params = base.clone();
    params.parameters[0] = Parameter::new("payload", "app::GetUser").with_modifier(ParameterModifier::Params);

    let mut generic = base.clone();
    generic.type_parameters = vec!["T".into()];

    for candidate in [no_params, extra, by_ref, out, params, generic] {
        assert_eq!(
            validate(&candidate, kind, &model()).rejection_id(),
            Some(DiagnosticId::InvalidSignature),
            "{candidate:?}"
        );
    }
}

#[test]
fn test_payload_capability_is_checked_per_kind() {
    let mut candidate = valid(HandlerKind::Notification, "app::H");
    candidate.parameters[0] = Parameter::new("payload", "app::GetUser");
    assert_eq!(
        validate(&candidate, HandlerKind::Notification, &model()).rejection_id(),
        Some(DiagnosticId::InvalidParameterType)
    );

    let unknown = valid(HandlerKind::Request, "app::H");
    let mut unknown = unknown;
    unknown.parameters[0] = Parameter::new("payload", "app::Mystery");
    assert_eq!(
        validate(&unknown, HandlerKind::Request, &model()).rejection_id(),
        Some(DiagnosticId::InvalidParameterType)
    );
}

#[test]
fn test_async_unit_always_rejects() {
    for kind in ALL_KINDS {
        let mut candidate = valid(kind, "app::H");
        candidate.returns = ReturnType::Unit;
        candidate.is_async = true;
        assert_eq!(
            validate(&candidate, kind, &model()).rejection_id(),
            Some(DiagnosticId::AsyncVoidHandler),
            "{kind}"
        );
    }
}

#[test]
fn test_sync_unit_allowed_except_for_streams() {
    for kind in [HandlerKind::Request, HandlerKind::Notification, HandlerKind::Pipeline] {
        let mut candidate = valid(kind, "app::H");
        candidate.returns = ReturnType::Unit;
        candidate.is_async = false;
        assert!(validate(&candidate, kind, &model()).is_ok(), "{kind}");
    }
    let mut stream = valid(HandlerKind::Stream, "app::H");
    stream.returns = ReturnType::Unit;
    stream.is_async = false;
    assert_eq!(
        validate(&stream, HandlerKind::Stream, &model()).rejection_id(),
        Some(DiagnosticId::InvalidReturnType)
    );
}

#[test]
fn test_return_type_rules() {
    let cases = [
        (HandlerKind::Request, ReturnType::Value { ty: "String".into() }, false),
        (HandlerKind::Request, ReturnType::Stream { item: "u8".into() }, false),
        (HandlerKind::Request, ReturnType::Future { output: None }, true),
        (HandlerKind::Notification, ReturnType::Future { output: Some("u8".into()) }, false),
        (HandlerKind::Pipeline, ReturnType::Future { output: Some("u8".into()) }, true),
        (HandlerKind::Stream, ReturnType::Future { output: Some("u8".into()) }, false),
    ];
    for (kind, returns, ok) in cases {
        let mut candidate = valid(kind, "app::H");
        candidate.returns = returns.clone();
        let outcome = validate(&candidate, kind, &model());
        if ok {
            assert!(outcome.is_ok(), "{kind} {returns:?}");
        } else {
            assert_eq!(
                outcome.rejection_id(),
                Some(DiagnosticId::InvalidReturnType),
                "{kind} {returns:?}"
            );
        }
    }
}

#[test]
fn test_first_failing_rule_wins() {
    let mut candidate = valid(HandlerKind::Request, "app::H");
    candidate.parameters[0] = Parameter::new("payload", "app::Mystery");
    candidate.parameters.push(Parameter::new("extra", "i32"));
    candidate.returns = ReturnType::Unit;

    let (result, diagnostics) = run(&[candidate]);
    assert!(result.is_empty());
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].id, DiagnosticId::InvalidSignature);
}

#[test]
fn test_advisory_warnings_keep_descriptor() {
    let mut no_token = valid(HandlerKind::Request, "app::NoToken");
    no_token.parameters.pop();

    let mut loud = valid(HandlerKind::Request, "app::Loud");
    loud.tags = vec![Tag::new(HandlerKind::Request)
        .arg("Priority", LiteralValue::Int(5000))
        .arg("Name", LiteralValue::Str("Main".into()))];

    let mut edge = valid(HandlerKind::Pipeline, "app::Edge");
    edge.tags = vec![Tag::new(HandlerKind::Pipeline).arg("Order", LiteralValue::Int(-1000))];

    let (result, diagnostics) = run(&[no_token, loud, edge]);
    assert_eq!(result.len(), 3);
    assert_eq!(count_of(&diagnostics, DiagnosticId::MissingCancellationToken), 1);
    assert_eq!(count_of(&diagnostics, DiagnosticId::ExtremePriority), 1);
    assert_eq!(count_of(&diagnostics, DiagnosticId::ReservedHandlerName), 1);
    assert!(diagnostics.iter().all(|d| !d.id.is_rejection()));
}

#[test]
fn test_explicit_default_name_warns_but_unnamed_does_not() {
    let mut explicit = valid(HandlerKind::Request, "app::A");
    explicit.tags = vec![Tag::new(HandlerKind::Request).arg("Name", LiteralValue::Str("default".into()))];
    let unnamed = valid(HandlerKind::Request, "app::B");

    let (result, diagnostics) = run(&[explicit, unnamed]);
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|d| d.normalized_name() == "default"));
    assert_eq!(count_of(&diagnostics, DiagnosticId::ReservedHandlerName), 1);
}

#[test]
fn test_each_tag_is_processed_independently() {
    let candidate = valid(HandlerKind::Request, "app::H")
        .tag(Tag::new(HandlerKind::Request).arg("Name", LiteralValue::Str("second".into())))
        .tag(Tag::new(HandlerKind::Notification));
    let (result, diagnostics) = run(&[candidate]);
    assert_eq!(result.request_handlers.len(), 2);
    assert!(result.notification_handlers.is_empty());
    assert_eq!(count_of(&diagnostics, DiagnosticId::InvalidParameterType), 1);
}

#[test]
fn test_untagged_candidates_are_skipped() {
    let mut candidate = valid(HandlerKind::Request, "app::H");
    candidate.tags.clear();
    let (result, diagnostics) = run(&[candidate]);
    assert!(result.is_empty());
    assert!(diagnostics.is_empty());
}

#[test]
fn test_worker_count_bounds() {
    let options = DiscoveryOptions::default();
    assert_eq!(options.worker_count(9), 1);
    assert_eq!(options.worker_count(10), 4);

    let one = DiscoveryOptions {
        max_degree_of_parallelism: 1,
        ..Default::default()
    };
    assert_eq!(one.worker_count(100), MIN_DISCOVERY_WORKERS);

    let many = DiscoveryOptions {
        max_degree_of_parallelism: 64,
        ..Default::default()
    };
    assert_eq!(many.worker_count(100), MAX_DISCOVERY_WORKERS);
    assert_eq!(many.worker_count(10), MAX_DISCOVERY_WORKERS);
}

fn sorted_names(result: &DiscoveryResult) -> Vec<String> {
    let mut names: Vec<_> = result.iter().map(|d| d.qualified_name()).collect();
    names.sort();
    names
}

#[test]
fn test_parallel_matches_sequential_and_is_idempotent() {
    let candidates: Vec<_> = (0..57)
        .map(|i| {
            let kind = ALL_KINDS[i % ALL_KINDS.len()];
            let mut c = valid(kind, &format!("app::H{i}"));
            if i % 7 == 0 {
                c.is_async = true;
                c.returns = ReturnType::Unit;
            }
            c
        })
        .collect();

    let sink = CollectingSink::new();
    let sequential = discover(
        &candidates,
        &model(),
        &sink,
        &DiscoveryOptions {
            sequential_threshold: usize::MAX,
            ..Default::default()
        },
        &CancelSignal::new(),
    );
    let sequential_diagnostics = sink.drain().len();

    let (parallel, diagnostics) = run(&candidates);
    let (again, _) = run(&candidates);

    assert_eq!(sorted_names(&sequential), sorted_names(&parallel));
    assert_eq!(sorted_names(&parallel), sorted_names(&again));
    assert_eq!(sequential_diagnostics, diagnostics.len());
    assert_eq!(count_of(&diagnostics, DiagnosticId::AsyncVoidHandler), 9);
    assert_eq!(parallel.len(), 57 - 9);
}

#[test]
fn test_cancelled_before_start_keeps_nothing() {
    let candidates: Vec<_> = (0..20)
        .map(|i| valid(HandlerKind::Request, &format!("app::H{i}")))
        .collect();
    let cancel = CancelSignal::new();
    cancel.cancel();
    let sink = CollectingSink::new();
    let result = discover(&candidates, &model(), &sink, &DiscoveryOptions::default(), &cancel);
    assert!(result.cancelled);
    assert!(result.is_empty());
}

/// Cancels itself the first time a specific type is queried
struct CancellingModel {
    inner: ProgramModel,
    trigger: &'static str,
    cancel: CancelSignal,
}

impl TypeCapabilities for CancellingModel {
    fn satisfies(&self, ty: &str, capability: Capability) -> bool {
        if ty == self.trigger {
            self.cancel.cancel();
        }
        self.inner.satisfies(ty, capability)
    }
}

#[test]
fn test_cancellation_mid_scan_keeps_partial_results() {
    let mut candidates: Vec<_> = (0..5)
        .map(|i| valid(HandlerKind::Request, &format!("app::H{i}")))
        .collect();
    candidates[2].parameters[0] = Parameter::new("payload", "app::Trigger");

    let mut inner = model();
    inner.declare_type("app::Trigger", &[Capability::Request]);
    let cancel = CancelSignal::new();
    let model = CancellingModel {
        inner,
        trigger: "app::Trigger",
        cancel: cancel.clone(),
    };

    let sink = CollectingSink::new();
    let result = discover(&candidates, &model, &sink, &DiscoveryOptions::default(), &cancel);
    assert!(result.cancelled);
    // Candidate 2 finished before the flag was checked again
    assert_eq!(result.request_handlers.len(), 3);
}

/// Panics when asked about one poisoned type
struct PanickingModel {
    inner: ProgramModel,
}

impl TypeCapabilities for PanickingModel {
    fn satisfies(&self, ty: &str, capability: Capability) -> bool {
        if ty == "app::Poison" {
            panic!("host model crashed on {ty}");
        }
        self.inner.satisfies(ty, capability)
    }
}

#[test]
fn test_candidate_failure_is_isolated() {
    let mut candidates: Vec<_> = (0..12)
        .map(|i| valid(HandlerKind::Request, &format!("app::H{i}")))
        .collect();
    candidates[4].parameters[0] = Parameter::new("payload", "app::Poison");

    let sink = CollectingSink::new();
    let result = discover(
        &candidates,
        &PanickingModel { inner: model() },
        &sink,
        &DiscoveryOptions::default(),
        &CancelSignal::new(),
    );
    let diagnostics = sink.drain();
    assert_eq!(result.request_handlers.len(), 11);
    assert_eq!(count_of(&diagnostics, DiagnosticId::InternalFailure), 1);
    let failure = diagnostics
        .iter()
        .find(|d| d.id == DiagnosticId::InternalFailure)
        .unwrap();
    assert!(failure.id.is_critical());
    assert!(failure.message.contains("host model crashed"));
}
