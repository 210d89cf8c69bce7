//! Discovery over larger synthetic models: parallel and sequential scans agree
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::synthetic_model;
use handlergen::diagnostics::{count_of, sort_for_display, CollectingSink, DiagnosticId};
use handlergen::discovery::{discover, CancelSignal, DiscoveryOptions, DiscoveryResult};
use handlergen::model::ProgramModel;
use handlergen::registry::build_and_validate;

fn scan(model: &ProgramModel, options: &DiscoveryOptions) -> (DiscoveryResult, Vec<handlergen::Diagnostic>) {
    let sink = CollectingSink::new();
    let result = discover(&model.candidates, model, &sink, options, &CancelSignal::new());
    let mut diagnostics = sink.drain();
    sort_for_display(&mut diagnostics);
    (result, diagnostics)
}

fn sorted_names(result: &DiscoveryResult) -> Vec<String> {
    let mut names: Vec<String> = result.iter().map(|d| d.qualified_name()).collect();
    names.sort();
    names
}

#[test]
fn test_parallel_and_sequential_scans_agree() {
    let model = synthetic_model(120);
    let sequential = DiscoveryOptions {
        max_degree_of_parallelism: 1,
        sequential_threshold: usize::MAX,
    };
    let parallel = DiscoveryOptions {
        max_degree_of_parallelism: 8,
        sequential_threshold: 10,
    };
    assert_eq!(sequential.worker_count(model.candidates.len()), 1);
    assert_eq!(parallel.worker_count(model.candidates.len()), 8);

    let (seq_result, seq_diagnostics) = scan(&model, &sequential);
    let (par_result, par_diagnostics) = scan(&model, &parallel);

    assert_eq!(sorted_names(&seq_result), sorted_names(&par_result));
    assert_eq!(seq_diagnostics, par_diagnostics);
}

#[test]
fn test_discovery_is_idempotent() {
    let model = synthetic_model(40);
    let options = DiscoveryOptions::default();
    let (first, first_diagnostics) = scan(&model, &options);
    let (second, second_diagnostics) = scan(&model, &options);
    assert_eq!(sorted_names(&first), sorted_names(&second));
    assert_eq!(first_diagnostics, second_diagnostics);
}

#[test]
fn test_synthetic_defects_are_counted_exactly() {
    let model = synthetic_model(30);
    let (result, diagnostics) = scan(&model, &DiscoveryOptions::default());

    // Every third fallback is async + unit and rejected; the rest lack a token
    assert_eq!(count_of(&diagnostics, DiagnosticId::AsyncVoidHandler), 10);
    assert_eq!(count_of(&diagnostics, DiagnosticId::MissingCancellationToken), 20);
    assert_eq!(result.request_handlers.len(), 50);

    let (registry, conflicts) = build_and_validate(result);
    assert!(conflicts.is_empty(), "{conflicts:?}");
    assert_eq!(registry.request_types(handlergen::model::HandlerKind::Request).len(), 30);
}

#[test]
fn test_cancelled_parallel_scan_keeps_a_valid_partial_result() {
    let model = synthetic_model(60);
    let cancel = CancelSignal::new();
    cancel.cancel();
    let sink = CollectingSink::new();
    let result = discover(
        &model.candidates,
        &model,
        &sink,
        &DiscoveryOptions::default(),
        &cancel,
    );
    assert!(result.cancelled);
    assert!(result.is_empty());
    assert!(sink.is_empty());
}
