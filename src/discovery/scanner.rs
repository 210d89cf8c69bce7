use super::extract::extract;
use super::signature::{advisories, validate, ValidationOutcome};
use crate::descriptor::HandlerDescriptor;
use crate::diagnostics::{Diagnostic, DiagnosticId, DiagnosticSink};
use crate::model::{CandidateDeclaration, HandlerKind, TypeCapabilities};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Below this many candidates discovery always runs on the calling thread
pub const DEFAULT_SEQUENTIAL_THRESHOLD: usize = 10;
/// Smallest worker pool used in parallel mode
pub const MIN_DISCOVERY_WORKERS: usize = 2;
/// Largest worker pool used in parallel mode
pub const MAX_DISCOVERY_WORKERS: usize = 8;

/// Tuning knobs for [`discover`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Requested degree of parallelism; clamped to the worker bounds in parallel mode
    pub max_degree_of_parallelism: usize,
    /// Candidate count at which discovery switches to the worker pool
    pub sequential_threshold: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_degree_of_parallelism: 4,
            sequential_threshold: DEFAULT_SEQUENTIAL_THRESHOLD,
        }
    }
}

impl DiscoveryOptions {
    /// Number of workers used for `candidates` candidates (1 means sequential)
    #[must_use]
    pub fn worker_count(&self, candidates: usize) -> usize {
        if candidates < self.sequential_threshold.max(1) {
            return 1;
        }
        self.max_degree_of_parallelism
            .clamp(MIN_DISCOVERY_WORKERS, MAX_DISCOVERY_WORKERS)
            .min(candidates)
    }
}

/// Cooperative cancellation flag checked between candidates
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Valid descriptors found in one compilation unit, by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub request_handlers: Vec<HandlerDescriptor>,
    pub notification_handlers: Vec<HandlerDescriptor>,
    pub pipeline_behaviors: Vec<HandlerDescriptor>,
    pub stream_handlers: Vec<HandlerDescriptor>,
    /// The scan stopped early because cancellation was requested
    pub cancelled: bool,
}

impl DiscoveryResult {
    fn push(&mut self, descriptor: HandlerDescriptor) {
        match descriptor.kind {
            HandlerKind::Request => self.request_handlers.push(descriptor),
            HandlerKind::Notification => self.notification_handlers.push(descriptor),
            HandlerKind::Pipeline => self.pipeline_behaviors.push(descriptor),
            HandlerKind::Stream => self.stream_handlers.push(descriptor),
        }
    }

    fn merge(&mut self, other: DiscoveryResult) {
        self.request_handlers.extend(other.request_handlers);
        self.notification_handlers.extend(other.notification_handlers);
        self.pipeline_behaviors.extend(other.pipeline_behaviors);
        self.stream_handlers.extend(other.stream_handlers);
        self.cancelled |= other.cancelled;
    }

    /// Total number of descriptors across all kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.request_handlers.len()
            + self.notification_handlers.len()
            + self.pipeline_behaviors.len()
            + self.stream_handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every descriptor, in kind order
    pub fn iter(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.request_handlers
            .iter()
            .chain(&self.notification_handlers)
            .chain(&self.pipeline_behaviors)
            .chain(&self.stream_handlers)
    }
}

/// Scan `candidates`, extracting and validating every handler tag.
///
/// Rejected tags are reported to `sink` and dropped. A failure inside one candidate is
/// reported as [`DiagnosticId::InternalFailure`] and never aborts the batch.
pub fn discover(
    candidates: &[CandidateDeclaration],
    model: &dyn TypeCapabilities,
    sink: &dyn DiagnosticSink,
    options: &DiscoveryOptions,
    cancel: &CancelSignal,
) -> DiscoveryResult {
    let started = Instant::now();
    let workers = options.worker_count(candidates.len());
    info!(
        candidates = candidates.len(),
        workers = workers,
        mode = if workers > 1 { "parallel" } else { "sequential" },
        "Discovering handlers"
    );

    let result = if workers <= 1 {
        scan_chunk(0, candidates, model, sink, cancel)
    } else {
        scan_parallel(candidates, workers, model, sink, cancel)
    };

    if result.cancelled {
        warn!(
            kept = result.len(),
            "Handler discovery cancelled; keeping descriptors found so far"
        );
    }
    info!(
        requests = result.request_handlers.len(),
        notifications = result.notification_handlers.len(),
        pipelines = result.pipeline_behaviors.len(),
        streams = result.stream_handlers.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Handler discovery finished"
    );
    result
}

fn scan_parallel(
    candidates: &[CandidateDeclaration],
    workers: usize,
    model: &dyn TypeCapabilities,
    sink: &dyn DiagnosticSink,
    cancel: &CancelSignal,
) -> DiscoveryResult {
    let per_worker = candidates.len().div_ceil(workers);
    let mut merged = DiscoveryResult::default();

    std::thread::scope(|s| {
        let tasks: Vec<_> = candidates
            .chunks(per_worker)
            .enumerate()
            .map(|(worker_id, chunk)| {
                s.spawn(move || scan_chunk(worker_id, chunk, model, sink, cancel))
            })
            .collect();

        for (worker_id, task) in tasks.into_iter().enumerate() {
            match task.join() {
                Ok(local) => merged.merge(local),
                Err(panic) => {
                    // scan_chunk isolates candidates; reaching this means the worker itself died
                    error!(
                        worker_id = worker_id,
                        panic_message = %panic_message(panic.as_ref()),
                        "Discovery worker panicked - CRITICAL"
                    );
                    sink.report(Diagnostic::new(
                        DiagnosticId::InternalFailure,
                        format!(
                            "Discovery worker {worker_id} failed: {}",
                            panic_message(panic.as_ref())
                        ),
                        Default::default(),
                    ));
                }
            }
        }
    });

    merged
}

fn scan_chunk(
    worker_id: usize,
    chunk: &[CandidateDeclaration],
    model: &dyn TypeCapabilities,
    sink: &dyn DiagnosticSink,
    cancel: &CancelSignal,
) -> DiscoveryResult {
    debug!(
        worker_id = worker_id,
        candidates = chunk.len(),
        "Discovery worker started"
    );
    let mut local = DiscoveryResult::default();

    for candidate in chunk {
        if cancel.is_cancelled() {
            local.cancelled = true;
            break;
        }
        match catch_unwind(AssertUnwindSafe(|| process_candidate(candidate, model, sink))) {
            Ok(found) => found.into_iter().for_each(|d| local.push(d)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    worker_id = worker_id,
                    candidate = %candidate.qualified_name(),
                    panic_message = %message,
                    "Candidate processing panicked - CRITICAL"
                );
                sink.report(Diagnostic::new(
                    DiagnosticId::InternalFailure,
                    format!(
                        "Internal failure while processing '{}': {message}",
                        candidate.qualified_name()
                    ),
                    candidate.location.clone(),
                ));
            }
        }
    }

    debug!(
        worker_id = worker_id,
        kept = local.len(),
        "Discovery worker exiting"
    );
    local
}

/// Extract and validate every tag of one candidate
pub(crate) fn process_candidate(
    candidate: &CandidateDeclaration,
    model: &dyn TypeCapabilities,
    sink: &dyn DiagnosticSink,
) -> Vec<HandlerDescriptor> {
    let mut kept = Vec::with_capacity(candidate.tags.len());

    for tag in &candidate.tags {
        let extraction = extract(candidate, tag, model);
        if let Some(diagnostic) = extraction.attribute_diagnostic(candidate) {
            sink.report(diagnostic);
        }

        if let ValidationOutcome::Reject(rejection) = validate(candidate, tag.kind, model) {
            debug!(
                candidate = %candidate.qualified_name(),
                kind = %tag.kind,
                id = %rejection.id,
                "Rejected handler candidate"
            );
            sink.report(rejection.into_diagnostic(candidate));
            continue;
        }

        if let Some(raw) = extraction.scope_out_of_range {
            sink.report(
                Diagnostic::new(
                    DiagnosticId::ScopeOutOfRange,
                    format!(
                        "Pipeline '{}' declares Scope = {raw}, outside the valid range 0..=3",
                        candidate.qualified_name()
                    ),
                    candidate.location.clone(),
                )
                .with_suggestion("Use 0 (All), 1 (Requests), 2 (Streams) or 3 (Notifications)"),
            );
            continue;
        }

        for advisory in advisories(&extraction.descriptor) {
            sink.report(advisory);
        }
        kept.push(extraction.descriptor);
    }

    kept
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
