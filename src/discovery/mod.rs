//! # Discovery Module
//!
//! Finds handler declarations among the host program's candidates and turns each
//! valid one into a [`HandlerDescriptor`](crate::descriptor::HandlerDescriptor).
//!
//! ## Per-candidate flow
//!
//! ```text
//! candidate ─┬─ tag ─→ extract ─→ validate (rules 1-3) ─→ scope range ─→ advisories ─→ kept
//!            └─ tag ─→ ...                │                     │
//!                                         └──── rejected ───────┘ (one diagnostic)
//! ```
//!
//! Each tag on a candidate is handled independently. Diagnostics go straight to the
//! shared [`DiagnosticSink`](crate::diagnostics::DiagnosticSink); descriptors are
//! accumulated per worker and merged when all workers have joined.
//!
//! ## Parallelism
//!
//! Fewer than [`DEFAULT_SEQUENTIAL_THRESHOLD`] candidates are scanned on the calling
//! thread. Larger batches are split into contiguous chunks over a scoped worker pool
//! of `clamp(max_degree_of_parallelism, 2, 8)` threads. Output order is therefore
//! not stable between runs; the generator sorts before emitting anything.

mod extract;
mod scanner;
mod signature;

#[cfg(test)]
mod tests;

pub use extract::{extract, Extraction, InvalidArgument};
pub use scanner::{
    discover, CancelSignal, DiscoveryOptions, DiscoveryResult, DEFAULT_SEQUENTIAL_THRESHOLD,
    MAX_DISCOVERY_WORKERS, MIN_DISCOVERY_WORKERS,
};
pub use signature::{
    advisories, validate, Rejection, ValidationOutcome, PRIORITY_WARNING_THRESHOLD,
    RESERVED_HANDLER_NAMES,
};
