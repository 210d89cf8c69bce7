//! # Registry Module
//!
//! Aggregates a [`DiscoveryResult`] into a [`HandlerRegistry`] and runs the
//! cross-cutting conflict checks:
//!
//! - **Duplicate handlers** - more than one descriptor for the same
//!   `(request type, normalized name)`; every member is flagged
//! - **Configuration conflict** - a request type mixes unnamed and named handlers;
//!   every handler of that type is flagged
//! - **Duplicate pipeline order** - repeated method names within one
//!   `(scope, containing type, order)` group; every member is flagged
//! - **Mismatched response type** - handlers of one request type disagree on what
//!   the dispatch procedure returns
//!
//! Conflicts are reported, never resolved: the registry keeps every descriptor and
//! the generator handles ambiguous sets deterministically.

mod conflicts;
mod core;


pub use self::conflicts::{duplicate_pipeline_orders, validate_registry};
pub use self::core::{compare_rank, ranked, HandlerRegistry, RegistryKey};

use crate::diagnostics::Diagnostic;
use crate::discovery::DiscoveryResult;
use tracing::info;

/// Build the registry for one compilation unit and validate it
pub fn build_and_validate(result: DiscoveryResult) -> (HandlerRegistry, Vec<Diagnostic>) {
    let registry = HandlerRegistry::from_discovery(result);
    let diagnostics = validate_registry(&registry);
    info!(
        descriptors = registry.len(),
        conflicts = diagnostics.len(),
        "Handler registry built"
    );
    (registry, diagnostics)
}
