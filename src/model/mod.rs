//! # Program Model Module
//!
//! Describes the host program as the generator sees it: candidate declarations with
//! their parameters, return shapes and attached handler tags, plus the capability
//! queries ("does type `X` implement the request capability?") the validator needs.
//!
//! The host compiler normally supplies these values. [`ProgramModel`] is a serialized
//! stand-in (YAML or JSON) so the pipeline can run from the command line:
//!
//! ```yaml
//! name: orders
//! types:
//!   - name: app::GetOrder
//!     capabilities: [request]
//!   - name: CancellationToken
//!     capabilities: [cancellation_token]
//! candidates:
//!   - containing_type: app::OrderHandler
//!     method_name: handle
//!     is_async: true
//!     parameters:
//!       - { name: request, type: app::GetOrder }
//!       - { name: cancel, type: CancellationToken }
//!     returns: { shape: future, output: app::Order }
//!     tags:
//!       - kind: request
//!         arguments:
//!           - { name: Priority, value: 10 }
//! ```

mod load;
mod types;


pub use load::*;
pub use types::*;
