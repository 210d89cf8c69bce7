//! Validated handler metadata shared by the registry and the dispatch generator.

use crate::model::{HandlerKind, ReturnType, SourceRef};
use serde::Serialize;
use std::fmt;

/// Name under which unnamed handlers are registered and dispatched
pub const DEFAULT_HANDLER_NAME: &str = "default";

/// Applicability band of a pipeline behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum PipelineScope {
    #[default]
    All = 0,
    Requests = 1,
    Streams = 2,
    Notifications = 3,
}

impl PipelineScope {
    /// Map a raw scope value; `None` when outside `0..=3`
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(PipelineScope::All),
            1 => Some(PipelineScope::Requests),
            2 => Some(PipelineScope::Streams),
            3 => Some(PipelineScope::Notifications),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Variant name as emitted into generated code
    pub fn variant(self) -> &'static str {
        match self {
            PipelineScope::All => "All",
            PipelineScope::Requests => "Requests",
            PipelineScope::Streams => "Streams",
            PipelineScope::Notifications => "Notifications",
        }
    }
}

impl fmt::Display for PipelineScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant())
    }
}

/// Metadata of one valid handler declaration. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerDescriptor {
    pub kind: HandlerKind,
    /// `None` is the default handler
    pub name: Option<String>,
    pub priority: i32,
    pub order: i32,
    pub scope: PipelineScope,
    pub containing_type: String,
    pub method_name: String,
    /// Payload type of the first parameter
    pub request_type: String,
    pub location: SourceRef,
    pub is_static: bool,
    pub is_async: bool,
    pub has_cancellation: bool,
    pub returns: ReturnType,
}

impl HandlerDescriptor {
    /// Registry name: explicit name or the default sentinel
    #[must_use]
    pub fn normalized_name(&self) -> &str {
        normalize_name(self.name.as_deref())
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.normalized_name() == DEFAULT_HANDLER_NAME
    }

    /// `Type::method` display form
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.containing_type, self.method_name)
    }

    /// Lightweight projection used for duplicate pipeline order detection
    #[must_use]
    pub fn pipeline_info(&self) -> PipelineInfo {
        PipelineInfo {
            method_name: self.method_name.clone(),
            order: self.order,
            scope: self.scope,
            containing_type: self.containing_type.clone(),
            location: self.location.clone(),
        }
    }
}

/// Trim a name; absent, empty and whitespace-only names become the default sentinel
#[must_use]
pub fn normalize_name(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => DEFAULT_HANDLER_NAME,
    }
}

/// Projection of a pipeline behavior, grouped by `(scope, containing_type)` then `order`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInfo {
    pub method_name: String,
    pub order: i32,
    pub scope: PipelineScope,
    pub containing_type: String,
    pub location: SourceRef,
}
