use crate::descriptor::{HandlerDescriptor, PipelineScope, DEFAULT_HANDLER_NAME};
use crate::discovery::DiscoveryResult;
use crate::model::HandlerKind;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// `(request type, normalized handler name)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RegistryKey {
    pub request_type: String,
    pub name: String,
}

impl RegistryKey {
    pub fn new(request_type: impl Into<String>, name: impl Into<String>) -> Self {
        RegistryKey {
            request_type: request_type.into(),
            name: name.into(),
        }
    }

    fn of(descriptor: &HandlerDescriptor) -> Self {
        RegistryKey::new(
            descriptor.request_type.clone(),
            descriptor.normalized_name(),
        )
    }
}

/// Dispatch ranking: priority descending, then name ascending with the default
/// sentinel first, then declaring type and method for a stable total order
#[must_use]
pub fn compare_rank(a: &HandlerDescriptor, b: &HandlerDescriptor) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| {
            let (an, bn) = (a.normalized_name(), b.normalized_name());
            match (an == DEFAULT_HANDLER_NAME, bn == DEFAULT_HANDLER_NAME) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => an.cmp(bn),
            }
        })
        .then_with(|| a.containing_type.cmp(&b.containing_type))
        .then_with(|| a.method_name.cmp(&b.method_name))
}

/// Sort descriptors by [`compare_rank`]
#[must_use]
pub fn ranked<'a, I>(handlers: I) -> Vec<&'a HandlerDescriptor>
where
    I: IntoIterator<Item = &'a HandlerDescriptor>,
{
    let mut out: Vec<_> = handlers.into_iter().collect();
    out.sort_by(|a, b| compare_rank(a, b));
    out
}

/// Index of every valid handler in one compilation unit.
///
/// Request and stream handlers form a multimap keyed by [`RegistryKey`]; a key with
/// more than one descriptor is a reported conflict, not a merge. Notification handlers
/// are indexed by notification type only, since fan-out to many subscribers is normal.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    requests: BTreeMap<RegistryKey, Vec<HandlerDescriptor>>,
    streams: BTreeMap<RegistryKey, Vec<HandlerDescriptor>>,
    notifications: BTreeMap<String, Vec<HandlerDescriptor>>,
    pipelines: Vec<HandlerDescriptor>,
}

impl HandlerRegistry {
    /// Index a discovery result. Nothing is dropped or merged.
    pub fn from_discovery(result: DiscoveryResult) -> Self {
        let mut registry = HandlerRegistry::default();
        for d in result.request_handlers {
            registry.requests.entry(RegistryKey::of(&d)).or_default().push(d);
        }
        for d in result.stream_handlers {
            registry.streams.entry(RegistryKey::of(&d)).or_default().push(d);
        }
        for d in result.notification_handlers {
            registry
                .notifications
                .entry(d.request_type.clone())
                .or_default()
                .push(d);
        }
        registry.pipelines = result.pipeline_behaviors;
        registry.pipelines.sort_by(compare_pipeline);
        registry
    }

    fn multimap(&self, kind: HandlerKind) -> Option<&BTreeMap<RegistryKey, Vec<HandlerDescriptor>>> {
        match kind {
            HandlerKind::Request => Some(&self.requests),
            HandlerKind::Stream => Some(&self.streams),
            HandlerKind::Notification | HandlerKind::Pipeline => None,
        }
    }

    /// Descriptors registered under `key` for a request or stream kind
    #[must_use]
    pub fn get(&self, kind: HandlerKind, key: &RegistryKey) -> &[HandlerDescriptor] {
        self.multimap(kind)
            .and_then(|m| m.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Multimap entries for a request or stream kind, in key order
    pub fn entries(
        &self,
        kind: HandlerKind,
    ) -> impl Iterator<Item = (&RegistryKey, &Vec<HandlerDescriptor>)> {
        self.multimap(kind).into_iter().flat_map(|m| m.iter())
    }

    /// Distinct request types registered for a request or stream kind, sorted
    #[must_use]
    pub fn request_types(&self, kind: HandlerKind) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .entries(kind)
            .map(|(key, _)| key.request_type.as_str())
            .collect();
        types.dedup();
        types
    }

    /// Every descriptor of a request or stream kind for `request_type`
    #[must_use]
    pub fn handlers_for(&self, kind: HandlerKind, request_type: &str) -> Vec<&HandlerDescriptor> {
        self.entries(kind)
            .filter(|(key, _)| key.request_type == request_type)
            .flat_map(|(_, list)| list.iter())
            .collect()
    }

    /// Notification subscribers by notification type
    pub fn notifications(&self) -> impl Iterator<Item = (&str, &[HandlerDescriptor])> {
        self.notifications
            .iter()
            .map(|(ty, list)| (ty.as_str(), list.as_slice()))
    }

    /// Pipeline behaviors ordered by scope, order, type and method
    #[must_use]
    pub fn pipelines(&self) -> &[HandlerDescriptor] {
        &self.pipelines
    }

    /// Pipeline behaviors that apply to `scope` (including `All`)
    pub fn pipelines_for(&self, scope: PipelineScope) -> impl Iterator<Item = &HandlerDescriptor> {
        self.pipelines
            .iter()
            .filter(move |p| p.scope == scope || p.scope == PipelineScope::All)
    }

    /// Total number of descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.values().map(Vec::len).sum::<usize>()
            + self.streams.values().map(Vec::len).sum::<usize>()
            + self.notifications.values().map(Vec::len).sum::<usize>()
            + self.pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every descriptor, in kind then key order
    pub fn iter(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.requests
            .values()
            .flatten()
            .chain(self.streams.values().flatten())
            .chain(self.notifications.values().flatten())
            .chain(self.pipelines.iter())
    }
}

fn compare_pipeline(a: &HandlerDescriptor, b: &HandlerDescriptor) -> Ordering {
    a.scope
        .cmp(&b.scope)
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| a.containing_type.cmp(&b.containing_type))
        .then_with(|| a.method_name.cmp(&b.method_name))
}
