//! Pending-annotation registries: metadata captured at emission time, keyed by index, waiting
//! for the finalizer to hydrate it.
use crate::collab::Source;
use crate::index::AnnotationIndex;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Script,
    Style,
}

impl DependencyKind {
    /// Value of the `type` field in the hydrated annotation.
    pub fn type_name(self) -> &'static str {
        match self {
            DependencyKind::Script => "enqueued_script",
            DependencyKind::Style => "enqueued_style",
        }
    }

    /// Registry name handed to the dependency registry collaborator.
    pub fn registry_name(self) -> &'static str {
        match self {
            DependencyKind::Script => "scripts",
            DependencyKind::Style => "styles",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingDependency {
    pub handle: String,
    pub kind: DependencyKind,
    /// Enqueuing invocations, resolved on first hydration.
    pub(crate) invocations: Option<Vec<AnnotationIndex>>,
}

impl PendingDependency {
    pub fn registry_name(&self) -> &'static str {
        self.kind.registry_name()
    }

    pub fn resolved_invocations(&self) -> Option<&[AnnotationIndex]> {
        self.invocations.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingBlock {
    pub name: String,
    pub attributes: Option<Map<String, Value>>,
    /// Outer `None`: not looked up yet. Inner `None`: the recognizer had no answer.
    pub(crate) source: Option<Option<Source>>,
}

impl PendingBlock {
    /// Namespace token of the block name: the part before `/`, or `core` when unnamespaced.
    pub fn namespace(&self) -> &str {
        self.name
            .split_once('/')
            .map_or("core", |(namespace, _)| namespace)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingEmbed {
    pub url: String,
    pub attributes: Map<String, Value>,
    /// Produced by an internal handler rather than an external oEmbed fetch.
    pub internal: bool,
}

/// The three registries. Each index lives in at most one of them.
#[derive(Clone, Debug, Default)]
pub struct PendingRegistries {
    pub(crate) dependencies: HashMap<AnnotationIndex, PendingDependency>,
    pub(crate) blocks: HashMap<AnnotationIndex, PendingBlock>,
    pub(crate) embeds: HashMap<AnnotationIndex, PendingEmbed>,
}

impl PendingRegistries {
    pub fn dependency(&self, index: AnnotationIndex) -> Option<&PendingDependency> {
        self.dependencies.get(&index)
    }

    pub fn block(&self, index: AnnotationIndex) -> Option<&PendingBlock> {
        self.blocks.get(&index)
    }

    pub fn embed(&self, index: AnnotationIndex) -> Option<&PendingEmbed> {
        self.embeds.get(&index)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len() + self.blocks.len() + self.embeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
