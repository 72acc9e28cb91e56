//! Collaborators the annotation engine consumes but does not own.
//!
//! The host decides what an invocation is, when it starts and ends, which invocations
//! enqueued an asset and which plugin or theme a block namespace belongs to. The engine only
//! asks.
use crate::index::AnnotationIndex;
use crate::placeholder::{Boundary, Placeholder, PlaceholderKind};
use serde::Serialize;
use serde_json::{Map, Value};

/// One execution of an instrumented callback.
pub trait Invocation {
    fn index(&self) -> AnnotationIndex;

    /// Whether this kind of invocation writes into the response (actions, blocks, shortcodes)
    /// as opposed to returning a value (filters).
    fn produces_output(&self) -> bool;

    /// The full record written into the opening (or self-closing) annotation, verbatim.
    /// Expected to carry at least `index` and `type`.
    fn export(&self) -> Map<String, Value>;

    /// Low-level query data captured while the invocation ran, if any.
    fn diagnostics(&self) -> Option<Value> {
        None
    }
}

/// The invocation call tree as seen from the response buffer.
pub trait InvocationSource {
    fn invocation(&self, index: AnnotationIndex) -> Option<&dyn Invocation>;

    /// Pops the innermost invocation still open, if any. Repeated calls drain the open
    /// invocations deepest-first.
    fn pop_open_invocation(&mut self) -> Option<AnnotationIndex>;

    /// Every invocation of the request, in call order.
    fn invocation_indices(&self) -> Vec<AnnotationIndex>;

    /// Text written into the response when an invocation starts or ends.
    fn boundary_placeholder(&self, index: AnnotationIndex, boundary: Boundary) -> String {
        Placeholder::new(PlaceholderKind::Invocation, index, boundary).to_string()
    }
}

/// Maps enqueued asset handles back to the invocations that enqueued them.
pub trait DependencyRegistry {
    /// Invocation indices, in enqueue order, that enqueued `handle` in `registry`
    /// (`"scripts"` or `"styles"`).
    fn invocations_enqueuing(&self, registry: &str, handle: &str) -> Vec<AnnotationIndex>;
}

/// Attributes a namespace token (a block namespace such as `core` or `my-plugin`) to the
/// plugin, theme or core component that provides it.
pub trait SourceRecognizer {
    fn identify(&self, namespace: &str) -> Option<Source>;
}

/// Knows which block names are registered with a render callback.
pub trait BlockTypes {
    fn is_dynamic(&self, block_name: &str) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Plugin,
    MuPlugin,
    Theme,
    Core,
}

/// Where a piece of output came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub name: String,
}

impl Source {
    pub fn new(kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Recognizer that never attributes anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSources;

impl SourceRecognizer for NoSources {
    fn identify(&self, _namespace: &str) -> Option<Source> {
        None
    }
}
