//! In-memory collaborators and assertion helpers for annotation tests.
use annotate::{
    AnnotationContext, AnnotationIndex, BlockTypes, Boundary, DependencyRegistry, IdAllocator,
    Invocation, InvocationSource, Source, SourceRecognizer,
};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct FakeInvocation {
    pub index: AnnotationIndex,
    /// `action`, `filter`, `block`, `shortcode`...
    pub kind: &'static str,
    pub name: String,
    pub produces_output: bool,
    pub diagnostics: Option<Value>,
}

impl Invocation for FakeInvocation {
    fn index(&self) -> AnnotationIndex {
        self.index
    }

    fn produces_output(&self) -> bool {
        self.produces_output
    }

    fn export(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("index".to_string(), json!(self.index));
        record.insert("type".to_string(), json!(self.kind));
        record.insert("name".to_string(), json!(self.name));
        record
    }

    fn diagnostics(&self) -> Option<Value> {
        self.diagnostics.clone()
    }
}

/// Invocation tree driven by explicit `begin` / `end` calls, drawing indices from the same
/// context as every other annotation.
#[derive(Clone, Debug, Default)]
pub struct FakeInvocations {
    invocations: Vec<FakeInvocation>,
    open: Vec<AnnotationIndex>,
}

impl FakeInvocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an invocation. Returns its index and the text to write into the response
    /// (empty for invocations that do not produce output).
    pub fn begin<A: IdAllocator>(
        &mut self,
        context: &mut AnnotationContext<A>,
        kind: &'static str,
        name: &str,
        produces_output: bool,
    ) -> (AnnotationIndex, String) {
        let index = context.allocate_index();
        self.invocations.push(FakeInvocation {
            index,
            kind,
            name: name.to_string(),
            produces_output,
            diagnostics: None,
        });
        self.open.push(index);
        (index, self.placeholder_for(index, Boundary::Open))
    }

    /// Ends the innermost open invocation, which must be `index`.
    pub fn end(&mut self, index: AnnotationIndex) -> String {
        assert_eq!(self.open.pop(), Some(index), "invocations must end innermost first");
        self.placeholder_for(index, Boundary::Close)
    }

    pub fn set_diagnostics(&mut self, index: AnnotationIndex, diagnostics: Value) {
        if let Some(invocation) = self.invocations.iter_mut().find(|i| i.index == index) {
            invocation.diagnostics = Some(diagnostics);
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn placeholder_for(&self, index: AnnotationIndex, boundary: Boundary) -> String {
        match self.invocation(index) {
            Some(invocation) if invocation.produces_output() => {
                self.boundary_placeholder(index, boundary)
            }
            _ => String::new(),
        }
    }
}

impl InvocationSource for FakeInvocations {
    fn invocation(&self, index: AnnotationIndex) -> Option<&dyn Invocation> {
        self.invocations
            .iter()
            .find(|invocation| invocation.index == index)
            .map(|invocation| invocation as &dyn Invocation)
    }

    fn pop_open_invocation(&mut self) -> Option<AnnotationIndex> {
        self.open.pop()
    }

    fn invocation_indices(&self) -> Vec<AnnotationIndex> {
        self.invocations.iter().map(|invocation| invocation.index).collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeDependencies {
    enqueued: HashMap<(String, String), Vec<AnnotationIndex>>,
}

impl FakeDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that invocation `by` enqueued `handle` in `registry`.
    pub fn enqueue(
        mut self,
        registry: &str,
        handle: &str,
        by: impl Into<AnnotationIndex>,
    ) -> Self {
        self.enqueued
            .entry((registry.to_string(), handle.to_string()))
            .or_default()
            .push(by.into());
        self
    }
}

impl DependencyRegistry for FakeDependencies {
    fn invocations_enqueuing(&self, registry: &str, handle: &str) -> Vec<AnnotationIndex> {
        self.enqueued
            .get(&(registry.to_string(), handle.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeSources {
    by_namespace: HashMap<String, Source>,
}

impl FakeSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, namespace: &str, source: Source) -> Self {
        self.by_namespace.insert(namespace.to_string(), source);
        self
    }
}

impl SourceRecognizer for FakeSources {
    fn identify(&self, namespace: &str) -> Option<Source> {
        self.by_namespace.get(namespace).cloned()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeBlockTypes {
    dynamic: HashSet<String>,
}

impl FakeBlockTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dynamic(mut self, name: &str) -> Self {
        self.dynamic.insert(name.to_string());
        self
    }
}

impl BlockTypes for FakeBlockTypes {
    fn is_dynamic(&self, block_name: &str) -> bool {
        self.dynamic.contains(block_name)
    }
}

/// Splits markup after every `>` so diffs point at the tag or comment that differs.
pub fn markup_lines(markup: &str) -> Vec<String> {
    markup.split_inclusive('>').map(str::to_string).collect()
}

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;

    let missing = "<missing>";
    let line = |lines: &[String], i: usize| {
        lines.get(i).map_or(missing, String::as_str).to_string()
    };
    let max = expected.len().max(actual.len());
    let mut out = String::new();
    match (0..max).find(|&i| line(expected, i) != line(actual, i)) {
        Some(i) => {
            let start = i.saturating_sub(2);
            let end = (i + 3).min(max);
            let _ = writeln!(
                out,
                "first mismatch at line {} (showing {}..={}):",
                i + 1,
                start + 1,
                end
            );
            for n in start..end {
                let marker = if n == i { ">" } else { " " };
                let _ = writeln!(out, "{marker} {:>4}  expected: {}", n + 1, line(expected, n));
                let _ = writeln!(out, "{marker} {:>4}    actual: {}", n + 1, line(actual, n));
            }
        }
        None if expected.len() != actual.len() => {
            let _ = writeln!(out, "prefix matched but lengths differ");
        }
        None => {}
    }
    let _ = writeln!(
        out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[track_caller]
pub fn assert_buffer_eq(expected: &str, actual: &str) {
    if expected != actual {
        panic!(
            "buffers differ\n{}",
            diff_lines(&markup_lines(expected), &markup_lines(actual))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_points_at_first_mismatch() {
        let expected = markup_lines("<a><b><c>");
        let actual = markup_lines("<a><x><c>");
        let diff = diff_lines(&expected, &actual);
        assert!(diff.contains("first mismatch at line 2"), "{diff}");
        assert!(diff.contains("actual: <x>"), "{diff}");
    }

    #[test]
    fn silent_invocations_write_nothing() {
        let mut context = AnnotationContext::new();
        let mut invocations = FakeInvocations::new();
        let (outer, open) = invocations.begin(&mut context, "action", "wp_footer", true);
        let (inner, silent) = invocations.begin(&mut context, "filter", "the_title", false);
        assert_eq!(open, "<!-- inv 0 -->");
        assert_eq!(silent, "");
        assert_eq!(invocations.end(inner), "");
        assert_eq!(invocations.end(outer), "<!-- /inv 0 -->");
        assert_eq!(invocations.open_count(), 0);
    }
}
