//! Request-scoped annotation state and the placeholder emitter.
use crate::collab::BlockTypes;
use crate::index::{AnnotationIndex, IdAllocator, SequentialIds};
use crate::pending::{
    DependencyKind, PendingBlock, PendingDependency, PendingEmbed, PendingRegistries,
};
use crate::placeholder::{Placeholder, PlaceholderKind};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// An enqueued script or style as it is printed.
#[derive(Clone, Copy, Debug)]
pub struct EnqueuedDependency<'a> {
    pub kind: DependencyKind,
    pub handle: Option<&'a str>,
    /// Legacy conditional-comment gate (`lt IE 9` and the like), if any.
    pub conditional: Option<&'a str>,
}

impl<'a> EnqueuedDependency<'a> {
    pub fn script(handle: &'a str) -> Self {
        Self {
            kind: DependencyKind::Script,
            handle: Some(handle),
            conditional: None,
        }
    }

    pub fn style(handle: &'a str) -> Self {
        Self {
            kind: DependencyKind::Style,
            handle: Some(handle),
            conditional: None,
        }
    }

    pub fn with_conditional(mut self, conditional: &'a str) -> Self {
        self.conditional = Some(conditional);
        self
    }
}

/// A parsed block as handed to the block renderer. Inner markup is not retained.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParsedBlock<'a> {
    pub name: Option<&'a str>,
    pub attributes: Option<&'a Map<String, Value>>,
}

/// An embed as produced by an embed handler or an oEmbed fetch.
#[derive(Clone, Copy, Debug)]
pub struct Embed<'a> {
    pub url: &'a str,
    pub attributes: &'a Map<String, Value>,
    pub internal: bool,
}

/// Per-request annotation state: the index allocator and the pending registries.
///
/// Created at request start, consumed by the finalizer at request end.
#[derive(Debug, Default)]
pub struct AnnotationContext<A = SequentialIds> {
    ids: A,
    pending: PendingRegistries,
}

impl AnnotationContext<SequentialIds> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: IdAllocator> AnnotationContext<A> {
    pub fn with_allocator(ids: A) -> Self {
        Self {
            ids,
            pending: PendingRegistries::default(),
        }
    }

    /// Allocates an index. Invocation tracking draws from here too so indices stay unique
    /// across every kind of annotation.
    pub fn allocate_index(&mut self) -> AnnotationIndex {
        self.ids.next_index()
    }

    pub fn pending(&self) -> &PendingRegistries {
        &self.pending
    }

    pub fn into_pending(self) -> PendingRegistries {
        self.pending
    }

    /// Wraps an enqueued script or style tag in dependency placeholders.
    ///
    /// Passes `tag` through untouched when the handle is missing, or when the asset sits
    /// behind a conditional comment: a placeholder cannot be nested inside another comment.
    pub fn annotate_dependency<'t>(
        &mut self,
        tag: &'t str,
        dependency: &EnqueuedDependency<'_>,
    ) -> Cow<'t, str> {
        let Some(handle) = dependency.handle.filter(|handle| !handle.is_empty()) else {
            log::trace!(target: "annotate.emit", "skipping dependency without handle");
            return Cow::Borrowed(tag);
        };
        if dependency.conditional.is_some_and(|c| !c.is_empty()) {
            log::trace!(target: "annotate.emit", "skipping conditional dependency {handle}");
            return Cow::Borrowed(tag);
        }
        let index = self.allocate_index();
        self.pending.dependencies.insert(
            index,
            PendingDependency {
                handle: handle.to_string(),
                kind: dependency.kind,
                invocations: None,
            },
        );
        Cow::Owned(wrap(PlaceholderKind::Dependency, index, tag))
    }

    /// Wraps the saved markup of a static block in block placeholders.
    ///
    /// Unnamed blocks (freeform content) pass through, as do dynamic blocks: those are
    /// annotated as invocations of their render callback instead.
    pub fn annotate_static_block<'t>(
        &mut self,
        output: &'t str,
        block: &ParsedBlock<'_>,
        block_types: &dyn BlockTypes,
    ) -> Cow<'t, str> {
        let Some(name) = block.name.filter(|name| !name.is_empty()) else {
            return Cow::Borrowed(output);
        };
        if block_types.is_dynamic(name) {
            log::trace!(target: "annotate.emit", "skipping dynamic block {name}");
            return Cow::Borrowed(output);
        }
        let index = self.allocate_index();
        self.pending.blocks.insert(
            index,
            PendingBlock {
                name: name.to_string(),
                attributes: block.attributes.filter(|attrs| !attrs.is_empty()).cloned(),
                source: None,
            },
        );
        Cow::Owned(wrap(PlaceholderKind::Block, index, output))
    }

    /// Wraps embed handler output in embed placeholders.
    pub fn annotate_embed(&mut self, output: &str, embed: &Embed<'_>) -> String {
        let index = self.allocate_index();
        self.pending.embeds.insert(
            index,
            PendingEmbed {
                url: embed.url.to_string(),
                attributes: embed.attributes.clone(),
                internal: embed.internal,
            },
        );
        wrap(PlaceholderKind::Embed, index, output)
    }
}

fn wrap(kind: PlaceholderKind, index: AnnotationIndex, output: &str) -> String {
    let open = Placeholder::open(kind, index).to_string();
    let close = Placeholder::close(kind, index).to_string();
    let mut wrapped = String::with_capacity(open.len() + output.len() + close.len());
    wrapped.push_str(&open);
    wrapped.push_str(output);
    wrapped.push_str(&close);
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    struct Dynamic(HashSet<&'static str>);

    impl BlockTypes for Dynamic {
        fn is_dynamic(&self, block_name: &str) -> bool {
            self.0.contains(block_name)
        }
    }

    fn no_dynamic() -> Dynamic {
        Dynamic(HashSet::new())
    }

    #[test]
    fn dependency_is_wrapped_and_recorded() {
        let mut ctx = AnnotationContext::with_allocator(SequentialIds::starting_at(7));
        let tag = r#"<script src="a.js"></script>"#;
        let out = ctx.annotate_dependency(tag, &EnqueuedDependency::script("a"));
        assert_eq!(
            out,
            r#"<!-- dep 7 --><script src="a.js"></script><!-- /dep 7 -->"#
        );
        let entry = ctx.pending().dependency(AnnotationIndex(7)).expect("entry");
        assert_eq!(entry.handle, "a");
        assert_eq!(entry.registry_name(), "scripts");
        assert_eq!(entry.resolved_invocations(), None);
    }

    #[test]
    fn dependency_without_handle_passes_through() {
        let mut ctx = AnnotationContext::new();
        let tag = "<link rel='stylesheet' href='x.css' />";
        let dependency = EnqueuedDependency {
            kind: DependencyKind::Style,
            handle: None,
            conditional: None,
        };
        let out = ctx.annotate_dependency(tag, &dependency);
        assert!(matches!(out, Cow::Borrowed(s) if s == tag));
        assert!(ctx.pending().is_empty());
    }

    #[test]
    fn conditional_stylesheet_passes_through() {
        let mut ctx = AnnotationContext::new();
        let tag = "<!--[if lt IE 9]>\n<link rel='stylesheet' href='ie.css' />\n<![endif]-->\n";
        let dependency = EnqueuedDependency::style("ie").with_conditional("lt IE 9");
        assert_eq!(ctx.annotate_dependency(tag, &dependency), tag);
        assert!(ctx.pending().is_empty());
    }

    #[test]
    fn static_block_drops_empty_attributes() {
        let mut ctx = AnnotationContext::new();
        let empty = Map::new();
        let block = ParsedBlock {
            name: Some("core/paragraph"),
            attributes: Some(&empty),
        };
        let out = ctx.annotate_static_block("<p>hi</p>", &block, &no_dynamic());
        assert_eq!(out, "<!-- block 0 --><p>hi</p><!-- /block 0 -->");
        let entry = ctx.pending().block(AnnotationIndex(0)).expect("entry");
        assert_eq!(entry.name, "core/paragraph");
        assert_eq!(entry.attributes, None);
    }

    #[test]
    fn unnamed_and_dynamic_blocks_pass_through() {
        let mut ctx = AnnotationContext::new();
        let types = Dynamic(HashSet::from(["core/latest-posts"]));
        let freeform = ParsedBlock::default();
        assert_eq!(ctx.annotate_static_block("\n\n", &freeform, &types), "\n\n");
        let dynamic = ParsedBlock {
            name: Some("core/latest-posts"),
            attributes: None,
        };
        assert_eq!(ctx.annotate_static_block("<ul></ul>", &dynamic, &types), "<ul></ul>");
        assert!(ctx.pending().is_empty());
    }

    #[test]
    fn indices_are_unique_across_kinds() {
        let mut ctx = AnnotationContext::new();
        let attrs = json!({"width": 500});
        let attrs = attrs.as_object().expect("object");
        let embed = Embed {
            url: "https://example.com/v/1",
            attributes: attrs,
            internal: false,
        };
        let invocation = ctx.allocate_index();
        let _ = ctx.annotate_embed("<iframe></iframe>", &embed);
        let _ = ctx.annotate_dependency("<script></script>", &EnqueuedDependency::script("s"));
        let block = ParsedBlock {
            name: Some("core/image"),
            attributes: Some(attrs),
        };
        let _ = ctx.annotate_static_block("<img>", &block, &no_dynamic());
        assert_eq!(invocation, AnnotationIndex(0));
        assert!(ctx.pending().embed(AnnotationIndex(1)).is_some());
        assert!(ctx.pending().dependency(AnnotationIndex(2)).is_some());
        assert!(ctx.pending().block(AnnotationIndex(3)).is_some());
        assert_eq!(ctx.pending().len(), 3);
    }
}
