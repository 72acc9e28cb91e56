//! Buffer finalization.
//!
//! Runs once over the complete response: closes invocations cut short by early termination,
//! drops placeholders that leaked into start tags, hydrates every remaining placeholder into
//! an annotation comment and appends self-closing annotations for invocations that never
//! wrote anything.
use crate::codec::{CommentForm, encode};
use crate::collab::{DependencyRegistry, Invocation, InvocationSource, Source, SourceRecognizer};
use crate::context::AnnotationContext;
use crate::index::{AnnotationIndex, IdAllocator};
use crate::options::FinishOptions;
use crate::pending::PendingRegistries;
use crate::placeholder::{Boundary, Marker, Placeholder, PlaceholderKind, find_placeholders};
use crate::repair::repair_start_tags;
use crate::splice::{Splice, splice_markers};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;

/// Key under which diagnostic data is attached to an invocation record.
pub const DIAGNOSTICS_KEY: &str = "queries";

#[derive(Serialize)]
struct ClosingRecord {
    index: AnnotationIndex,
}

#[derive(Serialize)]
struct DependencyRecord<'a> {
    index: AnnotationIndex,
    #[serde(rename = "type")]
    kind: &'static str,
    invocations: &'a [AnnotationIndex],
}

#[derive(Serialize)]
struct StaticBlockRecord<'a> {
    index: AnnotationIndex,
    #[serde(rename = "type")]
    kind: &'static str,
    dynamic: bool,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a Source>,
}

#[derive(Serialize)]
struct EmbedRecord<'a> {
    index: AnnotationIndex,
    #[serde(rename = "type")]
    kind: &'static str,
    url: &'a str,
    attributes: &'a Map<String, Value>,
    internal: bool,
}

/// The collaborators finishing needs, wired in up front.
pub struct Collaborators<'a> {
    pub invocations: &'a mut dyn InvocationSource,
    pub dependencies: &'a dyn DependencyRegistry,
    pub sources: &'a dyn SourceRecognizer,
}

/// Owns everything the final pass touches. Consumed by [`Finalizer::finish`], so a request
/// can only be finished once.
pub struct Finalizer<'a> {
    pending: PendingRegistries,
    collaborators: Collaborators<'a>,
    options: FinishOptions<'a>,
}

/// Finishes `buffer` in one call.
pub fn finalize<'a, A: IdAllocator>(
    buffer: String,
    context: AnnotationContext<A>,
    collaborators: Collaborators<'a>,
    options: FinishOptions<'a>,
) -> String {
    Finalizer::new(context, collaborators, options).finish(buffer)
}

fn encode_or_warn<T: Serialize>(record: &T, form: CommentForm) -> Option<String> {
    match encode(record, form) {
        Ok(comment) => Some(comment),
        Err(err) => {
            log::warn!(target: "annotate.finish", "dropping {form} annotation: {err}");
            None
        }
    }
}

fn export_invocation(invocation: &dyn Invocation, include_diagnostics: bool) -> Map<String, Value> {
    let mut record = invocation.export();
    if include_diagnostics {
        if let Some(diagnostics) = invocation.diagnostics() {
            record.insert(DIAGNOSTICS_KEY.to_string(), diagnostics);
        }
    }
    record
}

/// Placeholders whose opening and closing markers both survived repair.
fn paired(markers: &[Marker]) -> HashSet<(PlaceholderKind, AnnotationIndex)> {
    let mut opened = HashSet::new();
    let mut both = HashSet::new();
    for marker in markers {
        let key = (marker.placeholder.kind, marker.placeholder.index);
        match marker.placeholder.boundary {
            Boundary::Open => {
                opened.insert(key);
            }
            Boundary::Close => {
                if opened.contains(&key) {
                    both.insert(key);
                }
            }
        }
    }
    both
}

impl<'a> Finalizer<'a> {
    pub fn new<A: IdAllocator>(
        context: AnnotationContext<A>,
        collaborators: Collaborators<'a>,
        options: FinishOptions<'a>,
    ) -> Self {
        Self {
            pending: context.into_pending(),
            collaborators,
            options,
        }
    }

    pub fn finish(mut self, mut buffer: String) -> String {
        let include_diagnostics = self.options.resolve_diagnostics();

        self.close_open_invocations(&mut buffer);

        let repaired = match repair_start_tags(&buffer) {
            Cow::Owned(repaired) => Some(repaired),
            Cow::Borrowed(_) => None,
        };
        let buffer = repaired.unwrap_or(buffer);

        let markers = find_placeholders(&buffer);
        let paired = paired(&markers);
        let annotated: HashSet<AnnotationIndex> = markers
            .iter()
            .map(|marker| marker.placeholder)
            .filter(|placeholder| {
                placeholder.kind == PlaceholderKind::Invocation
                    && placeholder.boundary == Boundary::Open
                    && paired.contains(&(placeholder.kind, placeholder.index))
            })
            .map(|placeholder| placeholder.index)
            .collect();

        let mut unpaired = 0usize;
        let splices: Vec<Splice> = markers
            .iter()
            .map(|marker| {
                let placeholder = &marker.placeholder;
                let replacement = if paired.contains(&(placeholder.kind, placeholder.index)) {
                    self.hydrate(placeholder, include_diagnostics)
                } else {
                    unpaired += 1;
                    None
                };
                Splice {
                    span: marker.span,
                    replacement: replacement.unwrap_or_default(),
                }
            })
            .collect();
        let mut buffer = match splice_markers(&buffer, &splices) {
            Ok(hydrated) => hydrated,
            Err(err) => {
                log::warn!(target: "annotate.finish", "leaving placeholders in place: {err}");
                buffer
            }
        };

        let tail = self.append_unannotated(&mut buffer, &annotated, include_diagnostics);

        log::debug!(
            target: "annotate.finish",
            "hydrated {} placeholders ({unpaired} unpaired dropped), {tail} self-closing invocations",
            markers.len() - unpaired,
        );
        buffer
    }

    fn close_open_invocations(&mut self, buffer: &mut String) {
        let invocations = &mut *self.collaborators.invocations;
        while let Some(index) = invocations.pop_open_invocation() {
            log::debug!(target: "annotate.finish", "closing invocation {index} left open");
            let produces_output = invocations
                .invocation(index)
                .is_some_and(|invocation| invocation.produces_output());
            if produces_output {
                buffer.push_str(&invocations.boundary_placeholder(index, Boundary::Close));
            }
        }
    }

    fn hydrate(&mut self, placeholder: &Placeholder, include_diagnostics: bool) -> Option<String> {
        let index = placeholder.index;
        let boundary = placeholder.boundary;
        let comment = match placeholder.kind {
            PlaceholderKind::Invocation => {
                self.hydrate_invocation(index, boundary, include_diagnostics)
            }
            PlaceholderKind::Dependency => self.hydrate_dependency(index, boundary),
            PlaceholderKind::Block => self.hydrate_block(index, boundary),
            PlaceholderKind::Embed => self.hydrate_embed(index, boundary),
        };
        if comment.is_none() {
            log::trace!(target: "annotate.finish", "no annotation for {placeholder}");
        }
        comment
    }

    fn hydrate_invocation(
        &self,
        index: AnnotationIndex,
        boundary: Boundary,
        include_diagnostics: bool,
    ) -> Option<String> {
        let invocation = self.collaborators.invocations.invocation(index)?;
        match boundary {
            Boundary::Open => encode_or_warn(
                &export_invocation(invocation, include_diagnostics),
                CommentForm::Open,
            ),
            Boundary::Close => encode_or_warn(&ClosingRecord { index }, CommentForm::Close),
        }
    }

    fn hydrate_dependency(&mut self, index: AnnotationIndex, boundary: Boundary) -> Option<String> {
        let entry = self.pending.dependencies.get_mut(&index)?;
        if entry.invocations.is_none() {
            let enqueued_by = self
                .collaborators
                .dependencies
                .invocations_enqueuing(entry.registry_name(), &entry.handle);
            entry.invocations = Some(enqueued_by);
        }
        if entry.invocations.as_ref().is_none_or(Vec::is_empty) {
            log::warn!(
                target: "annotate.finish",
                "no invocation enqueued {} {:?}; dropping its annotation",
                entry.registry_name(),
                entry.handle
            );
            self.pending.dependencies.remove(&index);
            return None;
        }
        match boundary {
            Boundary::Open => encode_or_warn(
                &DependencyRecord {
                    index,
                    kind: entry.kind.type_name(),
                    invocations: entry.invocations.as_deref().unwrap_or_default(),
                },
                CommentForm::Open,
            ),
            Boundary::Close => encode_or_warn(&ClosingRecord { index }, CommentForm::Close),
        }
    }

    fn hydrate_block(&mut self, index: AnnotationIndex, boundary: Boundary) -> Option<String> {
        let entry = self.pending.blocks.get_mut(&index)?;
        if entry.source.is_none() {
            let source = self.collaborators.sources.identify(entry.namespace());
            entry.source = Some(source);
        }
        match boundary {
            Boundary::Open => encode_or_warn(
                &StaticBlockRecord {
                    index,
                    kind: "block",
                    dynamic: false,
                    name: &entry.name,
                    attributes: entry.attributes.as_ref(),
                    source: entry.source.as_ref().and_then(Option::as_ref),
                },
                CommentForm::Open,
            ),
            Boundary::Close => encode_or_warn(&ClosingRecord { index }, CommentForm::Close),
        }
    }

    fn hydrate_embed(&self, index: AnnotationIndex, boundary: Boundary) -> Option<String> {
        let entry = self.pending.embeds.get(&index)?;
        match boundary {
            Boundary::Open => encode_or_warn(
                &EmbedRecord {
                    index,
                    kind: "embed",
                    url: &entry.url,
                    attributes: &entry.attributes,
                    internal: entry.internal,
                },
                CommentForm::Open,
            ),
            Boundary::Close => encode_or_warn(&ClosingRecord { index }, CommentForm::Close),
        }
    }

    /// Appends a self-closing annotation for every invocation without an annotated pair, in
    /// the collaborator's order. Returns how many were written.
    fn append_unannotated(
        &self,
        buffer: &mut String,
        annotated: &HashSet<AnnotationIndex>,
        include_diagnostics: bool,
    ) -> usize {
        let invocations = &*self.collaborators.invocations;
        let mut written = 0;
        for index in invocations.invocation_indices() {
            if annotated.contains(&index) {
                continue;
            }
            let Some(invocation) = invocations.invocation(index) else {
                continue;
            };
            let record = export_invocation(invocation, include_diagnostics);
            if let Some(comment) = encode_or_warn(&record, CommentForm::SelfClosing) {
                buffer.push_str(&comment);
                written += 1;
            }
        }
        written
    }
}
