//! Client-side reading of a finished document: which annotations enclose a given point.
use crate::codec::{Annotation, decode_comment_body};
use crate::error::StackError;
use crate::index::AnnotationIndex;
use html::{Id, Node, Span};
use memchr::memmem;
use serde_json::{Map, Value};

pub type AnnotationData = Map<String, Value>;

/// Open annotations, outermost first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationStack {
    entries: Vec<(AnnotationIndex, AnnotationData)>,
}

impl AnnotationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one annotation in document order.
    ///
    /// Opening annotations push, closing ones pop and must match the innermost open index.
    /// Self-closing annotations and annotations without a numeric index leave the stack as is.
    pub fn apply(&mut self, annotation: Annotation) -> Result<(), StackError> {
        if annotation.self_closing {
            return Ok(());
        }
        let Some(index) = annotation.index() else {
            log::trace!(target: "annotate.stack", "ignoring annotation without index");
            return Ok(());
        };
        if !annotation.closing {
            self.entries.push((index, annotation.data));
            return Ok(());
        }
        match self.entries.pop() {
            Some((open, _)) if open == index => Ok(()),
            Some((open, _)) => {
                log::warn!(target: "annotate.stack", "closing {index} while {open} is open");
                Err(StackError::Corrupted {
                    expected: open,
                    found: index,
                })
            }
            None => Err(StackError::UnbalancedClose { index }),
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn innermost(&self) -> Option<AnnotationIndex> {
        self.entries.last().map(|(index, _)| *index)
    }

    pub fn entries(&self) -> impl Iterator<Item = &AnnotationData> {
        self.entries.iter().map(|(_, data)| data)
    }

    pub fn into_entries(self) -> Vec<AnnotationData> {
        self.entries.into_iter().map(|(_, data)| data).collect()
    }

    /// Fails with the innermost index if anything is still open.
    pub fn finish(self) -> Result<(), StackError> {
        match self.innermost() {
            Some(index) => Err(StackError::Unclosed { index }),
            None => Ok(()),
        }
    }
}

/// Annotations open at `node`, outermost first.
///
/// Replays every annotation comment that precedes `node` in document order. Comments that
/// are not annotations are skipped.
pub fn stack_for(document: &Node, node: Id) -> Result<Vec<AnnotationData>, StackError> {
    let comments = html::traverse::comments_before(document, node)
        .ok_or(StackError::NodeNotInDocument(node.0))?;
    let mut stack = AnnotationStack::new();
    for body in comments {
        if let Some(annotation) = decode_comment_body(body) {
            stack.apply(annotation)?;
        }
    }
    Ok(stack.into_entries())
}

/// Iterator over the annotation comments of a raw buffer, see [`annotations`].
#[derive(Clone, Debug)]
pub struct Annotations<'a> {
    buffer: &'a str,
    pos: usize,
}

/// Annotation comments in `buffer` with their spans, in order.
///
/// Works on the text directly, without building a DOM; comments inside script or style
/// bodies are reported too.
pub fn annotations(buffer: &str) -> Annotations<'_> {
    Annotations { buffer, pos: 0 }
}

impl Iterator for Annotations<'_> {
    type Item = (Span, Annotation);

    fn next(&mut self) -> Option<Self::Item> {
        let buffer = self.buffer;
        let bytes = buffer.as_bytes();
        loop {
            let start = self.pos + memmem::find(bytes.get(self.pos..)?, b"<!--")?;
            let body_start = start + 4;
            let Some(body_len) = memmem::find(&bytes[body_start..], b"-->") else {
                self.pos = bytes.len();
                return None;
            };
            let end = body_start + body_len + 3;
            self.pos = end;
            if let Some(annotation) = decode_comment_body(&buffer[body_start..end - 3]) {
                return Some((Span::new(start, end), annotation));
            }
        }
    }
}

/// Annotations open at byte `offset` of `buffer`, outermost first. A comment counts only
/// when it ends at or before `offset`.
pub fn annotation_stack_at(
    buffer: &str,
    offset: usize,
) -> Result<Vec<AnnotationData>, StackError> {
    let mut stack = AnnotationStack::new();
    for (span, annotation) in annotations(buffer) {
        if span.end > offset {
            break;
        }
        stack.apply(annotation)?;
    }
    Ok(stack.into_entries())
}

/// Checks that every annotation in `buffer` is properly nested and closed.
pub fn check_nesting(buffer: &str) -> Result<(), StackError> {
    let mut stack = AnnotationStack::new();
    for (_, annotation) in annotations(buffer) {
        stack.apply(annotation)?;
    }
    stack.finish()
}
