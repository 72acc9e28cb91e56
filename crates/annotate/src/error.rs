use crate::index::AnnotationIndex;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("unknown annotation comment form: {0:?}")]
    UnknownForm(String),

    #[error("annotation data must serialize to a JSON object")]
    NotAnObject,

    #[error("annotation data failed to serialize: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while reconstructing the annotation stack.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    /// A closing annotation did not match the innermost open one.
    #[error("annotation stack corrupted: closing {found} while {expected} is open")]
    Corrupted {
        expected: AnnotationIndex,
        found: AnnotationIndex,
    },

    #[error("annotation stack corrupted: closing {index} with nothing open")]
    UnbalancedClose { index: AnnotationIndex },

    #[error("annotation {index} is never closed")]
    Unclosed { index: AnnotationIndex },

    #[error("node {0} is not part of the document")]
    NodeNotInDocument(html::NodeId),
}

/// A splice list that cannot be applied to its buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("splice at {start} overlaps or precedes the previous one ending at {previous_end}")]
    OutOfOrder { start: usize, previous_end: usize },

    #[error("splice {start}..{end} is outside a buffer of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("splice boundary {0} is not on a character boundary")]
    NotCharBoundary(usize),
}
