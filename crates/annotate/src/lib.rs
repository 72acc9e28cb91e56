//! Source-attributed response annotations.
//!
//! While a response renders, the host wraps output it can attribute (invocation boundaries,
//! enqueued scripts and styles, static blocks, embeds) in cheap placeholder comments such as
//! `<!-- dep 7 -->`. Once the response is complete, [`Finalizer::finish`] replaces every
//! placeholder with a JSON annotation comment describing where the output came from, and
//! [`stack_for`] / [`annotation_stack_at`] let a reader recover which annotations enclose a
//! point of the finished document.

mod capture;
mod codec;
mod collab;
mod context;
mod error;
mod finish;
mod index;
mod options;
mod pending;
mod placeholder;
mod repair;
mod splice;
mod stack;

pub use crate::capture::ResponseCapture;
pub use crate::codec::{
    ANNOTATION_TAG, Annotation, CommentForm, decode, decode_comment_body, encode, encode_named,
};
pub use crate::collab::{
    BlockTypes, DependencyRegistry, Invocation, InvocationSource, NoSources, Source, SourceKind,
    SourceRecognizer,
};
pub use crate::context::{AnnotationContext, Embed, EnqueuedDependency, ParsedBlock};
pub use crate::error::{CodecError, SpliceError, StackError};
pub use crate::finish::{Collaborators, DIAGNOSTICS_KEY, Finalizer, finalize};
pub use crate::index::{AnnotationIndex, IdAllocator, SequentialIds};
pub use crate::options::FinishOptions;
pub use crate::pending::{
    DependencyKind, PendingBlock, PendingDependency, PendingEmbed, PendingRegistries,
};
pub use crate::placeholder::{Boundary, Marker, Placeholder, PlaceholderKind, find_placeholders};
pub use crate::repair::repair_start_tags;
pub use crate::splice::{Splice, splice_markers};
pub use crate::stack::{
    AnnotationData, AnnotationStack, Annotations, annotation_stack_at, annotations,
    check_nesting, stack_for,
};
