//! Structural HTML reading for instrumented response output: start-tag scanning over raw
//! buffers, a tokenizer that keeps comments verbatim, and an owned DOM with document-order ids.

pub mod traverse;

mod dom_builder;
mod span;
mod start_tag;
mod tokenizer;
mod types;

pub use crate::dom_builder::build_dom;
pub use crate::span::Span;
pub use crate::start_tag::{StartTag, StartTags, scan_start_tag, start_tags};
pub use crate::tokenizer::tokenize;
pub use crate::types::{Id, Node, NodeId, Token, TokenStream};

/// Tokenizes and builds the DOM for a whole buffer.
pub fn parse_document(input: &str) -> Node {
    build_dom(&tokenize(input))
}
