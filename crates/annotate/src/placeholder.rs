//! Placeholder markers: the short comments written inline during rendering.
//!
//! Grammar (exact, single spaces):
//!
//! ```text
//! <!-- KIND INDEX -->      opening
//! <!-- /KIND INDEX -->     closing
//! ```
//!
//! where `KIND` is one of `inv`, `dep`, `block`, `embed` and `INDEX` is an unsigned decimal.
use crate::index::AnnotationIndex;
use html::Span;
use memchr::memmem;
use std::fmt;

const OPEN: &[u8] = b"<!-- ";
const CLOSE: &[u8] = b" -->";
/// `u64::MAX` has 20 decimal digits.
const MAX_INDEX_DIGITS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// Invocation boundary, written by the invocation collaborator.
    Invocation,
    /// Enqueued script or style.
    Dependency,
    /// Static (non-dynamic) block markup.
    Block,
    /// Embed handler output.
    Embed,
}

impl PlaceholderKind {
    pub const ALL: [PlaceholderKind; 4] = [
        PlaceholderKind::Invocation,
        PlaceholderKind::Dependency,
        PlaceholderKind::Block,
        PlaceholderKind::Embed,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            PlaceholderKind::Invocation => "inv",
            PlaceholderKind::Dependency => "dep",
            PlaceholderKind::Block => "block",
            PlaceholderKind::Embed => "embed",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().as_bytes() == tag)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    Open,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub index: AnnotationIndex,
    pub boundary: Boundary,
}

impl Placeholder {
    pub fn new(kind: PlaceholderKind, index: AnnotationIndex, boundary: Boundary) -> Self {
        Self {
            kind,
            index,
            boundary,
        }
    }

    pub fn open(kind: PlaceholderKind, index: AnnotationIndex) -> Self {
        Self::new(kind, index, Boundary::Open)
    }

    pub fn close(kind: PlaceholderKind, index: AnnotationIndex) -> Self {
        Self::new(kind, index, Boundary::Close)
    }

    pub fn is_closing(&self) -> bool {
        self.boundary == Boundary::Close
    }

    /// Parses a placeholder starting exactly at byte `at`; returns it with its byte length.
    pub fn parse_at(buffer: &str, at: usize) -> Option<(Placeholder, usize)> {
        let bytes = buffer.as_bytes().get(at..)?;
        let mut k = OPEN.len();
        if !bytes.starts_with(OPEN) {
            return None;
        }
        let boundary = if bytes.get(k) == Some(&b'/') {
            k += 1;
            Boundary::Close
        } else {
            Boundary::Open
        };

        let tag_start = k;
        while bytes.get(k).is_some_and(u8::is_ascii_lowercase) {
            k += 1;
        }
        let kind = PlaceholderKind::from_tag(&bytes[tag_start..k])?;
        if bytes.get(k) != Some(&b' ') {
            return None;
        }
        k += 1;

        let digits_start = k;
        while bytes.get(k).is_some_and(u8::is_ascii_digit) {
            k += 1;
        }
        let digits = k - digits_start;
        if digits == 0 || digits > MAX_INDEX_DIGITS {
            return None;
        }
        let index = std::str::from_utf8(&bytes[digits_start..k])
            .ok()?
            .parse::<u64>()
            .ok()?;
        if !bytes[k..].starts_with(CLOSE) {
            return None;
        }
        k += CLOSE.len();
        Some((Placeholder::new(kind, AnnotationIndex(index), boundary), k))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slash = if self.is_closing() { "/" } else { "" };
        write!(f, "<!-- {slash}{} {} -->", self.kind.tag(), self.index)
    }
}

/// A placeholder located in a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    pub placeholder: Placeholder,
    pub span: Span,
}

/// Every placeholder in `buffer`, in ascending offset order.
///
/// Matching is attempted at each `<!--`; text that is not a well-formed placeholder is
/// left alone.
pub fn find_placeholders(buffer: &str) -> Vec<Marker> {
    memmem::find_iter(buffer.as_bytes(), b"<!--")
        .filter_map(|at| {
            let (placeholder, len) = Placeholder::parse_at(buffer, at)?;
            Some(Marker {
                placeholder,
                span: Span::new(at, at + len),
            })
        })
        .collect()
}
