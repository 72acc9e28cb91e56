//! Start-tag scanning over raw response text.
//!
//! The scanner is a small byte state machine rather than a pattern match: quoted attribute
//! values may contain `>`, and a comment that leaked into an attribute list (for example a
//! marker written by a nested renderer) is stepped over as a unit so its `-->` does not end
//! the tag early.
//!
//! Tag names are ASCII `[A-Za-z0-9:_-]` and must start with a letter.
use crate::span::Span;
use memchr::{memchr, memmem};

pub(crate) const COMMENT_START: &[u8] = b"<!--";
pub(crate) const COMMENT_END: &[u8] = b"-->";

const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

/// One start tag located in a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartTag {
    /// The whole tag, `<` through `>`.
    pub span: Span,
    pub name: Span,
    /// Everything between the tag name and the closing `>`, minus a trailing `/`.
    pub attributes: Span,
    pub self_closing: bool,
}

impl StartTag {
    /// True when the element body is raw text that must not be scanned for tags.
    pub fn is_rawtext(&self, input: &str) -> bool {
        !self.self_closing && rawtext_close_tag(self.name.slice(input)).is_some()
    }
}

pub(crate) fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

#[derive(Clone, Copy, Debug)]
enum AttrState {
    Attrs,
    BeforeValue,
    Quoted(u8),
}

/// Returns the offset just past the `-->` of a comment opening at `at`.
pub(crate) fn comment_end(bytes: &[u8], at: usize) -> Option<usize> {
    debug_assert!(bytes[at..].starts_with(COMMENT_START));
    let body = at + COMMENT_START.len();
    memmem::find(&bytes[body..], COMMENT_END).map(|rel| body + rel + COMMENT_END.len())
}

/// Scans a start tag beginning at byte `at`.
///
/// Returns `None` when `at` does not open a start tag or when the tag is unterminated
/// (unclosed quote, unclosed embedded comment, or no `>` before end of input).
pub fn scan_start_tag(input: &str, at: usize) -> Option<StartTag> {
    let bytes = input.as_bytes();
    if bytes.get(at) != Some(&b'<') || !bytes.get(at + 1)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = at + 1;
    let mut k = name_start;
    while k < bytes.len() && is_name_char(bytes[k]) {
        k += 1;
    }
    let name = Span::new(name_start, k);
    let attrs_start = k;
    let mut state = AttrState::Attrs;

    while k < bytes.len() {
        if let AttrState::Quoted(quote) = state {
            k += memchr(quote, &bytes[k..])? + 1;
            state = AttrState::Attrs;
            continue;
        }
        if bytes[k..].starts_with(COMMENT_START) {
            k = comment_end(bytes, k)?;
            continue;
        }
        let c = bytes[k];
        if c == b'>' {
            let self_closing = k > attrs_start && bytes[k - 1] == b'/';
            let attrs_end = if self_closing { k - 1 } else { k };
            return Some(StartTag {
                span: Span::new(at, k + 1),
                name,
                attributes: Span::new(attrs_start, attrs_end),
                self_closing,
            });
        }
        match state {
            AttrState::Attrs => {
                if c == b'=' {
                    state = AttrState::BeforeValue;
                }
                k += 1;
            }
            AttrState::BeforeValue => {
                if c.is_ascii_whitespace() {
                    k += 1;
                } else if c == b'"' || c == b'\'' {
                    state = AttrState::Quoted(c);
                    k += 1;
                } else {
                    // Unquoted value; quotes inside it are literal.
                    state = AttrState::Attrs;
                }
            }
            AttrState::Quoted(_) => unreachable!("quoted state handled above"),
        }
    }
    None
}

pub(crate) fn rawtext_close_tag(name: &str) -> Option<&'static [u8]> {
    if name.eq_ignore_ascii_case("script") {
        Some(SCRIPT_CLOSE_TAG)
    } else if name.eq_ignore_ascii_case("style") {
        Some(STYLE_CLOSE_TAG)
    } else {
        None
    }
}

/// Finds `</script` or `</style` followed by optional ASCII whitespace and `>`.
///
/// Returns `(start, end)` of the close tag relative to `haystack`.
pub(crate) fn find_rawtext_close_tag(haystack: &str, close_tag: &[u8]) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let len = bytes.len();
    let n = close_tag.len();
    let mut i = 0;
    while i + n <= len {
        i += memchr(b'<', &bytes[i..])?;
        if i + n > len {
            return None;
        }
        if bytes[i..i + n].eq_ignore_ascii_case(close_tag) {
            let mut k = i + n;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

/// Iterator over every start tag in a buffer, in document order.
///
/// Comments, end tags, doctypes and the bodies of `script`/`style` elements are skipped.
#[derive(Clone, Debug)]
pub struct StartTags<'a> {
    input: &'a str,
    pos: usize,
}

pub fn start_tags(input: &str) -> StartTags<'_> {
    StartTags { input, pos: 0 }
}

impl Iterator for StartTags<'_> {
    type Item = StartTag;

    fn next(&mut self) -> Option<StartTag> {
        let bytes = self.input.as_bytes();
        loop {
            let lt = self.pos + memchr(b'<', bytes.get(self.pos..)?)?;
            if bytes[lt..].starts_with(COMMENT_START) {
                self.pos = comment_end(bytes, lt).unwrap_or(bytes.len());
                continue;
            }
            if matches!(bytes.get(lt + 1), Some(b'/' | b'!' | b'?')) {
                self.pos = memchr(b'>', &bytes[lt..]).map_or(bytes.len(), |rel| lt + rel + 1);
                continue;
            }
            let Some(tag) = scan_start_tag(self.input, lt) else {
                self.pos = lt + 1;
                continue;
            };
            self.pos = tag.span.end;
            if tag.is_rawtext(self.input) {
                let close = rawtext_close_tag(tag.name.slice(self.input))?;
                self.pos = find_rawtext_close_tag(&self.input[self.pos..], close)
                    .map_or(bytes.len(), |(_, end)| self.pos + end);
            }
            return Some(tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(input: &str) -> Vec<&str> {
        start_tags(input).map(|tag| tag.name.slice(input)).collect()
    }

    #[test]
    fn scans_plain_tag_with_attribute_region() {
        let input = r#"<div class="a" id=b>"#;
        let tag = scan_start_tag(input, 0).expect("start tag");
        assert_eq!(tag.name.slice(input), "div");
        assert_eq!(tag.attributes.slice(input), r#" class="a" id=b"#);
        assert_eq!(tag.span, Span::new(0, input.len()));
        assert!(!tag.self_closing);
    }

    #[test]
    fn quoted_values_may_contain_gt() {
        let input = r#"<a title="x > y" href='>'>rest"#;
        let tag = scan_start_tag(input, 0).expect("start tag");
        assert_eq!(tag.span.slice(input), r#"<a title="x > y" href='>'>"#);
    }

    #[test]
    fn leaked_comment_does_not_end_the_tag() {
        let input = "<img alt=<!-- inv 3 -->x<!-- /inv 3 --> src=a.png>";
        let tag = scan_start_tag(input, 0).expect("start tag");
        assert_eq!(tag.span.end, input.len());
        assert_eq!(
            tag.attributes.slice(input),
            " alt=<!-- inv 3 -->x<!-- /inv 3 --> src=a.png"
        );
    }

    #[test]
    fn quote_inside_unquoted_value_is_literal() {
        let input = r#"<p data=a"b>text"#;
        let tag = scan_start_tag(input, 0).expect("start tag");
        assert_eq!(tag.span.slice(input), r#"<p data=a"b>"#);
    }

    #[test]
    fn self_closing_slash_is_outside_attribute_region() {
        let input = r#"<br class="x"/>"#;
        let tag = scan_start_tag(input, 0).expect("start tag");
        assert!(tag.self_closing);
        assert_eq!(tag.attributes.slice(input), r#" class="x""#);
    }

    #[test]
    fn unterminated_tags_are_rejected() {
        assert!(scan_start_tag(r#"<a href="never"#, 0).is_none());
        assert!(scan_start_tag("<a title=<!-- open", 0).is_none());
        assert!(scan_start_tag("<div", 0).is_none());
        assert!(scan_start_tag("< div>", 0).is_none());
    }

    #[test]
    fn iterator_skips_comments_end_tags_and_rawtext() {
        let input = concat!(
            "<!doctype html><!-- <b> --><p>one</p>",
            "<script>if (a <b) { x = '<i>'; }</SCRIPT ><em>two</em>",
            "<style>a<span>{}</style><hr/>"
        );
        assert_eq!(names(input), ["p", "script", "em", "style", "hr"]);
    }

    #[test]
    fn iterator_handles_stray_angle_brackets() {
        let input = "a < b <<i>c</i> 3<4";
        assert_eq!(names(input), ["i"]);
    }

    #[test]
    fn iterator_preserves_utf8_boundaries() {
        let input = "¡hola <b title=\"café\">é</b>";
        let tags: Vec<_> = start_tags(input).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].attributes.slice(input), " title=\"café\"");
    }
}
