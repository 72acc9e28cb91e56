//! Structural HTML tokenizer for instrumented response output.
//!
//! Only structure matters here: text and attribute values are kept raw (no character
//! reference decoding), and comments are kept verbatim because annotation comments are the
//! payload downstream readers care about.
//!
//! Known limitations (intentional):
//! - No HTML5 parse-error recovery beyond skipping malformed constructs as text.
//! - RCDATA elements (`title`, `textarea`) are tokenized like ordinary elements.
use crate::start_tag::{
    COMMENT_END, COMMENT_START, StartTag, find_rawtext_close_tag, is_name_char,
    rawtext_close_tag, scan_start_tag,
};
use crate::types::{Token, TokenStream};
use memchr::{memchr, memmem};

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Splits an attribute region (as located by the start-tag scanner) into name/value pairs.
///
/// Names are ASCII-lowercased. Comments leaked into the region are skipped.
pub(crate) fn parse_attributes(region: &str) -> Vec<(String, Option<String>)> {
    let bytes = region.as_bytes();
    let len = bytes.len();
    let mut attributes = Vec::new();
    let mut k = 0;

    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };
    let skip_comment = |k: &mut usize| -> bool {
        if !bytes[*k..].starts_with(COMMENT_START) {
            return false;
        }
        *k = memmem::find(&bytes[*k + COMMENT_START.len()..], COMMENT_END)
            .map_or(len, |rel| *k + COMMENT_START.len() + rel + COMMENT_END.len());
        true
    };

    loop {
        while k < len && (bytes[k].is_ascii_whitespace() || bytes[k] == b'/') {
            k += 1;
        }
        if k >= len {
            break;
        }
        if skip_comment(&mut k) {
            continue;
        }
        let name_start = k;
        while k < len
            && !bytes[k].is_ascii_whitespace()
            && !matches!(bytes[k], b'=' | b'/' | b'>')
            && !bytes[k..].starts_with(COMMENT_START)
        {
            k += 1;
        }
        if name_start == k {
            k += 1;
            continue;
        }
        let name = region[name_start..k].to_ascii_lowercase();

        skip_whitespace(&mut k);
        let mut value = None;
        if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            while k < len && skip_comment(&mut k) {}
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                let vstart = k + 1;
                let vend = memchr(quote, &bytes[vstart..]).map_or(len, |rel| vstart + rel);
                value = Some(region[vstart..vend].to_string());
                k = (vend + 1).min(len);
            } else {
                let vstart = k;
                while k < len
                    && !bytes[k].is_ascii_whitespace()
                    && !bytes[k..].starts_with(COMMENT_START)
                {
                    k += 1;
                }
                value = Some(region[vstart..k].to_string());
            }
        }
        attributes.push((name, value));
    }
    attributes
}

fn start_tag_token(input: &str, tag: &StartTag) -> Token {
    let name = tag.name.slice(input).to_ascii_lowercase();
    let self_closing = tag.self_closing || is_void_element(&name);
    Token::StartTag {
        attributes: parse_attributes(tag.attributes.slice(input)),
        name,
        self_closing,
    }
}

/// Tokenizes a response buffer into structural tokens.
pub fn tokenize(input: &str) -> TokenStream {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    // Text accumulates from `text_start` until a construct is recognized; unrecognized `<`
    // stays in the text run.
    let mut text_start = 0;

    let flush_text = |out: &mut Vec<Token>, start: usize, end: usize| {
        if start < end {
            out.push(Token::Text(input[start..end].to_string()));
        }
    };

    while i < len {
        let Some(rel) = memchr(b'<', &bytes[i..]) else {
            break;
        };
        let lt = i + rel;

        if bytes[lt..].starts_with(COMMENT_START) {
            flush_text(&mut out, text_start, lt);
            let body = lt + COMMENT_START.len();
            match memmem::find(&bytes[body..], COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(input[body..body + end].to_string()));
                    i = body + end + COMMENT_END.len();
                }
                None => {
                    out.push(Token::Comment(input[body..].to_string()));
                    i = len;
                }
            }
            text_start = i;
            continue;
        }

        if starts_with_ignore_ascii_case_at(bytes, lt, b"<!doctype") {
            flush_text(&mut out, text_start, lt);
            let end = memchr(b'>', &bytes[lt..]).map_or(len, |rel| lt + rel);
            out.push(Token::Doctype(input[lt + 2..end].trim().to_string()));
            i = (end + 1).min(len);
            text_start = i;
            continue;
        }

        if matches!(bytes.get(lt + 1), Some(b'!' | b'?')) {
            // Bogus comment, runs to the next `>`.
            flush_text(&mut out, text_start, lt);
            let end = memchr(b'>', &bytes[lt..]).map_or(len, |rel| lt + rel);
            out.push(Token::Comment(input[lt + 2..end].to_string()));
            i = (end + 1).min(len);
            text_start = i;
            continue;
        }

        if bytes.get(lt + 1) == Some(&b'/')
            && bytes.get(lt + 2).is_some_and(|c| c.is_ascii_alphabetic())
        {
            flush_text(&mut out, text_start, lt);
            let start = lt + 2;
            let mut j = start;
            while j < len && is_name_char(bytes[j]) {
                j += 1;
            }
            let name = input[start..j].to_ascii_lowercase();
            i = memchr(b'>', &bytes[j..]).map_or(len, |rel| j + rel + 1);
            out.push(Token::EndTag(name));
            text_start = i;
            continue;
        }

        let Some(tag) = scan_start_tag(input, lt) else {
            i = lt + 1;
            continue;
        };
        flush_text(&mut out, text_start, lt);
        let token = start_tag_token(input, &tag);
        i = tag.span.end;
        text_start = i;
        let rawtext = match &token {
            Token::StartTag {
                name,
                self_closing: false,
                ..
            } => rawtext_close_tag(name).map(|close| (name.clone(), close)),
            _ => None,
        };
        out.push(token);

        if let Some((name, close)) = rawtext {
            // A missing close tag turns the remainder into rawtext with an implicit end tag.
            let (body_end, next) = find_rawtext_close_tag(&input[i..], close)
                .map_or((len, len), |(start, end)| (i + start, i + end));
            flush_text(&mut out, i, body_end);
            out.push(Token::EndTag(name));
            i = next;
            text_start = i;
        }
    }
    flush_text(&mut out, text_start, len);
    log::trace!(target: "html.tokenizer", "tokenized {len} bytes into {} tokens", out.len());
    TokenStream::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attributes: &[(&str, Option<&str>)], self_closing: bool) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
            self_closing,
        }
    }

    #[test]
    fn tokenize_keeps_comments_verbatim() {
        let stream =
            tokenize(r#"<p><!-- sourcery {"index":1} -->hi<!-- /sourcery {"index":1} --></p>"#);
        assert_eq!(
            stream.tokens(),
            [
                start("p", &[], false),
                Token::Comment(r#" sourcery {"index":1} "#.to_string()),
                Token::Text("hi".to_string()),
                Token::Comment(r#" /sourcery {"index":1} "#.to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_parses_attribute_forms() {
        let stream = tokenize(r#"<INPUT Type=text value='a b' data-x="1>2" disabled>"#);
        assert_eq!(
            stream.tokens(),
            [start(
                "input",
                &[
                    ("type", Some("text")),
                    ("value", Some("a b")),
                    ("data-x", Some("1>2")),
                    ("disabled", None),
                ],
                true
            )]
        );
    }

    #[test]
    fn tokenize_treats_stray_lt_as_text() {
        let stream = tokenize("1 < 2 and 3<4");
        assert_eq!(stream.tokens(), [Token::Text("1 < 2 and 3<4".to_string())]);
    }

    #[test]
    fn tokenize_handles_uppercase_doctype() {
        let stream = tokenize("<!DOCTYPE html><html></html>");
        assert_eq!(stream.tokens()[0], Token::Doctype("DOCTYPE html".to_string()));
    }

    #[test]
    fn tokenize_finds_script_end_tag_case_insensitive() {
        let stream = tokenize("<script>if (a<b) {}</ScRiPt><p>");
        assert_eq!(
            stream.tokens(),
            [
                start("script", &[], false),
                Token::Text("if (a<b) {}".to_string()),
                Token::EndTag("script".to_string()),
                start("p", &[], false),
            ]
        );
    }

    #[test]
    fn tokenize_handles_rawtext_without_close_tag() {
        let stream = tokenize("<style>a{}<b>");
        assert_eq!(
            stream.tokens(),
            [
                start("style", &[], false),
                Token::Text("a{}<b>".to_string()),
                Token::EndTag("style".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_unterminated_comment_runs_to_end() {
        let stream = tokenize("a<!-- never closed");
        assert_eq!(
            stream.tokens(),
            [
                Token::Text("a".to_string()),
                Token::Comment(" never closed".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_handles_many_comments_linearly() {
        let input = "<!--x-->".repeat(20_000);
        let stream = tokenize(&input);
        assert_eq!(stream.tokens().len(), 20_000);
    }

    #[test]
    fn tokenize_handles_tons_of_angle_brackets() {
        let input = "<".repeat(200_000);
        let stream = tokenize(&input);
        assert_eq!(stream.tokens().len(), 1);
    }
}
