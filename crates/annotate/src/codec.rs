//! Hydrated annotation comments.
//!
//! ```text
//! <!-- sourcery {"index":3,...} -->     opening
//! <!-- /sourcery {"index":3} -->        closing
//! <!-- sourcery {"index":3,...} /-->    self-closing
//! ```
//!
//! The payload is compact JSON on a single line. `--` never appears literally inside it:
//! every occurrence is written as `\u002d\u002d`, which JSON parsers read back as `--`.
use crate::error::CodecError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const ANNOTATION_TAG: &str = "sourcery";

const ESCAPED_DOUBLE_HYPHEN: &str = "\\u002d\\u002d";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommentForm {
    Open,
    Close,
    SelfClosing,
}

impl CommentForm {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentForm::Open => "open",
            CommentForm::Close => "close",
            CommentForm::SelfClosing => "self-closing",
        }
    }
}

impl fmt::Display for CommentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentForm {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(CommentForm::Open),
            "close" => Ok(CommentForm::Close),
            "self-closing" => Ok(CommentForm::SelfClosing),
            other => Err(CodecError::UnknownForm(other.to_string())),
        }
    }
}

/// A decoded annotation comment.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub closing: bool,
    pub self_closing: bool,
    pub data: Map<String, Value>,
}

impl Annotation {
    pub fn index(&self) -> Option<crate::AnnotationIndex> {
        self.data
            .get("index")
            .and_then(Value::as_u64)
            .map(crate::AnnotationIndex)
    }

    pub fn form(&self) -> CommentForm {
        match (self.closing, self.self_closing) {
            (true, _) => CommentForm::Close,
            (false, true) => CommentForm::SelfClosing,
            (false, false) => CommentForm::Open,
        }
    }
}

/// Serializes `data` (which must be a JSON object) into an annotation comment.
pub fn encode<T: Serialize + ?Sized>(data: &T, form: CommentForm) -> Result<String, CodecError> {
    let json = serde_json::to_string(data)?;
    if !json.starts_with('{') {
        return Err(CodecError::NotAnObject);
    }
    let json = json.replace("--", ESCAPED_DOUBLE_HYPHEN);
    Ok(match form {
        CommentForm::Open => format!("<!-- {ANNOTATION_TAG} {json} -->"),
        CommentForm::Close => format!("<!-- /{ANNOTATION_TAG} {json} -->"),
        CommentForm::SelfClosing => format!("<!-- {ANNOTATION_TAG} {json} /-->"),
    })
}

/// Like [`encode`], with the form given by name (`open`, `close`, `self-closing`).
pub fn encode_named<T: Serialize + ?Sized>(data: &T, form: &str) -> Result<String, CodecError> {
    encode(data, form.parse()?)
}

/// Decodes a whole comment, `<!--` through `-->`.
pub fn decode(comment: &str) -> Option<Annotation> {
    let body = comment.strip_prefix("<!--")?.strip_suffix("-->")?;
    decode_comment_body(body)
}

/// Decodes a comment body as stored in a DOM comment node (delimiters already removed).
pub fn decode_comment_body(body: &str) -> Option<Annotation> {
    let rest = body.trim_start();
    let (closing, rest) = match rest.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let rest = rest.strip_prefix(ANNOTATION_TAG)?;
    if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        return None;
    }
    let rest = rest.trim();
    let (self_closing, payload) = match rest.strip_suffix('/') {
        Some(payload) => (true, payload.trim_end()),
        None => (false, rest),
    };
    if closing && self_closing {
        return None;
    }
    if !payload.starts_with('{') || !payload.ends_with('}') {
        return None;
    }
    let Value::Object(data) = serde_json::from_str::<Value>(payload).ok()? else {
        return None;
    };
    Some(Annotation {
        closing,
        self_closing,
        data,
    })
}
