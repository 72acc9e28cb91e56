//! Removal of placeholders that leaked into start tags.
//!
//! A renderer whose output ends up inside an attribute value (a filtered title printed into
//! `title="..."`, say) carries its placeholders along. A comment inside a start tag is not a
//! comment at all, so those markers are dropped before hydration.
use crate::placeholder::find_placeholders;
use std::borrow::Cow;

/// Strips every placeholder found inside a start tag's attribute list.
///
/// Runs to a fixed point, so the result is stable under a second application even when a
/// removal splices two fragments into a new marker.
pub fn repair_start_tags(buffer: &str) -> Cow<'_, str> {
    let mut repaired = Cow::Borrowed(buffer);
    while let Some(next) = repair_pass(&repaired) {
        repaired = Cow::Owned(next);
    }
    repaired
}

fn repair_pass(buffer: &str) -> Option<String> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut removed = 0usize;
    for tag in html::start_tags(buffer) {
        let region = tag.attributes;
        for marker in find_placeholders(region.slice(buffer)) {
            let span = marker.span.offset(region.start);
            let out = out.get_or_insert_with(|| String::with_capacity(buffer.len()));
            out.push_str(&buffer[copied..span.start]);
            copied = span.end;
            removed += 1;
        }
    }
    let mut out = out?;
    out.push_str(&buffer[copied..]);
    log::debug!(target: "annotate.repair", "removed {removed} placeholders from start tags");
    Some(out)
}
