use crate::error::SpliceError;
use html::Span;

/// Replacement of one span of the original buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Splice {
    pub span: Span,
    pub replacement: String,
}

/// Applies `splices` to `buffer`, returning the rewritten text.
///
/// Spans refer to `buffer` as given and must be sorted by start offset, non-overlapping and
/// on character boundaries. Every splice is checked before anything is copied; the output is
/// then built in a single pass, so the cost is linear in the buffer plus the replacements.
pub fn splice_markers(buffer: &str, splices: &[Splice]) -> Result<String, SpliceError> {
    let mut previous_end = 0;
    let mut growth: isize = 0;
    for Splice { span, replacement } in splices {
        if span.start < previous_end {
            return Err(SpliceError::OutOfOrder {
                start: span.start,
                previous_end,
            });
        }
        if span.start > span.end || span.end > buffer.len() {
            return Err(SpliceError::OutOfBounds {
                start: span.start,
                end: span.end,
                len: buffer.len(),
            });
        }
        if let Some(&offset) = [span.start, span.end]
            .iter()
            .find(|&&offset| !buffer.is_char_boundary(offset))
        {
            return Err(SpliceError::NotCharBoundary(offset));
        }
        previous_end = span.end;
        growth += replacement.len() as isize - span.len() as isize;
    }

    let mut out = String::with_capacity(buffer.len().saturating_add_signed(growth));
    let mut cursor = 0;
    for splice in splices {
        out.push_str(&buffer[cursor..splice.span.start]);
        out.push_str(&splice.replacement);
        cursor = splice.span.end;
    }
    out.push_str(&buffer[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splice_at(buffer: &str, needle: &str, replacement: &str, from: usize) -> Splice {
        let start = from + buffer[from..].find(needle).expect("needle present");
        Splice {
            span: Span::new(start, start + needle.len()),
            replacement: replacement.to_string(),
        }
    }

    #[test]
    fn mixed_growth_and_shrink_matches_reconstruction() {
        let original = "a[1]b[22]c[333]d[4444]e";
        let replacements = ["", "XXXXXXXXXX", "y", "ZZ"];
        let mut splices = Vec::new();
        let mut from = 0;
        for (marker, replacement) in ["[1]", "[22]", "[333]", "[4444]"]
            .into_iter()
            .zip(replacements)
        {
            let splice = splice_at(original, marker, replacement, from);
            from = splice.span.end;
            splices.push(splice);
        }

        let buffer = splice_markers(original, &splices).expect("valid splices");

        let mut expected = String::new();
        let mut cursor = 0;
        for splice in &splices {
            expected.push_str(&original[cursor..splice.span.start]);
            expected.push_str(&splice.replacement);
            cursor = splice.span.end;
        }
        expected.push_str(&original[cursor..]);
        assert_eq!(buffer, expected);
        assert_eq!(buffer, "abXXXXXXXXXXcydZZe");
    }

    #[test]
    fn every_length_pattern_reconstructs() {
        let original = "<m><m>x<m><m>y<m>";
        let starts: Vec<usize> = original.match_indices("<m>").map(|(i, _)| i).collect();
        for seed in 0..243usize {
            // Five markers, each replaced by 0, 3 or 9 bytes.
            let mut s = seed;
            let splices: Vec<Splice> = starts
                .iter()
                .map(|&start| {
                    let len = [0, 3, 9][s % 3];
                    s /= 3;
                    Splice {
                        span: Span::new(start, start + 3),
                        replacement: "#".repeat(len),
                    }
                })
                .collect();
            let buffer = splice_markers(original, &splices).expect("valid splices");

            let mut expected = String::new();
            let mut cursor = 0;
            for splice in &splices {
                expected.push_str(&original[cursor..splice.span.start]);
                expected.push_str(&splice.replacement);
                cursor = splice.span.end;
            }
            expected.push_str(&original[cursor..]);
            assert_eq!(buffer, expected, "seed {seed}");
        }
    }

    #[test]
    fn no_splices_is_noop() {
        assert_eq!(splice_markers("unchanged", &[]).as_deref(), Ok("unchanged"));
    }

    #[test]
    fn many_markers_in_a_large_buffer() {
        let unit = format!("<p>{}</p><m>", "x".repeat(40));
        let count = 100_000;
        let original = unit.repeat(count);
        let comment = "<!-- sourcery {\"index\":1} -->";
        let splices: Vec<Splice> = (0..count)
            .map(|n| {
                let start = n * unit.len() + unit.len() - 3;
                Splice {
                    span: Span::new(start, start + 3),
                    replacement: comment.to_string(),
                }
            })
            .collect();

        let buffer = splice_markers(&original, &splices).expect("valid splices");
        assert_eq!(buffer.len(), original.len() + count * (comment.len() - 3));
        assert_eq!(buffer.matches(comment).count(), count);
        assert!(!buffer.contains("<m>"));
        assert!(buffer.ends_with(&format!("</p>{comment}")));
    }

    #[test]
    fn overlapping_splices_are_rejected() {
        let splices = [
            Splice {
                span: Span::new(2, 6),
                replacement: "a".to_string(),
            },
            Splice {
                span: Span::new(4, 8),
                replacement: "b".to_string(),
            },
        ];
        assert_eq!(
            splice_markers("0123456789", &splices),
            Err(SpliceError::OutOfOrder {
                start: 4,
                previous_end: 6
            })
        );
    }

    #[test]
    fn unsorted_splices_are_rejected() {
        let splices = [
            Splice {
                span: Span::new(6, 7),
                replacement: String::new(),
            },
            Splice {
                span: Span::new(1, 2),
                replacement: String::new(),
            },
        ];
        assert!(matches!(
            splice_markers("0123456789", &splices),
            Err(SpliceError::OutOfOrder { start: 1, .. })
        ));
    }

    #[test]
    fn spans_past_the_end_or_inside_a_character_are_rejected() {
        let past_end = [Splice {
            span: Span::new(8, 12),
            replacement: String::new(),
        }];
        assert_eq!(
            splice_markers("0123456789", &past_end),
            Err(SpliceError::OutOfBounds {
                start: 8,
                end: 12,
                len: 10
            })
        );

        let split_char = [Splice {
            span: Span::new(1, 3),
            replacement: String::new(),
        }];
        assert_eq!(splice_markers("aé", &split_char).as_deref(), Ok("a"));
        let split_char = [Splice {
            span: Span::new(2, 3),
            replacement: String::new(),
        }];
        assert_eq!(
            splice_markers("aéb", &split_char),
            Err(SpliceError::NotCharBoundary(2))
        );
    }
}
