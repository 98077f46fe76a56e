// Range header parsing and resolution against a known file size.

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedRange {
    StartEnd {
        start: u64,
        end_inclusive: Option<u64>,
    },
    Suffix {
        len: u64,
    },
}

/// Outcome of applying a parsed range to a file of known size.
#[derive(Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// Inclusive `[start, end]`, guaranteed inside the file.
    Satisfiable { start: u64, end: u64 },
    Unsatisfiable,
}

/// Parse a Range header value.
/// Supports:
/// - bytes=start-end
/// - bytes=start-
/// - bytes=-suffix_len
///
/// Anything else (multiple ranges, other units, garbage) yields `None`.
pub fn parse_range_header(value: &str) -> Option<ParsedRange> {
    let value = value.trim();
    let rest = value.strip_prefix("bytes=")?;
    let mut parts = rest.splitn(2, '-');
    let start_str = parts.next()?.trim();
    let end_str = parts.next()?.trim();

    if start_str.is_empty() {
        let len: u64 = end_str.parse().ok()?;
        if len == 0 {
            return None;
        }
        Some(ParsedRange::Suffix { len })
    } else {
        let start: u64 = start_str.parse().ok()?;
        let end_inclusive = if end_str.is_empty() {
            None
        } else {
            Some(end_str.parse::<u64>().ok()?)
        };
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive,
        })
    }
}

impl ParsedRange {
    /// Clamp to `size`. Open-ended ranges are capped at `window` bytes.
    pub fn resolve(&self, size: u64, window: u64) -> ByteRange {
        if size == 0 {
            return ByteRange::Unsatisfiable;
        }
        let last = size - 1;
        match *self {
            ParsedRange::StartEnd {
                start,
                end_inclusive: Some(end),
            } => {
                if start > last || end < start {
                    return ByteRange::Unsatisfiable;
                }
                ByteRange::Satisfiable {
                    start,
                    end: end.min(last),
                }
            }
            ParsedRange::StartEnd {
                start,
                end_inclusive: None,
            } => {
                if start > last {
                    return ByteRange::Unsatisfiable;
                }
                let window_end = start.saturating_add(window.max(1) - 1);
                ByteRange::Satisfiable {
                    start,
                    end: window_end.min(last),
                }
            }
            ParsedRange::Suffix { len } => ByteRange::Satisfiable {
                start: size.saturating_sub(len),
                end: last,
            },
        }
    }
}
