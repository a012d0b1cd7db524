//! Expression markers and identifier paths.
//!
//! Cell text carries expressions between configurable markers (`${` and `}`
//! by default). The marker search is brace-balanced and skips string
//! literals, so `${ #{a: 1}.a }` and `${ "}" }` are single expressions.
//!
//! Inside an expression, dotted identifier paths (`order.items.price`) are
//! what implicit collection discovery looks at and what loop rewriting
//! substitutes.

use std::ops::Range;

/// One `${...}` occurrence in cell text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExprSpan {
    /// Byte range of the whole marker, delimiters included.
    pub span: Range<usize>,
    /// Byte range of the expression between the delimiters.
    pub inner: Range<usize>,
}

/// Find every expression marker in `text`. An opening marker with no
/// matching close is plain text.
pub fn find_expressions(text: &str, begin: &str, end: &str) -> Vec<ExprSpan> {
    let mut found = Vec::new();
    if begin.is_empty() || end.is_empty() {
        return found;
    }

    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(begin) {
        let start = search_from + offset;
        let inner_start = start + begin.len();
        match find_close(text, inner_start, end) {
            Some(inner_end) => {
                found.push(ExprSpan {
                    span: start..inner_end + end.len(),
                    inner: inner_start..inner_end,
                });
                search_from = inner_end + end.len();
            }
            None => break,
        }
    }
    found
}

/// Byte offset of the closing marker for an expression starting at `from`.
fn find_close(text: &str, from: usize, end: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[from..].char_indices() {
        let pos = from + offset;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            _ if depth == 0 && text[pos..].starts_with(end) => return Some(pos),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// When the trimmed text is exactly one expression marker, return the
/// expression inside it.
pub fn whole_expression<'a>(text: &'a str, begin: &str, end: &str) -> Option<&'a str> {
    let trimmed = text.trim();
    match find_expressions(trimmed, begin, end).as_slice() {
        [only] if only.span == (0..trimmed.len()) => Some(&trimmed[only.inner.clone()]),
        _ => None,
    }
}

/// Rebuild `text` with every expression replaced by `f(expr)`. Text outside
/// the markers is copied unchanged.
pub fn map_expressions<E>(
    text: &str,
    begin: &str,
    end: &str,
    mut f: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for expr in find_expressions(text, begin, end) {
        out.push_str(&text[last..expr.span.start]);
        out.push_str(&f(&text[expr.inner.clone()])?);
        last = expr.span.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Rewrite the expression bodies of `text`, keeping the markers.
pub fn rewrite_expressions(
    text: &str,
    begin: &str,
    end: &str,
    mut f: impl FnMut(&str) -> String,
) -> String {
    let rewritten: Result<String, std::convert::Infallible> =
        map_expressions(text, begin, end, |expr| Ok(format!("{}{}{}", begin, f(expr), end)));
    match rewritten {
        Ok(text) => text,
        Err(never) => match never {},
    }
}

/// A dotted identifier path such as `order.items.price`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentPath {
    pub segments: Vec<String>,
    /// Byte offset of the first segment.
    pub start: usize,
    /// Byte offset just past each segment.
    pub segment_ends: Vec<usize>,
    /// The last segment is immediately called: `f(...)` or `x.len()`.
    pub call: bool,
    /// The path is immediately indexed: `items[0]`.
    pub indexed: bool,
}

impl IdentPath {
    /// The first `len` segments joined with `.`.
    pub fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())].join(".")
    }

    pub fn text(&self) -> String {
        self.segments.join(".")
    }

    /// Whether the first `len` segments are used as a plain value, i.e. not
    /// a function name, a method receiver, or an indexed base.
    pub fn is_value_prefix(&self, len: usize) -> bool {
        let count = self.segments.len();
        if len == 0 || len > count {
            false
        } else if len == count {
            !self.call && !self.indexed
        } else {
            !(len + 1 == count && self.call)
        }
    }

    /// Number of segments matched when this path starts with `path`.
    pub fn match_len(&self, path: &str) -> Option<usize> {
        let wanted: Vec<&str> = path.split('.').collect();
        if wanted.len() > self.segments.len() {
            return None;
        }
        self.segments
            .iter()
            .zip(&wanted)
            .all(|(have, want)| have == want)
            .then_some(wanted.len())
    }
}

/// Extract dotted identifier paths outside string literals. Properties of
/// non-path values (`f().x`, `a[0].x`) are not paths.
pub fn identifier_paths(expr: &str) -> Vec<IdentPath> {
    let bytes = expr.as_bytes();
    let mut paths = Vec::new();
    let mut quote: Option<u8> = None;
    let mut prev: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
                prev = Some(b);
            }
            i += 1;
            continue;
        }

        if b == b'"' || b == b'\'' || b == b'`' {
            quote = Some(b);
            i += 1;
        } else if is_ident_start(b) {
            let after_dot = prev == Some(b'.');
            let start = i;
            let mut segments = Vec::new();
            let mut segment_ends = Vec::new();
            loop {
                let seg_start = i;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                segments.push(expr[seg_start..i].to_string());
                segment_ends.push(i);
                if i + 1 < bytes.len() && bytes[i] == b'.' && is_ident_start(bytes[i + 1]) {
                    i += 1;
                } else {
                    break;
                }
            }
            let next = bytes[i..].iter().find(|c| !c.is_ascii_whitespace()).copied();
            if !after_dot {
                paths.push(IdentPath {
                    segments,
                    start,
                    segment_ends,
                    call: next == Some(b'('),
                    indexed: next == Some(b'['),
                });
            }
            prev = Some(bytes[i - 1]);
        } else if b.is_ascii_digit() {
            // Numeric literal, including `1.5`, `1e3` and `0xFF`.
            while i < bytes.len()
                && (is_ident_char(bytes[i])
                    || (bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)))
            {
                i += 1;
            }
            prev = Some(b'0');
        } else {
            if !b.is_ascii_whitespace() {
                prev = Some(b);
            }
            i += 1;
        }
    }

    paths
}

/// Whether `expr` uses the variable `name` as a value or a receiver.
pub fn references_name(expr: &str, name: &str) -> bool {
    identifier_paths(expr)
        .iter()
        .any(|p| p.segments[0] == name && !(p.segments.len() == 1 && p.call))
}

/// Whether `expr` uses `path` (or something under it) as a value.
pub fn references_path(expr: &str, path: &str) -> bool {
    identifier_paths(expr)
        .iter()
        .any(|p| p.match_len(path).is_some_and(|len| p.is_value_prefix(len)))
}

/// Replace value uses of `path` with `replacement`, keeping anything after
/// it: with `path = "order.items"`, `order.items.price` becomes
/// `order_items_item.price`.
pub fn replace_path_prefix(expr: &str, path: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;
    for found in identifier_paths(expr) {
        let Some(len) = found.match_len(path) else {
            continue;
        };
        if !found.is_value_prefix(len) {
            continue;
        }
        out.push_str(&expr[last..found.start]);
        out.push_str(replacement);
        last = found.segment_ends[len - 1];
    }
    out.push_str(&expr[last..]);
    out
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
