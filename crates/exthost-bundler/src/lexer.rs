//! Span scanning for ES-module sources.
//!
//! Splits a source into code, comments, string literals, template literals
//! and regular-expression literals. Import discovery and compaction only act
//! on what the spans say is code, so text inside strings, templates and
//! comments is never mistaken for an import or stripped as a comment.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Code immediately before an import specifier: `from`, `import` or `import(`.
static IMPORT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w$.])(?:(?:from|import)\s*|import\s*\(\s*)$").expect("import keyword pattern is valid")
});

/// Bytes after which a `/` starts a regular expression rather than a division.
const REGEX_PRECEDERS: &[u8] = b"(,=:[!&|?{};+-*%<>~^";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpanKind {
    Code,
    Comment,
    String,
    Template,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
}

/// Splits `source` into spans covering every byte, in order.
pub(crate) fn scan(source: &str) -> Vec<Span> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut code_start = 0;
    let mut last_significant: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let literal = match b {
            b'/' if next == Some(b'/') => Some((SpanKind::Comment, line_end(bytes, i))),
            b'/' if next == Some(b'*') => Some((SpanKind::Comment, block_end(bytes, i))),
            b'\'' | b'"' => Some((SpanKind::String, string_end(bytes, i, b))),
            b'`' => Some((SpanKind::Template, template_end(bytes, i))),
            b'/' if last_significant.is_none_or(|c| REGEX_PRECEDERS.contains(&c)) => {
                regex_end(bytes, i).map(|end| (SpanKind::Regex, end))
            }
            _ => None,
        };

        let Some((kind, end)) = literal else {
            if !b.is_ascii_whitespace() {
                last_significant = Some(b);
            }
            i += 1;
            continue;
        };

        if code_start < i {
            spans.push(Span {
                kind: SpanKind::Code,
                range: code_start..i,
            });
        }
        spans.push(Span { kind, range: i..end });
        if kind != SpanKind::Comment {
            last_significant = Some(b'"');
        }
        i = end;
        code_start = end;
    }

    if code_start < bytes.len() {
        spans.push(Span {
            kind: SpanKind::Code,
            range: code_start..bytes.len(),
        });
    }
    spans
}

/// Static and dynamic import specifiers: `(range inside the quotes, specifier)`.
pub(crate) fn import_specifiers(source: &str) -> Vec<(Range<usize>, String)> {
    let bytes = source.as_bytes();
    let spans = scan(source);
    let mut found = Vec::new();

    for (index, span) in spans.iter().enumerate() {
        let Span { kind, range } = span;
        if *kind != SpanKind::String || range.len() < 3 || bytes[range.end - 1] != bytes[range.start] {
            continue;
        }
        let preceded_by_keyword = index
            .checked_sub(1)
            .map(|i| &spans[i])
            .is_some_and(|prev| prev.kind == SpanKind::Code && IMPORT_KEYWORD.is_match(&source[prev.range.clone()]));
        if preceded_by_keyword {
            let inner = range.start + 1..range.end - 1;
            found.push((inner.clone(), source[inner].to_string()));
        }
    }
    found
}

/// Drops blank lines and full-line `//` comments and trims trailing whitespace.
///
/// Lines that start inside a template literal are kept, and a line whose end
/// falls inside one keeps its trailing whitespace.
pub(crate) fn compact(source: &str) -> String {
    let spans = scan(source);
    let templates: Vec<&Range<usize>> = spans
        .iter()
        .filter(|s| s.kind == SpanKind::Template)
        .map(|s| &s.range)
        .collect();
    let inside_template = |pos: usize| templates.iter().any(|r| r.start < pos && pos < r.end);
    let line_comments: HashSet<usize> = spans
        .iter()
        .filter(|s| s.kind == SpanKind::Comment && source[s.range.clone()].starts_with("//"))
        .map(|s| s.range.start)
        .collect();

    let mut out = String::with_capacity(source.len());
    let mut start = 0;
    for line in source.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let body_end = start + body.len();

        let droppable = !inside_template(start) && {
            let head = start + (body.len() - body.trim_start().len());
            head == body_end || line_comments.contains(&head)
        };
        if !droppable {
            out.push_str(if inside_template(body_end) { body } else { body.trim_end() });
            out.push('\n');
        }
        start += line.len();
    }
    out
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

fn block_end(bytes: &[u8], from: usize) -> usize {
    bytes[from + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| from + 2 + p + 2)
}

/// Unterminated strings stop before the end of their line.
fn string_end(bytes: &[u8], from: usize, quote: u8) -> usize {
    let mut j = from + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            b if b == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Braces inside `${...}` are balanced so a `` ` `` in an expression does not end the template.
fn template_end(bytes: &[u8], from: usize) -> usize {
    let mut depth = 0usize;
    let mut j = from + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'`' if depth == 0 => return j + 1,
            b'$' if depth == 0 && bytes.get(j + 1) == Some(&b'{') => {
                depth = 1;
                j += 2;
            }
            b'{' if depth > 0 => {
                depth += 1;
                j += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                j += 1;
            }
            _ => j += 1,
        }
    }
    bytes.len()
}

/// `None` when no closing `/` appears on the same line.
fn regex_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut in_class = false;
    let mut j = from + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'\n' => return None,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return Some(j + 1),
            _ => {}
        }
        j += 1;
    }
    None
}
