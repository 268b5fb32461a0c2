//! Lexical rewriting of short-form cross-references.
//!
//! Inside its own container, `#12` means "issue 12 of this container" and
//! `!3` means "merge request 3 of this container". Once the text moves to a
//! different container those tokens would resolve against the wrong place,
//! so every *bare* token is prefixed with the source container's full path:
//! `!3` becomes `acme/api!3`.
//!
//! # Token grammar
//!
//! ```text
//! token   = sigil digit+
//! sigil   = "#" | "!" | "$" | "%"
//! ```
//!
//! - A token is **bare** when the byte before the sigil is absent or is not a
//!   path byte (`[A-Za-z0-9_./-]`) and is not `&` (HTML entities like `&#39;`).
//!   A token preceded by a path byte is already qualified (`other/proj#4`).
//! - The digit run must end at end of text or at a byte that is neither
//!   alphanumeric nor `_`; `#12abc` is not a token.
//! - Inline code spans and fenced code blocks are copied verbatim.
//!
//! The rewrite is purely textual. Referenced entities are never looked up, so
//! a dangling reference stays dangling. Because the inserted prefix consists
//! of path bytes only, rewriting already-rewritten text changes nothing.

use crate::model::container::Container;

/// What a reference sigil points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Issue,
    MergeRequest,
    Snippet,
    Milestone,
}

impl ReferenceKind {
    const fn from_sigil(byte: u8) -> Option<Self> {
        match byte {
            b'#' => Some(Self::Issue),
            b'!' => Some(Self::MergeRequest),
            b'$' => Some(Self::Snippet),
            b'%' => Some(Self::Milestone),
            _ => None,
        }
    }

    /// The sigil character for this kind.
    #[must_use]
    pub const fn sigil(self) -> char {
        match self {
            Self::Issue => '#',
            Self::MergeRequest => '!',
            Self::Snippet => '$',
            Self::Milestone => '%',
        }
    }
}

/// A bare token found in content, as byte offsets into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BareReference {
    pub kind: ReferenceKind,
    /// Offset of the sigil.
    pub start: usize,
    /// Offset one past the last digit.
    pub end: usize,
}

/// Rewrite bare references in `content` so they resolve back to `source`.
#[must_use]
pub fn rewrite(content: &str, source: &Container) -> String {
    rewrite_with_prefix(content, &source.full_path())
}

/// Rewrite bare references using an explicit container prefix.
///
/// Idempotence only holds when `prefix` is itself made of path bytes, which
/// is guaranteed for [`Container::full_path`].
#[must_use]
pub fn rewrite_with_prefix(content: &str, prefix: &str) -> String {
    let tokens = scan(content);
    if tokens.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + tokens.len() * prefix.len());
    let mut last = 0;
    for token in &tokens {
        out.push_str(&content[last..token.start]);
        out.push_str(prefix);
        out.push_str(&content[token.start..token.end]);
        last = token.end;
    }
    out.push_str(&content[last..]);
    out
}

/// Whether [`rewrite`] would change `content`.
#[must_use]
pub fn has_bare_references(content: &str) -> bool {
    !scan(content).is_empty()
}

/// Find every bare reference token in `content`.
#[must_use]
pub fn scan(content: &str) -> Vec<BareReference> {
    let mut found = Vec::new();
    let mut fence: Option<&'static str> = None;
    let mut base = 0;

    for line in content.split_inclusive('\n') {
        let marker = fence_marker(line);
        match (fence, marker) {
            (None, Some(open)) => fence = Some(open),
            (Some(open), Some(close)) if open == close => fence = None,
            (None, None) => scan_line(line.as_bytes(), base, &mut found),
            _ => {}
        }
        base += line.len();
    }

    found
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn scan_line(bytes: &[u8], base: usize, found: &mut Vec<BareReference>) {
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];

        if byte == b'`' {
            let run = run_length(bytes, i, b'`');
            i = closing_backticks(bytes, i + run, run).unwrap_or(i + run);
            continue;
        }

        let Some(kind) = ReferenceKind::from_sigil(byte) else {
            i += 1;
            continue;
        };

        let digits = run_while(bytes, i + 1, |b| b.is_ascii_digit());
        let end = i + 1 + digits;
        let terminated = bytes.get(end).is_none_or(|&b| !is_word_byte(b));
        let bare = i == 0 || is_boundary_byte(bytes[i - 1]);

        if digits > 0 && terminated && bare {
            found.push(BareReference {
                kind,
                start: base + i,
                end: base + end,
            });
            i = end;
        } else {
            i += 1;
        }
    }
}

/// Offset just past a closing run of exactly `len` backticks, if any.
fn closing_backticks(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = run_length(bytes, i, b'`');
            if run == len {
                return Some(i + run);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

fn run_length(bytes: &[u8], from: usize, byte: u8) -> usize {
    run_while(bytes, from, |b| b == byte)
}

fn run_while(bytes: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> usize {
    bytes
        .get(from..)
        .map_or(0, |rest| rest.iter().take_while(|&&b| pred(b)).count())
}

const fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

const fn is_path_byte(byte: u8) -> bool {
    is_word_byte(byte) || matches!(byte, b'.' | b'/' | b'-')
}

const fn is_boundary_byte(byte: u8) -> bool {
    !is_path_byte(byte) && byte != b'&'
}
