//! Chunk scanner for query strings
//!
//! The query language is scanned lazily: the parser asks for the next chunk
//! and says which delimiters may end it. A chunk is either one delimiter or
//! the text up to the next one. `<q>`, `</q>` and the category/concept link
//! prefixes match case-insensitively, and the prefixes only count at the
//! very start of the remaining input.

use std::fmt;
use std::ops::Range;

use tracing::trace;

/// Type alias for spans (byte offsets into the query string)
pub type Span = Range<usize>;

/// Delimiter tokens
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delim {
    OpenLink,      // [[
    CloseLink,     // ]]
    PropertySep,   // ::
    AssignSep,     // :=
    OpenSubquery,  // <q>
    CloseSubquery, // </q>
    CategoryPrefix,
    ConceptPrefix,
    DoublePipe, // ||
    Pipe,       // |
}

impl fmt::Display for Delim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delim::OpenLink => write!(f, "[["),
            Delim::CloseLink => write!(f, "]]"),
            Delim::PropertySep => write!(f, "::"),
            Delim::AssignSep => write!(f, ":="),
            Delim::OpenSubquery => write!(f, "<q>"),
            Delim::CloseSubquery => write!(f, "</q>"),
            Delim::CategoryPrefix => write!(f, "Category:"),
            Delim::ConceptPrefix => write!(f, "Concept:"),
            Delim::DoublePipe => write!(f, "||"),
            Delim::Pipe => write!(f, "|"),
        }
    }
}

/// Fixed delimiters, longer ones before their prefixes
const FIXED: [(&str, Delim); 8] = [
    ("[[", Delim::OpenLink),
    ("]]", Delim::CloseLink),
    ("::", Delim::PropertySep),
    (":=", Delim::AssignSep),
    ("<q>", Delim::OpenSubquery),
    ("</q>", Delim::CloseSubquery),
    ("||", Delim::DoublePipe),
    ("|", Delim::Pipe),
];

/// Which delimiters may end a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopSet {
    /// Every delimiter
    Default,
    /// `[[ ]] || |`, for literal values that may contain `::` or `<q>`
    ValueBody,
    /// Only `]]`, for skipping to the end of a link
    LinkEnd,
}

impl StopSet {
    fn admits(self, delim: Delim) -> bool {
        match self {
            StopSet::Default => true,
            StopSet::ValueBody => matches!(
                delim,
                Delim::OpenLink | Delim::CloseLink | Delim::DoublePipe | Delim::Pipe
            ),
            StopSet::LinkEnd => delim == Delim::CloseLink,
        }
    }
}

/// One scanned chunk
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    Delim(Delim),
    /// Trimmed text. `escaped` is set by untrimmed reads when the text was
    /// preceded by whitespace.
    Text { text: String, escaped: bool },
    /// End of input; repeats on every further read
    End,
}

impl Chunk {
    pub fn is(&self, delim: Delim) -> bool {
        matches!(self, Chunk::Delim(d) if *d == delim)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Chunk::End)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Chunk::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Whether the chunk is the literal text `s`
    pub fn is_text(&self, s: &str) -> bool {
        self.text() == Some(s)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chunk::Delim(d) => write!(f, "{}", d),
            Chunk::Text { text, .. } => write!(f, "{}", text),
            Chunk::End => Ok(()),
        }
    }
}

/// Case-insensitive prefix match; returns the byte length matched in `hay`
fn match_ci(hay: &str, needle_lower: &str) -> Option<usize> {
    let mut needle = needle_lower.chars();
    let mut pending = needle.next();
    for (idx, c) in hay.char_indices() {
        if pending.is_none() {
            return Some(idx);
        }
        for lc in c.to_lowercase() {
            match pending {
                Some(n) if n == lc => pending = needle.next(),
                _ => return None,
            }
        }
    }
    if pending.is_none() {
        Some(hay.len())
    } else {
        None
    }
}

/// Lazy chunk scanner over one query string
#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    category_prefixes: Vec<String>,
    concept_prefixes: Vec<String>,
    last_span: Span,
}

impl<'a> Scanner<'a> {
    /// `category_prefixes` and `concept_prefixes` are namespace names
    /// without the trailing colon (`"Category"`, `"Kategorie"`)
    pub fn new(input: &'a str, category_prefixes: &[String], concept_prefixes: &[String]) -> Self {
        let prepare = |names: &[String]| {
            names
                .iter()
                .map(|n| format!("{}:", n.trim().to_lowercase()))
                .collect()
        };
        Self {
            input,
            pos: 0,
            category_prefixes: prepare(category_prefixes),
            concept_prefixes: prepare(concept_prefixes),
            last_span: 0..0,
        }
    }

    /// Byte offset of the unread input
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Span of the chunk returned by the last read
    pub fn last_span(&self) -> Span {
        self.last_span.clone()
    }

    pub fn is_at_end(&self) -> bool {
        self.input[self.pos..].trim().is_empty()
    }

    /// Next chunk, trimmed
    pub fn read(&mut self, stop: StopSet) -> Chunk {
        self.scan(stop, false)
    }

    /// Next chunk, reporting whether text was preceded by whitespace
    pub fn read_untrimmed(&mut self, stop: StopSet) -> Chunk {
        self.scan(stop, true)
    }

    /// Look at the next chunk without consuming it
    pub fn peek(&mut self, stop: StopSet) -> Chunk {
        let saved = (self.pos, self.last_span.clone());
        let chunk = self.scan(stop, false);
        self.pos = saved.0;
        self.last_span = saved.1;
        chunk
    }

    fn scan(&mut self, stop: StopSet, untrimmed: bool) -> Chunk {
        let input = self.input;
        let rest = &input[self.pos..];
        if rest.trim().is_empty() {
            self.pos = self.input.len();
            self.last_span = self.pos..self.pos;
            return Chunk::End;
        }

        let chunk = match self.find_delimiter(rest, stop) {
            Some((start, len, delim)) if rest[..start].trim().is_empty() => {
                self.last_span = self.pos + start..self.pos + start + len;
                self.pos += start + len;
                Chunk::Delim(delim)
            }
            Some((start, _, _)) => self.take_text(start, untrimmed),
            None => self.take_text(rest.len(), untrimmed),
        };
        trace!(chunk = %chunk, span = ?self.last_span, "scanned chunk");
        chunk
    }

    /// Consume `len` bytes of text; the trailing whitespace stays in the
    /// input and is absorbed by the next delimiter
    fn take_text(&mut self, len: usize, untrimmed: bool) -> Chunk {
        let input = self.input;
        let raw = &input[self.pos..self.pos + len];
        let leading = raw.len() - raw.trim_start().len();
        let text = raw.trim();
        self.last_span = self.pos + leading..self.pos + leading + text.len();
        self.pos += len;
        Chunk::Text {
            text: text.to_string(),
            escaped: untrimmed && leading > 0,
        }
    }

    /// Earliest admissible delimiter in `rest`: (offset, byte length, kind)
    fn find_delimiter(&self, rest: &str, stop: StopSet) -> Option<(usize, usize, Delim)> {
        let first = rest.len() - rest.trim_start().len();
        for (idx, _) in rest.char_indices() {
            let here = &rest[idx..];
            if idx == first && stop == StopSet::Default {
                for (prefixes, delim) in [
                    (&self.category_prefixes, Delim::CategoryPrefix),
                    (&self.concept_prefixes, Delim::ConceptPrefix),
                ] {
                    if let Some(len) = prefixes.iter().find_map(|p| match_ci(here, p)) {
                        return Some((idx, len, delim));
                    }
                }
            }
            for (token, delim) in FIXED {
                if !stop.admits(delim) {
                    continue;
                }
                if let Some(len) = match_ci(here, token) {
                    return Some((idx, len, delim));
                }
            }
        }
        None
    }
}
