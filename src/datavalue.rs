//! Typed values that appear inside query conditions
//!
//! Pages, properties, data items and the comparators that prefix a literal
//! in value position (`>2020`, `~Foo*`, `!Bar`).

use std::fmt;

use chumsky::prelude::*;
use serde::{Deserialize, Serialize};

use crate::namespace;

// ============================================================================
// Titles and pages
// ============================================================================

/// Characters that can never appear in a page title
const ILLEGAL_TITLE_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}'];

/// Normalize a title the way the wiki does: underscores become spaces,
/// whitespace runs collapse, and the first letter is uppercased.
///
/// Returns `None` for empty titles or titles with illegal characters.
pub fn normalize_title(text: &str) -> Option<String> {
    let spaced = text.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.contains(ILLEGAL_TITLE_CHARS) {
        return None;
    }
    let mut chars = collapsed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// A reference to a wiki page (an entity)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageRef {
    pub namespace: i32,
    pub title: String,
}

impl PageRef {
    /// Build a page from a namespace and unnormalized title text
    pub fn new(namespace: i32, title: &str) -> Option<Self> {
        normalize_title(title).map(|title| Self { namespace, title })
    }

    /// Parse `Title`, `Ns:Title` or `:Ns:Title`. A prefix only counts as a
    /// namespace when `namespace_of` recognizes it; otherwise the colon is
    /// part of a main-namespace title.
    pub fn parse(text: &str, namespace_of: impl Fn(&str) -> Option<i32>) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_prefix(':').unwrap_or(text);
        if let Some((prefix, rest)) = text.split_once(':') {
            if !prefix.trim().is_empty() {
                if let Some(ns) = namespace_of(prefix) {
                    return Self::new(ns, rest);
                }
            }
        }
        Self::new(namespace::MAIN, text)
    }

    /// `Ns:Title`, or just `Title` in the main namespace
    pub fn prefixed_text(&self) -> String {
        if self.namespace == namespace::MAIN {
            self.title.clone()
        } else {
            format!("{}:{}", namespace::display_name(self.namespace), self.title)
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefixed_text())
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Declared value type of a property
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    #[serde(rename = "_wpg")]
    Page,
    #[serde(rename = "_txt")]
    Text,
    #[serde(rename = "_num")]
    Number,
    #[serde(rename = "_boo")]
    Boolean,
    #[serde(rename = "_uri")]
    Url,
}

/// A resolved property. Inverse properties (`-Label`) relate a value page
/// back to its subjects, so their values are always pages.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    name: String,
    data_type: DataType,
    inverse: bool,
}

impl PropertyRef {
    /// The name is normalized like a title; callers validate it first.
    pub fn new(name: &str, data_type: DataType) -> Self {
        let name = normalize_title(name).unwrap_or_else(|| name.trim().to_string());
        Self {
            name,
            data_type,
            inverse: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    /// Name without the inverse marker
    pub fn name(&self) -> &str {
        &self.name
    }

    /// User-facing label, `-Name` for inverse properties
    pub fn label(&self) -> String {
        if self.inverse {
            format!("-{}", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Type of the values a condition on this property compares against
    pub fn value_type(&self) -> DataType {
        if self.inverse {
            DataType::Page
        } else {
            self.data_type
        }
    }

    /// Whether values are pages, i.e. whether subqueries and chains may
    /// continue through this property
    pub fn is_page_valued(&self) -> bool {
        self.value_type() == DataType::Page
    }
}

// ============================================================================
// Data items
// ============================================================================

/// A typed value
#[derive(Clone, Debug, PartialEq)]
pub enum DataItem {
    Page(PageRef),
    Text(String),
    Number(f64),
    Boolean(bool),
    Uri(String),
}

impl DataItem {
    /// Parse literal text as a value of the given type
    pub fn parse(
        data_type: DataType,
        text: &str,
        namespace_of: impl Fn(&str) -> Option<i32>,
    ) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty value".to_string());
        }
        match data_type {
            DataType::Page => PageRef::parse(text, namespace_of)
                .map(DataItem::Page)
                .ok_or_else(|| format!("\"{}\" is not a valid page title", text)),
            DataType::Text => Ok(DataItem::Text(text.to_string())),
            DataType::Number => {
                let cleaned: String = text.chars().filter(|c| *c != ',' && *c != ' ').collect();
                match cleaned.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(DataItem::Number(n)),
                    _ => Err(format!("\"{}\" is not a number", text)),
                }
            }
            DataType::Boolean => match text.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(DataItem::Boolean(true)),
                "false" | "no" | "off" | "0" => Ok(DataItem::Boolean(false)),
                _ => Err(format!("\"{}\" is not a boolean", text)),
            },
            DataType::Url => {
                if text.contains(char::is_whitespace) {
                    Err(format!("\"{}\" contains whitespace", text))
                } else if text.contains("://") || text.starts_with("mailto:") {
                    Ok(DataItem::Uri(text.to_string()))
                } else {
                    Err(format!("\"{}\" is not a URL", text))
                }
            }
        }
    }

    /// Text form accepted back by [`DataItem::parse`]
    pub fn wiki_value(&self) -> String {
        match self {
            DataItem::Page(page) => page.prefixed_text(),
            DataItem::Text(s) | DataItem::Uri(s) => s.clone(),
            DataItem::Number(n) => n.to_string(),
            DataItem::Boolean(b) => b.to_string(),
        }
    }
}

// ============================================================================
// Comparators
// ============================================================================

/// How a value condition compares against stored values
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Comparator {
    #[default]
    Equal,
    LessOrEqual,
    GreaterOrEqual,
    NotEqual,
    Like,
    NotLike,
    Less,
    Greater,
}

impl Comparator {
    /// Prefix used when serializing a literal
    pub fn prefix(self) -> &'static str {
        match self {
            Comparator::Equal => "",
            Comparator::LessOrEqual => "<",
            Comparator::GreaterOrEqual => ">",
            Comparator::NotEqual => "!",
            Comparator::Like => "~",
            Comparator::NotLike => "!~",
            Comparator::Less => "<<",
            Comparator::Greater => ">>",
        }
    }
}

/// Longest prefixes first, so `!~` is not read as `!` followed by `~`
fn comparator() -> impl Parser<char, Comparator, Error = Simple<char>> {
    choice((
        just("!~").to(Comparator::NotLike),
        just("<<").to(Comparator::Less),
        just(">>").to(Comparator::Greater),
        just('≤').to(Comparator::LessOrEqual),
        just('≥').to(Comparator::GreaterOrEqual),
        just('<').to(Comparator::LessOrEqual),
        just('>').to(Comparator::GreaterOrEqual),
        just('!').to(Comparator::NotEqual),
        just('~').to(Comparator::Like),
    ))
}

fn comparator_literal() -> impl Parser<char, (Comparator, String), Error = Simple<char>> {
    comparator()
        .or_not()
        .map(Option::unwrap_or_default)
        .then(any().repeated().collect::<String>())
        .then_ignore(end())
}

/// Split a literal into its comparator and the (trimmed) value text
pub fn split_comparator(literal: &str) -> (Comparator, String) {
    let literal = literal.trim();
    comparator_literal()
        .parse(literal)
        .map(|(cmp, rest)| (cmp, rest.trim().to_string()))
        .unwrap_or_else(|_| (Comparator::Equal, literal.to_string()))
}
