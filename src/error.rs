//! Error types for askql
//!
//! Query errors are values: the parser and the query object accumulate them
//! next to a best-effort result. Each kind has a stable code for callers
//! that render their own (localized) messages; the English `Display` text
//! and the ariadne rendering are for the CLI and logs.

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::description::QueryFeatures;
use crate::lexer::Span;

/// What went wrong in a query
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("there are more closing </q> than opening <q>")]
    TooManyClosing,

    #[error("the part \"{0}\" of the query was not understood")]
    UnexpectedPart(String),

    #[error("the symbol \"{0}\" was used where it is not useful")]
    MisplacedSymbol(String),

    #[error("some use of [[ in the query was not closed by ]]")]
    NoClosingBrackets,

    #[error("some use of <q> in the query was not closed by </q>")]
    NoClosingSubquery,

    #[error("subqueries cannot be used inside category or page conditions")]
    MisplacedSubquery,

    #[error("some part of the query was not understood")]
    BadQueryAtom,

    #[error("some subquery has no valid condition")]
    EmptySubquery,

    /// A subquery or chain continued through a property whose values are
    /// not pages
    #[error("\"{0}\" does not have pages as values, so it cannot take a subquery")]
    ValueSubquery(String),

    #[error("\"{name}\" is not a valid property: {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error("no usable value was given for property \"{0}\"")]
    PropertyValueProblem(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("the condition \"{fragment}\" uses {feature} queries, which are disabled here")]
    FeatureNotAllowed {
        feature: QueryFeatures,
        fragment: String,
    },

    #[error("subqueries are nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error(
        "the query was too large or too deep, so these conditions were dropped: {}",
        .0.join(", ")
    )]
    QueryTooLarge(Vec<String>),

    #[error("invalid print statement: {0}")]
    InvalidPrintout(String),
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::TooManyClosing => "too-many-closing",
            ErrorKind::UnexpectedPart(_) => "unexpected-part",
            ErrorKind::MisplacedSymbol(_) => "misplaced-symbol",
            ErrorKind::NoClosingBrackets => "no-closing-brackets",
            ErrorKind::NoClosingSubquery => "no-closing-subquery",
            ErrorKind::MisplacedSubquery => "misplaced-subquery",
            ErrorKind::BadQueryAtom => "bad-query-atom",
            ErrorKind::EmptySubquery => "empty-subquery",
            ErrorKind::ValueSubquery(_) => "invalid-subquery-on-non-page-property",
            ErrorKind::InvalidProperty { .. } => "invalid-property",
            ErrorKind::PropertyValueProblem(_) => "property-value-problem",
            ErrorKind::InvalidValue(_) => "invalid-value",
            ErrorKind::FeatureNotAllowed { .. } => "feature-not-allowed",
            ErrorKind::NestingTooDeep(_) => "nesting-too-deep",
            ErrorKind::QueryTooLarge(_) => "query-too-large",
            ErrorKind::InvalidPrintout(_) => "invalid-printout",
        }
    }
}

/// An accumulated query error, with the byte span it refers to if known
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{kind}")]
pub struct QueryError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
}

impl QueryError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<ErrorKind> for QueryError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Format query errors into a user-friendly string
pub fn format_query_errors(source: &str, errors: &[QueryError]) -> String {
    let mut output = Vec::new();

    for error in errors {
        // Errors without a position point at the whole query
        let span = error
            .span
            .clone()
            .map(|s| s.start.min(source.len())..s.end.min(source.len()))
            .unwrap_or(0..source.len());

        let report = Report::build(ReportKind::Error, (), span.start)
            .with_code(error.code())
            .with_message("Query error")
            .with_label(
                Label::new(span)
                    .with_message(error.to_string())
                    .with_color(Color::Red),
            );

        report
            .finish()
            .write(Source::from(source), &mut output)
            .expect("Failed to write error report");
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}
