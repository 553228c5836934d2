//! Unit tests for the chunk scanner

use askql::lexer::{Chunk, Delim, Scanner, StopSet};

fn scanner(input: &str) -> Scanner<'_> {
    Scanner::new(input, &["Category".to_string()], &["Concept".to_string()])
}

fn text(s: &str) -> Chunk {
    Chunk::Text {
        text: s.to_string(),
        escaped: false,
    }
}

fn read_all(input: &str) -> Vec<Chunk> {
    let mut s = scanner(input);
    let mut chunks = Vec::new();
    loop {
        let chunk = s.read(StopSet::Default);
        if chunk.is_end() {
            break;
        }
        chunks.push(chunk);
    }
    chunks
}

// ============================================================================
// Default stop set
// ============================================================================

#[test]
fn test_scan_query() {
    let chunks = read_all("[[Category:A||B]] OR <q>[[Bar::x]]</q>");
    assert_eq!(
        chunks,
        vec![
            Chunk::Delim(Delim::OpenLink),
            Chunk::Delim(Delim::CategoryPrefix),
            text("A"),
            Chunk::Delim(Delim::DoublePipe),
            text("B"),
            Chunk::Delim(Delim::CloseLink),
            text("OR"),
            Chunk::Delim(Delim::OpenSubquery),
            Chunk::Delim(Delim::OpenLink),
            text("Bar"),
            Chunk::Delim(Delim::PropertySep),
            text("x"),
            Chunk::Delim(Delim::CloseLink),
            Chunk::Delim(Delim::CloseSubquery),
        ]
    );
}

#[test]
fn test_assign_and_pipe() {
    let chunks = read_all("[[Bar:=x|label]]");
    assert_eq!(
        chunks,
        vec![
            Chunk::Delim(Delim::OpenLink),
            text("Bar"),
            Chunk::Delim(Delim::AssignSep),
            text("x"),
            Chunk::Delim(Delim::Pipe),
            text("label"),
            Chunk::Delim(Delim::CloseLink),
        ]
    );
}

#[test]
fn test_subquery_delimiters_ignore_case() {
    let chunks = read_all("<Q>+</Q>");
    assert_eq!(
        chunks,
        vec![
            Chunk::Delim(Delim::OpenSubquery),
            text("+"),
            Chunk::Delim(Delim::CloseSubquery),
        ]
    );
}

#[test]
fn test_concept_prefix() {
    let chunks = read_all("[[concept:Big cities]]");
    assert_eq!(chunks[1], Chunk::Delim(Delim::ConceptPrefix));
    assert_eq!(chunks[2], text("Big cities"));
}

#[test]
fn test_localized_prefix() {
    let mut s = Scanner::new(
        "Kategorie:Stadt",
        &["Category".to_string(), "Kategorie".to_string()],
        &[],
    );
    assert!(s.read(StopSet::Default).is(Delim::CategoryPrefix));
    assert!(s.read(StopSet::Default).is_text("Stadt"));
}

#[test]
fn test_prefix_not_recognized_mid_text() {
    // A prefix only counts at the start of the remaining input
    let chunks = read_all("Foo Category:Bar]]");
    assert_eq!(chunks[0], text("Foo Category:Bar"));
}

// ============================================================================
// Other stop sets
// ============================================================================

#[test]
fn test_value_body_keeps_separators() {
    let mut s = scanner("a::b<q>c</q>]]");
    assert_eq!(s.read(StopSet::ValueBody), text("a::b<q>c</q>"));
    assert!(s.read(StopSet::ValueBody).is(Delim::CloseLink));
}

#[test]
fn test_value_body_stops_at_pipes() {
    let mut s = scanner("x||y|z");
    assert_eq!(s.read(StopSet::ValueBody), text("x"));
    assert!(s.read(StopSet::ValueBody).is(Delim::DoublePipe));
    assert_eq!(s.read(StopSet::ValueBody), text("y"));
    assert!(s.read(StopSet::ValueBody).is(Delim::Pipe));
}

#[test]
fn test_link_end_only_stops_at_brackets() {
    let mut s = scanner("a||b|c::d]] rest");
    assert_eq!(s.read(StopSet::LinkEnd), text("a||b|c::d"));
    assert!(s.read(StopSet::LinkEnd).is(Delim::CloseLink));
    assert_eq!(s.read(StopSet::LinkEnd), text("rest"));
}

// ============================================================================
// Cursor behavior
// ============================================================================

#[test]
fn test_untrimmed_read_reports_escape() {
    let mut s = scanner(" A.B::X");
    assert_eq!(
        s.read_untrimmed(StopSet::Default),
        Chunk::Text {
            text: "A.B".to_string(),
            escaped: true,
        }
    );

    let mut s = scanner(" A.B::X");
    assert_eq!(s.read(StopSet::Default), text("A.B"));

    let mut s = scanner("A.B::X");
    assert_eq!(s.read_untrimmed(StopSet::Default), text("A.B"));
}

#[test]
fn test_peek_does_not_consume() {
    let mut s = scanner("Bar::x");
    assert_eq!(s.peek(StopSet::Default), text("Bar"));
    assert_eq!(s.position(), 0);
    assert_eq!(s.read(StopSet::Default), text("Bar"));
    assert!(s.peek(StopSet::Default).is(Delim::PropertySep));
    assert!(s.read(StopSet::Default).is(Delim::PropertySep));
}

#[test]
fn test_spans() {
    let mut s = scanner("[[ Foo ]]");
    s.read(StopSet::Default);
    assert_eq!(s.last_span(), 0..2);
    s.read(StopSet::Default);
    assert_eq!(s.last_span(), 3..6);
    s.read(StopSet::Default);
    assert_eq!(s.last_span(), 7..9);
    assert!(s.is_at_end());
}

#[test]
fn test_end_repeats() {
    let mut s = scanner("[[");
    assert!(s.read(StopSet::Default).is(Delim::OpenLink));
    assert!(s.read(StopSet::Default).is_end());
    assert!(s.read(StopSet::Default).is_end());
    assert!(s.peek(StopSet::Default).is_end());
}

#[test]
fn test_chunk_display() {
    assert_eq!(Chunk::Delim(Delim::DoublePipe).to_string(), "||");
    assert_eq!(text("Foo").to_string(), "Foo");
    assert_eq!(Chunk::End.to_string(), "");
}
