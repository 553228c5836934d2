//! Parser for query strings
//!
//! Recursive descent over the chunks produced by [`Scanner`]. Parsing never
//! fails: problems are recorded as [`QueryError`]s and the parser carries on
//! with a best-effort substitute (usually Thing), so callers always get a
//! description back.
//!
//! ```text
//! subquery      := conjunct (('OR' | '||') conjunct)*
//! conjunct      := (link | '<q>' subquery '</q>' | '+')*
//! link          := '[[' (classBlock | propertyBlock | articleBlock) ']]'
//! classBlock    := ('Category:' | 'Concept:') name ('||' name)*
//! propertyBlock := name ('.' name)* ('::' | ':=') value ('||' value)*
//! articleBlock  := page ('||' page)*
//! value         := '+' | '*' | '<q>' subquery '</q>' | literal
//! ```

use tracing::debug;

use crate::description::{Description, Node, QueryFeatures};
use crate::error::{ErrorKind, QueryError};
use crate::lexer::{Chunk, Delim, Scanner, StopSet};
use crate::namespace;
use crate::printrequest::PrintRequest;
use crate::schema::Schema;

/// Default limit on `<q>` nesting
pub const DEFAULT_MAX_NESTING: usize = 64;

/// Result of parsing one query string
#[derive(Clone, Debug, PartialEq)]
pub struct ParseOutcome {
    pub description: Description,
    pub errors: Vec<QueryError>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error codes in the order they were recorded
    pub fn codes(&self) -> Vec<&'static str> {
        self.errors.iter().map(QueryError::code).collect()
    }
}

/// Parser settings: schema, enabled features and default namespaces
pub struct QueryParser<'s> {
    schema: &'s dyn Schema,
    features: QueryFeatures,
    default_namespaces: Option<Description>,
    max_nesting: usize,
    category_prefixes: Vec<String>,
    concept_prefixes: Vec<String>,
}

impl<'s> QueryParser<'s> {
    pub fn new(schema: &'s dyn Schema, features: QueryFeatures) -> Self {
        Self {
            schema,
            features,
            default_namespaces: None,
            max_nesting: DEFAULT_MAX_NESTING,
            category_prefixes: schema.category_prefixes(),
            concept_prefixes: schema.concept_prefixes(),
        }
    }

    /// Restrict conditions without an explicit namespace to these
    /// namespaces. An empty list means no restriction.
    pub fn with_default_namespaces(mut self, namespaces: &[i32]) -> Self {
        self.default_namespaces = match namespaces {
            [] => None,
            [only] => Some(Description::namespace(*only)),
            many => Some(Description::disjunction(
                many.iter().copied().map(Description::namespace),
            )),
        };
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn features(&self) -> QueryFeatures {
        self.features
    }

    pub fn parse(&self, query: &str) -> ParseOutcome {
        let mut session = Session::new(self, query);
        let (result, set_ns) = session.subquery(false);

        // Nothing usable parsed: Thing, without the default restriction
        let result = match (&self.default_namespaces, set_ns, result) {
            (Some(defaults), false, Some(r)) => {
                session.add(Some(defaults.clone()), r, true)
            }
            (_, _, result) => result,
        };
        let description = result.unwrap_or_else(Description::thing);

        debug!(
            query,
            result = %description,
            errors = session.errors.len(),
            "parsed query"
        );
        ParseOutcome {
            description,
            errors: session.errors,
        }
    }
}

// ============================================================================
// Parse session
// ============================================================================

/// Words and delimiters that matter at subquery level
enum Event {
    Link,
    Open,
    Or,
    Close,
    End,
    Plus,
    Unexpected(String),
}

/// Mutable state of one parse call
struct Session<'a, 's> {
    parser: &'a QueryParser<'s>,
    source: &'a str,
    scanner: Scanner<'a>,
    /// Expected closing delimiters, innermost last
    stack: Vec<Delim>,
    /// Property links of the chains enclosing the current position
    links: usize,
    errors: Vec<QueryError>,
    unclosed_reported: bool,
}

impl<'a, 's> Session<'a, 's> {
    fn new(parser: &'a QueryParser<'s>, source: &'a str) -> Self {
        Self {
            parser,
            source,
            scanner: Scanner::new(source, &parser.category_prefixes, &parser.concept_prefixes),
            stack: Vec::new(),
            links: 0,
            errors: Vec::new(),
            unclosed_reported: false,
        }
    }

    fn schema(&self) -> &'s dyn Schema {
        self.parser.schema
    }

    fn error(&mut self, kind: ErrorKind) {
        self.errors.push(QueryError::at(kind, self.scanner.last_span()));
    }

    /// Source text of the chunk just read
    fn last_text(&self) -> &'a str {
        let source = self.source;
        &source[self.scanner.last_span()]
    }

    /// Tree depth reached so far: open subqueries plus property links
    fn nesting(&self) -> usize {
        self.stack.len() + self.links
    }

    fn defaults(&self) -> Option<Description> {
        self.parser.default_namespaces.clone()
    }

    /// Defaults for page-valued wildcards, Thing otherwise
    fn wildcard(&self, page_valued: bool) -> Description {
        match self.defaults() {
            Some(defaults) if page_valued => defaults,
            _ => Description::thing(),
        }
    }

    // ------------------------------------------------------------------------
    // Subqueries
    // ------------------------------------------------------------------------

    /// Parse up to the matching `</q>` or the end of input.
    ///
    /// Returns the description and whether default namespaces were taken
    /// care of inside. `must_set_ns` asks for defaults to be added to every
    /// conjunct without an explicit namespace.
    fn subquery(&mut self, must_set_ns: bool) -> (Option<Description>, bool) {
        let mut conjunction: Option<Description> = None;
        let mut disjuncts: Vec<Option<Description>> = Vec::new();
        let mut has_ns = false;
        let mut must_set = must_set_ns;

        'scan: loop {
            let events = match self.scanner.read(StopSet::Default) {
                Chunk::Delim(Delim::OpenLink) => vec![Event::Link],
                Chunk::Delim(Delim::OpenSubquery) => vec![Event::Open],
                Chunk::Delim(Delim::DoublePipe) => vec![Event::Or],
                Chunk::Delim(Delim::CloseSubquery) => vec![Event::Close],
                // Separator left over from rejoined parameter parts
                Chunk::Delim(Delim::Pipe) => Vec::new(),
                Chunk::End => vec![Event::End],
                Chunk::Text { text, .. } => text
                    .split_whitespace()
                    .map(|word| match word {
                        "OR" => Event::Or,
                        "+" => Event::Plus,
                        other => Event::Unexpected(other.to_string()),
                    })
                    .collect(),
                Chunk::Delim(_) => vec![Event::Unexpected(self.last_text().to_string())],
            };

            for event in events {
                match &event {
                    Event::Link => {
                        let (result, ns) = self.link();
                        if let Some(result) = result {
                            has_ns |= ns;
                            conjunction = self.add(conjunction, result, true);
                        }
                        continue;
                    }
                    Event::Open => {
                        let (result, ns) = self.nested_subquery(false);
                        if let Some(result) = result {
                            has_ns |= ns;
                            conjunction = self.add(conjunction, result, true);
                        }
                        continue;
                    }
                    Event::Plus => {
                        // `OR +` lifts the namespace restriction
                        has_ns = true;
                        conjunction = self.add(conjunction, Description::thing(), true);
                        continue;
                    }
                    Event::Unexpected(part) => {
                        self.error(ErrorKind::UnexpectedPart(part.clone()));
                        continue;
                    }
                    Event::Or | Event::Close | Event::End => {}
                }

                // A disjunct ends here
                if let Some(defaults) = self.defaults() {
                    if has_ns && !must_set {
                        must_set = true;
                        disjuncts = std::mem::take(&mut disjuncts)
                            .into_iter()
                            .map(|d| self.add(d, defaults.clone(), true))
                            .collect();
                    } else if !has_ns && must_set {
                        conjunction = self.add(conjunction, defaults, true);
                    }
                }
                disjuncts.push(conjunction.take());
                has_ns = false;

                match event {
                    Event::Close => {
                        if self.stack.last() == Some(&Delim::CloseSubquery) {
                            self.stack.pop();
                            break 'scan;
                        }
                        self.error(ErrorKind::TooManyClosing);
                        return (None, false);
                    }
                    Event::End => {
                        if !self.stack.is_empty() && !self.unclosed_reported {
                            self.unclosed_reported = true;
                            self.error(ErrorKind::NoClosingSubquery);
                        }
                        break 'scan;
                    }
                    _ => {}
                }
            }
        }

        let mut result = None;
        for disjunct in disjuncts {
            match disjunct {
                Some(d) => result = self.add(result, d, false),
                None => {
                    self.error(ErrorKind::EmptySubquery);
                    return (None, false);
                }
            }
        }
        (result.map(Description::simplified), must_set)
    }

    fn nested_subquery(&mut self, must_set_ns: bool) -> (Option<Description>, bool) {
        if self.nesting() >= self.parser.max_nesting {
            self.error(ErrorKind::NestingTooDeep(self.parser.max_nesting));
            self.skip_subquery();
            return (None, false);
        }
        let depth = self.stack.len();
        self.stack.push(Delim::CloseSubquery);
        let result = self.subquery(must_set_ns);
        self.stack.truncate(depth);
        result
    }

    /// Consume input up to the `</q>` matching an already read `<q>`
    fn skip_subquery(&mut self) {
        let mut open = 1usize;
        while open > 0 {
            match self.scanner.read(StopSet::Default) {
                Chunk::Delim(Delim::OpenSubquery) => open += 1,
                Chunk::Delim(Delim::CloseSubquery) => open -= 1,
                Chunk::End => break,
                _ => {}
            }
        }
    }

    /// Report a `<q>` inside a class or article block and skip past it and
    /// the rest of the link
    fn misplaced_subquery(&mut self) -> (Option<Description>, bool) {
        self.error(ErrorKind::MisplacedSubquery);
        self.skip_subquery();
        loop {
            let next = self.scanner.read(StopSet::LinkEnd);
            if next.is(Delim::CloseLink) || next.is_end() {
                break;
            }
        }
        (None, false)
    }

    /// Consume input up to the `]]` that closes the current link
    fn skip_link(&mut self) {
        let mut open = 1usize;
        while open > 0 {
            match self.scanner.read(StopSet::ValueBody) {
                Chunk::Delim(Delim::OpenLink) => open += 1,
                Chunk::Delim(Delim::CloseLink) => open -= 1,
                Chunk::End => {
                    self.error(ErrorKind::NoClosingBrackets);
                    break;
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------------

    /// Parse a link after its `[[`. Returns the description and whether it
    /// restricts namespaces itself.
    fn link(&mut self) -> (Option<Description>, bool) {
        match self.scanner.read_untrimmed(StopSet::Default) {
            Chunk::Delim(Delim::CategoryPrefix) => self.class_block(true),
            Chunk::Delim(Delim::ConceptPrefix) => self.class_block(false),
            Chunk::Text { text, escaped } => {
                let separator = self.scanner.peek(StopSet::Default);
                if separator.is(Delim::PropertySep) || separator.is(Delim::AssignSep) {
                    if text.starts_with(':') {
                        // `[[:Foo::bar]]` is a page whose title contains `::`
                        let rest = self.scanner.read(StopSet::ValueBody);
                        let full = format!("{}{}", text, rest);
                        self.article_block(Chunk::Text {
                            text: full,
                            escaped: false,
                        })
                    } else {
                        self.property_block(&text, escaped)
                    }
                } else {
                    self.article_block(Chunk::Text { text, escaped })
                }
            }
            other => self.article_block(other),
        }
    }

    /// `[[Category:A||B]]`, `[[Concept:C]]`
    fn class_block(&mut self, category: bool) -> (Option<Description>, bool) {
        let ns = if category {
            namespace::CATEGORY
        } else {
            namespace::CONCEPT
        };
        let mut pages = Vec::new();
        let mut any = false;
        let mut printouts = Vec::new();

        let chunk = loop {
            let chunk = self.scanner.read(StopSet::Default);
            match chunk {
                Chunk::Text { ref text, .. } if text == "+" => any = true,
                Chunk::Text { ref text, .. } if text == "*" && category => {
                    printouts.push(PrintRequest::category());
                }
                Chunk::Delim(Delim::OpenSubquery) => return self.misplaced_subquery(),
                Chunk::Text { ref text, .. } => match self.schema().page(ns, text) {
                    Some(page) => pages.push(page),
                    None => self.error(ErrorKind::InvalidValue(format!(
                        "\"{}\" is not a valid page title",
                        text
                    ))),
                },
                _ => break chunk,
            }
            let next = self.scanner.read(StopSet::Default);
            if !(category && next.is(Delim::DoublePipe)) {
                break next;
            }
        };

        let result = if any {
            Some(Description::thing())
        } else if category {
            Description::class(pages)
        } else {
            pages.into_iter().next().map(Description::concept)
        };
        let result = match result {
            None if !printouts.is_empty() => Some(Description::thing()),
            other => other,
        }
        .map(|d| d.with_print_requests(printouts));

        self.finish_link(chunk, false, result)
    }

    /// `[[Page]]`, `[[:Category:Foo||Bar]]`, `[[Help:+]]`, `[[~Foo*]]`
    fn article_block(&mut self, first: Chunk) -> (Option<Description>, bool) {
        let mut result: Option<Description> = None;
        let mut chunk = first;
        loop {
            let text = match &chunk {
                Chunk::Text { text, .. } => text.clone(),
                Chunk::Delim(Delim::OpenSubquery) => return self.misplaced_subquery(),
                _ => break,
            };
            if let Some(d) = self.article_atom(&text) {
                result = self.add(result, d, false);
            }
            chunk = self.scanner.read(StopSet::ValueBody);
            if chunk.is(Delim::DoublePipe) {
                chunk = self.scanner.read(StopSet::ValueBody);
            } else {
                break;
            }
        }
        let (result, ns) = self.finish_link(chunk, true, result);
        (result.map(Description::simplified), ns)
    }

    /// One page or namespace wildcard
    fn article_atom(&mut self, text: &str) -> Option<Description> {
        let parts: Vec<&str> = text.splitn(3, ':').collect();
        let parts = match parts.as_slice() {
            ["", rest @ ..] if parts.len() == 3 => rest,
            all => all,
        };
        if let [ns_name, wildcard] = parts {
            if wildcard.trim() != "+" {
                return self.page_atom(text);
            }
            return match self.schema().namespace_index(ns_name) {
                Some(idx) => Some(Description::namespace(idx)),
                None => {
                    self.error(ErrorKind::UnexpectedPart(text.to_string()));
                    None
                }
            };
        }
        self.page_atom(text)
    }

    fn page_atom(&mut self, text: &str) -> Option<Description> {
        match self.schema().value_description(None, text) {
            Ok(d) => Some(d),
            Err(msg) => {
                self.error(ErrorKind::InvalidValue(msg));
                None
            }
        }
    }

    /// `[[A.B::v1||v2]]`
    fn property_block(&mut self, name: &str, escaped: bool) -> (Option<Description>, bool) {
        // the `::` or `:=`
        self.scanner.read(StopSet::Default);

        let labels: Vec<&str> = if escaped {
            vec![name]
        } else {
            name.split('.').collect()
        };
        if self.nesting() + labels.len() > self.parser.max_nesting {
            self.error(ErrorKind::NestingTooDeep(self.parser.max_nesting));
            self.skip_link();
            return (Some(Description::thing()), false);
        }
        let mut chain = Vec::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            match self.schema().property(label) {
                Ok(property) if i + 1 < labels.len() && !property.is_page_valued() => {
                    self.error(ErrorKind::ValueSubquery(property.label()));
                    self.skip_link();
                    return (Some(Description::thing()), false);
                }
                Ok(property) => chain.push(property),
                Err(reason) => {
                    self.error(ErrorKind::InvalidProperty {
                        name: label.trim().to_string(),
                        reason,
                    });
                    self.skip_link();
                    return (Some(Description::thing()), false);
                }
            }
        }
        let Some(property) = chain.last().cloned() else {
            self.skip_link();
            return (None, false);
        };
        let page_valued = property.is_page_valued();

        self.links += chain.len();
        let mut inner: Option<Description> = None;
        let mut printouts = Vec::new();
        let chunk = loop {
            let chunk = self.scanner.read(StopSet::Default);
            let chunk = match chunk {
                Chunk::Text { ref text, .. } if text == "+" => {
                    let wildcard = self.wildcard(page_valued);
                    inner = self.add(inner, wildcard, false);
                    self.scanner.read(StopSet::Default)
                }
                Chunk::Text { ref text, .. } if text == "*" => {
                    printouts.push(PrintRequest::property(property.clone()));
                    inner = self.add(inner, Description::thing(), false);
                    self.scanner.read(StopSet::Default)
                }
                Chunk::Delim(Delim::OpenSubquery) => {
                    if page_valued {
                        let (sub, _) = self.nested_subquery(true);
                        if let Some(sub) = sub {
                            inner = self.add(inner, sub, false);
                        }
                    } else {
                        self.error(ErrorKind::ValueSubquery(property.label()));
                        self.skip_subquery();
                        inner = self.add(inner, Description::thing(), false);
                    }
                    self.scanner.read(StopSet::Default)
                }
                Chunk::Delim(Delim::CloseLink | Delim::DoublePipe | Delim::Pipe) | Chunk::End => {
                    chunk
                }
                ref value => {
                    let (literal, next) = self.read_value(value);
                    match self.schema().value_description(Some(&property), &literal) {
                        Ok(d) => inner = self.add(inner, d, false),
                        Err(msg) => {
                            self.error(ErrorKind::InvalidValue(msg));
                            inner = self.add(inner, Description::thing(), false);
                        }
                    }
                    next
                }
            };
            if !chunk.is(Delim::DoublePipe) {
                break chunk;
            }
        };
        self.links -= chain.len();

        let mut result = match inner {
            Some(d) => d.simplified(),
            None => {
                self.error(ErrorKind::PropertyValueProblem(property.label()));
                self.wildcard(page_valued)
            }
        };
        for p in chain.into_iter().rev() {
            result = Description::some_property(p, result);
        }
        let result = result.with_print_requests(printouts);
        self.finish_link(chunk, false, Some(result))
    }

    /// Read a literal value that may itself contain `[[...]]`. Returns the
    /// literal and the chunk that ended it.
    fn read_value(&mut self, first: &Chunk) -> (String, Chunk) {
        let source = self.source;
        let start = self.scanner.last_span().start;
        let mut end = self.scanner.last_span().end;
        let mut open = if first.is(Delim::OpenLink) { 2 } else { 1 };

        loop {
            let chunk = self.scanner.read(StopSet::ValueBody);
            match &chunk {
                Chunk::Delim(Delim::OpenLink) => open += 1,
                Chunk::Delim(Delim::CloseLink) => open -= 1,
                Chunk::Delim(Delim::Pipe | Delim::DoublePipe) if open == 1 => open = 0,
                Chunk::End => return (source[start..end].trim().to_string(), chunk),
                _ => {}
            }
            if open == 0 {
                return (source[start..end].trim().to_string(), chunk);
            }
            end = self.scanner.last_span().end;
        }
    }

    /// Check the chunk that should close a link and recover if it does not
    fn finish_link(
        &mut self,
        chunk: Chunk,
        has_ns: bool,
        result: Option<Description>,
    ) -> (Option<Description>, bool) {
        if result.is_none() {
            self.error(ErrorKind::BadQueryAtom);
        }

        let mut chunk = chunk;
        if chunk.is(Delim::Pipe) {
            // `[[Page|label]]` link labels have no meaning in queries
            let mut label = "|".to_string();
            chunk = self.scanner.read(StopSet::LinkEnd);
            if !chunk.is(Delim::CloseLink) {
                label.push_str(&chunk.to_string());
                chunk = self.scanner.read(StopSet::LinkEnd);
            }
            self.error(ErrorKind::UnexpectedPart(label));
        }

        if !chunk.is(Delim::CloseLink) {
            if !chunk.is_end() {
                self.error(ErrorKind::MisplacedSymbol(chunk.to_string()));
                chunk = self.scanner.read(StopSet::LinkEnd);
                if !chunk.is(Delim::CloseLink) {
                    chunk = self.scanner.read(StopSet::LinkEnd);
                }
            }
            if chunk.is_end() {
                self.error(ErrorKind::NoClosingBrackets);
            }
        }

        (result, has_ns)
    }

    // ------------------------------------------------------------------------
    // Combining
    // ------------------------------------------------------------------------

    /// Combine `new` into `current`, checking enabled features first. A
    /// disallowed description is reported and dropped.
    fn add(
        &mut self,
        current: Option<Description>,
        new: Description,
        conjunction: bool,
    ) -> Option<Description> {
        let features = self.parser.features;
        let own = new.own_feature();
        if own != QueryFeatures::NAMESPACE && !features.contains(own) {
            self.error(ErrorKind::FeatureNotAllowed {
                feature: own,
                fragment: new.to_query_string(false),
            });
            return current;
        }

        let Some(mut current) = current else {
            return Some(new);
        };

        if conjunction {
            if new.is_thing() {
                let mut new = new;
                current.extend_print_requests(new.take_print_requests());
                return Some(current);
            }
            if current.is_thing() {
                let mut requests = current.take_print_requests();
                let mut new = new;
                requests.extend(new.take_print_requests());
                return Some(new.with_print_requests(requests));
            }
            match current.add_conjunct(new) {
                Ok(()) => Some(current),
                Err(new) if features.contains(QueryFeatures::CONJUNCTION) => {
                    Some(Description::conjunction([current, new]))
                }
                Err(new) => {
                    self.error(ErrorKind::FeatureNotAllowed {
                        feature: QueryFeatures::CONJUNCTION,
                        fragment: new.to_query_string(false),
                    });
                    Some(current)
                }
            }
        } else {
            if !features.contains(QueryFeatures::DISJUNCTION)
                && !matches!(current.node(), Node::Disjunction(_))
            {
                self.error(ErrorKind::FeatureNotAllowed {
                    feature: QueryFeatures::DISJUNCTION,
                    fragment: new.to_query_string(false),
                });
                return Some(current);
            }
            if new.is_thing() || current.is_thing() {
                // Thing absorbs every other disjunct
                let mut new = new;
                let mut requests = current.take_print_requests();
                requests.extend(new.take_print_requests());
                return Some(Description::thing().with_print_requests(requests));
            }
            match current.add_disjunct(new) {
                Ok(()) => Some(current),
                Err(new) => Some(Description::disjunction([current, new])),
            }
        }
    }
}
