//! The query object
//!
//! A [`Query`] owns one root description together with the parameters an
//! execution backend needs. Every time the description changes it is pruned
//! against the ceilings of its context (inline, special page or concept),
//! and everything cut is reported as one `query-too-large` error.
//!
//! The serializable form and the content hash derived from it are a wire
//! contract: field names and their encoding must stay stable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::datavalue::PageRef;
use crate::description::{AlgebraConfig, Description};
use crate::error::{ErrorKind, QueryError};
use crate::printrequest::PrintRequest;
use crate::prune::Budget;

/// Prefix of query ids
pub const QUERY_ID_PREFIX: &str = "_QUERY";

/// What a backend should compute
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QueryMode {
    /// Matching entities
    #[default]
    Instances,
    /// Only the number of matches
    Count,
    /// Backend diagnostics
    Debug,
    /// Nothing; used for "further results" placeholders
    None,
}

impl QueryMode {
    /// Wire value
    pub fn code(self) -> u8 {
        match self {
            QueryMode::Instances => 1,
            QueryMode::Count => 2,
            QueryMode::Debug => 3,
            QueryMode::None => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
    Random,
}

/// Query parameters in the serializable form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedParameters {
    pub limit: usize,
    pub offset: usize,
    pub sortkeys: IndexMap<String, SortDirection>,
    pub mainlabel: String,
    pub querymode: u8,
}

/// `{conditions, parameters, printouts}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableQuery {
    pub conditions: String,
    pub parameters: SerializedParameters,
    pub printouts: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Query {
    description: Option<Description>,
    query_string: Option<String>,
    inline: bool,
    concept: bool,
    limit: usize,
    offset: usize,
    mode: QueryMode,
    sort_keys: IndexMap<String, SortDirection>,
    main_label: String,
    subject: Option<PageRef>,
    extra_printouts: Vec<PrintRequest>,
    errors: Vec<QueryError>,
    max_limit: usize,
    max_inline_limit: usize,
    ceilings: Budget,
    algebra: AlgebraConfig,
}

impl Query {
    /// A query in the given context. The limit starts at the context
    /// maximum and `description` is pruned right away.
    pub fn new(
        description: Option<Description>,
        inline: bool,
        concept: bool,
        config: &QueryConfig,
    ) -> Self {
        let mut query = Self {
            description: None,
            query_string: None,
            inline,
            concept,
            limit: if inline {
                config.max_inline_limit
            } else {
                config.max_limit
            },
            offset: 0,
            mode: QueryMode::default(),
            sort_keys: IndexMap::new(),
            main_label: String::new(),
            subject: None,
            extra_printouts: Vec::new(),
            errors: Vec::new(),
            max_limit: config.max_limit,
            max_inline_limit: config.max_inline_limit,
            ceilings: config.ceilings(concept),
            algebra: config.algebra(),
        };
        if let Some(description) = description {
            query.set_description(description);
        }
        query
    }

    // ------------------------------------------------------------------------
    // Description
    // ------------------------------------------------------------------------

    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    /// The description a backend runs.
    ///
    /// # Panics
    ///
    /// Panics if no description was set; asking for results of such a
    /// query is a caller bug.
    pub fn resolved_description(&self) -> &Description {
        match &self.description {
            Some(d) => d,
            None => panic!("query has no description to run"),
        }
    }

    /// Replace the root description. Clears the raw query string,
    /// re-attaches the extra printouts and applies the ceilings.
    pub fn set_description(&mut self, description: Description) {
        let mut description = description;
        for printout in &self.extra_printouts {
            if !description.print_requests().contains(printout) {
                description.add_print_request(printout.clone());
            }
        }
        self.description = Some(description);
        self.query_string = None;
        self.apply_restrictions();
    }

    /// Raw query text reported as `conditions` until the description is
    /// replaced
    pub fn set_query_string(&mut self, query_string: Option<String>) {
        self.query_string = query_string;
    }

    /// The `conditions` string
    pub fn query_string(&self) -> String {
        match (&self.query_string, &self.description) {
            (Some(raw), _) => raw.clone(),
            (None, Some(d)) => d.to_query_string(false),
            (None, None) => String::new(),
        }
    }

    /// Prune the description against the context ceilings
    fn apply_restrictions(&mut self) {
        let Some(description) = &self.description else {
            return;
        };
        if description.size(&self.algebra) <= self.ceilings.size
            && description.depth() <= self.ceilings.depth
        {
            return;
        }
        let pruned = description.prune(self.ceilings, &self.algebra);
        debug!(
            before = %description,
            after = %pruned.description,
            "pruned query description"
        );
        if !pruned.log.is_empty() {
            warn!(
                discarded = %pruned.log.join(", "),
                max_size = self.ceilings.size,
                max_depth = self.ceilings.depth,
                "query exceeds size or depth ceilings"
            );
            self.errors
                .push(QueryError::new(ErrorKind::QueryTooLarge(pruned.log)));
        }
        self.description = Some(pruned.description);
    }

    // ------------------------------------------------------------------------
    // Limits
    // ------------------------------------------------------------------------

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Clamp the offset to the global maximum and shrink the limit so that
    /// `offset + limit` stays within it
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.max_limit);
        self.limit = self.limit.min(self.max_limit - self.offset);
    }

    /// Set the limit under the ceilings. The inline ceiling applies only to
    /// inline queries and only when `restrict_inline` is set.
    pub fn set_limit(&mut self, limit: usize, restrict_inline: bool) {
        let context_max = if self.inline && restrict_inline {
            self.max_inline_limit
        } else {
            self.max_limit
        };
        self.limit = limit.min(self.max_limit - self.offset).min(context_max);
    }

    /// Set the limit without any ceiling
    pub fn set_unbound_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    // ------------------------------------------------------------------------
    // Other parameters
    // ------------------------------------------------------------------------

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn is_concept(&self) -> bool {
        self.concept
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: QueryMode) {
        self.mode = mode;
    }

    pub fn sort_keys(&self) -> &IndexMap<String, SortDirection> {
        &self.sort_keys
    }

    pub fn set_sort_keys(&mut self, sort_keys: IndexMap<String, SortDirection>) {
        self.sort_keys = sort_keys;
    }

    pub fn main_label(&self) -> &str {
        &self.main_label
    }

    pub fn set_main_label(&mut self, main_label: impl Into<String>) {
        self.main_label = main_label.into();
    }

    pub fn subject(&self) -> Option<&PageRef> {
        self.subject.as_ref()
    }

    pub fn set_subject(&mut self, subject: Option<PageRef>) {
        self.subject = subject;
    }

    pub fn extra_printouts(&self) -> &[PrintRequest] {
        &self.extra_printouts
    }

    /// Register printouts and attach the ones the description does not
    /// carry yet
    pub fn set_extra_printouts(&mut self, printouts: Vec<PrintRequest>) {
        if let Some(description) = &mut self.description {
            for printout in &printouts {
                if !description.print_requests().contains(printout) {
                    description.add_print_request(printout.clone());
                }
            }
        }
        self.extra_printouts = printouts;
    }

    pub fn errors(&self) -> &[QueryError] {
        &self.errors
    }

    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = QueryError>) {
        self.errors.extend(errors);
    }

    // ------------------------------------------------------------------------
    // Serialization and identity
    // ------------------------------------------------------------------------

    pub fn to_serializable(&self) -> SerializableQuery {
        let printouts = self
            .extra_printouts
            .iter()
            .map(PrintRequest::serialization)
            .filter(|s| s != "?")
            .collect();
        SerializableQuery {
            conditions: self.query_string(),
            parameters: SerializedParameters {
                limit: self.limit,
                offset: self.offset,
                sortkeys: self.sort_keys.clone(),
                mainlabel: self.main_label.clone(),
                querymode: self.mode.code(),
            },
            printouts,
        }
    }

    /// Hex SHA-256 of the serializable form, with printouts in sorted order
    pub fn content_hash(&self) -> String {
        let mut form = self.to_serializable();
        form.printouts.sort();
        let json = serde_json::to_vec(&form).expect("serializable form is plain data");
        hex::encode(Sha256::digest(&json))
    }

    pub fn query_id(&self) -> String {
        format!("{}{}", QUERY_ID_PREFIX, self.content_hash())
    }
}
