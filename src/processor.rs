//! Query processor facade
//!
//! Glue between raw parameter lists (as written after `{{#ask:` and split
//! at `|`), the parser, the [`Query`] object and an execution backend. The
//! backend itself is external and reached through [`QueryEngine`].

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::datavalue::normalize_title;
use crate::error::{ErrorKind, QueryError};
use crate::parser::QueryParser;
use crate::printrequest::{parse_printout_syntax, PrintMode, PrintRequest};
use crate::query::{Query, QueryMode, SortDirection};
use crate::schema::Schema;

/// Where a query is embedded; selects ceilings and features
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryContext {
    /// Inline in page content
    Inline,
    /// A dedicated search page
    SpecialPage,
    /// A concept definition
    Concept,
}

impl QueryContext {
    pub fn is_inline(self) -> bool {
        self == QueryContext::Inline
    }

    pub fn is_concept(self) -> bool {
        self == QueryContext::Concept
    }
}

/// An execution backend
pub trait QueryEngine {
    type Output;
    type Error;

    fn execute(&self, query: &Query) -> Result<Self::Output, Self::Error>;
}

// ============================================================================
// Raw parameters
// ============================================================================

/// A raw parameter list split into its three kinds
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawParams {
    /// Query text, rejoined with `|`
    pub query: String,
    /// `name=value` parameters; names lower-cased
    pub parameters: IndexMap<String, String>,
    pub printouts: Vec<PrintRequest>,
    pub errors: Vec<QueryError>,
}

/// `limit`, `sort`, ... but not `[[Prop::a=b]]`
fn is_parameter_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ' '))
}

/// Build the print request for a `?Target#format=Label` statement
fn printout(text: &str, schema: &dyn Schema) -> Result<PrintRequest, String> {
    let syntax = parse_printout_syntax(text)?;
    let request = if syntax.target.is_empty() {
        PrintRequest::this("")
    } else if schema.namespace_index(&syntax.target) == Some(crate::namespace::CATEGORY) {
        PrintRequest::category()
    } else {
        PrintRequest::property(schema.property(&syntax.target)?)
    };
    let request = match syntax.label {
        Some(label) => request.with_label(label),
        None => request,
    };
    Ok(match syntax.format {
        Some(format) => request.with_format(format),
        None => request,
    })
}

/// Sort out query text, parameters and print statements
pub fn split_raw_params(raw: &[&str], schema: &dyn Schema) -> RawParams {
    let mut params = RawParams::default();
    let mut query_parts = Vec::new();

    for part in raw {
        let trimmed = part.trim();
        if trimmed.starts_with('?') {
            match printout(trimmed, schema) {
                Ok(request) => params.printouts.push(request),
                Err(reason) => params.errors.push(QueryError::new(ErrorKind::InvalidPrintout(
                    format!("{}: {}", trimmed, reason),
                ))),
            }
            continue;
        }
        match trimmed.split_once('=') {
            Some((name, value)) if is_parameter_name(name) => {
                params
                    .parameters
                    .insert(name.trim().to_lowercase(), value.trim().to_string());
            }
            _ => query_parts.push(*part),
        }
    }

    params.query = query_parts.join("|");
    params
}

// ============================================================================
// Parameters
// ============================================================================

/// Pre-validated query parameters
#[derive(Clone, Debug, PartialEq)]
pub struct QueryParams {
    /// `None` uses the configured default
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort_keys: IndexMap<String, SortDirection>,
    pub main_label: String,
    pub mode: QueryMode,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            limit: None,
            offset: 0,
            sort_keys: IndexMap::new(),
            main_label: String::new(),
            mode: QueryMode::Instances,
        }
    }
}

fn sort_direction(text: &str) -> SortDirection {
    match text.trim().to_lowercase().as_str() {
        "desc" | "descending" | "reverse" => SortDirection::Desc,
        "rand" | "random" => SortDirection::Random,
        _ => SortDirection::Asc,
    }
}

fn comma_list(text: &str) -> Vec<&str> {
    text.split(',').map(str::trim).collect()
}

impl QueryParams {
    /// Read `limit`, `offset`, `sort`, `order`, `mainlabel` and `format`.
    /// Other names are ignored.
    pub fn from_map(map: &IndexMap<String, String>) -> Result<Self, QueryError> {
        let mut params = QueryParams::default();
        let invalid = |name: &str, value: &str| {
            QueryError::new(ErrorKind::InvalidValue(format!(
                "\"{}\" is not a valid value for {}",
                value, name
            )))
        };

        if let Some(value) = map.get("limit") {
            let limit: i64 = value.parse().map_err(|_| invalid("limit", value))?;
            if limit < 0 {
                params.mode = QueryMode::None;
                params.limit = Some(0);
            } else {
                params.limit = Some(limit as usize);
            }
        }

        if let Some(value) = map.get("offset") {
            params.offset = value.parse().map_err(|_| invalid("offset", value))?;
        }

        // Missing directions repeat the last one given
        let orders: Vec<SortDirection> = map
            .get("order")
            .map(|o| comma_list(o).into_iter().map(sort_direction).collect())
            .unwrap_or_default();
        let sorts: Vec<String> = map
            .get("sort")
            .map(|s| {
                comma_list(s)
                    .into_iter()
                    .map(|key| normalize_title(key).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        if sorts.is_empty() {
            if let Some(direction) = orders.first() {
                params.sort_keys.insert(String::new(), *direction);
            }
        } else {
            let mut last = SortDirection::Asc;
            for (i, key) in sorts.into_iter().enumerate() {
                if let Some(direction) = orders.get(i) {
                    last = *direction;
                }
                params.sort_keys.entry(key).or_insert(last);
            }
        }

        if let Some(value) = map.get("mainlabel") {
            params.main_label = value.clone();
        }

        if params.mode != QueryMode::None {
            match map.get("format").map(|f| f.trim().to_lowercase()).as_deref() {
                Some("count") => params.mode = QueryMode::Count,
                Some("debug") => params.mode = QueryMode::Debug,
                _ => {}
            }
        }

        Ok(params)
    }
}

// ============================================================================
// Processor
// ============================================================================

pub struct QueryProcessor<'s> {
    config: QueryConfig,
    schema: &'s dyn Schema,
}

impl<'s> QueryProcessor<'s> {
    pub fn new(config: QueryConfig, schema: &'s dyn Schema) -> Self {
        Self { config, schema }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn parser(&self, context: QueryContext) -> QueryParser<'s> {
        QueryParser::new(self.schema, self.config.features_for(context.is_concept()))
            .with_default_namespaces(&self.config.default_namespaces)
            .with_max_nesting(self.config.max_nesting)
    }

    /// Parse `query_string` and build a query with the given parameters and
    /// extra printouts
    pub fn create_query(
        &self,
        query_string: &str,
        params: &QueryParams,
        context: QueryContext,
        printouts: Vec<PrintRequest>,
    ) -> Query {
        let outcome = self.parser(context).parse(query_string);

        let mut printouts = printouts;
        if params.main_label != "-"
            && !printouts.iter().any(|p| p.mode == PrintMode::This)
        {
            printouts.insert(0, PrintRequest::this(params.main_label.clone()));
        }
        for request in outcome.description.print_requests() {
            if !printouts.contains(request) {
                printouts.push(request.clone());
            }
        }

        let mut query = Query::new(None, context.is_inline(), context.is_concept(), &self.config);
        query.add_errors(outcome.errors);
        query.set_extra_printouts(printouts);
        query.set_description(outcome.description);
        query.set_query_string(Some(query_string.to_string()));
        query.set_main_label(params.main_label.clone());
        query.set_mode(params.mode);
        query.set_sort_keys(params.sort_keys.clone());
        query.set_offset(params.offset);
        match params.mode {
            QueryMode::Count => query.set_unbound_limit(self.config.max_limit),
            _ => query.set_limit(params.limit.unwrap_or(self.config.default_limit), true),
        }

        debug!(
            conditions = %query.query_string(),
            limit = query.limit(),
            offset = query.offset(),
            errors = query.errors().len(),
            "created query"
        );
        query
    }

    /// Build a query from a raw parameter list
    pub fn process(&self, raw: &[&str], context: QueryContext) -> Query {
        let split = split_raw_params(raw, self.schema);
        let (params, param_error) = match QueryParams::from_map(&split.parameters) {
            Ok(params) => (params, None),
            Err(error) => {
                warn!(%error, "ignoring invalid query parameters");
                (QueryParams::default(), Some(error))
            }
        };
        let mut query = self.create_query(&split.query, &params, context, split.printouts);
        query.add_errors(split.errors);
        query.add_errors(param_error);
        query
    }

    /// Hand a query to a backend.
    ///
    /// # Panics
    ///
    /// Panics if the query has no description.
    pub fn run<E: QueryEngine>(&self, query: &Query, engine: &E) -> Result<E::Output, E::Error> {
        query.resolved_description();
        debug!(query_id = %query.query_id(), "running query");
        engine.execute(query)
    }
}
