//! askql: the `#ask` query language
//!
//! Queries embedded in wiki markup (`[[Category:City]] [[Population::>1000]]`)
//! are parsed into a tree of descriptions, checked against enabled features,
//! pruned to configured size/depth ceilings and serialized back to canonical
//! text and a stable content hash. Executing queries is left to a backend
//! implementing [`QueryEngine`].

pub mod config;
pub mod datavalue;
pub mod description;
pub mod error;
pub mod lexer;
pub mod namespace;
pub mod parser;
pub mod pretty;
pub mod printrequest;
pub mod processor;
pub mod prune;
pub mod query;
pub mod schema;

pub use config::{Config, QueryConfig, SchemaConfig};
pub use datavalue::{Comparator, DataItem, DataType, PageRef, PropertyRef};
pub use description::{AlgebraConfig, Description, Node, QueryFeatures};
pub use error::{format_query_errors, ConfigError, ErrorKind, QueryError};
pub use parser::{ParseOutcome, QueryParser};
pub use pretty::pretty_print;
pub use printrequest::PrintRequest;
pub use processor::{QueryContext, QueryEngine, QueryParams, QueryProcessor};
pub use prune::{Budget, Pruned};
pub use query::{Query, QueryMode, SerializableQuery, SortDirection};
pub use schema::{Schema, StaticSchema};

/// Parse a query string with all features enabled and no default
/// namespaces
pub fn parse(input: &str, schema: &dyn Schema) -> ParseOutcome {
    QueryParser::new(schema, QueryFeatures::ALL).parse(input)
}
