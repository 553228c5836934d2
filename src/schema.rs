//! Wiki-side lookups the parser depends on
//!
//! The parser never decides on its own what a property's type is or which
//! prefixes name a namespace. It asks a [`Schema`]. [`StaticSchema`] is an
//! in-memory implementation for tests, the CLI and embedders without a
//! live wiki.

use std::collections::HashMap;

use crate::datavalue::{normalize_title, split_comparator, DataItem, DataType, PageRef, PropertyRef};
use crate::description::Description;
use crate::namespace;

/// Property, page, namespace and value resolution
pub trait Schema {
    /// Resolve a user-facing label. A leading `-` marks an inverse property.
    fn property(&self, label: &str) -> Result<PropertyRef, String>;

    /// Localized or canonical namespace name to index; `""` is the main
    /// namespace
    fn namespace_index(&self, name: &str) -> Option<i32>;

    /// Names (without colon) that start a category link
    fn category_prefixes(&self) -> Vec<String>;

    /// Names (without colon) that start a concept link
    fn concept_prefixes(&self) -> Vec<String>;

    fn page(&self, namespace: i32, text: &str) -> Option<PageRef> {
        PageRef::new(namespace, text)
    }

    fn parse_value(&self, data_type: DataType, text: &str) -> Result<DataItem, String> {
        DataItem::parse(data_type, text, |name| self.namespace_index(name))
    }

    /// Turn a possibly comparator-prefixed literal into a value condition.
    /// Without a property the literal names a page.
    fn value_description(
        &self,
        property: Option<&PropertyRef>,
        literal: &str,
    ) -> Result<Description, String> {
        let (comparator, text) = split_comparator(literal);
        let data_type = property.map(PropertyRef::value_type).unwrap_or_default();
        let item = self.parse_value(data_type, &text)?;
        Ok(Description::value(item, property.cloned(), comparator))
    }
}

/// Declared types and aliases held in memory
#[derive(Clone, Debug, Default)]
pub struct StaticSchema {
    properties: HashMap<String, DataType>,
    namespace_aliases: HashMap<String, i32>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property type. Undeclared properties are page-typed.
    pub fn with_property(mut self, name: &str, data_type: DataType) -> Self {
        let key = normalize_title(name).unwrap_or_else(|| name.trim().to_string());
        self.properties.insert(key, data_type);
        self
    }

    /// Add a localized name for a namespace
    pub fn with_namespace_alias(mut self, alias: &str, index: i32) -> Self {
        self.namespace_aliases
            .insert(namespace::normalize_name(alias), index);
        self
    }

    fn prefixes_for(&self, index: i32) -> Vec<String> {
        let mut names: Vec<String> = namespace::canonical_name(index)
            .map(str::to_string)
            .into_iter()
            .collect();
        let mut aliases: Vec<&String> = self
            .namespace_aliases
            .iter()
            .filter(|(_, idx)| **idx == index)
            .map(|(alias, _)| alias)
            .collect();
        aliases.sort();
        names.extend(aliases.into_iter().cloned());
        names
    }
}

impl Schema for StaticSchema {
    fn property(&self, label: &str) -> Result<PropertyRef, String> {
        let label = label.trim();
        let (inverse, name) = match label.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, label),
        };
        let name = normalize_title(name)
            .ok_or_else(|| format!("\"{}\" cannot be used as a property name", label))?;
        let data_type = self.properties.get(&name).copied().unwrap_or_default();
        let property = PropertyRef::new(&name, data_type);
        Ok(if inverse { property.inverted() } else { property })
    }

    fn namespace_index(&self, name: &str) -> Option<i32> {
        namespace::canonical_index(name)
            .or_else(|| self.namespace_aliases.get(&namespace::normalize_name(name)).copied())
    }

    fn category_prefixes(&self) -> Vec<String> {
        self.prefixes_for(namespace::CATEGORY)
    }

    fn concept_prefixes(&self) -> Vec<String> {
        self.prefixes_for(namespace::CONCEPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datavalue::Comparator;
    use crate::description::Node;

    #[test]
    fn test_property_resolution() {
        let schema = StaticSchema::new().with_property("population", DataType::Number);
        let p = schema.property("Population").unwrap();
        assert_eq!(p.data_type(), DataType::Number);
        assert!(!p.is_page_valued());

        let inv = schema.property("-Population").unwrap();
        assert!(inv.is_inverse());
        assert!(inv.is_page_valued());
        assert_eq!(inv.label(), "-Population");

        assert_eq!(schema.property("Knows").unwrap().data_type(), DataType::Page);
        assert!(schema.property("a|b").is_err());
        assert!(schema.property("  ").is_err());
    }

    #[test]
    fn test_localized_prefixes() {
        let schema = StaticSchema::new().with_namespace_alias("Kategorie", namespace::CATEGORY);
        assert_eq!(
            schema.category_prefixes(),
            vec!["Category".to_string(), "kategorie".to_string()]
        );
        assert_eq!(schema.namespace_index("KATEGORIE"), Some(namespace::CATEGORY));
    }

    #[test]
    fn test_value_description_comparator() {
        let schema = StaticSchema::new().with_property("Year", DataType::Number);
        let year = schema.property("Year").unwrap();
        let d = schema.value_description(Some(&year), ">2020").unwrap();
        match d.node() {
            Node::Value(v) => {
                assert_eq!(v.comparator, Comparator::GreaterOrEqual);
                assert_eq!(v.item, DataItem::Number(2020.0));
            }
            other => panic!("expected value, got {:?}", other),
        }
        assert!(schema.value_description(Some(&year), "soon").is_err());
    }
}
