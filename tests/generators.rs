//! Proptest generators for askql descriptions
//!
//! Generated trees are ones the parser can produce: composites have at
//! least two children, no Thing appears below the root, disjunctions hold at
//! most one (merged) class, and typed values sit directly below the
//! property they belong to.

use askql::datavalue::{Comparator, DataItem, PageRef, PropertyRef};
use askql::description::{Description, Node};
use askql::namespace;
use askql::{DataType, StaticSchema};
use proptest::collection::vec;
use proptest::prelude::*;

/// Page-typed properties known to [`schema`]
pub const PROPERTIES: [&str; 3] = ["Knows", "Friend", "Located in"];

/// Page-typed property whose name must be escaped in a chain
pub const DOTTED: &str = "Part.Of";

/// Schema the generated trees are written against
pub fn schema() -> StaticSchema {
    PROPERTIES
        .iter()
        .fold(StaticSchema::new(), |s, name| s.with_property(name, DataType::Page))
        .with_property(DOTTED, DataType::Page)
        .with_property("Population", DataType::Number)
        .with_property("Name", DataType::Text)
}

// ============================================================================
// Leaves
// ============================================================================

/// A normalized title: capitalized ASCII letters only
pub fn arb_title() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,8}".prop_map(String::from)
}

/// Page-valued properties: plain, inverse (`-Knows`) and dotted
pub fn arb_property() -> impl Strategy<Value = PropertyRef> {
    let plain = prop::sample::select(PROPERTIES.to_vec())
        .prop_map(|name| PropertyRef::new(name, DataType::Page));
    let inverse = prop::sample::select(vec!["Knows", "Friend"])
        .prop_map(|name| PropertyRef::new(name, DataType::Page).inverted());
    prop_oneof![
        4 => plain,
        2 => inverse,
        1 => Just(PropertyRef::new(DOTTED, DataType::Page)),
    ]
}

fn arb_comparator() -> impl Strategy<Value = Comparator> {
    prop_oneof![
        3 => Just(Comparator::Equal),
        1 => Just(Comparator::NotEqual),
        1 => Just(Comparator::Like),
    ]
}

/// Comparators usable on the right-hand side of a property
fn arb_value_comparator() -> impl Strategy<Value = Comparator> {
    prop_oneof![
        3 => Just(Comparator::Equal),
        1 => Just(Comparator::LessOrEqual),
        1 => Just(Comparator::GreaterOrEqual),
        1 => Just(Comparator::NotEqual),
        1 => Just(Comparator::Like),
        1 => Just(Comparator::NotLike),
        1 => Just(Comparator::Less),
        1 => Just(Comparator::Greater),
    ]
}

/// `[[Property::value]]` with the value typed the way the schema declares it
fn typed_value(property: PropertyRef, item: DataItem, cmp: Comparator) -> Description {
    let value = Description::value(item, Some(property.clone()), cmp);
    Description::some_property(property, value)
}

fn arb_typed_leaf() -> impl Strategy<Value = Description> {
    let population = PropertyRef::new("Population", DataType::Number);
    let name = PropertyRef::new("Name", DataType::Text);
    let knows = PropertyRef::new("Knows", DataType::Page);
    prop_oneof![
        (0u32..100_000, arb_value_comparator()).prop_map(move |(n, cmp)| {
            typed_value(population.clone(), DataItem::Number(f64::from(n)), cmp)
        }),
        ("[a-z]{1,8}", arb_value_comparator()).prop_map(move |(text, cmp)| {
            typed_value(name.clone(), DataItem::Text(text), cmp)
        }),
        (arb_title(), arb_value_comparator()).prop_map(move |(t, cmp)| {
            typed_value(knows.clone(), DataItem::Page(page(namespace::MAIN, &t)), cmp)
        }),
    ]
}

fn page(ns: i32, title: &str) -> PageRef {
    PageRef::new(ns, title).expect("generated titles are valid")
}

pub fn arb_leaf() -> impl Strategy<Value = Description> {
    prop_oneof![
        arb_title().prop_map(|t| Description::category(page(namespace::CATEGORY, &t))),
        arb_title().prop_map(|t| Description::concept(page(namespace::CONCEPT, &t))),
        prop::sample::select(vec![namespace::MAIN, namespace::USER, namespace::HELP])
            .prop_map(Description::namespace),
        (arb_title(), arb_comparator()).prop_map(|(t, cmp)| {
            Description::value(DataItem::Page(page(namespace::MAIN, &t)), None, cmp)
        }),
        arb_typed_leaf(),
    ]
}

// ============================================================================
// Trees
// ============================================================================

/// Round-trippable description trees
pub fn arb_description() -> impl Strategy<Value = Description> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 2..4).prop_map(|parts| Description::conjunction(parts)),
            vec(inner.clone(), 2..4).prop_map(|parts| Description::disjunction(parts).simplified()),
            (arb_property(), inner).prop_map(|(p, d)| Description::some_property(p, d)),
        ]
    })
}

// ============================================================================
// Invariants
// ============================================================================

/// Check container shape invariants over the whole tree
pub fn check_shape(d: &Description) -> Result<(), String> {
    match d.node() {
        Node::Conjunction(c) => {
            for child in c.conjuncts() {
                if matches!(child.node(), Node::Conjunction(_) | Node::Thing) {
                    return Err(format!("conjunction holds {:?}", child.node()));
                }
                check_shape(child)?;
            }
        }
        Node::Disjunction(dj) => {
            let classes = dj
                .disjuncts()
                .iter()
                .filter(|child| matches!(child.node(), Node::Class(_)))
                .count();
            if classes > 1 {
                return Err(format!("disjunction holds {} classes", classes));
            }
            if dj.is_always_true() && !dj.is_empty() {
                return Err("always-true disjunction keeps disjuncts".to_string());
            }
            for child in dj.disjuncts() {
                if matches!(child.node(), Node::Disjunction(_) | Node::Thing) {
                    return Err(format!("disjunction holds {:?}", child.node()));
                }
                check_shape(child)?;
            }
        }
        Node::Class(class) => {
            if class.categories().is_empty() {
                return Err("empty class".to_string());
            }
        }
        Node::SomeProperty(sp) => check_shape(&sp.description)?,
        Node::Thing | Node::Concept(_) | Node::Namespace(_) | Node::Value(_) => {}
    }
    Ok(())
}
