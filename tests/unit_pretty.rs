//! Unit tests for canonical query strings

use askql::datavalue::{Comparator, DataItem, DataType, PageRef, PropertyRef};
use askql::description::Description;
use askql::namespace;
use askql::pretty::pretty_print;
use askql::{parse, StaticSchema};

fn page(title: &str) -> PageRef {
    PageRef::new(namespace::MAIN, title).unwrap()
}

fn cat(title: &str) -> Description {
    Description::category(PageRef::new(namespace::CATEGORY, title).unwrap())
}

fn eq(title: &str) -> Description {
    Description::value(DataItem::Page(page(title)), None, Comparator::Equal)
}

fn prop(name: &str) -> PropertyRef {
    PropertyRef::new(name, DataType::Page)
}

#[test]
fn test_leaves() {
    assert_eq!(pretty_print(&Description::thing()), "+");
    assert_eq!(pretty_print(&cat("City")), "[[Category:City]]");
    assert_eq!(
        pretty_print(&Description::concept(
            PageRef::new(namespace::CONCEPT, "Big cities").unwrap()
        )),
        "[[Concept:Big cities]]"
    );
    assert_eq!(pretty_print(&eq("Berlin")), "[[:Berlin]]");
    assert_eq!(
        pretty_print(&Description::value(DataItem::Page(page("Foo")), None, Comparator::Greater)),
        "[[>>Foo]]"
    );
}

#[test]
fn test_namespaces() {
    assert_eq!(pretty_print(&Description::namespace(namespace::HELP)), "[[Help:+]]");
    assert_eq!(pretty_print(&Description::namespace(namespace::MAIN)), "[[:+]]");
    // Unknown indices print as their number
    assert_eq!(pretty_print(&Description::namespace(3000)), "[[3000:+]]");
}

#[test]
fn test_class_lists() {
    let class = Description::class(vec![
        PageRef::new(namespace::CATEGORY, "A").unwrap(),
        PageRef::new(namespace::CATEGORY, "B").unwrap(),
    ])
    .unwrap();
    assert_eq!(pretty_print(&class), "[[Category:A||B]]");
    assert_eq!(class.to_query_string(true), "<q>[[Category:A||B]]</q>");
    assert!(Description::class(Vec::new()).is_none());
}

#[test]
fn test_conjunction_groups_disjunctions() {
    let d = Description::conjunction([cat("A"), Description::disjunction([eq("X"), eq("Y")])]);
    assert_eq!(pretty_print(&d), "[[Category:A]] <q>[[:X]] OR [[:Y]]</q>");
    assert_eq!(pretty_print(&Description::conjunction([])), "+");
}

#[test]
fn test_disjunction_forms() {
    let d = Description::disjunction([eq("X"), eq("Y")]);
    assert_eq!(d.to_query_string(false), "[[:X]] OR [[:Y]]");
    assert_eq!(d.to_query_string(true), "X||Y");
}

#[test]
fn test_property_values() {
    let d = Description::some_property(
        PropertyRef::new("Population", DataType::Number),
        Description::value(DataItem::Number(1000.0), None, Comparator::GreaterOrEqual),
    );
    assert_eq!(pretty_print(&d), "[[Population::>1000]]");

    let d = Description::some_property(prop("Located in"), cat("Country"));
    assert_eq!(pretty_print(&d), "[[Located in::<q>[[Category:Country]]</q>]]");

    let d = Description::some_property(prop("Knows"), Description::thing());
    assert_eq!(pretty_print(&d), "[[Knows::+]]");
}

#[test]
fn test_property_chains() {
    let d = Description::some_property(
        prop("Knows"),
        Description::some_property(prop("Located in"), eq("Berlin")),
    );
    assert_eq!(pretty_print(&d), "[[Knows.Located in::Berlin]]");
    assert_eq!(d.to_query_string(true), "<q>[[Knows.Located in::Berlin]]</q>");
}

#[test]
fn test_dotted_names_are_escaped() {
    let d = Description::some_property(prop("A.B"), eq("X"));
    assert_eq!(pretty_print(&d), "[[ A.B::X]]");

    // A dotted inner name stops the chain
    let inner = Description::some_property(prop("A.B"), eq("X"));
    let d = Description::some_property(prop("Knows"), inner);
    assert_eq!(pretty_print(&d), "[[Knows::<q>[[ A.B::X]]</q>]]");
}

#[test]
fn test_inverse_property() {
    let d = Description::some_property(prop("Capital of").inverted(), eq("Germany"));
    assert_eq!(pretty_print(&d), "[[-Capital of::Germany]]");
}

#[test]
fn test_always_true_disjunction() {
    let mut d = Description::disjunction([eq("X"), cat("A")]);
    d.add_disjunct(Description::thing()).unwrap();
    assert_eq!(d.to_query_string(false), "+");
    assert_eq!(d.to_query_string(true), "+");
}

#[test]
fn test_display_matches_query_string() {
    let d = Description::conjunction([cat("A"), eq("B")]);
    assert_eq!(d.to_string(), d.to_query_string(false));
}

#[test]
fn test_roundtrip_examples() {
    let schema = StaticSchema::new().with_property("Population", DataType::Number);
    for input in [
        "[[Category:City]] [[Population::>1000]]",
        "[[Category:A||B]] OR [[Concept:C]]",
        "[[Knows.Located in::<q>[[Category:Country]] [[Help:+]]</q>]]",
        "[[Knows::A||<q>[[Category:B]]</q>||!C]]",
        "[[:Berlin]] OR [[~Ber*]]",
        "[[ A.B::X]] <q>[[:Y]] OR [[:Z]]</q>",
    ] {
        let outcome = parse(input, &schema);
        assert!(outcome.is_ok(), "errors {:?} for {}", outcome.codes(), input);
        assert_eq!(pretty_print(&outcome.description), input);
    }
}
