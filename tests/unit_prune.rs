//! Unit tests for size/depth pruning

use askql::datavalue::{Comparator, DataItem, DataType, PageRef, PropertyRef};
use askql::description::{AlgebraConfig, Description, Node};
use askql::namespace;
use askql::printrequest::PrintRequest;
use askql::prune::Budget;

fn cat(title: &str) -> PageRef {
    PageRef::new(namespace::CATEGORY, title).unwrap()
}

fn eq(title: &str) -> Description {
    Description::value(
        DataItem::Page(PageRef::new(namespace::MAIN, title).unwrap()),
        None,
        Comparator::Equal,
    )
}

fn knows(d: Description) -> Description {
    Description::some_property(PropertyRef::new("Knows", DataType::Page), d)
}

#[test]
fn test_conjunction_keeps_first_conditions() {
    let d = Description::conjunction(["A", "B", "C", "D", "E"].map(eq));
    let config = AlgebraConfig::default();
    let pruned = d.prune(Budget::new(3, 4), &config);

    assert_eq!(pruned.description, Description::conjunction(["A", "B", "C"].map(eq)));
    assert_eq!(pruned.description.size(&config), 3);
    assert_eq!(pruned.log, vec!["[[:D]]".to_string(), "[[:E]]".to_string()]);
    assert_eq!(pruned.budget.size, 0);
}

#[test]
fn test_single_survivor_is_unwrapped() {
    let d = Description::conjunction([eq("A"), eq("B")]);
    let pruned = d.prune(Budget::new(1, 0), &AlgebraConfig::default());
    assert_eq!(pruned.description, eq("A"));
    assert_eq!(pruned.log, vec!["[[:B]]".to_string()]);
}

#[test]
fn test_class_truncation() {
    let class = Description::class(vec![cat("A"), cat("B"), cat("C"), cat("D")]).unwrap();
    let config = AlgebraConfig {
        subcategory_depth: 0,
    };
    let pruned = class.prune(Budget::new(2, 0), &config);
    assert_eq!(pruned.description, Description::class(vec![cat("A"), cat("B")]).unwrap());
    assert_eq!(pruned.log, vec!["[[Category:C||D]]".to_string()]);
    assert_eq!(pruned.budget, Budget::new(0, 0));
}

#[test]
fn test_class_with_subcategories_costs_one() {
    let class = Description::class(vec![cat("A"), cat("B"), cat("C")]).unwrap();
    let pruned = class.prune(Budget::new(1, 0), &AlgebraConfig::default());
    assert_eq!(pruned.description, class);
    assert!(pruned.log.is_empty());

    let pruned = class.prune(Budget::new(0, 0), &AlgebraConfig::default());
    assert!(pruned.description.is_thing());
    assert_eq!(pruned.log, vec!["[[Category:A||B||C]]".to_string()]);
}

#[test]
fn test_depth_is_cut_per_branch() {
    let d = knows(knows(eq("A")));
    let pruned = d.prune(Budget::new(10, 1), &AlgebraConfig::default());
    assert_eq!(pruned.description, knows(Description::thing()));
    assert_eq!(pruned.log, vec!["[[Knows::A]]".to_string()]);
    assert_eq!(pruned.description.depth(), 1);
}

#[test]
fn test_siblings_get_their_own_depth() {
    let d = Description::conjunction([knows(eq("A")), knows(eq("B"))]);
    let pruned = d.prune(Budget::new(10, 1), &AlgebraConfig::default());
    assert_eq!(pruned.description, d);
    assert!(pruned.log.is_empty());
    assert_eq!(pruned.budget, Budget::new(6, 0));
}

#[test]
fn test_disjunction_with_dropped_branch_is_discarded() {
    // Dropping one disjunct would narrow the query, so the whole
    // disjunction goes
    let d = Description::disjunction([eq("A"), knows(eq("B"))]);
    let pruned = d.prune(Budget::new(10, 0), &AlgebraConfig::default());
    assert!(pruned.description.is_thing());
    assert_eq!(pruned.log, vec!["[[:A]] OR [[Knows::B]]".to_string()]);
}

#[test]
fn test_empty_composite_is_discarded() {
    let d = Description::conjunction([knows(eq("A")), knows(eq("B"))]);
    let pruned = d.prune(Budget::new(10, 0), &AlgebraConfig::default());
    assert!(pruned.description.is_thing());
    assert_eq!(pruned.log, vec!["[[Knows::A]] [[Knows::B]]".to_string()]);
    assert_eq!(pruned.budget, Budget::new(10, 0));
}

#[test]
fn test_print_requests_survive_pruning() {
    let request = PrintRequest::category();
    let d = Description::conjunction([eq("A"), eq("B")]).with_print_requests(vec![request.clone()]);
    let pruned = d.prune(Budget::new(0, 0), &AlgebraConfig::default());
    assert!(pruned.description.is_thing());
    assert_eq!(pruned.description.print_requests(), &[request.clone()]);

    let pruned = d.prune(Budget::new(1, 0), &AlgebraConfig::default());
    assert_eq!(pruned.description.print_requests(), &[request]);
    assert!(matches!(pruned.description.node(), Node::Value(_)));
}

#[test]
fn test_input_is_untouched() {
    let d = Description::conjunction(["A", "B", "C"].map(eq));
    let before = d.clone();
    let _ = d.prune(Budget::new(1, 0), &AlgebraConfig::default());
    assert_eq!(d, before);
}
