//! Property tests for the print -> parse roundtrip
//!
//! Printing a description and parsing the text back must give a tree with
//! the same measures and features, and printing that tree again must give
//! the same text.

mod generators;

use askql::description::AlgebraConfig;
use askql::parse;
use askql::pretty::pretty_print;
use generators::{arb_description, check_shape, schema};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn printed_descriptions_reparse_equivalently(d in arb_description()) {
        let schema = schema();
        let config = AlgebraConfig::default();
        let printed = pretty_print(&d);
        let outcome = parse(&printed, &schema);

        prop_assert!(outcome.is_ok(), "errors {:?} for {}", outcome.codes(), printed);
        let reparsed = &outcome.description;
        prop_assert_eq!(reparsed.size(&config), d.size(&config), "size of {}", printed);
        prop_assert_eq!(reparsed.depth(), d.depth(), "depth of {}", printed);
        prop_assert_eq!(reparsed.query_features(), d.query_features(), "features of {}", printed);
        prop_assert_eq!(reparsed.is_singleton(), d.is_singleton(), "singleton of {}", printed);
    }

    #[test]
    fn printing_is_a_fixed_point(d in arb_description()) {
        let schema = schema();
        let printed = pretty_print(&d);
        let reprinted = pretty_print(&parse(&printed, &schema).description);
        prop_assert_eq!(reprinted, printed);
    }

    #[test]
    fn parsed_trees_keep_container_invariants(d in arb_description()) {
        let schema = schema();
        let outcome = parse(&pretty_print(&d), &schema);
        prop_assert!(check_shape(&outcome.description).is_ok());
    }

    #[test]
    fn value_form_survives_as_subquery(d in arb_description()) {
        // Anything printed in value position can stand behind a property
        let schema = schema();
        let text = format!("[[Knows::{}]]", d.to_query_string(true));
        let outcome = parse(&text, &schema);
        prop_assert!(outcome.is_ok(), "errors {:?} for {}", outcome.codes(), text);
        prop_assert_eq!(outcome.description.depth(), d.depth() + 1);
    }

    #[test]
    fn arbitrary_text_never_panics(input in "[\\[\\]<>/q:|+*a-zA-Z .-]{0,40}") {
        let schema = schema();
        let outcome = parse(&input, &schema);
        // Whatever came out prints to something parseable
        let printed = pretty_print(&outcome.description);
        let _ = parse(&printed, &schema);
    }
}
