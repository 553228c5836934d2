//! Property tests for pruning
//!
//! Pruning must respect its budget, leave fitting trees alone and be a
//! fixed point once applied.

mod generators;

use askql::description::{AlgebraConfig, Description};
use askql::prune::Budget;
use generators::{arb_description, arb_leaf, check_shape};
use proptest::collection::vec;
use proptest::prelude::*;

fn arb_algebra() -> impl Strategy<Value = AlgebraConfig> {
    prop_oneof![Just(0u32), Just(10u32)]
        .prop_map(|subcategory_depth| AlgebraConfig { subcategory_depth })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pruned_trees_fit_the_budget(
        d in arb_description(),
        size in 0usize..8,
        depth in 0usize..4,
        config in arb_algebra(),
    ) {
        let pruned = d.prune(Budget::new(size, depth), &config);
        prop_assert!(pruned.description.size(&config) <= size);
        prop_assert!(pruned.description.depth() <= depth);
        prop_assert!(pruned.budget.size <= size);
        prop_assert!(check_shape(&pruned.description).is_ok());
    }

    #[test]
    fn pruning_is_idempotent(
        d in arb_description(),
        size in 0usize..8,
        depth in 0usize..4,
        config in arb_algebra(),
    ) {
        let budget = Budget::new(size, depth);
        let once = d.prune(budget, &config);
        let twice = once.description.prune(budget, &config);
        prop_assert_eq!(&twice.description, &once.description);
        prop_assert!(twice.log.is_empty(), "second pass dropped {:?}", twice.log);
    }

    #[test]
    fn fitting_trees_are_untouched(d in arb_description(), config in arb_algebra()) {
        let budget = Budget::new(d.size(&config), d.depth());
        let pruned = d.prune(budget, &config);
        prop_assert_eq!(&pruned.description, &d);
        prop_assert!(pruned.log.is_empty());
        prop_assert_eq!(pruned.budget.size, 0);
    }

    #[test]
    fn nothing_is_lost_silently(d in arb_description(), size in 0usize..4) {
        // Every size unit cut from a tree without always-true parts shows
        // up in the log
        let config = AlgebraConfig::default();
        let pruned = d.prune(Budget::new(size, 8), &config);
        if pruned.description.size(&config) < d.size(&config) {
            prop_assert!(!pruned.log.is_empty());
        }
    }

    #[test]
    fn conjunctions_stay_flat(parts in vec(arb_description(), 0..6)) {
        let conjunction = Description::conjunction(parts);
        prop_assert!(check_shape(&conjunction).is_ok());
    }

    #[test]
    fn disjunctions_stay_flat(
        parts in vec(arb_leaf(), 0..6),
        extra in vec(arb_description(), 0..3),
    ) {
        let mut disjunction = Description::disjunction(parts);
        for d in extra {
            prop_assert!(disjunction.add_disjunct(d).is_ok());
        }
        prop_assert!(check_shape(&disjunction).is_ok());
    }

    #[test]
    fn thing_absorbs_any_disjunction(parts in vec(arb_description(), 1..5)) {
        // Dropping the siblings without a log entry is intended: `OR +`
        // lifts every restriction
        let mut disjunction = Description::disjunction(parts);
        prop_assert!(disjunction.add_disjunct(Description::thing()).is_ok());
        prop_assert!(!disjunction.is_singleton());
        prop_assert_eq!(disjunction.to_query_string(false), "+");
        prop_assert!(disjunction.simplified().is_thing());
    }
}
