//! Fuzz the askql parser
//!
//! Arbitrary text must parse into some description (possibly with errors)
//! without panicking, and printing and pruning that description must not
//! panic either.

#![no_main]

use askql::{AlgebraConfig, Budget, DataType, StaticSchema};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let schema = StaticSchema::new()
            .with_property("Population", DataType::Number)
            .with_property("Name", DataType::Text);
        let outcome = askql::parse(input, &schema);

        // The canonical form of whatever was parsed must itself parse
        let printed = outcome.description.to_query_string(false);
        let _ = askql::parse(&printed, &schema);

        let _ = outcome
            .description
            .prune(Budget::new(3, 2), &AlgebraConfig::default());
    }
});
