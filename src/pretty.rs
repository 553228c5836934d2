//! Canonical query strings for descriptions
//!
//! Renders a description back to query syntax. The non-value form is what
//! appears at the top level of a query; the value form is what may stand on
//! the right-hand side of `Property::`, so anything that is not a plain
//! literal gets wrapped in `<q>...</q>`.

use crate::datavalue::Comparator;
use crate::description::{
    ClassDescription, Conjunction, Description, Disjunction, Node, SomeProperty, ValueDescription,
};
use crate::namespace;

/// A string builder for query syntax
pub struct Pretty {
    output: String,
}

impl Default for Pretty {
    fn default() -> Self {
        Self::new()
    }
}

impl Pretty {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// Run `f` inside `<q>...</q>` when `wrap` is set
    fn grouped(&mut self, wrap: bool, f: impl FnOnce(&mut Self)) {
        if wrap {
            self.write("<q>");
        }
        f(self);
        if wrap {
            self.write("</q>");
        }
    }
}

// ============ Pretty-printing implementations ============

impl Pretty {
    pub fn description(&mut self, d: &Description, as_value: bool) {
        match d.node() {
            Node::Thing => self.write("+"),
            Node::Class(class) => self.grouped(as_value, |p| p.class(class)),
            Node::Concept(page) => self.grouped(as_value, |p| {
                p.write("[[");
                p.write(&page.prefixed_text());
                p.write("]]");
            }),
            Node::Namespace(index) => self.grouped(as_value, |p| p.namespace(*index)),
            Node::Value(value) => self.value(value, as_value),
            Node::Conjunction(c) => self.grouped(as_value, |p| p.conjunction(c)),
            Node::Disjunction(d) => self.disjunction(d, as_value),
            Node::SomeProperty(sp) => self.grouped(as_value, |p| p.some_property(sp)),
        }
    }

    fn class(&mut self, class: &ClassDescription) {
        self.write("[[");
        for (i, page) in class.categories().iter().enumerate() {
            if i == 0 {
                self.write(&page.prefixed_text());
            } else {
                self.write("||");
                self.write(&page.title);
            }
        }
        self.write("]]");
    }

    fn namespace(&mut self, index: i32) {
        self.write("[[");
        if index != namespace::MAIN {
            self.write(&namespace::display_name(index));
        }
        self.write(":+]]");
    }

    fn value(&mut self, value: &ValueDescription, as_value: bool) {
        let text = value.item.wiki_value();
        if as_value {
            self.write(value.comparator.prefix());
            self.write(&text);
        } else if value.comparator == Comparator::Equal {
            self.write("[[:");
            self.write(&text);
            self.write("]]");
        } else {
            self.write("[[");
            self.write(value.comparator.prefix());
            self.write(&text);
            self.write("]]");
        }
    }

    fn conjunction(&mut self, c: &Conjunction) {
        if c.is_empty() {
            self.write("+");
            return;
        }
        for (i, conjunct) in c.conjuncts().iter().enumerate() {
            if i > 0 {
                self.write(" ");
            }
            let nested_or = matches!(conjunct.node(), Node::Disjunction(d) if !d.is_always_true());
            self.grouped(nested_or, |p| p.description(conjunct, false));
        }
    }

    fn disjunction(&mut self, d: &Disjunction, as_value: bool) {
        if d.is_always_true() {
            self.write("+");
            return;
        }
        let separator = if as_value { "||" } else { " OR " };
        for (i, disjunct) in d.disjuncts().iter().enumerate() {
            if i > 0 {
                self.write(separator);
            }
            self.description(disjunct, as_value);
        }
    }

    /// `[[A.B::value]]`. The chain continues through nested property
    /// conditions as long as their labels contain no `.`; a first label
    /// with a `.` is escaped with a leading space and never chained.
    fn some_property(&mut self, sp: &SomeProperty) {
        let first = sp.property.label();
        let mut chain = first.clone();
        let mut inner = sp.description.as_ref();
        if first.contains('.') {
            chain.insert(0, ' ');
        } else {
            while let Node::SomeProperty(next) = inner.node() {
                let label = next.property.label();
                if label.contains('.') {
                    break;
                }
                chain.push('.');
                chain.push_str(&label);
                inner = next.description.as_ref();
            }
        }
        self.write("[[");
        self.write(&chain);
        self.write("::");
        self.description(inner, true);
        self.write("]]");
    }
}

/// Convenience function to render a description
pub fn pretty_print(d: &Description) -> String {
    let mut p = Pretty::new();
    p.description(d, false);
    p.finish()
}

impl Description {
    /// Canonical query string; `as_value` selects the form usable after
    /// `Property::`
    pub fn to_query_string(&self, as_value: bool) -> String {
        let mut p = Pretty::new();
        p.description(self, as_value);
        p.finish()
    }
}

// Unit tests live in tests/unit_pretty.rs
