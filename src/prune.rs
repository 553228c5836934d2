//! Size/depth bounded rewriting of descriptions
//!
//! Pruning never touches the input tree. It returns a replacement that fits
//! the budget, the budget left over, and the canonical strings of every
//! condition that was cut.

use tracing::trace;

use crate::description::{AlgebraConfig, Conjunction, Description, Disjunction, Node, SomeProperty};

/// Remaining size and depth allowance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budget {
    pub size: usize,
    pub depth: usize,
}

impl Budget {
    pub fn new(size: usize, depth: usize) -> Self {
        Self { size, depth }
    }
}

/// Result of pruning one subtree
#[derive(Clone, Debug, PartialEq)]
pub struct Pruned {
    pub description: Description,
    pub budget: Budget,
    /// Canonical strings of the discarded conditions, left to right
    pub log: Vec<String>,
}

impl Pruned {
    fn kept(description: Description, budget: Budget) -> Self {
        Self {
            description,
            budget,
            log: Vec::new(),
        }
    }
}

impl Description {
    /// Rewrite the description so that it fits `budget`.
    ///
    /// Siblings share the size budget left to right; each branch gets its
    /// own copy of the depth budget.
    pub fn prune(&self, budget: Budget, config: &AlgebraConfig) -> Pruned {
        match &self.node {
            Node::Thing => Pruned::kept(self.clone(), budget),
            Node::Disjunction(d) if d.is_always_true() => {
                let thing = Description::thing().with_print_requests(self.print_requests.clone());
                Pruned::kept(thing, budget)
            }
            Node::Class(class) => {
                let cost = self.size(config);
                if budget.size >= cost {
                    return Pruned::kept(
                        self.clone(),
                        Budget::new(budget.size - cost, budget.depth),
                    );
                }
                let exhausted = Budget::new(0, budget.depth);
                match class.split_at(budget.size) {
                    Some((head, tail)) => {
                        let rest = Description::from(Node::Class(tail));
                        Pruned {
                            description: Description::from(Node::Class(head))
                                .with_print_requests(self.print_requests.clone()),
                            budget: exhausted,
                            log: vec![rest.to_query_string(false)],
                        }
                    }
                    None => {
                        let mut pruned = self.discard(budget);
                        pruned.budget = exhausted;
                        pruned
                    }
                }
            }
            Node::Concept(_) | Node::Namespace(_) | Node::Value(_) => {
                let cost = self.size(config);
                if budget.size < cost {
                    self.discard(budget)
                } else {
                    Pruned::kept(self.clone(), Budget::new(budget.size - cost, budget.depth))
                }
            }
            Node::SomeProperty(sp) => self.prune_some_property(sp, budget, config),
            Node::Conjunction(c) => self.prune_composite(c.conjuncts(), true, budget, config),
            Node::Disjunction(d) => self.prune_composite(d.disjuncts(), false, budget, config),
        }
    }

    /// Replace the whole node by Thing, keeping its print requests
    fn discard(&self, budget: Budget) -> Pruned {
        let text = self.to_query_string(false);
        trace!(condition = %text, "discarding condition");
        Pruned {
            description: Description::thing().with_print_requests(self.print_requests.clone()),
            budget,
            log: vec![text],
        }
    }

    fn prune_some_property(
        &self,
        sp: &SomeProperty,
        budget: Budget,
        config: &AlgebraConfig,
    ) -> Pruned {
        if budget.size == 0 || budget.depth == 0 {
            return self.discard(budget);
        }
        let inner = sp
            .description
            .prune(Budget::new(budget.size - 1, budget.depth - 1), config);
        Pruned {
            description: Description::some_property(sp.property.clone(), inner.description)
                .with_print_requests(self.print_requests.clone()),
            budget: inner.budget,
            log: inner.log,
        }
    }

    fn prune_composite(
        &self,
        children: &[Description],
        conjunctive: bool,
        budget: Budget,
        config: &AlgebraConfig,
    ) -> Pruned {
        if budget.size == 0 {
            return self.discard(budget);
        }

        let mut size = budget.size;
        let mut depth = budget.depth;
        let mut log = Vec::new();
        let mut lifted = Vec::new();
        let mut conjunction = Conjunction::default();
        let mut disjunction = Disjunction::default();

        for child in children {
            let pruned = child.prune(Budget::new(size, budget.depth), config);
            size = pruned.budget.size;
            depth = depth.min(pruned.budget.depth);
            log.extend(pruned.log);
            if conjunctive {
                conjunction.push(pruned.description, &mut lifted);
            } else {
                disjunction.push(pruned.description, &mut lifted);
            }
        }

        let survivors = if conjunctive {
            conjunction.into_conjuncts()
        } else if disjunction.is_always_true() {
            Vec::new()
        } else {
            disjunction.into_disjuncts()
        };

        if survivors.is_empty() {
            // Nothing left: the whole condition counts as discarded, and so
            // do the print requests of the pruned children.
            let mut pruned = self.discard(budget);
            pruned.description.print_requests.extend(lifted);
            return pruned;
        }

        let mut requests = self.print_requests.clone();
        requests.extend(lifted);

        let description = if survivors.len() == 1 {
            survivors
                .into_iter()
                .next()
                .map(|only| only.with_print_requests(requests))
                .unwrap_or_else(Description::thing)
        } else if conjunctive {
            Description::conjunction(survivors).with_print_requests(requests)
        } else {
            Description::disjunction(survivors).with_print_requests(requests)
        };

        Pruned {
            description,
            budget: Budget::new(size, depth),
            log,
        }
    }
}
