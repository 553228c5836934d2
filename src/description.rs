//! The description algebra
//!
//! A parsed query condition is a tree of [`Description`] nodes. Each node is
//! one variant of the closed [`Node`] sum type plus the print requests that
//! are attached to it. All algebra operations (size, depth, singleton
//! detection, feature reporting, serialization, pruning) match exhaustively
//! on [`Node`].
//!
//! Containers keep their shape invariants at insertion time:
//! - a [`Conjunction`] never holds a Thing or another Conjunction;
//! - a [`Disjunction`] never holds another Disjunction, keeps at most one
//!   (merged) Class child, and collapses to "always true" when a Thing is
//!   added;
//! - a [`ClassDescription`] is never empty.
//!
//! Print requests of inserted children are lifted onto the container.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::datavalue::{Comparator, DataItem, PageRef, PropertyRef};
use crate::printrequest::PrintRequest;

// ============================================================================
// Query features
// ============================================================================

/// Bitset of query constructs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct QueryFeatures(u32);

impl QueryFeatures {
    pub const NONE: Self = Self(0);
    pub const PROPERTY: Self = Self(1);
    pub const CATEGORY: Self = Self(2);
    pub const CONCEPT: Self = Self(4);
    pub const NAMESPACE: Self = Self(8);
    pub const CONJUNCTION: Self = Self(16);
    pub const DISJUNCTION: Self = Self(32);
    pub const ALL: Self = Self(63);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::PROPERTY, "property"),
        (Self::CATEGORY, "category"),
        (Self::CONCEPT, "concept"),
        (Self::NAMESPACE, "namespace"),
        (Self::CONJUNCTION, "conjunction"),
        (Self::DISJUNCTION, "disjunction"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// True if every flag of `other` is set in `self`
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name == "all" {
            return Some(Self::ALL);
        }
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(flag, _)| *flag)
    }

    /// Names of the set flags, in bit order
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, n)| *n)
            .collect()
    }
}

impl BitOr for QueryFeatures {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for QueryFeatures {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for QueryFeatures {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl TryFrom<Vec<String>> for QueryFeatures {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        names.iter().try_fold(Self::NONE, |acc, name| {
            Self::from_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| format!("unknown query feature \"{}\"", name))
        })
    }
}

impl From<QueryFeatures> for Vec<String> {
    fn from(features: QueryFeatures) -> Self {
        features.names().into_iter().map(str::to_string).collect()
    }
}

impl fmt::Display for QueryFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

// ============================================================================
// Algebra configuration
// ============================================================================

/// Settings that change how the algebra measures descriptions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlgebraConfig {
    /// When positive, category hierarchies are expanded by the backend
    /// anyway, so a disjunction of categories costs a single unit.
    pub subcategory_depth: u32,
}

impl Default for AlgebraConfig {
    fn default() -> Self {
        Self {
            subcategory_depth: 10,
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Membership in any of a non-empty list of categories
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDescription {
    categories: Vec<PageRef>,
}

impl ClassDescription {
    /// `None` for an empty list
    pub fn new(categories: Vec<PageRef>) -> Option<Self> {
        if categories.is_empty() {
            None
        } else {
            Some(Self { categories })
        }
    }

    pub fn categories(&self) -> &[PageRef] {
        &self.categories
    }

    pub(crate) fn merge(&mut self, other: ClassDescription) {
        self.categories.extend(other.categories);
    }

    /// Split after `n` categories; both halves are non-empty
    pub(crate) fn split_at(&self, n: usize) -> Option<(ClassDescription, ClassDescription)> {
        if n == 0 || n >= self.categories.len() {
            return None;
        }
        let (head, tail) = self.categories.split_at(n);
        Some((
            ClassDescription {
                categories: head.to_vec(),
            },
            ClassDescription {
                categories: tail.to_vec(),
            },
        ))
    }
}

/// A value constraint, optionally attached to the property it came from
#[derive(Clone, Debug, PartialEq)]
pub struct ValueDescription {
    pub item: DataItem,
    pub property: Option<PropertyRef>,
    pub comparator: Comparator,
}

/// All children must hold
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conjunction {
    conjuncts: Vec<Description>,
}

impl Conjunction {
    pub fn conjuncts(&self) -> &[Description] {
        &self.conjuncts
    }

    pub fn len(&self) -> usize {
        self.conjuncts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conjuncts.is_empty()
    }

    /// Insert a conjunct. Its print requests move into `lifted`.
    pub(crate) fn push(&mut self, mut description: Description, lifted: &mut Vec<PrintRequest>) {
        lifted.append(&mut description.print_requests);
        match description.node {
            Node::Thing => {}
            Node::Conjunction(inner) => self.conjuncts.extend(inner.conjuncts),
            node => self.conjuncts.push(Description::from(node)),
        }
    }

    pub(crate) fn into_conjuncts(self) -> Vec<Description> {
        self.conjuncts
    }
}

/// At least one child must hold
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disjunction {
    disjuncts: Vec<Description>,
    class_slot: Option<usize>,
    always_true: bool,
}

impl Disjunction {
    pub fn disjuncts(&self) -> &[Description] {
        &self.disjuncts
    }

    pub fn len(&self) -> usize {
        self.disjuncts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disjuncts.is_empty()
    }

    /// Set once a Thing was inserted; the disjunction then matches
    /// everything and keeps no disjuncts.
    pub fn is_always_true(&self) -> bool {
        self.always_true
    }

    /// Insert a disjunct. Its print requests move into `lifted`.
    ///
    /// A Thing makes the whole disjunction trivially true and discards the
    /// other disjuncts without logging them.
    pub(crate) fn push(&mut self, mut description: Description, lifted: &mut Vec<PrintRequest>) {
        lifted.append(&mut description.print_requests);
        if description.is_thing() {
            self.always_true = true;
            self.disjuncts.clear();
            self.class_slot = None;
        }
        if self.always_true {
            return;
        }
        match description.node {
            Node::Class(class) => match self.class_slot {
                Some(slot) => {
                    if let Node::Class(existing) = &mut self.disjuncts[slot].node {
                        existing.merge(class);
                    }
                }
                None => {
                    self.class_slot = Some(self.disjuncts.len());
                    self.disjuncts.push(Description::from(Node::Class(class)));
                }
            },
            Node::Disjunction(inner) => {
                if inner.always_true {
                    self.push(Description::thing(), lifted);
                } else {
                    for disjunct in inner.disjuncts {
                        self.push(disjunct, lifted);
                    }
                }
            }
            node => self.disjuncts.push(Description::from(node)),
        }
    }

    pub(crate) fn into_disjuncts(self) -> Vec<Description> {
        self.disjuncts
    }
}

/// Pages that have some value for `property` satisfying `description`
#[derive(Clone, Debug, PartialEq)]
pub struct SomeProperty {
    pub property: PropertyRef,
    pub description: Box<Description>,
}

/// The variants of a description node
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Any entity; neutral element
    Thing,
    Class(ClassDescription),
    Concept(PageRef),
    Namespace(i32),
    Value(ValueDescription),
    Conjunction(Conjunction),
    Disjunction(Disjunction),
    SomeProperty(SomeProperty),
}

/// A node of the condition tree together with its print requests
#[derive(Clone, Debug, PartialEq)]
pub struct Description {
    pub(crate) node: Node,
    pub(crate) print_requests: Vec<PrintRequest>,
}

impl From<Node> for Description {
    fn from(node: Node) -> Self {
        Self {
            node,
            print_requests: Vec::new(),
        }
    }
}

impl Description {
    pub fn thing() -> Self {
        Node::Thing.into()
    }

    /// Membership in one category
    pub fn category(page: PageRef) -> Self {
        Node::Class(ClassDescription {
            categories: vec![page],
        })
        .into()
    }

    /// Membership in any of the categories; `None` if the list is empty
    pub fn class(categories: Vec<PageRef>) -> Option<Self> {
        ClassDescription::new(categories).map(|c| Node::Class(c).into())
    }

    pub fn concept(page: PageRef) -> Self {
        Node::Concept(page).into()
    }

    pub fn namespace(index: i32) -> Self {
        Node::Namespace(index).into()
    }

    pub fn value(item: DataItem, property: Option<PropertyRef>, comparator: Comparator) -> Self {
        Node::Value(ValueDescription {
            item,
            property,
            comparator,
        })
        .into()
    }

    pub fn some_property(property: PropertyRef, description: Description) -> Self {
        Node::SomeProperty(SomeProperty {
            property,
            description: Box::new(description),
        })
        .into()
    }

    /// Conjunction of the given parts (flattened; Things dropped)
    pub fn conjunction(parts: impl IntoIterator<Item = Description>) -> Self {
        let mut conjunction = Conjunction::default();
        let mut lifted = Vec::new();
        for part in parts {
            conjunction.push(part, &mut lifted);
        }
        Self {
            node: Node::Conjunction(conjunction),
            print_requests: lifted,
        }
    }

    /// Disjunction of the given parts (flattened; classes merged)
    pub fn disjunction(parts: impl IntoIterator<Item = Description>) -> Self {
        let mut disjunction = Disjunction::default();
        let mut lifted = Vec::new();
        for part in parts {
            disjunction.push(part, &mut lifted);
        }
        Self {
            node: Node::Disjunction(disjunction),
            print_requests: lifted,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn is_thing(&self) -> bool {
        matches!(self.node, Node::Thing)
    }

    /// Add a conjunct if this is a conjunction. Hands the description back
    /// otherwise.
    pub fn add_conjunct(&mut self, description: Description) -> Result<(), Description> {
        match &mut self.node {
            Node::Conjunction(c) => {
                c.push(description, &mut self.print_requests);
                Ok(())
            }
            _ => Err(description),
        }
    }

    /// Add a disjunct if this is a disjunction. Hands the description back
    /// otherwise.
    pub fn add_disjunct(&mut self, description: Description) -> Result<(), Description> {
        match &mut self.node {
            Node::Disjunction(d) => {
                d.push(description, &mut self.print_requests);
                Ok(())
            }
            _ => Err(description),
        }
    }

    /// Replace degenerate disjunctions: an always-true one becomes Thing,
    /// one with a single disjunct becomes that disjunct. Print requests are
    /// kept.
    pub fn simplified(self) -> Self {
        let Description {
            node,
            print_requests,
        } = self;
        match node {
            Node::Disjunction(d) if d.always_true => {
                Description::thing().with_print_requests(print_requests)
            }
            Node::Disjunction(d) if d.disjuncts.len() == 1 => {
                let mut only = d.into_disjuncts();
                let single = only.remove(0);
                single.with_print_requests(print_requests)
            }
            node => Description {
                node,
                print_requests,
            },
        }
    }

    // ------------------------------------------------------------------------
    // Print requests
    // ------------------------------------------------------------------------

    pub fn print_requests(&self) -> &[PrintRequest] {
        &self.print_requests
    }

    pub fn add_print_request(&mut self, request: PrintRequest) {
        self.print_requests.push(request);
    }

    /// Append print requests after the existing ones
    pub fn with_print_requests(mut self, requests: Vec<PrintRequest>) -> Self {
        self.print_requests.extend(requests);
        self
    }

    pub fn extend_print_requests(&mut self, requests: Vec<PrintRequest>) {
        self.print_requests.extend(requests);
    }

    pub fn take_print_requests(&mut self) -> Vec<PrintRequest> {
        std::mem::take(&mut self.print_requests)
    }

    // ------------------------------------------------------------------------
    // Measures
    // ------------------------------------------------------------------------

    /// Cost of evaluating the description
    pub fn size(&self, config: &AlgebraConfig) -> usize {
        match &self.node {
            Node::Thing => 0,
            Node::Class(class) => {
                if config.subcategory_depth > 0 {
                    1
                } else {
                    class.categories.len()
                }
            }
            Node::Concept(_) | Node::Namespace(_) | Node::Value(_) => 1,
            Node::Conjunction(c) => c.conjuncts.iter().map(|d| d.size(config)).sum(),
            Node::Disjunction(d) => d.disjuncts.iter().map(|d| d.size(config)).sum(),
            Node::SomeProperty(sp) => 1 + sp.description.size(config),
        }
    }

    /// Nesting depth of property conditions
    pub fn depth(&self) -> usize {
        match &self.node {
            Node::Thing
            | Node::Class(_)
            | Node::Concept(_)
            | Node::Namespace(_)
            | Node::Value(_) => 0,
            Node::Conjunction(c) => c.conjuncts.iter().map(Description::depth).max().unwrap_or(0),
            Node::Disjunction(d) => d.disjuncts.iter().map(Description::depth).max().unwrap_or(0),
            Node::SomeProperty(sp) => 1 + sp.description.depth(),
        }
    }

    /// True only if the description can match at most one entity
    /// regardless of what is stored
    pub fn is_singleton(&self) -> bool {
        match &self.node {
            Node::Value(v) => v.comparator == Comparator::Equal,
            Node::Conjunction(c) => c.conjuncts.iter().any(Description::is_singleton),
            Node::Disjunction(d) => d.disjuncts.len() == 1 && d.disjuncts[0].is_singleton(),
            Node::Thing
            | Node::Class(_)
            | Node::Concept(_)
            | Node::Namespace(_)
            | Node::SomeProperty(_) => false,
        }
    }

    /// The feature flag of this node alone
    pub fn own_feature(&self) -> QueryFeatures {
        match &self.node {
            Node::Thing | Node::Value(_) => QueryFeatures::NONE,
            Node::Class(_) => QueryFeatures::CATEGORY,
            Node::Concept(_) => QueryFeatures::CONCEPT,
            Node::Namespace(_) => QueryFeatures::NAMESPACE,
            Node::Conjunction(_) => QueryFeatures::CONJUNCTION,
            Node::Disjunction(_) => QueryFeatures::DISJUNCTION,
            Node::SomeProperty(_) => QueryFeatures::PROPERTY,
        }
    }

    /// Features used anywhere in the tree
    pub fn query_features(&self) -> QueryFeatures {
        let own = self.own_feature();
        match &self.node {
            Node::Conjunction(c) => c
                .conjuncts
                .iter()
                .fold(own, |acc, d| acc | d.query_features()),
            Node::Disjunction(d) => d
                .disjuncts
                .iter()
                .fold(own, |acc, d| acc | d.query_features()),
            Node::SomeProperty(sp) => own | sp.description.query_features(),
            _ => own,
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string(false))
    }
}
