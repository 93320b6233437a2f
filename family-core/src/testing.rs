//! Consistency checks for a [`FamilyStore`].
//!
//! These are used by the test suites, and are public so that front ends and
//! storage backends can verify data they produce.

use crate::member::MemberId;
use crate::store::FamilyStore;
use std::fmt;

/// A broken structural rule found in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A spouse, parent or child id does not resolve.
    Dangling { member: MemberId, missing: MemberId },
    /// A member refers to itself.
    SelfReference { member: MemberId },
    /// `member` points at `spouse`, but `spouse` points elsewhere.
    AsymmetricSpouse { member: MemberId, spouse: MemberId },
    /// `child` lists `parent` without the inverse, or the other way round.
    AsymmetricParentage { parent: MemberId, child: MemberId },
    /// More than two parents recorded.
    TooManyParents { member: MemberId, count: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dangling { member, missing } => {
                write!(f, "member {member} refers to missing member {missing}")
            }
            Self::SelfReference { member } => write!(f, "member {member} refers to itself"),
            Self::AsymmetricSpouse { member, spouse } => {
                write!(f, "member {member} is married to {spouse}, which does not reciprocate")
            }
            Self::AsymmetricParentage { parent, child } => {
                write!(f, "parent {parent} and child {child} are not linked both ways")
            }
            Self::TooManyParents { member, count } => {
                write!(f, "member {member} has {count} parents")
            }
        }
    }
}

/// Collect every invariant violation in the store.
pub fn check_invariants(store: &FamilyStore) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for member in store.all() {
        let id = member.id;
        let refs = member
            .spouse_id
            .iter()
            .chain(&member.parents)
            .chain(&member.children);

        for &other in refs {
            if other == id {
                violations.push(InvariantViolation::SelfReference { member: id });
            } else if !store.contains(other) {
                violations.push(InvariantViolation::Dangling { member: id, missing: other });
            }
        }

        if member.parents.len() > 2 {
            violations.push(InvariantViolation::TooManyParents {
                member: id,
                count: member.parents.len(),
            });
        }

        if let Some(spouse) = member.spouse_id.and_then(|s| store.get(s)) {
            if spouse.spouse_id != Some(id) {
                violations.push(InvariantViolation::AsymmetricSpouse { member: id, spouse: spouse.id });
            }
        }

        for parent in member.parents.iter().filter_map(|p| store.get(*p)) {
            if !parent.children.contains(&id) {
                violations.push(InvariantViolation::AsymmetricParentage { parent: parent.id, child: id });
            }
        }
        for child in member.children.iter().filter_map(|c| store.get(*c)) {
            if !child.parents.contains(&id) {
                violations.push(InvariantViolation::AsymmetricParentage { parent: id, child: child.id });
            }
        }
    }

    violations
}

/// Panic with a readable report if the store breaks any invariant.
pub fn assert_consistent(store: &FamilyStore) {
    let violations = check_invariants(store);
    if !violations.is_empty() {
        let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("store is inconsistent:\n  {}", report.join("\n  "));
    }
}
