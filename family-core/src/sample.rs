//! Built-in sample family, used when no saved tree can be loaded.

use crate::member::{Gender, Member, MemberId, NewMember};
use crate::store::FamilyStore;

fn member(
    id: u64,
    name: &str,
    gender: Gender,
    spouse: Option<u64>,
    parents: &[u64],
    children: &[u64],
) -> Member {
    let mut m = Member::from_new(MemberId::new(id), NewMember::new(name, gender));
    m.spouse_id = spouse.map(MemberId::new);
    m.parents = parents.iter().copied().map(MemberId::new).collect();
    m.children = children.iter().copied().map(MemberId::new).collect();
    m
}

/// Three generations: Alice and Bob, their children Charlie and Dina,
/// Dina's husband Evan, and their daughter Fay.
pub fn sample_store() -> FamilyStore {
    FamilyStore::from_members([
        member(1, "Alice (mother)", Gender::Female, Some(2), &[], &[3, 4]),
        member(2, "Bob (father)", Gender::Male, Some(1), &[], &[3, 4]),
        member(3, "Charlie", Gender::Male, None, &[1, 2], &[]),
        member(4, "Dina", Gender::Female, Some(5), &[1, 2], &[6]),
        member(5, "Evan (spouse of Dina)", Gender::Male, Some(4), &[], &[6]),
        member(6, "Fay", Gender::Female, None, &[4, 5], &[]),
    ])
}
