//! Turns the flat member graph into a forest for display.
//!
//! A couple is shown once, as a single node anchored at one partner, and
//! their children fan out under that node.

use crate::member::{Member, MemberId};
use crate::store::FamilyStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One display node: a member, their spouse, and the nodes of their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyNode {
    pub member: Member,
    pub spouse: Option<Member>,
    pub children: Vec<FamilyNode>,
}

impl FamilyNode {
    /// Number of generations from this node down, counting itself.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(FamilyNode::depth).max().unwrap_or(0)
    }

    /// Number of people shown in this subtree, spouses included.
    pub fn size(&self) -> usize {
        1 + usize::from(self.spouse.is_some())
            + self.children.iter().map(FamilyNode::size).sum::<usize>()
    }

    /// Ids of every member shown in this subtree, in pre-order.
    pub fn member_ids(&self) -> Vec<MemberId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<MemberId>) {
        ids.push(self.member.id);
        if let Some(spouse) = &self.spouse {
            ids.push(spouse.id);
        }
        for child in &self.children {
            child.collect_ids(ids);
        }
    }
}

/// Check whether a member anchors a top-level tree.
///
/// A member without parents is a root unless their spouse has parents (the
/// couple then hangs under the spouse's family) or their spouse is also
/// parentless with a lower id (the couple is anchored at the spouse).
pub fn is_canonical_root(store: &FamilyStore, member: &Member) -> bool {
    if member.has_parents() {
        return false;
    }
    match store.spouse_of(member.id) {
        None => true,
        Some(spouse) => !spouse.has_parents() && member.id <= spouse.id,
    }
}

/// All canonical roots, in ascending id order.
pub fn canonical_roots(store: &FamilyStore) -> Vec<&Member> {
    store
        .all()
        .filter(|m| is_canonical_root(store, m))
        .collect()
}

/// Build the display forest.
///
/// Each member becomes a node at most once across the whole forest, so a
/// child reachable from two separately rooted parents is shown under the
/// first one visited, and cyclic data cannot recurse forever. Members not
/// reachable from any root are left out.
pub fn materialize(store: &FamilyStore) -> Vec<FamilyNode> {
    let mut visited = BTreeSet::new();
    canonical_roots(store)
        .into_iter()
        .filter_map(|root| build_node(store, root, &mut visited))
        .collect()
}

fn build_node(
    store: &FamilyStore,
    member: &Member,
    visited: &mut BTreeSet<MemberId>,
) -> Option<FamilyNode> {
    if !visited.insert(member.id) {
        return None;
    }

    let spouse = store.spouse_of(member.id).cloned();
    // Descend from the node's owner only; the spouse slot is never expanded.
    let children = store
        .children_of(member.id)
        .into_iter()
        .filter_map(|child| build_node(store, child, visited))
        .collect();

    Some(FamilyNode {
        member: member.clone(),
        spouse,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Attachment, Gender, NewMember};
    use crate::sample::sample_store;
    use pretty_assertions::assert_eq;

    fn id(raw: u64) -> MemberId {
        MemberId::new(raw)
    }

    fn raw(raw_id: u64, name: &str) -> Member {
        Member::from_new(id(raw_id), NewMember::new(name, Gender::Other))
    }

    fn shape(node: &FamilyNode) -> String {
        let spouse = node
            .spouse
            .as_ref()
            .map(|s| format!("+{}", s.id))
            .unwrap_or_default();
        let children: Vec<String> = node.children.iter().map(shape).collect();
        if children.is_empty() {
            format!("{}{}", node.member.id, spouse)
        } else {
            format!("{}{}[{}]", node.member.id, spouse, children.join(","))
        }
    }

    fn forest_shape(store: &FamilyStore) -> Vec<String> {
        materialize(store).iter().map(shape).collect()
    }

    #[test]
    fn test_sample_forest() {
        assert_eq!(forest_shape(&sample_store()), vec!["1+2[3,4+5[6]]"]);
    }

    #[test]
    fn test_childless_pair_has_one_root_at_lower_id() {
        let mut a = raw(10, "Ten");
        let mut b = raw(11, "Eleven");
        a.spouse_id = Some(id(11));
        b.spouse_id = Some(id(10));
        let store = FamilyStore::from_members([b, a]);

        let roots: Vec<_> = canonical_roots(&store).iter().map(|m| m.id).collect();
        assert_eq!(roots, vec![id(10)]);
        assert_eq!(forest_shape(&store), vec!["10+11"]);
    }

    #[test]
    fn test_spouse_with_parents_is_not_a_root() {
        let store = sample_store();
        let evan = store.get(id(5)).unwrap();
        assert!(!is_canonical_root(&store, evan));
    }

    #[test]
    fn test_child_of_couple_appears_once() {
        let mut store = FamilyStore::new();
        let alice = store
            .add_member(NewMember::new("Alice", Gender::Female), Attachment::Root)
            .unwrap();
        store
            .add_member(NewMember::new("Bob", Gender::Male), Attachment::Spouse(alice))
            .unwrap();
        let carl = store
            .add_member(NewMember::new("Carl", Gender::Male), Attachment::Child(alice))
            .unwrap();

        let forest = materialize(&store);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children.len(), 1);
        let child = &forest[0].children[0];
        assert_eq!(child.member.id, carl);
        assert!(child.spouse.is_none());
        assert!(child.children.is_empty());
        assert_eq!(forest[0].size(), 3);
        assert_eq!(forest[0].depth(), 2);
    }

    #[test]
    fn test_two_families_joined_by_marriage_share_grandchild_once() {
        // 1+2 -> 3; 4+5 -> 6; 3 marries 6; their child 7.
        let mut store = FamilyStore::new();
        let p1 = store.add_member(NewMember::new("P1", Gender::Male), Attachment::Root).unwrap();
        store.add_member(NewMember::new("P2", Gender::Female), Attachment::Spouse(p1)).unwrap();
        let c3 = store.add_member(NewMember::new("C3", Gender::Male), Attachment::Child(p1)).unwrap();
        let p4 = store.add_member(NewMember::new("P4", Gender::Male), Attachment::Root).unwrap();
        store.add_member(NewMember::new("P5", Gender::Female), Attachment::Spouse(p4)).unwrap();
        let c6 = store.add_member(NewMember::new("C6", Gender::Female), Attachment::Child(p4)).unwrap();

        // Marry the two children by hand; add_member only creates new people.
        let mut members: Vec<Member> = store.all().cloned().collect();
        for m in &mut members {
            if m.id == c3 {
                m.spouse_id = Some(c6);
            } else if m.id == c6 {
                m.spouse_id = Some(c3);
            }
        }
        let mut store = FamilyStore::from_members(members);
        store
            .add_member(NewMember::new("G7", Gender::Other), Attachment::Child(c3))
            .unwrap();

        assert_eq!(forest_shape(&store), vec!["1+2[3+6[7]]", "4+5[6+3]"]);
    }

    #[test]
    fn test_cycle_does_not_recurse_forever() {
        let root = raw(1, "Root");
        let mut a = raw(2, "A");
        let mut b = raw(3, "B");
        a.parents = vec![id(1), id(3)];
        b.parents = vec![id(2)];
        let store = FamilyStore::from_members([root, a, b]);

        assert_eq!(forest_shape(&store), vec!["1[2[3]]"]);
    }

    #[test]
    fn test_unreachable_members_are_omitted() {
        let mut a = raw(1, "A");
        let mut b = raw(2, "B");
        a.parents = vec![id(2)];
        b.parents = vec![id(1)];
        let store = FamilyStore::from_members([a, b]);

        assert!(materialize(&store).is_empty());
    }

    #[test]
    fn test_empty_store() {
        assert!(materialize(&FamilyStore::new()).is_empty());
    }

    #[test]
    fn test_member_ids_preorder() {
        let forest = materialize(&sample_store());
        assert_eq!(
            forest[0].member_ids(),
            vec![id(1), id(2), id(3), id(4), id(5), id(6)]
        );
    }
}
