//! The member store and the mutations that keep its links consistent.

use crate::member::{Attachment, Member, MemberId, MemberPatch, NewMember};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised at the mutation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberError {
    #[error("member name must not be empty")]
    EmptyName,
}

/// The canonical set of members, keyed by id.
///
/// All writes go through [`add_member`](Self::add_member),
/// [`update_member`](Self::update_member) and
/// [`delete_member`](Self::delete_member). After each of them:
///
/// - every spouse, parent and child id resolves to a member in the store,
/// - spouse links are mirrored on both records,
/// - `c` is in `p.children` exactly when `p` is in `c.parents`,
/// - no member refers to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyStore {
    members: BTreeMap<MemberId, Member>,
    /// Next candidate id. Allocation skips ids that are already taken.
    next_id: u64,
}

impl Default for FamilyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FamilyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Build a store from existing records.
    ///
    /// Later records replace earlier ones with the same id. Broken or
    /// one-sided links are repaired so the result is consistent; the id
    /// counter starts above the largest id present.
    pub fn from_members(members: impl IntoIterator<Item = Member>) -> Self {
        let mut store = Self::new();
        for member in members {
            store.insert_raw(member);
        }
        let repairs = store.repair_references();
        if repairs > 0 {
            warn!(repairs, "Repaired inconsistent member references");
        }
        store
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Get a member by id.
    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Check whether a member exists.
    pub fn contains(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    /// All members in ascending id order.
    pub fn all(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// The underlying id to member mapping.
    pub fn members(&self) -> &BTreeMap<MemberId, Member> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The spouse of a member, if both exist.
    pub fn spouse_of(&self, id: MemberId) -> Option<&Member> {
        self.get(id)
            .and_then(|m| m.spouse_id)
            .and_then(|s| self.get(s))
    }

    /// Members that list `id` among their parents, in ascending id order.
    pub fn children_of(&self, id: MemberId) -> Vec<&Member> {
        self.members
            .values()
            .filter(|m| m.parents.contains(&id))
            .collect()
    }

    /// The recorded parents of a member that still exist.
    pub fn parents_of(&self, id: MemberId) -> Vec<&Member> {
        self.get(id)
            .map(|m| m.parents.iter().filter_map(|p| self.get(*p)).collect())
            .unwrap_or_default()
    }

    /// Members whose name contains `query` (case-insensitive), sorted by name.
    pub fn find_by_name(&self, query: &str) -> Vec<&Member> {
        let mut found: Vec<_> = self
            .members
            .values()
            .filter(|m| m.matches_partial(query))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a member and link it as requested.
    ///
    /// A missing attachment target is not an error: the member is created
    /// unlinked. When marrying a target that already has a spouse, the prior
    /// spouse is unlinked on both sides.
    pub fn add_member(
        &mut self,
        mut new: NewMember,
        attachment: Attachment,
    ) -> Result<MemberId, MemberError> {
        new.name = validate_name(&new.name)?;

        let id = self.allocate_id();
        self.members.insert(id, Member::from_new(id, new));

        match attachment {
            Attachment::Root => {}
            Attachment::Spouse(target) if self.contains(target) => self.marry(id, target),
            Attachment::Child(target) if self.contains(target) => self.attach_child(id, target),
            Attachment::Spouse(target) | Attachment::Child(target) => {
                warn!(%id, %target, "Attachment target not found, member added unlinked");
            }
        }

        debug!(%id, ?attachment, "Added member");
        Ok(id)
    }

    /// Overwrite the descriptive fields present in `patch`.
    ///
    /// Returns `Ok(false)` without touching the store if `id` is unknown.
    pub fn update_member(&mut self, id: MemberId, mut patch: MemberPatch) -> Result<bool, MemberError> {
        let Some(member) = self.members.get_mut(&id) else {
            debug!(%id, "Update of unknown member ignored");
            return Ok(false);
        };

        if let Some(name) = patch.name.take() {
            patch.name = Some(validate_name(&name)?);
        }

        patch.apply(member);
        debug!(%id, "Updated member");
        Ok(true)
    }

    /// Remove a member and every reference to it.
    ///
    /// Returns `false` if `id` is unknown, so repeated deletes are no-ops.
    pub fn delete_member(&mut self, id: MemberId) -> bool {
        if !self.contains(id) {
            debug!(%id, "Delete of unknown member ignored");
            return false;
        }

        for member in self.members.values_mut() {
            if member.id != id {
                member.unlink(id);
            }
        }
        self.members.remove(&id);

        debug!(%id, "Deleted member");
        true
    }

    fn marry(&mut self, id: MemberId, target: MemberId) {
        let prior = self.get(target).and_then(|m| m.spouse_id);
        if let Some(prior) = prior.filter(|p| *p != id) {
            if let Some(prior_member) = self.members.get_mut(&prior) {
                if prior_member.spouse_id == Some(target) {
                    prior_member.spouse_id = None;
                }
            }
            debug!(%target, %prior, "Unlinked prior spouse");
        }

        if let Some(member) = self.members.get_mut(&id) {
            member.spouse_id = Some(target);
        }
        if let Some(member) = self.members.get_mut(&target) {
            member.spouse_id = Some(id);
        }
    }

    fn attach_child(&mut self, child: MemberId, parent: MemberId) {
        let spouse = self
            .get(parent)
            .and_then(|m| m.spouse_id)
            .filter(|s| *s != parent && *s != child && self.contains(*s));

        let parents: Vec<MemberId> = std::iter::once(parent).chain(spouse).collect();

        for p in &parents {
            if let Some(member) = self.members.get_mut(p) {
                if !member.children.contains(&child) {
                    member.children.push(child);
                }
            }
        }
        if let Some(member) = self.members.get_mut(&child) {
            member.parents = parents;
        }
    }

    // =========================================================================
    // Internals shared with loading
    // =========================================================================

    /// Reserve a fresh id.
    pub(crate) fn allocate_id(&mut self) -> MemberId {
        loop {
            let candidate = MemberId::new(self.next_id);
            self.next_id = self.next_id.saturating_add(1);
            if !self.members.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Insert a record as-is, without touching other members.
    pub(crate) fn insert_raw(&mut self, member: Member) {
        self.next_id = self.next_id.max(member.id.get().saturating_add(1));
        self.members.insert(member.id, member);
    }

    /// Bring loaded records in line with the store invariants.
    ///
    /// Dangling, duplicate and self references are dropped, as are parents
    /// past the second. A spouse link that is not returned is cleared. A
    /// one-sided parent/child link is completed, unless the child already
    /// has two parents, in which case the parent's claim is dropped.
    /// Returns the number of changes made.
    pub(crate) fn repair_references(&mut self) -> usize {
        let ids: BTreeSet<MemberId> = self.members.keys().copied().collect();
        let mut repairs = 0;

        for member in self.members.values_mut() {
            let own = member.id;
            let valid = |id: &MemberId| *id != own && ids.contains(id);

            if member.spouse_id.is_some_and(|s| !valid(&s)) {
                member.spouse_id = None;
                repairs += 1;
            }

            for list in [&mut member.parents, &mut member.children] {
                let before = list.len();
                let mut seen = BTreeSet::new();
                list.retain(|id| valid(id) && seen.insert(*id));
                repairs += before - list.len();
            }

            if member.parents.len() > 2 {
                repairs += member.parents.len() - 2;
                member.parents.truncate(2);
            }
        }

        // Decided on the unrepaired links, so mutual pairs are never touched.
        let unreturned: Vec<MemberId> = self
            .members
            .values()
            .filter(|m| {
                m.spouse_id.is_some_and(|s| {
                    self.members.get(&s).and_then(|spouse| spouse.spouse_id) != Some(m.id)
                })
            })
            .map(|m| m.id)
            .collect();
        for id in &unreturned {
            if let Some(member) = self.members.get_mut(id) {
                member.spouse_id = None;
            }
        }
        repairs += unreturned.len();

        let unclaimed: Vec<(MemberId, MemberId)> = self
            .members
            .values()
            .flat_map(|p| p.children.iter().map(move |c| (p.id, *c)))
            .filter(|(p, c)| {
                self.members
                    .get(c)
                    .is_some_and(|child| !child.parents.contains(p))
            })
            .collect();
        for (parent, child) in unclaimed {
            let adopted = match self.members.get_mut(&child) {
                Some(member) if member.parents.len() < 2 => {
                    member.parents.push(parent);
                    true
                }
                _ => false,
            };
            if !adopted {
                if let Some(member) = self.members.get_mut(&parent) {
                    member.children.retain(|c| *c != child);
                }
            }
            repairs += 1;
        }

        let unlisted: Vec<(MemberId, MemberId)> = self
            .members
            .values()
            .flat_map(|c| c.parents.iter().map(move |p| (*p, c.id)))
            .filter(|(p, c)| {
                self.members
                    .get(p)
                    .is_some_and(|parent| !parent.children.contains(c))
            })
            .collect();
        for (parent, child) in &unlisted {
            if let Some(member) = self.members.get_mut(parent) {
                member.children.push(*child);
            }
        }
        repairs += unlisted.len();

        repairs
    }
}

fn validate_name(name: &str) -> Result<String, MemberError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MemberError::EmptyName);
    }
    Ok(trimmed.to_string())
}
