//! Groups and person ↔ group membership

use crate::core::config::ReverseIndexPolicy;
use crate::core::types::{GroupId, GroupTypeId, PersonId};
use crate::store::location::MemberIndex;
use crate::store::slots::{IdMap, SlotVec};

#[derive(Debug, Clone)]
struct GroupRecord {
    group_type: GroupTypeId,
    /// Kept even when the reverse index is off, so removal stays cheap
    size: usize,
}

#[derive(Debug, Clone)]
pub struct GroupStore {
    group_types: IdMap<GroupTypeId>,
    groups: SlotVec<GroupRecord>,
    /// Live groups per type slot, in creation order
    by_type: Vec<Vec<GroupId>>,
    /// Forward relation: person slot → groups
    person_groups: Vec<Vec<GroupId>>,
    /// Reverse relation: group slot → people
    members: MemberIndex,
}

impl GroupStore {
    pub fn new(group_types: IdMap<GroupTypeId>, policy: ReverseIndexPolicy) -> Self {
        let type_count = group_types.len();
        Self {
            group_types,
            groups: SlotVec::new(),
            by_type: vec![Vec::new(); type_count],
            person_groups: Vec::new(),
            members: MemberIndex::new(policy, 0),
        }
    }

    pub fn group_type_ids(&self) -> &[GroupTypeId] {
        self.group_types.ids()
    }

    pub fn has_group_type(&self, group_type: GroupTypeId) -> bool {
        self.group_types.contains(group_type)
    }

    /// None if the group type is unknown
    pub fn create(&mut self, group_type: GroupTypeId) -> Option<GroupId> {
        let type_slot = self.group_types.slot(group_type)?;
        let slot = self.groups.insert(GroupRecord { group_type, size: 0 });
        let group = GroupId(slot);
        self.members.ensure_bucket(slot);
        self.by_type[type_slot].push(group);
        Some(group)
    }

    /// Removes a group and every membership in it; returns the former
    /// members in membership order
    pub fn remove(&mut self, group: GroupId) -> Option<Vec<PersonId>> {
        let members = self.members(group);
        let record = self.groups.remove(group.index())?;
        for person in &members {
            if let Some(groups) = self.person_groups.get_mut(person.index()) {
                groups.retain(|&g| g != group);
            }
        }
        self.members.clear_bucket(group.index());
        if let Some(type_slot) = self.group_types.slot(record.group_type) {
            self.by_type[type_slot].retain(|&g| g != group);
        }
        Some(members)
    }

    pub fn exists(&self, group: GroupId) -> bool {
        self.groups.contains(group.index())
    }

    pub fn group_type(&self, group: GroupId) -> Option<GroupTypeId> {
        self.groups.get(group.index()).map(|record| record.group_type)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.iter().map(|(slot, _)| GroupId(slot)).collect()
    }

    pub fn groups_of_type(&self, group_type: GroupTypeId) -> &[GroupId] {
        self.group_types
            .slot(group_type)
            .map(|slot| self.by_type[slot].as_slice())
            .unwrap_or(&[])
    }

    pub fn groups_for_person(&self, person: PersonId) -> &[GroupId] {
        self.person_groups
            .get(person.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[inline]
    pub fn is_member(&self, person: PersonId, group: GroupId) -> bool {
        self.groups_for_person(person).contains(&group)
    }

    /// Number of groups of a type the person belongs to
    pub fn type_count_for_person(&self, person: PersonId, group_type: GroupTypeId) -> usize {
        self.groups_for_person(person)
            .iter()
            .filter(|&&group| self.group_type(group) == Some(group_type))
            .count()
    }

    pub fn group_size(&self, group: GroupId) -> usize {
        self.groups.get(group.index()).map_or(0, |record| record.size)
    }

    /// False if the group doesn't exist or the person is already a member
    pub fn add_member(&mut self, person: PersonId, group: GroupId) -> bool {
        if self.is_member(person, group) {
            return false;
        }
        let Some(record) = self.groups.get_mut(group.index()) else {
            return false;
        };
        record.size += 1;
        let slot = person.index();
        if self.person_groups.len() <= slot {
            self.person_groups.resize_with(slot + 1, Vec::new);
        }
        self.person_groups[slot].push(group);
        self.members.insert(group.index(), person);
        true
    }

    pub fn remove_member(&mut self, person: PersonId, group: GroupId) -> bool {
        let Some(groups) = self.person_groups.get_mut(person.index()) else {
            return false;
        };
        let Some(pos) = groups.iter().position(|&g| g == group) else {
            return false;
        };
        groups.remove(pos);
        if let Some(record) = self.groups.get_mut(group.index()) {
            record.size -= 1;
        }
        self.members.remove(group.index(), person);
        true
    }

    /// Drops a person from every group; returns the groups they left
    pub fn remove_person(&mut self, person: PersonId) -> Vec<GroupId> {
        let groups = match self.person_groups.get_mut(person.index()) {
            Some(groups) => std::mem::take(groups),
            None => return Vec::new(),
        };
        for &group in &groups {
            if let Some(record) = self.groups.get_mut(group.index()) {
                record.size -= 1;
            }
            self.members.remove(group.index(), person);
        }
        groups
    }

    /// Members of a group, via the reverse index or a scan of the forward
    /// relation
    pub fn members(&self, group: GroupId) -> Vec<PersonId> {
        if !self.exists(group) {
            return Vec::new();
        }
        if let Some(members) = self.members.members(group.index()) {
            return members;
        }
        self.person_groups
            .iter()
            .enumerate()
            .filter(|(_, groups)| groups.contains(&group))
            .map(|(slot, _)| PersonId(slot))
            .collect()
    }

    pub fn indexed_len(&self, group: GroupId) -> Option<usize> {
        self.members.len(group.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(policy: ReverseIndexPolicy) -> GroupStore {
        let types = IdMap::from_ids([GroupTypeId(1), GroupTypeId(2)]).unwrap();
        GroupStore::new(types, policy)
    }

    #[test]
    fn test_membership_both_directions() {
        for policy in [ReverseIndexPolicy::None, ReverseIndexPolicy::Array, ReverseIndexPolicy::Hash] {
            let mut groups = store(policy);
            let household = groups.create(GroupTypeId(1)).unwrap();
            let school = groups.create(GroupTypeId(2)).unwrap();

            assert!(groups.add_member(PersonId(0), household));
            assert!(groups.add_member(PersonId(1), household));
            assert!(groups.add_member(PersonId(0), school));
            assert!(!groups.add_member(PersonId(0), school));

            assert_eq!(groups.members(household), vec![PersonId(0), PersonId(1)]);
            assert_eq!(groups.groups_for_person(PersonId(0)), &[household, school]);
            assert_eq!(groups.group_size(household), 2);
            assert_eq!(groups.type_count_for_person(PersonId(0), GroupTypeId(2)), 1);

            assert!(groups.remove_member(PersonId(0), household));
            assert!(!groups.remove_member(PersonId(0), household));
            assert_eq!(groups.members(household), vec![PersonId(1)]);
        }
    }

    #[test]
    fn test_remove_group_clears_memberships() {
        let mut groups = store(ReverseIndexPolicy::Hash);
        let group = groups.create(GroupTypeId(1)).unwrap();
        groups.add_member(PersonId(3), group);
        groups.add_member(PersonId(5), group);

        assert_eq!(groups.remove(group), Some(vec![PersonId(3), PersonId(5)]));
        assert!(!groups.exists(group));
        assert!(groups.groups_for_person(PersonId(3)).is_empty());
        assert!(groups.groups_of_type(GroupTypeId(1)).is_empty());

        // the slot is reused with an empty membership
        let reused = groups.create(GroupTypeId(2)).unwrap();
        assert_eq!(reused, group);
        assert!(groups.members(reused).is_empty());
    }

    #[test]
    fn test_remove_person_leaves_all_groups() {
        let mut groups = store(ReverseIndexPolicy::Array);
        let a = groups.create(GroupTypeId(1)).unwrap();
        let b = groups.create(GroupTypeId(1)).unwrap();
        groups.add_member(PersonId(2), a);
        groups.add_member(PersonId(2), b);

        assert_eq!(groups.remove_person(PersonId(2)), vec![a, b]);
        assert_eq!(groups.group_size(a), 0);
        assert_eq!(groups.indexed_len(b), Some(0));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut groups = store(ReverseIndexPolicy::Array);
        assert_eq!(groups.create(GroupTypeId(9)), None);
    }
}
