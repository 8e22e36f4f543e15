//! Dense person set with O(1) insert, remove and membership test

use crate::core::types::PersonId;

const ABSENT: u32 = u32::MAX;

/// Members in a packed vector plus a slot → position table.
///
/// Removal swaps the last member into the hole, so member order is not
/// insertion order, but it is deterministic for a given operation history.
#[derive(Debug, Clone, Default)]
pub struct PeopleSet {
    members: Vec<PersonId>,
    positions: Vec<u32>,
}

impl PeopleSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self, person: PersonId) -> Option<usize> {
        match self.positions.get(person.index()) {
            Some(&pos) if pos != ABSENT => Some(pos as usize),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, person: PersonId) -> bool {
        self.position(person).is_some()
    }

    /// False if already present
    pub fn insert(&mut self, person: PersonId) -> bool {
        if self.contains(person) {
            return false;
        }
        let slot = person.index();
        if self.positions.len() <= slot {
            self.positions.resize(slot + 1, ABSENT);
        }
        self.positions[slot] = self.members.len() as u32;
        self.members.push(person);
        true
    }

    /// False if absent
    pub fn remove(&mut self, person: PersonId) -> bool {
        let Some(pos) = self.position(person) else {
            return false;
        };
        self.members.swap_remove(pos);
        if let Some(&moved) = self.members.get(pos) {
            self.positions[moved.index()] = pos as u32;
        }
        self.positions[person.index()] = ABSENT;
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<PersonId> {
        self.members.get(position).copied()
    }

    pub fn as_slice(&self) -> &[PersonId] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.members.iter().copied()
    }

    /// Members in ascending id order
    pub fn sorted(&self) -> Vec<PersonId> {
        let mut members = self.members.clone();
        members.sort_unstable();
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = PeopleSet::new();
        assert!(set.insert(PersonId(4)));
        assert!(set.insert(PersonId(1)));
        assert!(set.insert(PersonId(9)));
        assert!(!set.insert(PersonId(1)));
        assert_eq!(set.len(), 3);

        assert!(set.remove(PersonId(4)));
        assert!(!set.remove(PersonId(4)));
        assert!(!set.contains(PersonId(4)));
        assert!(set.contains(PersonId(9)));
        assert_eq!(set.sorted(), vec![PersonId(1), PersonId(9)]);
    }

    #[test]
    fn test_positions_follow_swap_remove() {
        let mut set = PeopleSet::new();
        for i in 0..5 {
            set.insert(PersonId(i));
        }
        set.remove(PersonId(1));
        for (pos, person) in set.iter().enumerate() {
            assert_eq!(set.position(person), Some(pos));
        }
        assert_eq!(set.get(1), Some(PersonId(4)));
    }

    #[test]
    fn test_remove_last_member() {
        let mut set = PeopleSet::new();
        set.insert(PersonId(2));
        assert!(set.remove(PersonId(2)));
        assert!(set.is_empty());
        assert!(set.insert(PersonId(2)));
        assert_eq!(set.position(PersonId(2)), Some(0));
    }
}
