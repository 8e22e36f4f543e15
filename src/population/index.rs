//! Filtered, incrementally maintained person sets

use crate::core::types::{Focus, GroupId, IndexKey, PersonId};
use crate::population::filter::{Attribute, Filter, PersonView};
use crate::population::people_set::PeopleSet;

/// A named set of the people currently satisfying a filter
#[derive(Debug, Clone)]
pub struct PopulationIndex {
    key: IndexKey,
    owner: Focus,
    filter: Filter,
    dependencies: Vec<Attribute>,
    members: PeopleSet,
}

impl PopulationIndex {
    /// Builds the index with one pass over the current population
    pub fn build<V, I>(key: IndexKey, owner: Focus, filter: Filter, view: &V, people: I) -> Self
    where
        V: PersonView + ?Sized,
        I: IntoIterator<Item = PersonId>,
    {
        let mut members = PeopleSet::new();
        for person in people {
            if filter.evaluate(view, person) {
                members.insert(person);
            }
        }
        Self {
            key,
            owner,
            dependencies: filter.dependencies(),
            filter,
            members,
        }
    }

    pub fn key(&self) -> &IndexKey {
        &self.key
    }

    pub fn owner(&self) -> &Focus {
        &self.owner
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn dependencies(&self) -> &[Attribute] {
        &self.dependencies
    }

    pub fn members(&self) -> &PeopleSet {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, person: PersonId) -> bool {
        self.members.contains(person)
    }

    /// Re-tests one person; true when membership changed
    pub fn refresh<V: PersonView + ?Sized>(&mut self, view: &V, person: PersonId) -> bool {
        if self.filter.evaluate(view, person) {
            self.members.insert(person)
        } else {
            self.members.remove(person)
        }
    }

    pub fn remove_person(&mut self, person: PersonId) -> bool {
        self.members.remove(person)
    }

    pub fn forget_group(&mut self, group: GroupId) -> bool {
        self.filter.forget_group(group)
    }
}
