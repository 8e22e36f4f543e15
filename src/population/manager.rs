//! Registry of indices and partitions, fed every person-level change
//!
//! Each registered entry lists the attributes its filter and dimensions
//! read. A change to one attribute only reaches the entries that depend on
//! it, so the cost of a write is proportional to the number of interested
//! entries, never to the population.

use ahash::AHashMap;

use crate::core::error::ErrorKind;
use crate::core::types::{Focus, GroupId, IndexKey, PersonId};
use crate::population::filter::{Attribute, Filter, PersonView};
use crate::population::index::PopulationIndex;
use crate::population::partition::{Partition, PartitionSpec};

#[derive(Debug, Clone)]
pub enum IndexEntry {
    Index(PopulationIndex),
    Partition(Partition),
}

impl IndexEntry {
    pub fn owner(&self) -> &Focus {
        match self {
            IndexEntry::Index(index) => index.owner(),
            IndexEntry::Partition(partition) => partition.owner(),
        }
    }

    fn dependencies(&self) -> &[Attribute] {
        match self {
            IndexEntry::Index(index) => index.dependencies(),
            IndexEntry::Partition(partition) => partition.dependencies(),
        }
    }

    fn refresh<V: PersonView + ?Sized>(&mut self, view: &V, person: PersonId) -> bool {
        match self {
            IndexEntry::Index(index) => index.refresh(view, person),
            IndexEntry::Partition(partition) => partition.refresh(view, person),
        }
    }

    fn remove_person(&mut self, person: PersonId) -> bool {
        match self {
            IndexEntry::Index(index) => index.remove_person(person),
            IndexEntry::Partition(partition) => partition.remove_person(person),
        }
    }

    fn forget_group(&mut self, group: GroupId) -> bool {
        match self {
            IndexEntry::Index(index) => index.forget_group(group),
            IndexEntry::Partition(partition) => partition.forget_group(group),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexEntry::Index(index) => index.len(),
            IndexEntry::Partition(partition) => partition.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PopulationIndexManager {
    entries: AHashMap<IndexKey, IndexEntry>,
    /// Keys in registration order
    keys: Vec<IndexKey>,
    dependents: AHashMap<Attribute, Vec<IndexKey>>,
}

impl PopulationIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> &[IndexKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn entry(&self, key: &IndexKey) -> Result<&IndexEntry, ErrorKind> {
        self.entries
            .get(key)
            .ok_or_else(|| ErrorKind::UnknownIndex(key.clone()))
    }

    /// A key naming a partition is not an index, and vice versa
    pub fn index(&self, key: &IndexKey) -> Result<&PopulationIndex, ErrorKind> {
        match self.entry(key)? {
            IndexEntry::Index(index) => Ok(index),
            IndexEntry::Partition(_) => Err(ErrorKind::UnknownIndex(key.clone())),
        }
    }

    pub fn partition(&self, key: &IndexKey) -> Result<&Partition, ErrorKind> {
        match self.entry(key)? {
            IndexEntry::Partition(partition) => Ok(partition),
            IndexEntry::Index(_) => Err(ErrorKind::UnknownIndex(key.clone())),
        }
    }

    fn check_free(&self, key: &IndexKey) -> Result<(), ErrorKind> {
        if self.entries.contains_key(key) {
            return Err(ErrorKind::DuplicateIndex(key.clone()));
        }
        Ok(())
    }

    fn register(&mut self, key: IndexKey, entry: IndexEntry) {
        for attribute in entry.dependencies() {
            self.dependents
                .entry(attribute.clone())
                .or_default()
                .push(key.clone());
        }
        tracing::debug!(key = %key, size = entry.len(), "population index registered");
        self.keys.push(key.clone());
        self.entries.insert(key, entry);
    }

    pub fn add_index<V, I>(
        &mut self,
        key: IndexKey,
        owner: Focus,
        filter: Filter,
        view: &V,
        people: I,
    ) -> Result<(), ErrorKind>
    where
        V: PersonView + ?Sized,
        I: IntoIterator<Item = PersonId>,
    {
        self.check_free(&key)?;
        let index = PopulationIndex::build(key.clone(), owner, filter, view, people);
        self.register(key, IndexEntry::Index(index));
        Ok(())
    }

    pub fn add_partition<V, I>(
        &mut self,
        key: IndexKey,
        owner: Focus,
        spec: PartitionSpec,
        view: &V,
        people: I,
    ) -> Result<(), ErrorKind>
    where
        V: PersonView + ?Sized,
        I: IntoIterator<Item = PersonId>,
    {
        self.check_free(&key)?;
        let partition = Partition::build(key.clone(), owner, spec, view, people);
        self.register(key, IndexEntry::Partition(partition));
        Ok(())
    }

    /// Unregisters an entry; ownership is checked by the caller
    pub fn remove(&mut self, key: &IndexKey) -> Result<IndexEntry, ErrorKind> {
        let entry = self
            .entries
            .remove(key)
            .ok_or_else(|| ErrorKind::UnknownIndex(key.clone()))?;
        for attribute in entry.dependencies() {
            if let Some(keys) = self.dependents.get_mut(attribute) {
                keys.retain(|k| k != key);
                if keys.is_empty() {
                    self.dependents.remove(attribute);
                }
            }
        }
        self.keys.retain(|k| k != key);
        tracing::debug!(key = %key, "population index removed");
        Ok(entry)
    }

    /// A new person is tested against every entry
    pub fn on_person_added<V: PersonView + ?Sized>(&mut self, view: &V, person: PersonId) {
        for entry in self.entries.values_mut() {
            entry.refresh(view, person);
        }
    }

    pub fn on_person_removed(&mut self, person: PersonId) {
        for entry in self.entries.values_mut() {
            entry.remove_person(person);
        }
    }

    /// Detaches filters from a removed group so a recycled id cannot
    /// satisfy them. The group's members must already have been re-tested.
    pub fn on_group_removed(&mut self, group: GroupId) {
        for key in &self.keys {
            if let Some(entry) = self.entries.get_mut(key) {
                if entry.forget_group(group) {
                    tracing::debug!(key = %key, group = %group, "index detached from removed group");
                }
            }
        }
    }

    /// Re-tests one person against the entries that read `attribute`
    pub fn on_attribute_changed<V: PersonView + ?Sized>(
        &mut self,
        view: &V,
        person: PersonId,
        attribute: &Attribute,
    ) {
        let Some(keys) = self.dependents.get(attribute) else {
            return;
        };
        for key in keys {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.refresh(view, person);
            }
        }
    }
}
