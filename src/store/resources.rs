//! Resource levels held by people, regions and materials producers

use crate::core::error::ErrorKind;
use crate::core::types::{ResourceId, Time};
use crate::store::slots::IdMap;

/// Dense non-negative levels of one resource across one kind of holder
#[derive(Debug, Clone)]
pub struct ResourceLevels {
    resource: ResourceId,
    levels: Vec<u64>,
    times: Option<Vec<Time>>,
}

impl ResourceLevels {
    pub fn new(resource: ResourceId, track_time: bool) -> Self {
        Self {
            resource,
            levels: Vec::new(),
            times: track_time.then(Vec::new),
        }
    }

    #[inline]
    pub fn get(&self, slot: usize) -> u64 {
        self.levels.get(slot).copied().unwrap_or(0)
    }

    pub fn time(&self, slot: usize) -> Option<Time> {
        self.times
            .as_ref()
            .map(|times| times.get(slot).copied().unwrap_or(0.0))
    }

    pub fn tracks_time(&self) -> bool {
        self.times.is_some()
    }

    pub fn check_add(&self, slot: usize, amount: u64) -> Result<u64, ErrorKind> {
        self.get(slot)
            .checked_add(amount)
            .ok_or(ErrorKind::ResourceOverflow(self.resource))
    }

    pub fn check_remove(&self, slot: usize, amount: u64) -> Result<u64, ErrorKind> {
        let available = self.get(slot);
        available
            .checked_sub(amount)
            .ok_or(ErrorKind::InsufficientResource {
                resource: self.resource,
                available,
                requested: amount,
            })
    }

    fn store(&mut self, slot: usize, level: u64, time: Time) {
        if self.levels.len() <= slot {
            self.levels.resize(slot + 1, 0);
        }
        self.levels[slot] = level;
        if let Some(times) = self.times.as_mut() {
            if times.len() <= slot {
                times.resize(slot + 1, 0.0);
            }
            times[slot] = time;
        }
    }

    /// Returns the new level
    pub fn add(&mut self, slot: usize, amount: u64, time: Time) -> Result<u64, ErrorKind> {
        let level = self.check_add(slot, amount)?;
        self.store(slot, level, time);
        Ok(level)
    }

    /// Returns the new level
    pub fn remove(&mut self, slot: usize, amount: u64, time: Time) -> Result<u64, ErrorKind> {
        let level = self.check_remove(slot, amount)?;
        self.store(slot, level, time);
        Ok(level)
    }

    /// Zeroes a slot without touching its time; returns what it held
    pub fn clear(&mut self, slot: usize) -> u64 {
        let held = self.get(slot);
        if let Some(level) = self.levels.get_mut(slot) {
            *level = 0;
        }
        if let Some(time) = self.times.as_mut().and_then(|times| times.get_mut(slot)) {
            *time = 0.0;
        }
        held
    }
}

/// Which kind of holder a level belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderKind {
    Person,
    Region,
    Producer,
}

#[derive(Debug, Clone)]
pub struct ResourceStore {
    resources: IdMap<ResourceId>,
    person: Vec<ResourceLevels>,
    region: Vec<ResourceLevels>,
    producer: Vec<ResourceLevels>,
}

impl ResourceStore {
    /// `track_person_time` pairs each resource with its person time policy;
    /// region and producer levels are always time-tracked
    pub fn new(resources: &[(ResourceId, bool)]) -> Result<Self, ResourceId> {
        let map = IdMap::from_ids(resources.iter().map(|(id, _)| *id))?;
        Ok(Self {
            person: resources
                .iter()
                .map(|&(id, track)| ResourceLevels::new(id, track))
                .collect(),
            region: resources
                .iter()
                .map(|&(id, _)| ResourceLevels::new(id, true))
                .collect(),
            producer: resources
                .iter()
                .map(|&(id, _)| ResourceLevels::new(id, true))
                .collect(),
            resources: map,
        })
    }

    pub fn resource_ids(&self) -> &[ResourceId] {
        self.resources.ids()
    }

    pub fn slot(&self, resource: ResourceId) -> Option<usize> {
        self.resources.slot(resource)
    }

    pub fn contains(&self, resource: ResourceId) -> bool {
        self.resources.contains(resource)
    }

    pub fn levels(&self, holder: HolderKind, resource: ResourceId) -> Option<&ResourceLevels> {
        let slot = self.resources.slot(resource)?;
        Some(match holder {
            HolderKind::Person => &self.person[slot],
            HolderKind::Region => &self.region[slot],
            HolderKind::Producer => &self.producer[slot],
        })
    }

    pub fn levels_mut(
        &mut self,
        holder: HolderKind,
        resource: ResourceId,
    ) -> Option<&mut ResourceLevels> {
        let slot = self.resources.slot(resource)?;
        Some(match holder {
            HolderKind::Person => &mut self.person[slot],
            HolderKind::Region => &mut self.region[slot],
            HolderKind::Producer => &mut self.producer[slot],
        })
    }

    pub fn level(&self, holder: HolderKind, resource: ResourceId, slot: usize) -> u64 {
        self.levels(holder, resource).map_or(0, |levels| levels.get(slot))
    }

    /// Non-zero person holdings, in resource order
    pub fn person_snapshot(&self, person_slot: usize) -> Vec<(ResourceId, u64)> {
        self.person
            .iter()
            .zip(self.resources.ids())
            .map(|(levels, &id)| (id, levels.get(person_slot)))
            .filter(|&(_, amount)| amount > 0)
            .collect()
    }

    /// Clears every resource a removed person held
    pub fn clear_person(&mut self, person_slot: usize) {
        for levels in &mut self.person {
            levels.clear(person_slot);
        }
    }
}
