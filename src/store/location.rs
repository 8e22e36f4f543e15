//! Person → region and person → compartment placement
//!
//! One `LocationStore` serves each relation. The forward direction is a
//! dense array indexed by person slot; the reverse direction (bucket →
//! people) is optional and chosen by `ReverseIndexPolicy`. Population
//! counters are always kept and always match the reverse index.

use ahash::AHashSet;
use serde::Serialize;

use crate::core::config::ReverseIndexPolicy;
use crate::core::types::{PersonId, Time};

const UNPLACED: u32 = u32::MAX;

/// Running population count with the time of its last change
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PopulationCounter {
    pub count: usize,
    pub last_change: Time,
}

impl PopulationCounter {
    pub fn increment(&mut self, time: Time) {
        self.count += 1;
        self.last_change = time;
    }

    pub fn decrement(&mut self, time: Time) {
        debug_assert!(self.count > 0, "population counter underflow");
        self.count = self.count.saturating_sub(1);
        self.last_change = time;
    }
}

/// Optional bucket → people index
#[derive(Debug, Clone)]
pub(crate) enum MemberIndex {
    Unindexed,
    Array(Vec<Vec<PersonId>>),
    Hash(Vec<AHashSet<PersonId>>),
}

impl MemberIndex {
    pub fn new(policy: ReverseIndexPolicy, buckets: usize) -> Self {
        match policy {
            ReverseIndexPolicy::None => MemberIndex::Unindexed,
            ReverseIndexPolicy::Array => MemberIndex::Array(vec![Vec::new(); buckets]),
            ReverseIndexPolicy::Hash => MemberIndex::Hash(vec![AHashSet::new(); buckets]),
        }
    }

    pub fn policy(&self) -> ReverseIndexPolicy {
        match self {
            MemberIndex::Unindexed => ReverseIndexPolicy::None,
            MemberIndex::Array(_) => ReverseIndexPolicy::Array,
            MemberIndex::Hash(_) => ReverseIndexPolicy::Hash,
        }
    }

    /// Makes sure `bucket` exists; groups add buckets as they are created
    pub fn ensure_bucket(&mut self, bucket: usize) {
        match self {
            MemberIndex::Unindexed => {}
            MemberIndex::Array(buckets) => {
                if buckets.len() <= bucket {
                    buckets.resize_with(bucket + 1, Vec::new);
                }
            }
            MemberIndex::Hash(buckets) => {
                if buckets.len() <= bucket {
                    buckets.resize_with(bucket + 1, AHashSet::new);
                }
            }
        }
    }

    pub fn insert(&mut self, bucket: usize, person: PersonId) {
        self.ensure_bucket(bucket);
        match self {
            MemberIndex::Unindexed => {}
            MemberIndex::Array(buckets) => buckets[bucket].push(person),
            MemberIndex::Hash(buckets) => {
                buckets[bucket].insert(person);
            }
        }
    }

    pub fn remove(&mut self, bucket: usize, person: PersonId) {
        match self {
            MemberIndex::Unindexed => {}
            MemberIndex::Array(buckets) => {
                if let Some(members) = buckets.get_mut(bucket) {
                    if let Some(pos) = members.iter().position(|&p| p == person) {
                        members.swap_remove(pos);
                    }
                }
            }
            MemberIndex::Hash(buckets) => {
                if let Some(members) = buckets.get_mut(bucket) {
                    members.remove(&person);
                }
            }
        }
    }

    pub fn clear_bucket(&mut self, bucket: usize) {
        match self {
            MemberIndex::Unindexed => {}
            MemberIndex::Array(buckets) => {
                if let Some(members) = buckets.get_mut(bucket) {
                    members.clear();
                }
            }
            MemberIndex::Hash(buckets) => {
                if let Some(members) = buckets.get_mut(bucket) {
                    members.clear();
                }
            }
        }
    }

    /// Members of a bucket, or None when unindexed.
    ///
    /// Hash buckets are sorted so callers see a deterministic order.
    pub fn members(&self, bucket: usize) -> Option<Vec<PersonId>> {
        match self {
            MemberIndex::Unindexed => None,
            MemberIndex::Array(buckets) => {
                Some(buckets.get(bucket).cloned().unwrap_or_default())
            }
            MemberIndex::Hash(buckets) => {
                let mut members: Vec<PersonId> = buckets
                    .get(bucket)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                members.sort_unstable();
                Some(members)
            }
        }
    }

    pub fn len(&self, bucket: usize) -> Option<usize> {
        match self {
            MemberIndex::Unindexed => None,
            MemberIndex::Array(buckets) => Some(buckets.get(bucket).map_or(0, Vec::len)),
            MemberIndex::Hash(buckets) => Some(buckets.get(bucket).map_or(0, |set| set.len())),
        }
    }
}

/// Placement of every person into exactly one bucket of a closed set
#[derive(Debug, Clone)]
pub struct LocationStore {
    assignments: Vec<u32>,
    arrivals: Option<Vec<Time>>,
    counters: Vec<PopulationCounter>,
    members: MemberIndex,
}

impl LocationStore {
    pub fn new(buckets: usize, policy: ReverseIndexPolicy, track_arrival: bool) -> Self {
        Self {
            assignments: Vec::new(),
            arrivals: track_arrival.then(Vec::new),
            counters: vec![PopulationCounter::default(); buckets],
            members: MemberIndex::new(policy, buckets),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.counters.len()
    }

    pub fn policy(&self) -> ReverseIndexPolicy {
        self.members.policy()
    }

    pub fn tracks_arrival(&self) -> bool {
        self.arrivals.is_some()
    }

    #[inline]
    pub fn location_of(&self, person: PersonId) -> Option<usize> {
        match self.assignments.get(person.index()) {
            Some(&bucket) if bucket != UNPLACED => Some(bucket as usize),
            _ => None,
        }
    }

    /// Arrival time in the current bucket; None when untracked or unplaced
    pub fn arrival_time(&self, person: PersonId) -> Option<Time> {
        self.location_of(person)?;
        self.arrivals
            .as_ref()
            .and_then(|arrivals| arrivals.get(person.index()).copied())
    }

    fn assign(&mut self, person: PersonId, bucket: usize, time: Time) {
        let slot = person.index();
        if self.assignments.len() <= slot {
            self.assignments.resize(slot + 1, UNPLACED);
        }
        self.assignments[slot] = bucket as u32;
        if let Some(arrivals) = self.arrivals.as_mut() {
            if arrivals.len() <= slot {
                arrivals.resize(slot + 1, 0.0);
            }
            arrivals[slot] = time;
        }
        self.counters[bucket].increment(time);
        self.members.insert(bucket, person);
    }

    fn unassign(&mut self, person: PersonId, bucket: usize, time: Time) {
        self.assignments[person.index()] = UNPLACED;
        self.counters[bucket].decrement(time);
        self.members.remove(bucket, person);
    }

    /// Places a person who has no location yet; false if already placed
    pub fn place(&mut self, person: PersonId, bucket: usize, time: Time) -> bool {
        if self.location_of(person).is_some() || bucket >= self.counters.len() {
            return false;
        }
        self.assign(person, bucket, time);
        true
    }

    /// Moves a placed person, updating counters, reverse index and arrival
    /// time together. Returns the previous bucket, or None if unplaced.
    pub fn relocate(&mut self, person: PersonId, bucket: usize, time: Time) -> Option<usize> {
        let previous = self.location_of(person)?;
        if bucket >= self.counters.len() {
            return None;
        }
        self.unassign(person, previous, time);
        self.assign(person, bucket, time);
        Some(previous)
    }

    /// Removes a person from the relation entirely
    pub fn displace(&mut self, person: PersonId, time: Time) -> Option<usize> {
        let previous = self.location_of(person)?;
        self.unassign(person, previous, time);
        Some(previous)
    }

    pub fn count(&self, bucket: usize) -> usize {
        self.counters.get(bucket).map_or(0, |counter| counter.count)
    }

    pub fn counter(&self, bucket: usize) -> PopulationCounter {
        self.counters.get(bucket).copied().unwrap_or_default()
    }

    /// People in a bucket, via the reverse index or a full scan of the
    /// forward assignments
    pub fn members(&self, bucket: usize) -> Vec<PersonId> {
        if let Some(members) = self.members.members(bucket) {
            return members;
        }
        let target = bucket as u32;
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, &assigned)| assigned == target)
            .map(|(slot, _)| PersonId(slot))
            .collect()
    }

    /// Size of the reverse index bucket, when one is kept
    pub fn indexed_len(&self, bucket: usize) -> Option<usize> {
        self.members.len(bucket)
    }
}
