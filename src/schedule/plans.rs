//! Time-ordered plan queue
//!
//! Plans run in time order, ties broken by scheduling order. Cancelled
//! plans are dropped from the record table immediately and skipped lazily
//! when their heap entry surfaces.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::error::ErrorKind;
use crate::core::types::{ComponentRef, PlanKey, Time};

struct PlanRecord {
    owner: ComponentRef,
    key: Option<PlanKey>,
    time: Time,
    payload: Box<dyn Any>,
}

/// A plan whose time has come
pub struct DuePlan {
    pub owner: ComponentRef,
    pub key: Option<PlanKey>,
    pub time: Time,
    pub payload: Box<dyn Any>,
}

impl std::fmt::Debug for DuePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuePlan")
            .field("owner", &self.owner)
            .field("key", &self.key)
            .field("time", &self.time)
            .finish()
    }
}

#[derive(Default)]
pub struct PlanQueue {
    heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64)>>,
    records: AHashMap<u64, PlanRecord>,
    keyed: AHashMap<(ComponentRef, PlanKey), u64>,
    time: Time,
    next_sequence: u64,
}

impl PlanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_time(&self) -> Time {
        self.time
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Checks time and key without scheduling
    pub fn validate(
        &self,
        owner: &ComponentRef,
        time: Time,
        key: Option<&PlanKey>,
    ) -> Result<(), ErrorKind> {
        if !time.is_finite() || time < self.time {
            return Err(ErrorKind::PastPlanTime {
                requested: time,
                current: self.time,
            });
        }
        if let Some(key) = key {
            if self.keyed.contains_key(&(owner.clone(), key.clone())) {
                return Err(ErrorKind::DuplicatePlanKey(key.clone()));
            }
        }
        Ok(())
    }

    pub fn schedule(
        &mut self,
        owner: ComponentRef,
        time: Time,
        key: Option<PlanKey>,
        payload: Box<dyn Any>,
    ) -> Result<(), ErrorKind> {
        self.validate(&owner, time, key.as_ref())?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if let Some(key) = &key {
            self.keyed.insert((owner.clone(), key.clone()), sequence);
        }
        self.records.insert(
            sequence,
            PlanRecord {
                owner,
                key,
                time,
                payload,
            },
        );
        self.heap.push(Reverse((OrderedFloat(time), sequence)));
        Ok(())
    }

    pub fn cancel(&mut self, owner: &ComponentRef, key: &PlanKey) -> Option<Box<dyn Any>> {
        let sequence = self.keyed.remove(&(owner.clone(), key.clone()))?;
        self.records.remove(&sequence).map(|record| record.payload)
    }

    pub fn peek(&self, owner: &ComponentRef, key: &PlanKey) -> Option<(&dyn Any, Time)> {
        let sequence = self.keyed.get(&(owner.clone(), key.clone()))?;
        self.records
            .get(sequence)
            .map(|record| (record.payload.as_ref(), record.time))
    }

    /// Time of the next live plan
    pub fn next_time(&mut self) -> Option<Time> {
        while let Some(Reverse((time, sequence))) = self.heap.peek().copied() {
            if self.records.contains_key(&sequence) {
                return Some(time.into_inner());
            }
            self.heap.pop();
        }
        None
    }

    /// Removes the next plan and advances time to it
    pub fn pop_next(&mut self) -> Option<DuePlan> {
        while let Some(Reverse((_, sequence))) = self.heap.pop() {
            let Some(record) = self.records.remove(&sequence) else {
                continue;
            };
            if let Some(key) = &record.key {
                self.keyed.remove(&(record.owner.clone(), key.clone()));
            }
            self.time = record.time;
            return Some(DuePlan {
                owner: record.owner,
                key: record.key,
                time: record.time,
                payload: record.payload,
            });
        }
        None
    }
}

impl std::fmt::Debug for PlanQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanQueue")
            .field("time", &self.time)
            .field("pending", &self.records.len())
            .finish()
    }
}
