//! Dense slot allocation with recycling, and closed id → slot maps

use ahash::AHashMap;
use rand::Rng;
use std::hash::Hash;

/// Rejection draws attempted before falling back to a walk of live slots
const REJECTION_TRIES: usize = 32;

/// Hands out dense slot indices and recycles them after release.
///
/// Released slots are reused last-in first-out. Data for a slot lives in
/// parallel columns owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    live: Vec<bool>,
    free: Vec<usize>,
    live_count: usize,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> usize {
        self.live_count += 1;
        if let Some(slot) = self.free.pop() {
            self.live[slot] = true;
            slot
        } else {
            self.live.push(true);
            self.live.len() - 1
        }
    }

    /// Returns false if the slot was not live
    pub fn release(&mut self, slot: usize) -> bool {
        match self.live.get_mut(slot) {
            Some(live) if *live => {
                *live = false;
                self.free.push(slot);
                self.live_count -= 1;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_live(&self, slot: usize) -> bool {
        self.live.get(slot).copied().unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// One past the highest slot ever allocated
    pub fn capacity(&self) -> usize {
        self.live.len()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = usize> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, &live)| live)
            .map(|(i, _)| i)
    }

    /// Uniform live slot other than `skip`, or None when there is none.
    ///
    /// While at least half the slots are live, draws over the whole range
    /// and rejects dead slots; a sparse allocator (or a run of rejections)
    /// walks the live slots instead.
    pub fn sample<R: Rng + ?Sized>(&self, skip: Option<usize>, rng: &mut R) -> Option<usize> {
        let skip = skip.filter(|&slot| self.is_live(slot));
        let eligible = self.live_count - usize::from(skip.is_some());
        if eligible == 0 {
            return None;
        }
        if eligible * 2 >= self.capacity() {
            for _ in 0..REJECTION_TRIES {
                let slot = rng.gen_range(0..self.capacity());
                if self.live[slot] && Some(slot) != skip {
                    return Some(slot);
                }
            }
        }
        let target = rng.gen_range(0..eligible);
        self.iter_live().filter(|&slot| Some(slot) != skip).nth(target)
    }
}

/// Slot-recycling storage for records that live as a unit
#[derive(Debug, Clone)]
pub struct SlotVec<T> {
    items: Vec<Option<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Default for SlotVec<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> SlotVec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T) -> usize {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            self.items[slot] = Some(item);
            slot
        } else {
            self.items.push(Some(item));
            self.items.len() - 1
        }
    }

    pub fn remove(&mut self, slot: usize) -> Option<T> {
        let item = self.items.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(item)
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.items.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|item| (slot, item)))
    }
}

/// Stable mapping between a closed set of external ids and dense slots.
///
/// Fixed at scenario load; slot order follows first appearance.
#[derive(Debug, Clone)]
pub struct IdMap<K> {
    ids: Vec<K>,
    slots: AHashMap<K, usize>,
}

impl<K> Default for IdMap<K> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            slots: AHashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> IdMap<K> {
    /// Builds the map; returns the first duplicate id on failure
    pub fn from_ids(ids: impl IntoIterator<Item = K>) -> Result<Self, K> {
        let mut map = Self::default();
        for id in ids {
            if map.slots.contains_key(&id) {
                return Err(id);
            }
            map.slots.insert(id, map.ids.len());
            map.ids.push(id);
        }
        Ok(map)
    }

    #[inline]
    pub fn slot(&self, id: K) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    #[inline]
    pub fn id(&self, slot: usize) -> K {
        self.ids[slot]
    }

    pub fn contains(&self, id: K) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[K] {
        &self.ids
    }
}
