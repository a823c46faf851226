//! Skipped message key cache.
//!
//! Holds message keys for messages that were skipped over while catching a
//! chain up, so they can still be decrypted when they arrive late. Entries are
//! indexed by (header key, message number): a decrypting session identifies
//! the header key by trial-opening the header once per distinct key, then
//! finds the message key in O(1).
//!
//! # Invariants
//!
//! - Bounded: never more than `limit` entries; the oldest are evicted first
//! - Single Use: [`SkippedKeys::take`] removes the entry it returns
//! - Stable Order: iteration yields entries in insertion order, so a
//!   persisted and restored cache serializes identically

use std::collections::{HashMap, VecDeque};

use axolotl_crypto::Key;
use tracing::debug;

/// Index of a distinct header key within the cache.
type Generation = u64;

struct HeaderSlot {
    generation: Generation,
    header_key: Key,
    live: usize,
}

/// Bounded FIFO cache of skipped message keys.
pub struct SkippedKeys {
    /// Distinct header keys, oldest first
    slots: Vec<HeaderSlot>,
    entries: HashMap<(Generation, u32), Key>,
    order: VecDeque<(Generation, u32)>,
    next_generation: Generation,
    limit: usize,
}

impl SkippedKeys {
    /// Empty cache holding at most `limit` keys.
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            entries: HashMap::new(),
            order: VecDeque::new(),
            next_generation: 0,
            limit,
        }
    }

    /// Number of cached message keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no message keys are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached keys.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the bound, evicting the oldest entries if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.evict();
    }

    /// Cache `message_key` for message `number` under `header_key`.
    ///
    /// Re-inserting an existing (header key, number) pair replaces the key
    /// and keeps its original age.
    pub fn insert(&mut self, header_key: &Key, number: u32, message_key: Key) {
        let generation = self.generation_for(header_key);

        if self.entries.insert((generation, number), message_key).is_none() {
            self.order.push_back((generation, number));
            if let Some(slot) = self.slot_mut(generation) {
                slot.live += 1;
            }
        }

        self.evict();
    }

    /// Message key for (`header_key`, `number`), if cached.
    pub fn lookup(&self, header_key: &Key, number: u32) -> Option<&Key> {
        let generation = self.find_generation(header_key)?;
        self.entries.get(&(generation, number))
    }

    /// Remove and return the key for (`header_key`, `number`).
    pub fn take(&mut self, header_key: &Key, number: u32) -> Option<Key> {
        let generation = self.find_generation(header_key)?;
        let key = self.entries.remove(&(generation, number))?;

        self.order.retain(|entry| *entry != (generation, number));
        self.release(generation);

        Some(key)
    }

    /// Distinct cached header keys, newest first.
    pub fn header_keys(&self) -> impl Iterator<Item = &Key> {
        self.slots.iter().rev().map(|slot| &slot.header_key)
    }

    /// All entries as (header key, number, message key), oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, u32, &Key)> {
        self.order.iter().filter_map(|&(generation, number)| {
            let header_key = &self.slots.iter().find(|s| s.generation == generation)?.header_key;
            let message_key = self.entries.get(&(generation, number))?;
            Some((header_key, number, message_key))
        })
    }

    fn find_generation(&self, header_key: &Key) -> Option<Generation> {
        self.slots.iter().find(|slot| slot.header_key == *header_key).map(|slot| slot.generation)
    }

    fn generation_for(&mut self, header_key: &Key) -> Generation {
        if let Some(generation) = self.find_generation(header_key) {
            return generation;
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots.push(HeaderSlot { generation, header_key: header_key.clone(), live: 0 });
        generation
    }

    fn slot_mut(&mut self, generation: Generation) -> Option<&mut HeaderSlot> {
        self.slots.iter_mut().find(|slot| slot.generation == generation)
    }

    /// Drop one entry's reference to its header slot.
    fn release(&mut self, generation: Generation) {
        if let Some(slot) = self.slot_mut(generation) {
            slot.live = slot.live.saturating_sub(1);
        }
        self.slots.retain(|slot| slot.live > 0);
    }

    fn evict(&mut self) {
        let mut evicted = 0usize;

        while self.entries.len() > self.limit {
            let Some((generation, number)) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&(generation, number)).is_some() {
                self.release(generation);
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "evicted skipped message keys");
        }
    }
}

impl std::fmt::Debug for SkippedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkippedKeys")
            .field("entries", &self.entries.len())
            .field("header_keys", &self.slots.len())
            .field("limit", &self.limit)
            .finish()
    }
}
