//! Implements the bounded LRU table with idle expiry.
//!
//! One access-ordered map owns both storage and recency: a hit moves the
//! entry to the back, eviction pops the front. Because the order is the
//! access order, entries idle past the TTL always form a prefix of the map,
//! so the expiry sweep is a cheap pop-from-front loop performed on the way
//! into every operation.
//!
//! The table mutex guards bookkeeping only. Population work runs outside any
//! lock through a per-key [`Slot`], which merges concurrent misses into a
//! single factory invocation.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use hashlink::LinkedHashMap;
use tracing::trace;

use crate::cache::once_backed::{Slot, Waited};

struct TableEntry<V> {
    slot: Arc<Slot<V>>,
    last_access: Instant,
}

type Table<K, V> = LinkedHashMap<K, TableEntry<V>>;

/// What a caller holds after checking the table for a key.
enum Claim<V> {
    /// Someone else's population; block on it.
    Joined(Arc<Slot<V>>),
    /// This caller owns the population and must run the factory.
    Claimed(Arc<Slot<V>>),
}

/// A bounded, access-expiring cache table with single-flight population.
pub struct LruTtlCache<K, V> {
    entries: Mutex<Table<K, V>>,
    capacity: NonZeroUsize,
    idle_ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> LruTtlCache<K, V> {
    /// Creates an empty table holding at most `capacity` entries, each
    /// dropped once idle for longer than `idle_ttl`.
    #[must_use]
    pub fn new(capacity: NonZeroUsize, idle_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LinkedHashMap::new()),
            capacity,
            idle_ttl,
        }
    }

    /// Returns the cached value for `key`, refreshing its recency.
    ///
    /// A key whose population is still in flight blocks until the winner
    /// resolves it; an abandoned or absent outcome reads as a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = {
            let mut entries = self.lock();
            self.sweep_expired(&mut entries);
            Self::touch(&mut entries, key)?
        };
        match slot.wait() {
            Waited::Ready(value) => Some(value),
            Waited::Missing | Waited::Abandoned => None,
        }
    }

    /// Gets the value for `key`, populating it with `factory` on a miss.
    ///
    /// Concurrent misses on the same key invoke one factory; every caller
    /// observes the same value. The factory decides what is cacheable:
    /// - `Ok(Some(v))` — cached; all callers receive `v`.
    /// - `Ok(None)` — nothing is cached. Callers blocked on this population
    ///   also observe `None`; later calls probe again.
    /// - `Err(e)` — nothing is cached; the error goes to the claiming caller
    ///   only. Blocked callers re-enter the table and retry with their own
    ///   factory.
    ///
    /// If the factory panics the in-flight entry is torn down, so blocked
    /// callers retry instead of hanging.
    pub fn get_or_try_probe<Q, E>(
        &self,
        key: &Q,
        factory: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let mut factory = Some(factory);
        loop {
            let claim = {
                let mut entries = self.lock();
                self.sweep_expired(&mut entries);
                if let Some(slot) = Self::touch(&mut entries, key) {
                    Claim::Joined(slot)
                } else {
                    let slot = Arc::new(Slot::in_flight());
                    entries.insert(
                        key.to_owned(),
                        TableEntry {
                            slot: Arc::clone(&slot),
                            last_access: Instant::now(),
                        },
                    );
                    self.evict_over_capacity(&mut entries);
                    Claim::Claimed(slot)
                }
            };

            match claim {
                Claim::Joined(slot) => match slot.wait() {
                    Waited::Ready(value) => return Ok(Some(value)),
                    Waited::Missing => return Ok(None),
                    // The winner failed; re-check the table.
                    Waited::Abandoned => {}
                },
                Claim::Claimed(slot) => {
                    let Some(factory) = factory.take() else {
                        unreachable!("a caller claims at most once, then returns");
                    };
                    let mut guard = PopulateGuard {
                        table: self,
                        key,
                        slot: &slot,
                        keep: false,
                    };
                    return match factory() {
                        Ok(Some(value)) => {
                            slot.fulfill(value.clone());
                            guard.keep = true;
                            Ok(Some(value))
                        }
                        Ok(None) => {
                            // Negative results are never cached; the guard
                            // removes the entry so later calls probe again.
                            slot.resolve_missing();
                            Ok(None)
                        }
                        Err(error) => Err(error),
                    };
                }
            }
        }
    }

    /// Like [`get_or_try_probe`](Self::get_or_try_probe) for factories that
    /// always produce a value on success.
    ///
    /// A table populated through this method must not also be populated
    /// through probe-style factories for the same keys.
    pub fn get_or_try_init<Q, E>(
        &self,
        key: &Q,
        factory: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        match self.get_or_try_probe(key, || factory().map(Some))? {
            Some(value) => Ok(value),
            None => unreachable!("init factories never resolve to an absent value"),
        }
    }

    /// Applies `f` to the cached value in place, refreshing recency.
    ///
    /// Returns `None` when the key is absent or its population has not
    /// published a value yet.
    pub fn update<Q, R>(&self, key: &Q, f: impl FnOnce(&mut V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = {
            let mut entries = self.lock();
            self.sweep_expired(&mut entries);
            Self::touch(&mut entries, key)?
        };
        slot.update(f)
    }

    /// Removes the entry for `key`, returning `true` if one was present.
    ///
    /// An in-flight population is detached, not interrupted: its waiters
    /// still receive the computed value, it just is not cached afterwards.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().remove(key).is_some()
    }

    /// Number of live entries, including in-flight populations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Table<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the entry for `key` to the most-recent end, stamps its access
    /// time, and returns its slot. Remove-and-reinsert is how the ordered
    /// map expresses an LRU refresh.
    fn touch<Q>(entries: &mut Table<K, V>, key: &Q) -> Option<Arc<Slot<V>>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (owned_key, mut entry) = entries.remove_entry(key)?;
        entry.last_access = Instant::now();
        let slot = Arc::clone(&entry.slot);
        entries.insert(owned_key, entry);
        Some(slot)
    }

    /// Drops entries idle past the TTL. Access order means they are all at
    /// the front, so this stops at the first live entry.
    fn sweep_expired(&self, entries: &mut Table<K, V>) {
        let now = Instant::now();
        let mut dropped = 0usize;
        while let Some((_, entry)) = entries.front() {
            if now.duration_since(entry.last_access) <= self.idle_ttl {
                break;
            }
            entries.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            trace!(dropped, "expired idle cache entries");
        }
    }

    fn evict_over_capacity(&self, entries: &mut Table<K, V>) {
        while entries.len() > self.capacity.get() {
            entries.pop_front();
            trace!("evicted least recently used cache entry");
        }
    }
}

/// Tears down a claimed population unless it was fulfilled: removes the
/// table entry (if it is still ours) and abandons the slot so waiters retry
/// rather than hang. Runs on the error and confirmed-absent paths, and when
/// the factory panics.
struct PopulateGuard<'a, K, Q, V>
where
    K: Eq + Hash + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
{
    table: &'a LruTtlCache<K, V>,
    key: &'a Q,
    slot: &'a Arc<Slot<V>>,
    keep: bool,
}

impl<K, Q, V> Drop for PopulateGuard<'_, K, Q, V>
where
    K: Eq + Hash + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
{
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        {
            let mut entries = self.table.lock();
            // A concurrent remove-and-repopulate may have replaced the
            // entry; only remove it if it still points at our slot.
            if let Some(entry) = entries.get(self.key)
                && Arc::ptr_eq(&entry.slot, self.slot)
            {
                entries.remove(self.key);
            }
        }
        self.slot.abandon();
    }
}
