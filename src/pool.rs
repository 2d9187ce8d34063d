//! Reusable object pool
//!
//! Transient entities (falling blocks, mostly) are built once and recycled
//! between active and inactive states so the frame loop never allocates in the
//! steady state. Lookup is a linear "first inactive" scan in storage order,
//! which is the right trade at the few dozen live entities the game reaches.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Capability required of anything stored in an [`ObjectPool`]
pub trait Poolable {
    /// Wipe every field that carries state from a previous activation
    fn reset(&mut self);
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
}

/// Stable reference to a pooled entity
///
/// Handles only resolve against the pool that issued them. The epoch changes
/// whenever the pool is cleared, so handles taken before a `clear()` stop
/// resolving instead of aliasing freshly built entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    pool: u32,
    index: u32,
    epoch: u32,
}

impl PoolHandle {
    /// Storage slot this handle points at
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub active: usize,
    pub total: usize,
    pub available: usize,
}

/// Invalid pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The pool could never hand out an entity
    NoCapacity,
    /// More initial stock requested than the pool may ever hold
    InitialExceedsMax { initial: usize, max: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCapacity => {
                write!(f, "pool has no initial stock and no room to grow")
            }
            Self::InitialExceedsMax { initial, max } => {
                write!(f, "initial size {initial} exceeds max size {max}")
            }
        }
    }
}

impl std::error::Error for PoolError {}

/// Growable, bounded store of reusable entities
#[derive(Debug, Clone)]
pub struct ObjectPool<T: Poolable> {
    items: Vec<T>,
    factory: fn() -> T,
    max_size: usize,
    grow_size: usize,
    id: u32,
    epoch: u32,
}

impl<T: Poolable> ObjectPool<T> {
    /// Build a pool pre-filled with `initial_size` inactive entities
    pub fn new(
        factory: fn() -> T,
        initial_size: usize,
        max_size: usize,
        grow_size: usize,
    ) -> Result<Self, PoolError> {
        if max_size == 0 || (initial_size == 0 && grow_size == 0) {
            return Err(PoolError::NoCapacity);
        }
        if initial_size > max_size {
            return Err(PoolError::InitialExceedsMax {
                initial: initial_size,
                max: max_size,
            });
        }

        let mut pool = Self {
            items: Vec::with_capacity(initial_size),
            factory,
            max_size,
            grow_size,
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            epoch: 0,
        };
        pool.fill(initial_size);
        Ok(pool)
    }

    fn fill(&mut self, count: usize) {
        self.items.reserve(count);
        for _ in 0..count {
            let mut item = (self.factory)();
            item.set_active(false);
            self.items.push(item);
        }
    }

    fn handle(&self, index: usize) -> PoolHandle {
        PoolHandle {
            pool: self.id,
            index: index as u32,
            epoch: self.epoch,
        }
    }

    fn slot(&self, handle: PoolHandle) -> Option<usize> {
        (handle.pool == self.id
            && handle.epoch == self.epoch
            && handle.index() < self.items.len())
            .then_some(handle.index())
    }

    /// Hand out a freshly reset, active entity
    ///
    /// Returns `None` when every entity is active and the pool is at
    /// `max_size`.
    pub fn acquire(&mut self) -> Option<PoolHandle> {
        let index = match self.items.iter().position(|item| !item.is_active()) {
            Some(index) => index,
            None => {
                let total = self.items.len();
                if total >= self.max_size || self.grow_size == 0 {
                    return None;
                }
                let grow = self.grow_size.min(self.max_size - total);
                self.fill(grow);
                log::debug!("Pool grew by {} to {}", grow, self.items.len());
                total
            }
        };

        let item = &mut self.items[index];
        item.reset();
        item.set_active(true);
        Some(self.handle(index))
    }

    /// Return an entity to the pool; unknown handles are ignored
    pub fn release(&mut self, handle: PoolHandle) {
        if let Some(index) = self.slot(handle) {
            self.items[index].set_active(false);
        }
    }

    /// Deactivate everything, keeping the backing storage
    pub fn release_all(&mut self) {
        for item in &mut self.items {
            item.set_active(false);
        }
    }

    /// Drop every entity; later acquires rebuild through the factory
    ///
    /// A pool built with `grow_size == 0` cannot rebuild, so every acquire
    /// after a clear returns `None`.
    pub fn clear(&mut self) {
        if self.grow_size == 0 && !self.items.is_empty() {
            log::warn!(
                "Pool cleared with grow size 0; {} slots dropped, acquires will fail",
                self.items.len()
            );
        }
        self.items.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slot(handle).map(|index| &self.items[index])
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slot(handle).map(|index| &mut self.items[index])
    }

    /// Active entities in storage order
    pub fn iter_active(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter(|item| item.is_active())
    }

    pub fn for_each_active<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        for item in self.items.iter_mut().filter(|item| item.is_active()) {
            f(item);
        }
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> PoolStats {
        let active = self.active_count();
        PoolStats {
            active,
            total: self.items.len(),
            available: self.items.len() - active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Token {
        value: u32,
        active: bool,
    }

    impl Poolable for Token {
        fn reset(&mut self) {
            self.value = 0;
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }
    }

    fn pool() -> ObjectPool<Token> {
        ObjectPool::new(Token::default, 5, 10, 2).unwrap()
    }

    #[test]
    fn test_initial_fill() {
        let pool = pool();
        assert_eq!(
            pool.stats(),
            PoolStats {
                active: 0,
                total: 5,
                available: 5
            }
        );
    }

    #[test]
    fn test_acquire_activates() {
        let mut pool = pool();
        let handle = pool.acquire().unwrap();
        assert!(pool.get(handle).unwrap().is_active());
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_reuses_released_slot() {
        let mut pool = pool();
        let first = pool.acquire().unwrap();
        pool.get_mut(first).unwrap().value = 42;
        pool.release(first);

        let second = pool.acquire().unwrap();
        assert_eq!(first, second);
        // Reset wipes the previous activation
        assert_eq!(pool.get(second).unwrap().value, 0);
    }

    #[test]
    fn test_grows_by_grow_size() {
        let mut pool = pool();
        for _ in 0..5 {
            assert!(pool.acquire().is_some());
        }
        let handle = pool.acquire().unwrap();
        assert_eq!(pool.total_count(), 7);
        // First entity of the new batch
        assert_eq!(handle.index(), 5);
    }

    #[test]
    fn test_growth_capped_by_headroom() {
        let mut pool = ObjectPool::new(Token::default, 3, 4, 10).unwrap();
        for _ in 0..4 {
            assert!(pool.acquire().is_some());
        }
        assert_eq!(pool.total_count(), 4);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_respects_max_size() {
        let mut pool = pool();
        let acquired = (0..11).filter_map(|_| pool.acquire()).count();
        assert_eq!(acquired, 10);
        assert_eq!(pool.active_count(), 10);
    }

    #[test]
    fn test_release_all_keeps_storage() {
        let mut pool = pool();
        for _ in 0..7 {
            pool.acquire();
        }
        pool.release_all();
        let stats = pool.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.total, 7);
    }

    #[test]
    fn test_clear_then_regrow() {
        let mut pool = pool();
        let stale = pool.acquire().unwrap();
        pool.clear();
        assert_eq!(pool.total_count(), 0);
        assert!(pool.get(stale).is_none());

        let fresh = pool.acquire().unwrap();
        assert_eq!(pool.total_count(), 2);
        // Stale handle from before the clear must not release the new entity
        pool.release(stale);
        assert!(pool.get(fresh).unwrap().is_active());
    }

    #[test]
    fn test_clear_without_growth_exhausts_pool() {
        let mut pool = ObjectPool::new(Token::default, 3, 10, 0).unwrap();
        assert!(pool.acquire().is_some());
        pool.clear();
        assert_eq!(pool.total_count(), 0);
        assert!(pool.acquire().is_none());
        assert_eq!(pool.stats().total, 0);
    }

    #[test]
    fn test_foreign_handle_release_is_noop() {
        let mut other = pool();
        let foreign = other.acquire().unwrap();
        let mut pool = pool();

        let own = pool.acquire().unwrap();
        assert_eq!(own.index(), foreign.index());
        pool.release(foreign);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.total_count(), 5);
    }

    #[test]
    fn test_iter_active_in_storage_order() {
        let mut pool = pool();
        let handles: Vec<_> = (0..4).filter_map(|_| pool.acquire()).collect();
        for (i, handle) in handles.iter().enumerate() {
            pool.get_mut(*handle).unwrap().value = i as u32 + 1;
        }
        pool.release(handles[1]);

        let values: Vec<u32> = pool.iter_active().map(|t| t.value).collect();
        assert_eq!(values, vec![1, 3, 4]);

        let mut visited = 0;
        pool.for_each_active(|t| {
            t.value *= 10;
            visited += 1;
        });
        assert_eq!(visited, 3);
        assert_eq!(pool.get(handles[2]).unwrap().value, 30);
    }

    #[test]
    fn test_rejects_unusable_config() {
        assert_eq!(
            ObjectPool::new(Token::default, 0, 10, 0).unwrap_err(),
            PoolError::NoCapacity
        );
        assert_eq!(
            ObjectPool::new(Token::default, 5, 0, 5).unwrap_err(),
            PoolError::NoCapacity
        );
        assert_eq!(
            ObjectPool::new(Token::default, 11, 10, 1).unwrap_err(),
            PoolError::InitialExceedsMax {
                initial: 11,
                max: 10
            }
        );
        // Growth-only pools are fine
        assert!(ObjectPool::new(Token::default, 0, 10, 1).is_ok());
    }

    proptest! {
        #[test]
        fn prop_occupancy_invariant(ops in prop::collection::vec(any::<(bool, u8)>(), 0..200)) {
            let mut pool = pool();
            let mut held: Vec<PoolHandle> = Vec::new();

            for (acquire, pick) in ops {
                if acquire {
                    if let Some(handle) = pool.acquire() {
                        held.push(handle);
                    } else {
                        prop_assert_eq!(pool.active_count(), pool.max_size());
                    }
                } else if !held.is_empty() {
                    let handle = held.swap_remove(pick as usize % held.len());
                    pool.release(handle);
                }

                let stats = pool.stats();
                prop_assert_eq!(stats.total, stats.active + stats.available);
                prop_assert!(stats.total <= pool.max_size());
                prop_assert_eq!(stats.active, held.len());
            }
        }
    }
}
