//! Ordered key-value skip list with lock-free readers.
//!
//! Writers (`insert`, `update`, `delete`) are serialized by one mutex that also
//! owns the height generator. Readers never lock: they pin a
//! `crossbeam::epoch` guard and walk the towers with acquire loads. A new node
//! is fully built before the first release store links it, so a reader sees it
//! either everywhere below some level or nowhere. Unlinked nodes and replaced
//! values are retired through the epoch and freed once every reader that might
//! still hold them has unpinned.

mod height;
mod node;

use std::{
    cmp::Ordering as KeyOrdering,
    marker::PhantomData,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use crossbeam::epoch::{self, Guard, Shared};
use tracing::{debug, trace};

use crate::{
    cmp::{Comparator, OrdComparator},
    error::{Error, Result},
    options::Options,
};

pub use height::MAX_HEIGHT;
use height::HeightGenerator;
use node::{empty_tower, Node, Tower};

pub struct SkipList<K, V, C = OrdComparator> {
    // keyless sentinel, always MAX_HEIGHT tall
    head: Box<Tower<K, V>>,
    height: AtomicUsize,
    len: AtomicUsize,
    comparator: C,
    writer: Mutex<HeightGenerator>,
    options: Options,
}

impl<K, V> SkipList<K, V, OrdComparator>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(options: Options) -> Self {
        Self::with_comparator(options, OrdComparator)
    }
}

impl<K, V> Default for SkipList<K, V, OrdComparator>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl<K, V, C> SkipList<K, V, C>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: Comparator<K>,
{
    pub fn with_comparator(options: Options, comparator: C) -> Self {
        SkipList {
            head: empty_tower(MAX_HEIGHT),
            height: AtomicUsize::new(1),
            len: AtomicUsize::new(0),
            comparator,
            writer: Mutex::new(HeightGenerator::new(options.seed)),
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels currently in use.
    pub fn height(&self) -> usize {
        self.height.load(Ordering::Acquire)
    }

    /// Takes the write-side lock. The list is consistent at every point a
    /// writer can panic, so a poisoned lock is still usable.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, HeightGenerator> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the first node whose key is >= `key`, or null.
    ///
    /// When `prevs` is given, `prevs[i]` receives the tower of the last node
    /// visited on level `i` before descending; levels at or above the current
    /// height are left untouched.
    fn find_greater_or_equal<'g>(
        &'g self,
        key: &K,
        guard: &'g Guard,
        mut prevs: Option<&mut [&'g Tower<K, V>; MAX_HEIGHT]>,
    ) -> Shared<'g, Node<K, V>> {
        let mut tower: &'g Tower<K, V> = &self.head;
        let mut found = Shared::null();
        let mut level = self.height.load(Ordering::Acquire);
        while level > 0 {
            level -= 1;
            found = loop {
                let next = tower[level].load(Ordering::Acquire, guard);
                // SAFETY: reachable nodes are only freed after the guard is dropped.
                match unsafe { next.as_ref() } {
                    Some(node) if self.comparator.compare(&node.key, key) == KeyOrdering::Less => {
                        tower = &*node.tower;
                    }
                    _ => break next,
                }
            };
            if let Some(prevs) = prevs.as_deref_mut() {
                prevs[level] = tower;
            }
        }
        found
    }

    fn matching<'g>(&self, node: Shared<'g, Node<K, V>>, key: &K) -> Option<&'g Node<K, V>> {
        // SAFETY: `node` came from a search under a guard living at least 'g.
        unsafe { node.as_ref() }
            .filter(|node| self.comparator.compare(&node.key, key) == KeyOrdering::Equal)
    }

    /// Builds a node and splices it in from level 0 upward.
    fn link<'g>(
        &'g self,
        key: K,
        value: V,
        prevs: &[&'g Tower<K, V>; MAX_HEIGHT],
        heights: &mut HeightGenerator,
        guard: &'g Guard,
    ) {
        let height = heights.random_height();
        let current = self.height.load(Ordering::Relaxed);
        if height > current {
            debug!(from = current, to = height, "skiplist grows");
            self.height.store(height, Ordering::Release);
        }

        let succs = prevs[..height]
            .iter()
            .enumerate()
            .map(|(level, tower)| tower[level].load(Ordering::Relaxed, guard));
        let node = Node::new(key, value, succs).into_shared(guard);
        for (level, tower) in prevs[..height].iter().enumerate() {
            tower[level].store(node, Ordering::Release);
        }
        self.len.fetch_add(1, Ordering::Release);
    }

    /// Inserts a new key. Existing keys are rejected; use `update` for them.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let mut heights = self.lock_writer();
        let guard = &epoch::pin();
        let mut prevs = [&*self.head; MAX_HEIGHT];
        let found = self.find_greater_or_equal(&key, guard, Some(&mut prevs));
        if self.matching(found, &key).is_some() {
            trace!("insert rejected, key exists");
            return Err(Error::KeyAlreadyExists);
        }
        self.link(key, value, &prevs, &mut heights, guard);
        trace!(len = self.len(), "insert");
        Ok(())
    }

    /// Insert that falls back to update when the key is present, under a
    /// single write lock. Returns true when a new node was created.
    pub(crate) fn insert_or_update(&self, key: K, value: V) -> bool {
        let mut heights = self.lock_writer();
        let guard = &epoch::pin();
        let mut prevs = [&*self.head; MAX_HEIGHT];
        let found = self.find_greater_or_equal(&key, guard, Some(&mut prevs));
        match self.matching(found, &key) {
            Some(node) => {
                node.replace_value(value, guard);
                false
            }
            None => {
                self.link(key, value, &prevs, &mut heights, guard);
                true
            }
        }
    }

    pub fn update(&self, key: &K, value: V) -> Result<()> {
        let _writer = self.lock_writer();
        let guard = &epoch::pin();
        let found = self.find_greater_or_equal(key, guard, None);
        let node = self.matching(found, key).ok_or(Error::KeyNotFound)?;
        node.replace_value(value, guard);
        trace!("update");
        Ok(())
    }

    pub fn delete(&self, key: &K) -> Result<()> {
        let _writer = self.lock_writer();
        let guard = &epoch::pin();
        let mut prevs = [&*self.head; MAX_HEIGHT];
        let found = self.find_greater_or_equal(key, guard, Some(&mut prevs));
        let node = self.matching(found, key).ok_or(Error::KeyNotFound)?;

        // top level first, so the node never sits on level i without level i - 1
        for level in (0..node.height()).rev() {
            debug_assert!(prevs[level][level].load(Ordering::Relaxed, guard) == found);
            prevs[level][level].store(node.next(level, guard), Ordering::Release);
        }
        self.len.fetch_sub(1, Ordering::Release);
        self.shrink_height(guard);

        // SAFETY: the node is unreachable from the head; readers already on it
        // are pinned in an earlier epoch.
        unsafe { guard.defer_destroy(found) };
        guard.flush();
        trace!(len = self.len(), "delete");
        Ok(())
    }

    fn shrink_height(&self, guard: &Guard) {
        let current = self.height.load(Ordering::Relaxed);
        let mut height = current;
        while height > 1 && self.head[height - 1].load(Ordering::Relaxed, guard).is_null() {
            height -= 1;
        }
        if height != current {
            debug!(from = current, to = height, "skiplist shrinks");
            self.height.store(height, Ordering::Release);
        }
    }

    pub fn get(&self, key: &K) -> Result<V>
    where
        V: Clone,
    {
        let guard = &epoch::pin();
        let found = self.find_greater_or_equal(key, guard, None);
        self.matching(found, key)
            .map(|node| node.value(guard).clone())
            .ok_or(Error::KeyNotFound)
    }

    pub fn contains(&self, key: &K) -> bool {
        let guard = &epoch::pin();
        let found = self.find_greater_or_equal(key, guard, None);
        self.matching(found, key).is_some()
    }

    /// Walks level 0 in key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let guard = epoch::pin();
        let current = self.head[0].load(Ordering::Acquire, &guard).as_raw();
        Iter {
            guard,
            current,
            _list: PhantomData,
        }
    }

    pub(crate) fn for_each_entry<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> Result<()>,
    {
        let guard = &epoch::pin();
        let mut current = self.head[0].load(Ordering::Acquire, guard);
        // SAFETY: see `find_greater_or_equal`.
        while let Some(node) = unsafe { current.as_ref() } {
            f(&node.key, node.value(guard))?;
            current = node.next(0, guard);
        }
        Ok(())
    }

    /// Verifies per-level ordering, that each level is a subsequence of the
    /// one below, and that no level at or above the current height is in use.
    /// Meant for quiescent lists; a concurrent writer can make it fail.
    pub fn check_invariants(&self) -> Result<()> {
        let guard = &epoch::pin();
        let height = self.height();
        let mut below: Vec<*const Node<K, V>> = Vec::new();
        for level in 0..MAX_HEIGHT {
            let mut chain = Vec::new();
            let mut prev: Option<&Node<K, V>> = None;
            let mut current = self.head[level].load(Ordering::Acquire, guard);
            // SAFETY: see `find_greater_or_equal`.
            while let Some(node) = unsafe { current.as_ref() } {
                if node.height() <= level {
                    return Err(Error::Corruption(format!(
                        "node of height {} linked on level {}",
                        node.height(),
                        level
                    )));
                }
                if let Some(prev) = prev {
                    if self.comparator.compare(&prev.key, &node.key) != KeyOrdering::Less {
                        return Err(Error::Corruption(format!(
                            "level {} is not strictly increasing under {}",
                            level,
                            self.comparator.name()
                        )));
                    }
                }
                chain.push(current.as_raw());
                prev = Some(node);
                current = node.next(level, guard);
            }

            if level >= height && !chain.is_empty() {
                return Err(Error::Corruption(format!(
                    "level {} used above height {}",
                    level, height
                )));
            }
            if level == 0 && chain.len() != self.len() {
                return Err(Error::Corruption(format!(
                    "level 0 holds {} nodes, len is {}",
                    chain.len(),
                    self.len()
                )));
            }
            if level > 0 && !is_subsequence(&chain, &below) {
                return Err(Error::Corruption(format!(
                    "level {} is not a subsequence of level {}",
                    level,
                    level - 1
                )));
            }
            below = chain;
        }
        Ok(())
    }
}

fn is_subsequence<T: PartialEq>(sub: &[T], seq: &[T]) -> bool {
    let mut rest = seq.iter();
    sub.iter().all(|x| rest.any(|y| y == x))
}

impl<K, V, C> Drop for SkipList<K, V, C> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no reader or writer is left; every linked
        // node is owned by the level-0 chain exactly once.
        unsafe {
            let guard = epoch::unprotected();
            let mut current = self.head[0].load(Ordering::Relaxed, guard);
            while !current.is_null() {
                let next = current.deref().next(0, guard);
                drop(current.into_owned());
                current = next;
            }
        }
    }
}

/// Forward iterator over the level-0 chain, yielding cloned entries.
///
/// The iterator keeps its epoch pinned, so nodes it may still visit are not
/// reclaimed while it is alive. Entries inserted or deleted concurrently may or
/// may not be observed.
pub struct Iter<'a, K, V> {
    guard: Guard,
    current: *const Node<K, V>,
    _list: PhantomData<&'a Node<K, V>>,
}

impl<'a, K: Clone, V: Clone> Iterator for Iter<'a, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: `current` was loaded under `self.guard`, which is still pinned.
        let node = unsafe { self.current.as_ref()? };
        let item = (node.key.clone(), node.value(&self.guard).clone());
        self.current = node.next(0, &self.guard).as_raw();
        Some(item)
    }
}
