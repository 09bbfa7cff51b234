use std::sync::atomic::Ordering;

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};

/// Forward pointers of one node; entry `i` links to the next node of height > i.
pub type Tower<K, V> = [Atomic<Node<K, V>>];

pub struct Node<K, V> {
    pub(crate) key: K,
    value: Atomic<V>,
    pub(crate) tower: Box<Tower<K, V>>,
}

impl<K, V> Node<K, V> {
    /// Builds a node whose tower already points at `succs`. Nothing else can see
    /// the node until the caller links it in.
    pub fn new<'g>(
        key: K,
        value: V,
        succs: impl Iterator<Item = Shared<'g, Node<K, V>>>,
    ) -> Owned<Self>
    where
        K: 'g,
        V: 'g,
    {
        Owned::new(Node {
            key,
            value: Atomic::new(value),
            tower: succs.map(Atomic::from).collect(),
        })
    }

    pub fn height(&self) -> usize {
        self.tower.len()
    }

    pub fn next<'g>(&self, level: usize, guard: &'g Guard) -> Shared<'g, Node<K, V>> {
        self.tower[level].load(Ordering::Acquire, guard)
    }

    pub fn value<'g>(&self, guard: &'g Guard) -> &'g V {
        // SAFETY: the value pointer is non-null for the whole life of the node and
        // replaced values are retired through the epoch, so the guard keeps the
        // one we loaded alive.
        unsafe { self.value.load(Ordering::Acquire, guard).deref() }
    }

    /// Publishes `value` with a single store and retires the previous one.
    pub fn replace_value(&self, value: V, guard: &Guard) {
        let old = self.value.swap(Owned::new(value), Ordering::AcqRel, guard);
        // SAFETY: `old` is unreachable after the swap; readers still holding it
        // are pinned in an epoch that predates the retirement.
        unsafe { guard.defer_destroy(old) };
    }
}

/// Builds a sentinel tower of `height` null links.
pub fn empty_tower<K, V>(height: usize) -> Box<Tower<K, V>> {
    (0..height).map(|_| Atomic::null()).collect()
}

impl<K, V> Drop for Node<K, V> {
    fn drop(&mut self) {
        // SAFETY: a node is dropped either during list teardown or by the
        // collector after every reader that could reach it has unpinned.
        unsafe {
            let value = self.value.load(Ordering::Relaxed, epoch::unprotected());
            if !value.is_null() {
                drop(value.into_owned());
            }
        }
    }
}
