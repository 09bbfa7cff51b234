use std::cmp::Ordering;

/// Total order over keys. Must be deterministic and side-effect free; every
/// structural operation of the skip list goes through it.
pub trait Comparator<K: ?Sized>: Send + Sync {
    fn compare(&self, left: &K, right: &K) -> Ordering;

    fn name(&self) -> &'static str {
        "skipkv.Comparator"
    }
}

/// Natural `Ord` ordering of the key type.
#[derive(Clone, Copy, Default, Debug)]
pub struct OrdComparator;

impl<K: Ord + ?Sized> Comparator<K> for OrdComparator {
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }

    fn name(&self) -> &'static str {
        "skipkv.OrdComparator"
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct BytewiseComparator;

impl<K: AsRef<[u8]> + ?Sized> Comparator<K> for BytewiseComparator {
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.as_ref().cmp(right.as_ref())
    }

    fn name(&self) -> &'static str {
        "skipkv.BytewiseComparator"
    }
}

/// Flips the order produced by the wrapped comparator.
#[derive(Clone, Copy, Default, Debug)]
pub struct ReverseComparator<C>(pub C);

impl<K: ?Sized, C: Comparator<K>> Comparator<K> for ReverseComparator<C> {
    fn compare(&self, left: &K, right: &K) -> Ordering {
        self.0.compare(right, left)
    }

    fn name(&self) -> &'static str {
        "skipkv.ReverseComparator"
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    fn compare(&self, left: &K, right: &K) -> Ordering {
        self(left, right)
    }
}
