use std::cmp::Ordering;

/// Three-way ordering used to place keys in the tree.
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their `Ord` implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Natural;

impl<K: Ord + ?Sized> Comparator<K> for Natural {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
