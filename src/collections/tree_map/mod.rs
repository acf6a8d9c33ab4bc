//! [`TreeMap`], an ordered map with unique keys built on a red-black tree.
//!
//! # Differences compared to [`std::collections::BTreeMap`]
//!
//! [`TreeMap::insert`] never overwrites: if the key is already present the map
//! is left unchanged and the returned flag is `false`. [`TreeMap::get_or_default`]
//! is the find-or-insert upsert.
//!
//! Positions are exposed as cursors. A [`Cursor`] either rests on an entry or on
//! one of two end positions, one before the first entry and one after the last.
//! [`TreeMap::begin`] and [`TreeMap::end`] walk forward, [`TreeMap::rbegin`] and
//! [`TreeMap::rend`] walk backward; the direction is a type parameter.
//!
//! # Example
//!
//! ```
//!     use pcontainers::collections::tree_map::TreeMap;
//!     let mut capitals = TreeMap::new();
//!     capitals.insert("England", "London");
//!     capitals.insert("France", "Paris");
//!     println!("The capital of France is {}", capitals["France"]);
//! ```
//!
//!# Features
//!
//! - `unsafe-optim` : skips bounds checks when following links between nodes.

use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    fmt::Debug,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    marker::PhantomData,
    mem,
    ops::{Bound, RangeBounds},
    ptr,
    ptr::NonNull,
};

use log::{debug, trace};

use crate::alloc::{Allocator, Global};
use crate::error::{failed, ContainerError, Result};

mod tree;
use tree::{raw_entry, Links, Node, NodeId, RawLinks, RbTree, END_LEFT, END_RIGHT};

/// Ordered map similar to [`std::collections::BTreeMap`], see the
/// [module documentation](self).
///
/// The map owns a red-black tree whose nodes are kept in an arena allocated from `A`.
pub struct TreeMap<K, V, A: Allocator + Clone = Global> {
    tree: RbTree<K, V, A>,
}

impl<K, V> Default for TreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone, A: Allocator + Clone> Clone for TreeMap<K, V, A> {
    fn clone(&self) -> Self {
        trace!("cloning map of {} entries", self.len());
        match self.tree.deep_clone() {
            Ok(tree) => Self { tree },
            Err(e) => failed(e),
        }
    }
}

impl<K, V> TreeMap<K, V> {
    /// Returns a new, empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<K, V, A: Allocator + Clone> TreeMap<K, V, A> {
    /// Returns a new, empty map that allocates from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self {
            tree: RbTree::new_in(alloc),
        }
    }

    #[cfg(test)]
    pub(crate) fn check(&self)
    where
        K: Ord,
    {
        self.tree.check();
    }

    /// Get the number of key-value pairs in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Is the map empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest number of entries the map could ever hold.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.tree.max_size()
    }

    /// Clear the map.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Exchange the contents of two maps. Cursors are not involved, so none
    /// can be invalidated.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.tree, &mut other.tree);
    }

    /// Returns the allocator the map uses.
    pub fn allocator(&self) -> &A {
        self.tree.allocator()
    }

    /// Insert key-value pair unless the key is already present.
    ///
    /// Returns a cursor at the entry for `key` and `true` if a new entry was
    /// added. An existing entry is left as it was and `value` is dropped.
    ///
    /// # Panics
    ///
    /// Panics (or aborts) if a new node cannot be allocated.
    pub fn insert(&mut self, key: K, value: V) -> (CursorMut<'_, K, V, A>, bool)
    where
        K: Ord,
    {
        match self.try_insert(key, value) {
            Ok(r) => r,
            Err(e) => failed(e),
        }
    }

    /// Like [`TreeMap::insert`] but reports allocation failure instead of
    /// panicking. On failure the map is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(CursorMut<'_, K, V, A>, bool)>
    where
        K: Ord,
    {
        let (at, added) = match self.tree.search(&key) {
            Some(at) => (at, false),
            None => (self.tree.insert(key, value)?, true),
        };
        Ok((CursorMut::new(&mut self.tree, at), added))
    }

    /// Get a mutable reference to the value for `key`, inserting `V::default()`
    /// first if the key is absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        K: Ord,
        V: Default,
    {
        let at = match self.tree.search(&key) {
            Some(at) => at,
            None => match self.tree.insert(key, V::default()) {
                Ok(at) => at,
                Err(e) => failed(e),
            },
        };
        self.tree.entry_mut(at).1
    }

    /// Does the map have an entry for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.search(key).is_some()
    }

    /// Number of entries with the given key, 0 or 1.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// Get reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Get a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.search(key)?;
        Some(self.tree.entry_mut(at).1)
    }

    /// Get references to the corresponding key and value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.search(key)?;
        Some(self.tree.entry(at))
    }

    /// Cursor at the entry for `key`, or at [`TreeMap::end`] if absent.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.search(key).unwrap_or(END_RIGHT);
        Cursor::new(self.tree.nodes(), at)
    }

    /// Mutable cursor at the entry for `key`, or at the end if absent.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, A>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.search(key).unwrap_or(END_RIGHT);
        CursorMut::new(&mut self.tree, at)
    }

    /// Cursor at the first entry whose key is not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        Cursor::new(self.tree.nodes(), self.tree.lower_bound(key))
    }

    /// Cursor at the first entry whose key is greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        Cursor::new(self.tree.nodes(), self.tree.upper_bound(key))
    }

    /// `(lower_bound(key), upper_bound(key))`. The cursors are equal when the
    /// key is absent.
    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor<'_, K, V>, Cursor<'_, K, V>)
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Mutable cursor at the first entry whose key is not less than `key`.
    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, A>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.lower_bound(key);
        CursorMut::new(&mut self.tree, at)
    }

    /// Mutable cursor at the first entry whose key is greater than `key`.
    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, A>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.upper_bound(key);
        CursorMut::new(&mut self.tree, at)
    }

    /// Forward cursor at the first entry (equal to [`TreeMap::end`] if the map is empty).
    #[must_use]
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.tree.nodes(), self.tree.nodes().lowest())
    }

    /// Forward cursor past the last entry.
    #[must_use]
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.tree.nodes(), END_RIGHT)
    }

    /// Reverse cursor at the last entry (equal to [`TreeMap::rend`] if the map is empty).
    #[must_use]
    pub fn rbegin(&self) -> Cursor<'_, K, V, Reverse> {
        Cursor::new(self.tree.nodes(), self.tree.nodes().highest())
    }

    /// Reverse cursor before the first entry.
    #[must_use]
    pub fn rend(&self) -> Cursor<'_, K, V, Reverse> {
        Cursor::new(self.tree.nodes(), END_LEFT)
    }

    /// Mutable forward cursor at the first entry.
    pub fn begin_mut(&mut self) -> CursorMut<'_, K, V, A> {
        let at = self.tree.nodes().lowest();
        CursorMut::new(&mut self.tree, at)
    }

    /// Mutable reverse cursor at the last entry.
    pub fn rbegin_mut(&mut self) -> CursorMut<'_, K, V, A, Reverse> {
        let at = self.tree.nodes().highest();
        CursorMut::new(&mut self.tree, at)
    }

    /// Remove the entry for `key`, returning its value.
    ///
    /// # Errors
    ///
    /// [`ContainerError::KeyNotFound`] if the key is absent.
    pub fn erase<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.erase(key).map(|r| r.value).inspect_err(|e| {
            debug!("erase failed: {e}");
        })
    }

    /// Remove key-value pair from map, returning just the value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_k, v)| v)
    }

    /// Remove key-value pair from map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let at = self.tree.search(key)?;
        let r = self.tree.remove_node(at);
        Some((r.key, r.value))
    }

    /// Remove every entry whose key lies in `range`, returning how many were removed.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end` or if `start == end` and both bounds are `Excluded`.
    pub fn erase_range<T, R>(&mut self, range: R) -> usize
    where
        T: Ord + ?Sized,
        K: Borrow<T> + Ord,
        R: RangeBounds<T>,
    {
        let (mut at, stop) = self.span(&range);
        let mut n = 0;
        while at != stop {
            let last = self.tree.nodes().successor(at) == stop;
            at = self.tree.remove_node(at).next;
            n += 1;
            if last {
                break;
            }
        }
        n
    }

    /// Remove first key-value pair from map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let at = self.tree.nodes().lowest();
        (at != END_RIGHT).then(|| {
            let r = self.tree.remove_node(at);
            (r.key, r.value)
        })
    }

    /// Remove last key-value pair from map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let at = self.tree.nodes().highest();
        (at != END_LEFT).then(|| {
            let r = self.tree.remove_node(at);
            (r.key, r.value)
        })
    }

    /// Remove all key-value pairs, visited in ascending order, for which f returns false.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut c = self.begin_mut();
        while let Some((k, v)) = c.key_value_mut() {
            if f(k, v) {
                c.move_next();
            } else {
                c.remove_current();
            }
        }
    }

    /// Get references to first key and value.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.begin().key_value()
    }

    /// Gets references to last key and value.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.rbegin().key_value()
    }

    /// Get iterator of references to key-value pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        let nodes = self.tree.nodes();
        Iter {
            len: self.len(),
            inner: Range::new(nodes, nodes.lowest(), END_RIGHT),
        }
    }

    /// Get iterator of mutable references to key-value pairs.
    #[must_use]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.len();
        let nodes = self.tree.nodes_mut();
        let (front, back) = (nodes.lowest(), nodes.highest());
        IterMut {
            len,
            base: NonNull::from(nodes).cast(),
            front,
            back,
            _pd: PhantomData,
        }
    }

    /// Get iterator for range of references to key-value pairs.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end` or if `start == end` and both bounds are `Excluded`.
    pub fn range<T, R>(&self, range: R) -> Range<'_, K, V>
    where
        T: Ord + ?Sized,
        K: Borrow<T> + Ord,
        R: RangeBounds<T>,
    {
        let (front, stop) = self.span(&range);
        Range::new(self.tree.nodes(), front, stop)
    }

    /// Get iterator of references to keys.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Get iterator of references to values.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Get iterator of mutable references to values.
    #[must_use]
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut(self.iter_mut())
    }

    /// First node in `range` and the first node after it.
    fn span<T, R>(&self, range: &R) -> (NodeId, NodeId)
    where
        T: Ord + ?Sized,
        K: Borrow<T> + Ord,
        R: RangeBounds<T>,
    {
        check_range(range);
        let t = &self.tree;
        let front = match range.start_bound() {
            Bound::Included(k) => t.lower_bound(k),
            Bound::Excluded(k) => t.upper_bound(k),
            Bound::Unbounded => t.nodes().lowest(),
        };
        let stop = match range.end_bound() {
            Bound::Included(k) => t.upper_bound(k),
            Bound::Excluded(k) => t.lower_bound(k),
            Bound::Unbounded => END_RIGHT,
        };
        (front, stop)
    }
}

fn check_range<T, R>(range: &R)
where
    T: Ord + ?Sized,
    R: RangeBounds<T>,
{
    use Bound::{Excluded, Included};
    match (range.start_bound(), range.end_bound()) {
        (Included(s) | Excluded(s), Included(e)) | (Included(s), Excluded(e)) => {
            assert!(e >= s, "range start is greater than range end in TreeMap");
        }
        (Excluded(s), Excluded(e)) => {
            assert!(e != s, "range start and end are equal and excluded in TreeMap");
            assert!(e >= s, "range start is greater than range end in TreeMap");
        }
        _ => {}
    }
}

impl<K: Hash, V: Hash, A: Allocator + Clone> Hash for TreeMap<K, V, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for elt in self {
            elt.hash(state);
        }
    }
}
impl<K: PartialEq, V: PartialEq, A: Allocator + Clone> PartialEq for TreeMap<K, V, A> {
    fn eq(&self, other: &TreeMap<K, V, A>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}
impl<K: Eq, V: Eq, A: Allocator + Clone> Eq for TreeMap<K, V, A> {}

impl<K: PartialOrd, V: PartialOrd, A: Allocator + Clone> PartialOrd for TreeMap<K, V, A> {
    fn partial_cmp(&self, other: &TreeMap<K, V, A>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}
impl<K: Ord, V: Ord, A: Allocator + Clone> Ord for TreeMap<K, V, A> {
    fn cmp(&self, other: &TreeMap<K, V, A>) -> Ordering {
        self.iter().cmp(other.iter())
    }
}
impl<K, V, A: Allocator + Clone> IntoIterator for TreeMap<K, V, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    /// Convert `TreeMap` to [`IntoIter`].
    fn into_iter(self) -> IntoIter<K, V, A> {
        IntoIter { map: self }
    }
}
impl<'a, K, V, A: Allocator + Clone> IntoIterator for &'a TreeMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}
impl<'a, K, V, A: Allocator + Clone> IntoIterator for &'a mut TreeMap<K, V, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
/// Entries with a key already seen are skipped: the first value for a key wins.
impl<K: Ord, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> TreeMap<K, V> {
        let mut map = TreeMap::new();
        map.extend(iter);
        map
    }
}
impl<K: Ord, V, const N: usize> From<[(K, V); N]> for TreeMap<K, V> {
    fn from(arr: [(K, V); N]) -> TreeMap<K, V> {
        arr.into_iter().collect()
    }
}
impl<K: Ord, V, A: Allocator + Clone> Extend<(K, V)> for TreeMap<K, V, A> {
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
impl<'a, K: Ord + Copy, V: Copy, A: Allocator + Clone> Extend<(&'a K, &'a V)> for TreeMap<K, V, A> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        for (&k, &v) in iter {
            self.insert(k, v);
        }
    }
}
impl<K, Q, V, A: Allocator + Clone> std::ops::Index<&Q> for TreeMap<K, V, A>
where
    K: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// Panics if the key is not present in the `TreeMap`.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("{}", ContainerError::KeyNotFound),
        }
    }
}
impl<K: Debug, V: Debug, A: Allocator + Clone> Debug for TreeMap<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

fn pair<K, V>(nodes: &[Node<K, V>], at: NodeId) -> Option<(&K, &V)> {
    nodes.get(at)?.kv().map(|(k, v)| (k, v))
}

// Cursors.

mod private {
    pub trait Sealed {}
    impl Sealed for super::Forward {}
    impl Sealed for super::Reverse {}
}

/// Walking direction of a cursor, either [`Forward`] or [`Reverse`].
pub trait Direction: private::Sealed {
    /// The opposite direction.
    type Flip: Direction;
    /// True for ascending order.
    #[doc(hidden)]
    const FORWARD: bool;
}

/// Ascending key order.
#[derive(Debug)]
pub enum Forward {}

/// Descending key order.
#[derive(Debug)]
pub enum Reverse {}

impl Direction for Forward {
    type Flip = Reverse;
    const FORWARD: bool = true;
}

impl Direction for Reverse {
    type Flip = Forward;
    const FORWARD: bool = false;
}

fn step<N: Links + ?Sized>(nav: &N, at: NodeId, forward: bool) -> NodeId {
    if forward {
        nav.successor(at)
    } else {
        nav.predecessor(at)
    }
}

/// Read-only position in a [`TreeMap`].
///
/// Moving off the last entry lands on an end position that holds no entry;
/// moving further stays there.
pub struct Cursor<'a, K, V, D: Direction = Forward> {
    nodes: &'a [Node<K, V>],
    at: NodeId,
    _dir: PhantomData<D>,
}

impl<'a, K, V, D: Direction> Cursor<'a, K, V, D> {
    fn new(nodes: &'a [Node<K, V>], at: NodeId) -> Self {
        Self {
            nodes,
            at,
            _dir: PhantomData,
        }
    }

    /// The entry at the cursor, `None` on an end position.
    #[must_use]
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        pair(self.nodes, self.at)
    }

    /// The key at the cursor.
    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        self.key_value().map(|(k, _)| k)
    }

    /// The value at the cursor.
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.key_value().map(|(_, v)| v)
    }

    /// Has the cursor walked past the last entry in its direction?
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.at == if D::FORWARD { END_RIGHT } else { END_LEFT }
    }

    /// Step to the next entry in the cursor's direction.
    pub fn move_next(&mut self) {
        self.at = step(self.nodes, self.at, D::FORWARD);
    }

    /// Step to the previous entry in the cursor's direction.
    pub fn move_prev(&mut self) {
        self.at = step(self.nodes, self.at, !D::FORWARD);
    }

    /// The same position, walking the other way.
    #[must_use]
    pub fn flip(self) -> Cursor<'a, K, V, D::Flip> {
        Cursor::new(self.nodes, self.at)
    }
}

impl<K, V, D: Direction> Clone for Cursor<'_, K, V, D> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K, V, D: Direction> Copy for Cursor<'_, K, V, D> {}

impl<K, V, D: Direction> PartialEq for Cursor<'_, K, V, D> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.nodes, other.nodes) && self.at == other.at
    }
}
impl<K, V, D: Direction> Eq for Cursor<'_, K, V, D> {}

impl<K: Debug, V: Debug, D: Direction> Debug for Cursor<'_, K, V, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

/// Position in a [`TreeMap`] that can modify values and remove entries.
pub struct CursorMut<'a, K, V, A: Allocator + Clone = Global, D: Direction = Forward> {
    tree: &'a mut RbTree<K, V, A>,
    at: NodeId,
    _dir: PhantomData<D>,
}

impl<'a, K, V, A: Allocator + Clone, D: Direction> CursorMut<'a, K, V, A, D> {
    fn new(tree: &'a mut RbTree<K, V, A>, at: NodeId) -> Self {
        Self {
            tree,
            at,
            _dir: PhantomData,
        }
    }

    /// The entry at the cursor, `None` on an end position.
    #[must_use]
    pub fn key_value(&self) -> Option<(&K, &V)> {
        pair(self.tree.nodes(), self.at)
    }

    /// The entry at the cursor with a mutable value.
    pub fn key_value_mut(&mut self) -> Option<(&K, &mut V)> {
        let node = self.tree.nodes_mut().get_mut(self.at)?;
        node.kv_mut().map(|(k, v)| (&*k, v))
    }

    /// The key at the cursor.
    #[must_use]
    pub fn key(&self) -> Option<&K> {
        self.key_value().map(|(k, _)| k)
    }

    /// Mutable reference to the value at the cursor.
    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.key_value_mut().map(|(_, v)| v)
    }

    /// Convert into a mutable reference to the value at the cursor.
    #[must_use]
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        let node = self.tree.nodes_mut().get_mut(self.at)?;
        node.kv_mut().map(|(_, v)| v)
    }

    /// Has the cursor walked past the last entry in its direction?
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.at == if D::FORWARD { END_RIGHT } else { END_LEFT }
    }

    /// Step to the next entry in the cursor's direction.
    pub fn move_next(&mut self) {
        self.at = step(self.tree.nodes(), self.at, D::FORWARD);
    }

    /// Step to the previous entry in the cursor's direction.
    pub fn move_prev(&mut self) {
        self.at = step(self.tree.nodes(), self.at, !D::FORWARD);
    }

    /// Read-only view of the same position.
    #[must_use]
    pub fn as_cursor(&self) -> Cursor<'_, K, V, D> {
        Cursor::new(self.tree.nodes(), self.at)
    }

    /// Remove the entry at the cursor and move to the entry that followed it
    /// in the cursor's direction. Does nothing on an end position.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        if self.at <= END_RIGHT {
            return None;
        }
        let r = self.tree.remove_node(self.at);
        self.at = if D::FORWARD { r.next } else { r.prev };
        Some((r.key, r.value))
    }
}

impl<K: Debug, V: Debug, A: Allocator + Clone, D: Direction> Debug for CursorMut<'_, K, V, A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.key_value()).finish()
    }
}

// Iterators.

/// Iterator returned by [`TreeMap::range`].
pub struct Range<'a, K, V> {
    nodes: &'a [Node<K, V>],
    front: NodeId,
    /// First node after the range.
    stop: NodeId,
}
impl<'a, K, V> Range<'a, K, V> {
    fn new(nodes: &'a [Node<K, V>], front: NodeId, stop: NodeId) -> Self {
        Self { nodes, front, stop }
    }
}
impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.stop {
            return None;
        }
        let at = self.front;
        self.front = self.nodes.successor(at);
        pair(self.nodes, at)
    }
}
impl<'a, K, V> DoubleEndedIterator for Range<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.stop {
            return None;
        }
        self.stop = self.nodes.predecessor(self.stop);
        pair(self.nodes, self.stop)
    }
}
impl<'a, K, V> FusedIterator for Range<'a, K, V> {}
impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.nodes, self.front, self.stop)
    }
}
impl<K: Debug, V: Debug> Debug for Range<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator returned by [`TreeMap::iter`].
pub struct Iter<'a, K, V> {
    len: usize,
    inner: Range<'a, K, V>,
}
impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            self.inner.next()
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            self.inner.next_back()
        }
    }
}
impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}
impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            inner: self.inner.clone(),
        }
    }
}
impl<K: Debug, V: Debug> Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator returned by [`TreeMap::iter_mut`].
pub struct IterMut<'a, K, V> {
    len: usize,
    base: NonNull<Node<K, V>>,
    front: NodeId,
    back: NodeId,
    _pd: PhantomData<&'a mut Node<K, V>>,
}

unsafe impl<K: Send, V: Send> Send for IterMut<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

impl<'a, K, V> IterMut<'a, K, V> {
    fn links(&self) -> RawLinks<K, V> {
        // SAFETY: the arena is mutably borrowed for 'a and only entries are handed out.
        unsafe { RawLinks::new(self.base.as_ptr()) }
    }

    fn entry_at(&self, at: NodeId) -> (&'a K, &'a mut V) {
        // SAFETY: each node is yielded at most once, so the references are disjoint.
        // Only the entry field is borrowed, links stay readable through RawLinks.
        unsafe { raw_entry(self.base.as_ptr(), at) }
    }
}
impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let at = self.front;
        self.front = self.links().successor(at);
        Some(self.entry_at(at))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let at = self.back;
        self.back = self.links().predecessor(at);
        Some(self.entry_at(at))
    }
}
impl<'a, K, V> FusedIterator for IterMut<'a, K, V> {}
impl<K, V> Debug for IterMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("len", &self.len).finish()
    }
}

/// Consuming iterator for [`TreeMap`].
pub struct IntoIter<K, V, A: Allocator + Clone = Global> {
    map: TreeMap<K, V, A>,
}
impl<K, V, A: Allocator + Clone> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        self.map.pop_first()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}
impl<K, V, A: Allocator + Clone> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map.pop_last()
    }
}
impl<K, V, A: Allocator + Clone> ExactSizeIterator for IntoIter<K, V, A> {
    fn len(&self) -> usize {
        self.map.len()
    }
}
impl<K, V, A: Allocator + Clone> FusedIterator for IntoIter<K, V, A> {}
impl<K: Debug, V: Debug, A: Allocator + Clone> Debug for IntoIter<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.map).finish()
    }
}

/// Iterator returned by [`TreeMap::values_mut`].
#[derive(Debug)]
pub struct ValuesMut<'a, K, V>(IterMut<'a, K, V>);
impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
}
impl<'a, K, V> DoubleEndedIterator for ValuesMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}
impl<'a, K, V> ExactSizeIterator for ValuesMut<'a, K, V> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V> FusedIterator for ValuesMut<'a, K, V> {}

/// Iterator returned by [`TreeMap::values`].
#[derive(Debug)]
pub struct Values<'a, K, V>(Iter<'a, K, V>);
impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
}
impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}
impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V> FusedIterator for Values<'a, K, V> {}

/// Iterator returned by [`TreeMap::keys`].
#[derive(Debug)]
pub struct Keys<'a, K, V>(Iter<'a, K, V>);
impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }
}
impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}
impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

// Tests.

#[cfg(all(test, not(miri), feature = "cap"))]
#[global_allocator]
static ALLOCATOR: cap::Cap<std::alloc::System> = cap::Cap::new(std::alloc::System, usize::MAX);

#[cfg(test)]
fn print_memory() {
    #[cfg(all(test, not(miri), feature = "cap"))]
    println!("Memory allocated: {} bytes", ALLOCATOR.allocated());
}

/* mimalloc cannot be used with miri */
#[cfg(all(test, not(miri), not(feature = "cap")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
