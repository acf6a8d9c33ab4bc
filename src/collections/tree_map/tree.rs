//! Red-black tree engine behind [`TreeMap`](super::TreeMap).
//!
//! Nodes live in an arena (a [`Vec`] of slots) and refer to each other by
//! index. Children are owned by the tree; a `parent` index is only a way back
//! up and is never followed for destruction. Vacant slots are threaded into a
//! free list through their `parent` field.
//!
//! Slots 0 and 1 hold two permanent sentinels. Whenever the tree is non-empty,
//! [`END_LEFT`] hangs as the left child of the minimum and [`END_RIGHT`] as the
//! right child of the maximum, so stepping off either end of the sequence lands
//! on a real slot rather than on nothing. Every structural change detaches both
//! sentinels first and relinks them to the new extremes afterwards.

use std::{borrow::Borrow, cmp::Ordering, mem};

use crate::alloc::{Allocator, Global};
use crate::error::{failed, ContainerError, Result};
use crate::vec::Vec;

/// Index of a slot in the arena.
pub(crate) type NodeId = usize;

/// Position before the first element.
pub(crate) const END_LEFT: NodeId = 0;

/// Position after the last element.
pub(crate) const END_RIGHT: NodeId = 1;

/// Stack of node ids for iterative walks. A red-black tree of `n` nodes is at
/// most `2 * log2(n + 1)` high, and `n` is bounded by the address space.
type StkVec<T> = arrayvec::ArrayVec<T, 130>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Color {
    Red,
    Black,
    Sentinel,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Arena slot. `kv` is `None` for the sentinels and for vacant slots.
pub(crate) struct Node<K, V> {
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    color: Color,
    kv: Option<(K, V)>,
}

impl<K, V> Node<K, V> {
    fn sentinel() -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            color: Color::Sentinel,
            kv: None,
        }
    }

    pub(crate) fn kv(&self) -> Option<&(K, V)> {
        self.kv.as_ref()
    }

    pub(crate) fn kv_mut(&mut self) -> Option<&mut (K, V)> {
        self.kv.as_mut()
    }
}

/// Read-only navigation over parent/child links.
///
/// Implemented for a slice of slots and for raw slot pointers so that shared
/// iterators, cursors and the mutable iterator step through the tree the same
/// way.
pub(crate) trait Links {
    fn parent(&self, id: NodeId) -> Option<NodeId>;
    fn left(&self, id: NodeId) -> Option<NodeId>;
    fn right(&self, id: NodeId) -> Option<NodeId>;

    fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left(id),
            Side::Right => self.right(id),
        }
    }

    /// Leftmost node of the subtree at `id`, not descending into [`END_LEFT`].
    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.left(id) {
            if l == END_LEFT {
                break;
            }
            id = l;
        }
        id
    }

    /// Rightmost node of the subtree at `id`, not descending into [`END_RIGHT`].
    fn maximum(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.right(id) {
            if r == END_RIGHT {
                break;
            }
            id = r;
        }
        id
    }

    /// In-order successor. The successor of the maximum is [`END_RIGHT`],
    /// and [`END_RIGHT`] is its own successor.
    fn successor(&self, id: NodeId) -> NodeId {
        if let Some(r) = self.right(id) {
            return self.minimum(r);
        }
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            if self.right(p) != Some(cur) {
                return p;
            }
            cur = p;
        }
        END_RIGHT
    }

    /// In-order predecessor. The predecessor of the minimum is [`END_LEFT`],
    /// and [`END_LEFT`] is its own predecessor.
    fn predecessor(&self, id: NodeId) -> NodeId {
        if let Some(l) = self.left(id) {
            return self.maximum(l);
        }
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            if self.left(p) != Some(cur) {
                return p;
            }
            cur = p;
        }
        END_LEFT
    }

    /// First element, or [`END_RIGHT`] if there is none.
    fn lowest(&self) -> NodeId {
        self.parent(END_LEFT).unwrap_or(END_RIGHT)
    }

    /// Last element, or [`END_LEFT`] if there is none.
    fn highest(&self) -> NodeId {
        self.parent(END_RIGHT).unwrap_or(END_LEFT)
    }
}

/// In debug mode or feature unsafe-optim not enabled, same as assert! otherwise does nothing.
#[cfg(any(debug_assertions, not(feature = "unsafe-optim")))]
macro_rules! safe_assert {
    ( $cond: expr ) => {
        assert!($cond)
    };
}

/// In debug mode or feature unsafe-optim not enabled, same as assert! otherwise does nothing.
#[cfg(all(not(debug_assertions), feature = "unsafe-optim"))]
macro_rules! safe_assert {
    ( $cond: expr ) => {
        if !$cond {
            unsafe { std::hint::unreachable_unchecked() }
        }
    };
}

#[inline]
fn slot<K, V>(nodes: &[Node<K, V>], id: NodeId) -> &Node<K, V> {
    safe_assert!(id < nodes.len());
    unsafe { nodes.get_unchecked(id) }
}

#[inline]
fn slot_mut<K, V>(nodes: &mut [Node<K, V>], id: NodeId) -> &mut Node<K, V> {
    safe_assert!(id < nodes.len());
    unsafe { nodes.get_unchecked_mut(id) }
}

impl<K, V> Links for [Node<K, V>] {
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        slot(self, id).parent
    }

    fn left(&self, id: NodeId) -> Option<NodeId> {
        slot(self, id).left
    }

    fn right(&self, id: NodeId) -> Option<NodeId> {
        slot(self, id).right
    }
}

/// Links read through a raw pointer to the first slot.
///
/// Used where entries of already visited slots are mutably borrowed, so no
/// reference to a whole slot may be formed.
pub(crate) struct RawLinks<K, V> {
    base: *const Node<K, V>,
}

impl<K, V> RawLinks<K, V> {
    /// # Safety
    ///
    /// `base` must point to the first slot of an arena that stays alive and
    /// structurally unchanged while the value is in use.
    pub(crate) unsafe fn new(base: *const Node<K, V>) -> Self {
        Self { base }
    }
}

impl<K, V> Links for RawLinks<K, V> {
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        unsafe { (*self.base.add(id)).parent }
    }

    fn left(&self, id: NodeId) -> Option<NodeId> {
        unsafe { (*self.base.add(id)).left }
    }

    fn right(&self, id: NodeId) -> Option<NodeId> {
        unsafe { (*self.base.add(id)).right }
    }
}

/// Entry of slot `id` reached through a raw pointer to the first slot.
///
/// # Safety
///
/// `base` must point to the first slot of a live arena, slot `id` must hold an
/// entry, and no other reference to that entry may exist for `'a`.
pub(crate) unsafe fn raw_entry<'a, K, V>(base: *mut Node<K, V>, id: NodeId) -> (&'a K, &'a mut V) {
    unsafe {
        match &mut (*base.add(id)).kv {
            Some((k, v)) => (&*k, v),
            None => unreachable!("slot {id} holds no entry"),
        }
    }
}

/// Result of removing one node.
pub(crate) struct Removed<K, V> {
    pub key: K,
    pub value: V,
    /// Position of the in-order successor of the removed key, valid after
    /// the removal.
    pub next: NodeId,
    /// Position of the in-order predecessor of the removed key, valid after
    /// the removal.
    pub prev: NodeId,
}

/// Red-black tree over an arena of slots.
///
/// Duplicate keys are not rejected here; equal keys descend to the left.
pub(crate) struct RbTree<K, V, A: Allocator + Clone = Global> {
    nodes: Vec<Node<K, V>, A>,
    free: Option<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl<K, V, A: Allocator + Clone> RbTree<K, V, A> {
    pub(crate) fn new_in(alloc: A) -> Self {
        let mut nodes = Vec::new_in(alloc);
        nodes.push(Node::sentinel());
        nodes.push(Node::sentinel());
        Self {
            nodes,
            free: None,
            root: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn nodes(&self) -> &[Node<K, V>] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node<K, V>] {
        &mut self.nodes
    }

    pub(crate) fn allocator(&self) -> &A {
        self.nodes.allocator()
    }

    /// Largest number of entries the arena can hold, less the two sentinels.
    pub(crate) fn max_size(&self) -> usize {
        self.nodes.max_size() - 2
    }

    /// Drop every entry. The arena keeps its capacity and the sentinels.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(2);
        for s in [END_LEFT, END_RIGHT] {
            self.node_mut(s).parent = None;
        }
        self.free = None;
        self.root = None;
        self.len = 0;
    }

    pub(crate) fn entry(&self, id: NodeId) -> (&K, &V) {
        match &self.node(id).kv {
            Some((k, v)) => (k, v),
            None => unreachable!("slot {id} holds no entry"),
        }
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> (&K, &mut V) {
        match &mut self.node_mut(id).kv {
            Some((k, v)) => (&*k, v),
            None => unreachable!("slot {id} holds no entry"),
        }
    }

    pub(crate) fn key(&self, id: NodeId) -> &K {
        self.entry(id).0
    }

    /// Locate a node holding `key`.
    ///
    /// Descends by `<` and stops on the first node whose key compares equal.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        while let Some(c) = cur {
            cur = match key.cmp(self.key(c).borrow()) {
                Ordering::Less => self.real_child(c, Side::Left),
                Ordering::Greater => self.real_child(c, Side::Right),
                Ordering::Equal => return Some(c),
            };
        }
        None
    }

    /// First node whose key is not less than `key`, else [`END_RIGHT`].
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> NodeId
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut best = END_RIGHT;
        let mut cur = self.root;
        while let Some(c) = cur {
            if self.key(c).borrow() < key {
                cur = self.real_child(c, Side::Right);
            } else {
                best = c;
                cur = self.real_child(c, Side::Left);
            }
        }
        best
    }

    /// First node whose key is greater than `key`, else [`END_RIGHT`].
    pub(crate) fn upper_bound<Q>(&self, key: &Q) -> NodeId
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut best = END_RIGHT;
        let mut cur = self.root;
        while let Some(c) = cur {
            if key < self.key(c).borrow() {
                best = c;
                cur = self.real_child(c, Side::Left);
            } else {
                cur = self.real_child(c, Side::Right);
            }
        }
        best
    }

    /// Add a red leaf for `key` and rebalance. Returns the new node.
    ///
    /// On allocation failure the tree is unchanged.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<NodeId>
    where
        K: Ord,
    {
        let id = self.alloc_node(key, value)?;
        self.detach_sentinels();

        let mut parent = None;
        let mut side = Side::Left;
        let mut cur = self.root;
        {
            let key = self.key(id);
            while let Some(c) = cur {
                parent = Some(c);
                side = if self.key(c) < key {
                    Side::Right
                } else {
                    Side::Left
                };
                cur = self.child(c, side);
            }
        }
        self.node_mut(id).parent = parent;
        match parent {
            None => self.root = Some(id),
            Some(p) => self.set_child(p, side, Some(id)),
        }
        self.fix_insert(id);

        self.len += 1;
        self.attach_sentinels();
        Ok(id)
    }

    /// Remove the node holding `key`.
    pub(crate) fn erase<Q>(&mut self, key: &Q) -> Result<Removed<K, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Some(id) => Ok(self.remove_node(id)),
            None => Err(ContainerError::KeyNotFound),
        }
    }

    /// Remove the entry at `id`, which must hold one.
    ///
    /// A node with two children is not unlinked itself: it takes over the
    /// entry of its in-order successor, whose node (with at most one child)
    /// is unlinked instead. The returned neighbour positions account for that
    /// move.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Removed<K, V> {
        let nav = self.nodes();
        let mut next = nav.successor(id);
        let mut prev = nav.predecessor(id);
        let mut moved = |from: NodeId, to: NodeId| {
            if next == from {
                next = to;
            }
            if prev == from {
                prev = to;
            }
        };

        self.detach_sentinels();
        let mut old = id;
        let (key, value) = loop {
            let (left, right) = (self.node(old).left, self.node(old).right);
            match (left, right) {
                (Some(_), Some(r)) => {
                    let succ = self.nodes().minimum(r);
                    self.swap_entries(old, succ);
                    moved(succ, old);
                    old = succ;
                }
                (None, None) => {
                    if self.root == Some(old) {
                        self.root = None;
                    } else {
                        if self.node(old).color == Color::Black {
                            self.fix_double_black(old);
                        }
                        if let Some(p) = self.node(old).parent {
                            let side = self.side_of(old);
                            self.set_child(p, side, None);
                        }
                    }
                    break self.free_node(old);
                }
                (Some(c), None) | (None, Some(c)) => match self.node(old).parent {
                    None => {
                        // A root with one child: that child is a red leaf.
                        let entry = self.take_entry(c);
                        let removed = self.take_entry(old);
                        self.node_mut(old).kv = Some(entry);
                        self.node_mut(old).left = None;
                        self.node_mut(old).right = None;
                        self.free_node_slot(c);
                        moved(c, old);
                        break removed;
                    }
                    Some(p) => {
                        let double_black = self.node(old).color == Color::Black
                            && self.node(c).color == Color::Black;
                        let side = self.side_of(old);
                        self.set_child(p, side, Some(c));
                        self.node_mut(c).parent = Some(p);
                        let removed = self.free_node(old);
                        if double_black {
                            self.fix_double_black(c);
                        } else {
                            self.node_mut(c).color = Color::Black;
                        }
                        break removed;
                    }
                },
            }
        };

        self.len -= 1;
        self.attach_sentinels();
        if self.len == 0 {
            next = END_RIGHT;
            prev = END_LEFT;
        }
        Removed {
            key,
            value,
            next,
            prev,
        }
    }

    /// Deep copy by pre-order re-insertion into a fresh tree.
    pub(crate) fn deep_clone(&self) -> Result<Self>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let mut copy = Self::new_in(self.allocator().clone());
        let mut stack: StkVec<NodeId> = StkVec::new();
        if let Some(r) = self.root {
            stack.push(r);
        }
        while let Some(id) = stack.pop() {
            let (k, v) = self.entry(id);
            copy.insert(k.clone(), v.clone())?;
            for side in [Side::Right, Side::Left] {
                if let Some(c) = self.real_child(id, side) {
                    stack.push(c);
                }
            }
        }
        Ok(copy)
    }

    // ##########################################################################
    // Private methods ##########################################################
    // ##########################################################################

    #[inline]
    fn node(&self, id: NodeId) -> &Node<K, V> {
        slot(&self.nodes, id)
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        slot_mut(&mut self.nodes, id)
    }

    fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        self.nodes().child(id, side)
    }

    /// Child that is a real node, treating sentinels as absent.
    fn real_child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        self.child(id, side).filter(|&c| c > END_RIGHT)
    }

    fn set_child(&mut self, id: NodeId, side: Side, child: Option<NodeId>) {
        let n = self.node_mut(id);
        match side {
            Side::Left => n.left = child,
            Side::Right => n.right = child,
        }
    }

    /// Which child of its parent `id` is. The root counts as a right child.
    fn side_of(&self, id: NodeId) -> Side {
        match self.node(id).parent {
            Some(p) if self.node(p).left == Some(id) => Side::Left,
            _ => Side::Right,
        }
    }

    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.node(id).color == Color::Red)
    }

    fn alloc_node(&mut self, key: K, value: V) -> Result<NodeId> {
        let node = Node {
            parent: None,
            left: None,
            right: None,
            color: Color::Red,
            kv: Some((key, value)),
        };
        match self.free {
            Some(id) => {
                self.free = self.node(id).parent;
                *self.node_mut(id) = node;
                Ok(id)
            }
            None => {
                let id = self.nodes.len();
                if id - 2 >= self.max_size() {
                    return Err(ContainerError::LengthExceeded {
                        requested: id - 1,
                        max: self.max_size(),
                    });
                }
                self.nodes.try_push(node)?;
                Ok(id)
            }
        }
    }

    fn take_entry(&mut self, id: NodeId) -> (K, V) {
        match self.node_mut(id).kv.take() {
            Some(kv) => kv,
            None => unreachable!("slot {id} holds no entry"),
        }
    }

    /// Unlinked node: take its entry and put the slot on the free list.
    fn free_node(&mut self, id: NodeId) -> (K, V) {
        let kv = self.take_entry(id);
        self.free_node_slot(id);
        kv
    }

    fn free_node_slot(&mut self, id: NodeId) {
        let free = self.free;
        let n = self.node_mut(id);
        n.parent = free;
        n.left = None;
        n.right = None;
        n.color = Color::Black;
        self.free = Some(id);
    }

    fn swap_entries(&mut self, a: NodeId, b: NodeId) {
        let ka = self.node_mut(a).kv.take();
        let kb = mem::replace(&mut self.node_mut(b).kv, ka);
        self.node_mut(a).kv = kb;
    }

    fn detach_sentinels(&mut self) {
        for (s, side) in [(END_LEFT, Side::Left), (END_RIGHT, Side::Right)] {
            if let Some(p) = self.node_mut(s).parent.take() {
                self.set_child(p, side, None);
            }
        }
    }

    fn attach_sentinels(&mut self) {
        if let Some(root) = self.root {
            let min = self.nodes().minimum(root);
            self.node_mut(min).left = Some(END_LEFT);
            self.node_mut(END_LEFT).parent = Some(min);
            let max = self.nodes().maximum(root);
            self.node_mut(max).right = Some(END_RIGHT);
            self.node_mut(END_RIGHT).parent = Some(max);
        }
    }

    /// Rotate the subtree at `x` towards `dir`: a left rotation lifts the
    /// right child of `x` into its place.
    fn rotate(&mut self, x: NodeId, dir: Side) {
        let up = dir.opposite();
        let Some(y) = self.child(x, up) else {
            return;
        };
        let inner = self.child(y, dir);
        self.set_child(x, up, inner);
        if let Some(b) = inner {
            self.node_mut(b).parent = Some(x);
        }
        let xp = self.node(x).parent;
        match xp {
            None => self.root = Some(y),
            Some(p) => {
                let side = self.side_of(x);
                self.set_child(p, side, Some(y));
            }
        }
        self.node_mut(y).parent = xp;
        self.set_child(y, dir, Some(x));
        self.node_mut(x).parent = Some(y);
    }

    fn fix_insert(&mut self, mut z: NodeId) {
        while self.node(z).color == Color::Red {
            let Some(mut p) = self.node(z).parent else {
                break;
            };
            if self.node(p).color != Color::Red {
                break;
            }
            let Some(g) = self.node(p).parent else {
                break;
            };
            let p_side = self.side_of(p);
            let uncle = self.child(g, p_side.opposite());
            if let (Some(u), true) = (uncle, self.is_red(uncle)) {
                self.node_mut(p).color = Color::Black;
                self.node_mut(u).color = Color::Black;
                self.node_mut(g).color = Color::Red;
                z = g;
            } else {
                if self.child(p, p_side.opposite()) == Some(z) {
                    // Inner grandchild: turn it into the outer case.
                    self.rotate(p, p_side);
                    mem::swap(&mut z, &mut p);
                }
                self.rotate(g, p_side.opposite());
                let pc = self.node(p).color;
                self.node_mut(p).color = self.node(g).color;
                self.node_mut(g).color = pc;
                z = p;
            }
        }
        if let Some(r) = self.root {
            self.node_mut(r).color = Color::Black;
        }
    }

    /// Repair a path through `x` that is one black node short.
    fn fix_double_black(&mut self, mut x: NodeId) {
        loop {
            let Some(p) = self.node(x).parent else {
                return;
            };
            let x_side = self.side_of(x);
            let s_side = x_side.opposite();
            let Some(s) = self.child(p, s_side) else {
                x = p;
                continue;
            };
            if self.node(s).color == Color::Red {
                self.node_mut(p).color = Color::Red;
                self.node_mut(s).color = Color::Black;
                self.rotate(p, x_side);
                continue;
            }
            let far = self.child(s, s_side);
            let near = self.child(s, x_side);
            if let (Some(f), true) = (far, self.is_red(far)) {
                self.node_mut(f).color = self.node(s).color;
                self.node_mut(s).color = self.node(p).color;
                self.rotate(p, x_side);
            } else if let (Some(n), true) = (near, self.is_red(near)) {
                self.node_mut(n).color = self.node(p).color;
                self.rotate(s, s_side);
                self.rotate(p, x_side);
            } else {
                self.node_mut(s).color = Color::Red;
                if self.node(p).color == Color::Black {
                    x = p;
                    continue;
                }
            }
            self.node_mut(p).color = Color::Black;
            return;
        }
    }
}

#[cfg(test)]
impl<K, V> RbTree<K, V> {
    pub(crate) fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<K: Ord + Clone, V: Clone, A: Allocator + Clone> Clone for RbTree<K, V, A> {
    fn clone(&self) -> Self {
        match self.deep_clone() {
            Ok(t) => t,
            Err(e) => failed(e),
        }
    }
}

#[cfg(test)]
impl<K: Ord, V, A: Allocator + Clone> RbTree<K, V, A> {
    /// Assert every structural invariant, returning the black height.
    pub(crate) fn check(&self) -> usize {
        for s in [END_LEFT, END_RIGHT] {
            assert_eq!(self.node(s).color, Color::Sentinel);
            assert!(self.node(s).kv.is_none());
            assert!(self.node(s).left.is_none() && self.node(s).right.is_none());
        }
        let Some(root) = self.root else {
            assert_eq!(self.len, 0);
            assert!(self.node(END_LEFT).parent.is_none());
            assert!(self.node(END_RIGHT).parent.is_none());
            return 1;
        };
        assert_eq!(self.node(root).color, Color::Black, "root must be black");
        assert!(self.node(root).parent.is_none());

        let min = self.nodes().minimum(root);
        let max = self.nodes().maximum(root);
        assert_eq!(self.node(min).left, Some(END_LEFT));
        assert_eq!(self.node(END_LEFT).parent, Some(min));
        assert_eq!(self.node(max).right, Some(END_RIGHT));
        assert_eq!(self.node(END_RIGHT).parent, Some(max));

        let mut count = 0;
        let bh = self.check_subtree(Some(root), None, None, &mut count);
        assert_eq!(count, self.len, "reachable nodes must match len");
        bh
    }

    fn check_subtree(
        &self,
        id: Option<NodeId>,
        lo: Option<&K>,
        hi: Option<&K>,
        count: &mut usize,
    ) -> usize {
        let Some(id) = id.filter(|&c| c > END_RIGHT) else {
            return 1;
        };
        *count += 1;
        let n = self.node(id);
        let k = self.key(id);
        if let Some(lo) = lo {
            assert!(lo < k, "keys must ascend");
        }
        if let Some(hi) = hi {
            assert!(k < hi, "keys must ascend");
        }
        for c in [n.left, n.right].into_iter().flatten() {
            assert_eq!(self.node(c).parent, Some(id), "parent link broken");
        }
        if n.color == Color::Red {
            assert!(!self.is_red(n.left) && !self.is_red(n.right), "red node with red child");
        } else {
            assert_eq!(n.color, Color::Black);
        }
        let lh = self.check_subtree(n.left, lo, Some(k), count);
        let rh = self.check_subtree(n.right, Some(k), hi, count);
        assert_eq!(lh, rh, "black height differs");
        lh + usize::from(n.color == Color::Black)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_in_order(t: &RbTree<i32, ()>) -> std::vec::Vec<i32> {
        let nav = t.nodes();
        let mut out = std::vec::Vec::new();
        let mut at = nav.lowest();
        while at != END_RIGHT {
            out.push(*t.key(at));
            at = nav.successor(at);
        }
        out
    }

    #[test]
    fn empty_tree_sentinels() {
        let t = RbTree::<i32, ()>::new();
        t.check();
        let nav = t.nodes();
        assert_eq!(nav.lowest(), END_RIGHT);
        assert_eq!(nav.highest(), END_LEFT);
        assert_eq!(nav.successor(END_LEFT), END_RIGHT);
        assert_eq!(nav.predecessor(END_RIGHT), END_LEFT);
    }

    #[test]
    fn sentinels_follow_extremes() {
        let mut t = RbTree::new();
        for k in [5, 3, 8, 1, 4, 7, 9] {
            t.insert(k, ()).unwrap();
            t.check();
        }
        let nav = t.nodes();
        assert_eq!(*t.key(nav.lowest()), 1);
        assert_eq!(*t.key(nav.highest()), 9);
        assert_eq!(nav.predecessor(nav.lowest()), END_LEFT);
        assert_eq!(nav.successor(nav.highest()), END_RIGHT);
        assert_eq!(nav.successor(END_RIGHT), END_RIGHT);
        assert_eq!(nav.predecessor(END_LEFT), END_LEFT);
        assert_eq!(nav.successor(END_LEFT), nav.lowest());
        assert_eq!(nav.predecessor(END_RIGHT), nav.highest());
        assert_eq!(keys_in_order(&t), [1, 3, 4, 5, 7, 8, 9]);
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut t = RbTree::new();
        for k in 0..1024 {
            t.insert(k, ()).unwrap();
        }
        let bh = t.check();
        // Height is at most twice the black height.
        assert!(bh <= 12, "black height {bh}");
    }

    #[test]
    fn bounds() {
        let mut t = RbTree::new();
        for k in [5, 3, 8, 1, 4, 7, 9] {
            t.insert(k, ()).unwrap();
        }
        assert_eq!(*t.key(t.lower_bound(&6)), 7);
        assert_eq!(*t.key(t.lower_bound(&7)), 7);
        assert_eq!(*t.key(t.upper_bound(&7)), 8);
        assert_eq!(*t.key(t.lower_bound(&0)), 1);
        assert_eq!(t.lower_bound(&10), END_RIGHT);
        assert_eq!(t.upper_bound(&9), END_RIGHT);
        assert_eq!(t.search(&6), None);
        assert_eq!(t.search(&4).map(|id| *t.key(id)), Some(4));
    }

    #[test]
    fn raw_tree_keeps_duplicates() {
        let mut t = RbTree::new();
        for k in [2, 1, 2, 2, 3] {
            t.insert(k, ()).unwrap();
        }
        assert_eq!(t.len(), 5);
        assert_eq!(keys_in_order(&t), [1, 2, 2, 2, 3]);
    }

    #[test]
    fn erase_reports_neighbours() {
        let mut t = RbTree::new();
        for k in 0..20 {
            t.insert(k, ()).unwrap();
        }
        for k in [10, 0, 19, 5] {
            let r = t.erase(&k).unwrap();
            t.check();
            assert_eq!(r.key, k);
            let next = (k + 1..20).find(|n| t.search(n).is_some());
            let prev = (0..k).rev().find(|n| t.search(n).is_some());
            match next {
                Some(n) => assert_eq!(*t.key(r.next), n),
                None => assert_eq!(r.next, END_RIGHT),
            }
            match prev {
                Some(n) => assert_eq!(*t.key(r.prev), n),
                None => assert_eq!(r.prev, END_LEFT),
            }
        }
        assert_eq!(t.erase(&10).err(), Some(ContainerError::KeyNotFound));
    }

    #[test]
    fn root_with_single_child() {
        let mut t = RbTree::new();
        t.insert(1, ()).unwrap();
        t.insert(2, ()).unwrap();
        let r = t.erase(&1).unwrap();
        t.check();
        assert_eq!(*t.key(r.next), 2);
        assert_eq!(r.prev, END_LEFT);
        let r = t.erase(&2).unwrap();
        t.check();
        assert_eq!((r.next, r.prev), (END_RIGHT, END_LEFT));
    }

    #[test]
    fn slots_are_reused() {
        let mut t = RbTree::new();
        for k in 0..100 {
            t.insert(k, ()).unwrap();
        }
        let slots = t.nodes().len();
        for k in 0..50 {
            t.erase(&k).unwrap();
        }
        for k in 100..150 {
            t.insert(k, ()).unwrap();
        }
        t.check();
        assert_eq!(t.nodes().len(), slots);
        t.clear();
        t.check();
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut t = RbTree::new();
        for k in 0..300 {
            t.insert(k, ()).unwrap();
        }
        let c = t.clone();
        c.check();
        for k in 0..300 {
            t.erase(&k).unwrap();
        }
        assert_eq!(c.len(), 300);
        assert_eq!(keys_in_order(&c), (0..300).collect::<std::vec::Vec<_>>());
    }
}
