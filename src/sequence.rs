//! The minimal sequence interface that stack and queue style adapters rely on.

use crate::alloc::Allocator;
use crate::vec::Vec;
use std::collections::VecDeque;

/// Sequence container with access at both ends.
///
/// A LIFO adapter needs `push_back`/`pop_back`/`back`, a FIFO adapter needs
/// `push_back`/`pop_front`/`front`/`back`. Implementations may make
/// `pop_front` linear in the length.
pub trait Sequence {
    /// Element type.
    type Item;

    /// Append at the back.
    fn push_back(&mut self, value: Self::Item);
    /// Remove from the back.
    fn pop_back(&mut self) -> Option<Self::Item>;
    /// Remove from the front.
    fn pop_front(&mut self) -> Option<Self::Item>;
    /// First element.
    fn front(&self) -> Option<&Self::Item>;
    /// Last element.
    fn back(&self) -> Option<&Self::Item>;
    /// Number of elements.
    fn len(&self) -> usize;

    /// True when there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, A: Allocator> Sequence for Vec<T, A> {
    type Item = T;

    fn push_back(&mut self, value: T) {
        self.push(value);
    }

    fn pop_back(&mut self) -> Option<T> {
        self.pop()
    }

    /// Shifts every remaining element down by one.
    fn pop_front(&mut self) -> Option<T> {
        if Vec::is_empty(self) {
            None
        } else {
            Some(self.remove(0))
        }
    }

    fn front(&self) -> Option<&T> {
        Vec::front(self)
    }

    fn back(&self) -> Option<&T> {
        Vec::back(self)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl<T> Sequence for VecDeque<T> {
    type Item = T;

    fn push_back(&mut self, value: T) {
        VecDeque::push_back(self, value);
    }

    fn pop_back(&mut self) -> Option<T> {
        VecDeque::pop_back(self)
    }

    fn pop_front(&mut self) -> Option<T> {
        VecDeque::pop_front(self)
    }

    fn front(&self) -> Option<&T> {
        VecDeque::front(self)
    }

    fn back(&self) -> Option<&T> {
        VecDeque::back(self)
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }
}
