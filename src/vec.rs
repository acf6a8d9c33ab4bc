use crate::alloc::{Allocator, Global};
use crate::error::{failed, ContainerError, Result};

use log::{debug, trace};
use std::{
    alloc::Layout,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    marker::PhantomData,
    mem,
    ops::{Bound, Deref, DerefMut, RangeBounds},
    ptr,
    ptr::NonNull,
    slice,
};

/// A contiguous growable array similar to [`std::vec::Vec`].
///
/// Capacity starts at zero, becomes one on the first growth and then doubles
/// each time the buffer is exhausted, capped at [`Vec::max_size`]. Growing moves
/// every element to a new buffer, so any raw pointer into the old buffer is
/// invalidated. Positions are plain `usize` offsets and random access goes
/// through the slice the vector dereferences to.
pub struct Vec<T, A: Allocator = Global> {
    len: usize,
    cap: usize,
    p: NonNull<T>,
    alloc: A,
    _pd: PhantomData<T>,
}

impl<T> Vec<T> {
    /// Create a new, empty Vec. No memory is allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let mut v = Vec::new();
    /// assert_eq!(v.capacity(), 0);
    /// v.push("England");
    /// v.push("France");
    /// assert!( v.len() == 2 );
    /// for s in &v { println!("s={}",s); }
    /// ```
    #[must_use]
    pub const fn new() -> Vec<T> {
        Self::new_in(Global)
    }

    /// Constructs a new, empty `Vec<T>` with exactly the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`Vec::max_size`], aborts if allocation fails.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Vec<T> {
        Self::with_capacity_in(capacity, Global)
    }

    /// Vec holding `count` clones of `value`.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let v = Vec::from_elem(3, 'x').unwrap();
    /// assert_eq!(&v[..], &['x', 'x', 'x']);
    /// assert_eq!(v.capacity(), 3);
    /// ```
    pub fn from_elem(count: usize, value: T) -> Result<Vec<T>>
    where
        T: Clone,
    {
        let mut v = Self::new();
        v.assign(count, value)?;
        Ok(v)
    }
}

/// # Basic methods.
impl<T, A: Allocator> Vec<T, A> {
    const MAX_SIZE: usize = if mem::size_of::<T>() == 0 {
        usize::MAX
    } else {
        isize::MAX as usize / mem::size_of::<T>()
    };

    /// Returns the number of elements.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the vector contains no elements.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let mut v = Vec::new();
    /// assert!(v.is_empty());
    ///
    /// v.push(1);
    /// assert!(!v.is_empty());
    /// ```
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest number of elements a vector of `T` can ever hold.
    pub const fn max_size(&self) -> usize {
        Self::MAX_SIZE
    }

    /// Push a value onto the end of the vec.
    ///
    /// # Panics
    ///
    /// Panics if the vec already holds [`Vec::max_size`] elements, aborts if
    /// allocation fails. See [`Vec::try_push`] for the fallible form.
    pub fn push(&mut self, value: T) {
        if let Err(e) = self.try_push(value) {
            failed(e);
        }
    }

    /// Push a value onto the end of the vec, reporting growth failure.
    ///
    /// On failure the vec is unchanged and `value` is dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let mut v = Vec::new();
    /// for i in 0..5 {
    ///     v.try_push(i).unwrap();
    /// }
    /// assert_eq!(v.capacity(), 8);
    /// ```
    pub fn try_push(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            self.grow_one()
                .inspect_err(|e| debug!("push onto vec of length {} failed: {e}", self.len))?;
        }
        unsafe {
            self.set(self.len, value);
        }
        self.len += 1;
        Ok(())
    }

    /// Pop a value from the end of the vec.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            unsafe { Some(self.get(self.len)) }
        }
    }

    /// Bounds-checked reference to the element at `index`.
    ///
    /// Indexing with `v[index]` goes through the slice and panics instead.
    pub fn at(&self, index: usize) -> Result<&T> {
        self.check_index(index)?;
        Ok(&self[index])
    }

    /// Bounds-checked mutable reference to the element at `index`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        self.check_index(index)?;
        Ok(&mut self[index])
    }

    /// First element, `None` when empty.
    pub fn front(&self) -> Option<&T> {
        self.first()
    }

    /// Mutable first element, `None` when empty.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.first_mut()
    }

    /// Last element, `None` when empty.
    pub fn back(&self) -> Option<&T> {
        self.last()
    }

    /// Mutable last element, `None` when empty.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.last_mut()
    }

    /// Insert value at index, after moving elements up to make a space.
    ///
    /// Returns the index of the inserted element. If the buffer has to grow
    /// it does so before anything is moved, so on failure the vec is unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let mut v = Vec::from(&[1, 2, 3, 4][..]);
    /// assert_eq!(v.insert(2, 99).unwrap(), 2);
    /// assert_eq!(&v[..], &[1, 2, 99, 3, 4]);
    /// ```
    pub fn insert(&mut self, index: usize, value: T) -> Result<usize> {
        if index > self.len {
            return Err(self.out_of_range(index));
        }
        if self.len == self.cap {
            self.grow_one()?;
        }
        unsafe {
            if index < self.len {
                ptr::copy(self.ixp(index), self.ixp(index + 1), self.len - index);
            }
            self.set(index, value);
        }
        self.len += 1;
        Ok(index)
    }

    /// Insert `count` clones of `value` before `index`, returns `index`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: T) -> Result<usize>
    where
        T: Clone,
    {
        self.insert_with(index, count, |_| value.clone())
    }

    /// Insert clones of the elements of `s` before `index`, returns `index`.
    pub fn insert_slice(&mut self, index: usize, s: &[T]) -> Result<usize>
    where
        T: Clone,
    {
        self.insert_with(index, s.len(), |i| s[i].clone())
    }

    /// Remove the value at index, elements are moved down to fill the space.
    /// # Panics
    ///
    /// Panics if `index` >= len().
    ///
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "removal index {index} out of range");
        unsafe {
            let result = self.get(index);
            ptr::copy(self.ixp(index + 1), self.ixp(index), self.len - index - 1);
            self.len -= 1;
            result
        }
    }

    /// Drop the element at `index`, closing the gap.
    ///
    /// Returns the index of the element that followed the removed one, which
    /// equals `len()` if the last element was removed. Capacity is unchanged.
    pub fn erase(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        drop(self.remove(index));
        Ok(index)
    }

    /// Drop the elements in `range`, closing the gap.
    ///
    /// Returns the index of the element that followed the range. Capacity is
    /// unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let mut v: Vec<i32> = (0..6).collect();
    /// assert_eq!(v.erase_range(1..4).unwrap(), 1);
    /// assert_eq!(&v[..], &[0, 4, 5]);
    /// ```
    pub fn erase_range<R>(&mut self, range: R) -> Result<usize>
    where
        R: RangeBounds<usize>,
    {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len,
        };
        if end > self.len {
            return Err(self.out_of_range(end));
        }
        if start > end {
            return Err(self.out_of_range(start));
        }
        let tail = self.len - end;
        unsafe {
            // Shorten first so a panicking drop leaks the tail rather than
            // dropping anything twice.
            self.len = start;
            ptr::drop_in_place(slice::from_raw_parts_mut(self.ixp(start), end - start));
            ptr::copy(self.ixp(end), self.ixp(start), tail);
        }
        self.len = start + tail;
        Ok(start)
    }

    /// Clears the vector, removing all values.
    ///
    /// This method has no effect on the allocated capacity of the vector.
    ///
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Shortens the vector, keeping the first `len` elements and dropping
    /// the rest.
    ///
    /// If `len` is greater or equal to the vector's current length, this has
    /// no effect.
    ///
    /// This method has no effect on the allocated capacity
    /// of the vector.
    ///
    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.pop();
        }
    }

    /// Resizes the `Vec` in-place so that `len` is equal to `new_len`.
    ///
    /// If `new_len` is greater than `len`, capacity is reserved for exactly
    /// `new_len` elements and the `Vec` is extended by the difference, with
    /// each additional slot filled with `value`.
    /// If `new_len` is less than `len`, the `Vec` is simply truncated.
    ///
    pub fn resize(&mut self, new_len: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone())
    }

    /// Resizes the `Vec` in-place so that `len` is equal to `new_len`.
    ///
    /// If `new_len` is greater than `len`, the `Vec` is extended by the
    /// difference, with each additional slot filled with the result of
    /// calling the closure `f`.
    ///
    /// If `new_len` is less than `len`, the `Vec` is simply truncated.
    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F) -> Result<()>
    where
        F: FnMut() -> T,
    {
        if new_len > self.len {
            self.reserve(new_len)?;
            while self.len < new_len {
                unsafe {
                    self.set(self.len, f());
                }
                self.len += 1;
            }
        } else {
            self.truncate(new_len);
        }
        Ok(())
    }

    /// Replace the contents with `count` clones of `value`.
    pub fn assign(&mut self, count: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        self.reserve(count)?;
        self.clear();
        self.resize(count, value)
    }

    /// Replace the contents with the items of `iter`.
    pub fn assign_iter<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        self.clear();
        for x in iter {
            self.try_push(x)?;
        }
        Ok(())
    }

    /// Exchange contents with `other` in O(1).
    ///
    /// Only the buffer pointers, lengths and capacities move; no element is
    /// touched.
    pub fn swap_with(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    // ##########################################################################
    // Private methods ##########################################################
    // ##########################################################################

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.len {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> ContainerError {
        debug!("index {index} rejected for vec of length {}", self.len);
        ContainerError::IndexOutOfRange {
            index,
            len: self.len,
        }
    }

    /// Opens a gap of `count` slots at `index` and fills it with `f(0..count)`.
    fn insert_with<F>(&mut self, index: usize, count: usize, mut f: F) -> Result<usize>
    where
        F: FnMut(usize) -> T,
    {
        if index > self.len {
            return Err(self.out_of_range(index));
        }
        let required = self
            .len
            .checked_add(count)
            .filter(|&n| n <= Self::MAX_SIZE)
            .ok_or(ContainerError::LengthExceeded {
                requested: self.len.saturating_add(count),
                max: Self::MAX_SIZE,
            })?;
        if required > self.cap {
            let doubled = self.cap.saturating_mul(2).min(Self::MAX_SIZE);
            self.grow_to(required.max(doubled))?;
        }
        let old_len = self.len;
        unsafe {
            ptr::copy(self.ixp(index), self.ixp(index + count), old_len - index);
            // The tail now sits past the gap; until the gap is filled only the
            // head is counted as live.
            self.len = index;
            for i in 0..count {
                self.set(index + i, f(i));
            }
        }
        self.len = old_len + count;
        Ok(index)
    }

    /// Get pointer to ith element.
    /// # Safety
    ///
    /// i must be <= capacity.
    #[inline]
    unsafe fn ixp(&self, i: usize) -> *mut T {
        unsafe { self.p.as_ptr().add(i) }
    }

    /// Get ith value.
    /// # Safety
    ///
    /// i must be < capacity, and the element must have been set (Written).
    #[inline]
    unsafe fn get(&mut self, i: usize) -> T {
        unsafe { ptr::read(self.ixp(i)) }
    }

    /// Set ith value.
    /// # Safety
    ///
    /// i must be < capacity, and the element must be unset.
    #[inline]
    unsafe fn set(&mut self, i: usize, elem: T) {
        unsafe {
            ptr::write(self.ixp(i), elem);
        }
    }

    /// Next capacity in the doubling sequence 0, 1, 2, 4, ...
    fn grow_one(&mut self) -> Result<()> {
        if self.len == Self::MAX_SIZE {
            return Err(ContainerError::LengthExceeded {
                requested: self.len.saturating_add(1),
                max: Self::MAX_SIZE,
            });
        }
        let nc = if self.cap == 0 {
            1
        } else {
            self.cap.saturating_mul(2).min(Self::MAX_SIZE)
        };
        self.grow_to(nc)
    }

    /// Move the elements to a buffer of exactly `na` slots, `na` > capacity.
    fn grow_to(&mut self, na: usize) -> Result<()> {
        debug_assert!(na > self.cap);
        if na > Self::MAX_SIZE {
            return Err(ContainerError::LengthExceeded {
                requested: na,
                max: Self::MAX_SIZE,
            });
        }
        if mem::size_of::<T>() != 0 {
            let new_layout = Layout::array::<T>(na).map_err(|_| ContainerError::LengthExceeded {
                requested: na,
                max: Self::MAX_SIZE,
            })?;
            let block = if self.cap == 0 {
                self.alloc.allocate(new_layout)
            } else {
                // The old layout was valid when it was allocated.
                let old_layout = unsafe {
                    Layout::from_size_align_unchecked(
                        mem::size_of::<T>() * self.cap,
                        mem::align_of::<T>(),
                    )
                };
                unsafe { self.alloc.grow(self.p.cast(), old_layout, new_layout) }
            }
            .map_err(|_| ContainerError::AllocFailed { layout: new_layout })?;
            self.p = block.cast::<T>();
            trace!("vec buffer {} -> {} elements", self.cap, na);
        }
        self.cap = na;
        Ok(())
    }

    /// Free the buffer. Elements must already have been dropped.
    fn release(&mut self) {
        if self.cap != 0 && mem::size_of::<T>() != 0 {
            unsafe {
                let layout = Layout::from_size_align_unchecked(
                    mem::size_of::<T>() * self.cap,
                    mem::align_of::<T>(),
                );
                self.alloc.deallocate(self.p.cast(), layout);
            }
        }
        self.p = NonNull::dangling();
        self.cap = 0;
    }
}

/// # Allocation methods.
/// These are used to adjust the vector capacity and allocator.
impl<T, A: Allocator> Vec<T, A> {
    /// Create a new Vec in specified allocator.
    #[must_use]
    pub const fn new_in(alloc: A) -> Vec<T, A> {
        Self {
            len: 0,
            cap: 0,
            alloc,
            p: NonNull::dangling(),
            _pd: PhantomData,
        }
    }

    /// Constructs a new, empty `Vec<T, A>` with exactly the specified capacity
    /// with the provided allocator.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`Vec::max_size`], aborts if allocation fails.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut v = Self::new_in(alloc);
        if let Err(e) = v.reserve(capacity) {
            failed(e);
        }
        v
    }

    /// Returns a reference to the underlying allocator.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the current capacity.
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Ensure capacity for `new_cap` elements in total.
    ///
    /// Unlike [`std::vec::Vec::reserve`] the argument is the total capacity,
    /// not the additional one. Does nothing if `new_cap <= capacity()`,
    /// otherwise reallocates to exactly `new_cap` slots.
    ///
    /// # Example
    ///
    /// ```
    /// use pcontainers::vec::Vec;
    /// let mut v = Vec::<u8>::new();
    /// v.reserve(10).unwrap();
    /// assert_eq!(v.capacity(), 10);
    /// v.reserve(3).unwrap();
    /// assert_eq!(v.capacity(), 10);
    /// assert!(v.reserve(usize::MAX).unwrap_err().to_string().contains("exceeds"));
    /// ```
    pub fn reserve(&mut self, new_cap: usize) -> Result<()> {
        if new_cap > Self::MAX_SIZE {
            let err = ContainerError::LengthExceeded {
                requested: new_cap,
                max: Self::MAX_SIZE,
            };
            debug!("reserve rejected: {err}");
            return Err(err);
        }
        if new_cap > self.cap {
            self.grow_to(new_cap)?;
        }
        Ok(())
    }
}

unsafe impl<T: Send, A: Allocator + Send> Send for Vec<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Vec<T, A> {}

impl<T, A: Allocator> Deref for Vec<T, A> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.p.as_ptr(), self.len) }
    }
}

impl<T, A: Allocator> DerefMut for Vec<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.p.as_ptr(), self.len) }
    }
}

impl<'a, T: 'a, A: Allocator> IntoIterator for &'a Vec<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: 'a, A: Allocator> IntoIterator for &'a mut Vec<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for Vec<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter { start: 0, v: self }
    }
}

impl<T, A: Allocator> Drop for Vec<T, A> {
    fn drop(&mut self) {
        self.clear();
        self.release();
    }
}

impl<T> Default for Vec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Vec<T, A> {
    /// Deep copy with the same capacity as `self`.
    fn clone(&self) -> Self {
        let mut v = Self::new_in(self.alloc.clone());
        if let Err(e) = v.reserve(self.cap) {
            failed(e);
        }
        for x in self.iter() {
            unsafe {
                v.set(v.len, x.clone());
            }
            v.len += 1;
        }
        v
    }

    /// Reuses the existing buffer unless `source` has the larger capacity.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        if source.cap > self.cap {
            self.release();
            if let Err(e) = self.reserve(source.cap) {
                failed(e);
            }
        }
        for x in source.iter() {
            unsafe {
                self.set(self.len, x.clone());
            }
            self.len += 1;
        }
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for Vec<T, A> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq, A: Allocator> Eq for Vec<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Vec<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (**self).partial_cmp(&**other)
    }
}

impl<T: Ord, A: Allocator> Ord for Vec<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        (**self).cmp(&**other)
    }
}

impl<T: Hash, A: Allocator> Hash for Vec<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}

impl<T, A: Allocator> fmt::Debug for Vec<T, A>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T> FromIterator<T> for Vec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Vec<T> {
        let mut v = Vec::new();
        v.extend(iter);
        v
    }
}

impl<T, A: Allocator> Extend<T> for Vec<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.push(x);
        }
    }
}

impl<T: Clone> From<&[T]> for Vec<T> {
    /// Allocates a `Vec<T>` and fills it by cloning `s`'s items.
    fn from(s: &[T]) -> Vec<T> {
        let mut v = Vec::with_capacity(s.len());
        for e in s {
            v.push(e.clone());
        }
        v
    }
}

impl<T, const N: usize> From<[T; N]> for Vec<T> {
    fn from(arr: [T; N]) -> Vec<T> {
        let mut v = Vec::with_capacity(N);
        for e in arr {
            v.push(e);
        }
        v
    }
}

/// Consuming iterator for [`Vec`].
pub struct IntoIter<T, A: Allocator = Global> {
    start: usize,
    v: Vec<T, A>,
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter")
            .field(&&self.v[self.start..])
            .finish()
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        if self.start == self.v.len() {
            None
        } else {
            let ix = self.start;
            self.start += 1;
            Some(unsafe { self.v.get(ix) })
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.v.len() - self.start;
        (n, Some(n))
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {
    fn len(&self) -> usize {
        self.v.len() - self.start
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.v.len() {
            None
        } else {
            self.v.len -= 1;
            Some(unsafe { self.v.get(self.v.len()) })
        }
    }
}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        let (start, end) = (self.start, self.v.len);
        // Elements before `start` were moved out already.
        self.v.len = 0;
        unsafe {
            ptr::drop_in_place(slice::from_raw_parts_mut(self.v.ixp(start), end - start));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::testing::Limited;
    use rand::Rng;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts live instances through a shared counter.
    struct Tracked(Rc<Cell<isize>>, u32);

    impl Tracked {
        fn new(live: &Rc<Cell<isize>>, x: u32) -> Self {
            live.set(live.get() + 1);
            Self(live.clone(), x)
        }
    }

    impl Clone for Tracked {
        fn clone(&self) -> Self {
            Self::new(&self.0, self.1)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    #[test]
    fn basic() {
        let mut v = Vec::new();
        v.push(99);
        v.push(314);
        assert!(v[0] == 99);
        assert!(v[1] == 314);
        assert!(v.len() == 2);
        v[1] = 316;
        assert!(v[1] == 316);
        for x in &mut v {
            *x += 1;
        }
        let all: std::vec::Vec<i32> = v.into_iter().collect();
        assert_eq!(all, [100, 317]);
    }

    #[test]
    fn capacity_doubles_from_one() {
        let mut v = Vec::new();
        assert_eq!(v.capacity(), 0);
        let mut seen = std::vec::Vec::new();
        for i in 0..5 {
            v.push(i);
            seen.push(v.capacity());
        }
        assert_eq!(seen, [1, 2, 4, 4, 8]);
        assert_eq!(v.capacity(), 8);
    }

    #[test]
    fn insert_in_middle() {
        let mut v = Vec::from([1, 2, 3, 4]);
        let at = v.insert(2, 99).unwrap();
        assert_eq!(at, 2);
        assert_eq!(v[at], 99);
        assert_eq!(&v[..], &[1, 2, 99, 3, 4]);
        assert_eq!(v.len(), 5);
        assert_eq!(v.insert(5, 7).unwrap(), 5);
        assert_eq!(v.insert(0, 0).unwrap(), 0);
        assert_eq!(&v[..], &[0, 1, 2, 99, 3, 4, 7]);
        assert!(v.insert(9, 1).unwrap_err().is_out_of_range());
    }

    #[test]
    fn at_past_end_is_out_of_range() {
        let mut v = Vec::from([5, 6, 7]);
        assert_eq!(
            v.at(3),
            Err(ContainerError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(v.at(2), Ok(&7));
        *v.at_mut(0).unwrap() = 1;
        assert_eq!(v.front(), Some(&1));
        assert!(v.at_mut(10).is_err());
        let empty = Vec::<u8>::new();
        assert!(empty.at(0).unwrap_err().is_out_of_range());
    }

    #[test]
    #[should_panic]
    fn index_past_end_panics() {
        let v = Vec::from([1]);
        let _ = v[1];
    }

    #[test]
    fn reserve_is_exact_and_never_shrinks() {
        let mut v = Vec::from([1u64, 2, 3]);
        v.reserve(100).unwrap();
        assert_eq!(v.capacity(), 100);
        assert_eq!(&v[..], &[1, 2, 3]);
        v.reserve(2).unwrap();
        assert_eq!(v.capacity(), 100);
        let max = v.max_size();
        assert_eq!(
            v.reserve(max + 1),
            Err(ContainerError::LengthExceeded {
                requested: max + 1,
                max
            })
        );
        assert_eq!(v.capacity(), 100);
    }

    #[test]
    fn allocation_failure_leaves_vec_unchanged() {
        // Room for four u32 but not eight.
        let a = Limited::new(16);
        let mut v = Vec::new_in(&a);
        for i in 0..4u32 {
            v.try_push(i).unwrap();
        }
        assert_eq!(v.capacity(), 4);
        let err = v.try_push(4).unwrap_err();
        assert!(matches!(err, ContainerError::AllocFailed { .. }));
        assert_eq!(&v[..], &[0, 1, 2, 3]);
        assert_eq!(v.capacity(), 4);
        assert!(v.insert(1, 9).is_err());
        assert_eq!(&v[..], &[0, 1, 2, 3]);
        assert!(v.reserve(8).is_err());
        assert_eq!(v.capacity(), 4);
        drop(v);
        assert_eq!(a.live.get(), 0);
    }

    #[test]
    fn erase_shifts_left_and_keeps_capacity() {
        let mut v: Vec<i32> = (0..8).collect();
        let cap = v.capacity();
        assert_eq!(v.erase(0).unwrap(), 0);
        assert_eq!(v.erase(6).unwrap(), 6);
        assert_eq!(v.len(), 6);
        assert_eq!(&v[..], &[1, 2, 3, 4, 5, 6]);
        assert!(v.erase(6).unwrap_err().is_out_of_range());
        assert_eq!(v.erase_range(2..4).unwrap(), 2);
        assert_eq!(&v[..], &[1, 2, 5, 6]);
        assert_eq!(v.erase_range(3..).unwrap(), 3);
        assert_eq!(&v[..], &[1, 2, 5]);
        assert_eq!(v.erase_range(1..1).unwrap(), 1);
        assert!(v.erase_range(2..5).is_err());
        assert_eq!(v.erase_range(..).unwrap(), 0);
        assert!(v.is_empty());
        assert_eq!(v.capacity(), cap);
    }

    #[test]
    fn erase_range_drops_exactly_the_range() {
        let live = Rc::new(Cell::new(0));
        let mut v = Vec::new();
        for i in 0..10 {
            v.push(Tracked::new(&live, i));
        }
        v.erase_range(3..=6).unwrap();
        assert_eq!(live.get(), 6);
        let xs: std::vec::Vec<u32> = v.iter().map(|t| t.1).collect();
        assert_eq!(xs, [0, 1, 2, 7, 8, 9]);
        drop(v);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn insert_n_and_slice() {
        let mut v = Vec::from([1, 5]);
        v.insert_n(1, 3, 0).unwrap();
        assert_eq!(&v[..], &[1, 0, 0, 0, 5]);
        v.insert_slice(5, &[6, 7]).unwrap();
        v.insert_slice(0, &[]).unwrap();
        assert_eq!(&v[..], &[1, 0, 0, 0, 5, 6, 7]);
        assert!(v.insert_n(8, 1, 1).is_err());
        assert!(matches!(
            v.insert_n(0, usize::MAX, 1),
            Err(ContainerError::LengthExceeded { .. })
        ));
        assert_eq!(v.len(), 7);
    }

    #[test]
    fn resize_both_ways() {
        let mut v = Vec::from([1, 2, 3]);
        v.resize(6, 9).unwrap();
        assert_eq!(&v[..], &[1, 2, 3, 9, 9, 9]);
        assert_eq!(v.capacity(), 6);
        v.resize(2, 0).unwrap();
        assert_eq!(&v[..], &[1, 2]);
        assert_eq!(v.capacity(), 6);
        let mut n = 0;
        v.resize_with(4, || {
            n += 1;
            n * 10
        })
        .unwrap();
        assert_eq!(&v[..], &[1, 2, 10, 20]);
        assert!(v.resize(usize::MAX, 0).is_err());
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn assign_replaces_contents() {
        let mut v = Vec::from([1, 2, 3]);
        v.assign(2, 7).unwrap();
        assert_eq!(&v[..], &[7, 7]);
        v.assign_iter(10..14).unwrap();
        assert_eq!(&v[..], &[10, 11, 12, 13]);
        let w = Vec::from_elem(3, "a").unwrap();
        assert_eq!(w.len(), 3);
        assert!(Vec::from_elem(usize::MAX, 0u32).is_err());
    }

    #[test]
    fn swap_exchanges_buffers() {
        let mut a = Vec::from([1, 2, 3]);
        let mut b = Vec::with_capacity(10);
        b.push(4);
        let (pa, pb) = (a.as_ptr(), b.as_ptr());
        a.swap_with(&mut b);
        assert_eq!(a.as_ptr(), pb);
        assert_eq!(b.as_ptr(), pa);
        assert_eq!(&a[..], &[4]);
        assert_eq!(a.capacity(), 10);
        assert_eq!(&b[..], &[1, 2, 3]);
        a.swap(0, 0);
        b.swap(0, 2);
        assert_eq!(&b[..], &[3, 2, 1]);
    }

    #[test]
    fn clear_keeps_buffer() {
        let mut v = Vec::from([1, 2, 3]);
        let cap = v.capacity();
        v.clear();
        assert!(v.is_empty());
        assert_eq!(v.capacity(), cap);
        v.push(4);
        assert_eq!(v.back(), Some(&4));
    }

    #[test]
    fn clone_is_deep_and_keeps_capacity() {
        let mut v = Vec::with_capacity(16);
        v.extend([String::from("a"), String::from("b")]);
        let mut c = v.clone();
        assert_eq!(c.capacity(), 16);
        assert_eq!(c, v);
        c[0].push('x');
        assert_eq!(v[0], "a");

        let mut small = Vec::from([String::from("z")]);
        small.clone_from(&v);
        assert_eq!(small, v);
        assert_eq!(small.capacity(), 16);
        let mut big = Vec::with_capacity(32);
        big.push(String::new());
        big.clone_from(&v);
        assert_eq!(big.capacity(), 32);
        assert_eq!(big, v);
    }

    #[test]
    fn comparisons_are_lexicographic() {
        let a = Vec::from([1, 2, 3]);
        let b = Vec::from([1, 2, 4]);
        let c = Vec::from([1, 2]);
        assert!(a < b);
        assert!(c < a);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
        assert_eq!(format!("{a:?}"), "[1, 2, 3]");
    }

    #[test]
    fn into_iter_drops_rest() {
        let live = Rc::new(Cell::new(0));
        let mut v = Vec::new();
        for i in 0..6 {
            v.push(Tracked::new(&live, i));
        }
        let mut it = v.into_iter();
        assert_eq!(it.next().map(|t| t.1), Some(0));
        assert_eq!(it.next_back().map(|t| t.1), Some(5));
        assert_eq!(it.len(), 4);
        drop(it);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn no_double_drop_on_shifts() {
        let live = Rc::new(Cell::new(0));
        {
            let mut v = Vec::new();
            for i in 0..20 {
                v.insert(0, Tracked::new(&live, i)).unwrap();
            }
            let one = Tracked::new(&live, 100);
            v.insert_n(3, 4, one).unwrap();
            v.erase(2).unwrap();
            let _ = v.remove(0);
            v.truncate(10);
            assert_eq!(live.get(), 10);
            let w = v.clone();
            assert_eq!(live.get(), 20);
            drop(w);
        }
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn zero_sized_elements() {
        let mut v = Vec::new();
        for _ in 0..100 {
            v.push(());
        }
        assert_eq!(v.len(), 100);
        assert_eq!(v.max_size(), usize::MAX);
        v.erase_range(10..).unwrap();
        assert_eq!(v.len(), 10);
        assert_eq!(v.into_iter().count(), 10);
    }

    #[test]
    fn random_ops_match_std() {
        let mut rng = rand::thread_rng();
        let mut ours = Vec::new();
        let mut theirs = std::vec::Vec::new();
        for _ in 0..5000 {
            let x: u16 = rng.gen();
            match rng.gen_range(0..6) {
                0 | 1 => {
                    ours.push(x);
                    theirs.push(x);
                }
                2 => {
                    let i = rng.gen_range(0..=theirs.len());
                    ours.insert(i, x).unwrap();
                    theirs.insert(i, x);
                }
                3 if !theirs.is_empty() => {
                    let i = rng.gen_range(0..theirs.len());
                    ours.erase(i).unwrap();
                    theirs.remove(i);
                }
                4 => assert_eq!(ours.pop(), theirs.pop()),
                _ => {
                    let n = rng.gen_range(0..=theirs.len() + 3);
                    ours.resize(n, x).unwrap();
                    theirs.resize(n, x);
                }
            }
            assert_eq!(&ours[..], &theirs[..]);
            assert!(ours.len() <= ours.capacity());
        }
    }
}
