use std::alloc::Layout;
use std::error::Error;
use std::fmt;
use std::ptr;
use std::ptr::NonNull;

/// The `AllocError` error indicates that the allocator could not supply
/// a block for the requested layout.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AllocError;

impl Error for AllocError {}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

/// Source of raw storage for containers.
///
/// Containers only ever ask for whole arrays of their element type, so a
/// request is described by a [`Layout`] and released with the same layout.
/// Constructing and destroying elements inside the storage is the container's
/// business, not the allocator's.
///
/// # Safety
///
/// Blocks returned by `allocate` must be valid for reads and writes of
/// `layout.size()` bytes, suitably aligned, and must stay valid until passed
/// to `deallocate` (or `grow`) on the same allocator.
pub unsafe trait Allocator {
    /// Attempts to allocate a block of memory.
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

    /// Deallocates the memory referenced by `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a block currently allocated by this allocator with
    /// `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Moves the block to a larger one, copying the old contents.
    ///
    /// On failure the old block is left untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a block currently allocated by this allocator with
    /// `old_layout`, and `new_layout.size() >= old_layout.size()`.
    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() >= old_layout.size(),
            "`new_layout.size()` must be greater than or equal to `old_layout.size()`"
        );

        let new_ptr = self.allocate(new_layout)?;
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                new_ptr.as_ptr().cast::<u8>(),
                old_layout.size(),
            );
            self.deallocate(ptr, old_layout);
        }
        Ok(new_ptr)
    }
}

unsafe impl<A> Allocator for &A
where
    A: Allocator + ?Sized,
{
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the safety contract must be upheld by the caller
        unsafe { (**self).deallocate(ptr, layout) }
    }

    #[inline]
    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        // SAFETY: the safety contract must be upheld by the caller
        unsafe { (**self).grow(ptr, old_layout, new_layout) }
    }
}

/// Default implementation of Allocator, backed by the global allocator.
#[derive(Clone, Copy, Default, Debug)]
pub struct Global;

unsafe impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        match layout.size() {
            0 => Ok(NonNull::slice_from_raw_parts(NonNull::dangling(), 0)),
            size => unsafe {
                let raw_ptr = std::alloc::alloc(layout);
                let ptr = NonNull::new(raw_ptr).ok_or(AllocError)?;
                Ok(NonNull::slice_from_raw_parts(ptr, size))
            },
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        if old_layout.size() == 0 {
            return self.allocate(new_layout);
        }
        unsafe {
            let raw_ptr = std::alloc::realloc(ptr.as_ptr(), old_layout, new_layout.size());
            let ptr = NonNull::new(raw_ptr).ok_or(AllocError)?;
            Ok(NonNull::slice_from_raw_parts(ptr, new_layout.size()))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// Allocator that refuses any block larger than `limit` bytes and counts
    /// live allocations.
    #[derive(Default)]
    pub struct Limited {
        pub limit: usize,
        pub live: Cell<usize>,
    }

    impl Limited {
        pub fn new(limit: usize) -> Self {
            Self {
                limit,
                live: Cell::new(0),
            }
        }
    }

    unsafe impl Allocator for Limited {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            if layout.size() > self.limit {
                return Err(AllocError);
            }
            let block = Global.allocate(layout)?;
            if layout.size() != 0 {
                self.live.set(self.live.get() + 1);
            }
            Ok(block)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            if layout.size() != 0 {
                self.live.set(self.live.get() - 1);
            }
            unsafe { Global.deallocate(ptr, layout) }
        }
    }

    #[test]
    fn global_zero_sized_block() {
        let layout = Layout::array::<u64>(0).unwrap();
        let p = Global.allocate(layout).unwrap();
        assert_eq!(p.len(), 0);
        unsafe { Global.deallocate(p.cast(), layout) };
    }

    #[test]
    fn grow_keeps_contents() {
        let a = Limited::new(1024);
        let old = Layout::array::<u32>(2).unwrap();
        let new = Layout::array::<u32>(8).unwrap();
        unsafe {
            let p = a.allocate(old).unwrap().cast::<u32>();
            p.as_ptr().write(7);
            p.as_ptr().add(1).write(9);
            let q = a.grow(p.cast(), old, new).unwrap().cast::<u32>();
            assert_eq!(*q.as_ptr(), 7);
            assert_eq!(*q.as_ptr().add(1), 9);
            assert_eq!(a.live.get(), 1);
            a.deallocate(q.cast(), new);
        }
        assert_eq!(a.live.get(), 0);
    }

    #[test]
    fn limited_refuses_large_blocks() {
        let a = Limited::new(16);
        assert_eq!(a.allocate(Layout::array::<u8>(17).unwrap()), Err(AllocError));
        assert_eq!(a.live.get(), 0);
    }
}
