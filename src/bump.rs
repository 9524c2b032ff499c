//! The bump allocator hands out page-aligned, zeroed memory from the arena
//! reserved by the memory layout. It only ever moves its cursor forward:
//! memory is never reclaimed, which is acceptable because the arena is
//! fixed and small.
//!
//! There is exactly one allocator for the arena. It is created by the boot
//! path and handed to the kernel main routine, which passes it explicitly
//! to the code that needs memory.
use crate::{
    layout::Region,
    utils::align::{is_aligned, try_align_up},
};
use config::PAGE_SIZE;
use core::{fmt, ptr::NonNull};

/// An allocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The arena does not have enough room left for the request.
    OutOfMemory { requested: usize, remaining: usize },

    /// Zero bytes were requested.
    ZeroSized,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory {
                requested,
                remaining,
            } => write!(
                f,
                "out of memory: {requested} bytes requested, {remaining} bytes remaining"
            ),
            AllocError::ZeroSized => write!(f, "zero-sized allocation"),
        }
    }
}

#[derive(Debug)]
pub struct BumpAllocator {
    arena: Region,
    cursor: usize,
}

impl BumpAllocator {
    /// Create an allocator over the given arena. The cursor starts at the
    /// beginning of the arena.
    ///
    /// # Safety
    /// The caller must guarantee that the arena is valid memory for reads
    /// and writes, that nothing else uses it for as long as the allocator
    /// and the memory it hands out are alive, and that no other allocator
    /// is ever created over the same arena.
    #[must_use]
    pub unsafe fn new(arena: Region) -> Self {
        Self {
            arena,
            cursor: arena.base,
        }
    }

    /// Allocate `size` bytes. The size is rounded up to a whole number of
    /// pages, the returned memory is page-aligned and filled with zeros over
    /// its full (rounded) extent, which is the length of the returned slice.
    ///
    /// # Errors
    /// Returns [`AllocError::ZeroSized`] if `size` is zero, and
    /// [`AllocError::OutOfMemory`] if the arena does not have enough room
    /// left. A failed allocation does not move the cursor.
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<[u8]>, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSized);
        }

        let out_of_memory = AllocError::OutOfMemory {
            requested: size,
            remaining: self.remaining(),
        };

        let length = try_align_up(size, PAGE_SIZE).ok_or(out_of_memory)?;
        let start = try_align_up(self.cursor, PAGE_SIZE).ok_or(out_of_memory)?;
        let end = start.checked_add(length).ok_or(out_of_memory)?;
        if end > self.arena.end {
            log::debug!(
                "Allocation of {} bytes failed, cursor at {:#x}",
                size,
                self.cursor
            );
            return Err(out_of_memory);
        }

        debug_assert!(is_aligned(start, PAGE_SIZE));
        self.cursor = end;

        // SAFETY: The span [start, end) is inside the arena, which the caller
        // of `new` guaranteed to be valid and exclusively ours. The cursor
        // has moved past it, so it will never be handed out again.
        unsafe {
            core::ptr::write_bytes(start as *mut u8, 0, length);
        }

        let data = NonNull::new(start as *mut u8).ok_or(out_of_memory)?;
        Ok(NonNull::slice_from_raw_parts(data, length))
    }

    /// Allocate `count` contiguous pages. See [`allocate`](Self::allocate).
    ///
    /// # Errors
    /// Same as [`allocate`](Self::allocate).
    pub fn allocate_pages(&mut self, count: usize) -> Result<NonNull<[u8]>, AllocError> {
        let size = count.checked_mul(PAGE_SIZE).ok_or(AllocError::OutOfMemory {
            requested: usize::MAX,
            remaining: self.remaining(),
        })?;
        self.allocate(size)
    }

    /// The address of the next free byte of the arena.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The arena the allocator hands memory out from.
    #[must_use]
    pub const fn arena(&self) -> Region {
        self.arena
    }

    /// The number of bytes handed out so far, including alignment padding.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.cursor - self.arena.base
    }

    /// The number of bytes left in the arena. Not all of them may be usable
    /// if the cursor is not page-aligned.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.arena.end - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Role;

    #[repr(C, align(4096))]
    struct Arena([u8; 4 * PAGE_SIZE]);

    #[test]
    fn zero_sized_allocation_is_rejected() {
        let mut arena = Box::new(Arena([0xAA; 4 * PAGE_SIZE]));
        let base = arena.0.as_mut_ptr() as usize;
        let region = Region::new(Role::AllocatorArena, base, base + arena.0.len());
        // SAFETY: The arena is owned by the test and outlives the allocator.
        let mut allocator = unsafe { BumpAllocator::new(region) };

        assert_eq!(allocator.allocate(0), Err(AllocError::ZeroSized));
        assert_eq!(allocator.cursor(), base);
    }

    #[test]
    fn allocate_pages_rounds_to_whole_pages() {
        let mut arena = Box::new(Arena([0xAA; 4 * PAGE_SIZE]));
        let base = arena.0.as_mut_ptr() as usize;
        let region = Region::new(Role::AllocatorArena, base, base + arena.0.len());
        // SAFETY: The arena is owned by the test and outlives the allocator.
        let mut allocator = unsafe { BumpAllocator::new(region) };

        let pages = allocator.allocate_pages(3).unwrap();
        assert_eq!(pages.len(), 3 * PAGE_SIZE);
        assert_eq!(allocator.remaining(), PAGE_SIZE);
        assert!(matches!(
            allocator.allocate_pages(usize::MAX),
            Err(AllocError::OutOfMemory { .. })
        ));
    }
}
