//! Stack overflow detection without paging.
//!
//! The guard region sits right below the kernel stack. It is painted with a
//! canary word at boot: a stack that grows past its bottom overwrites the
//! canary, which is then noticed the next time the guard is checked (on
//! every trap and when the kernel panics). This cannot catch an overflow
//! before it does damage, only report it once it happened.
use crate::layout::Region;

/// The word painted over the whole guard region.
pub const CANARY: u32 = 0x5AFE_57AC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackGuard {
    region: Region,
}

impl StackGuard {
    /// Create a guard over the given region. The guard is not armed until
    /// [`arm`](Self::arm) is called.
    ///
    /// # Safety
    /// The region must be valid for reads and writes, 4-byte aligned, and
    /// must not be used for anything else.
    #[must_use]
    pub const unsafe fn new(region: Region) -> Self {
        Self { region }
    }

    /// Paint the whole guard region with the canary.
    pub fn arm(&self) {
        for word in self.words() {
            // SAFETY: The region is valid for writes and reserved for the
            // guard (see `new`), and `words` only yields aligned addresses
            // inside it.
            unsafe { core::ptr::write_volatile(word, CANARY) };
        }
    }

    /// Returns `true` if every word of the guard still holds the canary.
    #[must_use]
    pub fn intact(&self) -> bool {
        self.damage().is_none()
    }

    /// Return the highest address of the guard whose canary was
    /// overwritten, if any. The stack grows down into the guard, so this is
    /// where the overflow reached first.
    #[must_use]
    pub fn damage(&self) -> Option<usize> {
        self.words()
            .rev()
            // SAFETY: Same as in `arm`, the addresses are valid for reads.
            .find(|&word| unsafe { core::ptr::read_volatile(word) } != CANARY)
            .map(|word| word as usize)
    }

    /// The region protected by the guard.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    fn words(&self) -> impl DoubleEndedIterator<Item = *mut u32> {
        let base = self.region.base;
        (0..self.region.len() / core::mem::size_of::<u32>())
            .map(move |index| (base + index * core::mem::size_of::<u32>()) as *mut u32)
    }
}
