//! The architecture-independent half of the boot path.
//!
//! The assembly stub sets the stack pointer to `__stack_top` and hands it
//! over, together with the hart id and the device tree address, to the
//! architecture entry point. The entry point then:
//!  1. builds the layout from the linker symbols and checks it, together
//!     with the stack pointer, using [`prepare`]. On failure the hart halts
//!     immediately, without printing anything: nothing can be trusted yet.
//!  2. clears the BSS using [`clear`].
//!  3. sets up the architecture, creates the allocator and calls `kmain`
//!     with a [`BootInfo`].
use crate::{
    bump::BumpAllocator,
    layout::{Layout, LayoutError, Region},
};
use core::fmt;

/// Everything the kernel main routine receives from the boot path.
#[derive(Debug)]
pub struct BootInfo {
    /// The hart the kernel runs on.
    pub hart: usize,

    /// The physical address of the device tree blob given by the firmware.
    pub device_tree: usize,

    /// The validated memory layout.
    pub layout: Layout,

    /// The allocator over the arena of the layout. This is the only
    /// instance: whoever needs memory must be given it.
    pub allocator: BumpAllocator,
}

impl BootInfo {
    /// The memory left for general use. The boot path does not touch it,
    /// so its content is whatever the firmware left there.
    #[must_use]
    pub const fn free_ram(&self) -> Region {
        self.layout.free_ram()
    }
}

/// An inconsistency detected before the kernel could start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// The linker symbols do not describe a valid layout.
    Layout(LayoutError),

    /// The stack pointer set by the boot stub is not the top of the stack.
    StackPointer { expected: usize, found: usize },
}

impl From<LayoutError> for BootError {
    fn from(error: LayoutError) -> Self {
        BootError::Layout(error)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Layout(error) => write!(f, "invalid memory layout: {error}"),
            BootError::StackPointer { expected, found } => write!(
                f,
                "stack pointer is {found:#x} instead of {expected:#x}"
            ),
        }
    }
}

/// Check the layout built from the linker symbols and the stack pointer
/// established by the boot stub.
///
/// # Errors
/// Returns the layout error, or [`BootError::StackPointer`] if the stack
/// pointer is not exactly the top of the stack region.
pub fn prepare(
    layout: Result<Layout, LayoutError>,
    stack_pointer: usize,
) -> Result<Layout, BootError> {
    let layout = layout?;
    if stack_pointer != layout.stack_top() {
        return Err(BootError::StackPointer {
            expected: layout.stack_top(),
            found: stack_pointer,
        });
    }
    Ok(layout)
}

/// Fill the whole region with zeros, including a partial last word.
///
/// # Safety
/// The region must be valid for writes and must not contain anything the
/// caller, or anything still in use, relies on.
pub unsafe fn clear(region: Region) {
    // SAFETY: Guaranteed by the caller.
    unsafe {
        core::ptr::write_bytes(region.as_mut_ptr(), 0, region.len());
    }
}
