//! pebble is a small teaching kernel for 32-bit RISC-V machines booted by
//! SBI firmware. Everything runs in a single address space on a single
//! hart: there is no paging and no user mode.
//!
//! The library contains the whole kernel except its main routine, which
//! lives in the binary as `kmain`. The boot path calls it with a
//! [`BootInfo`] once the stack is set up, the BSS is cleared and the memory
//! layout has been validated.
//!
//! Only the `arch::riscv32` module is tied to the target. The rest of the
//! crate also builds on the development machine (against the `arch::host`
//! stand-in) so it can be tested with the regular test harness.
#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod boot;
pub mod bump;
pub mod guard;
pub mod layout;
pub mod process;
pub mod utils;

pub use boot::BootInfo;

#[cfg(target_arch = "riscv32")]
unsafe extern "Rust" {
    /// The architecture-independent main routine of the kernel, defined by
    /// the kernel binary. The boot path calls it once the boot invariants
    /// are established and never expects it to return.
    fn kmain(boot: boot::BootInfo) -> !;
}
