//! The architecture-specific code of the kernel, behind an
//! architecture-independent facade.
//!
//! The `generic` module defines what the rest of the kernel may use and
//! forwards to the `target` module, which is the module of the architecture
//! the kernel is built for. Besides `riscv32`, the only real target, there
//! is a `host` target: it lets the architecture-independent part of the
//! kernel build on the development machine so it can be tested there.
//!
//! `generic::trap` is the exception: it holds the RISC-V trap frame and
//! cause decoding itself, so that both targets share them.
//!
//! # Adding a new architecture
//! Copy the `host` module, rename it to the target architecture, implement
//! every function following the requirements documented in `generic`, and
//! select it below with a conditional compilation block.
#[cfg(target_arch = "riscv32")]
pub mod riscv32;
#[cfg(target_arch = "riscv32")]
pub use riscv32 as target;

#[cfg(not(target_arch = "riscv32"))]
pub mod host;
#[cfg(not(target_arch = "riscv32"))]
pub use host as target;

pub mod generic;
pub use generic::*;
