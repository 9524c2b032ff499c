use crate::{arch::generic, layout::Layout};
use macros::init;

pub mod cpu;
pub mod irq;
pub mod log;
pub mod memory;
pub mod thread;
pub mod timer;
pub mod trap;

mod lang;

/// Setup the riscv32 architecture: install the trap vector, start the
/// logger, check the memory layout against the device tree and start the
/// timer. Interrupts stay disabled.
///
/// # Safety
/// This function must be called exactly once, during boot, after the BSS
/// has been cleared. `layout` must be the layout the kernel is linked with.
///
/// # Panics
/// Panics if the firmware reports less RAM than the layout needs.
#[init]
pub unsafe fn setup(hart: usize, device_tree: usize, layout: &Layout) {
    // SAFETY: Guaranteed by the caller.
    unsafe { trap::setup(layout) };

    #[cfg(feature = "logging")]
    generic::log::setup();

    ::log::info!("Booting pebble on hart {}", hart);
    ::log::info!("Trap vector installed at {:#010x}", trap::vector());
    layout.log();

    // SAFETY: The firmware passes the address of the device tree in `a1`,
    // and nothing has overwritten it since.
    match unsafe { fdt::Fdt::from_ptr(device_tree as *const u8) } {
        Ok(fdt) => {
            if let Err((start, end)) = memory::check_ram(&fdt, layout) {
                panic!(
                    "The memory layout ({:#010x} - {:#010x}) does not fit in the RAM reported by the firmware ({:#010x} - {:#010x})",
                    layout.kernel_base(),
                    layout.end(),
                    start,
                    end
                );
            }
            timer::setup(timer::frequency(&fdt));
        }
        Err(error) => {
            ::log::warn!("Cannot parse the device tree at {:#x}: {:?}", device_tree, error);
            timer::setup(None);
        }
    }
}
