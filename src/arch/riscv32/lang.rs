use crate::{
    arch::generic::{cpu, irq, log},
    boot::{self, BootInfo},
    bump::BumpAllocator,
};
use macros::init;

core::arch::global_asm!(include_str!("asm/boot.asm"));

/// Oops ! The kernel panicked and must be stopped. The panic is written to
/// the console, followed by the state of the stack guard, then the hart
/// halts.
#[cold]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    irq::disable();
    log::report_panic(info.location(), &info.message());

    super::trap::report_stack_overflow();
    cpu::freeze();
}

/// The entry point of the kernel, jumped to by the boot stub with the hart
/// identifier, the device tree address and the stack pointer it set up.
///
/// The layout and the stack pointer are checked before anything else. If
/// they are inconsistent, the hart halts without printing anything: the
/// console is not set up yet and nothing can be trusted.
#[init]
#[unsafe(no_mangle)]
unsafe extern "C" fn entry(hart: usize, device_tree: usize, stack_pointer: usize) -> ! {
    let Ok(layout) = boot::prepare(super::memory::linked_layout(), stack_pointer) else {
        cpu::freeze();
    };

    // SAFETY: Nothing has used a static yet, and the stack we are running
    // on lives outside the BSS.
    unsafe { boot::clear(layout.bss()) };

    // SAFETY: We are on the boot path, the BSS is cleared and the layout
    // comes from the linker.
    unsafe { super::setup(hart, device_tree, &layout) };

    // SAFETY: The arena is reserved by the linker script for the allocator
    // and this is the only allocator ever created.
    let allocator = unsafe { BumpAllocator::new(layout.arena()) };

    // SAFETY: `kmain` is defined by the kernel binary with this signature.
    unsafe {
        crate::kmain(BootInfo {
            hart,
            device_tree,
            layout,
            allocator,
        })
    }
}
