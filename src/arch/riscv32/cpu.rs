/// Relaxes the CPU by waiting for an interrupt. The `wfi` instruction may be
/// implemented as a no-op, so the caller must not rely on it to actually
/// wait.
#[inline]
pub fn relax() {
    // SAFETY: `wfi` has no effect on the state of the hart.
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }
}

/// Disable interrupts and wait forever.
#[cold]
pub fn freeze() -> ! {
    super::irq::disable();
    loop {
        relax();
    }
}

/// Shutdown the computer
#[inline]
pub fn shutdown() -> ! {
    ::log::info!("Shutting down");
    sbi::legacy::shutdown()
}
