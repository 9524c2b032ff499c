/// Enable IRQs.
///
/// # Safety
/// The caller must ensure that the trap vector is installed and that the
/// kernel can handle IRQs correctly before enabling them.
pub unsafe fn enable() {
    // SAFETY: Guaranteed by the caller.
    unsafe { crate::arch::target::irq::enable() };
}

/// Disable IRQs. Exceptions are still raised.
pub fn disable() {
    crate::arch::target::irq::disable();
}
