/// Enable interrupts.
///
/// # Safety
/// This function is unsafe because it can break invariants of other code.
/// Enabling interrupts before the trap vector is installed, or while code
/// relies on not being interrupted, leads to undefined behavior.
pub unsafe fn enable() {
    // SAFETY: Guaranteed by the caller.
    unsafe { riscv::register::sstatus::set_sie() };
}

/// Disable interrupts. No interrupt will be triggered until interrupts
/// are enabled again. However, exceptions will still be triggered.
pub fn disable() {
    // SAFETY: Disabling interrupts should be safe and should not cause any
    // side effect that could lead to undefined behavior.
    unsafe { riscv::register::sstatus::clear_sie() };
}
