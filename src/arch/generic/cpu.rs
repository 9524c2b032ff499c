/// Relaxes the CPU and wait for the next event to happen. On most
/// architectures, this waits for the next interrupt. The caller must not
/// rely on it to actually wait: it may return immediately.
pub fn relax() {
    crate::arch::target::cpu::relax();
}

/// Halt the current hart forever. Interrupts are disabled first so nothing
/// can run on this hart anymore. This is how every fatal condition ends:
/// there is no isolation boundary that would allow the kernel to recover
/// from a corrupted state.
pub fn freeze() -> ! {
    crate::arch::target::cpu::freeze()
}

/// Power off the machine.
pub fn shutdown() -> ! {
    crate::arch::target::cpu::shutdown()
}
