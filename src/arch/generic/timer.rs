/// The number of timer interrupts received since the timer was set up.
#[must_use]
pub fn ticks() -> usize {
    crate::arch::target::timer::ticks()
}
