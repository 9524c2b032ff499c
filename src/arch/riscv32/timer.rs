use core::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

/// The frequency assumed when the device tree does not give one. This is
/// the timebase frequency of the QEMU `virt` machine.
const DEFAULT_FREQUENCY: u64 = 10_000_000;

/// The duration of a single timebase tick, in nanoseconds.
static INTERNAL_TICK: spin::Once<u64> = spin::Once::new();

static TICKS: AtomicUsize = AtomicUsize::new(0);

/// Read the timebase frequency of the first CPU of the device tree.
#[must_use]
pub fn frequency(device_tree: &fdt::Fdt) -> Option<u64> {
    device_tree
        .cpus()
        .next()
        .map(|cpu| cpu.timebase_frequency() as u64)
}

/// Setup the timer subsystem with the given timebase frequency, or the
/// default one, and arm the first timer interrupt. The interrupt is only
/// delivered once interrupts are enabled.
pub fn setup(frequency: Option<u64>) {
    let frequency = frequency
        .filter(|&frequency| frequency > 0)
        .unwrap_or(DEFAULT_FREQUENCY);
    INTERNAL_TICK.call_once(|| (1_000_000_000 / frequency).max(1));
    ::log::info!("Timer frequency: {} Hz", frequency);

    next_trigger(interval());
    // SAFETY: The trap vector is installed before the timer is set up, and
    // the timer handler does not rely on anything else.
    unsafe { riscv::register::sie::set_stimer() };
}

/// Set the next timer trigger to the given duration from now.
pub fn next_trigger(next: Duration) {
    let nano = u64::try_from(next.as_nanos()).unwrap_or(u64::MAX);
    let current = riscv::register::time::read64();
    let next = current.saturating_add(nano / internal_tick());
    if let Err(error) = sbi::timer::set_timer(next) {
        ::log::warn!("Cannot arm the timer: {:?}", error);
    }
}

/// Count a timer interrupt and arm the next one.
pub fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    next_trigger(interval());
}

/// The number of timer interrupts handled so far.
#[must_use]
pub fn ticks() -> usize {
    TICKS.load(Ordering::Relaxed)
}

/// The duration of a single internal tick, in nanoseconds.
#[must_use]
pub fn internal_tick() -> u64 {
    INTERNAL_TICK
        .get()
        .copied()
        .unwrap_or(1_000_000_000 / DEFAULT_FREQUENCY)
}

fn interval() -> Duration {
    Duration::from_millis(config::TIMER_INTERVAL_MS)
}
