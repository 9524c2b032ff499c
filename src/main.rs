#![cfg_attr(target_arch = "riscv32", no_std, no_main)]

#[cfg(target_arch = "riscv32")]
mod kernel {
    use pebble::{
        BootInfo,
        arch::{cpu, irq, timer},
        process,
    };

    /// The number of rounds each demo process runs before the machine is
    /// powered off.
    const ROUNDS: usize = 4;

    /// The main routine of the kernel, called by the boot path once the
    /// stack, the BSS, the trap vector and the timer are set up.
    #[unsafe(no_mangle)]
    pub fn kmain(mut boot: BootInfo) -> ! {
        ::log::info!("Hello, world!");

        match pebble::arch::target::trap::self_test() {
            Ok(()) => ::log::info!("Trap self test passed"),
            Err(register) => panic!("Trap self test corrupted register {register}"),
        }

        let scratch = boot
            .allocator
            .allocate(100)
            .expect("Cannot allocate from a fresh arena");
        ::log::info!(
            "Allocated {} bytes at {:p}, {} KiB left",
            scratch.len(),
            scratch.cast::<u8>(),
            boot.allocator.remaining() / 1024
        );
        ::log::info!(
            "Free RAM: {:#010x} - {:#010x}",
            boot.free_ram().base,
            boot.free_ram().end
        );

        for entry in [ping as fn() -> !, pong] {
            if let Err(error) = process::spawn(&mut boot.allocator, entry) {
                panic!("Cannot spawn a demo process: {error}");
            }
        }

        // SAFETY: The trap vector is installed and the timer handler is
        // ready.
        unsafe { irq::enable() };

        loop {
            process::yield_now();
            cpu::relax();
        }
    }

    fn ping() -> ! {
        run("ping");
        loop {
            process::yield_now();
        }
    }

    fn pong() -> ! {
        run("pong");
        cpu::shutdown();
    }

    fn run(name: &str) {
        for round in 0..ROUNDS {
            ::log::info!("{}: round {} at tick {}", name, round, timer::ticks());
            wait_tick();
            process::yield_now();
        }
    }

    /// Wait for the next timer interrupt.
    fn wait_tick() {
        let start = timer::ticks();
        while timer::ticks() == start {
            cpu::relax();
        }
    }
}

#[cfg(not(target_arch = "riscv32"))]
fn main() {}
