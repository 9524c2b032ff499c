//! A stand-in target used when the kernel is built for the development
//! machine. It has no hardware to drive: it only keeps enough state for the
//! architecture-independent code to be tested.

pub mod cpu {
    pub fn relax() {
        core::hint::spin_loop();
    }

    /// There is no hart to halt: unwind instead, so tests can observe that
    /// the kernel gave up.
    pub fn freeze() -> ! {
        panic!("hart frozen");
    }

    pub fn shutdown() -> ! {
        panic!("machine powered off");
    }
}

pub mod irq {
    pub unsafe fn enable() {}

    pub fn disable() {}
}

pub mod log {
    use spin::Mutex;

    /// Everything written to the console, up to its capacity. The kernel
    /// does not depend on the standard output, so tests read this instead.
    static CONSOLE: Mutex<heapless::String<4096>> = Mutex::new(heapless::String::new());

    pub fn write(message: &str) {
        let mut console = CONSOLE.lock();
        for c in message.chars() {
            if console.push(c).is_err() {
                break;
            }
        }
    }

    /// Take what was written to the console so far, leaving it empty.
    pub fn take() -> heapless::String<4096> {
        core::mem::take(&mut *CONSOLE.lock())
    }
}

pub mod timer {
    pub fn ticks() -> usize {
        0
    }
}
