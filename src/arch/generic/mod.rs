pub mod cpu;
pub mod irq;
pub mod log;
pub mod timer;
pub mod trap;
