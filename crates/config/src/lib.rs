#![no_std]

/// The size of a page. Every page-critical region of the memory layout and
/// every allocation handed out by the bump allocator is aligned to this
/// value.
pub const PAGE_SIZE: usize = 4096;

/// The first physical address of RAM on the QEMU `virt` machine.
pub const RAM_BASE: usize = 0x8000_0000;

/// The amount of RAM the machine is started with. The memory layout must
/// fit entirely inside `[RAM_BASE, RAM_BASE + RAM_SIZE)`.
pub const RAM_SIZE: usize = 128 * 1024 * 1024;

/// The address the firmware jumps to after initializing the machine. The
/// first 2 MiB of RAM are owned by OpenSBI, the kernel image starts right
/// after them.
pub const KERNEL_BASE: usize = 0x8020_0000;

/// The space reserved for the kernel image itself (code, read-only data,
/// data and BSS). The linker refuses to produce an image larger than this.
pub const KERNEL_IMAGE_SIZE: usize = 2 * 1024 * 1024;

/// The size of the arena backing the bump allocator.
pub const ALLOCATOR_ARENA_SIZE: usize = 4 * 1024 * 1024;

/// The size of the guard region placed immediately below the kernel stack.
/// Without paging, overflows cannot be trapped, so the guard is painted
/// with a canary pattern that is verified on every trap.
pub const STACK_GUARD_SIZE: usize = 4096;

/// The size of the boot stack. This should be a multiple of the page size.
/// The kernel main routine and everything it calls run on this stack.
pub const KERNEL_STACK_SIZE: usize = 128 * 1024;

/// The amount of RAM left after the stack for general use.
///
/// Keep this well under the machine RAM size: anything that has to walk
/// this region scales with it, and nothing in the kernel needs it to be
/// large.
pub const FREE_RAM_SIZE: usize = 64 * 1024 * 1024;

/// The size of the stack used to handle traps. The trap frame is saved at
/// the top of this stack and the trap handler runs below it.
pub const TRAP_STACK_SIZE: usize = 16 * 1024;

/// The maximum number of processes, including the boot context which
/// always occupies the first slot.
pub const MAX_PROCESSES: usize = 8;

/// The size of the stack given to every spawned process.
pub const PROCESS_STACK_SIZE: usize = 8 * 1024;

/// The bytes at the bottom of every process stack painted with a canary,
/// checked each time the process yields.
pub const PROCESS_STACK_CANARY_SIZE: usize = 64;

/// The interval between two timer interrupts, in milliseconds. The timer
/// only counts ticks: scheduling is cooperative.
pub const TIMER_INTERVAL_MS: u64 = 25;

/// The end of the kernel image reservation.
pub const KERNEL_IMAGE_END: usize = KERNEL_BASE + KERNEL_IMAGE_SIZE;

/// The end of the last region of the memory layout (the free RAM).
pub const LAYOUT_END: usize = KERNEL_IMAGE_END
    + ALLOCATOR_ARENA_SIZE
    + STACK_GUARD_SIZE
    + KERNEL_STACK_SIZE
    + FREE_RAM_SIZE;

// Reject configurations that overlap or do not fit in RAM.
const _: () = {
    assert!(PAGE_SIZE.is_power_of_two(), "PAGE_SIZE must be a power of two");
    assert!(KERNEL_BASE >= RAM_BASE, "The kernel must be loaded in RAM");
    assert!(KERNEL_BASE % PAGE_SIZE == 0, "KERNEL_BASE must be page aligned");
    assert!(KERNEL_IMAGE_SIZE % PAGE_SIZE == 0, "KERNEL_IMAGE_SIZE must be page aligned");
    assert!(ALLOCATOR_ARENA_SIZE % PAGE_SIZE == 0, "ALLOCATOR_ARENA_SIZE must be page aligned");
    assert!(ALLOCATOR_ARENA_SIZE > 0, "The allocator arena cannot be empty");
    assert!(STACK_GUARD_SIZE % PAGE_SIZE == 0, "STACK_GUARD_SIZE must be page aligned");
    assert!(KERNEL_STACK_SIZE % PAGE_SIZE == 0, "KERNEL_STACK_SIZE must be page aligned");
    assert!(KERNEL_STACK_SIZE > 0, "The kernel stack cannot be empty");
    assert!(FREE_RAM_SIZE % PAGE_SIZE == 0, "FREE_RAM_SIZE must be page aligned");
    assert!(TRAP_STACK_SIZE % 16 == 0, "TRAP_STACK_SIZE must be 16 bytes aligned");
    assert!(PROCESS_STACK_SIZE % 16 == 0, "PROCESS_STACK_SIZE must be 16 bytes aligned");
    assert!(
        PROCESS_STACK_CANARY_SIZE % 4 == 0 && PROCESS_STACK_CANARY_SIZE < PROCESS_STACK_SIZE / 2,
        "PROCESS_STACK_CANARY_SIZE must be word aligned and leave room for the stack"
    );
    assert!(MAX_PROCESSES >= 1, "The boot context needs a process slot");
    assert!(
        LAYOUT_END <= RAM_BASE + RAM_SIZE,
        "The memory layout does not fit in RAM"
    );
    assert!(
        FREE_RAM_SIZE < RAM_SIZE,
        "The free RAM cannot be larger than the RAM itself"
    );
};
