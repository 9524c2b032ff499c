use super::timer;
use crate::{
    arch::generic::trap::{self, instruction_length, Access, Context, Resume, TrapHandler},
    guard::StackGuard,
    layout::Layout,
};
use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, Ordering},
};
use riscv::register::stvec::TrapMode;

core::arch::global_asm!(
    include_str!("asm/trap.asm"),
    FRAME_SIZE = const core::mem::size_of::<Context>(),
    SSTATUS = const Context::SSTATUS_OFFSET,
    SEPC = const Context::SEPC_OFFSET,
    SCAUSE = const Context::SCAUSE_OFFSET,
    STVAL = const Context::STVAL_OFFSET,
    handler = sym trap_handler,
);

unsafe extern "C" {
    fn trap_entry();
}

/// The stack the trap entry switches to. Its top is kept in `sscratch`
/// while the kernel is not handling a trap.
#[repr(C, align(16))]
struct TrapStack(UnsafeCell<[u8; config::TRAP_STACK_SIZE]>);

// SAFETY: The stack is only used by the trap entry, and traps are never
// handled concurrently on a single hart.
unsafe impl Sync for TrapStack {}

impl TrapStack {
    fn top(&self) -> usize {
        self.0.get() as usize + config::TRAP_STACK_SIZE
    }
}

static TRAP_STACK: TrapStack = TrapStack(UnsafeCell::new([0; config::TRAP_STACK_SIZE]));

/// Set while a trap is being handled. Interrupts are masked by the hardware
/// on trap entry, so only an exception raised by the handler itself can
/// find it set.
static IN_TRAP: AtomicBool = AtomicBool::new(false);

/// The guard below the kernel stack, checked on every trap.
static GUARD: spin::Once<StackGuard> = spin::Once::new();

/// Arm the stack guard and install the trap vector.
///
/// # Safety
/// Must be called once, during boot, with the layout the kernel is linked
/// with.
pub unsafe fn setup(layout: &Layout) {
    // SAFETY: The guard region is reserved by the linker script below the
    // kernel stack and nothing else uses it.
    let guard = unsafe { StackGuard::new(layout.stack_guard()) };
    guard.arm();
    GUARD.call_once(|| guard);

    // SAFETY: `trap_entry` is defined in `trap.asm` and handles every trap.
    // It expects `sscratch` to hold the top of the trap stack.
    unsafe {
        riscv::register::sscratch::write(TRAP_STACK.top());
        riscv::register::stvec::write(vector(), TrapMode::Direct);
    }
}

/// The address of the trap entry.
#[must_use]
pub fn vector() -> usize {
    trap_entry as usize
}

/// Log an error and return `true` if the stack guard was overwritten.
pub fn report_stack_overflow() -> bool {
    let Some(address) = GUARD.get().and_then(StackGuard::damage) else {
        return false;
    };
    ::log::error!("Kernel stack overflow: guard overwritten at {:#010x}", address);
    true
}

/// Called by the trap entry with the context it saved. The context is
/// restored when this function returns.
extern "C" fn trap_handler(context: &mut Context) {
    if IN_TRAP.swap(true, Ordering::Acquire) {
        trap::fatal("Trap raised while handling a trap", context);
    }
    if report_stack_overflow() {
        trap::fatal("Stack overflow", context);
    }

    trap::handle(&mut KernelTraps, context);
    IN_TRAP.store(false, Ordering::Release);
}

/// The trap policy of the kernel. Every cause that is not handled here is
/// fatal.
struct KernelTraps;

impl TrapHandler for KernelTraps {
    fn software(&mut self, _context: &mut Context) -> Resume {
        // SAFETY: Clearing the pending software interrupt bit only
        // acknowledges the interrupt.
        unsafe { core::arch::asm!("csrc sip, {}", in(reg) 1 << 1) };
        Resume::Continue
    }

    fn timer(&mut self, _context: &mut Context) -> Resume {
        timer::tick();
        Resume::Continue
    }

    fn breakpoint(&mut self, context: &mut Context) -> Resume {
        // SAFETY: The breakpoint was raised by the instruction at `sepc`, so
        // it is mapped and readable. Instructions are at least 2-byte
        // aligned.
        let parcel = unsafe { core::ptr::read_volatile(context.ip() as usize as *const u16) };
        ::log::debug!("Breakpoint at {:#010x}", context.ip());
        context.skip_instruction(instruction_length(parcel));
        Resume::Continue
    }

    fn illegal_instruction(&mut self, context: &mut Context, instruction: u32) -> Resume {
        ::log::error!(
            "Illegal instruction {:#010x} at {:#010x}",
            instruction,
            context.ip()
        );
        Resume::Fault
    }

    fn misaligned(&mut self, context: &mut Context, access: Access, address: u32) -> Resume {
        ::log::error!(
            "Misaligned {:?} at {:#010x} (ip: {:#010x})",
            access,
            address,
            context.ip()
        );
        Resume::Fault
    }

    fn access_fault(&mut self, context: &mut Context, access: Access, address: u32) -> Resume {
        ::log::error!(
            "{:?} access fault at {:#010x} (ip: {:#010x})",
            access,
            address,
            context.ip()
        );
        Resume::Fault
    }

    fn page_fault(&mut self, context: &mut Context, access: Access, address: u32) -> Resume {
        ::log::error!(
            "{:?} page fault at {:#010x} without paging (ip: {:#010x})",
            access,
            address,
            context.ip()
        );
        Resume::Fault
    }
}

/// The value the self test loads into its `n`-th register.
const fn pattern(n: usize) -> u32 {
    0xC0DE_0000 | ((n as u32) << 8) | (n as u32 ^ 0x5A)
}

/// Raise a breakpoint with a known pattern in 20 registers and check that
/// the trap entry gives every register back unchanged.
///
/// # Errors
/// Returns the index of the first register whose value changed.
pub fn self_test() -> Result<(), usize> {
    let mut values: [u32; 20] = core::array::from_fn(pattern);

    // SAFETY: `ebreak` traps to the kernel breakpoint handler, which skips
    // it and changes nothing else.
    unsafe {
        core::arch::asm!(
            "ebreak",
            inout("s2") values[0],
            inout("s3") values[1],
            inout("s4") values[2],
            inout("s5") values[3],
            inout("s6") values[4],
            inout("s7") values[5],
            inout("s8") values[6],
            inout("s9") values[7],
            inout("s10") values[8],
            inout("s11") values[9],
            inout("a2") values[10],
            inout("a3") values[11],
            inout("a4") values[12],
            inout("a5") values[13],
            inout("a6") values[14],
            inout("a7") values[15],
            inout("t3") values[16],
            inout("t4") values[17],
            inout("t5") values[18],
            inout("t6") values[19],
        );
    }

    match values
        .iter()
        .enumerate()
        .find(|&(n, &value)| value != pattern(n))
    {
        Some((n, _)) => Err(n),
        None => Ok(()),
    }
}
