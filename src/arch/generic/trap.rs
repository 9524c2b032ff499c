//! Trap decoding and dispatch.
//!
//! The trap entry saves the interrupted context into a [`Context`] and calls
//! [`handle`] with it. The cause is decoded into a closed set of variants
//! and dispatched with an exhaustive `match` to the matching method of a
//! [`TrapHandler`]. Whatever the handler leaves in the context is restored
//! when the trap returns.
//!
//! Unlike the rest of the facade, this module does not forward to the
//! target: the frame layout, the register names and the causes are those of
//! RISC-V, shared on purpose with the `host` target so the dispatch logic
//! can be tested on the development machine. The target only provides the
//! entry assembly and the kernel policy.
use bitflags::bitflags;
use core::fmt;

/// The ABI names of the registers saved in a [`Context`], `x1` to `x31`.
pub const REGISTER_NAMES: [&str; 31] = [
    "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4", "t5",
    "t6",
];

/// The context of the trap: the state of the hart when the trap occurred.
///
/// The layout is shared with the trap entry assembly: `registers[n - 1]`
/// holds `xn`, followed by the supervisor CSRs saved by the entry. The
/// struct is padded to 16 bytes so the stack stays aligned below it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct Context {
    registers: [u32; 31],
    sstatus: u32,
    sepc: u32,
    scause: u32,
    stval: u32,
}

const _: () = assert!(core::mem::size_of::<Context>() == 144);
const _: () = assert!(core::mem::offset_of!(Context, registers) == 0);

impl Context {
    /// Offset of the saved `sstatus` in the frame.
    pub const SSTATUS_OFFSET: usize = core::mem::offset_of!(Context, sstatus);
    /// Offset of the saved `sepc` in the frame.
    pub const SEPC_OFFSET: usize = core::mem::offset_of!(Context, sepc);
    pub const SCAUSE_OFFSET: usize = core::mem::offset_of!(Context, scause);
    pub const STVAL_OFFSET: usize = core::mem::offset_of!(Context, stval);

    /// Create a new context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registers: [0; 31],
            sstatus: 0,
            sepc: 0,
            scause: 0,
            stval: 0,
        }
    }

    /// Create a context as the trap entry would have saved it.
    #[must_use]
    pub const fn with_trap(registers: [u32; 31], sstatus: u32, sepc: u32, scause: u32, stval: u32) -> Self {
        Self {
            registers,
            sstatus,
            sepc,
            scause,
            stval,
        }
    }

    /// Get the value of the register `xn`. `x0` always reads as zero.
    ///
    /// # Panics
    /// Panics if `n` is not a valid register number.
    #[must_use]
    pub const fn register(&self, n: usize) -> u32 {
        assert!(n < 32, "Invalid register number");
        if n == 0 { 0 } else { self.registers[n - 1] }
    }

    /// Set the value of the register `xn`. Writes to `x0` are ignored.
    ///
    /// # Panics
    /// Panics if `n` is not a valid register number.
    pub fn set_register(&mut self, n: usize, value: u32) {
        assert!(n < 32, "Invalid register number");
        if n != 0 {
            self.registers[n - 1] = value;
        }
    }

    /// The interrupted stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.register(2)
    }

    /// Set the stack pointer.
    pub fn set_sp(&mut self, sp: u32) {
        self.set_register(2, sp);
    }

    /// The address the trap returns to.
    #[must_use]
    pub const fn ip(&self) -> u32 {
        self.sepc
    }

    /// Set the instruction pointer.
    pub fn set_ip(&mut self, ip: u32) {
        self.sepc = ip;
    }

    /// Resume after the instruction that trapped, given its length in bytes.
    pub fn skip_instruction(&mut self, length: u32) {
        self.sepc = self.sepc.wrapping_add(length);
    }

    /// The saved status register.
    #[must_use]
    pub const fn status(&self) -> Status {
        Status::from_bits_retain(self.sstatus)
    }

    /// The decoded cause of the trap.
    #[must_use]
    pub fn cause(&self) -> Cause {
        decode(self.scause)
    }

    /// The raw cause register.
    #[must_use]
    pub const fn scause(&self) -> u32 {
        self.scause
    }

    /// The trap value: the faulting address for memory faults, the faulting
    /// instruction for illegal instructions (when the hardware provides
    /// it), zero otherwise.
    #[must_use]
    pub const fn stval(&self) -> u32 {
        self.stval
    }

    /// Print all the saved registers to the kernel log.
    pub fn dump(&self) {
        log::error!(
            "sepc: {:#010x}  sstatus: {:#010x}  scause: {:#010x}  stval: {:#010x}",
            self.sepc,
            self.sstatus,
            self.scause,
            self.stval
        );
        for (names, values) in REGISTER_NAMES.chunks(4).zip(self.registers.chunks(4)) {
            let mut line = heapless::String::<96>::new();
            for (name, value) in names.iter().zip(values) {
                _ = fmt::Write::write_fmt(&mut line, format_args!("{name:>4}: {value:#010x}  "));
            }
            log::error!("{}", line.trim_end());
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

bitflags! {
    /// The bits of the saved `sstatus` register the kernel cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Supervisor interrupts enabled.
        const SIE = 1 << 1;
        /// Supervisor interrupts were enabled before the trap.
        const SPIE = 1 << 5;
        /// The trap was taken from supervisor mode.
        const SPP = 1 << 8;
    }
}

pub use riscv::register::scause::{Exception, Interrupt, Trap as Cause};

/// The bit of `scause` set for interrupts.
pub const INTERRUPT_BIT: u32 = 1 << 31;

/// Decode the value of the `scause` register. Reserved and platform-specific
/// codes decode to the `Unknown` variants; the raw value stays available in
/// the saved context.
#[must_use]
pub fn decode(scause: u32) -> Cause {
    let code = (scause & !INTERRUPT_BIT) as usize;
    if scause & INTERRUPT_BIT != 0 {
        Cause::Interrupt(Interrupt::from(code))
    } else {
        Cause::Exception(Exception::from(code))
    }
}

/// Encode a cause back into the value of the `scause` register, or `None`
/// for an `Unknown` cause, whose code is lost.
#[must_use]
pub fn encode(cause: Cause) -> Option<u32> {
    let (code, interrupt) = match cause {
        Cause::Interrupt(interrupt) => (usize::try_from(interrupt).ok()?, INTERRUPT_BIT),
        Cause::Exception(exception) => (usize::try_from(exception).ok()?, 0),
    };
    u32::try_from(code).ok().map(|code| code | interrupt)
}

/// The kind of memory access that faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Instruction,
    Load,
    Store,
}

/// The privilege mode an environment call was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    User,
    Supervisor,
}

/// What to do once a trap has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Restore the context and continue where it was interrupted.
    Continue,

    /// The handler decided the interrupted context cannot continue.
    Fault,

    /// No handler exists for this cause.
    Unhandled,
}

/// The policy applied to each cause of trap. Every method defaults to
/// [`Resume::Unhandled`], so a handler only implements the causes it knows
/// how to deal with and every other cause is reported as fatal.
///
/// A handler may modify the context, for example to skip the trapping
/// instruction: the modified context is what the trap returns to.
pub trait TrapHandler {
    fn software(&mut self, _context: &mut Context) -> Resume {
        Resume::Unhandled
    }

    fn timer(&mut self, _context: &mut Context) -> Resume {
        Resume::Unhandled
    }

    fn external(&mut self, _context: &mut Context) -> Resume {
        Resume::Unhandled
    }

    fn breakpoint(&mut self, _context: &mut Context) -> Resume {
        Resume::Unhandled
    }

    fn environment_call(&mut self, _context: &mut Context, _from: Mode) -> Resume {
        Resume::Unhandled
    }

    /// `instruction` is the raw instruction when the hardware reports it,
    /// zero otherwise.
    fn illegal_instruction(&mut self, _context: &mut Context, _instruction: u32) -> Resume {
        Resume::Unhandled
    }

    fn misaligned(&mut self, _context: &mut Context, _access: Access, _address: u32) -> Resume {
        Resume::Unhandled
    }

    fn access_fault(&mut self, _context: &mut Context, _access: Access, _address: u32) -> Resume {
        Resume::Unhandled
    }

    fn page_fault(&mut self, _context: &mut Context, _access: Access, _address: u32) -> Resume {
        Resume::Unhandled
    }
}

/// Call the method of `handler` matching the cause saved in `context`.
pub fn dispatch<H: TrapHandler + ?Sized>(handler: &mut H, context: &mut Context) -> Resume {
    let value = context.stval();
    match context.cause() {
        Cause::Interrupt(Interrupt::SupervisorSoft) => handler.software(context),
        Cause::Interrupt(Interrupt::SupervisorTimer) => handler.timer(context),
        Cause::Interrupt(Interrupt::SupervisorExternal) => handler.external(context),
        Cause::Exception(Exception::Breakpoint) => handler.breakpoint(context),
        Cause::Exception(Exception::UserEnvCall) => handler.environment_call(context, Mode::User),
        Cause::Exception(Exception::SupervisorEnvCall) => {
            handler.environment_call(context, Mode::Supervisor)
        }
        Cause::Exception(Exception::IllegalInstruction) => {
            handler.illegal_instruction(context, value)
        }
        Cause::Exception(Exception::InstructionMisaligned) => {
            handler.misaligned(context, Access::Instruction, value)
        }
        Cause::Exception(Exception::LoadMisaligned) => {
            handler.misaligned(context, Access::Load, value)
        }
        Cause::Exception(Exception::StoreMisaligned) => {
            handler.misaligned(context, Access::Store, value)
        }
        Cause::Exception(Exception::InstructionFault) => {
            handler.access_fault(context, Access::Instruction, value)
        }
        Cause::Exception(Exception::LoadFault) => {
            handler.access_fault(context, Access::Load, value)
        }
        Cause::Exception(Exception::StoreFault) => {
            handler.access_fault(context, Access::Store, value)
        }
        Cause::Exception(Exception::InstructionPageFault) => {
            handler.page_fault(context, Access::Instruction, value)
        }
        Cause::Exception(Exception::LoadPageFault) => {
            handler.page_fault(context, Access::Load, value)
        }
        Cause::Exception(Exception::StorePageFault) => {
            handler.page_fault(context, Access::Store, value)
        }
        Cause::Interrupt(Interrupt::Unknown) | Cause::Exception(Exception::Unknown) => {
            Resume::Unhandled
        }
    }
}

/// Handle a trap: dispatch it to `handler`, and halt the hart if the
/// interrupted context cannot be resumed. When this function returns, the
/// trap entry restores `context`.
pub fn handle<H: TrapHandler + ?Sized>(handler: &mut H, context: &mut Context) {
    match dispatch(handler, context) {
        Resume::Continue => {}
        Resume::Fault => fatal("Unrecoverable trap", context),
        Resume::Unhandled => fatal("Unhandled trap", context),
    }
}

/// Report a trap the kernel cannot recover from and halt the hart.
pub fn fatal(reason: &str, context: &Context) -> ! {
    log::error!(
        "{}: {:?} at {:#010x} (stval: {:#x})",
        reason,
        context.cause(),
        context.ip(),
        context.stval()
    );
    context.dump();
    crate::arch::cpu::freeze()
}

/// Return the length in bytes of the instruction whose first 16 bits are
/// `parcel`. Compressed instructions are 2 bytes long, the others 4 bytes:
/// longer encodings are not used by any supported extension.
#[must_use]
pub const fn instruction_length(parcel: u16) -> u32 {
    if parcel & 0b11 == 0b11 { 4 } else { 2 }
}
