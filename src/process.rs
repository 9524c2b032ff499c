//! Cooperative processes.
//!
//! All processes share the kernel address space and only differ by their
//! stack. A process runs until it calls [`yield_now`], which saves its
//! callee-saved registers on its own stack and restores those of the next
//! runnable process. Interrupts never switch processes.
//!
//! The first slot of the table is the boot context: the kernel main routine
//! becomes that process the first time it yields. Processes never
//! terminate, so the boot context is never picked again once another
//! process exists.
//!
//! The bottom of every process stack holds a [`StackGuard`] canary. It is
//! checked when the process yields, so an overflow into the allocation
//! below is reported at the next switch instead of going unnoticed.
use crate::{
    bump::{AllocError, BumpAllocator},
    guard::StackGuard,
    layout::{Region, Role},
    utils::align::align_down,
};
use core::fmt;

/// Identifier of a process: its slot in the process table.
pub type Pid = usize;

/// The slot of the boot context.
pub const IDLE: Pid = 0;

/// The registers saved by a context switch, as laid out on the stack of a
/// suspended process. A process that has never run has a frame whose
/// return address is its entry point, so the first switch to it "returns"
/// into the entry point. The frame is padded to 16 bytes so the stack
/// pointer keeps the alignment required by the calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C, align(16))]
pub struct SwitchFrame {
    pub ra: usize,
    pub s: [usize; 12],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Process {
    pid: Pid,

    /// The saved stack pointer. Only meaningful while the process is not
    /// running: it points to its [`SwitchFrame`].
    sp: usize,

    /// The stack of the process, as `(base, length)`. The boot context
    /// runs on the kernel stack and does not own one.
    stack: Option<(usize, usize)>,

    /// The canary at the bottom of the stack.
    guard: Option<StackGuard>,
}

impl Process {
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    #[must_use]
    pub const fn sp(&self) -> usize {
        self.sp
    }

    #[must_use]
    pub const fn stack(&self) -> Option<(usize, usize)> {
        self.stack
    }

    /// Return the highest address of the stack canary that was overwritten,
    /// if the process overflowed its stack.
    #[must_use]
    pub fn stack_damage(&self) -> Option<usize> {
        self.guard.as_ref().and_then(StackGuard::damage)
    }
}

/// A process could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// All the process slots are in use.
    TableFull,

    /// No memory was left for the stack of the process.
    Stack(AllocError),
}

impl From<AllocError> for SpawnError {
    fn from(error: AllocError) -> Self {
        SpawnError::Stack(error)
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::TableFull => write!(f, "process table is full"),
            SpawnError::Stack(error) => write!(f, "cannot allocate process stack: {error}"),
        }
    }
}

/// A switch to perform: the location where the stack pointer of the
/// current process must be saved, and the saved stack pointer of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub from: Pid,
    pub to: Pid,
    pub save_sp: *mut usize,
    pub restore_sp: *const usize,
}

#[derive(Debug)]
pub struct Table {
    processes: heapless::Vec<Process, { config::MAX_PROCESSES }>,
    current: Pid,
}

impl Table {
    /// Create a table containing only the boot context, which is the
    /// current process.
    #[must_use]
    pub fn new() -> Self {
        let mut processes = heapless::Vec::new();
        let idle = Process {
            pid: IDLE,
            sp: 0,
            stack: None,
            guard: None,
        };
        if processes.push(idle).is_err() {
            unreachable!("The process table always has room for the boot context");
        }
        Self {
            processes,
            current: IDLE,
        }
    }

    /// Create a runnable process that starts executing at `entry` the first
    /// time it is switched to. Its stack is taken from `allocator`.
    ///
    /// # Errors
    /// Returns [`SpawnError::TableFull`] if there is no free slot, or
    /// [`SpawnError::Stack`] if the stack cannot be allocated.
    pub fn spawn(
        &mut self,
        allocator: &mut BumpAllocator,
        entry: usize,
    ) -> Result<Pid, SpawnError> {
        if self.processes.is_full() {
            return Err(SpawnError::TableFull);
        }

        let stack = allocator.allocate(config::PROCESS_STACK_SIZE)?;
        let base = stack.cast::<u8>().as_ptr() as usize;
        let length = stack.len();

        let canary = Region::new(Role::StackGuard, base, base + config::PROCESS_STACK_CANARY_SIZE);
        // SAFETY: The canary lies at the bottom of the stack that was just
        // allocated, far below the initial frame, and is word aligned.
        let guard = unsafe { StackGuard::new(canary) };
        guard.arm();

        // The initial frame sits at the 16 bytes aligned top of the stack.
        let sp = align_down(
            base + length - core::mem::size_of::<SwitchFrame>(),
            16,
        );
        let frame = SwitchFrame {
            ra: entry,
            ..SwitchFrame::default()
        };
        // SAFETY: The stack was just allocated for this process and `sp`
        // leaves enough room for the frame below its end.
        unsafe { core::ptr::write(sp as *mut SwitchFrame, frame) };

        let pid = self.processes.len();
        let process = Process {
            pid,
            sp,
            stack: Some((base, length)),
            guard: Some(guard),
        };
        if self.processes.push(process).is_err() {
            return Err(SpawnError::TableFull);
        }

        log::debug!("Spawned process {} (entry {:#x})", pid, entry);
        Ok(pid)
    }

    /// Pick the process to run after the current one: the next spawned
    /// process in round-robin order, skipping the boot context. Return
    /// `None` if the current process is the only candidate and should keep
    /// running.
    #[must_use]
    pub fn next_runnable(&self) -> Option<Pid> {
        let count = self.processes.len();
        (1..count)
            .map(|offset| (self.current + offset) % count)
            .find(|&pid| pid != IDLE)
    }

    /// Select the next process and make it current. Return the switch the
    /// caller must perform, or `None` if the current process keeps running.
    ///
    /// The returned pointers stay valid as long as the table is not moved.
    pub fn schedule(&mut self) -> Option<Switch> {
        let next = self.next_runnable()?;
        let from = self.current;
        self.current = next;

        let save_sp = core::ptr::addr_of_mut!(self.processes[from].sp);
        let restore_sp = core::ptr::addr_of!(self.processes[next].sp);
        Some(Switch {
            from,
            to: next,
            save_sp,
            restore_sp,
        })
    }

    /// Check the stack canary of the current process.
    ///
    /// # Errors
    /// Returns the highest overwritten address of the canary if the current
    /// process overflowed its stack.
    pub fn check_current(&self) -> Result<(), usize> {
        match self.get(self.current).and_then(Process::stack_damage) {
            Some(address) => Err(address),
            None => Ok(()),
        }
    }

    /// The process currently running.
    #[must_use]
    pub const fn current(&self) -> Pid {
        self.current
    }

    /// Return the process with the given identifier.
    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(pid)
    }

    /// The number of processes, including the boot context.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Always `false`: the boot context is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

/// The process table of the kernel.
#[cfg(target_arch = "riscv32")]
static TABLE: spin::Mutex<Option<Table>> = spin::Mutex::new(None);

/// Create a process running `entry` on a stack taken from `allocator`.
///
/// # Errors
/// See [`Table::spawn`].
#[cfg(target_arch = "riscv32")]
pub fn spawn(allocator: &mut BumpAllocator, entry: fn() -> !) -> Result<Pid, SpawnError> {
    TABLE
        .lock()
        .get_or_insert_with(Table::new)
        .spawn(allocator, entry as usize)
}

/// Give the CPU to the next runnable process. Returns when the calling
/// process is selected again, or immediately if no other process is
/// runnable.
#[cfg(target_arch = "riscv32")]
pub fn yield_now() {
    let switch = {
        let mut table = TABLE.lock();
        let table = table.get_or_insert_with(Table::new);
        if let Err(address) = table.check_current() {
            panic!(
                "Process {} overflowed its stack (canary overwritten at {:#010x})",
                table.current(),
                address
            );
        }
        table.schedule()
    };

    // The lock must be released before switching: the next process will
    // take it again when it yields. The table lives in a static, so the
    // pointers in `switch` stay valid.
    if let Some(switch) = switch {
        // SAFETY: `save_sp` and `restore_sp` point into the process table,
        // and `restore_sp` holds the stack pointer saved by the last switch
        // away from the next process (or its initial frame).
        unsafe {
            crate::arch::target::thread::switch(switch.save_sp, switch.restore_sp);
        }
    }
}
