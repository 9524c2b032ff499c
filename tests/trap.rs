use pebble::arch::trap::{
    self, Access, Cause, Context, Exception, Interrupt, Mode, Resume, Status, TrapHandler,
    instruction_length,
};

const ILLEGAL_INSTRUCTION: u32 = 2;
const LOAD_PAGE_FAULT: u32 = 13;
const SUPERVISOR_TIMER: u32 = 0x8000_0005;

/// A context as the trap entry would save it, with a distinct value in
/// every register.
fn context(scause: u32, stval: u32) -> Context {
    let registers = core::array::from_fn(|n| 0x1000_0000 + (n as u32) * 0x0101);
    Context::with_trap(registers, (Status::SPP | Status::SPIE).bits(), 0x8020_1234, scause, stval)
}

/// Handles the causes it is told to handle without touching the context,
/// and remembers what it was called with.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
}

impl TrapHandler for Recorder {
    fn timer(&mut self, _context: &mut Context) -> Resume {
        self.calls.push("timer".into());
        Resume::Continue
    }

    fn illegal_instruction(&mut self, _context: &mut Context, instruction: u32) -> Resume {
        self.calls.push(format!("illegal {instruction:#x}"));
        Resume::Continue
    }

    fn page_fault(&mut self, _context: &mut Context, access: Access, address: u32) -> Resume {
        self.calls.push(format!("page fault {access:?} {address:#x}"));
        Resume::Fault
    }

    fn environment_call(&mut self, _context: &mut Context, from: Mode) -> Resume {
        self.calls.push(format!("ecall {from:?}"));
        Resume::Continue
    }
}

/// Handles nothing.
struct Nothing;

impl TrapHandler for Nothing {}

#[test]
fn decodes_causes() {
    assert_eq!(
        trap::decode(SUPERVISOR_TIMER),
        Cause::Interrupt(Interrupt::SupervisorTimer)
    );
    assert_eq!(
        trap::decode(0x8000_0009),
        Cause::Interrupt(Interrupt::SupervisorExternal)
    );
    assert_eq!(
        trap::decode(0x8000_0001),
        Cause::Interrupt(Interrupt::SupervisorSoft)
    );
    assert_eq!(
        trap::decode(ILLEGAL_INSTRUCTION),
        Cause::Exception(Exception::IllegalInstruction)
    );
    assert_eq!(trap::decode(3), Cause::Exception(Exception::Breakpoint));
    assert_eq!(trap::decode(5), Cause::Exception(Exception::LoadFault));
    assert_eq!(trap::decode(15), Cause::Exception(Exception::StorePageFault));
    assert_eq!(trap::decode(10), Cause::Exception(Exception::Unknown));
    assert_eq!(
        trap::decode(0x8000_0007),
        Cause::Interrupt(Interrupt::Unknown)
    );
}

#[test]
fn cause_encoding_matches_decoding() {
    for bits in [0, 2, 3, 7, 9, 12, 13, 15, 0x8000_0001, 0x8000_0005, 0x8000_0009] {
        assert_eq!(trap::encode(trap::decode(bits)), Some(bits));
    }
    for bits in [10, 14, 24, 0x8000_0003, 0x8000_000b] {
        assert_eq!(trap::encode(trap::decode(bits)), None);
    }
}

#[test]
fn unknown_cause_keeps_the_raw_value() {
    let frame = context(0x8000_000b, 0);
    assert_eq!(frame.cause(), Cause::Interrupt(Interrupt::Unknown));
    assert_eq!(frame.scause(), 0x8000_000b);
}

#[test]
fn synthetic_trap_leaves_context_untouched() {
    let mut recorder = Recorder::default();
    let mut frame = context(ILLEGAL_INSTRUCTION, 0xffff_ffff);
    let saved = frame.clone();

    assert_eq!(trap::dispatch(&mut recorder, &mut frame), Resume::Continue);
    assert_eq!(frame, saved);
    for n in 0..32 {
        assert_eq!(frame.register(n), saved.register(n));
    }
    assert_eq!(recorder.calls, ["illegal 0xffffffff"]);
}

#[test]
fn dispatches_by_cause() {
    let mut recorder = Recorder::default();

    let mut timer = context(SUPERVISOR_TIMER, 0);
    assert_eq!(trap::dispatch(&mut recorder, &mut timer), Resume::Continue);

    let mut fault = context(LOAD_PAGE_FAULT, 0xdead_b000);
    assert_eq!(trap::dispatch(&mut recorder, &mut fault), Resume::Fault);

    let mut ecall = context(9, 0);
    assert_eq!(trap::dispatch(&mut recorder, &mut ecall), Resume::Continue);

    assert_eq!(
        recorder.calls,
        ["timer", "page fault Load 0xdeadb000", "ecall Supervisor"]
    );
}

#[test]
fn unhandled_causes_are_reported() {
    for scause in [0, 1, 2, 3, 5, 7, 8, 9, 12, 13, 15, 24, 0x8000_0001, 0x8000_0005, 0x8000_0009] {
        let mut frame = context(scause, 0);
        assert_eq!(trap::dispatch(&mut Nothing, &mut frame), Resume::Unhandled);
    }
}

#[test]
fn unknown_causes_are_unhandled_even_by_a_busy_handler() {
    let mut recorder = Recorder::default();
    let mut frame = context(0x8000_0003, 0);
    assert_eq!(trap::dispatch(&mut recorder, &mut frame), Resume::Unhandled);
    assert!(recorder.calls.is_empty());
}

#[test]
fn handled_trap_returns() {
    let mut frame = context(SUPERVISOR_TIMER, 0);
    trap::handle(&mut Recorder::default(), &mut frame);
}

#[test]
#[should_panic(expected = "hart frozen")]
fn unhandled_trap_halts() {
    let mut frame = context(ILLEGAL_INSTRUCTION, 0);
    trap::handle(&mut Nothing, &mut frame);
}

#[test]
#[should_panic(expected = "hart frozen")]
fn faulting_trap_halts() {
    let mut frame = context(LOAD_PAGE_FAULT, 0x10);
    trap::handle(&mut Recorder::default(), &mut frame);
}

#[test]
fn breakpoint_handler_can_skip_the_instruction() {
    struct Skip(u16);

    impl TrapHandler for Skip {
        fn breakpoint(&mut self, context: &mut Context) -> Resume {
            context.skip_instruction(instruction_length(self.0));
            Resume::Continue
        }
    }

    let mut frame = context(3, 0);
    trap::handle(&mut Skip(0x9002), &mut frame);
    assert_eq!(frame.ip(), 0x8020_1236);

    trap::handle(&mut Skip(0x0073), &mut frame);
    assert_eq!(frame.ip(), 0x8020_123a);
}

#[test]
fn instruction_lengths() {
    // c.ebreak
    assert_eq!(instruction_length(0x9002), 2);
    // ebreak, low half of 0x00100073
    assert_eq!(instruction_length(0x0073), 4);
    // c.nop
    assert_eq!(instruction_length(0x0001), 2);
}

#[test]
fn register_accessors() {
    let mut frame = context(0, 0);
    assert_eq!(frame.register(0), 0);
    assert_eq!(frame.register(1), 0x1000_0000);
    assert_eq!(frame.sp(), 0x1000_0101);
    assert_eq!(frame.register(31), 0x1000_0000 + 30 * 0x0101);

    frame.set_register(0, 42);
    assert_eq!(frame.register(0), 0);

    frame.set_sp(0x8062_9000);
    frame.set_register(10, 7);
    assert_eq!(frame.register(2), 0x8062_9000);
    assert_eq!(frame.register(10), 7);

    frame.set_ip(0x8020_0000);
    assert_eq!(frame.ip(), 0x8020_0000);
    assert!(frame.status().contains(Status::SPP));
    assert!(!frame.status().contains(Status::SIE));
}

#[test]
fn frame_layout_matches_trap_entry() {
    assert_eq!(core::mem::size_of::<Context>(), 144);
    assert_eq!(core::mem::align_of::<Context>(), 16);
    assert_eq!(Context::SSTATUS_OFFSET, 31 * 4);
    assert_eq!(Context::SEPC_OFFSET, 32 * 4);
    assert_eq!(Context::SCAUSE_OFFSET, 33 * 4);
    assert_eq!(Context::STVAL_OFFSET, 34 * 4);
}
