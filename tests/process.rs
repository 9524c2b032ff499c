use pebble::{
    bump::{AllocError, BumpAllocator},
    guard::CANARY,
    layout::{Region, Role},
    process::{IDLE, SpawnError, SwitchFrame, Table},
};

const PAGE_SIZE: usize = config::PAGE_SIZE;
const PAGES: usize = 16;

#[repr(C, align(4096))]
struct Arena([u8; PAGES * PAGE_SIZE]);

fn allocator(arena: &mut Arena, pages: usize) -> BumpAllocator {
    let base = arena.0.as_mut_ptr() as usize;
    let region = Region::new(Role::AllocatorArena, base, base + pages * PAGE_SIZE);
    // SAFETY: The arena is owned by the test and outlives the allocator.
    unsafe { BumpAllocator::new(region) }
}

#[test]
fn new_table_only_has_the_boot_context() {
    let mut table = Table::new();
    assert_eq!(table.len(), 1);
    assert!(!table.is_empty());
    assert_eq!(table.current(), IDLE);
    assert_eq!(table.get(IDLE).unwrap().stack(), None);
    assert_eq!(table.next_runnable(), None);
    assert!(table.schedule().is_none());
}

#[test]
fn spawn_prepares_an_initial_frame() {
    let mut arena = Box::new(Arena([0xAA; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();

    let pid = table.spawn(&mut allocator, 0x8020_4242).unwrap();
    assert_eq!(pid, 1);

    let process = table.get(pid).unwrap();
    let (base, length) = process.stack().unwrap();
    assert_eq!(length, config::PROCESS_STACK_SIZE);
    assert_eq!(base % PAGE_SIZE, 0);

    let sp = process.sp();
    assert_eq!(sp % 16, 0);
    assert!(sp >= base && sp + core::mem::size_of::<SwitchFrame>() <= base + length);

    // SAFETY: `sp` points to the frame written by `spawn`, inside the arena.
    let frame = unsafe { *(sp as *const SwitchFrame) };
    assert_eq!(frame.ra, 0x8020_4242);
    assert_eq!(frame.s, [0; 12]);
}

#[test]
fn schedules_round_robin_without_the_boot_context() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();
    table.spawn(&mut allocator, 0x1000).unwrap();
    table.spawn(&mut allocator, 0x2000).unwrap();
    table.spawn(&mut allocator, 0x3000).unwrap();

    let order: Vec<_> = (0..7).map(|_| table.schedule().unwrap().to).collect();
    assert_eq!(order, [1, 2, 3, 1, 2, 3, 1]);
    assert_eq!(table.current(), 1);
}

#[test]
fn switch_points_into_the_table() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();
    let pid = table.spawn(&mut allocator, 0x1000).unwrap();
    let initial = table.get(pid).unwrap().sp();

    let switch = table.schedule().unwrap();
    assert_eq!((switch.from, switch.to), (IDLE, pid));

    // SAFETY: The table is alive and has not moved since `schedule`.
    unsafe {
        assert_eq!(*switch.restore_sp, initial);
        *switch.save_sp = 0x8062_8f00;
    }
    assert_eq!(table.get(IDLE).unwrap().sp(), 0x8062_8f00);
}

#[test]
fn lone_process_keeps_running() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();
    table.spawn(&mut allocator, 0x1000).unwrap();

    assert_eq!(table.schedule().map(|switch| switch.to), Some(1));
    assert!(table.schedule().is_none());
    assert_eq!(table.current(), 1);
}

#[test]
fn table_full_does_not_allocate() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();
    for _ in 1..config::MAX_PROCESSES {
        table.spawn(&mut allocator, 0x1000).unwrap();
    }
    assert_eq!(table.len(), config::MAX_PROCESSES);

    let cursor = allocator.cursor();
    assert_eq!(
        table.spawn(&mut allocator, 0x1000),
        Err(SpawnError::TableFull)
    );
    assert_eq!(allocator.cursor(), cursor);
}

#[test]
fn stack_allocation_failure_is_reported() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, 1);
    let mut table = Table::new();

    assert_eq!(
        table.spawn(&mut allocator, 0x1000),
        Err(SpawnError::Stack(AllocError::OutOfMemory {
            requested: config::PROCESS_STACK_SIZE,
            remaining: PAGE_SIZE
        }))
    );
    assert_eq!(table.len(), 1);
}

#[test]
fn spawn_paints_a_canary_at_the_stack_bottom() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();
    let pid = table.spawn(&mut allocator, 0x1000).unwrap();

    let (base, _) = table.get(pid).unwrap().stack().unwrap();
    for offset in (0..config::PROCESS_STACK_CANARY_SIZE).step_by(4) {
        // SAFETY: The address lies inside the stack, inside the arena.
        assert_eq!(unsafe { *((base + offset) as *const u32) }, CANARY);
    }
    assert_eq!(table.get(pid).unwrap().stack_damage(), None);

    // The boot context has no canary and is never reported.
    assert_eq!(table.check_current(), Ok(()));
    table.schedule().unwrap();
    assert_eq!(table.check_current(), Ok(()));
}

#[test]
fn stack_overflow_is_reported_for_the_current_process() {
    let mut arena = Box::new(Arena([0; PAGES * PAGE_SIZE]));
    let mut allocator = allocator(&mut arena, PAGES);
    let mut table = Table::new();
    let first = table.spawn(&mut allocator, 0x1000).unwrap();
    let second = table.spawn(&mut allocator, 0x2000).unwrap();

    // The second stack overflows down into its canary.
    let (base, _) = table.get(second).unwrap().stack().unwrap();
    let top = base + config::PROCESS_STACK_CANARY_SIZE;
    for address in [top - 4, top - 8] {
        // SAFETY: The address lies inside the canary, inside the arena.
        unsafe { core::ptr::write_volatile(address as *mut u32, 0) };
    }
    assert_eq!(table.get(second).unwrap().stack_damage(), Some(top - 4));
    assert_eq!(table.get(first).unwrap().stack_damage(), None);

    assert_eq!(table.schedule().unwrap().to, first);
    assert_eq!(table.check_current(), Ok(()));
    assert_eq!(table.schedule().unwrap().to, second);
    assert_eq!(table.check_current(), Err(top - 4));
}
