use pebble::{
    guard::{CANARY, StackGuard},
    layout::{Region, Role},
};

const WORDS: usize = 64;

fn guard(memory: &mut [u32; WORDS]) -> StackGuard {
    let base = memory.as_mut_ptr() as usize;
    let region = Region::new(Role::StackGuard, base, base + WORDS * 4);
    // SAFETY: The memory is owned by the test and outlives the guard.
    unsafe { StackGuard::new(region) }
}

#[test]
fn armed_guard_is_intact() {
    let mut memory = [0u32; WORDS];
    let guard = guard(&mut memory);
    assert!(!guard.intact());

    guard.arm();
    assert!(guard.intact());
    assert_eq!(guard.damage(), None);
    assert!(memory.iter().all(|&word| word == CANARY));
}

#[test]
fn reports_highest_damaged_word() {
    let mut memory = [0u32; WORDS];
    let guard = guard(&mut memory);
    guard.arm();

    // An overflow writes down from the top of the guard.
    let top = guard.region().end;
    for word in 1..=5 {
        // SAFETY: The address lies inside `memory`.
        unsafe { core::ptr::write_volatile((top - word * 4) as *mut u32, 0) };
    }
    // A stray write further down.
    // SAFETY: Same as above.
    unsafe { core::ptr::write_volatile((guard.region().base + 8) as *mut u32, 1) };

    assert!(!guard.intact());
    assert_eq!(guard.damage(), Some(top - 4));
}

#[test]
fn empty_guard_is_always_intact() {
    // SAFETY: The region is empty, so nothing is ever read or written.
    let guard = unsafe { StackGuard::new(Region::new(Role::StackGuard, 0x1000, 0x1000)) };
    guard.arm();
    assert!(guard.intact());
}
