use crate::process::SwitchFrame;

core::arch::global_asm!(
    include_str!("asm/switch.asm"),
    FRAME_SIZE = const core::mem::size_of::<SwitchFrame>(),
);

unsafe extern "C" {
    fn switch_stack(save_sp: *mut usize, restore_sp: *const usize);
}

/// Save the callee-saved registers of the caller on its stack, store its
/// stack pointer into `save_sp`, then restore the registers saved on the
/// stack pointed to by `*restore_sp` and return there. The call returns in
/// the caller once another switch restores the saved stack pointer.
///
/// # Safety
/// `save_sp` must be valid for writes. `*restore_sp` must point to a
/// [`SwitchFrame`] written by a previous switch or crafted for a process
/// that has never run, on a stack that nothing else uses.
pub unsafe fn switch(save_sp: *mut usize, restore_sp: *const usize) {
    // SAFETY: Guaranteed by the caller.
    unsafe { switch_stack(save_sp, restore_sp) };
}
