use crate::layout::{Layout, LayoutError, Region, Role};

unsafe extern "C" {
    static __kernel_base: [u8; 0];
    static __text_end: [u8; 0];
    static __rodata: [u8; 0];
    static __rodata_end: [u8; 0];
    static __data: [u8; 0];
    static __data_end: [u8; 0];
    static __bss: [u8; 0];
    static __bss_end: [u8; 0];
    static __allocator_mem: [u8; 0];
    static __allocator_mem_end: [u8; 0];
    static __stack_guard: [u8; 0];
    static __stack_guard_end: [u8; 0];
    static __stack_bottom: [u8; 0];
    static __stack_top: [u8; 0];
    static __free_ram: [u8; 0];
    static __free_ram_end: [u8; 0];
}

/// Get the address of a linker symbol.
macro_rules! symbol {
    ($name:ident) => {
        // SAFETY: Only the address of the symbol is taken, it is never read.
        unsafe { core::ptr::addr_of!($name) as usize }
    };
}

/// Build the layout the kernel was linked with from the symbols exported by
/// the linker script, and check it against the configuration.
///
/// # Errors
/// Returns an error if the symbols do not describe a valid layout, or if a
/// region does not have the size the configuration asks for.
pub fn linked_layout() -> Result<Layout, LayoutError> {
    let regions = [
        Region::new(Role::Code, symbol!(__kernel_base), symbol!(__text_end)),
        Region::new(Role::ReadOnlyData, symbol!(__rodata), symbol!(__rodata_end)),
        Region::new(Role::Data, symbol!(__data), symbol!(__data_end)),
        Region::new(Role::Bss, symbol!(__bss), symbol!(__bss_end)),
        Region::new(
            Role::AllocatorArena,
            symbol!(__allocator_mem),
            symbol!(__allocator_mem_end),
        ),
        Region::new(
            Role::StackGuard,
            symbol!(__stack_guard),
            symbol!(__stack_guard_end),
        ),
        Region::new(Role::Stack, symbol!(__stack_bottom), symbol!(__stack_top)),
        Region::new(Role::FreeRam, symbol!(__free_ram), symbol!(__free_ram_end)),
    ];

    let layout = Layout::new(regions, config::RAM_BASE, config::RAM_BASE + config::RAM_SIZE)?;
    layout.expect_size(Role::AllocatorArena, config::ALLOCATOR_ARENA_SIZE)?;
    layout.expect_size(Role::StackGuard, config::STACK_GUARD_SIZE)?;
    layout.expect_size(Role::Stack, config::KERNEL_STACK_SIZE)?;
    layout.expect_size(Role::FreeRam, config::FREE_RAM_SIZE)?;
    Ok(layout)
}

/// Check that one of the RAM regions reported by the device tree contains
/// the whole layout.
///
/// # Errors
/// Returns the bounds of the last RAM region examined if none contains the
/// layout, or `(0, 0)` if the device tree reports no RAM at all.
pub fn check_ram(device_tree: &fdt::Fdt, layout: &Layout) -> Result<(), (usize, usize)> {
    let mut reported = (0, 0);
    for region in device_tree.memory().regions() {
        let start = region.starting_address as usize;
        let end = start.saturating_add(region.size.unwrap_or(0));
        ::log::info!("Firmware reports RAM at {:#010x} - {:#010x}", start, end);

        if layout.fits_in(start, end) {
            return Ok(());
        }
        reported = (start, end);
    }
    Err(reported)
}
