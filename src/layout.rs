//! The physical memory layout of the kernel.
//!
//! The layout is decided at link time and never changes afterwards. At boot,
//! the architecture code reads the boundaries exported by the linker script,
//! builds a [`Layout`] from them and validates it once: after that, the rest
//! of the kernel can trust every region it is handed.
use crate::utils::align::is_aligned;
use core::fmt;

/// The role of a memory region. The declaration order is also the order of
/// the regions in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// Kernel code, starting with the boot stub.
    Code,

    /// Read-only data.
    ReadOnlyData,

    /// Initialized writable data.
    Data,

    /// Zero-initialized writable data, cleared by the boot path.
    Bss,

    /// The arena backing the bump allocator.
    AllocatorArena,

    /// The guard region immediately below the kernel stack.
    StackGuard,

    /// The kernel stack, growing down from its end.
    Stack,

    /// Memory left for general use.
    FreeRam,
}

impl Role {
    /// The number of roles, and therefore of regions in a layout.
    pub const COUNT: usize = 8;

    /// All roles, in memory order.
    pub const ALL: [Role; Self::COUNT] = [
        Role::Code,
        Role::ReadOnlyData,
        Role::Data,
        Role::Bss,
        Role::AllocatorArena,
        Role::StackGuard,
        Role::Stack,
        Role::FreeRam,
    ];

    /// The minimum alignment of both boundaries of a region with this role.
    /// Regions that are handed out page by page (or that must be page
    /// granular to be protected one day) are page aligned, the others only
    /// need to be word aligned.
    #[must_use]
    pub const fn alignment(self) -> usize {
        match self {
            Role::Code | Role::ReadOnlyData | Role::Data | Role::Bss => 4,
            Role::AllocatorArena | Role::StackGuard | Role::Stack | Role::FreeRam => {
                config::PAGE_SIZE
            }
        }
    }

    /// Whether the end of the region must also be aligned. The end of the
    /// image sections is whatever the linker produced.
    #[must_use]
    pub const fn end_aligned(self) -> bool {
        self.alignment() == config::PAGE_SIZE
    }

    /// Whether a region with this role must contain at least one byte for
    /// the kernel to work.
    #[must_use]
    pub const fn required(self) -> bool {
        matches!(self, Role::Code | Role::AllocatorArena | Role::Stack)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Code => "code",
            Role::ReadOnlyData => "rodata",
            Role::Data => "data",
            Role::Bss => "bss",
            Role::AllocatorArena => "allocator",
            Role::StackGuard => "stack guard",
            Role::Stack => "stack",
            Role::FreeRam => "free ram",
        };
        f.pad(name)
    }
}

/// A contiguous span `[base, end)` of physical memory with a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub role: Role,
    pub base: usize,
    pub end: usize,
}

impl Region {
    /// Create a new region. The region is not checked: an inverted region
    /// is reported when it is validated as part of a [`Layout`].
    #[must_use]
    pub const fn new(role: Role, base: usize, end: usize) -> Self {
        Self { role, base, end }
    }

    /// Return the length of the region in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.base)
    }

    /// Returns `true` if the region does not contain any byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `address` is inside the region.
    #[must_use]
    pub const fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end
    }

    /// Returns `true` if the two regions share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && self.base < other.end && other.base < self.end
    }

    /// Return a pointer to the first byte of the region.
    #[must_use]
    pub const fn as_mut_ptr(&self) -> *mut u8 {
        self.base as *mut u8
    }
}

/// An error found while validating a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// The region ends before it starts.
    Inverted(Role),

    /// A boundary of the region is not aligned to what its role requires.
    Misaligned { role: Role, address: usize },

    /// The region overlaps with the region that precedes it, or the two
    /// are not in the expected order.
    Overlap(Role, Role),

    /// The region is not entirely inside RAM.
    OutsideRam(Role),

    /// The region is empty but the kernel cannot work without it.
    Empty(Role),

    /// The region does not have the size the kernel was configured with.
    UnexpectedSize { role: Role, expected: usize, found: usize },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Inverted(role) => write!(f, "{role} region ends before it starts"),
            LayoutError::Misaligned { role, address } => {
                write!(f, "{role} region boundary {address:#x} is misaligned")
            }
            LayoutError::Overlap(previous, next) => {
                write!(f, "{previous} region overlaps with {next} region")
            }
            LayoutError::OutsideRam(role) => write!(f, "{role} region is outside of RAM"),
            LayoutError::Empty(role) => write!(f, "{role} region is empty"),
            LayoutError::UnexpectedSize { role, expected, found } => write!(
                f,
                "{role} region is {found:#x} bytes long instead of {expected:#x}"
            ),
        }
    }
}

/// The validated memory layout of the kernel: one region per [`Role`], in
/// memory order, all inside RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    regions: [Region; Role::COUNT],
    ram: (usize, usize),
}

impl Layout {
    /// Build a layout from the given regions, indexed by role, and the RAM
    /// bounds `[ram_start, ram_end)`. Every region is checked against the
    /// rules of its role, then against its neighbours and the RAM bounds.
    ///
    /// # Errors
    /// Returns the first rule violation found, in memory order. A region
    /// whose role does not match its slot is reported as an overlap, since
    /// the regions would then not be in memory order.
    pub fn new(
        regions: [Region; Role::COUNT],
        ram_start: usize,
        ram_end: usize,
    ) -> Result<Self, LayoutError> {
        for (index, region) in regions.iter().enumerate() {
            if region.role.index() != index {
                return Err(LayoutError::Overlap(Role::ALL[index], region.role));
            }
            Self::check_region(region)?;
        }

        for pair in regions.windows(2) {
            if pair[0].end > pair[1].base {
                return Err(LayoutError::Overlap(pair[0].role, pair[1].role));
            }
        }

        if let Some(region) = regions
            .iter()
            .find(|region| region.base < ram_start || region.end > ram_end)
        {
            return Err(LayoutError::OutsideRam(region.role));
        }

        Ok(Self {
            regions,
            ram: (ram_start, ram_end),
        })
    }

    fn check_region(region: &Region) -> Result<(), LayoutError> {
        let role = region.role;
        if region.end < region.base {
            return Err(LayoutError::Inverted(role));
        }
        if !is_aligned(region.base, role.alignment()) {
            return Err(LayoutError::Misaligned {
                role,
                address: region.base,
            });
        }
        if role.end_aligned() && !is_aligned(region.end, role.alignment()) {
            return Err(LayoutError::Misaligned {
                role,
                address: region.end,
            });
        }
        if role.required() && region.is_empty() {
            return Err(LayoutError::Empty(role));
        }
        Ok(())
    }

    /// Check that the region with the given role is exactly `expected`
    /// bytes long.
    ///
    /// # Errors
    /// Returns [`LayoutError::UnexpectedSize`] if the size differs.
    pub fn expect_size(&self, role: Role, expected: usize) -> Result<(), LayoutError> {
        let found = self.region(role).len();
        if found == expected {
            Ok(())
        } else {
            Err(LayoutError::UnexpectedSize {
                role,
                expected,
                found,
            })
        }
    }

    /// Return the region with the given role.
    #[must_use]
    pub const fn region(&self, role: Role) -> Region {
        self.regions[role.index()]
    }

    /// Return all the regions, in memory order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// The first address of the kernel image.
    #[must_use]
    pub const fn kernel_base(&self) -> usize {
        self.region(Role::Code).base
    }

    /// The zero-initialized data the boot path must clear.
    #[must_use]
    pub const fn bss(&self) -> Region {
        self.region(Role::Bss)
    }

    /// The arena backing the bump allocator.
    #[must_use]
    pub const fn arena(&self) -> Region {
        self.region(Role::AllocatorArena)
    }

    /// The guard region below the kernel stack.
    #[must_use]
    pub const fn stack_guard(&self) -> Region {
        self.region(Role::StackGuard)
    }

    /// The kernel stack.
    #[must_use]
    pub const fn stack(&self) -> Region {
        self.region(Role::Stack)
    }

    /// The initial stack pointer: the end of the stack region.
    #[must_use]
    pub const fn stack_top(&self) -> usize {
        self.stack().end
    }

    /// The memory left for general use.
    #[must_use]
    pub const fn free_ram(&self) -> Region {
        self.region(Role::FreeRam)
    }

    /// The RAM bounds the layout was validated against.
    #[must_use]
    pub const fn ram(&self) -> (usize, usize) {
        self.ram
    }

    /// The first address after the last region.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.region(Role::FreeRam).end
    }

    /// Returns `true` if every region lies inside `[start, end)`.
    #[must_use]
    pub const fn fits_in(&self, start: usize, end: usize) -> bool {
        self.kernel_base() >= start && self.end() <= end
    }

    /// Print the layout to the kernel log.
    pub fn log(&self) {
        for region in self.regions() {
            log::info!(
                "{:<12} {:#010x} - {:#010x} ({} KiB)",
                region.role,
                region.base,
                region.end,
                region.len() / 1024
            );
        }
    }
}
