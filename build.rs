use std::{env, fs, path::PathBuf};

/// Values substituted into the linker script template. They all come from
/// the `config` crate, whose compile-time assertions already rejected any
/// configuration that would overlap or overflow RAM.
const SUBSTITUTIONS: &[(&str, usize)] = &[
    ("@RAM_BASE@", config::RAM_BASE),
    ("@RAM_SIZE@", config::RAM_SIZE),
    ("@KERNEL_BASE@", config::KERNEL_BASE),
    ("@KERNEL_IMAGE_SIZE@", config::KERNEL_IMAGE_SIZE),
    ("@PAGE_SIZE@", config::PAGE_SIZE),
    ("@ALLOCATOR_ARENA_SIZE@", config::ALLOCATOR_ARENA_SIZE),
    ("@STACK_GUARD_SIZE@", config::STACK_GUARD_SIZE),
    ("@KERNEL_STACK_SIZE@", config::KERNEL_STACK_SIZE),
    ("@FREE_RAM_SIZE@", config::FREE_RAM_SIZE),
];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let script = SUBSTITUTIONS.iter().fold(
        String::from(include_str!("src/arch/riscv32/config/link.ld")),
        |script, (key, value)| script.replace(key, &format!("{value:#x}")),
    );
    assert!(
        !script.contains('@'),
        "Unsubstituted placeholder left in the linker script"
    );

    fs::write(out_dir.join("link.ld"), script).unwrap();
    println!("cargo:rustc-link-search={}", out_dir.display());

    // The linker script only makes sense for the kernel image: host builds
    // (used to run the test suite) link normally.
    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("riscv32") {
        println!("cargo:rustc-link-arg-bins=-Tlink.ld");
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/arch/riscv32/config/link.ld");
}
