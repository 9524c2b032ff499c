use pebble::arch::{log, target};

// Both reports live in one test: the console is shared by the whole binary.
#[test]
fn panic_report_reaches_the_console_without_a_logger() {
    let location = core::panic::Location::caller();
    log::report_panic(Some(location), &"arena exhausted");
    let output = target::log::take();
    assert!(output.starts_with(log::prefix(::log::Level::Error)));
    assert!(output.ends_with(&format!(
        " Kernel panic at {}:{}: arena exhausted\n",
        location.file(),
        location.line()
    )));

    log::report_panic(None, &format_args!("bad frame {:#x}", 0x10));
    let output = target::log::take();
    assert!(output.ends_with(" Kernel panic: bad frame 0x10\n"));
    assert!(target::log::take().is_empty());
}
