//! Compiles the V-USB driver for AVR builds.
//!
//! V-USB is not vendored. Point `VUSB_DIR` at the `usbdrv/` directory of a
//! V-USB release; our `usbdrv/usbconfig.h` is placed ahead of it on the
//! include path.

use std::env;
use std::path::PathBuf;

const SOURCES: [&str; 3] = ["usbdrv.c", "usbdrvasm.S", "oddebug.c"];

fn main() {
    println!("cargo:rerun-if-changed=usbdrv/usbconfig.h");
    println!("cargo:rerun-if-env-changed=VUSB_DIR");

    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() != Ok("avr") {
        return;
    }

    let vusb = PathBuf::from(
        env::var("VUSB_DIR").expect("VUSB_DIR must point at V-USB's usbdrv directory"),
    );

    let mut build = cc::Build::new();
    build
        .compiler("avr-gcc")
        .flag("-mmcu=attiny85")
        .flag("-Os")
        .define("F_CPU", "16500000UL")
        .include("usbdrv")
        .include(&vusb);
    for source in SOURCES {
        let path = vusb.join(source);
        println!("cargo:rerun-if-changed={}", path.display());
        build.file(path);
    }
    build.compile("usbdrv");
}
