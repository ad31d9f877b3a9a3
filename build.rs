//! Build script for matrix-envoy: linker setup for the firmware demo.

use std::{env, fs, path::PathBuf};

// Raspberry Pi Pico (RP2040): 2 MiB flash behind a 256-byte second-stage bootloader.
const MEMORY_X_PICO1: &str = "MEMORY {
    BOOT2 : ORIGIN = 0x10000000, LENGTH = 0x100
    FLASH : ORIGIN = 0x10000100, LENGTH = 2048K - 0x100
    RAM   : ORIGIN = 0x20000000, LENGTH = 256K
}
";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target = env::var("TARGET").unwrap_or_default();
    if !target.starts_with("thumbv6m") {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out_dir.join("memory.x"), MEMORY_X_PICO1).expect("Failed to write memory.x");
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Only the firmware binary links against the device runtime.
    for arg in ["--nmagic", "-Tlink.x", "-Tlink-rp.x", "-Tdefmt.x"] {
        println!("cargo:rustc-link-arg-bins={arg}");
    }
}
