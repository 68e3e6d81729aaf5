use std::env;

fn main() {
    // Tell Cargo to rerun if the linker script changes
    println!("cargo:rerun-if-changed=kernel.ld");

    // Only the bare-metal riscv32 image is linked with the kernel layout;
    // host builds (tests, benches) use the platform default.
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let bare_metal = env::var_os("CARGO_FEATURE_BARE_METAL").is_some();
    if arch == "riscv32" && bare_metal {
        let dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
        println!("cargo:rustc-link-arg-bins=-T{}/kernel.ld", dir);
    }
}
