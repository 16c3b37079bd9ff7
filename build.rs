/// surfacelayer build script.
///
/// The crate builds on every host so the test suite can run against the
/// in-crate fake runtime. Only Android targets link against the NDK.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "android" {
        return;
    }

    // ANativeWindow_fromSurface / ANativeWindow_release live in libandroid.so.
    println!("cargo:rustc-link-lib=android");
}
