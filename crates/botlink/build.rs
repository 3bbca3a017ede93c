fn main() {
    for (var, key) in [
        ("TARGET", "BOTLINK_BUILD_TARGET"),
        ("PROFILE", "BOTLINK_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
