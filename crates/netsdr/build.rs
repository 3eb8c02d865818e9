fn main() {
    for (from, to) in [("TARGET", "NETSDR_BUILD_TARGET"), ("PROFILE", "NETSDR_BUILD_PROFILE")] {
        if let Ok(value) = std::env::var(from) {
            println!("cargo:rustc-env={to}={value}");
        }
        println!("cargo:rerun-if-env-changed={from}");
    }
}
