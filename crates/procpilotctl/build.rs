// Build script for procpilotctl - embeds version at compile time

fn main() {
    // Release builds may pin the version from the environment
    let version = std::env::var("PROCPILOT_VERSION")
        .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=PROCPILOT_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=PROCPILOT_VERSION");
}
