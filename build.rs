use std::fs;

fn main() {
    // The worker generation tag is baked in at build time. Cache store names
    // are derived from it, so bumping WORKER_VERSION retires every old store.
    let version = match fs::read_to_string("WORKER_VERSION") {
        Ok(contents) => contents.trim().to_string(),
        Err(_) => env!("CARGO_PKG_VERSION").to_string(),
    };

    if version.is_empty() || version.chars().any(char::is_whitespace) {
        panic!(
            "\n\n\
            ❌ INVALID WORKER VERSION: {:?}\n\
            WORKER_VERSION must hold a single non-empty tag, e.g. 1.0.0\n\n",
            version
        );
    }

    println!("cargo:rustc-env=OFFLINE_KIT_WORKER_VERSION={}", version);
    println!("cargo:rerun-if-changed=WORKER_VERSION");
}
