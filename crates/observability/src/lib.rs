//! Tracing and logging setup shared by the binaries.

pub mod subscriber;

/// Initialize logging, falling back to `default_level` when `RUST_LOG` is unset.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init_with_default(default_level: &str) {
    subscriber::init(default_level);
}
