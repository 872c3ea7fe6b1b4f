//! Diagnostic output for host applications and tests.
//!
//! The library only emits `tracing` events; nothing is printed unless the host
//! installs a subscriber, either its own or one of these.

use tracing::Level;

/// Install a fmt subscriber at INFO. Safe to call more than once.
pub fn init_logging() {
    init_logging_at(Level::INFO);
}

/// Install a fmt subscriber at `level`, e.g. `Level::TRACE` to see zigzag pivots.
///
/// A no-op when a global subscriber is already set.
pub fn init_logging_at(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_init_is_harmless() {
        init_logging();
        init_logging_at(Level::TRACE);
        init_logging();
        tracing::info!("still logging after repeated init");
    }
}
