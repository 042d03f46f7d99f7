//! Tracing Setup
//!
//! Console tracing initialization for the binary. Library code only emits
//! through the `tracing` macros; embedding applications install whatever
//! subscriber fits their deployment.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: `pythd_client=info`)

use tracing_subscriber::EnvFilter;

/// Initialize a console tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to `pythd_client=info`. Calling this more
/// than once is a no-op (the first subscriber wins).
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pythd_client=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
