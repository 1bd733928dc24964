//! Feature-gated tracing support.
//!
//! With the `tracing` feature enabled this re-exports the tracing
//! crate's macros for use at instrumentation sites; call sites are
//! themselves gated on the feature, so a default build carries no
//! tracing code at all.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, trace, trace_span, Level, Span};

/// Install a stderr subscriber honoring `RUST_LOG`.
///
/// Intended for tests and development binaries; repeated calls are
/// harmless.
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false),
        )
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {}
