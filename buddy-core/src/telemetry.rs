//! Tracing setup for binaries and tests that embed the engine.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter used when `RUST_LOG` is unset: engine summaries at info,
/// per-stage resolver counts stay quiet.
pub const DEFAULT_FILTER: &str =
    "info,buddy_core::resolver=info,buddy_core::sync=info";

/// Install a global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns `false` when a subscriber was already installed, which happens
/// when several tests or an embedding binary initialize first.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
