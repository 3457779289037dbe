//! # Image Grouper
//!
//! Groups a folder of images by visual similarity and copies each group
//! into its own directory.
//!
//! ## How it works
//! - Every image gets a fingerprint: a 64-bit perceptual hash, or an
//!   embedding from a pretrained vision model
//! - Images are clustered greedily; each group is anchored on the first
//!   image that started it
//! - Groups land in `Group_<name>` directories, everything else in `Unique`
//! - Source files are only ever read, never moved or deleted
//!
//! ## Architecture
//! - `core` - The grouping engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types per phase

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{GrouperError, Result};

/// Initialize tracing for the library
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks between `debug`
/// and `warn`. Call once from the application entry point.
pub fn init_tracing(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
