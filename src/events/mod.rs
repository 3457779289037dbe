//! # Events Module
//!
//! Progress reporting for whatever is driving the pipeline.
//!
//! ## Design
//! The pipeline takes a `&dyn ProgressReporter` and calls it at fixed
//! checkpoints. A closure is enough for simple callers; UIs that render
//! on their own thread use an [`EventChannel`] and pass the sender.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Progress(p) = event {
//!             println!("{}/{} {}", p.current, p.total, p.message);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_progress(&sender)?;
//! ```

mod channel;
mod reporter;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender};
pub use reporter::{NullReporter, ProgressReporter};
pub use types::*;
