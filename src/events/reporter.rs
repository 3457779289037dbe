//! The progress sink handed to the pipeline.

use super::{Event, EventSender, PipelineEvent, ProgressUpdate};

/// Receives `(current, total, message)` checkpoints from the pipeline.
///
/// Called synchronously from whichever thread reached the checkpoint,
/// so implementations must be cheap and must not panic. Rendering is
/// the caller's business.
pub trait ProgressReporter: Send + Sync {
    /// A progress checkpoint
    fn report(&self, current: usize, total: usize, message: &str);

    /// Pipeline lifecycle notifications. Ignored unless overridden.
    fn pipeline(&self, _event: PipelineEvent) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    fn report(&self, current: usize, total: usize, message: &str) {
        self(current, total, message)
    }
}

impl ProgressReporter for EventSender {
    fn report(&self, current: usize, total: usize, message: &str) {
        self.send(Event::Progress(ProgressUpdate {
            current,
            total,
            message: message.to_string(),
        }));
    }

    fn pipeline(&self, event: PipelineEvent) {
        self.send(Event::Pipeline(event));
    }
}

/// Discards every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _current: usize, _total: usize, _message: &str) {}
}
