//! Progress reporting and cooperative cancellation.

use super::{BuildError, BuildState};

/// Receives build progress and may ask for the build to stop.
///
/// Any `FnMut(&str, &str, f32) -> bool` closure works as a progress sink; it
/// receives a title, a message and the completed fraction in `[0, 1]`, and
/// returns `true` to cancel.
pub trait BuildProgress {
    /// Returns `true` to cancel the build.
    fn report(&mut self, title: &str, message: &str, progress: f32) -> bool;
}

impl<F> BuildProgress for F
where
    F: FnMut(&str, &str, f32) -> bool,
{
    fn report(&mut self, title: &str, message: &str, progress: f32) -> bool {
        self(title, message, progress)
    }
}

/// Progress sink that ignores reports and never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl BuildProgress for NoProgress {
    fn report(&mut self, _title: &str, _message: &str, _progress: f32) -> bool {
        false
    }
}

/// Counts completed tasks against a precomputed total.
pub(crate) struct ProgressTracker<'p> {
    progress: &'p mut dyn BuildProgress,
    title: String,
    total: usize,
    done: usize,
}

impl<'p> ProgressTracker<'p> {
    pub(crate) fn new(progress: &'p mut dyn BuildProgress, title: String, total: usize) -> Self {
        Self {
            progress,
            title,
            total: total.max(1),
            done: 0,
        }
    }

    /// Reports the start of the next task.
    ///
    /// Cancellation is only polled here, between tasks.
    pub(crate) fn step(&mut self, state: BuildState, message: &str) -> Result<(), BuildError> {
        let fraction = self.done as f32 / self.total as f32;
        self.done += 1;
        if self.progress.report(&self.title, message, fraction) {
            return Err(BuildError::Cancelled { state });
        }
        Ok(())
    }

    pub(crate) fn done(&self) -> usize {
        self.done
    }
}
