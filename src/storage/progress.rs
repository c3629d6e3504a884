//! Upload progress reporting

use super::ProgressCallback;

/// Forwards progress to an optional callback
///
/// Values are clamped to [0, 100] and never go backwards.
pub struct ProgressTracker<'a> {
    callback: Option<ProgressCallback<'a>>,
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker around an optional callback
    pub fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self { callback, last: 0 }
    }

    /// Report a percentage
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        if let Some(callback) = self.callback.as_mut() {
            callback(percent);
        }
    }

    /// Report `done` out of `total` steps
    pub fn report_steps(&mut self, done: usize, total: usize) {
        if total == 0 {
            self.report(100);
            return;
        }
        let percent = done.min(total) * 100 / total;
        self.report(percent as u8);
    }

    /// Last reported percentage
    pub fn last(&self) -> u8 {
        self.last
    }
}
