/*!
 * Monotonic progress over a translation run.
 */

/// Largest share of a batch's slots reported before the batch completes
const MAX_BATCH_SHARE: f64 = 0.95;

/// Callback receiving the overall progress in `[0, 1]`
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Tracks progress as translated slots over total slots.
///
/// Inside a batch the estimate follows the tokens received so far against
/// what the batch is expected to produce. Reported values never decrease and
/// never exceed 1.
pub struct ProgressTracker {
    total_units: usize,
    translated_units: usize,
    buffer_ratio: f64,
    reported: f64,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total_units: usize, buffer_ratio: f64) -> Self {
        Self {
            total_units,
            translated_units: 0,
            buffer_ratio,
            reported: 0.0,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Slots translated so far
    pub fn translated_units(&self) -> usize {
        self.translated_units
    }

    /// Last reported value
    pub fn value(&self) -> f64 {
        self.reported
    }

    /// Add slots to the total, e.g. when entities are requeued for refinement
    pub fn extend_total(&mut self, units: usize) {
        self.total_units += units;
    }

    /// Refine the estimate while a batch streams in
    pub fn on_partial(&mut self, received_tokens: usize, expected_tokens: usize, batch_units: usize) {
        if self.total_units == 0 {
            return;
        }
        let budget = expected_tokens as f64 * (1.0 + self.buffer_ratio);
        let streamed = if budget > 0.0 { received_tokens as f64 / budget } else { 0.0 };
        let share = batch_units as f64 / self.total_units as f64 * MAX_BATCH_SHARE;
        self.report(self.base() + streamed.min(share));
    }

    /// Record a finished batch; failed batches still advance the position
    pub fn on_batch_done(&mut self, batch_units: usize) {
        self.translated_units += batch_units;
        let base = self.base();
        self.report(base);
    }

    /// Mark the run complete
    pub fn finish(&mut self) {
        self.report(1.0);
    }

    fn base(&self) -> f64 {
        if self.total_units == 0 {
            return 1.0;
        }
        self.translated_units as f64 / self.total_units as f64
    }

    fn report(&mut self, value: f64) {
        let value = value.clamp(0.0, 1.0);
        if value <= self.reported {
            return;
        }
        self.reported = value;
        if let Some(callback) = &self.callback {
            callback(value);
        }
    }
}
