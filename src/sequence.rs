//! # Sequence Tracking
//!
//! Detects readings the bridge missed between two validated frames.
//!
//! Gap detection is observability only: every validated reading is processed,
//! including repeated or decreasing sequence numbers (the device counter wraps
//! and restarts after a reset).

use tracing::warn;

/// Tracks the sequence number of the last accepted reading.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last: Option<u8>,
}

impl SequenceTracker {
    /// Creates a tracker that has not seen any reading yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the last accepted reading, if any.
    #[must_use]
    pub fn last(&self) -> Option<u8> {
        self.last
    }

    /// Records an accepted reading's sequence number.
    ///
    /// # Returns
    ///
    /// * `Option<u32>` - Number of readings missed since the previous one, when
    ///   the new number skips ahead of `last + 1`
    ///
    /// # Examples
    ///
    /// ```
    /// use emporia_vue::sequence::SequenceTracker;
    ///
    /// let mut tracker = SequenceTracker::new();
    /// assert_eq!(tracker.observe(5), None);
    /// assert_eq!(tracker.observe(10), Some(4));
    /// assert_eq!(tracker.last(), Some(10));
    /// ```
    pub fn observe(&mut self, sequence_num: u8) -> Option<u32> {
        let missed = self.last.and_then(|last| {
            let (current, last) = (u32::from(sequence_num), u32::from(last));
            (current > last + 1).then(|| current - last - 1)
        });

        if let Some(count) = missed {
            warn!(
                "Detected {} missing reading(s), data may not be accurate!",
                count
            );
        }

        self.last = Some(sequence_num);
        missed
    }
}
