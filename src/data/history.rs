//! Message rate tracking across polling cycles.

use std::collections::VecDeque;

use piaware_types::AircraftFeed;

/// Maximum number of samples to keep.
const MAX_HISTORY_SIZE: usize = 60;

/// One reading of the decoder's message counter.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    /// Receiver clock, Unix seconds.
    now: f64,
    messages: u64,
}

/// Tracks the decoder's cumulative message counter to derive messages/s.
///
/// The counter in `aircraft.json` only ever grows while the decoder runs; a
/// smaller value means it restarted, which discards the history.
#[derive(Debug, Clone, Default)]
pub struct MessageRate {
    samples: VecDeque<Sample>,
}

impl MessageRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the counter from a fresh `aircraft.json`.
    pub fn record(&mut self, feed: &AircraftFeed) {
        let sample = Sample {
            now: feed.now,
            messages: feed.messages,
        };

        if let Some(last) = self.samples.back() {
            if sample.messages < last.messages {
                self.samples.clear();
            } else if sample.now <= last.now {
                // Same document served twice.
                return;
            }
        }

        self.samples.push_back(sample);
        if self.samples.len() > MAX_HISTORY_SIZE {
            self.samples.pop_front();
        }
    }

    /// Messages per second between the two most recent samples.
    ///
    /// Returns None if there's not enough history to calculate a rate.
    pub fn per_second(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let current = self.samples.back()?;
        let previous = self.samples.get(self.samples.len() - 2)?;

        let elapsed = current.now - previous.now;
        if elapsed > 0.0 {
            Some((current.messages - previous.messages) as f64 / elapsed)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
