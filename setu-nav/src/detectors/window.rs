//! Fixed-length sample ring buffer with a running sum

use std::collections::VecDeque;

/// The last N samples and their running average
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
    sum: f32,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    /// Append a sample, evicting the oldest when full; returns the new average
    pub fn push(&mut self, sample: f32) -> f32 {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
        self.sum / self.samples.len() as f32
    }

    /// Mean of the buffered samples, `None` when empty
    pub fn average(&self) -> Option<f32> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.sum / self.samples.len() as f32)
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }
}
