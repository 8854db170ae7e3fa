//! Sustained-heat detection.
//!
//! Each city keeps a window of its two most recent temperatures. When both
//! are strictly above the threshold an [`AlertEvent`] is produced. There is
//! no cooldown: every observation that leaves two hot readings in the window
//! produces another event.

use std::collections::{HashMap, VecDeque};

use crate::model::AlertEvent;

/// Number of consecutive readings that must exceed the threshold.
pub const WINDOW_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// Fewer than two readings, or at least one at or below the threshold.
    Idle,
    Armed,
}

#[derive(Debug)]
pub struct AlertDetector {
    threshold: f64,
    windows: HashMap<String, VecDeque<f64>>,
}

impl AlertDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, windows: HashMap::new() }
    }

    /// Record a temperature for `city` and return an alert if the window is armed.
    pub fn observe(&mut self, city: &str, temperature: f64) -> Option<AlertEvent> {
        let window = self.windows.entry(city.to_string()).or_default();

        window.push_back(temperature);
        while window.len() > WINDOW_CAPACITY {
            window.pop_front();
        }

        match self.state(city) {
            AlertState::Armed => Some(AlertEvent::new(city, self.threshold)),
            AlertState::Idle => None,
        }
    }

    pub fn state(&self, city: &str) -> AlertState {
        match self.windows.get(city) {
            Some(window)
                if window.len() == WINDOW_CAPACITY
                    && window.iter().all(|t| *t > self.threshold) =>
            {
                AlertState::Armed
            }
            _ => AlertState::Idle,
        }
    }

    /// Temperatures currently held for `city`, oldest first.
    pub fn window(&self, city: &str) -> Vec<f64> {
        self.windows.get(city).map(|w| w.iter().copied().collect()).unwrap_or_default()
    }
}
