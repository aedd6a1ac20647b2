//! Tick pacing.
//!
//! Fixed simulation step, optional wall-clock pacing, and averaged tick
//! cost for status reports.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Fixed-step tick clock.
#[derive(Debug)]
pub struct TickClock {
    /// Simulated time per tick
    step: Duration,
    /// Whether to sleep out the remainder of each step
    realtime: bool,
    /// Start of the current tick
    tick_start: Instant,
    /// Recent tick costs for averaging
    tick_times: VecDeque<Duration>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl TickClock {
    /// Create a clock running at `tick_rate` ticks per simulated second.
    #[must_use]
    pub fn new(tick_rate: u32, realtime: bool) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            step: Duration::from_secs_f64(1.0 / f64::from(tick_rate)),
            realtime,
            tick_start: Instant::now(),
            tick_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Simulated time per tick.
    #[must_use]
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Mark the start of a tick.
    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    /// Mark the end of a tick, record its cost and, in realtime mode, sleep
    /// for the rest of the step.
    pub fn end(&mut self) {
        let cost = self.tick_start.elapsed();
        self.tick_times.push_back(cost);
        if self.tick_times.len() > self.max_samples {
            self.tick_times.pop_front();
        }

        if self.realtime && cost < self.step {
            std::thread::sleep(self.step - cost);
        }
    }

    /// Average wall-clock cost of recent ticks in milliseconds.
    #[must_use]
    pub fn average_tick_ms(&self) -> f64 {
        if self.tick_times.is_empty() {
            return 0.0;
        }

        let total: Duration = self.tick_times.iter().sum();
        total.as_secs_f64() * 1000.0 / self.tick_times.len() as f64
    }
}
