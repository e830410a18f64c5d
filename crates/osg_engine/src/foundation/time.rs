//! Time management utilities

use std::time::Instant;

/// Frame number and simulation time handed to every traversal of a frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStamp {
    /// Frames started since the viewer was created
    pub frame_number: u64,
    /// Simulation time in seconds
    pub simulation_time: f64,
    /// Seconds elapsed since the previous frame
    pub delta_time: f64,
}

/// Source of simulation time for the frame loop
///
/// Wall-clock by default; `manual` timers only move when [`Timer::advance`]
/// is called, which keeps animation tests deterministic.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Option<Instant>,
    last: f64,
    manual_time: f64,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a wall-clock timer
    pub fn new() -> Self {
        Self {
            start: Some(Instant::now()),
            last: 0.0,
            manual_time: 0.0,
            frame_count: 0,
        }
    }

    /// Create a timer driven only by [`Timer::advance`]
    pub fn manual() -> Self {
        Self {
            start: None,
            last: 0.0,
            manual_time: 0.0,
            frame_count: 0,
        }
    }

    /// Move a manual timer forward; ignored by wall-clock timers
    pub fn advance(&mut self, seconds: f64) {
        self.manual_time += seconds;
    }

    /// Start a new frame and return its stamp
    pub fn tick(&mut self) -> FrameStamp {
        let now = match self.start {
            Some(start) => start.elapsed().as_secs_f64(),
            None => self.manual_time,
        };
        let stamp = FrameStamp {
            frame_number: self.frame_count,
            simulation_time: now,
            delta_time: now - self.last,
        };
        self.last = now;
        self.frame_count += 1;
        stamp
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
