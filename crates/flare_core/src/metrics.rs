//! Frame metrics.
//!
//! [`PerformanceMonitor`] turns raw frame times into a rolling fps figure;
//! [`FrameMetrics`] is the snapshot every optimizer consumes.

use std::collections::VecDeque;

/// Frames kept for the rolling average.
pub const DEFAULT_WINDOW: usize = 60;

/// Snapshot of engine load for one optimizer pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameMetrics {
    /// When the snapshot was taken.
    pub timestamp_ms: u64,
    /// Rolling frames per second.
    pub fps: f32,
    /// Last frame time.
    pub frame_time_ms: f32,
    /// Memory in use as a fraction of the budget (0..1).
    pub memory_fraction: f32,
    /// Live particles across all effects.
    pub particle_count: usize,
    /// Live effects.
    pub active_effects: usize,
    /// Requests waiting in the overflow queue.
    pub queued_effects: usize,
    /// Notifications published per second.
    pub events_per_second: f32,
    /// Notifications buffered for the next flush.
    pub pending_notifications: usize,
    /// Listener failures since start.
    pub listener_failures: u64,
}

impl FrameMetrics {
    /// Frame budget for a target rate, in milliseconds.
    #[must_use]
    pub fn budget_ms(target_fps: f32) -> f32 {
        if target_fps > 0.0 {
            1000.0 / target_fps
        } else {
            f32::INFINITY
        }
    }

    /// `fps / target`, 0 when the target is unset.
    #[must_use]
    pub fn fps_ratio(&self, target_fps: f32) -> f32 {
        if target_fps > 0.0 {
            self.fps / target_fps
        } else {
            0.0
        }
    }
}

/// Aggregate frame statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonitorStats {
    /// Frames recorded.
    pub total_frames: u64,
    /// Rolling average frame time.
    pub avg_frame_ms: f32,
    /// Worst frame time ever seen.
    pub worst_frame_ms: f32,
    /// Frames that overran the budget.
    pub frames_over_budget: u64,
}

/// Rolling frame-time monitor.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    /// Recent frame times.
    window: VecDeque<f32>,
    /// Window capacity.
    capacity: usize,
    /// Sum of the window, kept incrementally.
    window_sum: f32,
    /// Per-frame budget.
    budget_ms: f32,
    /// Aggregates.
    stats: MonitorStats,
}

impl PerformanceMonitor {
    /// Creates a monitor for a target frame rate.
    #[must_use]
    pub fn new(target_fps: f32) -> Self {
        Self::with_window(target_fps, DEFAULT_WINDOW)
    }

    /// Creates a monitor with a custom rolling window.
    #[must_use]
    pub fn with_window(target_fps: f32, window: usize) -> Self {
        let capacity = window.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            window_sum: 0.0,
            budget_ms: FrameMetrics::budget_ms(target_fps),
            stats: MonitorStats::default(),
        }
    }

    /// Records one frame time.
    pub fn record_frame(&mut self, frame_ms: f32) {
        let frame_ms = if frame_ms.is_finite() { frame_ms.max(0.0) } else { 0.0 };

        if self.window.len() == self.capacity {
            if let Some(old) = self.window.pop_front() {
                self.window_sum -= old;
            }
        }
        self.window.push_back(frame_ms);
        self.window_sum += frame_ms;

        self.stats.total_frames += 1;
        self.stats.worst_frame_ms = self.stats.worst_frame_ms.max(frame_ms);
        if frame_ms > self.budget_ms {
            self.stats.frames_over_budget += 1;
        }
        self.stats.avg_frame_ms = self.average_frame_ms();
    }

    /// Rolling average frame time.
    #[must_use]
    pub fn average_frame_ms(&self) -> f32 {
        if self.window.is_empty() {
            0.0
        } else {
            (self.window_sum / self.window.len() as f32).max(0.0)
        }
    }

    /// Rolling frames per second.
    #[must_use]
    pub fn fps(&self) -> f32 {
        let avg = self.average_frame_ms();
        if avg > 0.0 {
            1000.0 / avg
        } else {
            0.0
        }
    }

    /// Most recent frame time.
    #[must_use]
    pub fn last_frame_ms(&self) -> f32 {
        self.window.back().copied().unwrap_or(0.0)
    }

    /// Frame budget.
    #[must_use]
    pub const fn budget_ms(&self) -> f32 {
        self.budget_ms
    }

    /// Aggregates.
    #[must_use]
    pub const fn stats(&self) -> MonitorStats {
        self.stats
    }
}

/// Counts events over a sliding one-second window.
#[derive(Debug, Clone, Default)]
pub struct RateMeter {
    /// Timestamps (ms) with counts.
    samples: VecDeque<(u64, u32)>,
    /// Sum of counts in the window.
    total: u64,
}

impl RateMeter {
    /// Width of the window.
    pub const WINDOW_MS: u64 = 1000;

    /// Creates an empty meter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `count` events at `now_ms`.
    pub fn record(&mut self, now_ms: u64, count: u32) {
        self.evict(now_ms);
        match self.samples.back_mut() {
            Some((ts, n)) if *ts == now_ms => *n += count,
            _ => self.samples.push_back((now_ms, count)),
        }
        self.total += u64::from(count);
    }

    /// Events per second over the last window.
    pub fn rate(&mut self, now_ms: u64) -> f32 {
        self.evict(now_ms);
        self.total as f32 * 1000.0 / Self::WINDOW_MS as f32
    }

    fn evict(&mut self, now_ms: u64) {
        while let Some(&(ts, n)) = self.samples.front() {
            if now_ms.saturating_sub(ts) < Self::WINDOW_MS {
                break;
            }
            self.samples.pop_front();
            self.total -= u64::from(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_rolling_fps() {
        let mut monitor = PerformanceMonitor::with_window(60.0, 4);
        for _ in 0..4 {
            monitor.record_frame(20.0);
        }
        assert!((monitor.fps() - 50.0).abs() < 0.01);

        for _ in 0..4 {
            monitor.record_frame(10.0);
        }
        assert!((monitor.fps() - 100.0).abs() < 0.01);
        assert_eq!(monitor.stats().total_frames, 8);
        assert_eq!(monitor.stats().frames_over_budget, 4);
        assert!((monitor.stats().worst_frame_ms - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_monitor_empty() {
        let monitor = PerformanceMonitor::new(60.0);
        assert_eq!(monitor.fps(), 0.0);
        assert_eq!(monitor.last_frame_ms(), 0.0);
    }

    #[test]
    fn test_rate_meter_window() {
        let mut meter = RateMeter::new();
        meter.record(0, 10);
        meter.record(500, 5);
        assert!((meter.rate(900) - 15.0).abs() < f32::EPSILON);
        assert!((meter.rate(1200) - 5.0).abs() < f32::EPSILON);
        assert_eq!(meter.rate(3000), 0.0);
    }

    #[test]
    fn test_fps_ratio() {
        let metrics = FrameMetrics { fps: 30.0, ..Default::default() };
        assert!((metrics.fps_ratio(60.0) - 0.5).abs() < f32::EPSILON);
        assert_eq!(metrics.fps_ratio(0.0), 0.0);
    }
}
