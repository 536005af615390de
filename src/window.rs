//! Temporal sample window and spectral-branch trigger counter.
//!
//! The window keeps the most recent 300 smoothed signal samples and
//! their capture timestamps in lockstep FIFOs. The trigger counter
//! implements the fixed fire/rearm protocol: it starts at 60,
//! increments once per accepted frame, fires once the window is full
//! and the counter reaches 300, and rearms to 270 so the next firing
//! needs 30 more frames even though the window stays full.

use std::collections::VecDeque;

/// Number of samples the temporal window holds once warmed up.
pub const WINDOW_CAPACITY: usize = 300;

/// Initial value of the trigger counter.
pub const TRIGGER_INITIAL: u32 = 60;

/// Counter value at or above which the spectral branch fires.
pub const TRIGGER_FIRE_AT: u32 = 300;

/// Counter value after a firing. Not zero: the next estimate still
/// requires 30 more accepted frames.
pub const TRIGGER_REARM_TO: u32 = 270;

/// Fixed-capacity FIFO of smoothed signal samples paired 1:1 with
/// capture timestamps. Oldest entries of both queues are evicted
/// together once capacity is reached.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f32>,
    timestamps: VecDeque<i64>,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    /// Create an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
            timestamps: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
        }
    }

    /// Append a sample/timestamp pair, evicting the oldest pair if the
    /// window is at capacity.
    pub fn push(&mut self, sample: f32, timestamp_ms: i64) {
        self.samples.push_back(sample);
        self.timestamps.push_back(timestamp_ms);
        if self.samples.len() > WINDOW_CAPACITY {
            self.samples.pop_front();
            self.timestamps.pop_front();
        }
    }

    /// Number of samples currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the window holds exactly `WINDOW_CAPACITY` samples.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.samples.len() == WINDOW_CAPACITY
    }

    /// Copy of the samples in insertion order (oldest first).
    #[must_use]
    pub fn ordered_samples(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    /// Measured average frame rate over the full window.
    ///
    /// Computed as `299 / elapsed_seconds` between the first and last
    /// of the 300 held timestamps. Returns `None` unless the window is
    /// full and the elapsed time is positive; callers then skip the
    /// frame-rate correction.
    #[must_use]
    pub fn average_fps(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let first = *self.timestamps.front()?;
        let last = *self.timestamps.back()?;
        let elapsed_secs = (last - first) as f64 / 1000.0;
        if elapsed_secs <= 0.0 {
            return None;
        }
        Some((WINDOW_CAPACITY - 1) as f64 / elapsed_secs)
    }
}

/// Frame counter gating the expensive spectral branch.
#[derive(Debug, Clone)]
pub struct TriggerCounter {
    count: u32,
}

impl Default for TriggerCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerCounter {
    /// Create a counter at its initial value of 60.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: TRIGGER_INITIAL,
        }
    }

    /// Advance the counter by one accepted frame.
    pub fn tick(&mut self) {
        self.count += 1;
    }

    /// Whether the spectral branch should fire this frame.
    #[must_use]
    pub fn should_fire(&self, window_full: bool) -> bool {
        window_full && self.count >= TRIGGER_FIRE_AT
    }

    /// Rearm after a firing. The counter resets to 270, so 30 more
    /// accepted frames pass before the next firing.
    pub fn rearm(&mut self) {
        self.count = TRIGGER_REARM_TO;
    }

    /// Current counter value.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_capacity() {
        let mut window = SampleWindow::new();
        for i in 0..1000 {
            window.push(i as f32, i64::from(i) * 33);
            assert!(window.len() <= WINDOW_CAPACITY);
        }
        assert!(window.is_full());
    }

    #[test]
    fn window_stays_full_once_reached() {
        let mut window = SampleWindow::new();
        for i in 0..WINDOW_CAPACITY {
            window.push(i as f32, i as i64);
        }
        assert!(window.is_full());
        window.push(0.0, 300);
        assert!(window.is_full());
    }

    #[test]
    fn eviction_is_lockstep_oldest_first() {
        let mut window = SampleWindow::new();
        for i in 0..=WINDOW_CAPACITY {
            window.push(i as f32, i as i64 * 10);
        }
        let samples = window.ordered_samples();
        // Sample 0 evicted; oldest is now 1, paired with timestamp 10.
        assert!((samples[0] - 1.0).abs() < f32::EPSILON);
        assert_eq!(window.average_fps().map(|f| f.round() as i64), Some(100));
    }

    #[test]
    fn average_fps_requires_full_window() {
        let mut window = SampleWindow::new();
        for i in 0..(WINDOW_CAPACITY - 1) {
            window.push(0.0, i as i64 * 33);
        }
        assert!(window.average_fps().is_none());
    }

    #[test]
    fn average_fps_requires_positive_elapsed() {
        let mut window = SampleWindow::new();
        for _ in 0..WINDOW_CAPACITY {
            window.push(0.0, 5000);
        }
        assert!(window.is_full());
        assert!(window.average_fps().is_none());
    }

    #[test]
    fn average_fps_at_thirty_fps() {
        let mut window = SampleWindow::new();
        for i in 0..WINDOW_CAPACITY {
            // 299 intervals spanning 299 * 33.33 ms
            window.push(0.0, (i as i64 * 1000) / 30);
        }
        let fps = window.average_fps().unwrap();
        assert!((fps - 30.0).abs() < 0.1, "fps should be ~30, got {fps}");
    }

    #[test]
    fn first_fire_at_three_hundredth_accepted_frame() {
        let mut window = SampleWindow::new();
        let mut trigger = TriggerCounter::new();
        let mut first_fire = None;

        for frame in 1..=400u32 {
            window.push(0.0, i64::from(frame) * 33);
            trigger.tick();
            if trigger.should_fire(window.is_full()) {
                first_fire = Some(frame);
                break;
            }
        }

        // Counter reaches 300 at frame 240 but the window is not yet
        // full; the window fills at frame 300 with counter 360.
        assert_eq!(first_fire, Some(300));
    }

    #[test]
    fn refires_every_thirty_frames_after_rearm() {
        let mut window = SampleWindow::new();
        let mut trigger = TriggerCounter::new();
        let mut firings = Vec::new();

        for frame in 1..=420u32 {
            window.push(0.0, i64::from(frame) * 33);
            trigger.tick();
            if trigger.should_fire(window.is_full()) {
                trigger.rearm();
                firings.push(frame);
            }
        }

        assert_eq!(firings, vec![300, 330, 360, 390, 420]);
    }

    #[test]
    fn rearm_resets_to_270_not_zero() {
        let mut trigger = TriggerCounter::new();
        for _ in 0..300 {
            trigger.tick();
        }
        trigger.rearm();
        assert_eq!(trigger.count(), TRIGGER_REARM_TO);
    }
}
