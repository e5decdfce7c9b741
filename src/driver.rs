//! Frame pacing: where tick timestamps come from, and FPS reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of frame timestamps, standing in for a display-refresh callback.
pub trait FrameClock {
    /// Wait for the next frame and return its timestamp, or `None` once the
    /// host wants rendering to stop.
    fn next_frame(&mut self) -> Option<Instant>;
}

impl<C: FrameClock + ?Sized> FrameClock for &mut C {
    fn next_frame(&mut self) -> Option<Instant> {
        (**self).next_frame()
    }
}

/// Cancels an [`IntervalClock`] from anywhere, including another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the clock to stop before its next frame.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`stop`](Self::stop) was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fixed-rate clock that sleeps until each deadline.
///
/// If a frame overruns, the next deadline is rescheduled from now rather
/// than bursting to catch up. An interval too long to schedule yields one
/// frame and then stops.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Duration,
    next: Option<Instant>,
    stop: StopHandle,
    remaining: Option<u64>,
}

impl IntervalClock {
    /// A clock ticking every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
            stop: StopHandle::default(),
            remaining: None,
        }
    }

    /// A clock ticking `hz` times per second. Zero is treated as one.
    #[must_use]
    pub fn with_rate(hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / hz.max(1))
    }

    /// Stop after `frames` frames.
    #[must_use]
    pub fn limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }

    /// A handle that cancels this clock.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl FrameClock for IntervalClock {
    fn next_frame(&mut self) -> Option<Instant> {
        if self.stop.is_stopped() {
            return None;
        }
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let now = Instant::now();
        let deadline = self.next.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        let frame = Instant::now();
        // A deadline past what `Instant` can represent ends the clock after
        // this frame.
        self.next = match deadline.checked_add(self.interval) {
            Some(next) if next > frame => Some(next),
            _ => frame.checked_add(self.interval),
        };
        if self.next.is_none() {
            self.stop.stop();
        }
        Some(frame)
    }
}

/// Counts frames and reports the rate once per interval.
#[derive(Debug)]
pub struct FpsCounter {
    frame_count: u32,
    last_report: Option<Instant>,
    interval: Duration,
}

impl FpsCounter {
    /// Report once per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            frame_count: 0,
            last_report: None,
            interval,
        }
    }

    /// Count a frame drawn at `now`. Returns `Some(fps)` when the interval
    /// has elapsed since the last report.
    pub fn update(&mut self, now: Instant) -> Option<f32> {
        let Some(last) = self.last_report else {
            self.last_report = Some(now);
            return None;
        };
        self.frame_count += 1;

        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            return None;
        }
        #[expect(clippy::cast_precision_loss)]
        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.last_report = Some(now);
        Some(fps)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
