//! Frame pacing: which paint requests reach the canvas, and how long the
//! simulation thread sleeps between animation steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{trace, warn};

use crate::render::{Canvas, RenderThread};
use crate::scene::SceneHandle;

/// Counters over all paint requests since the animator was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub requested: u64,
    /// Painted inline or handed to the render thread.
    pub painted: u64,
    /// Skipped because the previous frame was too recent.
    pub throttled: u64,
    /// Skipped because the render thread was still busy.
    pub dropped: u64,
    /// Highest number of asynchronous frames outstanding at once.
    pub peak_in_flight: usize,
}

/// What happened to one paint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Painted,
    Dispatched,
    Throttled,
    Dropped,
}

/// Cross-thread request to cut the current movement's pacing short.
///
/// The flag stays set until cleared, so every later movement also runs
/// without sleeping until [`clear`](Self::clear) is called.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Turns per-step delays into sleeps of a fixed granule.
///
/// Each step adds its delay; before the next step, the accumulated amount is
/// slept off in units of ten, one granule per unit.
#[derive(Debug, Clone)]
pub struct DelayIntegrator {
    pending: u32,
    granule: Duration,
}

impl DelayIntegrator {
    pub fn new(granule: Duration) -> Self {
        Self { pending: 0, granule }
    }

    /// Sleep while more than ten units are pending. Returns `false` if
    /// interrupted; the remaining delay is then left pending.
    pub fn settle(&mut self, interrupt: &InterruptHandle) -> bool {
        while self.pending > 10 {
            if interrupt.is_interrupted() {
                return false;
            }
            thread::sleep(self.granule);
            self.pending -= 10;
        }
        true
    }

    pub fn add(&mut self, delay: u32) {
        self.pending = self.pending.saturating_add(delay);
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }
}

pub enum PaintTarget {
    /// Paint on the calling thread.
    Inline(Box<dyn Canvas>),
    Thread(RenderThread),
}

/// Decides for each paint request whether and how to paint.
pub struct FramePacer {
    target: PaintTarget,
    min_interval: Duration,
    last_paint: Option<Instant>,
    clock_start: Instant,
    frames_since_reset: u64,
    stats: FrameStats,
}

impl FramePacer {
    pub fn new(target: PaintTarget, min_interval: Duration) -> Self {
        Self {
            target,
            min_interval,
            last_paint: None,
            clock_start: Instant::now(),
            frames_since_reset: 0,
            stats: FrameStats::default(),
        }
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self.target, PaintTarget::Thread(_))
    }

    /// Handle one paint request.
    ///
    /// Requests closer together than the minimum interval are throttled,
    /// except in slow mode and while fully recording. With a render thread,
    /// frames are queued without waiting and dropped while the thread is
    /// busy; slow mode and full recording wait for each frame instead so
    /// none is lost.
    pub fn request_frame(&mut self, scene: &SceneHandle, slow_mode: bool, full_recording: bool) -> FrameOutcome {
        self.stats.requested += 1;
        let now = Instant::now();
        let due = self
            .last_paint
            .is_none_or(|last| now.duration_since(last) >= self.min_interval);

        if !due && !slow_mode && !full_recording {
            self.stats.throttled += 1;
            self.frames_since_reset += 1;
            return FrameOutcome::Throttled;
        }

        let outcome = match &mut self.target {
            PaintTarget::Inline(canvas) => {
                scene.paint(canvas.as_mut());
                FrameOutcome::Painted
            }
            PaintTarget::Thread(thread) if !slow_mode && !full_recording => match thread.try_dispatch() {
                Ok(true) => FrameOutcome::Dispatched,
                Ok(false) => FrameOutcome::Dropped,
                Err(e) => {
                    warn!(error = %e, "frame not rendered");
                    FrameOutcome::Dropped
                }
            },
            PaintTarget::Thread(thread) => match thread.paint_and_wait() {
                Ok(()) => FrameOutcome::Painted,
                Err(e) => {
                    warn!(error = %e, "frame not rendered");
                    FrameOutcome::Dropped
                }
            },
        };

        if outcome == FrameOutcome::Dropped {
            self.stats.dropped += 1;
            trace!("frame dropped");
            return outcome;
        }

        self.stats.painted += 1;
        self.frames_since_reset += 1;
        self.last_paint = Some(now);
        outcome
    }

    /// Restart the frame-rate measurement.
    pub fn reset_clock(&mut self) {
        self.clock_start = Instant::now();
        self.frames_since_reset = 0;
    }

    /// Frames per second since the last clock reset, counting every
    /// request that was not dropped.
    pub fn fps(&self) -> u64 {
        let millis = self.clock_start.elapsed().as_millis();
        if millis == 0 {
            return 0;
        }
        (u128::from(self.frames_since_reset) * 1000 / millis) as u64
    }

    pub fn stats(&self) -> FrameStats {
        let peak_in_flight = match &self.target {
            PaintTarget::Thread(thread) => thread.peak_in_flight(),
            PaintTarget::Inline(_) => 0,
        };
        FrameStats {
            peak_in_flight,
            ..self.stats
        }
    }
}

impl std::fmt::Debug for FramePacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePacer")
            .field("concurrent", &self.is_concurrent())
            .field("min_interval", &self.min_interval)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::icons::DrawIcon;

    #[derive(Clone, Default)]
    struct Frames(Arc<Mutex<usize>>);

    impl Canvas for Frames {
        fn draw_icon(&mut self, _icon: &DrawIcon) {}

        fn end_frame(&mut self) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn inline(min_interval_ms: u64) -> (FramePacer, Frames) {
        let frames = Frames::default();
        let pacer = FramePacer::new(
            PaintTarget::Inline(Box::new(frames.clone())),
            Duration::from_millis(min_interval_ms),
        );
        (pacer, frames)
    }

    #[test]
    fn rapid_requests_are_throttled() {
        let (mut pacer, frames) = inline(10_000);
        let scene = SceneHandle::new(25);
        assert_eq!(pacer.request_frame(&scene, false, false), FrameOutcome::Painted);
        assert_eq!(pacer.request_frame(&scene, false, false), FrameOutcome::Throttled);
        assert_eq!(*frames.0.lock().unwrap(), 1);
        let stats = pacer.stats();
        assert_eq!((stats.requested, stats.painted, stats.throttled), (2, 1, 1));
    }

    #[test]
    fn slow_mode_and_recording_bypass_throttle() {
        let (mut pacer, frames) = inline(10_000);
        let scene = SceneHandle::new(25);
        pacer.request_frame(&scene, false, false);
        assert_eq!(pacer.request_frame(&scene, true, false), FrameOutcome::Painted);
        assert_eq!(pacer.request_frame(&scene, false, true), FrameOutcome::Painted);
        assert_eq!(*frames.0.lock().unwrap(), 3);
    }

    #[test]
    fn zero_interval_paints_everything() {
        let (mut pacer, frames) = inline(0);
        let scene = SceneHandle::new(25);
        for _ in 0..5 {
            pacer.request_frame(&scene, false, false);
        }
        assert_eq!(*frames.0.lock().unwrap(), 5);
    }

    #[test]
    fn integrator_sleeps_in_units_of_ten() {
        let interrupt = InterruptHandle::new();
        let mut delay = DelayIntegrator::new(Duration::from_millis(1));
        delay.add(35);
        assert!(delay.settle(&interrupt));
        assert_eq!(delay.pending(), 5);
        delay.add(3);
        assert!(delay.settle(&interrupt));
        assert_eq!(delay.pending(), 8);
    }

    #[test]
    fn interrupt_stops_sleeping() {
        let interrupt = InterruptHandle::new();
        interrupt.interrupt();
        let mut delay = DelayIntegrator::new(Duration::from_secs(10));
        delay.add(1_000);
        let started = Instant::now();
        assert!(!delay.settle(&interrupt));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(delay.pending(), 1_000);

        interrupt.clear();
        assert!(!interrupt.is_interrupted());
    }

    #[test]
    fn concurrent_pacer_never_blocks_on_a_busy_thread() {
        struct Sleepy;
        impl Canvas for Sleepy {
            fn draw_icon(&mut self, _icon: &DrawIcon) {}
            fn end_frame(&mut self) {
                thread::sleep(Duration::from_millis(100));
            }
        }

        let scene = SceneHandle::new(25);
        let thread = RenderThread::spawn(scene.clone(), Box::new(Sleepy)).unwrap();
        let mut pacer = FramePacer::new(PaintTarget::Thread(thread), Duration::ZERO);
        let started = Instant::now();
        assert_eq!(pacer.request_frame(&scene, false, false), FrameOutcome::Dispatched);
        for _ in 0..10 {
            assert_eq!(pacer.request_frame(&scene, false, false), FrameOutcome::Dropped);
        }
        assert!(started.elapsed() < Duration::from_millis(90));
        let stats = pacer.stats();
        assert_eq!(stats.dropped, 10);
        assert_eq!(stats.peak_in_flight, 1);
    }
}
