use std::time::{Duration, Instant};
use winit::window::Window;

const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Averages over one report interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub fps: f32,
    pub avg_work_ms: f32,
    pub worst_gap_ms: f32,
}

impl FrameReport {
    pub fn title(&self, base: &str) -> String {
        format!(
            "{base} - {:.1} fps (frame work {:.2} ms, worst gap {:.2} ms)",
            self.fps, self.avg_work_ms, self.worst_gap_ms
        )
    }
}

/// Collects per-frame work time and the gaps between frames, and puts a
/// summary in the window title every half second.
pub struct FrameTiming {
    base_title: String,
    interval_start: Instant,
    previous_frame: Option<Instant>,
    frames: u32,
    work: Duration,
    worst_gap: Duration,
}

impl FrameTiming {
    pub fn new(base_title: String, now: Instant) -> Self {
        Self {
            base_title,
            interval_start: now,
            previous_frame: None,
            frames: 0,
            work: Duration::ZERO,
            worst_gap: Duration::ZERO,
        }
    }

    /// Record a frame that finished at `now` after `work` spent on it.
    /// Returns a report once the interval has elapsed, then starts a new one.
    pub fn record(&mut self, now: Instant, work: Duration) -> Option<FrameReport> {
        if let Some(previous) = self.previous_frame.replace(now) {
            self.worst_gap = self.worst_gap.max(now.saturating_duration_since(previous));
        }
        self.frames = self.frames.saturating_add(1);
        self.work += work;

        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < REPORT_INTERVAL {
            return None;
        }
        let report = FrameReport {
            fps: self.frames as f32 / elapsed.as_secs_f32(),
            avg_work_ms: self.work.as_secs_f32() * 1000.0 / self.frames as f32,
            worst_gap_ms: self.worst_gap.as_secs_f32() * 1000.0,
        };
        self.interval_start = now;
        self.frames = 0;
        self.work = Duration::ZERO;
        self.worst_gap = Duration::ZERO;
        Some(report)
    }

    pub fn update(&mut self, window: &Window, now: Instant, work: Duration) {
        if let Some(report) = self.record(now, work) {
            log::trace!("{:?}", report);
            window.set_title(&report.title(&self.base_title));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn reports_every_half_second() {
        let start = Instant::now();
        let mut timing = FrameTiming::new("cagebox".to_string(), start);
        assert!(timing.record(start + ms(100), ms(2)).is_none());
        let report = timing.record(start + ms(500), ms(4)).expect("report due");
        assert!((report.fps - 4.0).abs() < 1e-4);
        assert!((report.avg_work_ms - 3.0).abs() < 1e-4);
        assert!(report.title("cagebox").starts_with("cagebox - 4.0 fps"));
        assert!(timing.record(start + ms(600), ms(1)).is_none());
    }

    #[test]
    fn worst_gap_resets_each_interval() {
        let start = Instant::now();
        let mut timing = FrameTiming::new(String::new(), start);
        timing.record(start, ms(1));
        timing.record(start + ms(16), ms(1));
        timing.record(start + ms(316), ms(1));
        let first = timing.record(start + ms(516), ms(1)).expect("report due");
        assert!((first.worst_gap_ms - 300.0).abs() < 1e-3);

        timing.record(start + ms(532), ms(1));
        let second = timing.record(start + ms(1016), ms(1)).expect("report due");
        assert!((second.worst_gap_ms - 484.0).abs() < 1e-3);
    }
}
