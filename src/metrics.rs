//! Frame-time sampling and FPS estimation over a sliding window.

use std::time::Duration;

use circular_buffer::CircularBuffer;
use num_width::NumberWidth;
use parking_lot::Mutex;
use smallvec::SmallVec;
use thousands::Separable;

use crate::constants::METRICS_WINDOW;

/// Point-in-time view of the metrics window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricsSnapshot {
    /// Instantaneous estimate from the latest frame delta (1/delta).
    pub fps: f32,
    /// Processing duration of the latest frame pass.
    pub frame_time: Duration,
    /// Mean processing duration over the window.
    pub mean_frame_time: Duration,
    /// Standard deviation of processing duration over the window.
    pub frame_time_std_dev: Duration,
    /// Number of frames currently sampled.
    pub samples: usize,
}

/// Sliding-window frame metrics. Buffers sit behind mutexes because they are
/// recorded and read through shared scheduler handles.
pub(crate) struct FrameMetrics {
    frame_times: Mutex<CircularBuffer<METRICS_WINDOW, Duration>>,
    deltas: Mutex<CircularBuffer<METRICS_WINDOW, Duration>>,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self {
            frame_times: Mutex::new(CircularBuffer::new()),
            deltas: Mutex::new(CircularBuffer::new()),
        }
    }

    /// Records one processed frame: its clamped delta and the duration the
    /// systems pass took.
    pub fn record(&self, delta: Duration, processing: Duration) {
        self.frame_times.lock().push_back(processing);
        self.deltas.lock().push_back(delta);
    }

    pub fn reset(&self) {
        self.frame_times.lock().clear();
        self.deltas.lock().clear();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let frame_times = self.frame_times.lock();
        let (mean, std_dev) = welford(frame_times.iter());
        let last_delta = self.deltas.lock().back().copied().unwrap_or(Duration::ZERO);
        let fps = if last_delta > Duration::ZERO {
            1.0 / last_delta.as_secs_f32()
        } else {
            0.0
        };

        MetricsSnapshot {
            fps,
            frame_time: frame_times.back().copied().unwrap_or(Duration::ZERO),
            mean_frame_time: mean,
            frame_time_std_dev: std_dev,
            samples: frame_times.len(),
        }
    }

    /// Aligned overlay/log lines: an FPS headline plus `mean ± std dev` rows
    /// for the processing time and the frame delta.
    pub fn summary(&self) -> SmallVec<[String; 3]> {
        let snapshot = self.snapshot();
        let (delta_mean, delta_std) = welford(self.deltas.lock().iter());

        let samples = snapshot.samples;
        let fps_line = match snapshot.fps {
            f if f > 100.0 => {
                let whole = (f as u32).separate_with_commas();
                format!("{whole} FPS ({samples} samples)")
            }
            f if f < 10.0 => format!("{f:.1} FPS ({samples} samples)"),
            f => format!("{f:.0} FPS ({samples} samples)"),
        };

        let rows = [
            ("frame", snapshot.mean_frame_time, snapshot.frame_time_std_dev),
            ("delta", delta_mean, delta_std),
        ];
        let parts: SmallVec<[(&str, (u64, u32, &'static str), (u64, u32, &'static str)); 2]> = rows
            .iter()
            .map(|(name, mean, std_dev)| (*name, split_duration(mean), split_duration(std_dev)))
            .collect();

        let mean_width = parts
            .iter()
            .map(|(_, (int, _, _), _)| int.width() as usize)
            .max()
            .unwrap_or(1);
        let std_width = parts
            .iter()
            .map(|(_, _, (int, _, _))| int.width() as usize)
            .max()
            .unwrap_or(1);

        let mut lines = SmallVec::new();
        lines.push(fps_line);
        for (name, (mean_int, mean_dec, mean_unit), (std_int, std_dec, std_unit)) in parts {
            let mean = format!("{mean_int:mean_width$}.{mean_dec:03}{mean_unit}");
            let std = format!("{std_int:std_width$}.{std_dec:03}{std_unit}");
            lines.push(format!("{name:5} : {mean} ± {std}"));
        }
        lines
    }
}

/// Splits a duration into integer part, three decimal digits, and unit at the
/// largest unit that keeps the integer part non-zero.
fn split_duration(duration: &Duration) -> (u64, u32, &'static str) {
    match duration {
        n if n >= &Duration::from_secs(1) => (n.as_secs(), (n.as_millis() % 1000) as u32, "s"),
        n if n >= &Duration::from_millis(1) => {
            (n.as_millis() as u64, (n.as_micros() % 1000) as u32, "ms")
        }
        n if n >= &Duration::from_micros(1) => {
            (n.as_micros() as u64, (n.as_nanos() % 1000) as u32, "µs")
        }
        n => (n.as_nanos() as u64, 0, "ns"),
    }
}

/// Single-pass mean and standard deviation (Welford's algorithm).
fn welford<'a>(samples: impl Iterator<Item = &'a Duration>) -> (Duration, Duration) {
    let mut count = 0u32;
    let mut mean = 0.0f32;
    let mut sum_squared_diff = 0.0f32;

    for duration in samples {
        let secs = duration.as_secs_f32();
        count += 1;

        let diff = secs - mean;
        mean += diff / count as f32;
        sum_squared_diff += diff * (secs - mean);
    }

    if count == 0 {
        return (Duration::ZERO, Duration::ZERO);
    }
    let variance = if count > 1 {
        sum_squared_diff / (count - 1) as f32
    } else {
        0.0
    };
    (Duration::from_secs_f32(mean), Duration::from_secs_f32(variance.sqrt()))
}
