use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

/// Partials of a small singing bowl: (frequency ratio, relative amplitude, decay rate).
const PARTIALS: [(f32, f32, f32); 4] = [
    (1.0, 0.55, 1.1),
    (2.76, 0.25, 1.8),
    (5.40, 0.12, 3.0),
    (8.93, 0.08, 4.5),
];

/// Synthesized bell strike, the sound bundled with the binary.
/// Mono, a few seconds long, exponentially decaying.
pub struct BellTone {
    fundamental: f32,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl BellTone {
    pub const DEFAULT_FUNDAMENTAL_HZ: f32 = 528.0;
    pub const DURATION: Duration = Duration::from_millis(3500);

    pub fn new() -> Self {
        Self::with_fundamental(Self::DEFAULT_FUNDAMENTAL_HZ)
    }

    pub fn with_fundamental(fundamental: f32) -> Self {
        let sample_rate = 44100;
        Self {
            fundamental,
            sample_rate,
            num_sample: 0,
            total_samples: (Self::DURATION.as_secs_f32() * sample_rate as f32) as usize,
        }
    }
}

impl Default for BellTone {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for BellTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / self.sample_rate as f32;
        self.num_sample += 1;

        // 5ms attack avoids a click at the strike
        let attack = (t / 0.005).min(1.0);

        let sample: f32 = PARTIALS
            .iter()
            .map(|&(ratio, amp, decay)| {
                amp * (-decay * t).exp() * (2.0 * PI * self.fundamental * ratio * t).sin()
            })
            .sum();

        Some(sample * attack * 0.6)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_samples.saturating_sub(self.num_sample);
        (left, Some(left))
    }
}

impl Source for BellTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Self::DURATION)
    }
}
