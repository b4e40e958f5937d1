use super::AudioEffect;

/// Linear gain with a short per-block ramp toward the target
#[derive(Debug, Clone)]
pub struct Gain {
    target: f32,
    current: f32,
}

impl Gain {
    /// Create a gain stage that starts at `gain`
    pub fn new(gain: f32) -> Self {
        let gain = gain.max(0.0);
        Self {
            target: gain,
            current: gain,
        }
    }

    /// Target gain (what was last set)
    pub fn gain(&self) -> f32 {
        self.target
    }

    /// Set target gain; the next block ramps to it
    pub fn set_gain(&mut self, gain: f32) {
        self.target = gain.max(0.0);
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioEffect for Gain {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        let frames = buffer.len() / 2;
        if frames == 0 {
            return;
        }

        if (self.target - self.current).abs() < f32::EPSILON {
            for sample in buffer.iter_mut() {
                *sample *= self.target;
            }
            return;
        }

        let step = (self.target - self.current) / frames as f32;
        for frame in buffer.chunks_exact_mut(2) {
            self.current += step;
            frame[0] *= self.current;
            frame[1] *= self.current;
        }
        self.current = self.target;
    }

    fn reset(&mut self) {
        self.current = self.target;
    }

    fn name(&self) -> &str {
        "Gain"
    }
}
