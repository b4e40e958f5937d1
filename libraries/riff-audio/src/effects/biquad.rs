/// Biquad filter (RBJ audio EQ cookbook)
///
/// One filter per EQ band. Coefficients are recomputed lazily on the render
/// path whenever a parameter or the sample rate changes, and the active
/// coefficients glide toward the new target to avoid zipper noise.
use super::AudioEffect;

/// Filter response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// Boosts/cuts below the corner frequency
    LowShelf,
    /// Boosts/cuts around the center frequency with Q bandwidth
    #[default]
    Peaking,
    /// Boosts/cuts above the corner frequency
    HighShelf,
}

/// Per-sample smoothing factor for coefficient interpolation (~3 ms at 44.1 kHz)
const SMOOTH_COEFF: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const NEUTRAL: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn approach(&mut self, target: &Self) {
        self.b0 += SMOOTH_COEFF * (target.b0 - self.b0);
        self.b1 += SMOOTH_COEFF * (target.b1 - self.b1);
        self.b2 += SMOOTH_COEFF * (target.b2 - self.b2);
        self.a1 += SMOOTH_COEFF * (target.a1 - self.a1);
        self.a2 += SMOOTH_COEFF * (target.a2 - self.a2);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl ChannelState {
    #[inline]
    fn tick(&mut self, c: &Coefficients, input: f32) -> f32 {
        let mut out = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        // Flush denormals
        if out.abs() < 1e-15 {
            out = 0.0;
        }

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }
}

/// Stereo biquad filter with smoothed coefficient changes
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    gain_db: f32,

    target: Coefficients,
    active: Coefficients,
    left: ChannelState,
    right: ChannelState,

    /// Sample rate the target coefficients were computed for (0 = stale)
    designed_for: u32,
}

impl BiquadFilter {
    /// Create a filter at 0 dB gain
    pub fn new(filter_type: FilterType, frequency: f32, q: f32) -> Self {
        Self {
            filter_type,
            frequency: frequency.max(1.0),
            q: q.clamp(0.1, 10.0),
            gain_db: 0.0,
            target: Coefficients::NEUTRAL,
            active: Coefficients::NEUTRAL,
            left: ChannelState::default(),
            right: ChannelState::default(),
            designed_for: 0,
        }
    }

    /// Filter response shape
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Corner/center frequency in Hz
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Q factor
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Current gain in dB (exactly what was last set)
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Set gain in dB; takes effect on the next processed block
    pub fn set_gain_db(&mut self, gain_db: f32) {
        if gain_db != self.gain_db {
            self.gain_db = gain_db;
            self.designed_for = 0;
        }
    }

    /// Change the response shape
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        if filter_type != self.filter_type {
            self.filter_type = filter_type;
            self.designed_for = 0;
        }
    }

    fn design(&mut self, sample_rate: u32) {
        if sample_rate == 0 {
            return;
        }
        let fs = sample_rate as f32;
        let a = 10.0_f32.powf(self.gain_db / 40.0);
        // Keep clear of Nyquist
        let freq = self.frequency.min(fs * 0.45);
        let omega = 2.0 * std::f32::consts::PI * freq / fs;
        let (sin_omega, cos_omega) = omega.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Peaking => {
                let alpha = sin_omega / (2.0 * self.q);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_omega,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_omega,
                    1.0 - alpha / a,
                )
            }
            FilterType::LowShelf => {
                let alpha = sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / self.q - 1.0) + 2.0).sqrt();
                let beta = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_omega + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                    a * ((a + 1.0) - (a - 1.0) * cos_omega - beta),
                    (a + 1.0) + (a - 1.0) * cos_omega + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                    (a + 1.0) + (a - 1.0) * cos_omega - beta,
                )
            }
            FilterType::HighShelf => {
                let alpha = sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / self.q - 1.0) + 2.0).sqrt();
                let beta = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_omega + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                    a * ((a + 1.0) + (a - 1.0) * cos_omega - beta),
                    (a + 1.0) - (a - 1.0) * cos_omega + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                    (a + 1.0) - (a - 1.0) * cos_omega - beta,
                )
            }
        };

        self.target = Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
        self.designed_for = sample_rate;
    }
}

impl AudioEffect for BiquadFilter {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if self.designed_for != sample_rate {
            self.design(sample_rate);
        }

        for frame in buffer.chunks_exact_mut(2) {
            self.active.approach(&self.target);
            frame[0] = self.left.tick(&self.active, frame[0]);
            frame[1] = self.right.tick(&self.active, frame[1]);
        }
    }

    fn reset(&mut self) {
        self.left = ChannelState::default();
        self.right = ChannelState::default();
        // Snap to target when resetting
        self.active = self.target;
    }

    fn name(&self) -> &str {
        match self.filter_type {
            FilterType::LowShelf => "LowShelf",
            FilterType::Peaking => "Peaking",
            FilterType::HighShelf => "HighShelf",
        }
    }
}
