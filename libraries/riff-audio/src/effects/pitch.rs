use super::AudioEffect;

/// Crossfade window in frames
const WINDOW: usize = 2048;

/// Delay line length (power of two, comfortably above one window)
const LINE: usize = WINDOW * 2;

/// Allowed pitch ratio range
///
/// Covers an octave of offset combined with pitch preservation across the
/// whole rate range: 2^-1 / 2.0 = 0.25 up to 2^1 / 0.4 = 5.0.
const MIN_RATIO: f32 = 0.25;
const MAX_RATIO: f32 = 5.0;

/// Delay-line pitch shifter
///
/// Two read heads sweep a delay line at `ratio` times the write speed and are
/// crossfaded with complementary triangular windows, so pitch moves while the
/// tempo of the input is untouched. Adds roughly half a window of latency.
#[derive(Debug, Clone)]
pub struct PitchShifter {
    ratio: f32,
    line_left: Vec<f32>,
    line_right: Vec<f32>,
    write: usize,
    /// Position of head A within the window, in [0, 1)
    phase: f32,
}

impl PitchShifter {
    /// Create a shifter with the given pitch ratio (1.0 = unchanged)
    pub fn new(ratio: f32) -> Self {
        Self {
            ratio: ratio.clamp(MIN_RATIO, MAX_RATIO),
            line_left: vec![0.0; LINE],
            line_right: vec![0.0; LINE],
            write: 0,
            phase: 0.0,
        }
    }

    /// Current pitch ratio
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Set pitch ratio (clamped to `MIN_RATIO..=MAX_RATIO`)
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.clamp(MIN_RATIO, MAX_RATIO);
    }

    #[inline]
    fn read(line: &[f32], write: usize, delay: f32) -> f32 {
        let pos = write as f32 + LINE as f32 - delay;
        let base = pos.floor();
        let frac = pos - base;
        let i0 = (base as usize) % LINE;
        let i1 = (i0 + 1) % LINE;
        line[i0] + (line[i1] - line[i0]) * frac
    }

    #[inline]
    fn window(phase: f32) -> f32 {
        1.0 - (2.0 * phase - 1.0).abs()
    }
}

impl Default for PitchShifter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioEffect for PitchShifter {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        let step = (1.0 - self.ratio) / WINDOW as f32;

        for frame in buffer.chunks_exact_mut(2) {
            self.line_left[self.write] = frame[0];
            self.line_right[self.write] = frame[1];

            let phase_a = self.phase;
            let phase_b = (self.phase + 0.5).fract();
            let (gain_a, gain_b) = (Self::window(phase_a), Self::window(phase_b));
            // Minimum delay of one frame keeps the heads behind the writer
            let delay_a = 1.0 + phase_a * WINDOW as f32;
            let delay_b = 1.0 + phase_b * WINDOW as f32;

            frame[0] = gain_a * Self::read(&self.line_left, self.write, delay_a)
                + gain_b * Self::read(&self.line_left, self.write, delay_b);
            frame[1] = gain_a * Self::read(&self.line_right, self.write, delay_a)
                + gain_b * Self::read(&self.line_right, self.write, delay_b);

            self.phase = (self.phase + step).rem_euclid(1.0);
            self.write = (self.write + 1) % LINE;
        }
    }

    fn reset(&mut self) {
        self.line_left.fill(0.0);
        self.line_right.fill(0.0);
        self.write = 0;
        self.phase = 0.0;
    }

    fn name(&self) -> &str {
        "PitchShifter"
    }
}
