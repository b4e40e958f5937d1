//! DSP building blocks used by the graph nodes
//!
//! All effects operate on interleaved stereo f32 samples (L, R, L, R, ...).
//!
//! Available effects:
//! - **BiquadFilter**: RBJ low shelf / peaking / high shelf
//! - **Gain**: ramped linear gain
//! - **Convolver**: impulse-response convolution (reverb)
//! - **PitchShifter**: delay-line pitch shifter, tempo untouched

mod biquad;
mod convolution;
mod gain;
mod pitch;

pub use biquad::{BiquadFilter, FilterType};
pub use convolution::Convolver;
pub use gain::Gain;
pub use pitch::PitchShifter;

/// Trait for in-place audio processors
///
/// Implementations must not allocate in `process()` once configured; they run
/// on the render path.
pub trait AudioEffect: Send {
    /// Process audio buffer in-place
    ///
    /// # Arguments
    /// * `buffer` - Interleaved stereo samples (L, R, L, R, ...)
    /// * `sample_rate` - Sample rate in Hz
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32);

    /// Reset effect state (e.g., when seeking or changing tracks)
    fn reset(&mut self);

    /// Get effect name (for debugging)
    fn name(&self) -> &str;
}
