//! Convolution reverb
//!
//! The convolver is always fully wet; dry/wet balance is handled by the gain
//! nodes around it in the graph. Impulse responses up to 64 frames are
//! convolved directly in the time domain, longer ones with FFT overlap-add.

use super::AudioEffect;
use crate::error::{AudioError, Result};
use crate::impulse::ImpulseResponse;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Threshold below which we use direct time-domain convolution
const TIME_DOMAIN_THRESHOLD: usize = 64;

/// Minimum FFT size for efficient processing
const MIN_FFT_SIZE: usize = 256;

/// Input frames per FFT block
const BLOCK_SIZE: usize = 512;

/// Stereo convolution engine
pub struct Convolver {
    ir_left: Vec<f32>,
    ir_right: Vec<f32>,
    mode: Mode,
}

enum Mode {
    Direct(DirectState),
    Fft(Box<FftState>),
}

/// Ring buffers holding the last `ir_frames` inputs per channel
struct DirectState {
    history_left: Vec<f32>,
    history_right: Vec<f32>,
    pos: usize,
}

/// Overlap-add state
struct FftState {
    fft_size: usize,
    block_size: usize,
    ir_fft_left: Vec<Complex<f32>>,
    ir_fft_right: Vec<Complex<f32>>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    overlap_left: Vec<f32>,
    overlap_right: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Build a convolver running at `sample_rate` from an impulse response
    ///
    /// A response recorded at another rate is resampled first so its tail
    /// keeps its duration. The response is normalized to unit energy per
    /// channel; a mono response is applied to both channels.
    pub fn new(ir: &ImpulseResponse, sample_rate: u32) -> Result<Self> {
        let channels = ir.channels();
        if channels != 1 && channels != 2 {
            return Err(AudioError::InvalidChannelCount(channels));
        }
        if ir.samples().is_empty() {
            return Err(AudioError::EmptyImpulseResponse);
        }
        let ir = ir.resampled(sample_rate);

        let (mut ir_left, mut ir_right): (Vec<f32>, Vec<f32>) = ir
            .samples()
            .chunks_exact(channels)
            .map(|frame| (frame[0], frame[channels - 1]))
            .unzip();

        normalize(&mut ir_left);
        normalize(&mut ir_right);

        let ir_frames = ir_left.len();
        let mode = if ir_frames > TIME_DOMAIN_THRESHOLD {
            Mode::Fft(Box::new(FftState::new(&ir_left, &ir_right)))
        } else {
            Mode::Direct(DirectState {
                history_left: vec![0.0; ir_frames],
                history_right: vec![0.0; ir_frames],
                pos: 0,
            })
        };

        tracing::debug!(ir_frames, fft = matches!(mode, Mode::Fft(_)), "Convolver ready");

        Ok(Self {
            ir_left,
            ir_right,
            mode,
        })
    }

    /// Length of the loaded impulse response in frames
    pub fn ir_length(&self) -> usize {
        self.ir_left.len()
    }

    /// Whether the FFT path is in use
    pub fn uses_fft(&self) -> bool {
        matches!(self.mode, Mode::Fft(_))
    }

    fn convolve_direct(state: &mut DirectState, ir_left: &[f32], ir_right: &[f32], buffer: &mut [f32]) {
        let len = ir_left.len();
        for frame in buffer.chunks_exact_mut(2) {
            state.history_left[state.pos] = frame[0];
            state.history_right[state.pos] = frame[1];

            let mut left = 0.0f32;
            let mut right = 0.0f32;
            for j in 0..len {
                let idx = (state.pos + len - j) % len;
                left += state.history_left[idx] * ir_left[j];
                right += state.history_right[idx] * ir_right[j];
            }

            frame[0] = left;
            frame[1] = right;
            state.pos = (state.pos + 1) % len;
        }
    }
}

fn normalize(ir: &mut [f32]) {
    let energy: f32 = ir.iter().map(|s| s * s).sum();
    if energy > f32::EPSILON {
        let scale = 1.0 / energy.sqrt();
        for s in ir.iter_mut() {
            *s *= scale;
        }
    }
}

impl FftState {
    fn new(ir_left: &[f32], ir_right: &[f32]) -> Self {
        let ir_frames = ir_left.len();
        let fft_size = (ir_frames + BLOCK_SIZE).next_power_of_two().max(MIN_FFT_SIZE);
        // Linear convolution of one block must fit in the FFT
        let block_size = fft_size - ir_frames + 1;

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let transform = |ir: &[f32]| {
            let mut spectrum: Vec<Complex<f32>> = (0..fft_size)
                .map(|i| Complex::new(ir.get(i).copied().unwrap_or(0.0), 0.0))
                .collect();
            forward.process(&mut spectrum);
            spectrum
        };
        let ir_fft_left = transform(ir_left);
        let ir_fft_right = transform(ir_right);

        Self {
            fft_size,
            block_size,
            ir_fft_left,
            ir_fft_right,
            forward,
            inverse,
            overlap_left: vec![0.0; fft_size],
            overlap_right: vec![0.0; fft_size],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Convolve one channel of a chunk into the overlap buffer
    fn accumulate(&mut self, buffer: &[f32], start: usize, chunk: usize, ir_frames: usize, channel: usize) {
        for i in 0..self.fft_size {
            self.scratch[i] = if i < chunk {
                Complex::new(buffer[(start + i) * 2 + channel], 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }

        self.forward.process(&mut self.scratch);
        let ir_fft = if channel == 0 {
            &self.ir_fft_left
        } else {
            &self.ir_fft_right
        };
        for (bin, h) in self.scratch.iter_mut().zip(ir_fft) {
            *bin *= *h;
        }
        self.inverse.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let overlap = if channel == 0 {
            &mut self.overlap_left
        } else {
            &mut self.overlap_right
        };
        let conv_len = (chunk + ir_frames - 1).min(self.fft_size);
        for i in 0..conv_len {
            overlap[i] += self.scratch[i].re * scale;
        }
    }

    fn process(&mut self, buffer: &mut [f32], ir_frames: usize) {
        let frames = buffer.len() / 2;
        let mut pos = 0;

        while pos < frames {
            let chunk = (frames - pos).min(self.block_size);

            self.accumulate(buffer, pos, chunk, ir_frames, 0);
            self.accumulate(buffer, pos, chunk, ir_frames, 1);

            for i in 0..chunk {
                buffer[(pos + i) * 2] = self.overlap_left[i];
                buffer[(pos + i) * 2 + 1] = self.overlap_right[i];
            }

            // Shift overlap buffers left by chunk, zero the tail
            let size = self.fft_size;
            self.overlap_left.copy_within(chunk.., 0);
            self.overlap_right.copy_within(chunk.., 0);
            self.overlap_left[size - chunk..].fill(0.0);
            self.overlap_right[size - chunk..].fill(0.0);

            pos += chunk;
        }
    }
}

impl AudioEffect for Convolver {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        if buffer.is_empty() {
            return;
        }

        let ir_frames = self.ir_left.len();
        match &mut self.mode {
            Mode::Direct(state) => Self::convolve_direct(state, &self.ir_left, &self.ir_right, buffer),
            Mode::Fft(state) => state.process(buffer, ir_frames),
        }
    }

    fn reset(&mut self) {
        match &mut self.mode {
            Mode::Direct(state) => {
                state.history_left.fill(0.0);
                state.history_right.fill(0.0);
                state.pos = 0;
            }
            Mode::Fft(state) => {
                state.overlap_left.fill(0.0);
                state.overlap_right.fill(0.0);
            }
        }
    }

    fn name(&self) -> &str {
        "Convolver"
    }
}

impl std::fmt::Debug for Convolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Convolver")
            .field("ir_length", &self.ir_length())
            .field("uses_fft", &self.uses_fft())
            .finish()
    }
}
