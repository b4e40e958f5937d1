use crate::buffer::DecodedAudio;

/// Buffer source node: plays decoded audio at a variable rate
///
/// Rate changes speed and pitch together, the way a tape does. Reads between
/// frames are linearly interpolated, which also covers a mismatch between the
/// decoded and the output sample rate.
#[derive(Debug, Clone)]
pub struct SourceNode {
    audio: DecodedAudio,
    /// Read head in source frames
    position: f64,
    playback_rate: f32,
    finished: bool,
}

impl SourceNode {
    pub fn new(audio: DecodedAudio) -> Self {
        Self {
            audio,
            position: 0.0,
            playback_rate: 1.0,
            finished: false,
        }
    }

    /// Decoded audio backing this source
    pub fn audio(&self) -> &DecodedAudio {
        &self.audio
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        if rate.is_finite() && rate > 0.0 {
            self.playback_rate = rate;
        }
    }

    /// Whether the read head ran past the last frame
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read head position in seconds of source material
    pub fn position_secs(&self) -> f64 {
        self.position / f64::from(self.audio.sample_rate())
    }

    /// Move the read head (clamped to the buffer)
    pub fn seek(&mut self, secs: f64) {
        let frames = self.audio.frames() as f64;
        self.position = (secs.max(0.0) * f64::from(self.audio.sample_rate())).min(frames);
        self.finished = self.position >= frames;
    }

    /// Back to the first frame
    pub fn rewind(&mut self) {
        self.position = 0.0;
        self.finished = false;
    }

    /// Write the next `out.len() / 2` frames, zero-filling past the end
    pub(crate) fn fill(&mut self, out: &mut [f32], output_rate: u32) {
        let samples = self.audio.samples();
        let frames = self.audio.frames();
        let step = f64::from(self.playback_rate) * f64::from(self.audio.sample_rate())
            / f64::from(output_rate.max(1));

        for frame in out.chunks_exact_mut(2) {
            let index = self.position.floor() as usize;
            if self.finished || index >= frames {
                self.finished = true;
                frame[0] = 0.0;
                frame[1] = 0.0;
                continue;
            }

            let frac = (self.position - index as f64) as f32;
            let next = (index + 1).min(frames - 1);
            let (l0, r0) = (samples[index * 2], samples[index * 2 + 1]);
            let (l1, r1) = (samples[next * 2], samples[next * 2 + 1]);
            frame[0] = l0 + (l1 - l0) * frac;
            frame[1] = r0 + (r1 - r0) * frac;

            self.position += step;
        }

        if self.position >= frames as f64 {
            self.finished = true;
        }
    }
}
