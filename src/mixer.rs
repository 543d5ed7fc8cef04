// ============================================================================
// MIXER.RS - Fixed-Size Voice Pool and Summation
// ============================================================================
//
// The Mixer owns every voice and a per-voice scratch buffer. On each
// render call it zeroes the output, renders every voice into its own
// scratch, then sums the scratches into the output - mirroring
// examples/original_source/mixer.cc's Mixer::render exactly, just
// without the raw pointers.
//
// The mixer does NOT clip or clamp the sum: the host driver is
// expected to accept unclipped float audio (spec.md 4.2). Downstream
// clamping, if needed, is the caller's job - see src/host.rs, which
// does clamp right before handing samples to the audio device.
// ============================================================================

use crate::error::ArgumentError;
use crate::sample::SampleBank;
use crate::voice::{render_voice, StereoFrame, Voice};

pub struct Mixer {
    voices: Vec<Voice>,
    scratch: Vec<Vec<StereoFrame>>,
    max_frames: usize,
}

impl Mixer {
    /// Builds a mixer with `voice_count` voices, each with its own
    /// scratch buffer sized once for up to `max_frames` frames per
    /// render call. The scratch buffers are never resized after this
    /// point - the render path allocates nothing.
    pub fn new(voice_count: usize, max_frames: usize, sample_rate: u32) -> Result<Self, ArgumentError> {
        if voice_count == 0 {
            return Err(ArgumentError::new("mixer requires at least one voice"));
        }
        Ok(Self {
            voices: (0..voice_count).map(|_| Voice::new(sample_rate)).collect(),
            scratch: (0..voice_count).map(|_| vec![StereoFrame::default(); max_frames]).collect(),
            max_frames,
        })
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn voice(&self, index: usize) -> Result<&Voice, ArgumentError> {
        self.voices
            .get(index)
            .ok_or_else(|| ArgumentError::new(format!("voice index {} out of range", index)))
    }

    pub fn voice_mut(&mut self, index: usize) -> Result<&mut Voice, ArgumentError> {
        self.voices
            .get_mut(index)
            .ok_or_else(|| ArgumentError::new(format!("voice index {} out of range", index)))
    }

    /// Renders `out.len()` stereo frames. `out.len()` must not exceed
    /// the `max_frames` the mixer was constructed with.
    pub fn render(&mut self, out: &mut [StereoFrame], bank: &SampleBank) {
        debug_assert!(out.len() <= self.max_frames);

        for frame in out.iter_mut() {
            *frame = StereoFrame::default();
        }

        for (voice, scratch) in self.voices.iter_mut().zip(self.scratch.iter_mut()) {
            let scratch = &mut scratch[..out.len()];
            render_voice(voice, scratch, bank);
            for (out_frame, voice_frame) in out.iter_mut().zip(scratch.iter()) {
                out_frame.left += voice_frame.left;
                out_frame.right += voice_frame.right;
            }
        }
    }
}
