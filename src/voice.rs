// ============================================================================
// VOICE.RS - Per-Voice Playback State and the Voice Renderer
// ============================================================================
//
// A Voice (AudioChannel in the original C++) is one mixer slot: a
// fractional read position into a sample, a step size, volume, pan,
// loop discipline, and an active flag. render_voice is the pure
// function that advances one voice by F frames into a scratch buffer.
//
// This is the real-time path. render_voice performs no allocation, no
// I/O, no locking: it only touches the voice's own fields, the
// SampleBank entry it reads from, and the caller-supplied scratch
// buffer.
// ============================================================================

use crate::sample::{LoopParams, SampleBank, SampleId};

/// One interleaved stereo output frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

/// A single playback slot in the mixer.
#[derive(Clone, Debug)]
pub struct Voice {
    volume: f32,
    panning: f32,

    /// Fractional read position into `sample`. f64 rather than f32 so
    /// long-running loops don't accumulate audible drift from repeated
    /// += sample_step additions (see DESIGN.md, Open Question b).
    sample_index: f64,

    /// Per-output-frame increment. May be negative mid-ping-pong.
    sample_step: f64,

    loop_params: LoopParams,
    sample: Option<SampleId>,
    active: bool,
    sample_rate: u32,
}

impl Voice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            volume: 1.0,
            panning: 0.0,
            sample_index: 0.0,
            sample_step: 0.0,
            loop_params: LoopParams::Off,
            sample: None,
            active: false,
            sample_rate,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn panning(&self) -> f32 {
        self.panning
    }

    pub fn sample_step(&self) -> f64 {
        self.sample_step
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Clamps to [0, 1]. Always succeeds.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Clamps to [-1, 1]. Always succeeds. -1 is full-left, +1 full-right.
    pub fn set_panning(&mut self, panning: f32) {
        self.panning = panning.clamp(-1.0, 1.0);
    }

    /// Sets `sample_step` from a playback rate in Hz. A no-op when
    /// `rate_hz <= 0`.
    pub fn set_playback_rate(&mut self, rate_hz: f64) {
        if rate_hz > 0.0 {
            self.sample_step = rate_hz / self.sample_rate as f64;
        }
    }

    /// Starts playback: resets the read position to 0 and activates
    /// the voice. `loop_params` is snapshotted here and not mutated
    /// again while the voice plays.
    pub fn play(&mut self, sample: SampleId, loop_params: LoopParams) {
        self.sample = Some(sample);
        self.loop_params = loop_params;
        self.sample_index = 0.0;
        self.active = true;
    }

    pub fn enable(&mut self) {
        self.active = true;
    }

    pub fn disable(&mut self) {
        self.active = false;
    }

    pub fn sample_id(&self) -> Option<SampleId> {
        self.sample
    }
}

/// Advances `voice` by up to `scratch.len()` frames, writing its
/// contribution into `scratch`. Frames beyond where the voice becomes
/// inactive are zeroed. Reads sample data from `bank`; if the voice's
/// sample id isn't present in `bank` the voice is treated as silent
/// and deactivated (this can only happen if a caller played a sample
/// id from a different bank - not a real-time failure mode, just a
/// defensive no-op since this function has no error channel).
pub fn render_voice(voice: &mut Voice, scratch: &mut [StereoFrame], bank: &SampleBank) {
    let right_pan = voice.panning * 0.5 + 0.5;
    let left_pan = 1.0 - right_pan;

    let Some(sample_id) = voice.sample else {
        voice.active = false;
        for frame in scratch.iter_mut() {
            *frame = StereoFrame::default();
        }
        return;
    };
    let Some(sample) = bank.get(sample_id) else {
        voice.active = false;
        for frame in scratch.iter_mut() {
            *frame = StereoFrame::default();
        }
        return;
    };

    let len = sample.len();
    let mut written = 0;

    while written < scratch.len() && voice.active {
        let i = voice.sample_index.floor() as usize;
        let frac = (voice.sample_index - i as f64) as f32;

        let s0 = sample.at(i);
        let s1 = sample.at((i + 1) % len);
        let interpolated = s0 + frac * (s1 - s0);
        let scaled = interpolated * voice.volume;

        scratch[written] = StereoFrame {
            left: scaled * left_pan,
            right: scaled * right_pan,
        };
        written += 1;

        voice.sample_index += voice.sample_step;

        match voice.loop_params {
            LoopParams::Off => {
                if voice.sample_index >= len as f64 {
                    voice.active = false;
                }
            }
            LoopParams::Forward { end, .. } => {
                if voice.sample_index >= end as f64 {
                    voice.sample_index -= voice.loop_params.length() as f64;
                }
            }
            LoopParams::PingPong { begin, end } => {
                if voice.sample_step > 0.0 && voice.sample_index >= end as f64 {
                    voice.sample_index = end as f64 - (voice.sample_index - end as f64) - 1.0;
                    voice.sample_step = -voice.sample_step;
                } else if voice.sample_step < 0.0 && voice.sample_index < begin as f64 {
                    voice.sample_index = begin as f64 + (begin as f64 - voice.sample_index);
                    voice.sample_step = -voice.sample_step;
                }
            }
        }
    }

    for frame in &mut scratch[written..] {
        *frame = StereoFrame::default();
    }
}
