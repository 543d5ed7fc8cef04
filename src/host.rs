// ============================================================================
// HOST.RS - Playback Engine Configuration and Audio-Driver Bridge
// ============================================================================
//
// Two things live here:
// - `PlayerConfig` + `Engine`: the feature-independent glue between the
//   sequencer and the mixer. `Engine::render` is what a host audio
//   driver calls once per callback; it advances the sequencer by
//   however many ticks elapsed, applies the resulting voice-control
//   events, then asks the mixer to fill the buffer. This is the
//   "Host bridge" component from spec.md 2.
// - `AudioHost` (feature = "audio"): an actual miniaudio-backed output
//   device, modeled on the teacher's own
//   `fft_analyzer::audio_player::AudioPlayer` (a `miniaudio::Device`
//   whose data callback locks an `Arc<Mutex<..>>`).
//
// Per spec.md 5's sanctioned simplest deployment, the sequencer tick
// runs on the same thread as the render call (interleaved between
// frame windows), so there is no cross-thread voice-parameter channel
// to build here.
// ============================================================================

use crate::module::Module;
use crate::player::{PlayerContext, RowEvent};
use crate::sample::{LoopParams, SampleBank, SampleId};
use crate::voice::StereoFrame;
use crate::Mixer;

/// Tunables for one playback session. Modeled on the teacher's
/// `tracker::engine::EngineConfig`: a plain `Clone + Debug` struct with
/// a hand-written `Default`, passed explicitly at construction rather
/// than pulled from global or environment state.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Voice pool size. IT's `max_channels` is 64; this need not match
    /// the module's channel count exactly, but 64 is a safe default.
    pub max_voices: usize,
    /// Maximum frames the host will ever request in one `render` call.
    pub max_frames: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { sample_rate: 44100, max_voices: 64, max_frames: 4096 }
    }
}

/// Owns the mixer, the sample bank, the loaded module, and the
/// sequencer for one playback session, and converts elapsed audio time
/// into sequencer ticks.
pub struct Engine {
    mixer: Mixer,
    bank: SampleBank,
    module: Module,
    player: PlayerContext,
    sample_rate: u32,
    frames_until_next_tick: f64,
    scratch: Vec<StereoFrame>,
}

impl Engine {
    pub fn new(config: PlayerConfig, module: Module, bank: SampleBank) -> Result<Self, crate::error::ArgumentError> {
        let mixer = Mixer::new(config.max_voices, config.max_frames, config.sample_rate)?;
        let player = PlayerContext::new();
        Ok(Self {
            mixer,
            bank,
            module,
            player,
            sample_rate: config.sample_rate,
            // Per spec.md 4.4, `ticks_to_next_row` starts at 0, so row 0
            // is entered on the very first tick rather than after one
            // tick's worth of frames has already played as silence.
            frames_until_next_tick: 0.0,
            scratch: vec![StereoFrame::default(); config.max_frames],
        })
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn player(&self) -> &PlayerContext {
        &self.player
    }

    /// Renders `out.len()` stereo frames, advancing the sequencer by
    /// however many ticks elapse within that span. `out.len()` must not
    /// exceed the `max_frames` the engine was constructed with.
    pub fn render(&mut self, out: &mut [StereoFrame]) {
        debug_assert!(out.len() <= self.scratch.len());
        let mut remaining = out.len();
        let mut written = 0;

        while remaining > 0 {
            if self.frames_until_next_tick <= 0.0 {
                let events = self.player.tick(&self.module);
                apply_events(&mut self.mixer, &self.bank, &events);
                self.frames_until_next_tick += frames_per_tick(self.sample_rate, self.player.tempo());
            }

            let span = remaining.min(self.frames_until_next_tick.ceil() as usize).max(1).min(remaining);
            self.mixer.render(&mut self.scratch[written..written + span], &self.bank);
            out[written..written + span].copy_from_slice(&self.scratch[written..written + span]);

            self.frames_until_next_tick -= span as f64;
            written += span;
            remaining -= span;
        }
    }
}

/// `period = (32 * base[0]) >> 0` at octave 0, semitone C - the period
/// this engine's reference pitch (8363 Hz, the standard IT/MOD middle-C
/// sampling rate) corresponds to.
const REFERENCE_PERIOD: f64 = (32 * crate::pattern::BASE_PERIODS[0]) as f64;
const REFERENCE_FREQ_HZ: f64 = 8363.0;

/// Converts a note period (spec.md 3's Amiga-style period) to a
/// playback rate in Hz for `Voice::set_playback_rate`. Periods are
/// inversely proportional to frequency (see GLOSSARY); this engine
/// calibrates that relationship against the period/frequency pair IT
/// itself uses for an unshifted middle-C sample. No reference tracker
/// was available in this environment to check this against; documented
/// here as the resolution of the same open mapping question DESIGN.md
/// already records for `volume_column_pan`.
fn period_to_frequency(period: u32) -> f64 {
    if period == 0 {
        return 0.0;
    }
    REFERENCE_FREQ_HZ * REFERENCE_PERIOD / period as f64
}

/// Applies the `instrument` field of a `NoteOn` directly as a
/// `SampleId` into `bank`. A dedicated instrument -> sample indirection
/// (with its own envelopes, NNAs, and sustain/release loop selection)
/// is out of scope (spec.md 1); this engine treats instrument index and
/// sample id as the same number, and always plays the sample without a
/// loop, since nothing in a `RowEvent` carries loop metadata to pick one.
fn apply_events(mixer: &mut Mixer, bank: &SampleBank, events: &[RowEvent]) {
    for event in events {
        match *event {
            RowEvent::NoteOn { channel, volume, instrument, period } => {
                if let Ok(voice) = mixer.voice_mut(channel) {
                    if let Some(index) = instrument {
                        let sample_id = SampleId(index as u32);
                        if bank.get(sample_id).is_some() {
                            voice.play(sample_id, LoopParams::Off);
                            voice.set_playback_rate(period_to_frequency(period));
                        }
                    }
                    voice.set_volume(volume as f32 / 64.0);
                }
            }
            RowEvent::VolumeChange { channel, volume } => {
                if let Ok(voice) = mixer.voice_mut(channel) {
                    voice.set_volume(volume as f32 / 64.0);
                }
            }
            RowEvent::PanningChange { channel, pan } => {
                if let Ok(voice) = mixer.voice_mut(channel) {
                    voice.set_panning(pan);
                }
            }
        }
    }
}

/// Ticks per second is read directly from `tempo` per spec.md's glossary
/// ("Tempo: ticks per second"); frames per tick follows from the output
/// sample rate. `tempo` of zero is nonsensical and floored at 1 to avoid
/// dividing by zero.
fn frames_per_tick(sample_rate: u32, tempo: u8) -> f64 {
    sample_rate as f64 / tempo.max(1) as f64
}

#[cfg(feature = "audio")]
mod audio_device {
    use super::*;
    use miniaudio::{Device, DeviceConfig, DeviceType, Format};
    use std::sync::{Arc, Mutex};

    /// A live miniaudio playback device driving an `Engine` in its data
    /// callback. Modeled on
    /// `fft_analyzer::audio_player::AudioPlayer::init_device`.
    pub struct AudioHost {
        device: Device,
        _engine: Arc<Mutex<Engine>>,
    }

    impl AudioHost {
        /// Starts playback of `module` immediately. The caller keeps
        /// `AudioHost` alive for as long as audio should play; dropping
        /// it stops the device.
        pub fn start(config: PlayerConfig, module: Module, bank: SampleBank) -> anyhow::Result<Self> {
            let sample_rate = config.sample_rate;
            let max_frames = config.max_frames;
            let engine = Engine::new(config, module, bank).map_err(|e| anyhow::anyhow!(e))?;
            let engine = Arc::new(Mutex::new(engine));
            let engine_for_callback = Arc::clone(&engine);

            let mut device_config = DeviceConfig::new(DeviceType::Playback);
            device_config.playback_mut().set_format(Format::F32);
            device_config.playback_mut().set_channels(2);
            device_config.set_sample_rate(sample_rate);

            // Sized once here and reused on every callback - the data
            // callback runs on the audio thread and must not allocate.
            let mut scratch = vec![StereoFrame::default(); max_frames];

            device_config.set_data_callback(move |_device, output, _input| {
                let mut engine = engine_for_callback.lock().unwrap();
                let frames = output.as_samples_mut::<f32>();
                let frame_count = (frames.len() / 2).min(scratch.len());
                let scratch = &mut scratch[..frame_count];

                engine.render(scratch);

                for (frame, out_pair) in scratch.iter().zip(frames.chunks_exact_mut(2)) {
                    out_pair[0] = frame.left;
                    out_pair[1] = frame.right;
                }
            });

            let device = Device::new(None, &device_config)
                .map_err(|e| anyhow::anyhow!("failed to create audio device: {:?}", e))?;
            device.start().map_err(|e| anyhow::anyhow!("failed to start audio device: {:?}", e))?;

            Ok(Self { device, _engine: engine })
        }

        pub fn stop(&self) -> anyhow::Result<()> {
            self.device.stop().map_err(|e| anyhow::anyhow!("failed to stop audio device: {:?}", e))
        }
    }
}

#[cfg(feature = "audio")]
pub use audio_device::AudioHost;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Instrument, Note, Pattern, PatternEntry};
    use crate::sample::Sample;

    fn single_note_module() -> (Module, SampleBank) {
        let mut bank = SampleBank::new();
        let id = bank.insert(Sample::new(vec![1.0, 1.0, 1.0, 1.0]));

        let mut pattern = Pattern::with_row_count(1);
        pattern.set(
            0,
            0,
            PatternEntry { note: Note(60), instrument: Instrument(id.0 as u8), ..Default::default() },
        );
        let module = Module::new("demo".to_string(), vec![0], vec![pattern]);
        (module, bank)
    }

    #[test]
    fn frames_per_tick_uses_tempo_as_ticks_per_second() {
        assert_eq!(frames_per_tick(44100, 128), 44100.0 / 128.0);
        assert_eq!(frames_per_tick(44100, 0), 44100.0);
    }

    #[test]
    fn engine_applies_note_on_before_the_tick_boundary_is_crossed() {
        let (module, bank) = single_note_module();
        let config = PlayerConfig { sample_rate: 44100, max_voices: 4, max_frames: 64 };
        let mut engine = Engine::new(config, module, bank).unwrap();
        // Engine::new starts `frames_until_next_tick` at 0.0, so row 0's
        // note-on applies on the very first `render` call, with no
        // leading tick of silence.
        let mut out = vec![StereoFrame::default(); 8];
        engine.render(&mut out);

        assert_eq!(engine.mixer.voice(0).unwrap().volume(), 1.0);
        assert!(engine.mixer.voice(0).unwrap().is_active());
    }

    #[test]
    fn render_never_exceeds_requested_frame_count() {
        let (module, bank) = single_note_module();
        let config = PlayerConfig { sample_rate: 44100, max_voices: 4, max_frames: 256 };
        let mut engine = Engine::new(config, module, bank).unwrap();
        let mut out = vec![StereoFrame::default(); 200];
        engine.render(&mut out);
        assert_eq!(out.len(), 200);
    }
}
