// ============================================================================
// MAIN.RS - Thin Demo Binary
// ============================================================================
//
// Loads an IT module, prints a summary of what the loader found, then
// renders the whole song to a WAV file (or, behind `--features audio`,
// plays it live through the default output device). A full CLI with
// flags, a textual pattern dump, and a raw single-sample loader are all
// out-of-scope collaborators per spec.md 1 - this binary exists only to
// exercise the library end to end.
//
// Since decoding the IT sample/instrument blocks themselves is outside
// this spec's scope (spec.md 1's "compressed samples" non-goal, and the
// loader only reads header/order/pattern data), every instrument
// referenced by the loaded patterns is backed here by a short synthesized
// tone rather than real sample data - enough to make the mixer and
// sequencer audibly do their jobs on a real file.
// ============================================================================

use std::collections::HashSet;
use std::env;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use it_tracker::sample::{Sample, SampleBank, SampleId};
use it_tracker::voice::StereoFrame;
use it_tracker::{load_module, Engine, Module, PlayerConfig};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(input_path) = args.get(1) else {
        eprintln!("usage: tracker <module.it> [output.wav]");
        std::process::exit(2);
    };

    let bytes = fs::read(input_path).with_context(|| format!("reading {}", input_path))?;
    let module = load_module(&bytes).with_context(|| format!("parsing {}", input_path))?;

    println!("song: {}", module.song_name);
    println!("orders: {}", module.orders.len());
    println!("patterns: {}", module.patterns.len());

    let bank = placeholder_bank(&module);
    let config = PlayerConfig::default();

    #[cfg(feature = "audio")]
    {
        if args.get(2).map(String::as_str) == Some("--play") {
            return play_live(config, module, bank);
        }
    }

    let output_path = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| generate_wav_filename(input_path));
    render_to_wav(config, module, bank, Path::new(&output_path))?;
    println!("wrote {}", output_path);
    Ok(())
}

/// Renders `seconds` of audio and writes it to a WAV file.
fn render_to_wav(config: PlayerConfig, module: Module, bank: SampleBank, path: &Path) -> Result<()> {
    const SECONDS: f64 = 20.0;
    let sample_rate = config.sample_rate;
    let chunk = config.max_frames;
    let mut engine = Engine::new(config, module, bank).map_err(|e| anyhow::anyhow!(e))?;

    let total_frames = (sample_rate as f64 * SECONDS) as usize;
    let mut interleaved = Vec::with_capacity(total_frames * 2);
    let mut scratch = vec![StereoFrame::default(); chunk];

    let mut remaining = total_frames;
    while remaining > 0 {
        let span = remaining.min(chunk);
        engine.render(&mut scratch[..span]);
        for frame in &scratch[..span] {
            interleaved.push(frame.left.clamp(-1.0, 1.0));
            interleaved.push(frame.right.clamp(-1.0, 1.0));
        }
        remaining -= span;
    }

    write_wav_file(path, &interleaved, sample_rate)
}

#[cfg(feature = "audio")]
fn play_live(config: PlayerConfig, module: Module, bank: SampleBank) -> Result<()> {
    use it_tracker::host::AudioHost;
    use std::io::{self, Read};

    let host = AudioHost::start(config, module, bank)?;
    println!("playing - press enter to stop");
    let _ = io::stdin().read(&mut [0u8]);
    host.stop()?;
    Ok(())
}

/// Builds a bank with one short sine-wave sample per distinct instrument
/// index referenced anywhere in `module`'s patterns, so note-on events
/// always resolve to something audible.
fn placeholder_bank(module: &Module) -> SampleBank {
    const PLACEHOLDER_RATE: u32 = 44100;
    const PLACEHOLDER_SECONDS: f32 = 0.25;

    let mut instruments: HashSet<u8> = HashSet::new();
    for pattern in &module.patterns {
        for row in 0..pattern.row_count() {
            for entry in pattern.row(row) {
                if let Some(index) = entry.instrument.index() {
                    instruments.insert(index);
                }
            }
        }
    }

    let mut bank = SampleBank::new();
    let max_index = instruments.iter().copied().max().unwrap_or(0);
    for index in 0..=max_index {
        let frequency = 220.0 + 20.0 * index as f32;
        let sample_count = (PLACEHOLDER_RATE as f32 * PLACEHOLDER_SECONDS) as usize;
        let wavetable: Vec<f32> = (0..sample_count)
            .map(|i| {
                let t = i as f32 / PLACEHOLDER_RATE as f32;
                (2.0 * PI * frequency * t).sin() * 0.5
            })
            .collect();
        let id = bank.insert(Sample::new(wavetable));
        debug_assert_eq!(id, SampleId(index as u32));
    }
    bank
}

/// "song.it" -> "song.wav"
fn generate_wav_filename(input_path: &str) -> String {
    let path = Path::new(input_path);
    match (path.file_stem(), path.parent()) {
        (Some(stem), Some(parent)) if !parent.as_os_str().is_empty() => {
            format!("{}/{}.wav", parent.display(), stem.to_string_lossy())
        }
        (Some(stem), _) => format!("{}.wav", stem.to_string_lossy()),
        (None, _) => "output.wav".to_string(),
    }
}

/// Writes interleaved stereo `f32` samples as a 32-bit float WAV file.
/// Hand-rolled the same way the teacher's own `audio::write_wav_file`
/// is: no dependency on a WAV crate for a four-chunk, no-compression
/// container.
fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    use std::io::Write;

    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 32;
    let bytes_per_sample = bits_per_sample / 8;
    let block_align = num_channels * bytes_per_sample;
    let byte_rate = sample_rate * block_align as u32;
    let audio_data_bytes = samples.len() as u32 * bytes_per_sample as u32;
    let fact_chunk_bytes = 8 + 4;
    let riff_chunk_size = 4 + (8 + 16) + fact_chunk_bytes + (8 + audio_data_bytes);

    writer.write_all(b"RIFF")?;
    writer.write_all(&riff_chunk_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&3u16.to_le_bytes())?; // IEEE float
    writer.write_all(&num_channels.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&byte_rate.to_le_bytes())?;
    writer.write_all(&block_align.to_le_bytes())?;
    writer.write_all(&bits_per_sample.to_le_bytes())?;

    writer.write_all(b"fact")?;
    writer.write_all(&4u32.to_le_bytes())?;
    writer.write_all(&(samples.len() as u32 / num_channels as u32).to_le_bytes())?;

    writer.write_all(b"data")?;
    writer.write_all(&audio_data_bytes.to_le_bytes())?;
    for &sample in samples {
        writer.write_all(&sample.to_le_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_filename_replaces_extension() {
        assert_eq!(generate_wav_filename("song.it"), "song.wav");
        assert_eq!(generate_wav_filename("assets/song.it"), "assets/song.wav");
    }

    #[test]
    fn placeholder_bank_covers_every_referenced_instrument() {
        use it_tracker::pattern::{Instrument, Note, Pattern, PatternEntry};

        let mut pattern = Pattern::with_row_count(1);
        pattern.set(0, 0, PatternEntry { note: Note(60), instrument: Instrument(2), ..Default::default() });
        let module = Module::new("demo".to_string(), vec![0], vec![pattern]);

        let bank = placeholder_bank(&module);
        assert_eq!(bank.len(), 3); // indices 0, 1, 2
        assert!(bank.get(SampleId(2)).is_some());
    }
}
