// ============================================================================
// SAMPLE.RS - Wavetable Storage and Loop Parameters
// ============================================================================
//
// A Sample owns an immutable array of mono float amplitudes (the
// "wavetable"). Samples are session-scoped: they are created at load
// time and live for as long as any voice might reference them.
//
// Voices never own a Sample's storage. The voice -> sample relationship
// is modeled as an index into a session-owned SampleBank (see Design
// Notes in SPEC_FULL.md 10.6 / spec.md 9) rather than a raw pointer or
// an Arc: this avoids both lifetime gymnastics and the atomic-refcount
// traffic of cloning an Arc on every `play()` call, and it makes the
// "sample bank must outlive all voices" requirement a borrow-checked
// fact instead of a runtime invariant callers have to remember.
// ============================================================================

/// Loop discipline for a voice's read cursor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoopParams {
    /// Play once, then stop.
    Off,

    /// Wrap back to `begin` when `end` is reached.
    Forward { begin: usize, end: usize },

    /// Reflect direction at `begin`/`end` instead of wrapping.
    PingPong { begin: usize, end: usize },
}

impl LoopParams {
    /// `end - begin`, the span covered by a forward or ping-pong loop.
    /// Panics if called on `Off` - callers only use this inside the
    /// branches that already know the loop is active.
    pub fn length(&self) -> usize {
        match *self {
            LoopParams::Off => 0,
            LoopParams::Forward { begin, end } | LoopParams::PingPong { begin, end } => end - begin,
        }
    }

    pub fn begin(&self) -> usize {
        match *self {
            LoopParams::Off => 0,
            LoopParams::Forward { begin, .. } | LoopParams::PingPong { begin, .. } => begin,
        }
    }

    pub fn end(&self) -> usize {
        match *self {
            LoopParams::Off => 0,
            LoopParams::Forward { end, .. } | LoopParams::PingPong { end, .. } => end,
        }
    }

    /// Validates `0 <= begin < end <= len`. Loop metadata is supplied
    /// at play time and is never mutated during playback, so this is
    /// the one place it needs checking.
    pub fn is_valid_for_len(&self, len: usize) -> bool {
        match *self {
            LoopParams::Off => true,
            LoopParams::Forward { begin, end } | LoopParams::PingPong { begin, end } => {
                begin < end && end <= len
            }
        }
    }
}

/// An immutable block of mono audio (the "wavetable") plus nothing
/// else - loop metadata belongs to the voice, not the sample, since
/// several voices can play the same sample with different loop points
/// (e.g. IT's per-note sustain vs. release loop).
#[derive(Clone, Debug)]
pub struct Sample {
    wavetable: Vec<f32>,
}

impl Sample {
    pub fn new(wavetable: Vec<f32>) -> Self {
        Self { wavetable }
    }

    pub fn len(&self) -> usize {
        self.wavetable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavetable.is_empty()
    }

    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        self.wavetable[index]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.wavetable
    }
}

/// Opaque handle into a `SampleBank`. Cheap to copy, carries no
/// lifetime, so voices can hold one across many `play()` calls without
/// borrowing the bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u32);

/// Session-owned storage for every sample a module can reference.
/// Outlives every voice that plays from it.
#[derive(Clone, Debug, Default)]
pub struct SampleBank {
    samples: Vec<Sample>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn insert(&mut self, sample: Sample) -> SampleId {
        let id = SampleId(self.samples.len() as u32);
        self.samples.push(sample);
        id
    }

    pub fn get(&self, id: SampleId) -> Option<&Sample> {
        self.samples.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
