// ============================================================================
// LIB.RS - Crate Root
// ============================================================================
//
// A software music tracker: a real-time sample mixer plus an Impulse
// Tracker (.it) module loader and tick-driven pattern sequencer. See
// DESIGN.md for how each module below is grounded, and SPEC_FULL.md for
// the full requirements this crate implements.
// ============================================================================

pub mod error;
pub mod host;
pub mod it;
pub mod mixer;
pub mod module;
pub mod pattern;
pub mod player;
pub mod sample;
pub mod voice;

pub use error::{ArgumentError, LoadError};
pub use host::{Engine, PlayerConfig};
pub use it::load_module;
pub use mixer::Mixer;
pub use module::Module;
pub use pattern::{Command, Instrument, Note, Pattern, PatternEntry};
pub use player::{PlayerContext, RowEvent};
pub use sample::{LoopParams, Sample, SampleBank, SampleId};
pub use voice::{StereoFrame, Voice};
