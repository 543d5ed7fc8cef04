// ============================================================================
// PLAYER.RS - Tick-Driven Pattern Sequencer
// ============================================================================
//
// PlayerContext owns only the cursor/tick state; the Module it drives
// is passed into `tick()` rather than stored, so a PlayerContext has no
// lifetime of its own and can sit next to its Module in the same owning
// struct (see host.rs's Engine) without becoming self-referential.
//
// The "subtle ordering" in spec.md 4.4 is the whole of this file's
// design: a row is only entered when `ticks_to_next_row` is already
// zero, and the refill + decrement happen in that same call. On every
// other tick, tick() is a plain decrement. Getting this backwards
// (refilling before checking, or checking after decrementing) changes
// the cadence by one tick and is exactly the kind of off-by-one this
// state machine exists to pin down.
// ============================================================================

use crate::module::{Module, ORDER_END, ORDER_SEPARATOR};
use crate::pattern::{Command, Pattern, DEFAULT_ROWS, MAX_CHANNELS};

/// Per-channel sequencer state, independent of any particular Voice.
#[derive(Clone, Copy, Debug)]
pub struct HostChannel {
    /// Last instrument/sample slot selected by a note-on, if any.
    pub sample_index: Option<u8>,
    /// Last note period, if a note has ever played on this channel.
    pub period: Option<u32>,
    pub volume: u8,
    /// Transient edge flag: true only during the tick a note-on fired.
    pub new_note: bool,
}

impl Default for HostChannel {
    fn default() -> Self {
        Self { sample_index: None, period: None, volume: 64, new_note: false }
    }
}

/// A voice-control event produced by row entry, to be applied by the
/// host bridge to a Mixer voice. Values are carried, not applied here:
/// PlayerContext has no reference to a Mixer and makes no voice calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RowEvent {
    NoteOn { channel: usize, period: u32, instrument: Option<u8>, volume: u8 },
    VolumeChange { channel: usize, volume: u8 },
    /// Pan value already mapped onto `[-1, +1]` (see `volume_column_pan`).
    PanningChange { channel: usize, pan: f32 },
}

pub struct PlayerContext {
    host_channels: [HostChannel; MAX_CHANNELS],
    ticks_to_next_row: u32,
    current_row: usize,
    breaking_row: usize,
    current_order: usize,
    ticks_per_row: u8,
    tempo: u8,
}

/// Maps a volume-column `SetPanning` parameter (as stored by the loader,
/// see `it::unpack`) onto the `[-1, +1]` voice pan axis. See DESIGN.md's
/// resolution of the spec's open question on this mapping.
pub fn volume_column_pan(param: u8) -> f32 {
    (param as f32 / 64.0) * 2.0 - 1.0
}

impl PlayerContext {
    pub fn new() -> Self {
        Self {
            host_channels: [HostChannel::default(); MAX_CHANNELS],
            ticks_to_next_row: 0,
            current_row: 0,
            breaking_row: DEFAULT_ROWS,
            current_order: 0,
            ticks_per_row: 6,
            tempo: 128,
        }
    }

    pub fn host_channel(&self, channel: usize) -> &HostChannel {
        &self.host_channels[channel]
    }

    pub fn current_row(&self) -> usize {
        self.current_row
    }

    pub fn current_order(&self) -> usize {
        self.current_order
    }

    pub fn ticks_per_row(&self) -> u8 {
        self.ticks_per_row
    }

    pub fn tempo(&self) -> u8 {
        self.tempo
    }

    fn current_pattern<'m>(&self, module: &'m Module) -> Option<&'m Pattern> {
        let pattern_index = *module.orders.get(self.current_order)?;
        if pattern_index == ORDER_SEPARATOR || pattern_index == ORDER_END {
            return None;
        }
        module.pattern(pattern_index as usize)
    }

    /// Advances the sequencer by one tick against `module`. Returns the
    /// events produced by row entry, or an empty vector on ticks that
    /// only count down.
    pub fn tick(&mut self, module: &Module) -> Vec<RowEvent> {
        let events = if self.ticks_to_next_row == 0 {
            let events = self.enter_row(module);
            self.advance_row_cursor(module);
            self.ticks_to_next_row = self.ticks_per_row as u32;
            events
        } else {
            Vec::new()
        };
        self.ticks_to_next_row = self.ticks_to_next_row.saturating_sub(1);
        events
    }

    fn enter_row(&mut self, module: &Module) -> Vec<RowEvent> {
        for channel in self.host_channels.iter_mut() {
            channel.new_note = false;
        }

        let Some(pattern) = self.current_pattern(module) else {
            return Vec::new();
        };
        if self.current_row >= pattern.row_count() {
            return Vec::new();
        }

        let row = *pattern.row(self.current_row);
        let mut events = Vec::new();

        for (channel_index, entry) in row.iter().enumerate() {
            let channel = &mut self.host_channels[channel_index];

            if entry.note.is_note() {
                let period = entry.note.period().expect("is_note() implies a period");
                let volume = match entry.vol_command {
                    Command::SetVolume(v) => v,
                    _ => 64,
                };
                let instrument = entry.instrument.index();
                channel.period = Some(period);
                channel.sample_index = instrument;
                channel.volume = volume;
                channel.new_note = true;
                events.push(RowEvent::NoteOn { channel: channel_index, period, instrument, volume });
            }

            match entry.vol_command {
                Command::SetVolume(v) => {
                    channel.volume = v;
                    events.push(RowEvent::VolumeChange { channel: channel_index, volume: v });
                }
                Command::SetPanning(p) => {
                    events.push(RowEvent::PanningChange { channel: channel_index, pan: volume_column_pan(p) });
                }
                _ => {}
            }

            match entry.fx_command {
                Command::SetSpeed(n) => self.ticks_per_row = n,
                Command::SetTempo(n) => self.tempo = n,
                _ => {}
            }
        }

        events
    }

    fn advance_row_cursor(&mut self, module: &Module) {
        self.current_row += 1;
        if self.current_row >= self.breaking_row {
            self.advance_order(module);
            self.current_row = 0;
            self.breaking_row = self.current_pattern(module).map(|p| p.row_count()).unwrap_or(DEFAULT_ROWS);
        }
    }

    fn advance_order(&mut self, module: &Module) {
        let orders = &module.orders;
        let mut cursor = self.current_order + 1;
        self.current_order = loop {
            match orders.get(cursor) {
                None => break 0,
                Some(&ORDER_SEPARATOR) => {
                    cursor += 1;
                    continue;
                }
                Some(&ORDER_END) => break 0,
                Some(_) => break cursor,
            }
        };
    }
}

impl Default for PlayerContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Instrument, Note, PatternEntry};

    fn note_on_pattern(note: u8) -> Pattern {
        let mut pattern = Pattern::with_row_count(1);
        pattern.set(0, 0, PatternEntry { note: Note(note), instrument: Instrument(0), ..Default::default() });
        pattern
    }

    #[test]
    fn sequencer_cadence_fires_every_ticks_per_row() {
        // Four rows, each carrying a note, so every row-entry this test
        // walks through produces a non-empty event list - the test only
        // cares about *when* row entry fires, not its content.
        let mut pattern = Pattern::with_row_count(4);
        for row in 0..4 {
            pattern.set(row, 0, PatternEntry { note: Note(60), instrument: Instrument(0), ..Default::default() });
        }
        let module = Module::new("song".to_string(), vec![0], vec![pattern]);
        let mut player = PlayerContext::new();
        player.ticks_per_row = 3;
        player.breaking_row = 4; // never advance order within this test

        let mut fired_at = Vec::new();
        for tick_index in 0..10 {
            let events = player.tick(&module);
            if !events.is_empty() {
                fired_at.push(tick_index);
            }
        }
        assert_eq!(fired_at, vec![0, 3, 6, 9]);
    }

    #[test]
    fn note_on_sets_host_channel_state() {
        let module = Module::new("song".to_string(), vec![0], vec![note_on_pattern(60)]);
        let mut player = PlayerContext::new();
        let events = player.tick(&module);
        assert_eq!(events.len(), 1);
        match events[0] {
            RowEvent::NoteOn { channel, period, instrument, volume } => {
                assert_eq!(channel, 0);
                assert_eq!(period, Note(60).period().unwrap());
                assert_eq!(instrument, Some(0));
                assert_eq!(volume, 64);
            }
            other => panic!("expected NoteOn, got {:?}", other),
        }
        assert!(player.host_channel(0).new_note);
    }

    #[test]
    fn order_skip_and_wrap() {
        let module = Module::new(
            "song".to_string(),
            vec![0, ORDER_SEPARATOR, ORDER_SEPARATOR, 1, ORDER_END],
            vec![Pattern::with_row_count(1), Pattern::with_row_count(1)],
        );
        let mut player = PlayerContext::new();
        player.breaking_row = 1; // force row 0 to be the whole pattern
        player.ticks_per_row = 1; // force every tick to process a row

        player.tick(&module); // processes order 0 / pattern 0, row 0 -> advances
        assert_eq!(player.current_order(), 3); // skip 254,254, landed on order index 3 (pattern 1)

        player.tick(&module); // processes order 3 / pattern 1, row 0 -> advances
        assert_eq!(player.current_order(), 0); // wraps at 255
    }

    #[test]
    fn set_speed_effect_updates_ticks_per_row() {
        let mut pattern = Pattern::with_row_count(1);
        pattern.set(0, 0, PatternEntry { fx_command: Command::SetSpeed(4), ..Default::default() });
        let module = Module::new("song".to_string(), vec![0], vec![pattern]);
        let mut player = PlayerContext::new();
        player.tick(&module);
        assert_eq!(player.ticks_per_row(), 4);
    }

    #[test]
    fn volume_column_pan_maps_full_range() {
        assert!((volume_column_pan(0) - (-1.0)).abs() < 1e-6);
        assert!((volume_column_pan(64) - 1.0).abs() < 1e-6);
        assert!(volume_column_pan(32).abs() < 1e-6);
    }
}
