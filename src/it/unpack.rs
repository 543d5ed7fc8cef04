// ============================================================================
// UNPACK.RS - Mask-Driven Packed Pattern Stream Decoder
// ============================================================================
//
// Decodes one pattern's delta-encoded, mask-driven byte stream into a
// random-access Pattern grid. State machine per spec.md 4.3: a
// "last mask" and "last full entry" per channel, since IT only emits
// the fields that changed from the previous row a channel was touched.
//
// This is a stateful, variable-length walk rather than a fixed layout,
// so it's hand-rolled over a bounds-checked cursor instead of nom -
// exactly what spec.md's Design Notes (9) recommend for on-disk
// layouts that aren't simple fixed structs.
// ============================================================================

use crate::error::{ErrorLocation, LoadError};
use crate::pattern::{Command, Instrument, Note, Pattern, PatternEntry, MAX_CHANNELS};

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    pattern_index: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pattern_index: usize) -> Self {
        Self { data, pos: 0, pattern_index }
    }

    fn read_u8(&mut self) -> Result<u8, LoadError> {
        let byte = *self.data.get(self.pos).ok_or_else(|| {
            LoadError::format(
                ErrorLocation::in_pattern(self.pattern_index, self.pos),
                "packed pattern stream ended before row_num rows were decoded",
            )
        })?;
        self.pos += 1;
        Ok(byte)
    }
}

#[derive(Clone, Copy, Default)]
struct ChannelState {
    mask: u8,
    entry: PatternEntry,
}

/// Decodes `data` (exactly `packed_data_length` bytes, per spec.md 4.3)
/// into a `Pattern` of `row_num` rows. Never reads past `data`'s end.
/// A stream may legally run out of bytes before `row_num` rows are
/// filled (the trailing empty rows of a pattern are simply not
/// encoded) - only a truncation *inside* an entry still being read is
/// an error, not reaching the end of the buffer between entries.
pub fn decode_pattern_stream(
    data: &[u8],
    row_num: usize,
    pattern_index: usize,
) -> Result<Pattern, LoadError> {
    let mut pattern = Pattern::with_row_count(row_num);
    let mut channel_state = [ChannelState::default(); MAX_CHANNELS];
    let mut cursor = Cursor::new(data, pattern_index);

    let mut row = 0usize;
    while row < row_num && cursor.pos < data.len() {
        let channel_variable = cursor.read_u8()?;
        if channel_variable == 0 {
            row += 1;
            continue;
        }

        let channel = ((channel_variable.wrapping_sub(1)) & 63) as usize;

        if channel_variable & 0x80 != 0 {
            let mask = cursor.read_u8()?;
            channel_state[channel].mask = mask;
        }
        let mask = channel_state[channel].mask;

        if mask & 0x01 != 0 {
            channel_state[channel].entry.note = Note(cursor.read_u8()?);
        }
        if mask & 0x02 != 0 {
            channel_state[channel].entry.instrument = Instrument(cursor.read_u8()?);
        }
        if mask & 0x04 != 0 {
            let vc = cursor.read_u8()?;
            if vc <= 64 {
                channel_state[channel].entry.vol_command = Command::SetVolume(vc);
            } else if (128..=192).contains(&vc) {
                channel_state[channel].entry.vol_command = Command::SetPanning(vc - 65);
            }
            // Other ranges: silently ignored, value retained from before.
        }
        if mask & 0x08 != 0 {
            let cmd_id = cursor.read_u8()?;
            let cmd_param = cursor.read_u8()?;
            channel_state[channel].entry.fx_command = match cmd_id {
                0 => Command::None,
                1 => Command::SetSpeed(cmd_param),
                20 => Command::SetTempo(cmd_param),
                other => Command::Unknown(other, cmd_param),
            };
        }

        let mut emitted = PatternEntry::default();
        let state = &channel_state[channel];
        if mask & (0x01 | 0x10) != 0 {
            emitted.note = state.entry.note;
        }
        if mask & (0x02 | 0x20) != 0 {
            emitted.instrument = state.entry.instrument;
        }
        if mask & (0x04 | 0x40) != 0 {
            emitted.vol_command = state.entry.vol_command;
        }
        if mask & (0x08 | 0x80) != 0 {
            emitted.fx_command = state.entry.fx_command;
        }

        pattern.set(row, channel, emitted);
    }

    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_single_note_then_row_advance() {
        // channel_variable=0x81 (new mask for channel 0), mask=0x01 (note only),
        // note index 60, then 0x00 advances to row 1.
        let stream = [0x81, 0x01, 0x3C, 0x00];
        let pattern = decode_pattern_stream(&stream, 2, 0).unwrap();

        let entry = pattern.get(0, 0);
        assert_eq!(entry.note, Note(60));
        assert_eq!(entry.instrument, Instrument::default());
        assert_eq!(entry.vol_command, Command::None);
        assert_eq!(entry.fx_command, Command::None);

        // row 1 never touched, remains default/empty.
        assert_eq!(pattern.get(1, 0), PatternEntry::default());
    }

    #[test]
    fn repeat_bit_copies_previous_value_without_reading_more_bytes() {
        // Row 0: channel 1 (channel_variable=2), new mask 0x01, note 48.
        // Row advance, row 1: channel_variable=2, mask bit for "repeat note"
        // only (0x10) with no new mask byte byte (bit 7 clear means reuse
        // last_mask, which must then be 0x10 for this to repeat only).
        let stream = [
            0x82, 0x01, 0x30, // row 0, channel 1, new mask=1, note=0x30
            0x00, // advance to row 1
            0x82, 0x10, // row 1, channel 1, new mask=0x10 (repeat-note only)
            0x00, // advance to row 2 (terminates, row_num=2)
        ];
        let pattern = decode_pattern_stream(&stream, 2, 0).unwrap();
        assert_eq!(pattern.get(0, 1).note, Note(0x30));
        assert_eq!(pattern.get(1, 1).note, Note(0x30));
    }

    #[test]
    fn truncated_stream_is_a_format_error() {
        let stream = [0x81]; // claims a mask byte follows but stream ends
        let result = decode_pattern_stream(&stream, 1, 2);
        match result {
            Err(LoadError::Format { location, .. }) => assert_eq!(location.pattern, Some(2)),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_effect_id_becomes_unknown_but_does_not_abort() {
        // channel_variable=1, mask=0x08 (fx only), cmd_id=99, cmd_param=7
        let stream = [0x81, 0x08, 99, 7, 0x00];
        let pattern = decode_pattern_stream(&stream, 1, 0).unwrap();
        assert_eq!(pattern.get(0, 0).fx_command, Command::Unknown(99, 7));
    }

    #[test]
    fn out_of_range_volume_byte_is_ignored() {
        // mask=0x04 (vol only), vc=200 is outside both 0..=64 and 128..=192
        let stream = [0x81, 0x04, 200, 0x00];
        let pattern = decode_pattern_stream(&stream, 1, 0).unwrap();
        assert_eq!(pattern.get(0, 0).vol_command, Command::None);
    }
}
