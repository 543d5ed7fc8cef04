// ============================================================================
// IT_LOADER.RS - End-to-End Loader Integration Test
// ============================================================================
//
// Builds a small but complete IT byte stream by hand (header, orders,
// offset tables, two packed patterns) and runs it through the public
// `load_module` entry point. Unlike the unit tests in
// `src/it/header.rs`/`src/it/unpack.rs`/`src/it/loader.rs`, which each
// exercise one layer in isolation, this walks the whole loader -> module
// -> pattern path the way a real `.it` file would.
// ============================================================================

use it_tracker::{load_module, Command, Instrument, Note};

const HEADER_LEN: usize = 192;

fn push_header(bytes: &mut Vec<u8>, song_name: &str, order_num: u16, pattern_num: u16) {
    bytes.extend_from_slice(b"IMPM");
    let mut name = [0u8; 26];
    let name_bytes = song_name.as_bytes();
    name[..name_bytes.len()].copy_from_slice(name_bytes);
    bytes.extend_from_slice(&name);

    bytes.extend_from_slice(&16u16.to_le_bytes()); // row_highlight
    bytes.extend_from_slice(&order_num.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // instrument_num
    bytes.extend_from_slice(&0u16.to_le_bytes()); // sample_num
    bytes.extend_from_slice(&pattern_num.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // created_with
    bytes.extend_from_slice(&0u16.to_le_bytes()); // compatible_with
    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
    bytes.extend_from_slice(&0u16.to_le_bytes()); // special
    bytes.push(128); // global_volume
    bytes.push(48); // mix_volume
    bytes.push(6); // initial_speed
    bytes.push(125); // initial_tempo
    bytes.push(128); // panning_separation
    bytes.push(0); // pitch_wheel_depth
    bytes.extend_from_slice(&0u16.to_le_bytes()); // message_length
    bytes.extend_from_slice(&0u32.to_le_bytes()); // message_offset
    bytes.extend_from_slice(&0u32.to_le_bytes()); // reserved
    bytes.extend_from_slice(&[0u8; 64]); // channel_panning
    bytes.extend_from_slice(&[0u8; 64]); // channel_volume
    assert_eq!(bytes.len(), HEADER_LEN);
}

fn push_pattern(bytes: &mut Vec<u8>, row_num: u16, packed: &[u8]) {
    bytes.extend_from_slice(&(packed.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&row_num.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 4]); // filler
    bytes.extend_from_slice(packed);
}

/// A two-order, two-pattern module: order 0 plays pattern 0 (a single
/// note + a set-speed effect on row 0), then order 1 repeats pattern 0
/// via the "empty" pattern slot 1, then the order list ends.
#[test]
fn loads_a_complete_module_end_to_end() {
    let mut bytes = Vec::new();
    push_header(&mut bytes, "integration", 3, 2);

    bytes.extend_from_slice(&[0, 1, 255]); // orders: pattern 0, pattern 1 (empty), end

    let pattern_offset_table_pos = bytes.len();
    let offsets_len = 2 * 4;
    let pattern0_pos = pattern_offset_table_pos + offsets_len;

    // Row 0, channel 0: note C-5 (index 60), instrument 1, set_speed(4).
    // Row advance terminates the two-row pattern.
    let packed = [
        0x81, 0x01 | 0x02 | 0x08, // channel 1, new mask: note+inst+fx
        60,                       // note
        1,                        // instrument
        1, 4,                     // fx: set_speed, param 4
        0x00,                     // advance to row 1
        0x00,                     // advance to row 2 (terminates, row_num=2)
    ];
    let mut pattern0 = Vec::new();
    push_pattern(&mut pattern0, 2, &packed);

    bytes.extend_from_slice(&(pattern0_pos as u32).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // pattern 1: empty
    bytes.extend_from_slice(&pattern0);

    let module = load_module(&bytes).expect("well-formed module should load");

    assert_eq!(module.song_name, "integration");
    assert_eq!(module.orders, vec![0, 1, 255]);
    assert_eq!(module.patterns.len(), 2);

    let entry = module.patterns[0].get(0, 0);
    assert_eq!(entry.note, Note(60));
    assert_eq!(entry.instrument, Instrument(1));
    assert_eq!(entry.fx_command, Command::SetSpeed(4));
    assert!(entry.note.is_note());
    assert_eq!(entry.note.period(), Note(60).period());

    // Row 1 was never written by the packed stream; it stays default.
    assert_eq!(module.patterns[0].get(1, 0), Default::default());

    // Pattern 1 was a zero-offset slot: a default-sized empty pattern.
    assert_eq!(module.patterns[1].row_count(), it_tracker::pattern::DEFAULT_ROWS);
}

#[test]
fn rejects_a_truncated_header() {
    let bytes = vec![b'I', b'M', b'P', b'M'];
    assert!(load_module(&bytes).is_err());
}

#[test]
fn rejects_pattern_stream_truncated_mid_row() {
    let mut bytes = Vec::new();
    push_header(&mut bytes, "broken", 0, 1);

    let pattern_pos = bytes.len() + 4;
    // claims 2 rows but the stream has only a channel_variable byte with
    // its mask-present bit set and nothing after it.
    let packed = [0x81];
    let mut pattern = Vec::new();
    push_pattern(&mut pattern, 2, &packed);

    bytes.extend_from_slice(&(pattern_pos as u32).to_le_bytes());
    bytes.extend_from_slice(&pattern);

    match load_module(&bytes) {
        Err(it_tracker::LoadError::Format { .. }) => {}
        other => panic!("expected a format error, got {:?}", other),
    }
}
