// ============================================================================
// HEADER.RS - IT Module Header (192 bytes, packed, little-endian)
// ============================================================================
//
// Field-by-field parsing with nom, per Design Notes in spec.md 9: no
// reinterpreting raw memory as a struct, every field read explicitly
// with declared endianness. Layout mirrors
// examples/ametisf-ittech/src/data/module.rs's ModuleHeader staging
// struct (a private struct the loader fills in before building the
// public Module).
// ============================================================================

use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::IResult;

pub const HEADER_LEN: usize = 192;

#[derive(Clone, Debug)]
pub struct Header {
    pub song_name: String,
    pub row_highlight: u16,
    pub order_num: u16,
    pub instrument_num: u16,
    pub sample_num: u16,
    pub pattern_num: u16,
    pub created_with: u16,
    pub compatible_with: u16,
    pub flags: u16,
    pub special: u16,
    pub global_volume: u8,
    pub mix_volume: u8,
    pub initial_speed: u8,
    pub initial_tempo: u8,
    pub panning_separation: u8,
    pub pitch_wheel_depth: u8,
    pub message_length: u16,
    pub message_offset: u32,
    pub channel_panning: [u8; 64],
    pub channel_volume: [u8; 64],
}

fn fixed_array_64(input: &[u8]) -> IResult<&[u8], [u8; 64]> {
    let (input, bytes) = take(64usize)(input)?;
    let mut array = [0u8; 64];
    array.copy_from_slice(bytes);
    Ok((input, array))
}

/// Parses the 192-byte header. Returns an error (via nom's `Err`) if
/// the magic doesn't match "IMPM" or the slice is too short; callers
/// translate that into `LoadError::Format`/`LoadError::BadMagic`.
pub fn parse_header(input: &[u8]) -> IResult<&[u8], Header> {
    let (input, _magic) = tag("IMPM")(input)?;
    let (input, name_bytes) = take(26usize)(input)?;
    let song_name = String::from_utf8_lossy(name_bytes)
        .trim_end_matches('\0')
        .to_string();

    let (input, row_highlight) = le_u16(input)?;
    let (input, order_num) = le_u16(input)?;
    let (input, instrument_num) = le_u16(input)?;
    let (input, sample_num) = le_u16(input)?;
    let (input, pattern_num) = le_u16(input)?;
    let (input, created_with) = le_u16(input)?;
    let (input, compatible_with) = le_u16(input)?;
    let (input, flags) = le_u16(input)?;
    let (input, special) = le_u16(input)?;
    let (input, global_volume) = le_u8(input)?;
    let (input, mix_volume) = le_u8(input)?;
    let (input, initial_speed) = le_u8(input)?;
    let (input, initial_tempo) = le_u8(input)?;
    let (input, panning_separation) = le_u8(input)?;
    let (input, pitch_wheel_depth) = le_u8(input)?;
    let (input, message_length) = le_u16(input)?;
    let (input, message_offset) = le_u32(input)?;
    let (input, _reserved) = le_u32(input)?;
    let (input, channel_panning) = fixed_array_64(input)?;
    let (input, channel_volume) = fixed_array_64(input)?;

    Ok((
        input,
        Header {
            song_name,
            row_highlight,
            order_num,
            instrument_num,
            sample_num,
            pattern_num,
            created_with,
            compatible_with,
            flags,
            special,
            global_volume,
            mix_volume,
            initial_speed,
            initial_tempo,
            panning_separation,
            pitch_wheel_depth,
            message_length,
            message_offset,
            channel_panning,
            channel_volume,
        },
    ))
}

/// Parses a little-endian `u32` table of `count` entries (used for the
/// instrument/sample/pattern offset tables).
pub fn parse_u32_table(input: &[u8], count: usize) -> IResult<&[u8], Vec<u32>> {
    nom::multi::count(le_u32, count)(input)
}
