// ============================================================================
// LOADER.RS - Top-Level IT Module Loader
// ============================================================================
//
// Wires header.rs (fixed layout) and unpack.rs (variable-length packed
// stream) into the public `load_module` entry point. Every failure mode
// becomes a `LoadError` with a location, never a panic - this is the
// one place in the crate that reads untrusted bytes.
// ============================================================================

use crate::error::{ErrorLocation, LoadError};
use crate::it::header::{parse_header, parse_u32_table, HEADER_LEN};
use crate::it::unpack::decode_pattern_stream;
use crate::module::Module;
use crate::pattern::Pattern;

const PATTERN_HEADER_LEN: usize = 8;

fn map_nom_err(err: nom::Err<nom::error::Error<&[u8]>>) -> LoadError {
    let message = match &err {
        nom::Err::Incomplete(_) => "unexpected end of file".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => format!("malformed header field ({:?})", e.code),
    };
    LoadError::format(ErrorLocation::header(), message)
}

/// Parses a complete IT module from `bytes`. Fails fast: a malformed
/// header, offset table, or pattern stream yields a `LoadError` and no
/// partial `Module`.
pub fn load_module(bytes: &[u8]) -> Result<Module, LoadError> {
    if bytes.len() < HEADER_LEN {
        return Err(LoadError::format(
            ErrorLocation::header(),
            format!("file is only {} bytes, shorter than the {}-byte header", bytes.len(), HEADER_LEN),
        ));
    }
    if &bytes[0..4] != b"IMPM" {
        return Err(LoadError::BadMagic);
    }

    let (rest, header) = parse_header(bytes).map_err(map_nom_err)?;
    tracing::debug!(song_name = %header.song_name, order_num = header.order_num, pattern_num = header.pattern_num, "parsed IT header");

    let (rest, orders) = nom::bytes::complete::take(header.order_num as usize)(rest).map_err(map_nom_err)?;
    let orders = orders.to_vec();

    let (rest, _instrument_offsets) = parse_u32_table(rest, header.instrument_num as usize).map_err(map_nom_err)?;
    let (rest, _sample_offsets) = parse_u32_table(rest, header.sample_num as usize).map_err(map_nom_err)?;
    let (_rest, pattern_offsets) = parse_u32_table(rest, header.pattern_num as usize).map_err(map_nom_err)?;

    let mut patterns = Vec::with_capacity(pattern_offsets.len());
    for (index, &offset) in pattern_offsets.iter().enumerate() {
        if offset == 0 {
            patterns.push(Pattern::empty());
            continue;
        }
        patterns.push(load_pattern(bytes, offset as usize, index)?);
    }

    tracing::info!(patterns = patterns.len(), "loaded IT module");
    Ok(Module::new(header.song_name, orders, patterns))
}

fn load_pattern(bytes: &[u8], offset: usize, index: usize) -> Result<Pattern, LoadError> {
    let pattern_header = bytes.get(offset..offset + PATTERN_HEADER_LEN).ok_or_else(|| {
        LoadError::format(
            ErrorLocation::in_pattern(index, offset),
            "pattern offset points outside the file",
        )
    })?;

    let packed_data_length = u16::from_le_bytes([pattern_header[0], pattern_header[1]]) as usize;
    let row_num = u16::from_le_bytes([pattern_header[2], pattern_header[3]]) as usize;

    let data_start = offset + PATTERN_HEADER_LEN;
    let data_end = data_start + packed_data_length;
    let packed = bytes.get(data_start..data_end).ok_or_else(|| {
        LoadError::format(
            ErrorLocation::in_pattern(index, data_start),
            format!("packed_data_length {} exceeds the file bounds", packed_data_length),
        )
    })?;

    decode_pattern_stream(packed, row_num, index)
}
