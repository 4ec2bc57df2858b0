//! WAV container helpers for the built-in PCM encoder.
//!
//! Generates standard 44-byte RIFF headers, either exact (size known) or in
//! the streaming form used when chunks leave the encoder before the total
//! length is known.

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Size marker for a stream whose length was unknown when the header was written.
pub const UNKNOWN_SIZE: u32 = u32::MAX;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let chunk_size = data_size.saturating_add(36);
    write_header(sample_rate, bit_depth, channels, chunk_size, data_size)
}

/// Header for a stream of unknown length: both size fields hold [`UNKNOWN_SIZE`].
pub fn generate_streaming_header(sample_rate: u32, bit_depth: u16, channels: u16) -> [u8; WAV_HEADER_SIZE] {
    write_header(sample_rate, bit_depth, channels, UNKNOWN_SIZE, UNKNOWN_SIZE)
}

fn write_header(
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    chunk_size: u32,
    data_size: u32,
) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Read the `data_size` field back out of a header.
pub fn data_size(header: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = header.get(40..44)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}
