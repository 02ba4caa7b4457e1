//! Diagram transport codec.
//!
//! Turns diagram source into the token a `PlantUML`-compatible render server
//! expects in its GET path:
//!
//! 1. Raw DEFLATE at the best compression level (no zlib header or
//!    checksum trailer).
//! 2. 6-bit grouping of the compressed bytes, 3 bytes to 4 symbols. A final
//!    group of 1 or 2 bytes yields 2 or 3 symbols with zero-filled low bits.
//!    No padding symbol is emitted.
//! 3. Each 6-bit value indexes [`ALPHABET`].
//!
//! The bit grouping matches standard base64; only the alphabet order
//! differs, which is why the server's tokens start with digits.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

/// Symbol table, rank 0 first.
pub const ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

const INVALID: u8 = u8::MAX;

/// Reverse lookup from ASCII byte to rank.
static RANKS: [u8; 256] = build_ranks();

#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
const fn build_ranks() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut rank = 0;
    while rank < ALPHABET.len() {
        table[ALPHABET[rank] as usize] = rank as u8;
        rank += 1;
    }
    table
}

/// Codec failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Compressing into memory failed.
    #[error("deflate failed")]
    Deflate(#[source] std::io::Error),

    /// Compressed payload is not a valid raw DEFLATE stream.
    #[error("inflate failed")]
    Inflate(#[source] std::io::Error),

    /// Token contains a character outside [`ALPHABET`].
    #[error("invalid token symbol {symbol:?} at position {position}")]
    InvalidSymbol { position: usize, symbol: char },

    /// Token length leaves a single dangling symbol (4k+1 symbols).
    #[error("token of length {len} ends in an incomplete group")]
    TruncatedToken { len: usize },

    /// Final symbol carries bits the encoder always leaves zero.
    #[error("token has non-zero padding bits at position {position}")]
    TrailingBits { position: usize },
}

/// Encode diagram source into a render-server token.
///
/// Deterministic for a given input. Empty input yields an empty token.
///
/// # Example
///
/// ```
/// use folio_diagrams::{decode, encode};
///
/// let token = encode(b"Bob -> Alice : hello").unwrap();
/// assert!(token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
/// assert_eq!(decode(&token).unwrap(), b"Bob -> Alice : hello");
/// assert_eq!(encode(b"").unwrap(), "");
/// ```
pub fn encode(source: &[u8]) -> Result<String, CodecError> {
    if source.is_empty() {
        return Ok(String::new());
    }
    let compressed = deflate(source)?;
    Ok(encode_symbols(&compressed))
}

/// Decode a token back into diagram source.
pub fn decode(token: &str) -> Result<Vec<u8>, CodecError> {
    if token.is_empty() {
        return Ok(Vec::new());
    }
    let compressed = decode_symbols(token)?;
    inflate(&compressed)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len()), Compression::best());
    encoder.write_all(data).map_err(CodecError::Deflate)?;
    encoder.finish().map_err(CodecError::Deflate)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut output = Vec::with_capacity(data.len() * 4);
    DeflateDecoder::new(data)
        .read_to_end(&mut output)
        .map_err(CodecError::Inflate)?;
    Ok(output)
}

/// Map bytes to symbols, 3 bytes to 4 symbols, without padding.
#[must_use]
pub fn encode_symbols(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);

    for group in bytes.chunks(3) {
        let b0 = group[0];
        let b1 = group.get(1).copied().unwrap_or(0);
        let b2 = group.get(2).copied().unwrap_or(0);
        let values = [
            b0 >> 2,
            ((b0 & 0x03) << 4) | (b1 >> 4),
            ((b1 & 0x0F) << 2) | (b2 >> 6),
            b2 & 0x3F,
        ];
        // n input bytes carry 8n bits, which need n + 1 symbols.
        for &value in &values[..=group.len()] {
            out.push(char::from(ALPHABET[usize::from(value)]));
        }
    }

    out
}

/// Inverse of [`encode_symbols`].
pub fn decode_symbols(token: &str) -> Result<Vec<u8>, CodecError> {
    let values = token
        .chars()
        .enumerate()
        .map(|(position, symbol)| rank(symbol).ok_or(CodecError::InvalidSymbol { position, symbol }))
        .collect::<Result<Vec<u8>, _>>()?;

    if values.len() % 4 == 1 {
        return Err(CodecError::TruncatedToken { len: values.len() });
    }

    let mut out = Vec::with_capacity(values.len() / 4 * 3 + 2);
    for (index, group) in values.chunks(4).enumerate() {
        let v0 = group[0];
        let v1 = group[1];
        out.push((v0 << 2) | (v1 >> 4));

        match group {
            [_, _] if v1 & 0x0F != 0 => {
                return Err(CodecError::TrailingBits {
                    position: index * 4 + 1,
                });
            }
            [_, _, v2] if v2 & 0x03 != 0 => {
                return Err(CodecError::TrailingBits {
                    position: index * 4 + 2,
                });
            }
            [_, _, v2] => out.push((v1 << 4) | (v2 >> 2)),
            [_, _, v2, v3] => {
                out.push((v1 << 4) | (v2 >> 2));
                out.push((v2 << 6) | v3);
            }
            _ => {}
        }
    }

    Ok(out)
}

fn rank(symbol: char) -> Option<u8> {
    let byte = u8::try_from(symbol).ok()?;
    let rank = RANKS[usize::from(byte)];
    (rank != INVALID).then_some(rank)
}
