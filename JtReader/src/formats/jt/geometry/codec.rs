//! Int32 compressed data packets and lossless float blocks
//!
//! Index data is stored as residuals of a predictor and packed with one of
//! four codecs. Only the null and bit-length codecs are decoded; Huffman and
//! arithmetic packets are reported as unsupported so the shape can be skipped.

use crate::compression;
use crate::error::{Error, Result};
use crate::formats::jt::cursor::ByteCursor;

/// Packet framing generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFormat {
    /// Before JT 9: codec type byte, then the payload
    V1,
    /// JT 9 and later: value count, codec type byte, then the payload
    V2,
}

impl PacketFormat {
    pub fn for_version(version: f64) -> Self {
        if version >= 9.0 { Self::V2 } else { Self::V1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predictor {
    Lag1,
    Lag2,
    Stride1,
    Stride2,
    StripIndex,
    Ramp,
    Xor1,
    Xor2,
    Null,
}

const CODEC_NULL: u8 = 0;
const CODEC_BITLENGTH: u8 = 1;
const CODEC_HUFFMAN: u8 = 2;
const CODEC_ARITHMETIC: u8 = 3;

/// Upper bound on the values of one packet; zero-width bit-length packets
/// occupy no storage, so their declared count is not bounded by the input
pub const MAX_PACKET_VALUES: usize = 1 << 24;

/// Read one packet and undo its predictor
pub fn read_int32_cdp(
    cursor: &mut ByteCursor,
    format: PacketFormat,
    predictor: Predictor,
) -> Result<Vec<i32>> {
    if format == PacketFormat::V2 {
        let value_count = cursor.read_i32()?;
        if value_count == 0 {
            return Ok(Vec::new());
        }
    }

    let residuals = match cursor.read_u8()? {
        CODEC_NULL => cursor.read_vec_i32()?,
        CODEC_BITLENGTH => read_bitlength(cursor)?,
        CODEC_HUFFMAN => return Err(Error::UnsupportedCodec("Huffman".to_string())),
        CODEC_ARITHMETIC => return Err(Error::UnsupportedCodec("Arithmetic".to_string())),
        other => return Err(Error::UnsupportedCodec(format!("codec type {other}"))),
    };

    Ok(unpack_residuals(&residuals, predictor))
}

/// Fixed-width values packed MSB first into u32 words, offset by a bias
fn read_bitlength(cursor: &mut ByteCursor) -> Result<Vec<i32>> {
    let value_count = cursor.read_count(0)?;
    if value_count > MAX_PACKET_VALUES {
        return Err(Error::InvalidGeometry(format!(
            "{value_count} packed values exceed the limit of {MAX_PACKET_VALUES}"
        )));
    }
    let width = u32::from(cursor.read_u8()?);
    if width > 32 {
        return Err(Error::InvalidGeometry(format!("bit width {width} exceeds 32")));
    }
    let bias = cursor.read_i32()?;
    let word_count = cursor.read_count(4)?;
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(cursor.read_u32()?);
    }

    let available_bits = word_count as u64 * 32;
    if value_count as u64 * u64::from(width) > available_bits {
        return Err(Error::InvalidGeometry(format!(
            "{value_count} values of {width} bits do not fit into {word_count} words"
        )));
    }

    let mut reader = BitReader::new(&words);
    Ok((0..value_count)
        .map(|_| (reader.read(width) as i32).wrapping_add(bias))
        .collect())
}

struct BitReader<'a> {
    words: &'a [u32],
    bit: u64,
}

impl<'a> BitReader<'a> {
    fn new(words: &'a [u32]) -> Self {
        Self { words, bit: 0 }
    }

    fn read(&mut self, width: u32) -> u32 {
        let mut value = 0u64;
        for _ in 0..width {
            let word = self.words[(self.bit / 32) as usize];
            let shift = 31 - (self.bit % 32) as u32;
            value = (value << 1) | u64::from((word >> shift) & 1);
            self.bit += 1;
        }
        value as u32
    }
}

fn predict(values: &[i32], i: usize, predictor: Predictor) -> i32 {
    let v1 = values[i - 1];
    let v2 = values[i - 2];
    let v4 = values[i - 4];
    match predictor {
        Predictor::Lag1 | Predictor::Xor1 => v1,
        Predictor::Lag2 | Predictor::Xor2 => v2,
        Predictor::Stride1 => v1.wrapping_add(v1.wrapping_sub(v2)),
        Predictor::Stride2 => v2.wrapping_add(v2.wrapping_sub(v4)),
        Predictor::StripIndex => {
            let delta = v2.wrapping_sub(v4);
            if delta > -8 && delta < 8 {
                v2.wrapping_add(delta)
            } else {
                v2.wrapping_add(2)
            }
        }
        Predictor::Ramp => i as i32,
        Predictor::Null => 0,
    }
}

/// Rebuild values from predictor residuals; the first four are literals
pub fn unpack_residuals(residuals: &[i32], predictor: Predictor) -> Vec<i32> {
    let mut values = Vec::with_capacity(residuals.len());
    for (i, &residual) in residuals.iter().enumerate() {
        let value = if i < 4 || predictor == Predictor::Null {
            residual
        } else {
            let predicted = predict(&values, i, predictor);
            match predictor {
                Predictor::Xor1 | Predictor::Xor2 => residual ^ predicted,
                _ => residual.wrapping_add(predicted),
            }
        };
        values.push(value);
    }
    values
}

/// Read an uncompressed-size / compressed-size framed block of f32 values
pub fn read_lossless_floats(cursor: &mut ByteCursor) -> Result<Vec<f32>> {
    let uncompressed_size = cursor.read_i32()?;
    let compressed_size = cursor.read_i32()?;
    if uncompressed_size < 0 {
        return Err(Error::InvalidGeometry(format!(
            "negative block size {uncompressed_size}"
        )));
    }

    let bytes = if compressed_size > 0 {
        let compressed = cursor.read_bytes(compressed_size as usize)?;
        compression::decompress_zlib(&compressed)?
    } else {
        cursor.read_bytes(uncompressed_size as usize)?
    };

    if bytes.len() != uncompressed_size as usize || bytes.len() % 4 != 0 {
        return Err(Error::InvalidGeometry(format!(
            "float block of {} bytes, {uncompressed_size} declared",
            bytes.len()
        )));
    }

    let mut block = cursor.derive(bytes);
    let mut values = Vec::with_capacity(block.len() / 4);
    while block.remaining() > 0 {
        values.push(block.read_f32()?);
    }
    Ok(values)
}
