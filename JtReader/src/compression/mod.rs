//! Compression utilities
//!
//! JT elements are compressed either with ZLIB (all versions) or LZMA
//! (version 10 and later). Both codecs inflate a sized block in one go.

use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// Compression algorithm applied to an element or a raw data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Zlib,
    Lzma,
}

impl Algorithm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Zlib => "ZLIB",
            Algorithm::Lzma => "LZMA",
        }
    }
}

/// Decompress a block with the given algorithm
///
/// # Errors
/// Returns [`Error::CodecError`] if the stream is corrupt or truncated.
pub fn decompress(data: &[u8], algorithm: Algorithm) -> Result<Vec<u8>> {
    match algorithm {
        Algorithm::Zlib => decompress_zlib(data),
        Algorithm::Lzma => decompress_lzma(data),
    }
}

/// Decompress ZLIB data
///
/// # Errors
/// Returns an error if decompression fails.
pub fn decompress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;

    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::CodecError {
            algorithm: Algorithm::Zlib.as_str(),
            message: e.to_string(),
        })?;
    Ok(decompressed)
}

/// Decompress LZMA data (`.lzma` stream with properties header)
///
/// # Errors
/// Returns an error if decompression fails.
pub fn decompress_lzma(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Cursor::new(data);
    let mut decompressed = Vec::new();
    lzma_rs::lzma_decompress(&mut reader, &mut decompressed).map_err(|e| Error::CodecError {
        algorithm: Algorithm::Lzma.as_str(),
        message: e.to_string(),
    })?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn test_zlib_inflate() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"segment body").unwrap();
        let compressed = encoder.finish().unwrap();

        let plain = decompress(&compressed, Algorithm::Zlib).unwrap();
        assert_eq!(plain, b"segment body");
    }

    #[test]
    fn test_lzma_inflate() {
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut Cursor::new(b"lzma body".as_slice()), &mut compressed).unwrap();

        let plain = decompress(&compressed, Algorithm::Lzma).unwrap();
        assert_eq!(plain, b"lzma body");
    }

    #[test]
    fn test_corrupt_stream_is_codec_error() {
        let err = decompress(&[0x78, 0x9c, 0xff, 0xff], Algorithm::Zlib).unwrap_err();
        assert!(matches!(err, Error::CodecError { algorithm: "ZLIB", .. }));
    }
}
