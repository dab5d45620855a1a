//! File, segment and element headers
//!
//! Layout of a JT file:
//! - 80 byte ASCII signature (`Version 9.5 JT ...`)
//! - byte order flag, reserved field, TOC offset, root LSG segment id
//! - segments, each with a segment header followed by one root element
//!
//! Elements of "zipped" segment types carry an extra compression triplet in
//! front of the element header; the header and body are then read from the
//! inflated buffer.

use std::fmt;

use regex::Regex;

use crate::compression::{self, Algorithm};
use crate::error::{Error, Result};
use crate::formats::jt::context::LoadContext;
use crate::formats::jt::cursor::{ByteCursor, Endian};
use crate::formats::jt::guid::Guid;

/// Length of the ASCII signature at the start of every file
pub const SIGNATURE_LENGTH: usize = 80;

/// Bytes of an element header counted by its length field (GUID + base type)
pub const ELEMENT_HEADER_COUNTED: usize = 17;

lazy_static::lazy_static! {
    static ref SIGNATURE_PATTERNS: [Regex; 3] = [
        // Version 8
        Regex::new(r"Version (\d\.\d)(.{40,}) {5}").expect("valid regex"),
        // Version 9
        Regex::new(r"Version (\d\.\d)(.{40,}) \n\r\n ").expect("valid regex"),
        // Version 10 and later
        Regex::new(r"Version (\d{1,2}\.\d)(.{40,}) \n\r\n ").expect("valid regex"),
    ];
}

/// JT file version as found in the signature
#[derive(Debug, Clone, PartialEq)]
pub struct JtVersion {
    text: String,
    value: f64,
}

impl JtVersion {
    pub const MIN_SUPPORTED: f64 = 8.0;
    pub const MAX_SUPPORTED_EXCLUSIVE: f64 = 11.0;

    /// Parse a `major.minor` version string
    pub fn parse(text: &str) -> Result<Self> {
        let value = text
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidSignature(text.to_string()))?;
        Ok(Self {
            text: text.trim().to_string(),
            value,
        })
    }

    pub fn as_f64(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_supported(&self) -> bool {
        (Self::MIN_SUPPORTED..Self::MAX_SUPPORTED_EXCLUSIVE).contains(&self.value)
    }
}

impl fmt::Display for JtVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Match the signature text against the known version eras
///
/// Returns the version and the free-text comment.
pub fn parse_signature(signature: &str) -> Result<(JtVersion, String)> {
    for pattern in SIGNATURE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(signature) {
            let version = JtVersion::parse(&captures[1])?;
            let comment = captures[2].trim().to_string();
            return Ok((version, comment));
        }
    }
    Err(Error::InvalidSignature(signature.trim_end().to_string()))
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version: JtVersion,
    pub comment: String,
    pub endian: Endian,
    pub reserved: i32,
    pub toc_offset: usize,
    /// Segment id of the LSG root, absent when the reserved field is set
    pub root_segment: Option<Guid>,
}

impl FileHeader {
    /// Read the file header and switch the cursor to the file's byte order
    ///
    /// # Errors
    /// Fails on an unrecognized signature or an unsupported major version.
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let signature = cursor.read_ascii(SIGNATURE_LENGTH)?;
        let (version, comment) = parse_signature(&signature)?;

        if !version.is_supported() {
            return Err(Error::UnsupportedVersion {
                version: version.to_string(),
            });
        }

        let endian = if cursor.read_u8()? == 0 {
            Endian::Little
        } else {
            Endian::Big
        };
        cursor.set_endian(endian);

        let reserved = cursor.read_i32()?;
        let toc_offset = if version.as_f64() >= 10.0 {
            // 64-bit offset; files beyond 4 GiB are not addressable here
            cursor.read_u64()? as u32 as usize
        } else {
            cursor.read_i32()? as u32 as usize
        };

        let root = Guid::read(cursor)?;
        let root_segment = (reserved == 0).then_some(root);

        Ok(Self {
            version,
            comment,
            endian,
            reserved,
            toc_offset,
            root_segment,
        })
    }
}

/// Segment type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentType(pub i32);

impl SegmentType {
    pub const LOGICAL_SCENE_GRAPH: SegmentType = SegmentType(1);
    pub const JT_BREP: SegmentType = SegmentType(2);
    pub const PMI_DATA: SegmentType = SegmentType(3);
    pub const META_DATA: SegmentType = SegmentType(4);
    pub const SHAPE: SegmentType = SegmentType(6);
    pub const SHAPE_LOD0: SegmentType = SegmentType(7);

    /// Whether elements of this segment type carry the compression triplet
    pub fn is_zipped(self) -> bool {
        matches!(self.0, 1..=4 | 17..=20 | 23..=24 | 30..=33)
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "Logical Scene Graph",
            2 => "JT B-Rep",
            3 => "PMI Data",
            4 => "Meta Data",
            6 => "Shape",
            7..=16 => "Shape LOD",
            17 => "XT B-Rep",
            18 => "Wireframe Representation",
            20 => "ULP",
            23 => "STT B-Rep",
            24 => "LWPA",
            30 => "MultiXT B-Rep",
            31 => "InfoSegment",
            32 => "AEC Shape",
            33 => "STEP B-Rep",
            _ => "Unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmentHeader {
    pub segment_id: Guid,
    pub segment_type: SegmentType,
    pub segment_length: i32,
}

impl SegmentHeader {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            segment_id: Guid::read(cursor)?,
            segment_type: SegmentType(cursor.read_i32()?),
            segment_length: cursor.read_i32()?,
        })
    }
}

/// Header of one element plus the cursor positioned at its body
#[derive(Debug, Clone)]
pub struct ElementHeader {
    /// Bytes following the length field (type GUID, base type and body)
    pub length: i32,
    pub object_type: Guid,
    pub base_type: u8,
    /// Compression applied to this element, if any
    pub compression: Option<Algorithm>,
    /// Cursor at the first body byte; a fresh buffer for compressed elements
    pub body: ByteCursor,
}

impl ElementHeader {
    /// Read an uncompressed element header at the cursor position
    ///
    /// The header is read from `cursor`, which is advanced past it; the
    /// returned `body` is a clone positioned at the same spot.
    pub fn read_lsg_element(cursor: &mut ByteCursor, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let offset = cursor.position();
        let length = cursor.read_i32()?;
        if length < ELEMENT_HEADER_COUNTED as i32 || length as usize > cursor.remaining() {
            return Err(Error::InvalidElementLength { offset, length });
        }
        let object_type = Guid::read(cursor)?;
        let base_type = cursor.read_u8()?;
        ctx.report_bytes(length as usize);

        Ok(Self {
            length,
            object_type,
            base_type,
            compression: None,
            body: cursor.clone(),
        })
    }

    /// Read the root element header of a segment
    ///
    /// For zipped segments the compression triplet is evaluated: flag and
    /// algorithm both 2 mean ZLIB, both 3 mean LZMA. Any other combination
    /// is read as an uncompressed header following the triplet.
    pub fn read_root(
        cursor: &mut ByteCursor,
        segment_type: SegmentType,
        ctx: &mut LoadContext<'_>,
    ) -> Result<Self> {
        if !segment_type.is_zipped() {
            return Self::read_lsg_element(cursor, ctx);
        }

        let compression_flag = cursor.read_i32()?;
        let offset = cursor.position();
        let compressed_length = cursor.read_i32()? - 1;
        let algorithm_code = cursor.read_u8()?;

        let algorithm = match (compression_flag, algorithm_code) {
            (2, 2) => Some(Algorithm::Zlib),
            (3, 3) => Some(Algorithm::Lzma),
            _ => None,
        };

        let Some(algorithm) = algorithm else {
            return Self::read_lsg_element(cursor, ctx);
        };

        if compressed_length < 0 {
            return Err(Error::InvalidElementLength {
                offset,
                length: compressed_length,
            });
        }
        let compressed = cursor.read_bytes(compressed_length as usize)?;
        let plain = compression::decompress(&compressed, algorithm)?;

        let mut body = cursor.derive(plain);
        let length = body.read_i32()?;
        if length < ELEMENT_HEADER_COUNTED as i32 || length as usize > body.remaining() {
            return Err(Error::InvalidElementLength { offset: 0, length });
        }
        let object_type = Guid::read(&mut body)?;
        let base_type = body.read_u8()?;
        ctx.report_bytes(compressed_length as usize);

        Ok(Self {
            length,
            object_type,
            base_type,
            compression: Some(algorithm),
            body,
        })
    }

    /// Offset just past this element's body, measured on the body cursor
    pub fn body_end(&self) -> usize {
        self.body.position() + self.length as usize - ELEMENT_HEADER_COUNTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(text: &str, terminator: &str) -> String {
        let mut sig = text.to_string();
        while sig.len() + terminator.len() < SIGNATURE_LENGTH {
            sig.push(' ');
        }
        sig.push_str(terminator);
        sig
    }

    #[test]
    fn test_signature_eras() {
        let v8 = signature("Version 8.1 JT written by a test suite", "     ");
        let (version, comment) = parse_signature(&v8).unwrap();
        assert_eq!(version.as_str(), "8.1");
        assert!(comment.starts_with("JT written"));

        let v9 = signature("Version 9.5 JT written by a test suite", " \n\r\n ");
        assert_eq!(parse_signature(&v9).unwrap().0.as_f64(), 9.5);

        let v10 = signature("Version 10.5 JT written by a test suite", " \n\r\n ");
        assert_eq!(parse_signature(&v10).unwrap().0.as_str(), "10.5");
    }

    #[test]
    fn test_garbage_signature() {
        assert!(matches!(
            parse_signature("not a jt file"),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_version_range() {
        for (text, ok) in [("7.9", false), ("8.0", true), ("10.5", true), ("11.0", false), ("12.0", false)] {
            assert_eq!(JtVersion::parse(text).unwrap().is_supported(), ok, "{text}");
        }
    }

    #[test]
    fn test_zipped_segment_types() {
        assert!(SegmentType::LOGICAL_SCENE_GRAPH.is_zipped());
        assert!(SegmentType::META_DATA.is_zipped());
        assert!(!SegmentType::SHAPE_LOD0.is_zipped());
        assert!(!SegmentType::SHAPE.is_zipped());
    }

    #[test]
    fn test_element_length_checked() {
        let mut data = 100i32.to_be_bytes().to_vec();
        data.extend_from_slice(&[0u8; 17]);
        let mut cursor = ByteCursor::new(data);
        let mut ctx = LoadContext::new("test", 0);
        assert!(matches!(
            ElementHeader::read_lsg_element(&mut cursor, &mut ctx),
            Err(Error::InvalidElementLength { length: 100, .. })
        ));
    }
}
