//! Positional reader over JT byte buffers
//!
//! A JT file is read completely into memory before parsing. Compressed
//! elements are inflated into fresh buffers, so a [`ByteCursor`] shares its
//! buffer through an `Arc` and can be cloned cheaply to remember a position
//! (e.g. the start of a shape LOD element that is decoded later).

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};

/// Byte order of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Arc<[u8]>,
    pos: usize,
    endian: Endian,
}

macro_rules! read_fixed {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $size:expr, $read:ident) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> Result<$ty> {
            let endian = self.endian;
            let bytes = self.take($size)?;
            Ok(match endian {
                Endian::Big => BigEndian::$read(bytes),
                Endian::Little => LittleEndian::$read(bytes),
            })
        }
    };
}

impl ByteCursor {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            endian: Endian::Big,
        }
    }

    /// Create a cursor over a new buffer that inherits this cursor's byte order
    #[must_use]
    pub fn derive(&self, data: Vec<u8>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            endian: self.endian,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset. Seeking to the end of the buffer is allowed.
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::UnexpectedEof {
                offset: pos,
                wanted: 0,
                available: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Whether this cursor reads from the same buffer as `other`
    pub fn shares_buffer(&self, other: &ByteCursor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: n,
                available,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..start + n])
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.take(n).map(<[u8]>::to_vec)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    read_fixed!(read_u16, u16, 2, read_u16);
    read_fixed!(read_i16, i16, 2, read_i16);
    read_fixed!(read_u32, u32, 4, read_u32);
    read_fixed!(read_i32, i32, 4, read_i32);
    read_fixed!(read_u64, u64, 8, read_u64);
    read_fixed!(read_i64, i64, 8, read_i64);
    read_fixed!(read_f32, f32, 4, read_f32);
    read_fixed!(read_f64, f64, 8, read_f64);

    /// Read a fixed-length ASCII field (the file signature)
    pub fn read_ascii(&mut self, n: usize) -> Result<String> {
        let bytes = self.take(n)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    /// Read an `MbString`: i32 count of UTF-16 code units followed by the units.
    ///
    /// A count of zero or less is the "absent" sentinel and yields `None`.
    pub fn read_mb_string(&mut self) -> Result<Option<String>> {
        let count = self.read_i32()?;
        if count <= 0 {
            return Ok(None);
        }
        let count = count as usize;
        if count.saturating_mul(2) > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: count * 2,
                available: self.remaining(),
            });
        }
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(self.read_u16()?);
        }
        Ok(Some(String::from_utf16_lossy(&units)))
    }

    /// Read a packed date: year, month (1-12), day, hour, minute, second as i16
    pub fn read_date_time(&mut self) -> Result<DateTime<Utc>> {
        let year = self.read_i16()?;
        let month = self.read_i16()?;
        let day = self.read_i16()?;
        let hour = self.read_i16()?;
        let minute = self.read_i16()?;
        let second = self.read_i16()?;

        let malformed = Error::MalformedDate {
            year,
            month,
            day,
            hour,
            minute,
            second,
        };
        if month < 0 || day < 0 || hour < 0 || minute < 0 || second < 0 {
            return Err(malformed);
        }
        NaiveDate::from_ymd_opt(i32::from(year), month as u32, day as u32)
            .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
            .map(|naive| naive.and_utc())
            .ok_or(malformed)
    }

    /// Read a bounding box as `[min, max]`
    pub fn read_bbox_f32(&mut self) -> Result<[[f32; 3]; 2]> {
        let mut bbox = [[0.0f32; 3]; 2];
        for corner in &mut bbox {
            for value in corner.iter_mut() {
                *value = self.read_f32()?;
            }
        }
        Ok(bbox)
    }

    /// Read an integer range as `[min, max]`
    pub fn read_range_i32(&mut self) -> Result<[i32; 2]> {
        Ok([self.read_i32()?, self.read_i32()?])
    }

    /// Read an i32 count followed by that many f32 values
    pub fn read_vec_f32(&mut self) -> Result<Vec<f32>> {
        let count = self.read_count(4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_f32()?);
        }
        Ok(values)
    }

    /// Read an i32 element count, checked against the bytes left in the buffer
    pub fn read_count(&mut self, element_size: usize) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            return Err(Error::InvalidElementLength { offset, length: count });
        }
        let count = count as usize;
        if count.saturating_mul(element_size) > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: count.saturating_mul(element_size),
                available: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Read an i32 count followed by that many i32 values
    pub fn read_vec_i32(&mut self) -> Result<Vec<i32>> {
        let count = self.read_count(4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }

    /// Element-local version number: u8 from JT 10 on, i16 before
    pub fn read_local_version(&mut self, file_version: f64) -> Result<i32> {
        if file_version >= 10.0 {
            Ok(i32::from(self.read_u8()?))
        } else {
            Ok(i32::from(self.read_i16()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness_switch() {
        let mut cursor = ByteCursor::new(vec![0x00, 0x01, 0x01, 0x00]);
        assert_eq!(cursor.read_u16().unwrap(), 1);
        cursor.set_endian(Endian::Little);
        assert_eq!(cursor.read_u16().unwrap(), 1);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_bounds_checked() {
        let mut cursor = ByteCursor::new(vec![1, 2, 3]);
        let err = cursor.read_u32().unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { wanted: 4, available: 3, .. }));
        // A failed read does not advance
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_mb_string() {
        let mut data = vec![0, 0, 0, 2, 0, b'J', 0, b'T'];
        data.extend_from_slice(&[0, 0, 0, 0]);
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_mb_string().unwrap().as_deref(), Some("JT"));
        assert_eq!(cursor.read_mb_string().unwrap(), None);
    }

    #[test]
    fn test_date_time() {
        let mut data = Vec::new();
        for v in [2014i16, 3, 21, 13, 45, 10] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        let mut cursor = ByteCursor::new(data);
        let date = cursor.read_date_time().unwrap();
        assert_eq!(date.to_rfc3339(), "2014-03-21T13:45:10+00:00");
    }

    #[test]
    fn test_malformed_date() {
        let mut data = Vec::new();
        for v in [2014i16, 13, 40, 0, 0, 0] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        let mut cursor = ByteCursor::new(data);
        assert!(matches!(
            cursor.read_date_time(),
            Err(Error::MalformedDate { month: 13, .. })
        ));
        // The whole value was consumed so the stream stays aligned
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_local_version_width() {
        let mut cursor = ByteCursor::new(vec![0, 7, 9]);
        assert_eq!(cursor.read_local_version(9.5).unwrap(), 7);
        assert_eq!(cursor.read_local_version(10.0).unwrap(), 9);
    }
}
