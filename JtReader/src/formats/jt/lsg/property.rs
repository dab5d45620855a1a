//! Property atoms, the per-node property table and meta data segments

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::formats::jt::context::LoadContext;
use crate::formats::jt::cursor::ByteCursor;
use crate::formats::jt::guid::Guid;

use super::{check_version, read_element_version};

#[derive(Debug, Clone, PartialEq)]
pub struct BasePropertyAtomData {
    pub object_id: i32,
    pub state_flags: u32,
}

impl BasePropertyAtomData {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let object_id = cursor.read_i32()?;
        read_element_version(cursor, version)?;
        Ok(Self {
            object_id,
            state_flags: cursor.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringPropertyAtom {
    pub base: BasePropertyAtomData,
    /// Absent strings are stored as empty
    pub value: String,
}

impl StringPropertyAtom {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BasePropertyAtomData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let value = cursor.read_mb_string()?.unwrap_or_default();
        Ok(Self { base, value })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerPropertyAtom {
    pub base: BasePropertyAtomData,
    pub value: i32,
}

impl IntegerPropertyAtom {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BasePropertyAtomData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        Ok(Self {
            base,
            value: cursor.read_i32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatPropertyAtom {
    pub base: BasePropertyAtomData,
    pub value: f32,
}

impl FloatPropertyAtom {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BasePropertyAtomData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        Ok(Self {
            base,
            value: cursor.read_f32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatePropertyAtom {
    pub base: BasePropertyAtomData,
    pub value: DateTime<Utc>,
}

impl DatePropertyAtom {
    /// Fails with [`Error::MalformedDate`] after consuming the whole element
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BasePropertyAtomData::read(cursor, version)?;
        if version >= 10.0 {
            let local = cursor.read_local_version(version)?;
            check_version("DateProperty", local, 5)?;
        }
        Ok(Self {
            base,
            value: cursor.read_date_time()?,
        })
    }
}

/// Property whose value lives in another segment
#[derive(Debug, Clone, PartialEq)]
pub struct LateLoadedPropertyAtom {
    pub base: BasePropertyAtomData,
    pub segment_id: Guid,
    pub segment_type: i32,
    pub payload_object_id: Option<i32>,
}

impl LateLoadedPropertyAtom {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BasePropertyAtomData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let segment_id = Guid::read(cursor)?;
        let segment_type = cursor.read_i32()?;
        let payload_object_id = if version >= 9.0 {
            let id = cursor.read_i32()?;
            let _reserved = cursor.read_i32()?;
            Some(id)
        } else {
            None
        };
        Ok(Self {
            base,
            segment_id,
            segment_type,
            payload_object_id,
        })
    }
}

/// Per-node `(key atom id, value atom id)` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTable {
    entries: IndexMap<i32, Vec<(i32, i32)>>,
}

impl PropertyTable {
    /// Read a table: version, entry count, then for every node its object id
    /// followed by key/value pairs up to a zero key
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let _version = cursor.read_local_version(version)?;
        let count = cursor.read_count(8)?;
        let mut entries = IndexMap::with_capacity(count);
        for _ in 0..count {
            let object_id = cursor.read_i32()?;
            let mut pairs = Vec::new();
            loop {
                let key = cursor.read_i32()?;
                if key == 0 {
                    break;
                }
                pairs.push((key, cursor.read_i32()?));
            }
            entries
                .entry(object_id)
                .or_insert_with(Vec::new)
                .extend(pairs);
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, object_id: i32, key: i32, value: i32) {
        self.entries.entry(object_id).or_default().push((key, value));
    }

    /// Add the entries of another partition's table
    pub fn merge(&mut self, other: PropertyTable) {
        for (object_id, pairs) in other.entries {
            self.entries.entry(object_id).or_default().extend(pairs);
        }
    }

    pub fn pairs(&self, object_id: i32) -> &[(i32, i32)] {
        self.entries.get(&object_id).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Value of a late-loaded meta data property
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Integer(i32),
    Float(f32),
    Date(DateTime<Utc>),
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::String(s) => f.write_str(s),
            MetaValue::Integer(v) => write!(f, "{v}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

/// Key/value table stored in a meta data segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMetaData {
    pub object_id: Option<i32>,
    pub properties: IndexMap<String, MetaValue>,
}

impl PropertyMetaData {
    const STRING: u8 = 1;
    const INTEGER: u8 = 2;
    const FLOAT: u8 = 3;
    const DATE: u8 = 4;

    pub fn read(cursor: &mut ByteCursor, version: f64, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let object_id = if version >= 9.0 {
            let id = cursor.read_i32()?;
            let local = cursor.read_local_version(version)?;
            check_version("PropertyMetaData", local, 2)?;
            Some(id)
        } else {
            None
        };

        let mut properties = IndexMap::new();
        while let Some(key) = cursor.read_mb_string()? {
            let value = match cursor.read_u8()? {
                Self::STRING => MetaValue::String(cursor.read_mb_string()?.unwrap_or_default()),
                Self::INTEGER => MetaValue::Integer(cursor.read_i32()?),
                Self::FLOAT => MetaValue::Float(cursor.read_f32()?),
                Self::DATE => match cursor.read_date_time() {
                    Ok(date) => MetaValue::Date(date),
                    Err(err @ Error::MalformedDate { .. }) => {
                        ctx.warn(format!("Ignoring meta data property '{key}': {err}"));
                        continue;
                    }
                    Err(err) => return Err(err),
                },
                other => return Err(Error::UnexpectedValueType(other)),
            };
            properties.insert(key, value);
        }

        Ok(Self {
            object_id,
            properties,
        })
    }
}

/// PMI segment root; only the framing is decoded
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PmiMetaData {
    pub version: i16,
}

impl PmiMetaData {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let version = cursor.read_i16()?;
        check_version("PMIMetaData", i32::from(version), 10)?;
        let _empty = cursor.read_i16()?;
        Ok(Self { version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn push_mb(buf: &mut Vec<u8>, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        push_i32(buf, units.len() as i32);
        for u in units {
            buf.extend_from_slice(&u.to_be_bytes());
        }
    }

    #[test]
    fn test_property_table() {
        let mut data = 1i16.to_be_bytes().to_vec();
        push_i32(&mut data, 2);
        for v in [10, 100, 101, 102, 103, 0] {
            push_i32(&mut data, v);
        }
        for v in [11, 0] {
            push_i32(&mut data, v);
        }
        let table = PropertyTable::read(&mut ByteCursor::new(data), 9.5).unwrap();
        assert_eq!(table.pairs(10), &[(100, 101), (102, 103)]);
        assert!(table.pairs(11).is_empty());
        assert!(table.pairs(12).is_empty());
    }

    #[test]
    fn test_property_tables_merge() {
        let mut a = PropertyTable::default();
        a.insert(1, 5, 6);
        let mut b = PropertyTable::default();
        b.insert(1, 7, 8);
        b.insert(2, 9, 10);
        a.merge(b);
        assert_eq!(a.pairs(1), &[(5, 6), (7, 8)]);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_meta_data_values() {
        let mut data = Vec::new();
        push_i32(&mut data, 77);
        data.extend_from_slice(&1i16.to_be_bytes());
        push_mb(&mut data, "Material");
        data.push(1);
        push_mb(&mut data, "Steel");
        push_mb(&mut data, "Count");
        data.push(2);
        push_i32(&mut data, 3);
        push_mb(&mut data, "Bad date");
        data.push(4);
        for v in [2020i16, 2, 30, 0, 0, 0] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        push_i32(&mut data, 0);

        let mut ctx = LoadContext::new("meta.jt", 0);
        let meta = PropertyMetaData::read(&mut ByteCursor::new(data), 9.5, &mut ctx).unwrap();
        assert_eq!(meta.object_id, Some(77));
        assert_eq!(meta.properties["Material"], MetaValue::String("Steel".into()));
        assert_eq!(meta.properties["Count"], MetaValue::Integer(3));
        assert!(!meta.properties.contains_key("Bad date"));
        assert!(ctx.has_warning("Bad date"));
    }

    #[test]
    fn test_meta_data_unknown_type() {
        let mut data = Vec::new();
        push_mb(&mut data, "Key");
        data.push(9);
        let mut ctx = LoadContext::new("meta.jt", 0);
        assert!(matches!(
            PropertyMetaData::read(&mut ByteCursor::new(data), 8.1, &mut ctx),
            Err(Error::UnexpectedValueType(9))
        ));
    }

    #[test]
    fn test_meta_data_version_gate() {
        let mut data = Vec::new();
        push_i32(&mut data, 1);
        data.extend_from_slice(&3i16.to_be_bytes());
        let mut ctx = LoadContext::new("meta.jt", 0);
        assert!(matches!(
            PropertyMetaData::read(&mut ByteCursor::new(data), 9.5, &mut ctx),
            Err(Error::InvalidVersionNumber { version: 3, .. })
        ));
    }
}
