//! Little-endian primitive codec for section bodies.
//!
//! Strings are length-prefixed (u32 byte count) and encoded with the text
//! encoding of the target version. Optional PIDs are written as 0.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::Encoding;

use crate::attributes::{AttributeDictionaries, AttributeDictionary, AttributeValue};
use crate::error::{ModelError, Result};
use crate::types::{Color, PersistentId, Point3, Transform, Vector3};

/// Nesting limit for attribute arrays
const MAX_ARRAY_DEPTH: usize = 16;

fn truncated(e: std::io::Error) -> ModelError {
    ModelError::Serialization(format!("unexpected end of section data: {e}"))
}

/// Growable buffer with typed little-endian writes
pub(crate) struct StreamWriter {
    buffer: Vec<u8>,
    encoding: &'static Encoding,
}

impl StreamWriter {
    pub(crate) fn new(encoding: &'static Encoding) -> Self {
        Self {
            buffer: Vec::new(),
            encoding,
        }
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub(crate) fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Bytes with no length prefix
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub(crate) fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    pub(crate) fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_u32(&mut self, value: u32) {
        // Writes into a Vec cannot fail
        let _ = self.buffer.write_u32::<LittleEndian>(value);
    }

    pub(crate) fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| ModelError::Serialization(format!("{len} items do not fit a section")))?;
        self.write_u32(len);
        Ok(())
    }

    pub(crate) fn write_i64(&mut self, value: i64) {
        let _ = self.buffer.write_i64::<LittleEndian>(value);
    }

    pub(crate) fn write_f64(&mut self, value: f64) {
        let _ = self.buffer.write_f64::<LittleEndian>(value);
    }

    pub(crate) fn write_pid(&mut self, pid: PersistentId) {
        self.write_i64(pid.value());
    }

    pub(crate) fn write_opt_pid(&mut self, pid: Option<PersistentId>) {
        self.write_pid(pid.unwrap_or(PersistentId::NULL));
    }

    pub(crate) fn write_color(&mut self, color: Color) {
        self.write_u32(color.to_packed());
    }

    pub(crate) fn write_point(&mut self, p: &Point3) {
        self.write_f64(p.x);
        self.write_f64(p.y);
        self.write_f64(p.z);
    }

    pub(crate) fn write_vector(&mut self, v: &Vector3) {
        self.write_f64(v.x);
        self.write_f64(v.y);
        self.write_f64(v.z);
    }

    /// Column-major, 16 values
    pub(crate) fn write_transform(&mut self, t: &Transform) {
        for value in t.iter() {
            self.write_f64(*value);
        }
    }

    /// Encode and write a string.
    ///
    /// Fails with `ModelVersion` if the target encoding cannot represent it.
    pub(crate) fn write_string(&mut self, value: &str) -> Result<()> {
        let (bytes, _, had_errors) = self.encoding.encode(value);
        if had_errors {
            return Err(ModelError::ModelVersion(format!(
                "text '{value}' cannot be stored as {}",
                self.encoding.name()
            )));
        }
        self.write_len(bytes.len())?;
        self.buffer.extend_from_slice(&bytes);
        Ok(())
    }

    pub(crate) fn write_opt_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            Some(s) => {
                self.write_bool(true);
                self.write_string(s)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    pub(crate) fn write_points(&mut self, points: &[Point3]) -> Result<()> {
        self.write_len(points.len())?;
        for p in points {
            self.write_point(p);
        }
        Ok(())
    }

    pub(crate) fn write_value(&mut self, value: &AttributeValue) -> Result<()> {
        self.write_u8(value.type_tag());
        match value {
            AttributeValue::Bool(b) => self.write_bool(*b),
            AttributeValue::Int(i) | AttributeValue::Time(i) => self.write_i64(*i),
            AttributeValue::Double(d) => self.write_f64(*d),
            AttributeValue::String(s) => self.write_string(s)?,
            AttributeValue::Point(p) => self.write_point(p),
            AttributeValue::Array(items) => {
                self.write_len(items.len())?;
                for item in items {
                    self.write_value(item)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn write_dictionary(&mut self, dictionary: &AttributeDictionary) -> Result<()> {
        self.write_string(&dictionary.name)?;
        self.write_len(dictionary.len())?;
        for (key, value) in dictionary.iter() {
            self.write_string(key)?;
            self.write_value(value)?;
        }
        Ok(())
    }

    pub(crate) fn write_attributes(&mut self, attributes: &AttributeDictionaries) -> Result<()> {
        self.write_len(attributes.len())?;
        for dictionary in attributes.iter() {
            self.write_dictionary(dictionary)?;
        }
        Ok(())
    }
}

/// Cursor over section bytes with typed little-endian reads.
///
/// Running out of bytes is a `Serialization` error.
pub(crate) struct StreamReader<'a> {
    cursor: Cursor<&'a [u8]>,
    encoding: &'static Encoding,
}

impl<'a> StreamReader<'a> {
    pub(crate) fn new(data: &'a [u8], encoding: &'static Encoding) -> Self {
        Self {
            cursor: Cursor::new(data),
            encoding,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        let data = self.cursor.get_ref();
        data.len().saturating_sub(self.cursor.position() as usize)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(truncated)
    }

    pub(crate) fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ModelError::ModelInvalid(format!("invalid boolean byte {other}"))),
        }
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<LittleEndian>().map_err(truncated)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(truncated)
    }

    /// Read an element count, rejecting counts larger than the bytes left
    pub(crate) fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u32()? as usize;
        if len > self.remaining() {
            return Err(ModelError::Serialization(format!(
                "count {len} runs past the end of the section"
            )));
        }
        Ok(len)
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64> {
        self.cursor.read_i64::<LittleEndian>().map_err(truncated)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<LittleEndian>().map_err(truncated)
    }

    pub(crate) fn read_pid(&mut self) -> Result<PersistentId> {
        Ok(PersistentId::new(self.read_i64()?))
    }

    pub(crate) fn read_opt_pid(&mut self) -> Result<Option<PersistentId>> {
        let pid = self.read_pid()?;
        Ok((!pid.is_null()).then_some(pid))
    }

    pub(crate) fn read_color(&mut self) -> Result<Color> {
        Ok(Color::from_packed(self.read_u32()?))
    }

    pub(crate) fn read_point(&mut self) -> Result<Point3> {
        Ok(Point3::new(self.read_f64()?, self.read_f64()?, self.read_f64()?))
    }

    pub(crate) fn read_vector(&mut self) -> Result<Vector3> {
        Ok(Vector3::new(self.read_f64()?, self.read_f64()?, self.read_f64()?))
    }

    pub(crate) fn read_transform(&mut self) -> Result<Transform> {
        let mut values = [0.0f64; 16];
        for v in values.iter_mut() {
            *v = self.read_f64()?;
        }
        Ok(Transform::from_column_slice(&values))
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ModelError::Serialization(format!(
                "{len} bytes requested, {} left",
                self.remaining()
            )));
        }
        let start = self.cursor.position() as usize;
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub(crate) fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(ModelError::ModelInvalid(format!(
                "string is not valid {}",
                self.encoding.name()
            )));
        }
        Ok(text.into_owned())
    }

    pub(crate) fn read_opt_string(&mut self) -> Result<Option<String>> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn read_points(&mut self) -> Result<Vec<Point3>> {
        let len = self.read_len()?;
        (0..len).map(|_| self.read_point()).collect()
    }

    pub(crate) fn read_value(&mut self) -> Result<AttributeValue> {
        self.read_value_at(0)
    }

    fn read_value_at(&mut self, depth: usize) -> Result<AttributeValue> {
        let tag = self.read_u8()?;
        Ok(match tag {
            1 => AttributeValue::Bool(self.read_bool()?),
            2 => AttributeValue::Int(self.read_i64()?),
            3 => AttributeValue::Double(self.read_f64()?),
            4 => AttributeValue::String(self.read_string()?),
            5 => AttributeValue::Time(self.read_i64()?),
            6 => AttributeValue::Point(self.read_point()?),
            7 if depth < MAX_ARRAY_DEPTH => {
                let len = self.read_len()?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value_at(depth + 1)?);
                }
                AttributeValue::Array(items)
            }
            7 => {
                return Err(ModelError::ModelInvalid(
                    "attribute arrays nested too deeply".to_string(),
                ))
            }
            other => {
                return Err(ModelError::ModelInvalid(format!(
                    "unknown attribute value type {other}"
                )))
            }
        })
    }

    pub(crate) fn read_dictionary(&mut self) -> Result<AttributeDictionary> {
        let mut dictionary = AttributeDictionary::new(self.read_string()?);
        let len = self.read_len()?;
        for _ in 0..len {
            let key = self.read_string()?;
            let value = self.read_value()?;
            dictionary.set(key, value);
        }
        Ok(dictionary)
    }

    pub(crate) fn read_attributes(&mut self) -> Result<AttributeDictionaries> {
        let mut attributes = AttributeDictionaries::new();
        let len = self.read_len()?;
        for _ in 0..len {
            attributes.insert(self.read_dictionary()?);
        }
        Ok(attributes)
    }
}
