//! Binary encode/decode primitives for action records.
//!
//! Fixed-width integers and floats are little-endian. Counts, ids and
//! payload lengths use LEB128 `varuint32`. Strings and byte payloads are
//! prefixed with their `varuint32` length. Writers append to a `Vec<u8>`
//! and cannot fail; every read is bounds-checked through [`ByteReader`]
//! and reports the offset of the failure.

use flashback_core::extra::MAX_DEPTH;
use flashback_core::{BlockPos, Cape, ExtraData, ExtraValue, Skin, SurrogateId, Vec3};
use uuid::Uuid;

use crate::error::CodecError;

/// Maximum encoded length of a `varuint32`.
const VARUINT32_MAX_BYTES: usize = 5;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

/// Write a bool as one byte (0 or 1).
pub fn write_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(v as u8);
}

/// Write a little-endian u16.
pub fn write_u16_le(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian u32.
pub fn write_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian i32.
pub fn write_i32_le(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian f32.
pub fn write_f32_le(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write an unsigned LEB128 integer.
pub fn write_varuint32(buf: &mut Vec<u8>, mut v: u32) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Write a surrogate id as a `varuint32`.
pub fn write_id(buf: &mut Vec<u8>, id: SurrogateId) {
    write_varuint32(buf, id.0);
}

/// Write a length-prefixed byte payload.
pub fn write_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    write_varuint32(buf, b.len() as u32);
    buf.extend_from_slice(b);
}

/// Write a length-prefixed UTF-8 string.
pub fn write_str(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

/// Write a position as three f32s.
pub fn write_vec3(buf: &mut Vec<u8>, v: Vec3) {
    write_f32_le(buf, v.x as f32);
    write_f32_le(buf, v.y as f32);
    write_f32_le(buf, v.z as f32);
}

/// Write a block position as three i32s.
pub fn write_block_pos(buf: &mut Vec<u8>, p: BlockPos) {
    write_i32_le(buf, p.x);
    write_i32_le(buf, p.y);
    write_i32_le(buf, p.z);
}

/// Write a UUID as its 16 raw bytes.
pub fn write_uuid(buf: &mut Vec<u8>, id: &Uuid) {
    buf.extend_from_slice(id.as_bytes());
}

// ── ByteReader ──────────────────────────────────────────────────

/// Bounds-checked cursor over an encoded byte slice.
///
/// Every read either returns a value and advances, or returns
/// [`CodecError::MalformedPayload`] without advancing past the end.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Build a malformed-payload error at the current offset.
    pub fn malformed(&self, detail: impl Into<String>) -> CodecError {
        CodecError::MalformedPayload {
            detail: detail.into(),
            offset: self.pos,
        }
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(self.malformed(format!(
                "need {n} bytes, only {} remain",
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, CodecError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.malformed("need 1 byte, none remain"))
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let v = self.peek_u8()?;
        self.pos += 1;
        Ok(v)
    }

    /// Read a bool; only 0 and 1 are accepted.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.peek_u8()? {
            0 => {
                self.pos += 1;
                Ok(false)
            }
            1 => {
                self.pos += 1;
                Ok(true)
            }
            other => Err(self.malformed(format!("invalid bool byte {other}"))),
        }
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16, CodecError> {
        self.array().map(u16::from_le_bytes)
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        self.array().map(u32::from_le_bytes)
    }

    /// Read a little-endian i32.
    pub fn read_i32_le(&mut self) -> Result<i32, CodecError> {
        self.array().map(i32::from_le_bytes)
    }

    /// Read a little-endian f32.
    pub fn read_f32_le(&mut self) -> Result<f32, CodecError> {
        self.array().map(f32::from_le_bytes)
    }

    /// Read an unsigned LEB128 integer of at most five bytes.
    pub fn read_varuint32(&mut self) -> Result<u32, CodecError> {
        let start = self.pos;
        let mut value: u32 = 0;
        for i in 0..VARUINT32_MAX_BYTES {
            let byte = self.read_u8()?;
            let bits = (byte & 0x7f) as u32;
            if i == VARUINT32_MAX_BYTES - 1 && bits > 0x0f {
                self.pos = start;
                return Err(self.malformed("varuint32 overflows 32 bits"));
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        self.pos = start;
        Err(self.malformed("varuint32 longer than 5 bytes"))
    }

    /// Read a surrogate id.
    pub fn read_id(&mut self) -> Result<SurrogateId, CodecError> {
        self.read_varuint32().map(SurrogateId)
    }

    /// Read a `varuint32` count, rejecting counts that cannot possibly fit
    /// in the remaining bytes at `min_item_len` bytes per item.
    pub fn read_count(&mut self, min_item_len: usize) -> Result<usize, CodecError> {
        let count = self.read_varuint32()? as usize;
        if count.saturating_mul(min_item_len.max(1)) > self.remaining() {
            return Err(self.malformed(format!(
                "count {count} exceeds the {} remaining bytes",
                self.remaining()
            )));
        }
        Ok(count)
    }

    /// Read a length-prefixed byte payload.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_count(1)?;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| CodecError::MalformedPayload {
            detail: "string is not valid UTF-8".into(),
            offset: start,
        })
    }

    /// Read a position encoded as three f32s.
    pub fn read_vec3(&mut self) -> Result<Vec3, CodecError> {
        let x = self.read_f32_le()?;
        let y = self.read_f32_le()?;
        let z = self.read_f32_le()?;
        Ok(Vec3::new(x as f64, y as f64, z as f64))
    }

    /// Read a block position encoded as three i32s.
    pub fn read_block_pos(&mut self) -> Result<BlockPos, CodecError> {
        let x = self.read_i32_le()?;
        let y = self.read_i32_le()?;
        let z = self.read_i32_le()?;
        Ok(BlockPos::new(x, y, z))
    }

    /// Read a raw 16-byte UUID.
    pub fn read_uuid(&mut self) -> Result<Uuid, CodecError> {
        self.array().map(Uuid::from_bytes)
    }
}

// ── Extra data ──────────────────────────────────────────────────

const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_STRING: u8 = 7;
const TAG_BYTES: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;

/// Check that `data` can be decoded again: nesting must not exceed
/// [`MAX_DEPTH`].
pub fn validate_extra(data: &ExtraData) -> Result<(), CodecError> {
    let depth = data.depth();
    if depth > MAX_DEPTH {
        return Err(CodecError::MalformedPayload {
            detail: format!("extra data nests {depth} levels, limit is {MAX_DEPTH}"),
            offset: 0,
        });
    }
    Ok(())
}

/// Write an extra-data compound: entry count, then `(key, tag, value)`.
pub fn write_extra(buf: &mut Vec<u8>, data: &ExtraData) {
    write_varuint32(buf, data.len() as u32);
    for (key, value) in data.iter() {
        write_str(buf, key);
        write_extra_value(buf, value);
    }
}

fn write_extra_value(buf: &mut Vec<u8>, value: &ExtraValue) {
    match value {
        ExtraValue::Byte(v) => {
            write_u8(buf, TAG_BYTE);
            buf.push(*v as u8);
        }
        ExtraValue::Short(v) => {
            write_u8(buf, TAG_SHORT);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        ExtraValue::Int(v) => {
            write_u8(buf, TAG_INT);
            write_i32_le(buf, *v);
        }
        ExtraValue::Long(v) => {
            write_u8(buf, TAG_LONG);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        ExtraValue::Float(v) => {
            write_u8(buf, TAG_FLOAT);
            write_f32_le(buf, *v);
        }
        ExtraValue::Double(v) => {
            write_u8(buf, TAG_DOUBLE);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        ExtraValue::String(s) => {
            write_u8(buf, TAG_STRING);
            write_str(buf, s);
        }
        ExtraValue::Bytes(b) => {
            write_u8(buf, TAG_BYTES);
            write_bytes(buf, b);
        }
        ExtraValue::List(items) => {
            write_u8(buf, TAG_LIST);
            write_varuint32(buf, items.len() as u32);
            for item in items {
                write_extra_value(buf, item);
            }
        }
        ExtraValue::Compound(c) => {
            write_u8(buf, TAG_COMPOUND);
            write_extra(buf, c);
        }
    }
}

/// Read an extra-data compound.
pub fn read_extra(r: &mut ByteReader<'_>) -> Result<ExtraData, CodecError> {
    read_compound(r, 0)
}

fn read_compound(r: &mut ByteReader<'_>, depth: usize) -> Result<ExtraData, CodecError> {
    // Smallest entry: empty key (1 byte) + tag + 1-byte value.
    let count = r.read_count(3)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let key = r.read_string()?;
        let value = read_extra_value(r, depth)?;
        entries.push((key, value));
    }
    Ok(entries.into_iter().collect())
}

fn read_extra_value(r: &mut ByteReader<'_>, depth: usize) -> Result<ExtraValue, CodecError> {
    let tag = r.read_u8()?;
    let value = match tag {
        TAG_BYTE => ExtraValue::Byte(r.read_u8()? as i8),
        TAG_SHORT => ExtraValue::Short(r.read_u16_le()? as i16),
        TAG_INT => ExtraValue::Int(r.read_i32_le()?),
        TAG_LONG => ExtraValue::Long(i64::from_le_bytes(r.array()?)),
        TAG_FLOAT => ExtraValue::Float(r.read_f32_le()?),
        TAG_DOUBLE => ExtraValue::Double(f64::from_le_bytes(r.array()?)),
        TAG_STRING => ExtraValue::String(r.read_string()?),
        TAG_BYTES => ExtraValue::Bytes(r.read_bytes()?),
        TAG_LIST | TAG_COMPOUND if depth >= MAX_DEPTH => {
            return Err(r.malformed(format!("extra data nests deeper than {MAX_DEPTH}")));
        }
        TAG_LIST => {
            let count = r.read_count(2)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_extra_value(r, depth + 1)?);
            }
            ExtraValue::List(items)
        }
        TAG_COMPOUND => ExtraValue::Compound(read_compound(r, depth + 1)?),
        other => return Err(r.malformed(format!("unknown extra-data tag {other}"))),
    };
    Ok(value)
}

// ── Skins ───────────────────────────────────────────────────────

/// Write a skin record.
pub fn write_skin(buf: &mut Vec<u8>, skin: &Skin) {
    write_u32_le(buf, skin.width);
    write_u32_le(buf, skin.height);
    write_bytes(buf, &skin.pixels);
    write_bool(buf, skin.cape.is_some());
    if let Some(cape) = &skin.cape {
        write_u32_le(buf, cape.width);
        write_u32_le(buf, cape.height);
        write_bytes(buf, &cape.pixels);
    }
    write_str(buf, &skin.geometry_name);
    write_bool(buf, skin.geometry.is_some());
    if let Some(geometry) = &skin.geometry {
        write_bytes(buf, geometry);
    }
}

/// Read a skin record.
pub fn read_skin(r: &mut ByteReader<'_>) -> Result<Skin, CodecError> {
    let width = r.read_u32_le()?;
    let height = r.read_u32_le()?;
    let pixels = r.read_bytes()?;
    let cape = if r.read_bool()? {
        Some(Cape {
            width: r.read_u32_le()?,
            height: r.read_u32_le()?,
            pixels: r.read_bytes()?,
        })
    } else {
        None
    };
    let geometry_name = r.read_string()?;
    let geometry = if r.read_bool()? {
        Some(r.read_bytes()?)
    } else {
        None
    };
    Ok(Skin {
        width,
        height,
        pixels,
        cape,
        geometry_name,
        geometry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn varuint32_small_values_take_one_byte() {
        let mut buf = Vec::new();
        write_varuint32(&mut buf, 1);
        assert_eq!(buf, [1]);
        buf.clear();
        write_varuint32(&mut buf, 300);
        assert_eq!(buf, [0xac, 0x02]);
        assert_eq!(ByteReader::new(&buf).read_varuint32().unwrap(), 300);
    }

    #[test]
    fn varuint32_max_round_trips() {
        let mut buf = Vec::new();
        write_varuint32(&mut buf, u32::MAX);
        assert_eq!(buf.len(), 5);
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_varuint32().unwrap(), u32::MAX);
        assert!(r.is_empty());
    }

    #[test]
    fn varuint32_overflow_is_malformed() {
        let mut r = ByteReader::new(&[0xff, 0xff, 0xff, 0xff, 0x7f]);
        assert!(matches!(
            r.read_varuint32(),
            Err(CodecError::MalformedPayload { offset: 0, .. })
        ));
        let mut r = ByteReader::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(r.read_varuint32().is_err());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = ByteReader::new(&[1, 2, 3, 4, 5]);
        r.read_u8().unwrap();
        assert_eq!(r.read_u32_le().unwrap(), 0x0504_0302);
        let err = r.read_u8().unwrap_err();
        assert_eq!(err.offset(), 5);
    }

    #[test]
    fn oversized_length_prefix_is_rejected_before_allocating() {
        let mut buf = Vec::new();
        write_varuint32(&mut buf, 1_000_000);
        buf.extend_from_slice(b"short");
        let mut r = ByteReader::new(&buf);
        assert!(matches!(
            r.read_bytes(),
            Err(CodecError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn invalid_bool_and_utf8_are_malformed() {
        assert!(ByteReader::new(&[2]).read_bool().is_err());
        let mut buf = Vec::new();
        write_bytes(&mut buf, &[0xff, 0xfe]);
        assert!(ByteReader::new(&buf).read_string().is_err());
    }

    #[test]
    fn skin_with_cape_and_geometry_round_trips() {
        let skin = Skin {
            width: 1,
            height: 1,
            pixels: vec![1, 2, 3, 4],
            cape: Some(Cape {
                width: 1,
                height: 1,
                pixels: vec![9, 9, 9, 9],
            }),
            geometry_name: "geometry.custom".into(),
            geometry: Some(b"{}".to_vec()),
        };
        let mut buf = Vec::new();
        write_skin(&mut buf, &skin);
        let mut r = ByteReader::new(&buf);
        assert_eq!(read_skin(&mut r).unwrap(), skin);
        assert!(r.is_empty());
    }

    #[test]
    fn deeply_nested_extra_data_is_rejected() {
        let mut value = ExtraValue::Int(0);
        for _ in 0..=MAX_DEPTH {
            value = ExtraValue::List(vec![value]);
        }
        let data = ExtraData::new().with("deep", value);
        assert!(validate_extra(&data).is_err());

        let mut buf = Vec::new();
        write_extra(&mut buf, &data);
        assert!(read_extra(&mut ByteReader::new(&buf)).is_err());
    }

    #[test]
    fn unknown_extra_tag_is_malformed() {
        let mut buf = Vec::new();
        write_varuint32(&mut buf, 1);
        write_str(&mut buf, "k");
        buf.push(0x42);
        buf.push(0);
        assert!(read_extra(&mut ByteReader::new(&buf)).is_err());
    }

    fn arb_scalar() -> impl Strategy<Value = ExtraValue> {
        prop_oneof![
            any::<i8>().prop_map(ExtraValue::Byte),
            any::<i16>().prop_map(ExtraValue::Short),
            any::<i32>().prop_map(ExtraValue::Int),
            any::<i64>().prop_map(ExtraValue::Long),
            (-1.0e6f32..1.0e6).prop_map(ExtraValue::Float),
            (-1.0e12f64..1.0e12).prop_map(ExtraValue::Double),
            "[a-z]{0,8}".prop_map(ExtraValue::String),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(ExtraValue::Bytes),
        ]
    }

    fn arb_value() -> impl Strategy<Value = ExtraValue> {
        arb_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(ExtraValue::List),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                    .prop_map(|entries| ExtraValue::Compound(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn extra_data_round_trips(entries in prop::collection::vec(("[a-z]{1,6}", arb_value()), 0..6)) {
            let data: ExtraData = entries.into_iter().collect();
            let mut buf = Vec::new();
            write_extra(&mut buf, &data);
            let mut r = ByteReader::new(&buf);
            let back = read_extra(&mut r).unwrap();
            prop_assert!(r.is_empty());
            let mut again = Vec::new();
            write_extra(&mut again, &back);
            prop_assert_eq!(buf, again);
            prop_assert_eq!(back, data);
        }

        #[test]
        fn varuint32_round_trips(v in any::<u32>()) {
            let mut buf = Vec::new();
            write_varuint32(&mut buf, v);
            let mut r = ByteReader::new(&buf);
            prop_assert_eq!(r.read_varuint32().unwrap(), v);
            prop_assert!(r.is_empty());
        }
    }
}
