//! Fixed-layout struct marshalling
//!
//! PLC register blocks are frequently mapped onto fixed-layout records mixing
//! booleans, integers, floats, fixed-length ASCII strings and nested records.
//! This module declares such layouts as explicit field-descriptor lists
//! ([`StructSchema`]) and marshals values ([`FieldValue`]) to and from the
//! little-endian byte layout the PLC expects.
//!
//! ## Layout rules
//!
//! - All boolean fields are packed 8-per-byte, low bit first, in declaration
//!   order, ahead of every other field regardless of where they appear in
//!   the declaration.
//! - The boolean area is rounded up to an even byte count before the first
//!   non-boolean field.
//! - Remaining fields follow in declaration order at consecutive offsets:
//!   integers and IEEE floats little-endian, strings ASCII right-padded with
//!   NUL bytes to their declared length, nested records encoded recursively
//!   and copied inline.
//!
//! The byte-size computation scans *all* fields of a schema to count
//! booleans before laying any of them out; only the packing step itself is
//! order-sensitive. This two-pass counting-then-packing behavior is
//! load-bearing for bit-exact compatibility with deployed register maps.
//!
//! ## Example
//!
//! ```rust
//! use voltage_mc::schema::{Field, FieldValue, StructSchema};
//!
//! let schema = StructSchema::new(vec![
//!     Field::bool("running"),
//!     Field::bool("fault"),
//!     Field::i16("speed"),
//!     Field::f32("temperature"),
//!     Field::string("batch_id", 8),
//! ]);
//!
//! assert_eq!(schema.size_of().unwrap(), 2 + 2 + 4 + 8);
//!
//! let values = vec![
//!     FieldValue::Bool(true),
//!     FieldValue::Bool(false),
//!     FieldValue::I16(1500),
//!     FieldValue::F32(42.5),
//!     FieldValue::Str("LOT-17".to_string()),
//! ];
//! let bytes = schema.encode(&values).unwrap();
//! assert_eq!(schema.decode(&bytes).unwrap(), values);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{McError, McResult};

/// Field kind of a fixed-layout record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Single bit, packed into the leading boolean area
    Bool,
    /// Unsigned 8-bit integer
    Byte,
    /// Signed 16-bit integer (little-endian)
    I16,
    /// Unsigned 16-bit integer (little-endian)
    U16,
    /// Signed 32-bit integer (little-endian)
    I32,
    /// Unsigned 32-bit integer (little-endian)
    U32,
    /// IEEE 754 single-precision float (little-endian)
    F32,
    /// IEEE 754 double-precision float (little-endian)
    F64,
    /// Fixed-length ASCII string.
    ///
    /// `len` is the on-wire byte length. `None` means the declaration is
    /// incomplete; this is a fatal schema error raised at the first
    /// encode/decode attempt.
    Str {
        /// Declared byte length
        len: Option<usize>,
    },
    /// Nested fixed-layout record, encoded recursively and copied inline
    Nested(StructSchema),
}

/// One named field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, used in error messages
    pub name: String,
    /// Field kind
    pub kind: FieldKind,
}

impl Field {
    /// Create a field descriptor.
    pub fn new<S: Into<String>>(name: S, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Boolean field.
    pub fn bool<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    /// Byte field.
    pub fn byte<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::Byte)
    }

    /// Signed 16-bit field.
    pub fn i16<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::I16)
    }

    /// Unsigned 16-bit field.
    pub fn u16<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::U16)
    }

    /// Signed 32-bit field.
    pub fn i32<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::I32)
    }

    /// Unsigned 32-bit field.
    pub fn u32<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::U32)
    }

    /// Single-precision float field.
    pub fn f32<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::F32)
    }

    /// Double-precision float field.
    pub fn f64<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldKind::F64)
    }

    /// Fixed-length ASCII string field with a declared byte length.
    pub fn string<S: Into<String>>(name: S, len: usize) -> Self {
        Self::new(name, FieldKind::Str { len: Some(len) })
    }

    /// Nested record field.
    pub fn nested<S: Into<String>>(name: S, schema: StructSchema) -> Self {
        Self::new(name, FieldKind::Nested(schema))
    }
}

/// A marshalled field value. One-to-one with [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean value
    Bool(bool),
    /// Unsigned 8-bit value
    Byte(u8),
    /// Signed 16-bit value
    I16(i16),
    /// Unsigned 16-bit value
    U16(u16),
    /// Signed 32-bit value
    I32(i32),
    /// Unsigned 32-bit value
    U32(u32),
    /// Single-precision float value
    F32(f32),
    /// Double-precision float value
    F64(f64),
    /// String value (at most the declared length, ASCII)
    Str(String),
    /// Nested record values in the nested schema's declaration order
    Nested(Vec<FieldValue>),
}

/// Ordered field descriptors for one fixed-layout record type.
///
/// Derive once per record type and cache; schemas are cheap to clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructSchema {
    fields: Vec<Field>,
}

impl StructSchema {
    /// Create a schema from ordered field descriptors.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Ordered field descriptors.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Exact byte size of the encoded record.
    ///
    /// All boolean fields contribute one bit each regardless of position,
    /// rounded up to whole bytes and then to an even count; every other
    /// field then adds its fixed width in declaration order.
    pub fn size_of(&self) -> McResult<usize> {
        let bool_count = self
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Bool)
            .count();
        let mut size = even_round(bool_count.div_ceil(8));

        for field in &self.fields {
            size += match &field.kind {
                FieldKind::Bool => 0,
                FieldKind::Byte => 1,
                FieldKind::I16 | FieldKind::U16 => 2,
                FieldKind::I32 | FieldKind::U32 | FieldKind::F32 => 4,
                FieldKind::F64 => 8,
                FieldKind::Str { len } => declared_len(field, *len)?,
                FieldKind::Nested(schema) => schema.size_of()?,
            };
        }

        Ok(size)
    }

    /// Number of 16-bit registers covered by the encoded record.
    pub fn register_count(&self) -> McResult<usize> {
        Ok(self.size_of()?.div_ceil(2))
    }

    /// Serialize `values` into the record's byte layout.
    ///
    /// `values` must match the schema field-for-field; a kind mismatch or a
    /// string exceeding its declared length is a schema error.
    pub fn encode(&self, values: &[FieldValue]) -> McResult<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(McError::schema(format!(
                "Value count {} does not match schema field count {}",
                values.len(),
                self.fields.len()
            )));
        }

        let mut bytes = vec![0u8; self.size_of()?];

        // Pass 1: pack booleans into the leading bit area.
        let mut bit_index = 0usize;
        for (field, value) in self.fields.iter().zip(values) {
            if field.kind != FieldKind::Bool {
                continue;
            }
            let FieldValue::Bool(b) = value else {
                return Err(kind_mismatch(field, value));
            };
            if *b {
                bytes[bit_index / 8] |= 1 << (bit_index % 8);
            }
            bit_index += 1;
        }

        // Pass 2: remaining fields at consecutive offsets after the
        // even-rounded boolean area.
        let mut offset = even_round(bit_index.div_ceil(8));
        for (field, value) in self.fields.iter().zip(values) {
            match (&field.kind, value) {
                (FieldKind::Bool, _) => {}
                (FieldKind::Byte, FieldValue::Byte(v)) => {
                    bytes[offset] = *v;
                    offset += 1;
                }
                (FieldKind::I16, FieldValue::I16(v)) => {
                    bytes[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
                    offset += 2;
                }
                (FieldKind::U16, FieldValue::U16(v)) => {
                    bytes[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
                    offset += 2;
                }
                (FieldKind::I32, FieldValue::I32(v)) => {
                    bytes[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
                    offset += 4;
                }
                (FieldKind::U32, FieldValue::U32(v)) => {
                    bytes[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
                    offset += 4;
                }
                (FieldKind::F32, FieldValue::F32(v)) => {
                    bytes[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
                    offset += 4;
                }
                (FieldKind::F64, FieldValue::F64(v)) => {
                    bytes[offset..offset + 8].copy_from_slice(&v.to_le_bytes());
                    offset += 8;
                }
                (FieldKind::Str { len }, FieldValue::Str(s)) => {
                    let len = declared_len(field, *len)?;
                    if !s.is_ascii() {
                        return Err(McError::schema(format!(
                            "String field '{}' contains non-ASCII data",
                            field.name
                        )));
                    }
                    if s.len() > len {
                        return Err(McError::schema(format!(
                            "String field '{}' is {} bytes but declares length {}",
                            field.name,
                            s.len(),
                            len
                        )));
                    }
                    // Right-padded with NUL bytes; the buffer is pre-zeroed.
                    bytes[offset..offset + s.len()].copy_from_slice(s.as_bytes());
                    offset += len;
                }
                (FieldKind::Nested(schema), FieldValue::Nested(inner)) => {
                    let encoded = schema.encode(inner)?;
                    bytes[offset..offset + encoded.len()].copy_from_slice(&encoded);
                    offset += encoded.len();
                }
                _ => return Err(kind_mismatch(field, value)),
            }
        }

        Ok(bytes)
    }

    /// Deserialize a byte buffer into values, mirroring [`encode`]
    /// field-for-field and byte-for-byte.
    ///
    /// Trailing NUL bytes are trimmed from string fields.
    ///
    /// [`encode`]: StructSchema::encode
    pub fn decode(&self, bytes: &[u8]) -> McResult<Vec<FieldValue>> {
        let size = self.size_of()?;
        if bytes.len() < size {
            return Err(McError::read(format!(
                "Struct buffer is {} bytes but the schema needs {}",
                bytes.len(),
                size
            )));
        }

        // The boolean area size is fixed by the total bool count, so one
        // pass suffices: bools pull from the bit cursor, everything else
        // from the byte cursor behind the even-rounded boolean area.
        let bool_count = self
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Bool)
            .count();
        let mut bit_index = 0usize;
        let mut offset = even_round(bool_count.div_ceil(8));

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match &field.kind {
                FieldKind::Bool => {
                    let b = (bytes[bit_index / 8] >> (bit_index % 8)) & 1 == 1;
                    bit_index += 1;
                    FieldValue::Bool(b)
                }
                FieldKind::Byte => {
                    let v = FieldValue::Byte(bytes[offset]);
                    offset += 1;
                    v
                }
                FieldKind::I16 => {
                    let v = i16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
                    offset += 2;
                    FieldValue::I16(v)
                }
                FieldKind::U16 => {
                    let v = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
                    offset += 2;
                    FieldValue::U16(v)
                }
                FieldKind::I32 => {
                    let v = i32::from_le_bytes(slice4(bytes, offset));
                    offset += 4;
                    FieldValue::I32(v)
                }
                FieldKind::U32 => {
                    let v = u32::from_le_bytes(slice4(bytes, offset));
                    offset += 4;
                    FieldValue::U32(v)
                }
                FieldKind::F32 => {
                    let v = f32::from_le_bytes(slice4(bytes, offset));
                    offset += 4;
                    FieldValue::F32(v)
                }
                FieldKind::F64 => {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(&bytes[offset..offset + 8]);
                    offset += 8;
                    FieldValue::F64(f64::from_le_bytes(buf))
                }
                FieldKind::Str { len } => {
                    let len = declared_len(field, *len)?;
                    let raw = &bytes[offset..offset + len];
                    let trimmed = raw
                        .iter()
                        .rposition(|&b| b != 0)
                        .map_or(&raw[..0], |pos| &raw[..=pos]);
                    offset += len;
                    FieldValue::Str(String::from_utf8_lossy(trimmed).into_owned())
                }
                FieldKind::Nested(schema) => {
                    let nested_size = schema.size_of()?;
                    let inner = schema.decode(&bytes[offset..offset + nested_size])?;
                    offset += nested_size;
                    FieldValue::Nested(inner)
                }
            };
            values.push(value);
        }

        Ok(values)
    }
}

#[inline]
fn slice4(bytes: &[u8], offset: usize) -> [u8; 4] {
    [
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]
}

/// Round a byte count up to an even boundary.
#[inline]
fn even_round(bytes: usize) -> usize {
    bytes.div_ceil(2) * 2
}

fn declared_len(field: &Field, len: Option<usize>) -> McResult<usize> {
    len.ok_or_else(|| {
        McError::schema(format!(
            "String field '{}' is missing a declared length",
            field.name
        ))
    })
}

fn kind_mismatch(field: &Field, value: &FieldValue) -> McError {
    McError::schema(format!(
        "Field '{}' declared as {:?} but value is {:?}",
        field.name, field.kind, value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_of_scalars() {
        let schema = StructSchema::new(vec![
            Field::byte("b"),
            Field::i16("s"),
            Field::i32("i"),
            Field::f32("f"),
            Field::f64("d"),
        ]);
        assert_eq!(schema.size_of().unwrap(), 1 + 2 + 4 + 4 + 8);
    }

    #[test]
    fn test_nine_bools_occupy_two_bytes() {
        // 9 bits round up to 2 bytes, which is already even.
        let mut fields: Vec<Field> = (0..9).map(|i| Field::bool(format!("b{}", i))).collect();
        fields.push(Field::i16("tail"));
        let schema = StructSchema::new(fields);
        assert_eq!(schema.size_of().unwrap(), 2 + 2);

        // The i16 starts exactly at offset 2.
        let mut values: Vec<FieldValue> = (0..9).map(|_| FieldValue::Bool(false)).collect();
        values.push(FieldValue::I16(0x0201));
        let bytes = schema.encode(&values).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_bool_area_rounds_to_even() {
        // 1..8 bools occupy 1 byte, rounded up to 2.
        let schema = StructSchema::new(vec![Field::bool("only"), Field::byte("next")]);
        assert_eq!(schema.size_of().unwrap(), 2 + 1);
    }

    #[test]
    fn test_bool_packing_low_bit_first() {
        let schema = StructSchema::new(vec![
            Field::bool("a"),
            Field::bool("b"),
            Field::bool("c"),
        ]);
        let bytes = schema
            .encode(&[
                FieldValue::Bool(true),
                FieldValue::Bool(false),
                FieldValue::Bool(true),
            ])
            .unwrap();
        assert_eq!(bytes, vec![0b0000_0101, 0x00]);
    }

    #[test]
    fn test_bools_pack_ahead_regardless_of_declaration_position() {
        // Booleans declared after other fields still land in the leading
        // packed area; the count pass scans all fields first.
        let schema = StructSchema::new(vec![
            Field::i16("word"),
            Field::bool("late_a"),
            Field::bool("late_b"),
        ]);
        assert_eq!(schema.size_of().unwrap(), 2 + 2);

        let bytes = schema
            .encode(&[
                FieldValue::I16(0x1234),
                FieldValue::Bool(true),
                FieldValue::Bool(true),
            ])
            .unwrap();
        assert_eq!(bytes, vec![0b0000_0011, 0x00, 0x34, 0x12]);

        let decoded = schema.decode(&bytes).unwrap();
        assert_eq!(decoded[0], FieldValue::I16(0x1234));
        assert_eq!(decoded[1], FieldValue::Bool(true));
        assert_eq!(decoded[2], FieldValue::Bool(true));
    }

    #[test]
    fn test_roundtrip_mixed_schema() {
        let schema = StructSchema::new(vec![
            Field::bool("running"),
            Field::bool("fault"),
            Field::bool("manual"),
            Field::i16("speed"),
            Field::u16("counter"),
            Field::i32("position"),
            Field::f32("temperature"),
            Field::f64("energy"),
            Field::string("batch_id", 10),
        ]);
        let values = vec![
            FieldValue::Bool(true),
            FieldValue::Bool(false),
            FieldValue::Bool(true),
            FieldValue::I16(-1500),
            FieldValue::U16(65000),
            FieldValue::I32(-2_000_000),
            FieldValue::F32(42.5),
            FieldValue::F64(1.25e6),
            FieldValue::Str("LOT-0042".to_string()),
        ];
        let bytes = schema.encode(&values).unwrap();
        assert_eq!(bytes.len(), schema.size_of().unwrap());
        assert_eq!(schema.decode(&bytes).unwrap(), values);
    }

    #[test]
    fn test_roundtrip_nested() {
        let inner = StructSchema::new(vec![
            Field::bool("enable"),
            Field::u16("setpoint"),
        ]);
        let schema = StructSchema::new(vec![
            Field::i16("header"),
            Field::nested("axis", inner.clone()),
            Field::nested("spare", inner),
        ]);
        // header(2) + two nested records of (2 bool area + 2) each
        assert_eq!(schema.size_of().unwrap(), 2 + 4 + 4);

        let values = vec![
            FieldValue::I16(7),
            FieldValue::Nested(vec![FieldValue::Bool(true), FieldValue::U16(300)]),
            FieldValue::Nested(vec![FieldValue::Bool(false), FieldValue::U16(0)]),
        ];
        let bytes = schema.encode(&values).unwrap();
        assert_eq!(schema.decode(&bytes).unwrap(), values);
    }

    #[test]
    fn test_string_padded_and_trimmed() {
        let schema = StructSchema::new(vec![Field::string("name", 6)]);
        let bytes = schema
            .encode(&[FieldValue::Str("AB".to_string())])
            .unwrap();
        assert_eq!(bytes, b"AB\0\0\0\0");
        assert_eq!(
            schema.decode(&bytes).unwrap(),
            vec![FieldValue::Str("AB".to_string())]
        );
    }

    #[test]
    fn test_string_without_length_fails_encode_and_decode() {
        let schema = StructSchema::new(vec![Field::new("tag", FieldKind::Str { len: None })]);

        let err = schema
            .encode(&[FieldValue::Str("x".to_string())])
            .unwrap_err();
        assert!(err.is_schema(), "encode should raise a schema error");

        let err = schema.decode(&[0u8; 16]).unwrap_err();
        assert!(err.is_schema(), "decode should raise a schema error");
    }

    #[test]
    fn test_string_too_long_fails() {
        let schema = StructSchema::new(vec![Field::string("tag", 4)]);
        let err = schema
            .encode(&[FieldValue::Str("TOOLONG".to_string())])
            .unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_kind_mismatch_fails() {
        let schema = StructSchema::new(vec![Field::i16("speed")]);
        let err = schema.encode(&[FieldValue::F32(1.0)]).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_decode_short_buffer_fails() {
        let schema = StructSchema::new(vec![Field::i32("big")]);
        let err = schema.decode(&[0u8; 2]).unwrap_err();
        assert!(matches!(err, McError::Read { .. }));
    }

    #[test]
    fn test_register_count() {
        let schema = StructSchema::new(vec![Field::byte("b"), Field::i16("s")]);
        // 3 bytes round up to 2 registers
        assert_eq!(schema.register_count().unwrap(), 2);
    }
}
