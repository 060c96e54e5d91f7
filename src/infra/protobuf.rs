// ============================================================
// Layer 6 — Protocol Buffers wire format
// ============================================================
// Just enough of the protobuf encoding to write and read back
// ONNX ModelProto files:
//
//   wire type 0 — varint           (ints, enums)
//   wire type 2 — length-delimited (strings, bytes, messages)
//   wire type 5 — fixed32          (floats)
//
// Every field is prefixed with a tag: (field_number << 3) | wire_type.
//
// Reference: https://protobuf.dev/programming-guides/encoding/

use thiserror::Error;

pub const WIRE_VARINT:  u32 = 0;
pub const WIRE_FIXED64: u32 = 1;
pub const WIRE_LEN:     u32 = 2;
pub const WIRE_FIXED32: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("varint longer than 10 bytes")]
    VarintTooLong,

    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u32),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

/// Append-only protobuf message writer.
#[derive(Debug, Default)]
pub struct PbEncoder {
    buf: Vec<u8>,
}

impl PbEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_varint(&mut self, mut val: u64) {
        loop {
            let byte = (val & 0x7F) as u8;
            val >>= 7;
            if val == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn write_tag(&mut self, field: u32, wire_type: u32) {
        self.write_varint(((field as u64) << 3) | wire_type as u64);
    }

    pub fn write_varint_field(&mut self, field: u32, val: u64) {
        self.write_tag(field, WIRE_VARINT);
        self.write_varint(val);
    }

    /// int64 fields use plain two's-complement varints, not zigzag.
    pub fn write_int64_field(&mut self, field: u32, val: i64) {
        self.write_varint_field(field, val as u64);
    }

    pub fn write_float_field(&mut self, field: u32, val: f32) {
        self.write_tag(field, WIRE_FIXED32);
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_bytes_field(&mut self, field: u32, data: &[u8]) {
        self.write_tag(field, WIRE_LEN);
        self.write_varint(data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    pub fn write_string_field(&mut self, field: u32, val: &str) {
        self.write_bytes_field(field, val.as_bytes());
    }

    pub fn write_message_field(&mut self, field: u32, message: &PbEncoder) {
        self.write_bytes_field(field, &message.buf);
    }
}

/// Cursor over one encoded message.
pub struct PbDecoder<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> PbDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut result = 0u64;
        let mut shift  = 0u32;
        loop {
            let byte = *self.data.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
            self.pos += 1;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(DecodeError::VarintTooLong);
            }
        }
    }

    /// Returns (field_number, wire_type).
    pub fn read_tag(&mut self) -> Result<(u32, u32), DecodeError> {
        let val = self.read_varint()?;
        Ok(((val >> 3) as u32, (val & 0x7) as u32))
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint()? as usize;
        self.take(len)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn skip_field(&mut self, wire_type: u32) -> Result<(), DecodeError> {
        match wire_type {
            WIRE_VARINT  => { self.read_varint()?; }
            WIRE_FIXED64 => { self.take(8)?; }
            WIRE_LEN     => { self.read_bytes()?; }
            WIRE_FIXED32 => { self.take(4)?; }
            other        => return Err(DecodeError::UnsupportedWireType(other)),
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
        let out = self.data.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(out)
    }
}
