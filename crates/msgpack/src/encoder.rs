//! `Encoder` - walks a [`Value`] tree and appends MessagePack bytes.

use std::sync::Arc;

use log::{debug, trace};
use msgpack_lite_buffers::Writer;

use crate::constants::*;
use crate::error::LengthKind;
use crate::value::{Custom, Extension, Map};
use crate::{EncodeOptions, ExtensionRegistry, MsgPackError, Value};

pub struct Encoder {
    pub writer: Writer,
    extension_codec: Arc<dyn ExtensionRegistry>,
    max_depth: usize,
    sort_keys: bool,
    map_keys: Option<Arc<[String]>>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(&EncodeOptions::default())
    }
}

fn check_len(kind: LengthKind, length: usize) -> Result<u32, MsgPackError> {
    u32::try_from(length).map_err(|_| MsgPackError::TooLong { kind, length })
}

impl Encoder {
    pub fn new(options: &EncodeOptions) -> Self {
        Self {
            writer: Writer::with_capacity(options.initial_buffer_size),
            extension_codec: Arc::clone(&options.extension_codec),
            max_depth: options.max_depth,
            sort_keys: options.sort_keys,
            map_keys: options.map_keys.as_deref().map(Arc::from),
        }
    }

    /// Encodes one value and returns its bytes. The internal buffer is
    /// reused by the next call; on error nothing is returned.
    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>, MsgPackError> {
        self.writer.reset();
        let result = self.write_any(value, 1);
        if let Err(err) = result {
            self.writer.reset();
            return Err(err);
        }
        let bytes = self.writer.flush();
        trace!("encoded {} into {} bytes", value.kind(), bytes.len());
        Ok(bytes)
    }

    pub fn write_any(&mut self, value: &Value, depth: usize) -> Result<(), MsgPackError> {
        match value {
            Value::Nil => self.write_nil(),
            Value::Bool(b) => self.write_boolean(*b),
            Value::Int(i) => self.write_integer(*i),
            Value::UInt(u) => self.write_u_integer(*u),
            Value::Float(f) => self.write_float(*f),
            Value::Str(s) => return self.write_str(s),
            Value::Bin(b) => return self.write_bin(b),
            Value::Array(arr) => return self.write_arr(arr, depth),
            Value::Map(map) => return self.write_map(map, depth),
            Value::Ext(ext) => return self.write_ext(ext),
            Value::Custom(custom) => return self.write_custom(custom),
        }
        Ok(())
    }

    pub fn write_nil(&mut self) {
        self.writer.u8(NIL);
    }

    pub fn write_boolean(&mut self, b: bool) {
        self.writer.u8(if b { TRUE } else { FALSE });
    }

    pub fn write_float(&mut self, float: f64) {
        self.writer.u8f64(FLOAT64, float);
    }

    /// Writes a non-negative integer in the narrowest unsigned form.
    pub fn write_u_integer(&mut self, uint: u64) {
        let writer = &mut self.writer;
        if uint <= POSITIVE_FIXINT_MAX as u64 {
            writer.u8(uint as u8);
        } else if uint <= 0xff {
            writer.u16(((UINT8 as u16) << 8) | uint as u16);
        } else if uint <= 0xffff {
            writer.u8u16(UINT16, uint as u16);
        } else if uint <= 0xffff_ffff {
            writer.u8u32(UINT32, uint as u32);
        } else {
            writer.u8u64(UINT64, uint);
        }
    }

    /// Writes an integer; negative values take the narrowest signed form.
    pub fn write_integer(&mut self, int: i64) {
        if int >= 0 {
            self.write_u_integer(int as u64);
            return;
        }
        let writer = &mut self.writer;
        if int >= -0x20 {
            // negative fixint: 0xe0..=0xff
            writer.i8(int as i8);
        } else if int >= i8::MIN as i64 {
            writer.u16(((INT8 as u16) << 8) | (int as i8 as u8) as u16);
        } else if int >= i16::MIN as i64 {
            writer.u8u16(INT16, int as i16 as u16);
        } else if int >= i32::MIN as i64 {
            writer.u8u32(INT32, int as i32 as u32);
        } else {
            writer.u8u64(INT64, int as u64);
        }
    }

    pub fn write_str_hdr(&mut self, length: usize) -> Result<(), MsgPackError> {
        let length = check_len(LengthKind::Str, length)?;
        if length as usize <= FIXSTR_MAX_LEN {
            self.writer.u8(FIXSTR | length as u8);
        } else if length <= 0xff {
            self.writer.u16(((STR8 as u16) << 8) | length as u16);
        } else if length <= 0xffff {
            self.writer.u8u16(STR16, length as u16);
        } else {
            self.writer.u8u32(STR32, length);
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), MsgPackError> {
        self.write_str_hdr(s.len())?;
        self.writer.utf8(s);
        Ok(())
    }

    pub fn write_bin_hdr(&mut self, length: usize) -> Result<(), MsgPackError> {
        let length = check_len(LengthKind::Bin, length)?;
        if length <= 0xff {
            self.writer.u16(((BIN8 as u16) << 8) | length as u16);
        } else if length <= 0xffff {
            self.writer.u8u16(BIN16, length as u16);
        } else {
            self.writer.u8u32(BIN32, length);
        }
        Ok(())
    }

    pub fn write_bin(&mut self, buf: &[u8]) -> Result<(), MsgPackError> {
        self.write_bin_hdr(buf.len())?;
        self.writer.buf(buf);
        Ok(())
    }

    pub fn write_arr_hdr(&mut self, length: usize) -> Result<(), MsgPackError> {
        let length = check_len(LengthKind::Array, length)?;
        if length as usize <= FIXCOLLECTION_MAX_LEN {
            self.writer.u8(FIXARRAY | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(ARRAY16, length as u16);
        } else {
            self.writer.u8u32(ARRAY32, length);
        }
        Ok(())
    }

    pub fn write_map_hdr(&mut self, length: usize) -> Result<(), MsgPackError> {
        let length = check_len(LengthKind::Map, length)?;
        if length as usize <= FIXCOLLECTION_MAX_LEN {
            self.writer.u8(FIXMAP | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(MAP16, length as u16);
        } else {
            self.writer.u8u32(MAP32, length);
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<(), MsgPackError> {
        if depth > self.max_depth {
            debug!("refusing to encode past depth {}", self.max_depth);
            return Err(MsgPackError::DepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    pub fn write_arr(&mut self, arr: &[Value], depth: usize) -> Result<(), MsgPackError> {
        self.check_depth(depth)?;
        self.write_arr_hdr(arr.len())?;
        for item in arr {
            self.write_any(item, depth + 1)?;
        }
        Ok(())
    }

    pub fn write_map(&mut self, map: &Map, depth: usize) -> Result<(), MsgPackError> {
        self.check_depth(depth)?;
        // only the top-level record is positional
        if depth == 1 {
            if let Some(keys) = self.map_keys.clone() {
                return self.write_map_positional(map, &keys, depth);
            }
        }
        self.write_map_hdr(map.len())?;
        if self.sort_keys {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            for (key, val) in entries {
                self.write_str(key)?;
                self.write_any(val, depth + 1)?;
            }
        } else {
            for (key, val) in map {
                self.write_str(key)?;
                self.write_any(val, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Writes the record as an array of the values under `keys`; keys the
    /// record lacks are written as nil.
    fn write_map_positional(
        &mut self,
        map: &Map,
        keys: &[String],
        depth: usize,
    ) -> Result<(), MsgPackError> {
        self.write_arr_hdr(keys.len())?;
        for key in keys {
            match map.get(key) {
                Some(val) => self.write_any(val, depth + 1)?,
                None => self.write_nil(),
            }
        }
        Ok(())
    }

    pub fn write_ext_hdr(&mut self, type_code: i8, length: usize) -> Result<(), MsgPackError> {
        let tag = type_code as u8;
        let fixed = match length {
            1 => Some(FIXEXT1),
            2 => Some(FIXEXT2),
            4 => Some(FIXEXT4),
            8 => Some(FIXEXT8),
            16 => Some(FIXEXT16),
            _ => None,
        };
        if let Some(marker) = fixed {
            self.writer.u16(((marker as u16) << 8) | tag as u16);
            return Ok(());
        }
        let length = check_len(LengthKind::Ext, length)?;
        if length <= 0xff {
            self.writer.u16(((EXT8 as u16) << 8) | length as u16);
        } else if length <= 0xffff {
            self.writer.u8u16(EXT16, length as u16);
        } else {
            self.writer.u8u32(EXT32, length);
        }
        self.writer.u8(tag);
        Ok(())
    }

    pub fn write_ext(&mut self, ext: &Extension) -> Result<(), MsgPackError> {
        self.write_ext_hdr(ext.type_code, ext.data.len())?;
        self.writer.buf(&ext.data);
        Ok(())
    }

    fn write_custom(&mut self, custom: &Custom) -> Result<(), MsgPackError> {
        match self.extension_codec.try_encode(custom)? {
            Some(ext) => self.write_ext(&ext),
            None => {
                debug!("no extension registered for {}", custom.type_name());
                Err(MsgPackError::Unsupported {
                    kind: custom.type_name().to_owned(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(value: impl Into<Value>) -> Vec<u8> {
        Encoder::default().encode(&value.into()).unwrap()
    }

    #[test]
    fn integer_widths() {
        assert_eq!(bytes(0), [0x00]);
        assert_eq!(bytes(127), [0x7f]);
        assert_eq!(bytes(128), [0xcc, 0x80]);
        assert_eq!(bytes(255), [0xcc, 0xff]);
        assert_eq!(bytes(256), [0xcd, 0x01, 0x00]);
        assert_eq!(bytes(65_536), [0xce, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(bytes(1u64 << 32), [0xcf, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(bytes(-1), [0xff]);
        assert_eq!(bytes(-32), [0xe0]);
        assert_eq!(bytes(-33), [0xd0, 0xdf]);
        assert_eq!(bytes(-128), [0xd0, 0x80]);
        assert_eq!(bytes(-129), [0xd1, 0xff, 0x7f]);
        assert_eq!(bytes(-32_769), [0xd2, 0xff, 0xff, 0x7f, 0xff]);
        assert_eq!(bytes(i64::MIN), [0xd3, 0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            bytes(u64::MAX),
            [0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn ext_headers() {
        let mut encoder = Encoder::default();
        let ext = |n: usize| Value::Ext(Extension::new(5, vec![0xaa; n]));
        assert_eq!(&encoder.encode(&ext(1)).unwrap()[..2], &[0xd4, 0x05]);
        assert_eq!(&encoder.encode(&ext(16)).unwrap()[..2], &[0xd8, 0x05]);
        assert_eq!(&encoder.encode(&ext(3)).unwrap()[..3], &[0xc7, 0x03, 0x05]);
        assert_eq!(
            &encoder.encode(&ext(300)).unwrap()[..4],
            &[0xc8, 0x01, 0x2c, 0x05]
        );
        assert_eq!(&encoder.encode(&ext(0)).unwrap()[..], &[0xc7, 0x00, 0x05]);
    }

    #[test]
    fn writer_is_reused_between_calls() {
        let mut encoder = Encoder::new(&EncodeOptions::default().with_initial_buffer_size(4));
        let long = Value::Str("x".repeat(100));
        assert_eq!(encoder.encode(&long).unwrap().len(), 102);
        assert_eq!(encoder.encode(&Value::Nil).unwrap(), [0xc0]);
    }

    #[test]
    fn failed_encode_leaves_encoder_usable() {
        let mut encoder = Encoder::new(&EncodeOptions::default().with_max_depth(1));
        let nested = Value::Array(vec![Value::Array(vec![])]);
        assert!(encoder.encode(&nested).is_err());
        assert_eq!(encoder.encode(&Value::Bool(true)).unwrap(), [0xc3]);
    }
}
