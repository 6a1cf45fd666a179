//! `Decoder` - reads MessagePack items from a byte slice into [`Value`]s.
//!
//! Containers are tracked on an explicit stack of frames rather than by
//! recursion, so nesting depth in untrusted input only costs heap memory.

use std::sync::Arc;

use log::{debug, trace};
use msgpack_lite_buffers::{BufferError, Reader};

use crate::constants::*;
use crate::error::LengthKind;
use crate::value::{Extension, Map};
use crate::{DecodeLimits, DecodeOptions, ExtensionRegistry, MsgPackError, Value};

/// Result of reading one format byte and its prefix.
enum Head {
    Value(Value),
    Array(usize),
    Map(usize),
}

/// A container whose elements are still being read.
enum Frame {
    Array {
        items: Vec<Value>,
        remaining: usize,
    },
    Map {
        entries: Map,
        remaining: usize,
        key: Option<String>,
    },
    /// Top-level array-shaped record in map-keys mode.
    Record {
        entries: Map,
        keys: Arc<[String]>,
        next: usize,
    },
}

impl Frame {
    /// Adds a finished child value. Returns `true` once the container is full.
    fn push(&mut self, value: Value) -> bool {
        match self {
            Frame::Array { items, remaining } => {
                items.push(value);
                *remaining -= 1;
                *remaining == 0
            }
            Frame::Map {
                entries,
                remaining,
                key,
            } => {
                if let Some(key) = key.take() {
                    // later duplicates overwrite earlier ones
                    entries.insert(key, value);
                }
                *remaining -= 1;
                *remaining == 0
            }
            Frame::Record {
                entries,
                keys,
                next,
            } => {
                entries.insert(keys[*next].clone(), value);
                *next += 1;
                *next == keys.len()
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Frame::Array { items, .. } => Value::Array(items),
            Frame::Map { entries, .. } | Frame::Record { entries, .. } => Value::Map(entries),
        }
    }

    fn awaits_key(&self) -> bool {
        matches!(self, Frame::Map { key: None, .. })
    }
}

pub struct Decoder<'a> {
    reader: Reader<'a>,
    extension_codec: Arc<dyn ExtensionRegistry>,
    limits: DecodeLimits,
    map_keys: Option<Arc<[String]>>,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8], options: &DecodeOptions) -> Self {
        Self {
            reader: Reader::new(input),
            extension_codec: Arc::clone(&options.extension_codec),
            limits: options.limits,
            map_keys: options.map_keys.as_deref().map(Arc::from),
        }
    }

    /// Byte offset of the next unread item.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    pub fn has_remaining(&self) -> bool {
        self.reader.remaining() > 0
    }

    /// Decodes one complete value, advancing past exactly the bytes it used.
    pub fn decode_one(&mut self) -> Result<Value, MsgPackError> {
        let start = self.reader.position();
        let mut stack: Vec<Frame> = Vec::new();
        loop {
            if stack.last().is_some_and(Frame::awaits_key) {
                let key = self.read_key()?;
                if let Some(Frame::Map { key: slot, .. }) = stack.last_mut() {
                    *slot = Some(key);
                }
                continue;
            }

            let mut value = match self.read_head()? {
                Head::Value(value) => value,
                Head::Array(size) => match self.map_keys.clone().filter(|_| stack.is_empty()) {
                    Some(keys) => {
                        if size != keys.len() {
                            debug!("positional record has {size} values, expected {}", keys.len());
                            return Err(MsgPackError::MapKeysMismatch {
                                expected: keys.len(),
                                actual: size,
                                offset: self.reader.position(),
                            });
                        }
                        if size == 0 {
                            Value::Map(Map::new())
                        } else {
                            stack.push(Frame::Record {
                                entries: Map::with_capacity(self.prealloc(size)),
                                keys,
                                next: 0,
                            });
                            continue;
                        }
                    }
                    None if size == 0 => Value::Array(Vec::new()),
                    None => {
                        stack.push(Frame::Array {
                            items: Vec::with_capacity(self.prealloc(size)),
                            remaining: size,
                        });
                        continue;
                    }
                },
                Head::Map(0) => Value::Map(Map::new()),
                Head::Map(size) => {
                    stack.push(Frame::Map {
                        entries: Map::with_capacity(self.prealloc(size)),
                        remaining: size,
                        key: None,
                    });
                    continue;
                }
            };

            loop {
                let Some(mut frame) = stack.pop() else {
                    trace!(
                        "decoded {} from {} bytes",
                        value.kind(),
                        self.reader.position() - start
                    );
                    return Ok(value);
                };
                if frame.push(value) {
                    value = frame.into_value();
                } else {
                    stack.push(frame);
                    break;
                }
            }
        }
    }

    /// Every element takes at least one byte, so never reserve more slots
    /// than there are unread bytes.
    fn prealloc(&self, size: usize) -> usize {
        size.min(self.reader.remaining())
    }

    fn read<T>(
        &mut self,
        f: impl FnOnce(&mut Reader<'a>) -> Result<T, BufferError>,
    ) -> Result<T, MsgPackError> {
        let offset = self.reader.position();
        f(&mut self.reader).map_err(|err| match err {
            BufferError::EndOfBuffer => MsgPackError::UnexpectedEof { offset },
            BufferError::InvalidUtf8 => MsgPackError::InvalidUtf8 { offset },
        })
    }

    fn check_length(&self, kind: LengthKind, length: usize) -> Result<usize, MsgPackError> {
        let max = match kind {
            LengthKind::Str => self.limits.max_str_length,
            LengthKind::Bin => self.limits.max_bin_length,
            LengthKind::Array => self.limits.max_array_length,
            LengthKind::Map => self.limits.max_map_length,
            LengthKind::Ext => self.limits.max_ext_length,
        };
        if length > max {
            debug!("rejecting {kind} of length {length}, limit is {max}");
            return Err(MsgPackError::LengthExceeded { kind, length, max });
        }
        Ok(length)
    }

    fn read_u8_size(&mut self, kind: LengthKind) -> Result<usize, MsgPackError> {
        let size = self.read(Reader::try_u8)? as usize;
        self.check_length(kind, size)
    }

    fn read_u16_size(&mut self, kind: LengthKind) -> Result<usize, MsgPackError> {
        let size = self.read(Reader::try_u16)? as usize;
        self.check_length(kind, size)
    }

    fn read_u32_size(&mut self, kind: LengthKind) -> Result<usize, MsgPackError> {
        let size = self.read(Reader::try_u32)? as usize;
        self.check_length(kind, size)
    }

    fn read_head(&mut self) -> Result<Head, MsgPackError> {
        let offset = self.reader.position();
        let byte = self.read(Reader::try_u8)?;
        let value = match byte {
            0x00..=POSITIVE_FIXINT_MAX => Value::Int(byte as i64),
            0x80..=0x8f => {
                let size = self.check_length(LengthKind::Map, (byte & 0x0f) as usize)?;
                return Ok(Head::Map(size));
            }
            0x90..=0x9f => {
                let size = self.check_length(LengthKind::Array, (byte & 0x0f) as usize)?;
                return Ok(Head::Array(size));
            }
            0xa0..=0xbf => {
                let size = self.check_length(LengthKind::Str, (byte & 0x1f) as usize)?;
                self.read_str(size)?
            }
            NIL => Value::Nil,
            NEVER_USED => return Err(MsgPackError::InvalidFormat { byte, offset }),
            FALSE => Value::Bool(false),
            TRUE => Value::Bool(true),
            BIN8 => {
                let size = self.read_u8_size(LengthKind::Bin)?;
                self.read_bin(size)?
            }
            BIN16 => {
                let size = self.read_u16_size(LengthKind::Bin)?;
                self.read_bin(size)?
            }
            BIN32 => {
                let size = self.read_u32_size(LengthKind::Bin)?;
                self.read_bin(size)?
            }
            EXT8 => {
                let size = self.read_u8_size(LengthKind::Ext)?;
                self.read_ext(size)?
            }
            EXT16 => {
                let size = self.read_u16_size(LengthKind::Ext)?;
                self.read_ext(size)?
            }
            EXT32 => {
                let size = self.read_u32_size(LengthKind::Ext)?;
                self.read_ext(size)?
            }
            FLOAT32 => Value::Float(self.read(Reader::try_f32)? as f64),
            FLOAT64 => Value::Float(self.read(Reader::try_f64)?),
            UINT8..=INT64 => self.read_int(byte)?,
            FIXEXT1 => self.read_fixext(1)?,
            FIXEXT2 => self.read_fixext(2)?,
            FIXEXT4 => self.read_fixext(4)?,
            FIXEXT8 => self.read_fixext(8)?,
            FIXEXT16 => self.read_fixext(16)?,
            STR8 => {
                let size = self.read_u8_size(LengthKind::Str)?;
                self.read_str(size)?
            }
            STR16 => {
                let size = self.read_u16_size(LengthKind::Str)?;
                self.read_str(size)?
            }
            STR32 => {
                let size = self.read_u32_size(LengthKind::Str)?;
                self.read_str(size)?
            }
            ARRAY16 => return Ok(Head::Array(self.read_u16_size(LengthKind::Array)?)),
            ARRAY32 => return Ok(Head::Array(self.read_u32_size(LengthKind::Array)?)),
            MAP16 => return Ok(Head::Map(self.read_u16_size(LengthKind::Map)?)),
            MAP32 => return Ok(Head::Map(self.read_u32_size(LengthKind::Map)?)),
            NEGATIVE_FIXINT_MIN..=0xff => Value::Int(byte as i8 as i64),
        };
        Ok(Head::Value(value))
    }

    /// Reads the payload of a fixed-width integer (format bytes 0xcc..=0xd3).
    fn read_int(&mut self, byte: u8) -> Result<Value, MsgPackError> {
        let value = match byte {
            UINT8 => Value::Int(self.read(Reader::try_u8)? as i64),
            UINT16 => Value::Int(self.read(Reader::try_u16)? as i64),
            UINT32 => Value::Int(self.read(Reader::try_u32)? as i64),
            UINT64 => Value::from(self.read(Reader::try_u64)?),
            INT8 => Value::Int(self.read(Reader::try_i8)? as i64),
            INT16 => Value::Int(self.read(Reader::try_i16)? as i64),
            INT32 => Value::Int(self.read(Reader::try_i32)? as i64),
            INT64 => Value::Int(self.read(Reader::try_i64)?),
            _ => {
                return Err(MsgPackError::InvalidFormat {
                    byte,
                    offset: self.reader.position() - 1,
                })
            }
        };
        Ok(value)
    }

    fn read_str(&mut self, size: usize) -> Result<Value, MsgPackError> {
        Ok(Value::Str(self.read_utf8(size)?))
    }

    fn read_utf8(&mut self, size: usize) -> Result<String, MsgPackError> {
        self.read(|r| r.try_utf8(size)).map(str::to_owned)
    }

    fn read_bin(&mut self, size: usize) -> Result<Value, MsgPackError> {
        self.read(|r| r.try_buf(size)).map(|b| Value::Bin(b.to_vec()))
    }

    fn read_fixext(&mut self, size: usize) -> Result<Value, MsgPackError> {
        let size = self.check_length(LengthKind::Ext, size)?;
        self.read_ext(size)
    }

    fn read_ext(&mut self, size: usize) -> Result<Value, MsgPackError> {
        let type_code = self.read(Reader::try_i8)?;
        let data = self.read(|r| r.try_buf(size))?.to_vec();
        self.extension_codec
            .decode(Extension { type_code, data })
    }

    /// Reads a map key: any string, or an integer rendered as decimal text.
    /// A rejected key is not consumed.
    fn read_key(&mut self) -> Result<String, MsgPackError> {
        let offset = self.reader.position();
        let byte = self.read(|r| r.try_peek())?;
        let is_key = matches!(
            byte,
            0x00..=POSITIVE_FIXINT_MAX
                | 0xa0..=0xbf
                | UINT8..=INT64
                | STR8..=STR32
                | NEGATIVE_FIXINT_MIN..=0xff
        );
        if !is_key {
            debug!("rejecting map key with format byte 0x{byte:02x}");
            return Err(MsgPackError::InvalidMapKey { byte, offset });
        }
        self.read(Reader::try_u8)?;
        match byte {
            0xa0..=0xbf => {
                let size = self.check_length(LengthKind::Str, (byte & 0x1f) as usize)?;
                self.read_utf8(size)
            }
            STR8 => {
                let size = self.read_u8_size(LengthKind::Str)?;
                self.read_utf8(size)
            }
            STR16 => {
                let size = self.read_u16_size(LengthKind::Str)?;
                self.read_utf8(size)
            }
            STR32 => {
                let size = self.read_u32_size(LengthKind::Str)?;
                self.read_utf8(size)
            }
            0x00..=POSITIVE_FIXINT_MAX => Ok(byte.to_string()),
            NEGATIVE_FIXINT_MIN..=0xff => Ok((byte as i8).to_string()),
            UINT8..=INT64 => match self.read_int(byte)? {
                Value::Int(i) => Ok(i.to_string()),
                Value::UInt(u) => Ok(u.to_string()),
                _ => Err(MsgPackError::InvalidMapKey { byte, offset }),
            },
            _ => Err(MsgPackError::InvalidMapKey { byte, offset }),
        }
    }
}

/// Iterates over consecutive values until the input is exhausted. Stops
/// after the first error.
impl Iterator for Decoder<'_> {
    type Item = Result<Value, MsgPackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_remaining() {
            return None;
        }
        let result = self.decode_one();
        if result.is_err() {
            self.reader.x = self.reader.uint8.len();
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Value, MsgPackError> {
        Decoder::new(bytes, &DecodeOptions::default()).decode_one()
    }

    #[test]
    fn every_format_byte_is_classified() {
        // With no payload, every byte either decodes on its own or reports
        // a shortage; only 0xc1 is rejected as a format error.
        for byte in 0u8..=255 {
            match decode(&[byte]) {
                Ok(_) | Err(MsgPackError::UnexpectedEof { .. }) => assert_ne!(byte, 0xc1),
                Err(MsgPackError::InvalidFormat { byte: b, offset: 0 }) => {
                    assert_eq!(b, 0xc1)
                }
                Err(other) => panic!("byte 0x{byte:02x}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let depth = 100_000;
        let mut bytes = vec![0x91; depth];
        bytes.push(0xc0);
        let mut value = decode(&bytes).unwrap();
        let mut seen = 0;
        while let Value::Array(mut items) = value {
            value = items.pop().unwrap();
            seen += 1;
        }
        assert_eq!(seen, depth);
        assert_eq!(value, Value::Nil);
    }

    #[test]
    fn position_advances_by_consumed_bytes() {
        let bytes = [0x92, 0x01, 0x02, 0xc3];
        let mut decoder = Decoder::new(&bytes, &DecodeOptions::default());
        assert_eq!(
            decoder.decode_one().unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(decoder.position(), 3);
        assert_eq!(decoder.decode_one().unwrap(), Value::Bool(true));
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn integer_map_keys_become_text() {
        // {1: "a", -1: "b", 300: "c"}
        let bytes = [
            0x83, 0x01, 0xa1, b'a', 0xff, 0xa1, b'b', 0xcd, 0x01, 0x2c, 0xa1, b'c',
        ];
        let map = decode(&bytes).unwrap();
        let keys: Vec<&String> = map.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["1", "-1", "300"]);
    }

    #[test]
    fn non_scalar_map_key_is_rejected() {
        assert_eq!(
            decode(&[0x81, 0x90, 0x01]),
            Err(MsgPackError::InvalidMapKey {
                byte: 0x90,
                offset: 1
            })
        );
    }

    #[test]
    fn rejected_map_key_is_left_unread() {
        let bytes = [0x81, 0xc3, 0x01];
        let mut decoder = Decoder::new(&bytes, &DecodeOptions::default());
        assert!(matches!(
            decoder.decode_one(),
            Err(MsgPackError::InvalidMapKey { byte: 0xc3, .. })
        ));
        assert_eq!(decoder.position(), 1);
    }
}
