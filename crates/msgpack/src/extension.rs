//! Extension registry: maps application types to extension type codes.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};

use crate::constants::TIMESTAMP_EXT_TYPE;
use crate::value::{Custom, CustomValue, Extension};
use crate::{MsgPackError, Timestamp, Value};

/// Capability the encoder and decoder consult for extension types.
///
/// `try_encode` is only called for [`Value::Custom`] values and may decline
/// by returning `Ok(None)`. `decode` is called for every extension item on
/// the wire and must hand back unknown type codes as [`Value::Ext`].
pub trait ExtensionRegistry: fmt::Debug + Send + Sync {
    fn try_encode(&self, value: &Custom) -> Result<Option<Extension>, MsgPackError>;
    fn decode(&self, ext: Extension) -> Result<Value, MsgPackError>;
}

type EncodeFn = Box<dyn Fn(&Custom) -> Result<Vec<u8>, MsgPackError> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&[u8]) -> Result<Value, MsgPackError> + Send + Sync>;

struct Encoding {
    type_code: i8,
    encode: EncodeFn,
}

/// Table-driven [`ExtensionRegistry`].
///
/// Types are looked up by `TypeId` when encoding and by type code when
/// decoding. The timestamp extension (-1) is always present.
///
/// ```
/// use msgpack_lite::{decode, encode, DecodeOptions, EncodeOptions, ExtensionCodec, Value};
/// use std::sync::Arc;
///
/// #[derive(Debug, PartialEq)]
/// struct Rgb(u8, u8, u8);
///
/// let mut codec = ExtensionCodec::new();
/// codec
///     .register(
///         7,
///         |c: &Rgb| Ok(vec![c.0, c.1, c.2]),
///         |data| match data {
///             [r, g, b] => Ok(Rgb(*r, *g, *b)),
///             _ => Err(msgpack_lite::MsgPackError::invalid_extension(7, "expected 3 bytes")),
///         },
///     )
///     .unwrap();
/// let codec = Arc::new(codec);
///
/// let bytes = encode(
///     &Value::custom(Rgb(1, 2, 3)),
///     &EncodeOptions::default().with_extension_codec(codec.clone()),
/// )
/// .unwrap();
/// let value = decode(&bytes, &DecodeOptions::default().with_extension_codec(codec)).unwrap();
/// assert_eq!(value.as_custom::<Rgb>(), Some(&Rgb(1, 2, 3)));
/// ```
pub struct ExtensionCodec {
    encoders: HashMap<TypeId, Encoding>,
    decoders: HashMap<i8, DecodeFn>,
}

impl Default for ExtensionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionCodec {
    pub fn new() -> Self {
        let mut codec = Self {
            encoders: HashMap::new(),
            decoders: HashMap::new(),
        };
        codec.insert::<Timestamp, _, _>(
            TIMESTAMP_EXT_TYPE,
            |ts| Ok(ts.to_bytes()),
            Timestamp::from_bytes,
        );
        codec
    }

    /// Registers an application type under `type_code` (0..=127).
    pub fn register<T, E, D>(
        &mut self,
        type_code: i8,
        encode: E,
        decode: D,
    ) -> Result<&mut Self, MsgPackError>
    where
        T: CustomValue,
        E: Fn(&T) -> Result<Vec<u8>, MsgPackError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<T, MsgPackError> + Send + Sync + 'static,
    {
        if type_code < 0 {
            return Err(MsgPackError::ReservedExtensionType(type_code));
        }
        if self.decoders.contains_key(&type_code) || self.encoders.contains_key(&TypeId::of::<T>())
        {
            return Err(MsgPackError::DuplicateExtensionType(type_code));
        }
        debug!(
            "registering extension type {type_code} for {}",
            std::any::type_name::<T>()
        );
        self.insert(type_code, encode, decode);
        Ok(self)
    }

    fn insert<T, E, D>(&mut self, type_code: i8, encode: E, decode: D)
    where
        T: CustomValue,
        E: Fn(&T) -> Result<Vec<u8>, MsgPackError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<T, MsgPackError> + Send + Sync + 'static,
    {
        let encode: EncodeFn = Box::new(move |value: &Custom| match value.downcast_ref::<T>() {
            Some(typed) => encode(typed),
            None => Err(MsgPackError::Unsupported {
                kind: value.type_name().to_owned(),
            }),
        });
        let decode: DecodeFn = Box::new(move |data: &[u8]| decode(data).map(Value::custom));
        self.encoders
            .insert(TypeId::of::<T>(), Encoding { type_code, encode });
        self.decoders.insert(type_code, decode);
    }

    pub fn is_registered(&self, type_code: i8) -> bool {
        self.decoders.contains_key(&type_code)
    }
}

impl ExtensionRegistry for ExtensionCodec {
    fn try_encode(&self, value: &Custom) -> Result<Option<Extension>, MsgPackError> {
        let Some(entry) = self.encoders.get(&value.value_type_id()) else {
            return Ok(None);
        };
        let data = (entry.encode)(value)?;
        Ok(Some(Extension::new(entry.type_code, data)))
    }

    fn decode(&self, ext: Extension) -> Result<Value, MsgPackError> {
        match self.decoders.get(&ext.type_code) {
            Some(decode) => decode(&ext.data),
            None => {
                trace!("passing through unknown extension type {}", ext.type_code);
                Ok(Value::Ext(ext))
            }
        }
    }
}

impl fmt::Debug for ExtensionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<i8> = self.decoders.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("ExtensionCodec")
            .field("type_codes", &codes)
            .finish()
    }
}
