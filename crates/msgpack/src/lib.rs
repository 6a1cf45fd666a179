//! MessagePack encoder and decoder.
//!
//! Values are modelled by [`Value`]. [`encode`] and [`decode`] cover the
//! common case; [`Encoder`] and [`Decoder`] can be held on to when the same
//! options serve many calls.
//!
//! ```
//! use msgpack_lite::{decode, encode, DecodeOptions, EncodeOptions, Value};
//!
//! let value: Value = [("id", Value::from(7)), ("name", Value::from("ann"))]
//!     .into_iter()
//!     .collect();
//! let bytes = encode(&value, &EncodeOptions::default()).unwrap();
//! assert_eq!(decode(&bytes, &DecodeOptions::default()).unwrap(), value);
//! ```

pub mod constants;
mod decoder;
mod encoder;
mod error;
mod extension;
mod options;
mod timestamp;
mod value;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{ErrorCategory, LengthKind, MsgPackError};
pub use extension::{ExtensionCodec, ExtensionRegistry};
pub use options::{DecodeLimits, DecodeOptions, EncodeOptions};
pub use timestamp::Timestamp;
pub use value::{Custom, CustomValue, Extension, Map, Value};

/// Encodes `value` into a new byte vector.
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<Vec<u8>, MsgPackError> {
    Encoder::new(options).encode(value)
}

/// Decodes the first value in `bytes`. Trailing bytes are not read.
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<Value, MsgPackError> {
    Decoder::new(bytes, options).decode_one()
}

/// Decodes every value in `bytes`, in order.
pub fn decode_multi<'a>(bytes: &'a [u8], options: &DecodeOptions) -> Decoder<'a> {
    Decoder::new(bytes, options)
}
