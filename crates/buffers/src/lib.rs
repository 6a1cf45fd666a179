//! msgpack-lite-buffers - byte cursors for the MessagePack codec.
//!
//! [`Writer`] appends big-endian primitives into a growable region and
//! [`Reader`] walks a borrowed slice with bounds-checked reads.

mod error;
mod reader;
mod writer;

pub use error::BufferError;
pub use reader::Reader;
pub use writer::Writer;
