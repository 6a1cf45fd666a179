//! Built-in timestamp extension (type code -1).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use msgpack_lite_buffers::{Reader, Writer};

use crate::constants::TIMESTAMP_EXT_TYPE;
use crate::MsgPackError;

const NANOS_PER_SEC: u32 = 1_000_000_000;
const TIMESTAMP32_MAX_SEC: i64 = 0xffff_ffff;
const TIMESTAMP64_MAX_SEC: i64 = 0x3_ffff_ffff;

/// Point in time relative to the Unix epoch.
///
/// `nanoseconds` is always below one second; negative instants carry a
/// negative `seconds` and a forward `nanoseconds` offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: u32) -> Result<Self, MsgPackError> {
        if nanoseconds >= NANOS_PER_SEC {
            return Err(MsgPackError::invalid_extension(
                TIMESTAMP_EXT_TYPE,
                format!("nanoseconds out of range: {nanoseconds}"),
            ));
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    /// Encodes into the shortest of timestamp 32, 64 or 96.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::with_capacity(12);
        if (0..=TIMESTAMP64_MAX_SEC).contains(&self.seconds) {
            if self.nanoseconds == 0 && self.seconds <= TIMESTAMP32_MAX_SEC {
                writer.u32(self.seconds as u32);
            } else {
                writer.u64(((self.nanoseconds as u64) << 34) | self.seconds as u64);
            }
        } else {
            writer.u32(self.nanoseconds);
            writer.i64(self.seconds);
        }
        writer.flush()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, MsgPackError> {
        let mut reader = Reader::new(data);
        let truncated = |_| MsgPackError::invalid_extension(TIMESTAMP_EXT_TYPE, "truncated");
        match data.len() {
            4 => Ok(Self {
                seconds: reader.try_u32().map_err(truncated)? as i64,
                nanoseconds: 0,
            }),
            8 => {
                let packed = reader.try_u64().map_err(truncated)?;
                Self::new((packed & TIMESTAMP64_MAX_SEC as u64) as i64, (packed >> 34) as u32)
            }
            12 => {
                let nanoseconds = reader.try_u32().map_err(truncated)?;
                let seconds = reader.try_i64().map_err(truncated)?;
                Self::new(seconds, nanoseconds)
            }
            n => Err(MsgPackError::invalid_extension(
                TIMESTAMP_EXT_TYPE,
                format!("unexpected payload length {n}"),
            )),
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self {
                seconds: d.as_secs() as i64,
                nanoseconds: d.subsec_nanos(),
            },
            Err(e) => {
                let d = e.duration();
                let mut seconds = -(d.as_secs() as i64);
                let mut nanoseconds = d.subsec_nanos();
                if nanoseconds > 0 {
                    seconds -= 1;
                    nanoseconds = NANOS_PER_SEC - nanoseconds;
                }
                Self {
                    seconds,
                    nanoseconds,
                }
            }
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        let nanos = Duration::from_nanos(ts.nanoseconds as u64);
        if ts.seconds >= 0 {
            UNIX_EPOCH + Duration::from_secs(ts.seconds as u64) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(ts.seconds.unsigned_abs()) + nanos
        }
    }
}
