//! Binary buffer writer with geometrically growing capacity.

/// Default initial capacity, matching the encoder's default.
const DEFAULT_CAPACITY: usize = 2048;

/// A binary buffer writer that grows automatically as needed.
///
/// The written region is `uint8[x0..x]`. Growing the buffer compacts that
/// region to the front of a new allocation at least twice the old size.
///
/// # Example
///
/// ```
/// use msgpack_lite_buffers::Writer;
///
/// let mut writer = Writer::with_capacity(2);
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// assert_eq!(writer.flush(), [0x01, 0x02, 0x03]);
/// ```
#[derive(Debug, Clone)]
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Position where the last flush happened.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a writer with an initial region of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            uint8: vec![0u8; capacity.max(1)],
            x0: 0,
            x: 0,
        }
    }

    /// Total size of the current region.
    pub fn capacity(&self) -> usize {
        self.uint8.len()
    }

    /// Ensures at least `capacity` more bytes can be written at the cursor.
    #[inline]
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let remaining = self.uint8.len() - self.x;
        if remaining < capacity {
            let used = self.x - self.x0;
            let required = used + capacity;
            self.grow((self.uint8.len() * 2).max(required));
        }
    }

    fn grow(&mut self, new_size: usize) {
        let used = self.x - self.x0;
        let mut new_buf = vec![0u8; new_size];
        new_buf[..used].copy_from_slice(&self.uint8[self.x0..self.x]);
        self.uint8 = new_buf;
        self.x = used;
        self.x0 = 0;
    }

    /// Discards any unflushed bytes and rewinds to the start of the region.
    pub fn reset(&mut self) {
        self.x0 = 0;
        self.x = 0;
    }

    /// Returns the bytes written since the last flush and marks them consumed.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.uint8[self.x0..self.x].to_vec();
        self.x0 = self.x;
        result
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.x - self.x0
    }

    pub fn is_empty(&self) -> bool {
        self.x == self.x0
    }

    #[inline]
    fn put<const N: usize>(&mut self, bytes: [u8; N]) {
        self.ensure_capacity(N);
        self.uint8[self.x..self.x + N].copy_from_slice(&bytes);
        self.x += N;
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.put([val]);
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn i16(&mut self, val: i16) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.put(val.to_be_bytes());
    }

    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.put(val.to_be_bytes());
    }

    /// Writes a format byte followed by a big-endian u16.
    pub fn u8u16(&mut self, marker: u8, val: u16) {
        self.ensure_capacity(3);
        self.u8(marker);
        self.u16(val);
    }

    /// Writes a format byte followed by a big-endian u32.
    pub fn u8u32(&mut self, marker: u8, val: u32) {
        self.ensure_capacity(5);
        self.u8(marker);
        self.u32(val);
    }

    /// Writes a format byte followed by a big-endian u64.
    pub fn u8u64(&mut self, marker: u8, val: u64) {
        self.ensure_capacity(9);
        self.u8(marker);
        self.u64(val);
    }

    /// Writes a format byte followed by a big-endian f64.
    pub fn u8f64(&mut self, marker: u8, val: f64) {
        self.ensure_capacity(9);
        self.u8(marker);
        self.f64(val);
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.buf(s.as_bytes());
        s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_primitives() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        writer.u16(0x0203);
        writer.u32(0x04050607);
        assert_eq!(writer.flush(), [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
    }

    #[test]
    fn test_signed() {
        let mut writer = Writer::new();
        writer.i8(-1);
        writer.i8(-2);
        writer.i16(-1000);
        assert_eq!(writer.flush(), [0xff, 0xfe, 0xfc, 0x18]);
    }

    #[test]
    fn test_marker_composites() {
        let mut writer = Writer::new();
        writer.u8u16(0xcd, 0x0100);
        writer.u8u32(0xce, 0x0001_0000);
        assert_eq!(
            writer.flush(),
            [0xcd, 0x01, 0x00, 0xce, 0x00, 0x01, 0x00, 0x00]
        );
        writer.u8f64(0xcb, 1.0);
        assert_eq!(writer.flush(), [0xcb, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_flush_multiple() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x02]);
    }

    #[test]
    fn test_growth_doubles_and_keeps_bytes() {
        let mut writer = Writer::with_capacity(4);
        writer.u32(0xdeadbeef);
        assert_eq!(writer.capacity(), 4);
        writer.u8(0x01);
        assert_eq!(writer.capacity(), 8);
        assert_eq!(writer.len(), 5);
        writer.buf(&[0xaa; 20]);
        assert_eq!(writer.capacity(), 25);
        let data = writer.flush();
        assert_eq!(&data[..5], &[0xde, 0xad, 0xbe, 0xef, 0x01]);
        assert_eq!(data.len(), 25);
    }

    #[test]
    fn test_growth_compacts_flushed_prefix() {
        let mut writer = Writer::with_capacity(4);
        writer.u16(0x0102);
        assert_eq!(writer.flush(), [0x01, 0x02]);
        writer.u16(0x0304);
        writer.u8(0x05);
        assert_eq!(writer.x0, 0);
        assert_eq!(writer.flush(), [0x03, 0x04, 0x05]);
    }

    #[test]
    fn test_reset_reuses_region() {
        let mut writer = Writer::with_capacity(8);
        writer.u32(1);
        writer.reset();
        assert!(writer.is_empty());
        writer.u8(0x07);
        assert_eq!(writer.flush(), [0x07]);
        assert_eq!(writer.capacity(), 8);
    }

    #[test]
    fn test_utf8() {
        let mut writer = Writer::new();
        let n = writer.utf8("café");
        let data = writer.flush();
        assert_eq!(n, data.len());
        assert_eq!(std::str::from_utf8(&data).unwrap(), "café");
    }
}
