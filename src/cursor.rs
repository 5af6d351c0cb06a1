// Copyright (c) 2026 The ft-header Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sequential byte cursors carrying a running checksum, used by every codec
//! in this crate. A read cursor borrows a buffer of unknown-in-advance
//! length (the full slot); a write cursor owns a buffer pre-sized to the
//! final length the caller already computed.

use crate::checksum::RunningChecksum;
use crate::status::{CodecError, Status};

/// A sequential reader over a borrowed byte buffer.
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    checksum: RunningChecksum,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            checksum: RunningChecksum::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(Status::Truncated.into());
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads a host-order `u8`, folding it into the running checksum.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let slice = self.take(1)?;
        self.checksum.update(slice);
        Ok(slice[0])
    }

    /// Reads a host-order `u32`, folding it into the running checksum.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let slice = self.take(4)?;
        self.checksum.update(slice);
        Ok(u32::from_ne_bytes(slice.try_into().expect("4 bytes")))
    }

    /// Reads a host-order `u64`, folding it into the running checksum.
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let slice = self.take(8)?;
        self.checksum.update(slice);
        Ok(u64::from_ne_bytes(slice.try_into().expect("8 bytes")))
    }

    /// Reads a network-order (big-endian) `u32`, folding it into the running
    /// checksum. Used only for the header prefix (version, build id, size).
    pub fn read_u32_be(&mut self) -> Result<u32, CodecError> {
        let slice = self.take(4)?;
        self.checksum.update(slice);
        Ok(u32::from_be_bytes(slice.try_into().expect("4 bytes")))
    }

    /// Reads a 32-bit host-order-length-prefixed byte run, folding the
    /// length and payload into the running checksum.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32()? as usize;
        let slice = self.take(len)?;
        self.checksum.update(slice);
        Ok(slice.to_vec())
    }

    /// Reads a fixed-size run with no length prefix and **no checksum
    /// update** and **no byte-order translation** — used for the magic and
    /// the byte-order probe, both of which must compare literal on-disk
    /// bytes regardless of host endianness.
    ///
    /// The checksum is still folded in, matching the original's behavior of
    /// checksumming the probe's raw bytes while comparing it literally
    /// (see `spec.md` §8 property 4): the *checksum* sees the bytes, the
    /// *comparison* never reinterprets them.
    pub fn read_literal(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let slice = self.take(n)?;
        self.checksum.update(slice);
        Ok(slice)
    }

    /// Finalizes and returns the running checksum without consuming any
    /// further bytes. Does not check that the cursor is exhausted; callers
    /// that expect EOF should call `expect_exhausted` first.
    pub fn finish_checksum(&self) -> u32 {
        self.checksum.finish()
    }

    /// Fails with `Status::TrailingBytes` unless every byte has been
    /// consumed.
    pub fn expect_exhausted(&self) -> Result<(), CodecError> {
        if self.remaining() != 0 {
            Err(Status::TrailingBytes.into())
        } else {
            Ok(())
        }
    }
}

/// A sequential writer over an owned, exactly-sized byte buffer.
pub struct WriteCursor {
    buf: Vec<u8>,
    pos: usize,
    checksum: RunningChecksum,
}

impl WriteCursor {
    /// Allocates a cursor whose backing buffer is exactly `size` bytes.
    /// Writing past `size` is a programming error (the caller must have
    /// sized this correctly via `serialize_ft_min_size` or the descriptor
    /// size prediction) and panics rather than returning an error.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            buf: vec![0u8; size],
            pos: 0,
            checksum: RunningChecksum::new(),
        }
    }

    fn place(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        assert!(
            end <= self.buf.len(),
            "write cursor overrun: buffer is {} bytes, write ends at {}",
            self.buf.len(),
            end
        );
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.checksum.update(bytes);
        self.pos = end;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.place(&[v]);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.place(&v.to_ne_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.place(&v.to_ne_bytes());
    }

    pub fn write_u32_be(&mut self, v: u32) {
        self.place(&v.to_be_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.place(data);
    }

    /// Writes a fixed-size run verbatim, with no length prefix and no
    /// byte-order translation, but still folded into the checksum (mirrors
    /// `ReadCursor::read_literal`).
    pub fn write_literal(&mut self, data: &[u8]) {
        self.place(data);
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Finalizes the running checksum, appends it as the last 4 bytes, and
    /// returns the completed buffer. Panics if the cursor was not filled
    /// exactly to capacity minus 4 (the reserved checksum trailer) before
    /// calling this.
    pub fn finish(mut self) -> Vec<u8> {
        assert_eq!(
            self.pos + 4,
            self.buf.len(),
            "write cursor finished with {} bytes unwritten before the checksum trailer",
            self.buf.len() - self.pos - 4
        );
        let digest = self.checksum.finish();
        self.place(&digest.to_ne_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_field_kinds() {
        let mut w = WriteCursor::with_capacity(8 + 4 + 8 + 8 + 4);
        w.write_literal(b"tokudata");
        w.write_u32_be(20);
        w.write_u64(0x0102030405060708);
        w.write_bytes(b"desc");
        let buf = w.finish();

        let mut r = ReadCursor::new(&buf);
        assert_eq!(r.read_literal(8).unwrap(), b"tokudata");
        assert_eq!(r.read_u32_be().unwrap(), 20);
        assert_eq!(r.read_u64().unwrap(), 0x0102030405060708);
        assert_eq!(r.read_bytes().unwrap(), b"desc");
        let digest = r.finish_checksum();
        let stored = r.read_u32().unwrap();
        r.expect_exhausted().unwrap();
        assert_eq!(stored, digest);
    }

    #[test]
    fn truncated_read_fails() {
        let buf = [0u8; 3];
        let mut r = ReadCursor::new(&buf);
        assert_eq!(r.read_u32().unwrap_err().status(), Status::Truncated);
    }

    #[test]
    #[should_panic(expected = "write cursor overrun")]
    fn overrun_write_panics() {
        let mut w = WriteCursor::with_capacity(2);
        w.write_u32(1);
    }

    #[test]
    fn literal_is_not_endian_translated() {
        let mut w = WriteCursor::with_capacity(8 + 4);
        let host_probe: u64 = 0x0102030405060708;
        w.write_literal(&host_probe.to_ne_bytes());
        let buf = w.finish();
        let mut r = ReadCursor::new(&buf);
        let bytes = r.read_literal(8).unwrap();
        assert_eq!(bytes, &host_probe.to_ne_bytes()[..]);
    }
}
