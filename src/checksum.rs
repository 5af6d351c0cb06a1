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

//! The "X" checksum referenced throughout the header codec: a running
//! 64-to-32-bit reduction that every cursor field operation folds its bytes
//! into, except explicit literal operations (the byte-order probe).
//!
//! The spec leaves the exact reduction unspecified beyond its width; we use
//! CRC-32 via the `crc` crate, the same checksum family the block trailers
//! in an sstable-style table use.

use crc::{crc32, Hasher32};

/// A running checksum, updated incrementally as a cursor consumes or
/// produces bytes.
pub struct RunningChecksum {
    digest: crc32::Digest,
}

impl RunningChecksum {
    pub fn new() -> Self {
        Self {
            digest: crc32::Digest::new(crc32::IEEE),
        }
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.write(bytes);
    }

    pub fn finish(&self) -> u32 {
        self.digest.sum32()
    }
}

impl Default for RunningChecksum {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot helper for verifying a buffer whose last 4 bytes are a
/// host-order-encoded checksum of everything preceding them.
pub fn verify_trailing(buf: &[u8]) -> bool {
    if buf.len() < 4 {
        return false;
    }
    let (body, tail) = buf.split_at(buf.len() - 4);
    let stored = u32::from_ne_bytes(tail.try_into().expect("4-byte slice"));
    let mut cksum = RunningChecksum::new();
    cksum.update(body);
    cksum.finish() == stored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_stable_digest() {
        let cksum = RunningChecksum::new();
        assert_eq!(cksum.finish(), crc32::checksum_ieee(b""));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut cksum = RunningChecksum::new();
        cksum.update(b"hello, ");
        cksum.update(b"world");
        assert_eq!(cksum.finish(), crc32::checksum_ieee(b"hello, world"));
    }

    #[test]
    fn verify_trailing_detects_tamper() {
        let mut buf = b"tokudata-body".to_vec();
        let mut cksum = RunningChecksum::new();
        cksum.update(&buf);
        buf.extend_from_slice(&cksum.finish().to_ne_bytes());
        assert!(verify_trailing(&buf));
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        assert!(!verify_trailing(&buf));
    }
}
