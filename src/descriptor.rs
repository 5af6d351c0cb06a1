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

//! Codec for the variable-length user descriptor blob, stored apart from
//! the header at the offset/size the block-translation table records.
//!
//! On-disk form: a vestigial 4-byte version prefix for layout version ≤ 13
//! only, then a 32-bit length, the payload, and a 32-bit trailing checksum.
//! Grounded on `deserialize_descriptor_from`/
//! `toku_serialize_descriptor_contents_to_wbuf` in
//! `examples/original_source/ft/ft-serialize.c`.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::storage::{pread_exact, FileOps};
use crate::status::{CodecError, Status};

const FT_LAYOUT_VERSION_13: u32 = 13;

/// Reads `size` bytes at `offset`, validates the trailing checksum, and
/// returns the owned payload (skipping the vestigial version prefix for
/// version ≤ 13 descriptors).
///
/// A `size` of zero means "no descriptor" and returns an empty buffer
/// without touching the file.
pub fn load_descriptor(
    file: &dyn FileOps,
    offset: u64,
    size: u32,
    version: u32,
) -> Result<Vec<u8>, CodecError> {
    if size == 0 {
        return Ok(Vec::new());
    }
    if size < 4 {
        return Err(Status::Truncated.into());
    }
    let mut buf = vec![0u8; size as usize];
    pread_exact(file, &mut buf, offset)?;

    if !crate::checksum::verify_trailing(&buf) {
        return Err(Status::XsumFail.into());
    }
    let body = &buf[..buf.len() - 4];

    let mut cursor = ReadCursor::new(body);
    if version <= FT_LAYOUT_VERSION_13 {
        // Vestigial 4-byte version field, present only in this era, read
        // and discarded.
        let _legacy_version = cursor.read_u32()?;
    }
    let payload = cursor.read_bytes()?;
    cursor.expect_exhausted()?;
    Ok(payload)
}

/// Exact byte count `encode_descriptor` will produce for `payload`, always
/// in the current (post-version-13) format: 4-byte length + payload + 4-byte
/// checksum.
pub fn serialize_descriptor_size(payload: &[u8]) -> u32 {
    4 + payload.len() as u32 + 4
}

/// Encodes `payload` in the current format (no vestigial version prefix —
/// that only ever appears on disk for version ≤ 13, and this codec never
/// writes anything but the current format).
pub fn encode_descriptor(payload: &[u8]) -> Vec<u8> {
    let mut w = WriteCursor::with_capacity(serialize_descriptor_size(payload) as usize);
    w.write_bytes(payload);
    w.finish()
}

/// The post-open upgrade step resolving decode step 17's deferred rewrite
/// (see the Open Question decision in `DESIGN.md`): if `header` was loaded
/// from a version ≤ 13 slot, re-encodes its descriptor in the current
/// format and clears the migration flag, returning the bytes the caller
/// must persist through the block-translation table at the next
/// checkpoint. Returns `None` if no migration is pending.
pub fn migrate_descriptor_if_needed(header: &mut crate::header::Header) -> Option<Vec<u8>> {
    if !header.needs_descriptor_migration {
        return None;
    }
    let encoded = encode_descriptor(&header.descriptor);
    header.needs_descriptor_migration = false;
    Some(encoded)
}
