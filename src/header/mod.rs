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

//! The root metadata record, normalized to the current on-disk layout once
//! loaded, and its version-dispatched codec.

pub mod codec;
pub mod version;

use crate::status::Status;

/// B-tree-on-disk statistics pair, matching the original's `STAT64INFO_S`
/// (introduced at layout version 17).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat64Info {
    pub numrows: u64,
    pub numbytes: u64,
}

impl Stat64Info {
    pub const ZERO: Stat64Info = Stat64Info { numrows: 0, numbytes: 0 };
}

/// Which block compressor a tree uses. The header only records this tag;
/// performing compression is out of scope (external collaborator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Zlib = 1,
    Quicklz = 2,
    Lzma = 3,
}

impl CompressionMethod {
    pub fn to_tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> crate::status::Result<Self> {
        match tag {
            1 => Ok(CompressionMethod::Zlib),
            2 => Ok(CompressionMethod::Quicklz),
            3 => Ok(CompressionMethod::Lzma),
            _ => Err(Status::Io(format!("unknown compression method tag {}", tag)).into()),
        }
    }
}

/// The transient `type` field, modeled as a tagged state rather than a bare
/// enum plus a separate `panic` bool, per Design Note 3: every entry point
/// matches this first and short-circuits on `Poisoned`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderVariant {
    Current,
    CheckpointInProgress,
    /// A prior serialize failed; every subsequent checkpoint attempt on this
    /// header must short-circuit returning the saved status.
    Poisoned(Status),
}

/// The root metadata block, normalized to the current layout after a
/// successful load. Field order mirrors `spec.md` §3's data model table.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub layout_version_read_from_disk: u32,
    pub layout_version: u32,
    pub layout_version_original: u32,
    pub build_id: u32,
    pub build_id_original: u32,
    pub checkpoint_count: u64,
    pub checkpoint_lsn: u64,
    pub nodesize: u32,
    pub basementnodesize: u32,
    pub translation_address: u64,
    pub translation_size: u64,
    pub root_blocknum: u64,
    pub flags: u32,
    pub time_of_creation: u64,
    pub time_of_last_modification: u64,
    pub time_of_last_verification: u64,
    pub root_xid_that_created: u64,
    pub on_disk_stats: Stat64Info,
    pub time_of_last_optimize_begin: u64,
    pub time_of_last_optimize_end: u64,
    pub count_of_optimize_in_progress: u32,
    pub msn_at_start_of_last_completed_optimize: u64,
    pub compression_method: CompressionMethod,
    pub highest_unused_msn_for_upgrade: u64,
    pub descriptor: Vec<u8>,
    pub cmp_descriptor: Vec<u8>,
    pub dirty: bool,
    pub variant: HeaderVariant,
    /// Set when this header was decoded from a version ≤ 13 slot, whose
    /// descriptor is stored in the vestigial pre-version-14 format and needs
    /// rewriting in the current format before the next checkpoint. See the
    /// Open Question decision in `DESIGN.md`: the rewrite itself is a
    /// separate post-open step, not performed during decode.
    pub needs_descriptor_migration: bool,
}

impl Header {
    /// Deprecated `TOKU_DB_VALCMP_BUILTIN` flag bit, masked off for headers
    /// read from layout version ≤ 13.
    pub const VALCMP_BUILTIN_13: u32 = 1 << 0;

    /// Clones this header into a `CheckpointInProgress` snapshot, the first
    /// step the checkpoint machinery performs before mutating anything
    /// (spec §3 lifecycle: "mutated only through the checkpoint machinery,
    /// which first clones it into a CHECKPOINT_INPROGRESS instance").
    pub fn snapshot_for_checkpoint(&self) -> Header {
        let mut clone = self.clone();
        clone.variant = HeaderVariant::CheckpointInProgress;
        clone
    }

    /// True if this header is sealed by a prior serialization failure.
    pub fn is_poisoned(&self) -> bool {
        matches!(self.variant, HeaderVariant::Poisoned(_))
    }
}
