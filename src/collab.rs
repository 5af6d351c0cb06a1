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

//! Seams for the two external collaborators `spec.md` §1 explicitly places
//! out of scope: the block-translation table builder and the tree-walk that
//! upgrades pre-version-18 headers' on-disk stats. The header codec only
//! forwards offsets to these; it never builds or walks anything itself.

use crate::header::Stat64Info;
use crate::status::CodecError;

/// The block-translation table: an external structure mapping logical block
/// numbers to `(offset, size)` pairs, and recording where the descriptor
/// blob lives. The header codec treats it as an opaque byte run at a disk
/// offset/size it persists but never interprets beyond that.
pub trait BlockTranslation {
    /// Loads (or validates) the table found at `(address, size)` and
    /// returns the descriptor's own `(offset, size)` as recorded within it.
    fn load(&self, address: u64, size: u64) -> Result<(u64, u32), CodecError>;

    /// Serializes the table to an owned buffer, returning the `(address,
    /// size)` the checkpoint writer should record in the header it is about
    /// to encode.
    fn serialize(&self) -> Result<(Vec<u8>, u64, u64), CodecError>;
}

/// The tree-walk that synthesizes `on_disk_stats` for headers decoded from a
/// layout version that predates version 18 (`upgrade_subtree_estimates_to_stat64info`
/// in the original). Out of scope because it requires the B-tree node
/// format; the default test implementation just returns zeroed stats.
pub trait StatsUpgrade {
    fn upgrade(&self, old_version: u32) -> Stat64Info;
}

/// A `StatsUpgrade` that always reports zeroed stats, standing in wherever a
/// caller has no real tree to walk (tests, and any context that doesn't
/// have the node format wired up yet).
pub struct NoStatsUpgrade;

impl StatsUpgrade for NoStatsUpgrade {
    fn upgrade(&self, _old_version: u32) -> Stat64Info {
        Stat64Info::ZERO
    }
}
