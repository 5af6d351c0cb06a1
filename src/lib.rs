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

#![allow(clippy::unreadable_literal)]

//! Persistent header codec for a write-optimized, B-tree-like storage
//! engine: reading and writing the root metadata block, forward/backward
//! version migration, checksum validation, and redundant double-header
//! crash safety.
//!
//! The five components, leaves first: [`cursor`] (sequential byte readers
//! and writers carrying a running checksum), [`header::codec`]
//! (version-dispatched decode/encode of the root metadata record),
//! [`descriptor`] (the variable-length user descriptor blob), [`arbiter`]
//! (selecting the authoritative one of the two on-disk header slots), and
//! [`checkpoint`] (ordering the translation-table write, the fsync barrier,
//! and the header write).
//!
//! [`storage::FileOps`] is the seam every component above reads and writes
//! through, so all of them run equally against a real file or a fake one in
//! tests.

mod arbiter;
mod checksum;
mod checkpoint;
pub mod collab;
pub mod config;
mod cursor;
pub mod descriptor;
pub mod header;
pub mod status;
pub mod storage;

pub use arbiter::{select_header, ArbiterError, SelectedSlot};
pub use checkpoint::{checkpoint, checkpoint_async, CheckpointHandle, HeaderLock};
pub use collab::{BlockTranslation, NoStatsUpgrade, StatsUpgrade};
pub use descriptor::migrate_descriptor_if_needed;
pub use header::codec::{decode_header, encode_header};
pub use header::version::{serialize_ft_min_size, FT_LAYOUT_MIN_SUPPORTED_VERSION, FT_LAYOUT_VERSION};
pub use header::{CompressionMethod, Header, HeaderVariant, Stat64Info};
pub use status::{CodecError, Result, Status};
pub use storage::FileOps;
