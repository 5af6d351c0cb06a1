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

//! On-disk format constants. These are not runtime-tunable (they are part
//! of the byte layout itself), so they are plain constants rather than a
//! config struct threaded through call sites — see the Open Question
//! decision in `DESIGN.md`.

pub use crate::header::version::{FT_LAYOUT_MIN_SUPPORTED_VERSION, FT_LAYOUT_VERSION};

/// Fixed reservation for a single header slot, and the disk offset of slot 1.
/// Must be a power of two large enough to hold `serialize_ft_min_size(FT_LAYOUT_VERSION)`.
pub const HEADER_RESERVE: u64 = 4096;

/// Default basement node size for headers read from a version that predates
/// the field (< 15).
pub const FT_DEFAULT_BASEMENT_NODE_SIZE: u32 = 128 * 1024;

/// `MIN_MSN.msn - 1`, the default `highest_unused_msn_for_upgrade` for
/// headers read from a version that predates the field (< 19).
pub const MIN_MSN: u64 = 1;

/// Opaque provenance tag stamped on every encode.
pub const BUILD_ID: u32 = 1;
