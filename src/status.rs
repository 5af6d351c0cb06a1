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

use std::fmt;

/// Closed taxonomy of everything that can go wrong while reading or writing
/// a header, descriptor, or header slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// An OS read/write/fsync call failed. Carries the OS-provided message.
    Io(String),
    /// A read cursor would have advanced past the end of its buffer.
    Truncated,
    /// The 8-byte magic was missing or did not read `"tokudata"`.
    BadMagic,
    /// The prefix was all-zero bytes: a recoverable "empty slot".
    NoHeader,
    /// `layout_version_read_from_disk` is below `FT_LAYOUT_MIN_SUPPORTED_VERSION`.
    TooOld { found: u32, min_supported: u32 },
    /// `layout_version_read_from_disk` is above `FT_LAYOUT_VERSION`.
    TooNew { found: u32, max_supported: u32 },
    /// The declared `size` field fell outside `[min_size(version), HEADER_RESERVE]`.
    BadSize { declared: u32, min: u32, max: u64 },
    /// The trailing checksum did not match the computed one.
    XsumFail,
    /// The byte-order probe did not match the host's expected constant.
    ByteOrderMismatch,
    /// The cursor was not exhausted after a decode completed.
    TrailingBytes,
    /// A prior serialization failure sealed the header; this wraps the
    /// status that caused the seal.
    Panic(Box<Status>),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Io(msg) => write!(f, "I/O error: {}", msg),
            Status::Truncated => write!(f, "truncated read"),
            Status::BadMagic => write!(f, "bad magic number"),
            Status::NoHeader => write!(f, "no header present"),
            Status::TooOld { found, min_supported } => write!(
                f,
                "layout version {} is older than the minimum supported version {}",
                found, min_supported
            ),
            Status::TooNew { found, max_supported } => write!(
                f,
                "layout version {} is newer than the maximum supported version {}",
                found, max_supported
            ),
            Status::BadSize { declared, min, max } => write!(
                f,
                "declared header size {} is outside the valid range [{}, {}]",
                declared, min, max
            ),
            Status::XsumFail => write!(f, "checksum mismatch"),
            Status::ByteOrderMismatch => write!(f, "byte-order probe mismatch"),
            Status::TrailingBytes => write!(f, "trailing bytes after decode"),
            Status::Panic(inner) => write!(f, "header is poisoned: {}", inner),
        }
    }
}

impl std::error::Error for Status {}

/// A `Status` plus an optional human-readable description of where it
/// happened, mirroring how the teacher's `WickErr` pairs a `Status` with a
/// free-form description (`WickErr::new(Status::Corruption, Some("..."))`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    status: Status,
    description: Option<String>,
}

impl CodecError {
    pub fn new(status: Status, description: Option<&str>) -> Self {
        Self {
            status,
            description: description.map(str::to_owned),
        }
    }

    pub fn status(&self) -> Status {
        self.status.clone()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{}: {}", self.status, desc),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.status)
    }
}

impl From<Status> for CodecError {
    fn from(status: Status) -> Self {
        CodecError::new(status, None)
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
