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

//! Orders the durable writes that make a checkpoint crash-safe: translation
//! table, then an fsync barrier, then the header itself, alternating which
//! of the two slots receives the write. Grounded on the ordered pwrite/fsync
//! sequence in `toku_serialize_ft_to` (`examples/original_source/ft/ft-serialize.c`)
//! and, for the background-thread convenience wrapper, on
//! `Checkpointer`/`CheckpointHandle` in
//! `examples/other_examples/667e51e0_groblegark-oddjobs__crates-storage-src-checkpoint.rs.rs`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::collab::BlockTranslation;
use crate::config::HEADER_RESERVE;
use crate::header::codec::encode_header;
use crate::header::{Header, HeaderVariant};
use crate::status::Status;
use crate::storage::{self, FileOps};

/// Per-header mutual exclusion, guarding mutation of the in-memory header
/// and the snapshot taken at the start of a checkpoint (spec.md §5).
pub struct HeaderLock(Mutex<Header>);

impl HeaderLock {
    pub fn new(header: Header) -> Self {
        Self(Mutex::new(header))
    }

    pub fn lock(&self) -> MutexGuard<'_, Header> {
        self.0.lock().unwrap()
    }

    /// Seals the header: every subsequent checkpoint attempt short-circuits
    /// returning `status` without touching the file again.
    fn poison(&self, status: Status) {
        let mut guard = self.lock();
        log::error!("header checkpoint failed, poisoning: {}", status);
        guard.variant = HeaderVariant::Poisoned(status);
    }

    /// Clones the header into a `CheckpointInProgress` snapshot and marks
    /// the live header as such, all under one critical section. Returns the
    /// saved status immediately if the header was already poisoned by a
    /// prior failed checkpoint.
    fn snapshot_and_mark_in_progress(&self) -> Result<Header, Status> {
        let mut guard = self.lock();
        if let HeaderVariant::Poisoned(status) = &guard.variant {
            return Err(status.clone());
        }
        let snapshot = guard.snapshot_for_checkpoint();
        guard.variant = HeaderVariant::CheckpointInProgress;
        Ok(snapshot)
    }

    /// Installs `committed` as the new live header, marked `Current`.
    fn commit(&self, mut committed: Header) {
        committed.variant = HeaderVariant::Current;
        committed.dirty = false;
        *self.lock() = committed;
    }
}

/// Which disk offset receives the next header write: even `checkpoint_count`
/// goes to slot 0, odd goes to slot 1, so the previous good header always
/// survives a crash mid-write (spec.md §4.5 step 6).
fn slot_offset_for(checkpoint_count: u64) -> u64 {
    if checkpoint_count & 1 == 0 {
        0
    } else {
        HEADER_RESERVE
    }
}

/// Runs one checkpoint to completion: snapshot, encode, pwrite translation,
/// fsync, pwrite header. Blocks the calling thread for its duration; see
/// `checkpoint_async` for a background-thread wrapper.
pub fn checkpoint(lock: &HeaderLock, file: &dyn FileOps, translation: &dyn BlockTranslation) -> Result<(), Status> {
    let mut snapshot = match lock.snapshot_and_mark_in_progress() {
        Ok(snapshot) => snapshot,
        Err(status) => return Err(status),
    };

    let result = (|| -> Result<(), Status> {
        let (translation_bytes, translation_address, translation_size) =
            translation.serialize().map_err(|e| e.status())?;
        snapshot.translation_address = translation_address;
        snapshot.translation_size = translation_size;

        let encoded_header = encode_header(&snapshot, translation_address, translation_size);

        let _pwrite_guard = storage::PWRITE_LOCK.lock().unwrap();
        storage::pwrite_all(file, &translation_bytes, translation_address).map_err(|e| e.status())?;
        file.sync_all().map_err(|e| Status::Io(e.to_string()))?;
        let slot_offset = slot_offset_for(snapshot.checkpoint_count);
        storage::pwrite_all(file, &encoded_header, slot_offset).map_err(|e| e.status())?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            lock.commit(snapshot);
            Ok(())
        }
        Err(status) => {
            lock.poison(status.clone());
            Err(status)
        }
    }
}

/// A background checkpoint in flight. `wait()` must be called before the
/// caller does anything that depends on this checkpoint's durability (e.g.
/// acknowledging a transaction commit), matching the contract the teacher's
/// `CheckpointHandle` documents.
pub struct CheckpointHandle {
    receiver: crossbeam_channel::Receiver<Result<(), Status>>,
    #[allow(dead_code)]
    handle: thread::JoinHandle<()>,
}

impl CheckpointHandle {
    pub fn wait(self) -> Result<(), Status> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(Status::Io("checkpoint thread panicked".to_string())))
    }

    pub fn try_wait(&self) -> Option<Result<(), Status>> {
        self.receiver.try_recv().ok()
    }
}

/// Spawns `checkpoint` onto a background thread and returns immediately.
pub fn checkpoint_async(
    lock: Arc<HeaderLock>,
    file: Arc<dyn FileOps>,
    translation: Box<dyn BlockTranslation + Send>,
) -> CheckpointHandle {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let handle = thread::spawn(move || {
        let result = checkpoint(&lock, file.as_ref(), translation.as_ref());
        let _ = tx.send(result);
    });
    CheckpointHandle { receiver: rx, handle }
}
