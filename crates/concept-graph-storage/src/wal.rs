//! Append-only write-ahead log.
//!
//! Every accepted mutation is framed and appended here before it touches the
//! in-memory graph. Reconciliation folds the log into the compacted file and
//! truncates it.
//!
//! # Frame Layout
//!
//! | Size | Field |
//! |------|-------|
//! | 4 | payload length (u32 LE) |
//! | 8 | xxh64 of payload (u64 LE) |
//! | n | bincode-encoded [`WalEntry`] |
//!
//! A torn or checksum-failing frame ends replay. Everything before it is
//! applied and the file is cut back to the last good frame so later appends
//! stay reachable.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use concept_graph_core::types::{AssociationType, ConceptId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use xxhash_rust::xxh64::xxh64;

use crate::error::{StorageError, StorageResult};
use crate::serialization::SerializationError;

/// Length + checksum prefix of every frame.
pub const FRAME_HEADER_LEN: usize = 12;

const CHECKSUM_SEED: u64 = 0;

/// A logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalOp {
    LearnConcept {
        content: String,
        embedding: Option<Vec<f32>>,
        strength: f32,
        confidence: f32,
        created_millis: i64,
    },
    LearnAssociation {
        source_id: ConceptId,
        target_id: ConceptId,
        assoc_type: AssociationType,
        confidence: f32,
    },
}

/// A logged mutation with its position in the global write order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub sequence: u64,
    pub op: WalOp,
}

/// Encode one entry as a complete frame.
pub fn encode_frame(entry: &WalEntry) -> Result<Vec<u8>, SerializationError> {
    let payload =
        bincode::serialize(entry).map_err(|e| SerializationError::SerializeFailed(e.to_string()))?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&xxh64(&payload, CHECKSUM_SEED).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Result of scanning log bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct WalReplay {
    /// Entries of every intact frame, in file order.
    pub entries: Vec<WalEntry>,
    /// Byte length of the intact prefix.
    pub valid_len: u64,
    /// Why scanning stopped early, if it did.
    pub torn_tail: Option<SerializationError>,
}

/// Decode frames until the input ends or a frame is torn or corrupt.
pub fn decode_frames(bytes: &[u8]) -> WalReplay {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    let torn_tail = loop {
        let rest = &bytes[pos..];
        if rest.is_empty() {
            break None;
        }
        if rest.len() < FRAME_HEADER_LEN {
            break Some(SerializationError::Truncated {
                section: "log frame header",
                needed: FRAME_HEADER_LEN,
                available: rest.len(),
            });
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let mut checksum = [0u8; 8];
        checksum.copy_from_slice(&rest[4..12]);
        let expected = u64::from_le_bytes(checksum);

        let body = &rest[FRAME_HEADER_LEN..];
        if body.len() < len {
            break Some(SerializationError::Truncated {
                section: "log frame payload",
                needed: len,
                available: body.len(),
            });
        }
        let payload = &body[..len];
        let actual = xxh64(payload, CHECKSUM_SEED);
        if actual != expected {
            break Some(SerializationError::ChecksumMismatch { expected, actual });
        }
        match bincode::deserialize::<WalEntry>(payload) {
            Ok(entry) => entries.push(entry),
            Err(e) => break Some(SerializationError::DeserializeFailed(e.to_string())),
        }
        pos += FRAME_HEADER_LEN + len;
    };

    WalReplay {
        entries,
        valid_len: pos as u64,
        torn_tail,
    }
}

/// File-backed write-ahead log.
pub struct WriteAheadLog {
    path: PathBuf,
    file: File,
    len: u64,
    entry_count: usize,
    sync_every_write: bool,
    unsynced: usize,
}

impl WriteAheadLog {
    /// Open (or create) the log and return the entries it already holds.
    ///
    /// A torn tail is logged, cut off, and not returned.
    pub fn open(
        path: impl AsRef<Path>,
        sync_every_write: bool,
    ) -> StorageResult<(Self, Vec<WalEntry>)> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(format!("opening {}", path.display()), e))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| StorageError::io(format!("reading {}", path.display()), e))?;

        let replay = decode_frames(&bytes);
        if let Some(reason) = &replay.torn_tail {
            warn!(
                path = %path.display(),
                kept_entries = replay.entries.len(),
                discarded_bytes = bytes.len() as u64 - replay.valid_len,
                %reason,
                "Write-ahead log has a torn tail; discarding it"
            );
            file.set_len(replay.valid_len)
                .map_err(|e| StorageError::io("cutting torn write-ahead log tail", e))?;
            file.sync_all()
                .map_err(|e| StorageError::io("syncing write-ahead log", e))?;
        }
        debug!(
            path = %path.display(),
            entries = replay.entries.len(),
            "Opened write-ahead log"
        );

        let wal = Self {
            path,
            file,
            len: replay.valid_len,
            entry_count: replay.entries.len(),
            sync_every_write,
            unsynced: 0,
        };
        Ok((wal, replay.entries))
    }

    /// Append an entry; fsync before returning when `sync_every_write` is set.
    ///
    /// On failure, including a failed fsync, the file is cut back to its
    /// previous length and the entry is not counted, so a rejected write is
    /// never replayed.
    pub fn append(&mut self, entry: &WalEntry) -> StorageResult<()> {
        let frame = encode_frame(entry)?;
        if let Err(e) = self.write_frame(&frame) {
            if let Err(cut) = self.file.set_len(self.len) {
                error!(error = %cut, "Could not roll back failed write-ahead append");
            }
            return Err(e);
        }
        self.len += frame.len() as u64;
        self.entry_count += 1;
        if !self.sync_every_write {
            self.unsynced += 1;
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> StorageResult<()> {
        self.file
            .write_all(frame)
            .map_err(|e| StorageError::io("appending to write-ahead log", e))?;
        if self.sync_every_write {
            self.file
                .sync_data()
                .map_err(|e| StorageError::io("syncing write-ahead log", e))?;
        }
        Ok(())
    }

    /// fsync pending appends.
    pub fn sync(&mut self) -> StorageResult<()> {
        if self.unsynced == 0 {
            return Ok(());
        }
        self.file
            .sync_data()
            .map_err(|e| StorageError::io("syncing write-ahead log", e))?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard all entries. Called after the compacted file is durable.
    pub fn truncate(&mut self) -> StorageResult<()> {
        self.file
            .set_len(0)
            .map_err(|e| StorageError::io("truncating write-ahead log", e))?;
        self.file
            .sync_all()
            .map_err(|e| StorageError::io("syncing write-ahead log", e))?;
        self.len = 0;
        self.entry_count = 0;
        self.unsynced = 0;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn len_bytes(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriteAheadLog {
    fn drop(&mut self) {
        let _ = self.sync();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn concept_entry(sequence: u64, content: &str) -> WalEntry {
        WalEntry {
            sequence,
            op: WalOp::LearnConcept {
                content: content.to_string(),
                embedding: Some(vec![0.1, 0.2]),
                strength: 1.0,
                confidence: 0.5,
                created_millis: 1_000,
            },
        }
    }

    #[test]
    fn test_append_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.wal");
        {
            let (mut wal, existing) = WriteAheadLog::open(&path, true).unwrap();
            assert!(existing.is_empty());
            wal.append(&concept_entry(1, "a")).unwrap();
            wal.append(&WalEntry {
                sequence: 2,
                op: WalOp::LearnAssociation {
                    source_id: ConceptId::from_content("a"),
                    target_id: ConceptId::from_content("b"),
                    assoc_type: AssociationType::Hierarchical,
                    confidence: 0.25,
                },
            })
            .unwrap();
            assert_eq!(wal.entry_count(), 2);
        }

        let (wal, entries) = WriteAheadLog::open(&path, true).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], concept_entry(1, "a"));
        assert_eq!(entries[1].sequence, 2);
        assert_eq!(wal.entry_count(), 2);
    }

    #[test]
    fn test_torn_tail_is_cut_and_appends_stay_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.wal");
        {
            let (mut wal, _) = WriteAheadLog::open(&path, false).unwrap();
            wal.append(&concept_entry(1, "kept")).unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();
        {
            let frame = encode_frame(&concept_entry(2, "torn")).unwrap();
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&frame[..frame.len() / 2]).unwrap();
        }

        let (mut wal, entries) = WriteAheadLog::open(&path, true).unwrap();
        assert_eq!(entries, vec![concept_entry(1, "kept")]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);

        wal.append(&concept_entry(3, "after")).unwrap();
        drop(wal);
        let (_, entries) = WriteAheadLog::open(&path, true).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sequence, 3);
    }

    #[test]
    fn test_checksum_mismatch_stops_replay() {
        let mut bytes = encode_frame(&concept_entry(1, "first")).unwrap();
        let mut second = encode_frame(&concept_entry(2, "second")).unwrap();
        let last = second.len() - 1;
        second[last] ^= 0xFF;
        bytes.extend_from_slice(&second);

        let replay = decode_frames(&bytes);
        assert_eq!(replay.entries.len(), 1);
        assert!(matches!(
            replay.torn_tail,
            Some(SerializationError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_short_header_is_torn() {
        let mut bytes = encode_frame(&concept_entry(1, "x1")).unwrap();
        let valid = bytes.len() as u64;
        bytes.extend_from_slice(&[1, 2, 3]);
        let replay = decode_frames(&bytes);
        assert_eq!(replay.valid_len, valid);
        assert!(matches!(
            replay.torn_tail,
            Some(SerializationError::Truncated { .. })
        ));
    }

    #[test]
    fn test_failed_append_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.wal");
        {
            let (mut wal, _) = WriteAheadLog::open(&path, true).unwrap();
            wal.append(&concept_entry(1, "kept")).unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();

        // A read-only handle makes every append fail.
        let mut wal = WriteAheadLog {
            path: path.clone(),
            file: File::open(&path).unwrap(),
            len: good_len,
            entry_count: 1,
            sync_every_write: true,
            unsynced: 0,
        };
        let err = wal.append(&concept_entry(2, "rejected")).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert_eq!(wal.len_bytes(), good_len);
        assert_eq!(wal.entry_count(), 1);
        drop(wal);

        let (_, entries) = WriteAheadLog::open(&path, true).unwrap();
        assert_eq!(entries, vec![concept_entry(1, "kept")]);
    }

    #[test]
    fn test_truncate_empties_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.wal");
        let (mut wal, _) = WriteAheadLog::open(&path, true).unwrap();
        wal.append(&concept_entry(1, "gone")).unwrap();
        wal.truncate().unwrap();
        assert_eq!(wal.entry_count(), 0);
        assert_eq!(wal.len_bytes(), 0);
        wal.append(&concept_entry(2, "fresh")).unwrap();
        drop(wal);

        let (_, entries) = WriteAheadLog::open(&path, true).unwrap();
        assert_eq!(entries, vec![concept_entry(2, "fresh")]);
    }
}
