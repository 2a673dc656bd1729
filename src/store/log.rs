//! Append-only document log
//!
//! Every appended document is framed and written before the append is
//! acknowledged. On open, the log is replayed to rebuild the in-memory
//! collections.
//!
//! Format per entry:
//! - length: u32 (4 bytes)
//! - data: [u8; length] (bincode-encoded `LogEntry`)
//! - crc: u32 (4 bytes, CRC32 of length + data)
//!
//! Replay stops at the first truncated or corrupt entry; the tail after the
//! last good entry is cut off so later appends stay readable.

use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{Document, DocumentId, Fields};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Largest accepted entry, in bytes
const MAX_ENTRY_LEN: usize = 1_000_000;

/// Sync strategy for log writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSyncMode {
    /// Fsync after every write (safest, slowest)
    EveryWrite,
    /// Fsync in batches (balanced)
    #[default]
    Batched,
    /// No fsync, rely on OS (fastest, risk of loss)
    None,
}

/// On-disk form of a document
///
/// The body is kept as JSON text because bincode cannot round-trip
/// self-describing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub seq: u64,
    pub collection: String,
    pub fields_json: String,
}

impl LogEntry {
    pub fn from_document(doc: &Document) -> StoreResult<Self> {
        Ok(Self {
            id: doc.id.to_string(),
            seq: doc.seq,
            collection: doc.collection.clone(),
            fields_json: serde_json::to_string(&doc.fields)?,
        })
    }

    pub fn into_document(self) -> StoreResult<Document> {
        let fields: Fields = serde_json::from_str(&self.fields_json)?;
        Ok(Document {
            id: DocumentId::from(self.id),
            seq: self.seq,
            collection: self.collection,
            fields,
        })
    }
}

/// Append-only log of documents
pub struct DocumentLog {
    /// File handle for writing
    writer: BufWriter<File>,
    /// Path to log file
    path: PathBuf,
    /// Number of entries in the log
    entry_count: u64,
    /// File length covered by acknowledged entries
    valid_len: u64,
    /// Set when a failed write could not be rolled back
    poisoned: bool,
    /// Bytes written since last sync
    bytes_since_sync: usize,
    /// Sync mode
    sync_mode: LogSyncMode,
    /// Batch sync threshold (bytes)
    sync_threshold: usize,
}

impl DocumentLog {
    /// Open or create a log file and replay its contents
    ///
    /// Returns the log positioned for appending plus every document that
    /// could be recovered, in write order.
    pub fn open(
        path: impl AsRef<Path>,
        sync_mode: LogSyncMode,
    ) -> StoreResult<(Self, Vec<Document>)> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (documents, valid_len) = Self::replay(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        if file.metadata()?.len() > valid_len {
            tracing::warn!(
                path = %path.display(),
                kept_entries = documents.len(),
                "Truncating damaged document log tail"
            );
            file.set_len(valid_len)?;
        }

        let log = Self {
            writer: BufWriter::new(file),
            path,
            entry_count: documents.len() as u64,
            valid_len,
            poisoned: false,
            bytes_since_sync: 0,
            sync_mode,
            sync_threshold: 64 * 1024, // 64KB default batch
        };

        Ok((log, documents))
    }

    /// Read all intact entries and the byte length they occupy
    fn replay(path: &Path) -> StoreResult<(Vec<Document>, u64)> {
        if !path.exists() {
            return Ok((Vec::new(), 0));
        }

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut documents = Vec::new();
        let mut valid_len = 0u64;

        loop {
            match Self::read_entry_from(&mut reader) {
                Ok(Some((entry, frame_len))) => match entry.into_document() {
                    Ok(doc) => {
                        documents.push(doc);
                        valid_len += frame_len as u64;
                    }
                    Err(e) => {
                        tracing::warn!("Log replay stopped at entry {}: {}", documents.len(), e);
                        break;
                    }
                },
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::warn!("Log replay stopped at entry {}: {}", documents.len(), e);
                    break;
                }
            }
        }

        Ok((documents, valid_len))
    }

    /// Append a document to the log
    ///
    /// A failed append leaves nothing behind: bytes already handed to the
    /// writer are discarded and the file is cut back to its last good length.
    pub fn append(&mut self, doc: &Document) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::Log(
                "log could not be restored after a failed write".to_string(),
            ));
        }

        let frame = Self::encode_frame(doc)?;

        match self.write_frame(&frame) {
            Ok(synced) => {
                self.entry_count += 1;
                self.valid_len += frame.len() as u64;
                if synced {
                    self.bytes_since_sync = 0;
                } else {
                    self.bytes_since_sync += frame.len();
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(seq = doc.seq, error = %e, "Document log write failed");
                if let Err(restore) = self.discard_pending() {
                    tracing::error!(error = %restore, "Document log could not be restored");
                    self.poisoned = true;
                }
                Err(e)
            }
        }
    }

    /// Frame a document: length (4) + data (N) + crc (4)
    fn encode_frame(doc: &Document) -> StoreResult<Vec<u8>> {
        let data = bincode::serialize(&LogEntry::from_document(doc)?)?;

        if data.len() > MAX_ENTRY_LEN {
            return Err(StoreError::InvalidDocument(format!(
                "encoded document is {} bytes (limit {})",
                data.len(),
                MAX_ENTRY_LEN
            )));
        }

        let len_bytes = (data.len() as u32).to_le_bytes();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_bytes);
        hasher.update(&data);
        let crc = hasher.finalize();

        let mut frame = Vec::with_capacity(8 + data.len());
        frame.extend_from_slice(&len_bytes);
        frame.extend_from_slice(&data);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Write and flush one frame, syncing per mode; returns whether it synced
    fn write_frame(&mut self, frame: &[u8]) -> StoreResult<bool> {
        self.writer.write_all(frame)?;

        let sync = match self.sync_mode {
            LogSyncMode::EveryWrite => true,
            LogSyncMode::Batched => self.bytes_since_sync + frame.len() >= self.sync_threshold,
            LogSyncMode::None => false,
        };

        self.writer.flush()?;
        if sync {
            self.writer.get_ref().sync_all()?;
        }
        Ok(sync)
    }

    /// Drop unflushed bytes and cut the file back to the last good entry
    fn discard_pending(&mut self) -> StoreResult<()> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        file.set_len(self.valid_len)?;

        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts hands back the buffer instead of flushing it on drop
        let (_, _discarded) = stale.into_parts();
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> StoreResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.bytes_since_sync = 0;
        Ok(())
    }

    /// Read a single entry; returns the entry and its full frame length
    fn read_entry_from<R: Read>(reader: &mut R) -> StoreResult<Option<(LogEntry, usize)>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > MAX_ENTRY_LEN {
            return Err(StoreError::Log(format!("Entry length too large: {}", len)));
        }

        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_buf);
        hasher.update(&data);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(StoreError::Corruption(format!(
                "CRC mismatch: stored={}, computed={}",
                stored_crc, computed_crc
            )));
        }

        let entry: LogEntry = bincode::deserialize(&data)?;
        Ok(Some((entry, 8 + len)))
    }

    /// Get the number of entries in the log
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file size
    pub fn file_size(&self) -> StoreResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Seek, SeekFrom};
    use tempfile::tempdir;

    fn reading_doc(seq: u64, temperature: i64, timestamp: i64) -> Document {
        let fields = match json!({"temperature": temperature, "timestamp": timestamp}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        Document {
            id: DocumentId::generate(),
            seq,
            collection: "weather".to_string(),
            fields,
        }
    }

    #[test]
    fn test_log_basic_operations() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("documents.log");

        let first = reading_doc(0, 21, 1000);
        let second = reading_doc(1, 64, 2000);

        {
            let (mut log, recovered) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
            assert!(recovered.is_empty());

            log.append(&first).unwrap();
            log.append(&second).unwrap();
            assert_eq!(log.entry_count(), 2);
        }

        {
            let (log, recovered) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
            assert_eq!(log.entry_count(), 2);
            assert_eq!(recovered, vec![first, second]);
        }
    }

    #[test]
    fn test_log_crc_corruption_detection() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("documents.log");

        {
            let (mut log, _) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
            log.append(&reading_doc(0, 10, 1000)).unwrap();
        }

        {
            let mut file = OpenOptions::new().write(true).open(&log_path).unwrap();
            file.seek(SeekFrom::Start(10)).unwrap();
            file.write_all(&[0xFF, 0xFF]).unwrap();
        }

        let (log, recovered) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
        assert!(recovered.is_empty());
        assert_eq!(log.entry_count(), 0);
        assert_eq!(log.file_size().unwrap(), 0);
    }

    #[test]
    fn test_truncated_tail_is_cut_and_appends_survive() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("documents.log");

        {
            let (mut log, _) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
            log.append(&reading_doc(0, 10, 1000)).unwrap();
            log.append(&reading_doc(1, 20, 2000)).unwrap();
        }

        // Simulate a crash halfway through the second frame
        let full_len = std::fs::metadata(&log_path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&log_path).unwrap();
        file.set_len(full_len - 5).unwrap();
        drop(file);

        {
            let (mut log, recovered) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
            assert_eq!(recovered.len(), 1);
            log.append(&reading_doc(2, 30, 3000)).unwrap();
        }

        let (_, recovered) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
        let seqs: Vec<u64> = recovered.iter().map(|d| d.seq).collect();
        assert_eq!(seqs, vec![0, 2]);
    }

    #[test]
    fn test_log_batched_mode_persists_on_sync() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("documents.log");

        {
            let (mut log, _) = DocumentLog::open(&log_path, LogSyncMode::Batched).unwrap();
            for i in 0..50 {
                log.append(&reading_doc(i, (i % 100) as i64, i as i64 * 1000)).unwrap();
            }
            log.sync().unwrap();
            assert_eq!(log.entry_count(), 50);
        }

        let (_, recovered) = DocumentLog::open(&log_path, LogSyncMode::Batched).unwrap();
        assert_eq!(recovered.len(), 50);
        assert_eq!(recovered[49].number("timestamp"), Some(49_000.0));
    }

    #[test]
    fn test_failed_append_is_not_replayed() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("documents.log");

        {
            let (mut log, _) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
            log.append(&reading_doc(0, 10, 1000)).unwrap();

            // A read-only handle makes the next flush fail
            let read_only = File::open(&log_path).unwrap();
            log.writer = BufWriter::new(read_only);

            assert!(log.append(&reading_doc(1, 20, 2000)).is_err());
            assert_eq!(log.entry_count(), 1);

            // The store retries with the same seq after a failure
            log.append(&reading_doc(1, 30, 3000)).unwrap();
            assert_eq!(log.entry_count(), 2);
        }

        let (log, recovered) = DocumentLog::open(&log_path, LogSyncMode::EveryWrite).unwrap();
        let seqs: Vec<u64> = recovered.iter().map(|d| d.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(recovered[1].number("temperature"), Some(30.0));
        assert_eq!(log.entry_count(), 2);
    }

    #[test]
    fn test_entry_round_trip_keeps_fields() {
        let doc = reading_doc(7, 42, 1_700_000_000_000);
        let entry = LogEntry::from_document(&doc).unwrap();
        assert_eq!(entry.into_document().unwrap(), doc);
    }
}
