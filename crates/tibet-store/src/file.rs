//! Append-only JSON Lines file implementation of the Store trait.
//!
//! Records are appended one per line and never rewritten. The index of
//! `token_id -> byte offset` is rebuilt by scanning the file at open and
//! extended on every append; reads seek straight to the indexed offset.
//!
//! Only one writer per file is assumed. Writers inside one process
//! serialise on the store's lock; other processes are not coordinated.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tibet_core::{Token, TokenId};

use crate::error::{Result, StoreError};
use crate::record::{
    decode_record, encode_record, is_blank, preview, salvage_token_id, RecordReader, NEWLINE,
};
use crate::traits::{Store, TokenFilter, TokenIter};

/// Durable, append-only token store backed by a JSON Lines file.
pub struct FileStore {
    path: PathBuf,
    inner: RwLock<FileStoreInner>,
}

struct FileStoreInner {
    /// Append handle.
    file: File,

    /// Id index: token_id -> offset of its record.
    index: HashMap<TokenId, u64>,

    /// Record offsets in insertion order.
    offsets: Vec<u64>,

    /// Current end of file.
    end: u64,

    /// The file ends in a partial line; the next append must start on a
    /// fresh line.
    torn_tail: bool,
}

/// Outcome of a full-file integrity scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileVerification {
    /// True iff no record is corrupted and no line is unparsable.
    pub integrity: bool,

    /// Ids of records whose stored hash does not match, in file order.
    pub corrupted_ids: Vec<TokenId>,

    /// 1-based numbers of lines that are not records at all.
    pub unparsable_lines: Vec<usize>,

    /// Non-blank lines seen.
    pub total_records: usize,

    /// Records that parsed and verified.
    pub valid_records: usize,
}

impl FileStore {
    /// Open a store at `path`, creating the file if missing.
    ///
    /// Scans the whole file to build the index. Lines that do not parse
    /// are skipped with a warning; a repeated `token_id` keeps its first
    /// record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut index = HashMap::new();
        let mut offsets = Vec::new();
        let mut end = 0;
        let mut torn_tail = false;

        let mut reader = RecordReader::open(&path)?;
        let mut line_no = 0usize;
        while let Some(line) = reader.next_line()? {
            line_no += 1;
            end = line.offset + line.bytes.len() as u64;
            torn_tail = line.is_torn();

            if is_blank(line.bytes) {
                continue;
            }

            match decode_record(line.bytes) {
                Ok(token) => {
                    if index.contains_key(&token.token_id) {
                        tracing::warn!(
                            path = %path.display(),
                            line = line_no,
                            token_id = %token.token_id,
                            "duplicate token id in store file, keeping first record"
                        );
                        continue;
                    }
                    index.insert(token.token_id, line.offset);
                    offsets.push(line.offset);
                }
                Err(e) => {
                    let salvaged = salvage_token_id(line.bytes);
                    tracing::warn!(
                        path = %path.display(),
                        line = line_no,
                        error = %e,
                        token_id = ?salvaged,
                        record = %preview(line.bytes),
                        "skipping unparsable line in store file"
                    );
                }
            }
        }

        if torn_tail {
            tracing::warn!(path = %path.display(), "store file ends in a torn record");
        }
        tracing::debug!(path = %path.display(), records = offsets.len(), "opened file store");

        Ok(Self {
            path,
            inner: RwLock::new(FileStoreInner {
                file,
                index,
                offsets,
                end,
                torn_tail,
            }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read every line and recompute every hash.
    ///
    /// Problems are collected, never raised: a bad line does not stop the
    /// scan. Only I/O failures on the file itself are errors.
    pub fn verify_file(&self) -> Result<FileVerification> {
        let _guard = self.read()?;
        verify_file(&self.path)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FileStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FileStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl FileStoreInner {
    fn append(&mut self, record: &[u8]) -> std::io::Result<u64> {
        let separator = usize::from(self.torn_tail);
        let mut buf = Vec::with_capacity(separator + record.len());
        if self.torn_tail {
            buf.push(NEWLINE);
        }
        buf.extend_from_slice(record);

        match write_synced(&mut self.file, &buf) {
            Ok(()) => {
                let offset = self.end + separator as u64;
                self.end += buf.len() as u64;
                self.torn_tail = false;
                Ok(offset)
            }
            Err(e) => {
                // Part of the record may have landed. Resync with the file so
                // the next append starts on a fresh line.
                if let Ok(meta) = self.file.metadata() {
                    if meta.len() != self.end {
                        self.end = meta.len();
                        self.torn_tail = true;
                    }
                }
                Err(e)
            }
        }
    }
}

fn write_synced(file: &mut File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf)?;
    file.flush()?;
    file.sync_data()
}

impl Store for FileStore {
    fn put(&self, token: &Token) -> Result<()> {
        let record = encode_record(token)?;
        let mut inner = self.write()?;

        if inner.index.contains_key(&token.token_id) {
            return Err(StoreError::Duplicate(token.token_id.clone()));
        }

        let offset = inner.append(&record)?;
        inner.index.insert(token.token_id.clone(), offset);
        inner.offsets.push(offset);

        tracing::debug!(
            token_id = %token.token_id,
            action = %token.action,
            offset,
            "appended token to file store"
        );
        Ok(())
    }

    fn get(&self, id: &TokenId) -> Result<Token> {
        let inner = self.read()?;
        let offset = *inner
            .index
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        RecordReader::open(&self.path)?.read_at(offset)
    }

    fn contains(&self, id: &TokenId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.index.contains_key(id))
    }

    fn query(&self, filter: &TokenFilter) -> Result<TokenIter<'_>> {
        let offsets = self.read()?.offsets.clone();
        let mut reader = RecordReader::open(&self.path)?;
        let tokens = offsets.into_iter().map(move |offset| reader.read_at(offset));
        Ok(filter.clone().apply(tokens))
    }

    fn len(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.offsets.len())
    }
}

/// Scan a store file without opening it as a store.
///
/// Line numbers are 1-based and count every physical line; blank lines
/// are ignored. A record that no longer parses but still carries a
/// readable `token_id` is reported in `corrupted_ids`; anything else,
/// including a torn trailing record, counts as unparsable.
pub fn verify_file(path: impl AsRef<Path>) -> Result<FileVerification> {
    let path = path.as_ref();
    let mut reader = RecordReader::open(path)?;
    let mut report = FileVerification::default();

    let mut line_no = 0usize;
    while let Some(line) = reader.next_line()? {
        line_no += 1;
        if is_blank(line.bytes) {
            continue;
        }
        report.total_records += 1;

        match decode_record(line.bytes) {
            Ok(token) if token.verify() => report.valid_records += 1,
            Ok(token) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no,
                    token_id = %token.token_id,
                    "content hash mismatch"
                );
                report.corrupted_ids.push(token.token_id);
            }
            Err(e) => match salvage_token_id(line.bytes) {
                Some(token_id) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_no,
                        token_id = %token_id,
                        error = %e,
                        "damaged record"
                    );
                    report.corrupted_ids.push(token_id);
                }
                None => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_no,
                        error = %e,
                        "unparsable record"
                    );
                    report.unparsable_lines.push(line_no);
                }
            },
        }
    }

    report.integrity = report.corrupted_ids.is_empty() && report.unparsable_lines.is_empty();
    tracing::debug!(
        path = %path.display(),
        total = report.total_records,
        valid = report.valid_records,
        integrity = report.integrity,
        "verified store file"
    );
    Ok(report)
}
