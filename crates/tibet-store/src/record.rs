//! JSON Lines record codec for the file store.
//!
//! One token per line: a JSON object with sorted keys, terminated by a
//! single `\n`. JSON string escaping guarantees no raw newline inside a
//! record.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use tibet_core::{CoreError, Token, TokenId};

use crate::error::{Result, StoreError};

/// Record terminator.
pub(crate) const NEWLINE: u8 = b'\n';

/// Encode a token as one newline-terminated record.
pub(crate) fn encode_record(token: &Token) -> Result<Vec<u8>> {
    let mut line = token.to_json_line()?.into_bytes();
    line.push(NEWLINE);
    Ok(line)
}

/// Decode one record. The line may still carry its terminator.
///
/// Invalid UTF-8 is replaced rather than rejected, so a flipped byte inside
/// a string field surfaces as a hash mismatch instead of a lost record.
pub(crate) fn decode_record(line: &[u8]) -> std::result::Result<Token, CoreError> {
    let text = String::from_utf8_lossy(trim_terminator(line));
    Token::from_json(&text)
}

/// Recover the `token_id` of a record that no longer parses.
///
/// `token_id` sorts last among the record keys, so damage anywhere before
/// it (a stray quote or control byte in the hash, say) leaves it readable.
/// The id must be a complete JSON string followed only by the closing
/// brace; a torn record yields `None`.
pub(crate) fn salvage_token_id(line: &[u8]) -> Option<TokenId> {
    const KEY: &[u8] = b"\"token_id\":";

    let line = trim_terminator(line);
    let start = line.windows(KEY.len()).rposition(|w| w == KEY)? + KEY.len();
    let mut values = serde_json::Deserializer::from_slice(&line[start..]).into_iter::<String>();
    let id = values.next()?.ok()?;

    let rest = &line[start + values.byte_offset()..];
    let closes = rest
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .eq([b'}']);
    (closes && !id.is_empty()).then(|| TokenId::new(id))
}

/// Check whether a line holds nothing but whitespace.
pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(&[NEWLINE]).unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Lossy text view of a line, for log messages.
pub(crate) fn preview(line: &[u8]) -> Cow<'_, str> {
    let line = trim_terminator(line);
    String::from_utf8_lossy(&line[..line.len().min(80)])
}

/// Sequential and random-access reader over a record file.
pub(crate) struct RecordReader {
    reader: BufReader<File>,
    offset: u64,
    buf: Vec<u8>,
}

/// One physical line read from a record file.
pub(crate) struct RawLine<'a> {
    /// Byte offset of the first byte of the line.
    pub offset: u64,
    /// The line, including its terminator when present.
    pub bytes: &'a [u8],
}

impl RawLine<'_> {
    /// Check whether the line ended without a terminator.
    pub fn is_torn(&self) -> bool {
        self.bytes.last() != Some(&NEWLINE)
    }
}

impl RecordReader {
    /// Open a reader positioned at the start of the file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
            buf: Vec::new(),
        })
    }

    /// Read the next physical line, or `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<RawLine<'_>>> {
        self.buf.clear();
        let n = self.reader.read_until(NEWLINE, &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        let offset = self.offset;
        self.offset += n as u64;
        Ok(Some(RawLine {
            offset,
            bytes: &self.buf,
        }))
    }

    /// Read and decode the record starting at `offset`.
    pub fn read_at(&mut self, offset: u64) -> Result<Token> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.offset = offset;

        let line = self.next_line()?.ok_or_else(|| StoreError::CorruptRecord {
            offset,
            reason: "offset past end of file".to_string(),
        })?;
        decode_record(line.bytes).map_err(|e| StoreError::CorruptRecord {
            offset,
            reason: e.to_string(),
        })
    }
}
