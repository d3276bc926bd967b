//! # Payload View
//!
//! Read-only access to a finished payload, as seen by the consumer. Nothing
//! in here is trusted before [`Payload::validate`] succeeded; even then every
//! string offset is checked against the declared payload size.

use crate::error::HandoverError;
use crate::protocol::{HEADER_SIZE, MAGIC, RECORD_SIZE};
use crate::record::{Aux, Record};
use crate::tag::{Tag, tag_name};
use crate::wire::{read_u32, read_u64};
use core::iter::FusedIterator;
use log::{info, warn};

/// Byte offset of record slot `index`.
#[must_use]
pub const fn record_offset(index: usize) -> usize {
    HEADER_SIZE + index * RECORD_SIZE
}

/// A handover payload borrowed from memory.
#[derive(Debug, Copy, Clone)]
pub struct Payload<'a> {
    bytes: &'a [u8],
}

impl<'a> Payload<'a> {
    /// Wraps `bytes` as a payload.
    ///
    /// Only the presence of a header is checked; call [`validate`](Self::validate)
    /// before relying on anything else.
    ///
    /// # Errors
    /// Fails with [`HandoverError::Truncated`] if `bytes` is shorter than a header.
    pub const fn new(bytes: &'a [u8]) -> Result<Self, HandoverError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HandoverError::Truncated);
        }
        Ok(Self { bytes })
    }

    pub(crate) const fn from_bytes_unchecked(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Builds a view over a payload handed over by address.
    ///
    /// The view spans the size the header declares.
    ///
    /// # Safety
    /// `ptr` must point to at least [`HEADER_SIZE`] readable bytes, and to as
    /// many readable bytes as the `size` field found there declares. The
    /// memory must not be written while the view exists.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn from_raw(ptr: *const u8) -> Payload<'static> {
        // SAFETY: the caller guarantees a readable header.
        let header = unsafe { core::slice::from_raw_parts(ptr, HEADER_SIZE) };
        let declared = read_u32(header, 8).unwrap_or(0) as usize;
        let len = declared.max(HEADER_SIZE);
        // SAFETY: the caller guarantees `declared` readable, unchanging bytes.
        let bytes = unsafe { core::slice::from_raw_parts(ptr, len) };
        Payload { bytes }
    }

    fn header(&self, off: usize) -> u32 {
        // `new` guarantees a full header.
        read_u32(self.bytes, off).unwrap_or(0)
    }

    #[must_use]
    pub fn magic(&self) -> u32 {
        self.header(0)
    }

    /// String heap offset of the producer name; zero if none was set.
    #[must_use]
    pub fn agent_offset(&self) -> u32 {
        self.header(4)
    }

    /// Declared payload size in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.header(8)
    }

    /// Number of live records, excluding the sentinel.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.header(12)
    }

    /// The bytes covered by the declared size, clamped to the borrowed buffer.
    fn declared(&self) -> &'a [u8] {
        let len = (self.size() as usize).min(self.bytes.len());
        &self.bytes[..len]
    }

    /// Checks the payload structure.
    ///
    /// Verifies the magic, that the declared size and record count fit the
    /// buffer, that the record at index `count` is the sentinel, and that the
    /// records are in non-decreasing `start` order. Overlaps are not
    /// re-checked; the builder's merge engine prevents them.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), HandoverError> {
        let magic = self.magic();
        if magic != MAGIC {
            return Err(HandoverError::BadMagic(magic));
        }

        let size = self.size() as usize;
        let count = self.count();
        if size > self.bytes.len() || record_offset(count as usize + 1) > size {
            return Err(HandoverError::Truncated);
        }

        let sentinel = read_u32(self.bytes, record_offset(count as usize));
        if sentinel != Some(Tag::End.raw()) {
            return Err(HandoverError::MissingSentinel(count));
        }

        let mut previous = 0;
        for index in 0..count {
            let start = read_u64(self.bytes, record_offset(index as usize) + 8)
                .ok_or(HandoverError::Truncated)?;
            if start < previous {
                return Err(HandoverError::Unordered(index));
            }
            previous = start;
        }

        Ok(())
    }

    /// Whether [`validate`](Self::validate) succeeds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("invalid handover payload: {e}");
                false
            }
        }
    }

    /// The record at `index`.
    ///
    /// # Errors
    /// Fails with [`HandoverError::Truncated`] past the last record and with
    /// [`HandoverError::UnknownTag`] for records this consumer cannot decode.
    pub fn record(&self, index: u32) -> Result<Record, HandoverError> {
        if index >= self.count() {
            return Err(HandoverError::Truncated);
        }
        let off = record_offset(index as usize);
        let slot = self.declared().get(off..).ok_or(HandoverError::Truncated)?;
        Record::read(slot)
    }

    /// Iterates the live records in order.
    #[must_use]
    pub const fn records(&self) -> Records<'_, 'a> {
        Records {
            payload: self,
            index: 0,
        }
    }

    /// The first record tagged `tag`.
    #[must_use]
    pub fn find_by_tag(&self, tag: Tag) -> Option<Record> {
        self.records().flatten().find(|record| record.tag == tag)
    }

    /// The first [`Tag::File`] record whose name is exactly `name`.
    #[must_use]
    pub fn find_file(&self, name: &str) -> Option<Record> {
        self.records().flatten().find(|record| match record.aux() {
            Aux::File(file) => self.string_bytes(file.name()) == Ok(name.as_bytes()),
            _ => false,
        })
    }

    /// The zero-terminated bytes at `offset`, without the terminator.
    ///
    /// # Errors
    /// Fails if `offset` lies outside the declared payload size or if no
    /// terminator follows it within the payload.
    pub fn string_bytes(&self, offset: u32) -> Result<&'a [u8], HandoverError> {
        let bytes = self.declared();
        let tail = bytes
            .get(offset as usize..)
            .filter(|tail| !tail.is_empty() && offset as usize >= HEADER_SIZE)
            .ok_or(HandoverError::OffsetOutOfBounds(offset))?;
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(HandoverError::UnterminatedString(offset))?;
        Ok(&tail[..len])
    }

    /// The UTF-8 string at `offset`, relative to the start of the payload.
    ///
    /// # Errors
    /// See [`string_bytes`](Self::string_bytes); additionally fails with
    /// [`HandoverError::InvalidUtf8`].
    pub fn string(&self, offset: u32) -> Result<&'a str, HandoverError> {
        let bytes = self.string_bytes(offset)?;
        core::str::from_utf8(bytes).map_err(|_| HandoverError::InvalidUtf8(offset))
    }

    /// The producer name, if one was recorded.
    #[must_use]
    pub fn agent(&self) -> Option<&'a str> {
        match self.agent_offset() {
            0 => None,
            offset => self.string(offset).ok(),
        }
    }

    /// The kernel command line, if the producer handed one over.
    #[must_use]
    pub fn cmdline(&self) -> Option<&'a str> {
        let record = self.find_by_tag(Tag::Cmdline)?;
        let offset = u32::try_from(record.more).ok()?;
        self.string(offset).ok()
    }

    /// The name of a [`Tag::File`] record.
    ///
    /// # Errors
    /// Fails if the record is not a file or its name cannot be resolved.
    pub fn file_name(&self, record: &Record) -> Result<&'a str, HandoverError> {
        match record.aux() {
            Aux::File(file) => self.string(file.name()),
            _ => Err(HandoverError::UnknownTag(record.tag.raw())),
        }
    }

    /// Logs the header and every record at info level.
    pub fn log_records(&self) {
        info!(
            "handover: magic={:#010x} agent={} size={} count={}",
            self.magic(),
            self.agent().unwrap_or("?"),
            self.size(),
            self.count()
        );

        for index in 0..self.count() {
            let off = record_offset(index as usize);
            let raw = read_u32(self.bytes, off).unwrap_or(0);
            info!(
                "  {}({raw:#010x}) flags={:#x} start={:#x} size={:#x} more={:#x}",
                tag_name(raw),
                read_u32(self.bytes, off + 4).unwrap_or(0),
                read_u64(self.bytes, off + 8).unwrap_or(0),
                read_u64(self.bytes, off + 16).unwrap_or(0),
                read_u64(self.bytes, off + 24).unwrap_or(0),
            );
        }
    }
}

/// Iterator over the records of a [`Payload`]; yields a `Result` per record.
pub struct Records<'p, 'a> {
    payload: &'p Payload<'a>,
    index: u32,
}

impl Iterator for Records<'_, '_> {
    type Item = Result<Record, HandoverError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.payload.count() {
            return None;
        }
        let record = self.payload.record(self.index);
        // A truncated payload ends the iteration after reporting once.
        self.index = if matches!(record, Err(HandoverError::Truncated)) {
            u32::MAX
        } else {
            self.index + 1
        };
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let r = self.payload.count().saturating_sub(self.index) as usize;
        (0, Some(r))
    }
}

impl FusedIterator for Records<'_, '_> {}
