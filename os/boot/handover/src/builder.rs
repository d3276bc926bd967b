//! # Payload Builder
//!
//! Writes a payload into a caller-supplied buffer. Records grow upwards from
//! the header, strings grow downwards from the end of the buffer:
//!
//! ```text
//! 0        16                         records_end          strings      size
//! ┌────────┬──────────────────────────┬──────────┬───────────┬───────────┐
//! │ header │ record 0 .. record n-1   │ sentinel │   free    │  strings  │
//! └────────┴──────────────────────────┴──────────┴───────────┴───────────┘
//! ```
//!
//! Every write is checked against the gap between the two cursors. A write
//! that does not fit fails with [`HandoverError::CapacityExceeded`] and
//! leaves the buffer unchanged.

use crate::error::HandoverError;
use crate::merge::{self, Outcome, RecordSlots};
use crate::payload::{Payload, record_offset};
use crate::protocol::{HEADER_SIZE, MAGIC, MIN_PAYLOAD_SIZE, RECORD_SIZE};
use crate::record::Record;
use crate::tag::Tag;
use crate::wire::{read_u32, write_u32};
use log::{debug, warn};

/// Header field offsets.
const MAGIC_OFF: usize = 0;
const AGENT_OFF: usize = 4;
const SIZE_OFF: usize = 8;
const COUNT_OFF: usize = 12;

/// Transient writer for a payload.
pub struct Builder<'a> {
    buf: &'a mut [u8],
    /// Offset of the lowest string written so far.
    strings: usize,
    count: usize,
}

impl<'a> Builder<'a> {
    /// Initializes an empty payload spanning all of `buf`.
    ///
    /// The header is written with [`MAGIC`], no agent and zero records, and
    /// the sentinel is placed at index 0.
    ///
    /// # Errors
    /// Fails if `buf` cannot hold the header and the sentinel, or if its
    /// length does not fit the 32-bit size field.
    pub fn new(buf: &'a mut [u8]) -> Result<Self, HandoverError> {
        let size = buf.len();
        if size < MIN_PAYLOAD_SIZE {
            return Err(HandoverError::BufferTooSmall {
                required: MIN_PAYLOAD_SIZE,
                available: size,
            });
        }
        let Ok(size_field) = u32::try_from(size) else {
            return Err(HandoverError::BufferTooLarge(size));
        };

        write_u32(buf, MAGIC_OFF, MAGIC);
        write_u32(buf, AGENT_OFF, 0);
        write_u32(buf, SIZE_OFF, size_field);
        write_u32(buf, COUNT_OFF, 0);
        Record::END.write(&mut buf[HEADER_SIZE..]);

        debug!("handover payload initialized, {size} bytes");
        Ok(Self {
            buf,
            strings: size,
            count: 0,
        })
    }

    /// Number of live records, excluding the sentinel.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Free bytes between the sentinel and the lowest string.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.strings - record_offset(self.count + 1)
    }

    /// Appends `record` through the merge engine, keeping the sequence sorted
    /// and free of overlaps.
    ///
    /// # Errors
    /// Fails with [`HandoverError::CapacityExceeded`] if the resulting records
    /// do not fit; the payload is left unchanged in that case.
    pub fn append(&mut self, record: Record) -> Result<Outcome, HandoverError> {
        merge::append(self, record)
    }

    /// Writes `record` into the next slot as-is, without sorting or merging.
    ///
    /// # Errors
    /// Fails with [`HandoverError::CapacityExceeded`] if no slot is left.
    pub fn append_record(&mut self, record: Record) -> Result<(), HandoverError> {
        self.reserve(RECORD_SIZE)?;
        record.write(&mut self.buf[record_offset(self.count)..]);
        self.set_count(self.count + 1);
        Ok(())
    }

    /// Copies `text` and a terminating zero into the string heap.
    ///
    /// Returns the offset of the string from the start of the payload; this
    /// offset stays meaningful wherever the payload is mapped.
    ///
    /// # Errors
    /// Fails with [`HandoverError::InteriorNul`] if `text` contains a zero
    /// byte and with [`HandoverError::CapacityExceeded`] if it does not fit.
    pub fn append_string(&mut self, text: &str) -> Result<u32, HandoverError> {
        let bytes = text.as_bytes();
        if bytes.contains(&0) {
            return Err(HandoverError::InteriorNul);
        }

        let len = bytes.len() + 1;
        self.reserve(len)?;
        self.strings -= len;
        self.buf[self.strings..self.strings + bytes.len()].copy_from_slice(bytes);
        self.buf[self.strings + bytes.len()] = 0;

        debug!("stored {len} byte string at {:#x}", self.strings);
        // The buffer length fits a u32, so every offset into it does too.
        u32::try_from(self.strings).map_err(|_| HandoverError::BufferTooLarge(self.buf.len()))
    }

    /// Stores the producer name and points the header's `agent` field at it.
    ///
    /// # Errors
    /// See [`append_string`](Self::append_string).
    pub fn set_agent(&mut self, name: &str) -> Result<u32, HandoverError> {
        let offset = self.append_string(name)?;
        write_u32(self.buf, AGENT_OFF, offset);
        Ok(offset)
    }

    /// Stores `name` and appends a [`Tag::File`] record for the file image at
    /// `[start, start + size)`.
    ///
    /// # Errors
    /// Fails if either the name or the record does not fit. Nothing is
    /// written in that case.
    pub fn append_file(
        &mut self,
        name: &str,
        start: u64,
        size: u64,
    ) -> Result<Outcome, HandoverError> {
        self.with_string(name, |builder, offset| {
            builder.append(Record::file(start, size, offset))
        })
    }

    /// Stores the command line `text` and appends a [`Tag::Cmdline`] record
    /// describing the copy the producer placed at `start`.
    ///
    /// The record covers the text and its terminating zero; its aux word holds
    /// the string heap offset of the same text.
    ///
    /// # Errors
    /// Fails if either the text or the record does not fit. Nothing is
    /// written in that case.
    pub fn append_cmdline(&mut self, text: &str, start: u64) -> Result<Outcome, HandoverError> {
        let size = text.len() as u64 + 1;
        self.with_string(text, |builder, offset| {
            builder.append(Record::new(Tag::Cmdline, start, size).with_more(u64::from(offset)))
        })
    }

    /// Hands the finished payload over as a read-only view.
    #[must_use]
    pub fn finish(self) -> Payload<'a> {
        debug!(
            "handover payload finished: {} records, {} bytes unused",
            self.count,
            self.remaining()
        );
        Payload::from_bytes_unchecked(self.buf)
    }

    /// Stores `text`, then runs `f` with its offset; rolls the string back if `f` fails.
    fn with_string<F>(&mut self, text: &str, f: F) -> Result<Outcome, HandoverError>
    where
        F: FnOnce(&mut Self, u32) -> Result<Outcome, HandoverError>,
    {
        let mark = self.strings;
        let offset = self.append_string(text)?;
        f(self, offset).inspect_err(|_| self.strings = mark)
    }

    fn reserve(&self, bytes: usize) -> Result<(), HandoverError> {
        let remaining = self.remaining();
        if bytes > remaining {
            warn!("handover payload full: {bytes} bytes requested, {remaining} left");
            return Err(HandoverError::CapacityExceeded {
                requested: bytes,
                remaining,
            });
        }
        Ok(())
    }

    /// Updates the record count and moves the sentinel behind the last record.
    fn set_count(&mut self, count: usize) {
        self.count = count;
        // count is bounded by the buffer length, which fits a u32.
        #[allow(clippy::cast_possible_truncation)]
        write_u32(self.buf, COUNT_OFF, count as u32);
        Record::END.write(&mut self.buf[record_offset(count)..]);
    }
}

impl RecordSlots for Builder<'_> {
    fn len(&self) -> usize {
        self.count
    }

    fn spare(&self) -> usize {
        self.remaining() / RECORD_SIZE
    }

    fn get(&self, index: usize) -> Record {
        // Slots below `count` only ever hold records written by this builder.
        Record::read(&self.buf[record_offset(index)..]).unwrap_or(Record::END)
    }

    fn set(&mut self, index: usize, record: Record) {
        record.write(&mut self.buf[record_offset(index)..]);
    }

    fn insert(&mut self, index: usize, record: Record) -> Result<(), HandoverError> {
        self.reserve(RECORD_SIZE)?;
        let from = record_offset(index);
        self.buf
            .copy_within(from..record_offset(self.count), from + RECORD_SIZE);
        record.write(&mut self.buf[from..]);
        self.set_count(self.count + 1);
        Ok(())
    }
}

impl core::fmt::Debug for Builder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Builder")
            .field("size", &self.buf.len())
            .field("count", &self.count)
            .field("strings", &self.strings)
            .field("agent", &read_u32(self.buf, AGENT_OFF))
            .finish()
    }
}
