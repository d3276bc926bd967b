//! # Records
//!
//! A [`Record`] describes one address interval `[start, start + size)` of the
//! target address space together with its [`Tag`]. Records are the unit the
//! merge engine sorts, splits and coalesces.

use crate::error::HandoverError;
use crate::protocol::{FB_BGRX8888, FB_RGBX8888, RECORD_SIZE};
use crate::tag::Tag;
use crate::wire::{read_u32, read_u64, write_u32, write_u64};
use bitfield_struct::bitfield;

/// One fixed-size entry of the payload's record sequence.
///
/// The in-memory layout matches the wire layout on little-endian targets;
/// encoding still goes through [`Record::read`] and [`Record::write`] so that
/// neither side depends on the other's alignment.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Record {
    /// Category of the interval.
    pub tag: Tag,
    /// Tag-dependent flags.
    pub flags: u32,
    /// First byte of the interval.
    pub start: u64,
    /// Length in bytes. Zero means "absent".
    pub size: u64,
    /// Tag-interpreted auxiliary word, see [`Record::aux`].
    pub more: u64,
}

/// Framebuffer mode, packed into the auxiliary word of a [`Tag::Framebuffer`] record.
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct FramebufferAux {
    /// Visible width in pixels.
    pub width: u16,
    /// Visible height in pixels.
    pub height: u16,
    /// Bytes per scanline.
    pub pitch: u16,
    /// Raw pixel format, see [`PixelFormat`].
    pub format: u16,
}

/// Name and metadata of a [`Tag::File`] record.
///
/// Both fields are string heap offsets relative to the start of the payload;
/// zero means "none".
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct FileAux {
    pub name: u32,
    pub meta: u32,
}

/// Pixel formats a producer may hand over.
#[repr(u16)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Rgbx8888 = FB_RGBX8888,
    Bgrx8888 = FB_BGRX8888,
}

impl TryFrom<u16> for PixelFormat {
    type Error = HandoverError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            FB_RGBX8888 => Ok(Self::Rgbx8888),
            FB_BGRX8888 => Ok(Self::Bgrx8888),
            other => Err(HandoverError::UnknownPixelFormat(other)),
        }
    }
}

impl FramebufferAux {
    /// Decoded pixel format.
    ///
    /// # Errors
    /// Returns [`HandoverError::UnknownPixelFormat`] for unsupported raw values.
    pub fn pixel_format(&self) -> Result<PixelFormat, HandoverError> {
        PixelFormat::try_from(self.format())
    }
}

/// Typed view of [`Record::more`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Aux {
    Framebuffer(FramebufferAux),
    File(FileAux),
    Raw(u64),
}

impl Record {
    /// The sentinel terminating the record sequence.
    pub const END: Self = Self::new(Tag::End, 0, 0);

    #[must_use]
    pub const fn new(tag: Tag, start: u64, size: u64) -> Self {
        Self {
            tag,
            flags: 0,
            start,
            size,
            more: 0,
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub const fn with_more(mut self, more: u64) -> Self {
        self.more = more;
        self
    }

    /// A framebuffer record covering `size` bytes at `start`.
    #[must_use]
    pub const fn framebuffer(start: u64, size: u64, mode: FramebufferAux) -> Self {
        Self::new(Tag::Framebuffer, start, size).with_more(mode.into_bits())
    }

    /// A file record; `name` is the string heap offset of the file name.
    #[must_use]
    pub const fn file(start: u64, size: u64, name: u32) -> Self {
        Self::new(Tag::File, start, size).with_more(FileAux::new().with_name(name).into_bits())
    }

    /// One past the last byte of the interval, saturating at the top of the address space.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Whether both intervals share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Whether `self` ends exactly where `other` begins.
    ///
    /// A record whose end lies past the address space touches nothing.
    #[must_use]
    pub const fn just_before(&self, other: &Self) -> bool {
        match self.start.checked_add(self.size) {
            Some(end) => end == other.start,
            None => false,
        }
    }

    /// Whether `self` begins exactly where `other` ends.
    #[must_use]
    pub const fn just_after(&self, other: &Self) -> bool {
        other.just_before(self)
    }

    /// The part of `self` lying strictly below `other`, or an empty record.
    ///
    /// The fragment keeps the tag of `self`; flags and the aux word are cleared.
    #[must_use]
    pub const fn half_under(&self, other: &Self) -> Self {
        if self.overlaps(other) && self.start < other.start {
            Self::new(self.tag, self.start, other.start - self.start)
        } else {
            Self::new(self.tag, 0, 0)
        }
    }

    /// The part of `self` lying strictly above `other`, or an empty record.
    ///
    /// The fragment keeps the tag of `self`; flags and the aux word are cleared.
    #[must_use]
    pub const fn half_over(&self, other: &Self) -> Self {
        if self.overlaps(other) && self.end() > other.end() {
            Self::new(self.tag, other.end(), self.end() - other.end())
        } else {
            Self::new(self.tag, 0, 0)
        }
    }

    /// The smallest record covering both intervals, tagged like `self`.
    #[must_use]
    pub const fn union(&self, other: &Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end() > other.end() {
            self.end()
        } else {
            other.end()
        };
        let mut merged = *self;
        merged.start = start;
        merged.size = end - start;
        merged
    }

    /// Interprets the auxiliary word according to the tag.
    #[must_use]
    pub const fn aux(&self) -> Aux {
        match self.tag {
            Tag::Framebuffer => Aux::Framebuffer(FramebufferAux::from_bits(self.more)),
            Tag::File => Aux::File(FileAux::from_bits(self.more)),
            Tag::Free
            | Tag::Magic
            | Tag::Handover
            | Tag::Stack
            | Tag::Kernel
            | Tag::Loader
            | Tag::Rsdp
            | Tag::Fdt
            | Tag::Cmdline
            | Tag::Reserved
            | Tag::End => Aux::Raw(self.more),
        }
    }

    /// Decodes a record from the first [`RECORD_SIZE`] bytes of `bytes`.
    ///
    /// # Errors
    /// Fails with [`HandoverError::Truncated`] if fewer bytes are available
    /// and with [`HandoverError::UnknownTag`] for tags outside the tag space.
    pub fn read(bytes: &[u8]) -> Result<Self, HandoverError> {
        let tag = read_u32(bytes, 0).ok_or(HandoverError::Truncated)?;
        let more = read_u64(bytes, 24).ok_or(HandoverError::Truncated)?;
        Ok(Self {
            tag: Tag::from_raw(tag)?,
            flags: read_u32(bytes, 4).ok_or(HandoverError::Truncated)?,
            start: read_u64(bytes, 8).ok_or(HandoverError::Truncated)?,
            size: read_u64(bytes, 16).ok_or(HandoverError::Truncated)?,
            more,
        })
    }

    /// Encodes the record into the first [`RECORD_SIZE`] bytes of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than [`RECORD_SIZE`].
    pub fn write(&self, bytes: &mut [u8]) {
        let slot = &mut bytes[..RECORD_SIZE];
        write_u32(slot, 0, self.tag.raw());
        write_u32(slot, 4, self.flags);
        write_u64(slot, 8, self.start);
        write_u64(slot, 16, self.size);
        write_u64(slot, 24, self.more);
    }
}

const _: () = {
    assert!(size_of::<Record>() == RECORD_SIZE);
    assert!(size_of::<FramebufferAux>() == size_of::<u64>());
};
