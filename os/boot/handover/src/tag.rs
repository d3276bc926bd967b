//! # Record Tags

use crate::error::HandoverError;
use crate::protocol::MAGIC;
use core::fmt;

/// Category of a [`Record`](crate::Record).
///
/// The numeric values are part of the wire format and never change between
/// protocol revisions. A consumer built against an older revision rejects
/// values it does not know with [`HandoverError::UnknownTag`].
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Tag {
    /// Usable RAM.
    Free = 0x0000_0000,
    /// Marker value; opens a request list and equals the payload magic.
    Magic = MAGIC,
    /// The memory holding the handover payload itself (`SELF` on the wire).
    Handover = 0xa24f_988d,
    /// The stack the consumer is entered on.
    Stack = 0xf65b_391b,
    /// The loaded kernel image.
    Kernel = 0xbfc7_1b20,
    /// Memory used by the boot loader; reclaimable once the payload was consumed.
    Loader = 0xf1f8_0c26,
    /// A file loaded by the producer. The aux word holds name and meta offsets.
    File = 0xcbc3_6d3b,
    /// ACPI root system description pointer.
    Rsdp = 0x8ef2_9c18,
    /// Flattened device tree blob.
    Fdt = 0xb628_bbc1,
    /// Linear framebuffer. The aux word holds the mode.
    Framebuffer = 0xe2d5_5685,
    /// Kernel command line. The aux word holds the string offset.
    ///
    /// Added in this protocol revision; consumers built against the first
    /// revision of the header reject it as unknown.
    Cmdline = 0x4351_40c4,
    /// Firmware-reserved or otherwise unusable memory.
    ///
    /// Added in this protocol revision; consumers built against the first
    /// revision of the header reject it as unknown.
    Reserved = 0xb884_1d2d,
    /// Sentinel terminating the record sequence and request lists.
    End = 0xffff_ffff,
}

impl Tag {
    /// All tags in protocol order.
    pub const ALL: [Self; 13] = [
        Self::Free,
        Self::Magic,
        Self::Handover,
        Self::Stack,
        Self::Kernel,
        Self::Loader,
        Self::File,
        Self::Rsdp,
        Self::Fdt,
        Self::Framebuffer,
        Self::Cmdline,
        Self::Reserved,
        Self::End,
    ];

    /// The raw wire value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Decodes a raw wire value.
    ///
    /// # Errors
    /// Returns [`HandoverError::UnknownTag`] for values outside the tag space.
    pub const fn from_raw(raw: u32) -> Result<Self, HandoverError> {
        Ok(match raw {
            0x0000_0000 => Self::Free,
            MAGIC => Self::Magic,
            0xa24f_988d => Self::Handover,
            0xf65b_391b => Self::Stack,
            0xbfc7_1b20 => Self::Kernel,
            0xf1f8_0c26 => Self::Loader,
            0xcbc3_6d3b => Self::File,
            0x8ef2_9c18 => Self::Rsdp,
            0xb628_bbc1 => Self::Fdt,
            0xe2d5_5685 => Self::Framebuffer,
            0x4351_40c4 => Self::Cmdline,
            0xb884_1d2d => Self::Reserved,
            0xffff_ffff => Self::End,
            other => return Err(HandoverError::UnknownTag(other)),
        })
    }

    /// Whether adjacent or overlapping records of this tag may be coalesced.
    ///
    /// Only plain memory categories are mergeable; everything describing a
    /// single resource keeps its exact extent.
    #[must_use]
    pub const fn is_mergeable(self) -> bool {
        match self {
            Self::Free | Self::Loader | Self::Kernel | Self::Reserved => true,
            Self::Magic
            | Self::Handover
            | Self::Stack
            | Self::File
            | Self::Rsdp
            | Self::Fdt
            | Self::Framebuffer
            | Self::Cmdline
            | Self::End => false,
        }
    }

    /// Rank deciding which side of an overlap keeps the contested region.
    ///
    /// Every resource tag outranks every memory category, and among the
    /// memory categories `FREE < LOADER < KERNEL < RESERVED`. Usable memory
    /// therefore never overrides anything, whichever record came first.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Loader => 1,
            Self::Kernel => 2,
            Self::Reserved => 3,
            Self::Magic
            | Self::Handover
            | Self::Stack
            | Self::File
            | Self::Rsdp
            | Self::Fdt
            | Self::Framebuffer
            | Self::Cmdline
            | Self::End => 4,
        }
    }

    /// Upper-case display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Magic => "MAGIC",
            Self::Handover => "SELF",
            Self::Stack => "STACK",
            Self::Kernel => "KERNEL",
            Self::Loader => "LOADER",
            Self::File => "FILE",
            Self::Rsdp => "RSDP",
            Self::Fdt => "FDT",
            Self::Framebuffer => "FB",
            Self::Cmdline => "CMDLINE",
            Self::Reserved => "RESERVED",
            Self::End => "END",
        }
    }
}

/// Display name of a raw tag value, `"UNKNOWN"` if it is not part of the tag space.
#[must_use]
pub const fn tag_name(raw: u32) -> &'static str {
    match Tag::from_raw(raw) {
        Ok(tag) => tag.name(),
        Err(_) => "UNKNOWN",
    }
}

impl TryFrom<u32> for Tag {
    type Error = HandoverError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl From<Tag> for u32 {
    fn from(value: Tag) -> Self {
        value.raw()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_decode_to_themselves() {
        for tag in Tag::ALL {
            assert_eq!(Tag::from_raw(tag.raw()).unwrap(), tag);
        }
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert!(matches!(
            Tag::from_raw(0x1234_5678),
            Err(HandoverError::UnknownTag(0x1234_5678))
        ));
        assert_eq!(tag_name(0x1234_5678), "UNKNOWN");
    }

    #[test]
    fn only_memory_categories_merge() {
        let mergeable: [Tag; 4] = [Tag::Free, Tag::Loader, Tag::Kernel, Tag::Reserved];
        for tag in Tag::ALL {
            assert_eq!(tag.is_mergeable(), mergeable.contains(&tag), "{tag}");
        }
    }

    #[test]
    fn resources_outrank_memory_categories() {
        for tag in Tag::ALL {
            if !tag.is_mergeable() {
                assert!(tag.precedence() > Tag::Reserved.precedence(), "{tag}");
            }
        }
        assert!(Tag::Free.precedence() < Tag::Loader.precedence());
        assert!(Tag::Loader.precedence() < Tag::Kernel.precedence());
        assert!(Tag::Kernel.precedence() < Tag::Reserved.precedence());
    }

    #[test]
    fn magic_tag_equals_protocol_magic() {
        assert_eq!(Tag::Magic.raw(), MAGIC);
        assert_eq!(tag_name(0xffff_ffff), "END");
    }
}
