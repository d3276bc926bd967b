//! # Protocol Constants
//!
//! Wire-level sizes and well-known values shared by producer and consumer.
//! Both sides are usually built by different toolchains, so everything here
//! is fixed and little-endian.

/// Payload magic. Also passed as the first argument of the consumer entry
/// point and used as the [`Tag::Magic`](crate::Tag::Magic) marker.
pub const MAGIC: u32 = 0xc001_b001;

/// Link section in which a consumer places its [`Request`](crate::Request) list.
pub const SECTION: &str = ".handover";

/// Virtual base the kernel image is linked at.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// Start of the higher half of the address space.
pub const UPPER_HALF: u64 = 0xffff_8000_0000_0000;

/// Header: `magic`, `agent`, `size`, `count`, each a `u32`.
pub const HEADER_SIZE: usize = 16;

/// Record: `tag: u32`, `flags: u32`, `start: u64`, `size: u64`, `more: u64`.
pub const RECORD_SIZE: usize = 32;

/// Request: `tag: u32`, `flags: u32`, `more: u64`.
pub const REQUEST_SIZE: usize = 16;

/// Smallest usable buffer: the header followed by the sentinel record.
pub const MIN_PAYLOAD_SIZE: usize = HEADER_SIZE + RECORD_SIZE;

/// Framebuffer pixel format: 32 bits per pixel, red in the lowest byte.
pub const FB_RGBX8888: u16 = 0x7451;

/// Framebuffer pixel format: 32 bits per pixel, blue in the lowest byte.
pub const FB_BGRX8888: u16 = 0xd040;

/// Consumer entry point.
///
/// # ABI
/// Called with [`MAGIC`], the address of the finished payload in the
/// consumer's address space, and the index of the CPU entering it.
pub type EntryFn = extern "C" fn(magic: u64, payload: *const u8, cpu: u32) -> !;

const _: () = {
    assert!(HEADER_SIZE == 4 * size_of::<u32>());
    assert!(RECORD_SIZE == 2 * size_of::<u32>() + 3 * size_of::<u64>());
    assert!(REQUEST_SIZE == 2 * size_of::<u32>() + size_of::<u64>());
    assert!(KERNEL_BASE > UPPER_HALF);
    assert!(MIN_PAYLOAD_SIZE <= u32::MAX as usize);
};
