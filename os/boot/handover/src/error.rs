/// Errors raised while building or reading a handover payload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum HandoverError {
    #[error("buffer of {available} bytes is too small, need at least {required}")]
    BufferTooSmall { required: usize, available: usize },
    #[error("buffer of {0} bytes does not fit the 32-bit size field")]
    BufferTooLarge(usize),
    #[error("payload capacity exceeded: {requested} bytes requested, {remaining} bytes left")]
    CapacityExceeded { requested: usize, remaining: usize },
    #[error("bad payload magic {0:#010x}")]
    BadMagic(u32),
    #[error("record {0} is not the end sentinel")]
    MissingSentinel(u32),
    #[error("record {0} starts before its predecessor")]
    Unordered(u32),
    #[error("payload declares more bytes or records than the buffer holds")]
    Truncated,
    #[error("unknown record tag {0:#010x}")]
    UnknownTag(u32),
    #[error("unknown framebuffer pixel format {0:#06x}")]
    UnknownPixelFormat(u16),
    #[error("string offset {0:#x} lies outside the payload")]
    OffsetOutOfBounds(u32),
    #[error("string at offset {0:#x} is not zero-terminated")]
    UnterminatedString(u32),
    #[error("string at offset {0:#x} is not valid UTF-8")]
    InvalidUtf8(u32),
    #[error("string contains an interior zero byte")]
    InteriorNul,
}
