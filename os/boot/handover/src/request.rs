//! # Requests
//!
//! A consumer advertises the optional records it wants by placing a list of
//! [`Request`]s in the [`SECTION`](crate::protocol::SECTION) link section of
//! its image. The list opens with a [`Tag::Magic`] entry and closes with a
//! [`Tag::End`] entry:
//!
//! ```
//! use handover::{Request, Tag, requests};
//!
//! let list: [Request; 4] = requests![Tag::Framebuffer, Tag::File];
//! assert_eq!(list[0].tag, Tag::Magic.raw());
//! assert_eq!(list[3].tag, Tag::End.raw());
//! ```
//!
//! The producer locates that section in the consumer image and reads it with
//! [`RequestList::parse`] before building the payload.

use crate::protocol::REQUEST_SIZE;
use crate::tag::Tag;
use crate::wire::{read_u32, read_u64};
use core::iter::FusedIterator;

/// One entry of a request list.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Request {
    /// Raw [`Tag`] of the wanted record.
    pub tag: u32,
    /// Tag-dependent flags.
    pub flags: u32,
    /// Tag-dependent auxiliary word.
    pub more: u64,
}

impl Request {
    #[must_use]
    pub const fn new(tag: Tag) -> Self {
        Self {
            tag: tag.raw(),
            flags: 0,
            more: 0,
        }
    }

    /// The entry opening every list.
    #[must_use]
    pub const fn start() -> Self {
        Self::new(Tag::Magic)
    }

    /// The entry closing every list.
    #[must_use]
    pub const fn end() -> Self {
        Self::new(Tag::End)
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
}

const _: () = assert!(size_of::<Request>() == REQUEST_SIZE);

/// Errors raised while reading a request list.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("request list is shorter than one entry")]
    TooShort,
    #[error("request list does not open with the magic entry")]
    MissingStart,
    #[error("request list has no end entry")]
    Unterminated,
    #[error("request {index} names unknown tag {tag:#010x}")]
    UnknownTag { index: usize, tag: u32 },
}

/// Builds a request array `[start, requests..., end]` from tags.
#[macro_export]
macro_rules! requests {
    ($($tag:expr),* $(,)?) => {
        [
            $crate::Request::start(),
            $($crate::Request::new($tag),)*
            $crate::Request::end(),
        ]
    };
}

/// Declares the consumer's request list in the `.handover` link section.
///
/// ```ignore
/// handover::declare_requests!(handover::Tag::Framebuffer, handover::Tag::Rsdp);
/// ```
#[macro_export]
macro_rules! declare_requests {
    ($($tag:expr),* $(,)?) => {
        #[used]
        #[unsafe(link_section = ".handover")]
        static HANDOVER_REQUESTS: [$crate::Request; 2 + <[&'static str]>::len(&[$(stringify!($tag)),*])] =
            $crate::requests![$($tag),*];
    };
}

/// A request list read from a consumer image.
#[derive(Debug, Copy, Clone)]
pub struct RequestList<'a> {
    /// Encoded entries between the start and the end marker.
    entries: &'a [u8],
}

impl<'a> RequestList<'a> {
    /// Parses the raw contents of the request section.
    ///
    /// Bytes after the end entry are ignored.
    ///
    /// # Errors
    /// Fails if the list does not open with [`Tag::Magic`], has no
    /// [`Tag::End`] entry, or names a tag outside the tag space.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, RequestError> {
        let first = read_u32(bytes, 0).ok_or(RequestError::TooShort)?;
        if bytes.len() < REQUEST_SIZE {
            return Err(RequestError::TooShort);
        }
        if first != Tag::Magic.raw() {
            return Err(RequestError::MissingStart);
        }

        let mut index = 1;
        loop {
            let tag = read_u32(bytes, index * REQUEST_SIZE).ok_or(RequestError::Unterminated)?;
            if bytes.len() < (index + 1) * REQUEST_SIZE {
                return Err(RequestError::Unterminated);
            }
            match Tag::from_raw(tag) {
                Ok(Tag::End) => break,
                Ok(_) => index += 1,
                Err(_) => return Err(RequestError::UnknownTag { index, tag }),
            }
        }

        Ok(Self {
            entries: &bytes[REQUEST_SIZE..index * REQUEST_SIZE],
        })
    }

    /// Number of requests, excluding the start and end markers.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len() / REQUEST_SIZE
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first request for `tag`, if any.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<Request> {
        self.iter().find(|request| request.tag == tag.raw())
    }

    /// Whether the consumer asked for records tagged `tag`.
    #[must_use]
    pub fn wants(&self, tag: Tag) -> bool {
        self.get(tag).is_some()
    }

    #[must_use]
    pub const fn iter(&self) -> Requests<'a> {
        Requests {
            entries: self.entries,
            idx: 0,
        }
    }
}

impl<'a> IntoIterator for &RequestList<'a> {
    type Item = Request;
    type IntoIter = Requests<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`RequestList`].
pub struct Requests<'a> {
    entries: &'a [u8],
    idx: usize,
}

impl Iterator for Requests<'_> {
    type Item = Request;

    fn next(&mut self) -> Option<Self::Item> {
        let off = self.idx * REQUEST_SIZE;
        let request = Request {
            tag: read_u32(self.entries, off)?,
            flags: read_u32(self.entries, off + 4)?,
            more: read_u64(self.entries, off + 8)?,
        };
        self.idx += 1;
        Some(request)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let r = (self.entries.len() / REQUEST_SIZE).saturating_sub(self.idx);
        (r, Some(r))
    }
}

impl FusedIterator for Requests<'_> {}
