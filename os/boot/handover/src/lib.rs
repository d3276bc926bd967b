//! # Handover Payload
//!
//! The contract between a boot loader (the *producer*) and the kernel it
//! starts (the *consumer*). The producer describes physical memory and the
//! optional resources it found (framebuffer, ACPI root pointer, device tree,
//! files, command line) in one contiguous buffer and jumps to the consumer's
//! entry point with the address of that buffer. No allocator, runtime or
//! threading exists on either side at that point, so everything here works
//! on caller-provided memory only.
//!
//! ## Layout
//!
//! ```text
//! offset 0   ┌──────────────────────────────────────────────┐
//!            │ magic │ agent │ size │ count      (4 × u32)  │
//! offset 16  ├──────────────────────────────────────────────┤
//!            │ record 0                       (32 bytes)    │
//!            │ ...                                          │
//!            │ record count - 1                             │
//!            │ END sentinel                                 │
//!            ├──────────────────────────────────────────────┤
//!            │ free                                         │
//!            ├──────────────────────────────────────────────┤
//!            │ string heap, zero-terminated, growing down   │
//! offset size└──────────────────────────────────────────────┘
//! ```
//!
//! All fields are little-endian. Cross references (the agent name, file
//! names, the command line) are byte offsets from the start of the payload,
//! never addresses, since producer and consumer may map the payload at
//! different addresses.
//!
//! ## Records
//!
//! Records are kept sorted by `start` with no two intervals overlapping. The
//! [`merge`] engine maintains that order as records are appended: adjacent
//! memory of the same mergeable category is coalesced, and an overlapping
//! record either overrides or is trimmed around its neighbour depending on
//! the categories involved.
//!
//! ## Producer
//!
//! ```
//! use handover::{Builder, Record, Tag};
//!
//! let mut buf = [0u8; 512];
//! let mut builder = Builder::new(&mut buf)?;
//! builder.set_agent("loader")?;
//! builder.append(Record::new(Tag::Free, 0, 0x10_0000))?;
//! builder.append(Record::new(Tag::Kernel, 0x8000, 0x4000))?;
//! let payload = builder.finish();
//!
//! assert!(payload.is_valid());
//! assert_eq!(payload.count(), 3);
//! assert_eq!(payload.agent(), Some("loader"));
//! # Ok::<(), handover::HandoverError>(())
//! ```
//!
//! ## Consumer
//!
//! The consumer receives [`MAGIC`](protocol::MAGIC) and the payload address
//! through an [`EntryFn`](protocol::EntryFn), wraps it with
//! [`Payload::from_raw`], and must check [`Payload::validate`] before trusting
//! any other field. After the handover the payload is never written again,
//! so any number of CPUs may read it concurrently.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod builder;
mod error;
pub mod merge;
mod payload;
pub mod protocol;
mod record;
mod request;
mod tag;
mod wire;

pub use builder::Builder;
pub use error::HandoverError;
pub use merge::{Outcome, RecordSlots};
pub use payload::{Payload, Records, record_offset};
pub use record::{Aux, FileAux, FramebufferAux, PixelFormat, Record};
pub use request::{Request, RequestError, RequestList, Requests};
pub use tag::{Tag, tag_name};
