//! # UEFI Handover Producer
//!
//! Fills a [`handover::Builder`] from what the firmware knows: the memory
//! map, the GOP framebuffer, the ACPI root pointer and files read from the
//! boot volume. Everything is appended through the merge engine, which
//! settles overlaps by tag precedence rather than by arrival: a memory map
//! added after the kernel image is carved around it just as the image is
//! carved out of a map added first. Order still matters when one record
//! spans several existing ones, and between two overlapping resource
//! records, where the later one wins.
//!
//! A loader typically collects the framebuffer, RSDP and files while boot
//! services are still available, exits boot services, and then adds the
//! final memory map followed by the kernel image, its stack and the payload
//! itself; the latter override the `LOADER` memory they were allocated from.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod file_system;
pub mod framebuffer;
pub mod mmap;
pub mod rsdp;

use handover::HandoverError;
use uefi::Status;
use uefi::proto::console::gop::PixelFormat;

/// Errors raised while collecting firmware information.
#[derive(Debug, thiserror::Error)]
pub enum UefiError {
    #[error("firmware call failed: {0:?}")]
    Firmware(Status),
    #[error("no usable graphics mode")]
    NoGraphicsMode,
    #[error("pixel format {0:?} has no linear framebuffer encoding")]
    UnsupportedPixelFormat(PixelFormat),
    #[error("graphics mode does not fit the 16-bit mode fields")]
    ModeOutOfRange,
    #[error("not a regular file")]
    NotAFile,
    #[error(transparent)]
    Handover(#[from] HandoverError),
}

impl From<uefi::Error> for UefiError {
    fn from(value: uefi::Error) -> Self {
        Self::Firmware(value.status())
    }
}
