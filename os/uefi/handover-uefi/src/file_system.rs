//! # Boot Volume Files
//!
//! Reads files from the volume the loader was started from into
//! `LOADER_DATA` pages and describes them as `FILE` records.

use crate::UefiError;
use handover::{Builder, Outcome};
use log::{debug, info};
use uefi::boot::{self, AllocateType, MemoryType, PAGE_SIZE};
use uefi::proto::media::file::{File, FileAttribute, FileMode, RegularFile};
use uefi::{CStr16, Status};

/// A file copied into page-aligned loader memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LoadedFile {
    /// Physical address of the first byte.
    pub start: u64,
    /// File size in bytes.
    pub size: u64,
}

/// Reads `path` from the boot volume into freshly allocated pages.
///
/// # Errors
/// Fails if the volume or file cannot be opened, `path` names a directory,
/// or the read comes up short.
pub fn load_file(path: &CStr16) -> Result<LoadedFile, UefiError> {
    let mut sfs = boot::get_image_file_system(boot::image_handle())?;
    let mut volume = sfs.open_volume()?;
    let handle = volume.open(path, FileMode::Read, FileAttribute::empty())?;
    let mut file = handle.into_regular_file().ok_or(UefiError::NotAFile)?;

    file.set_position(RegularFile::END_OF_FILE)?;
    let size = file.get_position()?;
    file.set_position(0)?;

    let len = usize::try_from(size).map_err(|_| UefiError::Firmware(Status::BAD_BUFFER_SIZE))?;
    let pages = len.div_ceil(PAGE_SIZE).max(1);
    let ptr = boot::allocate_pages(AllocateType::AnyPages, MemoryType::LOADER_DATA, pages)?;

    // SAFETY: the allocation spans `pages * PAGE_SIZE >= len` bytes and is owned by us.
    #[allow(unsafe_code)]
    let buf = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), len) };
    let read = file.read(buf).map_err(|e| UefiError::Firmware(e.status()))?;
    if read != len {
        debug!("short read of {path}: {read} of {len} bytes");
        return Err(UefiError::Firmware(Status::END_OF_FILE));
    }

    Ok(LoadedFile {
        start: ptr.as_ptr() as u64,
        size,
    })
}

/// Loads `path` and appends a `FILE` record named `name` for it.
///
/// # Errors
/// See [`load_file`]; also fails if the record or its name does not fit.
pub fn append_file(
    builder: &mut Builder<'_>,
    path: &CStr16,
    name: &str,
) -> Result<Outcome, UefiError> {
    let file = load_file(path)?;
    info!(
        "loaded {name} to {:#x} ({} bytes)",
        file.start, file.size
    );
    Ok(builder.append_file(name, file.start, file.size)?)
}
