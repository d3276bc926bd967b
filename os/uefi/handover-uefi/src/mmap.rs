//! # UEFI Memory Map
//!
//! Translates firmware memory descriptors into handover records.

use handover::{Builder, HandoverError, Record, Tag};
use log::debug;
use uefi::boot::PAGE_SIZE;
use uefi::mem::memory_map::{MemoryDescriptor, MemoryType};

/// The handover category of a firmware memory type.
///
/// Boot services memory is usable once boot services were exited; loader
/// allocations stay reserved for the loader until the consumer reclaims them.
#[must_use]
pub fn classify(ty: MemoryType) -> Tag {
    if ty == MemoryType::CONVENTIONAL
        || ty == MemoryType::BOOT_SERVICES_CODE
        || ty == MemoryType::BOOT_SERVICES_DATA
    {
        Tag::Free
    } else if ty == MemoryType::LOADER_CODE || ty == MemoryType::LOADER_DATA {
        Tag::Loader
    } else {
        Tag::Reserved
    }
}

/// The record describing one descriptor; empty for zero-page descriptors.
#[must_use]
pub fn descriptor_record(desc: &MemoryDescriptor) -> Record {
    let size = desc.page_count.saturating_mul(PAGE_SIZE as u64);
    Record::new(classify(desc.ty), desc.phys_start, size)
}

/// Appends every descriptor through the merge engine.
///
/// Returns the number of records in the payload afterwards; adjacent
/// descriptors of one category collapse into a single record.
///
/// # Errors
/// Fails with [`HandoverError::CapacityExceeded`] once the payload is full.
pub fn append_memory_map<'d, I>(
    builder: &mut Builder<'_>,
    descriptors: I,
) -> Result<usize, HandoverError>
where
    I: IntoIterator<Item = &'d MemoryDescriptor>,
{
    let mut seen = 0usize;
    for desc in descriptors {
        builder.append(descriptor_record(desc))?;
        seen += 1;
    }

    debug!(
        "memory map: {seen} descriptors folded into {} records",
        builder.count()
    );
    Ok(builder.count())
}
