//! # Root/Extended System Description Pointer

use crate::UefiError;
use handover::{Builder, Outcome, Record, Tag};
use log::{info, warn};
use uefi::system;
use uefi::table::cfg::{ACPI_GUID, ACPI2_GUID};

/// Size of the ACPI 1.0 RSDP structure.
pub const RSDP_V1_SIZE: u64 = 20;

/// Size of the ACPI 2.0 XSDP structure.
pub const RSDP_V2_SIZE: u64 = 36;

/// Physical address and structure size of the RSDP, preferring ACPI 2.0.
#[must_use]
pub fn find_rsdp() -> Option<(u64, u64)> {
    system::with_config_table(|table| {
        let lookup = |guid, size| {
            table
                .iter()
                .find(|entry| entry.guid == guid)
                .map(|entry| (entry.address as usize as u64, size))
        };
        lookup(ACPI2_GUID, RSDP_V2_SIZE).or_else(|| lookup(ACPI_GUID, RSDP_V1_SIZE))
    })
}

/// Appends an RSDP record if the firmware publishes one.
///
/// Returns `None` when no ACPI table is configured.
///
/// # Errors
/// Fails if the record does not fit the payload.
pub fn append_rsdp(builder: &mut Builder<'_>) -> Result<Option<Outcome>, UefiError> {
    let Some((start, size)) = find_rsdp() else {
        warn!("firmware publishes no ACPI root pointer");
        return Ok(None);
    };

    info!("RSDP at {start:#x} ({size} bytes)");
    Ok(Some(builder.append(Record::new(Tag::Rsdp, start, size))?))
}
