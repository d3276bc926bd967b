//! # Interval Merge Engine
//!
//! Keeps the record sequence sorted by `start` and free of overlaps while new
//! records are appended. A candidate is compared against the existing records
//! in ascending order and the first applicable rule wins:
//!
//! 1. zero-size candidates are dropped,
//! 2. a mergeable candidate touching a record of the same tag extends it,
//!    unless the grown record would run into the following record (the scan
//!    then reaches that overlap instead) or its size would overflow,
//! 3. an overlapping candidate is resolved by precedence (see below),
//! 4. otherwise the candidate is inserted before the first record starting
//!    above it, or appended at the end.
//!
//! ## Overlaps
//!
//! The side with the higher [`Tag::precedence`](crate::Tag::precedence) wins
//! the contested region: resources beat memory categories, and among those
//! `FREE < LOADER < KERNEL < RESERVED`. On a tie the candidate wins. The
//! winner is kept whole and the loser is cut into the fragments lying below
//! and above the winner, so the result does not depend on which of two
//! differently ranked records was appended first:
//!
//! ```text
//! existing  FREE   [0 ............................ 100)
//! candidate KERNEL           [40 ..... 60)
//! result    FREE   [0 .. 40) KERNEL [40 .. 60) FREE [60 .. 100)
//! ```
//!
//! Overlapping records of the same mergeable tag are coalesced into their union.
//!
//! Only the first overlap is resolved per call. A candidate spanning several
//! existing records leaves the later overlaps in place; producers append in
//! an order that avoids this, or repeat the append.

use crate::error::HandoverError;
use crate::record::Record;
use log::trace;

/// Fixed-capacity, index-addressed record storage the engine operates on.
pub trait RecordSlots {
    /// Number of live records.
    fn len(&self) -> usize;

    /// Number of records that can still be inserted.
    fn spare(&self) -> usize;

    /// The record at `index`; `index` is below [`len`](Self::len).
    fn get(&self, index: usize) -> Record;

    /// Overwrites the record at `index`; `index` is below [`len`](Self::len).
    fn set(&mut self, index: usize, record: Record);

    /// Shifts the records from `index` on up by one and stores `record` at `index`.
    ///
    /// # Errors
    /// Fails with [`HandoverError::CapacityExceeded`] when no slot is spare.
    fn insert(&mut self, index: usize, record: Record) -> Result<(), HandoverError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What [`append`] did with a candidate.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The candidate was empty.
    Ignored,
    /// The record at the index grew to cover the candidate.
    Extended(usize),
    /// An overlap at the index was resolved; the sequence grew by `added` records (possibly zero).
    Resolved { index: usize, added: usize },
    /// The candidate was stored at the index.
    Inserted(usize),
}

/// Merges `record` into `slots`, preserving the sorted, non-overlapping order.
///
/// On error `slots` is left untouched.
///
/// # Errors
/// Fails with [`HandoverError::CapacityExceeded`] when the result would not
/// fit the spare capacity of `slots`.
pub fn append<S>(slots: &mut S, record: Record) -> Result<Outcome, HandoverError>
where
    S: RecordSlots + ?Sized,
{
    if record.is_empty() {
        trace!("dropping empty {} record", record.tag);
        return Ok(Outcome::Ignored);
    }

    let mergeable = record.tag.is_mergeable();
    let len = slots.len();

    for index in 0..len {
        let mut other = slots.get(index);
        let same = mergeable && other.tag == record.tag;

        if same
            && record.just_after(&other)
            && let Some(size) = other.size.checked_add(record.size)
            && (index + 1 >= len || !slots.get(index + 1).overlaps(&record))
        {
            other.size = size;
            slots.set(index, other);
            trace!("extended {} record {index} upwards", other.tag);
            return Ok(Outcome::Extended(index));
        }

        if same
            && record.just_before(&other)
            && let Some(size) = other.size.checked_add(record.size)
        {
            other.start = record.start;
            other.size = size;
            slots.set(index, other);
            trace!("extended {} record {index} downwards", other.tag);
            return Ok(Outcome::Extended(index));
        }

        if record.overlaps(&other) {
            return resolve_overlap(slots, index, other, record);
        }

        if record.start < other.start {
            slots.insert(index, record)?;
            trace!("inserted {} record at {index}", record.tag);
            return Ok(Outcome::Inserted(index));
        }
    }

    slots.insert(len, record)?;
    trace!("appended {} record at {len}", record.tag);
    Ok(Outcome::Inserted(len))
}

/// Replaces `other` at `index` with the winner of the contested region and
/// the loser's fragments around it.
fn resolve_overlap<S>(
    slots: &mut S,
    index: usize,
    other: Record,
    record: Record,
) -> Result<Outcome, HandoverError>
where
    S: RecordSlots + ?Sized,
{
    if record.tag == other.tag && record.tag.is_mergeable() {
        slots.set(index, other.union(&record));
        trace!("coalesced overlapping {} record {index}", other.tag);
        return Ok(Outcome::Extended(index));
    }

    let record_wins = record.tag.precedence() >= other.tag.precedence();
    let (winner, loser) = if record_wins {
        (record, other)
    } else {
        (other, record)
    };

    let half_under = loser.half_under(&winner);
    let half_over = loser.half_over(&winner);
    let added = usize::from(!half_under.is_empty()) + usize::from(!half_over.is_empty());

    if added > slots.spare() {
        return Err(HandoverError::CapacityExceeded {
            requested: added,
            remaining: slots.spare(),
        });
    }

    slots.set(index, winner);
    let mut at = index;
    if !half_under.is_empty() {
        slots.insert(at, half_under)?;
        at += 1;
    }
    if !half_over.is_empty() {
        slots.insert(at + 1, half_over)?;
    }

    trace!(
        "{} record overrides {} in [{:#x}, {:#x}), {added} fragment(s) kept",
        winner.tag,
        loser.tag,
        winner.start,
        winner.end()
    );
    Ok(Outcome::Resolved { index, added })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;

    /// Array-backed slots for exercising the engine without a payload buffer.
    struct Slots<const N: usize> {
        records: [Record; N],
        len: usize,
    }

    impl<const N: usize> Slots<N> {
        const fn new() -> Self {
            Self {
                records: [Record::END; N],
                len: 0,
            }
        }

        fn live(&self) -> &[Record] {
            &self.records[..self.len]
        }
    }

    impl<const N: usize> RecordSlots for Slots<N> {
        fn len(&self) -> usize {
            self.len
        }

        fn spare(&self) -> usize {
            N - self.len
        }

        fn get(&self, index: usize) -> Record {
            self.records[index]
        }

        fn set(&mut self, index: usize, record: Record) {
            self.records[index] = record;
        }

        fn insert(&mut self, index: usize, record: Record) -> Result<(), HandoverError> {
            if self.len == N {
                return Err(HandoverError::CapacityExceeded {
                    requested: 1,
                    remaining: 0,
                });
            }
            self.records.copy_within(index..self.len, index + 1);
            self.records[index] = record;
            self.len += 1;
            Ok(())
        }
    }

    #[test]
    fn kernel_inside_free_splits_free() {
        let mut slots = Slots::<4>::new();
        append(&mut slots, Record::new(Tag::Free, 0, 100)).unwrap();
        let outcome = append(&mut slots, Record::new(Tag::Kernel, 40, 20)).unwrap();

        assert_eq!(outcome, Outcome::Resolved { index: 0, added: 2 });
        assert_eq!(
            slots.live(),
            [
                Record::new(Tag::Free, 0, 40),
                Record::new(Tag::Kernel, 40, 20),
                Record::new(Tag::Free, 60, 40),
            ]
        );
    }

    #[test]
    fn refused_split_leaves_slots_untouched() {
        let mut slots = Slots::<2>::new();
        append(&mut slots, Record::new(Tag::Free, 0, 100)).unwrap();
        let before = slots.live().to_vec();

        let err = append(&mut slots, Record::new(Tag::Kernel, 40, 20)).unwrap_err();
        assert_eq!(
            err,
            HandoverError::CapacityExceeded {
                requested: 2,
                remaining: 1
            }
        );
        assert_eq!(slots.live(), before.as_slice());
    }
}
