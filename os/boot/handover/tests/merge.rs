use handover::{Builder, HandoverError, Outcome, Payload, Record, Tag};

fn records(payload: &Payload<'_>) -> Vec<Record> {
    payload.records().map(Result::unwrap).collect()
}

/// Sorted by start and no two live intervals overlap.
fn assert_well_formed(payload: &Payload<'_>) {
    assert!(payload.is_valid());
    let records = records(payload);
    for pair in records.windows(2) {
        assert!(pair[0].start <= pair[1].start, "{pair:?} unordered");
        assert!(!pair[0].overlaps(&pair[1]), "{pair:?} overlap");
    }
}

#[test]
fn kernel_inside_free_is_carved_out() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 100)).unwrap();
    builder.append(Record::new(Tag::Kernel, 40, 20)).unwrap();

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Free, 0, 40),
            Record::new(Tag::Kernel, 40, 20),
            Record::new(Tag::Free, 60, 40),
        ]
    );
    assert_well_formed(&payload);
}

#[test]
fn free_appended_over_kernel_is_carved_out_too() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Kernel, 40, 20)).unwrap();
    let outcome = builder.append(Record::new(Tag::Free, 0, 100)).unwrap();
    assert_eq!(outcome, Outcome::Resolved { index: 0, added: 2 });

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Free, 0, 40),
            Record::new(Tag::Kernel, 40, 20),
            Record::new(Tag::Free, 60, 40),
        ]
    );
    assert_well_formed(&payload);
}

#[test]
fn memory_categories_resolve_the_same_in_either_order() {
    let ranked = [Tag::Free, Tag::Loader, Tag::Kernel, Tag::Reserved];
    for (i, &low) in ranked.iter().enumerate() {
        for &high in &ranked[i + 1..] {
            for high_first in [false, true] {
                let outer = Record::new(low, 0x1000, 0x3000);
                let inner = Record::new(high, 0x2000, 0x1000);
                let (first, second) = if high_first { (inner, outer) } else { (outer, inner) };

                let mut buf = [0u8; 256];
                let mut builder = Builder::new(&mut buf).unwrap();
                builder.append(first).unwrap();
                builder.append(second).unwrap();

                let payload = builder.finish();
                assert_eq!(
                    records(&payload),
                    [
                        Record::new(low, 0x1000, 0x1000),
                        inner,
                        Record::new(low, 0x3000, 0x1000),
                    ],
                    "{low} vs {high}, high first: {high_first}"
                );
            }
        }
    }
}

#[test]
fn adjacent_free_records_coalesce() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 50)).unwrap();
    assert_eq!(builder.count(), 1);

    let outcome = builder.append(Record::new(Tag::Free, 50, 50)).unwrap();
    assert_eq!(outcome, Outcome::Extended(0));
    assert_eq!(builder.count(), 1);

    let payload = builder.finish();
    assert_eq!(records(&payload), [Record::new(Tag::Free, 0, 100)]);
}

#[test]
fn adjacent_record_below_extends_downwards() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Loader, 0x2000, 0x1000)).unwrap();
    builder.append(Record::new(Tag::Loader, 0x1000, 0x1000)).unwrap();

    let payload = builder.finish();
    assert_eq!(records(&payload), [Record::new(Tag::Loader, 0x1000, 0x2000)]);
}

#[test]
fn empty_records_change_nothing() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 100)).unwrap();

    let outcome = builder.append(Record::new(Tag::Kernel, 40, 0)).unwrap();
    assert_eq!(outcome, Outcome::Ignored);
    assert_eq!(builder.count(), 1);

    let payload = builder.finish();
    assert_eq!(records(&payload), [Record::new(Tag::Free, 0, 100)]);
}

#[test]
fn adjacent_records_of_different_tags_stay_apart() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 50)).unwrap();
    builder.append(Record::new(Tag::Reserved, 50, 50)).unwrap();

    let payload = builder.finish();
    assert_eq!(payload.count(), 2);
    assert_well_formed(&payload);
}

#[test]
fn non_mergeable_records_never_coalesce() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Stack, 0, 0x1000)).unwrap();
    builder.append(Record::new(Tag::Stack, 0x1000, 0x1000)).unwrap();

    assert_eq!(builder.count(), 2);
}

#[test]
fn free_inside_file_is_swallowed() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    let file = Record::new(Tag::File, 0x1000, 0x3000);
    builder.append(file).unwrap();

    let outcome = builder.append(Record::new(Tag::Free, 0x2000, 0x1000)).unwrap();
    assert_eq!(outcome, Outcome::Resolved { index: 0, added: 0 });

    let payload = builder.finish();
    assert_eq!(records(&payload), [file]);
}

#[test]
fn free_around_file_is_trimmed_to_fragments() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    let file = Record::new(Tag::File, 0x2000, 0x1000);
    builder.append(file).unwrap();
    builder
        .append(Record::new(Tag::Free, 0x1000, 0x4000).with_flags(1))
        .unwrap();

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Free, 0x1000, 0x1000),
            file,
            Record::new(Tag::Free, 0x3000, 0x2000),
        ]
    );
    assert_well_formed(&payload);
}

#[test]
fn framebuffer_over_free_is_kept_whole() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 0x10_0000)).unwrap();
    let fb = Record::new(Tag::Framebuffer, 0x8_0000, 0x8_0000).with_more(0xdead);
    builder.append(fb).unwrap();

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [Record::new(Tag::Free, 0, 0x8_0000), fb]
    );
}

#[test]
fn overlap_at_the_low_end_leaves_the_upper_fragment() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0x1000, 0x3000)).unwrap();
    builder.append(Record::new(Tag::Rsdp, 0x0800, 0x1000)).unwrap();

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Rsdp, 0x0800, 0x1000),
            Record::new(Tag::Free, 0x1800, 0x2800),
        ]
    );
}

#[test]
fn overlapping_records_of_one_tag_become_their_union() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 50)).unwrap();
    builder.append(Record::new(Tag::Free, 25, 50)).unwrap();

    let payload = builder.finish();
    assert_eq!(records(&payload), [Record::new(Tag::Free, 0, 75)]);
}

#[test]
fn unsorted_appends_end_up_sorted() {
    let mut buf = [0u8; 512];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Fdt, 0x9000, 0x1000)).unwrap();
    builder.append(Record::new(Tag::Stack, 0x1000, 0x1000)).unwrap();
    builder.append(Record::new(Tag::Rsdp, 0x5000, 0x100)).unwrap();
    builder.append(Record::new(Tag::Kernel, 0xf000, 0x1000)).unwrap();

    let payload = builder.finish();
    let starts: Vec<u64> = records(&payload).iter().map(|r| r.start).collect();
    assert_eq!(starts, [0x1000, 0x5000, 0x9000, 0xf000]);
    assert_well_formed(&payload);
}

#[test]
fn merge_above_is_skipped_when_it_would_overlap_the_next_record() {
    let mut buf = [0u8; 512];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 0x1000)).unwrap();
    builder.append(Record::new(Tag::Kernel, 0x1000, 0x1000)).unwrap();
    builder.append(Record::new(Tag::File, 0x3000, 0x1000)).unwrap();

    // Touches the kernel record at its end but runs into the file.
    builder
        .append(Record::new(Tag::Kernel, 0x2000, 0x1800))
        .unwrap();

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Free, 0, 0x1000),
            Record::new(Tag::Kernel, 0x1000, 0x1000),
            Record::new(Tag::Kernel, 0x2000, 0x1000),
            Record::new(Tag::File, 0x3000, 0x1000),
        ]
    );
    assert_well_formed(&payload);
}

#[test]
fn invariants_hold_across_a_realistic_memory_map() {
    let mut buf = [0u8; 1024];
    let mut builder = Builder::new(&mut buf).unwrap();

    builder.append(Record::new(Tag::Free, 0, 0xa_0000)).unwrap();
    builder.append(Record::new(Tag::Reserved, 0xa_0000, 0x6_0000)).unwrap();
    builder.append(Record::new(Tag::Free, 0x10_0000, 0x7ef_0000)).unwrap();
    builder.append(Record::new(Tag::Kernel, 0x20_0000, 0x8_0000)).unwrap();
    builder.append(Record::new(Tag::Loader, 0x40_0000, 0x1_0000)).unwrap();
    builder.append(Record::new(Tag::Handover, 0x50_0000, 0x1000)).unwrap();
    builder.append(Record::new(Tag::Stack, 0x51_0000, 0x1_0000)).unwrap();

    let payload = builder.finish();
    assert_well_formed(&payload);
    assert_eq!(
        payload.find_by_tag(Tag::Kernel),
        Some(Record::new(Tag::Kernel, 0x20_0000, 0x8_0000))
    );

    let covered: u64 = records(&payload).iter().map(|r| r.size).sum();
    assert_eq!(covered, 0x7ff_0000);
}

#[test]
fn full_payload_refuses_the_split_and_stays_intact() {
    // Header, one record, sentinel and room for exactly one more record.
    let mut buf = [0u8; 16 + 3 * 32];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 100)).unwrap();

    let err = builder.append(Record::new(Tag::Kernel, 40, 20)).unwrap_err();
    assert!(matches!(err, HandoverError::CapacityExceeded { .. }));

    let payload = builder.finish();
    assert!(payload.is_valid());
    assert_eq!(records(&payload), [Record::new(Tag::Free, 0, 100)]);
}

#[test]
fn merge_at_the_top_of_the_address_space_does_not_overflow() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, u64::MAX)).unwrap();

    let outcome = builder.append(Record::new(Tag::Free, u64::MAX, 1)).unwrap();
    assert_eq!(outcome, Outcome::Inserted(1));

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Free, 0, u64::MAX),
            Record::new(Tag::Free, u64::MAX, 1),
        ]
    );
}

#[test]
fn record_ending_past_the_address_space_does_not_merge_downwards() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    let top = Record::new(Tag::Free, u64::MAX, 1);
    builder.append(top).unwrap();

    let below = Record::new(Tag::Free, 10, u64::MAX);
    let outcome = builder.append(below).unwrap();
    assert_eq!(outcome, Outcome::Inserted(0));

    let payload = builder.finish();
    assert_eq!(records(&payload), [below, top]);
}

#[test]
fn only_the_first_overlap_is_resolved_per_append() {
    let mut buf = [0u8; 256];
    let mut builder = Builder::new(&mut buf).unwrap();
    builder.append(Record::new(Tag::Free, 0, 10)).unwrap();
    builder.append(Record::new(Tag::Free, 20, 10)).unwrap();

    // Spans both free records; only the lower one is trimmed.
    let outcome = builder.append(Record::new(Tag::Stack, 5, 30)).unwrap();
    assert_eq!(outcome, Outcome::Resolved { index: 0, added: 1 });

    let payload = builder.finish();
    assert_eq!(
        records(&payload),
        [
            Record::new(Tag::Free, 0, 5),
            Record::new(Tag::Stack, 5, 30),
            Record::new(Tag::Free, 20, 10),
        ]
    );
    // Ordering holds even though the last two intervals overlap.
    assert!(payload.is_valid());
    let live = records(&payload);
    assert!(live[1].overlaps(&live[2]));
}
