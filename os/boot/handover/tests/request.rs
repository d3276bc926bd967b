use handover::protocol::REQUEST_SIZE;
use handover::{Request, RequestError, RequestList, Tag, declare_requests, requests};

declare_requests!(Tag::Framebuffer, Tag::Rsdp);

fn encode(requests: &[Request]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(requests.len() * REQUEST_SIZE);
    for request in requests {
        bytes.extend_from_slice(&request.tag.to_le_bytes());
        bytes.extend_from_slice(&request.flags.to_le_bytes());
        bytes.extend_from_slice(&request.more.to_le_bytes());
    }
    bytes
}

#[test]
fn macro_brackets_requests_with_start_and_end() {
    let list = requests![Tag::Framebuffer, Tag::File];
    assert_eq!(
        list,
        [
            Request::start(),
            Request::new(Tag::Framebuffer),
            Request::new(Tag::File),
            Request::end(),
        ]
    );
    assert_eq!(requests![].len(), 2);
}

#[test]
fn declared_section_holds_the_list() {
    assert_eq!(HANDOVER_REQUESTS.len(), 4);
    assert_eq!(HANDOVER_REQUESTS[1], Request::new(Tag::Framebuffer));
    assert_eq!(HANDOVER_REQUESTS[3], Request::end());
}

#[test]
fn producer_reads_what_the_consumer_declared() {
    let bytes = encode(&requests![
        Tag::Framebuffer,
        Tag::Fdt,
        Tag::Rsdp,
    ]);
    let list = RequestList::parse(&bytes).unwrap();

    assert_eq!(list.len(), 3);
    assert!(list.wants(Tag::Framebuffer));
    assert!(list.wants(Tag::Rsdp));
    assert!(!list.wants(Tag::File));
    let tags: Vec<u32> = list.iter().map(|r| r.tag).collect();
    assert_eq!(tags, [Tag::Framebuffer.raw(), Tag::Fdt.raw(), Tag::Rsdp.raw()]);
}

#[test]
fn flags_and_aux_words_are_kept() {
    let wanted = Request::new(Tag::File).with_flags(1).with_more(0x42);
    let bytes = encode(&[Request::start(), wanted, Request::end()]);
    let list = RequestList::parse(&bytes).unwrap();
    assert_eq!(list.get(Tag::File), Some(wanted));
}

#[test]
fn trailing_bytes_after_the_end_are_ignored() {
    let mut bytes = encode(&requests![Tag::Fdt]);
    bytes.extend_from_slice(&[0xff; 7]);
    let list = RequestList::parse(&bytes).unwrap();
    assert_eq!(list.len(), 1);
}

#[test]
fn empty_list_wants_nothing() {
    let bytes = encode(&requests![]);
    let list = RequestList::parse(&bytes).unwrap();
    assert!(list.is_empty());
    assert!(!list.wants(Tag::Framebuffer));
}

#[test]
fn malformed_lists_are_rejected() {
    assert_eq!(RequestList::parse(&[0; 8]).unwrap_err(), RequestError::TooShort);

    let no_start = encode(&[Request::new(Tag::Fdt), Request::end()]);
    assert_eq!(
        RequestList::parse(&no_start).unwrap_err(),
        RequestError::MissingStart
    );

    let no_end = encode(&[Request::start(), Request::new(Tag::Fdt)]);
    assert_eq!(
        RequestList::parse(&no_end).unwrap_err(),
        RequestError::Unterminated
    );

    let mut unknown = encode(&requests![Tag::Fdt]);
    unknown[REQUEST_SIZE..REQUEST_SIZE + 4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
    assert_eq!(
        RequestList::parse(&unknown).unwrap_err(),
        RequestError::UnknownTag {
            index: 1,
            tag: 0x1234_5678
        }
    );
}
