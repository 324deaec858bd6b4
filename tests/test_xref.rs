//! Cross-reference table tests
//!
//! Every entry must point at the byte where its `k 0 obj` header starts,
//! whatever order the objects were allocated and written in.

mod common;

use common::{assert_xref_consistent, int_entry, object_dict, object_offsets, output, writer};
use pdf_spool::structure::PageSetup;
use pdf_spool::writer::{Trailer, XrefTable};
use pdf_spool::{Compression, Error, FragmentSink, ObjectRef, PdfDocument, WriterConfig};
use proptest::prelude::*;

fn plain() -> WriterConfig {
    WriterConfig::new()
        .with_compression(Compression::None)
        .with_binary_marker(false)
}

fn trailer(root: ObjectRef) -> Trailer {
    Trailer {
        root,
        info: None,
        file_id: [7; 16],
        encrypt: None,
    }
}

fn write_dummy(w: &mut pdf_spool::FragmentWriter, obj: ObjectRef, payload: i64) {
    w.start_object(obj).unwrap();
    w.start_hash().unwrap();
    w.write_name("Value").unwrap();
    w.write_int(payload).unwrap();
    w.end_hash().unwrap();
    w.end_object().unwrap();
}

#[test]
fn test_out_of_order_objects() {
    common::init_logging();
    let (sink, mut w) = writer(&plain());
    w.write_raw(b"%PDF-1.7\n").unwrap();
    let r1 = w.next_ref();
    let r2 = w.next_ref();
    let r3 = w.next_ref();

    let mut first = w.fork().unwrap();
    let mut second = w.fork().unwrap();
    // Written R3, R1, R2; each lands in its own slot
    write_dummy(&mut first, r3, 3);
    write_dummy(&mut second, r1, 1);
    write_dummy(&mut w, r2, 2);
    first.close().unwrap();
    second.close().unwrap();

    let positions = sink.borrow().position_info().unwrap();
    let objects = w.context().objects().clone();
    XrefTable::new(objects)
        .close(&mut w, &positions, &trailer(r1))
        .unwrap();
    w.close().unwrap();

    let bytes = output(&sink);
    let xref = assert_xref_consistent(&bytes);
    assert_eq!(xref.entries.len(), 3);
    let (e1, e2, e3) = (xref.entries[0], xref.entries[1], xref.entries[2]);
    assert!(e3 < e1 && e1 < e2, "offsets follow write order: {:?}", xref.entries);

    let offsets = object_offsets(&bytes);
    assert_eq!(offsets[&3] as u64, e3);
    assert_eq!(offsets[&1] as u64, e1);
    assert_eq!(offsets[&2] as u64, e2);
    assert!(xref.trailer.contains("/Size 4 /Root 1 0 R"));
}

#[test]
fn test_unwritten_reference_fails() {
    let (sink, mut w) = writer(&plain());
    let written = w.next_ref();
    let missing = w.next_ref();
    write_dummy(&mut w, written, 0);

    let positions = sink.borrow().position_info().unwrap();
    let objects = w.context().objects().clone();
    let result = XrefTable::new(objects).close(&mut w, &positions, &trailer(written));
    assert!(matches!(result, Err(Error::UnresolvedReference(id)) if id == missing.id));
    w.close().unwrap();
}

#[test]
fn test_document_with_unwritten_reference_fails() {
    let mut doc = PdfDocument::new(Vec::new(), plain()).unwrap();
    let _never = doc.next_ref();
    assert!(matches!(doc.close(), Err(Error::UnresolvedReference(_))));
}

#[test]
fn test_single_square_page() {
    common::init_logging();
    let mut doc = PdfDocument::new(Vec::new(), plain()).unwrap();
    let mut page = doc.create_page(PageSetup::new(300.0, 300.0)).unwrap();
    page.write_content(b"0 0 1 rg 50 50 200 200 re f").unwrap();
    page.finish().unwrap();
    doc.close().unwrap();
    let bytes = doc.into_inner().unwrap();

    assert!(bytes.starts_with(b"%PDF-1.7\n"));
    let xref = assert_xref_consistent(&bytes);
    // Catalog, page tree, page, contents, info
    assert_eq!(xref.entries.len(), 5);
    assert_eq!(object_offsets(&bytes).len(), 5);

    let pages = object_dict(&bytes, 2);
    assert!(pages.contains("/Type /Pages"));
    assert_eq!(int_entry(&pages, "Count"), Some(1));
    assert!(object_dict(&bytes, 3).contains("/MediaBox [0 0 300 300]"));
    assert!(xref.trailer.contains("/Root 1 0 R /Info 5 0 R /ID ["));
}

#[test]
fn test_header_follows_version() {
    for version in [
        pdf_spool::PdfVersion::V1_2,
        pdf_spool::PdfVersion::V1_4,
        pdf_spool::PdfVersion::V2_0,
    ] {
        let mut doc = PdfDocument::new(Vec::new(), plain().with_version(version)).unwrap();
        doc.close().unwrap();
        let bytes = doc.into_inner().unwrap();
        let header = format!("%PDF-{}\n", version.as_str());
        assert!(bytes.starts_with(header.as_bytes()));
        assert_xref_consistent(&bytes);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_entries_match_headers(
        payloads in prop::collection::vec(any::<i32>(), 1..40),
        forked in prop::collection::vec(any::<bool>(), 40),
    ) {
        let (sink, mut w) = writer(&plain());
        let refs: Vec<ObjectRef> = payloads.iter().map(|_| w.next_ref()).collect();
        let mut slots = Vec::new();
        for (i, (obj, payload)) in refs.iter().zip(&payloads).enumerate() {
            if forked[i] {
                slots.push((w.fork().unwrap(), *obj, *payload as i64));
            } else {
                write_dummy(&mut w, *obj, *payload as i64);
            }
        }
        // Deferred objects are written last but land where they were forked
        while let Some((mut slot, obj, payload)) = slots.pop() {
            write_dummy(&mut slot, obj, payload);
            slot.close().unwrap();
        }

        let positions = sink.borrow().position_info().unwrap();
        let objects = w.context().objects().clone();
        XrefTable::new(objects)
            .close(&mut w, &positions, &trailer(refs[0]))
            .unwrap();
        w.close().unwrap();

        let bytes = output(&sink);
        let xref = assert_xref_consistent(&bytes);
        prop_assert_eq!(xref.entries.len(), payloads.len());
        prop_assert_eq!(object_offsets(&bytes).len(), payloads.len());
    }
}
