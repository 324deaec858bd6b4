//! Fork placement tests
//!
//! Bytes written to a forked writer must land strictly between what the
//! parent wrote before the fork and what it wrote after it.

mod common;

use common::{output, writer};
use pdf_spool::structure::PageSetup;
use pdf_spool::{Compression, Error, FragmentWriter, PdfDocument, StreamMode, WriterConfig};
use proptest::prelude::*;

/// Expected layout: each node holds text and the nodes forked from it.
#[derive(Default)]
struct Node {
    items: Vec<Item>,
}

enum Item {
    Text(String),
    Child(usize),
}

fn flatten(nodes: &[Node], index: usize, out: &mut String) {
    for item in &nodes[index].items {
        match item {
            Item::Text(text) => out.push_str(text),
            Item::Child(child) => flatten(nodes, *child, out),
        }
    }
}

#[test]
fn test_slot_between_before_and_after() {
    let (sink, mut w) = writer(&WriterConfig::new());
    w.write_raw(b"before|").unwrap();
    let mut slot = w.fork().unwrap();
    w.write_raw(b"|after").unwrap();
    slot.write_raw(b"slot").unwrap();
    slot.close().unwrap();
    w.close().unwrap();
    assert_eq!(output(&sink), b"before|slot|after");
}

#[test]
fn test_parent_cannot_close_before_child() {
    let (_sink, mut w) = writer(&WriterConfig::new());
    let mut slot = w.fork().unwrap();
    assert!(matches!(w.close(), Err(Error::IllegalState(_))));
    slot.close().unwrap();
    w.close().unwrap();
}

#[test]
fn test_fork_inside_stream_is_refused() {
    let (_sink, mut w) = writer(&WriterConfig::new());
    let obj = w.next_ref();
    w.start_object(obj).unwrap();
    w.start_hash().unwrap();
    w.begin_stream(pdf_spool::StreamMode::Binary).unwrap();
    assert!(matches!(w.fork(), Err(Error::IllegalState(_))));
    w.end_stream().unwrap();
    w.end_object().unwrap();
    w.close().unwrap();
}

#[test]
fn test_pages_stream_without_whole_document_buffering() {
    common::init_logging();
    let config = WriterConfig::new().with_compression(Compression::None);
    let mut doc = PdfDocument::new(Vec::new(), config).unwrap();
    let content = b"0 0 m 100 100 l S\n".repeat(600);
    for _ in 0..20 {
        let mut page = doc.create_page(PageSetup::letter()).unwrap();
        page.write_content(&content).unwrap();
        page.finish().unwrap();
    }
    let peak = doc.peak_buffered();
    doc.close().unwrap();
    let bytes = doc.into_inner().unwrap();

    assert!(bytes.len() > 20 * content.len());
    assert!(
        peak < 2 * content.len(),
        "peak buffer {} for pages of {} bytes",
        peak,
        content.len()
    );
}

fn assert_close_refused(mut doc: PdfDocument<Vec<u8>>, reason: &str) {
    match doc.close() {
        Err(Error::IllegalState(msg)) => assert!(msg.contains(reason), "{}", msg),
        other => panic!("close should fail with '{}', got {:?}", reason, other),
    }
}

#[test]
fn test_object_left_open_by_dropped_writer_fails_close() {
    common::init_logging();
    let mut doc = PdfDocument::new(Vec::new(), WriterConfig::new()).unwrap();
    let obj = doc.next_ref();
    {
        let mut slot = doc.writer().fork().unwrap();
        slot.start_object(obj).unwrap();
        slot.start_hash().unwrap();
        slot.write_name("Leaked").unwrap();
    }
    assert_close_refused(doc, "inside object 3");
}

#[test]
fn test_stream_left_open_by_dropped_writer_fails_close() {
    common::init_logging();
    let config = WriterConfig::new().with_compression(Compression::Binary);
    let mut doc = PdfDocument::new(Vec::new(), config).unwrap();
    let obj = doc.next_ref();
    {
        let mut slot = doc.writer().fork().unwrap();
        slot.start_object(obj).unwrap();
        slot.start_hash().unwrap();
        slot.begin_stream(StreamMode::Binary).unwrap();
        slot.write_stream(&[0x5A; 1000]).unwrap();
    }
    assert_close_refused(doc, "inside a stream body");
}

#[test]
fn test_finished_stream_writer_keeps_output_intact() {
    let (sink, mut w) = writer(&WriterConfig::new().with_compression(Compression::Binary));
    let obj = w.next_ref();
    w.start_object(obj).unwrap();
    w.start_hash().unwrap();
    {
        let mut body = w.start_stream(StreamMode::Binary).unwrap();
        body.write_data(&[0x5A; 1000]).unwrap();
    }
    w.end_object().unwrap();
    assert!(w.context().ensure_intact().is_ok());
    w.close().unwrap();
    assert_eq!(common::stream(&output(&sink), obj.id).decode(), vec![0x5A; 1000]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_fork_placement(
        ops in prop::collection::vec((any::<bool>(), 0usize..16, "[a-z]{1,4}"), 1..60),
    ) {
        let (sink, root) = writer(&WriterConfig::new());
        let mut writers: Vec<FragmentWriter> = vec![root];
        let mut nodes = vec![Node::default()];

        for (fork, pick, text) in ops {
            let index = pick % writers.len();
            if fork {
                let child = writers[index].fork().unwrap();
                nodes[index].items.push(Item::Child(writers.len()));
                writers.push(child);
                nodes.push(Node::default());
            } else {
                writers[index].write_raw(text.as_bytes()).unwrap();
                nodes[index].items.push(Item::Text(text));
            }
        }
        // Children always come after their parent in the list
        while let Some(mut w) = writers.pop() {
            w.close().unwrap();
        }

        let mut expected = String::new();
        flatten(&nodes, 0, &mut expected);
        prop_assert_eq!(String::from_utf8(output(&sink)).unwrap(), expected);
    }
}
