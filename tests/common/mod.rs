//! Helpers for inspecting finished files.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pdf_spool::filters::decode_stream;
use pdf_spool::{Filter, FragmentSink, FragmentWriter, SpoolSink, WriterConfig, WriterContext};
use regex::bytes::Regex;

pub type TestSink = Rc<RefCell<SpoolSink<Vec<u8>>>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A bare writer over a fresh in-memory sink.
pub fn writer(config: &WriterConfig) -> (TestSink, FragmentWriter) {
    let sink: TestSink = Rc::new(RefCell::new(SpoolSink::new(Vec::new())));
    let context = WriterContext::new(sink.clone(), config);
    let writer = FragmentWriter::new(context).expect("writer");
    (sink, writer)
}

/// Finish the sink and return what it wrote.
pub fn output(sink: &TestSink) -> Vec<u8> {
    let mut sink = sink.borrow_mut();
    sink.finish().expect("finish");
    sink.take_output().expect("output")
}

/// Offset of every `k 0 obj` header that starts a line.
pub fn object_offsets(bytes: &[u8]) -> BTreeMap<u32, usize> {
    let re = Regex::new(r"(?m)^(\d+) 0 obj\n").unwrap();
    re.captures_iter(bytes)
        .map(|caps| {
            let id = std::str::from_utf8(&caps[1]).unwrap().parse().unwrap();
            (id, caps.get(0).unwrap().start())
        })
        .collect()
}

/// The cross-reference table, as found through `startxref`.
#[derive(Debug)]
pub struct Xref {
    /// Offset of the `xref` keyword
    pub start: usize,
    /// In-use entries, object 1 first
    pub entries: Vec<u64>,
    /// Trailer dictionary text
    pub trailer: String,
}

pub fn parse_xref(bytes: &[u8]) -> Xref {
    let text = String::from_utf8_lossy(bytes);
    assert!(text.ends_with("%%EOF\n"), "file does not end with %%EOF");
    let startxref = Regex::new(r"startxref\n(\d+)\n%%EOF\n$").unwrap();
    let caps = startxref.captures(bytes).expect("startxref");
    let start: usize = std::str::from_utf8(&caps[1]).unwrap().parse().unwrap();
    assert_eq!(&bytes[start..start + 5], b"xref\n");

    let section = &text[start..];
    let mut lines = section.lines();
    lines.next();
    let header = lines.next().expect("subsection header");
    let size: usize = header
        .strip_prefix("0 ")
        .expect("subsection starts at 0")
        .parse()
        .unwrap();

    let table_start = start + "xref\n".len() + header.len() + 1;
    let table = &bytes[table_start..table_start + size * 20];
    assert_eq!(&table[..20], b"0000000000 65535 f \n");
    let entries = table[20..]
        .chunks(20)
        .map(|entry| {
            assert_eq!(&entry[10..], b" 00000 n \n");
            std::str::from_utf8(&entry[..10]).unwrap().parse().unwrap()
        })
        .collect();

    let after = &text[table_start + size * 20..];
    let trailer = after
        .strip_prefix("trailer\n")
        .and_then(|t| t.split("\nstartxref").next())
        .expect("trailer")
        .to_string();
    Xref {
        start,
        entries,
        trailer,
    }
}

/// The text of object `id` up to `endobj` or `stream`.
pub fn object_dict(bytes: &[u8], id: u32) -> String {
    let offsets = object_offsets(bytes);
    let start = offsets[&id];
    let rest = &bytes[start..];
    let end = find(rest, b"\nstream\n")
        .into_iter()
        .chain(find(rest, b"\nendobj"))
        .min()
        .expect("object end");
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

/// A stream body with the filters its dictionary names.
#[derive(Debug)]
pub struct StreamBody {
    pub dict: String,
    pub filters: Vec<Filter>,
    pub data: Vec<u8>,
}

impl StreamBody {
    pub fn decode(&self) -> Vec<u8> {
        decode_stream(&self.data, &self.filters).expect("decodable stream")
    }
}

pub fn stream(bytes: &[u8], id: u32) -> StreamBody {
    let dict = object_dict(bytes, id);
    let start = object_offsets(bytes)[&id] + dict.len() + "\nstream\n".len();
    let length_re = regex::Regex::new(r"/Length (\d+)").unwrap();
    let length: usize = length_re
        .captures_iter(&dict)
        .last()
        .expect("/Length")[1]
        .parse()
        .unwrap();
    let data = bytes[start..start + length].to_vec();
    assert_eq!(&bytes[start + length..start + length + 10], b"\nendstream");
    StreamBody {
        filters: filters(&dict),
        dict,
        data,
    }
}

fn filters(dict: &str) -> Vec<Filter> {
    let re = regex::Regex::new(r"/Filter (?:\[([^\]]*)\]|(/\w+))").unwrap();
    let Some(caps) = re.captures(dict) else {
        return Vec::new();
    };
    let names = caps.get(1).or(caps.get(2)).unwrap().as_str();
    names
        .split_whitespace()
        .map(|name| match name {
            "/ASCIIHexDecode" => Filter::AsciiHex,
            "/ASCII85Decode" => Filter::Ascii85,
            "/FlateDecode" => Filter::Flate,
            other => panic!("unexpected filter {}", other),
        })
        .collect()
}

/// Integer value of `/key` in `dict`.
pub fn int_entry(dict: &str, key: &str) -> Option<i64> {
    let re = regex::Regex::new(&format!(r"/{} (-?\d+)", key)).unwrap();
    re.captures(dict).map(|caps| caps[1].parse().unwrap())
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Check every xref entry against the `k 0 obj` headers in the file.
pub fn assert_xref_consistent(bytes: &[u8]) -> Xref {
    let xref = parse_xref(bytes);
    for (index, offset) in xref.entries.iter().enumerate() {
        let id = index + 1;
        let header = format!("{} 0 obj\n", id);
        let at = *offset as usize;
        assert_eq!(
            &bytes[at..at + header.len()],
            header.as_bytes(),
            "xref entry {} does not point at its object",
            id
        );
    }
    xref
}
