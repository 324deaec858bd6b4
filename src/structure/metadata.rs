//! Document information dictionary and XMP metadata stream.

use chrono::{DateTime, FixedOffset};

use crate::config::{DocumentInfo, PdfVersion};
use crate::error::Result;
use crate::filters::StreamMode;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";

/// Write the `/Info` dictionary object.
///
/// `ModDate` equals the creation date: a document is written only once.
pub fn write_info(
    writer: &mut FragmentWriter,
    info: &DocumentInfo,
    created: &DateTime<FixedOffset>,
) -> Result<ObjectRef> {
    let obj = writer.next_ref();
    writer.start_object(obj)?;
    writer.start_hash()?;
    let entries = [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Creator", &info.creator),
        ("Producer", &info.producer),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            writer.write_name(key)?;
            writer.write_text(value)?;
        }
    }
    writer.write_name("CreationDate")?;
    writer.write_date(created)?;
    writer.write_name("ModDate")?;
    writer.write_date(created)?;
    writer.end_hash()?;
    writer.end_object()?;
    Ok(obj)
}

/// Write an XMP `/Metadata` stream mirroring `info`. Requires PDF 1.4.
pub fn write_xmp(
    writer: &mut FragmentWriter,
    info: &DocumentInfo,
    created: &DateTime<FixedOffset>,
) -> Result<ObjectRef> {
    writer.version().require(PdfVersion::V1_4, "XMP metadata")?;
    let packet = xmp_packet(info, created);
    let obj = writer.next_ref();
    writer.start_object(obj)?;
    writer.start_hash()?;
    writer.write_name("Type")?;
    writer.write_name("Metadata")?;
    writer.write_name("Subtype")?;
    writer.write_name("XML")?;
    // Left unfiltered so tools can find the packet by scanning
    writer.begin_stream(StreamMode::Raw)?;
    writer.write_stream(packet.as_bytes())?;
    writer.end_stream()?;
    writer.end_object()?;
    Ok(obj)
}

/// Build the XMP packet.
pub fn xmp_packet(info: &DocumentInfo, created: &DateTime<FixedOffset>) -> String {
    let mut xml = String::new();
    xml.push_str("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
    xml.push_str(&format!("<x:xmpmeta xmlns:x=\"{}\">\n", NS_X));
    xml.push_str(&format!("  <rdf:RDF xmlns:rdf=\"{}\">\n", NS_RDF));
    xml.push_str("    <rdf:Description rdf:about=\"\"\n");
    xml.push_str(&format!("        xmlns:dc=\"{}\"\n", NS_DC));
    xml.push_str(&format!("        xmlns:xmp=\"{}\"\n", NS_XMP));
    xml.push_str(&format!("        xmlns:pdf=\"{}\">\n", NS_PDF));

    if let Some(title) = &info.title {
        push_alt(&mut xml, "dc:title", title);
    }
    if let Some(author) = &info.author {
        xml.push_str("      <dc:creator>\n        <rdf:Seq>\n");
        xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(author)));
        xml.push_str("        </rdf:Seq>\n      </dc:creator>\n");
    }
    if let Some(subject) = &info.subject {
        push_alt(&mut xml, "dc:description", subject);
    }
    if let Some(creator) = &info.creator {
        push_simple(&mut xml, "xmp:CreatorTool", creator);
    }
    let date = created.to_rfc3339();
    push_simple(&mut xml, "xmp:CreateDate", &date);
    push_simple(&mut xml, "xmp:ModifyDate", &date);
    if let Some(producer) = &info.producer {
        push_simple(&mut xml, "pdf:Producer", producer);
    }
    if let Some(keywords) = &info.keywords {
        push_simple(&mut xml, "pdf:Keywords", keywords);
    }

    xml.push_str("    </rdf:Description>\n");
    xml.push_str("  </rdf:RDF>\n");
    xml.push_str("</x:xmpmeta>\n");
    // Room for in-place edits
    for _ in 0..20 {
        xml.push_str(&" ".repeat(99));
        xml.push('\n');
    }
    xml.push_str("<?xpacket end=\"w\"?>");
    xml
}

fn push_simple(xml: &mut String, tag: &str, value: &str) {
    xml.push_str(&format!("      <{}>{}</{}>\n", tag, escape_xml(value), tag));
}

fn push_alt(xml: &mut String, tag: &str, value: &str) {
    xml.push_str(&format!("      <{}>\n        <rdf:Alt>\n", tag));
    xml.push_str(&format!(
        "          <rdf:li xml:lang=\"x-default\">{}</rdf:li>\n",
        escape_xml(value)
    ));
    xml.push_str(&format!("        </rdf:Alt>\n      </{}>\n", tag));
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::TimeZone;

    use crate::config::WriterConfig;
    use crate::error::Error;
    use crate::sink::{FragmentSink, SpoolSink};
    use crate::writer::WriterContext;

    fn created() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2023, 6, 1, 12, 0, 0)
            .unwrap()
    }

    fn render(
        version: PdfVersion,
        write: impl FnOnce(&mut FragmentWriter) -> Result<ObjectRef>,
    ) -> (Result<ObjectRef>, String) {
        let sink = Rc::new(RefCell::new(SpoolSink::new(Vec::new())));
        let config = WriterConfig::new().with_version(version);
        let context = WriterContext::new(sink.clone(), &config);
        let mut w = FragmentWriter::new(context).unwrap();
        let result = write(&mut w);
        w.close().unwrap();
        let mut sink = sink.borrow_mut();
        sink.finish().unwrap();
        (result, String::from_utf8(sink.take_output().unwrap()).unwrap())
    }

    #[test]
    fn test_info_dictionary() {
        let info = DocumentInfo::new().title("Report").author("A. Writer");
        let (obj, text) = render(PdfVersion::V1_7, |w| write_info(w, &info, &created()));
        assert_eq!(obj.unwrap(), ObjectRef::new(1, 0));
        assert_eq!(
            text,
            "1 0 obj\n<</Title (Report) /Author (A. Writer) /CreationDate (D:20230601120000+01'00') /ModDate (D:20230601120000+01'00')>>\nendobj\n"
        );
    }

    #[test]
    fn test_xmp_packet() {
        let info = DocumentInfo::new().title("Q&A").producer("pdf_spool");
        let packet = xmp_packet(&info, &created());
        assert!(packet.contains("<rdf:li xml:lang=\"x-default\">Q&amp;A</rdf:li>"));
        assert!(packet.contains("<xmp:CreateDate>2023-06-01T12:00:00+01:00</xmp:CreateDate>"));
        assert!(packet.contains("<pdf:Producer>pdf_spool</pdf:Producer>"));
        assert!(packet.ends_with("<?xpacket end=\"w\"?>"));
    }

    #[test]
    fn test_xmp_stream() {
        let info = DocumentInfo::new();
        let (obj, text) = render(PdfVersion::V1_4, |w| write_xmp(w, &info, &created()));
        assert!(obj.is_ok());
        assert!(text.starts_with("1 0 obj\n<</Type /Metadata /Subtype /XML /Length "));
        assert!(text.contains("<?xpacket end=\"w\"?>\nendstream"));

        let (obj, text) = render(PdfVersion::V1_3, |w| write_xmp(w, &info, &created()));
        assert!(matches!(obj, Err(Error::Unsupported(_))));
        assert!(text.is_empty());
    }
}
