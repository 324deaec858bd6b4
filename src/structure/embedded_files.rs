//! File attachments.
//!
//! Each attachment is an `EmbeddedFile` stream plus a `Filespec` dictionary
//! pointing at it. The document lists the file specifications in the
//! `EmbeddedFiles` name tree of the catalog's `Names` dictionary.

use chrono::{DateTime, FixedOffset};
use md5::{Digest, Md5};

use crate::config::PdfVersion;
use crate::error::{Error, Result};
use crate::filters::StreamMode;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// How an attachment relates to the document (`/AFRelationship`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AFRelationship {
    /// The file is the original source
    Source,
    /// The file contains data referenced by the document
    Data,
    /// An alternative representation
    Alternative,
    /// Supplementary data
    Supplement,
    /// Encrypted payload
    EncryptedPayload,
    /// Form data
    FormData,
    /// A schema definition
    Schema,
    /// Unspecified relationship
    Unspecified,
}

impl AFRelationship {
    /// PDF name.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            AFRelationship::Source => "Source",
            AFRelationship::Data => "Data",
            AFRelationship::Alternative => "Alternative",
            AFRelationship::Supplement => "Supplement",
            AFRelationship::EncryptedPayload => "EncryptedPayload",
            AFRelationship::FormData => "FormData",
            AFRelationship::Schema => "Schema",
            AFRelationship::Unspecified => "Unspecified",
        }
    }
}

/// A file to attach.
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    /// File name; also the key in the `EmbeddedFiles` tree
    pub name: String,
    /// File contents
    pub data: Vec<u8>,
    /// Description shown by readers
    pub description: Option<String>,
    /// MIME type, written as the stream's `/Subtype`
    pub mime_type: Option<String>,
    /// Creation date
    pub creation_date: Option<DateTime<FixedOffset>>,
    /// Modification date
    pub modification_date: Option<DateTime<FixedOffset>>,
    /// Relationship to the document
    pub af_relationship: Option<AFRelationship>,
}

impl EmbeddedFile {
    /// Attachment `name` holding `data`.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            description: None,
            mime_type: None,
            creation_date: None,
            modification_date: None,
            af_relationship: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the creation date.
    pub fn with_creation_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Set the modification date.
    pub fn with_modification_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.modification_date = Some(date);
        self
    }

    /// Set the relationship.
    pub fn with_af_relationship(mut self, relationship: AFRelationship) -> Self {
        self.af_relationship = Some(relationship);
        self
    }

    /// Size of the file data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Write the stream and file specification; returns the latter.
    pub(crate) fn write(&self, writer: &mut FragmentWriter) -> Result<ObjectRef> {
        writer.version().require(PdfVersion::V1_3, "embedded files")?;
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("attachment name is empty".to_string()));
        }
        let stream = writer.next_ref();
        let filespec = writer.next_ref();

        writer.start_object(stream)?;
        writer.start_hash()?;
        writer.write_name("Type")?;
        writer.write_name("EmbeddedFile")?;
        if let Some(mime) = &self.mime_type {
            writer.write_name("Subtype")?;
            writer.write_name(mime)?;
        }
        writer.write_name("Params")?;
        writer.start_hash()?;
        writer.write_name("Size")?;
        writer.write_int(self.data.len() as i64)?;
        writer.write_name("CheckSum")?;
        writer.write_bytes(&Md5::digest(&self.data))?;
        if let Some(date) = &self.creation_date {
            writer.write_name("CreationDate")?;
            writer.write_date(date)?;
        }
        if let Some(date) = &self.modification_date {
            writer.write_name("ModDate")?;
            writer.write_date(date)?;
        }
        writer.end_hash()?;
        writer.begin_stream(StreamMode::Binary)?;
        writer.write_stream(&self.data)?;
        writer.end_stream()?;
        writer.end_object()?;

        writer.start_object(filespec)?;
        writer.start_hash()?;
        writer.write_name("Type")?;
        writer.write_name("Filespec")?;
        writer.write_name("F")?;
        writer.write_text(&self.name)?;
        let unicode = writer.version() >= PdfVersion::V1_7;
        if unicode {
            writer.write_name("UF")?;
            writer.write_text(&self.name)?;
        }
        if let Some(description) = &self.description {
            writer.write_name("Desc")?;
            writer.write_text(description)?;
        }
        writer.write_name("EF")?;
        writer.start_hash()?;
        writer.write_name("F")?;
        writer.write_object_ref(stream)?;
        if unicode {
            writer.write_name("UF")?;
            writer.write_object_ref(stream)?;
        }
        writer.end_hash()?;
        if let Some(relationship) = self.af_relationship {
            writer.write_name("AFRelationship")?;
            writer.write_name(relationship.pdf_name())?;
        }
        writer.end_hash()?;
        writer.end_object()?;

        log::trace!("attachment '{}' ({} bytes) as {}", self.name, self.data.len(), filespec);
        Ok(filespec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::TimeZone;

    use crate::config::{Compression, WriterConfig};
    use crate::sink::{FragmentSink, SpoolSink};
    use crate::writer::WriterContext;

    fn render(version: PdfVersion, file: &EmbeddedFile) -> (Result<ObjectRef>, String) {
        let sink = Rc::new(RefCell::new(SpoolSink::new(Vec::new())));
        let config = WriterConfig::new()
            .with_version(version)
            .with_compression(Compression::None);
        let context = WriterContext::new(sink.clone(), &config);
        let mut w = FragmentWriter::new(context).unwrap();
        let result = file.write(&mut w);
        w.close().unwrap();
        let mut sink = sink.borrow_mut();
        sink.finish().unwrap();
        (result, String::from_utf8_lossy(&sink.take_output().unwrap()).into_owned())
    }

    #[test]
    fn test_attachment_objects() {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap();
        let file = EmbeddedFile::new("data.csv", b"a,b\n1,2\n".to_vec())
            .with_mime_type("text/csv")
            .with_description("Numbers")
            .with_modification_date(date)
            .with_af_relationship(AFRelationship::Data);
        let (filespec, text) = render(PdfVersion::V1_7, &file);
        assert_eq!(filespec.unwrap(), ObjectRef::new(2, 0));
        assert!(text.contains("1 0 obj\n<</Type /EmbeddedFile /Subtype /text#2Fcsv /Params <</Size 8 /CheckSum <"));
        assert!(text.contains("/ModDate (D:20240102030405+00'00')>> /Filter /ASCIIHexDecode"));
        assert!(text.contains(
            "2 0 obj\n<</Type /Filespec /F (data.csv) /UF (data.csv) /Desc (Numbers) /EF <</F 1 0 R /UF 1 0 R>> /AFRelationship /Data>>"
        ));
    }

    #[test]
    fn test_older_versions() {
        let file = EmbeddedFile::new("a.txt", vec![1]);
        let (result, text) = render(PdfVersion::V1_2, &file);
        assert!(matches!(result, Err(Error::Unsupported(_))));
        assert!(text.is_empty());

        let (result, text) = render(PdfVersion::V1_4, &file);
        assert!(result.is_ok());
        assert!(!text.contains("/UF"));
    }
}
