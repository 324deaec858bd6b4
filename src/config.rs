//! Writer configuration.
//!
//! [`WriterConfig`] carries the read-only parameters every builder consults:
//! target version, stream compression, text encoding and security settings.

use chrono::{DateTime, FixedOffset};

use crate::encryption::EncryptionConfig;
use crate::error::{Error, Result};

/// PDF version written in the header and used for feature gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PdfVersion {
    /// PDF 1.2
    V1_2,
    /// PDF 1.3
    V1_3,
    /// PDF 1.4
    V1_4,
    /// PDF 1.5
    V1_5,
    /// PDF 1.6
    V1_6,
    /// PDF 1.7
    V1_7,
    /// PDF 2.0
    V2_0,
}

impl PdfVersion {
    /// Version string as it appears after `%PDF-`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfVersion::V1_2 => "1.2",
            PdfVersion::V1_3 => "1.3",
            PdfVersion::V1_4 => "1.4",
            PdfVersion::V1_5 => "1.5",
            PdfVersion::V1_6 => "1.6",
            PdfVersion::V1_7 => "1.7",
            PdfVersion::V2_0 => "2.0",
        }
    }

    /// Fail with [`Error::Unsupported`] unless this version is at least `min`.
    pub fn require(self, min: PdfVersion, feature: &str) -> Result<()> {
        if self < min {
            return Err(Error::Unsupported(format!(
                "{} requires PDF {} (document is PDF {})",
                feature,
                min.as_str(),
                self.as_str()
            )));
        }
        Ok(())
    }

    /// Whether the catalog `Names` dictionary may hold a single flat node.
    ///
    /// Older readers expect the root of every name tree to be an
    /// intermediate node with `Kids`.
    pub fn supports_flat_name_tree(&self) -> bool {
        *self >= PdfVersion::V1_3
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream compression policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// No compression; binary data is hex encoded to stay 7-bit clean
    None,
    /// Deflate followed by ASCII85, output stays 7-bit clean
    Ascii,
    /// Deflate only
    #[default]
    Binary,
}

/// Encoding used for text strings (titles, names, descriptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// PDFDocEncoding where the text allows it, UTF-16BE otherwise
    #[default]
    PdfDoc,
    /// Always UTF-16BE with a byte order mark
    Utf16,
}

/// Document information dictionary contents.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    /// Document title
    pub title: Option<String>,
    /// Author name
    pub author: Option<String>,
    /// Subject
    pub subject: Option<String>,
    /// Keywords
    pub keywords: Option<String>,
    /// Application that created the original content
    pub creator: Option<String>,
    /// Application that produced the PDF
    pub producer: Option<String>,
    /// Creation date; the time the document was opened when absent
    pub creation_date: Option<DateTime<FixedOffset>>,
}

impl DocumentInfo {
    /// Create empty document info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the keywords.
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Set the creator application.
    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Set the producer application.
    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Set the creation date.
    pub fn creation_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.creation_date = Some(date);
        self
    }
}

/// Configuration for a document being assembled.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Version in the header; gates optional features
    pub version: PdfVersion,
    /// Stream compression policy
    pub compression: Compression,
    /// Text string encoding
    pub text_encoding: TextEncoding,
    /// Write the binary marker comment after the header
    pub binary_marker: bool,
    /// Write an XMP metadata stream mirroring the info dictionary
    pub xmp_metadata: bool,
    /// Open the outline panel when the document has bookmarks
    pub show_outline: bool,
    /// Standard security handler settings
    pub encryption: Option<EncryptionConfig>,
    /// Info dictionary contents
    pub info: DocumentInfo,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterConfig {
    /// Create a configuration with defaults: PDF 1.7, Flate compression.
    pub fn new() -> Self {
        Self {
            version: PdfVersion::V1_7,
            compression: Compression::Binary,
            text_encoding: TextEncoding::PdfDoc,
            binary_marker: true,
            xmp_metadata: false,
            show_outline: true,
            encryption: None,
            info: DocumentInfo {
                producer: Some(format!("pdf_spool {}", env!("CARGO_PKG_VERSION"))),
                ..DocumentInfo::default()
            },
        }
    }

    /// Set the PDF version.
    pub fn with_version(mut self, version: PdfVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the stream compression policy.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the text string encoding.
    pub fn with_text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    /// Enable or disable the binary marker comment.
    pub fn with_binary_marker(mut self, enable: bool) -> Self {
        self.binary_marker = enable;
        self
    }

    /// Enable or disable the XMP metadata stream.
    pub fn with_xmp_metadata(mut self, enable: bool) -> Self {
        self.xmp_metadata = enable;
        self
    }

    /// Open the outline panel on display when bookmarks exist.
    pub fn with_show_outline(mut self, enable: bool) -> Self {
        self.show_outline = enable;
        self
    }

    /// Encrypt the document with the standard security handler.
    pub fn with_encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Set the info dictionary contents.
    pub fn with_info(mut self, info: DocumentInfo) -> Self {
        self.info = info;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WriterConfig::default();
        assert_eq!(config.version, PdfVersion::V1_7);
        assert_eq!(config.compression, Compression::Binary);
        assert!(config.binary_marker);
        assert!(config.encryption.is_none());
        assert!(config.info.producer.is_some());
    }

    #[test]
    fn test_builder_chain() {
        let config = WriterConfig::new()
            .with_version(PdfVersion::V1_4)
            .with_compression(Compression::None)
            .with_binary_marker(false)
            .with_info(DocumentInfo::new().title("Report").author("Ada"));
        assert_eq!(config.version.as_str(), "1.4");
        assert_eq!(config.compression, Compression::None);
        assert!(!config.binary_marker);
        assert_eq!(config.info.title.as_deref(), Some("Report"));
        assert_eq!(config.info.author.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_version_ordering_and_require() {
        assert!(PdfVersion::V1_2 < PdfVersion::V1_3);
        assert!(PdfVersion::V1_7 < PdfVersion::V2_0);
        assert!(PdfVersion::V1_5.require(PdfVersion::V1_5, "layers").is_ok());

        let err = PdfVersion::V1_4.require(PdfVersion::V1_5, "Optional content").unwrap_err();
        let msg = format!("{}", err);
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(msg.contains("Optional content"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn test_flat_name_tree_threshold() {
        assert!(!PdfVersion::V1_2.supports_flat_name_tree());
        assert!(PdfVersion::V1_3.supports_flat_name_tree());
        assert!(PdfVersion::V2_0.supports_flat_name_tree());
    }
}
